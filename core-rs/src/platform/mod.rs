//! Platform identification
//!
//! Maps the host (OS, distribution, pointer width) to one of the supported
//! platforms. Anything else is rejected before provisioning starts.

pub mod packages;

pub use packages::{PackageManager, PackageSelection, PackageTable};

use std::fmt;
use std::str::FromStr;
use sysinfo::System;

use crate::errors::{EnvError, Result};

/// Supported provisioning targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PlatformId {
    Debian,
    RedHat,
    Arch,
    FreeBsd,
    Windows64,
    Windows32,
    MacOsx,
}

impl PlatformId {
    pub const ALL: [PlatformId; 7] = [
        PlatformId::Debian,
        PlatformId::RedHat,
        PlatformId::Arch,
        PlatformId::FreeBsd,
        PlatformId::Windows64,
        PlatformId::Windows32,
        PlatformId::MacOsx,
    ];

    /// Detect the running host
    ///
    /// # Errors
    /// `UnsupportedPlatform` for unknown OS/distribution combinations
    pub fn detect() -> Result<Self> {
        let distribution = if std::env::consts::OS == "linux" {
            Some(System::distribution_id())
        } else {
            None
        };
        Self::from_parts(
            std::env::consts::OS,
            distribution.as_deref(),
            usize::BITS,
        )
    }

    /// Resolve from OS name, Linux distribution id and pointer width
    pub fn from_parts(os: &str, distribution: Option<&str>, bits: u32) -> Result<Self> {
        match os {
            "linux" => {
                let distro = distribution.unwrap_or_default().to_lowercase();
                match distro.as_str() {
                    "debian" | "ubuntu" | "linuxmint" | "raspbian" | "pop" | "elementary"
                    | "kali" | "astra" => Ok(PlatformId::Debian),
                    "rhel" | "centos" | "fedora" | "rocky" | "almalinux" | "ol" | "amzn" => {
                        Ok(PlatformId::RedHat)
                    }
                    "arch" | "manjaro" | "endeavouros" => Ok(PlatformId::Arch),
                    _ => Err(EnvError::UnsupportedPlatform(format!("linux/{}", distro))),
                }
            }
            "freebsd" => Ok(PlatformId::FreeBsd),
            "macos" => Ok(PlatformId::MacOsx),
            "windows" => match bits {
                64 => Ok(PlatformId::Windows64),
                32 => Ok(PlatformId::Windows32),
                other => Err(EnvError::UnsupportedPlatform(format!("windows/{}-bit", other))),
            },
            other => Err(EnvError::UnsupportedPlatform(other.to_string())),
        }
    }

    /// Static package table
    pub fn packages(&self) -> &'static PackageTable {
        match self {
            PlatformId::Debian => &packages::DEBIAN,
            PlatformId::RedHat => &packages::REDHAT,
            PlatformId::Arch => &packages::ARCH,
            PlatformId::FreeBsd => &packages::FREEBSD,
            PlatformId::Windows64 => &packages::WINDOWS64,
            PlatformId::Windows32 => &packages::WINDOWS32,
            PlatformId::MacOsx => &packages::MACOSX,
        }
    }

    pub fn package_manager(&self) -> PackageManager {
        PackageManager::for_platform(*self)
    }

    pub fn is_linux(&self) -> bool {
        matches!(self, PlatformId::Debian | PlatformId::RedHat | PlatformId::Arch)
    }

    pub fn name(&self) -> &'static str {
        match self {
            PlatformId::Debian => "debian",
            PlatformId::RedHat => "redhat",
            PlatformId::Arch => "arch",
            PlatformId::FreeBsd => "freebsd",
            PlatformId::Windows64 => "windows64",
            PlatformId::Windows32 => "windows32",
            PlatformId::MacOsx => "macosx",
        }
    }
}

impl fmt::Display for PlatformId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for PlatformId {
    type Err = EnvError;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.to_lowercase();
        PlatformId::ALL
            .iter()
            .copied()
            .find(|p| p.name() == wanted)
            .ok_or_else(|| EnvError::UnsupportedPlatform(s.to_string()))
    }
}
