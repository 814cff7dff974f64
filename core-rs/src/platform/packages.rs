/**
 * packages.rs
 * System package tables per platform
 *
 * Every platform has the same shape of data; only the names differ.
 * PackageSelection picks which lists end up in the install set.
 */

use serde::{Deserialize, Serialize};

use crate::platform::PlatformId;
use crate::provision::runner::ExternalCommand;

/// Package names for one platform
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PackageTable {
    pub required_exec: &'static [&'static str],
    pub build_exec: &'static [&'static str],
    pub build_gst_exec: &'static [&'static str],
    pub nvidia: &'static [&'static str],
    pub wpe: &'static [&'static str],
    pub mongo: &'static [&'static str],
    /// Libraries needed to build GStreamer from source
    pub gst_build: &'static [&'static str],
    /// GStreamer from the distribution repositories
    pub gst_repo: &'static [&'static str],
}

/// Feature flags choosing package lists
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PackageSelection {
    pub with_nvidia: bool,
    pub with_wpe: bool,
    pub with_mongo: bool,
    pub with_gstreamer: bool,
    /// Take GStreamer from repositories instead of building it
    pub repo_build: bool,
}

impl Default for PackageSelection {
    fn default() -> Self {
        Self {
            with_nvidia: false,
            with_wpe: false,
            with_mongo: false,
            with_gstreamer: true,
            repo_build: false,
        }
    }
}

impl PackageTable {
    /// Ordered install set without duplicates
    pub fn select(&self, selection: &PackageSelection) -> Vec<&'static str> {
        let mut lists: Vec<&'static [&'static str]> = vec![self.required_exec, self.build_exec];

        if selection.with_gstreamer {
            lists.push(self.build_gst_exec);
            lists.push(if selection.repo_build {
                self.gst_repo
            } else {
                self.gst_build
            });
        }
        if selection.with_nvidia {
            lists.push(self.nvidia);
        }
        if selection.with_wpe {
            lists.push(self.wpe);
        }
        if selection.with_mongo {
            lists.push(self.mongo);
        }

        let mut packages: Vec<&'static str> = Vec::new();
        for name in lists.into_iter().flatten() {
            if !packages.contains(name) {
                packages.push(*name);
            }
        }
        packages
    }
}

/// Package manager front-ends
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackageManager {
    Apt,
    Yum,
    Pacman,
    Pkg,
    Msys,
    Brew,
}

impl PackageManager {
    pub fn for_platform(platform: PlatformId) -> Self {
        match platform {
            PlatformId::Debian => PackageManager::Apt,
            PlatformId::RedHat => PackageManager::Yum,
            PlatformId::Arch => PackageManager::Pacman,
            PlatformId::FreeBsd => PackageManager::Pkg,
            PlatformId::Windows64 | PlatformId::Windows32 => PackageManager::Msys,
            PlatformId::MacOsx => PackageManager::Brew,
        }
    }

    /// Index refresh run once before installing
    pub fn refresh_command(&self) -> Option<ExternalCommand> {
        match self {
            PackageManager::Apt => Some(ExternalCommand::new("apt-get").arg("update")),
            PackageManager::Yum => Some(ExternalCommand::new("yum").args(["makecache", "-y"])),
            PackageManager::Pacman | PackageManager::Msys => {
                Some(ExternalCommand::new("pacman").arg("-Sy"))
            }
            PackageManager::Pkg => Some(ExternalCommand::new("pkg").arg("update")),
            PackageManager::Brew => Some(ExternalCommand::new("brew").arg("update")),
        }
    }

    /// Install a single package
    pub fn install_command(&self, package: &str) -> ExternalCommand {
        match self {
            PackageManager::Apt => ExternalCommand::new("apt-get")
                .args(["install", "-y", "--no-install-recommends", package])
                .env("DEBIAN_FRONTEND", "noninteractive"),
            PackageManager::Yum => ExternalCommand::new("yum").args(["install", "-y", package]),
            PackageManager::Pacman | PackageManager::Msys => {
                ExternalCommand::new("pacman").args(["-S", "--noconfirm", "--needed", package])
            }
            PackageManager::Pkg => ExternalCommand::new("pkg").args(["install", "-y", package]),
            PackageManager::Brew => ExternalCommand::new("brew").args(["install", package]),
        }
    }
}

pub static DEBIAN: PackageTable = PackageTable {
    required_exec: &["git", "yasm", "nasm", "gcc", "g++", "make", "ninja-build", "python3-pip", "python3-dev"],
    build_exec: &["autoconf", "automake", "cmake", "libtool", "pkg-config", "libudev-dev", "libssl-dev", "unifdef"],
    build_gst_exec: &["gettext", "bison", "flex"],
    nvidia: &["nvidia-cuda-dev", "nvidia-cuda-toolkit", "libnvidia-ml-dev"],
    wpe: &[
        "libegl-dev", "libegl1-mesa-dev", "libxkbcommon-dev", "libwayland-dev", "libepoxy-dev", "ruby",
        "libgcrypt20-dev", "libwebp-dev", "libxslt1-dev", "libsystemd-dev", "libcurl4-openssl-dev",
        "libgudev-1.0-dev", "libgbm-dev", "gperf", "wayland-protocols",
    ],
    mongo: &["libmongoc-dev"],
    gst_build: &[
        "libmount-dev", "libglib2.0-dev", "glib-networking", "libdrm-dev", "libproxy-dev", "libpciaccess-dev",
        "libxfixes-dev", "libblkid-dev", "libsoup2.4-dev", "libsoup-3.0-dev", "libjpeg-dev", "librtmp-dev",
        "libasound2-dev", "libx264-dev", "libx265-dev", "libfaad-dev", "libmp3lame-dev", "libvpx-dev",
        "libxcb-dri3-dev", "libopus-dev", "libvo-aacenc-dev", "libgdk-pixbuf2.0-dev", "libpango1.0-dev",
        "librsvg2-dev", "libpulse-dev", "libsrtp2-dev", "zlib1g-dev", "libbz2-dev",
    ],
    gst_repo: &[
        "libgstreamer1.0-dev", "libgstreamer-plugins-base1.0-dev", "libgstreamer-plugins-good1.0-dev",
        "libgstreamer-plugins-bad1.0-dev", "libgstrtspserver-1.0-dev", "gstreamer1.0-tools",
        "gstreamer1.0-plugins-base", "gstreamer1.0-plugins-good", "gstreamer1.0-plugins-bad",
        "gstreamer1.0-plugins-ugly", "gstreamer1.0-libav", "gstreamer1.0-nice", "gstreamer1.0-rtsp",
    ],
};

pub static REDHAT: PackageTable = PackageTable {
    required_exec: &["git", "yasm", "nasm", "gcc", "gcc-c++", "make", "ninja-build", "python3-pip", "python3-devel"],
    build_exec: &["autoconf", "automake", "libtool", "pkgconfig", "libudev-devel", "openssl-devel"],
    build_gst_exec: &["gettext", "bison", "flex"],
    nvidia: &[],
    wpe: &[],
    mongo: &["mongo-c-driver-devel"],
    gst_build: &[
        "libmount-devel", "glib2-devel", "glib-networking", "libdrm-devel", "libproxy-devel",
        "libpciaccess-devel", "libXfixes-devel", "librtmp-devel", "libsoup-devel", "libx264-devel",
        "libx265-devel", "alsa-lib-devel", "lame-devel", "libvpx-devel", "libopus-devel", "libvo-aacenc-devel",
        "libjpeg-turbo-devel", "gdk-pixbuf2-devel", "libpango-devel", "librsvg2-dev", "pulseaudio-libs-devel",
        "libsrtp2-devel", "libxcb-devel", "zlib-devel",
    ],
    gst_repo: &[
        "gstreamer1", "gstreamer1-plugins-base", "gstreamer1-plugins-good", "gstreamer1-plugins-bad-free",
        "gstreamer1-plugins-ugly-free", "gstreamer1-libav", "gstreamer1-nice", "gstreamer1-rtsp-server",
    ],
};

pub static ARCH: PackageTable = PackageTable {
    required_exec: &["git", "yasm", "nasm", "gcc", "make", "ninja", "python3-pip", "python3-dev"],
    build_exec: &["autoconf", "automake", "libtool", "pkgconfig", "udev", "openssl"],
    build_gst_exec: &["gettext", "bison", "flex"],
    nvidia: &[],
    wpe: &[],
    mongo: &["libmongoc"],
    gst_build: &[
        "libutil-linux", "glibc", "glib-networking", "libdrm", "libproxy", "rtmpdump", "libsoup", "x264",
        "x265", "alsa-lib", "lame", "libjpeg", "gdk-pixbuf2", "vpx", "opus", "ocaml-voaacenc", "srtp2", "zlib",
    ],
    gst_repo: &[
        "gstreamer", "gstreamer-plugins-base", "gstreamer-plugins-good", "gstreamer-plugins-bad",
        "gstreamer-plugins-ugly", "gstreamer-libav", "gstreamer-nice", "gstreamer-rtsp-server",
    ],
};

pub static FREEBSD: PackageTable = PackageTable {
    required_exec: &["git", "yasm", "nasm", "gcc", "make", "ninja", "python3-pip", "python3-devel", "dbus"],
    build_exec: &["autoconf", "automake", "libtool", "pkgconf", "libudev-devd", "openssl"],
    build_gst_exec: &["gettext", "bison", "flex"],
    nvidia: &[],
    wpe: &[],
    mongo: &["libmongoc"],
    gst_build: &[
        "glib2-devel", "glib-networking", "libdrm", "libproxy", "librtmp", "libsoup", "libx264", "libx265",
        "alsa-lib", "libjpeg-turbo", "libopus", "libvoaac", "libvpx", "libxcb", "lsrtp2", "lzlib", "gdk-pixbuf2",
    ],
    gst_repo: &[
        "gstreamer1", "gstreamer1-plugins-base", "gstreamer1-plugins-good", "gstreamer1-plugins-bad",
        "gstreamer1-plugins-ugly", "gstreamer1-libav", "gstreamer1-nice", "gstreamer1-rtsp-server",
    ],
};

pub static WINDOWS64: PackageTable = PackageTable {
    required_exec: &[
        "git", "make", "autoconf", "automake", "libtool", "mingw-w64-x86_64-yasm", "mingw-w64-x86_64-nasm",
        "mingw-w64-x86_64-gcc", "mingw-w64-x86_64-ninja", "python3-pip",
    ],
    build_exec: &[],
    build_gst_exec: &["bison", "flex"],
    nvidia: &[],
    wpe: &[],
    mongo: &[],
    gst_build: &["mingw-w64-x86_64-glib2", "mingw-w64-x86_64-glib-networking"],
    gst_repo: &[
        "mingw-w64-x86_64-gstreamer", "mingw-w64-x86_64-gst-plugins-base", "mingw-w64-x86_64-gst-plugins-good",
        "mingw-w64-x86_64-gst-plugins-bad", "mingw-w64-x86_64-gst-plugins-ugly", "mingw-w64-x86_64-gst-libav",
        "mingw-w64-x86_64-libnice", "mingw-w64-x86_64-gst-rtsp-server",
    ],
};

pub static WINDOWS32: PackageTable = PackageTable {
    required_exec: &[
        "git", "make", "autoconf", "automake", "libtool", "mingw-w64-i686-yasm", "mingw-w64-i686-nasm",
        "mingw-w64-i686-gcc", "mingw-w64-i686-ninja", "python3-pip",
    ],
    build_exec: &[],
    build_gst_exec: &["bison", "flex"],
    nvidia: &[],
    wpe: &[],
    mongo: &[],
    gst_build: &["mingw-w64-i686-glib2", "mingw-w64-i686-glib-networking"],
    gst_repo: &[
        "mingw-w64-i686-gstreamer", "mingw-w64-i686-gst-plugins-base", "mingw-w64-i686-gst-plugins-good",
        "mingw-w64-i686-gst-plugins-bad", "mingw-w64-i686-gst-plugins-ugly", "mingw-w64-i686-gst-libav",
        "mingw-w64-i686-libnice", "mingw-w64-i686-gst-rtsp-server",
    ],
};

pub static MACOSX: PackageTable = PackageTable {
    required_exec: &["git", "yasm", "nasm", "make", "ninja", "python3-pip", "python3-devel"],
    build_exec: &["autoconf", "automake", "libtool", "pkgconfig"],
    build_gst_exec: &["gettext", "bison", "flex"],
    nvidia: &[],
    wpe: &[],
    mongo: &["libmongo"],
    gst_build: &["glib2-devel", "glib-networking"],
    gst_repo: &[
        "gstreamer1", "gstreamer1-plugins-base", "gstreamer1-plugins-good", "gstreamer1-plugins-bad",
        "gstreamer1-plugins-ugly", "gstreamer1-libav", "gstreamer1-nice", "gstreamer1-rtsp-server",
    ],
};
