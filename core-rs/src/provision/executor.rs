/**
 * executor.rs
 * Environment provisioning
 *
 * Steps, each optional from the command line:
 *
 *   system packages → tools → nginx → components (fetch, patch, build)
 *
 * Every external step goes through the CommandRunner so a dry run prints
 * the exact command sequence. The first failing step aborts; nothing is
 * retried.
 */

use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::errors::Result;
use crate::platform::{PackageSelection, PlatformId};
use crate::provision::component::Component;
use crate::provision::fetch::{Downloader, HttpDownloader, SourceFetcher};
use crate::provision::runner::{run_checked, CommandRunner, ExternalCommand};

pub const DEFAULT_HOSTNAME: &str = "fastocloud.com";
pub const DEFAULT_PREFIX: &str = "/usr/local";
pub const CARGO_C_VERSION: &str = "0.9.21";
const RUSTUP_INSTALL: &str = "curl --proto '=https' --tlsv1.2 -sSf https://sh.rustup.rs | sh -s -- -y";

/// Where and how components get built
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvisionOptions {
    pub prefix: PathBuf,
    pub build_dir: PathBuf,
    pub jobs: usize,
    /// Log instead of fetching, writing or running anything
    pub dry_run: bool,
    /// Bundled nginx site files copied after installing nginx
    pub nginx_dir: Option<PathBuf>,
    pub sites_enabled: PathBuf,
    pub hostname_file: PathBuf,
}

impl Default for ProvisionOptions {
    fn default() -> Self {
        Self {
            prefix: PathBuf::from(DEFAULT_PREFIX),
            build_dir: PathBuf::from("build_env"),
            jobs: std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1),
            dry_run: false,
            nginx_dir: None,
            sites_enabled: PathBuf::from(crate::cdn::writer::NGINX_SITES_ENABLED_DIR),
            hostname_file: PathBuf::from("/etc/hostname"),
        }
    }
}

/// Runs provisioning steps for one platform
pub struct Provisioner<R: CommandRunner, D: Downloader = HttpDownloader> {
    platform: PlatformId,
    runner: R,
    downloader: D,
    options: ProvisionOptions,
}

impl<R: CommandRunner> Provisioner<R, HttpDownloader> {
    pub fn new(platform: PlatformId, runner: R, options: ProvisionOptions) -> Self {
        Self::with_downloader(platform, runner, HttpDownloader::default(), options)
    }
}

impl<R: CommandRunner, D: Downloader> Provisioner<R, D> {
    pub fn with_downloader(platform: PlatformId, runner: R, downloader: D, options: ProvisionOptions) -> Self {
        Self {
            platform,
            runner,
            downloader,
            options,
        }
    }

    pub fn platform(&self) -> PlatformId {
        self.platform
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    pub fn options(&self) -> &ProvisionOptions {
        &self.options
    }

    /// Regenerate the dbus machine id inside fresh containers
    pub fn prepare_docker(&self) -> Result<()> {
        run_checked(&self.runner, &ExternalCommand::new("dbus-uuidgen").arg("--ensure"))
    }

    /// Install the platform's system packages one by one
    ///
    /// Post-install fixups run afterwards: RHEL ships `ninja-build` under a
    /// different name, FreeBSD needs a dbus machine id.
    ///
    /// # Errors
    /// The first package that fails to install
    pub fn install_packages(&self, selection: &PackageSelection) -> Result<()> {
        let manager = self.platform.package_manager();
        let packages = self.platform.packages().select(selection);
        info!(platform = %self.platform, count = packages.len(), "installing system packages");

        if let Some(refresh) = manager.refresh_command() {
            run_checked(&self.runner, &refresh)?;
        }
        for package in packages {
            run_checked(&self.runner, &manager.install_command(package))?;
        }

        match self.platform {
            PlatformId::RedHat => run_checked(
                &self.runner,
                &ExternalCommand::new("ln").args(["-sf", "/usr/bin/ninja-build", "/usr/bin/ninja"]),
            ),
            PlatformId::FreeBsd => self.prepare_docker(),
            _ => Ok(()),
        }
    }

    /// Rust toolchain plus pip/cargo tools used by the build and the streamer
    pub fn install_tools(&self, meson_version: &str) -> Result<()> {
        info!("installing tools");
        let steps = [
            ExternalCommand::new("sh").args(["-c", RUSTUP_INSTALL]),
            ExternalCommand::new("pip3").args(["install", "speedtest-cli"]),
            ExternalCommand::new("pip3").args(["install".to_string(), format!("meson=={}", meson_version)]),
            ExternalCommand::new("cargo").args(["install", "--version", CARGO_C_VERSION, "cargo-c"]),
        ];
        for step in &steps {
            run_checked(&self.runner, step)?;
        }
        Ok(())
    }

    /// Install nginx and, on Linux, drop the bundled site files into sites-enabled
    pub fn install_nginx(&self) -> Result<()> {
        let manager = self.platform.package_manager();
        run_checked(&self.runner, &manager.install_command("nginx"))?;

        if !self.platform.is_linux() {
            return Ok(());
        }
        let Some(src) = &self.options.nginx_dir else {
            debug!("no bundled nginx site files configured");
            return Ok(());
        };

        for entry in fs::read_dir(src)? {
            let path = entry?.path();
            if !path.is_file() {
                continue;
            }
            let Some(name) = path.file_name() else { continue };
            let dest = self.options.sites_enabled.join(name);
            if self.options.dry_run {
                info!(from = %path.display(), to = %dest.display(), "dry run: copy");
                continue;
            }
            fs::copy(&path, &dest)?;
            info!(file = %dest.display(), "installed nginx site");
        }
        Ok(())
    }

    /// Persist the hostname (Linux only)
    pub fn set_hostname(&self, hostname: &str) -> Result<()> {
        if !self.platform.is_linux() {
            warn!(platform = %self.platform, "hostname is only managed on Linux");
            return Ok(());
        }
        if self.options.dry_run {
            info!(hostname, file = %self.options.hostname_file.display(), "dry run: set hostname");
            return Ok(());
        }
        fs::write(&self.options.hostname_file, hostname)?;
        info!(hostname, "hostname set");
        Ok(())
    }

    /// Fetch, patch, configure and install one component
    ///
    /// # Errors
    /// Fetch failures or the first failing patch/build command
    pub fn build(&self, component: &Component) -> Result<()> {
        info!(component = %component.name, "building");

        let src = if self.options.dry_run {
            info!(component = %component.name, fetch = ?component.fetch, "dry run: fetch");
            self.options.build_dir.join(&component.name)
        } else {
            SourceFetcher::new(&self.runner, &self.downloader, &self.options.build_dir).fetch(component)?
        };

        for patch in &component.patches {
            apply_patch(&self.runner, &src, patch)?;
        }
        for command in component.build_commands(&src, &self.options.prefix, self.options.jobs) {
            run_checked(&self.runner, &command)?;
        }

        info!(component = %component.name, "installed");
        Ok(())
    }

    /// Build every enabled component in order
    ///
    /// # Returns
    /// Number of components built
    pub fn build_all(&self, components: &[Component]) -> Result<usize> {
        let mut built = 0;
        for component in components {
            if !component.enabled {
                debug!(component = %component.name, "skipped");
                continue;
            }
            self.build(component)?;
            built += 1;
        }
        Ok(built)
    }
}

fn apply_patch<R: CommandRunner + ?Sized>(runner: &R, src: &Path, patch: &Path) -> Result<()> {
    let command = ExternalCommand::new("patch")
        .args(["-p1", "-i"])
        .arg(patch.display().to_string())
        .current_dir(src);
    run_checked(runner, &command)
}
