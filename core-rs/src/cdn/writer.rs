/**
 * writer.rs
 * Writes rendered configs without clobbering existing ones
 *
 * Layout:
 * - <available_dir>/<filename>   site file
 * - <enabled_dir>/<filename>     copy of, or symlink to, the site file
 * - <descriptor_dir>/<filename>  service descriptor
 *
 * An existing file at any destination is a ConfigCollision. Both site paths
 * are checked before anything is written.
 */

use serde::{Deserialize, Serialize};
use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::cdn::render::RenderedConfig;
use crate::errors::{EnvError, Result};

pub const NGINX_SITES_AVAILABLE_DIR: &str = "/etc/nginx/sites-available";
pub const NGINX_SITES_ENABLED_DIR: &str = "/etc/nginx/sites-enabled";
pub const DESCRIPTOR_DIR: &str = "/etc";

/// How a site is enabled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnableMode {
    /// Write a second copy of the file
    #[default]
    Copy,
    /// Symlink sites-enabled/<file> to sites-available/<file>
    Symlink,
}

/// Paths written for one site
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrittenSite {
    pub available: PathBuf,
    pub enabled: PathBuf,
}

/// Config file writer
#[derive(Debug, Clone)]
pub struct ConfigWriter {
    available_dir: PathBuf,
    enabled_dir: PathBuf,
    descriptor_dir: PathBuf,
    enable_mode: EnableMode,
}

impl Default for ConfigWriter {
    fn default() -> Self {
        Self::new(
            NGINX_SITES_AVAILABLE_DIR,
            NGINX_SITES_ENABLED_DIR,
            DESCRIPTOR_DIR,
            EnableMode::Copy,
        )
    }
}

impl ConfigWriter {
    pub fn new<P: AsRef<Path>>(
        available_dir: P,
        enabled_dir: P,
        descriptor_dir: P,
        enable_mode: EnableMode,
    ) -> Self {
        Self {
            available_dir: available_dir.as_ref().to_path_buf(),
            enabled_dir: enabled_dir.as_ref().to_path_buf(),
            descriptor_dir: descriptor_dir.as_ref().to_path_buf(),
            enable_mode,
        }
    }

    pub fn available_path(&self, filename: &str) -> PathBuf {
        self.available_dir.join(filename)
    }

    pub fn enabled_path(&self, filename: &str) -> PathBuf {
        self.enabled_dir.join(filename)
    }

    pub fn descriptor_path(&self, filename: &str) -> PathBuf {
        self.descriptor_dir.join(filename)
    }

    /// Destinations that already exist for a site file
    pub fn site_collisions(&self, filename: &str) -> Vec<PathBuf> {
        [self.available_path(filename), self.enabled_path(filename)]
            .into_iter()
            .filter(|p| p.symlink_metadata().is_ok())
            .collect()
    }

    /// The descriptor path if something already exists there
    pub fn descriptor_collision(&self, filename: &str) -> Option<PathBuf> {
        let path = self.descriptor_path(filename);
        path.symlink_metadata().is_ok().then_some(path)
    }

    /// Write a site file to sites-available and enable it
    ///
    /// # Errors
    /// `ConfigCollision` if either destination exists; nothing is written
    pub fn write_site(&self, rendered: &RenderedConfig) -> Result<WrittenSite> {
        let available = self.available_path(&rendered.filename);
        let enabled = self.enabled_path(&rendered.filename);

        if let Some(existing) = self.site_collisions(&rendered.filename).into_iter().next() {
            return Err(EnvError::ConfigCollision(existing.display().to_string()));
        }

        write_new(&available, &rendered.contents)?;

        let enabled_result = match self.enable_mode {
            EnableMode::Copy => write_new(&enabled, &rendered.contents),
            EnableMode::Symlink => symlink(&available, &enabled),
        };

        if let Err(e) = enabled_result {
            warn!(path = %available.display(), "enabling site failed, removing available copy");
            if let Err(cleanup) = fs::remove_file(&available) {
                warn!(path = %available.display(), error = %cleanup, "cleanup failed");
            }
            return Err(e);
        }

        info!(available = %available.display(), enabled = %enabled.display(), "site written");
        Ok(WrittenSite { available, enabled })
    }

    /// Write the service descriptor
    ///
    /// # Errors
    /// `ConfigCollision` if the descriptor already exists
    pub fn write_descriptor(&self, rendered: &RenderedConfig) -> Result<PathBuf> {
        let path = self.descriptor_path(&rendered.filename);
        write_new(&path, &rendered.contents)?;
        info!(path = %path.display(), "service descriptor written");
        Ok(path)
    }
}

/// Create `path` and write `contents`; an existing file is a collision
fn write_new(path: &Path, contents: &str) -> Result<()> {
    let mut file = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .map_err(|e| match e.kind() {
            ErrorKind::AlreadyExists => EnvError::ConfigCollision(path.display().to_string()),
            _ => EnvError::Io(e),
        })?;

    if let Err(e) = file.write_all(contents.as_bytes()).and_then(|_| file.sync_all()) {
        drop(file);
        fs::remove_file(path).ok();
        return Err(EnvError::Io(e));
    }
    Ok(())
}

#[cfg(unix)]
fn symlink(target: &Path, link: &Path) -> Result<()> {
    std::os::unix::fs::symlink(target, link).map_err(|e| match e.kind() {
        ErrorKind::AlreadyExists => EnvError::ConfigCollision(link.display().to_string()),
        _ => EnvError::Io(e),
    })
}

#[cfg(not(unix))]
fn symlink(target: &Path, link: &Path) -> Result<()> {
    let contents = fs::read_to_string(target)?;
    write_new(link, &contents)
}
