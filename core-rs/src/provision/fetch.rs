//! Source acquisition
//!
//! Archives are downloaded over HTTP and unpacked into the build directory;
//! gzip tarballs are extracted in-process, anything else (`.tar.xz`) goes
//! through the system `tar`. Git sources are shallow clones.

use flate2::read::GzDecoder;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tar::Archive;
use tracing::{debug, info};

use crate::errors::{EnvError, Result};
use crate::provision::component::{Component, Fetch};
use crate::provision::runner::{run_checked, CommandRunner, ExternalCommand};

/// Downloads a URL into a local file
pub trait Downloader {
    fn download(&self, url: &str, dest: &Path) -> Result<()>;
}

/// Blocking HTTP(S) downloader
#[derive(Debug, Clone)]
pub struct HttpDownloader {
    timeout: Option<Duration>,
}

impl HttpDownloader {
    pub fn new(timeout: Option<Duration>) -> Self {
        Self { timeout }
    }
}

impl Default for HttpDownloader {
    fn default() -> Self {
        Self::new(Some(Duration::from_secs(600)))
    }
}

impl Downloader for HttpDownloader {
    fn download(&self, url: &str, dest: &Path) -> Result<()> {
        info!(url, dest = %dest.display(), "downloading");

        let mut builder = reqwest::blocking::Client::builder();
        if let Some(timeout) = self.timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build()?;

        let mut response = client.get(url).send()?.error_for_status()?;
        let mut file = File::create(dest)?;
        let bytes = response.copy_to(&mut file)?;

        debug!(url, bytes, "download complete");
        Ok(())
    }
}

/// Puts component sources on disk
pub struct SourceFetcher<'a, R: CommandRunner + ?Sized, D: Downloader + ?Sized> {
    runner: &'a R,
    downloader: &'a D,
    build_dir: PathBuf,
}

impl<'a, R: CommandRunner + ?Sized, D: Downloader + ?Sized> SourceFetcher<'a, R, D> {
    pub fn new(runner: &'a R, downloader: &'a D, build_dir: impl Into<PathBuf>) -> Self {
        Self {
            runner,
            downloader,
            build_dir: build_dir.into(),
        }
    }

    /// Fetch the sources of `component`
    ///
    /// # Returns
    /// The source root to build in
    ///
    /// # Errors
    /// Download, extraction or clone failures; a missing local tree
    pub fn fetch(&self, component: &Component) -> Result<PathBuf> {
        fs::create_dir_all(&self.build_dir)?;

        match &component.fetch {
            Fetch::Local { path } => {
                if !path.is_dir() {
                    return Err(EnvError::Io(std::io::Error::new(
                        std::io::ErrorKind::NotFound,
                        format!("Source tree not found: {}", path.display()),
                    )));
                }
                Ok(path.clone())
            }
            Fetch::Git { url, branch } => {
                let dest = self.build_dir.join(&component.name);
                if dest.exists() {
                    fs::remove_dir_all(&dest)?;
                }

                let mut clone = ExternalCommand::new("git").args(["clone", "--depth", "1"]);
                if let Some(branch) = branch {
                    clone = clone.args(["--branch", branch.as_str()]);
                }
                let clone = clone
                    .arg(url.as_str())
                    .arg(dest.display().to_string())
                    .current_dir(&self.build_dir);
                run_checked(self.runner, &clone)?;
                Ok(dest)
            }
            Fetch::Archive { url } => {
                let file_name = archive_file_name(url)?;
                let archive_path = self.build_dir.join(&file_name);
                self.downloader.download(url, &archive_path)?;

                let unpack_dir = self.build_dir.join(format!("{}-src", component.name));
                if unpack_dir.exists() {
                    fs::remove_dir_all(&unpack_dir)?;
                }
                fs::create_dir_all(&unpack_dir)?;

                if is_gzip_tarball(&file_name) {
                    extract_tar_gz(&archive_path, &unpack_dir)?;
                } else {
                    let untar = ExternalCommand::new("tar")
                        .arg("-xf")
                        .arg(archive_path.display().to_string())
                        .arg("-C")
                        .arg(unpack_dir.display().to_string());
                    run_checked(self.runner, &untar)?;
                }

                source_root(&unpack_dir)
            }
        }
    }
}

fn archive_file_name(url: &str) -> Result<String> {
    url.trim_end_matches('/')
        .rsplit('/')
        .next()
        .filter(|name| !name.is_empty() && !name.contains(':'))
        .map(str::to_string)
        .ok_or_else(|| EnvError::Download(format!("Cannot derive archive name from {}", url)))
}

fn is_gzip_tarball(file_name: &str) -> bool {
    file_name.ends_with(".tar.gz") || file_name.ends_with(".tgz")
}

/// Extract tar.gz to target directory
pub fn extract_tar_gz(tarball_path: &Path, target_dir: &Path) -> Result<()> {
    let tar_gz = File::open(tarball_path).map_err(|e| {
        EnvError::Io(std::io::Error::new(
            e.kind(),
            format!("Failed to open tarball {}: {}", tarball_path.display(), e),
        ))
    })?;

    let mut archive = Archive::new(GzDecoder::new(tar_gz));
    archive.unpack(target_dir).map_err(|e| {
        EnvError::Io(std::io::Error::new(
            e.kind(),
            format!("Failed to extract {}: {}", tarball_path.display(), e),
        ))
    })?;

    Ok(())
}

/// Release tarballs wrap everything in one top-level directory
fn source_root(unpack_dir: &Path) -> Result<PathBuf> {
    let entries: Vec<PathBuf> = fs::read_dir(unpack_dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .collect();

    match entries.as_slice() {
        [single] if single.is_dir() => Ok(single.clone()),
        _ => Ok(unpack_dir.to_path_buf()),
    }
}
