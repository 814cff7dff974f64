/**
 * component.rs
 * Declarative third-party component descriptors
 *
 * A component says where its sources come from and which build system
 * drives it. The same executor handles every component:
 *
 *   fetch → patch → configure → build/install
 *
 * Driver command lines (prefix = install prefix, src = source dir):
 * - Autotools:   ./configure --prefix=<prefix> <args>; make -j<jobs> install
 * - Bootstrap:   sh <script>; then Autotools
 * - Meson:       meson setup build_meson --prefix=<prefix> <args>; ninja -C build_meson install
 * - MesonSystem: as Meson with --prefix=/usr
 * - Cmake:       cmake -S . -B build_cmake -DCMAKE_INSTALL_PREFIX=<prefix> -DCMAKE_BUILD_TYPE=RELEASE <args>;
 *                cmake --build build_cmake --target install -j<jobs>
 * - CargoC:      cargo cinstall -p <package> --release --prefix=<prefix> <args> (per package)
 */

use std::path::{Path, PathBuf};

use crate::provision::runner::ExternalCommand;

/// Source location
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fetch {
    /// Release tarball
    Archive { url: String },
    /// Git repository, optional branch or tag
    Git { url: String, branch: Option<String> },
    /// Already unpacked source tree
    Local { path: PathBuf },
}

impl Fetch {
    pub fn archive(url: impl Into<String>) -> Self {
        Fetch::Archive { url: url.into() }
    }

    pub fn git(url: impl Into<String>) -> Self {
        Fetch::Git {
            url: url.into(),
            branch: None,
        }
    }

    pub fn git_branch(url: impl Into<String>, branch: impl Into<String>) -> Self {
        Fetch::Git {
            url: url.into(),
            branch: Some(branch.into()),
        }
    }

    /// Remote location, `None` for local trees
    pub fn url(&self) -> Option<&str> {
        match self {
            Fetch::Archive { url } | Fetch::Git { url, .. } => Some(url),
            Fetch::Local { .. } => None,
        }
    }
}

/// Build system driving a component
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildDriver {
    Autotools,
    /// Generates `configure` first (`bootstrap`, `autogen.sh`)
    Bootstrap { script: String },
    Meson,
    /// Meson installing into /usr regardless of prefix (VA-API stack)
    MesonSystem,
    Cmake,
    CargoC { packages: Vec<String> },
}

/// One buildable third-party component
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Component {
    pub name: String,
    pub fetch: Fetch,
    pub driver: BuildDriver,
    pub args: Vec<String>,
    /// Patch files applied with `patch -p1` before configuring
    pub patches: Vec<PathBuf>,
    pub enabled: bool,
}

impl Component {
    pub fn new(name: impl Into<String>, fetch: Fetch, driver: BuildDriver) -> Self {
        Self {
            name: name.into(),
            fetch,
            driver,
            args: Vec::new(),
            patches: Vec::new(),
            enabled: true,
        }
    }

    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn with_patch(mut self, patch: impl Into<PathBuf>) -> Self {
        self.patches.push(patch.into());
        self
    }

    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Commands building and installing the component from `src`
    pub fn build_commands(&self, src: &Path, prefix: &Path, jobs: usize) -> Vec<ExternalCommand> {
        let prefix_arg = |flag: &str, p: &Path| format!("{}{}", flag, p.display());
        let jobs_arg = format!("-j{}", jobs.max(1));

        match &self.driver {
            BuildDriver::Autotools => autotools(src, prefix, &self.args, &jobs_arg),
            BuildDriver::Bootstrap { script } => {
                let mut commands = vec![ExternalCommand::new("sh").arg(script.as_str()).current_dir(src)];
                commands.extend(autotools(src, prefix, &self.args, &jobs_arg));
                commands
            }
            BuildDriver::Meson | BuildDriver::MesonSystem => {
                let prefix = if self.driver == BuildDriver::MesonSystem {
                    Path::new("/usr")
                } else {
                    prefix
                };
                vec![
                    ExternalCommand::new("meson")
                        .args(["setup", "build_meson"])
                        .arg(prefix_arg("--prefix=", prefix))
                        .args(self.args.iter().cloned())
                        .current_dir(src),
                    ExternalCommand::new("ninja")
                        .args(["-C", "build_meson", "install"])
                        .current_dir(src),
                ]
            }
            BuildDriver::Cmake => vec![
                ExternalCommand::new("cmake")
                    .args(["-S", ".", "-B", "build_cmake"])
                    .arg(prefix_arg("-DCMAKE_INSTALL_PREFIX=", prefix))
                    .arg("-DCMAKE_BUILD_TYPE=RELEASE")
                    .args(self.args.iter().cloned())
                    .current_dir(src),
                ExternalCommand::new("cmake")
                    .args(["--build", "build_cmake", "--target", "install"])
                    .arg(jobs_arg)
                    .current_dir(src),
            ],
            BuildDriver::CargoC { packages } => packages
                .iter()
                .map(|package| {
                    ExternalCommand::new("cargo")
                        .args(["cinstall", "-p", package.as_str(), "--release"])
                        .arg(prefix_arg("--prefix=", prefix))
                        .args(self.args.iter().cloned())
                        .current_dir(src)
                })
                .collect(),
        }
    }
}

fn autotools(src: &Path, prefix: &Path, args: &[String], jobs_arg: &str) -> Vec<ExternalCommand> {
    vec![
        ExternalCommand::new("sh")
            .arg("configure")
            .arg(format!("--prefix={}", prefix.display()))
            .args(args.iter().cloned())
            .current_dir(src),
        ExternalCommand::new("make")
            .args([jobs_arg, "install"])
            .current_dir(src),
    ]
}
