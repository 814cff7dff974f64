/**
 * config.rs
 * Optional YAML configuration file
 *
 * Format:
 * ```yaml
 * cdn:
 *   availableDir: /etc/nginx/sites-available
 *   enabledDir: /etc/nginx/sites-enabled
 *   descriptorDir: /etc
 *   enableMode: symlink
 *   scanRange: { start: 8000, end: 9000 }
 *   probe: connect
 *   probeTimeoutMs: 250
 *   groups:
 *     - name: hls
 *       nodesKey: hls_nodes
 *       filename: fastocloud_hls
 *       ...
 * provision:
 *   prefix: /opt/fastocloud
 *   buildDir: /var/tmp/fastocloud-build
 *   jobs: 8
 *   versions: { gstreamer: 1.22.10 }
 *   components: { opencv: true }
 * plugins:
 *   pluginPath: [/opt/gst/lib/gstreamer-1.0]
 * ```
 *
 * Every section and field is optional. Command line flags win over the file.
 */

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::cdn::group::{default_groups, validate_groups, ServiceGroup};
use crate::cdn::writer::{EnableMode, DESCRIPTOR_DIR, NGINX_SITES_AVAILABLE_DIR, NGINX_SITES_ENABLED_DIR};
use crate::errors::{EnvError, Result};
use crate::port::allocator::ScanRange;
use crate::port::probe::{ProbeMethod, DEFAULT_PROBE_TIMEOUT_MS};
use crate::provision::catalog::{ComponentFlags, MediaVersions};
use crate::provision::executor::DEFAULT_PREFIX;

/// Top-level configuration file
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct EnvConfig {
    pub cdn: CdnConfig,
    pub provision: ProvisionConfig,
    pub plugins: PluginsConfig,
}

/// Where CDN configs go and how ports are found
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct CdnConfig {
    pub available_dir: PathBuf,
    pub enabled_dir: PathBuf,
    pub descriptor_dir: PathBuf,
    pub enable_mode: EnableMode,
    pub scan_range: ScanRange,
    pub probe: ProbeMethod,
    pub probe_timeout_ms: u64,
    /// Replaces the default hls/vods/cods set when present
    pub groups: Vec<ServiceGroup>,
    /// Custom descriptor template instead of the built-in one
    pub descriptor_template: Option<PathBuf>,
}

impl Default for CdnConfig {
    fn default() -> Self {
        Self {
            available_dir: PathBuf::from(NGINX_SITES_AVAILABLE_DIR),
            enabled_dir: PathBuf::from(NGINX_SITES_ENABLED_DIR),
            descriptor_dir: PathBuf::from(DESCRIPTOR_DIR),
            enable_mode: EnableMode::Copy,
            scan_range: ScanRange::default(),
            probe: ProbeMethod::Connect,
            probe_timeout_ms: DEFAULT_PROBE_TIMEOUT_MS,
            groups: default_groups(),
            descriptor_template: None,
        }
    }
}

/// Build locations and component selection
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct ProvisionConfig {
    pub prefix: PathBuf,
    pub build_dir: PathBuf,
    /// Parallel build jobs, 0 = number of CPUs
    pub jobs: usize,
    pub versions: MediaVersions,
    pub components: ComponentFlags,
    /// Directory holding gst-plugins-base.patch and gst-plugins-bad.patch
    pub patch_dir: PathBuf,
    /// Bundled nginx site files installed with nginx
    pub nginx_dir: Option<PathBuf>,
}

impl Default for ProvisionConfig {
    fn default() -> Self {
        Self {
            prefix: PathBuf::from(DEFAULT_PREFIX),
            build_dir: PathBuf::from("build_env"),
            jobs: 0,
            versions: MediaVersions::default(),
            components: ComponentFlags::default(),
            patch_dir: PathBuf::from("fastogt_patch"),
            nginx_dir: None,
        }
    }
}

/// Extra search paths for gst-inspect
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct PluginsConfig {
    pub plugin_path: Vec<PathBuf>,
    pub library_path: Vec<PathBuf>,
}

impl EnvConfig {
    /// Load configuration from a YAML file
    ///
    /// # Arguments
    /// * `path` - Path to the YAML file
    ///
    /// # Returns
    /// Parsed and validated configuration
    ///
    /// # Errors
    /// Missing file, invalid YAML, or invalid values (empty scan range,
    /// duplicate service groups)
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        let content = fs::read_to_string(path).map_err(|e| {
            EnvError::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;

        let config: EnvConfig = serde_yaml::from_str(&content).map_err(|e| {
            EnvError::Config(format!("Invalid YAML in {}: {}", path.display(), e))
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Load `path` if given, defaults otherwise
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    pub fn validate(&self) -> Result<()> {
        let range = self.cdn.scan_range;
        ScanRange::new(range.start, range.end)?;
        validate_groups(&self.cdn.groups)?;
        Ok(())
    }
}
