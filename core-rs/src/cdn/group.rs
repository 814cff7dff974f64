/**
 * group.rs
 * CDN service groups
 *
 * A service group is one class of endpoint nginx fronts for the streamer:
 * - hls  → live HLS segments
 * - vods → video on demand
 * - cods → live channels on demand
 *
 * Every group gets its own site file with one server block per listener port.
 */

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

use crate::cdn::template::Template;
use crate::errors::{EnvError, Result};

/// Built-in per-port server block
pub const DEFAULT_SERVER_BLOCK: &str = include_str!("../../templates/server_block.in");

/// Service group definition
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ServiceGroup {
    /// Group name, unique within a run (e.g., "hls")
    pub name: String,
    /// Key of the group's node list in the service descriptor
    pub nodes_key: String,
    /// Site file name under sites-available / sites-enabled
    pub filename: String,
    /// Listener count for this group; falls back to the run-wide count
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connections: Option<usize>,
    /// Access log path, `${port}` is replaced per server block
    pub access_log: String,
    /// Error log path, `${port}` is replaced per server block
    pub error_log: String,
    /// URL prefix served by the group
    pub location: String,
    /// Directory the prefix maps to
    pub content_root: String,
    /// Custom server block template file
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server_block: Option<PathBuf>,
}

impl ServiceGroup {
    /// Group with the stock paths for a streamer content directory
    pub fn standard(name: &str) -> Self {
        Self {
            name: name.to_string(),
            nodes_key: format!("{}_nodes", name),
            filename: format!("fastocloud_{}", name),
            connections: None,
            access_log: format!("/var/log/nginx/fastocloud_{}_${{port}}_access.log", name),
            error_log: format!("/var/log/nginx/fastocloud_{}_${{port}}_error.log", name),
            location: format!("/fastocloud/{}/", name),
            content_root: format!("/home/fastocloud/streamer/{}/", name),
            server_block: None,
        }
    }

    /// Listener count requested for this group
    pub fn connection_count(&self, default_count: usize) -> usize {
        self.connections.unwrap_or(default_count)
    }

    /// Load the server block template (custom file or built-in)
    pub fn load_server_block(&self) -> Result<Template> {
        match &self.server_block {
            Some(path) => {
                let text = fs::read_to_string(path).map_err(|e| {
                    EnvError::Config(format!(
                        "Failed to read server block template {}: {}",
                        path.display(),
                        e
                    ))
                })?;
                Ok(Template::new(text))
            }
            None => Ok(Template::new(DEFAULT_SERVER_BLOCK)),
        }
    }

    /// Access/error log paths for one port
    pub fn log_paths(&self, port: u16) -> Result<(String, String)> {
        let mut values = HashMap::new();
        values.insert("port", port.to_string());

        let access = Template::new(self.access_log.as_str()).substitute(&values)?;
        let error = Template::new(self.error_log.as_str()).substitute(&values)?;
        Ok((access, error))
    }
}

/// The hls, vods and cods groups in their run order
pub fn default_groups() -> Vec<ServiceGroup> {
    ["hls", "vods", "cods"]
        .iter()
        .map(|name| ServiceGroup::standard(name))
        .collect()
}

/// Reject an empty group list and duplicate names, site files or node keys
pub fn validate_groups(groups: &[ServiceGroup]) -> Result<()> {
    if groups.is_empty() {
        return Err(EnvError::Config("At least one service group is required".to_string()));
    }
    for (i, group) in groups.iter().enumerate() {
        if group.name.trim().is_empty() {
            return Err(EnvError::Config("Service group with empty name".to_string()));
        }
        for other in &groups[i + 1..] {
            if other.name == group.name {
                return Err(EnvError::Config(format!("Duplicate service group: {}", group.name)));
            }
            if other.filename == group.filename {
                return Err(EnvError::Config(format!(
                    "Service groups '{}' and '{}' share file name {}",
                    group.name, other.name, group.filename
                )));
            }
            if other.nodes_key == group.nodes_key {
                return Err(EnvError::Config(format!(
                    "Service groups '{}' and '{}' share nodes key {}",
                    group.name, other.name, group.nodes_key
                )));
            }
        }
    }
    Ok(())
}
