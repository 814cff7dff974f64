//! Rendering of nginx site files and the service descriptor
//!
//! Rendering never touches the filesystem; the same inputs always produce
//! the same bytes. Writing lives in [`crate::cdn::writer`].

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;

use crate::cdn::group::ServiceGroup;
use crate::cdn::template::Template;
use crate::errors::{EnvError, Result};
use crate::port::PortAssignment;

/// Built-in descriptor templates
pub const PRO_DESCRIPTOR_TEMPLATE: &str = include_str!("../../templates/fastocloud_pro.in");
pub const ML_DESCRIPTOR_TEMPLATE: &str = include_str!("../../templates/fastocloud_pro_ml.in");

/// Node type written for allocated listeners
pub const DEFAULT_NODE_TYPE: u32 = 1;

/// A rendered text artifact and the file name it is written under
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedConfig {
    pub filename: String,
    pub contents: String,
}

/// One endpoint in the service descriptor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeEntry {
    pub host: String,
    #[serde(rename = "type")]
    pub node_type: u32,
}

impl NodeEntry {
    /// Endpoint for `url` (scheme and host, no port) on `port`
    pub fn new(url: &str, port: u16, node_type: u32) -> Self {
        let url = url.trim_end_matches('/');
        let url = if url.contains("://") {
            url.to_string()
        } else {
            format!("http://{}", url)
        };
        Self {
            host: format!("{}:{}", url, port),
            node_type,
        }
    }
}

/// Descriptor key → endpoints, sorted by key
pub type NodeMap = BTreeMap<String, Vec<NodeEntry>>;

/// Which service descriptor to emit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DescriptorVariant {
    #[default]
    Pro,
    Ml,
}

impl DescriptorVariant {
    pub fn filename(&self) -> &'static str {
        match self {
            DescriptorVariant::Pro => "fastocloud_pro.conf",
            DescriptorVariant::Ml => "fastocloud_pro_ml.conf",
        }
    }

    pub fn builtin_template(&self) -> Template {
        match self {
            DescriptorVariant::Pro => Template::new(PRO_DESCRIPTOR_TEMPLATE),
            DescriptorVariant::Ml => Template::new(ML_DESCRIPTOR_TEMPLATE),
        }
    }
}

impl fmt::Display for DescriptorVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DescriptorVariant::Pro => write!(f, "pro"),
            DescriptorVariant::Ml => write!(f, "ml"),
        }
    }
}

impl FromStr for DescriptorVariant {
    type Err = EnvError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "pro" => Ok(DescriptorVariant::Pro),
            "ml" => Ok(DescriptorVariant::Ml),
            other => Err(EnvError::Config(format!("Unknown descriptor variant: {}", other))),
        }
    }
}

/// Render a group's site file: one server block per assigned port
pub fn render_group(
    group: &ServiceGroup,
    server_block: &Template,
    assignment: &PortAssignment,
) -> Result<RenderedConfig> {
    let mut contents = format!(
        "# {} listeners ({} ports), generated by fastocloud-env\n\n",
        group.name,
        assignment.ports.len()
    );

    for &port in &assignment.ports {
        let (access_log, error_log) = group.log_paths(port)?;

        let mut values = HashMap::new();
        values.insert("port", port.to_string());
        values.insert("group", group.name.clone());
        values.insert("access_log", access_log);
        values.insert("error_log", error_log);
        values.insert("location", group.location.clone());
        values.insert("content_root", group.content_root.clone());

        contents.push_str(&server_block.substitute(&values)?);
    }

    Ok(RenderedConfig {
        filename: group.filename.clone(),
        contents,
    })
}

/// Node entries for allocated ports on `host`
pub fn nodes_for(host: &str, assignment: &PortAssignment) -> Vec<NodeEntry> {
    assignment
        .ports
        .iter()
        .map(|&port| NodeEntry::new(host, port, DEFAULT_NODE_TYPE))
        .collect()
}

/// Render the service descriptor embedding every group's endpoints
pub fn render_descriptor(
    variant: DescriptorVariant,
    template: &Template,
    alias: &str,
    nodes: &NodeMap,
) -> Result<RenderedConfig> {
    // An empty map serializes as flow `{}`, which cannot follow block keys
    let nodes_yaml = if nodes.is_empty() {
        String::new()
    } else {
        serde_yaml::to_string(nodes)?
    };

    let mut values = HashMap::new();
    values.insert("alias", yaml_scalar(alias)?);
    values.insert("nodes", nodes_yaml);

    Ok(RenderedConfig {
        filename: variant.filename().to_string(),
        contents: template.substitute(&values)?,
    })
}

/// `value` as a single-line YAML scalar, quoted when plain style would misparse
fn yaml_scalar(value: &str) -> Result<String> {
    let text = serde_yaml::to_string(value)?;
    let text = text.trim_end_matches('\n');
    if text.contains('\n') {
        return Err(EnvError::Config(format!(
            "Value must fit on one line: {:?}",
            value
        )));
    }
    Ok(text.to_string())
}
