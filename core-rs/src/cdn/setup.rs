//! CDN setup run
//!
//! Groups are processed in order: ports, site file, write. The descriptor
//! listing every group's endpoints comes last. A failure stops the run;
//! site files already written for earlier groups stay in place.

use std::fs;
use std::path::PathBuf;
use tracing::info;

use crate::cdn::group::{validate_groups, ServiceGroup};
use crate::cdn::render::{
    nodes_for, render_descriptor, render_group, DescriptorVariant, NodeEntry, NodeMap,
    RenderedConfig,
};
use crate::cdn::template::Template;
use crate::cdn::writer::ConfigWriter;
use crate::errors::{EnvError, Result};
use crate::port::{AllocationSession, PortAllocator, PortAssignment, PortProbe};

/// Endpoint entered by the operator instead of allocated
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManualNode {
    pub url: String,
    pub port: u16,
    pub node_type: u32,
}

/// Where a group's endpoints come from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeSource {
    /// Scan for this many free ports
    Allocate(usize),
    /// Use these endpoints as given
    Manual(Vec<ManualNode>),
}

/// One group in a run
#[derive(Debug, Clone)]
pub struct GroupPlan {
    pub group: ServiceGroup,
    pub source: NodeSource,
}

impl GroupPlan {
    /// Plans allocating each group's own count, or `default_count`
    pub fn allocate_all(groups: &[ServiceGroup], default_count: usize) -> Vec<GroupPlan> {
        groups
            .iter()
            .map(|group| GroupPlan {
                source: NodeSource::Allocate(group.connection_count(default_count)),
                group: group.clone(),
            })
            .collect()
    }
}

/// Run-wide settings
#[derive(Debug, Clone)]
pub struct CdnOptions {
    pub alias: String,
    pub variant: DescriptorVariant,
    pub descriptor_template: Option<PathBuf>,
    pub dry_run: bool,
}

/// Everything a run produced
#[derive(Debug, Clone)]
pub struct CdnReport {
    pub assignments: Vec<PortAssignment>,
    pub sites: Vec<RenderedConfig>,
    pub descriptor: RenderedConfig,
    pub written: Vec<PathBuf>,
}

/// Allocator + writer for one host
pub struct CdnSetup<P: PortProbe> {
    allocator: PortAllocator<P>,
    writer: ConfigWriter,
}

impl<P: PortProbe> CdnSetup<P> {
    pub fn new(allocator: PortAllocator<P>, writer: ConfigWriter) -> Self {
        Self { allocator, writer }
    }

    pub fn writer(&self) -> &ConfigWriter {
        &self.writer
    }

    /// Execute a run
    ///
    /// # Errors
    /// - `PortExhausted` / `PortAlreadyClaimed` from allocation
    /// - `ConfigCollision` if a destination file exists
    /// - `Template` / `Config` for broken templates or group definitions
    pub fn run(
        &self,
        session: &mut AllocationSession,
        plans: &[GroupPlan],
        options: &CdnOptions,
    ) -> Result<CdnReport> {
        let groups: Vec<ServiceGroup> = plans.iter().map(|p| p.group.clone()).collect();
        validate_groups(&groups)?;

        let descriptor_template = match &options.descriptor_template {
            Some(path) => Template::new(fs::read_to_string(path).map_err(|e| {
                EnvError::Config(format!(
                    "Failed to read descriptor template {}: {}",
                    path.display(),
                    e
                ))
            })?),
            None => options.variant.builtin_template(),
        };

        // The descriptor is written last; an existing one fails the run
        // before any site file lands.
        if !options.dry_run {
            let filename = options.variant.filename();
            if let Some(existing) = self.writer.descriptor_collision(filename) {
                return Err(EnvError::ConfigCollision(existing.display().to_string()));
            }
        }

        let mut nodes = NodeMap::new();
        let mut assignments = Vec::with_capacity(plans.len());
        let mut sites = Vec::with_capacity(plans.len());
        let mut written = Vec::new();

        for plan in plans {
            let group = &plan.group;
            let server_block = group.load_server_block()?;

            let (assignment, entries) = match &plan.source {
                NodeSource::Allocate(count) => {
                    let assignment = self.allocator.allocate(session, &group.name, *count)?;
                    let entries = nodes_for(self.allocator.host(), &assignment);
                    (assignment, entries)
                }
                NodeSource::Manual(manual) => {
                    let ports: Vec<u16> = manual.iter().map(|n| n.port).collect();
                    let assignment = session.claim_manual(&group.name, &ports)?;
                    let entries = manual
                        .iter()
                        .map(|n| NodeEntry::new(&n.url, n.port, n.node_type))
                        .collect();
                    (assignment, entries)
                }
            };

            let site = render_group(group, &server_block, &assignment)?;
            if !options.dry_run {
                let paths = self.writer.write_site(&site)?;
                written.push(paths.available);
                written.push(paths.enabled);
            }

            info!(group = %group.name, ports = assignment.len(), "group configured");
            nodes.insert(group.nodes_key.clone(), entries);
            assignments.push(assignment);
            sites.push(site);
        }

        let descriptor = render_descriptor(options.variant, &descriptor_template, &options.alias, &nodes)?;
        if !options.dry_run {
            written.push(self.writer.write_descriptor(&descriptor)?);
        }

        Ok(CdnReport {
            assignments,
            sites,
            descriptor,
            written,
        })
    }
}
