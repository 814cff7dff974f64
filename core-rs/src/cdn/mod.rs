//! CDN config generation
//!
//! Allocates listener ports per service group, renders nginx site files and
//! the streamer's service descriptor, and writes them without overwriting.

pub mod group;
pub mod prompt;
pub mod render;
pub mod setup;
pub mod template;
pub mod writer;

pub use group::{default_groups, ServiceGroup};
pub use prompt::Prompter;
pub use render::{DescriptorVariant, NodeEntry, NodeMap, RenderedConfig};
pub use setup::{CdnOptions, CdnReport, CdnSetup, GroupPlan, ManualNode, NodeSource};
pub use template::Template;
pub use writer::{ConfigWriter, EnableMode};
