//! # fastocloud-env - FastoCloud media server environment tool
//!
//! Prepares a host to run the FastoCloud streaming service:
//!
//! - **CDN setup**: picks free listener ports per service group (hls, vods,
//!   cods), renders nginx site files and the streamer's service descriptor,
//!   and writes them without ever overwriting existing configs.
//! - **Provisioning**: installs system packages for the detected platform
//!   and builds GStreamer, its plugin sets and codec libraries from source.
//! - **Plugin check**: verifies that every GStreamer element the streamer
//!   uses is loadable.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐    ┌──────────────┐    ┌──────────────────────────┐
//! │ PortProbe    │───▶│ PortAllocator│───▶│ render (pure)            │
//! │ connect/bind │    │ + Session    │    │ site files + descriptor  │
//! └──────────────┘    └──────────────┘    └────────────┬─────────────┘
//!                                                      ▼
//!                                         ┌──────────────────────────┐
//!                                         │ ConfigWriter (create-new)│
//!                                         └──────────────────────────┘
//!
//! ┌──────────────┐    ┌──────────────┐    ┌──────────────────────────┐
//! │ PlatformId   │───▶│ PackageTable │───▶│ Provisioner<CommandRunner│
//! │ detect()     │    │ catalog()    │    │ fetch → patch → build    │
//! └──────────────┘    └──────────────┘    └──────────────────────────┘
//! ```

pub mod cdn;
pub mod config;
pub mod errors;
pub mod logging;
pub mod platform;
pub mod plugins;
pub mod port;
pub mod provision;

pub use cdn::{CdnOptions, CdnReport, CdnSetup, ConfigWriter, DescriptorVariant, EnableMode, GroupPlan, ServiceGroup};
pub use config::EnvConfig;
pub use errors::{EnvError, Result};
pub use platform::{PackageManager, PackageSelection, PlatformId};
pub use plugins::{PluginInspector, PluginReport, PLUGINS, PLUGINS_ML};
pub use port::{AllocationSession, PortAllocator, PortAssignment, PortProbe, ScanRange};
pub use provision::{CommandRunner, Component, ComponentFlags, DryRunRunner, MediaVersions, Provisioner, SystemRunner};

/// Version of the tool
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
