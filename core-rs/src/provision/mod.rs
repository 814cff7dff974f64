//! Media server environment provisioning
//!
//! System packages, tools and source-built components (GStreamer and its
//! plugin sets, codecs, transport libraries) for one platform.

pub mod catalog;
pub mod component;
pub mod executor;
pub mod fetch;
pub mod runner;

pub use catalog::{catalog, ComponentFlags, MediaVersions};
pub use component::{BuildDriver, Component, Fetch};
pub use executor::{ProvisionOptions, Provisioner, DEFAULT_HOSTNAME, DEFAULT_PREFIX};
pub use fetch::{Downloader, HttpDownloader, SourceFetcher};
pub use runner::{run_checked, CommandRunner, DryRunRunner, ExternalCommand, SystemRunner};
