//! Error types for fastocloud-env

use thiserror::Error;

#[derive(Error, Debug)]
pub enum EnvError {
    #[error("Port range exhausted for group '{group}': requested {requested}, found {found}")]
    PortExhausted {
        group: String,
        requested: usize,
        found: usize,
    },

    #[error("Port {port} already claimed in this session (group '{group}')")]
    PortAlreadyClaimed { group: String, port: u16 },

    #[error("Group already allocated in this session: {0}")]
    GroupAlreadyAllocated(String),

    #[error("Config already exists: {0}")]
    ConfigCollision(String),

    #[error("External tool failed: {program} {args} (exit code {code})")]
    ExternalTool {
        program: String,
        args: String,
        code: i32,
    },

    #[error("Unsupported platform: {0}")]
    UnsupportedPlatform(String),

    #[error("Template error: {0}")]
    Template(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Download error: {0}")]
    Download(String),

    #[error("Unknown component: {0}")]
    UnknownComponent(String),

    #[error("{0} GStreamer plugin(s) missing")]
    PluginsMissing(usize),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<reqwest::Error> for EnvError {
    fn from(err: reqwest::Error) -> Self {
        EnvError::Download(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, EnvError>;
