use foldserve::engine::config::FoldConfig;
use serde::Deserialize;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

/// Which structure predictor backs the model handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Forward inference to an HTTP inference service.
    Remote,
    /// Built-in model-free predictor for offline runs.
    Synthetic,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BackendConfig {
    pub kind: BackendKind,
    pub endpoint: String,
    pub timeout: Duration,
    pub synthetic_recycles: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    pub listen: SocketAddr,
    pub webapp_dir: Option<PathBuf>,
}

/// `serve`-only flags merged on top of the `[server]` table.
#[derive(Debug, Clone, Default)]
pub struct ServerOverrides {
    pub listen: Option<SocketAddr>,
    pub webapp_dir: Option<PathBuf>,
}

pub struct AppConfig {
    pub core_config: FoldConfig,
    pub backend: BackendConfig,
    pub server: ServerConfig,
}
