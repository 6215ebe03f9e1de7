use crate::core::models::sequence::SequenceLimits;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum ConfigError {
    #[error("Missing required parameter: {0}")]
    MissingParameter(&'static str),

    #[error("Invalid value for '{parameter}': {reason}")]
    InvalidValue {
        parameter: &'static str,
        reason: String,
    },
}

/// Compute device the inference backend is asked to run on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Device {
    Cpu,
    #[default]
    Cuda,
    Auto,
}

impl Device {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Cpu => "cpu",
            Self::Cuda => "cuda",
            Self::Auto => "auto",
        }
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Device {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cpu" => Ok(Self::Cpu),
            "cuda" | "gpu" => Ok(Self::Cuda),
            "auto" => Ok(Self::Auto),
            other => Err(ConfigError::InvalidValue {
                parameter: "device",
                reason: format!("unknown device '{}', expected cpu, cuda or auto", other),
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ModelConfig {
    pub name: String,
    pub device: Device,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OutputConfig {
    /// Root of everything served under `url_prefix`.
    pub data_dir: PathBuf,
    /// URL path at which `data_dir` is exposed, e.g. `/data`.
    pub url_prefix: String,
}

impl OutputConfig {
    pub fn outputs_dir(&self) -> PathBuf {
        self.data_dir.join("outputs")
    }

    pub fn outputs_url(&self) -> String {
        format!("{}/outputs", self.url_prefix.trim_end_matches('/'))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FoldConfig {
    pub sequence_limits: SequenceLimits,
    pub model: ModelConfig,
    pub output: OutputConfig,
}

impl FoldConfig {
    /// Model limits narrowed by the bounds every submission must satisfy.
    pub fn effective_limits(&self) -> SequenceLimits {
        self.sequence_limits.intersect(SequenceLimits::SUBMISSION)
    }
}

#[derive(Default)]
pub struct FoldConfigBuilder {
    min_length: Option<usize>,
    max_length: Option<usize>,
    model_name: Option<String>,
    device: Option<Device>,
    data_dir: Option<PathBuf>,
    url_prefix: Option<String>,
}

impl FoldConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn min_length(mut self, length: usize) -> Self {
        self.min_length = Some(length);
        self
    }
    pub fn max_length(mut self, length: usize) -> Self {
        self.max_length = Some(length);
        self
    }
    pub fn model_name(mut self, name: impl Into<String>) -> Self {
        self.model_name = Some(name.into());
        self
    }
    pub fn device(mut self, device: Device) -> Self {
        self.device = Some(device);
        self
    }
    pub fn data_dir(mut self, path: PathBuf) -> Self {
        self.data_dir = Some(path);
        self
    }
    pub fn url_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.url_prefix = Some(prefix.into());
        self
    }

    pub fn build(self) -> Result<FoldConfig, ConfigError> {
        let defaults = SequenceLimits::default();
        let min_length = self.min_length.unwrap_or(defaults.min_length);
        let max_length = self.max_length.unwrap_or(defaults.max_length);
        if min_length == 0 {
            return Err(ConfigError::InvalidValue {
                parameter: "min_length",
                reason: "must be at least 1".to_string(),
            });
        }
        if min_length > max_length {
            return Err(ConfigError::InvalidValue {
                parameter: "max_length",
                reason: format!("{} is smaller than min_length {}", max_length, min_length),
            });
        }

        let model_name = self
            .model_name
            .filter(|name| !name.trim().is_empty())
            .ok_or(ConfigError::MissingParameter("model_name"))?;

        let url_prefix = self.url_prefix.unwrap_or_else(|| "/data".to_string());
        if !url_prefix.starts_with('/') {
            return Err(ConfigError::InvalidValue {
                parameter: "url_prefix",
                reason: format!("'{}' must start with '/'", url_prefix),
            });
        }

        Ok(FoldConfig {
            sequence_limits: SequenceLimits::new(min_length, max_length),
            model: ModelConfig {
                name: model_name,
                device: self.device.unwrap_or_default(),
            },
            output: OutputConfig {
                data_dir: self
                    .data_dir
                    .ok_or(ConfigError::MissingParameter("data_dir"))?,
                url_prefix,
            },
        })
    }
}
