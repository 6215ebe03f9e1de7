use super::defaults::DefaultsConfig;
use super::file::FileConfig;
use super::models::{AppConfig, BackendConfig, BackendKind, ServerConfig, ServerOverrides};
use crate::cli::CommonArgs;
use crate::error::{CliError, Result};
use foldserve::engine::config::{self as core_config, Device};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Resolves every setting as CLI flag, then config file (with `-S` overrides), then default.
pub fn build_config(args: &CommonArgs, overrides: &ServerOverrides) -> Result<AppConfig> {
    let defaults = DefaultsConfig::default();

    let file_config = if let Some(config_path) = &args.config {
        FileConfig::from_file(config_path)?
    } else {
        FileConfig::default()
    };

    let mut file_config = apply_set_values(file_config, &args.set_values)?;

    let model_file = file_config.model.take().unwrap_or_default();
    let sequence_file = file_config.sequence.take().unwrap_or_default();
    let server_file = file_config.server.take().unwrap_or_default();

    let data_dir = args
        .data_dir
        .clone()
        .or(file_config.data_dir)
        .unwrap_or_else(|| PathBuf::from(&defaults.data_dir));

    let model_name = args
        .model
        .clone()
        .or(model_file.name)
        .unwrap_or(defaults.model_name);

    let device = match args.device {
        Some(device) => device,
        None => Device::from_str(model_file.device.as_deref().unwrap_or(&defaults.device))
            .map_err(|e| CliError::Config(e.to_string()))?,
    };

    let min_length = args
        .min_length
        .or(sequence_file.min_length)
        .unwrap_or(defaults.min_length);
    let max_length = args
        .max_length
        .or(sequence_file.max_length)
        .unwrap_or(defaults.max_length);

    let core_config = core_config::FoldConfigBuilder::new()
        .min_length(min_length)
        .max_length(max_length)
        .model_name(model_name)
        .device(device)
        .data_dir(data_dir)
        .build()
        .map_err(|e| CliError::Config(e.to_string()))?;

    let backend = BackendConfig {
        kind: args
            .backend
            .or(model_file.backend)
            .unwrap_or(defaults.backend),
        endpoint: args
            .endpoint
            .clone()
            .or(model_file.endpoint)
            .unwrap_or(defaults.endpoint)
            .trim_end_matches('/')
            .to_string(),
        timeout: Duration::from_secs(model_file.timeout_secs.unwrap_or(defaults.timeout_secs)),
        synthetic_recycles: model_file
            .synthetic_recycles
            .unwrap_or(defaults.synthetic_recycles),
    };
    if backend.synthetic_recycles == 0 {
        return Err(CliError::Config(
            "`model.synthetic-recycles` must be at least 1".to_string(),
        ));
    }

    let listen = match overrides.listen {
        Some(addr) => addr,
        None => {
            let raw = server_file.listen.unwrap_or(defaults.listen);
            raw.parse::<SocketAddr>().map_err(|_| {
                CliError::Config(format!("Invalid listen address for server.listen: {}", raw))
            })?
        }
    };
    let server = ServerConfig {
        listen,
        webapp_dir: overrides.webapp_dir.clone().or(server_file.webapp_dir),
    };

    Ok(AppConfig {
        core_config,
        backend,
        server,
    })
}

fn apply_set_values(mut config: FileConfig, set_values: &[String]) -> Result<FileConfig> {
    if set_values.is_empty() {
        return Ok(config);
    }
    for kv_pair in set_values {
        let Some((key, value_str)) = kv_pair.split_once('=') else {
            return Err(CliError::Config(format!(
                "Invalid --set format: '{}'. Expected KEY=VALUE.",
                kv_pair
            )));
        };
        let invalid_int =
            || CliError::Config(format!("Invalid integer value for {}: {}", key, value_str));

        match key {
            "data-dir" => {
                config.data_dir = Some(PathBuf::from(value_str));
            }
            "server.listen" => {
                config.server.get_or_insert_with(Default::default).listen =
                    Some(value_str.to_string());
            }
            "server.webapp-dir" => {
                config.server.get_or_insert_with(Default::default).webapp_dir =
                    Some(PathBuf::from(value_str));
            }
            "model.name" => {
                config.model.get_or_insert_with(Default::default).name =
                    Some(value_str.to_string());
            }
            "model.device" => {
                config.model.get_or_insert_with(Default::default).device =
                    Some(value_str.to_string());
            }
            "model.backend" => {
                let kind = match value_str {
                    "remote" => BackendKind::Remote,
                    "synthetic" => BackendKind::Synthetic,
                    other => {
                        return Err(CliError::Config(format!(
                            "Invalid backend for {}: {} (expected remote or synthetic)",
                            key, other
                        )));
                    }
                };
                config.model.get_or_insert_with(Default::default).backend = Some(kind);
            }
            "model.endpoint" => {
                config.model.get_or_insert_with(Default::default).endpoint =
                    Some(value_str.to_string());
            }
            "model.timeout-secs" => {
                config.model.get_or_insert_with(Default::default).timeout_secs =
                    Some(value_str.parse().map_err(|_| invalid_int())?);
            }
            "model.synthetic-recycles" => {
                config
                    .model
                    .get_or_insert_with(Default::default)
                    .synthetic_recycles = Some(value_str.parse().map_err(|_| invalid_int())?);
            }
            "sequence.min-length" => {
                config.sequence.get_or_insert_with(Default::default).min_length =
                    Some(value_str.parse().map_err(|_| invalid_int())?);
            }
            "sequence.max-length" => {
                config.sequence.get_or_insert_with(Default::default).max_length =
                    Some(value_str.parse().map_err(|_| invalid_int())?);
            }
            _ => {
                return Err(CliError::Config(format!(
                    "Unsupported configuration key for --set: '{}'",
                    key
                )));
            }
        }
    }
    Ok(config)
}
