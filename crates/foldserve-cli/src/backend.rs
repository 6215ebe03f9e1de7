//! Construction of the predictor behind the process-wide model handle.

pub mod remote;

use crate::config::AppConfig;
use crate::config::models::BackendKind;
use crate::error::{CliError, Result};
use foldserve::engine::predictor::StructurePredictor;
use foldserve::engine::predictor::synthetic::SyntheticPredictor;
use remote::RemotePredictor;
use tracing::info;

/// Must be called from inside the Tokio runtime that will drive remote requests.
pub fn build_predictor(config: &AppConfig) -> Result<Box<dyn StructurePredictor>> {
    let model = &config.core_config.model;
    match config.backend.kind {
        BackendKind::Remote => {
            let runtime = tokio::runtime::Handle::try_current()
                .map_err(|e| CliError::Other(anyhow::anyhow!("No async runtime: {}", e)))?;
            info!(
                "Using remote inference at {} (model '{}', device {}).",
                config.backend.endpoint, model.name, model.device
            );
            let predictor = RemotePredictor::new(
                model.name.clone(),
                model.device,
                config.backend.endpoint.clone(),
                config.backend.timeout,
                runtime,
            )?;
            Ok(Box::new(predictor))
        }
        BackendKind::Synthetic => {
            info!(
                "Using the synthetic predictor ({} recycles).",
                config.backend.synthetic_recycles
            );
            Ok(Box::new(SyntheticPredictor::new(
                model.name.clone(),
                config.backend.synthetic_recycles,
            )))
        }
    }
}
