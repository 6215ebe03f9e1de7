use crate::error::Result;
use foldserve::core::models::frame::ResidueFrame;
use foldserve::core::models::sequence::Sequence;
use foldserve::engine::config::Device;
use foldserve::engine::predictor::{Prediction, PredictorError, StructurePredictor};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::runtime::Handle;
use tracing::{debug, warn};

#[derive(Serialize)]
struct PredictRequest<'a> {
    model: &'a str,
    device: &'a str,
    sequence: &'a str,
}

#[derive(Serialize)]
struct UnloadRequest<'a> {
    model: &'a str,
}

/// `positions[recycle][residue][slot] = [x, y, z]`, `plddt[residue]`.
#[derive(Deserialize, Debug)]
struct PredictResponse {
    positions: Vec<Vec<Vec<[f64; 3]>>>,
    plddt: Vec<f64>,
}

impl PredictResponse {
    fn into_prediction(self) -> std::result::Result<Prediction, PredictorError> {
        let positions = self
            .positions
            .iter()
            .enumerate()
            .map(|(recycle, residues)| {
                residues
                    .iter()
                    .enumerate()
                    .map(|(residue, slots)| {
                        ResidueFrame::from_slots(slots).ok_or_else(|| {
                            PredictorError::MalformedOutput(format!(
                                "recycle {} residue {} has {} atom slots",
                                recycle,
                                residue,
                                slots.len()
                            ))
                        })
                    })
                    .collect::<std::result::Result<Vec<_>, _>>()
            })
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(Prediction {
            positions,
            confidence: self.plddt,
        })
    }
}

/// Adapter for an HTTP inference service hosting the pretrained model.
///
/// Requests run on the server's Tokio runtime through `Handle::block_on`, so
/// every method must be called from a blocking worker, never from async code.
pub struct RemotePredictor {
    model_name: String,
    device: Device,
    endpoint: String,
    client: reqwest::Client,
    runtime: Handle,
    loaded: bool,
}

impl RemotePredictor {
    pub fn new(
        model_name: String,
        device: Device,
        endpoint: String,
        timeout: Duration,
        runtime: Handle,
    ) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            model_name,
            device,
            endpoint,
            client,
            runtime,
            loaded: false,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.endpoint.trim_end_matches('/'), path)
    }
}

impl StructurePredictor for RemotePredictor {
    fn model_name(&self) -> &str {
        &self.model_name
    }

    fn load(&mut self) -> std::result::Result<(), PredictorError> {
        let url = self.url("health");
        debug!("Probing inference service at {}", url);
        let health = self.runtime.block_on(async {
            self.client
                .get(&url)
                .send()
                .await?
                .error_for_status()
                .map(|_| ())
        });
        health.map_err(|e| PredictorError::Load {
            model: self.model_name.clone(),
            reason: e.to_string(),
        })?;
        self.loaded = true;
        Ok(())
    }

    fn unload(&mut self) {
        if !self.loaded {
            return;
        }
        let url = self.url("unload");
        let body = UnloadRequest {
            model: &self.model_name,
        };
        let released = self.runtime.block_on(async {
            self.client
                .post(&url)
                .json(&body)
                .send()
                .await?
                .error_for_status()
                .map(|_| ())
        });
        if let Err(e) = released {
            warn!("Inference service did not confirm unload: {}", e);
        }
        self.loaded = false;
    }

    fn is_loaded(&self) -> bool {
        self.loaded
    }

    fn predict(&mut self, sequence: &Sequence) -> std::result::Result<Prediction, PredictorError> {
        if !self.loaded {
            return Err(PredictorError::NotLoaded);
        }
        let url = self.url("predict");
        let body = PredictRequest {
            model: &self.model_name,
            device: self.device.as_str(),
            sequence: sequence.as_str(),
        };
        let response: PredictResponse = self
            .runtime
            .block_on(async {
                self.client
                    .post(&url)
                    .json(&body)
                    .send()
                    .await?
                    .error_for_status()?
                    .json::<PredictResponse>()
                    .await
            })
            .map_err(|e| {
                if e.is_decode() {
                    PredictorError::MalformedOutput(e.to_string())
                } else {
                    PredictorError::Backend(e.to_string())
                }
            })?;
        response.into_prediction()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use foldserve::core::models::sequence::SequenceLimits;

    fn runtime() -> tokio::runtime::Runtime {
        tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .enable_all()
            .build()
            .unwrap()
    }

    fn predictor(rt: &tokio::runtime::Runtime) -> RemotePredictor {
        // Port 9 (discard) is not expected to accept HTTP connections.
        RemotePredictor::new(
            "facebook/esmfold_v1".to_string(),
            Device::Cpu,
            "http://127.0.0.1:9/".to_string(),
            Duration::from_secs(2),
            rt.handle().clone(),
        )
        .unwrap()
    }

    #[test]
    fn wire_response_converts_to_frames() {
        let body = r#"{
            "positions": [[[[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]]], [[[1.5, 2.5, 3.5]]]],
            "plddt": [88.5]
        }"#;
        let response: PredictResponse = serde_json::from_str(body).unwrap();
        let prediction = response.into_prediction().unwrap();

        assert_eq!(prediction.num_recycles(), 2);
        assert_eq!(prediction.confidence, vec![88.5]);
        let first = &prediction.recycle(0).unwrap()[0];
        assert!(first.is_present(1));
        assert!(!first.is_present(2));
        assert_eq!(first.slot(1).unwrap().y, 5.0);
        assert!(prediction.validate(1).is_ok());
    }

    #[test]
    fn oversized_residues_are_malformed() {
        let slots = vec![[1.0, 1.0, 1.0]; 15];
        let response = PredictResponse {
            positions: vec![vec![slots]],
            plddt: vec![50.0],
        };
        assert!(matches!(
            response.into_prediction(),
            Err(PredictorError::MalformedOutput(_))
        ));
    }

    #[test]
    fn endpoint_paths_are_joined_without_double_slashes() {
        let rt = runtime();
        assert_eq!(predictor(&rt).url("predict"), "http://127.0.0.1:9/predict");
    }

    #[test]
    fn predict_before_load_is_rejected_without_a_request() {
        let rt = runtime();
        let mut predictor = predictor(&rt);
        let sequence = Sequence::parse("ACDEFGHIKL", &SequenceLimits::default()).unwrap();
        assert!(matches!(
            predictor.predict(&sequence),
            Err(PredictorError::NotLoaded)
        ));
    }

    #[test]
    fn unreachable_service_fails_to_load() {
        let rt = runtime();
        let mut predictor = predictor(&rt);
        assert!(matches!(
            predictor.load(),
            Err(PredictorError::Load { .. })
        ));
        assert!(!predictor.is_loaded());
        predictor.unload();
    }
}
