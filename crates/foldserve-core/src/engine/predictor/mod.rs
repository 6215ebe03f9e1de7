//! The contract between the job pipeline and a structure-prediction model.
//!
//! The model itself lives behind [`StructurePredictor`]. The pipeline never
//! talks to a predictor directly; it goes through [`handle::ModelHandle`],
//! which owns the single loaded instance for the whole process.

pub mod handle;
pub mod synthetic;

use crate::core::models::frame::ResidueFrame;
use crate::core::models::sequence::Sequence;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PredictorError {
    #[error("Model '{model}' failed to load: {reason}")]
    Load { model: String, reason: String },

    #[error("Model is not loaded")]
    NotLoaded,

    #[error("Malformed model output: {0}")]
    MalformedOutput(String),

    #[error("Inference backend error: {0}")]
    Backend(String),
}

/// Raw model output for one sequence.
#[derive(Debug, Clone, PartialEq)]
pub struct Prediction {
    /// `positions[recycle][residue]`; the recycle count is whatever the model produced.
    pub positions: Vec<Vec<ResidueFrame>>,
    /// One confidence score (pLDDT, roughly 0-100) per residue.
    pub confidence: Vec<f64>,
}

impl Prediction {
    pub fn num_recycles(&self) -> usize {
        self.positions.len()
    }

    pub fn recycle(&self, index: usize) -> Option<&[ResidueFrame]> {
        self.positions.get(index).map(Vec::as_slice)
    }

    /// Checks the output shape against the submitted sequence length.
    pub fn validate(&self, residues: usize) -> Result<(), PredictorError> {
        if self.positions.is_empty() {
            return Err(PredictorError::MalformedOutput(
                "model returned no recycles".to_string(),
            ));
        }
        if let Some((recycle, frames)) = self
            .positions
            .iter()
            .enumerate()
            .find(|(_, frames)| frames.len() != residues)
        {
            return Err(PredictorError::MalformedOutput(format!(
                "recycle {} has {} residue frames, expected {}",
                recycle,
                frames.len(),
                residues
            )));
        }
        if self.confidence.len() != residues {
            return Err(PredictorError::MalformedOutput(format!(
                "{} confidence values for {} residues",
                self.confidence.len(),
                residues
            )));
        }
        if self.confidence.iter().any(|c| !c.is_finite()) {
            return Err(PredictorError::MalformedOutput(
                "confidence contains non-finite values".to_string(),
            ));
        }
        Ok(())
    }
}

/// A loaded-on-demand structure-prediction model.
///
/// Implementations are not required to be reentrant; [`handle::ModelHandle`]
/// guarantees that at most one method runs at a time.
pub trait StructurePredictor: Send {
    fn model_name(&self) -> &str;

    /// Acquires weights and accelerator memory. Repeated calls may reload.
    fn load(&mut self) -> Result<(), PredictorError>;

    /// Releases everything `load` acquired.
    fn unload(&mut self);

    fn is_loaded(&self) -> bool;

    fn predict(&mut self, sequence: &Sequence) -> Result<Prediction, PredictorError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frames(n: usize) -> Vec<ResidueFrame> {
        vec![ResidueFrame::default(); n]
    }

    #[test]
    fn validate_accepts_consistent_shapes() {
        let prediction = Prediction {
            positions: vec![frames(3), frames(3)],
            confidence: vec![90.0, 80.0, 70.0],
        };
        assert!(prediction.validate(3).is_ok());
        assert_eq!(prediction.num_recycles(), 2);
        assert_eq!(prediction.recycle(1).map(<[_]>::len), Some(3));
        assert!(prediction.recycle(2).is_none());
    }

    #[test]
    fn validate_rejects_empty_output() {
        let prediction = Prediction {
            positions: vec![],
            confidence: vec![],
        };
        assert!(matches!(
            prediction.validate(0),
            Err(PredictorError::MalformedOutput(_))
        ));
    }

    #[test]
    fn validate_rejects_residue_count_mismatch() {
        let prediction = Prediction {
            positions: vec![frames(3), frames(2)],
            confidence: vec![1.0, 2.0, 3.0],
        };
        let err = prediction.validate(3).unwrap_err();
        assert!(err.to_string().contains("recycle 1"));
    }

    #[test]
    fn validate_rejects_confidence_mismatch_and_nan() {
        let short = Prediction {
            positions: vec![frames(2)],
            confidence: vec![1.0],
        };
        assert!(short.validate(2).is_err());

        let nan = Prediction {
            positions: vec![frames(2)],
            confidence: vec![1.0, f64::NAN],
        };
        assert!(nan.validate(2).is_err());
    }
}
