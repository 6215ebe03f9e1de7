use super::{Prediction, PredictorError, StructurePredictor};
use crate::core::models::frame::ResidueFrame;
use crate::core::models::sequence::Sequence;
use crate::core::utils::identifiers::{ATOM14_SLOTS, atom14_name, three_letter_code};
use nalgebra::{Point3, Vector3};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::debug;

pub const DEFAULT_RECYCLES: usize = 8;

const HELIX_TWIST_DEG: f64 = 100.0;
const HELIX_RISE: f64 = 1.5;
const CA_RADIUS: f64 = 2.3;
const SIDE_CHAIN_STEP: f64 = 1.5;
const MAX_NOISE: f64 = 2.0;
const CONFIDENCE_RANGE: std::ops::Range<f64> = 50.0..95.0;

/// Model-free predictor that folds every sequence into an ideal alpha helix.
///
/// Earlier recycles carry seeded noise that shrinks to zero on the last one,
/// so the trajectory converges the way a real recycling model does. Used for
/// offline runs and tests where no inference backend is reachable.
#[derive(Debug, Clone)]
pub struct SyntheticPredictor {
    model_name: String,
    recycles: usize,
    seed: u64,
    loaded: bool,
}

impl SyntheticPredictor {
    pub fn new(model_name: impl Into<String>, recycles: usize) -> Self {
        Self {
            model_name: model_name.into(),
            recycles: recycles.max(1),
            seed: 0,
            loaded: false,
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    fn rng_for(&self, sequence: &Sequence) -> StdRng {
        // FNV-1a over the residues keeps output stable per sequence.
        let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
        for byte in sequence.as_str().bytes() {
            hash ^= u64::from(byte);
            hash = hash.wrapping_mul(0x0000_0100_0000_01b3);
        }
        StdRng::seed_from_u64(hash ^ self.seed)
    }
}

impl StructurePredictor for SyntheticPredictor {
    fn model_name(&self) -> &str {
        &self.model_name
    }

    fn load(&mut self) -> Result<(), PredictorError> {
        self.loaded = true;
        Ok(())
    }

    fn unload(&mut self) {
        self.loaded = false;
    }

    fn is_loaded(&self) -> bool {
        self.loaded
    }

    fn predict(&mut self, sequence: &Sequence) -> Result<Prediction, PredictorError> {
        if !self.loaded {
            return Err(PredictorError::NotLoaded);
        }
        let mut rng = self.rng_for(sequence);
        let ideal: Vec<ResidueFrame> = sequence
            .residues()
            .enumerate()
            .map(|(index, residue)| ideal_frame(index, three_letter_code(residue)))
            .collect();

        let positions = (0..self.recycles)
            .map(|recycle| {
                let scale = MAX_NOISE * (self.recycles - 1 - recycle) as f64 / self.recycles as f64;
                ideal
                    .iter()
                    .map(|frame| perturb(frame, scale, &mut rng))
                    .collect()
            })
            .collect();

        let confidence = (0..sequence.len())
            .map(|_| rng.gen_range(CONFIDENCE_RANGE))
            .collect();

        debug!(
            "Synthetic fold of {} residues over {} recycles.",
            sequence.len(),
            self.recycles
        );
        Ok(Prediction {
            positions,
            confidence,
        })
    }
}

fn ideal_frame(index: usize, residue_name: &str) -> ResidueFrame {
    let theta = (index as f64 * HELIX_TWIST_DEG).to_radians();
    let radial = Vector3::new(theta.cos(), theta.sin(), 0.0);
    let tangent = Vector3::new(-theta.sin(), theta.cos(), 0.0);
    let axis = Vector3::z();
    let ca = Point3::new(
        CA_RADIUS * theta.cos(),
        CA_RADIUS * theta.sin(),
        HELIX_RISE * index as f64,
    );

    let mut frame = ResidueFrame::default();
    for slot in 0..ATOM14_SLOTS {
        if atom14_name(residue_name, slot).is_none() {
            continue;
        }
        let position = match slot {
            0 => ca - tangent * 0.9 - axis * 0.7,
            1 => ca,
            2 => ca + tangent * 0.9 + axis * 0.7,
            3 => ca + tangent * 1.2 + axis * 1.6 + radial * 0.6,
            side => ca + radial * (SIDE_CHAIN_STEP * (side - 3) as f64) - axis * 0.4,
        };
        frame.set_slot(slot, position);
    }
    frame
}

fn perturb(frame: &ResidueFrame, scale: f64, rng: &mut StdRng) -> ResidueFrame {
    if scale == 0.0 {
        return frame.clone();
    }
    let mut noisy = frame.clone();
    for (slot, position) in frame.present_atoms() {
        let offset = Vector3::new(
            rng.gen_range(-1.0..1.0),
            rng.gen_range(-1.0..1.0),
            rng.gen_range(-1.0..1.0),
        ) * scale;
        noisy.set_slot(slot, position + offset);
    }
    noisy
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::sequence::SequenceLimits;

    fn parse(raw: &str) -> Sequence {
        Sequence::parse(raw, &SequenceLimits::default()).unwrap()
    }

    fn loaded(recycles: usize) -> SyntheticPredictor {
        let mut predictor = SyntheticPredictor::new("synthetic", recycles);
        predictor.load().unwrap();
        predictor
    }

    #[test]
    fn predict_requires_load() {
        let mut predictor = SyntheticPredictor::new("synthetic", 2);
        assert!(matches!(
            predictor.predict(&parse("ACDEFGHIKL")),
            Err(PredictorError::NotLoaded)
        ));
    }

    #[test]
    fn output_shape_matches_sequence_and_recycles() {
        let sequence = parse("ACDEFGHIKL");
        let prediction = loaded(4).predict(&sequence).unwrap();
        assert_eq!(prediction.num_recycles(), 4);
        assert!(prediction.validate(sequence.len()).is_ok());
        assert!(
            prediction
                .confidence
                .iter()
                .all(|c| CONFIDENCE_RANGE.contains(c))
        );
    }

    #[test]
    fn zero_recycles_is_clamped_to_one() {
        let prediction = loaded(0).predict(&parse("ACDEFGHIKL")).unwrap();
        assert_eq!(prediction.num_recycles(), 1);
    }

    #[test]
    fn last_recycle_is_the_ideal_helix() {
        let sequence = parse("ACDEFGHIKL");
        let prediction = loaded(3).predict(&sequence).unwrap();
        let last = prediction.recycle(2).unwrap();
        for (index, residue) in sequence.residues().enumerate() {
            assert_eq!(last[index], ideal_frame(index, three_letter_code(residue)));
        }
        assert_ne!(prediction.recycle(0), prediction.recycle(2));
    }

    #[test]
    fn only_named_slots_are_populated() {
        let gly = ideal_frame(0, "GLY");
        assert_eq!(gly.present_atoms().count(), 4);
        assert!(!gly.is_present(4));

        let trp = ideal_frame(3, "TRP");
        assert_eq!(trp.present_atoms().count(), ATOM14_SLOTS);
    }

    #[test]
    fn predictions_are_deterministic_per_seed() {
        let sequence = parse("MKTAYIAKQR");
        let a = loaded(2).with_seed(7).predict(&sequence).unwrap();
        let b = loaded(2).with_seed(7).predict(&sequence).unwrap();
        let c = loaded(2).with_seed(8).predict(&sequence).unwrap();
        assert_eq!(a, b);
        assert_ne!(a.confidence, c.confidence);
    }
}
