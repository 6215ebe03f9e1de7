use super::{Prediction, PredictorError, StructurePredictor};
use crate::core::models::sequence::Sequence;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::time::Instant;
use tracing::{debug, info, warn};

/// Process-wide owner of the single model instance.
///
/// Every operation takes the same lock, so loads, unloads and predictions
/// never overlap and at most one `predict` is in flight.
pub struct ModelHandle {
    model_name: String,
    predictor: Mutex<Box<dyn StructurePredictor>>,
    loaded: AtomicBool,
}

impl ModelHandle {
    pub fn new(predictor: Box<dyn StructurePredictor>) -> Self {
        let loaded = predictor.is_loaded();
        Self {
            model_name: predictor.model_name().to_string(),
            predictor: Mutex::new(predictor),
            loaded: AtomicBool::new(loaded),
        }
    }

    pub fn model_name(&self) -> &str {
        &self.model_name
    }

    /// Last known residency; readable without waiting on an in-flight prediction.
    pub fn is_loaded(&self) -> bool {
        self.loaded.load(Ordering::Acquire)
    }

    pub fn load(&self) -> Result<(), PredictorError> {
        let mut predictor = self.lock();
        self.ensure_loaded(predictor.as_mut())
    }

    pub fn unload(&self) {
        let mut predictor = self.lock();
        if predictor.is_loaded() {
            info!("Releasing model '{}'.", self.model_name);
            predictor.unload();
        }
        self.loaded.store(false, Ordering::Release);
    }

    /// Runs one prediction, loading the model first if it is not resident.
    pub fn predict(&self, sequence: &Sequence) -> Result<Prediction, PredictorError> {
        let mut predictor = self.lock();
        self.ensure_loaded(predictor.as_mut())?;

        debug!("Running inference on {} residues.", sequence.len());
        let started = Instant::now();
        let prediction = predictor.predict(sequence)?;
        prediction.validate(sequence.len())?;
        debug!(
            "Inference produced {} recycles in {:.2?}.",
            prediction.num_recycles(),
            started.elapsed()
        );
        Ok(prediction)
    }

    fn ensure_loaded(&self, predictor: &mut dyn StructurePredictor) -> Result<(), PredictorError> {
        if predictor.is_loaded() {
            return Ok(());
        }
        info!("Loading model '{}'...", self.model_name);
        let started = Instant::now();
        predictor.load()?;
        self.loaded.store(true, Ordering::Release);
        info!(
            "Model '{}' loaded in {:.2?}.",
            self.model_name,
            started.elapsed()
        );
        Ok(())
    }

    fn lock(&self) -> MutexGuard<'_, Box<dyn StructurePredictor>> {
        self.predictor.lock().unwrap_or_else(|poisoned| {
            warn!("A previous inference call panicked; resetting model state.");
            let mut guard = poisoned.into_inner();
            guard.unload();
            self.loaded.store(false, Ordering::Release);
            self.predictor.clear_poison();
            guard
        })
    }
}
