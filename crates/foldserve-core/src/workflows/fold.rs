use crate::core::io::pdb::{PdbFile, PdbMetadata};
use crate::core::io::traits::StructureFile;
use crate::core::models::job::{Job, JobId, StepResult};
use crate::core::models::sequence::Sequence;
use crate::engine::config::FoldConfig;
use crate::engine::error::EngineError;
use crate::engine::predictor::handle::ModelHandle;
use crate::engine::progress::{Progress, ProgressReporter};
use crate::engine::store::{JobStore, Registration};
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use tracing::{debug, error, info, instrument};

/// A registered job waiting for [`FoldService::run_job`].
#[derive(Debug, Clone, PartialEq)]
pub struct JobTicket {
    pub job_id: JobId,
    pub sequence: Sequence,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Submission {
    /// Newly registered; the caller must schedule [`FoldService::run_job`].
    Accepted(JobTicket),
    /// The id already has output; nothing will run.
    Exists(JobId),
}

impl Submission {
    pub fn job_id(&self) -> &JobId {
        match self {
            Self::Accepted(ticket) => &ticket.job_id,
            Self::Exists(id) => id,
        }
    }

    /// The status reported back to the submitter.
    pub fn status_label(&self) -> &'static str {
        match self {
            Self::Accepted(_) => "processing",
            Self::Exists(_) => "exists",
        }
    }
}

pub struct FoldService {
    config: FoldConfig,
    model: Arc<ModelHandle>,
    store: JobStore,
}

impl FoldService {
    pub fn new(config: FoldConfig, model: Arc<ModelHandle>) -> Result<Self, EngineError> {
        let store = JobStore::open(config.output.outputs_dir(), config.output.outputs_url())?;
        Ok(Self {
            config,
            model,
            store,
        })
    }

    pub fn config(&self) -> &FoldConfig {
        &self.config
    }

    pub fn model(&self) -> &Arc<ModelHandle> {
        &self.model
    }

    pub fn store(&self) -> &JobStore {
        &self.store
    }

    /// Validates a request and registers the job as processing without running it.
    ///
    /// A blank `job_id` is treated as absent and a fresh id is generated.
    pub fn submit(&self, raw_sequence: &str, job_id: Option<&str>) -> Result<Submission, EngineError> {
        let sequence = Sequence::parse(raw_sequence, &self.config.effective_limits())?;
        let job_id = match job_id.map(str::trim).filter(|raw| !raw.is_empty()) {
            Some(raw) => JobId::parse(raw)?,
            None => JobId::generate(),
        };

        let mut job = Job::new(job_id.clone(), sequence.as_str());
        job.start()?;

        match self.store.register(job)? {
            Registration::Created => {
                info!(
                    "Accepted job '{}' ({} residues).",
                    job_id,
                    sequence.len()
                );
                Ok(Submission::Accepted(JobTicket { job_id, sequence }))
            }
            Registration::Exists => {
                info!("Job '{}' already exists; skipping.", job_id);
                Ok(Submission::Exists(job_id))
            }
        }
    }

    /// Runs the pipeline for one registered job. Blocks for the whole inference.
    ///
    /// Pipeline failures are recorded on the job, which is returned in the
    /// `Failed` state. `Err` means even the failure could not be recorded.
    #[instrument(skip_all, name = "fold_job", fields(job_id = %ticket.job_id))]
    pub fn run_job(&self, ticket: &JobTicket, reporter: &ProgressReporter) -> Result<Job, EngineError> {
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| self.execute(ticket, reporter)));
        let message = match outcome {
            Ok(Ok(job)) => {
                info!("Job completed with {} steps.", job.total_steps());
                return Ok(job);
            }
            Ok(Err(e)) => e.to_string(),
            Err(_) => "pipeline panicked".to_string(),
        };

        error!("Job failed: {}", message);
        self.store.fail(&ticket.job_id, &message)
    }

    /// Snapshot of any job this data directory knows about.
    pub fn status(&self, raw_id: &str) -> Result<Job, EngineError> {
        // An id that could never have been issued cannot exist on disk either.
        let id = JobId::parse(raw_id).map_err(|_| EngineError::JobNotFound(raw_id.to_string()))?;
        self.store.get(&id)
    }

    fn execute(&self, ticket: &JobTicket, reporter: &ProgressReporter) -> Result<Job, EngineError> {
        let id = &ticket.job_id;

        reporter.report(Progress::PhaseStart { name: "Inference" });
        if !self.model.is_loaded() {
            reporter.report(Progress::Message(format!(
                "Loading model '{}'",
                self.model.model_name()
            )));
        }
        let prediction = self.model.predict(&ticket.sequence)?;
        reporter.report(Progress::PhaseFinish);

        let total = prediction.num_recycles();
        self.store.update(id, |job| job.set_total_steps(total))?;
        info!("Model produced {} recycles.", total);

        reporter.report(Progress::PhaseStart {
            name: "Writing structures",
        });
        reporter.report(Progress::TaskStart {
            total_steps: total as u64,
        });

        for (index, frames) in prediction.positions.iter().enumerate() {
            let path = self.store.step_path(id, index);
            let metadata = PdbMetadata {
                remarks: vec![
                    format!("MODEL {}", self.model.model_name()),
                    format!("JOB {} RECYCLE {} OF {}", id, index + 1, total),
                ],
                b_factors: Some(prediction.confidence.clone()),
                ..PdbMetadata::default()
            };
            PdbFile::write_to_path(frames, ticket.sequence.as_str(), &metadata, &path).map_err(
                |source| EngineError::Structure {
                    path: path.clone(),
                    source,
                },
            )?;

            let step = StepResult::new(
                index,
                self.store.file_reference(id, index),
                prediction.confidence.clone(),
            );
            debug!("Wrote step {} (avg confidence {:.2}).", index, step.avg_confidence);
            self.store.update(id, |job| job.record_step(step))?;
            reporter.report(Progress::TaskIncrement);
        }

        reporter.report(Progress::TaskFinish);
        reporter.report(Progress::PhaseFinish);
        self.store.complete(id)
    }
}
