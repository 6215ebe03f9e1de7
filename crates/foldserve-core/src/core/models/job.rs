use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

const JOB_ID_MAX_LEN: usize = 64;
const GENERATED_ID_LEN: usize = 8;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum JobIdError {
    #[error("Job id must be between 1 and 64 characters (got {0})")]
    Length(usize),
    #[error("Job id '{0}' may only contain ASCII letters, digits, '-' and '_'")]
    Charset(String),
}

/// Opaque job token. Always safe to use as a single path component.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct JobId(String);

impl JobId {
    pub fn generate() -> Self {
        let mut id = Uuid::new_v4().simple().to_string();
        id.truncate(GENERATED_ID_LEN);
        Self(id)
    }

    pub fn parse(raw: &str) -> Result<Self, JobIdError> {
        if raw.is_empty() || raw.len() > JOB_ID_MAX_LEN {
            return Err(JobIdError::Length(raw.len()));
        }
        if !raw
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(JobIdError::Charset(raw.to_string()));
        }
        Ok(Self(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for JobId {
    type Error = JobIdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<JobId> for String {
    fn from(id: JobId) -> Self {
        id.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobState {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl JobState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    pub fn can_transition_to(self, next: JobState) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Processing)
                | (Self::Processing, Self::Completed)
                | (Self::Pending, Self::Failed)
                | (Self::Processing, Self::Failed)
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StateError {
    #[error("cannot move job from '{from}' to '{to}'")]
    IllegalTransition { from: JobState, to: JobState },
    #[error("operation requires state '{expected}' but job is '{actual}'")]
    WrongState {
        expected: JobState,
        actual: JobState,
    },
    #[error("expected step {expected}, got step {found}")]
    StepOutOfOrder { expected: usize, found: usize },
    #[error("all {total} steps are already recorded")]
    ProgressOverflow { total: usize },
    #[error("only {progress} of {total} steps recorded")]
    Incomplete { progress: usize, total: usize },
    #[error("total step count is already fixed at {0}")]
    TotalAlreadyKnown(usize),
}

/// Output of one recycle: the structure file and its confidence scores.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepResult {
    #[serde(rename = "step")]
    pub index: usize,
    #[serde(rename = "pdb_url")]
    pub file_reference: String,
    #[serde(rename = "avg_plddt")]
    pub avg_confidence: f64,
    #[serde(rename = "plddt")]
    pub per_residue_confidence: Vec<f64>,
}

impl StepResult {
    pub fn new(index: usize, file_reference: String, per_residue_confidence: Vec<f64>) -> Self {
        let avg_confidence = if per_residue_confidence.is_empty() {
            0.0
        } else {
            per_residue_confidence.iter().sum::<f64>() / per_residue_confidence.len() as f64
        };
        Self {
            index,
            file_reference,
            avg_confidence,
            per_residue_confidence,
        }
    }
}

/// The immutable record persisted once a job completes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionSummary {
    pub job_id: JobId,
    pub sequence: String,
    pub status: JobState,
    pub num_recycles: usize,
    pub steps: Vec<StepResult>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    #[serde(rename = "job_id")]
    id: JobId,
    sequence: String,
    #[serde(rename = "status")]
    state: JobState,
    progress: usize,
    total_steps: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(default)]
    steps: Vec<StepResult>,
}

impl Job {
    pub fn new(id: JobId, sequence: impl Into<String>) -> Self {
        Self {
            id,
            sequence: sequence.into(),
            state: JobState::Pending,
            progress: 0,
            total_steps: 0,
            error: None,
            steps: Vec::new(),
        }
    }

    pub fn from_summary(summary: CompletionSummary) -> Self {
        let total = summary.steps.len();
        Self {
            id: summary.job_id,
            sequence: summary.sequence,
            state: JobState::Completed,
            progress: total,
            total_steps: total,
            error: None,
            steps: summary.steps,
        }
    }

    pub fn id(&self) -> &JobId {
        &self.id
    }

    pub fn sequence(&self) -> &str {
        &self.sequence
    }

    pub fn state(&self) -> JobState {
        self.state
    }

    pub fn progress(&self) -> usize {
        self.progress
    }

    pub fn total_steps(&self) -> usize {
        self.total_steps
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn steps(&self) -> &[StepResult] {
        &self.steps
    }

    fn transition(&mut self, next: JobState) -> Result<(), StateError> {
        if !self.state.can_transition_to(next) {
            return Err(StateError::IllegalTransition {
                from: self.state,
                to: next,
            });
        }
        self.state = next;
        Ok(())
    }

    fn require(&self, expected: JobState) -> Result<(), StateError> {
        if self.state != expected {
            return Err(StateError::WrongState {
                expected,
                actual: self.state,
            });
        }
        Ok(())
    }

    /// Pending -> Processing. The step count stays 0 until inference reports it.
    pub fn start(&mut self) -> Result<(), StateError> {
        self.transition(JobState::Processing)?;
        self.progress = 0;
        self.total_steps = 0;
        Ok(())
    }

    pub fn set_total_steps(&mut self, total: usize) -> Result<(), StateError> {
        self.require(JobState::Processing)?;
        if self.total_steps != 0 || !self.steps.is_empty() {
            return Err(StateError::TotalAlreadyKnown(self.total_steps));
        }
        self.total_steps = total;
        Ok(())
    }

    pub fn record_step(&mut self, step: StepResult) -> Result<(), StateError> {
        self.require(JobState::Processing)?;
        if self.progress >= self.total_steps {
            return Err(StateError::ProgressOverflow {
                total: self.total_steps,
            });
        }
        if step.index != self.steps.len() {
            return Err(StateError::StepOutOfOrder {
                expected: self.steps.len(),
                found: step.index,
            });
        }
        self.steps.push(step);
        self.progress += 1;
        Ok(())
    }

    pub fn complete(&mut self) -> Result<(), StateError> {
        self.require(JobState::Processing)?;
        if self.progress != self.total_steps || self.steps.len() != self.total_steps {
            return Err(StateError::Incomplete {
                progress: self.progress,
                total: self.total_steps,
            });
        }
        self.transition(JobState::Completed)
    }

    pub fn fail(&mut self, message: impl Into<String>) -> Result<(), StateError> {
        self.transition(JobState::Failed)?;
        self.error = Some(message.into());
        Ok(())
    }

    /// The persisted summary, available only once the job has completed.
    pub fn summary(&self) -> Option<CompletionSummary> {
        (self.state == JobState::Completed).then(|| CompletionSummary {
            job_id: self.id.clone(),
            sequence: self.sequence.clone(),
            status: JobState::Completed,
            num_recycles: self.total_steps,
            steps: self.steps.clone(),
        })
    }
}
