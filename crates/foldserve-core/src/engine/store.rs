//! Filesystem-backed job registry.
//!
//! Every job owns one directory under the outputs root. A completed job is
//! described by its immutable `metadata.json`; a job still in flight (or one
//! that failed) by `status.json`. The in-memory map only caches jobs this
//! process is still running, so the directory tree alone answers every lookup.

use super::error::EngineError;
use crate::core::models::job::{CompletionSummary, Job, JobId, StateError};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock};
use tracing::{debug, info, warn};

pub const SUMMARY_FILE: &str = "metadata.json";
pub const STATUS_FILE: &str = "status.json";
pub const INTERRUPTED_MESSAGE: &str = "job interrupted before completion";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Registration {
    Created,
    /// The id already has an output directory; nothing was changed.
    Exists,
}

#[derive(Debug)]
pub struct JobStore {
    root: PathBuf,
    url_base: String,
    live: RwLock<HashMap<JobId, Job>>,
}

impl JobStore {
    /// Opens (creating if necessary) the outputs root.
    ///
    /// `url_base` is the public URL path that maps onto `root`, e.g. `/data/outputs`.
    pub fn open(root: impl Into<PathBuf>, url_base: impl Into<String>) -> Result<Self, EngineError> {
        let root = root.into();
        fs::create_dir_all(&root).map_err(|source| EngineError::Store {
            path: root.clone(),
            source,
        })?;
        Ok(Self {
            root,
            url_base: url_base.into().trim_end_matches('/').to_string(),
            live: RwLock::new(HashMap::new()),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn job_dir(&self, id: &JobId) -> PathBuf {
        self.root.join(id.as_str())
    }

    pub fn step_file_name(index: usize) -> String {
        format!("step_{}.pdb", index)
    }

    pub fn step_path(&self, id: &JobId, index: usize) -> PathBuf {
        self.job_dir(id).join(Self::step_file_name(index))
    }

    /// Public URL of a step's structure file.
    pub fn file_reference(&self, id: &JobId, index: usize) -> String {
        format!("{}/{}/{}", self.url_base, id, Self::step_file_name(index))
    }

    /// Claims the job's directory and records it as live.
    ///
    /// Directory creation is the atomic claim. An existing directory counts as
    /// taken only if it holds a job record; one without either document (for
    /// example left by a failed claim) is reused.
    pub fn register(&self, job: Job) -> Result<Registration, EngineError> {
        let mut live = self.live.write().unwrap_or_else(PoisonError::into_inner);
        if live.contains_key(job.id()) {
            return Ok(Registration::Exists);
        }

        let dir = self.job_dir(job.id());
        let created = match fs::create_dir(&dir) {
            Ok(()) => true,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                if has_record(&dir) {
                    debug!("Job '{}' already has a record on disk.", job.id());
                    return Ok(Registration::Exists);
                }
                warn!(
                    "Reusing output directory of job '{}', which holds no job record.",
                    job.id()
                );
                false
            }
            Err(source) => return Err(EngineError::Store { path: dir, source }),
        };

        if let Err(e) = write_json_atomic(&dir.join(STATUS_FILE), &job) {
            if created {
                if let Err(cleanup) = fs::remove_dir_all(&dir) {
                    warn!("Could not release '{}': {}", dir.display(), cleanup);
                }
            }
            return Err(e);
        }
        live.insert(job.id().clone(), job);
        Ok(Registration::Created)
    }

    /// Applies a state change to a live job and writes it through to disk.
    ///
    /// The change is committed to memory only if both the transition and the
    /// write succeed.
    pub fn update<F>(&self, id: &JobId, change: F) -> Result<Job, EngineError>
    where
        F: FnOnce(&mut Job) -> Result<(), StateError>,
    {
        let mut live = self.live.write().unwrap_or_else(PoisonError::into_inner);
        let current = live
            .get(id)
            .ok_or_else(|| EngineError::JobNotFound(id.to_string()))?;

        let mut next = current.clone();
        change(&mut next)?;
        write_json_atomic(&self.job_dir(id).join(STATUS_FILE), &next)?;
        live.insert(id.clone(), next.clone());
        Ok(next)
    }

    /// Finalizes a live job: persists its summary and drops the transient record.
    pub fn complete(&self, id: &JobId) -> Result<Job, EngineError> {
        let mut live = self.live.write().unwrap_or_else(PoisonError::into_inner);
        let mut job = live
            .get(id)
            .cloned()
            .ok_or_else(|| EngineError::JobNotFound(id.to_string()))?;

        job.complete()?;
        let summary = job
            .summary()
            .ok_or_else(|| EngineError::Internal(format!("job '{}' has no summary", id)))?;

        let dir = self.job_dir(id);
        write_json_atomic(&dir.join(SUMMARY_FILE), &summary)?;
        remove_if_present(&dir.join(STATUS_FILE));
        live.remove(id);
        Ok(job)
    }

    /// Marks a live job failed. The failure stays visible through `status.json`.
    pub fn fail(&self, id: &JobId, message: &str) -> Result<Job, EngineError> {
        let mut live = self.live.write().unwrap_or_else(PoisonError::into_inner);
        let mut job = live
            .get(id)
            .cloned()
            .ok_or_else(|| EngineError::JobNotFound(id.to_string()))?;

        job.fail(message)?;
        match write_json_atomic(&self.job_dir(id).join(STATUS_FILE), &job) {
            Ok(()) => {
                live.remove(id);
                Ok(job)
            }
            Err(e) => {
                // Keep the failure observable from memory at least.
                live.insert(id.clone(), job);
                Err(e)
            }
        }
    }

    /// Current snapshot of a job, durable record first.
    ///
    /// An in-flight `status.json` is reported as stored, even when another
    /// process owns it; see [`JobStore::recover_interrupted`].
    pub fn get(&self, id: &JobId) -> Result<Job, EngineError> {
        // Held across every step so a concurrent `complete` is seen whole or not at all.
        let live = self.live.read().unwrap_or_else(PoisonError::into_inner);
        let dir = self.job_dir(id);

        if let Some(summary) = read_json::<CompletionSummary>(&dir.join(SUMMARY_FILE))? {
            return Ok(Job::from_summary(summary));
        }
        if let Some(job) = live.get(id) {
            return Ok(job.clone());
        }
        read_json::<Job>(&dir.join(STATUS_FILE))?
            .ok_or_else(|| EngineError::JobNotFound(id.to_string()))
    }

    /// Fails every pending or processing record on disk that this store is not running.
    ///
    /// Meant for the start of the process that runs jobs for this directory,
    /// before it accepts any: records left in flight then belong to a process
    /// that died. Returns the recovered ids, sorted.
    pub fn recover_interrupted(&self) -> Result<Vec<JobId>, EngineError> {
        let live = self.live.write().unwrap_or_else(PoisonError::into_inner);
        let store_err = |source| EngineError::Store {
            path: self.root.clone(),
            source,
        };

        let mut recovered = Vec::new();
        for entry in fs::read_dir(&self.root).map_err(store_err)? {
            let entry = entry.map_err(store_err)?;
            if !entry.file_type().map_err(store_err)?.is_dir() {
                continue;
            }
            let Some(id) = entry.file_name().to_str().and_then(|name| JobId::parse(name).ok()) else {
                continue;
            };
            if live.contains_key(&id) || entry.path().join(SUMMARY_FILE).is_file() {
                continue;
            }

            let status_path = entry.path().join(STATUS_FILE);
            let mut job = match read_json::<Job>(&status_path) {
                Ok(Some(job)) if !job.state().is_terminal() => job,
                Ok(_) => continue,
                Err(e) => {
                    warn!("Skipping job '{}' during recovery: {}", id, e);
                    continue;
                }
            };
            job.fail(INTERRUPTED_MESSAGE)?;
            write_json_atomic(&status_path, &job)?;
            info!("Job '{}' was interrupted by a previous shutdown.", id);
            recovered.push(id);
        }

        recovered.sort();
        Ok(recovered)
    }
}

fn has_record(dir: &Path) -> bool {
    dir.join(SUMMARY_FILE).is_file() || dir.join(STATUS_FILE).is_file()
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>, EngineError> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(source) => {
            return Err(EngineError::Store {
                path: path.to_path_buf(),
                source,
            });
        }
    };
    serde_json::from_slice(&bytes)
        .map(Some)
        .map_err(|source| EngineError::Document {
            path: path.to_path_buf(),
            source,
        })
}

/// Writes to a sibling temp file and renames it over `path`.
fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> Result<(), EngineError> {
    let bytes = serde_json::to_vec_pretty(value).map_err(|source| EngineError::Document {
        path: path.to_path_buf(),
        source,
    })?;
    let tmp = path.with_extension("json.tmp");
    let store_err = |source| EngineError::Store {
        path: path.to_path_buf(),
        source,
    };
    fs::write(&tmp, bytes).map_err(store_err)?;
    fs::rename(&tmp, path).map_err(store_err)
}

fn remove_if_present(path: &Path) {
    if let Err(e) = fs::remove_file(path) {
        if e.kind() != ErrorKind::NotFound {
            warn!("Could not remove '{}': {}", path.display(), e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::job::{JobState, StepResult};
    use tempfile::TempDir;

    fn setup() -> (TempDir, JobStore) {
        let dir = TempDir::new().unwrap();
        let store = JobStore::open(dir.path().join("outputs"), "/data/outputs/").unwrap();
        (dir, store)
    }

    fn id(raw: &str) -> JobId {
        JobId::parse(raw).unwrap()
    }

    fn run_to_completion(store: &JobStore, job_id: &JobId, steps: usize) {
        store.update(job_id, Job::start).unwrap();
        store
            .update(job_id, |job| job.set_total_steps(steps))
            .unwrap();
        for i in 0..steps {
            let reference = store.file_reference(job_id, i);
            store
                .update(job_id, |job| {
                    job.record_step(StepResult::new(i, reference, vec![70.0; 10]))
                })
                .unwrap();
        }
        store.complete(job_id).unwrap();
    }

    #[test]
    fn file_references_use_the_public_url_base() {
        let (_dir, store) = setup();
        assert_eq!(
            store.file_reference(&id("abc"), 3),
            "/data/outputs/abc/step_3.pdb"
        );
        assert!(store.step_path(&id("abc"), 3).ends_with("abc/step_3.pdb"));
    }

    #[test]
    fn register_creates_directory_and_status_record() {
        let (_dir, store) = setup();
        let job_id = id("job-1");
        let outcome = store.register(Job::new(job_id.clone(), "ACDEFGHIKL")).unwrap();
        assert_eq!(outcome, Registration::Created);
        assert!(store.job_dir(&job_id).join(STATUS_FILE).is_file());
        assert_eq!(store.get(&job_id).unwrap().state(), JobState::Pending);
    }

    #[test]
    fn register_is_idempotent_per_id() {
        let (_dir, store) = setup();
        let job_id = id("dup");
        store.register(Job::new(job_id.clone(), "ACDEFGHIKL")).unwrap();
        let again = store.register(Job::new(job_id.clone(), "MKTAYIAKQR")).unwrap();
        assert_eq!(again, Registration::Exists);
        assert_eq!(store.get(&job_id).unwrap().sequence(), "ACDEFGHIKL");
    }

    #[test]
    fn register_reuses_a_directory_without_records() {
        let (_dir, store) = setup();
        fs::create_dir(store.root().join("old")).unwrap();
        let outcome = store.register(Job::new(id("old"), "ACDEFGHIKL")).unwrap();
        assert_eq!(outcome, Registration::Created);
        assert_eq!(store.get(&id("old")).unwrap().state(), JobState::Pending);
    }

    #[test]
    fn register_keeps_directories_that_hold_a_record() {
        let (_dir, store) = setup();
        let job_id = id("taken");
        store.register(Job::new(job_id.clone(), "ACDEFGHIKL")).unwrap();

        let other = JobStore::open(store.root(), "/data/outputs").unwrap();
        let outcome = other.register(Job::new(job_id.clone(), "MKTAYIAKQR")).unwrap();
        assert_eq!(outcome, Registration::Exists);
        assert_eq!(other.get(&job_id).unwrap().sequence(), "ACDEFGHIKL");
    }

    #[test]
    fn summaries_read_back_bit_for_bit() {
        let (_dir, store) = setup();
        let job_id = id("precise");
        let confidence = vec![
            94.81177433390869,
            0.1 + 0.2,
            1.0 / 3.0,
            50.000000000000014,
            72.12345678901234,
        ];
        store.register(Job::new(job_id.clone(), "ACDEF")).unwrap();
        store.update(&job_id, Job::start).unwrap();
        store.update(&job_id, |job| job.set_total_steps(1)).unwrap();
        let reference = store.file_reference(&job_id, 0);
        store
            .update(&job_id, |job| {
                job.record_step(StepResult::new(0, reference, confidence.clone()))
            })
            .unwrap();
        let finished = store.complete(&job_id).unwrap();

        let reopened = JobStore::open(store.root(), "/data/outputs").unwrap();
        let read = reopened.get(&job_id).unwrap();
        assert_eq!(read.steps()[0].per_residue_confidence, confidence);
        assert_eq!(
            read.steps()[0].avg_confidence.to_bits(),
            finished.steps()[0].avg_confidence.to_bits()
        );
        assert_eq!(read, finished);
    }

    #[test]
    fn completed_jobs_are_served_from_the_summary() {
        let (_dir, store) = setup();
        let job_id = id("done");
        store.register(Job::new(job_id.clone(), "ACDEFGHIKL")).unwrap();
        run_to_completion(&store, &job_id, 3);

        let dir = store.job_dir(&job_id);
        assert!(dir.join(SUMMARY_FILE).is_file());
        assert!(!dir.join(STATUS_FILE).exists());

        let job = store.get(&job_id).unwrap();
        assert_eq!(job.state(), JobState::Completed);
        assert_eq!(job.progress(), 3);
        assert_eq!(job.total_steps(), 3);
        assert_eq!(job.steps()[2].file_reference, "/data/outputs/done/step_2.pdb");

        // A fresh process sees the same thing.
        let reopened = JobStore::open(store.root(), "/data/outputs").unwrap();
        assert_eq!(reopened.get(&job_id).unwrap(), job);
    }

    #[test]
    fn complete_refuses_unfinished_jobs() {
        let (_dir, store) = setup();
        let job_id = id("partial");
        store.register(Job::new(job_id.clone(), "ACDEFGHIKL")).unwrap();
        store.update(&job_id, Job::start).unwrap();
        store.update(&job_id, |job| job.set_total_steps(2)).unwrap();

        assert!(matches!(
            store.complete(&job_id),
            Err(EngineError::State {
                source: StateError::Incomplete { .. }
            })
        ));
        assert_eq!(store.get(&job_id).unwrap().state(), JobState::Processing);
        assert!(!store.job_dir(&job_id).join(SUMMARY_FILE).exists());
    }

    #[test]
    fn rejected_updates_leave_the_job_untouched() {
        let (_dir, store) = setup();
        let job_id = id("bad-move");
        store.register(Job::new(job_id.clone(), "ACDEFGHIKL")).unwrap();
        assert!(store.update(&job_id, Job::complete).is_err());
        assert_eq!(store.get(&job_id).unwrap().state(), JobState::Pending);
    }

    #[test]
    fn failures_survive_a_restart() {
        let (_dir, store) = setup();
        let job_id = id("broken");
        store.register(Job::new(job_id.clone(), "ACDEFGHIKL")).unwrap();
        store.update(&job_id, Job::start).unwrap();
        store.fail(&job_id, "inference backend unreachable").unwrap();

        let reopened = JobStore::open(store.root(), "/data/outputs").unwrap();
        let job = reopened.get(&job_id).unwrap();
        assert_eq!(job.state(), JobState::Failed);
        assert_eq!(job.error(), Some("inference backend unreachable"));
    }

    #[test]
    fn other_readers_see_running_jobs_as_stored() {
        let (_dir, server) = setup();
        let job_id = id("running");
        server.register(Job::new(job_id.clone(), "ACDEFGHIKL")).unwrap();
        server.update(&job_id, Job::start).unwrap();

        let reader = JobStore::open(server.root(), "/data/outputs").unwrap();
        let seen = reader.get(&job_id).unwrap();
        assert_eq!(seen.state(), JobState::Processing);
        assert_eq!(seen.error(), None);
        assert_eq!(server.get(&job_id).unwrap().state(), JobState::Processing);
    }

    #[test]
    fn recovery_fails_only_records_nobody_is_running() {
        let (_dir, store) = setup();
        let orphan = id("orphan");
        let waiting = id("waiting");
        let failed = id("failed");
        let done = id("done");
        for job_id in [&orphan, &waiting, &failed, &done] {
            store.register(Job::new(job_id.clone(), "ACDEFGHIKL")).unwrap();
        }
        store.update(&orphan, Job::start).unwrap();
        store.update(&failed, Job::start).unwrap();
        store.fail(&failed, "backend unreachable").unwrap();
        run_to_completion(&store, &done, 2);
        fs::write(store.root().join("stray.txt"), b"not a job").unwrap();

        let restarted = JobStore::open(store.root(), "/data/outputs").unwrap();
        let recovered = restarted.recover_interrupted().unwrap();
        assert_eq!(recovered, vec![orphan.clone(), waiting.clone()]);

        for job_id in [&orphan, &waiting] {
            let job = restarted.get(job_id).unwrap();
            assert_eq!(job.state(), JobState::Failed);
            assert_eq!(job.error(), Some(INTERRUPTED_MESSAGE));
        }
        assert_eq!(restarted.get(&failed).unwrap().error(), Some("backend unreachable"));
        assert_eq!(restarted.get(&done).unwrap().state(), JobState::Completed);
        assert!(restarted.recover_interrupted().unwrap().is_empty());
    }

    #[test]
    fn recovery_leaves_live_jobs_alone() {
        let (_dir, store) = setup();
        let job_id = id("mine");
        store.register(Job::new(job_id.clone(), "ACDEFGHIKL")).unwrap();
        store.update(&job_id, Job::start).unwrap();

        assert!(store.recover_interrupted().unwrap().is_empty());
        assert_eq!(store.get(&job_id).unwrap().state(), JobState::Processing);
        store.update(&job_id, |job| job.set_total_steps(1)).unwrap();
    }

    #[test]
    fn unknown_ids_are_not_found() {
        let (_dir, store) = setup();
        assert!(matches!(
            store.get(&id("nope")),
            Err(EngineError::JobNotFound(_))
        ));
        assert!(matches!(
            store.update(&id("nope"), Job::start),
            Err(EngineError::JobNotFound(_))
        ));
    }

    #[test]
    fn corrupt_documents_are_reported() {
        let (_dir, store) = setup();
        let dir = store.root().join("garbled");
        fs::create_dir(&dir).unwrap();
        fs::write(dir.join(SUMMARY_FILE), b"{ not json").unwrap();
        assert!(matches!(
            store.get(&id("garbled")),
            Err(EngineError::Document { .. })
        ));
    }
}
