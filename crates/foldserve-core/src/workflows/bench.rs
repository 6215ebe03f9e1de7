use crate::core::models::sequence::{Sequence, SequenceLimits};
use crate::core::utils::identifiers::CANONICAL_ALPHABET;
use crate::engine::error::EngineError;
use crate::engine::predictor::handle::ModelHandle;
use crate::engine::progress::{Progress, ProgressReporter};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::time::{Duration, Instant};
use tracing::{debug, info, instrument, warn};

/// Lengths swept when none are requested. Those above the model limit are skipped.
pub const DEFAULT_LENGTHS: &[usize] = &[
    10, 50, 100, 150, 200, 250, 300, 350, 400, 450, 500, 550, 600, 650, 700, 800, 900, 1000, 1200,
];

const WARMUP_LENGTH: usize = 20;

#[derive(Debug, Clone, PartialEq)]
pub struct BenchConfig {
    pub lengths: Vec<usize>,
    pub limits: SequenceLimits,
    /// Run one short untimed prediction before the sweep.
    pub warmup: bool,
    pub seed: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BenchSample {
    pub length: usize,
    pub elapsed: Duration,
    pub recycles: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BenchFailure {
    pub length: usize,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BenchReport {
    pub load_time: Duration,
    pub samples: Vec<BenchSample>,
    /// Requested lengths outside the accepted range. They never reach the model.
    pub skipped: Vec<usize>,
    /// The sweep ends at the first failed prediction, typically the first
    /// length the device runs out of memory on.
    pub stopped_at: Option<BenchFailure>,
}

/// Times one prediction per requested length on random sequences.
///
/// Loading counts separately from the sweep. Load and warmup failures are
/// errors; a failure during the sweep is part of the report.
#[instrument(skip_all, name = "bench", fields(lengths = config.lengths.len()))]
pub fn run(
    model: &ModelHandle,
    config: &BenchConfig,
    reporter: &ProgressReporter,
) -> Result<BenchReport, EngineError> {
    let mut rng = StdRng::seed_from_u64(config.seed);
    let (runnable, skipped): (Vec<usize>, Vec<usize>) = config
        .lengths
        .iter()
        .copied()
        .partition(|&length| config.limits.contains(length));
    for length in &skipped {
        warn!(
            "Skipping length {} (accepted range [{}, {}]).",
            length, config.limits.min_length, config.limits.max_length
        );
    }

    reporter.report(Progress::PhaseStart {
        name: "Loading model",
    });
    let started = Instant::now();
    model.load()?;
    let load_time = started.elapsed();
    reporter.report(Progress::PhaseFinish);
    info!("Model '{}' ready in {:.2?}.", model.model_name(), load_time);

    if config.warmup {
        let length = WARMUP_LENGTH
            .max(config.limits.min_length)
            .min(config.limits.max_length);
        reporter.report(Progress::Message(format!("Warmup on {} residues", length)));
        model.predict(&random_sequence(&mut rng, length, &config.limits)?)?;
    }

    reporter.report(Progress::PhaseStart { name: "Benchmark" });
    reporter.report(Progress::TaskStart {
        total_steps: runnable.len() as u64,
    });

    let mut samples = Vec::with_capacity(runnable.len());
    let mut stopped_at = None;
    for length in runnable {
        let sequence = random_sequence(&mut rng, length, &config.limits)?;
        let started = Instant::now();
        match model.predict(&sequence) {
            Ok(prediction) => {
                let elapsed = started.elapsed();
                debug!("Length {}: {:.4}s.", length, elapsed.as_secs_f64());
                samples.push(BenchSample {
                    length,
                    elapsed,
                    recycles: prediction.num_recycles(),
                });
                reporter.report(Progress::TaskIncrement);
            }
            Err(e) => {
                warn!("Prediction failed at length {}: {}", length, e);
                stopped_at = Some(BenchFailure {
                    length,
                    reason: e.to_string(),
                });
                break;
            }
        }
    }

    reporter.report(Progress::TaskFinish);
    reporter.report(Progress::PhaseFinish);
    Ok(BenchReport {
        load_time,
        samples,
        skipped,
        stopped_at,
    })
}

fn random_sequence(
    rng: &mut StdRng,
    length: usize,
    limits: &SequenceLimits,
) -> Result<Sequence, EngineError> {
    let alphabet = CANONICAL_ALPHABET.as_bytes();
    let raw: String = (0..length)
        .map(|_| alphabet[rng.gen_range(0..alphabet.len())] as char)
        .collect();
    Ok(Sequence::parse(&raw, limits)?)
}
