use crate::backend;
use crate::cli::FoldArgs;
use crate::config::{self, ServerOverrides};
use crate::error::{CliError, Result};
use crate::utils::progress::FoldProgress;
use foldserve::core::models::job::JobState;
use foldserve::engine::predictor::handle::ModelHandle;
use foldserve::engine::progress::ProgressReporter;
use foldserve::engine::store::JobStore;
use foldserve::workflows::fold::{FoldService, Submission};
use std::sync::Arc;
use tokio::task;
use tracing::info;

pub async fn run(args: FoldArgs) -> Result<()> {
    let app_config = config::build_config(&args.common, &ServerOverrides::default())?;
    let predictor = backend::build_predictor(&app_config)?;
    let model = Arc::new(ModelHandle::new(predictor));
    let service = Arc::new(FoldService::new(app_config.core_config, model)?);

    let ticket = match service.submit(&args.sequence, args.job_id.as_deref())? {
        Submission::Accepted(ticket) => ticket,
        Submission::Exists(job_id) => {
            println!(
                "Job '{}' already exists in {}",
                job_id,
                service.store().job_dir(&job_id).display()
            );
            return Ok(());
        }
    };

    println!(
        "Folding {} residues as job '{}'...",
        ticket.sequence.len(),
        ticket.job_id
    );
    info!("Invoking the fold workflow inline.");

    let progress = FoldProgress::new();
    let worker = service.clone();
    let worker_ticket = ticket.clone();
    let job = task::spawn_blocking(move || {
        let reporter = ProgressReporter::with_callback(progress.callback());
        let job = worker.run_job(&worker_ticket, &reporter);
        worker.model().unload();
        job
    })
    .await
    .map_err(|e| CliError::Other(anyhow::anyhow!("Fold worker failed: {}", e)))??;

    if job.state() == JobState::Failed {
        return Err(CliError::JobFailed {
            job_id: job.id().to_string(),
            reason: job.error().unwrap_or("unknown error").to_string(),
        });
    }

    let dir = service.store().job_dir(&ticket.job_id);
    for step in job.steps() {
        println!(
            "  step {:>2}: avg pLDDT {:>6.2}  {}",
            step.index,
            step.avg_confidence,
            dir.join(JobStore::step_file_name(step.index)).display()
        );
    }
    println!("✓ {} structures written to {}", job.total_steps(), dir.display());
    Ok(())
}
