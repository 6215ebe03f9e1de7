use crate::cli::StatusArgs;
use crate::config::{self, ServerOverrides};
use crate::error::{CliError, Result};
use foldserve::core::models::job::JobId;
use foldserve::engine::error::EngineError;
use foldserve::engine::store::JobStore;

pub async fn run(args: StatusArgs) -> Result<()> {
    let app_config = config::build_config(&args.common, &ServerOverrides::default())?;
    let output = &app_config.core_config.output;
    let store = JobStore::open(output.outputs_dir(), output.outputs_url())?;

    let job_id = JobId::parse(&args.job_id)
        .map_err(|_| EngineError::JobNotFound(args.job_id.clone()))?;
    let job = store.get(&job_id)?;

    let rendered = serde_json::to_string_pretty(&job).map_err(|e| CliError::Other(e.into()))?;
    println!("{}", rendered);
    Ok(())
}
