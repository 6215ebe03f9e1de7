use crate::backend;
use crate::cli::ServeArgs;
use crate::config::{self, ServerOverrides};
use crate::error::{CliError, Result};
use crate::server::{self, state::AppState};
use foldserve::engine::predictor::handle::ModelHandle;
use foldserve::workflows::fold::FoldService;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::task;
use tracing::{info, warn};

pub async fn run(args: ServeArgs) -> Result<()> {
    let overrides = ServerOverrides {
        listen: args.listen,
        webapp_dir: args.webapp_dir.clone(),
    };
    let app_config = config::build_config(&args.common, &overrides)?;

    let predictor = backend::build_predictor(&app_config)?;
    let model = Arc::new(ModelHandle::new(predictor));
    let service = Arc::new(FoldService::new(app_config.core_config.clone(), model.clone())?);
    let limits = service.config().effective_limits();
    info!(
        "Job outputs under {:?}, length limits {}..={}.",
        service.store().root(),
        limits.min_length,
        limits.max_length
    );

    let interrupted = service.store().recover_interrupted()?;
    if !interrupted.is_empty() {
        warn!(
            "Marked {} job(s) left in flight by a previous run as failed.",
            interrupted.len()
        );
    }

    println!("Loading model '{}'...", model.model_name());
    let loader = model.clone();
    match task::spawn_blocking(move || loader.load()).await {
        Ok(Ok(())) => info!("Model ready."),
        Ok(Err(e)) => warn!("Model failed to load at startup ({}); jobs will retry on demand.", e),
        Err(e) => return Err(CliError::Other(anyhow::anyhow!("Model loader task failed: {}", e))),
    }

    let app = server::router(
        AppState::new(service),
        app_config.server.webapp_dir.as_deref(),
    );
    let listener = TcpListener::bind(app_config.server.listen).await?;
    let addr = listener.local_addr()?;
    info!("Listening on http://{}", addr);
    println!("Serving on http://{} (Ctrl-C to stop)", addr);

    let served = server::serve(listener, app).await;

    info!("Server stopped; releasing model.");
    let unloader = model.clone();
    if let Err(e) = task::spawn_blocking(move || unloader.unload()).await {
        warn!("Model unload task failed: {}", e);
    }
    served
}
