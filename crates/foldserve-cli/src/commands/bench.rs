use crate::backend;
use crate::cli::BenchArgs;
use crate::config::{self, ServerOverrides};
use crate::error::{CliError, Result};
use crate::utils::progress::FoldProgress;
use foldserve::engine::predictor::handle::ModelHandle;
use foldserve::engine::progress::ProgressReporter;
use foldserve::workflows::bench::{self, BenchConfig, BenchReport, DEFAULT_LENGTHS};
use std::sync::Arc;
use tokio::task;
use tracing::info;

pub async fn run(args: BenchArgs) -> Result<()> {
    let app_config = config::build_config(&args.common, &ServerOverrides::default())?;
    let predictor = backend::build_predictor(&app_config)?;
    let model = Arc::new(ModelHandle::new(predictor));

    let lengths = if args.lengths.is_empty() {
        DEFAULT_LENGTHS.to_vec()
    } else {
        args.lengths
    };
    let bench_config = BenchConfig {
        lengths,
        limits: app_config.core_config.effective_limits(),
        warmup: !args.no_warmup,
        seed: args.seed,
    };
    info!(
        "Benchmarking {} lengths on model '{}'.",
        bench_config.lengths.len(),
        model.model_name()
    );

    let progress = FoldProgress::new();
    let worker = model.clone();
    let report = task::spawn_blocking(move || {
        let reporter = ProgressReporter::with_callback(progress.callback());
        let report = bench::run(&worker, &bench_config, &reporter);
        worker.unload();
        report
    })
    .await
    .map_err(|e| CliError::Other(anyhow::anyhow!("Benchmark worker failed: {}", e)))??;

    print_report(&report);
    Ok(())
}

fn print_report(report: &BenchReport) {
    println!("Model loaded in {:.2}s", report.load_time.as_secs_f64());
    println!("{:<10} | {:<10} | {}", "Length", "Time (s)", "Recycles");
    println!("{}", "-".repeat(34));
    for sample in &report.samples {
        println!(
            "{:<10} | {:<10.4} | {}",
            sample.length,
            sample.elapsed.as_secs_f64(),
            sample.recycles
        );
    }
    if !report.skipped.is_empty() {
        println!("Skipped (outside the accepted length range): {:?}", report.skipped);
    }
    if let Some(failure) = &report.stopped_at {
        eprintln!(
            "⚠ Stopped at length {}: {}",
            failure.length, failure.reason
        );
    }
}
