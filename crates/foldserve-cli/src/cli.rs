use crate::config::models::BackendKind;
use clap::{Args, Parser, Subcommand};
use foldserve::engine::config::Device;
use std::net::SocketAddr;
use std::path::PathBuf;

const HELP_TEMPLATE: &str = "\
{before-help}{name} {version}
{author-with-newline}{about-with-newline}
{usage-heading} {usage}

{all-args}{after-help}
";

#[derive(Parser, Debug)]
#[command(
    author = "foldserve contributors",
    version,
    about = "foldserve - Serve a protein structure-prediction model over HTTP, or fold a single sequence from the command line.",
    help_template = HELP_TEMPLATE,
)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity level (-v for INFO, -vv for DEBUG, -vvv for TRACE)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all log output except for errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Write logs to a specified file in addition to the console output
    #[arg(long, global = true, value_name = "PATH")]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the HTTP job server.
    Serve(ServeArgs),
    /// Fold one sequence in the foreground and write its structures to the data directory.
    Fold(FoldArgs),
    /// Print the status document of a job stored in the data directory.
    Status(StatusArgs),
    /// Time inference on random sequences across a range of lengths.
    Bench(BenchArgs),
}

/// Settings shared by every subcommand; each one overrides the config file.
#[derive(Args, Debug, Clone, Default)]
pub struct CommonArgs {
    /// Path to a configuration file in TOML format.
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Directory holding job outputs (served under /data).
    #[arg(short, long, value_name = "PATH")]
    pub data_dir: Option<PathBuf>,

    /// Model identifier passed to the inference backend.
    #[arg(short, long, value_name = "NAME")]
    pub model: Option<String>,

    /// Compute device for inference (cpu, cuda or auto).
    #[arg(long, value_name = "DEVICE")]
    pub device: Option<Device>,

    /// Inference backend.
    #[arg(long, value_enum, value_name = "KIND")]
    pub backend: Option<BackendKind>,

    /// Base URL of the remote inference service.
    #[arg(long, value_name = "URL")]
    pub endpoint: Option<String>,

    /// Shortest accepted sequence.
    #[arg(long, value_name = "INT")]
    pub min_length: Option<usize>,

    /// Longest accepted sequence.
    #[arg(long, value_name = "INT")]
    pub max_length: Option<usize>,

    /// Set a specific configuration value, overriding the config file.
    /// Can be used multiple times. Example: -S model.timeout-secs=120
    #[arg(short = 'S', long = "set", value_name = "KEY=VALUE", num_args(0..))]
    pub set_values: Vec<String>,
}

/// Arguments for the `serve` subcommand.
#[derive(Args, Debug)]
pub struct ServeArgs {
    #[command(flatten)]
    pub common: CommonArgs,

    /// Address to listen on.
    #[arg(short, long, value_name = "ADDR")]
    pub listen: Option<SocketAddr>,

    /// Directory with a static web front end, mounted at /.
    #[arg(long, value_name = "PATH")]
    pub webapp_dir: Option<PathBuf>,
}

/// Arguments for the `fold` subcommand.
#[derive(Args, Debug)]
pub struct FoldArgs {
    #[command(flatten)]
    pub common: CommonArgs,

    /// Amino-acid sequence in one-letter codes.
    #[arg(short, long, required = true, value_name = "SEQUENCE")]
    pub sequence: String,

    /// Use this job id instead of a generated one.
    #[arg(short, long, value_name = "ID")]
    pub job_id: Option<String>,
}

/// Arguments for the `status` subcommand.
#[derive(Args, Debug)]
pub struct StatusArgs {
    #[command(flatten)]
    pub common: CommonArgs,

    /// Id of the job to look up.
    #[arg(required = true, value_name = "JOB_ID")]
    pub job_id: String,
}

/// Arguments for the `bench` subcommand.
#[derive(Args, Debug)]
pub struct BenchArgs {
    #[command(flatten)]
    pub common: CommonArgs,

    /// Comma-separated sequence lengths to time (default: 10 up to 1200).
    #[arg(short = 'L', long, value_delimiter = ',', value_name = "LENGTHS")]
    pub lengths: Vec<usize>,

    /// Skip the untimed warmup prediction.
    #[arg(long)]
    pub no_warmup: bool,

    /// Seed for the random sequences.
    #[arg(long, default_value_t = 0, value_name = "INT")]
    pub seed: u64,
}
