//! CLI argument parsing and command definitions

use clap::{Parser, Subcommand};
use std::path::PathBuf;

pub mod commands;

/// genbench - a generative-inference load generator and benchmarker
#[derive(Parser, Debug)]
#[command(
    name = "genbench",
    version,
    author,
    about,
    long_about = None,
    arg_required_else_help = true,
    propagate_version = true,
)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Output in JSON format
    #[arg(long, global = true, help = "Output results in JSON format")]
    pub json: bool,

    /// Quiet mode (suppress non-essential output)
    #[arg(short, long, global = true, help = "Suppress non-essential output")]
    pub quiet: bool,

    /// Verbose mode (can be repeated for more verbosity)
    #[arg(short, long, global = true, action = clap::ArgAction::Count, help = "Increase verbosity (-v, -vv, -vvv)")]
    pub verbose: u8,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run a benchmark with a scheduling strategy against a target
    #[command(visible_alias = "bench")]
    Benchmark(BenchmarkArgs),

    /// Validate configuration and target connectivity without running
    #[command(visible_alias = "val")]
    Validate(ValidateArgs),
}

/// Scheduling strategy selectable from the CLI, mirroring
/// `genbench_scheduler::SchedulingStrategy`'s concrete implementations.
#[derive(Debug, Clone, clap::ValueEnum)]
pub enum StrategyArg {
    Synchronous,
    Concurrent,
    Throughput,
    Constant,
    Poisson,
}

/// Arguments for the benchmark command
#[derive(Parser, Debug)]
pub struct BenchmarkArgs {
    /// Target base URL for the OpenAI-compatible backend
    #[arg(short, long, env = "GENBENCH_TARGET")]
    pub target: String,

    /// Model name to request
    #[arg(short, long, env = "GENBENCH_MODEL")]
    pub model: String,

    /// API key
    #[arg(short = 'k', long, env = "GENBENCH_API_KEY")]
    pub api_key: Option<String>,

    /// Prompt text (synthetic prompt is used if omitted)
    #[arg(short = 'P', long)]
    pub prompt: Option<String>,

    /// Path to a line-delimited JSON dataset file
    #[arg(short = 'f', long, conflicts_with = "prompt")]
    pub dataset_file: Option<PathBuf>,

    /// Scheduling strategy to run
    #[arg(short, long, value_enum, default_value = "synchronous")]
    pub strategy: StrategyArg,

    /// Target dispatch rate in requests/second (constant and poisson strategies)
    #[arg(long)]
    pub rate: Option<f64>,

    /// Number of concurrent streams (concurrent strategy)
    #[arg(short, long)]
    pub concurrency: Option<usize>,

    /// Maximum number of requests to run (unbounded if omitted)
    #[arg(long)]
    pub max_number: Option<u64>,

    /// Maximum run duration in seconds (unbounded if omitted)
    #[arg(long)]
    pub max_duration: Option<u64>,

    /// Per-request timeout in seconds
    #[arg(long, default_value = "120")]
    pub timeout: u64,

    /// Configuration file path
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Output format (json, csv, prometheus, console)
    #[arg(short = 'F', long, default_value = "console")]
    pub output_format: String,

    /// Output file (stdout if not specified)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Show live progress
    #[arg(long, default_value = "true")]
    pub progress: bool,
}

/// Arguments for the validate command
#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Target base URL to validate
    #[arg(short, long, env = "GENBENCH_TARGET")]
    pub target: Option<String>,

    /// API key to validate
    #[arg(short = 'k', long, env = "GENBENCH_API_KEY")]
    pub api_key: Option<String>,

    /// Configuration file path
    #[arg(long)]
    pub config: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_structure() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_benchmark_args() {
        let args = Cli::parse_from([
            "genbench",
            "benchmark",
            "--target",
            "http://localhost:8000",
            "--model",
            "test-model",
            "--strategy",
            "concurrent",
            "--concurrency",
            "10",
        ]);

        if let Commands::Benchmark(bench) = args.command {
            assert_eq!(bench.target, "http://localhost:8000");
            assert_eq!(bench.model, "test-model");
            assert_eq!(bench.concurrency, Some(10));
        } else {
            panic!("Expected Benchmark command");
        }
    }

    #[test]
    fn test_validate_args() {
        let args = Cli::parse_from([
            "genbench",
            "validate",
            "--target",
            "http://localhost:8000",
        ]);

        if let Commands::Validate(validate) = args.command {
            assert_eq!(validate.target, Some("http://localhost:8000".to_string()));
        } else {
            panic!("Expected Validate command");
        }
    }

    #[test]
    fn test_global_flags() {
        let args = Cli::parse_from([
            "genbench",
            "--json",
            "--quiet",
            "validate",
        ]);

        assert!(args.json);
        assert!(args.quiet);
    }

    #[test]
    fn test_verbose_flag() {
        let args = Cli::parse_from([
            "genbench",
            "-vvv",
            "validate",
        ]);

        assert_eq!(args.verbose, 3);
    }
}
