//! genbench - a generative-inference load generator and benchmarker.
//!
//! This is the main entry point for the CLI application.

use anyhow::Result;
use clap::Parser;
use colored::Colorize;

mod cli;
mod config;
mod orchestrator;

use cli::{Cli, Commands};
use config::Settings;

/// Startup validation failures (bad config, bad flags) exit 1; an
/// unrecoverable run error exits 2.
enum ExitCode {
    Success = 0,
    StartupError = 1,
    RunError = 2,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(err) = init_logging(&cli) {
        eprintln!("{} failed to initialize logging: {err}", "Error:".red().bold());
        std::process::exit(ExitCode::StartupError as i32);
    }

    let settings = match load_settings(&cli) {
        Ok(settings) => settings,
        Err(err) => {
            report_error(&err, cli.quiet);
            std::process::exit(ExitCode::StartupError as i32);
        }
    };

    let result = match cli.command {
        Commands::Benchmark(args) => {
            cli::commands::benchmark::run(args, settings, cli.json, cli.quiet).await
        }
        Commands::Validate(args) => {
            cli::commands::validate::run(args, settings, cli.json, cli.quiet).await
        }
    };

    if let Err(err) = result {
        report_error(&err, cli.quiet);
        std::process::exit(ExitCode::RunError as i32);
    }

    std::process::exit(ExitCode::Success as i32);
}

fn load_settings(cli: &Cli) -> Result<Settings> {
    let config_path = match &cli.command {
        Commands::Benchmark(args) => args.config.as_ref(),
        Commands::Validate(args) => args.config.as_ref(),
    };

    let settings = match config_path {
        Some(path) => Settings::from_file(path)?,
        None => Settings::load_default()?,
    };
    Ok(settings.apply_env_overrides())
}

fn report_error(err: &anyhow::Error, quiet: bool) {
    if quiet {
        return;
    }
    eprintln!("{} {}", "Error:".red().bold(), err);
    let mut source = err.source();
    while let Some(cause) = source {
        eprintln!("  {} {}", "Caused by:".red(), cause);
        source = cause.source();
    }
}

/// Initialize logging based on verbosity level
fn init_logging(cli: &Cli) -> Result<()> {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let env_filter = if cli.verbose > 0 {
        match cli.verbose {
            1 => EnvFilter::new("genbench=debug"),
            2 => EnvFilter::new("genbench=trace,genbench_scheduler=debug,genbench_backend=debug"),
            _ => EnvFilter::new("trace"),
        }
    } else if cli.quiet {
        EnvFilter::new("error")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("genbench=info"))
    };

    let fmt_layer = if cli.json {
        fmt::layer().json().with_current_span(false).with_span_list(false).boxed()
    } else {
        fmt::layer()
            .with_target(false)
            .with_thread_ids(false)
            .with_thread_names(false)
            .compact()
            .boxed()
    };

    tracing_subscriber::registry().with(env_filter).with(fmt_layer).init();

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parsing() {
        use clap::CommandFactory;
        let _cli = Cli::command();
    }

    #[test]
    fn test_version() {
        let version = env!("CARGO_PKG_VERSION");
        assert!(!version.is_empty());
    }
}
