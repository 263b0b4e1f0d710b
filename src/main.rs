use a2f2d::cli::Cli;
use a2f2d::config::Config;
use a2f2d::{A2f2dError, SessionReport};
use anyhow::{Context, Result};
use clap::Parser;
use owo_colors::OwoColorize;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.log_level());

    match try_main(cli).await {
        Ok((report, output)) => {
            println!(
                "{} {} ({} video chunks, {:.1}s)",
                "Saved".green().bold(),
                output.display(),
                report.video_chunks,
                report.elapsed.as_secs_f64()
            );
            ExitCode::SUCCESS
        }
        Err(err) => {
            let (code, message) = match err.downcast_ref::<A2f2dError>() {
                Some(e) => (e.exit_code(), a2f2d::app::describe_failure(e)),
                None => (1, format!("{:#}", err)),
            };
            eprintln!("{} {}", "Error:".red().bold(), message);
            ExitCode::from(u8::try_from(code).unwrap_or(1))
        }
    }
}

async fn try_main(cli: Cli) -> Result<(SessionReport, PathBuf)> {
    tracing::debug!(version = %a2f2d::version_string(), "Starting a2f2d");

    let config = cli.apply(load_config(cli.config.as_deref())?);
    let output = config.inputs.output.clone();
    let report = a2f2d::app::run(config).await?;
    Ok((report, output))
}

/// `RUST_LOG` wins over the verbosity flags.
fn init_logging(default_level: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn load_config(custom_path: Option<&Path>) -> Result<Config> {
    let config = match (custom_path, Config::default_path()) {
        (Some(path), _) => Config::load(path)
            .map_err(|e| match e {
                A2f2dError::Io(io) => A2f2dError::ConfigParse {
                    message: format!("{}: {}", path.display(), io),
                },
                other => other,
            })
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        (None, Some(default_path)) => Config::load_or_default(&default_path)?,
        (None, None) => Config::default(),
    };

    // Apply environment variable overrides
    Ok(config.with_env_overrides())
}
