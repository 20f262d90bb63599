mod commands;

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, EnvFilter};

use commands::{analyze::AnalyzeArgs, run::RunArgs, verify::VerifyArgs};

/// Load-test two inference APIs and compare the results.
#[derive(Parser, Debug)]
#[command(name = "apiload", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Drive one API with simulated users and write locust-style CSV reports
    Run(RunArgs),

    /// Compare the OpenAI and Hugging Face reports and draw the comparison chart
    Analyze(AnalyzeArgs),

    /// Check that the configured API keys are accepted
    Verify(VerifyArgs),
}

#[tokio::main]
async fn main() -> ExitCode {
    init_logging();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Run(args) => commands::run::execute(args).await,
        Commands::Analyze(args) => commands::analyze::execute(args),
        Commands::Verify(args) => commands::verify::execute(args).await,
    };

    match result {
        Ok(code) => code,
        Err(e) => {
            tracing::error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}

/// Logs go to stderr so stdout carries only report output.
fn init_logging() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}
