use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use apiload_core::report::{run_analysis, AnalysisConfig, SystemSpec};
use apiload_core::ApiloadError;
use clap::Args;

#[derive(Args, Debug)]
pub struct AnalyzeArgs {
    /// Directory holding the `<stem>_stats.csv` and `<stem>_stats_history.csv` files
    #[arg(long, default_value = "reports")]
    pub reports_dir: PathBuf,

    /// Chart file name inside the reports directory (`.svg` for SVG, otherwise PNG)
    #[arg(long, default_value = "performance_comparison.png")]
    pub plot: PathBuf,

    #[arg(long, default_value = "OpenAI")]
    pub left_label: String,

    #[arg(long, default_value = "openai")]
    pub left_stem: String,

    #[arg(long, default_value = "Hugging Face")]
    pub right_label: String,

    #[arg(long, default_value = "huggingface")]
    pub right_stem: String,

    /// Also write the comparison as JSON to this path
    #[arg(long)]
    pub json: Option<PathBuf>,
}

impl AnalyzeArgs {
    fn config(&self) -> AnalysisConfig {
        AnalysisConfig {
            reports_dir: self.reports_dir.clone(),
            left: SystemSpec::new(&self.left_label, &self.left_stem),
            right: SystemSpec::new(&self.right_label, &self.right_stem),
            plot_file: self.plot.clone(),
        }
    }
}

pub fn execute(args: AnalyzeArgs) -> anyhow::Result<ExitCode> {
    let stdout = io::stdout();
    let mut out = stdout.lock();

    let outcome = match run_analysis(&args.config(), &mut out) {
        Ok(outcome) => outcome,
        Err(ApiloadError::MissingDirectory(dir)) => {
            tracing::error!(
                "Reports directory {} not found. Run the load tests first.",
                dir.display()
            );
            return Ok(ExitCode::FAILURE);
        }
        Err(e) => return Err(e.into()),
    };
    out.flush()?;

    if let (Some(path), Some(report)) = (&args.json, &outcome.report) {
        let json = serde_json::to_string_pretty(report)?;
        fs::write(path, json).with_context(|| format!("writing {}", path.display()))?;
        tracing::info!("comparison written to {}", path.display());
    }
    Ok(ExitCode::SUCCESS)
}
