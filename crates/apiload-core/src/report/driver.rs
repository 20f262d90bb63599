use std::io::Write;
use std::path::{Path, PathBuf};

use super::history::read_history;
use super::plot::plot_comparison;
use super::render::{ComparisonReport, SystemLabels};
use super::stats::read_stat_summary;
use super::{HistorySeries, StatSummary};
use crate::error::{ApiloadError, ExtractError};

/// One of the two compared systems: how to name it in output and which
/// files belong to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SystemSpec {
    pub label: String,
    /// Prefix of `<stem>_stats.csv` / `<stem>_stats_history.csv`.
    pub file_stem: String,
}

impl SystemSpec {
    pub fn new(label: impl Into<String>, file_stem: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            file_stem: file_stem.into(),
        }
    }

    pub fn stats_path(&self, dir: &Path) -> PathBuf {
        dir.join(format!("{}_stats.csv", self.file_stem))
    }

    pub fn history_path(&self, dir: &Path) -> PathBuf {
        dir.join(format!("{}_stats_history.csv", self.file_stem))
    }
}

#[derive(Debug, Clone)]
pub struct AnalysisConfig {
    pub reports_dir: PathBuf,
    pub left: SystemSpec,
    pub right: SystemSpec,
    /// Chart file name, relative to `reports_dir`.
    pub plot_file: PathBuf,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            reports_dir: PathBuf::from("reports"),
            left: SystemSpec::new("OpenAI", "openai"),
            right: SystemSpec::new("Hugging Face", "huggingface"),
            plot_file: PathBuf::from("performance_comparison.png"),
        }
    }
}

impl AnalysisConfig {
    pub fn labels(&self) -> SystemLabels {
        SystemLabels::new(self.left.label.clone(), self.right.label.clone())
    }

    pub fn plot_path(&self) -> PathBuf {
        self.reports_dir.join(&self.plot_file)
    }
}

/// What a run of the analysis produced.
#[derive(Debug, Clone, Default)]
pub struct AnalysisOutcome {
    pub report: Option<ComparisonReport>,
    pub plot: Option<PathBuf>,
}

/// Compare both systems' reports: text to `out`, chart to the plot path.
///
/// A missing reports directory is the only fatal condition; a missing or
/// malformed input file is logged and leaves the corresponding output out.
pub fn run_analysis<W: Write>(
    config: &AnalysisConfig,
    out: &mut W,
) -> Result<AnalysisOutcome, ApiloadError> {
    let dir = &config.reports_dir;
    if !dir.is_dir() {
        return Err(ApiloadError::MissingDirectory(dir.clone()));
    }

    let labels = config.labels();
    let left_summary = summary_or_log(&config.left, dir);
    let right_summary = summary_or_log(&config.right, dir);

    let mut outcome = AnalysisOutcome::default();
    if let (Some(left), Some(right)) = (left_summary, right_summary) {
        let report = ComparisonReport::new(labels.clone(), left, right);
        report.write_to(out)?;
        outcome.report = Some(report);
    } else {
        tracing::error!("Missing summary data; skipping comparison report");
    }

    let left_history = history_or_log(&config.left, dir);
    let right_history = history_or_log(&config.right, dir);

    outcome.plot = plot_comparison(
        left_history.as_ref(),
        right_history.as_ref(),
        &labels,
        config.plot_path(),
    )?;
    if let Some(path) = &outcome.plot {
        writeln!(out, "\nPlot saved to {}", path.display())?;
    }

    Ok(outcome)
}

fn summary_or_log(system: &SystemSpec, dir: &Path) -> Option<StatSummary> {
    log_absent(&system.label, read_stat_summary(system.stats_path(dir)))
}

fn history_or_log(system: &SystemSpec, dir: &Path) -> Option<HistorySeries> {
    log_absent(&system.label, read_history(system.history_path(dir)))
}

fn log_absent<T>(label: &str, result: Result<T, ExtractError>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(err) => {
            tracing::error!(system = label, "{err}");
            None
        }
    }
}
