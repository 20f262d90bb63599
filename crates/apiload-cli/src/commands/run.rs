use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::Context;
use apiload_core::config::Settings;
use apiload_core::engine::{run_load_test, LoadTestConfig, WaitTime};
use apiload_core::results::{write_reports, LoadTestReport};
use apiload_core::target::ApiTarget;
use clap::{Args, ValueEnum};
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum TargetKind {
    Openai,
    Huggingface,
}

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Which API to load
    #[arg(long, value_enum)]
    pub target: TargetKind,

    /// Number of concurrent users
    #[arg(short, long, default_value_t = 1)]
    pub users: u32,

    /// Seconds over which users are started
    #[arg(long, default_value_t = 0)]
    pub ramp_up: u64,

    /// Total test duration in seconds
    #[arg(long, default_value_t = 60)]
    pub run_time: u64,

    /// Minimum pause between a user's requests, in seconds
    #[arg(long, default_value_t = 1.0)]
    pub wait_min: f64,

    /// Maximum pause between a user's requests, in seconds
    #[arg(long, default_value_t = 3.0)]
    pub wait_max: f64,

    /// Per-request timeout in seconds
    #[arg(long, default_value_t = 30)]
    pub timeout: u64,

    /// Report file prefix [default: reports/<target>]
    #[arg(long)]
    pub csv: Option<PathBuf>,

    /// Send requests to this host instead of the public API
    #[arg(long)]
    pub base_url: Option<String>,
}

impl RunArgs {
    fn load_config(&self) -> anyhow::Result<LoadTestConfig> {
        let seconds = |value: f64, flag: &str| {
            Duration::try_from_secs_f64(value).with_context(|| format!("invalid {flag}: {value}"))
        };
        Ok(LoadTestConfig {
            users: self.users,
            ramp_up: Duration::from_secs(self.ramp_up),
            run_time: Duration::from_secs(self.run_time),
            wait: WaitTime {
                min: seconds(self.wait_min, "--wait-min")?,
                max: seconds(self.wait_max, "--wait-max")?,
            },
            request_timeout: Duration::from_secs(self.timeout),
            ..LoadTestConfig::default()
        })
    }

    fn target(&self, settings: &Settings) -> anyhow::Result<ApiTarget> {
        let target = match self.target {
            TargetKind::Openai => ApiTarget::openai(settings)?,
            TargetKind::Huggingface => ApiTarget::huggingface(settings),
        };
        Ok(match &self.base_url {
            Some(url) => target.with_base_url(url.clone()),
            None => target,
        })
    }

    fn prefix(&self, target: &ApiTarget) -> PathBuf {
        self.csv
            .clone()
            .unwrap_or_else(|| PathBuf::from("reports").join(target.system_name()))
    }
}

pub async fn execute(args: RunArgs) -> anyhow::Result<ExitCode> {
    let settings = Settings::from_env();
    let config = args.load_config()?;
    let target = args.target(&settings)?;
    let prefix = args.prefix(&target);

    let cancel = CancellationToken::new();
    let on_ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupted; stopping users");
            on_ctrl_c.cancel();
        }
    });

    let report = run_load_test(target, &config, cancel).await?;
    let paths = write_reports(&prefix, &report)?;

    let stdout = io::stdout();
    let mut out = stdout.lock();
    print_summary(&report, &mut out)?;
    for path in paths {
        writeln!(out, "Wrote {}", path.display())?;
    }
    Ok(ExitCode::SUCCESS)
}

fn print_summary<W: Write>(report: &LoadTestReport, out: &mut W) -> io::Result<()> {
    let Some(total) = report.aggregate() else {
        return Ok(());
    };
    writeln!(
        out,
        "{} requests, {} failures, avg {:.2} ms, median {} ms, max {} ms, {:.2} req/s",
        total.request_count,
        total.failure_count,
        total.average_ms,
        total.median_ms,
        total.max_ms,
        total.requests_per_second
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct Harness {
        #[command(flatten)]
        args: RunArgs,
    }

    fn parse(argv: &[&str]) -> RunArgs {
        let mut full = vec!["run"];
        full.extend_from_slice(argv);
        Harness::try_parse_from(full).unwrap().args
    }

    #[test]
    fn defaults_follow_load_config() {
        let config = parse(&["--target", "openai"]).load_config().unwrap();
        assert_eq!(config, LoadTestConfig::default());
    }

    #[test]
    fn negative_wait_is_rejected() {
        let args = parse(&["--target", "openai", "--wait-min=-1"]);
        assert!(args.load_config().is_err());
    }

    #[test]
    fn default_prefix_uses_system_name() {
        let args = parse(&["--target", "huggingface"]);
        let target = args.target(&Settings::default()).unwrap();
        assert_eq!(args.prefix(&target), PathBuf::from("reports/huggingface"));
    }

    #[test]
    fn openai_without_key_fails() {
        let args = parse(&["--target", "openai"]);
        assert!(args.target(&Settings::default()).is_err());
    }

    #[test]
    fn base_url_override() {
        let args = parse(&["--target", "huggingface", "--base-url", "http://localhost:8080"]);
        let target = args.target(&Settings::default()).unwrap();
        assert!(target.url().starts_with("http://localhost:8080/"));
    }

    #[test]
    fn empty_report_prints_nothing() {
        let mut buf = Vec::new();
        print_summary(&LoadTestReport::default(), &mut buf).unwrap();
        assert!(buf.is_empty());
    }
}
