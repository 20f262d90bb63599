//! Human-readable side-by-side comparison of two summaries.

use std::io::{self, Write};

use serde::{Deserialize, Serialize};

use super::insights::{derive_insights, recommendations, Insights, Recommendation, Side};
use super::StatSummary;

const LABEL_WIDTH: usize = 25;
const VALUE_WIDTH: usize = 15;
const RULE_WIDTH: usize = 60;

/// Display names for the two compared systems.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct SystemLabels {
    pub left: String,
    pub right: String,
}

impl SystemLabels {
    pub fn new(left: impl Into<String>, right: impl Into<String>) -> Self {
        Self {
            left: left.into(),
            right: right.into(),
        }
    }

    pub fn get(&self, side: Side) -> &str {
        match side {
            Side::Left => &self.left,
            Side::Right => &self.right,
        }
    }
}

/// Everything the text report says, in serializable form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ComparisonReport {
    pub labels: SystemLabels,
    pub left: StatSummary,
    pub right: StatSummary,
    pub insights: Insights,
    pub recommendations: Vec<Recommendation>,
}

impl ComparisonReport {
    pub fn new(labels: SystemLabels, left: StatSummary, right: StatSummary) -> Self {
        let insights = derive_insights(&left, &right);
        let recommendations = recommendations(&left, &right);
        Self {
            labels,
            left,
            right,
            insights,
            recommendations,
        }
    }

    /// The three insight sentences, in report order.
    pub fn insight_lines(&self) -> Vec<String> {
        let name = |side: Side| self.labels.get(side);
        let i = &self.insights;
        vec![
            format!(
                "{} has lower average response times than {}.",
                name(i.lower_avg_response_time),
                name(i.lower_avg_response_time.other())
            ),
            format!(
                "{} has higher throughput (requests/second) than {}.",
                name(i.higher_throughput),
                name(i.higher_throughput.other())
            ),
            format!(
                "{} shows more consistent response times (less variation).",
                name(i.more_consistent)
            ),
        ]
    }

    pub fn recommendation_lines(&self) -> Vec<String> {
        self.recommendations
            .iter()
            .map(|r| recommendation_text(r, &self.labels))
            .collect()
    }

    /// Write the full text report.
    pub fn write_to<W: Write>(&self, out: &mut W) -> io::Result<()> {
        let (l, r) = (&self.left, &self.right);

        writeln!(out, "\n=== Performance Comparison Report ===\n")?;
        row(out, "Metric", &self.labels.left, &self.labels.right)?;
        writeln!(out, "{}", "-".repeat(RULE_WIDTH))?;
        row(out, "Endpoint", &l.endpoint, &r.endpoint)?;
        row(out, "Total Requests", &l.requests.to_string(), &r.requests.to_string())?;
        row(out, "Failures", &l.failures.to_string(), &r.failures.to_string())?;
        row(
            out,
            "Failure Rate (%)",
            &format!("{:.2}%", l.failure_rate),
            &format!("{:.2}%", r.failure_rate),
        )?;

        let timings: [(&str, fn(&StatSummary) -> f64); 8] = [
            ("Avg Response Time (ms)", |s| s.avg_response_time),
            ("Median Response Time (ms)", |s| s.median_response_time),
            ("Min Response Time (ms)", |s| s.min_response_time),
            ("Max Response Time (ms)", |s| s.max_response_time),
            ("Requests/s", |s| s.requests_per_second),
            ("90% Response Time (ms)", |s| s.percentile_90),
            ("95% Response Time (ms)", |s| s.percentile_95),
            ("99% Response Time (ms)", |s| s.percentile_99),
        ];
        for (label, metric) in timings {
            row(
                out,
                label,
                &format!("{:.2}", metric(l)),
                &format!("{:.2}", metric(r)),
            )?;
        }

        writeln!(out, "\n=== Performance Insights ===\n")?;
        for line in self.insight_lines() {
            writeln!(out, "- {line}")?;
        }

        writeln!(out, "\n=== Recommendations ===\n")?;
        for line in self.recommendation_lines() {
            writeln!(out, "- {line}")?;
        }
        Ok(())
    }
}

fn row<W: Write>(out: &mut W, label: &str, left: &str, right: &str) -> io::Result<()> {
    writeln!(
        out,
        "{label:<LABEL_WIDTH$} {left:<VALUE_WIDTH$} {right:<VALUE_WIDTH$}"
    )
}

fn recommendation_text(rec: &Recommendation, labels: &SystemLabels) -> String {
    match rec {
        Recommendation::InvestigateFailures { side, failure_rate } => format!(
            "Investigate {} failures ({:.2}%).",
            labels.get(*side),
            failure_rate
        ),
        Recommendation::AddTimeouts { side } => format!(
            "Consider implementing timeouts for {} calls to handle slow responses.",
            labels.get(*side)
        ),
        Recommendation::RetryWithBackoff => {
            "For production use, implement retry logic with exponential backoff for both APIs."
                .to_string()
        }
        Recommendation::CacheResponses => "Consider caching responses for common queries to \
             reduce API load and improve response times."
            .to_string(),
    }
}

/// Write the comparison if both summaries are present.
///
/// Returns `Ok(false)` without writing anything when either side is missing.
pub fn report_comparison<W: Write>(
    left: Option<&StatSummary>,
    right: Option<&StatSummary>,
    labels: &SystemLabels,
    out: &mut W,
) -> io::Result<bool> {
    let (Some(left), Some(right)) = (left, right) else {
        tracing::error!("Missing summary data; skipping comparison report");
        return Ok(false);
    };

    ComparisonReport::new(labels.clone(), left.clone(), right.clone()).write_to(out)?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::fixtures::summary;

    fn labels() -> SystemLabels {
        SystemLabels::new("OpenAI", "Hugging Face")
    }

    fn render(left: &StatSummary, right: &StatSummary) -> String {
        let mut buf = Vec::new();
        let written = report_comparison(Some(left), Some(right), &labels(), &mut buf).unwrap();
        assert!(written);
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn both_absent_writes_nothing() {
        let mut buf = Vec::new();
        let written = report_comparison(None, None, &labels(), &mut buf).unwrap();
        assert!(!written);
        assert!(buf.is_empty());
    }

    #[test]
    fn one_absent_writes_nothing() {
        let left = summary("/a", 100.0, 1.0);
        let mut buf = Vec::new();
        assert!(!report_comparison(Some(&left), None, &labels(), &mut buf).unwrap());
        assert!(!report_comparison(None, Some(&left), &labels(), &mut buf).unwrap());
        assert!(buf.is_empty());
    }

    #[test]
    fn table_uses_fixed_column_widths() {
        let text = render(&summary("/v1/chat", 200.0, 10.0), &summary("/gen", 150.0, 12.0));
        let header = text
            .lines()
            .find(|l| l.starts_with("Metric"))
            .expect("header line");
        assert_eq!(header.trim_end(), format!("{:<25} {:<15} Hugging Face", "Metric", "OpenAI"));
        assert!(text.contains(&"-".repeat(60)));
        assert!(text.contains(&format!("{:<25} {:<15} {:<15}", "Avg Response Time (ms)", "200.00", "150.00")));
        assert!(text.contains(&format!("{:<25} {:<15} {:<15}", "Failure Rate (%)", "0.00%", "0.00%")));
        assert!(text.contains(&format!("{:<25} {:<15} {:<15}", "Total Requests", "100", "100")));
    }

    #[test]
    fn insights_name_the_winning_side() {
        let text = render(&summary("/v1/chat", 200.0, 10.0), &summary("/gen", 150.0, 12.0));
        assert!(text.contains("- Hugging Face has lower average response times than OpenAI."));
        assert!(text.contains("- Hugging Face has higher throughput (requests/second) than OpenAI."));
    }

    #[test]
    fn recommendations_include_failures_and_constants() {
        let mut left = summary("/a", 100.0, 10.0);
        left.failure_rate = 5.0;
        left.max_response_time = 1500.0;
        let text = render(&left, &summary("/b", 100.0, 10.0));
        assert!(text.contains("- Investigate OpenAI failures (5.00%)."));
        assert!(text.contains(
            "- Consider implementing timeouts for OpenAI calls to handle slow responses."
        ));
        assert!(text.contains("retry logic with exponential backoff"));
        assert!(text.contains("Consider caching responses"));
    }

    #[test]
    fn report_serializes_with_tagged_recommendations() {
        let report = ComparisonReport::new(
            labels(),
            summary("/a", 100.0, 10.0),
            summary("/b", 50.0, 10.0),
        );
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["insights"]["lower_avg_response_time"], "right");
        assert_eq!(json["recommendations"][0]["kind"], "retry_with_backoff");
        assert_eq!(json["labels"]["left"], "OpenAI");
    }
}
