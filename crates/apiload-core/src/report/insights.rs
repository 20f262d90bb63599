//! Qualitative comparison of two summaries. Pure: no formatting, no I/O.

use serde::{Deserialize, Serialize};

use super::StatSummary;

/// Maximum response time (ms) above which a timeout recommendation is made.
pub const SLOW_RESPONSE_THRESHOLD_MS: f64 = 1000.0;

/// Which of the two compared systems a statement is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    Left,
    Right,
}

impl Side {
    pub fn other(self) -> Side {
        match self {
            Side::Left => Side::Right,
            Side::Right => Side::Left,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Insights {
    pub lower_avg_response_time: Side,
    pub higher_throughput: Side,
    pub more_consistent: Side,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Recommendation {
    InvestigateFailures { side: Side, failure_rate: f64 },
    AddTimeouts { side: Side },
    RetryWithBackoff,
    CacheResponses,
}

/// The left side wins a comparison only when it is strictly better;
/// ties go right.
pub fn derive_insights(left: &StatSummary, right: &StatSummary) -> Insights {
    let pick = |left_wins: bool| if left_wins { Side::Left } else { Side::Right };

    Insights {
        lower_avg_response_time: pick(left.avg_response_time < right.avg_response_time),
        higher_throughput: pick(left.requests_per_second > right.requests_per_second),
        more_consistent: pick(left.stability_ratio() < right.stability_ratio()),
    }
}

pub fn recommendations(left: &StatSummary, right: &StatSummary) -> Vec<Recommendation> {
    let sides = [(Side::Left, left), (Side::Right, right)];
    let mut out = Vec::new();

    for (side, s) in sides {
        if s.failure_rate > 0.0 {
            out.push(Recommendation::InvestigateFailures {
                side,
                failure_rate: s.failure_rate,
            });
        }
    }
    for (side, s) in sides {
        if s.max_response_time > SLOW_RESPONSE_THRESHOLD_MS {
            out.push(Recommendation::AddTimeouts { side });
        }
    }

    out.push(Recommendation::RetryWithBackoff);
    out.push(Recommendation::CacheResponses);
    out
}
