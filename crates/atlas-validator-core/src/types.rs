//! Verdict and report types.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::diag::DiagnosticRecord;

/// Outcome of validating one result.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "verdict", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Verdict {
    /// The result is accepted
    Pass { reason: String },

    /// The result is rejected
    Fail { reason: String },
}

impl Verdict {
    pub fn pass(reason: impl Into<String>) -> Self {
        Verdict::Pass {
            reason: reason.into(),
        }
    }

    pub fn fail(reason: impl Into<String>) -> Self {
        Verdict::Fail {
            reason: reason.into(),
        }
    }

    pub fn is_pass(&self) -> bool {
        matches!(self, Verdict::Pass { .. })
    }

    /// Process exit status the script validator interprets.
    pub fn exit_code(&self) -> u8 {
        match self {
            Verdict::Pass { .. } => 0,
            Verdict::Fail { .. } => 1,
        }
    }

    pub fn reason(&self) -> &str {
        match self {
            Verdict::Pass { reason } | Verdict::Fail { reason } => reason,
        }
    }
}

/// Signals the decision engine works from.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationSignals {
    /// HITS file named in the heartbeat manifest, if any
    pub hits_file: Option<String>,

    /// Whether the expected output file exists locally
    pub expected_output_present: bool,

    /// CPU time reported by BOINC, in seconds
    pub reported_cpu_seconds: f64,

    /// Wall time measured by ARC, 0 if unknown
    pub wall_time_seconds: u64,
}

/// Audit record of one validation run.
#[derive(Debug, Clone, Serialize)]
pub struct ValidationReport {
    pub job_id: String,

    /// False when the result archive could not be opened at all
    pub archive_readable: bool,

    pub diagnostic: DiagnosticRecord,

    /// User time times processors, 0 if unknown
    pub measured_cpu_seconds: u64,

    pub reported_cpu_seconds: f64,

    pub hits_file: Option<String>,

    pub expected_output_present: bool,

    pub verdict: Verdict,

    pub validated_at: DateTime<Utc>,
}

impl ValidationReport {
    pub fn exit_code(&self) -> u8 {
        self.verdict.exit_code()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes() {
        assert_eq!(Verdict::pass("ok").exit_code(), 0);
        assert_eq!(Verdict::fail("missing").exit_code(), 1);
        assert!(Verdict::pass("ok").is_pass());
        assert_eq!(Verdict::fail("missing").reason(), "missing");
    }

    #[test]
    fn test_verdict_serialization() {
        let json = serde_json::to_value(Verdict::fail("output missing")).unwrap();
        assert_eq!(json["verdict"], "FAIL");
        assert_eq!(json["reason"], "output missing");
    }
}
