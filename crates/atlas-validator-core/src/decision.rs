//! Decision engine: turns extracted signals into a verdict.
//!
//! Checks are applied in a fixed order:
//! 1. HITS reported AND expected output on disk → PASS
//! 2. Else reported CPU time or measured wall time over threshold → PASS
//! 3. Else → FAIL
//!
//! The second rule keeps long-running jobs from being rejected when output
//! detection failed after genuine work was done.

use tracing::info;

use crate::policy::ValidationPolicy;
use crate::types::{ValidationSignals, Verdict};

/// Applies a [`ValidationPolicy`] to validation signals.
pub struct DecisionEngine<'a> {
    policy: &'a ValidationPolicy,
}

impl<'a> DecisionEngine<'a> {
    pub fn new(policy: &'a ValidationPolicy) -> Self {
        Self { policy }
    }

    /// Decide the verdict, logging the reason for whichever rule applies.
    pub fn decide(&self, signals: &ValidationSignals) -> Verdict {
        let verdict = if signals.hits_file.is_some() && signals.expected_output_present {
            Verdict::pass("Output files all present, validation passed")
        } else if self.ran_long_enough(signals) {
            Verdict::pass("CPU time or walltime is long enough to pass validation")
        } else {
            Verdict::fail(format!(
                "An output file is missing, and cputime < {} minutes, validation failed",
                self.policy.cpu_threshold_minutes()
            ))
        };

        info!("{}", verdict.reason());
        verdict
    }

    fn ran_long_enough(&self, signals: &ValidationSignals) -> bool {
        signals.reported_cpu_seconds > self.policy.cpu_time_threshold_secs
            || signals.wall_time_seconds > self.policy.wall_time_threshold_secs
    }
}
