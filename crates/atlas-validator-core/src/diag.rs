//! ARC diagnostic (`<jobid>.diag`) parsing.
//!
//! The diag file is a loose list of `key=value` lines written by the ARC
//! job wrapper. Only three keys matter for validation; everything else is
//! ignored. The first occurrence of a key wins and a missing key keeps its
//! default.

use serde::Serialize;
use tracing::{info, warn};

use crate::patterns::leading_integer;

/// Processor count assumed when the diag does not record one.
pub const DEFAULT_PROCESSORS: u64 = 1;

const USER_TIME_KEY: &str = "UserTime";
const WALL_TIME_KEY: &str = "WallTime";
const PROCESSORS_KEY: &str = "Processors";

/// Resource usage recorded by ARC for one job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DiagnosticRecord {
    /// Per-processor user CPU time in seconds
    pub user_time_seconds: Option<u64>,

    /// Wall clock time in seconds
    pub wall_time_seconds: Option<u64>,

    /// Number of processors the job ran on
    pub processor_count: u64,
}

impl Default for DiagnosticRecord {
    fn default() -> Self {
        Self {
            user_time_seconds: None,
            wall_time_seconds: None,
            processor_count: DEFAULT_PROCESSORS,
        }
    }
}

impl DiagnosticRecord {
    /// Parse diagnostic text. Never fails; unknown or malformed lines are skipped.
    pub fn parse(text: &str) -> Self {
        let mut user_time: Option<Option<u64>> = None;
        let mut wall_time: Option<Option<u64>> = None;
        let mut processors: Option<Option<u64>> = None;

        for line in text.lines() {
            let Some((key, value)) = line.split_once('=') else {
                continue;
            };

            let slot = match key.trim() {
                USER_TIME_KEY => &mut user_time,
                WALL_TIME_KEY => &mut wall_time,
                PROCESSORS_KEY => &mut processors,
                _ => continue,
            };

            if slot.is_none() {
                let parsed = leading_integer(value);
                if parsed.is_none() {
                    warn!("Ignoring {} in diag: '{}' is not a number", key.trim(), value.trim());
                }
                *slot = Some(parsed);
            }
        }

        Self {
            user_time_seconds: user_time.flatten(),
            wall_time_seconds: wall_time.flatten(),
            processor_count: processors.flatten().unwrap_or(DEFAULT_PROCESSORS),
        }
    }

    /// Total CPU time consumed: user time times processor count, 0 if unknown.
    pub fn measured_cpu_seconds(&self) -> u64 {
        self.user_time_seconds
            .map(|user| user.saturating_mul(self.processor_count))
            .unwrap_or(0)
    }

    /// Wall time, 0 if unknown.
    pub fn measured_wall_seconds(&self) -> u64 {
        self.wall_time_seconds.unwrap_or(0)
    }

    /// Log the measured figures the way the validator audit log expects them.
    pub fn log_measurements(&self) {
        if let Some(user) = self.user_time_seconds {
            info!(
                "CPU time measured by ARC {} ({} x {})",
                self.measured_cpu_seconds(),
                user,
                self.processor_count
            );
        }
        if let Some(wall) = self.wall_time_seconds {
            info!("Wall time {}", wall);
        }
    }
}
