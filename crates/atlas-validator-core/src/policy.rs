//! Validation policy.
//!
//! The thresholds of the leniency override and the HITS naming pattern.
//! Defaults match what the ATLAS project validator has always applied.

use regex::Regex;
use thiserror::Error;

use crate::patterns::HITS_PATTERN;

/// Reported CPU time above which a job passes without output (20 minutes).
pub const DEFAULT_CPU_THRESHOLD_SECS: f64 = 1200.0;

/// Measured wall time above which a job passes without output (1 hour).
pub const DEFAULT_WALL_THRESHOLD_SECS: u64 = 3600;

/// Errors from building a policy.
#[derive(Error, Debug)]
pub enum PolicyError {
    #[error("invalid HITS pattern '{pattern}': {source}")]
    InvalidHitsPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("CPU time threshold must be a finite, non-negative number of seconds, got {0}")]
    InvalidCpuThreshold(f64),
}

/// Policy applied by the decision engine.
#[derive(Debug, Clone)]
pub struct ValidationPolicy {
    /// Reported CPU seconds strictly above this pass the leniency check
    pub cpu_time_threshold_secs: f64,

    /// Measured wall seconds strictly above this pass the leniency check
    pub wall_time_threshold_secs: u64,

    /// Pattern a manifest entry must match to count as HITS output
    pub hits_pattern: Regex,
}

impl Default for ValidationPolicy {
    fn default() -> Self {
        Self {
            cpu_time_threshold_secs: DEFAULT_CPU_THRESHOLD_SECS,
            wall_time_threshold_secs: DEFAULT_WALL_THRESHOLD_SECS,
            hits_pattern: HITS_PATTERN.clone(),
        }
    }
}

impl ValidationPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cpu_threshold(mut self, secs: f64) -> Result<Self, PolicyError> {
        if !secs.is_finite() || secs < 0.0 {
            return Err(PolicyError::InvalidCpuThreshold(secs));
        }
        self.cpu_time_threshold_secs = secs;
        Ok(self)
    }

    pub fn with_wall_threshold(mut self, secs: u64) -> Self {
        self.wall_time_threshold_secs = secs;
        self
    }

    pub fn with_hits_pattern(mut self, pattern: &str) -> Result<Self, PolicyError> {
        self.hits_pattern = Regex::new(pattern).map_err(|source| PolicyError::InvalidHitsPattern {
            pattern: pattern.to_string(),
            source,
        })?;
        Ok(self)
    }

    /// CPU threshold in whole minutes, for log messages.
    pub fn cpu_threshold_minutes(&self) -> u64 {
        (self.cpu_time_threshold_secs / 60.0) as u64
    }
}
