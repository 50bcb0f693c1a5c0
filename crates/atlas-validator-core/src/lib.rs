//! # atlas-validator-core
//!
//! Result validation for ATLAS BOINC work units run under the ARC wrapper.
//!
//! Given a result archive, the expected HITS output file and the CPU time
//! BOINC reported, this crate answers one question: should the result be
//! accepted?
//!
//! ## Pipeline
//!
//! 1. **Invocation**: three positional arguments, CPU time parsed as a number
//! 2. **Archive**: read `<jobid>.diag` and `./heartbeat.json` from the tarball
//! 3. **Field parsing**: ARC resource usage and the HITS output manifest
//! 4. **Decision**: output present, or ran long enough, or fail
//!
//! Nothing after the invocation stage is allowed to abort a run. A broken
//! archive, diag or heartbeat degrades to default values and is logged.
//!
//! ## Example
//!
//! ```rust,ignore
//! use atlas_validator_core::{validate, Invocation, ValidationPolicy};
//!
//! let invocation = Invocation::from_args(&["result_0_r1.tgz", "HITS.pool.root.1", "1500"])?;
//! let report = validate(&invocation, &ValidationPolicy::default());
//! std::process::exit(report.exit_code().into());
//! ```

pub mod archive;
pub mod decision;
pub mod diag;
pub mod heartbeat;
pub mod invocation;
pub mod patterns;
pub mod policy;
pub mod types;

#[cfg(test)]
mod testing;

use std::path::Path;

use chrono::Utc;
use regex::Regex;
use tracing::{debug, info, warn};

// Re-export main types at crate root
pub use archive::{ArchiveError, EntryError, HEARTBEAT_ENTRY};
pub use decision::DecisionEngine;
pub use diag::{DiagnosticRecord, DEFAULT_PROCESSORS};
pub use heartbeat::{
    HeartbeatError, HeartbeatRecord, ManifestDecode, ManifestError, OutputManifest,
};
pub use invocation::{Invocation, InvocationError};
pub use policy::{PolicyError, ValidationPolicy};
pub use types::{ValidationReport, ValidationSignals, Verdict};

/// What could be learned from the result archive.
#[derive(Debug, Default)]
struct ArchiveFindings {
    archive_readable: bool,
    diagnostic: DiagnosticRecord,
    hits_file: Option<String>,
}

/// Validate one result.
///
/// Reads the result archive once, checks the expected output for existence
/// and applies the decision policy. Never fails: every extraction problem is
/// logged and mapped to a default signal.
pub fn validate(invocation: &Invocation, policy: &ValidationPolicy) -> ValidationReport {
    let job_id = invocation.job_id();
    let findings = inspect_archive(&invocation.result_archive_path, &job_id, &policy.hits_pattern);

    let expected_output_present = invocation.expected_output_path.exists();
    if findings.hits_file.is_some() && !expected_output_present {
        warn!(
            "HITS file reported but {} does not exist",
            invocation.expected_output_path.display()
        );
    }

    let signals = ValidationSignals {
        hits_file: findings.hits_file,
        expected_output_present,
        reported_cpu_seconds: invocation.reported_cpu_seconds,
        wall_time_seconds: findings.diagnostic.measured_wall_seconds(),
    };
    let verdict = DecisionEngine::new(policy).decide(&signals);

    ValidationReport {
        job_id,
        archive_readable: findings.archive_readable,
        measured_cpu_seconds: findings.diagnostic.measured_cpu_seconds(),
        diagnostic: findings.diagnostic,
        reported_cpu_seconds: signals.reported_cpu_seconds,
        hits_file: signals.hits_file,
        expected_output_present,
        verdict,
        validated_at: Utc::now(),
    }
}

fn inspect_archive(path: &Path, job_id: &str, hits_pattern: &Regex) -> ArchiveFindings {
    let diag_name = archive::diag_entry_name(job_id);
    let mut entries = match archive::extract_entries(path, &[diag_name.as_str(), HEARTBEAT_ENTRY]) {
        Ok(entries) => entries,
        Err(e) => {
            warn!("Failed to open result tar file: {}", e);
            return ArchiveFindings::default();
        }
    };

    let diagnostic = match entries.take(&diag_name) {
        Ok(bytes) => {
            let text = String::from_utf8_lossy(&bytes);
            debug!("{}", text);
            let record = DiagnosticRecord::parse(&text);
            record.log_measurements();
            record
        }
        Err(e) => {
            warn!("Could not extract diag from results tarball: {}", e);
            DiagnosticRecord::default()
        }
    };

    let hits_file = match entries.take(HEARTBEAT_ENTRY) {
        Ok(bytes) => find_hits(&bytes, hits_pattern),
        Err(e) => {
            warn!("Could not extract heartbeat file from results tarball: {}", e);
            None
        }
    };

    ArchiveFindings {
        archive_readable: true,
        diagnostic,
        hits_file,
    }
}

fn find_hits(heartbeat: &[u8], hits_pattern: &Regex) -> Option<String> {
    let record = match HeartbeatRecord::from_slice(heartbeat) {
        Ok(record) => record,
        Err(e) => {
            warn!("Could not parse heartbeat.json: {}", e);
            return None;
        }
    };

    match record.manifest() {
        ManifestDecode::Decoded(manifest) => match manifest.find_matching(hits_pattern) {
            Some(name) => {
                info!("HITS file {} was produced successfully", name);
                Some(name.to_string())
            }
            None => {
                warn!(
                    "No HITS in heartbeat.json: none of {} output files match '{}'",
                    manifest.files.len(),
                    hits_pattern
                );
                None
            }
        },
        ManifestDecode::Absent(cause) => {
            warn!("No HITS in heartbeat.json: {}", cause);
            None
        }
    }
}
