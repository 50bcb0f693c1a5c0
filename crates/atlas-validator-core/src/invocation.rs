//! Invocation parsing.
//!
//! The script validator hands us exactly three positional values: the result
//! archive, the expected HITS output file and the CPU time BOINC reported.

use std::num::ParseFloatError;
use std::path::{Path, PathBuf};

use serde::Serialize;
use thiserror::Error;

/// Number of positional arguments the validator expects.
pub const EXPECTED_ARGUMENTS: usize = 3;

/// Errors that make the invocation itself unusable.
#[derive(Error, Debug)]
pub enum InvocationError {
    #[error("Bad arguments: expected {expected} arguments, got {actual}")]
    WrongArgumentCount { expected: usize, actual: usize },

    #[error("Bad arguments: CPU time '{value}' is not a number: {source}")]
    InvalidCpuTime {
        value: String,
        #[source]
        source: ParseFloatError,
    },
}

/// A single validator invocation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Invocation {
    /// Result tarball returned by the worker node
    pub result_archive_path: PathBuf,

    /// Local path of the expected HITS output file
    pub expected_output_path: PathBuf,

    /// CPU time reported by BOINC, in seconds
    pub reported_cpu_seconds: f64,
}

impl Invocation {
    /// Build an invocation from positional arguments (program name excluded).
    pub fn from_args<S: AsRef<str>>(args: &[S]) -> Result<Self, InvocationError> {
        if args.len() != EXPECTED_ARGUMENTS {
            return Err(InvocationError::WrongArgumentCount {
                expected: EXPECTED_ARGUMENTS,
                actual: args.len(),
            });
        }

        let raw_cpu = args[2].as_ref();
        let reported_cpu_seconds =
            raw_cpu
                .trim()
                .parse::<f64>()
                .map_err(|source| InvocationError::InvalidCpuTime {
                    value: raw_cpu.to_string(),
                    source,
                })?;

        Ok(Self {
            result_archive_path: PathBuf::from(args[0].as_ref()),
            expected_output_path: PathBuf::from(args[1].as_ref()),
            reported_cpu_seconds,
        })
    }

    /// The job id encoded in the result archive name.
    pub fn job_id(&self) -> String {
        job_id_from_path(&self.result_archive_path)
    }
}

/// Derive the job id from an archive path: the base name up to the first `_`.
///
/// `/results/jaRNDm4Kr6_0_r1234.tgz` yields `jaRNDm4Kr6`.
pub fn job_id_from_path(path: &Path) -> String {
    let base = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();

    match base.split_once('_') {
        Some((head, _)) => head.to_string(),
        None => base,
    }
}
