//! ATLAS result validator
//!
//! Invoked by the BOINC script validator once per result:
//!
//! ```text
//! atlas_validator [OPTIONS] <result_archive> <expected_output> <cpu_time>
//! ```
//!
//! Exit status 0 accepts the result, 1 rejects it (or the arguments were
//! unusable). Standard output is the audit log.

mod telemetry;

use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info, Level};

use atlas_validator_core::patterns::DEFAULT_HITS_PATTERN;
use atlas_validator_core::policy::{DEFAULT_CPU_THRESHOLD_SECS, DEFAULT_WALL_THRESHOLD_SECS};
use atlas_validator_core::{validate, Invocation, ValidationPolicy};

const FAILURE: u8 = 1;

#[derive(Parser)]
#[command(name = "atlas_validator")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Validate an ATLAS BOINC result", long_about = None)]
struct Cli {
    /// <result_archive> <expected_output> <cpu_time>
    #[arg(value_name = "ARGS", num_args = 0.., allow_negative_numbers = true)]
    args: Vec<String>,

    /// Reported CPU seconds above which a result passes without output
    #[arg(
        long,
        env = "ATLAS_VALIDATOR_CPU_THRESHOLD",
        default_value_t = DEFAULT_CPU_THRESHOLD_SECS
    )]
    cpu_threshold: f64,

    /// Measured wall seconds above which a result passes without output
    #[arg(
        long,
        env = "ATLAS_VALIDATOR_WALL_THRESHOLD",
        default_value_t = DEFAULT_WALL_THRESHOLD_SECS
    )]
    wall_threshold: u64,

    /// Regular expression a produced file must match to count as HITS output
    #[arg(long, env = "ATLAS_VALIDATOR_HITS_PATTERN", default_value = DEFAULT_HITS_PATTERN)]
    hits_pattern: String,

    /// Emit JSON-formatted log lines
    #[arg(long)]
    json: bool,

    /// Print the validation report as JSON after the verdict
    #[arg(long)]
    report: bool,

    /// Enable debug output, including the raw diag contents
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        // --help and --version are not failures
        Err(e) if !e.use_stderr() => {
            let _ = e.print();
            return ExitCode::SUCCESS;
        }
        Err(e) => {
            telemetry::init_tracing(false, Level::INFO);
            info!("Arguments: {}", raw_args());
            error!("Bad arguments: {}", e.to_string().trim_end());
            return ExitCode::from(FAILURE);
        }
    };

    let level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    telemetry::init_tracing(cli.json, level);

    match run(&cli) {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            error!("{:#}", e);
            ExitCode::from(FAILURE)
        }
    }
}

fn run(cli: &Cli) -> Result<u8> {
    info!("Arguments: {}", raw_args());

    let invocation = match Invocation::from_args(cli.args.as_slice()) {
        Ok(invocation) => invocation,
        Err(e) => {
            error!("{}", e);
            return Ok(FAILURE);
        }
    };
    info!(
        "CPU time from BOINC: {}",
        whole_seconds(invocation.reported_cpu_seconds)
    );

    let policy = build_policy(cli).context("Invalid validation policy")?;
    let report = validate(&invocation, &policy);

    if cli.report {
        println!("{}", serde_json::to_string_pretty(&report)?);
    }

    Ok(report.exit_code())
}

fn raw_args() -> String {
    std::env::args_os()
        .map(|arg| arg.to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join(" ")
}

/// CPU seconds truncated toward zero for the audit log.
fn whole_seconds(seconds: f64) -> String {
    if seconds.is_finite() {
        (seconds.trunc() as i64).to_string()
    } else {
        seconds.to_string()
    }
}

fn build_policy(cli: &Cli) -> Result<ValidationPolicy> {
    Ok(ValidationPolicy::new()
        .with_cpu_threshold(cli.cpu_threshold)?
        .with_wall_threshold(cli.wall_threshold)
        .with_hits_pattern(&cli.hits_pattern)?)
}
