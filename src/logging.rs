//! Log subscriber setup for the binary
//!
//! Filter from `GATEWAY_JOBS_LOG` (EnvFilter syntax), otherwise `info`, or
//! `debug` with `--verbose`. Format from `GATEWAY_JOBS_LOG_FORMAT`: `json`,
//! `pretty` or `compact` (default). Logs go to stderr; stdout carries
//! command output.

use std::env;
use std::io;

use tracing_subscriber::EnvFilter;

const FILTER_VAR: &str = "GATEWAY_JOBS_LOG";
const FORMAT_VAR: &str = "GATEWAY_JOBS_LOG_FORMAT";

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum LogFormat {
    Json,
    Pretty,
    Compact,
}

/// Install the global subscriber. A second call is a no-op.
pub fn init(verbose: bool) {
    let filter = build_filter(env::var(FILTER_VAR).ok().as_deref(), verbose);
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr);

    let result = match parse_format(env::var(FORMAT_VAR).ok().as_deref()) {
        LogFormat::Json => builder.json().try_init(),
        LogFormat::Pretty => builder.pretty().try_init(),
        LogFormat::Compact => builder.compact().try_init(),
    };
    // Already installed (tests, embedding)
    let _ = result;
}

fn build_filter(value: Option<&str>, verbose: bool) -> EnvFilter {
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        Some(directives) => EnvFilter::new(directives),
        None if verbose => EnvFilter::new("debug"),
        None => EnvFilter::new("info"),
    }
}

fn parse_format(value: Option<&str>) -> LogFormat {
    match value
        .map(str::trim)
        .map(|v| v.to_ascii_lowercase())
        .as_deref()
    {
        Some("json") => LogFormat::Json,
        Some("pretty") => LogFormat::Pretty,
        _ => LogFormat::Compact,
    }
}
