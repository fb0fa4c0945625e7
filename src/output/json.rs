//! JSON output formatting
//!
//! Optional machine-readable report written next to the two stdout lines.

use crate::config::ReducerKind;
use crate::integrand::BuiltinIntegrand;
use crate::reducer::PartialResult;
use crate::Result;
use anyhow::Context;
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::path::Path;
use std::time::Duration;

/// Which executable produced the report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Variant {
    Sequential,
    Threads,
    Distributed,
}

/// One worker's slice and contribution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonPartial {
    pub worker: usize,
    pub local_a: f64,
    pub local_b: f64,
    pub local_subdivisions: usize,
    pub value: f64,
    pub elapsed_secs: f64,
}

impl From<&PartialResult> for JsonPartial {
    fn from(p: &PartialResult) -> Self {
        Self {
            worker: p.partition.worker,
            local_a: p.partition.local_a,
            local_b: p.partition.local_b,
            local_subdivisions: p.partition.local_subdivisions,
            value: p.value,
            elapsed_secs: Duration::from_nanos(p.elapsed_ns).as_secs_f64(),
        }
    }
}

/// Full run report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    /// RFC 3339 time the report was built
    pub timestamp: String,
    pub variant: Variant,
    pub integrand: BuiltinIntegrand,
    pub a: f64,
    pub b: f64,
    pub subdivisions: usize,
    pub workers: usize,
    /// Only the shared-memory variant has a choice of reducer
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reducer: Option<ReducerKind>,
    pub result: f64,
    /// Closed-form value of the integral over [a, b]
    pub exact: f64,
    /// `|result - exact|`
    pub abs_error: f64,
    pub elapsed_secs: f64,
    pub partials: Vec<JsonPartial>,
}

impl RunReport {
    /// Build a report stamped with the current time
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        variant: Variant,
        integrand: BuiltinIntegrand,
        a: f64,
        b: f64,
        subdivisions: usize,
        reducer: Option<ReducerKind>,
        result: f64,
        elapsed: Duration,
        partials: &[PartialResult],
    ) -> Self {
        let exact = integrand.exact(a, b);

        Self {
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            variant,
            integrand,
            a,
            b,
            subdivisions,
            workers: partials.len(),
            reducer,
            result,
            exact,
            abs_error: (result - exact).abs(),
            elapsed_secs: elapsed.as_secs_f64(),
            partials: partials.iter().map(JsonPartial::from).collect(),
        }
    }
}

/// Write the report to `path` as pretty-printed JSON
pub fn write_json_report(path: &Path, report: &RunReport) -> Result<()> {
    let file = File::create(path)
        .with_context(|| format!("Failed to create JSON report {}", path.display()))?;

    serde_json::to_writer_pretty(file, report)
        .with_context(|| format!("Failed to write JSON report {}", path.display()))?;

    tracing::debug!(path = %path.display(), "JSON report written");
    Ok(())
}
