//! Scenario report rows and their output formats
//!
//! All writers are pure with respect to their `Write` target, like the rest of
//! the harness output path.

use crate::types::{BillingResponseCode, BillingResult, BridgeError};
use clap::ValueEnum;
use serde::Serialize;
use std::fmt;
use std::io::Write;

/// Output format of the scenario report
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum ReportFormat {
    #[default]
    Json,
    Csv,
}

/// How a scenario step ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StepStatus {
    /// The step ran and the native layer reported OK
    Ok,
    /// The step ran and the native layer reported a non-OK code
    Failed,
    /// The bridge refused the step before any native call
    Rejected,
    /// The step has no native outcome (local state or event counts)
    Info,
}

impl fmt::Display for StepStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StepStatus::Ok => "ok",
            StepStatus::Failed => "failed",
            StepStatus::Rejected => "rejected",
            StepStatus::Info => "info",
        };
        f.write_str(name)
    }
}

/// One row of the scenario report
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StepReport {
    pub step: String,
    pub status: StepStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_code: Option<BillingResponseCode>,
    pub debug_message: String,
    pub detail: String,
}

impl StepReport {
    /// A row for a step that produced a native outcome
    pub fn outcome(step: impl Into<String>, result: &BillingResult, detail: impl Into<String>) -> Self {
        Self {
            step: step.into(),
            status: if result.is_ok() {
                StepStatus::Ok
            } else {
                StepStatus::Failed
            },
            response_code: Some(result.response_code),
            debug_message: result.debug_message.clone(),
            detail: detail.into(),
        }
    }

    /// A row for a step the bridge refused
    pub fn rejected(step: impl Into<String>, error: &BridgeError) -> Self {
        Self {
            step: step.into(),
            status: StepStatus::Rejected,
            response_code: None,
            debug_message: String::new(),
            detail: error.to_string(),
        }
    }

    pub fn info(step: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            step: step.into(),
            status: StepStatus::Info,
            response_code: None,
            debug_message: String::new(),
            detail: detail.into(),
        }
    }
}

/// Write the report in the requested format
///
/// # Errors
///
/// Returns `BridgeError::Io` if the output cannot be written.
pub fn write_report(
    rows: &[StepReport],
    format: ReportFormat,
    output: &mut dyn Write,
) -> Result<(), BridgeError> {
    match format {
        ReportFormat::Json => write_report_json(rows, output),
        ReportFormat::Csv => write_report_csv(rows, output),
    }
}

pub fn write_report_json(rows: &[StepReport], output: &mut dyn Write) -> Result<(), BridgeError> {
    serde_json::to_writer_pretty(&mut *output, rows).map_err(|e| BridgeError::Io {
        message: format!("Failed to write JSON report: {}", e),
    })?;
    writeln!(output)?;
    Ok(())
}

pub fn write_report_csv(rows: &[StepReport], output: &mut dyn Write) -> Result<(), BridgeError> {
    let mut writer = csv::Writer::from_writer(output);

    writer
        .write_record(["step", "status", "response_code", "debug_message", "detail"])
        .map_err(|e| csv_error("header", e))?;

    for row in rows {
        let code = row
            .response_code
            .map(|code| code.code().to_string())
            .unwrap_or_default();
        writer
            .write_record([
                row.step.as_str(),
                row.status.to_string().as_str(),
                code.as_str(),
                row.debug_message.as_str(),
                row.detail.as_str(),
            ])
            .map_err(|e| csv_error("row", e))?;
    }

    writer.flush()?;
    Ok(())
}

fn csv_error(what: &str, error: csv::Error) -> BridgeError {
    BridgeError::Io {
        message: format!("Failed to write CSV {}: {}", what, error),
    }
}
