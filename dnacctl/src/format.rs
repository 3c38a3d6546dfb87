//! Output formatting utilities for the CLI
//!
//! Provides table and JSON formatting with colors.

use anyhow::Result;
use colored::*;
use dnac_core::{JsonResponse, TaskRecord, TaskState};
use serde_json::Value;

use tabled::{builder::Builder, settings::Style, Table, Tabled};

use crate::config::CliConfig;

const MAX_CELL_WIDTH: usize = 60;

/// Output format options
#[derive(Debug, Clone)]
pub enum OutputFormat {
    Table,
    Json,
}

/// Format an API response.
///
/// Tables show the `response` payload when the body carries one: a list of
/// objects becomes one row per item, an object becomes key/value rows.
pub fn format_response(response: &JsonResponse, format: &OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(response.raw())?),
        OutputFormat::Table => {
            let payload = response.get("response").value().unwrap_or(response.raw());
            let header = format!(
                "{} {} ({})",
                response.method(),
                response.endpoint().cyan(),
                response.status()
            );

            let body = match payload {
                Value::Array(items) if items.is_empty() => "No items.".dimmed().to_string(),
                Value::Array(items) if items.iter().all(Value::is_object) => records_table(items),
                Value::Array(items) => list_table(items),
                Value::Object(map) if map.is_empty() => "{}".to_string(),
                Value::Object(map) => key_value_table(map.iter().map(|(k, v)| (k.as_str(), v))),
                scalar => cell(scalar),
            };

            Ok(format!("{}\n{}", header.bold(), body))
        }
    }
}

fn cell(value: &Value) -> String {
    let text = match value {
        Value::Null => "-".to_string(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    };

    if text.chars().count() > MAX_CELL_WIDTH {
        let cut: String = text.chars().take(MAX_CELL_WIDTH - 3).collect();
        format!("{}...", cut)
    } else {
        text
    }
}

/// One row per object. Columns follow the order keys are first seen.
fn records_table(items: &[Value]) -> String {
    let mut columns: Vec<&str> = Vec::new();
    for item in items {
        if let Value::Object(map) = item {
            for key in map.keys() {
                if !columns.contains(&key.as_str()) {
                    columns.push(key.as_str());
                }
            }
        }
    }

    let mut builder = Builder::default();
    builder.push_record(columns.iter().map(|c| c.to_string()));
    for item in items {
        builder.push_record(
            columns
                .iter()
                .map(|column| item.get(*column).map(cell).unwrap_or_default()),
        );
    }

    let count = format!("{} items", items.len());
    format!(
        "{}\n{}",
        builder.build().with(Style::rounded()),
        count.dimmed()
    )
}

fn list_table(items: &[Value]) -> String {
    let mut builder = Builder::default();
    builder.push_record(["#", "Value"]);
    for (index, item) in items.iter().enumerate() {
        builder.push_record([index.to_string(), cell(item)]);
    }
    builder.build().with(Style::rounded()).to_string()
}

fn key_value_table<'a>(entries: impl Iterator<Item = (&'a str, &'a Value)>) -> String {
    let mut builder = Builder::default();
    builder.push_record(["Key", "Value"]);
    for (key, value) in entries {
        builder.push_record([key.to_string(), cell(value)]);
    }
    builder.build().with(Style::rounded()).to_string()
}

fn colored_state(state: TaskState) -> ColoredString {
    let name = state.to_string();
    match state {
        TaskState::Succeeded => name.green().bold(),
        TaskState::Failed => name.red().bold(),
        TaskState::Running => name.yellow(),
        TaskState::Pending => name.dimmed(),
    }
}

/// Format a task record
pub fn format_task(record: &TaskRecord, format: &OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(record)?),
        OutputFormat::Table => {
            #[derive(Tabled)]
            struct TaskRow {
                #[tabled(rename = "Field")]
                field: &'static str,
                #[tabled(rename = "Value")]
                value: String,
            }

            let mut rows = vec![
                TaskRow {
                    field: "Task ID",
                    value: record.task_id.cyan().to_string(),
                },
                TaskRow {
                    field: "State",
                    value: colored_state(record.state).to_string(),
                },
            ];

            let optional = [
                ("Progress", record.progress.clone()),
                ("Error Code", record.error_code.clone()),
                ("Failure Reason", record.failure_reason.clone()),
                (
                    "Duration",
                    record
                        .duration()
                        .map(|d| format!("{:.1}s", d.as_secs_f64())),
                ),
                ("Data", record.data.as_ref().map(cell)),
            ];
            rows.extend(
                optional
                    .into_iter()
                    .filter_map(|(field, value)| value.map(|value| TaskRow { field, value })),
            );

            let table = Table::new(rows).with(Style::rounded()).to_string();
            Ok(format!("{}\n{}", "Task:".bold(), table))
        }
    }
}

/// Format a call followed by the task it started, as one document in JSON.
pub fn format_waited_call(
    response: &JsonResponse,
    record: &TaskRecord,
    format: &OutputFormat,
) -> Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(&serde_json::json!({
            "response": response.raw(),
            "task": record,
        }))?),
        OutputFormat::Table => Ok(format!(
            "{}\n\n{}",
            format_response(response, format)?,
            format_task(record, format)?
        )),
    }
}

/// Format the effective configuration. The password is always masked.
pub fn format_config(config: &CliConfig, format: &OutputFormat) -> Result<String> {
    let config = config.redacted();

    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(&config)?),
        OutputFormat::Table => {
            let port = config
                .server
                .port
                .map(|p| p.to_string())
                .unwrap_or_else(|| "-".to_string());
            let host = if config.server.host.is_empty() {
                "(not set)".red().to_string()
            } else {
                config.server.host.clone()
            };
            let verify = if config.server.verify_ssl {
                "yes".green()
            } else {
                "no".yellow()
            };

            let mut builder = Builder::default();
            builder.push_record(["Setting", "Value"]);
            builder.push_record(["Host".to_string(), host]);
            builder.push_record(["Port".to_string(), port]);
            builder.push_record(["Verify TLS".to_string(), verify.to_string()]);
            builder.push_record(["Timeout".to_string(), format!("{}s", config.server.timeout)]);
            builder.push_record(["Username".to_string(), config.auth.username.clone()]);
            builder.push_record(["Password".to_string(), config.auth.password.clone()]);
            builder.push_record(["Output Format".to_string(), config.output_format.clone()]);
            builder.push_record(["Verbose".to_string(), config.verbose.to_string()]);

            let table = builder.build().with(Style::rounded()).to_string();
            Ok(format!("{}\n{}", "CLI Configuration:".bold(), table))
        }
    }
}

/// Format the result of a reachability check
pub fn format_health(url: &str, reachable: bool, format: &OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(&serde_json::json!({
            "url": url,
            "reachable": reachable,
        }))?),
        OutputFormat::Table => {
            let status = if reachable {
                "reachable".green()
            } else {
                "unreachable".red()
            };
            Ok(format!("Controller {}: {}", url.cyan(), status))
        }
    }
}

/// Format success message
pub fn format_success(message: &str) -> String {
    format!("{} {}", "✓".green().bold(), message)
}
