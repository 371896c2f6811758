pub mod csv_out;
pub mod json;
pub mod minimal;
pub mod table;

use crate::OutputFormat;
use serde_json::Value;

/// Dispatch output to the appropriate formatter.
pub fn format_output(format: &OutputFormat, value: &Value) {
    match format {
        OutputFormat::Json => json::print_json(value),
        OutputFormat::Table => table::print_table(value),
        OutputFormat::Csv => csv_out::print_csv(value),
        OutputFormat::Minimal => minimal::print_minimal(value),
    }
}

/// Row tables of a salary result, as `(side, rows)` pairs.
pub(crate) fn row_tables(result: &Value) -> Option<Vec<(&'static str, &Vec<Value>)>> {
    let rows = result.get("rows")?.as_object()?;
    let mut tables = Vec::new();
    for side in ["employee", "employer"] {
        if let Some(Value::Array(items)) = rows.get(side) {
            tables.push((side, items));
        }
    }
    Some(tables)
}

/// Render a scalar JSON value as plain text.
pub(crate) fn plain(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => String::new(),
        _ => serde_json::to_string(value).unwrap_or_default(),
    }
}
