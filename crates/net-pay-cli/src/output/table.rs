use serde_json::{Map, Value};
use tabled::{builder::Builder, Table};

use super::{plain, row_tables};

/// Format output as tables using the tabled crate.
///
/// Salary results render their employee and employer row tables; other
/// results fall back to a field/value listing.
pub fn print_table(value: &Value) {
    match value {
        Value::Object(map) => match map.get("result") {
            Some(result) => print_result(result, map),
            None => print_flat_object(map),
        },
        Value::Array(arr) => print_array_table(arr),
        _ => println!("{value}"),
    }
}

fn print_result(result: &Value, envelope: &Map<String, Value>) {
    if let Some(tables) = row_tables(result) {
        let currency = result.get("currency").map(plain).unwrap_or_default();
        for (i, (side, rows)) in tables.iter().enumerate() {
            if i > 0 {
                println!();
            }
            println!("{} ({currency})", title(side));
            print_rows(rows);
        }
    } else {
        match result {
            Value::Object(res_map) => print_flat_object(res_map),
            Value::Array(arr) => print_array_table(arr),
            other => println!("{}", format_value(other)),
        }
    }

    if let Some(Value::Array(warnings)) = envelope.get("warnings") {
        if !warnings.is_empty() {
            println!("\nWarnings:");
            for w in warnings {
                if let Value::String(s) = w {
                    println!("  - {s}");
                }
            }
        }
    }

    if let Some(Value::Array(notes)) = result.get("notes") {
        if !notes.is_empty() {
            println!("\nNotes:");
            for n in notes {
                println!("  - {}", plain(n));
            }
        }
    }

    if let Some(Value::String(meth)) = envelope.get("methodology") {
        println!("\nMethodology: {meth}");
    }
}

fn title(side: &str) -> &'static str {
    match side {
        "employer" => "Employer",
        _ => "Employee",
    }
}

fn print_rows(rows: &[Value]) {
    let mut builder = Builder::default();
    builder.push_record(["Item", "Annual", "Monthly"]);
    for row in rows {
        builder.push_record([
            row.get("label").map(plain).unwrap_or_default(),
            row.get("annual").map(plain).unwrap_or_default(),
            row.get("monthly").map(plain).unwrap_or_default(),
        ]);
    }
    println!("{}", Table::from(builder));
}

fn print_flat_object(map: &Map<String, Value>) {
    let mut builder = Builder::default();
    builder.push_record(["Field", "Value"]);
    for (key, val) in map {
        builder.push_record([key.as_str(), &format_value(val)]);
    }
    println!("{}", Table::from(builder));
}

fn print_array_table(arr: &[Value]) {
    if arr.is_empty() {
        println!("(empty)");
        return;
    }

    if let Some(Value::Object(first)) = arr.first() {
        let headers: Vec<String> = first.keys().cloned().collect();
        let mut builder = Builder::default();
        builder.push_record(&headers);

        for item in arr {
            if let Value::Object(map) = item {
                let row: Vec<String> = headers
                    .iter()
                    .map(|h| map.get(h.as_str()).map(format_value).unwrap_or_default())
                    .collect();
                builder.push_record(row);
            }
        }

        println!("{}", Table::from(builder));
    } else {
        for item in arr {
            println!("{}", format_value(item));
        }
    }
}

fn format_value(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Array(arr) => {
            let items: Vec<String> = arr.iter().map(format_value).collect();
            items.join(", ")
        }
        other => plain(other),
    }
}
