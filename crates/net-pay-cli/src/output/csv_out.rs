use serde_json::Value;
use std::io::{self, Write};

use super::{plain, row_tables};

/// Write output as CSV to stdout.
pub fn print_csv(value: &Value) {
    let stdout = io::stdout();
    if let Err(e) = write_csv(stdout.lock(), value) {
        tracing::error!(error = %e, "failed to write CSV output");
    }
}

fn write_csv<W: Write>(out: W, value: &Value) -> csv::Result<()> {
    let mut wtr = csv::Writer::from_writer(out);
    let result = value.get("result").unwrap_or(value);

    if let Some(tables) = row_tables(result) {
        // One line per rendered row, employee side first
        wtr.write_record(["side", "key", "label", "annual", "monthly"])?;
        for (side, rows) in tables {
            for row in rows {
                let field = |name: &str| row.get(name).map(plain).unwrap_or_default();
                wtr.write_record([
                    side.to_string(),
                    field("key"),
                    field("label"),
                    field("annual"),
                    field("monthly"),
                ])?;
            }
        }
    } else {
        match result {
            Value::Object(map) => {
                wtr.write_record(["field", "value"])?;
                for (key, val) in map {
                    wtr.write_record([key.as_str(), &plain(val)])?;
                }
            }
            Value::Array(arr) => write_array_csv(&mut wtr, arr)?,
            other => wtr.write_record([&plain(other)])?,
        }
    }

    wtr.flush()?;
    Ok(())
}

fn write_array_csv<W: Write>(wtr: &mut csv::Writer<W>, arr: &[Value]) -> csv::Result<()> {
    let Some(Value::Object(first)) = arr.first() else {
        for item in arr {
            wtr.write_record([&plain(item)])?;
        }
        return Ok(());
    };

    let headers: Vec<&str> = first.keys().map(|k| k.as_str()).collect();
    wtr.write_record(&headers)?;
    for item in arr {
        if let Value::Object(map) = item {
            let row: Vec<String> = headers
                .iter()
                .map(|h| map.get(*h).map(plain).unwrap_or_default())
                .collect();
            wtr.write_record(&row)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn render(value: &Value) -> String {
        let mut buf = Vec::new();
        write_csv(&mut buf, value).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn test_salary_rows_flattened() {
        let value = json!({
            "result": {
                "rows": {
                    "employee": [
                        {"key": "gross", "label": "Gross salary", "annual": "50000.00", "monthly": "4166.67"},
                        {"key": "net", "label": "Net salary", "annual": "38200.00", "monthly": "3183.33"}
                    ],
                    "employer": [
                        {"key": "tco", "label": "Total cost", "annual": "55000.00", "monthly": "4583.33"}
                    ]
                }
            }
        });
        let out = render(&value);
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines[0], "side,key,label,annual,monthly");
        assert_eq!(lines[1], "employee,gross,Gross salary,50000.00,4166.67");
        assert_eq!(lines[3], "employer,tco,Total cost,55000.00,4583.33");
    }

    #[test]
    fn test_array_result_uses_first_object_headers() {
        let value = json!({"result": [
            {"countryCode": "AT", "file": "austria.json"},
            {"countryCode": "DE", "file": "germany.json"}
        ]});
        assert_eq!(
            render(&value),
            "countryCode,file\nAT,austria.json\nDE,germany.json\n"
        );
    }
}
