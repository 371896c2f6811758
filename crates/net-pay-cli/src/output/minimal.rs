use serde_json::Value;

use super::plain;

/// Key answers, looked up by dotted path in priority order.
const PRIORITY_PATHS: &[&str] = &["annual.net", "calcMode.method", "message", "countryCode"];

/// Print just the key answer value from the output.
///
/// Array results print one line per item.
pub fn print_minimal(value: &Value) {
    for line in minimal_lines(value) {
        println!("{line}");
    }
}

fn minimal_lines(value: &Value) -> Vec<String> {
    let result = value
        .as_object()
        .and_then(|m| m.get("result"))
        .unwrap_or(value);

    match result {
        Value::Array(items) => items.iter().map(key_answer).collect(),
        other => vec![key_answer(other)],
    }
}

fn key_answer(value: &Value) -> String {
    for path in PRIORITY_PATHS {
        if let Some(found) = lookup(value, path) {
            if !found.is_null() {
                return plain(found);
            }
        }
    }

    match value {
        Value::Object(map) => match map.iter().next() {
            Some((key, val)) => format!("{key}: {}", plain(val)),
            None => String::new(),
        },
        other => plain(other),
    }
}

fn lookup<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.').try_fold(value, |current, key| current.get(key))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_salary_result_prints_annual_net() {
        let value = json!({"result": {"annual": {"gross": "50000.00", "net": "38200.00"}}});
        assert_eq!(minimal_lines(&value), vec!["38200.00".to_string()]);
    }

    #[test]
    fn test_context_prints_method() {
        let value = json!({"result": {"countryCode": "DE", "calcMode": {"method": "de_zoned_tariff"}}});
        assert_eq!(minimal_lines(&value), vec!["de_zoned_tariff".to_string()]);
    }

    #[test]
    fn test_arrays_print_one_line_each() {
        let value = json!({"result": [{"countryCode": "AT"}, {"countryCode": "DE"}]});
        assert_eq!(minimal_lines(&value), vec!["AT".to_string(), "DE".to_string()]);
    }
}
