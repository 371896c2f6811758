use serde_json::Value;
use std::io::{self, Read};

/// Attempt to read a JSON or YAML document from stdin if data is being piped.
/// Returns None if stdin is a TTY (interactive) or empty.
pub fn read_stdin() -> Result<Option<Value>, Box<dyn std::error::Error>> {
    if atty::is(atty::Stream::Stdin) {
        return Ok(None);
    }

    let mut buffer = String::new();
    io::stdin().read_to_string(&mut buffer)?;
    parse_piped(&buffer)
}

fn parse_piped(buffer: &str) -> Result<Option<Value>, Box<dyn std::error::Error>> {
    let trimmed = buffer.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }

    match serde_json::from_str(trimmed) {
        Ok(value) => Ok(Some(value)),
        Err(json_err) => {
            let value: Value = serde_yaml::from_str(trimmed)
                .map_err(|_| format!("stdin is neither JSON nor YAML: {json_err}"))?;
            Ok(Some(value))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_and_yaml_accepted() {
        let json = parse_piped(r#"{"salaryAmount": 50000}"#).unwrap().unwrap();
        assert_eq!(json["salaryAmount"], 50000);

        let yaml = parse_piped("countryCode: DE\nyear: 2026\n").unwrap().unwrap();
        assert_eq!(yaml["countryCode"], "DE");
        assert_eq!(yaml["year"], 2026);
    }

    #[test]
    fn test_blank_input_is_none() {
        assert!(parse_piped("  \n").unwrap().is_none());
    }
}
