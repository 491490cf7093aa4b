//! Result rendering for the `crm` binary.

use anyhow::Result;
use clap::ValueEnum;
use serde_json::Value;

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Pretty-printed JSON document
    Json,
    /// Indented `key: value` listing
    Pretty,
}

pub fn print_output(format: OutputFormat, value: &Value) -> Result<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(value)?),
        OutputFormat::Pretty => {
            let mut lines = Vec::new();
            render_pretty(value, 0, &mut lines);
            for line in lines {
                println!("{line}");
            }
        }
    }
    Ok(())
}

fn render_pretty(value: &Value, depth: usize, lines: &mut Vec<String>) {
    let indent = "  ".repeat(depth);
    match value {
        Value::Object(map) => {
            for (key, val) in map {
                match val {
                    Value::Object(inner) if !inner.is_empty() => {
                        lines.push(format!("{indent}{key}:"));
                        render_pretty(val, depth + 1, lines);
                    }
                    Value::Array(items) if items.iter().any(Value::is_object) => {
                        lines.push(format!("{indent}{key}: ({} items)", items.len()));
                        render_pretty(val, depth + 1, lines);
                    }
                    _ => lines.push(format!("{indent}{key}: {}", scalar(val))),
                }
            }
        }
        Value::Array(items) if items.is_empty() => lines.push(format!("{indent}(none)")),
        Value::Array(items) => {
            for (index, item) in items.iter().enumerate() {
                if index > 0 && depth == 0 {
                    lines.push(String::new());
                }
                lines.push(format!("{indent}#{}", index + 1));
                render_pretty(item, depth + 1, lines);
            }
        }
        other => lines.push(format!("{indent}{}", scalar(other))),
    }
}

fn scalar(value: &Value) -> String {
    match value {
        Value::Null => "-".to_string(),
        Value::String(text) => text.clone(),
        Value::Array(items) => items.iter().map(scalar).collect::<Vec<_>>().join(", "),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::render_pretty;
    use serde_json::json;

    #[test]
    fn pretty_renders_nested_records_and_scalars() {
        let mut lines = Vec::new();
        render_pretty(
            &json!({"name": "Ada", "email": null, "tags": ["vip", "lead"], "custom_fields": {"tier": 1}}),
            0,
            &mut lines,
        );
        assert!(lines.contains(&"name: Ada".to_string()));
        assert!(lines.contains(&"email: -".to_string()));
        assert!(lines.contains(&"tags: vip, lead".to_string()));
        assert!(lines.contains(&"custom_fields:".to_string()));
        assert!(lines.contains(&"  tier: 1".to_string()));
    }

    #[test]
    fn pretty_marks_empty_lists() {
        let mut lines = Vec::new();
        render_pretty(&json!([]), 0, &mut lines);
        assert_eq!(lines, vec!["(none)".to_string()]);
    }
}
