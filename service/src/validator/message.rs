//! Message interpolation
//!
//! `{name}` is replaced by the constraint parameter `name`; `{validatedValue}`
//! by the invalid value. Unknown placeholders stay as written and `\{` / `\}`
//! produce literal braces.

use crate::descriptor::Parameters;
use graphguard_core::Value;

/// Placeholder for the validated value
pub const VALIDATED_VALUE: &str = "validatedValue";

/// Render a parameter the way it appears in messages
fn render_param(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Array(items) => items.iter().map(render_param).collect::<Vec<_>>().join(", "),
        other => other.to_string(),
    }
}

/// Interpolate a message template
#[must_use]
pub fn interpolate(template: &str, params: &Parameters, value: &Value) -> String {
    let mut out = String::with_capacity(template.len());
    let mut chars = template.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '\\' if matches!(chars.peek(), Some('{' | '}' | '\\')) => {
                if let Some(escaped) = chars.next() {
                    out.push(escaped);
                }
            }
            '{' => {
                let mut name = String::new();
                let mut closed = false;
                for n in chars.by_ref() {
                    if n == '}' {
                        closed = true;
                        break;
                    }
                    name.push(n);
                }
                if !closed {
                    out.push('{');
                    out.push_str(&name);
                } else if name == VALIDATED_VALUE {
                    out.push_str(&value.to_string());
                } else if let Some(param) = params.get(&name) {
                    out.push_str(&render_param(param));
                } else {
                    out.push('{');
                    out.push_str(&name);
                    out.push('}');
                }
            }
            other => out.push(other),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn params() -> Parameters {
        Parameters::from([
            ("min".to_string(), json!(2)),
            ("max".to_string(), json!(10)),
            ("regexp".to_string(), json!("[a-z]+")),
        ])
    }

    #[test]
    fn test_parameters_substituted() {
        assert_eq!(
            interpolate("size must be between {min} and {max}", &params(), &Value::Null),
            "size must be between 2 and 10"
        );
        assert_eq!(
            interpolate("must match \"{regexp}\"", &params(), &Value::Null),
            "must match \"[a-z]+\""
        );
    }

    #[test]
    fn test_unknown_placeholders_and_escapes() {
        assert_eq!(interpolate("{unknown} stays", &params(), &Value::Null), "{unknown} stays");
        assert_eq!(interpolate("\\{min\\} literal", &params(), &Value::Null), "{min} literal");
        assert_eq!(interpolate("dangling {min", &params(), &Value::Null), "dangling {min");
    }

    #[test]
    fn test_validated_value() {
        assert_eq!(
            interpolate("'{validatedValue}' is too long", &params(), &Value::from("abcdef")),
            "'abcdef' is too long"
        );
    }
}
