//! Extracting a JSON object from noisy model output.
//!
//! Completions often wrap the JSON in prose or code fences. We take the
//! first balanced `{...}` span (string- and escape-aware) and parse that;
//! anything without such a span is a parse error.

use serde_json::{Map, Value};

use leadloom_shared::{LeadloomError, Result};

/// Locate the first balanced `{...}` span in `text`.
pub fn first_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;

    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, ch) in text[start..].char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                in_string = false;
            }
            continue;
        }

        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..start + offset + ch.len_utf8()]);
                }
            }
            _ => {}
        }
    }

    None
}

/// Parse the first JSON object out of a completion into a key → value map.
pub fn parse_object(text: &str) -> Result<Map<String, Value>> {
    let span = first_json_object(text)
        .ok_or_else(|| LeadloomError::parse("no JSON object in completion"))?;

    match serde_json::from_str::<Value>(span) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(LeadloomError::parse("completion JSON is not an object")),
        Err(e) => Err(LeadloomError::parse(format!("invalid completion JSON: {e}"))),
    }
}
