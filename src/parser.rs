//! Quote-aware line parser for load-balancer log lines.
//!
//! Tokens are positional against the schema's field list. Double quotes
//! delimit tokens that may contain whitespace and are stripped from the
//! emitted value. Purely-numeric tokens are coerced to JSON numbers even
//! when the column is semantically a string; that matches the upstream
//! log format's historical behavior and consumers rely on it.

use serde_json::{Map, Value};

use crate::schema::{FieldTransform, LogSchema, TransformRegistry};

/// Parser bound to one schema, with per-field transforms resolved up front.
pub struct LineParser<'a> {
    schema: &'a LogSchema,
    transforms: Vec<Option<FieldTransform>>,
}

impl<'a> LineParser<'a> {
    pub fn new(schema: &'a LogSchema, registry: &TransformRegistry) -> Self {
        let transforms = schema
            .fields
            .iter()
            .map(|field| registry.resolve(field))
            .collect();
        Self { schema, transforms }
    }

    /// Parse one raw line into a field-name → value map.
    ///
    /// Consecutive delimiters are skipped without consuming a field slot.
    /// A line with fewer tokens than schema fields yields a map without
    /// the trailing fields; tokens beyond the schema are ignored.
    pub fn parse(&self, line: &str) -> Map<String, Value> {
        let mut parsed = Map::new();
        let mut index = 0;
        let mut within_quotes = false;
        let mut token = String::new();

        // Trailing sentinel space flushes the final token.
        for c in line.chars().chain(std::iter::once(' ')) {
            if c == '"' {
                within_quotes = !within_quotes;
                continue;
            }
            if c.is_whitespace() && !within_quotes {
                if !token.is_empty() {
                    if index >= self.schema.fields.len() {
                        break;
                    }
                    let field = self.schema.fields[index];
                    let value = numeric_value(&token)
                        .unwrap_or_else(|| Value::String(token.clone()));
                    if let Some(transform) = self.transforms[index] {
                        transform(&token, &mut parsed);
                    }
                    parsed.insert(field.to_string(), value);
                    token.clear();
                    index += 1;
                }
                continue;
            }
            token.push(c);
        }

        parsed
    }
}

/// Coerce a purely-numeric token (digits with at most one interior dot,
/// no sign) into a JSON number. Integral tokens become integers.
fn numeric_value(token: &str) -> Option<Value> {
    let bytes = token.as_bytes();
    if bytes.is_empty() || !bytes[0].is_ascii_digit() {
        return None;
    }
    let mut dots = 0;
    for b in bytes {
        match b {
            b'0'..=b'9' => {}
            b'.' => dots += 1,
            _ => return None,
        }
    }
    if dots > 1 {
        return None;
    }
    if dots == 0 {
        if let Ok(n) = token.parse::<u64>() {
            return Some(Value::from(n));
        }
    }
    token
        .parse::<f64>()
        .ok()
        .and_then(serde_json::Number::from_f64)
        .map(Value::Number)
}
