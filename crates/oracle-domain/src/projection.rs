//! JSON projection: evaluate a `pick` path expression against an HTTP
//! response body and produce the on-chain string.
//!
//! A `jq`-style dotted path over parsed JSON, e.g.
//! `.data.public_metrics.followers_count` or `.items[0].name` (see
//! DESIGN.md for why this dialect was chosen). `"."` and the empty string
//! pass the whole body through; a dotted path resolves nested fields.

use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PickError {
    #[error("response body is not valid JSON: {reason}")]
    InvalidBody { reason: String },

    #[error("path segment {segment:?} not found")]
    SegmentNotFound { segment: String },

    #[error("index {index} out of bounds for array of length {len}")]
    IndexOutOfBounds { index: usize, len: usize },

    #[error("malformed path expression: {reason}")]
    MalformedExpression { reason: String },
}

/// Apply `expression` to `body` and return the projected value serialised
/// to a string.
pub fn pick(expression: &str, body: &str) -> Result<String, PickError> {
    let trimmed = expression.trim();

    if trimmed.is_empty() || trimmed == "." {
        let value: Value = serde_json::from_str(body).map_err(|e| PickError::InvalidBody {
            reason: e.to_string(),
        })?;
        return Ok(stringify(&value));
    }

    let value: Value = serde_json::from_str(body).map_err(|e| PickError::InvalidBody {
        reason: e.to_string(),
    })?;

    let mut current = &value;
    for segment in parse_segments(trimmed)? {
        current = match segment {
            Segment::Key(key) => current
                .as_object()
                .and_then(|obj| obj.get(&key))
                .ok_or(PickError::SegmentNotFound { segment: key })?,
            Segment::Index(index) => {
                let array = current
                    .as_array()
                    .ok_or_else(|| PickError::SegmentNotFound {
                        segment: format!("[{index}]"),
                    })?;
                array.get(index).ok_or(PickError::IndexOutOfBounds {
                    index,
                    len: array.len(),
                })?
            }
        };
    }

    Ok(stringify(current))
}

enum Segment {
    Key(String),
    Index(usize),
}

/// Split a path like `.data.items[0].name` or `data.items[0].name` into
/// `[Key("data"), Key("items"), Index(0), Key("name")]`.
fn parse_segments(expression: &str) -> Result<Vec<Segment>, PickError> {
    let expression = expression.strip_prefix('.').unwrap_or(expression);
    let mut segments = Vec::new();

    for raw in expression.split('.') {
        if raw.is_empty() {
            return Err(PickError::MalformedExpression {
                reason: format!("empty segment in {expression:?}"),
            });
        }

        let mut rest = raw;
        if let Some(bracket_start) = rest.find('[') {
            let key = &rest[..bracket_start];
            if !key.is_empty() {
                segments.push(Segment::Key(key.to_string()));
            }
            rest = &rest[bracket_start..];

            while let Some(stripped) = rest.strip_prefix('[') {
                let Some(close) = stripped.find(']') else {
                    return Err(PickError::MalformedExpression {
                        reason: format!("unterminated index in {raw:?}"),
                    });
                };
                let index: usize =
                    stripped[..close]
                        .parse()
                        .map_err(|_| PickError::MalformedExpression {
                            reason: format!("non-numeric index in {raw:?}"),
                        })?;
                segments.push(Segment::Index(index));
                rest = &stripped[close + 1..];
            }
        } else {
            segments.push(Segment::Key(rest.to_string()));
        }
    }

    Ok(segments)
}

fn stringify(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => "null".to_string(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dot_alone_passes_body_through() {
        let body = r#"{"a":1}"#;
        let result = pick(".", body).unwrap();
        assert_eq!(result, r#"{"a":1}"#);
    }

    #[test]
    fn empty_expression_behaves_like_dot() {
        let body = r#"{"a":1}"#;
        assert_eq!(pick("", body).unwrap(), pick(".", body).unwrap());
    }

    #[test]
    fn resolves_nested_scalar() {
        let body = r#"{"data":{"public_metrics":{"followers_count":12345}}}"#;
        let result = pick(".data.public_metrics.followers_count", body).unwrap();
        assert_eq!(result, "12345");
    }

    #[test]
    fn resolves_array_index() {
        let body = r#"{"items":[{"name":"first"},{"name":"second"}]}"#;
        let result = pick(".items[1].name", body).unwrap();
        assert_eq!(result, "second");
    }

    #[test]
    fn missing_segment_is_an_error() {
        let body = r#"{"data":{}}"#;
        let err = pick(".data.public_metrics.followers_count", body).unwrap_err();
        assert!(matches!(err, PickError::SegmentNotFound { .. }));
    }

    #[test]
    fn invalid_body_is_an_error() {
        let err = pick(".a", "not json").unwrap_err();
        assert!(matches!(err, PickError::InvalidBody { .. }));
    }

    #[test]
    fn out_of_bounds_index_is_an_error() {
        let body = r#"{"items":[1,2]}"#;
        let err = pick(".items[5]", body).unwrap_err();
        assert!(matches!(err, PickError::IndexOutOfBounds { .. }));
    }
}
