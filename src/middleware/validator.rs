//! Request body validation for `/embed`

use serde_json::Value;
use tracing::{debug, warn};

use crate::embedding::EmbedRequest;

/// Request validator
pub struct InputValidator;

impl InputValidator {
    /// Parse and validate an `/embed` body.
    ///
    /// An empty body, or a JSON value that is empty/null/false/zero, counts as
    /// "no transcript JSON". A missing, null or empty `chunks` counts as "no
    /// transcript". `model` falls back to `default_model` when absent or null.
    pub fn parse_embed_request(body: &[u8], default_model: &str) -> Result<EmbedRequest, ValidationError> {
        if body.iter().all(u8::is_ascii_whitespace) {
            warn!("Validation failed: empty body");
            return Err(ValidationError::MissingBody);
        }

        let value: Value = serde_json::from_slice(body).map_err(|e| {
            warn!("Validation failed: malformed JSON: {}", e);
            ValidationError::MalformedJson(e.to_string())
        })?;

        if is_empty_json(&value) {
            warn!("Validation failed: empty transcript JSON");
            return Err(ValidationError::MissingBody);
        }

        let Value::Object(mut fields) = value else {
            warn!("Validation failed: body is not a JSON object");
            return Err(ValidationError::NotAnObject);
        };

        let chunks = match fields.remove("chunks") {
            Some(Value::Array(chunks)) if !chunks.is_empty() => chunks,
            Some(other) if !is_empty_json(&other) => {
                warn!("Validation failed: chunks is not an array");
                return Err(ValidationError::ChunksNotArray);
            }
            _ => {
                warn!("Validation failed: no chunks");
                return Err(ValidationError::MissingChunks);
            }
        };

        let model = match fields.remove("model") {
            None | Some(Value::Null) => default_model.to_string(),
            Some(Value::String(model)) if !model.trim().is_empty() => model,
            Some(_) => {
                warn!("Validation failed: invalid model name");
                return Err(ValidationError::InvalidModel);
            }
        };

        debug!(chunks = chunks.len(), model = %model, "Embed request validation passed");
        Ok(EmbedRequest { chunks, model })
    }
}

/// Mirrors the falsy values a JSON-dynamic client treats as "nothing sent"
fn is_empty_json(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        Value::Array(a) => a.is_empty(),
        Value::Object(o) => o.is_empty(),
    }
}

/// Validation errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("No transcript JSON provided")]
    MissingBody,

    #[error("No transcript provided")]
    MissingChunks,

    #[error("Malformed JSON body: {0}")]
    MalformedJson(String),

    #[error("Transcript JSON must be an object")]
    NotAnObject,

    #[error("chunks must be an array")]
    ChunksNotArray,

    #[error("model must be a non-empty string")]
    InvalidModel,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const DEFAULT: &str = "all-MiniLM-L6-v2";

    fn parse(body: &str) -> Result<EmbedRequest, ValidationError> {
        InputValidator::parse_embed_request(body.as_bytes(), DEFAULT)
    }

    #[test]
    fn test_valid_request() {
        let req = parse(r#"{"chunks": ["hello world"], "model": "BAAI/bge-small-en-v1.5"}"#).unwrap();
        assert_eq!(req.chunks, vec![json!("hello world")]);
        assert_eq!(req.model, "BAAI/bge-small-en-v1.5");
    }

    #[test]
    fn test_default_model() {
        let req = parse(r#"{"chunks": [{"text": "a", "start": 0.0}]}"#).unwrap();
        assert_eq!(req.model, DEFAULT);

        let req = parse(r#"{"chunks": ["a"], "model": null}"#).unwrap();
        assert_eq!(req.model, DEFAULT);
    }

    #[test]
    fn test_missing_body() {
        for body in ["", "   ", "{}", "null", "[]", "false", "0", "\"\""] {
            assert_eq!(parse(body), Err(ValidationError::MissingBody), "body: {:?}", body);
        }
    }

    #[test]
    fn test_missing_chunks() {
        for body in [r#"{"model": "x"}"#, r#"{"chunks": []}"#, r#"{"chunks": null}"#, r#"{"chunks": ""}"#] {
            assert_eq!(parse(body), Err(ValidationError::MissingChunks), "body: {}", body);
        }
    }

    #[test]
    fn test_messages() {
        assert_eq!(ValidationError::MissingBody.to_string(), "No transcript JSON provided");
        assert_eq!(ValidationError::MissingChunks.to_string(), "No transcript provided");
    }

    #[test]
    fn test_malformed_shapes() {
        assert!(matches!(parse("{not json"), Err(ValidationError::MalformedJson(_))));
        assert_eq!(parse(r#"["a"]"#), Err(ValidationError::NotAnObject));
        assert_eq!(parse(r#"{"chunks": "hello"}"#), Err(ValidationError::ChunksNotArray));
        assert_eq!(parse(r#"{"chunks": ["a"], "model": 7}"#), Err(ValidationError::InvalidModel));
        assert_eq!(parse(r#"{"chunks": ["a"], "model": ""}"#), Err(ValidationError::InvalidModel));
        assert_eq!(parse(r#"{"chunks": ["a"], "model": " "}"#), Err(ValidationError::InvalidModel));
    }
}
