//! Data models for embedding requests and results

use serde_json::{json, Map, Value};

use crate::error::EmbeddingError;

/// A transcript chunk. Either a bare string or an object with a `text` field.
pub type Chunk = Value;

/// Delegate output, returned to the client unchanged
pub type EmbedResult = Value;

/// A validated `/embed` request
#[derive(Debug, Clone, PartialEq)]
pub struct EmbedRequest {
    /// Chunks in client order, never empty
    pub chunks: Vec<Chunk>,

    /// Model name
    pub model: String,
}

/// Extract the text to embed from a chunk
pub fn chunk_text(index: usize, chunk: &Chunk) -> Result<&str, EmbeddingError> {
    match chunk {
        Value::String(text) => Ok(text),
        Value::Object(fields) => match fields.get("text") {
            Some(Value::String(text)) => Ok(text),
            Some(_) => Err(EmbeddingError::InvalidChunk {
                index,
                reason: "`text` must be a string".to_string(),
            }),
            None => Err(EmbeddingError::InvalidChunk {
                index,
                reason: "missing `text` field".to_string(),
            }),
        },
        _ => Err(EmbeddingError::InvalidChunk {
            index,
            reason: "expected a string or an object with a `text` field".to_string(),
        }),
    }
}

/// Assemble the result document: each chunk keeps its own fields and gains
/// `index` and `embedding`.
pub fn build_result(model: &str, dimension: usize, chunks: &[Chunk], embeddings: Vec<Vec<f32>>) -> EmbedResult {
    let embedded: Vec<Value> = chunks
        .iter()
        .zip(embeddings)
        .enumerate()
        .map(|(index, (chunk, embedding))| {
            let mut fields = match chunk {
                Value::Object(fields) => fields.clone(),
                other => {
                    let mut fields = Map::new();
                    fields.insert("text".to_string(), other.clone());
                    fields
                }
            };
            fields.insert("index".to_string(), json!(index));
            fields.insert("embedding".to_string(), json!(embedding));
            Value::Object(fields)
        })
        .collect();

    json!({
        "model": model,
        "dimension": dimension,
        "count": embedded.len(),
        "chunks": embedded,
    })
}
