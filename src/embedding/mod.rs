//! Embedding delegates that turn transcript chunks into vectors
//!
//! The front door never looks inside a delegate: it asks a
//! [`DelegateFactory`] for a fresh instance per request, hands it the
//! chunks, passes the returned JSON through, and gives the instance to the
//! reclaimer afterwards.

pub mod mock;
pub mod models;
pub mod onnx;

pub use mock::{MockBehavior, MockCounters, MockDelegateFactory};
pub use models::{Chunk, EmbedRequest, EmbedResult};
pub use onnx::{FastEmbedDelegate, FastEmbedFactory};

use crate::error::EmbeddingError;

/// A single-use embedding model instance
pub trait EmbeddingDelegate: Send {
    /// Model name the instance was created for
    fn model(&self) -> &str;

    /// Embed the chunks, preserving their order
    fn embed_transcript(&mut self, chunks: &[Chunk]) -> Result<EmbedResult, EmbeddingError>;

    /// Release model-held memory ahead of drop
    fn cleanup(&mut self) -> Result<(), EmbeddingError> {
        Ok(())
    }
}

/// Creates delegates by model name
pub trait DelegateFactory: Send + Sync {
    fn create(&self, model: &str) -> Result<Box<dyn EmbeddingDelegate>, EmbeddingError>;
}
