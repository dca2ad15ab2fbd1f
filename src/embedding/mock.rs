//! Deterministic delegate for tests and local development

use serde_json::Value;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use super::models::{build_result, chunk_text, Chunk, EmbedResult};
use super::{DelegateFactory, EmbeddingDelegate};
use crate::error::EmbeddingError;

/// Vector size produced by the mock
pub const MOCK_DIMENSION: usize = 4;

/// What the mock delegate does when used
#[derive(Debug, Clone, Default)]
pub enum MockBehavior {
    /// Return deterministic vectors derived from the chunk text
    #[default]
    Succeed,
    /// Return this exact document
    Respond(Value),
    /// Fail in the factory
    FailCreate(EmbeddingError),
    /// Fail in `embed_transcript`
    FailEmbed(EmbeddingError),
    /// Panic in `embed_transcript`
    PanicEmbed(String),
    /// Succeed, but fail in `cleanup`
    FailCleanup(EmbeddingError),
}

/// Call counters shared by a factory and every delegate it creates
#[derive(Debug, Default)]
pub struct MockCounters {
    created: AtomicUsize,
    embedded: AtomicUsize,
    cleaned: AtomicUsize,
    dropped: AtomicUsize,
    calls: Mutex<Vec<(String, Vec<Chunk>)>>,
}

impl MockCounters {
    pub fn created(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }

    pub fn embedded(&self) -> usize {
        self.embedded.load(Ordering::SeqCst)
    }

    pub fn cleaned(&self) -> usize {
        self.cleaned.load(Ordering::SeqCst)
    }

    pub fn dropped(&self) -> usize {
        self.dropped.load(Ordering::SeqCst)
    }

    /// `(model, chunks)` for every `embed_transcript` call, in order
    pub fn calls(&self) -> Vec<(String, Vec<Chunk>)> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }
}

/// Factory producing [`MockDelegate`]s
#[derive(Debug, Clone, Default)]
pub struct MockDelegateFactory {
    behavior: MockBehavior,
    counters: Arc<MockCounters>,
}

impl MockDelegateFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_behavior(behavior: MockBehavior) -> Self {
        Self {
            behavior,
            counters: Arc::default(),
        }
    }

    pub fn counters(&self) -> Arc<MockCounters> {
        self.counters.clone()
    }
}

impl DelegateFactory for MockDelegateFactory {
    fn create(&self, model: &str) -> Result<Box<dyn EmbeddingDelegate>, EmbeddingError> {
        if let MockBehavior::FailCreate(err) = &self.behavior {
            return Err(err.clone());
        }
        self.counters.created.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MockDelegate {
            model: model.to_string(),
            behavior: self.behavior.clone(),
            counters: self.counters.clone(),
        }))
    }
}

/// Delegate returning vectors derived from byte statistics of each chunk
pub struct MockDelegate {
    model: String,
    behavior: MockBehavior,
    counters: Arc<MockCounters>,
}

/// Deterministic pseudo-embedding for a piece of text
pub fn mock_vector(text: &str) -> Vec<f32> {
    let bytes = text.as_bytes();
    let sum: u32 = bytes.iter().map(|&b| u32::from(b)).sum();
    vec![
        bytes.len() as f32,
        sum as f32,
        bytes.first().copied().unwrap_or(0) as f32,
        bytes.last().copied().unwrap_or(0) as f32,
    ]
}

impl EmbeddingDelegate for MockDelegate {
    fn model(&self) -> &str {
        &self.model
    }

    fn embed_transcript(&mut self, chunks: &[Chunk]) -> Result<EmbedResult, EmbeddingError> {
        self.counters.embedded.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut calls) = self.counters.calls.lock() {
            calls.push((self.model.clone(), chunks.to_vec()));
        }

        match &self.behavior {
            MockBehavior::Respond(value) => Ok(value.clone()),
            MockBehavior::FailEmbed(err) => Err(err.clone()),
            MockBehavior::PanicEmbed(message) => panic!("{}", message),
            _ => {
                let vectors = chunks
                    .iter()
                    .enumerate()
                    .map(|(i, chunk)| chunk_text(i, chunk).map(mock_vector))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(build_result(&self.model, MOCK_DIMENSION, chunks, vectors))
            }
        }
    }

    fn cleanup(&mut self) -> Result<(), EmbeddingError> {
        self.counters.cleaned.fetch_add(1, Ordering::SeqCst);
        match &self.behavior {
            MockBehavior::FailCleanup(err) => Err(err.clone()),
            _ => Ok(()),
        }
    }
}

impl Drop for MockDelegate {
    fn drop(&mut self) {
        self.counters.dropped.fetch_add(1, Ordering::SeqCst);
    }
}
