//! Health check payload

use serde::{Deserialize, Serialize};

/// Health status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
}

/// Body of `GET /health`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HealthResponse {
    pub status: HealthStatus,
}

impl HealthResponse {
    /// The service is healthy whenever it can answer
    pub fn healthy() -> Self {
        Self {
            status: HealthStatus::Healthy,
        }
    }
}
