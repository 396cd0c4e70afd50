use serde::{Deserialize, Serialize};
use crate::models::domain::{CompatibilityResult, PlaydateMatch};

/// Response for the playdate-matches endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaydateMatchesResponse {
    pub success: bool,
    pub data: Vec<PlaydateMatch>,
    #[serde(default)]
    pub total_candidates: usize,
}

/// Response for the rank endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RankResponse {
    pub results: Vec<CompatibilityResult>,
    pub total_candidates: usize,
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

/// Error response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    pub status_code: u16,
}
