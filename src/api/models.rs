// API request/response models (DTOs)

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::feed::records::ResolvedRecord;

#[derive(Debug, Deserialize)]
pub struct FeedQuery {
    pub limit: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub term: Option<String>,
    pub limit: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct StampRequest {
    #[serde(rename = "imageId")]
    pub image_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct FeedResponse {
    pub captions: Vec<ResolvedRecord>,
    pub images: IndexMap<String, String>,
}

#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub memes: Vec<ResolvedRecord>,
}

#[derive(Debug, Serialize)]
pub struct StampResponse {
    pub ok: bool,
}

/// The single externally observable failure shape.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

impl ErrorBody {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
        }
    }
}

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub database: String,
    pub uptime_seconds: u64,
}
