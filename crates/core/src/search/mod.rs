//! The consumed product search interface and its adapters

mod catalog;
mod http;

pub use catalog::InMemoryCatalog;
pub use http::{HttpSearchProvider, HttpSearchSettings};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::product::CandidateProduct;

/// Candidates requested per search unless configured otherwise
pub const DEFAULT_MAX_RESULTS: usize = 10;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SearchOptions {
    pub category: Option<String>,
    pub brand: Option<String>,
    pub max_results: usize,
    pub min_confidence: f64,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self { category: None, brand: None, max_results: DEFAULT_MAX_RESULTS, min_confidence: 0.0 }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResponse {
    pub products: Vec<CandidateProduct>,
    #[serde(default)]
    pub total_found: usize,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SearchError {
    #[error("search backend unreachable: {0}")]
    Unavailable(String),
    #[error("search backend returned status {status}")]
    Status { status: u16 },
    #[error("search backend returned a malformed payload: {0}")]
    Malformed(String),
    #[error("search request timed out")]
    Timeout,
}

#[async_trait]
pub trait SearchProvider: Send + Sync {
    async fn search(
        &self,
        query: &str,
        options: &SearchOptions,
    ) -> Result<SearchResponse, SearchError>;
}
