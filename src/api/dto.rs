use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::{fetcher::ReadingFetcher, reading_cache::ReadingCache};

/// Shared handler state. Both members are cheap `Arc` clones.
#[derive(Clone)]
pub struct AppState {
    pub cache: ReadingCache,
    pub fetcher: ReadingFetcher,
}

impl AppState {
    pub fn new(cache: ReadingCache, fetcher: ReadingFetcher) -> Self {
        Self { cache, fetcher }
    }
}

/// Query string for `GET /thermostats/{device_id}`.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct RefreshParams {
    /// Bypass the reading cache and fetch from the vendor.
    #[serde(default)]
    pub refresh: bool,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
}

/// JSON body of every non-2xx response.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    /// Failure class: `auth`, `transport`, `remote`, `parse`, `notify` or `store`.
    pub error: String,
    pub details: String,
}
