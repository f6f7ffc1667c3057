//! cache_clear tool implementation.
//!
//! Drops every cached result of one source so the next search refetches.

use offerscout_core::{Error, Source};
use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::state::AppState;

/// Parameters for the cache_clear tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheClearParams {
    /// Marketplace whose cache is cleared.
    pub source: Source,
}

/// Output from the cache_clear tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheClearOutput {
    pub success: bool,
    /// Entries removed across the raw-offer and settled-result caches.
    pub cleared: usize,
}

/// Implementation of the cache_clear tool.
pub async fn clear_impl(state: &AppState, params: CacheClearParams) -> Result<CallToolResult, McpError> {
    let cleared = state.clear_cache(params.source)?;
    tracing::info!(source = %params.source, cleared, "cache cleared");

    let output = CacheClearOutput { success: true, cleared };
    let json = serde_json::to_string_pretty(&output)
        .map_err(|e| Error::InvalidInput(format!("Failed to serialize result: {e}")))?;

    Ok(CallToolResult::success(vec![Content::text(json)]))
}
