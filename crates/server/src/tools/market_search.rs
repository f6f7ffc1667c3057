//! market_search tool implementation.
//!
//! Runs a search through a coordinator of its own: fetch, validate,
//! reconcile, sort and summarize. Concurrent calls share settled results
//! but never cancel each other.

use chrono::Utc;
use offerscout_client::{SearchOutcome, SearchResult};
use offerscout_core::{Error, Source};
use rmcp::{ErrorData as McpError, model::*};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::state::AppState;

/// Input parameters for market_search tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct MarketSearchParams {
    /// Marketplace to search: auction, classifieds or catalog.
    pub source: Source,

    /// Free-text product query.
    pub query: String,

    /// Bypass fresh cached results.
    #[serde(default)]
    pub force_refresh: bool,
}

/// Output structure for market_search tool.
#[derive(Debug, Clone, Serialize)]
pub struct MarketSearchOutput {
    pub source: Source,
    #[serde(flatten)]
    pub result: SearchResult,
    pub searched_at: String,
}

/// Implementation of the market_search tool.
pub async fn search_impl(state: &AppState, params: MarketSearchParams) -> Result<CallToolResult, McpError> {
    let coordinator = state.coordinator(params.source)?;
    let outcome = coordinator.search(&params.query, params.force_refresh).await;
    outcome_to_result(&params, outcome)
}

fn outcome_to_result(params: &MarketSearchParams, outcome: SearchOutcome) -> Result<CallToolResult, McpError> {
    let result = match outcome {
        SearchOutcome::Succeeded(result) => result,
        SearchOutcome::Failed(e) => return Err(e.into()),
        SearchOutcome::Cancelled => {
            tracing::debug!(source = %params.source, query = params.query.trim(), "search cancelled");
            return Ok(CallToolResult::success(vec![Content::text(format!(
                "the search for \"{}\" on {} was cancelled before it finished",
                params.query.trim(),
                params.source
            ))]));
        }
        SearchOutcome::Suppressed => {
            return Ok(CallToolResult::error(vec![Content::text(format!(
                "a search for \"{}\" on {} is already running",
                params.query.trim(),
                params.source
            ))]));
        }
    };

    let output = MarketSearchOutput { source: params.source, result, searched_at: Utc::now().to_rfc3339() };
    let json = serde_json::to_string_pretty(&output)
        .map_err(|e| Error::InvalidInput(format!("Failed to serialize search result: {e}")))?;

    Ok(CallToolResult::success(vec![Content::text(json)]))
}
