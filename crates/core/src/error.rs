//! Unified error types for offerscout.
//!
//! Every variant renders with a stable code prefix, and maps onto both an HTTP
//! status for the route surface and a JSON-RPC code for the MCP surface.

use rmcp::model::{ErrorCode, ErrorData as McpError};

/// Unified error types for the price-discovery pipeline.
#[derive(Debug, Clone, thiserror::Error)]
pub enum Error {
    /// Invalid input parameters (e.g., empty query).
    #[error("INVALID_INPUT: {0}")]
    InvalidInput(String),

    /// Missing or invalid configuration discovered at request time.
    #[error("CONFIG_ERROR: {0}")]
    Config(String),

    /// No adapter is registered for the requested source.
    #[error("UNKNOWN_SOURCE: {0}")]
    UnknownSource(String),

    /// Browser process could not be launched or connected to.
    #[error("BROWSER_LAUNCH_FAILED: {0}")]
    BrowserLaunch(String),

    /// Target page never reached a content-ready state.
    #[error("NAVIGATION_FAILED: {0}")]
    Navigation(String),

    /// A bounded step ran out of time.
    #[error("TIMEOUT: {0}")]
    Timeout(String),

    /// Page rendered but no offer nodes appeared.
    #[error("NO_OFFERS: {0}")]
    NoOffersFound(String),

    /// Rendered page could not be read or projected.
    #[error("EXTRACT_FAILED: {0}")]
    ExtractFailed(String),

    /// External offer validator unreachable or answered garbage.
    #[error("VALIDATOR_UNAVAILABLE: {0}")]
    ValidatorUnavailable(String),

    /// Non-success HTTP response from an upstream service.
    #[error("HTTP_ERROR: {0}")]
    HttpError(String),

    /// Browser tab or process could not be shut down.
    #[error("SESSION_TEARDOWN_FAILED: {0}")]
    SessionTeardown(String),

    /// Operation was superseded or aborted by the caller.
    #[error("CANCELLED")]
    Cancelled,

    /// Browser rendering is compiled out.
    #[error("RENDER_DISABLED")]
    RenderDisabled,
}

impl Error {
    /// HTTP status for the route surface.
    pub fn http_status(&self) -> u16 {
        match self {
            Error::InvalidInput(_) => 400,
            Error::UnknownSource(_) | Error::NoOffersFound(_) => 404,
            _ => 500,
        }
    }

    /// Cancellation is a distinct, non-user-visible outcome.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Error::Cancelled)
    }
}

impl From<Error> for McpError {
    fn from(err: Error) -> Self {
        let (code, message) = match &err {
            Error::InvalidInput(msg) => (-32602, msg.clone()),
            Error::Config(msg) => (-32001, msg.clone()),
            Error::UnknownSource(msg) => (-32002, format!("unknown source: {msg}")),
            Error::BrowserLaunch(msg) => (-32003, msg.clone()),
            Error::Navigation(msg) => (-32004, msg.clone()),
            Error::Timeout(msg) => (-32005, msg.clone()),
            Error::NoOffersFound(msg) => (-32006, msg.clone()),
            Error::ExtractFailed(msg) => (-32007, msg.clone()),
            Error::ValidatorUnavailable(msg) => (-32008, msg.clone()),
            Error::HttpError(msg) => (-32009, msg.clone()),
            Error::Cancelled => (-32010, "Operation cancelled".to_string()),
            Error::RenderDisabled => (-32011, "Render mode is disabled".to_string()),
            Error::SessionTeardown(msg) => (-32012, msg.clone()),
        };

        McpError { code: ErrorCode(code), message: message.into(), data: None }
    }
}
