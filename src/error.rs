// =============================================================================
// ERROR MODULE
// =============================================================================
// Error taxonomy shared by the store, the remote client and the sync engine.
//
// NOTES:
// - thiserror derives Display from the #[error("...")] attributes
// - #[from] gives us `?` conversions from io / serde_json / reqwest errors
// - Every variant has a stable code that goes into structured log fields
// - The library returns AppError; the binary wraps it in anyhow::Error with
//   context at the command boundary, where it is printed and the menu loop
//   continues
// - Per-item push failures are NOT errors here: they are recorded as
//   ItemOutcome::Failed in the sync report and the push goes on
// =============================================================================

use thiserror::Error;

// =============================================================================
// CUSTOM ERROR TYPE
// =============================================================================
#[derive(Debug, Error)]
pub enum AppError {
    // -------------------------------------------------------------------------
    // REMOTE API ERRORS
    // -------------------------------------------------------------------------
    /// No API URL in the catalog, sync and pull refuse to run
    #[error("API URL not configured in the inventory file")]
    NotConfigured,

    /// No response obtained (DNS, connection refused, timeout)
    #[error("Connection error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The server answered, but not with a 2xx
    #[error("API error ({status}): {body}")]
    Api { status: u16, body: String },

    /// A push or pull is already running on this engine
    #[error("A sync is already in progress")]
    SyncInProgress,

    // -------------------------------------------------------------------------
    // FILE WATCH ERRORS
    // -------------------------------------------------------------------------
    /// The filesystem watcher could not be set up
    #[error("File watch error: {0}")]
    Watch(#[from] notify::Error),

    // -------------------------------------------------------------------------
    // BUSINESS LOGIC ERRORS
    // -------------------------------------------------------------------------
    /// Lookup by id or list index failed
    #[error("Not found: {0}")]
    NotFound(String),

    /// Order quantity exceeds stock on hand
    #[error("Insufficient stock: available {available}, requested {requested}")]
    InsufficientStock { available: u32, requested: u32 },

    /// Malformed value at the edge (quantity, price, required field)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    // -------------------------------------------------------------------------
    // LOCAL DOCUMENT ERRORS
    // -------------------------------------------------------------------------
    /// Reading or writing a JSON document failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A JSON document (or an API payload) could not be parsed
    #[error("Invalid JSON: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl AppError {
    /// Stable error code for logs and metrics labels.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::NotConfigured => "NOT_CONFIGURED",
            AppError::Transport(_) => "TRANSPORT_ERROR",
            AppError::Api { .. } => "API_ERROR",
            AppError::SyncInProgress => "SYNC_IN_PROGRESS",
            AppError::Watch(_) => "WATCH_ERROR",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::InsufficientStock { .. } => "INSUFFICIENT_STOCK",
            AppError::InvalidInput(_) => "INVALID_INPUT",
            AppError::Io(_) => "IO_ERROR",
            AppError::Serialization(_) => "SERIALIZATION_ERROR",
        }
    }

    /// True when the failure came from talking to the remote API.
    pub fn is_remote(&self) -> bool {
        matches!(self, AppError::Transport(_) | AppError::Api { .. })
    }
}

// =============================================================================
// RESULT TYPE ALIAS
// =============================================================================
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes_are_stable() {
        assert_eq!(AppError::NotConfigured.code(), "NOT_CONFIGURED");
        assert_eq!(
            AppError::Api {
                status: 500,
                body: "boom".into()
            }
            .code(),
            "API_ERROR"
        );
        assert_eq!(
            AppError::InsufficientStock {
                available: 1,
                requested: 2
            }
            .to_string(),
            "Insufficient stock: available 1, requested 2"
        );
    }

    #[test]
    fn test_remote_classification() {
        let api = AppError::Api {
            status: 404,
            body: String::new(),
        };
        assert!(api.is_remote());
        assert!(!AppError::NotFound("x".into()).is_remote());
        assert!(!AppError::NotConfigured.is_remote());
    }
}
