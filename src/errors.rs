use thiserror::Error;

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Failed to list Azure resources: {0}")]
    ResourceList(String),

    #[error("Application not found: {0}")]
    ApplicationNotFound(String),

    #[error("Application name '{name}' is ambiguous, matching fact sheets: {}", .ids.join(", "))]
    ApplicationAmbiguous { name: String, ids: Vec<String> },

    #[error("{context} failed with status {status}: {body}")]
    Api {
        context: String,
        status: u16,
        body: String,
    },

    #[error("Unexpected response from {0}")]
    UnexpectedResponse(String),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Serde JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("External command failed: {0}")]
    Command(String),
}

impl SyncError {
    /// Errors that must abort the whole run instead of a single resource. A
    /// catalog call answered with 401 surfaces as `Authentication` too, so an
    /// access token that expires mid-run stops the run.
    pub fn is_fatal(&self) -> bool {
        matches!(self, SyncError::Authentication(_) | SyncError::ResourceList(_))
    }
}

pub type Result<T> = std::result::Result<T, SyncError>;
