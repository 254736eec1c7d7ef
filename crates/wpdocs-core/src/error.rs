/// Unified error type for wpdocs.
#[derive(Debug, thiserror::Error)]
pub enum WpdocsError {
    #[error("Extraction error: {0}")]
    Extraction(String),

    #[error("Source error: {0}")]
    Source(String),

    #[error("Unsupported file type: {0}")]
    Unsupported(String),

    #[error("Invalid symbol kind: {0}")]
    InvalidSymbolKind(String),

    #[error("Invalid hook type: {0}")]
    InvalidHookType(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
