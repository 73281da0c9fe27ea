use thiserror::Error;

/// Load failures, split the way the protocol reacts to them: malformed
/// documents and fetch failures abort the load, structural unsupported
/// features abort too (cosmetic gaps never become an error, the loaders skip
/// the affected branch), cancellation is its own signal so callers can tell
/// it apart from a genuine error.
#[derive(Error, Debug)]
pub enum LoadError {
    #[error(transparent)]
    Document(#[from] gltf_document::DocumentError),

    #[error("The document is malformed, because: {reason}")]
    Malformed { reason: String },

    #[error("Fetching \"{uri}\" failed: {source}")]
    Fetch {
        uri: String,
        source: std::io::Error,
    },

    #[error("Unsupported feature: {feature} (structural: {structural})")]
    Unsupported { feature: String, structural: bool },

    #[error("The render backend failed: {0}")]
    Backend(#[from] anyhow::Error),

    #[error("The load was cancelled")]
    Cancelled,

    #[error("A loader branch did not settle: {0}")]
    Join(#[from] tokio::task::JoinError),
}

impl LoadError {
    pub fn malformed(reason: impl Into<String>) -> Self {
        LoadError::Malformed {
            reason: reason.into(),
        }
    }
}
