use thiserror::Error;

/// Errors returned by the Firestore REST client and document decoders.
#[derive(Debug, Error)]
pub enum FirestoreError {
    /// Network or TLS failure from the underlying HTTP client.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Firestore answered with a status the caller does not handle.
    #[error("Firestore returned HTTP {status} for {context}: {body}")]
    UnexpectedStatus {
        status: u16,
        context: String,
        body: String,
    },

    /// The response body could not be deserialized into the expected type.
    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    /// A document or typed value did not follow the Firestore REST encoding.
    #[error("invalid document: {0}")]
    InvalidDocument(String),

    #[error("invalid base URL '{url}': {reason}")]
    InvalidBaseUrl { url: String, reason: String },
}
