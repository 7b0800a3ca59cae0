use linkpulse_db::DbError;
use linkpulse_firestore::FirestoreError;
use thiserror::Error;

/// Failure of a lookup or sink behind one of the enrichment ports.
#[derive(Debug, Error)]
pub enum PortError {
    #[error(transparent)]
    Firestore(#[from] FirestoreError),

    #[error(transparent)]
    Db(#[from] DbError),

    /// A document was fetched but could not be read as the expected type.
    #[error("could not decode {collection}/{id}: {reason}")]
    Decode {
        collection: String,
        id: String,
        reason: String,
    },

    /// The backing store refused the call, e.g. a store switched off in tests.
    #[error("store unavailable: {0}")]
    Unavailable(String),
}
