//! Read-only Firestore REST access for the enrichment pipeline.
//!
//! Covers the three things the pipeline needs from Firestore: decoding the
//! typed-value documents carried by write events, an equality lookup on the
//! `links` collection, and a point read on `products`.

pub mod client;
pub mod error;
pub mod event;
pub(crate) mod retry;
pub mod value;

pub use client::FirestoreClient;
pub use error::FirestoreError;
pub use event::{DocumentChange, DocumentWriteEvent, FirestoreDocument};
pub use value::{decode_fields, decode_value};
