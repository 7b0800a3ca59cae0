//! Document-write events delivered by the Firestore trigger.

use serde::Deserialize;
use serde_json::{Map, Value};

use crate::error::FirestoreError;
use crate::value::decode_fields;

/// A document in Firestore REST encoding.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FirestoreDocument {
    /// Full resource name, `projects/{p}/databases/{d}/documents/{path}`.
    pub name: String,
    #[serde(default)]
    pub fields: Option<Value>,
    #[serde(default)]
    pub create_time: Option<String>,
    #[serde(default)]
    pub update_time: Option<String>,
}

impl FirestoreDocument {
    /// The last path segment of [`FirestoreDocument::name`].
    #[must_use]
    pub fn id(&self) -> &str {
        self.name.rsplit('/').next().unwrap_or(&self.name)
    }

    /// Decoded field map; a document without `fields` has none.
    ///
    /// # Errors
    ///
    /// Returns [`FirestoreError::InvalidDocument`] if `fields` is not an
    /// object. Individual undecodable fields come back as `null`.
    pub fn decoded_fields(&self) -> Result<Map<String, Value>, FirestoreError> {
        match &self.fields {
            Some(fields) => decode_fields(fields),
            None => Ok(Map::new()),
        }
    }
}

/// The payload of a Firestore document-write trigger.
///
/// `old_value` is absent for creates and `value` is absent for deletes.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentWriteEvent {
    #[serde(default)]
    pub old_value: Option<FirestoreDocument>,
    #[serde(default)]
    pub value: Option<FirestoreDocument>,
    #[serde(default)]
    pub update_mask: Option<Value>,
}

/// What a write event means for a downstream consumer.
#[derive(Debug, Clone, PartialEq)]
pub enum DocumentChange {
    /// The document was created or updated; carries its decoded fields.
    Written {
        document_id: String,
        fields: Map<String, Value>,
    },
    /// The document no longer exists.
    Deleted { document_id: String },
}

impl DocumentChange {
    #[must_use]
    pub fn document_id(&self) -> &str {
        match self {
            DocumentChange::Written { document_id, .. }
            | DocumentChange::Deleted { document_id } => document_id,
        }
    }
}

impl DocumentWriteEvent {
    /// Reduces the event to the after-state, or a deletion marker.
    ///
    /// # Errors
    ///
    /// Returns [`FirestoreError::InvalidDocument`] when the event carries
    /// neither snapshot, or the after-state's `fields` is not an object.
    pub fn into_change(self) -> Result<DocumentChange, FirestoreError> {
        match (self.value, self.old_value) {
            (Some(after), _) => {
                let fields = after.decoded_fields()?;
                Ok(DocumentChange::Written {
                    document_id: after.id().to_owned(),
                    fields,
                })
            }
            (None, Some(before)) => Ok(DocumentChange::Deleted {
                document_id: before.id().to_owned(),
            }),
            (None, None) => Err(FirestoreError::InvalidDocument(
                "write event carries neither value nor oldValue".to_owned(),
            )),
        }
    }
}
