use std::fmt;

use serde::Serialize;

/// A non-fatal problem met while enriching one click.
///
/// Enrichment never fails outright; each degradation is reported here and
/// the record is built from whatever data was available.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EnrichmentWarning {
    /// The click document could not be read; enriched as an empty click.
    MalformedEvent { reason: String },
    /// The click has no `shortId`, so no link or product was looked up.
    MissingShortId,
    LinkNotFound { short_id: String },
    LinkLookupFailed { short_id: String, error: String },
    /// The link references a product that does not exist.
    ProductNotFound { product_id: String },
    ProductLookupFailed { product_id: String, error: String },
    SinkWriteFailed { error: String },
}

impl fmt::Display for EnrichmentWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EnrichmentWarning::MalformedEvent { reason } => {
                write!(f, "malformed click document: {reason}")
            }
            EnrichmentWarning::MissingShortId => f.write_str("click has no shortId"),
            EnrichmentWarning::LinkNotFound { short_id } => {
                write!(f, "no link with urlShortCode '{short_id}'")
            }
            EnrichmentWarning::LinkLookupFailed { short_id, error } => {
                write!(f, "link lookup for '{short_id}' failed: {error}")
            }
            EnrichmentWarning::ProductNotFound { product_id } => {
                write!(f, "product '{product_id}' not found")
            }
            EnrichmentWarning::ProductLookupFailed { product_id, error } => {
                write!(f, "product lookup for '{product_id}' failed: {error}")
            }
            EnrichmentWarning::SinkWriteFailed { error } => write!(f, "sink write failed: {error}"),
        }
    }
}
