use async_trait::async_trait;
use linkpulse_core::{EnrichedClickRecord, Link, Product};

use crate::error::PortError;

/// A link together with its document id.
#[derive(Debug, Clone, PartialEq)]
pub struct LinkRecord {
    pub id: String,
    pub link: Link,
}

/// A product together with its document id.
#[derive(Debug, Clone, PartialEq)]
pub struct ProductRecord {
    pub id: String,
    pub product: Product,
}

#[async_trait]
pub trait LinkLookup: Send + Sync {
    /// First link whose `urlShortCode` equals `short_code`.
    async fn find_by_short_code(&self, short_code: &str) -> Result<Option<LinkRecord>, PortError>;
}

#[async_trait]
pub trait ProductLookup: Send + Sync {
    async fn find_product(&self, product_id: &str) -> Result<Option<ProductRecord>, PortError>;
}

#[async_trait]
pub trait ClickSink: Send + Sync {
    /// Insert-or-replace keyed by `record.firestore_id`.
    async fn upsert(&self, record: &EnrichedClickRecord) -> Result<(), PortError>;
}
