//! Port implementations over the production stores.

use async_trait::async_trait;
use linkpulse_core::{AppConfig, EnrichedClickRecord, Link, Product};
use linkpulse_firestore::FirestoreClient;
use sqlx::PgPool;

use crate::error::PortError;
use crate::ports::{ClickSink, LinkLookup, LinkRecord, ProductLookup, ProductRecord};

const SHORT_CODE_FIELD: &str = "urlShortCode";

/// Link and product lookups against Firestore collections.
#[derive(Clone)]
pub struct FirestoreLookups {
    client: FirestoreClient,
    links_collection: String,
    products_collection: String,
}

impl FirestoreLookups {
    #[must_use]
    pub fn new(
        client: FirestoreClient,
        links_collection: impl Into<String>,
        products_collection: impl Into<String>,
    ) -> Self {
        Self {
            client,
            links_collection: links_collection.into(),
            products_collection: products_collection.into(),
        }
    }

    #[must_use]
    pub fn from_config(client: FirestoreClient, config: &AppConfig) -> Self {
        Self::new(
            client,
            config.links_collection.clone(),
            config.products_collection.clone(),
        )
    }
}

#[async_trait]
impl LinkLookup for FirestoreLookups {
    async fn find_by_short_code(&self, short_code: &str) -> Result<Option<LinkRecord>, PortError> {
        let Some((id, fields)) = self
            .client
            .find_first_by_field(&self.links_collection, SHORT_CODE_FIELD, short_code)
            .await?
        else {
            return Ok(None);
        };
        let link = Link::from_fields(&fields).map_err(|e| PortError::Decode {
            collection: self.links_collection.clone(),
            id: id.clone(),
            reason: e.to_string(),
        })?;
        Ok(Some(LinkRecord { id, link }))
    }
}

#[async_trait]
impl ProductLookup for FirestoreLookups {
    async fn find_product(&self, product_id: &str) -> Result<Option<ProductRecord>, PortError> {
        let Some((id, fields)) = self
            .client
            .get_document(&self.products_collection, product_id)
            .await?
        else {
            return Ok(None);
        };
        let product = Product::from_fields(&fields).map_err(|e| PortError::Decode {
            collection: self.products_collection.clone(),
            id: id.clone(),
            reason: e.to_string(),
        })?;
        Ok(Some(ProductRecord { id, product }))
    }
}

/// Upserts into the Postgres `link_clicks` table.
#[derive(Clone)]
pub struct PgClickSink {
    pool: PgPool,
}

impl PgClickSink {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ClickSink for PgClickSink {
    async fn upsert(&self, record: &EnrichedClickRecord) -> Result<(), PortError> {
        linkpulse_db::upsert_link_click(&self.pool, record).await?;
        Ok(())
    }
}
