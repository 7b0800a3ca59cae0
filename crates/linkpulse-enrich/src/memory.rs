//! In-process stores for tests and offline replays.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use linkpulse_core::{EnrichedClickRecord, Link, Product};

use crate::error::PortError;
use crate::ports::{ClickSink, LinkLookup, LinkRecord, ProductLookup, ProductRecord};

/// Links keyed by document id; looked up by `urlShortCode`.
#[derive(Debug, Default)]
pub struct MemoryLinks {
    links: Vec<LinkRecord>,
    failing: AtomicBool,
    calls: AtomicUsize,
}

impl MemoryLinks {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_link(mut self, id: &str, link: Link) -> Self {
        self.links.push(LinkRecord {
            id: id.to_owned(),
            link,
        });
        self
    }

    /// Makes every subsequent lookup fail.
    pub fn fail(&self) {
        self.failing.store(true, Ordering::SeqCst);
    }

    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LinkLookup for MemoryLinks {
    async fn find_by_short_code(&self, short_code: &str) -> Result<Option<LinkRecord>, PortError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            return Err(PortError::Unavailable("links store offline".to_owned()));
        }
        Ok(self
            .links
            .iter()
            .find(|r| r.link.url_short_code.as_deref() == Some(short_code))
            .cloned())
    }
}

#[derive(Debug, Default)]
pub struct MemoryProducts {
    products: HashMap<String, Product>,
    failing: AtomicBool,
    calls: AtomicUsize,
}

impl MemoryProducts {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_product(mut self, id: &str, product: Product) -> Self {
        self.products.insert(id.to_owned(), product);
        self
    }

    pub fn fail(&self) {
        self.failing.store(true, Ordering::SeqCst);
    }

    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ProductLookup for MemoryProducts {
    async fn find_product(&self, product_id: &str) -> Result<Option<ProductRecord>, PortError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            return Err(PortError::Unavailable("products store offline".to_owned()));
        }
        Ok(self.products.get(product_id).map(|product| ProductRecord {
            id: product_id.to_owned(),
            product: product.clone(),
        }))
    }
}

/// Upsert sink backed by a map keyed on `firestore_id`.
#[derive(Debug, Default)]
pub struct MemorySink {
    rows: Mutex<HashMap<String, EnrichedClickRecord>>,
    writes: AtomicUsize,
    failing: AtomicBool,
}

impl MemorySink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail(&self) {
        self.failing.store(true, Ordering::SeqCst);
    }

    /// Number of successful upserts, including overwrites.
    #[must_use]
    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[must_use]
    pub fn get(&self, firestore_id: &str) -> Option<EnrichedClickRecord> {
        self.rows
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(firestore_id)
            .cloned()
    }
}

#[async_trait]
impl ClickSink for MemorySink {
    async fn upsert(&self, record: &EnrichedClickRecord) -> Result<(), PortError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(PortError::Unavailable("sink offline".to_owned()));
        }
        self.rows
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(record.firestore_id.clone(), record.clone());
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
