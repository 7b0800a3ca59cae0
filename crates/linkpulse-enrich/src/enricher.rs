//! The enrichment orchestrator.
//!
//! For one click: look up its link by short code, then the link's product
//! if it has one, merge everything into a flat record, and upsert it keyed
//! by the click's document id. Every failure on the way is logged, counted,
//! and returned as an [`EnrichmentWarning`]; nothing is propagated, so the
//! trigger host never sees an error and never re-delivers because of one.

use std::sync::Arc;

use linkpulse_core::{ClickEvent, EnrichedClickRecord};
use linkpulse_firestore::DocumentChange;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::merge::build_record;
use crate::ports::{ClickSink, LinkLookup, LinkRecord, ProductLookup, ProductRecord};
use crate::stats::EnrichmentStats;
use crate::warning::EnrichmentWarning;

/// Result of enriching one click.
#[derive(Debug, Clone, Serialize)]
pub struct EnrichmentOutcome {
    pub record: EnrichedClickRecord,
    pub warnings: Vec<EnrichmentWarning>,
    /// Whether the sink accepted the record.
    pub written: bool,
}

/// Result of handling one document-write event.
#[derive(Debug, Clone)]
pub enum ProcessOutcome {
    /// The click was deleted upstream; nothing was written.
    SkippedDeletion { document_id: String },
    Enriched(EnrichmentOutcome),
}

pub struct Enricher {
    links: Arc<dyn LinkLookup>,
    products: Arc<dyn ProductLookup>,
    sink: Arc<dyn ClickSink>,
    stats: Arc<EnrichmentStats>,
}

impl Enricher {
    #[must_use]
    pub fn new(
        links: Arc<dyn LinkLookup>,
        products: Arc<dyn ProductLookup>,
        sink: Arc<dyn ClickSink>,
    ) -> Self {
        Self {
            links,
            products,
            sink,
            stats: Arc::new(EnrichmentStats::new()),
        }
    }

    /// Shares counters with another owner, e.g. the HTTP stats endpoint.
    #[must_use]
    pub fn with_stats(mut self, stats: Arc<EnrichmentStats>) -> Self {
        self.stats = stats;
        self
    }

    #[must_use]
    pub fn stats(&self) -> &Arc<EnrichmentStats> {
        &self.stats
    }

    /// Handles one write event. Deletions are skipped without touching the
    /// sink; creates and updates are enriched from the after-state.
    pub async fn process_change(&self, change: DocumentChange) -> ProcessOutcome {
        match change {
            DocumentChange::Deleted { document_id } => {
                self.stats.event_received();
                self.stats.deletion_skipped();
                tracing::info!(firestore_id = %document_id, "click deleted upstream; skipping");
                ProcessOutcome::SkippedDeletion { document_id }
            }
            DocumentChange::Written {
                document_id,
                fields,
            } => ProcessOutcome::Enriched(self.enrich(&document_id, &fields).await),
        }
    }

    /// Decodes a click document's fields, enriches it, and writes the record.
    pub async fn enrich(&self, firestore_id: &str, fields: &Map<String, Value>) -> EnrichmentOutcome {
        let mut outcome = self.preview(firestore_id, fields).await;
        self.write(&mut outcome).await;
        outcome
    }

    /// Enriches and writes an already decoded click.
    pub async fn enrich_click(&self, firestore_id: &str, click: &ClickEvent) -> EnrichmentOutcome {
        let (record, warnings) = self.resolve(firestore_id, click).await;
        let mut outcome = EnrichmentOutcome {
            record,
            warnings,
            written: false,
        };
        self.write(&mut outcome).await;
        outcome
    }

    /// Runs the lookups and builds the record without writing it.
    pub async fn preview(&self, firestore_id: &str, fields: &Map<String, Value>) -> EnrichmentOutcome {
        let (click, mut warnings) = decode_click(firestore_id, fields);
        let (record, resolve_warnings) = self.resolve(firestore_id, &click).await;
        warnings.extend(resolve_warnings);
        EnrichmentOutcome {
            record,
            warnings,
            written: false,
        }
    }

    async fn resolve(
        &self,
        firestore_id: &str,
        click: &ClickEvent,
    ) -> (EnrichedClickRecord, Vec<EnrichmentWarning>) {
        let mut warnings = Vec::new();

        let Some(short_id) = click.short_id.as_deref() else {
            tracing::warn!(firestore_id, "click has no shortId; writing click-only record");
            warnings.push(EnrichmentWarning::MissingShortId);
            return (build_record(firestore_id, click, None, None), warnings);
        };

        let link = self.find_link(firestore_id, short_id, &mut warnings).await;
        let product = match link.as_ref().and_then(|l| l.link.product_id.as_deref()) {
            Some(product_id) => self.find_product(firestore_id, product_id, &mut warnings).await,
            None => None,
        };

        let record = build_record(firestore_id, click, link.as_ref(), product.as_ref());
        (record, warnings)
    }

    async fn find_link(
        &self,
        firestore_id: &str,
        short_id: &str,
        warnings: &mut Vec<EnrichmentWarning>,
    ) -> Option<LinkRecord> {
        match self.links.find_by_short_code(short_id).await {
            Ok(Some(link)) => Some(link),
            Ok(None) => {
                tracing::warn!(firestore_id, short_id, "no link for shortId; enriching click-only");
                warnings.push(EnrichmentWarning::LinkNotFound {
                    short_id: short_id.to_owned(),
                });
                None
            }
            Err(e) => {
                tracing::warn!(firestore_id, short_id, error = %e, "link lookup failed; enriching click-only");
                warnings.push(EnrichmentWarning::LinkLookupFailed {
                    short_id: short_id.to_owned(),
                    error: e.to_string(),
                });
                None
            }
        }
    }

    async fn find_product(
        &self,
        firestore_id: &str,
        product_id: &str,
        warnings: &mut Vec<EnrichmentWarning>,
    ) -> Option<ProductRecord> {
        match self.products.find_product(product_id).await {
            Ok(Some(product)) => Some(product),
            Ok(None) => {
                tracing::warn!(firestore_id, product_id, "product not found; using link value as price");
                warnings.push(EnrichmentWarning::ProductNotFound {
                    product_id: product_id.to_owned(),
                });
                None
            }
            Err(e) => {
                tracing::warn!(firestore_id, product_id, error = %e, "product lookup failed; using link value as price");
                warnings.push(EnrichmentWarning::ProductLookupFailed {
                    product_id: product_id.to_owned(),
                    error: e.to_string(),
                });
                None
            }
        }
    }

    async fn write(&self, outcome: &mut EnrichmentOutcome) {
        let firestore_id = outcome.record.firestore_id.as_str();
        self.stats.event_received();

        match self.sink.upsert(&outcome.record).await {
            Ok(()) => {
                outcome.written = true;
                self.stats.record_written();
                tracing::info!(
                    firestore_id,
                    short_id = outcome.record.short_id.as_deref().unwrap_or(""),
                    warnings = outcome.warnings.len(),
                    "enriched click written"
                );
            }
            Err(e) => {
                tracing::error!(firestore_id, error = %e, "failed to write enriched click");
                outcome.warnings.push(EnrichmentWarning::SinkWriteFailed {
                    error: e.to_string(),
                });
            }
        }

        for warning in &outcome.warnings {
            self.stats.observe(warning);
        }
    }
}

fn decode_click(
    firestore_id: &str,
    fields: &Map<String, Value>,
) -> (ClickEvent, Vec<EnrichmentWarning>) {
    let (click, dropped) = ClickEvent::from_fields_lossy(fields);
    if dropped.is_empty() {
        return (click, Vec::new());
    }

    let reason = format!("undecodable fields dropped: {}", dropped.join(", "));
    tracing::warn!(firestore_id, %reason, "click document partly unreadable; enriching the rest");
    (click, vec![EnrichmentWarning::MalformedEvent { reason }])
}
