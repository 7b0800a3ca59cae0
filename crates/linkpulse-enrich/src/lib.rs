//! Click enrichment: resolve a click's link and product, flatten the three
//! documents into one [`EnrichedClickRecord`], and upsert it into the sink.
//!
//! Store access goes through the [`LinkLookup`], [`ProductLookup`], and
//! [`ClickSink`] traits so the orchestrator can run against Firestore and
//! Postgres in production and against [`memory`] stores in tests.

pub mod adapters;
pub mod enricher;
pub mod error;
pub mod memory;
pub mod merge;
pub mod ports;
pub mod stats;
pub mod warning;

pub use adapters::{FirestoreLookups, PgClickSink};
pub use enricher::{Enricher, EnrichmentOutcome, ProcessOutcome};
pub use error::PortError;
pub use linkpulse_core::EnrichedClickRecord;
pub use merge::{build_record, effective_price};
pub use ports::{ClickSink, LinkLookup, LinkRecord, ProductLookup, ProductRecord};
pub use stats::{EnrichmentStats, EnrichmentStatsSnapshot};
pub use warning::EnrichmentWarning;
