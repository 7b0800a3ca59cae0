//! Offline replay of captured Firestore write events.
//!
//! A replay file holds either one trigger payload or a JSON array of them.
//! Each event goes through the same [`Enricher`] the trigger uses, so a
//! replay of already-processed clicks rewrites the same rows.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::Subcommand;
use futures::stream::{self, StreamExt};
use linkpulse_core::AppConfig;
use linkpulse_enrich::{Enricher, EnrichmentOutcome, FirestoreLookups, PgClickSink, ProcessOutcome};
use linkpulse_firestore::{DocumentChange, DocumentWriteEvent, FirestoreClient};
use serde_json::Value;
use sqlx::PgPool;

/// Sub-commands available under `enrich`.
#[derive(Debug, Subcommand)]
pub enum EnrichCommands {
    /// Re-run enrichment for captured trigger payloads
    Replay {
        /// JSON file with one write event or an array of them
        #[arg(long)]
        file: PathBuf,

        /// Print the records that would be written without touching the sink
        #[arg(long)]
        dry_run: bool,

        /// Maximum events enriched at once
        #[arg(long, default_value = "8")]
        concurrency: usize,
    },
}

#[derive(Debug, Default, PartialEq, Eq)]
pub(crate) struct ReplaySummary {
    pub events: usize,
    pub written: usize,
    pub deletions: usize,
    pub rejected: usize,
    pub with_warnings: usize,
}

impl ReplaySummary {
    fn observe(&mut self, outcome: &EnrichmentOutcome) {
        if outcome.written {
            self.written += 1;
        }
        if !outcome.warnings.is_empty() {
            self.with_warnings += 1;
        }
    }
}

/// Splits replay file contents into write events.
///
/// # Errors
///
/// Returns an error if the contents are not JSON, or if any element is not
/// shaped like a write event.
pub(crate) fn parse_events(contents: &str) -> anyhow::Result<Vec<DocumentWriteEvent>> {
    let value: Value = serde_json::from_str(contents).context("replay file is not valid JSON")?;
    let items = match value {
        Value::Array(items) => items,
        other => vec![other],
    };
    items
        .into_iter()
        .enumerate()
        .map(|(i, item)| {
            serde_json::from_value(item).with_context(|| format!("event {i} is not a write event"))
        })
        .collect()
}

fn read_events(path: &Path) -> anyhow::Result<Vec<DocumentWriteEvent>> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    parse_events(&contents)
}

/// Replays every event in `file` through the enricher.
///
/// Events that do not resolve to a document are counted and skipped.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed, or the Firestore
/// client cannot be built.
pub(crate) async fn run_replay(
    pool: &PgPool,
    config: &AppConfig,
    file: &Path,
    dry_run: bool,
    concurrency: usize,
) -> anyhow::Result<()> {
    let events = read_events(file)?;
    let client = FirestoreClient::from_config(config)?;
    let lookups = Arc::new(FirestoreLookups::from_config(client, config));
    let enricher = Enricher::new(
        lookups.clone(),
        lookups,
        Arc::new(PgClickSink::new(pool.clone())),
    );

    let summary = replay(&enricher, events, dry_run, concurrency).await?;

    if dry_run {
        println!(
            "dry-run: {} event(s), {} deletion(s) skipped, {} rejected, {} with warnings",
            summary.events, summary.deletions, summary.rejected, summary.with_warnings
        );
    } else {
        println!(
            "replayed {} event(s): {} written, {} deletion(s) skipped, {} rejected, {} with warnings",
            summary.events, summary.written, summary.deletions, summary.rejected, summary.with_warnings
        );
    }
    Ok(())
}

/// What replaying one event amounted to.
enum ReplayStep {
    Rejected,
    Deleted,
    Enriched(EnrichmentOutcome),
}

async fn replay_one(enricher: &Enricher, event: DocumentWriteEvent, dry_run: bool) -> ReplayStep {
    let change = match event.into_change() {
        Ok(change) => change,
        Err(e) => {
            tracing::warn!(error = %e, "skipping replay event");
            return ReplayStep::Rejected;
        }
    };

    if dry_run {
        return match change {
            DocumentChange::Written {
                document_id,
                fields,
            } => ReplayStep::Enriched(enricher.preview(&document_id, &fields).await),
            DocumentChange::Deleted { .. } => ReplayStep::Deleted,
        };
    }

    match enricher.process_change(change).await {
        ProcessOutcome::SkippedDeletion { .. } => ReplayStep::Deleted,
        ProcessOutcome::Enriched(outcome) => {
            if !outcome.written {
                tracing::warn!(
                    firestore_id = %outcome.record.firestore_id,
                    "replayed click was not written"
                );
            }
            ReplayStep::Enriched(outcome)
        }
    }
}

/// Replays `events` with at most `concurrency` in flight.
///
/// Each event targets its own row, so completion order does not matter.
///
/// # Errors
///
/// Returns an error if a dry-run outcome cannot be serialized.
pub(crate) async fn replay(
    enricher: &Enricher,
    events: Vec<DocumentWriteEvent>,
    dry_run: bool,
    concurrency: usize,
) -> anyhow::Result<ReplaySummary> {
    let steps: Vec<ReplayStep> = stream::iter(events)
        .map(|event| replay_one(enricher, event, dry_run))
        .buffer_unordered(concurrency.max(1))
        .collect()
        .await;

    let mut summary = ReplaySummary {
        events: steps.len(),
        ..ReplaySummary::default()
    };
    for step in &steps {
        match step {
            ReplayStep::Rejected => summary.rejected += 1,
            ReplayStep::Deleted => summary.deletions += 1,
            ReplayStep::Enriched(outcome) => {
                if dry_run {
                    println!("{}", serde_json::to_string(outcome)?);
                }
                summary.observe(outcome);
            }
        }
    }

    Ok(summary)
}
