//! Retry with exponential back-off and jitter for Firestore reads.
//!
//! Lookups sit on the enrichment hot path, so retries stay few: a couple
//! of retries on transient failures, then the caller degrades to partial
//! enrichment.

use std::future::Future;
use std::time::Duration;

use crate::error::FirestoreError;

const MAX_DELAY_MS: u64 = 5_000;

/// Returns `true` for errors that are worth retrying after a back-off delay.
///
/// Timeouts, connection failures, 5xx, and 429 are transient. Decoding
/// failures and other statuses are not.
pub(crate) fn is_retriable(err: &FirestoreError) -> bool {
    match err {
        FirestoreError::Http(e) => {
            e.is_timeout() || e.is_connect() || e.status().is_some_and(|s| s.is_server_error())
        }
        FirestoreError::UnexpectedStatus { status, .. } => *status == 429 || *status >= 500,
        FirestoreError::Deserialize { .. }
        | FirestoreError::InvalidDocument(_)
        | FirestoreError::InvalidBaseUrl { .. } => false,
    }
}

/// Runs `operation` with up to `max_retries` additional attempts on
/// transient errors. The n-th retry waits `backoff_base_ms × 2ⁿ⁻¹ ± 25 %`,
/// capped at 5 s.
pub(crate) async fn retry_with_backoff<T, F, Fut>(
    max_retries: u32,
    backoff_base_ms: u64,
    mut operation: F,
) -> Result<T, FirestoreError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, FirestoreError>>,
{
    let mut attempt = 0u32;
    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                if !is_retriable(&err) || attempt >= max_retries {
                    return Err(err);
                }
                attempt += 1;
                let computed = backoff_base_ms.saturating_mul(1u64 << (attempt - 1).min(10));
                let capped = computed.min(MAX_DELAY_MS);
                #[allow(
                    clippy::cast_possible_truncation,
                    clippy::cast_sign_loss,
                    clippy::cast_precision_loss
                )]
                let delay_ms = (capped as f64 * (rand::random::<f64>() * 0.5 + 0.75)) as u64;
                tracing::warn!(
                    attempt,
                    max_retries,
                    delay_ms,
                    error = %err,
                    "Firestore transient error, retrying after back-off"
                );
                tokio::time::sleep(Duration::from_millis(delay_ms)).await;
            }
        }
    }
}
