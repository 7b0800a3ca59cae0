//! Read-only click row inspection.

use clap::Subcommand;
use sqlx::PgPool;

/// Sub-commands available under `clicks`.
#[derive(Debug, Subcommand)]
pub enum ClicksCommands {
    /// Print the stored row for one click document as JSON
    Show {
        /// Firestore document id of the click
        firestore_id: String,
    },
}

/// Prints the `link_clicks` row keyed by `firestore_id`.
///
/// # Errors
///
/// Returns an error if no row exists or the query fails.
pub(crate) async fn run_show(pool: &PgPool, firestore_id: &str) -> anyhow::Result<()> {
    let row = match linkpulse_db::get_link_click(pool, firestore_id).await {
        Ok(row) => row,
        Err(linkpulse_db::DbError::NotFound) => {
            anyhow::bail!("click '{firestore_id}' not found")
        }
        Err(e) => return Err(e.into()),
    };
    println!("{}", serde_json::to_string_pretty(&row)?);
    Ok(())
}
