pub mod app_config;
pub mod clicks;
pub mod coalesce;
pub mod config;
pub mod export;
pub mod lenient;
pub mod record;

use thiserror::Error;

pub use app_config::{AppConfig, Environment};
pub use clicks::{ClickEvent, Link, LinkCreated, Product, SourceType};
pub use coalesce::{coalesce_geo, CoalescedGeo, GeoField};
pub use config::{load_app_config, load_app_config_from_env};
pub use export::{
    ExportError, ExportFormat, ExportRequest, ExportType, RawExportRequest, MAX_EXPORT_RANGE_DAYS,
};
pub use record::{EnrichedClickRecord, DEFAULT_NAME, DEFAULT_PAGE_TYPE};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },
}
