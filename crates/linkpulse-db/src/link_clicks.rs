//! Database operations for `link_clicks`, the enriched click sink.

use chrono::{DateTime, Utc};
use linkpulse_core::{EnrichedClickRecord, SourceType};
use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::Value;
use sqlx::PgPool;

use crate::DbError;

const COLUMNS: &str = "id, firestore_id, short_id, clicked_at, device_type, ip_address, \
     referrer, user_agent, city_name, country_name, postal_code, region, region_code, \
     source_type, qr_identifier, campaign_id, influencer_id, project_id, project_details, \
     link_id, name, page_type, long_link, short_link, link_value, site_retailer, link_tags, \
     utm_parameters, link_active, link_created_at, link_created_by, product_id, product_name, \
     product_price, product_brand, product_category, product_upc, geoip_raw, created_at, \
     updated_at";

/// A row from the `link_clicks` table.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct LinkClickRow {
    pub id: i64,
    pub firestore_id: String,
    pub short_id: Option<String>,
    pub clicked_at: Option<DateTime<Utc>>,
    pub device_type: Option<String>,
    pub ip_address: Option<String>,
    pub referrer: Option<String>,
    pub user_agent: Option<String>,
    pub city_name: Option<String>,
    pub country_name: Option<String>,
    pub postal_code: Option<String>,
    pub region: Option<String>,
    pub region_code: Option<String>,
    /// `"link"` or `"qr"`; enforced by a CHECK constraint.
    pub source_type: String,
    pub qr_identifier: Option<String>,
    pub campaign_id: Option<String>,
    pub influencer_id: Option<String>,
    pub project_id: Option<String>,
    pub project_details: Option<Value>,
    pub link_id: Option<String>,
    pub name: String,
    pub page_type: String,
    pub long_link: Option<String>,
    pub short_link: Option<String>,
    pub link_value: Option<Decimal>,
    pub site_retailer: Option<String>,
    pub link_tags: Option<Value>,
    pub utm_parameters: Option<Value>,
    pub link_active: Option<bool>,
    pub link_created_at: Option<DateTime<Utc>>,
    pub link_created_by: Option<String>,
    pub product_id: Option<String>,
    pub product_name: Option<String>,
    pub product_price: Option<Decimal>,
    pub product_brand: Option<String>,
    pub product_category: Option<String>,
    pub product_upc: Option<String>,
    pub geoip_raw: Option<Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl LinkClickRow {
    /// Rebuilds the domain record this row was written from.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::InvalidValue`] if `source_type` holds a value the
    /// domain does not know.
    pub fn into_record(self) -> Result<EnrichedClickRecord, DbError> {
        let source_type: SourceType =
            self.source_type
                .parse()
                .map_err(|reason| DbError::InvalidValue {
                    column: "source_type",
                    reason,
                })?;

        Ok(EnrichedClickRecord {
            firestore_id: self.firestore_id,
            short_id: self.short_id,
            clicked_at: self.clicked_at,
            device_type: self.device_type,
            ip_address: self.ip_address,
            referrer: self.referrer,
            user_agent: self.user_agent,
            city_name: self.city_name,
            country_name: self.country_name,
            postal_code: self.postal_code,
            region: self.region,
            region_code: self.region_code,
            source_type,
            qr_identifier: self.qr_identifier,
            campaign_id: self.campaign_id,
            influencer_id: self.influencer_id,
            project_id: self.project_id,
            project_details: self.project_details,
            link_id: self.link_id,
            name: self.name,
            page_type: self.page_type,
            long_link: self.long_link,
            short_link: self.short_link,
            link_value: self.link_value,
            site_retailer: self.site_retailer,
            link_tags: self.link_tags,
            utm_parameters: self.utm_parameters,
            link_active: self.link_active,
            link_created_at: self.link_created_at,
            link_created_by: self.link_created_by,
            product_id: self.product_id,
            product_name: self.product_name,
            product_price: self.product_price,
            product_brand: self.product_brand,
            product_category: self.product_category,
            product_upc: self.product_upc,
            geoip_raw: self.geoip_raw,
        })
    }
}

/// Rows selected by a click export.
#[derive(Debug, Clone)]
pub struct ExportFilter<'a> {
    pub project_id: &'a str,
    /// Inclusive lower bound on `clicked_at`.
    pub from: DateTime<Utc>,
    /// Exclusive upper bound on `clicked_at`.
    pub until: DateTime<Utc>,
    /// `None` selects every source type.
    pub source_type: Option<SourceType>,
}

/// Upserts one enriched click keyed by `firestore_id`.
///
/// On conflict every column is overwritten with the incoming value (last
/// write wins) and `updated_at` is bumped. Returns the internal row `id`,
/// which is stable across re-deliveries of the same click.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the upsert fails.
pub async fn upsert_link_click(
    pool: &PgPool,
    record: &EnrichedClickRecord,
) -> Result<i64, DbError> {
    let id = sqlx::query_scalar::<_, i64>(
        "INSERT INTO link_clicks \
             (firestore_id, short_id, clicked_at, device_type, ip_address, referrer, \
              user_agent, city_name, country_name, postal_code, region, region_code, \
              source_type, qr_identifier, campaign_id, influencer_id, project_id, \
              project_details, link_id, name, page_type, long_link, short_link, link_value, \
              site_retailer, link_tags, utm_parameters, link_active, link_created_at, \
              link_created_by, product_id, product_name, product_price, product_brand, \
              product_category, product_upc, geoip_raw) \
         VALUES ($1, $2, $3, $4, $5, $6, \
                 $7, $8, $9, $10, $11, $12, \
                 $13, $14, $15, $16, $17, \
                 $18, $19, $20, $21, $22, $23, $24, \
                 $25, $26, $27, $28, $29, \
                 $30, $31, $32, $33, $34, \
                 $35, $36, $37) \
         ON CONFLICT (firestore_id) DO UPDATE SET \
             short_id         = EXCLUDED.short_id, \
             clicked_at       = EXCLUDED.clicked_at, \
             device_type      = EXCLUDED.device_type, \
             ip_address       = EXCLUDED.ip_address, \
             referrer         = EXCLUDED.referrer, \
             user_agent       = EXCLUDED.user_agent, \
             city_name        = EXCLUDED.city_name, \
             country_name     = EXCLUDED.country_name, \
             postal_code      = EXCLUDED.postal_code, \
             region           = EXCLUDED.region, \
             region_code      = EXCLUDED.region_code, \
             source_type      = EXCLUDED.source_type, \
             qr_identifier    = EXCLUDED.qr_identifier, \
             campaign_id      = EXCLUDED.campaign_id, \
             influencer_id    = EXCLUDED.influencer_id, \
             project_id       = EXCLUDED.project_id, \
             project_details  = EXCLUDED.project_details, \
             link_id          = EXCLUDED.link_id, \
             name             = EXCLUDED.name, \
             page_type        = EXCLUDED.page_type, \
             long_link        = EXCLUDED.long_link, \
             short_link       = EXCLUDED.short_link, \
             link_value       = EXCLUDED.link_value, \
             site_retailer    = EXCLUDED.site_retailer, \
             link_tags        = EXCLUDED.link_tags, \
             utm_parameters   = EXCLUDED.utm_parameters, \
             link_active      = EXCLUDED.link_active, \
             link_created_at  = EXCLUDED.link_created_at, \
             link_created_by  = EXCLUDED.link_created_by, \
             product_id       = EXCLUDED.product_id, \
             product_name     = EXCLUDED.product_name, \
             product_price    = EXCLUDED.product_price, \
             product_brand    = EXCLUDED.product_brand, \
             product_category = EXCLUDED.product_category, \
             product_upc      = EXCLUDED.product_upc, \
             geoip_raw        = EXCLUDED.geoip_raw, \
             updated_at       = NOW() \
         RETURNING id",
    )
    .bind(&record.firestore_id)
    .bind(&record.short_id)
    .bind(record.clicked_at)
    .bind(&record.device_type)
    .bind(&record.ip_address)
    .bind(&record.referrer)
    .bind(&record.user_agent)
    .bind(&record.city_name)
    .bind(&record.country_name)
    .bind(&record.postal_code)
    .bind(&record.region)
    .bind(&record.region_code)
    .bind(record.source_type.as_str())
    .bind(&record.qr_identifier)
    .bind(&record.campaign_id)
    .bind(&record.influencer_id)
    .bind(&record.project_id)
    .bind(&record.project_details)
    .bind(&record.link_id)
    .bind(&record.name)
    .bind(&record.page_type)
    .bind(&record.long_link)
    .bind(&record.short_link)
    .bind(record.link_value)
    .bind(&record.site_retailer)
    .bind(&record.link_tags)
    .bind(&record.utm_parameters)
    .bind(record.link_active)
    .bind(record.link_created_at)
    .bind(&record.link_created_by)
    .bind(&record.product_id)
    .bind(&record.product_name)
    .bind(record.product_price)
    .bind(&record.product_brand)
    .bind(&record.product_category)
    .bind(&record.product_upc)
    .bind(&record.geoip_raw)
    .fetch_one(pool)
    .await?;

    Ok(id)
}

/// Fetches one enriched click by its Firestore document id.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no row matches, or [`DbError::Sqlx`] on
/// query failure.
pub async fn get_link_click(pool: &PgPool, firestore_id: &str) -> Result<LinkClickRow, DbError> {
    let sql = format!("SELECT {COLUMNS} FROM link_clicks WHERE firestore_id = $1");
    sqlx::query_as::<_, LinkClickRow>(&sql)
        .bind(firestore_id)
        .fetch_optional(pool)
        .await?
        .ok_or(DbError::NotFound)
}

/// Counts rows for one Firestore document id. Always 0 or 1 while the
/// unique constraint holds.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] on query failure.
pub async fn count_link_clicks(pool: &PgPool, firestore_id: &str) -> Result<i64, DbError> {
    let count = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM link_clicks WHERE firestore_id = $1",
    )
    .bind(firestore_id)
    .fetch_one(pool)
    .await?;
    Ok(count)
}

/// Lists a project's clicks inside `[from, until)`, oldest first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] on query failure.
pub async fn list_link_clicks_for_export(
    pool: &PgPool,
    filter: &ExportFilter<'_>,
) -> Result<Vec<LinkClickRow>, DbError> {
    let sql = format!(
        "SELECT {COLUMNS} FROM link_clicks \
         WHERE project_id = $1 \
           AND clicked_at >= $2 \
           AND clicked_at < $3 \
           AND ($4::text IS NULL OR source_type = $4) \
         ORDER BY clicked_at, id"
    );
    let rows = sqlx::query_as::<_, LinkClickRow>(&sql)
        .bind(filter.project_id)
        .bind(filter.from)
        .bind(filter.until)
        .bind(filter.source_type.map(SourceType::as_str))
        .fetch_all(pool)
        .await?;
    Ok(rows)
}
