//! Date-ranged click exports as JSON or CSV.

use axum::{
    extract::{Query, State},
    http::{header, HeaderValue},
    response::{IntoResponse, Response},
    Extension, Json,
};
use csv::WriterBuilder;
use linkpulse_core::{ExportFormat, ExportRequest, RawExportRequest};
use linkpulse_db::{ExportFilter, LinkClickRow};
use rust_decimal::Decimal;
use serde::Serialize;

use crate::middleware::RequestId;

use super::{map_db_error, ApiError, ApiResponse, AppState, ResponseMeta};

#[derive(Debug, Serialize)]
pub(super) struct ExportData {
    export: ExportRequest,
    row_count: usize,
    rows: Vec<LinkClickRow>,
}

/// Flat CSV projection of a click row. JSON columns are written as JSON text.
#[derive(Debug, Serialize)]
pub(super) struct CsvClickRow {
    firestore_id: String,
    clicked_at: Option<String>,
    short_id: Option<String>,
    source_type: String,
    qr_identifier: Option<String>,
    name: String,
    page_type: String,
    device_type: Option<String>,
    referrer: Option<String>,
    city_name: Option<String>,
    country_name: Option<String>,
    postal_code: Option<String>,
    region: Option<String>,
    region_code: Option<String>,
    campaign_id: Option<String>,
    influencer_id: Option<String>,
    project_id: Option<String>,
    link_id: Option<String>,
    long_link: Option<String>,
    short_link: Option<String>,
    link_value: Option<Decimal>,
    site_retailer: Option<String>,
    link_tags: Option<String>,
    utm_parameters: Option<String>,
    product_id: Option<String>,
    product_name: Option<String>,
    product_price: Option<Decimal>,
    product_brand: Option<String>,
    product_category: Option<String>,
    product_upc: Option<String>,
}

impl From<&LinkClickRow> for CsvClickRow {
    fn from(row: &LinkClickRow) -> Self {
        Self {
            firestore_id: row.firestore_id.clone(),
            clicked_at: row.clicked_at.map(|t| t.to_rfc3339()),
            short_id: row.short_id.clone(),
            source_type: row.source_type.clone(),
            qr_identifier: row.qr_identifier.clone(),
            name: row.name.clone(),
            page_type: row.page_type.clone(),
            device_type: row.device_type.clone(),
            referrer: row.referrer.clone(),
            city_name: row.city_name.clone(),
            country_name: row.country_name.clone(),
            postal_code: row.postal_code.clone(),
            region: row.region.clone(),
            region_code: row.region_code.clone(),
            campaign_id: row.campaign_id.clone(),
            influencer_id: row.influencer_id.clone(),
            project_id: row.project_id.clone(),
            link_id: row.link_id.clone(),
            long_link: row.long_link.clone(),
            short_link: row.short_link.clone(),
            link_value: row.link_value,
            site_retailer: row.site_retailer.clone(),
            link_tags: row.link_tags.as_ref().map(ToString::to_string),
            utm_parameters: row.utm_parameters.as_ref().map(ToString::to_string),
            product_id: row.product_id.clone(),
            product_name: row.product_name.clone(),
            product_price: row.product_price,
            product_brand: row.product_brand.clone(),
            product_category: row.product_category.clone(),
            product_upc: row.product_upc.clone(),
        }
    }
}

pub(super) fn render_csv(rows: &[LinkClickRow]) -> Result<Vec<u8>, csv::Error> {
    let mut writer = WriterBuilder::new().has_headers(true).from_writer(Vec::new());
    for row in rows {
        writer.serialize(CsvClickRow::from(row))?;
    }
    writer
        .into_inner()
        .map_err(|e| csv::Error::from(e.into_error()))
}

fn attachment(filename: &str) -> HeaderValue {
    HeaderValue::from_str(&format!("attachment; filename=\"{filename}\""))
        .unwrap_or_else(|_| HeaderValue::from_static("attachment"))
}

pub(super) async fn export_clicks(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(raw): Query<RawExportRequest>,
) -> Result<Response, ApiError> {
    let request = raw
        .validate()
        .map_err(|e| ApiError::new(req_id.0.clone(), "validation_error", e.to_string()))?;

    let (from, until) = request.window();
    let rows = linkpulse_db::list_link_clicks_for_export(
        &state.pool,
        &ExportFilter {
            project_id: &request.project_id,
            from,
            until,
            source_type: request.export_type.source_filter(),
        },
    )
    .await
    .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    tracing::info!(
        project_id = %request.project_id,
        export_type = request.export_type.as_str(),
        format = %request.format,
        rows = rows.len(),
        "click export generated"
    );

    let disposition = attachment(&request.filename());
    match request.format {
        ExportFormat::Json => {
            let body = ApiResponse {
                data: ExportData {
                    row_count: rows.len(),
                    rows,
                    export: request,
                },
                meta: ResponseMeta::new(req_id.0),
            };
            Ok(([(header::CONTENT_DISPOSITION, disposition)], Json(body)).into_response())
        }
        ExportFormat::Csv => {
            let bytes = render_csv(&rows).map_err(|e| {
                tracing::error!(error = %e, "failed to render CSV export");
                ApiError::new(req_id.0.clone(), "internal_error", "failed to render export")
            })?;
            Ok((
                [
                    (
                        header::CONTENT_TYPE,
                        HeaderValue::from_static(ExportFormat::Csv.content_type()),
                    ),
                    (header::CONTENT_DISPOSITION, disposition),
                ],
                bytes,
            )
                .into_response())
        }
    }
}
