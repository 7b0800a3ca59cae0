use axum::{extract::State, Extension, Json};
use linkpulse_enrich::EnrichmentStatsSnapshot;

use crate::middleware::RequestId;

use super::{ApiResponse, AppState, ResponseMeta};

pub(super) async fn get_stats(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Json<ApiResponse<EnrichmentStatsSnapshot>> {
    Json(ApiResponse {
        data: state.stats.snapshot(),
        meta: ResponseMeta::new(req_id.0),
    })
}
