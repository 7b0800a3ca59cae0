use axum::{
    extract::{Path, State},
    Extension, Json,
};
use linkpulse_db::LinkClickRow;

use crate::middleware::RequestId;

use super::{map_db_error, ApiError, ApiResponse, AppState, ResponseMeta};

pub(super) async fn get_click(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(firestore_id): Path<String>,
) -> Result<Json<ApiResponse<LinkClickRow>>, ApiError> {
    let row = linkpulse_db::get_link_click(&state.pool, &firestore_id)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse {
        data: row,
        meta: ResponseMeta::new(req_id.0),
    }))
}
