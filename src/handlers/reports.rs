use axum::{extract::State, response::Json};

use crate::{errors::ServiceError, services::reports::StockReport, ApiResponse, AppState};

/// Full stock report: availability, withdrawal sums and breakdowns
#[utoipa::path(
    get,
    path = "/api/v1/reports/stock",
    responses(
        (status = 200, description = "Stock report", body = ApiResponse<StockReport>),
        (status = 403, description = "Caller is not an admin", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Reports"
)]
pub async fn stock_report(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<StockReport>>, ServiceError> {
    let report = state.services.reports.stock_report().await?;
    Ok(Json(ApiResponse::success(report)))
}
