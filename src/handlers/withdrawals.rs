use axum::{
    extract::State,
    http::StatusCode,
    response::Json,
    Extension,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{auth::AuthUser, errors::ServiceError, ApiResponse, AppState};

use super::items::ItemDto;

/// The withdrawing identity comes from the bearer token, never the body.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct WithdrawRequest {
    pub item_id: Uuid,
    #[validate(range(min = 1, message = "Quantity must be positive"))]
    pub quantity: i32,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct WithdrawResponse {
    pub withdrawal_id: i64,
    pub taken_at: DateTime<Utc>,
    /// Item state after the decrement committed.
    pub item: ItemDto,
}

/// Take stock on behalf of the authenticated user
#[utoipa::path(
    post,
    path = "/api/v1/withdrawals",
    request_body = WithdrawRequest,
    responses(
        (status = 201, description = "Stock withdrawn", body = ApiResponse<WithdrawResponse>),
        (status = 400, description = "Invalid quantity", body = crate::errors::ErrorResponse),
        (status = 404, description = "Item not found", body = crate::errors::ErrorResponse),
        (status = 422, description = "Requested more than available", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Withdrawals"
)]
pub async fn create_withdrawal(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(request): Json<WithdrawRequest>,
) -> Result<(StatusCode, Json<ApiResponse<WithdrawResponse>>), ServiceError> {
    request.validate()?;

    let (item, record) = state
        .services
        .ledger
        .withdraw(request.item_id, user.id, request.quantity)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(WithdrawResponse {
            withdrawal_id: record.id,
            taken_at: record.taken_at,
            item: item.into(),
        })),
    ))
}
