use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::{
    entities::item,
    errors::ServiceError,
    services::import::ImportReport,
    services::ledger::{MergeOutcome, NewItem},
    services::suggestions::Suggestion,
    ApiResponse, AppState,
};

/// Item as exposed over HTTP. Internal bookkeeping columns stay internal.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ItemDto {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub quantity: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl From<item::Model> for ItemDto {
    fn from(model: item::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            description: model.description,
            quantity: model.quantity,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CreateItemResponse {
    pub status: MergeOutcome,
    pub item: ItemDto,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateQuantityRequest {
    /// New available quantity; replaces the stored value outright.
    #[validate(range(min = 0, message = "Quantity must not be negative"))]
    pub quantity: i32,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct SuggestQuery {
    /// Substring to match against item names, case-insensitively.
    pub q: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SuggestionsResponse {
    pub items: Vec<Suggestion>,
}

/// Create an item, or restock the existing one with the same name
#[utoipa::path(
    post,
    path = "/api/v1/items",
    request_body = NewItem,
    responses(
        (status = 201, description = "Item created or merged", body = ApiResponse<CreateItemResponse>),
        (status = 400, description = "Invalid name or quantity", body = crate::errors::ErrorResponse),
        (status = 409, description = "Concurrent writes exhausted retries", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Items"
)]
pub async fn create_item(
    State(state): State<AppState>,
    Json(input): Json<NewItem>,
) -> Result<(StatusCode, Json<ApiResponse<CreateItemResponse>>), ServiceError> {
    let (item, status) = state.services.ledger.create_or_merge_item(input).await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(CreateItemResponse {
            status,
            item: item.into(),
        })),
    ))
}

/// Bulk import: every row goes through the same create-or-merge path
#[utoipa::path(
    post,
    path = "/api/v1/items/import",
    request_body = Vec<NewItem>,
    responses(
        (status = 200, description = "Per-row import outcomes", body = ApiResponse<ImportReport>)
    ),
    security(("bearer_auth" = [])),
    tag = "Items"
)]
pub async fn import_items(
    State(state): State<AppState>,
    Json(rows): Json<Vec<NewItem>>,
) -> Result<Json<ApiResponse<ImportReport>>, ServiceError> {
    let report = state.services.import.import(rows).await?;
    Ok(Json(ApiResponse::success(report)))
}

/// List all items, newest first
#[utoipa::path(
    get,
    path = "/api/v1/items",
    responses(
        (status = 200, description = "All items", body = ApiResponse<Vec<ItemDto>>)
    ),
    security(("bearer_auth" = [])),
    tag = "Items"
)]
pub async fn list_items(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<ItemDto>>>, ServiceError> {
    let items = state.services.ledger.list_items().await?;
    Ok(Json(ApiResponse::success(
        items.into_iter().map(ItemDto::from).collect(),
    )))
}

/// Fetch a single item by id
#[utoipa::path(
    get,
    path = "/api/v1/items/{id}",
    params(("id" = Uuid, Path, description = "Item id")),
    responses(
        (status = 200, description = "The item", body = ApiResponse<ItemDto>),
        (status = 404, description = "Item not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Items"
)]
pub async fn get_item(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<ItemDto>>, ServiceError> {
    let item = state.services.ledger.get_item(id).await?;
    Ok(Json(ApiResponse::success(item.into())))
}

/// Type-ahead name suggestions; empty query yields an empty list
#[utoipa::path(
    get,
    path = "/api/v1/items/suggestions",
    params(SuggestQuery),
    responses(
        (status = 200, description = "Up to 8 matching items", body = ApiResponse<SuggestionsResponse>)
    ),
    security(("bearer_auth" = [])),
    tag = "Items"
)]
pub async fn suggest_items(
    State(state): State<AppState>,
    Query(params): Query<SuggestQuery>,
) -> Result<Json<ApiResponse<SuggestionsResponse>>, ServiceError> {
    let query = params.q.unwrap_or_default();
    let items = state.services.suggestions.suggest(&query).await?;
    Ok(Json(ApiResponse::success(SuggestionsResponse { items })))
}

/// Manual quantity override, outside the withdrawal ledger
#[utoipa::path(
    put,
    path = "/api/v1/items/{id}/quantity",
    params(("id" = Uuid, Path, description = "Item id")),
    request_body = UpdateQuantityRequest,
    responses(
        (status = 200, description = "Quantity replaced", body = ApiResponse<ItemDto>),
        (status = 400, description = "Negative quantity", body = crate::errors::ErrorResponse),
        (status = 404, description = "Item not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Items"
)]
pub async fn update_quantity(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateQuantityRequest>,
) -> Result<Json<ApiResponse<ItemDto>>, ServiceError> {
    request.validate()?;
    let item = state
        .services
        .ledger
        .update_quantity(id, request.quantity)
        .await?;
    Ok(Json(ApiResponse::success(item.into())))
}
