use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Storeroom API",
        version = "1.0.0",
        description = r#"
# Storeroom Inventory API

Tracks a single store of named items: stocking, withdrawing, reporting and
bulk import.

## Authentication

All inventory endpoints require a JWT bearer token obtained from
`POST /api/v1/auth/login`:

```
Authorization: Bearer <your-jwt-token>
```

Accounts carry one of two roles. `USER` can list items, get suggestions and
withdraw stock; `ADMIN` can additionally create and import items, override
quantities and read the stock report.

## Error Handling

Failures use a consistent body with appropriate HTTP status codes:

```json
{
  "error": "Unprocessable Entity",
  "message": "Insufficient stock: requested 11, available 6",
  "request_id": "3f0c...",
  "timestamp": "2026-01-01T00:00:00Z"
}
```
        "#,
        license(
            name = "MIT",
            url = "https://opensource.org/licenses/MIT"
        )
    ),
    servers(
        (url = "http://localhost:8080", description = "Local development")
    ),
    tags(
        (name = "Items", description = "Item creation, listing, import and suggestions"),
        (name = "Withdrawals", description = "Taking stock out of the store"),
        (name = "Reports", description = "Stock aggregation endpoints"),
        (name = "Health", description = "Health check endpoints")
    ),
    paths(
        // Items
        crate::handlers::items::create_item,
        crate::handlers::items::import_items,
        crate::handlers::items::list_items,
        crate::handlers::items::get_item,
        crate::handlers::items::suggest_items,
        crate::handlers::items::update_quantity,

        // Withdrawals
        crate::handlers::withdrawals::create_withdrawal,

        // Reports
        crate::handlers::reports::stock_report,
    ),
    components(
        schemas(
            // Common types
            crate::ApiResponse<serde_json::Value>,

            // Item types
            crate::handlers::items::ItemDto,
            crate::handlers::items::CreateItemResponse,
            crate::handlers::items::UpdateQuantityRequest,
            crate::handlers::items::SuggestionsResponse,
            crate::services::ledger::NewItem,
            crate::services::ledger::MergeOutcome,
            crate::services::suggestions::Suggestion,
            crate::services::import::ImportReport,
            crate::services::import::RowOutcome,

            // Withdrawal types
            crate::handlers::withdrawals::WithdrawRequest,
            crate::handlers::withdrawals::WithdrawResponse,

            // Report types
            crate::services::reports::StockReport,
            crate::services::reports::StockSummary,
            crate::services::reports::ItemReport,
            crate::services::reports::WithdrawalRecord,

            // Auth types
            crate::auth::Role,
            crate::auth::SignupRequest,
            crate::auth::SignupResponse,
            crate::auth::LoginRequest,
            crate::auth::TokenResponse,

            // Error types
            crate::errors::ErrorResponse
        )
    )
)]
pub struct ApiDocV1;

pub fn swagger_ui() -> SwaggerUi {
    SwaggerUi::new("/swagger-ui")
        .url("/api-docs/openapi.json", ApiDocV1::openapi())
        .config(utoipa_swagger_ui::Config::from("/api-docs/openapi.json").try_it_out_enabled(true))
}
