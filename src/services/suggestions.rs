use crate::{
    db::DbPool,
    entities::item::{self, Entity as ItemEntity},
    errors::ServiceError,
};
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, QueryOrder, QuerySelect};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::instrument;
use utoipa::ToSchema;
use uuid::Uuid;

/// Hard cap on how many suggestions a single query returns.
pub const MAX_SUGGESTIONS: u64 = 8;

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct Suggestion {
    pub id: Uuid,
    pub name: String,
}

/// Case-insensitive substring lookup over item names, for type-ahead inputs.
pub struct SuggestionService {
    db_pool: Arc<DbPool>,
}

impl SuggestionService {
    pub fn new(db_pool: Arc<DbPool>) -> Self {
        Self { db_pool }
    }

    /// An empty or whitespace-only query is a valid request for nothing, not
    /// an error. Matches are ordered oldest first so results are stable
    /// across calls.
    #[instrument(skip(self))]
    pub async fn suggest(&self, query: &str) -> Result<Vec<Suggestion>, ServiceError> {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return Ok(Vec::new());
        }

        let items = ItemEntity::find()
            .filter(item::Column::NameKey.contains(&needle))
            .order_by_asc(item::Column::CreatedAt)
            .limit(MAX_SUGGESTIONS)
            .all(self.db_pool.as_ref())
            .await
            .map_err(ServiceError::db_error)?;

        Ok(items
            .into_iter()
            .map(|it| Suggestion {
                id: it.id,
                name: it.name,
            })
            .collect())
    }
}
