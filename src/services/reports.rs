use crate::{
    db::DbPool,
    entities::{
        item::{self, Entity as ItemEntity},
        user::Entity as UserEntity,
        withdrawal::{self, Entity as WithdrawalEntity},
    },
    errors::ServiceError,
};
use chrono::{DateTime, Utc};
use sea_orm::{EntityTrait, QueryOrder};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::instrument;
use utoipa::ToSchema;
use uuid::Uuid;

/// One row of an item's withdrawal breakdown, in insertion order.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct WithdrawalRecord {
    pub user_name: String,
    pub user_email: String,
    pub quantity: i32,
    pub taken_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ItemReport {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    /// Stock currently on the shelf.
    pub available_quantity: i32,
    /// Sum of all recorded withdrawals.
    pub taken_quantity: i32,
    /// Derived: available + taken. Not stored anywhere.
    pub total_quantity: i32,
    pub withdrawals: Vec<WithdrawalRecord>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct StockSummary {
    pub total_items: usize,
    pub total_available: i64,
    pub total_taken: i64,
    pub total_stock: i64,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct StockReport {
    pub summary: StockSummary,
    pub items: Vec<ItemReport>,
}

/// Read-only aggregation over the ledger. Never mutates anything.
pub struct ReportService {
    db_pool: Arc<DbPool>,
}

impl ReportService {
    pub fn new(db_pool: Arc<DbPool>) -> Self {
        Self { db_pool }
    }

    /// Builds the full stock report: per-item availability, withdrawal sums
    /// and breakdowns, plus store-wide totals. Items come back newest first,
    /// each breakdown in withdrawal insertion order.
    #[instrument(skip(self))]
    pub async fn stock_report(&self) -> Result<StockReport, ServiceError> {
        let db = self.db_pool.as_ref();

        let items = ItemEntity::find()
            .order_by_desc(item::Column::CreatedAt)
            .all(db)
            .await
            .map_err(ServiceError::db_error)?;

        let withdrawals = WithdrawalEntity::find()
            .find_also_related(UserEntity)
            .order_by_asc(withdrawal::Column::Id)
            .all(db)
            .await
            .map_err(ServiceError::db_error)?;

        let mut by_item: HashMap<Uuid, Vec<WithdrawalRecord>> = HashMap::new();
        for (record, user) in withdrawals {
            let (user_name, user_email) = match user {
                Some(u) => (u.name, u.email),
                // FK guarantees a user; tolerate a missing row anyway.
                None => ("unknown".to_string(), String::new()),
            };
            by_item
                .entry(record.item_id)
                .or_default()
                .push(WithdrawalRecord {
                    user_name,
                    user_email,
                    quantity: record.quantity,
                    taken_at: record.taken_at,
                });
        }

        let mut total_available: i64 = 0;
        let mut total_taken: i64 = 0;

        let item_reports: Vec<ItemReport> = items
            .into_iter()
            .map(|it| {
                let withdrawals = by_item.remove(&it.id).unwrap_or_default();
                let taken: i32 = withdrawals.iter().map(|w| w.quantity).sum();

                total_available += i64::from(it.quantity);
                total_taken += i64::from(taken);

                ItemReport {
                    id: it.id,
                    name: it.name,
                    description: it.description,
                    available_quantity: it.quantity,
                    taken_quantity: taken,
                    total_quantity: it.quantity + taken,
                    withdrawals,
                }
            })
            .collect();

        Ok(StockReport {
            summary: StockSummary {
                total_items: item_reports.len(),
                total_available,
                total_taken,
                total_stock: total_available + total_taken,
            },
            items: item_reports,
        })
    }
}
