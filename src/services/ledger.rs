use crate::{
    db::DbPool,
    entities::{
        item::{self, Entity as ItemEntity},
        withdrawal,
    },
    errors::ServiceError,
    events::{Event, EventSender},
};
use chrono::Utc;
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, Set,
    SqlErr, TransactionError, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use super::retry_on_conflict;

/// Input for create-or-merge. Quantity is the amount being stocked, so zero
/// is rejected.
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct NewItem {
    #[validate(length(min = 1, max = 255, message = "Name must not be empty"))]
    pub name: String,
    pub description: Option<String>,
    #[validate(range(min = 1, message = "Quantity must be positive"))]
    pub quantity: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum MergeOutcome {
    Created,
    Merged,
}

/// The single authority over `items.quantity`. Every mutation goes through a
/// transaction with a version-checked update; concurrent writers surface as
/// `Conflict` and are retried a bounded number of times.
pub struct LedgerService {
    db_pool: Arc<DbPool>,
    event_sender: Option<Arc<EventSender>>,
}

impl LedgerService {
    pub fn new(db_pool: Arc<DbPool>, event_sender: Option<Arc<EventSender>>) -> Self {
        Self {
            db_pool,
            event_sender,
        }
    }

    /// Creates the item, or restocks it if a case-insensitive name match
    /// already exists. Merging adds the supplied quantity to available stock
    /// and replaces the description only when a non-empty one is given.
    #[instrument(skip(self, input), fields(name = %input.name))]
    pub async fn create_or_merge_item(
        &self,
        input: NewItem,
    ) -> Result<(item::Model, MergeOutcome), ServiceError> {
        input.validate()?;
        let name = input.name.trim().to_string();
        if name.is_empty() {
            return Err(ServiceError::ValidationError(
                "Name must not be empty".to_string(),
            ));
        }
        let description = input
            .description
            .as_deref()
            .map(str::trim)
            .filter(|d| !d.is_empty())
            .map(str::to_string);
        let quantity = input.quantity;

        let (saved, outcome) = retry_on_conflict("create_or_merge_item", || {
            self.try_create_or_merge(name.clone(), description.clone(), quantity)
        })
        .await?;

        match outcome {
            MergeOutcome::Created => {
                info!(item_id = %saved.id, quantity, "item created");
                self.emit(Event::ItemCreated {
                    item_id: saved.id,
                    name: saved.name.clone(),
                    quantity: saved.quantity,
                })
                .await;
            }
            MergeOutcome::Merged => {
                info!(item_id = %saved.id, added = quantity, "item restocked");
                self.emit(Event::ItemRestocked {
                    item_id: saved.id,
                    added: quantity,
                    quantity: saved.quantity,
                })
                .await;
            }
        }

        Ok((saved, outcome))
    }

    async fn try_create_or_merge(
        &self,
        name: String,
        description: Option<String>,
        quantity: i32,
    ) -> Result<(item::Model, MergeOutcome), ServiceError> {
        let db = self.db_pool.as_ref();
        let name_key = name.to_lowercase();

        db.transaction::<_, (item::Model, MergeOutcome), ServiceError>(move |txn| {
            Box::pin(async move {
                let now = Utc::now();

                let existing = ItemEntity::find()
                    .filter(item::Column::NameKey.eq(name_key.clone()))
                    .one(txn)
                    .await
                    .map_err(ServiceError::db_error)?;

                match existing {
                    Some(found) => {
                        let new_quantity = found.quantity + quantity;
                        let new_description =
                            description.clone().or_else(|| found.description.clone());

                        let update = ItemEntity::update_many()
                            .col_expr(item::Column::Quantity, Expr::value(new_quantity))
                            .col_expr(item::Column::Version, Expr::value(found.version + 1))
                            .col_expr(
                                item::Column::Description,
                                Expr::value(new_description.clone()),
                            )
                            .col_expr(item::Column::UpdatedAt, Expr::value(now))
                            .filter(item::Column::Id.eq(found.id))
                            .filter(item::Column::Version.eq(found.version))
                            .exec(txn)
                            .await
                            .map_err(ServiceError::db_error)?;

                        if update.rows_affected == 0 {
                            return Err(ServiceError::Conflict(format!(
                                "Item {} was modified concurrently",
                                found.id
                            )));
                        }

                        let merged = item::Model {
                            quantity: new_quantity,
                            version: found.version + 1,
                            description: new_description,
                            updated_at: Some(now),
                            ..found
                        };
                        Ok((merged, MergeOutcome::Merged))
                    }
                    None => {
                        let new_item = item::ActiveModel {
                            id: Set(Uuid::new_v4()),
                            name: Set(name.clone()),
                            name_key: Set(name_key.clone()),
                            description: Set(description.clone()),
                            quantity: Set(quantity),
                            version: Set(1),
                            created_at: Set(now),
                            updated_at: Set(None),
                        };

                        // A concurrent insert of the same name loses the race
                        // on the unique name_key index; mapping it to Conflict
                        // turns the retry into a merge.
                        let saved = new_item.insert(txn).await.map_err(|e| {
                            if matches!(e.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) {
                                ServiceError::Conflict(format!(
                                    "Item '{}' was created concurrently",
                                    name
                                ))
                            } else {
                                ServiceError::DatabaseError(e)
                            }
                        })?;

                        Ok((saved, MergeOutcome::Created))
                    }
                }
            })
        })
        .await
        .map_err(unwrap_transaction_error)
    }

    /// Takes `quantity` units of an item on behalf of a user. The decrement
    /// and the withdrawal record commit together or not at all.
    #[instrument(skip(self), fields(%item_id, %user_id, quantity))]
    pub async fn withdraw(
        &self,
        item_id: Uuid,
        user_id: Uuid,
        quantity: i32,
    ) -> Result<(item::Model, withdrawal::Model), ServiceError> {
        if quantity <= 0 {
            return Err(ServiceError::ValidationError(
                "Quantity must be positive".to_string(),
            ));
        }

        let (updated, record) = retry_on_conflict("withdraw", || {
            self.try_withdraw(item_id, user_id, quantity)
        })
        .await?;

        info!(
            item_id = %updated.id,
            quantity,
            remaining = updated.quantity,
            "stock withdrawn"
        );
        self.emit(Event::StockWithdrawn {
            item_id: updated.id,
            user_id,
            quantity,
            remaining: updated.quantity,
            taken_at: record.taken_at,
        })
        .await;

        Ok((updated, record))
    }

    async fn try_withdraw(
        &self,
        item_id: Uuid,
        user_id: Uuid,
        quantity: i32,
    ) -> Result<(item::Model, withdrawal::Model), ServiceError> {
        let db = self.db_pool.as_ref();

        db.transaction::<_, (item::Model, withdrawal::Model), ServiceError>(move |txn| {
            Box::pin(async move {
                let found = ItemEntity::find_by_id(item_id)
                    .one(txn)
                    .await
                    .map_err(ServiceError::db_error)?
                    .ok_or_else(|| {
                        ServiceError::NotFound(format!("Item {} not found", item_id))
                    })?;

                if found.quantity < quantity {
                    return Err(ServiceError::InsufficientStock(format!(
                        "requested {}, available {}",
                        quantity, found.quantity
                    )));
                }

                let now = Utc::now();
                let new_quantity = found.quantity - quantity;

                let update = ItemEntity::update_many()
                    .col_expr(item::Column::Quantity, Expr::value(new_quantity))
                    .col_expr(item::Column::Version, Expr::value(found.version + 1))
                    .col_expr(item::Column::UpdatedAt, Expr::value(now))
                    .filter(item::Column::Id.eq(found.id))
                    .filter(item::Column::Version.eq(found.version))
                    .exec(txn)
                    .await
                    .map_err(ServiceError::db_error)?;

                if update.rows_affected == 0 {
                    return Err(ServiceError::Conflict(format!(
                        "Item {} was modified concurrently",
                        found.id
                    )));
                }

                let record = withdrawal::ActiveModel {
                    item_id: Set(found.id),
                    user_id: Set(user_id),
                    quantity: Set(quantity),
                    taken_at: Set(now),
                    ..Default::default()
                }
                .insert(txn)
                .await
                .map_err(ServiceError::db_error)?;

                let updated = item::Model {
                    quantity: new_quantity,
                    version: found.version + 1,
                    updated_at: Some(now),
                    ..found
                };

                Ok((updated, record))
            })
        })
        .await
        .map_err(unwrap_transaction_error)
    }

    /// Manual correction override. Sets available stock directly without
    /// touching the withdrawal ledger, so reported totals shift accordingly.
    #[instrument(skip(self), fields(%item_id, new_quantity))]
    pub async fn update_quantity(
        &self,
        item_id: Uuid,
        new_quantity: i32,
    ) -> Result<item::Model, ServiceError> {
        if new_quantity < 0 {
            return Err(ServiceError::InvalidInput(
                "Quantity must not be negative".to_string(),
            ));
        }

        let (updated, old_quantity) = retry_on_conflict("update_quantity", || {
            self.try_update_quantity(item_id, new_quantity)
        })
        .await?;

        info!(item_id = %updated.id, old_quantity, new_quantity, "quantity overridden");
        self.emit(Event::QuantityOverridden {
            item_id: updated.id,
            old_quantity,
            new_quantity,
        })
        .await;

        Ok(updated)
    }

    async fn try_update_quantity(
        &self,
        item_id: Uuid,
        new_quantity: i32,
    ) -> Result<(item::Model, i32), ServiceError> {
        let db = self.db_pool.as_ref();

        db.transaction::<_, (item::Model, i32), ServiceError>(move |txn| {
            Box::pin(async move {
                let found = ItemEntity::find_by_id(item_id)
                    .one(txn)
                    .await
                    .map_err(ServiceError::db_error)?
                    .ok_or_else(|| {
                        ServiceError::NotFound(format!("Item {} not found", item_id))
                    })?;

                let now = Utc::now();

                let update = ItemEntity::update_many()
                    .col_expr(item::Column::Quantity, Expr::value(new_quantity))
                    .col_expr(item::Column::Version, Expr::value(found.version + 1))
                    .col_expr(item::Column::UpdatedAt, Expr::value(now))
                    .filter(item::Column::Id.eq(found.id))
                    .filter(item::Column::Version.eq(found.version))
                    .exec(txn)
                    .await
                    .map_err(ServiceError::db_error)?;

                if update.rows_affected == 0 {
                    return Err(ServiceError::Conflict(format!(
                        "Item {} was modified concurrently",
                        found.id
                    )));
                }

                let old_quantity = found.quantity;
                let updated = item::Model {
                    quantity: new_quantity,
                    version: found.version + 1,
                    updated_at: Some(now),
                    ..found
                };

                Ok((updated, old_quantity))
            })
        })
        .await
        .map_err(unwrap_transaction_error)
    }

    /// All items, newest first.
    pub async fn list_items(&self) -> Result<Vec<item::Model>, ServiceError> {
        ItemEntity::find()
            .order_by_desc(item::Column::CreatedAt)
            .all(self.db_pool.as_ref())
            .await
            .map_err(ServiceError::db_error)
    }

    pub async fn get_item(&self, item_id: Uuid) -> Result<item::Model, ServiceError> {
        ItemEntity::find_by_id(item_id)
            .one(self.db_pool.as_ref())
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| ServiceError::NotFound(format!("Item {} not found", item_id)))
    }

    /// Event delivery is best-effort; a failure is logged and dropped.
    async fn emit(&self, event: Event) {
        if let Some(sender) = &self.event_sender {
            if let Err(e) = sender.send(event).await {
                warn!("failed to publish ledger event: {}", e);
            }
        }
    }
}

pub(crate) fn unwrap_transaction_error(err: TransactionError<ServiceError>) -> ServiceError {
    match err {
        TransactionError::Connection(db_err) => ServiceError::DatabaseError(db_err),
        TransactionError::Transaction(service_err) => service_err,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_item_validation_rejects_zero_quantity() {
        let input = NewItem {
            name: "Pen".to_string(),
            description: None,
            quantity: 0,
        };
        assert!(input.validate().is_err());
    }

    #[test]
    fn new_item_validation_rejects_empty_name() {
        let input = NewItem {
            name: String::new(),
            description: None,
            quantity: 5,
        };
        assert!(input.validate().is_err());
    }

    #[test]
    fn transaction_errors_unwrap_to_inner_service_error() {
        let inner = ServiceError::InsufficientStock("requested 2, available 1".into());
        let unwrapped = unwrap_transaction_error(TransactionError::Transaction(inner));
        assert!(matches!(unwrapped, ServiceError::InsufficientStock(_)));

        let conn = unwrap_transaction_error(TransactionError::<ServiceError>::Connection(
            sea_orm::DbErr::Custom("gone".into()),
        ));
        assert!(matches!(conn, ServiceError::DatabaseError(_)));
    }
}
