use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A named, quantity-tracked inventory unit.
///
/// `quantity` is the CURRENT AVAILABLE stock: restocks add to it, withdrawals
/// subtract from it. The original total ever stocked is derived by reporting as
/// `quantity + sum(withdrawals)`; it is never stored. `version` is the
/// optimistic-concurrency counter checked by every quantity write.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "items")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub name: String,
    /// Lowercased `name`; unique, used for case-insensitive lookups.
    #[serde(skip_serializing)]
    pub name_key: String,
    pub description: Option<String>,
    pub quantity: i32,
    #[serde(skip_serializing)]
    pub version: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::withdrawal::Entity")]
    Withdrawal,
}

impl Related<super::withdrawal::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Withdrawal.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
