use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::errors::ServiceError;

use super::ledger::{LedgerService, MergeOutcome, NewItem};

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase", tag = "outcome")]
pub enum RowOutcome {
    Created {
        name: String,
        item_id: Uuid,
        quantity: i32,
    },
    Merged {
        name: String,
        item_id: Uuid,
        quantity: i32,
    },
    Failed {
        name: String,
        error: String,
    },
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ImportReport {
    /// Rows that landed, whether by insert or by merge.
    pub inserted_count: usize,
    pub failed_count: usize,
    pub results: Vec<RowOutcome>,
}

/// Feeds batches of rows through the ledger's create-or-merge path. Each row
/// is an independent attempt; one bad row never aborts the batch, and two
/// same-named rows in one batch merge additively.
pub struct ImportService {
    ledger: Arc<LedgerService>,
}

impl ImportService {
    pub fn new(ledger: Arc<LedgerService>) -> Self {
        Self { ledger }
    }

    #[instrument(skip(self, rows), fields(row_count = rows.len()))]
    pub async fn import(&self, rows: Vec<NewItem>) -> Result<ImportReport, ServiceError> {
        let mut results = Vec::with_capacity(rows.len());
        let mut inserted_count = 0;
        let mut failed_count = 0;

        for row in rows {
            let name = row.name.clone();
            match self.ledger.create_or_merge_item(row).await {
                Ok((item, MergeOutcome::Created)) => {
                    inserted_count += 1;
                    results.push(RowOutcome::Created {
                        name,
                        item_id: item.id,
                        quantity: item.quantity,
                    });
                }
                Ok((item, MergeOutcome::Merged)) => {
                    inserted_count += 1;
                    results.push(RowOutcome::Merged {
                        name,
                        item_id: item.id,
                        quantity: item.quantity,
                    });
                }
                Err(e) => {
                    failed_count += 1;
                    warn!(%name, error = %e, "import row failed");
                    results.push(RowOutcome::Failed {
                        name,
                        error: e.response_message(),
                    });
                }
            }
        }

        Ok(ImportReport {
            inserted_count,
            failed_count,
            results,
        })
    }
}
