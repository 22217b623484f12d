use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{debug, info};
use uuid::Uuid;

/// Domain events emitted after a ledger write commits. Delivery is
/// best-effort: a full or closed channel is logged and dropped, it never
/// fails the request that produced the event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    ItemCreated {
        item_id: Uuid,
        name: String,
        quantity: i32,
    },
    ItemRestocked {
        item_id: Uuid,
        added: i32,
        quantity: i32,
    },
    StockWithdrawn {
        item_id: Uuid,
        user_id: Uuid,
        quantity: i32,
        remaining: i32,
        taken_at: DateTime<Utc>,
    },
    QuantityOverridden {
        item_id: Uuid,
        old_quantity: i32,
        new_quantity: i32,
    },
    UserRegistered {
        user_id: Uuid,
        role: String,
    },
}

#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    /// Sends an event asynchronously.
    pub async fn send(&self, event: Event) -> Result<(), String> {
        self.sender
            .send(event)
            .await
            .map_err(|e| format!("Failed to send event: {}", e))
    }
}

/// Drains the event channel and logs each event. The loop ends when every
/// sender has been dropped, which happens during shutdown.
pub async fn process_events(mut rx: mpsc::Receiver<Event>) {
    info!("Starting event processing loop");

    while let Some(event) = rx.recv().await {
        match &event {
            Event::ItemCreated {
                item_id,
                name,
                quantity,
            } => {
                info!(%item_id, %name, quantity, "item created");
            }
            Event::ItemRestocked {
                item_id,
                added,
                quantity,
            } => {
                info!(%item_id, added, quantity, "item restocked");
            }
            Event::StockWithdrawn {
                item_id,
                user_id,
                quantity,
                remaining,
                ..
            } => {
                info!(%item_id, %user_id, quantity, remaining, "stock withdrawn");
            }
            Event::QuantityOverridden {
                item_id,
                old_quantity,
                new_quantity,
            } => {
                info!(%item_id, old_quantity, new_quantity, "quantity overridden");
            }
            Event::UserRegistered { user_id, role } => {
                info!(%user_id, %role, "user registered");
            }
        }
        debug!(?event, "event processed");
    }

    info!("Event processing loop stopped");
}
