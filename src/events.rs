//! In-process domain events.
//!
//! Services emit events after their transaction commits; delivery is
//! best-effort and never affects the outcome of the request that produced
//! the event.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{info, warn};
use uuid::Uuid;

/// Events that can occur in the store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    SaleCompleted {
        sale_id: Uuid,
        total: Decimal,
        payment_type: String,
        resident_id: Option<Uuid>,
        timestamp: DateTime<Utc>,
    },
    StockReceived {
        product_id: Uuid,
        batch_id: Uuid,
        quantity: i32,
    },
    ProductDeleted(Uuid),
    ResidentDeleted(Uuid),
    ResidentStatusChanged {
        resident_id: Uuid,
        new_status: String,
    },
}

/// Wrapper around the channel used to dispatch events.
#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    /// Creates a new EventSender
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    /// Sends an event asynchronously
    pub async fn send(&self, event: Event) -> Result<(), String> {
        self.sender
            .send(event)
            .await
            .map_err(|e| format!("Failed to send event: {}", e))
    }
}

/// Consumes events until every sender is dropped. Currently events are only
/// logged; this is the seam where notifications would hook in.
pub async fn process_events(mut rx: mpsc::Receiver<Event>) {
    info!("Starting event processing loop");

    while let Some(event) = rx.recv().await {
        match &event {
            Event::SaleCompleted {
                sale_id,
                total,
                payment_type,
                ..
            } => {
                info!(sale_id = %sale_id, total = %total, payment_type = %payment_type, "Sale completed");
            }
            Event::StockReceived {
                product_id,
                batch_id,
                quantity,
            } => {
                info!(product_id = %product_id, batch_id = %batch_id, quantity = quantity, "Stock received");
            }
            Event::ProductDeleted(id) => info!(product_id = %id, "Product deleted"),
            Event::ResidentDeleted(id) => info!(resident_id = %id, "Resident deleted"),
            Event::ResidentStatusChanged {
                resident_id,
                new_status,
            } => {
                info!(resident_id = %resident_id, status = %new_status, "Resident status changed");
            }
        }
    }

    warn!("Event channel closed; stopping event processing loop");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn send_delivers_event() {
        let (tx, mut rx) = mpsc::channel(4);
        let sender = EventSender::new(tx);

        sender
            .send(Event::ProductDeleted(Uuid::new_v4()))
            .await
            .expect("send should succeed");

        assert!(matches!(rx.recv().await, Some(Event::ProductDeleted(_))));
    }

    #[tokio::test]
    async fn send_fails_after_receiver_dropped() {
        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        let sender = EventSender::new(tx);

        assert!(sender
            .send(Event::ResidentDeleted(Uuid::new_v4()))
            .await
            .is_err());
    }
}
