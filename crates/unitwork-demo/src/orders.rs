//! Order flow used by the demo: one event, an in-memory unit of work, and
//! the handlers that enlist in it.

use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;
use unitwork_broker::registry::HandlerRegistry;
use unitwork_core::error::DomainError;
use unitwork_core::event::DomainEvent;
use unitwork_core::handler::{AsyncUnitOfWorkEventHandler, UnitOfWorkEventHandler};
use unitwork_core::unit_of_work::UnitOfWork;
use uuid::Uuid;

/// Event type identifier for [`OrderPlaced`].
pub const ORDER_PLACED_EVENT_TYPE: &str = "orders.order_placed";

/// Emitted when a customer places an order.
#[derive(Debug, Clone, Serialize)]
pub struct OrderPlaced {
    /// The order identifier.
    pub order_id: Uuid,
    /// 1-based position of the order within the demo run.
    pub sequence: u32,
    /// Stock keeping unit ordered.
    pub sku: String,
    /// Number of units ordered.
    pub quantity: u32,
    /// When the order was placed.
    pub placed_at: DateTime<Utc>,
}

impl DomainEvent for OrderPlaced {
    fn event_type(&self) -> &'static str {
        ORDER_PLACED_EVENT_TYPE
    }
}

/// A row written inside the unit of work.
#[derive(Debug, Clone, Serialize)]
pub struct StagedChange {
    /// Logical table the row belongs to.
    pub table: &'static str,
    /// Row contents.
    pub row: serde_json::Value,
}

/// Unit of work that buffers rows until the caller commits or rolls back.
#[derive(Debug, Default)]
pub struct InMemoryUnitOfWork {
    staged: Mutex<Vec<StagedChange>>,
}

impl UnitOfWork for InMemoryUnitOfWork {}

impl InMemoryUnitOfWork {
    /// Buffers a row for `table`.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Infrastructure` if the buffer lock is poisoned
    /// or `row` cannot be serialized.
    pub fn stage(&self, table: &'static str, row: &impl Serialize) -> Result<(), DomainError> {
        let row = serde_json::to_value(row)
            .map_err(|e| DomainError::Infrastructure(format!("row serialization failed: {e}")))?;
        self.staged
            .lock()
            .map_err(|_| DomainError::Infrastructure("unit of work lock poisoned".into()))?
            .push(StagedChange { table, row });
        Ok(())
    }

    /// Returns a snapshot of the buffered rows.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Infrastructure` if the buffer lock is poisoned.
    pub fn staged(&self) -> Result<Vec<StagedChange>, DomainError> {
        Ok(self
            .staged
            .lock()
            .map_err(|_| DomainError::Infrastructure("unit of work lock poisoned".into()))?
            .clone())
    }

    /// Takes every buffered row, leaving the unit of work empty.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Infrastructure` if the buffer lock is poisoned.
    pub fn commit(&self) -> Result<Vec<StagedChange>, DomainError> {
        let mut staged = self
            .staged
            .lock()
            .map_err(|_| DomainError::Infrastructure("unit of work lock poisoned".into()))?;
        Ok(std::mem::take(&mut *staged))
    }

    /// Discards every buffered row and returns how many were dropped.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Infrastructure` if the buffer lock is poisoned.
    pub fn rollback(&self) -> Result<usize, DomainError> {
        Ok(self.commit()?.len())
    }
}

/// Writes a ledger entry for the order.
#[derive(Debug)]
pub struct RecordLedgerEntry;

impl UnitOfWorkEventHandler<OrderPlaced, InMemoryUnitOfWork> for RecordLedgerEntry {
    fn execute(
        &self,
        event: &OrderPlaced,
        unit_of_work: &InMemoryUnitOfWork,
    ) -> Result<(), DomainError> {
        unit_of_work.stage(
            "ledger",
            &serde_json::json!({
                "order_id": event.order_id,
                "quantity": event.quantity,
                "recorded_at": event.placed_at,
            }),
        )
    }

    fn handler_name(&self) -> &'static str {
        "record-ledger-entry"
    }
}

/// Reserves stock for the order. Rejects the order at `reject_sequence`.
#[derive(Debug)]
pub struct ReserveInventory {
    reject_sequence: Option<u32>,
}

impl ReserveInventory {
    /// Creates the handler; `reject_sequence` selects an order to reject.
    #[must_use]
    pub fn new(reject_sequence: Option<u32>) -> Self {
        Self { reject_sequence }
    }
}

impl UnitOfWorkEventHandler<OrderPlaced, InMemoryUnitOfWork> for ReserveInventory {
    fn execute(
        &self,
        event: &OrderPlaced,
        unit_of_work: &InMemoryUnitOfWork,
    ) -> Result<(), DomainError> {
        if self.reject_sequence == Some(event.sequence) {
            return Err(DomainError::Validation(format!(
                "insufficient stock for {} (order {})",
                event.sku, event.order_id
            )));
        }
        unit_of_work.stage(
            "reservations",
            &serde_json::json!({
                "order_id": event.order_id,
                "sku": event.sku,
                "quantity": event.quantity,
            }),
        )
    }

    fn handler_name(&self) -> &'static str {
        "reserve-inventory"
    }
}

/// Queues a confirmation message in the outbox.
#[derive(Debug)]
pub struct QueueConfirmation {
    delay: Duration,
}

impl QueueConfirmation {
    /// Creates the handler; `delay` simulates rendering the message.
    #[must_use]
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

#[async_trait]
impl AsyncUnitOfWorkEventHandler<OrderPlaced, InMemoryUnitOfWork> for QueueConfirmation {
    async fn execute_async(
        &self,
        event: &OrderPlaced,
        unit_of_work: &InMemoryUnitOfWork,
    ) -> Result<(), DomainError> {
        tokio::time::sleep(self.delay).await;
        unit_of_work.stage("outbox", event)
    }

    fn handler_name(&self) -> &'static str {
        "queue-confirmation"
    }
}

/// Builds the registry for the order flow.
///
/// # Errors
///
/// Returns `DomainError::Resolution` if registration fails.
pub fn order_registry(reject_sequence: Option<u32>) -> Result<HandlerRegistry, DomainError> {
    let registry = HandlerRegistry::new();
    registry.register::<OrderPlaced, InMemoryUnitOfWork>(RecordLedgerEntry)?;
    registry.register::<OrderPlaced, InMemoryUnitOfWork>(ReserveInventory::new(reject_sequence))?;
    registry.register_async::<OrderPlaced, InMemoryUnitOfWork>(QueueConfirmation::new(
        Duration::from_millis(5),
    ))?;
    let (sync_count, async_count) = registry.handler_count::<OrderPlaced, InMemoryUnitOfWork>()?;
    info!(
        event_type = ORDER_PLACED_EVENT_TYPE,
        sync_count, async_count, "order handlers registered"
    );
    Ok(registry)
}

/// Creates the `sequence`-th demo order.
#[must_use]
pub fn place_order(sequence: u32) -> OrderPlaced {
    OrderPlaced {
        order_id: Uuid::new_v4(),
        sequence,
        sku: format!("SKU-{:04}", 100 + sequence),
        quantity: sequence,
        placed_at: Utc::now(),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use unitwork_broker::broker::UnitOfWorkEventBroker;

    use super::*;

    fn tables(unit_of_work: &InMemoryUnitOfWork) -> Vec<&'static str> {
        unit_of_work
            .staged()
            .unwrap()
            .into_iter()
            .map(|change| change.table)
            .collect()
    }

    #[tokio::test]
    async fn test_order_placed_stages_ledger_reservation_and_outbox_rows() {
        // Arrange
        let registry = order_registry(None).unwrap();
        let unit_of_work = Arc::new(InMemoryUnitOfWork::default());
        let broker = UnitOfWorkEventBroker::new(registry, Arc::clone(&unit_of_work));
        let order = place_order(1);

        // Act
        broker.publish_async(&order).await.unwrap();

        // Assert
        assert_eq!(tables(&unit_of_work), vec!["ledger", "reservations", "outbox"]);
        let outbox = &unit_of_work.staged().unwrap()[2];
        assert_eq!(outbox.row["order_id"], order.order_id.to_string());
        assert_eq!(outbox.row["sku"], "SKU-0101");
    }

    #[tokio::test]
    async fn test_rejected_reservation_leaves_only_ledger_row_for_rollback() {
        // Arrange
        let registry = order_registry(Some(2)).unwrap();
        let unit_of_work = Arc::new(InMemoryUnitOfWork::default());
        let broker = UnitOfWorkEventBroker::new(registry, Arc::clone(&unit_of_work));

        // Act
        let result = broker.publish_async(&place_order(2)).await;

        // Assert
        match result {
            Err(DomainError::Validation(message)) => {
                assert!(message.starts_with("insufficient stock for SKU-0102"));
            }
            other => panic!("expected Validation, got {other:?}"),
        }
        assert_eq!(tables(&unit_of_work), vec!["ledger"]);
        assert_eq!(unit_of_work.rollback().unwrap(), 1);
        assert!(unit_of_work.staged().unwrap().is_empty());
    }

    #[test]
    fn test_blocking_publish_outside_runtime_runs_async_confirmation() {
        // Arrange
        let registry = order_registry(None).unwrap();
        let unit_of_work = Arc::new(InMemoryUnitOfWork::default());
        let broker = UnitOfWorkEventBroker::new(registry, Arc::clone(&unit_of_work));

        // Act
        broker.publish(&place_order(3)).unwrap();

        // Assert
        let committed = unit_of_work.commit().unwrap();
        assert_eq!(committed.len(), 3);
        assert_eq!(committed[2].table, "outbox");
    }
}
