//! Unitwork demo entry point.
//!
//! Places a handful of orders. Each order gets its own unit of work and a
//! broker bound to it; the order is committed when every handler succeeds
//! and rolled back when one fails.

use std::sync::Arc;

use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;
use unitwork_broker::broker::UnitOfWorkEventBroker;
use unitwork_broker::registry::HandlerRegistry;
use unitwork_core::error::DomainError;

mod config;
mod error;
mod orders;

use config::{DemoConfig, LogFormat, PublishMode};
use error::AppError;
use orders::{InMemoryUnitOfWork, OrderPlaced};

type OrderBroker = UnitOfWorkEventBroker<InMemoryUnitOfWork, Arc<HandlerRegistry>>;

#[tokio::main]
async fn main() -> Result<(), AppError> {
    let config = DemoConfig::from_env()?;

    // Initialize tracing subscriber.
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    match config.log_format {
        LogFormat::Json => tracing_subscriber::fmt().with_env_filter(filter).json().init(),
        LogFormat::Pretty => tracing_subscriber::fmt().with_env_filter(filter).pretty().init(),
    }

    info!(?config, "Starting unitwork demo");

    let registry = Arc::new(orders::order_registry(config.fail_on_order)?);

    let mut committed = 0_u32;
    let mut rolled_back = 0_u32;
    for sequence in 1..=config.order_count {
        let order = orders::place_order(sequence);
        let unit_of_work = Arc::new(InMemoryUnitOfWork::default());
        let broker = UnitOfWorkEventBroker::new(Arc::clone(&registry), Arc::clone(&unit_of_work));

        match publish(broker, order.clone(), config.publish_mode).await? {
            Ok(()) => {
                let rows = unit_of_work.commit()?;
                let rendered = serde_json::to_string(&rows)?;
                debug!(rows = %rendered, "committed rows");
                info!(order_id = %order.order_id, rows = rows.len(), "order committed");
                committed += 1;
            }
            Err(err) => {
                let pending: Vec<&str> = unit_of_work
                    .staged()?
                    .iter()
                    .map(|change| change.table)
                    .collect();
                debug!(?pending, "discarding staged rows");
                let discarded = unit_of_work.rollback()?;
                warn!(order_id = %order.order_id, error = %err, discarded, "order rolled back");
                rolled_back += 1;
            }
        }
    }

    info!(committed, rolled_back, "demo finished");

    Ok(())
}

/// Publishes `order` through the configured broker operation. The outer
/// result reports task failures; the inner one is the publish outcome.
async fn publish(
    broker: OrderBroker,
    order: OrderPlaced,
    mode: PublishMode,
) -> Result<Result<(), DomainError>, AppError> {
    match mode {
        PublishMode::Cooperative => Ok(broker.publish_async(&order).await),
        PublishMode::Blocking => {
            Ok(tokio::task::spawn_blocking(move || broker.publish(&order)).await?)
        }
    }
}
