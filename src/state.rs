use std::time::Duration;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::config::Config;
use crate::location::LocationCache;
use crate::models::business::Business;
use crate::models::courier::Courier;
use crate::models::order::OrderStatus;
use crate::observability::metrics::Metrics;
use crate::store::orders::OrderStore;

/// Event fanned out to WebSocket subscribers on every order mutation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderEvent {
    pub order_id: Uuid,
    pub status: OrderStatus,
    pub courier_id: Option<Uuid>,
    pub at: DateTime<Utc>,
}

pub struct AppState {
    pub orders: OrderStore,
    pub couriers: DashMap<Uuid, Courier>,
    pub businesses: DashMap<Uuid, Business>,
    pub locations: LocationCache,
    pub order_events_tx: broadcast::Sender<OrderEvent>,
    pub metrics: Metrics,
    pub max_search_radius_m: f64,
    pub claimable_radius_m: Option<f64>,
}

impl AppState {
    pub fn new(config: &Config) -> Self {
        let (order_events_tx, _unused_rx) = broadcast::channel(config.event_buffer_size);

        Self {
            orders: OrderStore::new(),
            couriers: DashMap::new(),
            businesses: DashMap::new(),
            locations: LocationCache::new(
                Duration::from_secs(config.location_ttl_secs),
                config.location_history_cap,
            ),
            order_events_tx,
            metrics: Metrics::new(),
            max_search_radius_m: config.max_search_radius_m,
            claimable_radius_m: config.claimable_radius_m,
        }
    }

    pub fn publish_order_event(&self, order_id: Uuid, status: OrderStatus, courier_id: Option<Uuid>) {
        // Send only fails when nobody is subscribed, which is fine.
        let _ = self.order_events_tx.send(OrderEvent {
            order_id,
            status,
            courier_id,
            at: Utc::now(),
        });
    }
}
