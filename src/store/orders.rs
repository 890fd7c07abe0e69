use chrono::Utc;
use dashmap::DashMap;
use serde_json::json;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::order::{Order, OrderStatus};

/// Record store for orders. The single source of truth for order state;
/// everything else (hot location rows, broadcast events) can be rebuilt
/// from it.
///
/// `DashMap::get_mut` holds the entry's shard lock for the lifetime of the
/// guard, which is what makes `claim` a genuine conditional update rather
/// than a racy read-check-write.
#[derive(Default)]
pub struct OrderStore {
    records: DashMap<Uuid, Order>,
}

impl OrderStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, order: Order) {
        self.records.insert(order.id, order);
    }

    pub fn get(&self, id: Uuid) -> Result<Order, AppError> {
        self.records
            .get(&id)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| AppError::NotFound(format!("order {id} not found")))
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Runs `f` against the stored record under its entry lock. `f` must
    /// leave the record untouched when it errors.
    pub fn update<R>(
        &self,
        id: Uuid,
        f: impl FnOnce(&mut Order) -> Result<R, AppError>,
    ) -> Result<R, AppError> {
        let mut entry = self
            .records
            .get_mut(&id)
            .ok_or_else(|| AppError::NotFound(format!("order {id} not found")))?;
        f(entry.value_mut())
    }

    /// The atomic claim: assign `courier_id` and advance to `picked_up`
    /// only if the order is still `ready` and unassigned. Exactly one of
    /// any number of racing callers succeeds.
    pub fn claim(&self, order_id: Uuid, courier_id: Uuid) -> Result<Order, AppError> {
        let mut entry = self
            .records
            .get_mut(&order_id)
            .ok_or_else(|| AppError::NotFound(format!("order {order_id} not found")))?;
        let order = entry.value_mut();

        match (order.status, order.courier_id) {
            (OrderStatus::Ready, None) => {
                let now = Utc::now();
                order.courier_id = Some(courier_id);
                order.status = OrderStatus::PickedUp;
                order.stamp_once(OrderStatus::PickedUp, now);
                order.append_event("picked_up", now, json!({ "courier_id": courier_id }));
                Ok(order.clone())
            }
            // The winner retrying its own claim gets its order back.
            (OrderStatus::PickedUp, Some(holder)) if holder == courier_id => Ok(order.clone()),
            (_, Some(_)) => Err(AppError::AlreadyAssigned),
            (_, None) => Err(AppError::NotReady),
        }
    }

    /// Privileged reversal of a claim. Not CAS-guarded; only valid while
    /// the courier still holds the order.
    pub fn unassign(&self, order_id: Uuid) -> Result<Order, AppError> {
        let mut entry = self
            .records
            .get_mut(&order_id)
            .ok_or_else(|| AppError::NotFound(format!("order {order_id} not found")))?;
        let order = entry.value_mut();

        if !matches!(
            order.status,
            OrderStatus::PickedUp | OrderStatus::Delivering
        ) {
            return Err(AppError::BadRequest(format!(
                "cannot unassign order in status {}",
                order.status
            )));
        }

        let previous = order.courier_id.take();
        let now = Utc::now();
        order.status = OrderStatus::Ready;
        order.append_event("unassigned", now, json!({ "courier_id": previous }));
        Ok(order.clone())
    }

    /// Orders a courier could claim: `ready`, unassigned, in `city`.
    /// Callers apply radius filtering and FIFO ordering on top.
    pub fn ready_unclaimed(&self, city: &str) -> Vec<Order> {
        self.records
            .iter()
            .filter(|entry| {
                let order = entry.value();
                order.status == OrderStatus::Ready
                    && order.courier_id.is_none()
                    && order.city == city
            })
            .map(|entry| entry.value().clone())
            .collect()
    }

    /// All `ready`, unassigned orders regardless of city, for discovery
    /// queries that bound cost by radius instead.
    pub fn ready_anywhere(&self) -> Vec<Order> {
        self.records
            .iter()
            .filter(|entry| {
                let order = entry.value();
                order.status == OrderStatus::Ready && order.courier_id.is_none()
            })
            .map(|entry| entry.value().clone())
            .collect()
    }

    /// Active orders joining `user` (as customer or business) with a
    /// courier, used for location-read authorization.
    pub fn active_order_between(&self, order_id: Uuid, user_id: Uuid) -> Result<Order, AppError> {
        let order = self.get(order_id)?;
        let is_party = order.customer_id == user_id || order.business_id == user_id;
        if is_party && order.status.courier_trackable() {
            Ok(order)
        } else {
            Err(AppError::Forbidden(
                "no active order with this courier".to_string(),
            ))
        }
    }
}
