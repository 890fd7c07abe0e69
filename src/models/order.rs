use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::models::courier::GeoPoint;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Created,
    Confirmed,
    Preparing,
    Ready,
    PickedUp,
    Delivering,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Delivered | OrderStatus::Cancelled)
    }

    /// Statuses during which the assigned courier's live position may be
    /// read by the order's customer or business.
    pub fn courier_trackable(&self) -> bool {
        matches!(self, OrderStatus::PickedUp | OrderStatus::Delivering)
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            OrderStatus::Created => "created",
            OrderStatus::Confirmed => "confirmed",
            OrderStatus::Preparing => "preparing",
            OrderStatus::Ready => "ready",
            OrderStatus::PickedUp => "picked_up",
            OrderStatus::Delivering => "delivering",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Cancelled => "cancelled",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimelineEvent {
    pub event: String,
    pub at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub meta: Value,
}

/// Address captured when the order is placed; never re-derived from live
/// profile data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddressSnapshot {
    pub text: String,
    pub location: GeoPoint,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemSnapshot {
    pub name: String,
    pub quantity: u32,
    pub unit_price: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Totals {
    pub subtotal: i64,
    pub delivery_fee: i64,
    pub total: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: Uuid,
    pub status: OrderStatus,
    pub courier_id: Option<Uuid>,
    pub business_id: Uuid,
    pub customer_id: Uuid,
    pub city: String,
    pub address_snapshot: AddressSnapshot,
    pub items_snapshot: Vec<ItemSnapshot>,
    pub totals: Totals,
    pub timeline: Vec<TimelineEvent>,
    pub confirmed_at: Option<DateTime<Utc>>,
    pub preparing_at: Option<DateTime<Utc>>,
    pub ready_at: Option<DateTime<Utc>>,
    pub picked_up_at: Option<DateTime<Utc>>,
    pub delivering_at: Option<DateTime<Utc>>,
    pub delivered_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    pub fn new(
        customer_id: Uuid,
        business_id: Uuid,
        city: String,
        address_snapshot: AddressSnapshot,
        items_snapshot: Vec<ItemSnapshot>,
        totals: Totals,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            status: OrderStatus::Created,
            courier_id: None,
            business_id,
            customer_id,
            city,
            address_snapshot,
            items_snapshot,
            totals,
            timeline: vec![TimelineEvent {
                event: "created".to_string(),
                at: now,
                meta: Value::Null,
            }],
            confirmed_at: None,
            preparing_at: None,
            ready_at: None,
            picked_up_at: None,
            delivering_at: None,
            delivered_at: None,
            cancelled_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn append_event(&mut self, event: &str, at: DateTime<Utc>, meta: Value) {
        self.timeline.push(TimelineEvent {
            event: event.to_string(),
            at,
            meta,
        });
        self.updated_at = at;
    }

    /// Sets the timestamp slot matching `status`, first write wins.
    pub fn stamp_once(&mut self, status: OrderStatus, at: DateTime<Utc>) {
        let slot = match status {
            OrderStatus::Confirmed => &mut self.confirmed_at,
            OrderStatus::Preparing => &mut self.preparing_at,
            OrderStatus::Ready => &mut self.ready_at,
            OrderStatus::PickedUp => &mut self.picked_up_at,
            OrderStatus::Delivering => &mut self.delivering_at,
            OrderStatus::Delivered => &mut self.delivered_at,
            OrderStatus::Cancelled => &mut self.cancelled_at,
            OrderStatus::Created => return,
        };
        if slot.is_none() {
            *slot = Some(at);
        }
    }
}
