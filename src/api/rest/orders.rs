use std::sync::Arc;

use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::Json;
use axum::Router;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::engine::dispatch;
use crate::error::AppError;
use crate::location::Source;
use crate::models::actor::{Actor, Role};
use crate::models::courier::LocationSample;
use crate::models::order::{AddressSnapshot, ItemSnapshot, Order, OrderStatus, Totals};
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/orders", post(create_order))
        .route("/orders/:id", get(get_order))
        .route("/orders/:id/status", post(transition_order))
        .route("/orders/:id/courier/location", get(courier_location))
}

#[derive(Deserialize)]
pub struct CreateOrderRequest {
    pub business_id: Uuid,
    pub address: AddressSnapshot,
    pub items: Vec<ItemSnapshot>,
    pub delivery_fee: i64,
}

async fn create_order(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    Json(payload): Json<CreateOrderRequest>,
) -> Result<Json<Order>, AppError> {
    if actor.role != Role::Customer && actor.role != Role::Admin {
        return Err(AppError::Forbidden(
            "only customers place orders".to_string(),
        ));
    }

    if payload.items.is_empty() {
        return Err(AppError::BadRequest("order has no items".to_string()));
    }

    crate::geo::validate_point(&payload.address.location)?;

    let business = state
        .businesses
        .get(&payload.business_id)
        .map(|entry| entry.value().clone())
        .ok_or_else(|| {
            AppError::NotFound(format!("business {} not found", payload.business_id))
        })?;

    // Totals are frozen here; later catalog edits never change the record.
    let subtotal: i64 = payload
        .items
        .iter()
        .map(|item| i64::from(item.quantity) * item.unit_price)
        .sum();
    let totals = Totals {
        subtotal,
        delivery_fee: payload.delivery_fee,
        total: subtotal + payload.delivery_fee,
    };

    let order = Order::new(
        actor.user_id,
        business.id,
        business.city,
        payload.address,
        payload.items,
        totals,
    );

    state.orders.insert(order.clone());
    state.publish_order_event(order.id, order.status, None);

    Ok(Json(order))
}

async fn get_order(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    Path(id): Path<Uuid>,
) -> Result<Json<Order>, AppError> {
    let order = state.orders.get(id)?;

    let is_party = actor.is_admin()
        || order.customer_id == actor.user_id
        || order.business_id == actor.user_id
        || order.courier_id == Some(actor.user_id);
    if !is_party {
        return Err(AppError::Forbidden(
            "actor is not a party to this order".to_string(),
        ));
    }

    Ok(Json(order))
}

#[derive(Deserialize)]
pub struct TransitionRequest {
    pub target: OrderStatus,
    #[serde(default)]
    pub meta: Value,
}

async fn transition_order(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    Path(id): Path<Uuid>,
    Json(payload): Json<TransitionRequest>,
) -> Result<Json<Order>, AppError> {
    let order = dispatch::apply_transition(&state, id, &actor, payload.target, payload.meta)?;
    Ok(Json(order))
}

#[derive(Serialize)]
pub struct CourierLocationResponse {
    pub sample: LocationSample,
    pub source: Source,
}

/// Live courier position for an order. Authorization is re-checked on
/// every poll because the order can leave the trackable window between
/// reads.
async fn courier_location(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    Path(id): Path<Uuid>,
) -> Result<Json<CourierLocationResponse>, AppError> {
    let order = match actor.role {
        Role::Admin => state.orders.get(id)?,
        Role::Customer | Role::Business => {
            state.orders.active_order_between(id, actor.user_id)?
        }
        Role::Courier => {
            return Err(AppError::Forbidden(
                "couriers do not track their own orders".to_string(),
            ))
        }
    };

    let courier_id = order.courier_id.ok_or(AppError::LocationUnavailable)?;

    match state.locations.read(courier_id) {
        Some((sample, source)) => {
            let label = match source {
                Source::Realtime => "realtime",
                Source::Historical => "historical",
            };
            state
                .metrics
                .location_reads_total
                .with_label_values(&[label])
                .inc();
            Ok(Json(CourierLocationResponse { sample, source }))
        }
        None => {
            state
                .metrics
                .location_reads_total
                .with_label_values(&["miss"])
                .inc();
            Err(AppError::LocationUnavailable)
        }
    }
}
