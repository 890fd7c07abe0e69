use std::time::Instant;

use serde_json::Value;
use tracing::{info, warn};
use uuid::Uuid;

use crate::engine::transitions;
use crate::error::AppError;
use crate::geo::within_radius;
use crate::models::actor::Actor;
use crate::models::courier::Courier;
use crate::models::order::{Order, OrderStatus};
use crate::state::AppState;

/// Loads the courier and enforces claim eligibility: online, KYC-approved.
/// City matching happens per order.
pub fn eligible_courier(state: &AppState, courier_id: Uuid) -> Result<Courier, AppError> {
    let courier = state
        .couriers
        .get(&courier_id)
        .map(|entry| entry.value().clone())
        .ok_or_else(|| AppError::NotFound(format!("courier {courier_id} not found")))?;

    if courier.is_eligible() {
        Ok(courier)
    } else {
        Err(AppError::NotEligible)
    }
}

/// Where a courier travels first for an order: the business when we know
/// it, otherwise the delivery address captured at creation.
pub fn pickup_point(state: &AppState, order: &Order) -> crate::models::courier::GeoPoint {
    state
        .businesses
        .get(&order.business_id)
        .map(|entry| entry.value().location)
        .unwrap_or(order.address_snapshot.location)
}

/// Orders the courier could claim right now: `ready`, unassigned, same
/// city, FIFO by `ready_at` so nothing starves. When the cache knows where
/// the courier is and a claimable radius is configured, listing is bounded
/// to that radius.
pub fn list_claimable(state: &AppState, courier: &Courier) -> Vec<Order> {
    let mut orders = state.orders.ready_unclaimed(&courier.city);

    if let (Some(radius_m), Some(position)) = (
        state.claimable_radius_m,
        state.locations.last_known_position(courier.id),
    ) {
        let tagged = orders
            .into_iter()
            .map(|order| {
                let at = pickup_point(state, &order);
                (order, at)
            })
            .collect();
        orders = within_radius(&position, radius_m, tagged)
            .into_iter()
            .map(|(order, _)| order)
            .collect();
    }

    orders.sort_by_key(|order| order.ready_at);
    orders
}

/// Claims `order_id` for `courier`. The store's conditional update is the
/// arbiter; this layer adds city eligibility, metrics and event fanout.
pub fn claim(state: &AppState, order_id: Uuid, courier: &Courier) -> Result<Order, AppError> {
    let start = Instant::now();

    let current = state.orders.get(order_id)?;
    if current.city != courier.city {
        return Err(AppError::NotEligible);
    }

    let result = state.orders.claim(order_id, courier.id);
    let outcome = match &result {
        Ok(_) => "won",
        Err(AppError::AlreadyAssigned) => "already_assigned",
        Err(AppError::NotReady) => "not_ready",
        Err(_) => "error",
    };

    let elapsed = start.elapsed().as_secs_f64();
    state
        .metrics
        .claim_latency_seconds
        .with_label_values(&[outcome])
        .observe(elapsed);
    state.metrics.claims_total.with_label_values(&[outcome]).inc();

    match &result {
        Ok(order) => {
            state.publish_order_event(order.id, order.status, order.courier_id);
            info!(order_id = %order.id, courier_id = %courier.id, "order claimed");
        }
        Err(err) => {
            warn!(order_id = %order_id, courier_id = %courier.id, error = %err, "claim rejected");
        }
    }

    result
}

/// Admin reversal of a claim; exempt from the claim's precondition.
pub fn unassign(state: &AppState, order_id: Uuid) -> Result<Order, AppError> {
    let order = state.orders.unassign(order_id)?;
    state.publish_order_event(order.id, order.status, None);
    info!(order_id = %order.id, "order unassigned");
    Ok(order)
}

/// Runs one status transition under the record's entry lock and fans out
/// the result.
pub fn apply_transition(
    state: &AppState,
    order_id: Uuid,
    actor: &Actor,
    target: OrderStatus,
    meta: Value,
) -> Result<Order, AppError> {
    let result = state.orders.update(order_id, |order| {
        let changed = transitions::transition(order, actor, target, meta)?;
        Ok((order.clone(), changed))
    });

    match result {
        Ok((order, changed)) => {
            let outcome = if changed { "applied" } else { "noop" };
            state
                .metrics
                .transitions_total
                .with_label_values(&[outcome])
                .inc();
            if changed {
                state.publish_order_event(order.id, order.status, order.courier_id);
                info!(order_id = %order.id, status = %order.status, "order transitioned");
            }
            Ok(order)
        }
        Err(err) => {
            state
                .metrics
                .transitions_total
                .with_label_values(&["rejected"])
                .inc();
            Err(err)
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeDelta, Utc};
    use uuid::Uuid;

    use super::{claim, eligible_courier, list_claimable};
    use crate::config::Config;
    use crate::error::AppError;
    use crate::models::courier::{Courier, GeoPoint, KycStatus};
    use crate::models::order::{AddressSnapshot, Order, OrderStatus, Totals};
    use crate::state::AppState;

    fn test_state() -> AppState {
        AppState::new(&Config {
            http_port: 0,
            log_level: "info".to_string(),
            event_buffer_size: 16,
            location_ttl_secs: 600,
            location_history_cap: 100,
            hot_sweep_interval_secs: 60,
            max_search_radius_m: 50_000.0,
            claimable_radius_m: None,
        })
    }

    fn courier(city: &str, online: bool, kyc: KycStatus) -> Courier {
        let now = Utc::now();
        Courier {
            id: Uuid::new_v4(),
            name: "test courier".to_string(),
            city: city.to_string(),
            is_online: online,
            kyc_status: kyc,
            created_at: now,
            updated_at: now,
        }
    }

    fn ready_order(city: &str, ready_offset_secs: i64) -> Order {
        let mut order = Order::new(
            Uuid::new_v4(),
            Uuid::new_v4(),
            city.to_string(),
            AddressSnapshot {
                text: "pickup point".to_string(),
                location: GeoPoint {
                    lat: 41.0082,
                    lng: 28.9784,
                },
            },
            Vec::new(),
            Totals {
                subtotal: 800,
                delivery_fee: 80,
                total: 880,
            },
        );
        order.status = OrderStatus::Ready;
        order.ready_at = Some(Utc::now() - TimeDelta::seconds(ready_offset_secs));
        order
    }

    #[test]
    fn offline_or_unapproved_couriers_are_not_eligible() {
        let state = test_state();

        let offline = courier("istanbul", false, KycStatus::Approved);
        state.couriers.insert(offline.id, offline.clone());
        assert!(matches!(
            eligible_courier(&state, offline.id),
            Err(AppError::NotEligible)
        ));

        let pending = courier("istanbul", true, KycStatus::Pending);
        state.couriers.insert(pending.id, pending.clone());
        assert!(matches!(
            eligible_courier(&state, pending.id),
            Err(AppError::NotEligible)
        ));

        let ok = courier("istanbul", true, KycStatus::Approved);
        state.couriers.insert(ok.id, ok.clone());
        assert!(eligible_courier(&state, ok.id).is_ok());
    }

    #[test]
    fn claimable_listing_is_fifo_by_ready_at() {
        let state = test_state();
        let rider = courier("istanbul", true, KycStatus::Approved);

        let newest = ready_order("istanbul", 10);
        let oldest = ready_order("istanbul", 300);
        let middle = ready_order("istanbul", 60);
        let expected = vec![oldest.id, middle.id, newest.id];

        state.orders.insert(newest);
        state.orders.insert(oldest);
        state.orders.insert(middle);
        state.orders.insert(ready_order("ankara", 600));

        let listed: Vec<Uuid> = list_claimable(&state, &rider)
            .into_iter()
            .map(|order| order.id)
            .collect();
        assert_eq!(listed, expected);
    }

    #[test]
    fn claim_rejects_city_mismatch() {
        let state = test_state();
        let rider = courier("ankara", true, KycStatus::Approved);
        let order = ready_order("istanbul", 30);
        let order_id = order.id;
        state.orders.insert(order);

        let result = claim(&state, order_id, &rider);
        assert!(matches!(result, Err(AppError::NotEligible)));
        assert_eq!(state.orders.get(order_id).unwrap().courier_id, None);
    }

    #[test]
    fn claim_after_cancellation_is_not_ready() {
        let state = test_state();
        let rider = courier("istanbul", true, KycStatus::Approved);

        let mut order = ready_order("istanbul", 30);
        order.status = OrderStatus::Cancelled;
        let order_id = order.id;
        state.orders.insert(order);

        let result = claim(&state, order_id, &rider);
        assert!(matches!(result, Err(AppError::NotReady)));
    }
}
