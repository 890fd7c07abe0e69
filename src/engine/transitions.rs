use serde_json::Value;

use crate::error::AppError;
use crate::models::actor::{Actor, Role};
use crate::models::order::{Order, OrderStatus};

/// The single allowed-transition table. Every status check in the service
/// goes through here; handlers never re-implement validity rules.
pub fn allowed_targets(current: OrderStatus, role: Role) -> &'static [OrderStatus] {
    use OrderStatus::*;

    match (current, role) {
        (Created, Role::Business) => &[Confirmed, Cancelled],
        (Confirmed, Role::Business) => &[Preparing, Cancelled],
        (Preparing, Role::Business) => &[Ready, Cancelled],
        (Ready, Role::Business) => &[Cancelled],
        (PickedUp, Role::Business) | (Delivering, Role::Business) => &[],

        (Ready, Role::Courier) => &[PickedUp],
        (PickedUp, Role::Courier) => &[Delivering],
        (Delivering, Role::Courier) => &[Delivered],

        // Customers may back out any time before the order reaches a
        // terminal state.
        (_, Role::Customer) if !current.is_terminal() => &[Cancelled],

        (Created, Role::Admin) => &[Confirmed, Cancelled],
        (Confirmed, Role::Admin) => &[Preparing, Cancelled],
        (Preparing, Role::Admin) => &[Ready, Cancelled],
        (Ready, Role::Admin) => &[PickedUp, Cancelled],
        (PickedUp, Role::Admin) => &[Delivering, Cancelled],
        (Delivering, Role::Admin) => &[Delivered, Cancelled],

        // Terminal states have no outgoing edges for anyone.
        (Delivered, _) | (Cancelled, _) => &[],
        _ => &[],
    }
}

fn role_name(role: Role) -> &'static str {
    match role {
        Role::Customer => "customer",
        Role::Business => "business",
        Role::Courier => "courier",
        Role::Admin => "admin",
    }
}

fn check_ownership(order: &Order, actor: &Actor) -> Result<(), AppError> {
    let owns = match actor.role {
        Role::Admin => true,
        Role::Business => order.business_id == actor.user_id,
        Role::Customer => order.customer_id == actor.user_id,
        Role::Courier => order.courier_id == Some(actor.user_id),
    };

    if owns {
        Ok(())
    } else {
        Err(AppError::Forbidden(
            "actor is not a party to this order".to_string(),
        ))
    }
}

/// Applies one status transition in place. Returns `true` when the record
/// changed, `false` for the idempotent same-status no-op. The order is left
/// untouched on any error.
pub fn transition(
    order: &mut Order,
    actor: &Actor,
    target: OrderStatus,
    meta: Value,
) -> Result<bool, AppError> {
    check_ownership(order, actor)?;

    // Retried requests land here often; same target is a clean no-op.
    if order.status == target {
        return Ok(false);
    }

    if !allowed_targets(order.status, actor.role).contains(&target) {
        return Err(AppError::InvalidTransition {
            from: order.status,
            to: target,
            role: role_name(actor.role),
        });
    }

    let now = chrono::Utc::now();
    order.status = target;
    order.stamp_once(target, now);
    order.append_event(&target.to_string(), now, meta);
    Ok(true)
}

#[cfg(test)]
mod tests {
    use serde_json::Value;
    use uuid::Uuid;

    use super::{allowed_targets, transition};
    use crate::error::AppError;
    use crate::models::actor::{Actor, Role};
    use crate::models::courier::GeoPoint;
    use crate::models::order::{AddressSnapshot, Order, OrderStatus, Totals};

    const ALL_STATUSES: [OrderStatus; 8] = [
        OrderStatus::Created,
        OrderStatus::Confirmed,
        OrderStatus::Preparing,
        OrderStatus::Ready,
        OrderStatus::PickedUp,
        OrderStatus::Delivering,
        OrderStatus::Delivered,
        OrderStatus::Cancelled,
    ];

    const ALL_ROLES: [Role; 4] = [Role::Customer, Role::Business, Role::Courier, Role::Admin];

    fn test_order(customer_id: Uuid, business_id: Uuid) -> Order {
        Order::new(
            customer_id,
            business_id,
            "istanbul".to_string(),
            AddressSnapshot {
                text: "test address".to_string(),
                location: GeoPoint {
                    lat: 41.0082,
                    lng: 28.9784,
                },
            },
            Vec::new(),
            Totals {
                subtotal: 1000,
                delivery_fee: 100,
                total: 1100,
            },
        )
    }

    #[test]
    fn business_advances_through_preparation() {
        let business_id = Uuid::new_v4();
        let mut order = test_order(Uuid::new_v4(), business_id);
        let actor = Actor {
            user_id: business_id,
            role: Role::Business,
        };

        for target in [
            OrderStatus::Confirmed,
            OrderStatus::Preparing,
            OrderStatus::Ready,
        ] {
            assert!(transition(&mut order, &actor, target, Value::Null).unwrap());
            assert_eq!(order.status, target);
        }

        assert!(order.confirmed_at.is_some());
        assert!(order.ready_at.is_some());
        assert_eq!(order.timeline.len(), 4); // created + 3 transitions
    }

    #[test]
    fn same_status_transition_is_idempotent() {
        let business_id = Uuid::new_v4();
        let mut order = test_order(Uuid::new_v4(), business_id);
        let actor = Actor {
            user_id: business_id,
            role: Role::Business,
        };

        transition(&mut order, &actor, OrderStatus::Confirmed, Value::Null).unwrap();
        let stamp = order.confirmed_at;
        let timeline_len = order.timeline.len();

        let changed =
            transition(&mut order, &actor, OrderStatus::Confirmed, Value::Null).unwrap();

        assert!(!changed);
        assert_eq!(order.timeline.len(), timeline_len);
        assert_eq!(order.confirmed_at, stamp);
    }

    #[test]
    fn disallowed_combinations_leave_order_untouched() {
        for current in ALL_STATUSES {
            for role in ALL_ROLES {
                for target in ALL_STATUSES {
                    if target == current || allowed_targets(current, role).contains(&target) {
                        continue;
                    }

                    let party = Uuid::new_v4();
                    let mut order = test_order(party, party);
                    order.status = current;
                    order.courier_id = Some(party);
                    let before = serde_json::to_string(&order).unwrap();

                    let actor = Actor {
                        user_id: party,
                        role,
                    };
                    let result = transition(&mut order, &actor, target, Value::Null);

                    assert!(
                        matches!(result, Err(AppError::InvalidTransition { .. })),
                        "{current:?} -> {target:?} as {role:?} should be rejected"
                    );
                    assert_eq!(before, serde_json::to_string(&order).unwrap());
                }
            }
        }
    }

    #[test]
    fn terminal_states_are_closed() {
        for terminal in [OrderStatus::Delivered, OrderStatus::Cancelled] {
            for role in ALL_ROLES {
                assert!(allowed_targets(terminal, role).is_empty());
            }
        }
    }

    #[test]
    fn stranger_cannot_transition() {
        let mut order = test_order(Uuid::new_v4(), Uuid::new_v4());
        let stranger = Actor {
            user_id: Uuid::new_v4(),
            role: Role::Business,
        };

        let result = transition(&mut order, &stranger, OrderStatus::Confirmed, Value::Null);
        assert!(matches!(result, Err(AppError::Forbidden(_))));
    }

    #[test]
    fn customer_cancels_any_non_terminal_state() {
        let customer_id = Uuid::new_v4();
        let actor = Actor {
            user_id: customer_id,
            role: Role::Customer,
        };

        for current in ALL_STATUSES {
            let mut order = test_order(customer_id, Uuid::new_v4());
            order.status = current;
            let result = transition(&mut order, &actor, OrderStatus::Cancelled, Value::Null);

            if current.is_terminal() || current == OrderStatus::Cancelled {
                assert!(result.is_err() || !result.unwrap());
            } else {
                assert!(result.unwrap());
                assert_eq!(order.status, OrderStatus::Cancelled);
                assert!(order.cancelled_at.is_some());
            }
        }
    }
}
