use std::sync::Arc;

use axum::extract::{Path, State};
use axum::routing::{get, patch, post};
use axum::Json;
use axum::Router;
use chrono::Utc;
use serde::Deserialize;
use uuid::Uuid;

use crate::engine::dispatch;
use crate::error::AppError;
use crate::location::SampleInput;
use crate::models::actor::{Actor, Role};
use crate::models::courier::{Courier, KycStatus, LocationSample};
use crate::models::order::Order;
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/couriers", post(create_courier))
        .route("/couriers/:id/availability", patch(update_availability))
        .route("/courier/orders/claimable", get(list_claimable))
        .route("/courier/orders/:id/claim", post(claim_order))
        .route("/courier/orders/:id/unassign", post(unassign_order))
        .route("/courier/location", post(record_location))
}

#[derive(Deserialize)]
pub struct CreateCourierRequest {
    pub name: String,
    pub city: String,
    #[serde(default)]
    pub is_online: bool,
    pub kyc_status: Option<KycStatus>,
}

async fn create_courier(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    Json(payload): Json<CreateCourierRequest>,
) -> Result<Json<Courier>, AppError> {
    if payload.name.trim().is_empty() {
        return Err(AppError::BadRequest("name cannot be empty".to_string()));
    }
    if payload.city.trim().is_empty() {
        return Err(AppError::BadRequest("city cannot be empty".to_string()));
    }

    // KYC comes out of the verification workflow; only admins may seed an
    // already-approved courier.
    let kyc_status = match payload.kyc_status {
        Some(status) if actor.is_admin() => status,
        Some(_) => {
            return Err(AppError::Forbidden(
                "only admins set kyc status".to_string(),
            ))
        }
        None => KycStatus::Pending,
    };

    let now = Utc::now();
    let courier = Courier {
        id: Uuid::new_v4(),
        name: payload.name,
        city: payload.city,
        is_online: payload.is_online,
        kyc_status,
        created_at: now,
        updated_at: now,
    };

    state.couriers.insert(courier.id, courier.clone());
    Ok(Json(courier))
}

#[derive(Deserialize)]
pub struct UpdateAvailabilityRequest {
    pub is_online: Option<bool>,
    pub city: Option<String>,
    pub kyc_status: Option<KycStatus>,
}

async fn update_availability(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateAvailabilityRequest>,
) -> Result<Json<Courier>, AppError> {
    let is_self = actor.role == Role::Courier && actor.user_id == id;
    if !is_self && !actor.is_admin() {
        return Err(AppError::Forbidden(
            "couriers may only update their own availability".to_string(),
        ));
    }
    if payload.kyc_status.is_some() && !actor.is_admin() {
        return Err(AppError::Forbidden(
            "only admins set kyc status".to_string(),
        ));
    }

    let mut courier = state
        .couriers
        .get_mut(&id)
        .ok_or_else(|| AppError::NotFound(format!("courier {id} not found")))?;

    if let Some(is_online) = payload.is_online {
        courier.is_online = is_online;
    }
    if let Some(city) = payload.city {
        courier.city = city;
    }
    if let Some(kyc_status) = payload.kyc_status {
        courier.kyc_status = kyc_status;
    }
    courier.updated_at = Utc::now();

    Ok(Json(courier.clone()))
}

async fn list_claimable(
    State(state): State<Arc<AppState>>,
    actor: Actor,
) -> Result<Json<Vec<Order>>, AppError> {
    if actor.role != Role::Courier {
        return Err(AppError::Forbidden(
            "only couriers list claimable orders".to_string(),
        ));
    }

    let courier = dispatch::eligible_courier(&state, actor.user_id)?;
    Ok(Json(dispatch::list_claimable(&state, &courier)))
}

async fn claim_order(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    Path(id): Path<Uuid>,
) -> Result<Json<Order>, AppError> {
    if actor.role != Role::Courier {
        return Err(AppError::Forbidden("only couriers claim orders".to_string()));
    }

    let courier = dispatch::eligible_courier(&state, actor.user_id)?;
    let order = dispatch::claim(&state, id, &courier)?;
    Ok(Json(order))
}

async fn unassign_order(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    Path(id): Path<Uuid>,
) -> Result<Json<Order>, AppError> {
    if !actor.is_admin() {
        return Err(AppError::Forbidden("only admins unassign orders".to_string()));
    }

    let order = dispatch::unassign(&state, id)?;
    Ok(Json(order))
}

async fn record_location(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    Json(payload): Json<SampleInput>,
) -> Result<Json<LocationSample>, AppError> {
    if actor.role != Role::Courier {
        return Err(AppError::Forbidden(
            "only couriers post location samples".to_string(),
        ));
    }
    if !state.couriers.contains_key(&actor.user_id) {
        return Err(AppError::NotFound(format!(
            "courier {} not found",
            actor.user_id
        )));
    }

    let sample = state.locations.record(actor.user_id, payload)?;
    state.metrics.location_samples_total.inc();
    Ok(Json(sample))
}
