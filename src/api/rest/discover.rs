use std::sync::Arc;

use axum::extract::{Query, State};
use axum::routing::get;
use axum::Json;
use axum::Router;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::engine::dispatch;
use crate::error::AppError;
use crate::geo::{validate_point, validate_radius, within_radius};
use crate::models::courier::GeoPoint;
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/discover/nearby", get(nearby))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NearbyKind {
    Businesses,
    ReadyOrders,
}

#[derive(Deserialize)]
pub struct NearbyQuery {
    pub lat: f64,
    pub lng: f64,
    pub radius_m: f64,
    pub kind: Option<NearbyKind>,
}

#[derive(Serialize)]
pub struct NearbyHit {
    pub id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub city: String,
    pub location: GeoPoint,
    pub distance_m: f64,
}

async fn nearby(
    State(state): State<Arc<AppState>>,
    Query(query): Query<NearbyQuery>,
) -> Result<Json<Vec<NearbyHit>>, AppError> {
    let point = GeoPoint {
        lat: query.lat,
        lng: query.lng,
    };
    validate_point(&point)?;
    validate_radius(query.radius_m, state.max_search_radius_m)?;

    let candidates: Vec<(NearbyHit, GeoPoint)> = match query.kind.unwrap_or(NearbyKind::Businesses)
    {
        NearbyKind::Businesses => state
            .businesses
            .iter()
            .map(|entry| {
                let business = entry.value();
                (
                    NearbyHit {
                        id: business.id,
                        name: Some(business.name.clone()),
                        city: business.city.clone(),
                        location: business.location,
                        distance_m: 0.0,
                    },
                    business.location,
                )
            })
            .collect(),
        NearbyKind::ReadyOrders => state
            .orders
            .ready_anywhere()
            .into_iter()
            .map(|order| {
                let at = dispatch::pickup_point(&state, &order);
                (
                    NearbyHit {
                        id: order.id,
                        name: None,
                        city: order.city.clone(),
                        location: at,
                        distance_m: 0.0,
                    },
                    at,
                )
            })
            .collect(),
    };

    let hits = within_radius(&point, query.radius_m, candidates)
        .into_iter()
        .map(|(mut hit, distance)| {
            hit.distance_m = distance;
            hit
        })
        .collect();

    Ok(Json(hits))
}
