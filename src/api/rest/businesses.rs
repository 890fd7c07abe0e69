use std::sync::Arc;

use axum::extract::State;
use axum::routing::post;
use axum::Json;
use axum::Router;
use chrono::Utc;
use serde::Deserialize;
use uuid::Uuid;

use crate::error::AppError;
use crate::geo::validate_point;
use crate::models::business::Business;
use crate::models::courier::GeoPoint;
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/businesses", post(create_business))
}

#[derive(Deserialize)]
pub struct CreateBusinessRequest {
    pub name: String,
    pub city: String,
    pub location: GeoPoint,
}

async fn create_business(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CreateBusinessRequest>,
) -> Result<Json<Business>, AppError> {
    if payload.name.trim().is_empty() {
        return Err(AppError::BadRequest("name cannot be empty".to_string()));
    }
    if payload.city.trim().is_empty() {
        return Err(AppError::BadRequest("city cannot be empty".to_string()));
    }
    validate_point(&payload.location)?;

    let business = Business {
        id: Uuid::new_v4(),
        name: payload.name,
        city: payload.city,
        location: payload.location,
        created_at: Utc::now(),
    };

    state.businesses.insert(business.id, business.clone());
    Ok(Json(business))
}
