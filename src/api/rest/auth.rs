use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::actor::{Actor, Role};

/// Pulls the resolved caller identity out of the `x-user-id` / `x-role`
/// headers. Session and token mechanics live in the identity collaborator
/// upstream; by the time a request reaches this service those headers are
/// trusted.
#[axum::async_trait]
impl<S> FromRequestParts<S> for Actor
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user_id = header(parts, "x-user-id")?
            .parse::<Uuid>()
            .map_err(|_| AppError::Forbidden("invalid x-user-id header".to_string()))?;

        let role = header(parts, "x-role")?
            .parse::<Role>()
            .map_err(|_| AppError::Forbidden("invalid x-role header".to_string()))?;

        Ok(Actor { user_id, role })
    }
}

fn header<'a>(parts: &'a Parts, name: &str) -> Result<&'a str, AppError> {
    parts
        .headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .ok_or_else(|| AppError::Forbidden(format!("missing {name} header")))
}
