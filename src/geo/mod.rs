use crate::error::AppError;
use crate::models::courier::GeoPoint;

const EARTH_RADIUS_M: f64 = 6_371_000.0;

pub fn haversine_m(a: &GeoPoint, b: &GeoPoint) -> f64 {
    let lat1 = a.lat.to_radians();
    let lat2 = b.lat.to_radians();
    let delta_lat = (b.lat - a.lat).to_radians();
    let delta_lng = (b.lng - a.lng).to_radians();

    let sin_lat = (delta_lat / 2.0).sin();
    let sin_lng = (delta_lng / 2.0).sin();

    let haversine = sin_lat * sin_lat + lat1.cos() * lat2.cos() * sin_lng * sin_lng;
    let central_angle = 2.0 * haversine.sqrt().asin();

    EARTH_RADIUS_M * central_angle
}

pub fn validate_point(point: &GeoPoint) -> Result<(), AppError> {
    if !point.lat.is_finite() || !(-90.0..=90.0).contains(&point.lat) {
        return Err(AppError::BadRequest(format!(
            "latitude {} out of range [-90, 90]",
            point.lat
        )));
    }
    if !point.lng.is_finite() || !(-180.0..=180.0).contains(&point.lng) {
        return Err(AppError::BadRequest(format!(
            "longitude {} out of range [-180, 180]",
            point.lng
        )));
    }
    Ok(())
}

pub fn validate_radius(radius_m: f64, max_radius_m: f64) -> Result<(), AppError> {
    if !radius_m.is_finite() || radius_m <= 0.0 {
        return Err(AppError::BadRequest(
            "radius_m must be positive".to_string(),
        ));
    }
    if radius_m > max_radius_m {
        return Err(AppError::BadRequest(format!(
            "radius_m {radius_m} exceeds maximum {max_radius_m}"
        )));
    }
    Ok(())
}

/// Keeps entries within `radius_m` of `point`, sorted by increasing distance.
pub fn within_radius<T>(
    point: &GeoPoint,
    radius_m: f64,
    entries: Vec<(T, GeoPoint)>,
) -> Vec<(T, f64)> {
    let mut hits: Vec<(T, f64)> = entries
        .into_iter()
        .filter_map(|(entity, at)| {
            let distance = haversine_m(point, &at);
            (distance <= radius_m).then_some((entity, distance))
        })
        .collect();

    hits.sort_by(|a, b| a.1.total_cmp(&b.1));
    hits
}
