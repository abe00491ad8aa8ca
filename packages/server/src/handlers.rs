//! HTTP handler functions for the road lookup API.

use actix_web::{HttpResponse, web};
use vagdata_road_models::AttributeKind;
use vagdata_server_models::{
    ApiAttributeKind, ApiError, ApiHealth, PointQueryParams, RoadDataQueryParams,
};
use vagdata_trafikverket::registry;

use crate::AppState;

/// `GET /api/health`
pub async fn health() -> HttpResponse {
    HttpResponse::Ok().json(ApiHealth {
        healthy: true,
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// `GET /api/attribute-kinds`
///
/// Lists every registered attribute kind and whether this server fetches it.
pub async fn attribute_kinds(state: web::Data<AppState>) -> HttpResponse {
    let enabled = &state.service.options().kinds;
    let kinds: Vec<ApiAttributeKind> = AttributeKind::all()
        .iter()
        .filter_map(|kind| registry::try_attribute(*kind))
        .map(|definition| ApiAttributeKind {
            kind: definition.kind,
            label: definition.kind.label().to_string(),
            object_type: definition.object_type.clone(),
            primary_field: definition.primary_field.clone(),
            enabled: enabled.contains(&definition.kind),
        })
        .collect();

    HttpResponse::Ok().json(kinds)
}

/// `GET /api/project`
///
/// Projects a WGS 84 point to SWEREF 99 TM.
pub async fn project(params: web::Query<PointQueryParams>) -> HttpResponse {
    match vagdata_projection::to_projected(params.geo_point()) {
        Ok(point) => HttpResponse::Ok().json(point),
        Err(e) => HttpResponse::BadRequest().json(ApiError::new(e.to_string())),
    }
}

/// `GET /api/road-data`
///
/// Runs the full lookup for a clicked point. Partial upstream failures
/// still answer `200`.
pub async fn road_data(
    state: web::Data<AppState>,
    params: web::Query<RoadDataQueryParams>,
) -> HttpResponse {
    let max_distance = params
        .max_distance
        .unwrap_or(state.service.options().max_distance_meters);
    if !max_distance.is_finite() || max_distance <= 0.0 {
        return HttpResponse::BadRequest().json(ApiError::new(format!(
            "maxDistance must be a positive number of meters, got {max_distance}"
        )));
    }

    let point = match vagdata_projection::to_projected(params.geo_point()) {
        Ok(point) => point,
        Err(e) => {
            log::debug!("Rejected road-data request: {e}");
            return HttpResponse::BadRequest().json(ApiError::new(e.to_string()));
        }
    };

    let result = state
        .service
        .get_road_data_within(point, max_distance)
        .await;

    HttpResponse::Ok().json(result)
}
