//! Snap-to-network lookup.
//!
//! Matches a projected point to the nearest road-network element within a
//! search radius. The element id it yields is the key for every attribute
//! fetch, so nothing else can run until this has succeeded.

use serde_json::Value;
use vagdata_road_models::{ElementId, ProjectedPoint, ResolveResult};

use crate::UpstreamError;
use crate::registry::{self, SnapDefinition};
use crate::request::{Eval, QueryRequest};
use crate::response;
use crate::transport::RoadDataTransport;

/// Default search radius in meters.
pub const DEFAULT_MAX_DISTANCE_METERS: f64 = 500.0;

/// Snaps `point` to the nearest element within `max_distance_meters`.
///
/// Never fails: transport and parse errors come back as
/// [`ResolveResult::failed`], and an empty search as
/// [`ResolveResult::no_match`].
pub async fn resolve_nearest<T>(
    transport: &T,
    point: ProjectedPoint,
    max_distance_meters: f64,
) -> ResolveResult
where
    T: RoadDataTransport + ?Sized,
{
    resolve_nearest_raw(transport, point, max_distance_meters)
        .await
        .0
}

/// Like [`resolve_nearest`], but also returns the raw response body when
/// one was received.
pub async fn resolve_nearest_raw<T>(
    transport: &T,
    point: ProjectedPoint,
    max_distance_meters: f64,
) -> (ResolveResult, Option<Value>)
where
    T: RoadDataTransport + ?Sized,
{
    if !point.easting.is_finite() || !point.northing.is_finite() {
        return (
            ResolveResult::failed(format!(
                "Cannot snap non-finite point ({}, {})",
                point.easting, point.northing
            )),
            None,
        );
    }
    if !max_distance_meters.is_finite() || max_distance_meters <= 0.0 {
        return (
            ResolveResult::failed(format!(
                "Search radius must be a positive number of meters, got {max_distance_meters}"
            )),
            None,
        );
    }

    let snap = registry::snap_definition();
    let request = snap_request(snap, point, max_distance_meters);

    let body = match transport.query(&request).await {
        Ok(body) => body,
        Err(e) => {
            log::warn!(
                "Snap query failed at ({:.1}, {:.1}): {e}",
                point.easting,
                point.northing
            );
            return (ResolveResult::failed(format!("Road network lookup failed: {e}")), None);
        }
    };

    let result = match parse_snap_response(&body, snap) {
        Ok(result) => result,
        Err(e) => {
            log::warn!("Could not interpret snap response: {e}");
            ResolveResult::failed(format!("Road network lookup failed: {e}"))
        }
    };

    match &result.element_id {
        Some(id) => log::debug!(
            "Snapped ({:.1}, {:.1}) to element {id} at offset {:?}",
            point.easting,
            point.northing,
            result.offset
        ),
        None if result.success => log::debug!(
            "No road element within {max_distance_meters} m of ({:.1}, {:.1})",
            point.easting,
            point.northing
        ),
        None => {}
    }

    (result, Some(body))
}

fn snap_request(
    snap: &SnapDefinition,
    point: ProjectedPoint,
    max_distance_meters: f64,
) -> QueryRequest {
    QueryRequest {
        object_type: snap.object_type.clone(),
        namespace: snap.namespace.clone(),
        schema_version: snap.schema_version.clone(),
        limit: Some(1),
        filter: None,
        include: Vec::new(),
        eval: Some(Eval {
            alias: snap.alias.clone(),
            function: snap.render_function(point.easting, point.northing, max_distance_meters),
        }),
    }
}

/// Interprets a snap response body.
fn parse_snap_response(
    body: &Value,
    snap: &SnapDefinition,
) -> Result<ResolveResult, UpstreamError> {
    let result = response::first_result(body)?;

    let Some(matched) = response::eval_result(result, &snap.alias) else {
        return Ok(ResolveResult::no_match());
    };

    if !matched.is_object() {
        return Err(UpstreamError::Malformed {
            message: format!("{} result is not an object", snap.alias),
        });
    }

    let element_id = response::field(matched, &snap.element_id_field)
        .and_then(ElementId::from_json)
        .ok_or_else(|| UpstreamError::Malformed {
            message: format!("{} result has no {}", snap.alias, snap.element_id_field),
        })?;

    let offset = match response::field(matched, &snap.offset_field) {
        None | Some(Value::Null) => None,
        Some(value) => {
            let offset = response::as_number(value).ok_or_else(|| UpstreamError::Malformed {
                message: format!("{} is not a number: {value}", snap.offset_field),
            })?;
            if !offset.is_finite() || offset < 0.0 {
                return Err(UpstreamError::Malformed {
                    message: format!("{} must be non-negative, got {offset}", snap.offset_field),
                });
            }
            Some(offset)
        }
    };

    let geometry_text = response::field(matched, &snap.geometry_field)
        .and_then(Value::as_str)
        .map(String::from);

    Ok(ResolveResult::matched(element_id, offset, geometry_text))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fake::{self, FakeResponse, FakeTransport};
    use serde_json::json;

    fn point() -> ProjectedPoint {
        ProjectedPoint::new(500_000.0, 6_580_000.0)
    }

    #[tokio::test]
    async fn resolves_matched_element() {
        let transport = FakeTransport::new().with_snap(FakeResponse::Json(fake::snap_body(
            "E123",
            12.34,
            "POINT Z (500010.5 6580002.25 0)",
        )));

        let result = resolve_nearest(&transport, point(), 500.0).await;

        assert!(result.success);
        assert_eq!(result.element_id, Some(ElementId::new("E123")));
        assert_eq!(result.offset, Some(12.34));
        assert_eq!(
            result.snapped_point(),
            Some(ProjectedPoint::new(500_010.5, 6_580_002.25))
        );
    }

    #[tokio::test]
    async fn no_match_is_success_without_element() {
        let transport = FakeTransport::new().with_snap(FakeResponse::Json(fake::no_match_body()));

        let result = resolve_nearest(&transport, point(), 500.0).await;

        assert!(result.success);
        assert!(result.element_id.is_none());
        assert!(result.error_message.is_none());
    }

    #[tokio::test]
    async fn empty_result_collection_is_no_match() {
        let transport =
            FakeTransport::new().with_snap(FakeResponse::Json(json!({"RESPONSE": {"RESULT": []}})));

        let result = resolve_nearest(&transport, point(), 500.0).await;

        assert!(result.success);
        assert!(result.element_id.is_none());
    }

    #[tokio::test]
    async fn server_error_is_failure() {
        let transport = FakeTransport::new().with_snap(FakeResponse::Status(500));

        let result = resolve_nearest(&transport, point(), 500.0).await;

        assert!(!result.success);
        assert!(result.element_id.is_none());
        assert!(result.error_message.unwrap().contains("500"));
    }

    #[tokio::test]
    async fn malformed_body_is_failure() {
        let transport =
            FakeTransport::new().with_snap(FakeResponse::Json(json!({"unexpected": true})));

        let result = resolve_nearest(&transport, point(), 500.0).await;

        assert!(!result.success);
        assert!(result.error_message.unwrap().contains("RESPONSE"));
    }

    #[tokio::test]
    async fn negative_offset_is_failure() {
        let transport =
            FakeTransport::new().with_snap(FakeResponse::Json(fake::snap_body("E1", -1.0, "")));

        let result = resolve_nearest(&transport, point(), 500.0).await;

        assert!(!result.success);
    }

    #[tokio::test]
    async fn match_without_element_id_is_failure() {
        let body = json!({"RESPONSE": {"RESULT": [{
            "INFO": {"EVALRESULT": [{"SnapToRoadNetwork": {
                "Offset": 3.0,
                "Geometry": {"WKT-SWEREF99TM-3D": "POINT (1 2)"}
            }}]}
        }]}});
        let transport = FakeTransport::new().with_snap(FakeResponse::Json(body));

        let result = resolve_nearest(&transport, point(), 500.0).await;

        assert!(!result.success);
        assert!(result.element_id.is_none());
        assert!(result.error_message.unwrap().contains("Element_Id"));
    }

    #[tokio::test]
    async fn integer_element_ids_are_accepted() {
        let body = json!({"RESPONSE": {"RESULT": [{
            "INFO": {"EVALRESULT": [{"SnapToRoadNetwork": {
                "Element_Id": 987_654,
                "Offset": "3.5",
                "Geometry": {"WKT-SWEREF99TM-3D": "POINT (1 2)"}
            }}]}
        }]}});
        let transport = FakeTransport::new().with_snap(FakeResponse::Json(body));

        let result = resolve_nearest(&transport, point(), 500.0).await;

        assert_eq!(result.element_id, Some(ElementId::new("987654")));
        assert_eq!(result.offset, Some(3.5));
        assert_eq!(result.geometry_text.as_deref(), Some("POINT (1 2)"));
    }

    #[tokio::test]
    async fn sends_radius_in_eval_function() {
        let transport = FakeTransport::new().with_snap(FakeResponse::Json(fake::no_match_body()));

        resolve_nearest(&transport, point(), 250.0).await;

        let requests = transport.requests();
        assert_eq!(requests.len(), 1);
        let eval = requests[0].eval.as_ref().unwrap();
        assert!(eval.function.contains("MaxDistance=250"));
        assert_eq!(requests[0].limit, Some(1));
    }

    #[tokio::test]
    async fn invalid_radius_skips_the_network() {
        let transport = FakeTransport::new();

        let result = resolve_nearest(&transport, point(), 0.0).await;

        assert!(!result.success);
        assert!(transport.requests().is_empty());
    }
}
