//! The per-click pipeline: snap, fan out, fall back, merge.

use std::collections::BTreeMap;

use chrono::Utc;
use futures::future::join_all;
use serde_json::Value;
use vagdata_projection::ProjectionError;
use vagdata_road_models::{
    AggregateResult, AttributeKind, AttributeResult, ElementId, GeoPoint, ProjectedPoint,
};
use vagdata_trafikverket::fetcher::fetch_attribute_raw;
use vagdata_trafikverket::registry;
use vagdata_trafikverket::resolver::{DEFAULT_MAX_DISTANCE_METERS, resolve_nearest_raw};
use vagdata_trafikverket::transport::{HttpTransport, RoadDataTransport};

use crate::LookupError;
use crate::config::LookupConfig;

/// Per-service pipeline settings.
#[derive(Debug, Clone, PartialEq)]
pub struct LookupOptions {
    /// Snap search radius in meters.
    pub max_distance_meters: f64,
    /// Kinds fetched for every resolved element.
    pub kinds: Vec<AttributeKind>,
    /// Keep raw upstream payloads in the result.
    pub include_raw_responses: bool,
}

impl Default for LookupOptions {
    fn default() -> Self {
        Self {
            max_distance_meters: DEFAULT_MAX_DISTANCE_METERS,
            kinds: AttributeKind::all().to_vec(),
            include_raw_responses: false,
        }
    }
}

/// Turns a clicked point into an [`AggregateResult`].
#[derive(Debug)]
pub struct RoadDataService<T> {
    transport: T,
    options: LookupOptions,
}

impl RoadDataService<HttpTransport> {
    /// Builds a service talking to the live API.
    ///
    /// # Errors
    ///
    /// Returns [`LookupError`] if the config is invalid or has no API key,
    /// or the HTTP client cannot be built.
    pub fn from_config(config: &LookupConfig) -> Result<Self, LookupError> {
        config.validate()?;
        let transport = HttpTransport::new(&config.client_config()?)?;
        log::info!(
            "Road data service ready: endpoint={}, kinds={:?}, max_distance={} m",
            transport.endpoint(),
            config.attribute_kinds,
            config.max_distance_meters
        );
        Ok(Self::new(transport, config.lookup_options()))
    }
}

impl<T: RoadDataTransport> RoadDataService<T> {
    /// Creates a service. Duplicate kinds are collapsed.
    ///
    /// # Panics
    ///
    /// Panics if a kind in `options` has no registry definition.
    #[must_use]
    pub fn new(transport: T, mut options: LookupOptions) -> Self {
        options.kinds.sort_unstable();
        options.kinds.dedup();
        for kind in &options.kinds {
            assert!(
                registry::try_attribute(*kind).is_some(),
                "attribute kind {kind} has no registry definition"
            );
        }
        Self { transport, options }
    }

    /// The active settings.
    #[must_use]
    pub const fn options(&self) -> &LookupOptions {
        &self.options
    }

    /// The underlying transport.
    #[must_use]
    pub const fn transport(&self) -> &T {
        &self.transport
    }

    /// Projects a WGS 84 point and looks it up.
    ///
    /// # Errors
    ///
    /// Returns [`ProjectionError`] if the point cannot be projected. Every
    /// upstream problem stays inside the returned result.
    pub async fn get_road_data_for_geo_point(
        &self,
        geo: GeoPoint,
    ) -> Result<AggregateResult, ProjectionError> {
        let point = vagdata_projection::to_projected(geo)?;
        log::debug!(
            "Projected ({}, {}) to ({:.3}, {:.3})",
            geo.longitude,
            geo.latitude,
            point.easting,
            point.northing
        );
        Ok(self.get_road_data_for_point(point).await)
    }

    /// Looks up everything known about the road nearest `point`.
    pub async fn get_road_data_for_point(&self, point: ProjectedPoint) -> AggregateResult {
        self.get_road_data_within(point, self.options.max_distance_meters)
            .await
    }

    /// Like [`Self::get_road_data_for_point`] with a one-off search radius.
    pub async fn get_road_data_within(
        &self,
        point: ProjectedPoint,
        max_distance_meters: f64,
    ) -> AggregateResult {
        let queried_at = Utc::now();
        let mut raw = self.options.include_raw_responses.then(BTreeMap::new);

        let (resolve, snap_body) =
            resolve_nearest_raw(&self.transport, point, max_distance_meters).await;
        record_raw(&mut raw, &registry::snap_definition().alias, snap_body);

        let Some(element_id) = resolve.element_id.clone() else {
            if let Some(error) = &resolve.error_message {
                log::warn!(
                    "Lookup at ({:.1}, {:.1}) stopped at snap: {error}",
                    point.easting,
                    point.northing
                );
            }
            let mut result = AggregateResult::unresolved(point, queried_at, resolve);
            result.raw_upstream_responses = raw;
            return result;
        };

        let fetched = join_all(
            self.options
                .kinds
                .iter()
                .map(|kind| fetch_attribute_raw(&self.transport, *kind, &element_id)),
        )
        .await;

        let mut attributes = BTreeMap::new();
        for (result, body) in fetched {
            record_raw(&mut raw, &registry::attribute(result.kind).object_type, body);
            attributes.insert(result.kind, result);
        }

        self.apply_street_name_fallback(&element_id, &mut attributes, &mut raw)
            .await;

        let failed = attributes.values().filter(|r| !r.success).count();
        log::info!(
            "Element {element_id}: {} attribute kind(s), {failed} failed",
            attributes.len()
        );

        AggregateResult {
            query_point: point,
            queried_at,
            resolve,
            attributes,
            overall_success: true,
            raw_upstream_responses: raw,
        }
    }

    /// Substitutes the functional road class when the street name is
    /// missing. Only one level deep: the substitute is never itself
    /// replaced.
    async fn apply_street_name_fallback(
        &self,
        element_id: &ElementId,
        attributes: &mut BTreeMap<AttributeKind, AttributeResult>,
        raw: &mut Option<BTreeMap<String, Value>>,
    ) {
        let needs_fallback = attributes
            .get(&AttributeKind::StreetName)
            .is_some_and(AttributeResult::is_empty_or_failed);
        if !needs_fallback {
            return;
        }

        let substitute = if let Some(existing) = attributes.get(&AttributeKind::FunctionalRoadClass)
        {
            existing.clone()
        } else {
            let (result, body) = fetch_attribute_raw(
                &self.transport,
                AttributeKind::FunctionalRoadClass,
                element_id,
            )
            .await;
            record_raw(
                raw,
                &registry::attribute(AttributeKind::FunctionalRoadClass).object_type,
                body,
            );
            result
        };

        if substitute.is_empty_or_failed() {
            log::debug!("No street name or functional road class for element {element_id}");
            return;
        }

        log::debug!("Using functional road class in place of street name for element {element_id}");
        attributes.insert(
            AttributeKind::StreetName,
            substitute.as_fallback_for(AttributeKind::StreetName),
        );
    }
}

fn record_raw(raw: &mut Option<BTreeMap<String, Value>>, key: &str, body: Option<Value>) {
    if let (Some(raw), Some(body)) = (raw.as_mut(), body) {
        raw.insert(key.to_string(), body);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use vagdata_trafikverket::fake::{
        FakeResponse, FakeTransport, no_match_body, objects_body, primary_values_body, snap_body,
    };

    fn point() -> ProjectedPoint {
        ProjectedPoint::new(500_000.0, 6_580_000.0)
    }

    fn snapped() -> FakeResponse {
        FakeResponse::Json(snap_body("E123", 12.34, "POINT Z (500003 6580004 0)"))
    }

    fn scenario_transport() -> FakeTransport {
        FakeTransport::new()
            .with_snap(snapped())
            .with_kind(
                AttributeKind::RoadNumber,
                FakeResponse::Json(primary_values_body(AttributeKind::RoadNumber, &["E4"])),
            )
            .with_kind(
                AttributeKind::SpeedLimit,
                FakeResponse::Json(primary_values_body(AttributeKind::SpeedLimit, &["100"])),
            )
            .with_kind(AttributeKind::StreetName, FakeResponse::Status(500))
            .with_kind(
                AttributeKind::FunctionalRoadClass,
                FakeResponse::Json(objects_body("FunktionellVägklass", json!({"Klass": 1}))),
            )
            .with_kind(
                AttributeKind::RoadAuthority,
                FakeResponse::Json(primary_values_body(
                    AttributeKind::RoadAuthority,
                    &["Trafikverket"],
                )),
            )
            .with_kind(
                AttributeKind::RoadWidth,
                FakeResponse::Json(json!({"RESPONSE": {"RESULT": [{}]}})),
            )
    }

    #[tokio::test]
    async fn full_lookup_merges_every_kind() {
        let service = RoadDataService::new(scenario_transport(), LookupOptions::default());

        let result = service.get_road_data_for_point(point()).await;

        assert!(result.overall_success);
        assert_eq!(result.resolve.element_id, Some(ElementId::new("E123")));
        assert_eq!(result.resolve.offset, Some(12.34));
        assert_eq!(result.attributes.len(), AttributeKind::all().len());

        let road_number = result.attribute(AttributeKind::RoadNumber).unwrap();
        assert_eq!(road_number.values_of("Huvudnummer"), vec!["E4"]);

        let speed = result.attribute(AttributeKind::SpeedLimit).unwrap();
        assert_eq!(speed.values_of("Högsta_tillåtna_hastighet"), vec!["100"]);

        let width = result.attribute(AttributeKind::RoadWidth).unwrap();
        assert!(width.success);
        assert!(width.items.is_empty());

        assert!(result.raw_upstream_responses.is_none());
    }

    #[tokio::test]
    async fn failed_street_name_falls_back_to_road_class() {
        let service = RoadDataService::new(scenario_transport(), LookupOptions::default());

        let result = service.get_road_data_for_point(point()).await;

        let street = result.attribute(AttributeKind::StreetName).unwrap();
        assert_eq!(street.kind, AttributeKind::FunctionalRoadClass);
        assert_eq!(street.fallback_for, Some(AttributeKind::StreetName));
        assert_eq!(street.values_of("Klass"), vec!["1"]);
        assert_eq!(
            street.label(),
            "Functional road class (in place of street name)"
        );

        let class = result.attribute(AttributeKind::FunctionalRoadClass).unwrap();
        assert!(class.fallback_for.is_none());
        assert_eq!(service.transport().attribute_request_count(), 6);
    }

    #[tokio::test]
    async fn one_failing_kind_leaves_the_rest_intact() {
        let transport = scenario_transport()
            .with_kind(AttributeKind::SpeedLimit, FakeResponse::Status(500))
            .with_kind(
                AttributeKind::StreetName,
                FakeResponse::Json(primary_values_body(AttributeKind::StreetName, &["Kungsgatan"])),
            );
        let service = RoadDataService::new(transport, LookupOptions::default());

        let result = service.get_road_data_for_point(point()).await;

        assert!(result.overall_success);
        let speed = result.attribute(AttributeKind::SpeedLimit).unwrap();
        assert!(!speed.success);
        assert!(speed.items.is_empty());
        assert_eq!(speed.message, "Speed limit could not be retrieved");

        let street = result.attribute(AttributeKind::StreetName).unwrap();
        assert!(street.fallback_for.is_none());
        assert_eq!(street.values_of("Namn"), vec!["Kungsgatan"]);

        let road_number = result.attribute(AttributeKind::RoadNumber).unwrap();
        assert_eq!(road_number.values_of("Huvudnummer"), vec!["E4"]);
    }

    #[tokio::test]
    async fn no_match_skips_attribute_queries() {
        let transport = FakeTransport::new().with_snap(FakeResponse::Json(no_match_body()));
        let service = RoadDataService::new(transport, LookupOptions::default());

        let result = service.get_road_data_for_point(point()).await;

        assert!(result.overall_success);
        assert!(result.resolve.element_id.is_none());
        assert!(result.attributes.is_empty());
        assert_eq!(service.transport().attribute_request_count(), 0);
    }

    #[tokio::test]
    async fn snap_failure_is_reported_without_attributes() {
        let transport = FakeTransport::new().with_snap(FakeResponse::Status(503));
        let service = RoadDataService::new(transport, LookupOptions::default());

        let result = service.get_road_data_for_point(point()).await;

        assert!(!result.overall_success);
        assert!(result.resolve.error_message.is_some());
        assert!(result.attributes.is_empty());
        assert_eq!(service.transport().attribute_request_count(), 0);
    }

    #[tokio::test]
    async fn fallback_fetches_road_class_when_not_configured() {
        let options = LookupOptions {
            kinds: vec![AttributeKind::StreetName, AttributeKind::RoadNumber],
            ..LookupOptions::default()
        };
        let transport = scenario_transport().with_kind(
            AttributeKind::StreetName,
            FakeResponse::Json(primary_values_body(AttributeKind::StreetName, &[])),
        );
        let service = RoadDataService::new(transport, options);

        let result = service.get_road_data_for_point(point()).await;

        assert_eq!(result.attributes.len(), 2);
        let street = result.attribute(AttributeKind::StreetName).unwrap();
        assert_eq!(street.fallback_for, Some(AttributeKind::StreetName));
        assert!(result.attribute(AttributeKind::FunctionalRoadClass).is_none());
        assert_eq!(service.transport().attribute_request_count(), 3);
    }

    #[tokio::test]
    async fn empty_road_class_keeps_original_street_result() {
        let transport = scenario_transport().with_kind(
            AttributeKind::FunctionalRoadClass,
            FakeResponse::Json(json!({"RESPONSE": {"RESULT": [{}]}})),
        );
        let service = RoadDataService::new(transport, LookupOptions::default());

        let result = service.get_road_data_for_point(point()).await;

        let street = result.attribute(AttributeKind::StreetName).unwrap();
        assert_eq!(street.kind, AttributeKind::StreetName);
        assert!(!street.success);
        assert!(street.fallback_for.is_none());
    }

    #[tokio::test]
    async fn raw_responses_are_keyed_by_object_type() {
        let options = LookupOptions {
            kinds: vec![AttributeKind::RoadNumber, AttributeKind::StreetName],
            include_raw_responses: true,
            ..LookupOptions::default()
        };
        let service = RoadDataService::new(scenario_transport(), options);

        let result = service.get_road_data_for_point(point()).await;

        let raw = result.raw_upstream_responses.unwrap();
        assert!(raw.contains_key("SnapToRoadNetwork"));
        assert!(raw.contains_key("Vägnummer"));
        assert!(raw.contains_key("FunktionellVägklass"));
        assert!(!raw.contains_key("Gatunamn"));
    }

    #[tokio::test]
    async fn geo_point_is_projected_before_lookup() {
        let service = RoadDataService::new(scenario_transport(), LookupOptions::default());

        let result = service
            .get_road_data_for_geo_point(GeoPoint::new(15.0, 60.0))
            .await
            .unwrap();

        assert!((result.query_point.easting - 500_000.0).abs() < 1e-3);
        assert!((result.query_point.northing - 6_651_411.190).abs() < 1e-2);
    }

    #[tokio::test]
    async fn invalid_geo_point_is_an_error() {
        let service = RoadDataService::new(FakeTransport::new(), LookupOptions::default());

        let result = service
            .get_road_data_for_geo_point(GeoPoint::new(f64::NAN, 60.0))
            .await;

        assert!(result.is_err());
        assert!(service.transport().requests().is_empty());
    }

    #[test]
    fn duplicate_kinds_are_collapsed() {
        let options = LookupOptions {
            kinds: vec![AttributeKind::SpeedLimit, AttributeKind::SpeedLimit],
            ..LookupOptions::default()
        };
        let service = RoadDataService::new(FakeTransport::new(), options);
        assert_eq!(service.options().kinds, vec![AttributeKind::SpeedLimit]);
    }
}
