#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Road-network query types shared across the vagdata pipeline.
//!
//! A map click becomes a [`GeoPoint`], which is projected to a
//! [`ProjectedPoint`] (SWEREF 99 TM), snapped to the road network to get an
//! [`ElementId`], and then enriched with one [`AttributeResult`] per
//! [`AttributeKind`]. Everything ends up in a single [`AggregateResult`]
//! that the presentation layer renders as-is.
//!
//! Failures are carried as data (`success: false` plus an error message)
//! rather than as `Err` values, so a partially answered click is still a
//! renderable result.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// Matches `POINT (x y)`, `POINT Z (x y z)` and `POINTZ(x y z)`.
static WKT_POINT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^POINT[ ]*Z?[ ]*\([ ]*([-+0-9.E]+)[ ]+([-+0-9.E]+)(?:[ ]+[-+0-9.E]+)?[ ]*\)$",
    )
    .expect("valid regex")
});

/// A geographic point in degrees (WGS84 / ETRS89).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeoPoint {
    /// Longitude in degrees, positive east.
    pub longitude: f64,
    /// Latitude in degrees, positive north.
    pub latitude: f64,
}

impl GeoPoint {
    /// Creates a new geographic point.
    #[must_use]
    pub const fn new(longitude: f64, latitude: f64) -> Self {
        Self {
            longitude,
            latitude,
        }
    }
}

/// A planar point in meters in the SWEREF 99 TM reference frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectedPoint {
    /// Easting in meters.
    pub easting: f64,
    /// Northing in meters.
    pub northing: f64,
}

impl ProjectedPoint {
    /// Creates a new projected point.
    #[must_use]
    pub const fn new(easting: f64, northing: f64) -> Self {
        Self { easting, northing }
    }

    /// Parses a WKT point geometry such as `POINT (674032.5 6580822.1)`.
    ///
    /// A third (height) ordinate is accepted and discarded. Returns `None`
    /// for anything that is not a single point.
    #[must_use]
    pub fn from_wkt(wkt: &str) -> Option<Self> {
        let upper = wkt.trim().to_ascii_uppercase();
        let caps = WKT_POINT_RE.captures(&upper)?;
        let easting = caps.get(1)?.as_str().parse::<f64>().ok()?;
        let northing = caps.get(2)?.as_str().parse::<f64>().ok()?;
        Some(Self::new(easting, northing))
    }
}

/// Opaque identifier of one road-network link.
///
/// Upstream delivers this as either a string or an integer; both are kept
/// in their textual form.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct ElementId(String);

impl ElementId {
    /// Wraps an identifier.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Builds an identifier from a JSON scalar.
    ///
    /// Strings are trimmed; empty strings, objects, arrays, booleans and
    /// `null` yield `None`.
    #[must_use]
    pub fn from_json(value: &serde_json::Value) -> Option<Self> {
        match value {
            serde_json::Value::String(s) if !s.trim().is_empty() => Some(Self::new(s.trim())),
            serde_json::Value::Number(n) => Some(Self::new(n.to_string())),
            _ => None,
        }
    }
}

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for ElementId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = serde_json::Value::deserialize(deserializer)?;
        Self::from_json(&value)
            .ok_or_else(|| serde::de::Error::custom("element id must be a string or integer"))
    }
}

/// One category of road data fetched per network element.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum AttributeKind {
    /// Road number (e.g. E4, 73).
    RoadNumber,
    /// Street name.
    StreetName,
    /// Functional road class (0-9).
    FunctionalRoadClass,
    /// Posted speed limit.
    SpeedLimit,
    /// Road authority (state, municipal, private).
    RoadAuthority,
    /// Road width.
    RoadWidth,
}

impl AttributeKind {
    /// Returns every attribute kind in display order.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[
            Self::RoadNumber,
            Self::StreetName,
            Self::FunctionalRoadClass,
            Self::SpeedLimit,
            Self::RoadAuthority,
            Self::RoadWidth,
        ]
    }

    /// Human-readable name of this kind.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::RoadNumber => "Road number",
            Self::StreetName => "Street name",
            Self::FunctionalRoadClass => "Functional road class",
            Self::SpeedLimit => "Speed limit",
            Self::RoadAuthority => "Road authority",
            Self::RoadWidth => "Road width",
        }
    }
}

/// Outcome of fetching one attribute kind for one element.
///
/// `success == false` always comes with empty `items` and an
/// `error_message`. `success == true` with empty `items` means the element
/// simply has no data of this kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttributeResult {
    /// Which kind of data `items` holds.
    pub kind: AttributeKind,
    /// Whether the upstream query completed and parsed.
    pub success: bool,
    /// Attribute records in upstream order.
    pub items: Vec<serde_json::Value>,
    /// Summary for display, e.g. "Found 2 speed limits".
    pub message: String,
    /// Why the fetch failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    /// Set when this result stands in for another kind that had no data.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fallback_for: Option<AttributeKind>,
}

impl AttributeResult {
    /// A successful fetch, possibly with no records.
    #[must_use]
    pub fn found(
        kind: AttributeKind,
        items: Vec<serde_json::Value>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            success: true,
            items,
            message: message.into(),
            error_message: None,
            fallback_for: None,
        }
    }

    /// A failed fetch.
    #[must_use]
    pub fn failed(kind: AttributeKind, error_message: impl Into<String>) -> Self {
        Self {
            kind,
            success: false,
            items: Vec::new(),
            message: format!("{} could not be retrieved", kind.label()),
            error_message: Some(error_message.into()),
            fallback_for: None,
        }
    }

    /// Marks this result as a substitute for `original`.
    #[must_use]
    pub fn as_fallback_for(mut self, original: AttributeKind) -> Self {
        self.fallback_for = Some(original);
        self
    }

    /// `true` when the fetch failed or returned no records.
    #[must_use]
    pub fn is_empty_or_failed(&self) -> bool {
        !self.success || self.items.is_empty()
    }

    /// Display label that tells a substitute apart from a direct hit.
    #[must_use]
    pub fn label(&self) -> String {
        match self.fallback_for {
            Some(original) => format!(
                "{} (in place of {})",
                self.kind.label(),
                original.label().to_lowercase()
            ),
            None => self.kind.label().to_string(),
        }
    }

    /// Collects `field` from every record as text.
    ///
    /// Strings are taken as-is, numbers and booleans are formatted, and
    /// records without the field are skipped.
    #[must_use]
    pub fn values_of(&self, field: &str) -> Vec<String> {
        self.items
            .iter()
            .filter_map(|item| match item.get(field)? {
                serde_json::Value::String(s) => Some(s.clone()),
                serde_json::Value::Number(n) => Some(n.to_string()),
                serde_json::Value::Bool(b) => Some(b.to_string()),
                _ => None,
            })
            .collect()
    }
}

/// Outcome of snapping a point to the road network.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolveResult {
    /// Matched element; `None` on failure or when nothing was in range.
    pub element_id: Option<ElementId>,
    /// Distance along the matched element, in meters.
    pub offset: Option<f64>,
    /// WKT point of the snapped location.
    pub geometry_text: Option<String>,
    /// Whether the snap query completed and parsed.
    pub success: bool,
    /// Why the snap query failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl ResolveResult {
    /// A successful snap onto `element_id`.
    #[must_use]
    pub const fn matched(
        element_id: ElementId,
        offset: Option<f64>,
        geometry_text: Option<String>,
    ) -> Self {
        Self {
            element_id: Some(element_id),
            offset,
            geometry_text,
            success: true,
            error_message: None,
        }
    }

    /// The query succeeded but no element lies within the search radius.
    #[must_use]
    pub const fn no_match() -> Self {
        Self {
            element_id: None,
            offset: None,
            geometry_text: None,
            success: true,
            error_message: None,
        }
    }

    /// The query could not be completed.
    #[must_use]
    pub fn failed(error_message: impl Into<String>) -> Self {
        Self {
            element_id: None,
            offset: None,
            geometry_text: None,
            success: false,
            error_message: Some(error_message.into()),
        }
    }

    /// The snapped location parsed from `geometry_text`.
    #[must_use]
    pub fn snapped_point(&self) -> Option<ProjectedPoint> {
        self.geometry_text.as_deref().and_then(ProjectedPoint::from_wkt)
    }
}

/// Everything known about the road at one clicked point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregateResult {
    /// The projected point that was queried.
    pub query_point: ProjectedPoint,
    /// When the query was started.
    pub queried_at: DateTime<Utc>,
    /// Snap-to-network outcome.
    pub resolve: ResolveResult,
    /// Per-kind outcomes; empty unless an element was resolved.
    pub attributes: BTreeMap<AttributeKind, AttributeResult>,
    /// `true` whenever the snap step succeeded, regardless of attributes.
    pub overall_success: bool,
    /// Raw upstream payloads keyed by object type, for diagnostics.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_upstream_responses: Option<BTreeMap<String, serde_json::Value>>,
}

impl AggregateResult {
    /// A result that stops at the snap step (failure or no match).
    #[must_use]
    pub fn unresolved(
        query_point: ProjectedPoint,
        queried_at: DateTime<Utc>,
        resolve: ResolveResult,
    ) -> Self {
        Self {
            query_point,
            queried_at,
            overall_success: resolve.success,
            resolve,
            attributes: BTreeMap::new(),
            raw_upstream_responses: None,
        }
    }

    /// Looks up the result for one kind.
    #[must_use]
    pub fn attribute(&self, kind: AttributeKind) -> Option<&AttributeResult> {
        self.attributes.get(&kind)
    }
}
