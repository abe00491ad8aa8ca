#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! API request and response types for the vagdata server.
//!
//! Lookup results are returned as [`vagdata_road_models::AggregateResult`]
//! directly; the types here cover query parameters and the small
//! envelopes around them.

use serde::{Deserialize, Serialize};
use vagdata_road_models::{AttributeKind, GeoPoint};

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiHealth {
    /// Whether the server is healthy.
    pub healthy: bool,
    /// Server version.
    pub version: String,
}

/// Query parameters for `/api/project`.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PointQueryParams {
    /// WGS 84 longitude in degrees.
    pub lon: f64,
    /// WGS 84 latitude in degrees.
    pub lat: f64,
}

impl PointQueryParams {
    /// The clicked point.
    #[must_use]
    pub const fn geo_point(&self) -> GeoPoint {
        GeoPoint::new(self.lon, self.lat)
    }
}

/// Query parameters for `/api/road-data`.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoadDataQueryParams {
    /// WGS 84 longitude in degrees.
    pub lon: f64,
    /// WGS 84 latitude in degrees.
    pub lat: f64,
    /// Snap search radius override in meters.
    pub max_distance: Option<f64>,
}

impl RoadDataQueryParams {
    /// The clicked point.
    #[must_use]
    pub const fn geo_point(&self) -> GeoPoint {
        GeoPoint::new(self.lon, self.lat)
    }
}

/// One entry of `/api/attribute-kinds`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiAttributeKind {
    /// Kind identifier as used in results.
    pub kind: AttributeKind,
    /// Human-readable label.
    pub label: String,
    /// Upstream object type queried for this kind.
    pub object_type: String,
    /// Field holding the headline value.
    pub primary_field: String,
    /// Whether lookups on this server fetch this kind.
    pub enabled: bool,
}

/// Error body for 4xx/5xx responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiError {
    /// What went wrong.
    pub error: String,
}

impl ApiError {
    /// Wraps an error message.
    #[must_use]
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}
