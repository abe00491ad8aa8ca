#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Transverse Mercator projection between geographic coordinates and
//! SWEREF 99 TM (EPSG:3006).
//!
//! The map works in longitude/latitude while the road-data service expects
//! planar SWEREF 99 TM meters. The conversion uses the Krüger series as
//! published by Lantmäteriet, which stays well below a millimetre of error
//! across Sweden. SWEREF 99 is tied to ETRS89, so WGS84 input is treated as
//! identical (no datum shift).
//!
//! See <https://www.lantmateriet.se/globalassets/geodata/gps-och-geodetisk-matning/gauss_conformal_projection.pdf>

use thiserror::Error;
use vagdata_road_models::{GeoPoint, ProjectedPoint};

/// Errors from coordinate transforms.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ProjectionError {
    /// Input is non-finite, out of range, or projects to a non-finite value.
    #[error("Invalid coordinate: {message}")]
    InvalidCoordinate {
        /// What was wrong with the input.
        message: String,
    },
}

/// Parameters of a Transverse Mercator projection on an ellipsoid.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransverseMercator {
    /// Semi-major axis in meters.
    pub semi_major_axis: f64,
    /// Flattening.
    pub flattening: f64,
    /// Longitude of the central meridian in degrees.
    pub central_meridian: f64,
    /// Scale factor on the central meridian.
    pub scale: f64,
    /// Added to every easting, in meters.
    pub false_easting: f64,
    /// Added to every northing, in meters.
    pub false_northing: f64,
}

/// SWEREF 99 TM: GRS80, central meridian 15°E, scale 0.9996.
pub const SWEREF99_TM: TransverseMercator = TransverseMercator {
    semi_major_axis: 6_378_137.0,
    flattening: 1.0 / 298.257_222_101,
    central_meridian: 15.0,
    scale: 0.9996,
    false_easting: 500_000.0,
    false_northing: 0.0,
};

/// Projects a geographic point to SWEREF 99 TM.
///
/// # Errors
///
/// Returns [`ProjectionError::InvalidCoordinate`] if the input is not a
/// finite longitude in [-180, 180] and latitude in [-90, 90], or if the
/// projection produces a non-finite result.
pub fn to_projected(geo: GeoPoint) -> Result<ProjectedPoint, ProjectionError> {
    SWEREF99_TM.forward(geo)
}

/// Converts a SWEREF 99 TM point back to geographic coordinates.
///
/// # Errors
///
/// Returns [`ProjectionError::InvalidCoordinate`] if the input is
/// non-finite or the inverse produces a non-finite result.
pub fn to_geographic(point: ProjectedPoint) -> Result<GeoPoint, ProjectionError> {
    SWEREF99_TM.inverse(point)
}

impl TransverseMercator {
    /// Geographic to grid.
    ///
    /// # Errors
    ///
    /// See [`to_projected`].
    pub fn forward(&self, geo: GeoPoint) -> Result<ProjectedPoint, ProjectionError> {
        validate_geo(geo)?;

        let e2 = self.eccentricity_squared();
        let a_coef = e2;
        let b_coef = (5.0 * e2.powi(2) - e2.powi(3)) / 6.0;
        let c_coef = (104.0 * e2.powi(3) - 45.0 * e2.powi(4)) / 120.0;
        let d_coef = 1237.0 * e2.powi(4) / 1260.0;

        let phi = geo.latitude.to_radians();
        let delta_lambda = (geo.longitude - self.central_meridian).to_radians();

        let (sin_phi, cos_phi) = phi.sin_cos();
        let s2 = sin_phi * sin_phi;
        let conformal = phi
            - sin_phi * cos_phi * (a_coef + s2 * (b_coef + s2 * (c_coef + s2 * d_coef)));

        let xi_prime = conformal.tan().atan2(delta_lambda.cos());
        let eta_prime = (conformal.cos() * delta_lambda.sin()).atanh();

        let beta = self.forward_coefficients();
        let mut xi = xi_prime;
        let mut eta = eta_prime;
        for (j, b) in (1..).zip(beta) {
            let k = f64::from(2 * j);
            xi += b * (k * xi_prime).sin() * (k * eta_prime).cosh();
            eta += b * (k * xi_prime).cos() * (k * eta_prime).sinh();
        }

        let scaled_radius = self.scale * self.rectifying_radius();
        let point = ProjectedPoint::new(
            scaled_radius.mul_add(eta, self.false_easting),
            scaled_radius.mul_add(xi, self.false_northing),
        );

        if !point.easting.is_finite() || !point.northing.is_finite() {
            return Err(ProjectionError::InvalidCoordinate {
                message: format!(
                    "({}, {}) is outside the projection's usable domain",
                    geo.longitude, geo.latitude
                ),
            });
        }

        Ok(point)
    }

    /// Grid to geographic.
    ///
    /// # Errors
    ///
    /// See [`to_geographic`].
    pub fn inverse(&self, point: ProjectedPoint) -> Result<GeoPoint, ProjectionError> {
        if !point.easting.is_finite() || !point.northing.is_finite() {
            return Err(ProjectionError::InvalidCoordinate {
                message: format!(
                    "projected coordinate ({}, {}) is not finite",
                    point.easting, point.northing
                ),
            });
        }

        let scaled_radius = self.scale * self.rectifying_radius();
        let xi = (point.northing - self.false_northing) / scaled_radius;
        let eta = (point.easting - self.false_easting) / scaled_radius;

        let delta = self.inverse_coefficients();
        let mut xi_prime = xi;
        let mut eta_prime = eta;
        for (j, d) in (1..).zip(delta) {
            let k = f64::from(2 * j);
            xi_prime -= d * (k * xi).sin() * (k * eta).cosh();
            eta_prime -= d * (k * xi).cos() * (k * eta).sinh();
        }

        let conformal = (xi_prime.sin() / eta_prime.cosh()).asin();
        let delta_lambda = eta_prime.sinh().atan2(xi_prime.cos());

        let e2 = self.eccentricity_squared();
        let a_star = e2 + e2.powi(2) + e2.powi(3) + e2.powi(4);
        let b_star = -(7.0 * e2.powi(2) + 17.0 * e2.powi(3) + 30.0 * e2.powi(4)) / 6.0;
        let c_star = (224.0 * e2.powi(3) + 889.0 * e2.powi(4)) / 120.0;
        let d_star = -(4279.0 * e2.powi(4)) / 1260.0;

        let (sin_c, cos_c) = conformal.sin_cos();
        let s2 = sin_c * sin_c;
        let phi =
            conformal + sin_c * cos_c * (a_star + s2 * (b_star + s2 * (c_star + s2 * d_star)));

        let geo = GeoPoint::new(
            self.central_meridian + delta_lambda.to_degrees(),
            phi.to_degrees(),
        );

        if !geo.longitude.is_finite() || !geo.latitude.is_finite() {
            return Err(ProjectionError::InvalidCoordinate {
                message: format!(
                    "projected coordinate ({}, {}) has no geographic equivalent",
                    point.easting, point.northing
                ),
            });
        }

        Ok(geo)
    }

    fn eccentricity_squared(&self) -> f64 {
        self.flattening * (2.0 - self.flattening)
    }

    fn third_flattening(&self) -> f64 {
        self.flattening / (2.0 - self.flattening)
    }

    /// Radius of the rectifying sphere (â).
    fn rectifying_radius(&self) -> f64 {
        let n = self.third_flattening();
        let n2 = n * n;
        self.semi_major_axis / (1.0 + n) * (1.0 + n2 / 4.0 + n2 * n2 / 64.0)
    }

    fn forward_coefficients(&self) -> [f64; 4] {
        let n = self.third_flattening();
        [
            n / 2.0 - 2.0 * n.powi(2) / 3.0 + 5.0 * n.powi(3) / 16.0 + 41.0 * n.powi(4) / 180.0,
            13.0 * n.powi(2) / 48.0 - 3.0 * n.powi(3) / 5.0 + 557.0 * n.powi(4) / 1440.0,
            61.0 * n.powi(3) / 240.0 - 103.0 * n.powi(4) / 140.0,
            49561.0 * n.powi(4) / 161_280.0,
        ]
    }

    fn inverse_coefficients(&self) -> [f64; 4] {
        let n = self.third_flattening();
        [
            n / 2.0 - 2.0 * n.powi(2) / 3.0 + 37.0 * n.powi(3) / 96.0 - n.powi(4) / 360.0,
            n.powi(2) / 48.0 + n.powi(3) / 15.0 - 437.0 * n.powi(4) / 1440.0,
            17.0 * n.powi(3) / 480.0 - 37.0 * n.powi(4) / 840.0,
            4397.0 * n.powi(4) / 161_280.0,
        ]
    }
}

fn validate_geo(geo: GeoPoint) -> Result<(), ProjectionError> {
    if !geo.longitude.is_finite() || !geo.latitude.is_finite() {
        return Err(ProjectionError::InvalidCoordinate {
            message: format!(
                "geographic coordinate ({}, {}) is not finite",
                geo.longitude, geo.latitude
            ),
        });
    }
    if !(-180.0..=180.0).contains(&geo.longitude) {
        return Err(ProjectionError::InvalidCoordinate {
            message: format!("longitude {} is outside [-180, 180]", geo.longitude),
        });
    }
    if !(-90.0..=90.0).contains(&geo.latitude) {
        return Err(ProjectionError::InvalidCoordinate {
            message: format!("latitude {} is outside [-90, 90]", geo.latitude),
        });
    }
    Ok(())
}
