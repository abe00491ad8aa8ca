#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Road-data aggregation for a single map click.
//!
//! [`service::RoadDataService`] snaps a SWEREF 99 TM point onto the road
//! network, fetches every configured attribute kind for the matched
//! element concurrently, applies the street-name fallback, and merges the
//! outcomes into one [`vagdata_road_models::AggregateResult`]. Partial
//! failures stay inside the result; a click always yields something
//! renderable.
//!
//! [`session::LookupSession`] holds the latest result for an interactive
//! caller and drops results from queries that a newer click superseded.

pub mod config;
pub mod service;
pub mod session;

use thiserror::Error;

pub use config::LookupConfig;
pub use service::{LookupOptions, RoadDataService};
pub use session::{LookupSession, QueryToken};

/// Errors from setting up or driving a lookup.
#[derive(Debug, Error)]
pub enum LookupError {
    /// Configuration could not be loaded or is invalid.
    #[error(transparent)]
    Config(#[from] config::ConfigError),

    /// The clicked point could not be projected.
    #[error(transparent)]
    Projection(#[from] vagdata_projection::ProjectionError),

    /// The upstream client could not be built.
    #[error(transparent)]
    Upstream(#[from] vagdata_trafikverket::UpstreamError),
}
