#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Actix-Web API server for road lookups.
//!
//! The map frontend sends a clicked WGS 84 point to `/api/road-data` and
//! renders the returned `AggregateResult`. Upstream failures never turn
//! into HTTP errors here: they come back inside the result, and only an
//! unprojectable coordinate is answered with `400`.

mod handlers;
pub mod interactive;

use std::sync::Arc;

use actix_cors::Cors;
use actix_web::{App, HttpServer, middleware, web};
use vagdata_lookup::{LookupConfig, LookupError, RoadDataService};
use vagdata_trafikverket::transport::{HttpTransport, RoadDataTransport};

/// Transport type the server's service is built on.
pub type SharedTransport = Arc<dyn RoadDataTransport>;

/// Shared application state.
pub struct AppState {
    /// Lookup pipeline shared by all workers.
    pub service: Arc<RoadDataService<SharedTransport>>,
}

impl AppState {
    /// Builds state talking to the live API.
    ///
    /// # Errors
    ///
    /// Returns [`LookupError`] if the config is invalid or has no API key,
    /// or the HTTP client cannot be built.
    pub fn from_config(config: &LookupConfig) -> Result<Self, LookupError> {
        config.validate()?;
        let transport = HttpTransport::new(&config.client_config()?)?;
        log::info!("Using road data endpoint {}", transport.endpoint());
        Ok(Self::with_transport(
            Arc::new(transport),
            config.lookup_options(),
        ))
    }

    /// Builds state around any transport.
    #[must_use]
    pub fn with_transport(
        transport: SharedTransport,
        options: vagdata_lookup::LookupOptions,
    ) -> Self {
        Self {
            service: Arc::new(RoadDataService::new(transport, options)),
        }
    }
}

/// Registers the `/api` routes.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            .route("/health", web::get().to(handlers::health))
            .route("/attribute-kinds", web::get().to(handlers::attribute_kinds))
            .route("/project", web::get().to(handlers::project))
            .route("/road-data", web::get().to(handlers::road_data)),
    );
}

/// Starts the API server on `BIND_ADDR`:`PORT` (default
/// `127.0.0.1:8080`), with configuration from [`LookupConfig::load`].
///
/// Logging is not initialized here; the caller sets it up. This is a
/// regular async function, so the caller provides the runtime (e.g. via
/// `#[actix_web::main]`).
///
/// # Errors
///
/// Returns an error if the configuration cannot be loaded, or the HTTP
/// server fails to bind or run.
#[allow(clippy::future_not_send)]
pub async fn run_server() -> std::io::Result<()> {
    let bind_addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| "127.0.0.1".to_string());
    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(8080);

    run_server_on(bind_addr, port).await
}

/// Like [`run_server`] with an explicit address.
///
/// # Errors
///
/// Returns an error if the configuration cannot be loaded, or the HTTP
/// server fails to bind or run.
#[allow(clippy::future_not_send)]
pub async fn run_server_on(bind_addr: String, port: u16) -> std::io::Result<()> {
    log::info!("Loading configuration...");
    let config = LookupConfig::load().map_err(std::io::Error::other)?;
    let state = web::Data::new(AppState::from_config(&config).map_err(std::io::Error::other)?);

    log::info!("Starting server on {bind_addr}:{port}");

    HttpServer::new(move || {
        let cors = Cors::permissive();

        App::new()
            .wrap(cors)
            .wrap(middleware::Logger::default())
            .app_data(state.clone())
            .configure(configure)
    })
    .bind((bind_addr, port))?
    .run()
    .await
}
