#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Command-line road lookups.
//!
//! ```text
//! vagdata lookup --lon 18.0686 --lat 59.3293 [--max-distance 200] [--raw] [--summary]
//! vagdata project --lon 18.0686 --lat 59.3293
//! vagdata unproject --easting 674571.9 --northing 6580743.0
//! vagdata serve
//! ```
//!
//! Running `vagdata` with no subcommand enters interactive mode.
//! Configuration comes from `VAGDATA_CONFIG` and the environment; see
//! [`vagdata_lookup::config`].

mod interactive;
mod summary;

use std::time::Instant;

use clap::{Parser, Subcommand};
use vagdata_lookup::{LookupConfig, RoadDataService};
use vagdata_road_models::{GeoPoint, ProjectedPoint};

#[derive(Parser)]
#[command(name = "vagdata", about = "Look up Swedish road data for a map point")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Look up road data at a WGS 84 point
    Lookup {
        /// Longitude in degrees
        #[arg(long, allow_negative_numbers = true)]
        lon: f64,
        /// Latitude in degrees
        #[arg(long, allow_negative_numbers = true)]
        lat: f64,
        /// Snap search radius in meters
        #[arg(long)]
        max_distance: Option<f64>,
        /// Include raw upstream responses
        #[arg(long)]
        raw: bool,
        /// Print a text summary instead of JSON
        #[arg(long)]
        summary: bool,
    },
    /// Project a WGS 84 point to SWEREF 99 TM
    Project {
        /// Longitude in degrees
        #[arg(long, allow_negative_numbers = true)]
        lon: f64,
        /// Latitude in degrees
        #[arg(long, allow_negative_numbers = true)]
        lat: f64,
    },
    /// Convert a SWEREF 99 TM point back to WGS 84
    Unproject {
        /// Easting in meters
        #[arg(long, allow_negative_numbers = true)]
        easting: f64,
        /// Northing in meters
        #[arg(long, allow_negative_numbers = true)]
        northing: f64,
    },
    /// Start the API server
    Serve,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    pretty_env_logger::init();
    let cli = Cli::parse();

    let Some(command) = cli.command else {
        return interactive::run().await;
    };

    match command {
        Commands::Lookup {
            lon,
            lat,
            max_distance,
            raw,
            summary: as_text,
        } => {
            let mut config = LookupConfig::load()?;
            if raw {
                config.include_raw_responses = true;
            }
            let service = RoadDataService::from_config(&config)?;

            let started = Instant::now();
            let geo = GeoPoint::new(lon, lat);
            let result = match max_distance {
                Some(distance) => {
                    let point = vagdata_projection::to_projected(geo)?;
                    service.get_road_data_within(point, distance).await
                }
                None => service.get_road_data_for_geo_point(geo).await?,
            };
            log::info!(
                "Lookup at ({lon}, {lat}) finished in {:.2?}: {} attribute kind(s)",
                started.elapsed(),
                result.attributes.len()
            );

            if as_text {
                print!("{}", summary::format_result(&result));
            } else {
                println!("{}", serde_json::to_string_pretty(&result)?);
            }
        }
        Commands::Project { lon, lat } => {
            let point = vagdata_projection::to_projected(GeoPoint::new(lon, lat))?;
            println!("{}", serde_json::to_string_pretty(&point)?);
        }
        Commands::Unproject { easting, northing } => {
            let geo = vagdata_projection::to_geographic(ProjectedPoint::new(easting, northing))?;
            println!("{}", serde_json::to_string_pretty(&geo)?);
        }
        Commands::Serve => {
            // actix-web runs its own runtime; keep it off the tokio workers.
            tokio::task::spawn_blocking(|| {
                actix_web::rt::System::new().block_on(vagdata_server::run_server())
            })
            .await??;
        }
    }

    Ok(())
}
