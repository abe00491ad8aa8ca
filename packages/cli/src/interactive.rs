//! Interactive mode.
//!
//! Prompts for points one after another and prints a summary for each,
//! keeping the latest result in a [`LookupSession`].

use dialoguer::{Input, Password, Select};
use vagdata_lookup::{LookupConfig, LookupSession, RoadDataService};
use vagdata_road_models::GeoPoint;

use crate::summary;

enum Action {
    Lookup,
    Project,
    Server,
}

impl Action {
    const ALL: &[Self] = &[Self::Lookup, Self::Project, Self::Server];

    const fn label(&self) -> &'static str {
        match self {
            Self::Lookup => "Look up road data",
            Self::Project => "Project a point to SWEREF 99 TM",
            Self::Server => "Start server",
        }
    }
}

/// Runs the interactive menu.
///
/// # Errors
///
/// Returns an error if a prompt fails, the configuration is invalid, or
/// the server fails to start.
pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    println!("Vägdata");
    println!();

    let labels: Vec<&str> = Action::ALL.iter().map(Action::label).collect();
    let idx = Select::new()
        .with_prompt("What would you like to do?")
        .items(&labels)
        .default(0)
        .interact()?;

    match Action::ALL[idx] {
        Action::Lookup => lookup_loop().await?,
        Action::Project => {
            let geo = prompt_point()?;
            let point = vagdata_projection::to_projected(geo)?;
            println!("E {:.3}, N {:.3}", point.easting, point.northing);
        }
        Action::Server => {
            tokio::task::spawn_blocking(|| {
                actix_web::rt::System::new().block_on(vagdata_server::interactive::run())
            })
            .await??;
        }
    }

    Ok(())
}

async fn lookup_loop() -> Result<(), Box<dyn std::error::Error>> {
    let mut config = LookupConfig::load()?;
    if config.api_key.is_none() {
        let key = Password::new()
            .with_prompt("Trafikverket API key")
            .interact()?;
        config.api_key = Some(key);
    } else {
        log::debug!("Using API key from configuration");
    }

    let service = RoadDataService::from_config(&config)?;
    let session = LookupSession::new();

    loop {
        let lon: String = Input::new()
            .with_prompt("Longitude (blank to quit)")
            .allow_empty(true)
            .interact_text()?;
        if lon.trim().is_empty() {
            break;
        }
        let Ok(longitude) = lon.trim().parse::<f64>() else {
            println!("Not a number: {lon}");
            continue;
        };
        let latitude: f64 = Input::new().with_prompt("Latitude").interact_text()?;

        let point = match vagdata_projection::to_projected(GeoPoint::new(longitude, latitude)) {
            Ok(point) => point,
            Err(e) => {
                println!("{e}");
                continue;
            }
        };

        match session.lookup(&service, point).await {
            Some(result) => {
                println!();
                print!("{}", summary::format_result(&result));
                println!();
            }
            None => log::debug!("Lookup at ({longitude}, {latitude}) was superseded"),
        }
    }

    Ok(())
}

fn prompt_point() -> Result<GeoPoint, dialoguer::Error> {
    let longitude: f64 = Input::new().with_prompt("Longitude").interact_text()?;
    let latitude: f64 = Input::new().with_prompt("Latitude").interact_text()?;
    Ok(GeoPoint::new(longitude, latitude))
}
