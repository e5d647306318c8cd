//! Food waste prediction service binary

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use waste_forecast::artifacts::ArtifactPaths;
use waste_service::routes;
use waste_service::service::InferenceService;
use waste_service::state::ModelHandle;
use waste_service::weather::WeatherApiClient;

#[derive(Debug, Parser)]
#[command(name = "waste_service", about = "Food waste prediction service")]
struct Args {
    /// Directory holding bundle.json, scaler.json and snapshot.json
    #[arg(long, default_value = "artifacts")]
    artifacts: PathBuf,

    /// Bind address
    #[arg(long, default_value = "127.0.0.1:8080")]
    bind: SocketAddr,

    /// Weather API endpoint
    #[arg(long, default_value = "https://api.weatherapi.com/v1/current.json")]
    weather_url: String,

    /// Weather API key
    #[arg(long, env = "WEATHER_API_KEY", default_value = "")]
    weather_api_key: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let handle = ModelHandle::load(&ArtifactPaths::new(&args.artifacts))
        .context("loading model artifacts")?;
    let weather = WeatherApiClient::new(args.weather_url, args.weather_api_key)
        .context("building weather client")?;
    let service = Arc::new(InferenceService::new(handle, weather));

    tracing::info!(bind = %args.bind, "waste service listening");
    warp::serve(routes::api(service)).run(args.bind).await;
    Ok(())
}
