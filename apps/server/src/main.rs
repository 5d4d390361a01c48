use anyhow::Result;
use deckcast_core::EmbedPipeline;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

mod error;
mod fetch;
mod request;
mod routes;
mod settings;

use routes::AppState;
use settings::Settings;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,deckcast=debug"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("Starting deckcast v{}", env!("CARGO_PKG_VERSION"));

    let settings = Settings::load()?;

    #[cfg(feature = "ffmpeg")]
    if settings.embed.download_ffmpeg {
        tokio::task::spawn_blocking(deckcast_core::sidecar::ensure_ffmpeg).await??;
    }

    let pipeline = EmbedPipeline::new(&settings.embed)?;
    let client = fetch::client(&settings.server)?;
    let app = routes::router(
        AppState::new(pipeline, client),
        settings.server.body_limit_bytes,
    );

    let addr = settings.bind_addr()?;
    let listener = TcpListener::bind(addr).await?;
    info!("Listening on {}", addr);
    axum::serve(listener, app).await?;

    Ok(())
}
