use anyhow::{Context, Result};
use diabetes_predictor::api::{router, AppState};
use diabetes_predictor::config::ServerConfig;
use diabetes_predictor::{ModelBundle, FEATURE_COUNT};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cfg = ServerConfig::from_env();

    // Artifact load is the loading -> ready transition; any failure here is
    // fatal and the listener never binds.
    let bundle = ModelBundle::load(&cfg.model_path, &cfg.scaler_path)
        .context("failed to load model bundle")?;

    // Warmup: one throwaway prediction so the first real request cannot hit
    // a latent artifact problem.
    bundle
        .predict(&[0.0; FEATURE_COUNT])
        .map_err(|e| anyhow::anyhow!("warmup prediction failed: {e}"))?;
    tracing::info!(
        "model bundle loaded ({} trees, {} features); warmup ok",
        bundle.n_trees(),
        FEATURE_COUNT
    );

    let cors = cfg.cors_layer()?;
    let state = AppState {
        bundle: Arc::new(bundle),
    };
    let app = router(state).layer(cors);

    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], cfg.port));
    tracing::info!("listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
