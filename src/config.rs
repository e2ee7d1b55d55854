use anyhow::{Context, Result};
use axum::http::{HeaderValue, Method};
use std::env;
use std::path::PathBuf;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};

pub const DEFAULT_PORT: u16 = 10000;
pub const DEFAULT_MODEL_PATH: &str = "diabetes_model.bin";
pub const DEFAULT_SCALER_PATH: &str = "scaler.bin";
pub const DEFAULT_DATASET_PATH: &str = "diabetes.csv";

/// Inference service configuration, read from the environment once at
/// startup.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub port: u16,
    /// Debug vs production mode; debug relaxes CORS to any origin.
    pub debug: bool,
    /// Comma-separated origin allowlist from `ALLOWED_ORIGINS`. Empty means
    /// allow any origin.
    pub allowed_origins: Vec<String>,
    pub model_path: PathBuf,
    pub scaler_path: PathBuf,
}

impl ServerConfig {
    pub fn from_env() -> Self {
        let port = env::var("PORT")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_PORT);
        let debug = env::var("APP_ENV").map(|v| v != "production").unwrap_or(true);
        let allowed_origins = env::var("ALLOWED_ORIGINS")
            .map(|v| {
                v.split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        Self {
            port,
            debug,
            allowed_origins,
            model_path: path_from_env("MODEL_PATH", DEFAULT_MODEL_PATH),
            scaler_path: path_from_env("SCALER_PATH", DEFAULT_SCALER_PATH),
        }
    }

    pub fn cors_layer(&self) -> Result<CorsLayer> {
        let layer = CorsLayer::new()
            .allow_methods([Method::GET, Method::POST])
            .allow_headers(Any);

        if self.debug || self.allowed_origins.is_empty() {
            return Ok(layer.allow_origin(Any));
        }

        let origins = self
            .allowed_origins
            .iter()
            .map(|o| {
                o.parse::<HeaderValue>()
                    .with_context(|| format!("invalid origin in ALLOWED_ORIGINS: '{o}'"))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(layer.allow_origin(AllowOrigin::list(origins)))
    }
}

/// Trainer configuration. Seeds are deliberate values, not incidental
/// defaults: the same dataset and seeds always produce identical artifacts.
#[derive(Debug, Clone)]
pub struct TrainConfig {
    pub dataset_path: PathBuf,
    pub model_path: PathBuf,
    pub scaler_path: PathBuf,
    pub n_trees: usize,
    pub test_fraction: f64,
    pub split_seed: u64,
    pub forest_seed: u64,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            dataset_path: PathBuf::from(DEFAULT_DATASET_PATH),
            model_path: PathBuf::from(DEFAULT_MODEL_PATH),
            scaler_path: PathBuf::from(DEFAULT_SCALER_PATH),
            n_trees: 100,
            test_fraction: 0.2,
            split_seed: 42,
            forest_seed: 42,
        }
    }
}

impl TrainConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            dataset_path: path_from_env("DATASET_PATH", DEFAULT_DATASET_PATH),
            model_path: path_from_env("MODEL_PATH", DEFAULT_MODEL_PATH),
            scaler_path: path_from_env("SCALER_PATH", DEFAULT_SCALER_PATH),
            n_trees: env::var("N_TREES")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.n_trees),
            ..defaults
        }
    }
}

fn path_from_env(key: &str, default: &str) -> PathBuf {
    env::var(key).map(PathBuf::from).unwrap_or_else(|_| PathBuf::from(default))
}
