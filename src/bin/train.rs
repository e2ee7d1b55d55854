//! Offline trainer: fit the scaler and the forest on the diabetes dataset
//! and persist both artifacts for the inference service.
//!
//! Run with: cargo run --bin train
//! Expects diabetes.csv (Pima Indians Diabetes Dataset) in the working
//! directory unless DATASET_PATH is set.

use anyhow::Result;
use diabetes_predictor::config::TrainConfig;
use diabetes_predictor::dataset;
use diabetes_predictor::forest::{ForestParams, RandomForest};
use diabetes_predictor::scaler::StandardScaler;
use diabetes_predictor::ModelBundle;
use ndarray::Array2;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cfg = TrainConfig::from_env();

    let ds = dataset::load_csv(&cfg.dataset_path)?;
    tracing::info!("loaded {} rows from {}", ds.len(), cfg.dataset_path.display());

    let (train, test) = dataset::train_test_split(&ds, cfg.test_fraction, cfg.split_seed)?;
    tracing::info!("split: {} train / {} held-out", train.len(), test.len());

    // Fit the scaler on the training partition only, then transform both.
    let scaler = StandardScaler::fit(&train.features)?;
    let x_train = scaler.transform(&train.features)?;
    let x_test = scaler.transform(&test.features)?;

    let params = ForestParams {
        n_trees: cfg.n_trees,
        seed: cfg.forest_seed,
        ..ForestParams::default()
    };
    let forest = RandomForest::fit(&x_train, &train.labels, &params)?;

    // Informational only; accuracy is not a gate.
    tracing::info!(
        "training accuracy: {:.2}",
        accuracy(&forest, &x_train, &train.labels)?
    );
    tracing::info!(
        "held-out accuracy: {:.2}",
        accuracy(&forest, &x_test, &test.labels)?
    );

    let bundle = ModelBundle::new(scaler, forest)?;
    bundle.save(&cfg.model_path, &cfg.scaler_path)?;
    tracing::info!(
        "saved artifacts: {} and {}",
        cfg.model_path.display(),
        cfg.scaler_path.display()
    );
    Ok(())
}

fn accuracy(forest: &RandomForest, x: &Array2<f64>, y: &[u8]) -> Result<f64> {
    let mut correct = 0usize;
    for (row, &label) in x.outer_iter().zip(y) {
        if forest.predict(&row.to_vec())? == label {
            correct += 1;
        }
    }
    Ok(correct as f64 / y.len() as f64)
}
