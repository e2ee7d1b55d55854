//! Diabetes risk predictor: an offline trainer that fits a scaled
//! random-forest classifier on the Pima Indians diabetes dataset, and an
//! HTTP inference service that serves predictions from the persisted
//! artifacts.

pub mod api;
pub mod bundle;
pub mod config;
pub mod dataset;
pub mod error;
pub mod forest;
pub mod scaler;

/// Number of input features per prediction. Order is fixed:
/// pregnancies, glucose, blood pressure, skin thickness, insulin, BMI,
/// diabetes pedigree, age.
pub const FEATURE_COUNT: usize = 8;

pub use bundle::{ModelBundle, Prediction};
pub use error::PredictError;
