use crate::FEATURE_COUNT;
use anyhow::{bail, Context, Result};
use ndarray::{Array2, Axis};
use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};
use std::fs;
use std::path::Path;

/// CSV header names for the 8 feature columns, in model input order.
pub const CSV_FEATURE_COLUMNS: [&str; FEATURE_COUNT] = [
    "Pregnancies",
    "Glucose",
    "BloodPressure",
    "SkinThickness",
    "Insulin",
    "BMI",
    "DiabetesPedigreeFunction",
    "Age",
];

pub const OUTCOME_COLUMN: &str = "Outcome";

/// A labeled feature matrix: one row per patient, columns in
/// [`CSV_FEATURE_COLUMNS`] order, binary outcome labels.
#[derive(Debug, Clone)]
pub struct Dataset {
    pub features: Array2<f64>,
    pub labels: Vec<u8>,
}

impl Dataset {
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

/// Load the diabetes dataset from a headered CSV file. Columns are
/// addressed by header name, so extra columns and reordering are fine;
/// a missing required column or a non-numeric cell is an error.
pub fn load_csv(path: &Path) -> Result<Dataset> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read dataset at {}", path.display()))?;
    parse_csv(&text).with_context(|| format!("malformed dataset at {}", path.display()))
}

fn parse_csv(text: &str) -> Result<Dataset> {
    let mut lines = text.lines().filter(|l| !l.trim().is_empty());

    let header_line = match lines.next() {
        Some(l) => l,
        None => bail!("dataset is empty"),
    };
    let header: Vec<&str> = header_line.split(',').map(str::trim).collect();

    let column_index = |name: &str| -> Result<usize> {
        header
            .iter()
            .position(|h| *h == name)
            .with_context(|| format!("dataset is missing required column '{name}'"))
    };

    let feature_idx: Vec<usize> = CSV_FEATURE_COLUMNS
        .iter()
        .map(|name| column_index(name))
        .collect::<Result<_>>()?;
    let outcome_idx = column_index(OUTCOME_COLUMN)?;

    let mut values = Vec::new();
    let mut labels = Vec::new();
    for (lineno, line) in lines.enumerate() {
        let cells: Vec<&str> = line.split(',').map(str::trim).collect();
        if cells.len() != header.len() {
            bail!(
                "row {} has {} cells, header has {}",
                lineno + 2,
                cells.len(),
                header.len()
            );
        }

        for (&idx, name) in feature_idx.iter().zip(CSV_FEATURE_COLUMNS.iter()) {
            let v: f64 = cells[idx].parse().with_context(|| {
                format!("row {}: non-numeric {} value '{}'", lineno + 2, name, cells[idx])
            })?;
            values.push(v);
        }

        let label = match cells[outcome_idx] {
            "0" => 0,
            "1" => 1,
            other => bail!("row {}: outcome must be 0 or 1, got '{}'", lineno + 2, other),
        };
        labels.push(label);
    }

    if labels.is_empty() {
        bail!("dataset has a header but no rows");
    }

    let features = Array2::from_shape_vec((labels.len(), FEATURE_COUNT), values)
        .expect("row-major feature buffer matches row count");
    Ok(Dataset { features, labels })
}

/// Shuffle rows with a fixed seed and split off `test_fraction` of them as
/// the held-out partition. The seed is configuration: the same seed always
/// yields the same partition.
pub fn train_test_split(ds: &Dataset, test_fraction: f64, seed: u64) -> Result<(Dataset, Dataset)> {
    if !(0.0..1.0).contains(&test_fraction) {
        bail!("test fraction must be in [0, 1), got {test_fraction}");
    }

    let n = ds.len();
    let n_test = ((n as f64) * test_fraction).round() as usize;
    if n_test == 0 || n_test == n {
        bail!("dataset too small to split: {} rows, test fraction {}", n, test_fraction);
    }

    let mut order: Vec<usize> = (0..n).collect();
    let mut rng = StdRng::seed_from_u64(seed);
    order.shuffle(&mut rng);

    let (test_idx, train_idx) = order.split_at(n_test);

    let take = |idx: &[usize]| Dataset {
        features: ds.features.select(Axis(0), idx),
        labels: idx.iter().map(|&i| ds.labels[i]).collect(),
    };

    Ok((take(train_idx), take(test_idx)))
}
