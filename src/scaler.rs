use anyhow::{bail, Result};
use ndarray::{Array1, Array2, Axis};
use serde::{Deserialize, Serialize};

/// Per-feature standardization: subtract the training mean, divide by the
/// training standard deviation. Fitted once by the trainer, read-only at
/// inference time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StandardScaler {
    mean: Array1<f64>,
    std: Array1<f64>,
}

impl StandardScaler {
    /// Fit mean and standard deviation on training features only.
    ///
    /// Zero-variance columns get a divisor of 1.0 so they pass through as
    /// zero after centering instead of producing NaN.
    pub fn fit(x: &Array2<f64>) -> Result<Self> {
        let n = x.nrows();
        if n == 0 {
            bail!("cannot fit scaler on an empty matrix");
        }

        let mean = x
            .mean_axis(Axis(0))
            .expect("nonempty matrix has a column mean");

        let mut std = Array1::zeros(x.ncols());
        for (j, col) in x.axis_iter(Axis(1)).enumerate() {
            let m = mean[j];
            let var = col.iter().map(|v| (v - m) * (v - m)).sum::<f64>() / n as f64;
            let s = var.sqrt();
            std[j] = if s > 0.0 { s } else { 1.0 };
        }

        Ok(Self { mean, std })
    }

    pub fn n_features(&self) -> usize {
        self.mean.len()
    }

    pub fn transform(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        if x.ncols() != self.n_features() {
            bail!(
                "feature width mismatch: got {}, scaler expects {}",
                x.ncols(),
                self.n_features()
            );
        }
        let mut out = x.clone();
        for mut row in out.axis_iter_mut(Axis(0)) {
            for j in 0..row.len() {
                row[j] = (row[j] - self.mean[j]) / self.std[j];
            }
        }
        Ok(out)
    }

    pub fn transform_row(&self, row: &[f64]) -> Result<Vec<f64>> {
        if row.len() != self.n_features() {
            bail!(
                "feature length mismatch: got {}, scaler expects {}",
                row.len(),
                self.n_features()
            );
        }
        Ok(row
            .iter()
            .enumerate()
            .map(|(j, v)| (v - self.mean[j]) / self.std[j])
            .collect())
    }
}
