use anyhow::{bail, Result};
use ndarray::Array2;
use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};

/// A single CART node. Leaves store the fraction of positive training
/// samples that reached them, which is the tree's probability estimate.
#[derive(Debug, Clone, Serialize, Deserialize)]
enum Node {
    Leaf {
        positive: f64,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: Box<Node>,
        right: Box<Node>,
    },
}

impl Node {
    fn proba(&self, x: &[f64]) -> f64 {
        match self {
            Node::Leaf { positive } => *positive,
            Node::Split {
                feature,
                threshold,
                left,
                right,
            } => {
                if x[*feature] <= *threshold {
                    left.proba(x)
                } else {
                    right.proba(x)
                }
            }
        }
    }
}

/// Training knobs for [`RandomForest::fit`]. The seed is explicit
/// configuration so repeated training runs produce identical artifacts.
#[derive(Debug, Clone)]
pub struct ForestParams {
    pub n_trees: usize,
    pub max_depth: usize,
    pub min_samples_split: usize,
    pub seed: u64,
}

impl Default for ForestParams {
    fn default() -> Self {
        Self {
            n_trees: 100,
            max_depth: 16,
            min_samples_split: 2,
            seed: 42,
        }
    }
}

/// Bagged ensemble of binary CART trees with gini splitting.
///
/// Each tree is grown on a bootstrap resample of the training rows and
/// considers a random sqrt-sized feature subset at every split. The ensemble
/// probability is the mean of per-tree leaf fractions; the hard label is
/// 1 iff that probability reaches 0.5.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RandomForest {
    n_features: usize,
    trees: Vec<Node>,
}

impl RandomForest {
    pub fn fit(x: &Array2<f64>, y: &[u8], params: &ForestParams) -> Result<Self> {
        let n = x.nrows();
        if n == 0 {
            bail!("cannot fit forest on an empty matrix");
        }
        if y.len() != n {
            bail!("label count {} does not match row count {}", y.len(), n);
        }
        if let Some(bad) = y.iter().find(|&&l| l > 1) {
            bail!("labels must be 0 or 1, got {}", bad);
        }
        if params.n_trees == 0 {
            bail!("forest needs at least one tree");
        }

        let n_features = x.ncols();
        let m_try = ((n_features as f64).sqrt() as usize).max(1);
        let mut rng = StdRng::seed_from_u64(params.seed);

        let mut trees = Vec::with_capacity(params.n_trees);
        for _ in 0..params.n_trees {
            let indices: Vec<usize> = (0..n).map(|_| rng.gen_range(0..n)).collect();
            trees.push(build_node(x, y, &indices, 0, m_try, params, &mut rng));
        }

        Ok(Self { n_features, trees })
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    /// Positive-class probability for one feature vector.
    pub fn predict_proba(&self, x: &[f64]) -> Result<f64> {
        if x.len() != self.n_features {
            bail!(
                "feature length mismatch: got {}, forest expects {}",
                x.len(),
                self.n_features
            );
        }
        let sum: f64 = self.trees.iter().map(|t| t.proba(x)).sum();
        Ok(sum / self.trees.len() as f64)
    }

    /// Hard 0/1 label, derived from the probability.
    pub fn predict(&self, x: &[f64]) -> Result<u8> {
        Ok(if self.predict_proba(x)? >= 0.5 { 1 } else { 0 })
    }
}

fn gini(pos: usize, n: usize) -> f64 {
    if n == 0 {
        return 0.0;
    }
    let p = pos as f64 / n as f64;
    2.0 * p * (1.0 - p)
}

/// Random sqrt-sized feature subset for one split, without replacement.
fn sample_features(rng: &mut StdRng, n_features: usize, m_try: usize) -> Vec<usize> {
    let mut pool: Vec<usize> = (0..n_features).collect();
    let mut picked = Vec::with_capacity(m_try);
    for _ in 0..m_try.min(n_features) {
        let k = rng.gen_range(0..pool.len());
        picked.push(pool.swap_remove(k));
    }
    picked
}

fn build_node(
    x: &Array2<f64>,
    y: &[u8],
    indices: &[usize],
    depth: usize,
    m_try: usize,
    params: &ForestParams,
    rng: &mut StdRng,
) -> Node {
    let n = indices.len();
    let pos = indices.iter().filter(|&&i| y[i] == 1).count();
    let positive = pos as f64 / n as f64;

    let pure = pos == 0 || pos == n;
    if pure || depth >= params.max_depth || n < params.min_samples_split {
        return Node::Leaf { positive };
    }

    let parent = gini(pos, n);
    let mut best: Option<(usize, f64, f64)> = None; // (feature, threshold, score)

    for f in sample_features(rng, x.ncols(), m_try) {
        let mut vals: Vec<(f64, u8)> = indices.iter().map(|&i| (x[[i, f]], y[i])).collect();
        vals.sort_by(|a, b| a.0.partial_cmp(&b.0).expect("finite feature values"));

        let mut left_n = 0usize;
        let mut left_pos = 0usize;
        for k in 0..n - 1 {
            left_n += 1;
            if vals[k].1 == 1 {
                left_pos += 1;
            }
            // Only split between distinct values.
            if vals[k].0 == vals[k + 1].0 {
                continue;
            }
            let right_n = n - left_n;
            let right_pos = pos - left_pos;
            let score = (left_n as f64 * gini(left_pos, left_n)
                + right_n as f64 * gini(right_pos, right_n))
                / n as f64;
            if best.map_or(true, |(_, _, s)| score < s) {
                let threshold = (vals[k].0 + vals[k + 1].0) / 2.0;
                best = Some((f, threshold, score));
            }
        }
    }

    let (feature, threshold, score) = match best {
        Some(b) => b,
        None => return Node::Leaf { positive },
    };
    if score >= parent {
        // No impurity reduction on the sampled features.
        return Node::Leaf { positive };
    }

    let (left_idx, right_idx): (Vec<usize>, Vec<usize>) = indices
        .iter()
        .copied()
        .partition(|&i| x[[i, feature]] <= threshold);

    Node::Split {
        feature,
        threshold,
        left: Box::new(build_node(x, y, &left_idx, depth + 1, m_try, params, rng)),
        right: Box::new(build_node(x, y, &right_idx, depth + 1, m_try, params, rng)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array2;

    fn separable_data() -> (Array2<f64>, Vec<u8>) {
        // Two clusters split cleanly on the first feature.
        let mut rows = Vec::new();
        let mut labels = Vec::new();
        for i in 0..40 {
            let jitter = (i % 7) as f64 * 0.01;
            if i % 2 == 0 {
                rows.extend_from_slice(&[1.0 + jitter, 5.0 - jitter]);
                labels.push(0);
            } else {
                rows.extend_from_slice(&[9.0 + jitter, 5.0 + jitter]);
                labels.push(1);
            }
        }
        (Array2::from_shape_vec((40, 2), rows).unwrap(), labels)
    }

    #[test]
    fn learns_a_separable_problem() {
        let (x, y) = separable_data();
        let forest = RandomForest::fit(&x, &y, &ForestParams::default()).unwrap();

        for (row, &label) in x.outer_iter().zip(&y) {
            let features: Vec<f64> = row.to_vec();
            assert_eq!(forest.predict(&features).unwrap(), label);
        }
    }

    #[test]
    fn probability_stays_in_unit_interval() {
        let (x, y) = separable_data();
        let forest = RandomForest::fit(&x, &y, &ForestParams::default()).unwrap();

        for row in x.outer_iter() {
            let p = forest.predict_proba(&row.to_vec()).unwrap();
            assert!((0.0..=1.0).contains(&p), "probability out of range: {p}");
        }
    }

    #[test]
    fn label_tracks_probability_threshold() {
        let (x, y) = separable_data();
        let forest = RandomForest::fit(&x, &y, &ForestParams::default()).unwrap();

        for row in x.outer_iter() {
            let features = row.to_vec();
            let p = forest.predict_proba(&features).unwrap();
            let label = forest.predict(&features).unwrap();
            assert_eq!(label == 1, p >= 0.5);
        }
    }

    #[test]
    fn same_seed_gives_identical_forest() {
        let (x, y) = separable_data();
        let params = ForestParams {
            n_trees: 10,
            seed: 7,
            ..ForestParams::default()
        };
        let a = RandomForest::fit(&x, &y, &params).unwrap();
        let b = RandomForest::fit(&x, &y, &params).unwrap();

        let bytes_a = bincode::serialize(&a).unwrap();
        let bytes_b = bincode::serialize(&b).unwrap();
        assert_eq!(bytes_a, bytes_b, "seeded training must be deterministic");
    }

    #[test]
    fn rejects_bad_inputs() {
        let (x, y) = separable_data();
        assert!(RandomForest::fit(&x, &y[..10], &ForestParams::default()).is_err());
        assert!(RandomForest::fit(&x, &vec![2u8; 40], &ForestParams::default()).is_err());

        let forest = RandomForest::fit(&x, &y, &ForestParams::default()).unwrap();
        assert!(forest.predict_proba(&[1.0]).is_err());
    }
}
