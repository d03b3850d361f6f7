//! Nearest-neighbor classifier
//!
//! A deliberately small model: z-scored feature vectors, Euclidean
//! distance, majority vote over k neighbors. Fit on whatever labeled
//! window the backtest produces; there is no hyperparameter search and
//! no walk-forward validation.

use super::Decision;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// k-NN model errors
#[derive(Debug, Error)]
pub enum KnnError {
    /// Fit called with no rows or mismatched lengths
    #[error("invalid training set: {0}")]
    InvalidTrainingSet(String),
    /// Predict called before fit
    #[error("model has not been fit")]
    NotFitted,
    /// Save/load I/O failure
    #[error("model file error: {0}")]
    Io(#[from] std::io::Error),
    /// Save/load encoding failure
    #[error("model encode error: {0}")]
    Encode(#[from] serde_json::Error),
}

/// k-nearest-neighbor classifier over feature vectors
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnnClassifier {
    k: usize,
    features: Vec<Vec<f64>>,
    labels: Vec<Decision>,
    means: Vec<f64>,
    stds: Vec<f64>,
}

impl KnnClassifier {
    /// Create an unfit classifier with the given neighbor count
    pub fn new(k: usize) -> Self {
        Self {
            k: k.max(1),
            features: Vec::new(),
            labels: Vec::new(),
            means: Vec::new(),
            stds: Vec::new(),
        }
    }

    /// Number of stored training rows
    pub fn len(&self) -> usize {
        self.features.len()
    }

    /// Whether the model holds no training data
    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// Fit on feature vectors and their labels
    ///
    /// Features are standardized with fit-time means and deviations so the
    /// large-magnitude columns (the SMAs) do not dominate the distance.
    pub fn fit(&mut self, features: Vec<Vec<f64>>, labels: Vec<Decision>) -> Result<(), KnnError> {
        if features.is_empty() {
            return Err(KnnError::InvalidTrainingSet("no rows".to_string()));
        }
        if features.len() != labels.len() {
            return Err(KnnError::InvalidTrainingSet(format!(
                "{} rows vs {} labels",
                features.len(),
                labels.len()
            )));
        }
        let dims = features[0].len();
        if features.iter().any(|f| f.len() != dims) {
            return Err(KnnError::InvalidTrainingSet(
                "inconsistent feature dimensions".to_string(),
            ));
        }

        let n = features.len() as f64;
        let mut means = vec![0.0; dims];
        for row in &features {
            for (m, v) in means.iter_mut().zip(row) {
                *m += v / n;
            }
        }

        let mut stds = vec![0.0; dims];
        for row in &features {
            for ((s, v), m) in stds.iter_mut().zip(row).zip(&means) {
                *s += (v - m).powi(2) / n;
            }
        }
        for s in &mut stds {
            *s = s.sqrt();
            if *s == 0.0 {
                *s = 1.0;
            }
        }

        self.features = features
            .into_iter()
            .map(|row| standardize(&row, &means, &stds))
            .collect();
        self.labels = labels;
        self.means = means;
        self.stds = stds;

        tracing::debug!(rows = self.features.len(), k = self.k, "Fit knn model");
        Ok(())
    }

    /// Predict a decision by majority vote over the k nearest neighbors
    ///
    /// Buy/Sell ties resolve to Hold, which also absorbs the untrained
    /// corner cases a larger model would reject.
    pub fn predict(&self, features: &[f64]) -> Result<Decision, KnnError> {
        if self.features.is_empty() {
            return Err(KnnError::NotFitted);
        }

        let query = standardize(features, &self.means, &self.stds);

        let mut distances: Vec<(f64, Decision)> = self
            .features
            .iter()
            .zip(&self.labels)
            .map(|(row, &label)| (euclidean(row, &query), label))
            .collect();
        distances.sort_by(|a, b| a.0.total_cmp(&b.0));

        let mut buys = 0usize;
        let mut sells = 0usize;
        for (_, label) in distances.iter().take(self.k) {
            match label {
                Decision::Buy => buys += 1,
                Decision::Sell => sells += 1,
                Decision::Hold => {}
            }
        }

        Ok(match buys.cmp(&sells) {
            std::cmp::Ordering::Greater => Decision::Buy,
            std::cmp::Ordering::Less => Decision::Sell,
            std::cmp::Ordering::Equal => Decision::Hold,
        })
    }

    /// Save the fitted model as JSON
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), KnnError> {
        let file = std::fs::File::create(path)?;
        serde_json::to_writer(file, self)?;
        Ok(())
    }

    /// Load a model saved with [`save`](Self::save)
    pub fn load(path: impl AsRef<Path>) -> Result<Self, KnnError> {
        let file = std::fs::File::open(path)?;
        Ok(serde_json::from_reader(file)?)
    }
}

fn standardize(row: &[f64], means: &[f64], stds: &[f64]) -> Vec<f64> {
    row.iter()
        .zip(means)
        .zip(stds)
        .map(|((v, m), s)| (v - m) / s)
        .collect()
}

fn euclidean(a: &[f64], b: &[f64]) -> f64 {
    a.iter()
        .zip(b)
        .map(|(x, y)| (x - y).powi(2))
        .sum::<f64>()
        .sqrt()
}
