//! Decision model module
//!
//! Feature engineering over the rolling window plus the two decision
//! models: the hardcoded RSI threshold rule and a small nearest-neighbor
//! classifier fit from the backfilled history.

mod features;
mod indicators;
mod knn;

pub use features::{compute_labels, feature_engineer, fibonacci_lags, FeatureRow};
pub use indicators::{log_return, rsi, sma};
pub use knn::{KnnClassifier, KnnError};

use serde::{Deserialize, Serialize};

/// RSI below this is treated as oversold
pub const RSI_OVERSOLD: f64 = 30.0;
/// RSI above this is treated as overbought
pub const RSI_OVERBOUGHT: f64 = 70.0;

/// Per-bar trading decision
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Decision {
    Buy,
    Sell,
    Hold,
}

impl std::fmt::Display for Decision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Decision::Buy => write!(f, "buy"),
            Decision::Sell => write!(f, "sell"),
            Decision::Hold => write!(f, "hold"),
        }
    }
}

/// A decision model over engineered feature rows
#[derive(Debug, Clone)]
pub enum DecisionModel {
    /// Oversold-buy / overbought-sell on the latest RSI
    Threshold,
    /// Nearest-neighbor vote over the latest feature vector
    Knn(KnnClassifier),
}

impl DecisionModel {
    /// Decide on the latest engineered row
    pub fn decide(&self, latest: &FeatureRow) -> Decision {
        match self {
            DecisionModel::Threshold => {
                if latest.rsi < RSI_OVERSOLD {
                    Decision::Buy
                } else if latest.rsi > RSI_OVERBOUGHT {
                    Decision::Sell
                } else {
                    Decision::Hold
                }
            }
            DecisionModel::Knn(model) => {
                model.predict(&latest.to_vector()).unwrap_or(Decision::Hold)
            }
        }
    }
}
