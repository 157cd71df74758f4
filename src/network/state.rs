use serde::{Serialize, Deserialize};

use crate::activation::activation::ActivationFunction;
use crate::math::matrix::Matrix;

/// Persisted numeric state of one layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerState {
    pub weights: Matrix,
    pub bias: Matrix,
}

/// Everything about a `Network` that survives a save/load cycle.
///
/// The scoring predicate is behavioral and deliberately absent; callers
/// resupply it with `Network::with_scoring` after `Network::from_state`.
/// Flags default to `false` so hand-written files may omit them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkState {
    pub layers: Vec<LayerState>,
    pub learning_rate: f64,
    pub batch_size: usize,
    #[serde(default)]
    pub activation: ActivationFunction,
    #[serde(default)]
    pub log_tests: bool,
    #[serde(default)]
    pub track_training_success: bool,
}
