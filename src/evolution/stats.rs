use serde::{Serialize, Deserialize};

/// Fitness summary of one evaluated generation, handed to the per-generation
/// observer and returned by `Evolution::run_generation`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationStats {
    /// 0-based index of the generation these numbers describe.
    pub generation: usize,
    pub sum: f64,
    pub average: f64,
    pub min: f64,
    pub max: f64,
}
