use serde::{Serialize, Deserialize};

use crate::activation::activation::ActivationFunction;
use crate::error::{NnError, Result};

/// Everything needed to build a `Network` apart from its weights and its
/// scoring predicate.
///
/// Fields:
/// - `layer_sizes`            — node count per layer, input first; at least two entries
/// - `learning_rate`          — step size applied to every gradient (default 0.1)
/// - `batch_size`             — accepted for compatibility; every `train` call
///                              still applies its update immediately
/// - `activation`             — element-wise strategy (only `sigmoid`)
/// - `log_tests`              — log every `test` call at info level
/// - `track_training_success` — score training passes into the success counters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    pub layer_sizes: Vec<usize>,
    pub learning_rate: f64,
    pub batch_size: usize,
    pub activation: ActivationFunction,
    pub log_tests: bool,
    pub track_training_success: bool,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        NetworkConfig {
            layer_sizes: Vec::new(),
            learning_rate: 0.1,
            batch_size: 1,
            activation: ActivationFunction::Sigmoid,
            log_tests: false,
            track_training_success: false,
        }
    }
}

impl NetworkConfig {
    pub fn new(layer_sizes: Vec<usize>) -> Self {
        NetworkConfig { layer_sizes, ..Default::default() }
    }

    pub fn with_learning_rate(mut self, learning_rate: f64) -> Self {
        self.learning_rate = learning_rate;
        self
    }

    /// Checks everything except `layer_sizes`, which prebuilt layers supply themselves.
    pub(crate) fn validate_hyperparameters(&self) -> Result<()> {
        if !(self.learning_rate > 0.0) {
            return Err(NnError::Configuration(format!(
                "learning_rate must be positive, got {}",
                self.learning_rate
            )));
        }
        if self.batch_size == 0 {
            return Err(NnError::Configuration("batch_size must be at least 1".into()));
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.layer_sizes.len() < 2 {
            return Err(NnError::Configuration(format!(
                "at least 2 layer sizes are required, got {}",
                self.layer_sizes.len()
            )));
        }
        if self.layer_sizes.contains(&0) {
            return Err(NnError::Configuration("layer sizes must be positive".into()));
        }
        self.validate_hyperparameters()
    }

    pub fn from_json(json: &str) -> Result<NetworkConfig> {
        let config: NetworkConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads and validates a config file.
    pub fn load_json(path: &str) -> Result<NetworkConfig> {
        let file = std::fs::File::open(path)?;
        let reader = std::io::BufReader::new(file);
        let config: NetworkConfig = serde_json::from_reader(reader)?;
        config.validate()?;
        Ok(config)
    }
}
