use serde::{Serialize, Deserialize};

use crate::error::{NnError, Result};

/// Hyperparameters of the generational loop.
///
/// - `size`           — individuals per generation
/// - `kill_rate`      — share of the population removed each generation, weakest first
/// - `mutation_rate`  — probability that an offspring is mutated at all
/// - `mutation_power` — per-scalar resampling probability once it is
/// - `elitism`        — keep the survivors unchanged and only breed the missing ones
/// - `log_stats`      — log every generation's fitness summary at info level
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvolutionConfig {
    pub size: usize,
    pub kill_rate: f64,
    pub mutation_rate: f64,
    pub mutation_power: f64,
    pub elitism: bool,
    pub log_stats: bool,
}

impl Default for EvolutionConfig {
    fn default() -> Self {
        EvolutionConfig {
            size: 100,
            kill_rate: 0.5,
            mutation_rate: 0.1,
            mutation_power: 0.1,
            elitism: false,
            log_stats: false,
        }
    }
}

impl EvolutionConfig {
    pub fn validate(&self) -> Result<()> {
        if self.size < 2 {
            return Err(NnError::Configuration(format!(
                "population size must be at least 2, got {}",
                self.size
            )));
        }
        for (name, value) in [
            ("kill_rate", self.kill_rate),
            ("mutation_rate", self.mutation_rate),
            ("mutation_power", self.mutation_power),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(NnError::Configuration(format!(
                    "{name} must lie in [0, 1], got {value}"
                )));
            }
        }
        Ok(())
    }

    pub fn from_json(json: &str) -> Result<EvolutionConfig> {
        let config: EvolutionConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load_json(path: &str) -> Result<EvolutionConfig> {
        let file = std::fs::File::open(path)?;
        let reader = std::io::BufReader::new(file);
        let config: EvolutionConfig = serde_json::from_reader(reader)?;
        config.validate()?;
        Ok(config)
    }
}
