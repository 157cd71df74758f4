pub mod config;
pub mod population;
pub mod selection;
pub mod stats;

pub use config::EvolutionConfig;
pub use population::{Evolution, EvolutionBuilder, FitnessFn, GenerationObserver, Individual};
pub use stats::GenerationStats;
