pub mod config;
pub mod network;
pub mod scoring;
pub mod state;

pub use config::NetworkConfig;
pub use network::Network;
pub use scoring::{Score, ScoreFn};
pub use state::{LayerState, NetworkState};
