//! Fitness-proportionate ("roulette wheel") parent selection.

use log::warn;
use rand::Rng;

use crate::error::{NnError, Result};

/// Draws allowed before giving up on finding two distinct parents.
pub const MAX_SELECTION_ATTEMPTS: usize = 1000;

/// Picks two distinct indices into `fitnesses`, each with probability
/// proportional to its fitness. `total` must be the sum of `fitnesses`.
///
/// Both thresholds are redrawn whenever they land on the same individual.
pub fn choose_parents<R: Rng + ?Sized>(
    fitnesses: &[f64],
    total: f64,
    rng: &mut R,
) -> Result<(usize, usize)> {
    if fitnesses.len() < 2 {
        return Err(NnError::SelectionExhausted(format!(
            "need at least 2 survivors to breed, have {}",
            fitnesses.len()
        )));
    }
    if !(total > 0.0) {
        return Err(NnError::NotReady(
            "parents cannot be selected from a zero fitness range".into(),
        ));
    }

    for attempt in 1..=MAX_SELECTION_ATTEMPTS {
        let a = spin(fitnesses, rng.gen::<f64>() * total);
        let b = spin(fitnesses, rng.gen::<f64>() * total);
        if a != b {
            return Ok((a, b));
        }
        if attempt == MAX_SELECTION_ATTEMPTS / 2 {
            warn!("parent selection keeps drawing the same individual ({attempt} attempts so far)");
        }
    }

    Err(NnError::SelectionExhausted(format!(
        "no two distinct parents found in {MAX_SELECTION_ATTEMPTS} attempts"
    )))
}

/// First index whose running fitness sum reaches `threshold`.
pub(crate) fn spin(fitnesses: &[f64], threshold: f64) -> usize {
    let mut sum = 0.0;
    for (i, fitness) in fitnesses.iter().enumerate() {
        sum += fitness;
        if sum >= threshold {
            return i;
        }
    }
    // Only reachable through rounding when threshold is within an ulp of the total.
    fitnesses.len() - 1
}
