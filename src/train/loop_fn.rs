use std::sync::atomic::Ordering;
use std::time::Instant;

use log::debug;
use rand::seq::SliceRandom;
use rand::Rng;

use crate::error::Result;
use crate::loss::mse::MseLoss;
use crate::math::matrix::Matrix;
use crate::network::network::Network;
use crate::train::epoch_stats::EpochStats;
use crate::train::train_config::TrainConfig;
use crate::train::trainer::check_dataset;

// ---------------------------------------------------------------------------
// Public entry point
// ---------------------------------------------------------------------------

/// Trains `network` for `config.epochs` epochs and returns the statistics of
/// the **last completed epoch** (`None` if no epoch ran).
///
/// Each epoch trains on every sample once, then tests every sample and
/// reports the share the network's scoring predicate accepted.
///
/// # Early termination
/// The loop breaks early if:
/// - the `progress_tx` receiver has been dropped, **or**
/// - `config.stop_flag` is set to `true`.
///
/// # Errors
/// `Configuration` if `inputs` is empty or the lengths differ; any error
/// raised by `Network::train` or `Network::test`.
pub fn train_loop<R: Rng + ?Sized>(
    network: &mut Network,
    inputs: &[Matrix],
    targets: &[Matrix],
    config: &TrainConfig,
    rng: &mut R,
) -> Result<Option<EpochStats>> {
    check_dataset(inputs, targets)?;

    let mut last = None;
    let mut order: Vec<usize> = (0..inputs.len()).collect();

    for epoch in 1..=config.epochs {
        if stop_requested(config) {
            break;
        }

        let t_start = Instant::now();

        if config.shuffle {
            order.shuffle(rng);
        }
        let train_loss = run_one_epoch(network, inputs, targets, &order)?;
        let success_rate = score_dataset(network, inputs, targets)?;

        let stats = EpochStats {
            epoch,
            total_epochs: config.epochs,
            train_loss,
            success_rate,
            elapsed_ms: t_start.elapsed().as_millis() as u64,
        };
        debug!(
            "epoch {}/{}: loss {:.6}, success {:.1}% ({} ms)",
            stats.epoch, stats.total_epochs, stats.train_loss, stats.success_rate, stats.elapsed_ms
        );

        last = Some(stats.clone());

        if let Some(ref tx) = config.progress_tx {
            // If the receiver has been dropped, stop training.
            if tx.send(stats).is_err() {
                break;
            }
        }
    }

    Ok(last)
}

// ---------------------------------------------------------------------------
// Private helpers
// ---------------------------------------------------------------------------

fn stop_requested(config: &TrainConfig) -> bool {
    config
        .stop_flag
        .as_ref()
        .map_or(false, |flag| flag.load(Ordering::Relaxed))
}

/// Trains once on every sample in `order`. Returns the mean loss.
fn run_one_epoch(
    network: &mut Network,
    inputs: &[Matrix],
    targets: &[Matrix],
    order: &[usize],
) -> Result<f64> {
    let mut total_loss = 0.0;
    for &idx in order {
        let output = network.train(&inputs[idx], &targets[idx])?;
        total_loss += MseLoss::loss(&output, &targets[idx])?;
    }
    Ok(total_loss / order.len() as f64)
}

/// Percentage of samples the scoring predicate accepts.
fn score_dataset(network: &mut Network, inputs: &[Matrix], targets: &[Matrix]) -> Result<f64> {
    let mut correct = 0;
    for (input, target) in inputs.iter().zip(targets) {
        if network.test(input, target)?.is_correct() {
            correct += 1;
        }
    }
    Ok(correct as f64 / inputs.len() as f64 * 100.0)
}
