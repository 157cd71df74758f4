use crate::{
    error::{NnError, Result},
    math::matrix::Matrix,
    network::network::Network,
    loss::mse::MseLoss,
};

/// One sequential pass of `Network::train` over the dataset.
/// Returns the mean loss of the pre-update outputs.
pub fn train_network(
    network: &mut Network,
    inputs: &[Matrix],
    expected_outputs: &[Matrix],
) -> Result<f64> {
    check_dataset(inputs, expected_outputs)?;

    let mut total_loss = 0.0;

    for (input, expected) in inputs.iter().zip(expected_outputs.iter()) {
        let output = network.train(input, expected)?;
        total_loss += MseLoss::loss(&output, expected)?;
    }

    Ok(total_loss / inputs.len() as f64)
}

pub(crate) fn check_dataset(inputs: &[Matrix], expected_outputs: &[Matrix]) -> Result<()> {
    if inputs.is_empty() {
        return Err(NnError::Configuration("training inputs must not be empty".into()));
    }
    if inputs.len() != expected_outputs.len() {
        return Err(NnError::Configuration(format!(
            "{} inputs but {} expected outputs",
            inputs.len(),
            expected_outputs.len()
        )));
    }
    Ok(())
}
