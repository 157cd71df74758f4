use crate::error::{NnError, Result};
use crate::math::matrix::Matrix;

pub struct MseLoss;

impl MseLoss {
    /// Scalar MSE: mean((predicted - expected)²)
    pub fn loss(predicted: &Matrix, expected: &Matrix) -> Result<f64> {
        if predicted.rows() != expected.rows() || predicted.cols() != expected.cols() {
            return Err(NnError::DimensionMismatch(format!(
                "MseLoss: {}x{} and {}x{} do not fit",
                predicted.rows(),
                predicted.cols(),
                expected.rows(),
                expected.cols()
            )));
        }

        let predicted = predicted.to_vec();
        let n = predicted.len() as f64;
        Ok(predicted.iter().zip(expected.to_vec())
            .map(|(a, b)| (a - b).powi(2))
            .sum::<f64>() / n)
    }
}
