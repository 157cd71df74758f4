use rand::Rng;

use crate::error::{NnError, Result};
use crate::math::matrix::Matrix;

/// One affine transform: `z = weights · input + bias`.
#[derive(Debug, Clone)]
pub struct Layer {
    /// Shape (nodes, previous layer's nodes).
    pub weights: Matrix,
    /// Column vector of length `nodes`.
    pub bias: Matrix,
    input: Option<Matrix>, // activation that fed this layer on the last training pass
}

impl Layer {
    pub fn new<R: Rng + ?Sized>(nodes: usize, prev_nodes: usize, rng: &mut R) -> Result<Layer> {
        if nodes == 0 || prev_nodes == 0 {
            return Err(NnError::DimensionMismatch(format!(
                "Layer: {nodes} nodes fed by {prev_nodes} is empty"
            )));
        }
        Ok(Layer::random(nodes, prev_nodes, rng))
    }

    /// Fresh random layer with this layer's shape.
    pub(crate) fn reinitialized<R: Rng + ?Sized>(&self, rng: &mut R) -> Layer {
        Layer::random(self.nodes(), self.inputs(), rng)
    }

    fn random<R: Rng + ?Sized>(nodes: usize, prev_nodes: usize, rng: &mut R) -> Layer {
        Layer {
            weights: Matrix::random(nodes, prev_nodes, rng),
            bias: Matrix::random(nodes, 1, rng),
            input: None,
        }
    }

    /// Wraps prebuilt matrices (crossover, deserialization) with no random init.
    pub fn from_matrices(weights: Matrix, bias: Matrix) -> Result<Layer> {
        if !bias.is_column() || bias.rows() != weights.rows() {
            return Err(NnError::DimensionMismatch(format!(
                "Layer: bias {}x{} does not fit weights {}x{}",
                bias.rows(),
                bias.cols(),
                weights.rows(),
                weights.cols()
            )));
        }
        Ok(Layer { weights, bias, input: None })
    }

    pub fn nodes(&self) -> usize {
        self.weights.rows()
    }

    /// Node count of the layer feeding this one.
    pub fn inputs(&self) -> usize {
        self.weights.cols()
    }

    /// Activation cached by the most recent training pass.
    pub fn cached_input(&self) -> Result<&Matrix> {
        self.input
            .as_ref()
            .ok_or_else(|| NnError::NotReady("Layer: no training pass has cached an input yet".into()))
    }

    pub(crate) fn cache_input(&mut self, input: Matrix) {
        self.input = Some(input);
    }

    /// Resamples each weight and bias independently with probability `power`.
    /// Replaced values are fresh draws from [-1, 1), not perturbations.
    pub fn mutate<R: Rng + ?Sized>(&mut self, power: f64, rng: &mut R) {
        let mut resample = |v: f64, _: usize, _: usize| {
            if rng.gen::<f64>() < power {
                Matrix::random_value(rng)
            } else {
                v
            }
        };
        self.weights.map(&mut resample);
        self.bias.map(&mut resample);
    }
}
