use std::fmt;
use std::sync::Arc;

use log::info;
use rand::Rng;

use crate::activation::activation::ActivationFunction;
use crate::error::{NnError, Result};
use crate::layers::dense::Layer;
use crate::math::matrix::Matrix;
use crate::network::config::NetworkConfig;
use crate::network::scoring::{rounded_equals, Score, ScoreFn};
use crate::network::state::{LayerState, NetworkState};

/// Fully connected feed-forward network trained one example at a time.
#[derive(Clone)]
pub struct Network {
    layer_sizes: Vec<usize>,
    layers: Vec<Layer>,
    learning_rate: f64,
    batch_size: usize,
    activation: ActivationFunction,
    scoring: ScoreFn,
    log_tests: bool,
    track_training_success: bool,
    tests: usize,
    corrects: usize,
}

impl Network {
    /// Builds a network with freshly randomized layers from `config.layer_sizes`.
    pub fn new<R: Rng + ?Sized>(config: &NetworkConfig, rng: &mut R) -> Result<Network> {
        config.validate()?;
        let layers = config
            .layer_sizes
            .windows(2)
            .map(|pair| Layer::new(pair[1], pair[0], rng))
            .collect::<Result<Vec<_>>>()?;
        Ok(Network::assemble(config.layer_sizes.clone(), layers, config))
    }

    /// Builds a network around prebuilt layers.
    ///
    /// Layer sizes are read off the layers themselves; if `config.layer_sizes`
    /// is non-empty it must agree with them.
    pub fn from_layers(layers: Vec<Layer>, config: &NetworkConfig) -> Result<Network> {
        config.validate_hyperparameters()?;

        let first = layers
            .first()
            .ok_or_else(|| NnError::Configuration("at least one layer is required".into()))?;

        let mut layer_sizes = vec![first.inputs()];
        for (i, layer) in layers.iter().enumerate() {
            let prev_nodes = layer_sizes[i];
            if layer.inputs() != prev_nodes {
                return Err(NnError::Configuration(format!(
                    "layer {i} takes {} inputs but the layer before it has {prev_nodes} nodes",
                    layer.inputs()
                )));
            }
            layer_sizes.push(layer.nodes());
        }

        if !config.layer_sizes.is_empty() && config.layer_sizes != layer_sizes {
            return Err(NnError::Configuration(format!(
                "layer sizes {:?} do not match the given layers {:?}",
                config.layer_sizes, layer_sizes
            )));
        }

        Ok(Network::assemble(layer_sizes, layers, config))
    }

    fn assemble(layer_sizes: Vec<usize>, layers: Vec<Layer>, config: &NetworkConfig) -> Network {
        Network {
            layer_sizes,
            layers,
            learning_rate: config.learning_rate,
            batch_size: config.batch_size,
            activation: config.activation,
            scoring: rounded_equals(),
            log_tests: config.log_tests,
            track_training_success: config.track_training_success,
            tests: 0,
            corrects: 0,
        }
    }

    /// Replaces the scoring predicate used by `test` and training-accuracy tracking.
    pub fn with_scoring<F>(mut self, scoring: F) -> Network
    where
        F: Fn(&Matrix, &Matrix) -> Result<Score> + Send + Sync + 'static,
    {
        self.scoring = Arc::new(scoring);
        self
    }

    /// Same architecture, hyperparameters, strategy, predicate and flags as
    /// `template`, with fresh random weights. Seeds evolutionary populations.
    pub fn from_template<R: Rng + ?Sized>(template: &Network, rng: &mut R) -> Network {
        let layers = template.layers.iter().map(|layer| layer.reinitialized(rng)).collect();
        template.derive(layers)
    }

    /// Child whose weights are the per-layer average of both parents and whose
    /// biases are copied from `a` unchanged. Everything else comes from `a`.
    pub fn crossover(a: &Network, b: &Network) -> Result<Network> {
        if a.layer_sizes != b.layer_sizes {
            return Err(NnError::Configuration(format!(
                "crossover needs identical layer sizes, got {:?} and {:?}",
                a.layer_sizes, b.layer_sizes
            )));
        }

        let layers = a
            .layers
            .iter()
            .zip(&b.layers)
            .map(|(la, lb)| {
                let weights = Matrix::average(&[la.weights.clone(), lb.weights.clone()])?;
                Layer::from_matrices(weights, la.bias.clone())
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(a.derive(layers))
    }

    /// Copies every setting of `self` onto new layers, with zeroed counters.
    fn derive(&self, layers: Vec<Layer>) -> Network {
        Network {
            layer_sizes: self.layer_sizes.clone(),
            layers,
            learning_rate: self.learning_rate,
            batch_size: self.batch_size,
            activation: self.activation,
            scoring: Arc::clone(&self.scoring),
            log_tests: self.log_tests,
            track_training_success: self.track_training_success,
            tests: 0,
            corrects: 0,
        }
    }

    /// Inference only; layer caches are left alone.
    pub fn feed_forward(&self, input: &Matrix) -> Result<Matrix> {
        let mut activation = input.clone();
        for layer in &self.layers {
            activation = forward_layer(layer, &activation, self.activation)?;
        }
        Ok(activation)
    }

    /// One step of online backpropagation on a single `(input, target)` pair.
    ///
    /// Returns the output of the forward pass, computed before the update.
    pub fn train(&mut self, input: &Matrix, target: &Matrix) -> Result<Matrix> {
        let activation_fn = self.activation;
        let learning_rate = self.learning_rate;

        let mut activation = input.clone();
        for layer in &mut self.layers {
            let next = forward_layer(layer, &activation, activation_fn)?;
            layer.cache_input(std::mem::replace(&mut activation, next));
        }
        let output = activation;

        if self.track_training_success {
            let score = (self.scoring)(&output, target)?;
            self.record(score);
        }

        let mut errors = Matrix::difference(target, &output)?;
        let mut outputs = output.clone();

        for layer in self.layers.iter_mut().rev() {
            let mut gradients = outputs;
            gradients
                .map(|y, _, _| activation_fn.derivative(y))
                .multiply_matrix(&errors)?
                .multiply(learning_rate);

            let input = layer.cached_input()?.clone();
            let deltas = Matrix::dot(&gradients, &input.transpose())?;
            layer.weights.add_matrix(&deltas)?;
            layer.bias.add_matrix(&gradients)?;

            // Propagated through the weights as they are after this update.
            errors = Matrix::dot(&layer.weights.transpose(), &errors)?;
            outputs = input;
        }

        Ok(output)
    }

    /// Scores the network on one example and updates the success counters.
    pub fn test(&mut self, input: &Matrix, target: &Matrix) -> Result<Score> {
        let outputs = self.feed_forward(input)?;
        let score = (self.scoring)(&outputs, target)?;

        if self.log_tests {
            info!(
                "{}: outputs {:?} targets {:?}",
                if score.is_correct() { "correct" } else { "wrong" },
                outputs.to_vec(),
                target.to_vec()
            );
        }

        self.record(score);
        Ok(score)
    }

    fn record(&mut self, score: Score) {
        self.tests += 1;
        if score.is_correct() {
            self.corrects += 1;
        }
    }

    /// Percentage of scored examples that were correct, 0.0 if none were scored.
    /// Both counters are reset unless `persist` is set.
    pub fn success_rate(&mut self, persist: bool) -> f64 {
        let rate = if self.tests == 0 {
            0.0
        } else {
            self.corrects as f64 / self.tests as f64 * 100.0
        };
        if !persist {
            self.tests = 0;
            self.corrects = 0;
        }
        rate
    }

    /// Resamples every layer's parameters with probability `power` each.
    pub fn mutate<R: Rng + ?Sized>(&mut self, power: f64, rng: &mut R) {
        for layer in &mut self.layers {
            layer.mutate(power, rng);
        }
    }

    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    pub fn layer_sizes(&self) -> &[usize] {
        &self.layer_sizes
    }

    pub fn learning_rate(&self) -> f64 {
        self.learning_rate
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    pub fn activation(&self) -> ActivationFunction {
        self.activation
    }

    pub fn tests(&self) -> usize {
        self.tests
    }

    pub fn corrects(&self) -> usize {
        self.corrects
    }

    // ---------------------------------------------------------------------
    // Persistence
    // ---------------------------------------------------------------------

    pub fn to_state(&self) -> NetworkState {
        NetworkState {
            layers: self
                .layers
                .iter()
                .map(|layer| LayerState {
                    weights: layer.weights.clone(),
                    bias: layer.bias.clone(),
                })
                .collect(),
            learning_rate: self.learning_rate,
            batch_size: self.batch_size,
            activation: self.activation,
            log_tests: self.log_tests,
            track_training_success: self.track_training_success,
        }
    }

    /// Rebuilds a network from persisted state with the default scoring predicate.
    pub fn from_state(state: NetworkState) -> Result<Network> {
        let config = NetworkConfig {
            layer_sizes: Vec::new(),
            learning_rate: state.learning_rate,
            batch_size: state.batch_size,
            activation: state.activation,
            log_tests: state.log_tests,
            track_training_success: state.track_training_success,
        };
        let layers = state
            .layers
            .into_iter()
            .map(|layer| Layer::from_matrices(layer.weights, layer.bias))
            .collect::<Result<Vec<_>>>()?;
        Network::from_layers(layers, &config)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.to_state())?)
    }

    pub fn from_json(json: &str) -> Result<Network> {
        Network::from_state(serde_json::from_str(json)?)
    }

    /// Serializes the network state to a pretty-printed JSON file.
    pub fn save_json(&self, path: &str) -> Result<()> {
        let file = std::fs::File::create(path)?;
        let writer = std::io::BufWriter::new(file);
        serde_json::to_writer_pretty(writer, &self.to_state())?;
        Ok(())
    }

    /// Deserializes a network from a JSON file previously written by `save_json`.
    pub fn load_json(path: &str) -> Result<Network> {
        let file = std::fs::File::open(path)?;
        let reader = std::io::BufReader::new(file);
        let state: NetworkState = serde_json::from_reader(reader)?;
        Network::from_state(state)
    }
}

impl fmt::Debug for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Network")
            .field("layer_sizes", &self.layer_sizes)
            .field("layers", &self.layers)
            .field("learning_rate", &self.learning_rate)
            .field("batch_size", &self.batch_size)
            .field("activation", &self.activation)
            .field("log_tests", &self.log_tests)
            .field("track_training_success", &self.track_training_success)
            .field("tests", &self.tests)
            .field("corrects", &self.corrects)
            .finish_non_exhaustive()
    }
}

/// `f(weights · input + bias)` for one layer.
fn forward_layer(layer: &Layer, input: &Matrix, activation: ActivationFunction) -> Result<Matrix> {
    let mut z = Matrix::dot(&layer.weights, input)?;
    z.add_matrix(&layer.bias)?.map(|x, _, _| activation.function(x));
    Ok(z)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn rng() -> ChaCha8Rng {
        ChaCha8Rng::seed_from_u64(42)
    }

    fn network(sizes: &[usize]) -> Network {
        Network::new(&NetworkConfig::new(sizes.to_vec()), &mut rng()).unwrap()
    }

    #[test]
    fn new_chains_layer_shapes() {
        let net = network(&[5, 3, 2]);
        assert_eq!(net.layers().len(), 2);
        assert_eq!((net.layers()[0].weights.rows(), net.layers()[0].weights.cols()), (3, 5));
        assert_eq!((net.layers()[1].weights.rows(), net.layers()[1].weights.cols()), (2, 3));
        assert_eq!(net.layer_sizes(), &[5, 3, 2]);
    }

    #[test]
    fn new_requires_two_layer_sizes() {
        let err = Network::new(&NetworkConfig::new(vec![3]), &mut rng()).unwrap_err();
        assert!(matches!(err, NnError::Configuration(_)));
    }

    #[test]
    fn from_layers_rejects_broken_chain() {
        let layers = vec![
            Layer::from_matrices(Matrix::zeros(2, 3), Matrix::zeros(2, 1)).unwrap(),
            Layer::from_matrices(Matrix::zeros(1, 4), Matrix::zeros(1, 1)).unwrap(),
        ];
        let err = Network::from_layers(layers, &NetworkConfig::default()).unwrap_err();
        assert!(matches!(err, NnError::Configuration(_)));

        assert!(Network::from_layers(Vec::new(), &NetworkConfig::default()).is_err());
    }

    #[test]
    fn from_layers_checks_declared_sizes() {
        let layers = vec![Layer::from_matrices(Matrix::zeros(2, 3), Matrix::zeros(2, 1)).unwrap()];
        assert!(Network::from_layers(layers.clone(), &NetworkConfig::new(vec![3, 2])).is_ok());
        assert!(Network::from_layers(layers, &NetworkConfig::new(vec![3, 4])).is_err());
    }

    #[test]
    fn feed_forward_output_shape_and_range() {
        let net = network(&[5, 3, 2]);
        let out = net.feed_forward(&Matrix::from_vec(&[1.0, 2.0, 3.0, 4.0, 5.0]).unwrap()).unwrap();
        assert_eq!((out.rows(), out.cols()), (2, 1));
        assert!(out.to_vec().iter().all(|v| *v > 0.0 && *v < 1.0));

        assert!(net.feed_forward(&Matrix::from_vec(&[1.0]).unwrap()).is_err());
    }

    #[test]
    fn feed_forward_does_not_cache() {
        let net = network(&[2, 2, 1]);
        net.feed_forward(&Matrix::from_vec(&[0.0, 1.0]).unwrap()).unwrap();
        assert!(net.layers()[0].cached_input().is_err());
    }

    #[test]
    fn train_leaves_arguments_untouched() {
        let mut net = network(&[5, 3, 2]);
        let inputs = Matrix::from_vec(&[1.0, 2.0, 3.0, 4.0, 5.0]).unwrap();
        let targets = Matrix::from_vec(&[6.0, 7.0]).unwrap();
        net.train(&inputs, &targets).unwrap();
        assert_eq!(inputs.to_vec(), vec![1.0, 2.0, 3.0, 4.0, 5.0]);
        assert_eq!(targets.to_vec(), vec![6.0, 7.0]);
        assert_eq!(net.layers()[0].cached_input().unwrap(), &inputs);
    }

    #[test]
    fn train_rejects_wrong_target_shape() {
        let mut net = network(&[2, 2, 1]);
        let err = net
            .train(&Matrix::from_vec(&[0.0, 1.0]).unwrap(), &Matrix::from_vec(&[1.0, 0.0]).unwrap())
            .unwrap_err();
        assert!(matches!(err, NnError::DimensionMismatch(_)));
    }

    #[test]
    fn training_tracking_feeds_counters() {
        let mut config = NetworkConfig::new(vec![2, 2, 1]);
        config.track_training_success = true;
        let mut net = Network::new(&config, &mut rng()).unwrap().with_scoring(|_, _| Ok(Score::Pass(true)));

        net.train(&Matrix::from_vec(&[0.0, 1.0]).unwrap(), &Matrix::from_vec(&[1.0]).unwrap()).unwrap();
        net.train(&Matrix::from_vec(&[1.0, 1.0]).unwrap(), &Matrix::from_vec(&[0.0]).unwrap()).unwrap();
        assert_eq!((net.tests(), net.corrects()), (2, 2));

        let mut untracked = network(&[2, 2, 1]);
        untracked.train(&Matrix::from_vec(&[0.0, 1.0]).unwrap(), &Matrix::from_vec(&[1.0]).unwrap()).unwrap();
        assert_eq!(untracked.tests(), 0);
    }

    #[test]
    fn success_rate_resets_unless_persisted() {
        let mut net = network(&[2, 1]);
        let input = Matrix::from_vec(&[0.5, 0.5]).unwrap();
        let output = net.feed_forward(&input).unwrap().round();
        let wrong = Matrix::from_vec(&[1.0 - output.to_vec()[0]]).unwrap();

        for _ in 0..3 {
            assert!(net.test(&input, &output).unwrap().is_correct());
        }
        assert!(!net.test(&input, &wrong).unwrap().is_correct());

        assert_eq!(net.success_rate(true), 75.0);
        assert_eq!(net.tests(), 4);
        assert_eq!(net.success_rate(false), 75.0);
        assert_eq!((net.tests(), net.corrects()), (0, 0));
        assert_eq!(net.success_rate(false), 0.0);
    }

    #[test]
    fn numeric_scoring_predicate() {
        let mut net = network(&[2, 1]).with_scoring(|out, target| {
            let diff = Matrix::difference(out, target)?;
            Ok(Score::Error(diff.to_vec()[0].abs()))
        });
        let score = net.test(&Matrix::from_vec(&[0.0, 0.0]).unwrap(), &Matrix::from_vec(&[2.0]).unwrap()).unwrap();
        match score {
            Score::Error(e) => assert!(e > 1.0 && e < 2.0),
            other => panic!("unexpected score {other:?}"),
        }
        assert_eq!(net.corrects(), 1);

        let exact = net.feed_forward(&Matrix::from_vec(&[0.0, 0.0]).unwrap()).unwrap();
        assert!(!net.test(&Matrix::from_vec(&[0.0, 0.0]).unwrap(), &exact).unwrap().is_correct());
        assert_eq!((net.tests(), net.corrects()), (2, 1));
        assert_eq!(net.success_rate(false), 50.0);
    }

    #[test]
    fn from_template_copies_settings_not_weights() {
        let mut config = NetworkConfig::new(vec![2, 4, 1]).with_learning_rate(0.3);
        config.track_training_success = true;
        let template = Network::new(&config, &mut rng()).unwrap();
        let child = Network::from_template(&template, &mut ChaCha8Rng::seed_from_u64(9));

        assert_eq!(child.layer_sizes(), template.layer_sizes());
        assert_eq!(child.learning_rate(), 0.3);
        assert!(child.track_training_success);
        assert_ne!(child.layers()[0].weights, template.layers()[0].weights);
        assert_eq!(child.tests(), 0);
    }

    #[test]
    fn crossover_averages_weights_and_keeps_first_bias() {
        let mut r = rng();
        let a = Network::new(&NetworkConfig::new(vec![3, 2, 1]).with_learning_rate(0.5), &mut r).unwrap();
        let b = Network::new(&NetworkConfig::new(vec![3, 2, 1]), &mut r).unwrap();
        let child = Network::crossover(&a, &b).unwrap();

        for i in 0..2 {
            let expected = Matrix::average(&[a.layers()[i].weights.clone(), b.layers()[i].weights.clone()]).unwrap();
            assert_eq!(child.layers()[i].weights, expected);
            assert_eq!(child.layers()[i].bias, a.layers()[i].bias);
        }
        assert_eq!(child.learning_rate(), 0.5);
    }

    #[test]
    fn crossover_rejects_different_architectures() {
        let a = network(&[3, 2, 1]);
        let b = network(&[3, 4, 1]);
        assert!(matches!(Network::crossover(&a, &b), Err(NnError::Configuration(_))));
    }

    #[test]
    fn json_round_trip_keeps_numbers() {
        let net = network(&[3, 4, 2]);
        let restored = Network::from_json(&net.to_json().unwrap()).unwrap();
        assert_eq!(restored.to_state(), net.to_state());

        let input = Matrix::from_vec(&[0.1, -0.4, 0.9]).unwrap();
        assert_eq!(restored.feed_forward(&input).unwrap(), net.feed_forward(&input).unwrap());
    }
}
