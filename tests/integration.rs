//! Integration tests for ferrite-evo

use ferrite_evo::{
    Evolution, EvolutionConfig, Matrix, Network, NetworkConfig, NetworkState, NnError, Score,
};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

const FIXED_2_2_1: &str = r#"{
    "layers": [
        {
            "weights": { "rows": 2, "cols": 2, "data": [[0.1, 0.2], [0.3, 0.4]] },
            "bias": { "rows": 2, "cols": 1, "data": [[0.5], [0.6]] }
        },
        {
            "weights": { "rows": 1, "cols": 2, "data": [[0.7, 0.8]] },
            "bias": { "rows": 1, "cols": 1, "data": [[0.9]] }
        }
    ],
    "learning_rate": 0.1,
    "batch_size": 1,
    "activation": "sigmoid"
}"#;

fn xor_data() -> Vec<(Matrix, Matrix)> {
    vec![
        (Matrix::from_vec(&[0.0, 0.0]).unwrap(), Matrix::from_vec(&[0.0]).unwrap()),
        (Matrix::from_vec(&[0.0, 1.0]).unwrap(), Matrix::from_vec(&[1.0]).unwrap()),
        (Matrix::from_vec(&[1.0, 0.0]).unwrap(), Matrix::from_vec(&[1.0]).unwrap()),
        (Matrix::from_vec(&[1.0, 1.0]).unwrap(), Matrix::from_vec(&[0.0]).unwrap()),
    ]
}

fn assert_grid(actual: &Matrix, expected: &[&[f64]]) {
    let expected: Vec<Vec<f64>> = expected.iter().map(|row| row.to_vec()).collect();
    assert_eq!(actual.data(), expected.as_slice());
}

#[test]
fn backpropagation_matches_reference_vector() {
    let mut net = Network::from_json(FIXED_2_2_1).unwrap();
    for (input, target) in xor_data() {
        net.train(&input, &target).unwrap();
    }

    let layers = net.layers();
    assert_grid(
        &layers[0].weights,
        &[
            &[0.08906864769787945, 0.1889549321126967],
            &[0.29040985295725386, 0.3902676566761416],
        ],
    );
    assert_grid(&layers[0].bias, &[&[0.4769405828828057], &[0.5767147790962412]]);
    assert_grid(&layers[1].weights, &[&[0.6891883851420223, 0.7882486417061167]]);
    assert_grid(&layers[1].bias, &[&[0.8834728616674726]]);
}

#[test]
fn save_and_load_are_lossless() {
    let mut rng = ChaCha8Rng::seed_from_u64(31);
    let config = NetworkConfig::new(vec![4, 6, 3]).with_learning_rate(0.25);
    let mut net = Network::new(&config, &mut rng).unwrap();
    net.train(&Matrix::from_vec(&[0.1, 0.2, 0.3, 0.4]).unwrap(), &Matrix::from_vec(&[1.0, 0.0, 0.0]).unwrap())
        .unwrap();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("net.json");
    let path = path.to_str().unwrap();
    net.save_json(path).unwrap();

    let restored = Network::load_json(path).unwrap();
    for (a, b) in restored.layers().iter().zip(net.layers()) {
        assert_eq!(a.weights, b.weights);
        assert_eq!(a.bias, b.bias);
    }
    assert_eq!(restored.learning_rate(), 0.25);
    assert_eq!(restored.layer_sizes(), &[4, 6, 3]);

    let input = Matrix::from_vec(&[0.9, -0.3, 0.0, 0.5]).unwrap();
    let a = net.feed_forward(&input).unwrap().to_vec();
    let b = restored.feed_forward(&input).unwrap().to_vec();
    for (x, y) in a.iter().zip(&b) {
        assert!((x - y).abs() < 1e-15);
    }
}

#[test]
fn restored_network_takes_a_new_scoring_predicate() {
    let state: NetworkState = serde_json::from_str(FIXED_2_2_1).unwrap();
    let mut net = Network::from_state(state).unwrap().with_scoring(|_, _| Ok(Score::Pass(false)));
    assert!(!net.test(&Matrix::from_vec(&[0.0, 0.0]).unwrap(), &Matrix::from_vec(&[1.0]).unwrap()).unwrap().is_correct());
}

#[test]
fn loading_rejects_broken_layer_chain() {
    let broken = FIXED_2_2_1.replace(
        r#""weights": { "rows": 1, "cols": 2, "data": [[0.7, 0.8]] }"#,
        r#""weights": { "rows": 1, "cols": 3, "data": [[0.7, 0.8, 0.9]] }"#,
    );
    assert!(matches!(Network::from_json(&broken), Err(NnError::Configuration(_))));

    let missing = std::path::Path::new("/nonexistent/ferrite-evo/net.json");
    assert!(matches!(Network::load_json(missing.to_str().unwrap()), Err(NnError::Io(_))));
}

#[test]
fn runs_generations_with_constant_fitness() {
    let mut rng = ChaCha8Rng::seed_from_u64(32);
    let template = Network::new(&NetworkConfig::new(vec![2, 4, 1]), &mut rng).unwrap();
    let config = EvolutionConfig {
        size: 10,
        kill_rate: 0.6,
        mutation_rate: 0.1,
        mutation_power: 0.1,
        ..Default::default()
    };
    let mut evo = Evolution::new(config, template, |_| 1.0, &mut rng).unwrap();

    let stats = evo.run_generations(5, &mut rng).unwrap();
    assert_eq!(stats.len(), 5);
    assert!(stats.iter().all(|s| s.average == 1.0 && s.min == 1.0 && s.max == 1.0));
    assert_eq!(evo.len(), 10);
    assert!(evo.best().unwrap().to_json().is_ok());
}

#[test]
fn lone_survivor_cannot_breed() {
    let mut rng = ChaCha8Rng::seed_from_u64(35);
    let template = Network::new(&NetworkConfig::new(vec![2, 2, 1]), &mut rng).unwrap();
    let config = EvolutionConfig { size: 10, kill_rate: 0.9, ..Default::default() };
    let mut evo = Evolution::new(config, template, |_| 1.0, &mut rng).unwrap();

    evo.evaluate().unwrap();
    evo.kill().unwrap();
    assert_eq!(evo.len(), 1);
    assert!(matches!(evo.reproduce(&mut rng), Err(NnError::SelectionExhausted(_))));
    assert_eq!(evo.len(), 1);
    assert!(evo.is_evaluated());
}

/// 100 for a perfect XOR solver, less the summed absolute error.
fn xor_fitness(net: &mut Network) -> f64 {
    let error: f64 = xor_data()
        .iter()
        .map(|(input, target)| {
            let out = net.feed_forward(input).unwrap();
            (out.to_vec()[0] - target.to_vec()[0]).abs()
        })
        .sum();
    (4.0 - error) * 25.0
}

#[test]
fn elitist_search_never_regresses() {
    let mut rng = ChaCha8Rng::seed_from_u64(33);
    let template = Network::new(&NetworkConfig::new(vec![2, 3, 1]), &mut rng).unwrap();
    let config = EvolutionConfig {
        size: 40,
        kill_rate: 0.5,
        mutation_rate: 0.3,
        mutation_power: 0.2,
        elitism: true,
        log_stats: true,
    };
    let mut evo = Evolution::new(config, template, xor_fitness, &mut rng).unwrap();

    let stats = evo.run_generations(15, &mut rng).unwrap();
    for pair in stats.windows(2) {
        assert!(pair[1].max >= pair[0].max, "max fell from {} to {}", pair[0].max, pair[1].max);
    }
    assert!(stats.iter().all(|s| s.min <= s.average && s.average <= s.max));
}

#[test]
fn evaluator_may_train_its_individual() {
    let mut rng = ChaCha8Rng::seed_from_u64(34);
    let template = Network::new(&NetworkConfig::new(vec![2, 2, 1]).with_learning_rate(0.2), &mut rng)
        .unwrap()
        .with_scoring(|out, target| {
            Ok(Score::Error(Matrix::difference(out, target)?.to_vec()[0].abs()))
        });
    let config = EvolutionConfig { size: 12, kill_rate: 0.5, ..Default::default() };

    let mut evo = Evolution::new(
        config,
        template,
        |net: &mut Network| {
            for (input, target) in xor_data().iter().cycle().take(40) {
                net.train(input, target).unwrap();
            }
            xor_fitness(net)
        },
        &mut rng,
    )
    .unwrap();

    evo.evaluate().unwrap();
    let best = evo.best().unwrap();
    assert_eq!(best.layer_sizes(), &[2, 2, 1]);
    assert!(evo.stats().unwrap().max <= 100.0);
}
