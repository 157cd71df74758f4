use ferrite_evo::{train_loop, Matrix, Network, NetworkConfig, TrainConfig};
use log::info;

fn main() -> ferrite_evo::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let mut rng = rand::thread_rng();
    let mut config = NetworkConfig::new(vec![2, 2, 1]).with_learning_rate(0.2);
    config.log_tests = true;
    let mut network = Network::new(&config, &mut rng)?;

    let inputs = vec![
        Matrix::from_vec(&[0.0, 0.0])?,
        Matrix::from_vec(&[0.0, 1.0])?,
        Matrix::from_vec(&[1.0, 0.0])?,
        Matrix::from_vec(&[1.0, 1.0])?,
    ];
    let expected_outputs = vec![
        Matrix::from_vec(&[0.0])?,
        Matrix::from_vec(&[1.0])?,
        Matrix::from_vec(&[1.0])?,
        Matrix::from_vec(&[0.0])?,
    ];

    let epochs = 10000;
    if let Some(stats) = train_loop(&mut network, &inputs, &expected_outputs, &TrainConfig::new(epochs), &mut rng)? {
        info!("epoch {epochs}: loss = {:.6}, success = {:.1}%", stats.train_loss, stats.success_rate);
    }

    for input in &inputs {
        info!("Input: {:?} -> Output: {:.4}", input.to_vec(), network.feed_forward(input)?.to_vec()[0]);
    }
    Ok(())
}
