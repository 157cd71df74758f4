use ferrite_evo::{Evolution, EvolutionConfig, Matrix, Network, NetworkConfig};
use log::info;

fn samples() -> ferrite_evo::Result<Vec<(Matrix, Matrix)>> {
    Ok(vec![
        (Matrix::from_vec(&[0.0, 0.0])?, Matrix::from_vec(&[0.0])?),
        (Matrix::from_vec(&[0.0, 1.0])?, Matrix::from_vec(&[1.0])?),
        (Matrix::from_vec(&[1.0, 0.0])?, Matrix::from_vec(&[1.0])?),
        (Matrix::from_vec(&[1.0, 1.0])?, Matrix::from_vec(&[0.0])?),
    ])
}

/// Trains the candidate briefly, then scores it: 100 for a perfect XOR.
fn fitness(bot: &mut Network) -> f64 {
    let Ok(data) = samples() else {
        return 0.0;
    };
    for i in 0..100 {
        let (input, target) = &data[i % data.len()];
        if bot.train(input, target).is_err() {
            return 0.0;
        }
    }

    let error: f64 = data
        .iter()
        .filter_map(|(input, target)| {
            let out = bot.feed_forward(input).ok()?;
            Some((out.to_vec()[0] - target.to_vec()[0]).abs())
        })
        .sum();
    (4.0 - error) * 25.0
}

fn main() -> ferrite_evo::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let mut rng = rand::thread_rng();
    let template = Network::new(&NetworkConfig::new(vec![2, 2, 1]).with_learning_rate(0.2), &mut rng)?;
    let config = EvolutionConfig {
        size: 250,
        kill_rate: 0.8,
        mutation_rate: 0.05,
        mutation_power: 0.02,
        elitism: false,
        log_stats: true,
    };

    let mut botnet = Evolution::builder()
        .config(config)
        .template(template)
        .fitness(fitness)
        .on_generation(|_, stats| {
            if stats.generation % 10 == 0 {
                info!("generation {} best fitness {:.2}", stats.generation, stats.max);
            }
        })
        .build(&mut rng)?;

    botnet.run_generations(100, &mut rng)?;

    let best = botnet.best()?;
    for (input, _) in samples()? {
        info!("Input: {:?} -> Output: {:.4}", input.to_vec(), best.feed_forward(&input)?.to_vec()[0]);
    }
    println!("{}", best.to_json()?);
    Ok(())
}
