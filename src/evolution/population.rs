use log::{debug, info};
use rand::Rng;
use rayon::prelude::*;

use crate::error::{NnError, Result};
use crate::evolution::config::EvolutionConfig;
use crate::evolution::selection;
use crate::evolution::stats::GenerationStats;
use crate::network::network::Network;

/// Scores one individual. Runs concurrently across the generation, each call
/// owning its own network, so it may train the network before scoring it.
/// Must never return a negative value.
pub type FitnessFn = Box<dyn Fn(&mut Network) -> f64 + Send + Sync>;

/// Called once per generation with that generation's best network and stats.
pub type GenerationObserver = Box<dyn FnMut(&Network, &GenerationStats) + Send>;

/// One member of a generation.
#[derive(Debug, Clone)]
pub struct Individual {
    pub fitness: f64,
    pub network: Network,
}

impl Individual {
    pub fn new(network: Network) -> Self {
        Individual { fitness: 0.0, network }
    }
}

/// Generational neuroevolution over a fixed-size population.
///
/// Each generation goes through evaluate, kill, reproduce and report, in
/// that order; `run_generation` does all four. The phases are also public so
/// callers can drive them by hand. Kill and reproduce refuse to run on a
/// generation that has not been evaluated.
pub struct Evolution {
    config: EvolutionConfig,
    template: Network,
    fitness: FitnessFn,
    observer: Option<GenerationObserver>,
    generation: Vec<Individual>,
    generation_index: usize,
    // `Some` exactly while the current generation's fitness is known.
    stats: Option<GenerationStats>,
    survivor_sum: f64,
    best: Option<usize>,
}

impl Evolution {
    pub fn builder() -> EvolutionBuilder {
        EvolutionBuilder::default()
    }

    /// Seeds `config.size` individuals from `template`'s architecture and settings.
    pub fn new<F, R>(config: EvolutionConfig, template: Network, fitness: F, rng: &mut R) -> Result<Evolution>
    where
        F: Fn(&mut Network) -> f64 + Send + Sync + 'static,
        R: Rng + ?Sized,
    {
        Evolution::builder().config(config).template(template).fitness(fitness).build(rng)
    }

    // ---------------------------------------------------------------------
    // Phases
    // ---------------------------------------------------------------------

    /// Scores every individual in parallel. A no-op if the generation has
    /// already been evaluated.
    pub fn evaluate(&mut self) -> Result<()> {
        if self.stats.is_some() {
            return Ok(());
        }

        let fitness = &self.fitness;
        let scores: Vec<f64> = self
            .generation
            .par_iter_mut()
            .map(|individual| fitness(&mut individual.network))
            .collect();

        if let Some((index, &bad)) = scores.iter().enumerate().find(|(_, f)| !(**f >= 0.0)) {
            return Err(NnError::NegativeFitness { index, fitness: bad });
        }

        for (individual, &score) in self.generation.iter_mut().zip(&scores) {
            individual.fitness = score;
        }

        let sum: f64 = scores.iter().sum();
        let min = scores.iter().copied().fold(f64::INFINITY, f64::min);
        let max = scores.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let average = if scores.is_empty() { 0.0 } else { sum / scores.len() as f64 };

        self.survivor_sum = sum;
        self.best = scores.iter().position(|&f| f == max);
        let stats = GenerationStats {
            generation: self.generation_index,
            sum,
            average,
            min,
            max,
        };
        debug!("evaluated generation {}: {:?}", self.generation_index, stats);
        self.stats = Some(stats);
        Ok(())
    }

    /// Sorts the generation by ascending fitness and removes the weakest
    /// `floor(kill_rate * size)` individuals.
    pub fn kill(&mut self) -> Result<()> {
        let max = match &self.stats {
            Some(stats) => stats.max,
            None => {
                return Err(NnError::NotReady(
                    "kill: fitness not calculated, call evaluate() first".into(),
                ))
            }
        };

        self.generation.sort_by(|a, b| a.fitness.total_cmp(&b.fitness));

        let count = (self.config.kill_rate * self.config.size as f64).floor() as usize;
        self.generation.drain(..count.min(self.generation.len()));

        self.survivor_sum = self.generation.iter().map(|i| i.fitness).sum();
        self.best = self.generation.iter().position(|i| i.fitness == max);
        Ok(())
    }

    /// Two distinct parent indices, chosen fitness-proportionately among the
    /// current (surviving) individuals.
    pub fn choose_parents<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<(usize, usize)> {
        if self.stats.is_none() {
            return Err(NnError::NotReady(
                "choose_parents: fitness not calculated, call evaluate() first".into(),
            ));
        }
        selection::choose_parents(&self.fitnesses(), self.survivor_sum, rng)
    }

    /// Refills the population to `size` with (possibly mutated) crossovers of
    /// roulette-selected parents, then moves on to the next generation.
    ///
    /// Without elitism the offspring replace everyone; with it the survivors
    /// stay, unchanged, ahead of the newly bred individuals.
    pub fn reproduce<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Result<()> {
        if self.stats.is_none() {
            return Err(NnError::NotReady(
                "reproduce: fitness not calculated, call evaluate() first".into(),
            ));
        }
        if !(self.survivor_sum > 0.0) {
            return Err(NnError::NotReady(
                "reproduce: survivors have no fitness to select parents by".into(),
            ));
        }

        let size = self.config.size;
        let offspring = if self.config.elitism {
            size.saturating_sub(self.generation.len())
        } else {
            size
        };

        let fitnesses = self.fitnesses();
        let mut children = Vec::with_capacity(offspring);
        for _ in 0..offspring {
            let (a, b) = selection::choose_parents(&fitnesses, self.survivor_sum, rng)?;
            let mut child =
                Network::crossover(&self.generation[a].network, &self.generation[b].network)?;
            if rng.gen::<f64>() < self.config.mutation_rate {
                child.mutate(self.config.mutation_power, rng);
            }
            children.push(Individual::new(child));
        }

        let mut next = if self.config.elitism {
            std::mem::take(&mut self.generation)
                .into_iter()
                .map(|survivor| Individual::new(survivor.network))
                .collect()
        } else {
            Vec::with_capacity(size)
        };
        next.extend(children);

        self.generation = next;
        self.stats = None;
        self.best = None;
        self.survivor_sum = 0.0;
        self.generation_index += 1;
        Ok(())
    }

    /// Runs evaluate, kill, reproduce and report once. Returns the stats of
    /// the generation that was evaluated.
    pub fn run_generation<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Result<GenerationStats> {
        self.evaluate()?;
        let stats = self.stats.clone().ok_or_else(|| {
            NnError::NotReady("run_generation: evaluation produced no stats".into())
        })?;
        let best = if self.observer.is_some() {
            Some(self.best()?.clone())
        } else {
            None
        };

        self.kill()?;
        self.reproduce(rng)?;

        if self.config.log_stats {
            info!(
                "generation {}: average {:.4}, min {:.4}, max {:.4}",
                stats.generation, stats.average, stats.min, stats.max
            );
        }
        if let (Some(observer), Some(best)) = (self.observer.as_mut(), best.as_ref()) {
            observer(best, &stats);
        }

        Ok(stats)
    }

    /// Runs `count` generations, stopping at the first error.
    pub fn run_generations<R: Rng + ?Sized>(
        &mut self,
        count: usize,
        rng: &mut R,
    ) -> Result<Vec<GenerationStats>> {
        (0..count).map(|_| self.run_generation(rng)).collect()
    }

    /// The fittest network of the current generation, evaluating it first if needed.
    /// Ties go to the first individual in population order.
    pub fn best(&mut self) -> Result<&Network> {
        if self.best.is_none() {
            self.evaluate()?;
        }
        let index = self
            .best
            .ok_or_else(|| NnError::NotReady("best: the generation is empty".into()))?;
        Ok(&self.generation[index].network)
    }

    // ---------------------------------------------------------------------
    // Accessors
    // ---------------------------------------------------------------------

    fn fitnesses(&self) -> Vec<f64> {
        self.generation.iter().map(|i| i.fitness).collect()
    }

    pub fn config(&self) -> &EvolutionConfig {
        &self.config
    }

    pub fn template(&self) -> &Network {
        &self.template
    }

    pub fn generation(&self) -> &[Individual] {
        &self.generation
    }

    pub fn generation_index(&self) -> usize {
        self.generation_index
    }

    pub fn len(&self) -> usize {
        self.generation.len()
    }

    pub fn is_empty(&self) -> bool {
        self.generation.is_empty()
    }

    /// Fitness summary of the current generation, if it has been evaluated.
    pub fn stats(&self) -> Option<&GenerationStats> {
        self.stats.as_ref()
    }

    pub fn is_evaluated(&self) -> bool {
        self.stats.is_some()
    }
}

/// Collects the pieces of an `Evolution`; `template` and `fitness` are required.
#[derive(Default)]
pub struct EvolutionBuilder {
    config: EvolutionConfig,
    template: Option<Network>,
    fitness: Option<FitnessFn>,
    observer: Option<GenerationObserver>,
}

impl EvolutionBuilder {
    pub fn config(mut self, config: EvolutionConfig) -> Self {
        self.config = config;
        self
    }

    pub fn template(mut self, template: Network) -> Self {
        self.template = Some(template);
        self
    }

    pub fn fitness<F>(mut self, fitness: F) -> Self
    where
        F: Fn(&mut Network) -> f64 + Send + Sync + 'static,
    {
        self.fitness = Some(Box::new(fitness));
        self
    }

    pub fn on_generation<F>(mut self, observer: F) -> Self
    where
        F: FnMut(&Network, &GenerationStats) + Send + 'static,
    {
        self.observer = Some(Box::new(observer));
        self
    }

    pub fn build<R: Rng + ?Sized>(self, rng: &mut R) -> Result<Evolution> {
        self.config.validate()?;
        let template = self
            .template
            .ok_or_else(|| NnError::Configuration("a template network is required".into()))?;
        let fitness = self
            .fitness
            .ok_or_else(|| NnError::Configuration("a fitness function is required".into()))?;

        let generation = (0..self.config.size)
            .map(|_| Individual::new(Network::from_template(&template, rng)))
            .collect();

        Ok(Evolution {
            config: self.config,
            template,
            fitness,
            observer: self.observer,
            generation,
            generation_index: 0,
            stats: None,
            survivor_sum: 0.0,
            best: None,
        })
    }
}
