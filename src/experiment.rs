use log::info;

use crate::archive::Archiver;
use crate::decoder::{Decoder, NetworkDecoder};
use crate::error::Result;
use crate::evaluation::{OrganismEvaluator, ParallelEvaluator, PopulationEvaluator};
use crate::evolution::{DefaultEvolution, Evolution};
use crate::organism::Organism;
use crate::population::Population;
use crate::settings::Settings;
use crate::statistics::Statistics;

/// Drives a run: evolve, decode, evaluate and archive, one generation at a
/// time.
pub struct Experiment {
    evolution: DefaultEvolution,
    decoder: Box<dyn Decoder>,
    population_evaluator: Box<dyn PopulationEvaluator>,
    evaluator: Box<dyn OrganismEvaluator>,
    archiver: Option<Box<dyn Archiver>>,
    population: Population,
}

impl Experiment {
    /// Start a new run from the prototype genome.
    pub fn new(settings: Settings, seed: u64, evaluator: impl OrganismEvaluator + 'static) -> Result<Experiment> {
        let mut evolution = DefaultEvolution::new(settings, seed)?;
        let population = evolution.initial_population()?;
        Ok(Experiment::assemble(evolution, population, Box::new(evaluator)))
    }

    /// Continue the run stored by the archiver. The archiver is kept and
    /// used for further archiving.
    ///
    /// Only the population is archived. The phased search starts over in
    /// the complexify phase, with the mean complexity of the restored
    /// population as its floor.
    pub fn restore(
        settings: Settings,
        seed: u64,
        archiver: impl Archiver + 'static,
        evaluator: impl OrganismEvaluator + 'static,
    ) -> Result<Experiment> {
        let population = archiver.restore()?;
        info!("resuming at generation {} with {} organisms", population.generation, population.len());
        let evolution = DefaultEvolution::resume(settings, seed, &population)?;
        Ok(Experiment::assemble(evolution, population, Box::new(evaluator)).with_archiver(archiver))
    }

    fn assemble(
        evolution: DefaultEvolution,
        population: Population,
        evaluator: Box<dyn OrganismEvaluator>,
    ) -> Experiment {
        Experiment {
            evolution,
            decoder: Box::new(NetworkDecoder),
            population_evaluator: Box::new(ParallelEvaluator),
            evaluator,
            archiver: None,
            population,
        }
    }

    pub fn with_decoder(mut self, decoder: impl Decoder + 'static) -> Experiment {
        self.decoder = Box::new(decoder);
        self
    }

    pub fn with_population_evaluator(mut self, evaluator: impl PopulationEvaluator + 'static) -> Experiment {
        self.population_evaluator = Box::new(evaluator);
        self
    }

    pub fn with_archiver(mut self, archiver: impl Archiver + 'static) -> Experiment {
        self.archiver = Some(Box::new(archiver));
        self
    }

    pub fn population(&self) -> &Population {
        &self.population
    }

    pub fn evolution(&self) -> &DefaultEvolution {
        &self.evolution
    }

    /// The fittest organism of the current generation.
    pub fn best(&self) -> Option<&Organism> {
        self.population.best()
    }

    /// Evaluate the current generation unless every organism has a fitness.
    pub fn evaluate(&mut self) -> Statistics {
        if self.population.organisms().any(|o| o.genome.fitness.is_empty()) {
            self.population.decode(self.decoder.as_ref());
            self.population_evaluator.evaluate(&mut self.population, self.evaluator.as_ref());
        }
        Statistics::of(&self.population)
    }

    /// Produce, evaluate and possibly archive the next generation.
    pub fn iterate(&mut self) -> Result<Statistics> {
        self.evaluate();
        let current = std::mem::take(&mut self.population);
        self.population = self.evolution.evolve(current)?;
        let statistics = self.evaluate();
        info!("{}", statistics);

        let frequency = self.evolution.settings().archive_frequency;
        if let Some(archiver) = &self.archiver {
            if frequency == 0 || self.population.generation % frequency == 0 {
                archiver.archive(&self.population)?;
            }
        }
        Ok(statistics)
    }

    /// Run a number of generations. Returns the statistics of the last one.
    pub fn run(&mut self, generations: usize) -> Result<Statistics> {
        let mut statistics = self.evaluate();
        for _ in 0..generations {
            statistics = self.iterate()?;
        }
        Ok(statistics)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::JsonArchiver;
    use crate::evaluation::SerialEvaluator;
    use crate::phase::Phase;
    use crate::NeatError;

    /// Fitness is the number of connections.
    struct Size;

    impl OrganismEvaluator for Size {
        fn evaluate(&self, organism: &Organism) -> Result<Vec<f64>> {
            Ok(vec![organism.genome.connections().len() as f64])
        }
    }

    #[test]
    fn run_should_evaluate_every_generation() {
        let settings = Settings { population_size: 25, ..Settings::default() };
        let mut experiment = Experiment::new(settings, 3, Size).unwrap().with_population_evaluator(SerialEvaluator);
        let statistics = experiment.run(4).unwrap();
        assert_eq!(statistics.generation, 4);
        assert_eq!(statistics.organisms, 25);
        assert!(experiment.population().organisms().all(|o| !o.genome.fitness.is_empty()));
        assert!(experiment.best().map(Organism::fitness).unwrap_or(0.) >= 3.);
    }

    #[test]
    fn invalid_settings_should_not_start() {
        let settings = Settings { output_count: 0, ..Settings::default() };
        assert!(matches!(Experiment::new(settings, 0, Size), Err(NeatError::InvalidSettings(_))));
    }

    #[test]
    fn restored_run_should_start_complexifying() {
        let path = std::env::temp_dir().join(format!("neat-engine-phase-{}.json", std::process::id()));
        let settings = Settings {
            population_size: 20,
            prune_threshold: 0.5,
            prune_window: 50,
            mutate_add_node: 0.5,
            ..Settings::default()
        };
        let mut experiment =
            Experiment::new(settings.clone(), 5, Size).unwrap().with_archiver(JsonArchiver::new(&path));
        experiment.run(4).unwrap();
        assert_eq!(experiment.evolution().phase(), Phase::Prune);
        let complexity = experiment.population().mean_complexity();
        drop(experiment);

        let mut restored = Experiment::restore(settings, 6, JsonArchiver::new(&path), Size).unwrap();
        assert_eq!(restored.evolution().phase(), Phase::Complexify);
        assert!((restored.population().mean_complexity() - complexity).abs() < 1e-9);
        // the restored complexity is the new floor, so one more generation keeps complexifying
        restored.iterate().unwrap();
        std::fs::remove_file(&path).unwrap();
        assert_eq!(restored.evolution().phase(), Phase::Complexify);
    }
}
