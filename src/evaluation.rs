use log::warn;
use rayon::prelude::*;

use crate::error::{NeatError, Result};
use crate::organism::Organism;
use crate::population::Population;

/// Fitness assigned when an organism can not be evaluated or scores
/// non-finite values.
pub const MINIMAL_FITNESS: [f64; 1] = [0.];

/// Problem specific scoring of a single, decoded organism.
pub trait OrganismEvaluator: Sync {
    /// Return the fitness values of the organism, the primary one first.
    fn evaluate(&self, organism: &Organism) -> Result<Vec<f64>>;
}

/// Strategy to score a whole population. On return every organism has a
/// fitness.
pub trait PopulationEvaluator {
    fn evaluate(&self, population: &mut Population, evaluator: &dyn OrganismEvaluator);
}

/// Scores one organism after the other.
#[derive(Debug, Clone, Copy, Default)]
pub struct SerialEvaluator;

/// Scores organisms concurrently on the rayon thread pool.
#[derive(Debug, Clone, Copy, Default)]
pub struct ParallelEvaluator;

impl PopulationEvaluator for SerialEvaluator {
    fn evaluate(&self, population: &mut Population, evaluator: &dyn OrganismEvaluator) {
        for organism in population.organisms_mut() {
            score(organism, evaluator);
        }
    }
}

impl PopulationEvaluator for ParallelEvaluator {
    fn evaluate(&self, population: &mut Population, evaluator: &dyn OrganismEvaluator) {
        population
            .species
            .par_iter_mut()
            .flat_map_iter(|s| s.organisms.iter_mut())
            .for_each(|organism| score(organism, evaluator));
    }
}

fn score(organism: &mut Organism, evaluator: &dyn OrganismEvaluator) {
    let fitness = match organism.phenome() {
        Some(_) => evaluator.evaluate(organism),
        None => Err(NeatError::MissingPhenome(organism.id())),
    };
    organism.genome.fitness = match fitness {
        Ok(fitness) if fitness.iter().all(|f| f.is_finite()) && !fitness.is_empty() => fitness,
        Ok(fitness) => {
            warn!("organism {} was scored with undefined fitness {:?}", organism.id(), fitness);
            MINIMAL_FITNESS.to_vec()
        }
        Err(e) => {
            warn!("failed to evaluate organism {}: {}", organism.id(), e);
            MINIMAL_FITNESS.to_vec()
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decoder::NetworkDecoder;
    use crate::innovation::InnovationTracker;
    use crate::settings::Settings;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    /// Fitness is the genome id, odd ids fail.
    struct ById;

    impl OrganismEvaluator for ById {
        fn evaluate(&self, organism: &Organism) -> Result<Vec<f64>> {
            if organism.id() % 2 == 1 {
                return Err(NeatError::UndefinedOutputs);
            }
            Ok(vec![organism.id() as f64, 1.])
        }
    }

    /// Fitness values that are infinite, NaN or missing.
    struct Undefined;

    impl OrganismEvaluator for Undefined {
        fn evaluate(&self, organism: &Organism) -> Result<Vec<f64>> {
            Ok(match organism.id() % 4 {
                0 => vec![f64::INFINITY],
                1 => vec![f64::NAN],
                2 => vec![0.5, f64::NEG_INFINITY],
                _ => vec![],
            })
        }
    }

    fn population() -> Population {
        let tracker = InnovationTracker::new();
        let settings = Settings { population_size: 10, ..Settings::default() };
        Population::initial(&settings, &tracker.handle(), &mut StdRng::seed_from_u64(0)).unwrap()
    }

    fn fitness(population: &Population) -> Vec<Vec<f64>> {
        population.organisms().map(|o| o.genome.fitness.clone()).collect()
    }

    #[test]
    fn failures_should_get_minimal_fitness() {
        let mut population = population();
        population.decode(&NetworkDecoder);
        SerialEvaluator.evaluate(&mut population, &ById);
        for organism in population.organisms() {
            if organism.id() % 2 == 1 {
                assert_eq!(organism.genome.fitness, MINIMAL_FITNESS.to_vec());
            } else {
                assert_eq!(organism.genome.fitness, vec![organism.id() as f64, 1.]);
            }
        }
    }

    #[test]
    fn undecoded_organisms_should_get_minimal_fitness() {
        let mut population = population();
        ParallelEvaluator.evaluate(&mut population, &ById);
        assert!(population.organisms().all(|o| o.genome.fitness == MINIMAL_FITNESS.to_vec()));
    }

    #[test]
    fn undefined_fitness_should_get_minimal_fitness() {
        let mut population = population();
        population.decode(&NetworkDecoder);
        ParallelEvaluator.evaluate(&mut population, &Undefined);
        assert!(population.organisms().all(|o| o.genome.fitness == MINIMAL_FITNESS.to_vec()));
    }

    #[test]
    fn parallel_and_serial_should_agree() {
        let mut serial = population();
        let mut parallel = serial.clone();
        serial.decode(&NetworkDecoder);
        parallel.decode(&NetworkDecoder);
        SerialEvaluator.evaluate(&mut serial, &ById);
        ParallelEvaluator.evaluate(&mut parallel, &ById);
        assert_eq!(fitness(&serial), fitness(&parallel));
    }
}
