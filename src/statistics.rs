use std::fmt;

use ndarray::Array1;
use ndarray_stats::QuantileExt;

use crate::population::Population;

/// Summary of one generation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Statistics {
    pub generation: usize,
    pub species: usize,
    pub organisms: usize,
    pub best: f64,
    pub mean: f64,
    pub worst: f64,
    pub mean_complexity: f64,
}

impl Statistics {
    pub fn of(population: &Population) -> Statistics {
        let fitness: Array1<f64> = population.organisms().map(|o| o.fitness()).collect();
        Statistics {
            generation: population.generation,
            species: population.species.len(),
            organisms: fitness.len(),
            best: fitness.max().copied().unwrap_or(0.),
            mean: fitness.mean().unwrap_or(0.),
            worst: fitness.min().copied().unwrap_or(0.),
            mean_complexity: population.mean_complexity(),
        }
    }
}

impl fmt::Display for Statistics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "generation {}: {} organisms in {} species, fitness best {:.4} mean {:.4} worst {:.4}, complexity {:.2}",
            self.generation, self.organisms, self.species, self.best, self.mean, self.worst, self.mean_complexity
        )
    }
}
