use serde::{Deserialize, Serialize};

use crate::error::{NeatError, Result};

/// Read-only configuration of an experiment.
///
/// Defaults follow the values of the original paper for a population of 150
/// solving XOR.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// The number of individuals in the population.
    pub population_size: usize,

    /// The number of bias nodes of the initial genome.
    pub bias_count: usize,
    /// The number of input (sensor) nodes of the initial genome.
    pub input_count: usize,
    /// The number of output nodes of the initial genome.
    pub output_count: usize,

    /// c1, weight of excess genes in the compatibility distance.
    pub excess_coefficient: f64,
    /// c2, weight of disjoint genes in the compatibility distance.
    pub disjoint_coefficient: f64,
    /// c3, weight of the average weight difference of matching genes.
    pub weight_coefficient: f64,
    /// Genomes with fewer genes than this are not normalised by size.
    /// 0 always normalises.
    pub small_genome_size: usize,

    pub mutate_weight: f64,
    /// Chance that a weight mutation draws a new weight instead of perturbing.
    pub mutate_weight_new: f64,
    pub mutate_enabled: f64,
    pub mutate_add_node: f64,
    pub mutate_add_connection: f64,
    /// Only used while pruning.
    pub mutate_del_node: f64,
    /// Only used while pruning.
    pub mutate_del_connection: f64,
    pub mutate_activation: f64,

    /// Chance of creating offspring by crossover instead of cloning.
    pub crossover: f64,
    /// Chance that the second parent comes from the whole population.
    pub interspecies_mating: f64,
    /// Generations a species may go without improving before it is culled.
    pub age_to_stagnation: usize,
    /// Fraction of a species that survives to reproduce.
    pub survival_percent: f64,
    /// The number of champions of each species copied unchanged.
    pub elite_count: usize,
    /// Distance below which a genome joins a species.
    pub compat_threshold: f64,

    /// Mean complexity above the floor that starts a pruning phase.
    /// 0 disables pruning.
    pub prune_threshold: f64,
    /// Generations without simplification that end a pruning phase.
    pub prune_window: usize,

    /// Archive every n-th generation. 0 archives every generation.
    pub archive_frequency: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            population_size: 150,
            bias_count: 1,
            input_count: 2,
            output_count: 1,
            excess_coefficient: 1.0,
            disjoint_coefficient: 1.0,
            weight_coefficient: 0.4,
            small_genome_size: 0,
            mutate_weight: 0.8,
            mutate_weight_new: 0.1,
            mutate_enabled: 0.01,
            mutate_add_node: 0.03,
            mutate_add_connection: 0.05,
            mutate_del_node: 0.03,
            mutate_del_connection: 0.05,
            mutate_activation: 0.0,
            crossover: 0.75,
            interspecies_mating: 0.001,
            age_to_stagnation: 15,
            survival_percent: 0.2,
            elite_count: 1,
            compat_threshold: 3.0,
            prune_threshold: 0.0,
            prune_window: 10,
            archive_frequency: 0,
        }
    }
}

impl Settings {
    /// Reject settings that can not drive an evolution.
    pub fn validate(&self) -> Result<()> {
        if self.population_size == 0 {
            return Err(invalid("population_size must be positive"));
        }
        if self.output_count == 0 {
            return Err(invalid("output_count must be positive"));
        }
        if self.bias_count + self.input_count == 0 {
            return Err(invalid("at least one bias or input node is required"));
        }
        if self.elite_count > self.population_size {
            return Err(invalid("elite_count exceeds population_size"));
        }
        if !(self.survival_percent > 0.0 && self.survival_percent <= 1.0) {
            return Err(invalid("survival_percent must be in (0, 1]"));
        }
        if !(self.compat_threshold > 0.0) {
            return Err(invalid("compat_threshold must be positive"));
        }

        let probabilities = [
            ("mutate_weight", self.mutate_weight),
            ("mutate_weight_new", self.mutate_weight_new),
            ("mutate_enabled", self.mutate_enabled),
            ("mutate_add_node", self.mutate_add_node),
            ("mutate_add_connection", self.mutate_add_connection),
            ("mutate_del_node", self.mutate_del_node),
            ("mutate_del_connection", self.mutate_del_connection),
            ("mutate_activation", self.mutate_activation),
            ("crossover", self.crossover),
            ("interspecies_mating", self.interspecies_mating),
        ];
        for (name, p) in probabilities {
            if !(0.0..=1.0).contains(&p) {
                return Err(invalid(&format!("{} must be a probability, got {}", name, p)));
            }
        }
        Ok(())
    }
}

fn invalid(reason: &str) -> NeatError {
    NeatError::InvalidSettings(reason.to_string())
}
