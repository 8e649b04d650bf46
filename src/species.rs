use log::debug;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::compatibility::Compatibility;
use crate::error::Result;
use crate::genome::Genome;
use crate::innovation::Innovation;
use crate::organism::Organism;

/// A species (several organisms) and associated fitnesses
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Species {
    /// Allows to set an id to identify it
    pub id: u64,
    /// All organisms in this species
    pub organisms: Vec<Organism>,
    representative: Genome,
    age: usize,
    best_fitness: f64,
    best_fitness_age: usize,
    #[serde(skip)]
    adjusted_fitness: f64,
}

impl Species {
    /// Create a new, empty species represented by a genome
    pub fn new(id: u64, representative: Genome) -> Species {
        Species {
            id,
            organisms: vec![],
            representative,
            age: 0,
            best_fitness: f64::MIN,
            best_fitness_age: 0,
            adjusted_fitness: 0.,
        }
    }

    /// Add an Organism
    pub fn add(&mut self, organism: Organism) {
        self.organisms.push(organism);
    }

    pub fn len(&self) -> usize {
        self.organisms.len()
    }

    /// Returns true if the species has no organisms
    pub fn is_empty(&self) -> bool {
        self.organisms.is_empty()
    }

    pub fn representative(&self) -> &Genome {
        &self.representative
    }

    /// Generations this species has lived through.
    pub fn age(&self) -> usize {
        self.age
    }

    /// Best champion fitness seen so far.
    pub fn best_fitness(&self) -> f64 {
        self.best_fitness
    }

    /// Age at which the best fitness was last improved.
    pub fn best_fitness_age(&self) -> usize {
        self.best_fitness_age
    }

    /// Sum of the adjusted fitness of the members, see [`Species::adjust_fitness`].
    pub fn adjusted_fitness(&self) -> f64 {
        self.adjusted_fitness
    }

    /// Fitness of the most performant organism
    pub fn champion_fitness(&self) -> f64 {
        self.organisms
            .iter()
            .map(Organism::fitness)
            .fold(None, |max: Option<f64>, f| Some(max.map_or(f, |m| m.max(f))))
            .unwrap_or(0.)
    }

    /// Work out average fitness of this species
    pub fn average_fitness(&self) -> f64 {
        if self.organisms.is_empty() {
            return 0.;
        }
        self.organisms.iter().map(Organism::fitness).sum::<f64>() / self.organisms.len() as f64
    }

    /// Record the champion fitness if it beats the best seen so far.
    pub fn update_best(&mut self) {
        if self.organisms.is_empty() {
            return;
        }
        let champion = self.champion_fitness();
        if champion > self.best_fitness {
            self.best_fitness = champion;
            self.best_fitness_age = self.age;
        }
    }

    /// Compute the selection weight of every member and of the whole species.
    ///
    /// A member's adjusted fitness is its mean distance to the other members,
    /// so diverse species are favoured. A lone member keeps its raw fitness.
    pub fn adjust_fitness(&mut self, compatibility: &dyn Compatibility) -> f64 {
        let n = self.organisms.len();
        let adjusted: Vec<f64> = if n == 1 {
            vec![self.organisms[0].fitness()]
        } else {
            (0..n)
                .map(|i| {
                    let own = &self.organisms[i].genome;
                    let total: f64 = self
                        .organisms
                        .iter()
                        .enumerate()
                        .filter(|(j, _)| *j != i)
                        .map(|(_, other)| compatibility.distance(own, &other.genome))
                        .sum();
                    total / (n - 1) as f64
                })
                .collect()
        };

        for (organism, value) in self.organisms.iter_mut().zip(&adjusted) {
            organism.adjusted_fitness = *value;
        }
        self.adjusted_fitness = adjusted.iter().sum();
        self.adjusted_fitness
    }

    /// Whether the species has not improved for more than `threshold`
    /// generations.
    pub fn is_stagnant(&self, threshold: usize) -> bool {
        self.age.saturating_sub(self.best_fitness_age) > threshold
    }

    /// Keep only the fittest members: the larger of the survival share and
    /// the elite count, at least one.
    pub fn cull(&mut self, survival_percent: f64, elite_count: usize) {
        self.organisms.sort_by(|a, b| b.fitness().total_cmp(&a.fitness()));
        let share = (survival_percent * self.organisms.len() as f64).floor() as usize;
        let keep = share.max(elite_count).max(1).min(self.organisms.len());
        self.organisms.truncate(keep);
    }

    /// Choose a new representative of the species at random
    pub fn choose_representative<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        if let Some(organism) = self.organisms.choose(rng) {
            self.representative = organism.genome.clone();
        }
    }

    /// The species as it enters the next generation: one generation older
    /// and without members.
    pub fn into_next_generation(self) -> Species {
        Species { organisms: vec![], age: self.age + 1, adjusted_fitness: 0., ..self }
    }

    pub(crate) fn sort_genes(&mut self) {
        self.representative.sort_genes();
        for organism in &mut self.organisms {
            organism.genome.sort_genes();
        }
    }
}

/// Place every child into the first species whose representative is closer
/// than `threshold`. Children that fit nowhere found a new species.
pub fn speciate(
    children: Vec<Organism>,
    species: &mut Vec<Species>,
    compatibility: &dyn Compatibility,
    threshold: f64,
    innovation: &Innovation,
) -> Result<()> {
    for child in children {
        match species.iter_mut().find(|s| compatibility.distance(&s.representative, &child.genome) < threshold) {
            Some(s) => s.add(child),
            None => {
                let mut founded = Species::new(innovation.next_id()?, child.genome.clone());
                debug!("organism {} founded species {}", child.id(), founded.id);
                founded.add(child);
                species.push(founded);
            }
        }
    }
    Ok(())
}
