use log::warn;
use rand::Rng;
use rand_distr::StandardNormal;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::decoder::Decoder;
use crate::error::Result;
use crate::gene::Marker;
use crate::genome::Genome;
use crate::innovation::Innovation;
use crate::organism::Organism;
use crate::settings::Settings;
use crate::species::Species;

/// One generation of organisms, grouped into species.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Population {
    pub generation: usize,
    /// Species in the order they were founded.
    pub species: Vec<Species>,
}

impl Population {
    pub fn new(generation: usize, species: Vec<Species>) -> Population {
        Population { generation, species }
    }

    /// The first generation: a single species of prototype clones with
    /// standard normal weights.
    pub fn initial<R: Rng + ?Sized>(settings: &Settings, innovation: &Innovation, rng: &mut R) -> Result<Population> {
        let prototype = Genome::prototype(settings, innovation)?;
        let mut species = Species::new(innovation.next_id()?, prototype.clone());
        for _ in 0..settings.population_size {
            let mut genome = prototype.clone_with_id(innovation.next_id()?);
            for conn in genome.connections_mut() {
                conn.weight = rng.sample(StandardNormal);
            }
            species.add(Organism::new(genome));
        }
        Ok(Population::new(0, vec![species]))
    }

    /// All organisms of all species.
    pub fn organisms(&self) -> impl Iterator<Item = &Organism> {
        self.species.iter().flat_map(|s| s.organisms.iter())
    }

    pub fn organisms_mut(&mut self) -> impl Iterator<Item = &mut Organism> {
        self.species.iter_mut().flat_map(|s| s.organisms.iter_mut())
    }

    /// Number of organisms.
    pub fn len(&self) -> usize {
        self.species.iter().map(Species::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The organism with the highest primary fitness.
    pub fn best(&self) -> Option<&Organism> {
        self.organisms().max_by(|a, b| a.fitness().total_cmp(&b.fitness()))
    }

    /// Average number of genes per organism.
    pub fn mean_complexity(&self) -> f64 {
        let n = self.len();
        if n == 0 {
            return 0.;
        }
        self.organisms().map(|o| o.genome.complexity()).sum::<usize>() as f64 / n as f64
    }

    /// Largest genome or species id in use.
    pub fn max_id(&self) -> Option<u64> {
        let genomes = self.organisms().map(Organism::id);
        let species = self.species.iter().flat_map(|s| [s.id, s.representative().id]);
        genomes.chain(species).max()
    }

    /// Largest marker in use.
    pub fn max_marker(&self) -> Option<Marker> {
        let genomes = self.organisms().filter_map(|o| o.genome.max_marker());
        let representatives = self.species.iter().filter_map(|s| s.representative().max_marker());
        genomes.chain(representatives).max()
    }

    /// Decode every organism in parallel. Failures are logged and leave the
    /// organism without phenome. Returns the number of failures.
    pub fn decode(&mut self, decoder: &dyn Decoder) -> usize {
        self.species
            .par_iter_mut()
            .flat_map_iter(|s| s.organisms.iter_mut())
            .filter(|organism| match organism.decode(decoder) {
                Ok(()) => false,
                Err(e) => {
                    warn!("failed to decode organism {}: {}", organism.id(), e);
                    true
                }
            })
            .count()
    }

    /// Restore the gene order of every genome, e.g. after reading an archive.
    pub(crate) fn sort_genes(&mut self) {
        for species in &mut self.species {
            species.sort_genes();
        }
    }
}
