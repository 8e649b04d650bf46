use std::fmt;

use lazycell::LazyCell;
use serde::{Deserialize, Serialize};

use crate::decoder::Decoder;
use crate::error::Result;
use crate::genome::Genome;

/// Executable form of a genome.
pub trait Phenome {
    /// Feed the inputs through and return the outputs.
    fn analyze(&self, inputs: &[f64]) -> Result<Vec<f64>>;
}

/// A genome together with its lazily decoded phenome.
///
/// Only the genome is persisted; a restored organism is decoded again.
#[derive(Serialize, Deserialize)]
#[serde(transparent)]
pub struct Organism {
    pub genome: Genome,
    #[serde(skip, default = "LazyCell::new")]
    phenome: LazyCell<Box<dyn Phenome + Send>>,
    /// Selection weight within the current generation.
    #[serde(skip)]
    pub adjusted_fitness: f64,
}

impl Organism {
    pub fn new(genome: Genome) -> Organism {
        Organism { genome, phenome: LazyCell::new(), adjusted_fitness: 0. }
    }

    pub fn id(&self) -> u64 {
        self.genome.id
    }

    /// Primary fitness of the genome.
    pub fn fitness(&self) -> f64 {
        self.genome.fitness()
    }

    /// Decode the genome unless that already happened.
    pub fn decode(&self, decoder: &dyn Decoder) -> Result<()> {
        if !self.phenome.filled() {
            let phenome = decoder.decode(&self.genome)?;
            // only fails when already filled
            let _ = self.phenome.fill(phenome);
        }
        Ok(())
    }

    pub fn phenome(&self) -> Option<&(dyn Phenome + Send)> {
        self.phenome.borrow().map(|phenome| &**phenome)
    }
}

impl From<Genome> for Organism {
    fn from(genome: Genome) -> Self {
        Organism::new(genome)
    }
}

impl Clone for Organism {
    /// The clone has to be decoded again.
    fn clone(&self) -> Self {
        Organism { genome: self.genome.clone(), phenome: LazyCell::new(), adjusted_fitness: self.adjusted_fitness }
    }
}

impl fmt::Debug for Organism {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Organism")
            .field("genome", &self.genome)
            .field("decoded", &self.phenome.filled())
            .field("adjusted_fitness", &self.adjusted_fitness)
            .finish()
    }
}
