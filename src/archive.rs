use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use log::debug;

use crate::error::Result;
use crate::population::Population;

/// Persists populations so a run can be resumed.
pub trait Archiver {
    fn archive(&self, population: &Population) -> Result<()>;
    fn restore(&self) -> Result<Population>;
}

/// Keeps the latest population as a JSON document.
#[derive(Debug, Clone)]
pub struct JsonArchiver {
    path: PathBuf,
}

impl JsonArchiver {
    pub fn new(path: impl Into<PathBuf>) -> JsonArchiver {
        JsonArchiver { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Archiver for JsonArchiver {
    /// Write to a sibling file first so an interrupted write never clobbers
    /// the previous archive.
    fn archive(&self, population: &Population) -> Result<()> {
        let partial = self.path.with_extension("partial");
        {
            let mut writer = BufWriter::new(File::create(&partial)?);
            serde_json::to_writer(&mut writer, population)?;
            writer.flush()?;
        }
        fs::rename(&partial, &self.path)?;
        debug!("archived generation {} to {}", population.generation, self.path.display());
        Ok(())
    }

    fn restore(&self) -> Result<Population> {
        let reader = BufReader::new(File::open(&self.path)?);
        let mut population: Population = serde_json::from_reader(reader)?;
        population.sort_genes();
        debug!("restored generation {} from {}", population.generation, self.path.display());
        Ok(population)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::NeatError;
    use crate::innovation::InnovationTracker;
    use crate::organism::Organism;
    use crate::settings::Settings;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn scratch(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("neat-engine-{}-{}.json", name, std::process::id()))
    }

    #[test]
    fn should_round_trip_genomes() {
        let tracker = InnovationTracker::new();
        let settings = Settings { population_size: 12, ..Settings::default() };
        let mut population = Population::initial(&settings, &tracker.handle(), &mut StdRng::seed_from_u64(1)).unwrap();
        population.generation = 7;
        for (i, organism) in population.organisms_mut().enumerate() {
            organism.genome.fitness = vec![i as f64 / 10.];
        }
        let weights = [1.6636271298814511, 0.1 + 0.2, -29.999999999999996];
        let first = population.organisms_mut().next().unwrap();
        for (conn, weight) in first.genome.connections_mut().iter_mut().zip(weights) {
            conn.weight = weight;
        }

        let archiver = JsonArchiver::new(scratch("round-trip"));
        archiver.archive(&population).unwrap();
        let restored = archiver.restore().unwrap();
        fs::remove_file(archiver.path()).unwrap();

        assert_eq!(restored.generation, 7);
        assert_eq!(restored.species.len(), 1);
        assert_eq!(restored.species[0].id, population.species[0].id);
        assert_eq!(restored.species[0].representative(), population.species[0].representative());
        let genomes = |p: &Population| p.organisms().map(|o| o.genome.clone()).collect::<Vec<_>>();
        assert_eq!(genomes(&restored), genomes(&population));
        let restored_weights: Vec<f64> =
            restored.organisms().next().unwrap().genome.connections().iter().map(|c| c.weight).collect();
        assert_eq!(restored_weights, weights.to_vec());
        assert!(restored.organisms().all(|o: &Organism| o.phenome().is_none()));
    }

    #[test]
    fn missing_archive_should_fail() {
        let archiver = JsonArchiver::new(scratch("missing"));
        assert!(matches!(archiver.restore(), Err(NeatError::Io(_))));
    }

    #[test]
    fn malformed_archive_should_fail() {
        let path = scratch("malformed");
        fs::write(&path, b"{\"generation\": \"seven\"}").unwrap();
        let result = JsonArchiver::new(&path).restore();
        fs::remove_file(&path).unwrap();
        assert!(matches!(result, Err(NeatError::Json(_))));
    }
}
