use log::{debug, info};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;

use crate::compatibility::DefaultCompatibility;
use crate::crossover::{crossover, tournament};
use crate::error::{NeatError, Result};
use crate::genome::Genome;
use crate::innovation::{Innovation, InnovationTracker};
use crate::mutation::{DefaultMutation, Mutation};
use crate::organism::Organism;
use crate::phase::{Phase, PhasedSearch};
use crate::population::Population;
use crate::settings::Settings;
use crate::species::{speciate, Species};
use crate::statistics::Statistics;

pub trait Evolution {
    /// Evolve a generation into a new generation.
    ///
    /// Create offspring by mutation and mating. May create new species.
    /// Every organism of the passed population must have been evaluated.
    /// Returns the next generation of the population.
    fn evolve(&mut self, population: Population) -> Result<Population>;
}

/// Implement evolving new individuals and species as close to the original paper as possible.
///
/// Note: The original paper sometimes uses the term compatibility for the parameter δ.
/// However, it is more an "incompatibility" i.e. higher δ means lower compatibility!
///
/// Quote from original paper:
///
/// The distance measure δ (compatibility) allows us to speciate using a compatibility threshold δₜ.
/// An ordered list of species is maintained. In each generation, genomes are sequentially
/// placed into species. Each existing species is represented by a random genome inside
/// the species from the previous generation. A given genome g in the current generation is
/// placed in the first species in which g is compatible with the representative genome of
/// that species. This way, species do not overlap. If g is not compatible with any existing
/// species, a new species is created with g as its representative.
///
/// Every species is assigned a potentially different number of offspring in proportion to the sum
/// of adjusted fitness fᵢ' of its member organisms. Species then reproduce by first eliminating
/// the lowest performing members from the population. The entire population is then replaced by
/// the offspring of the remaining organisms in each species.
///
/// Deviating from the paper, fᵢ' is the mean distance of organism i to the other members of its
/// species. It weights both the offspring quota of a species and the selection of parents among
/// its survivors. Only the choice of the leading parent in crossover looks at the raw fitness.
pub struct DefaultEvolution {
    settings: Settings,
    compatibility: DefaultCompatibility,
    tracker: InnovationTracker,
    search: PhasedSearch,
    rng: StdRng,
}

/// Parents to draw from, weighted by their adjusted fitness.
struct Pool<'a> {
    genomes: Vec<(&'a Genome, f64)>,
    total: f64,
}

impl<'a> Pool<'a> {
    fn new<I: IntoIterator<Item = &'a Organism>>(organisms: I) -> Pool<'a> {
        let genomes: Vec<(&'a Genome, f64)> =
            organisms.into_iter().map(|o| (&o.genome, o.adjusted_fitness)).collect();
        let total = genomes.iter().map(|(_, weight)| weight).sum();
        Pool { genomes, total }
    }
}

/// One child to be bred. `pool` is the index of a species pool, `None`
/// draws from all survivors.
struct Job {
    id: u64,
    pool: Option<usize>,
    seed: u64,
}

impl DefaultEvolution {
    /// Start a fresh run.
    pub fn new(settings: Settings, seed: u64) -> Result<DefaultEvolution> {
        DefaultEvolution::with_tracker(settings, seed, InnovationTracker::new())
    }

    /// Continue a run from a restored population. Ids and markers continue
    /// after the largest ones in use.
    pub fn resume(settings: Settings, seed: u64, population: &Population) -> Result<DefaultEvolution> {
        let next_id = population.max_id().map_or(0, |id| id + 1);
        let next_marker = population.max_marker().map_or(0, |marker| marker + 1);
        DefaultEvolution::with_tracker(settings, seed, InnovationTracker::resume(next_id, next_marker))
    }

    fn with_tracker(settings: Settings, seed: u64, tracker: InnovationTracker) -> Result<DefaultEvolution> {
        settings.validate()?;
        Ok(DefaultEvolution {
            compatibility: DefaultCompatibility::from(&settings),
            search: PhasedSearch::new(settings.prune_threshold, settings.prune_window),
            rng: StdRng::seed_from_u64(seed),
            tracker,
            settings,
        })
    }

    /// The first generation for a fresh run.
    pub fn initial_population(&mut self) -> Result<Population> {
        Population::initial(&self.settings, &self.tracker.handle(), &mut self.rng)
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn innovation(&self) -> Innovation {
        self.tracker.handle()
    }

    /// Phase used to build the latest generation.
    pub fn phase(&self) -> Phase {
        self.search.phase()
    }

    /// Drop stagnant species, except the one holding the best organism.
    fn cull_stagnant(&self, species: &mut Vec<Species>) {
        let best = species
            .iter()
            .max_by(|a, b| a.champion_fitness().total_cmp(&b.champion_fitness()))
            .map(|s| s.id);
        let threshold = self.settings.age_to_stagnation;
        species.retain(|s| {
            let keep = Some(s.id) == best || !s.is_stagnant(threshold);
            if !keep {
                info!("species {} stagnated at fitness {:.4} after {} generations", s.id, s.best_fitness(), s.age());
            }
            keep
        });
    }
}

/// Offspring per species, proportional to the adjusted fitness. Shares are
/// equal when there is no adjusted fitness to go by.
pub fn quotas(adjusted: &[f64], population_size: usize) -> Vec<usize> {
    let total: f64 = adjusted.iter().sum();
    let defined = total.is_finite() && total > 0.;
    adjusted
        .iter()
        .map(|a| {
            let share = if defined { a / total } else { 1. / adjusted.len() as f64 };
            (share * population_size as f64).floor() as usize
        })
        .collect()
}

fn breed(
    job: &Job,
    pools: &[Pool],
    everyone: &Pool,
    settings: &Settings,
    phase: Phase,
    innovation: &Innovation,
) -> Result<Organism> {
    let mut rng = StdRng::seed_from_u64(job.seed);
    let pool = job.pool.map_or(everyone, |i| &pools[i]);

    let parent1 = tournament(&pool.genomes, pool.total, &mut rng).ok_or(NeatError::Extinct)?;
    let mut child = if phase == Phase::Complexify && pool.genomes.len() > 1 && rng.gen_bool(settings.crossover) {
        let mates = if rng.gen_bool(settings.interspecies_mating) { everyone } else { pool };
        let parent2 = tournament(&mates.genomes, mates.total, &mut rng).ok_or(NeatError::Extinct)?;
        crossover(parent1, parent2, job.id, &mut rng)
    } else {
        parent1.clone_with_id(job.id)
    };

    DefaultMutation::new(settings, phase).mutate(&mut child, &mut rng, innovation)?;
    child.fitness.clear();
    Ok(Organism::new(child))
}

impl Evolution for DefaultEvolution {
    fn evolve(&mut self, population: Population) -> Result<Population> {
        let Population { generation, mut species } = population;
        species.retain(|s| !s.is_empty());
        if species.is_empty() {
            return Err(NeatError::Extinct);
        }
        let innovation = self.tracker.handle();

        for s in species.iter_mut() {
            s.update_best();
        }
        let current = Population::new(generation, species);
        info!("{}", Statistics::of(&current));
        let phase = self.search.update(current.mean_complexity());
        let mut species = current.species;

        for s in species.iter_mut() {
            s.adjust_fitness(&self.compatibility);
        }
        self.cull_stagnant(&mut species);
        for s in species.iter_mut() {
            s.cull(self.settings.survival_percent, self.settings.elite_count);
            s.choose_representative(&mut self.rng);
        }
        innovation.reset()?;

        let size = self.settings.population_size;
        let adjusted: Vec<f64> = species.iter().map(Species::adjusted_fitness).collect();
        let quotas = quotas(&adjusted, size);

        let mut children: Vec<Organism> = Vec::with_capacity(size);
        let mut jobs: Vec<Job> = Vec::with_capacity(size);
        for (i, (s, quota)) in species.iter().zip(&quotas).enumerate() {
            let elites = self.settings.elite_count.min(s.len()).min(*quota);
            for organism in &s.organisms[..elites] {
                let mut elite = organism.genome.clone_with_id(innovation.next_id()?);
                elite.fitness.clear();
                children.push(Organism::new(elite));
            }
            for _ in elites..*quota {
                jobs.push(Job { id: innovation.next_id()?, pool: Some(i), seed: self.rng.gen() });
            }
        }
        while children.len() + jobs.len() < size {
            jobs.push(Job { id: innovation.next_id()?, pool: None, seed: self.rng.gen() });
        }
        debug!("{} elites and {} offspring in {:?} phase", children.len(), jobs.len(), phase);

        let offspring = {
            let pools: Vec<Pool> = species.iter().map(|s| Pool::new(&s.organisms)).collect();
            let everyone = Pool::new(species.iter().flat_map(|s| &s.organisms));
            let settings = &self.settings;
            let innovation = &innovation;
            jobs.par_iter()
                .map(|job| breed(job, &pools, &everyone, settings, phase, innovation))
                .collect::<Result<Vec<Organism>>>()?
        };
        children.extend(offspring);

        let mut next: Vec<Species> = species.into_iter().map(Species::into_next_generation).collect();
        speciate(children, &mut next, &self.compatibility, self.settings.compat_threshold, &innovation)?;
        next.retain(|s| !s.is_empty());
        debug!("generation {} has {} species", generation + 1, next.len());

        Ok(Population::new(generation + 1, next))
    }
}
