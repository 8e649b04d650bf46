use log::info;
use serde::{Deserialize, Serialize};

/// Whether the search currently grows or shrinks genomes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Phase {
    /// Structure is added; crossover is on.
    Complexify,
    /// Structure is removed; crossover is off.
    Prune,
}

impl Default for Phase {
    fn default() -> Self {
        Phase::Complexify
    }
}

/// Switches between complexification and pruning based on the mean
/// complexity of the population.
///
/// Pruning starts once the mean complexity rises more than `threshold` above
/// the floor, and stops after the mean complexity has not dropped for more
/// than `window` generations. The complexity at that point becomes the new
/// floor.
#[derive(Debug, Clone)]
pub struct PhasedSearch {
    threshold: f64,
    window: usize,
    floor: Option<f64>,
    lowest: f64,
    stalled: usize,
    phase: Phase,
}

impl PhasedSearch {
    pub fn new(threshold: f64, window: usize) -> PhasedSearch {
        PhasedSearch { threshold, window, floor: None, lowest: f64::MAX, stalled: 0, phase: Phase::Complexify }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Feed the mean complexity of the current generation and get the phase
    /// for building the next one.
    pub fn update(&mut self, mean_complexity: f64) -> Phase {
        if self.threshold <= 0. {
            return self.phase;
        }
        let floor = *self.floor.get_or_insert(mean_complexity);

        match self.phase {
            Phase::Complexify => {
                if mean_complexity > floor + self.threshold {
                    info!("mean complexity {:.2} exceeds {:.2}, pruning", mean_complexity, floor + self.threshold);
                    self.phase = Phase::Prune;
                    self.lowest = mean_complexity;
                    self.stalled = 0;
                }
            }
            Phase::Prune => {
                if mean_complexity < self.lowest {
                    self.lowest = mean_complexity;
                    self.stalled = 0;
                } else {
                    self.stalled += 1;
                }
                if self.stalled > self.window {
                    info!("pruning stalled at mean complexity {:.2}, complexifying", mean_complexity);
                    self.phase = Phase::Complexify;
                    self.floor = Some(mean_complexity);
                }
            }
        }
        self.phase
    }
}
