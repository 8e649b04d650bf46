use itertools::EitherOrBoth::{Both, Left, Right};

use crate::gene::{Gene, Marker};
use crate::genome::{align, Genome};
use crate::settings::Settings;

/// Defines separation of genomes into species and possibility to mate genomes.
pub trait Compatibility {
    /// Compute the distance of two genomes. Higher distance means lower compatibility.
    fn distance(&self, genome1: &Genome, genome2: &Genome) -> f64;
}

/// δ = (c1 * E)/N + (c2 * D)/N + c3*W
#[derive(Debug, Clone)]
pub struct DefaultCompatibility {
    pub c1: f64,
    pub c2: f64,
    pub c3: f64,
    /// Genomes below this size are not normalised. 0 always normalises.
    pub small_genome_size: usize,
}

impl Default for DefaultCompatibility {
    // From the original paper:
    // c3 was increased [for DPNV experiment which had population size of 1000 instead of 150]
    // to 3.0 in order to allow for finer distinctions between species based on weight
    // differences (the larger population has room for more species).
    fn default() -> Self {
        Self { c1: 1., c2: 1., c3: 0.4, small_genome_size: 0 }
    }
}

impl From<&Settings> for DefaultCompatibility {
    fn from(settings: &Settings) -> Self {
        Self {
            c1: settings.excess_coefficient,
            c2: settings.disjoint_coefficient,
            c3: settings.weight_coefficient,
            small_genome_size: settings.small_genome_size,
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq)]
struct Tally {
    excess: usize,
    disjoint: usize,
}

impl Tally {
    /// Count the unmatched genes of two gene lists. A gene is excess when its
    /// marker lies beyond the other genome's largest marker.
    fn count<G: Gene>(&mut self, genes1: &[G], genes2: &[G], max1: Option<Marker>, max2: Option<Marker>) {
        let beyond = |marker: Marker, max: Option<Marker>| max.map_or(true, |max| marker > max);
        for pair in align(genes1, genes2) {
            match pair {
                Both(..) => {}
                Left(g) if beyond(g.marker(), max2) => self.excess += 1,
                Right(g) if beyond(g.marker(), max1) => self.excess += 1,
                _ => self.disjoint += 1,
            }
        }
    }
}

impl Compatibility for DefaultCompatibility {
    fn distance(&self, genome1: &Genome, genome2: &Genome) -> f64 {
        let (max1, max2) = (genome1.max_marker(), genome2.max_marker());

        // Excess count and disjoint count over node and connection genes.
        let mut tally = Tally::default();
        tally.count(genome1.nodes(), genome2.nodes(), max1, max2);
        tally.count(genome1.connections(), genome2.connections(), max1, max2);

        // Average weight difference of matching connection genes.
        let (matching, total_weight_distance) = align(genome1.connections(), genome2.connections())
            .filter_map(|pair| match pair {
                Both(c1, c2) => Some((c1, c2)),
                _ => None,
            })
            .fold((0usize, 0.), |(n, sum), (c1, c2)| (n + 1, sum + f64::abs(c1.weight - c2.weight)));
        let mean_weight_distance = if matching > 0 { total_weight_distance / matching as f64 } else { 0. };

        // n, the number of genes in the larger genome, normalizes for genome size (n
        // can be set to 1 if both genomes are small, i.e., consist of fewer than 20 genes)
        let (size1, size2) = (genome1.complexity(), genome2.complexity());
        let n = if size1 < self.small_genome_size && size2 < self.small_genome_size {
            1
        } else {
            std::cmp::max(1, std::cmp::max(size1, size2))
        };

        (self.c1 * tally.excess as f64 + self.c2 * tally.disjoint as f64) / n as f64
            + self.c3 * mean_weight_distance
    }
}
