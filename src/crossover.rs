use std::collections::HashSet;

use itertools::EitherOrBoth::{Both, Left, Right};
use rand::seq::SliceRandom;
use rand::Rng;

use crate::gene::{Marker, NodeType};
use crate::genome::{align, Genome};

/// Mate two genomes.
///
/// The fitter parent leads: genes only it carries are always inherited,
/// genes only the weaker parent carries are dropped. When both parents are
/// equally fit, every unmatched gene is inherited with even odds. Matching
/// genes are taken from either parent with even odds. Hidden nodes are only
/// kept when an inherited connection needs them.
pub fn crossover<R: Rng + ?Sized>(parent1: &Genome, parent2: &Genome, id: u64, rng: &mut R) -> Genome {
    let (fitter, weaker) =
        if parent2.fitness() > parent1.fitness() { (parent2, parent1) } else { (parent1, parent2) };
    let tied = fitter.fitness() == weaker.fitness();

    let mut child = Genome::new(id);
    for pair in align(fitter.connections(), weaker.connections()) {
        let inherited = match pair {
            Both(f, w) => Some(if rng.gen_bool(0.5) { f } else { w }),
            Left(f) if !tied || rng.gen_bool(0.5) => Some(f),
            Right(w) if tied && rng.gen_bool(0.5) => Some(w),
            _ => None,
        };
        if let Some(conn) = inherited {
            child.add_connection_gene(conn.clone());
        }
    }

    let required: HashSet<Marker> = child.connections().iter().flat_map(|c| [c.source, c.target]).collect();
    for pair in align(fitter.nodes(), weaker.nodes()) {
        let node = match pair {
            Both(f, w) => {
                if rng.gen_bool(0.5) {
                    f
                } else {
                    w
                }
            }
            Left(n) | Right(n) => n,
        };
        if node.node_type != NodeType::Hidden || required.contains(&node.marker) {
            child.add_node_gene(node.clone());
        }
    }

    assert!(child.is_consistent(), "crossover of {} and {} produced an inconsistent genome", parent1.id, parent2.id);
    child
}

/// Selection proportionate to the weight paired with each genome. Falls back
/// to a uniform choice when the weights do not add up to a positive, finite
/// total.
pub fn tournament<'a, R: Rng + ?Sized>(
    pool: &[(&'a Genome, f64)],
    total: f64,
    rng: &mut R,
) -> Option<&'a Genome> {
    if total.is_finite() && total > 0. {
        roulette(pool, rng.gen_range(0. ..total))
    } else {
        pool.choose(rng).map(|(genome, _)| *genome)
    }
}

/// The first genome whose cumulative weight reaches `point`, or the last one.
pub fn roulette<'a>(pool: &[(&'a Genome, f64)], point: f64) -> Option<&'a Genome> {
    let mut sum = 0.;
    for (genome, weight) in pool {
        sum += *weight;
        if sum >= point {
            return Some(*genome);
        }
    }
    pool.last().map(|(genome, _)| *genome)
}
