use rand::seq::SliceRandom;
use rand::Rng;
use rand_distr::StandardNormal;

use crate::error::Result;
use crate::gene::{Activation, ConnectionGene, Marker, NodeGene, NodeType, Position};
use crate::genome::Genome;
use crate::innovation::{ConnKey, Innovation, NodeKey};
use crate::phase::Phase;
use crate::settings::Settings;

/// Weights are kept within [-WEIGHT_LIMIT, WEIGHT_LIMIT].
pub const WEIGHT_LIMIT: f64 = 30.;

/// Offset along z separating a new node from existing nodes at the same spot.
pub const POSITION_NUDGE: f64 = 0.0001;

/// Changes a genome in place.
pub trait Mutation {
    fn mutate<R: Rng + ?Sized>(&self, genome: &mut Genome, rng: &mut R, innovation: &Innovation) -> Result<()>;
}

/// Applies every mutation operator with the probabilities of the settings.
///
/// Structural additions only happen while complexifying, structural removals
/// only while pruning.
#[derive(Debug, Clone, Copy)]
pub struct DefaultMutation<'a> {
    settings: &'a Settings,
    phase: Phase,
}

impl<'a> DefaultMutation<'a> {
    pub fn new(settings: &'a Settings, phase: Phase) -> DefaultMutation<'a> {
        DefaultMutation { settings, phase }
    }
}

impl<'a> Mutation for DefaultMutation<'a> {
    fn mutate<R: Rng + ?Sized>(&self, genome: &mut Genome, rng: &mut R, innovation: &Innovation) -> Result<()> {
        let s = self.settings;

        for conn in genome.connections_mut().iter_mut() {
            if conn.enabled && rng.gen_bool(s.mutate_weight) {
                let replace = rng.gen_bool(s.mutate_weight_new);
                mutate_weight(conn, rng, replace);
            }
            if rng.gen_bool(s.mutate_enabled) {
                conn.toggle_enabled();
            }
        }

        if s.mutate_activation > 0. {
            for node in genome.nodes_mut().iter_mut().filter(|n| n.node_type == NodeType::Hidden) {
                if rng.gen_bool(s.mutate_activation) {
                    node.activation = Activation::random(rng);
                }
            }
        }

        match self.phase {
            Phase::Complexify => {
                if rng.gen_bool(s.mutate_add_node) {
                    mutate_add_node(genome, rng, innovation)?;
                }
                if rng.gen_bool(s.mutate_add_connection) {
                    mutate_add_connection(genome, rng, innovation)?;
                }
            }
            Phase::Prune => {
                if rng.gen_bool(s.mutate_del_node) {
                    mutate_del_node(genome, rng, innovation)?;
                }
                if rng.gen_bool(s.mutate_del_connection) {
                    mutate_del_connection(genome, rng);
                }
            }
        }
        Ok(())
    }
}

/// Replace the weight by a standard normal sample, or perturb it by one.
pub fn mutate_weight<R: Rng + ?Sized>(conn: &mut ConnectionGene, rng: &mut R, replace: bool) {
    let sample: f64 = rng.sample(StandardNormal);
    if replace {
        conn.weight = sample;
    } else {
        conn.weight += sample;
    }
    conn.weight = conn.weight.clamp(-WEIGHT_LIMIT, WEIGHT_LIMIT);
}

/// Split a random connection by a new node. Returns whether the genome changed.
pub fn mutate_add_node<R: Rng + ?Sized>(genome: &mut Genome, rng: &mut R, innovation: &Innovation) -> Result<bool> {
    let marker = match genome.connections().choose(rng) {
        Some(conn) => conn.marker,
        None => return Ok(false),
    };
    split_connection(genome, marker, rng, innovation)
}

/// Insert a hidden node with a random activation into a connection.
///
/// The old connection is disabled. The connection leading into the new node
/// gets weight 1, the one leaving it inherits the old weight, and both
/// inherit the enabled state of the old connection.
pub fn split_connection<R: Rng + ?Sized>(
    genome: &mut Genome,
    marker: Marker,
    rng: &mut R,
    innovation: &Innovation,
) -> Result<bool> {
    let conn = match genome.connection(marker) {
        Some(conn) => conn.clone(),
        None => return Ok(false),
    };
    let (source, target) = match (genome.node(conn.source), genome.node(conn.target)) {
        (Some(source), Some(target)) => (source.position, target.position),
        _ => return Ok(false),
    };

    let mut position = Position::midpoint(&source, &target);
    let stacked = genome
        .nodes()
        .iter()
        .filter(|n| n.position.x == position.x && n.position.y == position.y)
        .map(|n| n.position.z)
        .fold(None, |highest: Option<f64>, z| Some(highest.map_or(z, |h| h.max(z))));
    if let Some(z) = stacked {
        position.z = z + POSITION_NUDGE;
    }

    let node = innovation.bless_node_gene(NodeKey::from(&position))?;
    if genome.node(node).is_some() {
        return Ok(false);
    }
    let inbound = innovation.bless_connection_gene(ConnKey::new(conn.source, node))?;
    let outbound = innovation.bless_connection_gene(ConnKey::new(node, conn.target))?;

    genome.add_node_gene(NodeGene::new(node, NodeType::Hidden, Activation::random(rng), position));
    let mut into = ConnectionGene::new(inbound, conn.source, node, 1.);
    let mut out_of = ConnectionGene::new(outbound, node, conn.target, conn.weight);
    into.enabled = conn.enabled;
    out_of.enabled = conn.enabled;
    genome.add_connection_gene(into);
    genome.add_connection_gene(out_of);
    if let Some(old) = genome.connection_mut(conn.marker) {
        old.disable();
    }
    Ok(true)
}

/// Connect two random, unconnected nodes from the lower to the upper one.
/// Returns whether the genome changed.
pub fn mutate_add_connection<R: Rng + ?Sized>(
    genome: &mut Genome,
    rng: &mut R,
    innovation: &Innovation,
) -> Result<bool> {
    let (a, b) = match (genome.nodes().choose(rng), genome.nodes().choose(rng)) {
        (Some(a), Some(b)) => (a.clone(), b.clone()),
        _ => return Ok(false),
    };
    let (lower, upper) = if a.position.layer_cmp(&b.position).is_gt() { (b, a) } else { (a, b) };

    if lower.marker == upper.marker
        || lower.node_type == NodeType::Output
        || upper.node_type.is_sensor()
        || genome.has_connection(lower.marker, upper.marker)
        || genome.has_connection(upper.marker, lower.marker)
    {
        return Ok(false);
    }

    let marker = innovation.bless_connection_gene(ConnKey::new(lower.marker, upper.marker))?;
    let weight: f64 = rng.sample(StandardNormal);
    Ok(genome.add_connection_gene(ConnectionGene::new(marker, lower.marker, upper.marker, weight)))
}

/// Remove a random hidden node. Returns whether the genome changed.
pub fn mutate_del_node<R: Rng + ?Sized>(genome: &mut Genome, rng: &mut R, innovation: &Innovation) -> Result<bool> {
    let hidden: Vec<Marker> =
        genome.nodes().iter().filter(|n| n.node_type == NodeType::Hidden).map(|n| n.marker).collect();
    match hidden.choose(rng) {
        Some(marker) => remove_node(genome, *marker, innovation),
        None => Ok(false),
    }
}

/// Remove a hidden node while keeping the paths through it.
///
/// Dead ends (no inputs or no outputs, self loops not counted) are dropped
/// with their connections. A node with a single input or a single output is
/// bridged: every input-output pair becomes a direct connection carrying the
/// product of both weights. Denser nodes are left alone.
pub fn remove_node(genome: &mut Genome, marker: Marker, innovation: &Innovation) -> Result<bool> {
    match genome.node(marker) {
        Some(node) if node.node_type == NodeType::Hidden => {}
        _ => return Ok(false),
    }

    let incoming: Vec<ConnectionGene> =
        genome.connections().iter().filter(|c| c.target == marker && c.source != marker).cloned().collect();
    let outgoing: Vec<ConnectionGene> =
        genome.connections().iter().filter(|c| c.source == marker && c.target != marker).cloned().collect();

    let dead_end = incoming.is_empty() || outgoing.is_empty();
    if !dead_end && incoming.len() > 1 && outgoing.len() > 1 {
        return Ok(false);
    }

    if !dead_end {
        for inbound in &incoming {
            for outbound in &outgoing {
                if inbound.source == outbound.target || genome.has_connection(inbound.source, outbound.target) {
                    continue;
                }
                let bypass = innovation.bless_connection_gene(ConnKey::new(inbound.source, outbound.target))?;
                let weight = (inbound.weight * outbound.weight).clamp(-WEIGHT_LIMIT, WEIGHT_LIMIT);
                let mut conn = ConnectionGene::new(bypass, inbound.source, outbound.target, weight);
                conn.enabled = inbound.enabled && outbound.enabled;
                genome.add_connection_gene(conn);
            }
        }
    }

    let attached: Vec<Marker> =
        genome.connections().iter().filter(|c| c.source == marker || c.target == marker).map(|c| c.marker).collect();
    for conn in attached {
        genome.remove_connection_gene(conn);
    }
    genome.remove_node_gene(marker);
    Ok(true)
}

/// Remove a random connection along with hidden endpoints it leaves orphaned.
/// Returns whether the genome changed.
pub fn mutate_del_connection<R: Rng + ?Sized>(genome: &mut Genome, rng: &mut R) -> bool {
    let conn = match genome.connections().choose(rng) {
        Some(conn) => conn.clone(),
        None => return false,
    };
    genome.remove_connection_gene(conn.marker);

    for endpoint in [conn.source, conn.target] {
        let orphaned = matches!(genome.node(endpoint), Some(node) if node.node_type == NodeType::Hidden)
            && !genome.connections().iter().any(|c| c.source == endpoint || c.target == endpoint);
        if orphaned {
            genome.remove_node_gene(endpoint);
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::innovation::InnovationTracker;
    use approx::assert_relative_eq;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn prototype(tracker: &InnovationTracker) -> Genome {
        Genome::prototype(&Settings::default(), &tracker.handle()).unwrap()
    }

    fn hidden(marker: Marker, x: f64, y: f64) -> NodeGene {
        NodeGene::new(marker, NodeType::Hidden, Activation::SteepenedSigmoid, Position::new(x, y, 0.))
    }

    /// input 0 -> hidden 2 -> output 1, plus whatever `extra` adds
    fn chain(extra: &[ConnectionGene]) -> Genome {
        let mut genome = Genome::new(0);
        genome.add_node_gene(NodeGene::new(0, NodeType::Input, Activation::Direct, Position::new(0., 0., 0.)));
        let output = Position::new(0., 1., 0.);
        genome.add_node_gene(NodeGene::new(1, NodeType::Output, Activation::SteepenedSigmoid, output));
        genome.add_node_gene(hidden(2, 0., 0.5));
        genome.add_connection_gene(ConnectionGene::new(3, 0, 2, 2.));
        genome.add_connection_gene(ConnectionGene::new(4, 2, 1, 3.));
        for conn in extra {
            genome.add_connection_gene(conn.clone());
        }
        genome
    }

    #[test]
    fn weights_should_be_clamped() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut conn = ConnectionGene::new(0, 0, 1, 29.9);
        for _ in 0..100 {
            mutate_weight(&mut conn, &mut rng, false);
            assert!(conn.weight.abs() <= WEIGHT_LIMIT);
        }
    }

    #[test]
    fn split_connection_should_insert_node_at_midpoint() {
        let tracker = InnovationTracker::new();
        let innovation = tracker.handle();
        let mut rng = StdRng::seed_from_u64(2);
        let mut genome = prototype(&tracker);

        // bias (0, 0) -> output (0, 1)
        assert!(split_connection(&mut genome, 4, &mut rng, &innovation).unwrap());
        let node = genome.node(7).unwrap();
        assert_eq!(node.node_type, NodeType::Hidden);
        assert_ne!(node.activation, Activation::Direct);
        assert_relative_eq!(node.position.y, 0.5);
        assert_relative_eq!(node.position.x, 0.);

        assert!(!genome.connection(4).unwrap().enabled);
        let inbound = genome.connection(8).unwrap();
        assert_eq!((inbound.source, inbound.target), (0, 7));
        assert_relative_eq!(inbound.weight, 1.);
        let outbound = genome.connection(9).unwrap();
        assert_eq!((outbound.source, outbound.target), (7, 3));
        assert_relative_eq!(outbound.weight, 0.);
        assert!(inbound.enabled && outbound.enabled);
        assert!(genome.is_consistent());
    }

    #[test]
    fn splitting_a_disabled_connection_should_keep_the_path_silent() {
        let tracker = InnovationTracker::new();
        let innovation = tracker.handle();
        let mut rng = StdRng::seed_from_u64(6);
        let mut genome = prototype(&tracker);
        genome.connection_mut(5).unwrap().disable();

        assert!(split_connection(&mut genome, 5, &mut rng, &innovation).unwrap());
        let added: Vec<&ConnectionGene> = genome.connections().iter().filter(|c| c.marker > 6).collect();
        assert_eq!(added.len(), 2);
        assert!(added.iter().all(|c| !c.enabled));
        assert!(!genome.connection(5).unwrap().enabled);
    }

    #[test]
    fn same_split_in_same_generation_should_share_markers() {
        let tracker = InnovationTracker::new();
        let innovation = tracker.handle();
        let mut first = prototype(&tracker);
        let mut second = first.clone_with_id(innovation.next_id().unwrap());
        let mut rng = StdRng::seed_from_u64(4);

        split_connection(&mut first, 5, &mut rng, &innovation).unwrap();
        split_connection(&mut second, 5, &mut rng, &innovation).unwrap();
        let nodes = |g: &Genome| g.nodes().iter().map(|n| (n.marker, n.position)).collect::<Vec<_>>();
        assert_eq!(nodes(&first), nodes(&second));
        let markers = |g: &Genome| g.connections().iter().map(|c| c.marker).collect::<Vec<_>>();
        assert_eq!(markers(&first), markers(&second));

        tracker.reset().unwrap();
        let mut third = prototype(&tracker);
        split_connection(&mut third, 5, &mut rng, &innovation).unwrap();
        assert!(third.max_marker() > first.max_marker());
    }

    #[test]
    fn splitting_twice_should_stack_along_z() {
        let tracker = InnovationTracker::new();
        let innovation = tracker.handle();
        let mut rng = StdRng::seed_from_u64(8);
        let mut genome = prototype(&tracker);

        split_connection(&mut genome, 4, &mut rng, &innovation).unwrap();
        // split the still present bias -> output gene again
        assert!(split_connection(&mut genome, 4, &mut rng, &innovation).unwrap());
        let hidden: Vec<&NodeGene> = genome.nodes().iter().filter(|n| n.node_type == NodeType::Hidden).collect();
        assert_eq!(hidden.len(), 2);
        assert_relative_eq!(hidden[1].position.z, POSITION_NUDGE);
        assert!(genome.is_consistent());
    }

    #[test]
    fn added_connections_should_respect_layers() {
        let tracker = InnovationTracker::new();
        let innovation = tracker.handle();
        let mut rng = StdRng::seed_from_u64(3);
        let mut genome = prototype(&tracker);
        split_connection(&mut genome, 4, &mut rng, &innovation).unwrap();
        split_connection(&mut genome, 6, &mut rng, &innovation).unwrap();

        for _ in 0..200 {
            mutate_add_connection(&mut genome, &mut rng, &innovation).unwrap();
        }
        for conn in genome.connections() {
            let source = genome.node(conn.source).unwrap();
            let target = genome.node(conn.target).unwrap();
            assert_ne!(source.node_type, NodeType::Output);
            assert!(!target.node_type.is_sensor());
            assert!(source.position.layer_cmp(&target.position).is_lt());
        }
        let mut pairs: Vec<(Marker, Marker)> = genome.connections().iter().map(|c| (c.source, c.target)).collect();
        let count = pairs.len();
        pairs.sort();
        pairs.dedup();
        assert_eq!(pairs.len(), count);
    }

    #[test]
    fn removing_a_chain_node_should_bridge_its_connection() {
        let tracker = InnovationTracker::resume(0, 100);
        let mut genome = chain(&[]);
        assert!(remove_node(&mut genome, 2, &tracker.handle()).unwrap());
        assert!(genome.node(2).is_none());
        assert_eq!(genome.connections().len(), 1);
        let bypass = &genome.connections()[0];
        assert_eq!((bypass.source, bypass.target), (0, 1));
        assert_relative_eq!(bypass.weight, 6.);
        assert!(genome.is_consistent());
    }

    #[test]
    fn removing_a_dead_end_should_drop_its_connections() {
        let tracker = InnovationTracker::resume(0, 100);
        let mut genome = chain(&[]);
        genome.remove_connection_gene(4);
        assert!(remove_node(&mut genome, 2, &tracker.handle()).unwrap());
        assert!(genome.connections().is_empty());
        assert_eq!(genome.nodes().len(), 2);
    }

    #[test]
    fn dense_nodes_should_not_be_removed() {
        let tracker = InnovationTracker::resume(0, 100);
        let mut genome = chain(&[]);
        genome.add_node_gene(NodeGene::new(5, NodeType::Input, Activation::Direct, Position::new(1., 0., 0.)));
        genome.add_node_gene(NodeGene::new(6, NodeType::Output, Activation::Direct, Position::new(1., 1., 0.)));
        genome.add_connection_gene(ConnectionGene::new(7, 5, 2, 1.));
        genome.add_connection_gene(ConnectionGene::new(8, 2, 6, 1.));
        assert!(!remove_node(&mut genome, 2, &tracker.handle()).unwrap());
        assert!(genome.node(2).is_some());
    }

    #[test]
    fn existing_bypass_should_not_be_duplicated() {
        let tracker = InnovationTracker::resume(0, 100);
        let mut genome = chain(&[ConnectionGene::new(9, 0, 1, -1.)]);
        assert!(remove_node(&mut genome, 2, &tracker.handle()).unwrap());
        assert_eq!(genome.connections().len(), 1);
        assert_relative_eq!(genome.connection(9).unwrap().weight, -1.);
    }

    #[test]
    fn deleting_last_connection_should_drop_orphaned_hidden_node() {
        let mut rng = StdRng::seed_from_u64(5);
        let mut genome = chain(&[]);
        genome.remove_connection_gene(4);
        assert!(mutate_del_connection(&mut genome, &mut rng));
        assert!(genome.node(2).is_none());
        assert!(genome.node(0).is_some());
        assert!(genome.is_consistent());
    }

    #[test]
    fn prune_phase_should_never_grow_genomes() {
        let tracker = InnovationTracker::new();
        let innovation = tracker.handle();
        let settings = Settings {
            mutate_add_node: 1.,
            mutate_add_connection: 1.,
            mutate_del_node: 0.5,
            mutate_del_connection: 0.5,
            ..Settings::default()
        };
        let mut rng = StdRng::seed_from_u64(9);
        let mut genome = prototype(&tracker);
        for _ in 0..20 {
            let marker = genome.connections()[0].marker;
            split_connection(&mut genome, marker, &mut rng, &innovation).unwrap();
        }

        let prune = DefaultMutation::new(&settings, Phase::Prune);
        let mut complexity = genome.complexity();
        for _ in 0..50 {
            prune.mutate(&mut genome, &mut rng, &innovation).unwrap();
            assert!(genome.complexity() <= complexity);
            assert!(genome.is_consistent());
            complexity = genome.complexity();
        }
    }

    #[test]
    fn complexify_phase_should_keep_genomes_consistent() {
        let tracker = InnovationTracker::new();
        let innovation = tracker.handle();
        let settings = Settings { mutate_add_node: 0.5, mutate_add_connection: 0.5, ..Settings::default() };
        let mut rng = StdRng::seed_from_u64(11);
        let mut genome = prototype(&tracker);

        let complexify = DefaultMutation::new(&settings, Phase::Complexify);
        for _ in 0..100 {
            complexify.mutate(&mut genome, &mut rng, &innovation).unwrap();
            assert!(genome.is_consistent());
        }
        assert!(genome.complexity() > 7);
    }
}
