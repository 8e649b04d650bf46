use itertools::{EitherOrBoth, Itertools};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::gene::{Activation, ConnectionGene, Gene, Marker, NodeGene, NodeType, Position};
use crate::innovation::Innovation;
use crate::settings::Settings;

/// Encoding of a single network.
///
/// Node and connection genes are each kept sorted by ascending marker, which
/// allows binary search lookups and a linear merge walk when two genomes are
/// aligned.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Genome {
    pub id: u64,
    nodes: Vec<NodeGene>,
    connections: Vec<ConnectionGene>,
    /// Fitness values, index 0 is the primary one. Empty until evaluated.
    pub fitness: Vec<f64>,
}

impl Genome {
    /// Create an empty genome.
    pub fn new(id: u64) -> Genome {
        Genome { id, ..Genome::default() }
    }

    /// Build the initial genome: every bias and input node connected to every
    /// output node with zero weight.
    ///
    /// Bias and input nodes sit on layer 0, outputs on layer 1, each spread
    /// evenly over `x` in [0, 1]. Markers are handed out in the order bias,
    /// inputs, outputs, connections.
    pub fn prototype(settings: &Settings, innovation: &Innovation) -> Result<Genome> {
        let mut genome = Genome::new(innovation.next_id()?);

        let sensors = settings.bias_count + settings.input_count;
        let step = if sensors > 1 { 1. / (sensors - 1) as f64 } else { 0. };
        for i in 0..sensors {
            let node_type = if i < settings.bias_count { NodeType::Bias } else { NodeType::Input };
            let position = Position::new(step * i as f64, 0., 0.);
            genome.add_node_gene(NodeGene::new(innovation.next_marker()?, node_type, Activation::Direct, position));
        }

        let step = if settings.output_count > 1 { 1. / (settings.output_count - 1) as f64 } else { 0. };
        for i in 0..settings.output_count {
            let position = Position::new(step * i as f64, 1., 0.);
            genome.add_node_gene(NodeGene::new(
                innovation.next_marker()?,
                NodeType::Output,
                Activation::SteepenedSigmoid,
                position,
            ));
        }

        let sources: Vec<Marker> = genome.nodes.iter().filter(|n| n.node_type.is_sensor()).map(|n| n.marker).collect();
        let targets: Vec<Marker> =
            genome.nodes.iter().filter(|n| n.node_type == NodeType::Output).map(|n| n.marker).collect();
        for source in &sources {
            for target in &targets {
                genome.add_connection_gene(ConnectionGene::new(innovation.next_marker()?, *source, *target, 0.));
            }
        }
        Ok(genome)
    }

    /// Deep copy under a new id. Fitness is copied along.
    pub fn clone_with_id(&self, id: u64) -> Genome {
        Genome { id, ..self.clone() }
    }

    pub fn nodes(&self) -> &[NodeGene] {
        &self.nodes
    }

    pub fn connections(&self) -> &[ConnectionGene] {
        &self.connections
    }

    /// Mutable access to the connections. Markers must not be changed.
    pub(crate) fn connections_mut(&mut self) -> &mut [ConnectionGene] {
        &mut self.connections
    }

    /// Mutable access to the nodes. Markers must not be changed.
    pub(crate) fn nodes_mut(&mut self) -> &mut [NodeGene] {
        &mut self.nodes
    }

    /// Insert a node gene at its sorted position. Returns false if a gene
    /// with the same marker already exists.
    pub fn add_node_gene(&mut self, gene: NodeGene) -> bool {
        insert_sorted(&mut self.nodes, gene)
    }

    /// Insert a connection gene at its sorted position. Returns false if a
    /// gene with the same marker already exists.
    pub fn add_connection_gene(&mut self, gene: ConnectionGene) -> bool {
        insert_sorted(&mut self.connections, gene)
    }

    pub fn remove_node_gene(&mut self, marker: Marker) -> Option<NodeGene> {
        remove_sorted(&mut self.nodes, marker)
    }

    pub fn remove_connection_gene(&mut self, marker: Marker) -> Option<ConnectionGene> {
        remove_sorted(&mut self.connections, marker)
    }

    pub fn node(&self, marker: Marker) -> Option<&NodeGene> {
        find_sorted(&self.nodes, marker).map(|i| &self.nodes[i])
    }

    pub fn connection(&self, marker: Marker) -> Option<&ConnectionGene> {
        find_sorted(&self.connections, marker).map(|i| &self.connections[i])
    }

    pub fn connection_mut(&mut self, marker: Marker) -> Option<&mut ConnectionGene> {
        find_sorted(&self.connections, marker).map(move |i| &mut self.connections[i])
    }

    /// Whether a connection from `source` to `target` exists, enabled or not.
    pub fn has_connection(&self, source: Marker, target: Marker) -> bool {
        self.connections.iter().any(|c| c.source == source && c.target == target)
    }

    /// Greatest marker over all genes.
    pub fn max_marker(&self) -> Option<Marker> {
        let node = self.nodes.last().map(|n| n.marker);
        let conn = self.connections.last().map(|c| c.marker);
        node.max(conn)
    }

    /// Primary fitness, 0 if not yet evaluated.
    pub fn fitness(&self) -> f64 {
        self.fitness.first().copied().unwrap_or(0.)
    }

    /// Number of genes.
    pub fn complexity(&self) -> usize {
        self.nodes.len() + self.connections.len()
    }

    /// Whether every connection refers to nodes of this genome and both gene
    /// lists are strictly sorted.
    pub fn is_consistent(&self) -> bool {
        let sorted = self.nodes.windows(2).all(|w| w[0].marker < w[1].marker)
            && self.connections.windows(2).all(|w| w[0].marker < w[1].marker);
        sorted
            && self
                .connections
                .iter()
                .all(|c| self.node(c.source).is_some() && self.node(c.target).is_some())
    }

    /// Restore the ordering of genes, e.g. after deserializing foreign data.
    pub fn sort_genes(&mut self) {
        self.nodes.sort_by_key(|n| n.marker);
        self.nodes.dedup_by_key(|n| n.marker);
        self.connections.sort_by_key(|c| c.marker);
        self.connections.dedup_by_key(|c| c.marker);
    }
}

/// Walk two marker-sorted gene lists side by side.
///
/// Yields `Both` for genes with equal markers and `Left`/`Right` for genes
/// only present on one side, in ascending marker order.
pub fn align<'a, G: Gene>(left: &'a [G], right: &'a [G]) -> impl Iterator<Item = EitherOrBoth<&'a G, &'a G>> + 'a {
    left.iter().merge_join_by(right.iter(), |l, r| l.marker().cmp(&r.marker()))
}

fn find_sorted<G: Gene>(genes: &[G], marker: Marker) -> Option<usize> {
    genes.binary_search_by_key(&marker, |g| g.marker()).ok()
}

fn insert_sorted<G: Gene>(genes: &mut Vec<G>, gene: G) -> bool {
    match genes.binary_search_by_key(&gene.marker(), |g| g.marker()) {
        Ok(_) => false,
        Err(index) => {
            genes.insert(index, gene);
            true
        }
    }
}

fn remove_sorted<G: Gene>(genes: &mut Vec<G>, marker: Marker) -> Option<G> {
    find_sorted(genes, marker).map(|i| genes.remove(i))
}
