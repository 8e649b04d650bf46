use std::collections::HashMap;

use crate::error::Result;
use crate::gene::{ConnectionGene, Marker, NodeGene};
use crate::genome::Genome;
use crate::network::Network;
use crate::organism::Phenome;

/// Turns genomes into phenomes. Never changes the genome.
pub trait Decoder: Sync {
    fn decode(&self, genome: &Genome) -> Result<Box<dyn Phenome + Send>>;
}

/// Nodes sorted by layer, then by x, then by z.
pub fn ordered_nodes(genome: &Genome) -> Vec<&NodeGene> {
    let mut nodes: Vec<&NodeGene> = genome.nodes().iter().collect();
    nodes.sort_by(|a, b| a.position.layer_cmp(&b.position));
    nodes
}

/// Enabled connections in the order they fire: by the rank of their target
/// within `nodes`. Connections to the same target keep their marker order.
pub fn firing_order<'a>(genome: &'a Genome, nodes: &[&NodeGene]) -> Vec<&'a ConnectionGene> {
    let rank: HashMap<Marker, usize> = nodes.iter().enumerate().map(|(i, n)| (n.marker, i)).collect();
    let mut connections: Vec<&ConnectionGene> = genome.connections().iter().filter(|c| c.enabled).collect();
    connections.sort_by_key(|c| rank.get(&c.target).copied().unwrap_or(usize::MAX));
    connections
}

/// Decodes genomes into a [`Network`].
#[derive(Debug, Clone, Copy, Default)]
pub struct NetworkDecoder;

impl Decoder for NetworkDecoder {
    fn decode(&self, genome: &Genome) -> Result<Box<dyn Phenome + Send>> {
        let nodes = ordered_nodes(genome);
        let connections = firing_order(genome, &nodes);
        Ok(Box::new(Network::new(&nodes, &connections)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gene::{Activation, NodeType, Position};

    fn genome() -> Genome {
        let mut genome = Genome::new(1);
        let mut add = |marker, node_type, x, y| {
            genome.add_node_gene(NodeGene::new(marker, node_type, Activation::Direct, Position::new(x, y, 0.)))
        };
        add(0, NodeType::Output, 0., 1.);
        add(1, NodeType::Input, 0.5, 0.);
        add(2, NodeType::Bias, 0., 0.);
        add(3, NodeType::Hidden, 0., 0.5);
        genome.add_connection_gene(ConnectionGene::new(4, 3, 0, 1.));
        genome.add_connection_gene(ConnectionGene::new(5, 1, 3, 1.));
        genome.add_connection_gene(ConnectionGene::new(6, 2, 0, 1.));
        genome.add_connection_gene(ConnectionGene::new(7, 2, 3, 1.));
        genome
    }

    #[test]
    fn nodes_should_be_ordered_by_position() {
        let genome = genome();
        let markers: Vec<Marker> = ordered_nodes(&genome).iter().map(|n| n.marker).collect();
        assert_eq!(markers, vec![2, 1, 3, 0]);
    }

    #[test]
    fn connections_should_fire_in_target_order() {
        let genome = genome();
        let nodes = ordered_nodes(&genome);
        let markers: Vec<Marker> = firing_order(&genome, &nodes).iter().map(|c| c.marker).collect();
        assert_eq!(markers, vec![5, 7, 4, 6]);
    }

    #[test]
    fn disabled_connections_should_be_omitted() {
        let mut genome = genome();
        genome.connection_mut(7).unwrap().disable();
        let before = genome.clone();
        let nodes = ordered_nodes(&genome);
        let markers: Vec<Marker> = firing_order(&genome, &nodes).iter().map(|c| c.marker).collect();
        assert_eq!(markers, vec![5, 4, 6]);

        NetworkDecoder.decode(&genome).unwrap();
        assert_eq!(genome, before);
    }
}
