use std::collections::HashMap;

use petgraph::graph::{EdgeIndex, Graph, NodeIndex};

use crate::error::{NeatError, Result};
use crate::gene::{Activation, ConnectionGene, Marker, NodeGene, NodeType};
use crate::organism::Phenome;

/// A neuron of the decoded network.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neuron {
    pub marker: Marker,
    pub node_type: NodeType,
    pub activation: Activation,
}

/// Network phenome. Connections fire once each, in a fixed order, which
/// makes a single pass sufficient for layered, feed-forward structures.
#[derive(Debug, Clone)]
pub struct Network {
    graph: Graph<Neuron, f64>,
    bias: Vec<NodeIndex>,
    inputs: Vec<NodeIndex>,
    outputs: Vec<NodeIndex>,
    firing: Vec<EdgeIndex>,
}

impl Network {
    /// Build the network from nodes in layer order and connections in firing
    /// order.
    pub fn new(nodes: &[&NodeGene], connections: &[&ConnectionGene]) -> Result<Network> {
        let mut graph = Graph::with_capacity(nodes.len(), connections.len());
        let mut index: HashMap<Marker, NodeIndex> = HashMap::with_capacity(nodes.len());
        let (mut bias, mut inputs, mut outputs) = (vec![], vec![], vec![]);

        for node in nodes {
            let neuron = Neuron { marker: node.marker, node_type: node.node_type, activation: node.activation };
            let i = graph.add_node(neuron);
            index.insert(node.marker, i);
            match node.node_type {
                NodeType::Bias => bias.push(i),
                NodeType::Input => inputs.push(i),
                NodeType::Output => outputs.push(i),
                NodeType::Hidden => {}
            }
        }

        let mut firing = Vec::with_capacity(connections.len());
        for conn in connections {
            let (source, target) = match (index.get(&conn.source), index.get(&conn.target)) {
                (Some(source), Some(target)) => (*source, *target),
                _ => return Err(NeatError::Decode(format!("connection {} has a missing endpoint", conn.marker))),
            };
            firing.push(graph.add_edge(source, target, conn.weight));
        }

        Ok(Network { graph, bias, inputs, outputs, firing })
    }

    pub fn graph(&self) -> &Graph<Neuron, f64> {
        &self.graph
    }

    pub fn input_count(&self) -> usize {
        self.inputs.len()
    }

    pub fn output_count(&self) -> usize {
        self.outputs.len()
    }

    fn output_of(&self, node: NodeIndex, value: f64) -> f64 {
        let neuron = &self.graph[node];
        if neuron.node_type.is_sensor() {
            value
        } else {
            neuron.activation.apply(value)
        }
    }
}

impl Phenome for Network {
    fn analyze(&self, inputs: &[f64]) -> Result<Vec<f64>> {
        if inputs.len() != self.inputs.len() {
            return Err(NeatError::InputMismatch { expected: self.inputs.len(), actual: inputs.len() });
        }
        if self.outputs.is_empty() {
            return Err(NeatError::EmptyOutputs);
        }

        let mut values = vec![0.; self.graph.node_count()];
        for node in &self.bias {
            values[node.index()] = 1.;
        }
        for (node, value) in self.inputs.iter().zip(inputs) {
            values[node.index()] = *value;
        }

        for edge in &self.firing {
            if let Some((source, target)) = self.graph.edge_endpoints(*edge) {
                values[target.index()] += self.graph[*edge] * self.output_of(source, values[source.index()]);
            }
        }

        let outputs: Vec<f64> = self.outputs.iter().map(|node| self.output_of(*node, values[node.index()])).collect();
        if outputs.iter().any(|value| !value.is_finite()) {
            return Err(NeatError::UndefinedOutputs);
        }
        Ok(outputs)
    }
}
