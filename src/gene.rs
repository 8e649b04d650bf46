use std::cmp::Ordering;

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Historical identity of a gene. Assigned once, never reused.
pub type Marker = u64;

/// Anything with a historical marker.
pub trait Gene {
    fn marker(&self) -> Marker;
}

/// Role of a node within the network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeType {
    Bias,
    Input,
    Output,
    Hidden,
}

impl NodeType {
    /// Bias and input nodes only ever emit values.
    pub fn is_sensor(self) -> bool {
        matches!(self, NodeType::Bias | NodeType::Input)
    }
}

/// Activation function tag of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Activation {
    Direct,
    Sigmoid,
    /// Sigmoid with slope 4.9, as in the original paper.
    SteepenedSigmoid,
    Tanh,
    Gaussian,
    Sine,
}

const MUTABLE_ACTIVATIONS: [Activation; 5] = [
    Activation::Sigmoid,
    Activation::SteepenedSigmoid,
    Activation::Tanh,
    Activation::Gaussian,
    Activation::Sine,
];

impl Activation {
    pub fn apply(self, x: f64) -> f64 {
        match self {
            Activation::Direct => x,
            Activation::Sigmoid => 1. / (1. + (-x).exp()),
            Activation::SteepenedSigmoid => 1. / (1. + (-4.9 * x).exp()),
            Activation::Tanh => x.tanh(),
            Activation::Gaussian => (-(x * x)).exp(),
            Activation::Sine => x.sin(),
        }
    }

    /// Pick any activation except `Direct`.
    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Activation {
        *MUTABLE_ACTIVATIONS.choose(rng).unwrap_or(&Activation::SteepenedSigmoid)
    }
}

/// Location of a node. `y` is the layer, `x` the spread within the layer and
/// `z` separates nodes that would otherwise coincide.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Position {
    pub fn new(x: f64, y: f64, z: f64) -> Position {
        Position { x, y, z }
    }

    /// Point halfway between two positions, on the z = 0 plane.
    pub fn midpoint(a: &Position, b: &Position) -> Position {
        Position { x: (a.x + b.x) / 2., y: (a.y + b.y) / 2., z: 0. }
    }

    /// Order by layer first, then by x, then by z.
    pub fn layer_cmp(&self, other: &Position) -> Ordering {
        self.y
            .total_cmp(&other.y)
            .then(self.x.total_cmp(&other.x))
            .then(self.z.total_cmp(&other.z))
    }
}

/// A neuron of the genome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeGene {
    pub marker: Marker,
    pub node_type: NodeType,
    pub activation: Activation,
    pub position: Position,
}

impl NodeGene {
    pub fn new(marker: Marker, node_type: NodeType, activation: Activation, position: Position) -> NodeGene {
        NodeGene { marker, node_type, activation, position }
    }
}

impl Gene for NodeGene {
    fn marker(&self) -> Marker {
        self.marker
    }
}

/// A weighted, directed link between two node genes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectionGene {
    pub marker: Marker,
    pub source: Marker,
    pub target: Marker,
    pub weight: f64,
    pub enabled: bool,
}

impl ConnectionGene {
    /// Create a new, enabled gene with a specific connection
    pub fn new(marker: Marker, source: Marker, target: Marker, weight: f64) -> ConnectionGene {
        ConnectionGene { marker, source, target, weight, enabled: true }
    }

    /// Set gene enabled
    pub fn enable(&mut self) {
        self.enabled = true;
    }
    /// Set gene disabled
    pub fn disable(&mut self) {
        self.enabled = false;
    }
    /// Toggle the enable state
    pub fn toggle_enabled(&mut self) { self.enabled = !self.enabled; }
}

impl Gene for ConnectionGene {
    fn marker(&self) -> Marker {
        self.marker
    }
}
