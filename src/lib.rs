//! Implementation of `NeuroEvolution` of Augmenting Topologies [NEAT]
//! (http://nn.cs.utexas.edu/downloads/papers/stanley.ec02.pdf)
//!
//! Genomes are evolved generation by generation by a [`DefaultEvolution`],
//! decoded into [`Network`]s and scored by a caller supplied
//! [`OrganismEvaluator`]. An [`Experiment`] ties these together and
//! optionally archives every generation.

pub use self::archive::{Archiver, JsonArchiver};
pub use self::compatibility::{Compatibility, DefaultCompatibility};
pub use self::decoder::{Decoder, NetworkDecoder};
pub use self::error::{NeatError, Result};
pub use self::evaluation::{OrganismEvaluator, ParallelEvaluator, PopulationEvaluator, SerialEvaluator};
pub use self::evolution::{DefaultEvolution, Evolution};
pub use self::experiment::Experiment;
pub use self::gene::{Activation, ConnectionGene, Gene, Marker, NodeGene, NodeType, Position};
pub use self::genome::Genome;
pub use self::innovation::{Innovation, InnovationTracker};
pub use self::mutation::{DefaultMutation, Mutation};
pub use self::network::Network;
pub use self::organism::{Organism, Phenome};
pub use self::phase::{Phase, PhasedSearch};
pub use self::population::Population;
pub use self::settings::Settings;
pub use self::species::Species;
pub use self::statistics::Statistics;

pub mod archive;
pub mod compatibility;
pub mod crossover;
pub mod decoder;
pub mod error;
pub mod evaluation;
pub mod evolution;
pub mod experiment;
pub mod gene;
pub mod genome;
pub mod innovation;
pub mod mutation;
pub mod network;
pub mod organism;
pub mod phase;
pub mod population;
pub mod settings;
pub mod species;
pub mod statistics;
