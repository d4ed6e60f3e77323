//! Klinotaxis simulator for the eight-neuron AIY/AIZ/SMB head network of
//! *C. elegans*: a gene is decoded into network parameters, the network is
//! integrated with forward Euler while the agent moves through a chemical
//! landscape, and the resulting path is scored with the chemotaxis index.

pub mod analysis;
pub mod chemotaxis;
pub mod concentration;
pub mod dynamics;
pub mod error;
pub mod gene;
pub mod motion;
pub mod output;
pub mod sensory;
pub mod sim_params;
pub mod simulation;
pub mod state;

pub use analysis::{AnalysisKind, AnalysisReport, AnalysisSettings, KlinotaxisAnalyzer};
pub use chemotaxis::{chemotaxis_index, ChemotaxisEvaluator, CiSummary};
pub use concentration::{ConcentrationField, ConcentrationMode};
pub use error::{Result, SimError};
pub use gene::{Gene, NeuralParameters, GENE_LENGTH, NEURON_COUNT, NEURON_NAMES};
pub use sim_params::StepCounts;
pub use simulation::{CpuSimulation, InitialHeading, RunOptions, SimulationOutput, Simulator};
