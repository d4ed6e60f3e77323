pub mod config;
pub mod gene_record;
pub mod trajectory;
pub mod vecmath;

// Re-export key types for easier use by dependent crates
pub use config::{
    SettingsFile, SimulationConstants, ANIMATION_PROFILE, NEURON_TRACE_PROFILE, STANDARD_PROFILE,
};
pub use gene_record::{load_gene_records, save_gene_records, select_record, GeneRecord};
pub use trajectory::{NeuralTrace, Trajectory};
pub use vecmath::{angle_to_vec, signed_angle_deg, Vec2};
