//! Gene decoding and the fixed wiring of the klinotaxis circuit.
//!
//! A gene is 22 numbers, conventionally in [-1, 1]. Each component is mapped
//! linearly onto the physical range of the parameter it controls. Left/right
//! neuron pairs read the same component, so the decoded network is bilaterally
//! symmetric except for the oscillatory drive, whose dorsal/ventral pairs have
//! opposite sign.
//!
//! Neuron indices:
//!
//! | index | neuron |
//! |-------|--------|
//! | 0, 1  | AIYL, AIYR (first interneuron layer, receives ASE input) |
//! | 2, 3  | AIZL, AIZR |
//! | 4, 5  | SMBDL, SMBDR (dorsal head motor neurons) |
//! | 6, 7  | SMBVL, SMBVR (ventral head motor neurons) |

use crate::error::{Result, SimError};
use serde::{Deserialize, Serialize};

pub const GENE_LENGTH: usize = 22;
pub const NEURON_COUNT: usize = 8;

pub const NEURON_NAMES: [&str; NEURON_COUNT] = [
    "AIYL", "AIYR", "AIZL", "AIZR", "SMBDL", "SMBDR", "SMBVL", "SMBVR",
];

pub const AIYL: usize = 0;
pub const AIYR: usize = 1;
pub const AIZL: usize = 2;
pub const AIZR: usize = 3;
pub const SMBDL: usize = 4;
pub const SMBDR: usize = 5;
pub const SMBVL: usize = 6;
pub const SMBVR: usize = 7;

/// Closed interval a gene component is rescaled onto.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParamRange {
    pub min: f64,
    pub max: f64,
}

impl ParamRange {
    pub const fn new(min: f64, max: f64) -> Self {
        ParamRange { min, max }
    }

    /// `(component + 1) / 2 * (max - min) + min`. Components outside [-1, 1]
    /// extrapolate past the range.
    pub fn rescale(&self, component: f64) -> f64 {
        (component + 1.0) / 2.0 * (self.max - self.min) + self.min
    }
}

pub const SENSORY_WINDOW_RANGE: ParamRange = ParamRange::new(0.1, 4.2);
pub const THRESHOLD_RANGE: ParamRange = ParamRange::new(-15.0, 15.0);
pub const SENSORY_WEIGHT_RANGE: ParamRange = ParamRange::new(-15.0, 15.0);
pub const SYNAPSE_WEIGHT_RANGE: ParamRange = ParamRange::new(-15.0, 15.0);
pub const GAP_WEIGHT_RANGE: ParamRange = ParamRange::new(0.0, 2.5);
pub const OSCILLATION_WEIGHT_RANGE: ParamRange = ParamRange::new(0.0, 15.0);
pub const NMJ_WEIGHT_RANGE: ParamRange = ParamRange::new(1.0, 3.0);

/// A directed connection whose weight is `polarity * rescale(gene[gene_index])`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Edge {
    pub source: usize,
    pub target: usize,
    pub gene_index: usize,
    pub polarity: f64,
}

const fn edge(source: usize, target: usize, gene_index: usize) -> Edge {
    Edge { source, target, gene_index, polarity: 1.0 }
}

/// A per-neuron quantity read from one gene component.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NeuronInput {
    pub neuron: usize,
    pub gene_index: usize,
    pub polarity: f64,
}

const fn input(neuron: usize, gene_index: usize, polarity: f64) -> NeuronInput {
    NeuronInput { neuron, gene_index, polarity }
}

pub const SENSORY_WINDOW_N_GENE: usize = 0;
pub const SENSORY_WINDOW_M_GENE: usize = 1;
pub const NMJ_WEIGHT_GENE: usize = 21;

pub const THRESHOLDS: [NeuronInput; NEURON_COUNT] = [
    input(AIYL, 2, 1.0),
    input(AIYR, 3, 1.0),
    input(AIZL, 4, 1.0),
    input(AIZR, 5, 1.0),
    input(SMBDL, 6, 1.0),
    input(SMBDR, 6, 1.0),
    input(SMBVL, 7, 1.0),
    input(SMBVR, 7, 1.0),
];

/// ASE ON response feeds the AIY pair.
pub const ON_INPUTS: [NeuronInput; 2] = [input(AIYL, 8, 1.0), input(AIYR, 9, 1.0)];

/// ASE OFF response feeds the AIY pair.
pub const OFF_INPUTS: [NeuronInput; 2] = [input(AIYL, 10, 1.0), input(AIYR, 11, 1.0)];

/// Chemical synapses, including the motor-neuron self connections.
pub const SYNAPSES: [Edge; 10] = [
    edge(AIYL, AIZL, 12),
    edge(AIYR, AIZR, 13),
    edge(AIZL, SMBDL, 14),
    edge(AIZL, SMBDR, 14),
    edge(AIZR, SMBVL, 15),
    edge(AIZR, SMBVR, 15),
    edge(SMBDL, SMBDL, 16),
    edge(SMBDR, SMBDR, 16),
    edge(SMBVL, SMBVL, 17),
    edge(SMBVR, SMBVR, 17),
];

/// Gap junctions; each is installed in both directions.
pub const GAP_JUNCTIONS: [Edge; 2] = [edge(AIYL, AIYR, 18), edge(AIZL, AIZR, 19)];

/// Central-pattern drive to the motor neurons: dorsal-left and ventral-right
/// in phase, the other two in anti-phase.
pub const OSCILLATOR_INPUTS: [NeuronInput; 4] = [
    input(SMBDL, 20, 1.0),
    input(SMBVR, 20, 1.0),
    input(SMBDR, 20, -1.0),
    input(SMBVL, 20, -1.0),
];

/// A validated 22-component gene.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<f64>", into = "Vec<f64>")]
pub struct Gene(Vec<f64>);

impl Gene {
    pub fn new(values: Vec<f64>) -> Result<Self> {
        if values.len() != GENE_LENGTH {
            return Err(SimError::InvalidGeneLength {
                expected: GENE_LENGTH,
                actual: values.len(),
            });
        }
        Ok(Gene(values))
    }

    pub fn from_slice(values: &[f64]) -> Result<Self> {
        Self::new(values.to_vec())
    }

    /// The all-zero gene: every parameter at the midpoint of its range.
    pub fn zeros() -> Self {
        Gene(vec![0.0; GENE_LENGTH])
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }
}

impl TryFrom<Vec<f64>> for Gene {
    type Error = SimError;

    fn try_from(values: Vec<f64>) -> Result<Self> {
        Gene::new(values)
    }
}

impl From<Gene> for Vec<f64> {
    fn from(gene: Gene) -> Self {
        gene.0
    }
}

/// Network parameters decoded from a gene.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NeuralParameters {
    /// Recent (ON) sensory window, seconds.
    pub n: f64,
    /// Baseline (OFF) sensory window, seconds.
    pub m: f64,
    pub theta: [f64; NEURON_COUNT],
    pub w_on: [f64; NEURON_COUNT],
    pub w_off: [f64; NEURON_COUNT],
    /// `w[source][target]`.
    pub w: [[f64; NEURON_COUNT]; NEURON_COUNT],
    /// Symmetric gap-junction conductances.
    pub g: [[f64; NEURON_COUNT]; NEURON_COUNT],
    pub w_osc: [f64; NEURON_COUNT],
    pub w_nmj: f64,
}

impl NeuralParameters {
    /// Decodes a gene into network parameters.
    pub fn decode(gene: &Gene) -> Self {
        let genes = gene.as_slice();
        let component = |index: usize, range: ParamRange| range.rescale(genes[index]);

        let mut params = NeuralParameters {
            n: component(SENSORY_WINDOW_N_GENE, SENSORY_WINDOW_RANGE),
            m: component(SENSORY_WINDOW_M_GENE, SENSORY_WINDOW_RANGE),
            theta: [0.0; NEURON_COUNT],
            w_on: [0.0; NEURON_COUNT],
            w_off: [0.0; NEURON_COUNT],
            w: [[0.0; NEURON_COUNT]; NEURON_COUNT],
            g: [[0.0; NEURON_COUNT]; NEURON_COUNT],
            w_osc: [0.0; NEURON_COUNT],
            w_nmj: component(NMJ_WEIGHT_GENE, NMJ_WEIGHT_RANGE),
        };

        for t in &THRESHOLDS {
            params.theta[t.neuron] = t.polarity * component(t.gene_index, THRESHOLD_RANGE);
        }
        for on in &ON_INPUTS {
            params.w_on[on.neuron] = on.polarity * component(on.gene_index, SENSORY_WEIGHT_RANGE);
        }
        for off in &OFF_INPUTS {
            params.w_off[off.neuron] = off.polarity * component(off.gene_index, SENSORY_WEIGHT_RANGE);
        }
        for e in &SYNAPSES {
            params.w[e.source][e.target] = e.polarity * component(e.gene_index, SYNAPSE_WEIGHT_RANGE);
        }
        for e in &GAP_JUNCTIONS {
            let weight = e.polarity * component(e.gene_index, GAP_WEIGHT_RANGE);
            params.g[e.source][e.target] = weight;
            params.g[e.target][e.source] = weight;
        }
        for osc in &OSCILLATOR_INPUTS {
            params.w_osc[osc.neuron] = osc.polarity * component(osc.gene_index, OSCILLATION_WEIGHT_RANGE);
        }
        params
    }

    /// Decodes, then rounds every parameter to `decimals` places.
    ///
    /// `Some(0)` means no rounding, same as `None`: rounding to integers would
    /// collapse short sensory windows to zero samples.
    pub fn decode_rounded(gene: &Gene, decimals: Option<u32>) -> Self {
        let params = Self::decode(gene);
        match decimals {
            Some(places) if places > 0 => params.rounded(places),
            _ => params,
        }
    }

    /// Copy with every parameter rounded to `decimals` places.
    ///
    /// Ties round half away from zero (`f64::round`), not half to even, so a
    /// value exactly halfway between two representable results can differ in
    /// the last place from a banker's-rounding implementation.
    pub fn rounded(&self, decimals: u32) -> Self {
        let scale = 10f64.powi(decimals as i32);
        let round = |v: f64| (v * scale).round() / scale;
        let round_row = |row: [f64; NEURON_COUNT]| row.map(round);

        NeuralParameters {
            n: round(self.n),
            m: round(self.m),
            theta: round_row(self.theta),
            w_on: round_row(self.w_on),
            w_off: round_row(self.w_off),
            w: self.w.map(round_row),
            g: self.g.map(round_row),
            w_osc: round_row(self.w_osc),
            w_nmj: round(self.w_nmj),
        }
    }
}
