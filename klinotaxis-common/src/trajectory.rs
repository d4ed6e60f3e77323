use crate::vecmath::Vec2;
use serde::{Deserialize, Serialize};

/// Path of one simulated worm, sampled at every Euler step.
///
/// `time`, `positions` and `headings` all have one entry per step; entry 0 is
/// the initial state at the origin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trajectory {
    /// Step length used to produce the samples (s).
    pub dt: f64,
    /// Sample times, `k * dt`.
    pub time: Vec<f64>,
    /// Positions `r[k]` (cm).
    pub positions: Vec<Vec2>,
    /// Headings `mu[k]` (rad).
    pub headings: Vec<f64>,
}

impl Trajectory {
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn final_position(&self) -> Option<Vec2> {
        self.positions.last().copied()
    }
}

/// Membrane potentials of the eight network neurons over a run.
///
/// `potentials[k][i]` is neuron `i` at step `k`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NeuralTrace {
    pub neuron_names: Vec<String>,
    pub potentials: Vec<[f64; 8]>,
}

impl NeuralTrace {
    /// Time course of a single neuron.
    pub fn neuron(&self, index: usize) -> Vec<f64> {
        self.potentials.iter().map(|y| y[index]).collect()
    }
}
