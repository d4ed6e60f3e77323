use crate::gene::NeuralParameters;
use klinotaxis_common::SimulationConstants;
use serde::{Deserialize, Serialize};

/// Time constants of a run converted to whole Euler steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepCounts {
    /// Recent sensory window, `floor(N / dt)`.
    pub n: usize,
    /// Baseline sensory window, `floor(M / dt)`.
    pub m: usize,
    /// Steps between pirouettes, `floor(1 / f / dt)`.
    pub pirouette_interval: usize,
    /// Steps per oscillation period, `floor(T / dt)`.
    pub period: usize,
    /// Steps in the run, `floor(time / dt)`.
    pub total: usize,
}

impl StepCounts {
    pub fn new(params: &NeuralParameters, constants: &SimulationConstants) -> Self {
        let dt = constants.dt;
        let steps = |seconds: f64| (seconds / dt).floor().max(0.0) as usize;
        StepCounts {
            n: steps(params.n),
            m: steps(params.m),
            pirouette_interval: steps(1.0 / constants.frequency),
            period: steps(constants.period),
            total: constants.total_steps(),
        }
    }

    /// Length of the sensory history buffer.
    pub fn history_len(&self) -> usize {
        self.n + self.m
    }
}
