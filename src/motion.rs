use crate::dynamics::sigmoid;
use crate::gene::{NeuralParameters, NEURON_COUNT, SMBDL, SMBDR, SMBVL, SMBVR};
use klinotaxis_common::{angle_to_vec, SimulationConstants, Vec2};

/// Converts head motor-neuron activity into steering and moves the agent.
#[derive(Debug, Clone)]
pub struct AgentMotion {
    theta: [f64; NEURON_COUNT],
    w_nmj: f64,
    velocity: f64,
    dt: f64,
}

impl AgentMotion {
    pub fn new(params: &NeuralParameters, constants: &SimulationConstants) -> Self {
        AgentMotion {
            theta: params.theta,
            w_nmj: params.w_nmj,
            velocity: constants.velocity,
            dt: constants.dt,
        }
    }

    /// Signed turning rate `phi`:
    /// `w_nmj * (s(SMBDR) + s(SMBVL) - s(SMBDL) - s(SMBVR))`.
    pub fn turning_rate(&self, y: &[f64; NEURON_COUNT]) -> f64 {
        let s = |i: usize| sigmoid(y[i] + self.theta[i]);
        self.w_nmj * (s(SMBDR) + s(SMBVL) - s(SMBDL) - s(SMBVR))
    }

    /// Heading after one step of turning at rate `phi`.
    pub fn advance_heading(&self, heading: f64, phi: f64) -> f64 {
        heading + phi * self.dt
    }

    /// Position after one step along `heading` (the heading at the start of the step).
    pub fn advance_position(&self, position: Vec2, heading: f64) -> Vec2 {
        let direction = angle_to_vec(heading);
        Vec2::new(
            position.x + self.velocity * direction.x * self.dt,
            position.y + self.velocity * direction.y * self.dt,
        )
    }
}

/// Fixed-interval random reorientation events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PirouetteSchedule {
    interval: usize,
}

impl PirouetteSchedule {
    /// `interval` is clamped to at least one step.
    pub fn new(interval: usize) -> Self {
        PirouetteSchedule { interval: interval.max(1) }
    }

    pub fn interval(&self) -> usize {
        self.interval
    }

    /// True when the heading after step `k` is redrawn.
    pub fn is_due(&self, k: usize) -> bool {
        k % self.interval == self.interval - 1
    }
}
