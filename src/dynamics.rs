use crate::gene::{NeuralParameters, NEURON_COUNT};
use crate::sensory::SensoryResponse;
use klinotaxis_common::SimulationConstants;
use std::f64::consts::PI;

/// Logistic function written so that neither branch can overflow:
/// `exp(min(x, 0)) / (1 + exp(-|x|))`.
#[inline(always)]
pub fn sigmoid(x: f64) -> f64 {
    x.min(0.0).exp() / (1.0 + (-x.abs()).exp())
}

/// Leaky-integrator network of the eight AIY/AIZ/SMB neurons.
///
/// One call to [`NeuralDynamics::step`] is one forward-Euler step of
///
/// ```text
/// tau dy_i/dt = -y_i + sum_j w[j][i] s(y_j + theta_j) + sum_j g[j][i] (y_j - y_i)
///               + w_on_i * on + w_off_i * off + w_osc_i * sin(2 pi t / T)
/// ```
///
/// No step-size control is done: `dt` has to be small relative to `tau`, or
/// the potentials diverge and the non-finite values propagate into the path.
#[derive(Debug, Clone)]
pub struct NeuralDynamics {
    theta: [f64; NEURON_COUNT],
    w: [[f64; NEURON_COUNT]; NEURON_COUNT],
    g: [[f64; NEURON_COUNT]; NEURON_COUNT],
    w_on: [f64; NEURON_COUNT],
    w_off: [f64; NEURON_COUNT],
    w_osc: [f64; NEURON_COUNT],
    dt: f64,
    tau: f64,
    period: f64,
}

impl NeuralDynamics {
    pub fn new(params: &NeuralParameters, constants: &SimulationConstants) -> Self {
        NeuralDynamics {
            theta: params.theta,
            w: params.w,
            g: params.g,
            w_on: params.w_on,
            w_off: params.w_off,
            w_osc: params.w_osc,
            dt: constants.dt,
            tau: constants.tau,
            period: constants.period,
        }
    }

    /// Central-pattern drive at time `t`.
    pub fn oscillation(&self, t: f64) -> f64 {
        (2.0 * PI * t / self.period).sin()
    }

    /// Chemical synaptic input to each neuron.
    pub fn synaptic_input(&self, y: &[f64; NEURON_COUNT]) -> [f64; NEURON_COUNT] {
        let activation: [f64; NEURON_COUNT] = std::array::from_fn(|j| sigmoid(y[j] + self.theta[j]));
        std::array::from_fn(|i| (0..NEURON_COUNT).map(|j| self.w[j][i] * activation[j]).sum())
    }

    /// Diffusive gap-junction current into each neuron.
    pub fn gap_input(&self, y: &[f64; NEURON_COUNT]) -> [f64; NEURON_COUNT] {
        std::array::from_fn(|i| (0..NEURON_COUNT).map(|j| self.g[j][i] * (y[j] - y[i])).sum())
    }

    /// Membrane potentials one `dt` after `y`, with `t` the time of `y`.
    pub fn step(&self, y: &[f64; NEURON_COUNT], sensory: SensoryResponse, t: f64) -> [f64; NEURON_COUNT] {
        let synapse = self.synaptic_input(y);
        let gap = self.gap_input(y);
        let osc = self.oscillation(t);

        std::array::from_fn(|i| {
            let external = self.w_on[i] * sensory.on + self.w_off[i] * sensory.off + self.w_osc[i] * osc;
            y[i] + (-y[i] + synapse[i] + gap[i] + external) / self.tau * self.dt
        })
    }
}
