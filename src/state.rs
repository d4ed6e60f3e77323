use crate::gene::NEURON_COUNT;
use klinotaxis_common::{NeuralTrace, Trajectory, Vec2};

/// Holds the integration state of one agent during a run.
#[derive(Debug)]
pub struct AgentState {
    // --- Ping-Pong Buffers for the Euler update ---
    /// Membrane potentials at step k (current step's input).
    pub potentials_in: [f64; NEURON_COUNT],
    /// Membrane potentials at step k+1 (current step's output).
    pub potentials_out: [f64; NEURON_COUNT],

    pub position: Vec2,
    pub heading: f64,
    pub step: usize,

    // --- Recorded history ---
    positions: Vec<Vec2>,
    headings: Vec<f64>,
    potentials: Option<Vec<[f64; NEURON_COUNT]>>,
}

impl AgentState {
    /// Starts at the origin. `total_steps` is the number of samples that
    /// will be recorded, including the initial one.
    pub fn new(
        initial_potentials: [f64; NEURON_COUNT],
        initial_heading: f64,
        total_steps: usize,
        record_potentials: bool,
    ) -> Self {
        let mut positions = Vec::with_capacity(total_steps);
        let mut headings = Vec::with_capacity(total_steps);
        positions.push(Vec2::zero());
        headings.push(initial_heading);
        let potentials = record_potentials.then(|| {
            let mut trace = Vec::with_capacity(total_steps);
            trace.push(initial_potentials);
            trace
        });

        Self {
            potentials_in: initial_potentials,
            potentials_out: [0.0; NEURON_COUNT],
            position: Vec2::zero(),
            heading: initial_heading,
            step: 0,
            positions,
            headings,
            potentials,
        }
    }

    /// Commits step k+1: swaps the potential buffers and records the new sample.
    pub fn advance(&mut self, next_position: Vec2, next_heading: f64) {
        std::mem::swap(&mut self.potentials_in, &mut self.potentials_out);
        self.position = next_position;
        self.heading = next_heading;
        self.step += 1;

        self.positions.push(next_position);
        self.headings.push(next_heading);
        if let Some(trace) = self.potentials.as_mut() {
            trace.push(self.potentials_in);
        }
    }

    pub fn recorded_len(&self) -> usize {
        self.positions.len()
    }

    /// Consumes the state, returning the path and (if recorded) the potentials.
    pub fn into_records(self, dt: f64) -> (Trajectory, Option<Vec<[f64; NEURON_COUNT]>>) {
        let time = (0..self.positions.len()).map(|k| k as f64 * dt).collect();
        let trajectory = Trajectory {
            dt,
            time,
            positions: self.positions,
            headings: self.headings,
        };
        (trajectory, self.potentials)
    }
}

/// Wraps recorded potentials with the neuron names used for plotting.
pub fn neural_trace(potentials: Vec<[f64; NEURON_COUNT]>) -> NeuralTrace {
    NeuralTrace {
        neuron_names: crate::gene::NEURON_NAMES.iter().map(|s| s.to_string()).collect(),
        potentials,
    }
}
