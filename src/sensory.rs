use crate::gene::NeuralParameters;
use crate::sim_params::StepCounts;
use std::collections::VecDeque;

/// Gain applied to the window difference before it drives the network.
const SENSORY_GAIN: f64 = 100.0;

/// ON/OFF drive derived from the concentration history.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SensoryResponse {
    pub on: f64,
    pub off: f64,
}

/// ASE-like adapting sensor: compares the most recent `n` samples with the
/// `m` samples before them.
///
/// The history holds exactly `m + n` samples, oldest first. Each window sum is
/// normalised by the window length in seconds, so the result is a time average
/// of concentration per unit time rather than a per-sample mean.
#[derive(Debug, Clone)]
pub struct SensoryMemory {
    history: VecDeque<f64>,
    n_steps: usize,
    m_steps: usize,
    n_seconds: f64,
    m_seconds: f64,
    dt: f64,
}

impl SensoryMemory {
    /// Creates a history pre-filled with `initial` (the concentration at the start point).
    pub fn new(steps: &StepCounts, params: &NeuralParameters, dt: f64, initial: f64) -> Self {
        let capacity = steps.history_len();
        let mut history = VecDeque::with_capacity(capacity);
        history.extend(std::iter::repeat(initial).take(capacity));
        SensoryMemory {
            history,
            n_steps: steps.n,
            m_steps: steps.m,
            n_seconds: params.n,
            m_seconds: params.m,
            dt,
        }
    }

    /// Drops the oldest sample and appends `sample`.
    pub fn push(&mut self, sample: f64) {
        if self.history.is_empty() {
            return;
        }
        self.history.pop_front();
        self.history.push_back(sample);
    }

    pub fn len(&self) -> usize {
        self.history.len()
    }

    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }

    /// Time-normalised average of the baseline (older) window.
    fn baseline(&self) -> f64 {
        self.history.iter().take(self.m_steps).sum::<f64>() / self.m_seconds
    }

    /// Time-normalised average of the recent window.
    fn recent(&self) -> f64 {
        self.history.iter().skip(self.m_steps).take(self.n_steps).sum::<f64>() / self.n_seconds
    }

    /// ON responds to a rise relative to the baseline, OFF to a fall. Both are
    /// floored at zero and have no upper bound.
    pub fn response(&self) -> SensoryResponse {
        let difference = self.recent() - self.baseline();
        SensoryResponse {
            on: difference.max(0.0) * SENSORY_GAIN * self.dt,
            off: (-difference).max(0.0) * SENSORY_GAIN * self.dt,
        }
    }
}
