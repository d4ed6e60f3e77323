use crate::concentration::ConcentrationMode;
use crate::error::{Result, SimError};
use crate::gene::Gene;
use crate::simulation::{CpuSimulation, InitialHeading, RunOptions};
use klinotaxis_common::{SimulationConstants, Trajectory, Vec2};
use log::{debug, info, trace};
use rand::prelude::*;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Chemotaxis index of one path: one minus the time-averaged distance to the
/// peak in units of the start-to-peak distance, floored at zero.
///
/// Staying at the start scores ~0, sitting on the peak scores 1. The value is
/// not meaningful when the peak is at the origin.
pub fn chemotaxis_index(trajectory: &Trajectory, constants: &SimulationConstants) -> f64 {
    let peak = Vec2::new(constants.x_peak, constants.y_peak);
    let total_distance: f64 = trajectory.positions.iter().map(|r| r.distance(peak)).sum();
    let ci = 1.0 - total_distance / constants.peak_distance() / constants.time * constants.dt;
    ci.max(0.0)
}

/// Mean and spread of the index over independent trials.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CiSummary {
    pub mean: f64,
    /// Population standard deviation.
    pub std: f64,
    pub trials: usize,
}

impl CiSummary {
    pub fn from_samples(samples: &[f64]) -> Self {
        let n = samples.len();
        if n == 0 {
            return CiSummary { mean: f64::NAN, std: f64::NAN, trials: 0 };
        }
        let mean = samples.iter().sum::<f64>() / n as f64;
        let variance = samples.iter().map(|s| (s - mean).powi(2)).sum::<f64>() / n as f64;
        CiSummary { mean, std: variance.sqrt(), trials: n }
    }
}

/// Number of workers for `jobs` independent tasks.
pub(crate) fn worker_count(jobs: usize) -> usize {
    let available = std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1);
    available.min(jobs).max(1)
}

/// Builds the dedicated pool used for one batch of trials.
pub(crate) fn build_pool(jobs: usize) -> Result<rayon::ThreadPool> {
    let threads = worker_count(jobs);
    debug!("Building worker pool with {} threads for {} trials.", threads, jobs);
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build()
        .map_err(|e| SimError::WorkerPool(e.to_string()))
}

/// Scores a gene by running random-heading trials in parallel.
///
/// Trial `i` runs on its own simulator seeded with `seed + i` (wrapping), so
/// the collected scores do not depend on how trials land on workers.
#[derive(Debug, Clone)]
pub struct ChemotaxisEvaluator {
    constants: SimulationConstants,
    seed: u64,
}

impl ChemotaxisEvaluator {
    pub fn new(constants: SimulationConstants, seed: Option<u64>) -> Result<Self> {
        constants
            .validate()
            .map_err(|e| SimError::InvalidConstants(e.to_string()))?;
        let seed = seed.unwrap_or_else(|| {
            let drawn = rand::rng().random::<u64>();
            debug!("Drew evaluator base seed {}.", drawn);
            drawn
        });
        Ok(Self { constants, seed })
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn constants(&self) -> &SimulationConstants {
        &self.constants
    }

    /// Index of a single trial.
    pub fn trial(&self, gene: &Gene, mode: ConcentrationMode, index: usize) -> Result<f64> {
        let mut sim = CpuSimulation::new(self.constants.clone(), self.seed.wrapping_add(index as u64))?;
        let trajectory = sim.run(gene, &RunOptions::new(InitialHeading::Random, mode)).trajectory;
        let ci = chemotaxis_index(&trajectory, &self.constants);
        trace!("Trial {} finished with CI {:.6}", index, ci);
        Ok(ci)
    }

    /// Runs `trials` trials and returns every score in trial order.
    pub fn samples(&self, gene: &Gene, mode: ConcentrationMode, trials: usize) -> Result<Vec<f64>> {
        if trials == 0 {
            return Ok(Vec::new());
        }
        let pool = build_pool(trials)?;
        pool.install(|| {
            (0..trials)
                .into_par_iter()
                .map(|i| self.trial(gene, mode, i))
                .collect::<Result<Vec<f64>>>()
        })
    }

    /// Mean and population standard deviation over `trials` runs. With zero
    /// trials both are NaN.
    pub fn evaluate(&self, gene: &Gene, mode: ConcentrationMode, trials: usize) -> Result<CiSummary> {
        let samples = self.samples(gene, mode, trials)?;
        let summary = CiSummary::from_samples(&samples);
        info!(
            "Chemotaxis index over {} trials: mean {:.4}, std {:.4}",
            summary.trials, summary.mean, summary.std
        );
        Ok(summary)
    }
}
