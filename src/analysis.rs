//! Klinotaxis analysis: how the curving rate of a path depends on its bearing
//! to the peak or on the local concentration gradient.
//!
//! Every quantity is computed over a sliding window of `w` steps, where `w` is
//! a whole number of oscillation periods, so the head-swing is averaged out.

use crate::chemotaxis::build_pool;
use crate::concentration::{ConcentrationField, ConcentrationMode};
use crate::error::{Result, SimError};
use crate::gene::{Gene, NeuralParameters};
use crate::simulation::{CpuSimulation, InitialHeading, RunOptions};
use crate::sim_params::StepCounts;
use klinotaxis_common::{signed_angle_deg, SimulationConstants, Vec2};
use log::{debug, info, trace};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Quantity placed on the x axis of the analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AnalysisKind {
    Bearing,
    NormalGradient,
    TranslationalGradient,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisSettings {
    pub mode: ConcentrationMode,
    /// Independent trials aggregated per bin.
    pub analysis_loop: usize,
    /// Window length in oscillation periods.
    pub periodic_number: usize,
    /// Leading periods discarded from every trial.
    pub drain_periods: usize,
    /// Bearing bin width in degrees.
    pub bin_range: usize,
    /// Finite-difference step for gradients (cm).
    pub delta: f64,
    /// Number of gradient bins over `[-gradient_max, gradient_max]`.
    pub bin_number: usize,
    pub gradient_max: f64,
}

impl Default for AnalysisSettings {
    fn default() -> Self {
        AnalysisSettings {
            mode: ConcentrationMode::Gaussian,
            analysis_loop: 100,
            periodic_number: 1,
            drain_periods: 1,
            bin_range: 30,
            delta: 0.01,
            bin_number: 20,
            gradient_max: 0.02,
        }
    }
}

impl AnalysisSettings {
    pub fn validate(&self) -> Result<()> {
        if self.periodic_number == 0 {
            return Err(SimError::InvalidAnalysis("periodic_number must be at least 1".into()));
        }
        if self.bin_range == 0 || self.bin_range > 360 {
            return Err(SimError::InvalidAnalysis(format!(
                "bin_range must be in 1..=360 degrees, got {}",
                self.bin_range
            )));
        }
        if !(self.delta.is_finite() && self.delta > 0.0) {
            return Err(SimError::InvalidAnalysis(format!("delta must be positive, got {}", self.delta)));
        }
        if !(self.gradient_max.is_finite() && self.gradient_max > 0.0) {
            return Err(SimError::InvalidAnalysis(format!(
                "gradient_max must be positive, got {}",
                self.gradient_max
            )));
        }
        Ok(())
    }
}

/// Displacements `r[i + w] - r[i]` for `i in 0..len - 2w`.
fn window_displacements(positions: &[Vec2], window: usize) -> impl Iterator<Item = (Vec2, Vec2)> + '_ {
    let count = positions.len().saturating_sub(2 * window);
    (0..count).map(move |i| (positions[i], positions[i + window] - positions[i]))
}

/// Signed angle (degrees) between the peak direction and the displacement over
/// each window; negative when the displacement lies counter-clockwise of the peak.
pub fn bearing(positions: &[Vec2], peak: Vec2, window: usize) -> Vec<f64> {
    window_displacements(positions, window)
        .map(|(_, displacement)| signed_angle_deg(displacement, peak))
        .collect()
}

/// Turning angle between consecutive window displacements, in degrees per
/// unit path length. Positive for counter-clockwise turns.
pub fn curving_rate(positions: &[Vec2], window: usize) -> Vec<f64> {
    let count = positions.len().saturating_sub(2 * window);
    (0..count)
        .map(|i| {
            let d1 = positions[i + window] - positions[i];
            let d2 = positions[i + 2 * window] - positions[i + window];
            signed_angle_deg(d1, d2) / (d1.length() + d2.length())
        })
        .collect()
}

fn directional_gradient(field: &ConcentrationField, origin: Vec2, direction: Vec2, delta: f64) -> f64 {
    let probe = origin + direction.normalize_or_zero() * delta;
    (field.at(probe) - field.at(origin)) / delta
}

/// Concentration slope perpendicular (left-hand side) to the direction of travel.
pub fn normal_gradient(positions: &[Vec2], field: &ConcentrationField, window: usize, delta: f64) -> Vec<f64> {
    window_displacements(positions, window)
        .map(|(origin, displacement)| {
            directional_gradient(field, origin, displacement.perpendicular(), delta)
        })
        .collect()
}

/// Concentration slope along the direction of travel.
pub fn translational_gradient(
    positions: &[Vec2],
    field: &ConcentrationField,
    window: usize,
    delta: f64,
) -> Vec<f64> {
    window_displacements(positions, window)
        .map(|(origin, displacement)| directional_gradient(field, origin, displacement, delta))
        .collect()
}

/// Half-open bin edges `(low, high)`; membership is strict on both sides.
pub fn bearing_bins(bin_range: usize) -> Vec<(f64, f64)> {
    (-180..180)
        .step_by(bin_range.max(1))
        .map(|low| (low as f64, (low + bin_range as i64) as f64))
        .collect()
}

pub fn gradient_bins(bin_number: usize, gradient_max: f64) -> Vec<(f64, f64)> {
    let width = 2.0 * gradient_max / bin_number as f64;
    (0..bin_number)
        .map(|i| (-gradient_max + i as f64 * width, -gradient_max + (i + 1) as f64 * width))
        .collect()
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        f64::NAN
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

/// Curving rates whose x value falls strictly inside `bin`.
fn members(x: &[f64], y: &[f64], bin: (f64, f64)) -> Vec<f64> {
    x.iter()
        .zip(y)
        .filter(|(xv, _)| bin.0 < **xv && **xv < bin.1)
        .map(|(_, &yv)| yv)
        .collect()
}

/// Mean curving rate per bin; NaN for empty bins.
pub fn binned_means(x: &[f64], y: &[f64], bins: &[(f64, f64)]) -> Vec<f64> {
    bins.iter().map(|&bin| mean(&members(x, y, bin))).collect()
}

/// Per-bin means of all, positive-only and negative-only curving rates.
pub fn binned_split_means(x: &[f64], y: &[f64], bins: &[(f64, f64)]) -> Vec<[f64; 3]> {
    bins.iter()
        .map(|&bin| {
            let values = members(x, y, bin);
            let positive: Vec<f64> = values.iter().copied().filter(|&v| v > 0.0).collect();
            let negative: Vec<f64> = values.iter().copied().filter(|&v| v < 0.0).collect();
            [mean(&values), mean(&positive), mean(&negative)]
        })
        .collect()
}

/// Spread of one bin across trials, NaN entries ignored.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BinStats {
    pub mean: f64,
    pub std: f64,
    pub max: f64,
    pub min: f64,
}

impl BinStats {
    pub fn from_values(values: impl IntoIterator<Item = f64>) -> Self {
        let values: Vec<f64> = values.into_iter().filter(|v| !v.is_nan()).collect();
        if values.is_empty() {
            return BinStats { mean: f64::NAN, std: f64::NAN, max: f64::NAN, min: f64::NAN };
        }
        let mean = mean(&values);
        let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64;
        BinStats {
            mean,
            std: variance.sqrt(),
            max: values.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            min: values.iter().copied().fold(f64::INFINITY, f64::min),
        }
    }
}

/// One row of a bearing or normal-gradient analysis.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ErrorBarRow {
    /// Lower edge of the bin.
    pub x: f64,
    pub curving_rate: f64,
    pub std: f64,
    pub max: f64,
    pub min: f64,
}

/// One row of a translational-gradient analysis.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SplitRow {
    pub x: f64,
    pub curving_rate: f64,
    pub std: f64,
    pub positive_curving_rate: f64,
    pub positive_std: f64,
    pub negative_curving_rate: f64,
    pub negative_std: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum AnalysisReport {
    ErrorBars(Vec<ErrorBarRow>),
    Split(Vec<SplitRow>),
}

impl AnalysisReport {
    pub fn len(&self) -> usize {
        match self {
            AnalysisReport::ErrorBars(rows) => rows.len(),
            AnalysisReport::Split(rows) => rows.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// x-axis values and curving rates of one trial, after draining.
#[derive(Debug, Clone, PartialEq)]
pub struct KlinotaxisSample {
    pub x: Vec<f64>,
    pub curving_rate: Vec<f64>,
}

/// Runs random-heading trials of a gene and bins their curving rates.
pub struct KlinotaxisAnalyzer {
    constants: SimulationConstants,
    settings: AnalysisSettings,
    seed: u64,
}

impl KlinotaxisAnalyzer {
    pub fn new(constants: SimulationConstants, settings: AnalysisSettings, seed: u64) -> Result<Self> {
        constants
            .validate()
            .map_err(|e| SimError::InvalidConstants(e.to_string()))?;
        settings.validate()?;
        Ok(Self { constants, settings, seed })
    }

    pub fn settings(&self) -> &AnalysisSettings {
        &self.settings
    }

    fn bins(&self, kind: AnalysisKind) -> Vec<(f64, f64)> {
        match kind {
            AnalysisKind::Bearing => bearing_bins(self.settings.bin_range),
            AnalysisKind::NormalGradient | AnalysisKind::TranslationalGradient => {
                gradient_bins(self.settings.bin_number, self.settings.gradient_max)
            }
        }
    }

    /// Simulates trial `index` and extracts both axes.
    pub fn sample(&self, gene: &Gene, kind: AnalysisKind, index: usize) -> Result<KlinotaxisSample> {
        let settings = &self.settings;
        let mut sim = CpuSimulation::new(self.constants.clone(), self.seed.wrapping_add(index as u64))?;
        let output = sim.run(gene, &RunOptions::new(InitialHeading::Random, settings.mode));
        let positions = &output.trajectory.positions;

        let window = settings.periodic_number * output.steps.period;
        let field = ConcentrationField::new(settings.mode, &self.constants);
        let mut x = match kind {
            AnalysisKind::Bearing => bearing(positions, field.peak, window),
            AnalysisKind::NormalGradient => normal_gradient(positions, &field, window, settings.delta),
            AnalysisKind::TranslationalGradient => {
                translational_gradient(positions, &field, window, settings.delta)
            }
        };
        let mut curving = curving_rate(positions, window);

        let drain = settings.drain_periods * output.steps.period;
        x.drain(..drain.min(x.len()));
        curving.drain(..drain.min(curving.len()));
        trace!("Analysis trial {} kept {} windows", index, x.len());

        Ok(KlinotaxisSample { x, curving_rate: curving })
    }

    /// Bins `analysis_loop` trials and aggregates every bin across them.
    pub fn analyze(&self, gene: &Gene, kind: AnalysisKind) -> Result<AnalysisReport> {
        let loops = self.settings.analysis_loop;
        let bins = self.bins(kind);
        let steps = StepCounts::new(&NeuralParameters::decode(gene), &self.constants);
        debug!(
            "Analysis window {} steps, drain {} steps, {} bins",
            self.settings.periodic_number * steps.period,
            self.settings.drain_periods * steps.period,
            bins.len()
        );

        let pool = build_pool(loops)?;
        let per_trial: Vec<Vec<[f64; 3]>> = pool.install(|| {
            (0..loops)
                .into_par_iter()
                .map(|i| {
                    let sample = self.sample(gene, kind, i)?;
                    Ok(binned_split_means(&sample.x, &sample.curving_rate, &bins))
                })
                .collect::<Result<Vec<_>>>()
        })?;

        let column = |bin: usize, part: usize| per_trial.iter().map(move |row| row[bin][part]);
        let report = match kind {
            AnalysisKind::Bearing | AnalysisKind::NormalGradient => AnalysisReport::ErrorBars(
                bins.iter()
                    .enumerate()
                    .map(|(b, &(low, _))| {
                        let stats = BinStats::from_values(column(b, 0));
                        ErrorBarRow { x: low, curving_rate: stats.mean, std: stats.std, max: stats.max, min: stats.min }
                    })
                    .collect(),
            ),
            AnalysisKind::TranslationalGradient => AnalysisReport::Split(
                bins.iter()
                    .enumerate()
                    .map(|(b, &(low, _))| {
                        let all = BinStats::from_values(column(b, 0));
                        let positive = BinStats::from_values(column(b, 1));
                        let negative = BinStats::from_values(column(b, 2));
                        SplitRow {
                            x: low,
                            curving_rate: all.mean,
                            std: all.std,
                            positive_curving_rate: positive.mean,
                            positive_std: positive.std,
                            negative_curving_rate: negative.mean,
                            negative_std: negative.std,
                        }
                    })
                    .collect(),
            ),
        };
        info!("{:?} analysis finished: {} trials, {} bins", kind, loops, report.len());
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::TAU;

    fn line(direction: Vec2, count: usize) -> Vec<Vec2> {
        (0..count).map(|k| direction * (k as f64 * 0.01)).collect()
    }

    #[test]
    fn bearing_toward_the_peak_is_zero() {
        let peak = Vec2::new(4.5, 0.0);
        let b = bearing(&line(Vec2::new(1.0, 0.0), 10), peak, 2);
        assert_eq!(b.len(), 6);
        assert!(b.iter().all(|v| v.abs() < 1e-9));
    }

    #[test]
    fn bearing_is_negative_counter_clockwise_of_the_peak() {
        let peak = Vec2::new(4.5, 0.0);
        let up = bearing(&line(Vec2::new(0.0, 1.0), 5), peak, 1);
        assert!(up.iter().all(|v| (v + 90.0).abs() < 1e-9));
        let down = bearing(&line(Vec2::new(0.0, -1.0), 5), peak, 1);
        assert!(down.iter().all(|v| (v - 90.0).abs() < 1e-9));
    }

    #[test]
    fn straight_paths_do_not_curve() {
        let rates = curving_rate(&line(Vec2::new(0.6, 0.8), 20), 3);
        assert_eq!(rates.len(), 14);
        assert!(rates.iter().all(|v| v.abs() < 1e-3));
    }

    #[test]
    fn counter_clockwise_circles_curve_positive() {
        let circle: Vec<Vec2> = (0..100)
            .map(|k| {
                let a = k as f64 / 100.0 * TAU;
                Vec2::new(a.cos(), a.sin())
            })
            .collect();
        let rates = curving_rate(&circle, 5);
        assert!(rates.iter().all(|&v| v > 0.0));
        let clockwise: Vec<Vec2> = circle.iter().map(|p| Vec2::new(p.x, -p.y)).collect();
        assert!(curving_rate(&clockwise, 5).iter().all(|&v| v < 0.0));
    }

    #[test]
    fn gradients_follow_the_direction_of_travel() {
        let constants = SimulationConstants::default();
        let field = ConcentrationField::new(ConcentrationMode::Linear, &constants);
        let path = line(Vec2::new(1.0, 0.0), 10);
        // alpha * |r - peak| decreases toward the peak, so moving toward it
        // with alpha < 0 climbs at rate -alpha.
        let along = translational_gradient(&path, &field, 2, 0.01);
        assert!(along.iter().all(|v| (v + constants.alpha).abs() < 1e-9));
        let across = normal_gradient(&path, &field, 2, 0.01);
        assert!(across.iter().all(|v| v.abs() < 1e-4));
    }

    #[test]
    fn bins_cover_the_axis() {
        let bins = bearing_bins(30);
        assert_eq!(bins.len(), 12);
        assert_eq!(bins[0], (-180.0, -150.0));
        assert_eq!(bins[11], (150.0, 180.0));
        let bins = gradient_bins(4, 0.02);
        assert_eq!(bins.len(), 4);
        assert!((bins[0].0 + 0.02).abs() < 1e-15);
        assert!((bins[3].1 - 0.02).abs() < 1e-15);
    }

    #[test]
    fn binning_is_strict_and_empty_bins_are_nan() {
        let bins = [(0.0, 1.0), (1.0, 2.0), (2.0, 3.0)];
        let x = [0.5, 1.0, 1.5, 1.7];
        let y = [10.0, 99.0, 2.0, 4.0];
        let means = binned_means(&x, &y, &bins);
        assert_eq!(means[0], 10.0);
        assert_eq!(means[1], 3.0);
        assert!(means[2].is_nan());

        let split = binned_split_means(&[0.5, 0.6, 0.7], &[2.0, -4.0, 4.0], &[(0.0, 1.0)]);
        assert!((split[0][0] - 2.0 / 3.0).abs() < 1e-12);
        assert_eq!(split[0][1], 3.0);
        assert_eq!(split[0][2], -4.0);
    }

    #[test]
    fn bin_stats_ignore_nan() {
        let stats = BinStats::from_values([1.0, f64::NAN, 3.0]);
        assert_eq!(stats.mean, 2.0);
        assert_eq!(stats.std, 1.0);
        assert_eq!(stats.max, 3.0);
        assert_eq!(stats.min, 1.0);
        assert!(BinStats::from_values([f64::NAN]).mean.is_nan());
    }

    #[test]
    fn settings_are_validated() {
        assert!(AnalysisSettings::default().validate().is_ok());
        let bad = AnalysisSettings { bin_range: 0, ..AnalysisSettings::default() };
        assert!(matches!(bad.validate(), Err(SimError::InvalidAnalysis(_))));
        let bad = AnalysisSettings { delta: 0.0, ..AnalysisSettings::default() };
        assert!(bad.validate().is_err());
    }

    #[test]
    fn sample_lengths_account_for_window_and_drain() {
        let constants = SimulationConstants { time: 30.0, ..SimulationConstants::default() };
        let settings = AnalysisSettings { analysis_loop: 2, ..AnalysisSettings::default() };
        let analyzer = KlinotaxisAnalyzer::new(constants, settings, 9).unwrap();
        let sample = analyzer.sample(&Gene::zeros(), AnalysisKind::Bearing, 0).unwrap();
        // 3000 samples, window 420, drain 420.
        assert_eq!(sample.x.len(), 3000 - 2 * 420 - 420);
        assert_eq!(sample.curving_rate.len(), sample.x.len());
    }
}
