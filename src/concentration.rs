use crate::error::{Result, SimError};
use klinotaxis_common::{SimulationConstants, Vec2};
use serde::{Deserialize, Serialize};

/// Shape of the chemical landscape, fixed for the duration of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConcentrationMode {
    /// `alpha * |r - peak|`
    Linear,
    /// Single Gaussian hill centred on the peak.
    Gaussian,
    /// Gaussian hill at the peak minus one at the peak's reflection through the origin.
    TwoGaussian,
}

impl ConcentrationMode {
    pub fn index(self) -> i64 {
        match self {
            ConcentrationMode::Linear => 0,
            ConcentrationMode::Gaussian => 1,
            ConcentrationMode::TwoGaussian => 2,
        }
    }
}

impl TryFrom<i64> for ConcentrationMode {
    type Error = SimError;

    fn try_from(mode: i64) -> Result<Self> {
        match mode {
            0 => Ok(ConcentrationMode::Linear),
            1 => Ok(ConcentrationMode::Gaussian),
            2 => Ok(ConcentrationMode::TwoGaussian),
            other => Err(SimError::UnsupportedConcentrationMode(other)),
        }
    }
}

pub fn linear_concentration(alpha: f64, position: Vec2, peak: Vec2) -> f64 {
    alpha * position.distance(peak)
}

pub fn gaussian_concentration(c_0: f64, lambda: f64, position: Vec2, peak: Vec2) -> f64 {
    c_0 * (-position.distance_squared(peak) / (2.0 * lambda.powi(2))).exp()
}

pub fn two_gaussian_concentration(c_0: f64, lambda: f64, position: Vec2, peak: Vec2) -> f64 {
    gaussian_concentration(c_0, lambda, position, peak)
        - gaussian_concentration(c_0, lambda, position, -peak)
}

/// A concentration profile bound to the constants of one run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConcentrationField {
    pub mode: ConcentrationMode,
    pub alpha: f64,
    pub c_0: f64,
    pub lambda: f64,
    pub peak: Vec2,
}

impl ConcentrationField {
    pub fn new(mode: ConcentrationMode, constants: &SimulationConstants) -> Self {
        ConcentrationField {
            mode,
            alpha: constants.alpha,
            c_0: constants.c_0,
            lambda: constants.lambda,
            peak: Vec2::new(constants.x_peak, constants.y_peak),
        }
    }

    /// Concentration at `position`. Defined everywhere in the plane.
    pub fn at(&self, position: Vec2) -> f64 {
        match self.mode {
            ConcentrationMode::Linear => linear_concentration(self.alpha, position, self.peak),
            ConcentrationMode::Gaussian => {
                gaussian_concentration(self.c_0, self.lambda, position, self.peak)
            }
            ConcentrationMode::TwoGaussian => {
                two_gaussian_concentration(self.c_0, self.lambda, position, self.peak)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn constants() -> SimulationConstants {
        SimulationConstants {
            alpha: -0.01,
            x_peak: 4.5,
            y_peak: 1.0,
            c_0: 1.0,
            lambda: 1.61,
            ..SimulationConstants::default()
        }
    }

    #[test]
    fn unknown_modes_are_rejected() {
        assert_eq!(ConcentrationMode::try_from(2i64).unwrap(), ConcentrationMode::TwoGaussian);
        assert!(matches!(
            ConcentrationMode::try_from(3i64),
            Err(SimError::UnsupportedConcentrationMode(3))
        ));
        assert!(ConcentrationMode::try_from(-1i64).is_err());
        for mode in 0..3 {
            assert_eq!(ConcentrationMode::try_from(mode).unwrap().index(), mode);
        }
    }

    #[test]
    fn linear_profile_grows_with_distance() {
        let field = ConcentrationField::new(ConcentrationMode::Linear, &constants());
        assert_eq!(field.at(field.peak), 0.0);
        let origin = field.at(Vec2::zero());
        assert!((origin - (-0.01 * field.peak.length())).abs() < 1e-15);
    }

    #[test]
    fn gaussian_peaks_at_c0() {
        let field = ConcentrationField::new(ConcentrationMode::Gaussian, &constants());
        assert_eq!(field.at(field.peak), 1.0);
        assert!(field.at(Vec2::new(0.0, 0.0)) < 1.0);
        assert!(field.at(Vec2::new(1e6, -1e6)) >= 0.0);
    }

    #[test]
    fn two_gaussian_is_odd_under_point_reflection() {
        let field = ConcentrationField::new(ConcentrationMode::TwoGaussian, &constants());
        for &(x, y) in &[(0.0, 0.0), (1.3, -0.4), (4.5, 1.0), (-7.0, 2.5), (0.01, 30.0)] {
            let p = Vec2::new(x, y);
            assert_eq!(field.at(p), -field.at(-p));
        }
        assert_eq!(field.at(Vec2::zero()), 0.0);
        assert!(field.at(field.peak) > 0.0);
    }
}
