use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Profile used for ordinary trajectory and chemotaxis-index runs.
pub const STANDARD_PROFILE: &str = "setting";
/// Coarser profile used when trajectories are rendered as animations.
pub const ANIMATION_PROFILE: &str = "setting_animation";
/// Profile used when membrane potentials are recorded for plotting.
pub const NEURON_TRACE_PROFILE: &str = "setting_neuron_output";

/// Physical constants of one simulation profile, loaded from the settings TOML.
///
/// Units follow the worm assay: centimetres, seconds.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct SimulationConstants {
    /// Slope of the linear (radial) concentration profile.
    pub alpha: f64,
    /// Peak location, x (cm).
    pub x_peak: f64,
    /// Peak location, y (cm).
    pub y_peak: f64,
    /// Euler time step (s).
    pub dt: f64,
    /// Period of the oscillatory motor drive (s).
    #[serde(rename = "T")]
    pub period: f64,
    /// Mean pirouette frequency (Hz).
    #[serde(rename = "f")]
    pub frequency: f64,
    /// Forward speed (cm/s).
    #[serde(rename = "v")]
    pub velocity: f64,
    /// Total simulated time (s).
    pub time: f64,
    /// Membrane time constant (s).
    pub tau: f64,
    /// Amplitude of the Gaussian profiles.
    #[serde(default = "default_c_0")]
    pub c_0: f64,
    /// Width of the Gaussian profiles (cm).
    #[serde(default = "default_lambda")]
    pub lambda: f64,
}

fn default_c_0() -> f64 {
    1.0
}

fn default_lambda() -> f64 {
    1.61
}

impl SimulationConstants {
    /// Number of Euler steps in a run, `floor(time / dt)`.
    pub fn total_steps(&self) -> usize {
        (self.time / self.dt).floor() as usize
    }

    /// Distance from the origin (the start point) to the peak.
    pub fn peak_distance(&self) -> f64 {
        (self.x_peak.powi(2) + self.y_peak.powi(2)).sqrt()
    }

    /// Checks that the profile describes a runnable simulation.
    pub fn validate(&self) -> Result<()> {
        let fields = [
            ("alpha", self.alpha),
            ("x_peak", self.x_peak),
            ("y_peak", self.y_peak),
            ("dt", self.dt),
            ("T", self.period),
            ("f", self.frequency),
            ("v", self.velocity),
            ("time", self.time),
            ("tau", self.tau),
            ("c_0", self.c_0),
            ("lambda", self.lambda),
        ];
        for (name, value) in fields {
            if !value.is_finite() {
                anyhow::bail!("{} must be finite (got {}).", name, value);
            }
        }
        for (name, value) in [
            ("dt", self.dt),
            ("T", self.period),
            ("f", self.frequency),
            ("time", self.time),
            ("tau", self.tau),
        ] {
            if value <= 0.0 {
                anyhow::bail!("{} must be positive (got {}).", name, value);
            }
        }
        if self.lambda == 0.0 {
            anyhow::bail!("lambda must be non-zero.");
        }
        if self.time < self.dt {
            anyhow::bail!("time ({}) must cover at least one step of dt ({}).", self.time, self.dt);
        }
        Ok(())
    }
}

impl Default for SimulationConstants {
    fn default() -> Self {
        SimulationConstants {
            alpha: -0.01,
            x_peak: 4.5,
            y_peak: 0.0,
            dt: 0.01,
            period: 4.2,
            frequency: 0.033,
            velocity: 0.022,
            time: 300.0,
            tau: 0.1,
            c_0: default_c_0(),
            lambda: default_lambda(),
        }
    }
}

/// All named profiles of a settings file, keyed by table name.
#[derive(Deserialize, Serialize, Debug, Clone, Default)]
#[serde(transparent)]
pub struct SettingsFile {
    pub profiles: BTreeMap<String, SimulationConstants>,
}

impl SettingsFile {
    /// Loads every profile from a TOML file, one table per profile.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path_ref = path.as_ref();

        let settings_str = std::fs::read_to_string(path_ref)
            .map_err(|e| anyhow::anyhow!("Failed to read settings file '{}': {}", path_ref.display(), e))?;
        let settings = Self::from_toml_str(&settings_str)
            .map_err(|e| anyhow::anyhow!("Invalid settings in '{}': {}", path_ref.display(), e))?;
        Ok(settings)
    }

    /// Parses and validates settings from TOML text.
    pub fn from_toml_str(settings_str: &str) -> Result<Self> {
        let settings: SettingsFile = toml::from_str(settings_str)
            .map_err(|e| anyhow::anyhow!("Failed to parse TOML: {}", e))?;

        if settings.profiles.is_empty() {
            anyhow::bail!("settings contain no profiles.");
        }
        for (name, constants) in &settings.profiles {
            constants
                .validate()
                .map_err(|e| anyhow::anyhow!("profile [{}]: {}", name, e))?;
        }
        Ok(settings)
    }

    /// Fetches a profile by name.
    pub fn profile(&self, name: &str) -> Result<&SimulationConstants> {
        self.profiles.get(name).ok_or_else(|| {
            let known: Vec<&str> = self.profiles.keys().map(String::as_str).collect();
            anyhow::anyhow!("Unknown settings profile '{}' (available: {}).", name, known.join(", "))
        })
    }

    pub fn profile_names(&self) -> impl Iterator<Item = &str> {
        self.profiles.keys().map(String::as_str)
    }
}
