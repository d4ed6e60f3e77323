use crate::concentration::{ConcentrationField, ConcentrationMode};
use crate::dynamics::NeuralDynamics;
use crate::error::{Result, SimError};
use crate::gene::{Gene, NeuralParameters, NEURON_COUNT, SMBDL};
use crate::motion::{AgentMotion, PirouetteSchedule};
use crate::sensory::SensoryMemory;
use crate::sim_params::StepCounts;
use crate::state::{neural_trace, AgentState};
use klinotaxis_common::{NeuralTrace, SimulationConstants, Trajectory, Vec2};
use log::{debug, trace, warn};
use rand::prelude::*;
use std::f64::consts::TAU;

/// How the starting heading `mu[0]` is chosen.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InitialHeading {
    /// Caller-supplied angle in radians.
    Fixed(f64),
    /// Uniform draw from [0, 2pi) using the simulator's RNG.
    Random,
}

/// Per-run choices that are not part of the constants profile.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RunOptions {
    pub heading: InitialHeading,
    pub mode: ConcentrationMode,
    /// Redraw the heading every `floor(1 / f / dt)` steps.
    pub pirouette: bool,
    /// Keep the full membrane-potential trace.
    pub record_potentials: bool,
    /// Round decoded parameters to this many decimal places before running.
    pub decimals: Option<u32>,
}

impl RunOptions {
    pub fn new(heading: InitialHeading, mode: ConcentrationMode) -> Self {
        RunOptions {
            heading,
            mode,
            pirouette: false,
            record_potentials: false,
            decimals: None,
        }
    }

    pub fn with_pirouettes(mut self) -> Self {
        self.pirouette = true;
        self
    }

    pub fn with_potentials(mut self) -> Self {
        self.record_potentials = true;
        self
    }

    pub fn with_decimals(mut self, decimals: Option<u32>) -> Self {
        self.decimals = decimals;
        self
    }
}

/// Everything a run produces.
#[derive(Debug, Clone)]
pub struct SimulationOutput {
    pub params: NeuralParameters,
    pub steps: StepCounts,
    pub trajectory: Trajectory,
    pub neural_trace: Option<NeuralTrace>,
}

/// Integrates gene -> network -> motion for one constants profile.
///
/// All randomness (motor-neuron initial potentials, random initial heading,
/// pirouette headings) comes from the simulator's own seeded RNG, drawn in
/// that order, so a run is reproducible from its seed.
pub struct CpuSimulation {
    constants: SimulationConstants,
    rng: StdRng,
    seed: u64,
}

pub type Simulator = CpuSimulation;

impl CpuSimulation {
    /// Creates a simulator whose RNG is seeded with `seed`.
    pub fn new(constants: SimulationConstants, seed: u64) -> Result<Self> {
        constants
            .validate()
            .map_err(|e| SimError::InvalidConstants(e.to_string()))?;
        if constants.dt > constants.tau / 10.0 {
            warn!(
                "dt ({}) is not small relative to tau ({}); Euler integration may diverge.",
                constants.dt, constants.tau
            );
        }
        if constants.peak_distance() == 0.0 {
            warn!("Concentration peak is at the start point; the chemotaxis index is undefined.");
        }
        Ok(Self {
            constants,
            rng: StdRng::seed_from_u64(seed),
            seed,
        })
    }

    pub fn constants(&self) -> &SimulationConstants {
        &self.constants
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Runs one trial and returns the path and, if requested, the potentials.
    pub fn run(&mut self, gene: &Gene, options: &RunOptions) -> SimulationOutput {
        let params = NeuralParameters::decode_rounded(gene, options.decimals);
        self.run_with_params(&params, options)
    }

    /// Shorthand for a fixed-heading run that only needs the path.
    pub fn run_trajectory(&mut self, gene: &Gene, heading: f64, mode: ConcentrationMode) -> Trajectory {
        self.run(gene, &RunOptions::new(InitialHeading::Fixed(heading), mode))
            .trajectory
    }

    /// Runs one trial with already-decoded parameters.
    pub fn run_with_params(&mut self, params: &NeuralParameters, options: &RunOptions) -> SimulationOutput {
        let constants = &self.constants;
        let steps = StepCounts::new(params, constants);
        debug!("Step counts: {:?}", steps);

        let field = ConcentrationField::new(options.mode, constants);
        let dynamics = NeuralDynamics::new(params, constants);
        let motion = AgentMotion::new(params, constants);
        let pirouettes = options.pirouette.then(|| PirouetteSchedule::new(steps.pirouette_interval));
        let mut sensor = SensoryMemory::new(&steps, params, constants.dt, field.at(Vec2::zero()));

        let mut initial_potentials = [0.0; NEURON_COUNT];
        for y in initial_potentials[SMBDL..].iter_mut() {
            *y = self.rng.random::<f64>();
        }
        let initial_heading = match options.heading {
            InitialHeading::Fixed(mu) => mu,
            InitialHeading::Random => self.rng.random_range(0.0..TAU),
        };
        trace!(
            "Initial heading {:.4} rad, motor potentials {:?}",
            initial_heading,
            &initial_potentials[SMBDL..]
        );

        let mut state = AgentState::new(
            initial_potentials,
            initial_heading,
            steps.total,
            options.record_potentials,
        );

        for k in 0..steps.total.saturating_sub(1) {
            let t = k as f64 * constants.dt;

            sensor.push(field.at(state.position));
            let sensory = sensor.response();

            state.potentials_out = dynamics.step(&state.potentials_in, sensory, t);

            let phi = motion.turning_rate(&state.potentials_in);
            let next_heading = match pirouettes {
                Some(schedule) if schedule.is_due(k) => self.rng.random_range(0.0..TAU),
                _ => motion.advance_heading(state.heading, phi),
            };
            let next_position = motion.advance_position(state.position, state.heading);

            state.advance(next_position, next_heading);
        }

        let (trajectory, potentials) = state.into_records(constants.dt);
        SimulationOutput {
            params: params.clone(),
            steps,
            trajectory,
            neural_trace: potentials.map(neural_trace),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn short_constants() -> SimulationConstants {
        SimulationConstants { time: 20.0, ..SimulationConstants::default() }
    }

    #[test]
    fn invalid_constants_are_rejected() {
        let constants = SimulationConstants { dt: -0.01, ..SimulationConstants::default() };
        assert!(matches!(
            CpuSimulation::new(constants, 1),
            Err(SimError::InvalidConstants(_))
        ));
    }

    #[test]
    fn output_lengths_match_the_step_count() {
        let mut sim = CpuSimulation::new(short_constants(), 3).unwrap();
        let options = RunOptions::new(InitialHeading::Fixed(0.3), ConcentrationMode::Gaussian).with_potentials();
        let output = sim.run(&Gene::zeros(), &options);
        assert_eq!(output.steps.total, 2000);
        assert_eq!(output.trajectory.len(), 2000);
        assert_eq!(output.trajectory.time.len(), 2000);
        assert_eq!(output.trajectory.headings[0], 0.3);
        let trace = output.neural_trace.unwrap();
        assert_eq!(trace.potentials.len(), 2000);
        assert_eq!(trace.neuron_names[4], "SMBDL");
        // Interneurons start at rest, motor neurons in [0, 1).
        assert!(trace.potentials[0][..4].iter().all(|&y| y == 0.0));
        assert!(trace.potentials[0][4..].iter().all(|&y| (0.0..1.0).contains(&y)));
        let smbdl = trace.neuron(SMBDL);
        assert_eq!(smbdl.len(), 2000);
        assert_eq!(smbdl[0], trace.potentials[0][SMBDL]);
    }

    #[test]
    fn each_step_moves_exactly_v_dt() {
        let constants = short_constants();
        let mut sim = CpuSimulation::new(constants.clone(), 11).unwrap();
        let trajectory = sim.run_trajectory(&Gene::zeros(), 1.0, ConcentrationMode::Linear);
        for pair in trajectory.positions.windows(2) {
            let step = pair[0].distance(pair[1]);
            assert!((step - constants.velocity * constants.dt).abs() < 1e-12);
        }
    }

    #[test]
    fn pirouettes_redraw_headings_in_range() {
        let constants = SimulationConstants { frequency: 1.0, time: 10.0, ..SimulationConstants::default() };
        let mut sim = CpuSimulation::new(constants, 5).unwrap();
        let options = RunOptions::new(InitialHeading::Fixed(0.0), ConcentrationMode::Linear).with_pirouettes();
        let output = sim.run(&Gene::zeros(), &options);
        assert_eq!(output.steps.pirouette_interval, 100);
        // mu[k + 1] is redrawn for k = 99, 199, ...
        for k in (99..output.trajectory.len() - 1).step_by(100) {
            let mu = output.trajectory.headings[k + 1];
            assert!((0.0..TAU).contains(&mu), "heading {mu} at step {}", k + 1);
        }
    }

    #[test]
    fn pirouette_run_matches_plain_run_until_the_first_redraw() {
        let constants = SimulationConstants { frequency: 1.0, time: 10.0, ..SimulationConstants::default() };
        let gene = Gene::new((0..22).map(|i| (i as f64 * 0.21).cos() * 0.8).collect()).unwrap();
        let plain = RunOptions::new(InitialHeading::Fixed(0.4), ConcentrationMode::Gaussian).with_potentials();
        let pirouette = plain.with_pirouettes();

        let a = CpuSimulation::new(constants.clone(), 17).unwrap().run(&gene, &plain);
        let b = CpuSimulation::new(constants.clone(), 17).unwrap().run(&gene, &pirouette);
        let interval = b.steps.pirouette_interval;
        assert_eq!(interval, 100);

        let (ta, tb) = (&a.trajectory, &b.trajectory);
        // Identical through mu[interval - 1]; r[interval] still follows mu[interval - 1].
        assert_eq!(ta.headings[..interval], tb.headings[..interval]);
        assert_eq!(ta.positions[..=interval], tb.positions[..=interval]);
        assert_ne!(ta.headings[interval], tb.headings[interval]);
        assert_ne!(ta.positions[interval + 1], tb.positions[interval + 1]);

        // Between redraws the heading advances by phi * dt.
        let motion = AgentMotion::new(&b.params, &constants);
        let trace = b.neural_trace.unwrap();
        for k in (interval..2 * interval - 1).chain(2 * interval..2 * interval + 10) {
            let phi = motion.turning_rate(&trace.potentials[k]);
            assert_eq!(tb.headings[k + 1], motion.advance_heading(tb.headings[k], phi), "step {k}");
        }
        assert!((0.0..TAU).contains(&tb.headings[2 * interval]));
    }
}
