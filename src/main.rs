use anyhow::{bail, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use klinotaxis_common::{
    load_gene_records, select_record, SettingsFile, SimulationConstants, NEURON_TRACE_PROFILE,
    STANDARD_PROFILE,
};
use klinotaxis_engine::output::{save_run, write_analysis_csv, OutputFormat, RunRecord};
use klinotaxis_engine::{
    AnalysisKind, AnalysisSettings, ChemotaxisEvaluator, ConcentrationMode, CpuSimulation, Gene,
    InitialHeading, KlinotaxisAnalyzer, NeuralParameters, RunOptions,
};
use log::{debug, info, warn};
use rand::Rng;
use std::path::PathBuf;
use std::time::Instant;

#[derive(Parser, Debug)]
#[command(author, version, about = "Klinotaxis simulator for the AIY/AIZ/SMB head network", long_about = None)]
struct Cli {
    /// Settings TOML holding the named constant profiles
    #[arg(long, global = true, default_value = "simulation_setting.toml")]
    settings: PathBuf,

    /// Profile to use (defaults depend on the subcommand)
    #[arg(long, global = true)]
    profile: Option<String>,

    /// JSON file of stored genes
    #[arg(long, global = true)]
    genes: Option<PathBuf>,

    /// Record to use from --genes
    #[arg(long, global = true, default_value_t = 0)]
    index: usize,

    /// Inline gene, 22 comma-separated values in [-1, 1]
    #[arg(long, global = true, value_delimiter = ',', allow_hyphen_values = true)]
    gene: Option<Vec<f64>>,

    /// Base RNG seed; drawn at random when omitted
    #[arg(long, global = true)]
    seed: Option<u64>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Simulate one trajectory and save it
    Run(RunArgs),
    /// Like `run`, but also records the membrane potentials
    Trace(RunArgs),
    /// Estimate the chemotaxis index over random-heading trials
    Ci {
        #[arg(long, default_value_t = 1)]
        mode: i64,
        #[arg(long, default_value_t = 100)]
        trials: usize,
    },
    /// Print the decoded network parameters as JSON
    Params {
        #[arg(long)]
        decimals: Option<u32>,
    },
    /// Bin curving rate against bearing or concentration gradient
    Analyze(AnalyzeArgs),
}

#[derive(Args, Debug)]
struct RunArgs {
    /// Initial heading in radians
    #[arg(long, conflicts_with = "random_heading")]
    heading: Option<f64>,
    /// Draw the initial heading uniformly from [0, 2pi)
    #[arg(long)]
    random_heading: bool,
    /// Enable random reorientation every 1/f seconds
    #[arg(long)]
    pirouette: bool,
    /// Concentration profile: 0 linear, 1 Gaussian, 2 two-Gaussian
    #[arg(long, default_value_t = 1)]
    mode: i64,
    /// Round decoded parameters to this many decimals
    #[arg(long)]
    decimals: Option<u32>,
    /// json, bincode, messagepack or csv
    #[arg(long, default_value = "json")]
    format: String,
    /// Output file name without extension
    #[arg(long, default_value = "klinotaxis")]
    output: String,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum KindArg {
    Bearing,
    Normal,
    Translational,
}

impl From<KindArg> for AnalysisKind {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::Bearing => AnalysisKind::Bearing,
            KindArg::Normal => AnalysisKind::NormalGradient,
            KindArg::Translational => AnalysisKind::TranslationalGradient,
        }
    }
}

#[derive(Args, Debug)]
struct AnalyzeArgs {
    #[arg(long, value_enum, default_value_t = KindArg::Bearing)]
    kind: KindArg,
    #[arg(long, default_value_t = 1)]
    mode: i64,
    /// Trials aggregated per bin
    #[arg(long, default_value_t = 100)]
    loops: usize,
    /// Window length in oscillation periods
    #[arg(long, default_value_t = 1)]
    periodic_number: usize,
    /// Leading periods to discard
    #[arg(long, default_value_t = 1)]
    drain_periods: usize,
    /// Bearing bin width (degrees)
    #[arg(long, default_value_t = 30)]
    bin_range: usize,
    /// Finite-difference step for gradients (cm)
    #[arg(long, default_value_t = 0.01)]
    delta: f64,
    /// Number of gradient bins
    #[arg(long, default_value_t = 20)]
    bin_number: usize,
    /// Gradient axis limit
    #[arg(long, default_value_t = 0.02)]
    gradient_max: f64,
    /// Output CSV path
    #[arg(long, default_value = "klinotaxis_analysis.csv")]
    output: PathBuf,
}

fn load_constants(cli: &Cli, default_profile: &str) -> Result<SimulationConstants> {
    let settings = SettingsFile::load(&cli.settings)?;
    let name = cli.profile.as_deref().unwrap_or(default_profile);
    let constants = settings.profile(name)?.clone();
    info!("Loaded profile '{}' from {}", name, cli.settings.display());
    debug!("Simulation constants: {:#?}", constants);
    Ok(constants)
}

fn load_gene(cli: &Cli) -> Result<Gene> {
    if let Some(values) = &cli.gene {
        return Ok(Gene::from_slice(values)?);
    }
    let Some(path) = &cli.genes else {
        bail!("No gene given: pass --gene v1,v2,... or --genes <file> [--index i]");
    };
    let records = load_gene_records(path)?;
    let record = select_record(&records, cli.index)?;
    info!(
        "Using gene {} of {} from {} (stored value {:.4})",
        cli.index,
        records.len(),
        path.display(),
        record.value
    );
    Ok(Gene::from_slice(&record.gene)?)
}

fn resolve_seed(seed: Option<u64>) -> u64 {
    seed.unwrap_or_else(|| {
        let drawn = rand::rng().random::<u64>();
        info!("No seed given, using {}", drawn);
        drawn
    })
}

fn simulate(cli: &Cli, args: &RunArgs, record_potentials: bool) -> Result<()> {
    let default_profile = if record_potentials { NEURON_TRACE_PROFILE } else { STANDARD_PROFILE };
    let constants = load_constants(cli, default_profile)?;
    let gene = load_gene(cli)?;
    let mode = ConcentrationMode::try_from(args.mode)?;
    let seed = resolve_seed(cli.seed);

    let heading = match (args.heading, args.random_heading) {
        (Some(mu), _) => InitialHeading::Fixed(mu),
        (None, true) => InitialHeading::Random,
        (None, false) => {
            warn!("No initial heading given, drawing one at random.");
            InitialHeading::Random
        }
    };
    let mut options = RunOptions::new(heading, mode).with_decimals(args.decimals);
    options.pirouette = args.pirouette;
    options.record_potentials = record_potentials;

    let mut sim = CpuSimulation::new(constants, seed)?;
    info!("Simulating {:.1} s with {:?} concentration...", sim.constants().time, mode);
    let start_time = Instant::now();
    let output = sim.run(&gene, &options);
    info!(
        "Simulation finished in {:.3} seconds ({} steps).",
        start_time.elapsed().as_secs_f64(),
        output.trajectory.len()
    );
    if let Some(end) = output.trajectory.final_position() {
        info!("Final position ({:.4}, {:.4})", end.x, end.y);
    }

    let record = RunRecord {
        seed,
        mode: mode.index(),
        params: output.params,
        trajectory: output.trajectory,
        neural_trace: output.neural_trace,
    };
    save_run(&args.output, OutputFormat::from_name(&args.format), &record)?;
    Ok(())
}

fn main() -> Result<()> {
    // Initialize the logger
    env_logger::init();

    let cli = Cli::parse();
    match &cli.command {
        Command::Run(args) => simulate(&cli, args, false)?,
        Command::Trace(args) => simulate(&cli, args, true)?,
        Command::Ci { mode, trials } => {
            let constants = load_constants(&cli, STANDARD_PROFILE)?;
            let gene = load_gene(&cli)?;
            let mode = ConcentrationMode::try_from(*mode)?;
            let evaluator = ChemotaxisEvaluator::new(constants, cli.seed)?;
            info!("Running {} trials with base seed {}...", trials, evaluator.seed());
            let start_time = Instant::now();
            let summary = evaluator.evaluate(&gene, mode, *trials)?;
            info!("Evaluation finished in {:.3} seconds.", start_time.elapsed().as_secs_f64());
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
        Command::Params { decimals } => {
            let gene = load_gene(&cli)?;
            let params = NeuralParameters::decode_rounded(&gene, *decimals);
            println!("{}", serde_json::to_string_pretty(&params)?);
        }
        Command::Analyze(args) => {
            let constants = load_constants(&cli, STANDARD_PROFILE)?;
            let gene = load_gene(&cli)?;
            let settings = AnalysisSettings {
                mode: ConcentrationMode::try_from(args.mode)?,
                analysis_loop: args.loops,
                periodic_number: args.periodic_number,
                drain_periods: args.drain_periods,
                bin_range: args.bin_range,
                delta: args.delta,
                bin_number: args.bin_number,
                gradient_max: args.gradient_max,
            };
            let analyzer = KlinotaxisAnalyzer::new(constants, settings, resolve_seed(cli.seed))?;
            let start_time = Instant::now();
            let report = analyzer.analyze(&gene, args.kind.into())?;
            info!("Analysis finished in {:.3} seconds.", start_time.elapsed().as_secs_f64());
            write_analysis_csv(&args.output, &report)?;
        }
    }

    info!("Done.");
    Ok(())
}
