use klinotaxis_common::{
    load_gene_records, save_gene_records, select_record, GeneRecord, SettingsFile,
    SimulationConstants, Vec2, STANDARD_PROFILE,
};
use klinotaxis_engine::output::{load_run, save_run, OutputFormat, RunRecord};
use klinotaxis_engine::{
    chemotaxis_index, AnalysisKind, AnalysisReport, AnalysisSettings, ChemotaxisEvaluator,
    ConcentrationMode, CpuSimulation, Gene, InitialHeading, KlinotaxisAnalyzer, RunOptions,
    SimError, GENE_LENGTH,
};

fn short_constants() -> SimulationConstants {
    SimulationConstants { time: 20.0, ..SimulationConstants::default() }
}

fn sample_gene() -> Gene {
    let values: Vec<f64> = (0..GENE_LENGTH).map(|i| ((i as f64) * 0.37).sin()).collect();
    Gene::new(values).unwrap()
}

fn temp_path(name: &str) -> std::path::PathBuf {
    std::env::temp_dir().join(format!("klinotaxis_{}_{}", std::process::id(), name))
}

#[test]
fn same_seed_reproduces_the_trajectory() {
    let options = RunOptions::new(InitialHeading::Random, ConcentrationMode::Gaussian).with_pirouettes();
    let gene = sample_gene();

    let first = CpuSimulation::new(short_constants(), 42).unwrap().run(&gene, &options);
    let second = CpuSimulation::new(short_constants(), 42).unwrap().run(&gene, &options);
    assert_eq!(first.trajectory, second.trajectory);

    let other = CpuSimulation::new(short_constants(), 43).unwrap().run(&gene, &options);
    assert_ne!(first.trajectory.positions, other.trajectory.positions);
}

#[test]
fn zero_gene_trajectory_starts_at_origin_with_constant_speed() {
    let constants = short_constants();
    let mut sim = CpuSimulation::new(constants.clone(), 1).unwrap();
    let trajectory = sim.run_trajectory(&Gene::zeros(), 0.7, ConcentrationMode::TwoGaussian);

    assert_eq!(trajectory.len(), constants.total_steps());
    assert_eq!(trajectory.positions[0], Vec2::zero());
    assert_eq!(trajectory.headings[0], 0.7);
    let step = constants.velocity * constants.dt;
    for pair in trajectory.positions.windows(2) {
        assert!((pair[0].distance(pair[1]) - step).abs() < 1e-12);
    }
    let ci = chemotaxis_index(&trajectory, &constants);
    assert!((0.0..=1.0).contains(&ci));
}

#[test]
fn zero_gene_path_ignores_the_concentration_field() {
    // With every sensory weight at zero only the oscillator steers.
    let run = |mode| CpuSimulation::new(short_constants(), 7).unwrap().run_trajectory(&Gene::zeros(), 0.3, mode);
    let linear = run(ConcentrationMode::Linear);
    let gaussian = run(ConcentrationMode::Gaussian);
    let two_gaussian = run(ConcentrationMode::TwoGaussian);
    assert_eq!(linear, gaussian);
    assert_eq!(gaussian, two_gaussian);
}

#[test]
fn stationary_worm_scores_zero_with_no_spread() {
    let constants = SimulationConstants { velocity: 0.0, ..short_constants() };
    let evaluator = ChemotaxisEvaluator::new(constants, Some(5)).unwrap();
    let summary = evaluator.evaluate(&sample_gene(), ConcentrationMode::Linear, 4).unwrap();
    assert_eq!(summary.trials, 4);
    assert!(summary.mean.abs() < 1e-9);
    assert!(summary.std.abs() < 1e-9);
}

#[test]
fn evaluator_is_deterministic_for_a_fixed_base_seed() {
    let gene = sample_gene();
    let a = ChemotaxisEvaluator::new(short_constants(), Some(11)).unwrap();
    let b = ChemotaxisEvaluator::new(short_constants(), Some(11)).unwrap();

    let samples_a = a.samples(&gene, ConcentrationMode::Gaussian, 6).unwrap();
    let samples_b = b.samples(&gene, ConcentrationMode::Gaussian, 6).unwrap();
    assert_eq!(samples_a, samples_b);
    assert_eq!(samples_a.len(), 6);
    assert!(samples_a.iter().all(|ci| (0.0..=1.0).contains(ci)));

    // Trial i is independent of the batch it runs in.
    assert_eq!(a.trial(&gene, ConcentrationMode::Gaussian, 3).unwrap(), samples_a[3]);

    let summary = a.evaluate(&gene, ConcentrationMode::Gaussian, 6).unwrap();
    let mean = samples_a.iter().sum::<f64>() / 6.0;
    assert!((summary.mean - mean).abs() < 1e-12);
}

#[test]
fn zero_trials_give_nan_summary() {
    let evaluator = ChemotaxisEvaluator::new(short_constants(), Some(0)).unwrap();
    let summary = evaluator.evaluate(&Gene::zeros(), ConcentrationMode::Gaussian, 0).unwrap();
    assert_eq!(summary.trials, 0);
    assert!(summary.mean.is_nan());
    assert!(summary.std.is_nan());
}

#[test]
fn invalid_inputs_are_reported() {
    assert!(matches!(
        Gene::new(vec![0.0; 3]),
        Err(SimError::InvalidGeneLength { expected: 22, actual: 3 })
    ));
    assert!(matches!(
        ConcentrationMode::try_from(3i64),
        Err(SimError::UnsupportedConcentrationMode(3))
    ));
    let broken = SimulationConstants { time: 0.0, ..SimulationConstants::default() };
    assert!(matches!(
        ChemotaxisEvaluator::new(broken, None),
        Err(SimError::InvalidConstants(_))
    ));
}

#[test]
fn rounding_to_many_decimals_barely_changes_the_run() {
    let gene = sample_gene();
    let exact = RunOptions::new(InitialHeading::Fixed(0.0), ConcentrationMode::Gaussian);
    let rounded = exact.with_decimals(Some(12));

    let a = CpuSimulation::new(short_constants(), 8).unwrap().run(&gene, &exact);
    let b = CpuSimulation::new(short_constants(), 8).unwrap().run(&gene, &rounded);
    let (end_a, end_b) = (a.trajectory.final_position().unwrap(), b.trajectory.final_position().unwrap());
    assert!(end_a.distance(end_b) < 1e-4);
}

#[test]
fn stored_genes_drive_a_run() {
    let path = temp_path("genes.json");
    let records = vec![
        GeneRecord { value: 0.1, gene: vec![0.0; GENE_LENGTH] },
        GeneRecord { value: 0.8, gene: sample_gene().into() },
    ];
    save_gene_records(&path, &records).unwrap();
    let loaded = load_gene_records(&path).unwrap();
    std::fs::remove_file(&path).ok();

    let record = select_record(&loaded, 1).unwrap();
    let gene = Gene::from_slice(&record.gene).unwrap();
    assert_eq!(gene, sample_gene());
    assert_eq!(
        klinotaxis_engine::NeuralParameters::decode(&gene),
        klinotaxis_engine::NeuralParameters::decode(&sample_gene())
    );
    assert!(select_record(&loaded, 2).is_err());
}

#[test]
fn bundled_settings_file_loads() {
    let path = concat!(env!("CARGO_MANIFEST_DIR"), "/simulation_setting.toml");
    let settings = SettingsFile::load(path).unwrap();
    let constants = settings.profile(STANDARD_PROFILE).unwrap();
    assert_eq!(constants.total_steps(), 30_000);
    assert_eq!(settings.profile_names().count(), 3);
}

#[test]
fn saved_runs_read_back_in_every_structured_format() {
    let mut sim = CpuSimulation::new(short_constants(), 21).unwrap();
    let options = RunOptions::new(InitialHeading::Fixed(1.0), ConcentrationMode::Linear).with_potentials();
    let output = sim.run(&sample_gene(), &options);
    let record = RunRecord {
        seed: sim.seed(),
        mode: ConcentrationMode::Linear.index(),
        params: output.params,
        trajectory: output.trajectory,
        neural_trace: output.neural_trace,
    };

    for format in [OutputFormat::Json, OutputFormat::Bincode, OutputFormat::MessagePack] {
        let base = temp_path(&format!("run_{}", format.extension())).display().to_string();
        let path = save_run(&base, format, &record).unwrap();
        let loaded = load_run(&path, format).unwrap();
        std::fs::remove_file(&path).ok();
        assert_eq!(loaded, record, "{format:?} round trip");
    }

    let base = temp_path("run_csv").display().to_string();
    let path = save_run(&base, OutputFormat::Csv, &record).unwrap();
    let text = std::fs::read_to_string(&path).unwrap();
    std::fs::remove_file(&path).ok();
    assert_eq!(text.lines().count(), 2001);
    assert!(load_run(&path, OutputFormat::Csv).is_err());
}

#[test]
fn analysis_reports_one_row_per_bin() {
    let constants = SimulationConstants { time: 30.0, ..SimulationConstants::default() };
    let settings = AnalysisSettings { analysis_loop: 2, ..AnalysisSettings::default() };
    let analyzer = KlinotaxisAnalyzer::new(constants, settings, 3).unwrap();
    let gene = sample_gene();

    match analyzer.analyze(&gene, AnalysisKind::Bearing).unwrap() {
        AnalysisReport::ErrorBars(rows) => {
            assert_eq!(rows.len(), 12);
            assert_eq!(rows[0].x, -180.0);
            for row in &rows {
                if !row.curving_rate.is_nan() {
                    assert!(row.min - 1e-9 <= row.curving_rate && row.curving_rate <= row.max + 1e-9);
                    assert!(row.std >= 0.0);
                }
            }
        }
        other => panic!("unexpected report {other:?}"),
    }

    match analyzer.analyze(&gene, AnalysisKind::TranslationalGradient).unwrap() {
        AnalysisReport::Split(rows) => assert_eq!(rows.len(), 20),
        other => panic!("unexpected report {other:?}"),
    }

    let again = analyzer.analyze(&gene, AnalysisKind::NormalGradient).unwrap();
    assert_eq!(again.len(), 20);
}
