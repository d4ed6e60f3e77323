use crate::analysis::AnalysisReport;
use crate::gene::NeuralParameters;
use anyhow::{Context, Result};
use klinotaxis_common::{NeuralTrace, Trajectory};
use log::{error, info};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

/// Everything saved for one simulated trial.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunRecord {
    pub seed: u64,
    /// Concentration mode index (0 linear, 1 Gaussian, 2 two-Gaussian).
    pub mode: i64,
    pub params: NeuralParameters,
    pub trajectory: Trajectory,
    pub neural_trace: Option<NeuralTrace>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Json,
    Bincode,
    MessagePack,
    Csv,
}

impl OutputFormat {
    /// Parses a format name; anything unknown falls back to JSON.
    pub fn from_name(name: &str) -> Self {
        match name {
            "json" => OutputFormat::Json,
            "bincode" => OutputFormat::Bincode,
            "messagepack" => OutputFormat::MessagePack,
            "csv" => OutputFormat::Csv,
            other => {
                error!("Unknown output format: {}. Using JSON instead.", other);
                OutputFormat::Json
            }
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Json => "json",
            OutputFormat::Bincode => "bin",
            OutputFormat::MessagePack => "msgpack",
            OutputFormat::Csv => "csv",
        }
    }
}

/// Writes `record` to `<base>_trajectory.<ext>` and returns the path.
pub fn save_run(base: &str, format: OutputFormat, record: &RunRecord) -> Result<PathBuf> {
    let path = PathBuf::from(format!("{}_trajectory.{}", base, format.extension()));
    let file = File::create(&path)
        .with_context(|| format!("Failed to create output file '{}'", path.display()))?;

    match format {
        OutputFormat::Json => {
            let json_string = serde_json::to_string(record)
                .context("Failed to serialize run to JSON")?;
            let mut writer = BufWriter::new(file);
            writer.write_all(json_string.as_bytes())?;
            writer.flush()?;
            info!("Run saved to {} ({} KB)", path.display(), json_string.len() / 1024);
        }
        OutputFormat::Bincode => {
            bincode::serialize_into(BufWriter::new(file), record)
                .context("Failed to serialize run to bincode")?;
            info!("Run saved to {} (binary format)", path.display());
        }
        OutputFormat::MessagePack => {
            let mut writer = BufWriter::new(file);
            rmp_serde::encode::write(&mut writer, record)
                .context("Failed to serialize run to MessagePack")?;
            writer.flush()?;
            info!("Run saved to {} (MessagePack format)", path.display());
        }
        OutputFormat::Csv => {
            write_trajectory_csv(file, &record.trajectory, record.neural_trace.as_ref())?;
            info!("Run saved to {} (CSV)", path.display());
        }
    }
    Ok(path)
}

/// Reads back a run written with one of the structured formats.
pub fn load_run<P: AsRef<Path>>(path: P, format: OutputFormat) -> Result<RunRecord> {
    let path = path.as_ref();
    let reader = BufReader::new(
        File::open(path).with_context(|| format!("Failed to open run file '{}'", path.display()))?,
    );
    let record: RunRecord = match format {
        OutputFormat::Json => serde_json::from_reader(reader)?,
        OutputFormat::Bincode => bincode::deserialize_from(reader)?,
        OutputFormat::MessagePack => rmp_serde::from_read(reader)?,
        OutputFormat::Csv => anyhow::bail!("CSV output cannot be read back as a run record"),
    };
    Ok(record)
}

/// One row per step: `t, x, y, mu`, followed by the neuron potentials when a
/// trace is given.
pub fn write_trajectory_csv<W: Write>(
    sink: W,
    trajectory: &Trajectory,
    trace: Option<&NeuralTrace>,
) -> Result<()> {
    let mut writer = csv::Writer::from_writer(sink);

    let mut header = vec!["t".to_string(), "x".to_string(), "y".to_string(), "mu".to_string()];
    if let Some(trace) = trace {
        header.extend(trace.neuron_names.iter().cloned());
    }
    writer.write_record(&header)?;

    for k in 0..trajectory.len() {
        let position = trajectory.positions[k];
        let mut row = vec![
            format!("{:.4}", trajectory.time[k]),
            format!("{:.6}", position.x),
            format!("{:.6}", position.y),
            format!("{:.6}", trajectory.headings[k]),
        ];
        if let Some(y) = trace.and_then(|t| t.potentials.get(k)) {
            row.extend(y.iter().map(|v| format!("{:.6}", v)));
        }
        writer.write_record(&row)?;
    }
    writer.flush()?;
    Ok(())
}

/// Writes an analysis table, one row per bin, with a header.
pub fn write_analysis_csv<P: AsRef<Path>>(path: P, report: &AnalysisReport) -> Result<()> {
    let path = path.as_ref();
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("Failed to create analysis file '{}'", path.display()))?;
    match report {
        AnalysisReport::ErrorBars(rows) => {
            for row in rows {
                writer.serialize(row)?;
            }
        }
        AnalysisReport::Split(rows) => {
            for row in rows {
                writer.serialize(row)?;
            }
        }
    }
    writer.flush()?;
    info!("Analysis saved to {} ({} bins)", path.display(), report.len());
    Ok(())
}
