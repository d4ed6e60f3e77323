use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

/// One stored gene together with the chemotaxis index it scored when it was saved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneRecord {
    pub value: f64,
    pub gene: Vec<f64>,
}

/// Reads a JSON array of `{"value": .., "gene": [..]}` records.
pub fn load_gene_records<P: AsRef<Path>>(path: P) -> Result<Vec<GeneRecord>> {
    let path_ref = path.as_ref();
    let file = File::open(path_ref)
        .with_context(|| format!("Failed to open gene file '{}'", path_ref.display()))?;
    let records: Vec<GeneRecord> = serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("Failed to parse gene records from '{}'", path_ref.display()))?;
    Ok(records)
}

/// Writes records as a pretty-printed JSON array.
pub fn save_gene_records<P: AsRef<Path>>(path: P, records: &[GeneRecord]) -> Result<()> {
    let path_ref = path.as_ref();
    let file = File::create(path_ref)
        .with_context(|| format!("Failed to create gene file '{}'", path_ref.display()))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, records)
        .with_context(|| format!("Failed to serialize gene records to '{}'", path_ref.display()))?;
    writer.flush()?;
    Ok(())
}

/// Picks one record by index, with a readable error when it is out of range.
pub fn select_record(records: &[GeneRecord], index: usize) -> Result<&GeneRecord> {
    records.get(index).ok_or_else(|| {
        anyhow::anyhow!("Gene index {} out of range ({} records loaded).", index, records.len())
    })
}
