//! Sample attribute tables

use std::fs;
use std::io::Read;
use std::path::Path;

use csv::ReaderBuilder;

use super::matrix::parse_value;
use crate::data::SampleTable;
use crate::error::{ExprError, Result};

/// Strip surrounding quotes from a cell
fn strip_quotes(s: &str) -> &str {
    let s = s.trim();
    if s.len() >= 2 && ((s.starts_with('"') && s.ends_with('"')) || (s.starts_with('\'') && s.ends_with('\''))) {
        &s[1..s.len() - 1]
    } else {
        s
    }
}

/// Read a sample table, detecting tab or comma delimiters from the header
///
/// The first column holds sample ids. Columns named in `continuous` are
/// parsed as numeric covariates; all others are factors.
pub fn read_sample_table<P: AsRef<Path>>(path: P, continuous: &[String]) -> Result<SampleTable> {
    let text = fs::read_to_string(path.as_ref())?;
    let header = text.lines().next().unwrap_or("");
    let delimiter = if header.contains('\t') { b'\t' } else { b',' };
    let table = read_sample_table_from(text.as_bytes(), delimiter, continuous)?;
    log::info!(
        "Read {} samples with {} factors and {} covariates from {}",
        table.n_samples(),
        table.factor_names().len(),
        table.continuous_names().len(),
        path.as_ref().display()
    );
    Ok(table)
}

pub fn read_sample_table_from<R: Read>(reader: R, delimiter: u8, continuous: &[String]) -> Result<SampleTable> {
    let mut reader = ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .from_reader(reader);
    let mut records = reader.records();

    let header = records.next().ok_or_else(|| ExprError::EmptyData {
        reason: "sample table has no header line".to_string(),
    })??;
    let columns: Vec<String> = header.iter().skip(1).map(|s| strip_quotes(s).to_string()).collect();
    if let Some(name) = continuous.iter().find(|c| !columns.contains(c)) {
        return Err(ExprError::NotFound {
            kind: "column",
            name: name.clone(),
        });
    }

    let mut ids = Vec::new();
    let mut cells: Vec<Vec<String>> = vec![Vec::new(); columns.len()];
    for (idx, record) in records.enumerate() {
        let record = record?;
        let line = record.position().map_or(idx + 2, |p| p.line() as usize);
        ids.push(strip_quotes(&record[0]).to_string());
        for (j, cell) in record.iter().skip(1).enumerate() {
            let cell = strip_quotes(cell);
            if cell.is_empty() || cell == "NA" {
                return Err(ExprError::Format {
                    line,
                    reason: format!("missing value in column '{}'", columns[j]),
                });
            }
            cells[j].push(cell.to_string());
        }
    }
    if ids.is_empty() {
        return Err(ExprError::EmptyData {
            reason: "sample table has no samples".to_string(),
        });
    }

    let mut table = SampleTable::new(ids)?;
    for (name, values) in columns.iter().zip(cells) {
        if continuous.contains(name) {
            let numbers = values
                .iter()
                .enumerate()
                .map(|(i, v)| parse_value(v, i + 2))
                .collect::<Result<Vec<f64>>>()?;
            table.add_continuous(name, numbers)?;
        } else {
            table.add_factor(name, values)?;
        }
    }
    Ok(table)
}
