//! Tab-delimited numeric matrix files
//!
//! The first line holds a corner label followed by the column names; every
//! other line holds a row name followed by that row's values. `NaN`, `NA`
//! and empty cells are missing. Short rows are padded with missing values.

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use csv::{ReaderBuilder, StringRecord, WriterBuilder};

use crate::data::{new_matrix, AnyMatrix, MatrixKind, NamedMatrix};
use crate::error::{ExprError, Result};

fn record_line(record: &StringRecord, fallback: usize) -> usize {
    record
        .position()
        .map_or(fallback, |p| p.line() as usize)
}

/// Parse one cell; missing tokens become `NaN`
pub(crate) fn parse_value(token: &str, line: usize) -> Result<f64> {
    let token = token.trim();
    if token.is_empty() || token.eq_ignore_ascii_case("na") || token.eq_ignore_ascii_case("nan") {
        return Ok(f64::NAN);
    }
    token.parse::<f64>().map_err(|_| ExprError::Format {
        line,
        reason: format!("invalid numeric value '{}'", token),
    })
}

pub fn read_matrix<P: AsRef<Path>>(path: P, kind: MatrixKind) -> Result<AnyMatrix> {
    let path = path.as_ref();
    let file = File::open(path)?;
    let matrix = read_matrix_from(BufReader::new(file), kind)?;
    log::info!(
        "Read {} x {} matrix from {}",
        matrix.rows(),
        matrix.columns(),
        path.display()
    );
    Ok(matrix)
}

/// Read a matrix of the requested kind
///
/// A sparse target stores only non-zero cells; missing cells are stored as
/// `NaN`.
pub fn read_matrix_from<R: Read>(reader: R, kind: MatrixKind) -> Result<AnyMatrix> {
    let mut reader = ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(false)
        .flexible(true)
        .from_reader(reader);
    let mut records = reader.records();

    let header = records.next().ok_or_else(|| ExprError::EmptyData {
        reason: "matrix file has no header line".to_string(),
    })??;
    let column_names: Vec<String> = header.iter().skip(1).map(|s| s.trim().to_string()).collect();
    let n_cols = column_names.len();

    let mut row_names = Vec::new();
    let mut rows: Vec<Vec<f64>> = Vec::new();
    for (idx, record) in records.enumerate() {
        let record = record?;
        let line = record_line(&record, idx + 2);
        if record.len().saturating_sub(1) > n_cols {
            return Err(ExprError::Format {
                line,
                reason: format!("{} values for {} columns", record.len() - 1, n_cols),
            });
        }
        row_names.push(record[0].trim().to_string());
        let mut values = record
            .iter()
            .skip(1)
            .map(|t| parse_value(t, line))
            .collect::<Result<Vec<f64>>>()?;
        if values.len() < n_cols {
            log::debug!("Line {} has {} of {} values; padding with NaN", line, values.len(), n_cols);
            values.resize(n_cols, f64::NAN);
        }
        rows.push(values);
    }

    let mut matrix = new_matrix(kind, rows.len(), n_cols);
    for (i, values) in rows.iter().enumerate() {
        for (j, &v) in values.iter().enumerate() {
            if kind == MatrixKind::Dense || v != 0.0 {
                matrix.set(i, j, v);
            }
        }
    }
    matrix.set_row_names(row_names)?;
    matrix.set_column_names(column_names)?;
    Ok(matrix)
}

pub fn write_matrix<P: AsRef<Path>, M: NamedMatrix>(path: P, matrix: &M) -> Result<()> {
    let file = File::create(path.as_ref())?;
    write_matrix_to(BufWriter::new(file), matrix)?;
    log::info!("Wrote {} x {} matrix to {}", matrix.rows(), matrix.columns(), path.as_ref().display());
    Ok(())
}

/// Write a matrix; unnamed axes are labelled 1, 2, ...
pub fn write_matrix_to<W: Write, M: NamedMatrix>(writer: W, matrix: &M) -> Result<()> {
    let mut writer = WriterBuilder::new()
        .delimiter(b'\t')
        .flexible(true)
        .from_writer(writer);

    let label = |names: &[String], i: usize| {
        names
            .get(i)
            .cloned()
            .unwrap_or_else(|| (i + 1).to_string())
    };

    let mut header = vec![String::new()];
    header.extend((0..matrix.columns()).map(|j| label(matrix.column_names(), j)));
    writer.write_record(&header)?;

    for i in 0..matrix.rows() {
        let mut record = vec![label(matrix.row_names(), i)];
        record.extend(matrix.row(i).iter().map(|v| v.to_string()));
        writer.write_record(&record)?;
    }
    writer.flush()?;
    Ok(())
}
