//! Pattern table ingest.
//!
//! This module turns a delimited text table into a validated
//! `DiffractionPattern`: first column is the angle axis, every further column
//! is one cake's intensities, ordered around the azimuth per the declared
//! direction.
//!
//! Design goals:
//! - **Strict structure** (angle axis must be strictly increasing, every row
//!   as wide as the first; clear errors + exit code 2)
//! - **Row-level validation** (skip bad rows, but report what happened)
//! - **Deterministic behavior** (no hidden recovery heuristics)
//! - **Separation of concerns**: no fitting logic here
//!
//! Single-byte delimiters go through the `csv` reader; the whitespace
//! delimiter (runs of spaces/tabs, the common detector-export format) is not
//! expressible there and takes a line-splitting path into the same row
//! validation.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use crate::domain::{CakeDirection, Delimiter, DiffractionPattern};
use crate::error::AppError;

/// A row-level error encountered during ingest.
#[derive(Debug, Clone)]
pub struct RowError {
    pub line: usize,
    pub message: String,
}

/// Ingest output: the validated pattern plus row-level accounting.
#[derive(Debug, Clone)]
pub struct LoadedPattern {
    pub pattern: DiffractionPattern,
    pub row_errors: Vec<RowError>,
    pub rows_read: usize,
    pub rows_used: usize,
}

/// Load a pattern table from disk.
pub fn load_pattern(
    path: &Path,
    delimiter: Delimiter,
    direction: CakeDirection,
    first_cake_angle: f64,
) -> Result<LoadedPattern, AppError> {
    let file = File::open(path).map_err(|e| {
        AppError::input(format!("failed to open pattern '{}': {e}", path.display()))
    })?;
    parse_pattern(BufReader::new(file), delimiter, direction, first_cake_angle)
}

/// Parse a pattern table from any buffered reader (exposed for tests and
/// piped input).
pub fn parse_pattern<R: BufRead>(
    reader: R,
    delimiter: Delimiter,
    direction: CakeDirection,
    first_cake_angle: f64,
) -> Result<LoadedPattern, AppError> {
    let mut table = TableBuilder::default();
    match delimiter.byte() {
        None => parse_whitespace(reader, &mut table)?,
        Some(byte) => parse_delimited(reader, byte, &mut table)?,
    }
    table.finish(direction, first_cake_angle)
}

fn parse_whitespace<R: BufRead>(reader: R, table: &mut TableBuilder) -> Result<(), AppError> {
    for (idx, line) in reader.lines().enumerate() {
        let line_no = idx + 1;
        let line = line
            .map_err(|e| AppError::input(format!("failed to read pattern line {line_no}: {e}")))?;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let fields: Vec<&str> = trimmed.split_whitespace().collect();
        table.push_row(line_no, &fields)?;
    }
    Ok(())
}

fn parse_delimited<R: BufRead>(
    reader: R,
    byte: u8,
    table: &mut TableBuilder,
) -> Result<(), AppError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .delimiter(byte)
        .trim(csv::Trim::All)
        .flexible(true)
        .comment(Some(b'#'))
        .from_reader(reader);

    for (idx, record) in csv_reader.records().enumerate() {
        let record = record
            .map_err(|e| AppError::input(format!("failed to read pattern table: {e}")))?;
        let line_no = record
            .position()
            .map(|p| p.line() as usize)
            .unwrap_or(idx + 1);
        let fields: Vec<&str> = record.iter().collect();
        if fields.iter().all(|f| f.is_empty()) {
            continue;
        }
        table.push_row(line_no, &fields)?;
    }
    Ok(())
}

/// Accumulates validated rows regardless of which reader produced them.
///
/// The first data row fixes the table width; later rows must match it. A
/// structurally unusable first row (no cake columns at all) is fatal, while
/// per-row problems are collected and skipped.
#[derive(Debug, Default)]
struct TableBuilder {
    width: Option<usize>,
    angle: Vec<f64>,
    columns: Vec<Vec<f64>>,
    row_errors: Vec<RowError>,
    rows_read: usize,
}

impl TableBuilder {
    fn push_row(&mut self, line: usize, fields: &[&str]) -> Result<(), AppError> {
        self.rows_read += 1;
        let expected = match self.width {
            Some(w) => w,
            None => {
                if fields.len() < 2 {
                    return Err(AppError::input(format!(
                        "line {line}: pattern table needs an angle column plus at least one cake column (found {})",
                        fields.len()
                    )));
                }
                self.width = Some(fields.len());
                self.columns = vec![Vec::new(); fields.len() - 1];
                fields.len()
            }
        };

        if fields.len() != expected {
            self.row_errors.push(RowError {
                line,
                message: format!("expected {expected} columns, found {}", fields.len()),
            });
            return Ok(());
        }

        match parse_numeric_row(fields) {
            Ok(values) => {
                self.angle.push(values[0]);
                for (column, value) in self.columns.iter_mut().zip(&values[1..]) {
                    column.push(*value);
                }
            }
            Err(message) => self.row_errors.push(RowError { line, message }),
        }
        Ok(())
    }

    fn finish(
        self,
        direction: CakeDirection,
        first_cake_angle: f64,
    ) -> Result<LoadedPattern, AppError> {
        let rows_used = self.angle.len();
        if rows_used < 2 {
            return Err(AppError::data(format!(
                "pattern table has {rows_used} usable rows ({} read, {} rejected)",
                self.rows_read,
                self.row_errors.len()
            )));
        }
        let pattern = DiffractionPattern::new(self.angle, self.columns, direction, first_cake_angle)?;
        Ok(LoadedPattern {
            pattern,
            row_errors: self.row_errors,
            rows_read: self.rows_read,
            rows_used,
        })
    }
}

fn parse_numeric_row(fields: &[&str]) -> Result<Vec<f64>, String> {
    let mut values = Vec::with_capacity(fields.len());
    for (col, field) in fields.iter().enumerate() {
        let value: f64 = field
            .parse()
            .map_err(|_| format!("column {}: '{}' is not a number", col + 1, field))?;
        if !value.is_finite() {
            return Err(format!("column {}: non-finite value '{}'", col + 1, field));
        }
        values.push(value);
    }
    Ok(values)
}
