//! Peak spec files.
//!
//! Peak specs travel as a JSON list of dicts, one dict per peak window:
//!
//! ```json
//! [
//!   { "peak_bounds": "2.75, 2.95", "maxima_names": "(10)" },
//!   { "peak_bounds": "3.02, 3.27",
//!     "maxima_names": ["110", "002"],
//!     "maxima_bounds": ["3.02, 3.15", "3.15, 3.27"] }
//! ]
//! ```
//!
//! Bounds are `"lower, upper"` strings; `maxima_names` accepts a bare string
//! for the single-maximum case, and `maxima_bounds` may be omitted when there
//! is only one maximum. Decoding runs the full `PeakSpec` validation, so a
//! file that decodes is a file that can be fitted.

use std::fs::File;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::domain::PeakSpec;
use crate::error::AppError;

/// One peak window as it appears on disk.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct RawPeakSpec {
    peak_bounds: String,
    maxima_names: NameField,
    #[serde(skip_serializing_if = "Option::is_none")]
    maxima_bounds: Option<Vec<String>>,
}

/// `maxima_names` is either a bare string or a list.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
enum NameField {
    One(String),
    Many(Vec<String>),
}

impl NameField {
    fn into_names(self) -> Vec<String> {
        match self {
            NameField::One(name) => vec![name],
            NameField::Many(names) => names,
        }
    }
}

/// Read and validate a peak spec file.
pub fn load_specs(path: &Path) -> Result<Vec<PeakSpec>, AppError> {
    let file = File::open(path).map_err(|e| {
        AppError::input(format!("failed to open peak specs '{}': {e}", path.display()))
    })?;
    let raw: Vec<RawPeakSpec> = serde_json::from_reader(file)
        .map_err(|e| AppError::input(format!("invalid peak spec JSON: {e}")))?;
    decode_all(raw)
}

/// Write a peak spec file in the dict schema.
pub fn write_specs(path: &Path, specs: &[PeakSpec]) -> Result<(), AppError> {
    let raw: Vec<RawPeakSpec> = specs.iter().map(encode_spec).collect();
    let file = File::create(path).map_err(|e| {
        AppError::input(format!(
            "failed to create peak specs '{}': {e}",
            path.display()
        ))
    })?;
    serde_json::to_writer_pretty(file, &raw)
        .map_err(|e| AppError::input(format!("failed to write peak specs: {e}")))?;
    Ok(())
}

/// Decode peak specs from JSON text (exposed for tests and piped input).
pub fn specs_from_json(text: &str) -> Result<Vec<PeakSpec>, AppError> {
    let raw: Vec<RawPeakSpec> = serde_json::from_str(text)
        .map_err(|e| AppError::input(format!("invalid peak spec JSON: {e}")))?;
    decode_all(raw)
}

/// Encode peak specs to pretty JSON text.
pub fn specs_to_json(specs: &[PeakSpec]) -> Result<String, AppError> {
    let raw: Vec<RawPeakSpec> = specs.iter().map(encode_spec).collect();
    serde_json::to_string_pretty(&raw)
        .map_err(|e| AppError::input(format!("failed to encode peak specs: {e}")))
}

fn decode_all(raw: Vec<RawPeakSpec>) -> Result<Vec<PeakSpec>, AppError> {
    raw.into_iter()
        .enumerate()
        .map(|(i, raw)| {
            decode_spec(raw).map_err(|e| {
                AppError::new(e.exit_code(), format!("peak spec {}: {e}", i + 1))
            })
        })
        .collect()
}

fn decode_spec(raw: RawPeakSpec) -> Result<PeakSpec, AppError> {
    let peak_bounds = parse_bounds(&raw.peak_bounds)?;
    let maxima_bounds = raw
        .maxima_bounds
        .map(|list| list.iter().map(|text| parse_bounds(text)).collect())
        .transpose()?;
    PeakSpec::new(peak_bounds, raw.maxima_names.into_names(), maxima_bounds)
}

fn encode_spec(spec: &PeakSpec) -> RawPeakSpec {
    let names = spec.maxima_names();
    let maxima_names = if names.len() == 1 {
        NameField::One(names[0].clone())
    } else {
        NameField::Many(names.to_vec())
    };
    // The single-maximum default (maxima bounds == peak bounds) round-trips
    // as an omitted field.
    let maxima_bounds = if names.len() == 1 && spec.maxima_bounds()[0] == spec.peak_bounds() {
        None
    } else {
        Some(spec.maxima_bounds().iter().map(|b| format_bounds(*b)).collect())
    };
    RawPeakSpec {
        peak_bounds: format_bounds(spec.peak_bounds()),
        maxima_names,
        maxima_bounds,
    }
}

/// Parse a `"lower, upper"` bound string.
fn parse_bounds(text: &str) -> Result<(f64, f64), AppError> {
    let parts: Vec<&str> = text.split(',').map(str::trim).collect();
    if parts.len() != 2 {
        return Err(AppError::input(format!(
            "bounds '{text}' must be two comma-separated numbers"
        )));
    }
    let lower: f64 = parts[0]
        .parse()
        .map_err(|_| AppError::input(format!("bounds '{text}': '{}' is not a number", parts[0])))?;
    let upper: f64 = parts[1]
        .parse()
        .map_err(|_| AppError::input(format!("bounds '{text}': '{}' is not a number", parts[1])))?;
    Ok((lower, upper))
}

fn format_bounds(bounds: (f64, f64)) -> String {
    format!("{}, {}", bounds.0, bounds.1)
}
