//! Head-pose animation tables.
//!
//! Two comma-separated text files drive the head in user-defined mode:
//! rotation rows are quaternions `x,y,z,w`, translation rows are vectors
//! `x,y,z`. The files may have different row counts; frame alignment is
//! done by the server.

use crate::error::{A2f2dError, Result};
use std::fs;
use std::path::Path;

/// Columns in a rotation row (quaternion x, y, z, w).
pub const ROTATION_COLUMNS: usize = 4;

/// Columns in a translation row (vector x, y, z).
pub const TRANSLATION_COLUMNS: usize = 3;

/// Parsed rotation and translation sequences, in file order.
#[derive(Debug, Clone, PartialEq)]
pub struct HeadPoseAnimation {
    pub rotation: Vec<[f32; ROTATION_COLUMNS]>,
    pub translation: Vec<[f32; TRANSLATION_COLUMNS]>,
}

impl HeadPoseAnimation {
    /// Load both tables. Missing files are reported before any parsing.
    pub fn load(rotation_path: &Path, translation_path: &Path) -> Result<Self> {
        super::require_file(rotation_path)?;
        super::require_file(translation_path)?;

        let rotation = load_table::<ROTATION_COLUMNS>(rotation_path)?;
        let translation = load_table::<TRANSLATION_COLUMNS>(translation_path)?;

        if rotation.len() != translation.len() {
            tracing::debug!(
                rotation_rows = rotation.len(),
                translation_rows = translation.len(),
                "Head pose tables differ in length"
            );
        }

        Ok(Self {
            rotation,
            translation,
        })
    }
}

/// Read and parse a table file with exactly `N` numeric columns per row.
pub fn load_table<const N: usize>(path: &Path) -> Result<Vec<[f32; N]>> {
    let text = fs::read_to_string(path).map_err(|e| A2f2dError::InputRead {
        path: path.display().to_string(),
        message: e.to_string(),
    })?;
    parse_table::<N>(&path.display().to_string(), &text)
}

/// Parse table text. `source` names the file in error messages.
///
/// Blank lines are skipped. Every other line must have exactly `N` cells,
/// each a finite number.
pub fn parse_table<const N: usize>(source: &str, text: &str) -> Result<Vec<[f32; N]>> {
    let parse_error = |line: usize, message: String| A2f2dError::PoseTableParse {
        path: source.to_string(),
        line,
        message,
    };

    let mut rows = Vec::new();
    for (idx, raw) in text.lines().enumerate() {
        let line_no = idx + 1;
        let line = raw.trim_start_matches('\u{feff}').trim();
        if line.is_empty() {
            continue;
        }

        let cells: Vec<&str> = line.split(',').map(str::trim).collect();
        if cells.len() != N {
            return Err(parse_error(
                line_no,
                format!("expected {} columns, found {}", N, cells.len()),
            ));
        }

        let mut row = [0.0f32; N];
        for (slot, cell) in row.iter_mut().zip(&cells) {
            let value: f32 = cell
                .parse()
                .map_err(|_| parse_error(line_no, format!("'{}' is not a number", cell)))?;
            if !value.is_finite() {
                return Err(parse_error(
                    line_no,
                    format!("'{}' is not a finite number", cell),
                ));
            }
            *slot = value;
        }
        rows.push(row);
    }

    if rows.is_empty() {
        return Err(parse_error(0, "table has no rows".to_string()));
    }
    Ok(rows)
}
