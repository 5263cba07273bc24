//! Whitespace-separated XYZ text codec.

use std::io::{BufRead, Write};

use crate::core::point_set::PointSet;
use crate::io::ParseError;

/// Reads `x y z` or `x y z nx ny nz` lines.
///
/// Every data line must have the same number of columns as the first.
///
/// # Errors
///
/// Returns [`ParseError`] for unparsable numbers, a column count other than
/// three or six, or a column count that changes between lines.
pub fn read<R: BufRead>(reader: R) -> Result<PointSet, ParseError> {
    let mut points = Vec::new();
    let mut normals = Vec::new();
    let mut columns = None;

    for (i, line) in reader.lines().enumerate() {
        let line_no = i + 1;
        let line = line?;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let values = line
            .split_whitespace()
            .map(|token| {
                token
                    .parse::<f64>()
                    .map_err(|_| ParseError::malformed(line_no, format!("bad number '{token}'")))
            })
            .collect::<Result<Vec<f64>, ParseError>>()?;

        let expected = *columns.get_or_insert(values.len());
        if values.len() != expected {
            return Err(ParseError::malformed(
                line_no,
                format!("expected {expected} columns, found {}", values.len()),
            ));
        }
        match values.as_slice() {
            &[x, y, z] => points.push([x, y, z]),
            &[x, y, z, nx, ny, nz] => {
                points.push([x, y, z]);
                normals.push([nx, ny, nz]);
            }
            _ => {
                return Err(ParseError::malformed(
                    line_no,
                    format!("expected 3 or 6 columns, found {}", values.len()),
                ));
            }
        }
    }

    if columns == Some(6) {
        Ok(PointSet::with_normals(points, normals)?)
    } else {
        Ok(PointSet::new(points))
    }
}

/// Writes one point per line, with normals appended when present.
///
/// # Errors
///
/// Propagates write failures.
pub fn write<W: Write>(cloud: &PointSet, writer: &mut W) -> std::io::Result<()> {
    match cloud.normals() {
        Some(normals) => {
            for (p, n) in cloud.points().iter().zip(normals) {
                writeln!(writer, "{} {} {} {} {} {}", p[0], p[1], p[2], n[0], n[1], n[2])?;
            }
        }
        None => {
            for p in cloud.points() {
                writeln!(writer, "{} {} {}", p[0], p[1], p[2])?;
            }
        }
    }
    Ok(())
}
