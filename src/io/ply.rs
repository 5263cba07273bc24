//! PLY codec.
//!
//! Reading goes through `ply-rs`, so ASCII and both binary encodings are
//! accepted and every scalar property type converts to `f64`. Writing emits
//! ASCII PLY with double-precision properties.

use std::io::{BufRead, Write};

use ply_rs::parser::Parser;
use ply_rs::ply::{DefaultElement, ElementDef, Property, PropertyType};

use crate::core::point_set::PointSet;
use crate::io::ParseError;

const POSITION: [&str; 3] = ["x", "y", "z"];
const NORMAL: [&str; 3] = ["nx", "ny", "nz"];

fn unsupported(message: impl Into<String>) -> ParseError {
    ParseError::Unsupported {
        message: message.into(),
    }
}

fn has_scalars(element: &ElementDef, names: [&str; 3]) -> Result<bool, ParseError> {
    let mut found = 0;
    for name in names {
        match element.properties.get(name).map(|p| &p.data_type) {
            Some(PropertyType::Scalar(_)) => found += 1,
            Some(PropertyType::List(..)) => {
                return Err(unsupported(format!("list property '{name}' on the vertex element")));
            }
            None => {}
        }
    }
    Ok(found == names.len())
}

fn scalar(vertex: &DefaultElement, name: &str, row: usize) -> Result<f64, ParseError> {
    match vertex.get(name) {
        Some(Property::Double(v)) => Ok(*v),
        Some(Property::Float(v)) => Ok(f64::from(*v)),
        Some(Property::Int(v)) => Ok(f64::from(*v)),
        Some(Property::UInt(v)) => Ok(f64::from(*v)),
        Some(Property::Short(v)) => Ok(f64::from(*v)),
        Some(Property::UShort(v)) => Ok(f64::from(*v)),
        Some(Property::Char(v)) => Ok(f64::from(*v)),
        Some(Property::UChar(v)) => Ok(f64::from(*v)),
        _ => Err(ParseError::malformed(
            row + 1,
            format!("vertex property '{name}' is missing or not a scalar"),
        )),
    }
}

fn triple(vertex: &DefaultElement, names: [&str; 3], row: usize) -> Result<[f64; 3], ParseError> {
    Ok([
        scalar(vertex, names[0], row)?,
        scalar(vertex, names[1], row)?,
        scalar(vertex, names[2], row)?,
    ])
}

/// Reads a PLY stream in any encoding.
///
/// Elements declared before `vertex` are read and discarded; elements after
/// it are never read. Line numbers in [`ParseError::Malformed`] count vertex
/// rows from 1.
///
/// # Errors
///
/// Returns [`ParseError`] if the header or payload is malformed, the vertex
/// element is missing or lacks `x`, `y`, `z`, or an element declares rows but
/// no properties.
pub fn read<R: BufRead>(mut reader: R) -> Result<PointSet, ParseError> {
    let parser = Parser::<DefaultElement>::new();
    let header = parser.read_header(&mut reader).map_err(ParseError::Ply)?;

    for element in header.elements.values() {
        // Every row must consume input, so a corrupt count runs out of data
        // instead of growing without bound.
        if element.count > 0 && element.properties.is_empty() {
            return Err(unsupported(format!(
                "element '{}' declares {} rows but no properties",
                element.name, element.count
            )));
        }

        if element.name != "vertex" {
            parser
                .read_payload_for_element(&mut reader, element, &header)
                .map_err(ParseError::Ply)?;
            continue;
        }

        if !has_scalars(element, POSITION)? {
            return Err(unsupported("vertex element lacks x, y, z properties"));
        }
        let with_normals = has_scalars(element, NORMAL)?;

        let rows = parser
            .read_payload_for_element(&mut reader, element, &header)
            .map_err(ParseError::Ply)?;
        let points = rows
            .iter()
            .enumerate()
            .map(|(row, vertex)| triple(vertex, POSITION, row))
            .collect::<Result<Vec<_>, _>>()?;
        if !with_normals {
            return Ok(PointSet::new(points));
        }
        let normals = rows
            .iter()
            .enumerate()
            .map(|(row, vertex)| triple(vertex, NORMAL, row))
            .collect::<Result<Vec<_>, _>>()?;
        return Ok(PointSet::with_normals(points, normals)?);
    }

    Err(unsupported("no vertex element"))
}

/// Writes `cloud` as ASCII PLY with double-precision properties.
///
/// # Errors
///
/// Propagates write failures.
pub fn write<W: Write>(cloud: &PointSet, writer: &mut W) -> std::io::Result<()> {
    writeln!(writer, "ply")?;
    writeln!(writer, "format ascii 1.0")?;
    writeln!(writer, "element vertex {}", cloud.len())?;
    for axis in POSITION {
        writeln!(writer, "property double {axis}")?;
    }
    if cloud.has_normals() {
        for axis in NORMAL {
            writeln!(writer, "property double {axis}")?;
        }
    }
    writeln!(writer, "end_header")?;

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
