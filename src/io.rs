//! Reading and writing point cloud files.
//!
//! Two formats are supported, chosen by file extension:
//!
//! - PLY (`.ply`), ASCII or binary: a `vertex` element with `x`, `y`, `z` and
//!   optionally `nx`, `ny`, `nz` properties of any scalar type; other
//!   properties and elements are skipped. Clouds are written as ASCII PLY.
//! - XYZ text (`.xyz`, `.xyzn`, `.txt`): one point per line, three columns,
//!   or six with normals. Blank lines and `#` comments are ignored.

pub mod ply;
pub mod xyz;

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::core::point_set::{PointSet, PointSetError};

// =============================================================================
// ERROR TYPES
// =============================================================================

/// A malformed point cloud stream.
#[derive(Debug, Error)]
pub enum ParseError {
    /// The underlying reader failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// The PLY reader rejected the header or payload.
    #[error("PLY: {0}")]
    Ply(#[source] std::io::Error),
    /// The content does not follow the format.
    #[error("line {line}: {message}")]
    Malformed {
        /// 1-based line number (vertex row for PLY).
        line: usize,
        /// Description of the problem.
        message: String,
    },
    /// The content is valid but uses a variant this reader does not handle.
    #[error("unsupported: {message}")]
    Unsupported {
        /// Description of the unsupported feature.
        message: String,
    },
    /// Points and normals ended up with different lengths, or a normal is
    /// not finite.
    #[error(transparent)]
    Shape(#[from] PointSetError),
}

impl ParseError {
    pub(crate) fn malformed(line: usize, message: impl Into<String>) -> Self {
        Self::Malformed {
            line,
            message: message.into(),
        }
    }
}

/// Failure to load a point cloud; always names the file.
#[derive(Debug, Error)]
pub enum LoadError {
    /// The file could not be opened.
    #[error("Failed to open {}: {source}", path.display())]
    Open {
        /// The offending path.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },
    /// The extension does not name a supported format.
    #[error("Unsupported point cloud format: {}", path.display())]
    UnsupportedFormat {
        /// The offending path.
        path: PathBuf,
    },
    /// The file content could not be parsed.
    #[error("Failed to parse {}: {source}", path.display())]
    Parse {
        /// The offending path.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: ParseError,
    },
}

impl LoadError {
    /// The file that failed to load.
    #[must_use]
    pub fn path(&self) -> &Path {
        match self {
            Self::Open { path, .. } | Self::UnsupportedFormat { path } | Self::Parse { path, .. } => {
                path
            }
        }
    }
}

/// Failure to save a point cloud; always names the file.
#[derive(Debug, Error)]
pub enum SaveError {
    /// The file could not be created or written.
    #[error("Failed to write {}: {source}", path.display())]
    Io {
        /// The offending path.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },
    /// The extension does not name a supported format.
    #[error("Unsupported point cloud format: {}", path.display())]
    UnsupportedFormat {
        /// The offending path.
        path: PathBuf,
    },
}

impl SaveError {
    /// The file that failed to save.
    #[must_use]
    pub fn path(&self) -> &Path {
        match self {
            Self::Io { path, .. } | Self::UnsupportedFormat { path } => path,
        }
    }
}

// =============================================================================
// FORMAT DISPATCH
// =============================================================================

/// Supported point cloud file formats.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PointCloudFormat {
    /// PLY, read in any encoding and written as ASCII.
    Ply,
    /// Whitespace-separated XYZ text.
    Xyz,
}

impl PointCloudFormat {
    /// Picks a format from the path's extension, case-insensitively.
    #[must_use]
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "ply" => Some(Self::Ply),
            "xyz" | "xyzn" | "txt" => Some(Self::Xyz),
            _ => None,
        }
    }
}

/// Loads a point cloud, with normals when the file has them.
///
/// # Errors
///
/// Returns a [`LoadError`] naming `path` if the extension is unknown, the
/// file cannot be opened, or its content is malformed.
pub fn load(path: impl AsRef<Path>) -> Result<PointSet, LoadError> {
    let path = path.as_ref();
    let format = PointCloudFormat::from_path(path).ok_or_else(|| LoadError::UnsupportedFormat {
        path: path.to_path_buf(),
    })?;
    let file = File::open(path).map_err(|source| LoadError::Open {
        path: path.to_path_buf(),
        source,
    })?;
    let reader = BufReader::new(file);

    let cloud = match format {
        PointCloudFormat::Ply => ply::read(reader),
        PointCloudFormat::Xyz => xyz::read(reader),
    }
    .map_err(|source| LoadError::Parse {
        path: path.to_path_buf(),
        source,
    })?;

    tracing::info!(
        path = %path.display(),
        points = cloud.len(),
        normals = cloud.has_normals(),
        "loaded point cloud"
    );
    Ok(cloud)
}

/// Saves a point cloud in the format implied by the extension.
///
/// # Errors
///
/// Returns a [`SaveError`] naming `path` if the extension is unknown or the
/// file cannot be written.
pub fn save(cloud: &PointSet, path: impl AsRef<Path>) -> Result<(), SaveError> {
    let path = path.as_ref();
    let format = PointCloudFormat::from_path(path).ok_or_else(|| SaveError::UnsupportedFormat {
        path: path.to_path_buf(),
    })?;
    let io_error = |source| SaveError::Io {
        path: path.to_path_buf(),
        source,
    };

    let mut writer = BufWriter::new(File::create(path).map_err(io_error)?);
    match format {
        PointCloudFormat::Ply => ply::write(cloud, &mut writer),
        PointCloudFormat::Xyz => xyz::write(cloud, &mut writer),
    }
    .and_then(|()| writer.flush())
    .map_err(io_error)?;

    tracing::info!(path = %path.display(), points = cloud.len(), "saved point cloud");
    Ok(())
}
