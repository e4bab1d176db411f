// AVC - Arc/Info vector coverage and E00 conversion.
// Copyright (C) 2025 Free Software Foundation, Inc.
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, either version 3 of the License, or (at your option) any later
// version.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE.  See the GNU General Public License for more
// details.
//
// You should have received a copy of the GNU General Public License along with
// this program.  If not, see <http://www.gnu.org/licenses/>.

//! Errors and warnings for reading and writing coverages.

use std::{
    fmt::{Display, Formatter},
    io::{Error as IoError, ErrorKind},
    path::{Path, PathBuf},
};

use displaydoc::Display;
use thiserror::Error as ThisError;

use crate::record::FileType;

/// An error reading or writing a coverage, a table, or E00.
#[derive(Debug)]
pub struct Error {
    /// File in which the error occurred, if known.
    pub path: Option<PathBuf>,

    /// Offset where the error occurred.
    pub offset: Option<u64>,

    /// Details of the error.
    pub details: ErrorDetails,
}

impl std::error::Error for Error {}

impl Error {
    /// Constructs an error from `offset` and `details`.
    pub fn new(offset: Option<u64>, details: ErrorDetails) -> Self {
        Self {
            path: None,
            offset,
            details,
        }
    }

    /// Returns this error with `path` attached, unless it already names a
    /// file.
    pub fn with_path(self, path: &Path) -> Self {
        Self {
            path: self.path.or_else(|| Some(path.to_path_buf())),
            ..self
        }
    }

    /// Returns this error with `offset` attached, unless it already has one.
    pub(crate) fn with_offset(self, offset: u64) -> Self {
        Self {
            offset: self.offset.or(Some(offset)),
            ..self
        }
    }
}

impl From<IoError> for Error {
    fn from(value: IoError) -> Self {
        Self::new(None, value.into())
    }
}

impl From<ErrorDetails> for Error {
    fn from(value: ErrorDetails) -> Self {
        Self::new(None, value)
    }
}

impl From<binrw::Error> for Error {
    fn from(value: binrw::Error) -> Self {
        match value {
            binrw::Error::Io(error) if error.kind() == ErrorKind::UnexpectedEof => {
                Self::new(None, ErrorDetails::UnexpectedEof)
            }
            binrw::Error::Io(error) => error.into(),
            binrw::Error::BadMagic { pos, .. } => {
                Self::new(Some(pos), ErrorDetails::Malformed(value.to_string()))
            }
            binrw::Error::AssertFail { pos, ref message } => {
                Self::new(Some(pos), ErrorDetails::Malformed(message.clone()))
            }
            other => Self::new(None, ErrorDetails::Malformed(other.to_string())),
        }
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        if let Some(path) = &self.path {
            write!(f, "{}: ", path.display())?;
        }
        if let Some(offset) = self.offset {
            write!(f, "Error at file offset {:#x}: ", offset)?;
        }
        write!(f, "{}", &self.details)
    }
}

/// Details of an [Error].
#[derive(Display, ThisError, Debug)]
pub enum ErrorDetails {
    /// I/O error ({0}).
    Io(#[from] IoError),

    /// No table named {0} in the INFO directory.
    NoSuchTable(String),

    /// {0} does not name a coverage.
    InvalidCoverPath(PathBuf),

    /// {0} is missing.  A coverage needs a sibling INFO directory that contains arc.dir.
    MissingInfoDirectory(PathBuf),

    /// Coverage {0} already exists.
    CoverageExists(PathBuf),

    /// Invalid coverage name "{0}".  A coverage name must be 1 to 13 letters, digits, or underscores.
    InvalidCoverName(String),

    /// Unexpected end of file in the middle of a record.
    UnexpectedEof,

    /// Unexpected file signature {0}.
    BadSignature(i32),

    /// Malformed file structure ({0}).
    Malformed(String),

    /// Table {table} declares {expected} fields but its field list holds only {found}.
    MissingFields {
        /// Table name.
        table: String,
        /// Declared number of fields.
        expected: usize,
        /// Number of non-deleted fields present.
        found: usize,
    },

    /// Unsupported field type {type_} with size {size}.
    UnsupportedField {
        /// Field type code, as `type1 * 10`.
        type_: i16,
        /// Field size in bytes.
        size: i16,
    },

    /// Unexpected E00 line "{0}".
    BadE00Line(String),

    /// Compressed E00 input is not supported.
    CompressedE00,

    /// No {type_} section named "{name}".
    NoSuchSection {
        /// Section type.
        type_: FileType,
        /// Section name.
        name: String,
    },

    /// Cannot derive a data file location from table name "{0}".
    BadTableName(String),

    /// Invalid precision code {0}.
    InvalidPrecision(i32),

    /// Tables must be created through the INFO directory, not as a coverage file.
    TableThroughGenericCreate,

    /// Record does not belong in a {0} file.
    WrongRecordType(FileType),

    /// {0} files cannot be opened this way.
    UnsupportedFileType(FileType),
}

/// A warning while reading or writing a coverage.
///
/// Warnings are recoverable.  Processing continues after reporting them.
#[derive(Display, ThisError, Debug)]
pub enum Warning {
    /// Table {table} claims {stored} records but its data file holds {actual}.  Using {actual}.
    RecordCountMismatch {
        /// Table name.
        table: String,
        /// Record count from arc.dir.
        stored: i32,
        /// Record count implied by the data file size.
        actual: i32,
    },

    /// Skipping deleted field {field} in table {table}.
    DeletedFieldSkipped {
        /// Table name.
        table: String,
        /// Field name.
        field: String,
    },

    /// Ignoring E00 line "{0}".
    IgnoredE00Line(String),

    /// Renaming table {from} to {to}.
    TableRenamed {
        /// Name in the E00 input.
        from: String,
        /// Name given to the table in the new coverage.
        to: String,
    },
}

/// A [std::result::Result] with [Error] as its error type.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Forwards a warning to the `log` facade.
pub(crate) fn log_warning(warning: Warning) {
    log::warn!("{warning}");
}
