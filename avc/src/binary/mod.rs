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

//! Binary coverage files.
//!
//! Most coverage files begin with a 100-byte [Header] followed by records
//! of one type.  Arc, polygon, centroid and annotation files also have an
//! index file beside them that gives the position and size of each record,
//! both in 2-byte words.  All values are big-endian.

use std::path::{Path, PathBuf};

use binrw::binrw;
use serde::Serialize;

use crate::record::{FileType, Precision};

pub mod read;
pub mod write;

pub use read::BinReader;
pub use write::BinWriter;

/// Size of a [Header] on disk.
pub const HEADER_SIZE: u64 = 100;

/// Signature of most coverage files.
pub const SIGNATURE: i32 = 9994;

/// Signature of label files and double precision tolerance files.
pub const ALT_SIGNATURE: i32 = 9993;

/// The header at the start of a coverage file.
#[binrw]
#[brw(big)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Header {
    pub signature: i32,

    /// Negative for double precision.
    pub precision: i32,

    /// Size of each record for fixed-size records, otherwise 0.
    #[brw(pad_after = 12)]
    pub rec_size: i32,

    /// Length of the whole file in 2-byte words.
    #[brw(pad_after = 72)]
    pub length: i32,
}

impl Header {
    /// Returns the header for a new file of type `type_` with `precision`,
    /// or `None` if such files have no header.  The length is 0 until the
    /// file is closed.
    pub fn for_file(type_: FileType, precision: Precision) -> Option<Self> {
        let double = precision == Precision::Double;
        let signed = |code: i32| if double { -code } else { code };
        let (signature, precision, rec_size) = match type_ {
            FileType::Arc => (SIGNATURE, signed(1), 0),
            FileType::Pal | FileType::Rpl => (SIGNATURE, signed(11), 0),
            FileType::Cnt => (SIGNATURE, signed(14), 0),
            FileType::Lab => (ALT_SIGNATURE, signed(2), if double { 28 } else { 16 }),
            FileType::Txt | FileType::Tx6 => (SIGNATURE, signed(67), 0),
            FileType::Tol if double => (ALT_SIGNATURE, 40, 8),
            _ => return None,
        };
        Some(Self {
            signature,
            precision,
            rec_size,
            length: 0,
        })
    }
}

/// Returns the index file for a data file of type `type_` at `path`, or
/// `None` if there is none.
///
/// `arc.adf` is indexed by `arx.adf`, `name.arc` by `name.arx`, and likewise
/// for `pal`/`pax`, `cnt`/`cnx` and `txt`/`txx`.
pub fn index_path(type_: FileType, path: &Path) -> Option<PathBuf> {
    let (from, to) = match type_ {
        FileType::Arc => ("arc", "arx"),
        FileType::Pal | FileType::Rpl => ("pal", "pax"),
        FileType::Cnt => ("cnt", "cnx"),
        FileType::Txt | FileType::Tx6 => ("txt", "txx"),
        _ => return None,
    };
    let file_name = path.file_name()?.to_str()?;
    if file_name.eq_ignore_ascii_case(&format!("{from}.adf")) {
        Some(path.with_file_name(format!("{to}.adf")))
    } else if path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case(from))
    {
        Some(path.with_extension(to))
    } else {
        None
    }
}

#[cfg(test)]
mod tests;
