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

//! Records stored in coverage files.
//!
//! Every type here holds reals as [f64], whatever the precision of the file
//! they came from.  Readers keep one [Record] per open file and overwrite it
//! on each read; the vectors inside it are cleared rather than reallocated,
//! so their capacity may exceed their length.

use std::fmt::{Display, Formatter};

use serde::Serialize;

use crate::{error::ErrorDetails, table::Field};

/// On-disk representation of real numbers in a file.
///
/// Precision is fixed when a file is opened and never changes afterward.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize)]
pub enum Precision {
    /// 32-bit reals.
    #[default]
    Single,

    /// 64-bit reals.
    Double,
}

impl Precision {
    /// Size of one real in bytes.
    pub fn real_size(self) -> usize {
        match self {
            Precision::Single => 4,
            Precision::Double => 8,
        }
    }

    /// Digit that follows a section name in E00.
    pub fn e00_code(self) -> char {
        match self {
            Precision::Single => '2',
            Precision::Double => '3',
        }
    }

    pub fn from_e00_code(code: char) -> Result<Self, ErrorDetails> {
        match code {
            '2' => Ok(Precision::Single),
            '3' => Ok(Precision::Double),
            other => Err(ErrorDetails::InvalidPrecision(
                other.to_digit(10).map_or(-1, |digit| digit as i32),
            )),
        }
    }

    /// Interprets the precision word of a file header.  Negative values mean
    /// double precision.
    pub fn from_header(precision: i32) -> Self {
        if precision < 0 {
            Precision::Double
        } else {
            Precision::Single
        }
    }
}

impl Display for Precision {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Precision::Single => write!(f, "single"),
            Precision::Double => write!(f, "double"),
        }
    }
}

/// Kind of file, and therefore of section, in a coverage.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum FileType {
    /// Literal line with no backing file.
    Unknown,
    Arc,
    Pal,
    Cnt,
    Lab,
    Prj,
    Tol,
    Txt,
    Tx6,
    Rxp,
    /// Region polygon arc list, stored like [FileType::Pal].
    Rpl,
    /// INFO attribute table.
    Table,
}

impl FileType {
    /// Three-letter E00 section code.
    pub fn code(self) -> &'static str {
        match self {
            FileType::Unknown => "UNK",
            FileType::Arc => "ARC",
            FileType::Pal => "PAL",
            FileType::Cnt => "CNT",
            FileType::Lab => "LAB",
            FileType::Prj => "PRJ",
            FileType::Tol => "TOL",
            FileType::Txt => "TXT",
            FileType::Tx6 => "TX6",
            FileType::Rxp => "RXP",
            FileType::Rpl => "RPL",
            FileType::Table => "IFO",
        }
    }

    /// Parses a case-insensitive file type name, as accepted on the command
    /// line.
    pub fn from_name(name: &str) -> Option<Self> {
        let type_ = match name.to_ascii_uppercase().as_str() {
            "ARC" => FileType::Arc,
            "PAL" => FileType::Pal,
            "CNT" => FileType::Cnt,
            "LAB" => FileType::Lab,
            "PRJ" => FileType::Prj,
            "TOL" | "PAR" => FileType::Tol,
            "TXT" => FileType::Txt,
            "TX6" => FileType::Tx6,
            "RXP" => FileType::Rxp,
            "RPL" => FileType::Rpl,
            "TABLE" | "IFO" => FileType::Table,
            _ => return None,
        };
        Some(type_)
    }
}

impl Display for FileType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// A point.
#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize)]
pub struct Vertex {
    pub x: f64,
    pub y: f64,
}

impl Vertex {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// An arc, from `arc.adf`.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct Arc {
    pub arc_id: i32,
    pub user_id: i32,
    /// From node.
    pub f_node: i32,
    /// To node.
    pub t_node: i32,
    /// Polygon on the left.
    pub l_poly: i32,
    /// Polygon on the right.
    pub r_poly: i32,
    pub vertices: Vec<Vertex>,
}

/// One arc in the boundary of a polygon.
#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize)]
pub struct PalArc {
    pub arc_id: i32,
    pub f_node: i32,
    /// Polygon on the other side of the arc.
    pub adj_poly: i32,
}

/// A polygon arc list, from `pal.adf` or a region `*.pal` file.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct Pal {
    pub poly_id: i32,
    pub min: Vertex,
    pub max: Vertex,
    pub arcs: Vec<PalArc>,
}

/// A polygon centroid, from `cnt.adf`.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct Cnt {
    pub poly_id: i32,
    pub coord: Vertex,
    /// Ids of the labels inside the polygon.
    pub labels: Vec<i32>,
}

/// A label point, from `lab.adf`.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct Lab {
    pub value: i32,
    pub poly_id: i32,
    pub coords: [Vertex; 3],
}

/// A tolerance, from `tol.adf` or `par.adf`.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct Tol {
    pub index: i32,
    pub flag: i32,
    pub value: f64,
}

/// An annotation, from `txt.adf` or a `*.txt` file.
///
/// The line and arrow vertex counts carry a sign that must be preserved.
/// Their magnitudes give the number of entries of `vertices` that belong to
/// each part, line vertices first.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Txt {
    pub txt_id: i32,
    pub user_id: i32,
    pub level: i32,
    /// Always -1e20 on disk, stored as a 32-bit real even in double
    /// precision files.
    pub f_1e2: f32,
    pub symbol: i32,
    pub num_vertices_line: i32,
    pub n28: i32,
    pub num_chars: i32,
    pub num_vertices_arrow: i32,
    pub just1: [i16; 20],
    pub just2: [i16; 20],
    pub height: f64,
    pub v2: f64,
    pub v3: f64,
    pub text: String,
    pub vertices: Vec<Vertex>,
}

impl Default for Txt {
    fn default() -> Self {
        Self {
            txt_id: 0,
            user_id: 0,
            level: 0,
            f_1e2: -1e20,
            symbol: 0,
            num_vertices_line: 0,
            n28: 0,
            num_chars: 0,
            num_vertices_arrow: 0,
            just1: [0; 20],
            just2: [0; 20],
            height: 0.0,
            v2: 0.0,
            v3: 0.0,
            text: String::new(),
            vertices: Vec::new(),
        }
    }
}

impl Txt {
    /// Total number of vertices implied by the line and arrow counts.
    pub fn num_vertices(&self) -> usize {
        self.num_vertices_line.unsigned_abs() as usize
            + self.num_vertices_arrow.unsigned_abs() as usize
    }
}

/// A region record, from a `*.rxp` file.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct Rxp {
    pub n1: i32,
    pub n2: i32,
}

/// The current record of an open file.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub enum Record {
    Arc(Arc),
    Pal(Pal),
    Cnt(Cnt),
    Lab(Lab),
    Tol(Tol),
    Txt(Txt),
    Rxp(Rxp),
    /// Projection lines.  A `prj.adf` file holds exactly one.
    Prj(Vec<String>),
    /// Fields of a table record, one per non-deleted field.
    Table(Vec<Field>),
}

impl Record {
    /// Returns an empty record of the shape stored in files of type `type_`.
    pub fn empty(type_: FileType) -> Option<Self> {
        match type_ {
            FileType::Arc => Some(Record::Arc(Arc::default())),
            FileType::Pal | FileType::Rpl => Some(Record::Pal(Pal::default())),
            FileType::Cnt => Some(Record::Cnt(Cnt::default())),
            FileType::Lab => Some(Record::Lab(Lab::default())),
            FileType::Tol => Some(Record::Tol(Tol::default())),
            FileType::Txt | FileType::Tx6 => Some(Record::Txt(Txt::default())),
            FileType::Rxp => Some(Record::Rxp(Rxp::default())),
            FileType::Prj => Some(Record::Prj(Vec::new())),
            FileType::Table => Some(Record::Table(Vec::new())),
            FileType::Unknown => None,
        }
    }

    /// Returns true if this record can be stored in a file of type `type_`.
    pub fn fits(&self, type_: FileType) -> bool {
        matches!(
            (self, type_),
            (Record::Arc(_), FileType::Arc)
                | (Record::Pal(_), FileType::Pal | FileType::Rpl)
                | (Record::Cnt(_), FileType::Cnt)
                | (Record::Lab(_), FileType::Lab)
                | (Record::Tol(_), FileType::Tol)
                | (Record::Txt(_), FileType::Txt | FileType::Tx6)
                | (Record::Rxp(_), FileType::Rxp)
                | (Record::Prj(_), FileType::Prj)
                | (Record::Table(_), FileType::Table)
        )
    }
}
