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

//! INFO table schemas and values.

use std::path::PathBuf;

use serde::Serialize;

use crate::error::ErrorDetails;

/// Type of a table field.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum FieldType {
    /// Date, as text.
    Date,
    /// Character string.
    Char,
    /// Integer stored as text.
    FixInt,
    /// Fixed-point number stored as text, one byte per digit.
    FixNum,
    /// Binary integer, 2 or 4 bytes.
    BinInt,
    /// Binary real, 4 or 8 bytes.
    BinFloat,
}

impl FieldType {
    /// Decodes the `type1` word of a field definition.
    pub fn from_type1(type1: i16) -> Option<Self> {
        match i32::from(type1) * 10 {
            10 => Some(Self::Date),
            20 => Some(Self::Char),
            30 => Some(Self::FixInt),
            40 => Some(Self::FixNum),
            50 => Some(Self::BinInt),
            60 => Some(Self::BinFloat),
            _ => None,
        }
    }

    /// The `type1` word for this type.
    pub fn type1(self) -> i16 {
        match self {
            Self::Date => 1,
            Self::Char => 2,
            Self::FixInt => 3,
            Self::FixNum => 4,
            Self::BinInt => 5,
            Self::BinFloat => 6,
        }
    }

    /// True for types stored as text in binary tables.
    pub fn is_text(self) -> bool {
        matches!(self, Self::Date | Self::Char | Self::FixInt | Self::FixNum)
    }
}

/// One value in a table record.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub enum Field {
    /// Value of a date, char, fixint or fixnum field.
    Str(String),
    Int16(i16),
    Int32(i32),
    Float(f32),
    Double(f64),
}

/// Definition of one field in a table, as stored in the table's `.nit`
/// file.
///
/// Only `size`, `offset`, `fmt_width`, `fmt_prec`, `type1` and `index` have
/// known meanings.  The others are carried through unchanged.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct FieldInfo {
    pub name: String,
    /// Size in bytes in the binary record.
    pub size: i16,
    pub v2: i16,
    /// 1-based byte offset in the binary record.
    pub offset: i16,
    pub v4: i16,
    pub v5: i16,
    pub fmt_width: i16,
    pub fmt_prec: i16,
    pub type1: i16,
    pub type2: i16,
    pub v10: i16,
    pub v11: i16,
    pub v12: i16,
    pub v13: i16,
    pub alt_name: String,
    /// 1-based position of the field, or 0 or less for a deleted field.
    pub index: i16,
}

impl FieldInfo {
    /// Creates a field definition with the values usually found in the
    /// unknown words.  The display format defaults to the field's size with
    /// no decimals; use [FieldInfo::with_format] to change it.
    pub fn new(name: &str, type_: FieldType, size: i16, offset: i16, index: i16) -> Self {
        Self {
            name: name.into(),
            size,
            v2: -1,
            offset,
            v4: 4,
            v5: -1,
            fmt_width: size,
            fmt_prec: -1,
            type1: type_.type1(),
            type2: 0,
            v10: -1,
            v11: -1,
            v12: -1,
            v13: -1,
            alt_name: String::new(),
            index,
        }
    }

    pub fn with_format(self, fmt_width: i16, fmt_prec: i16) -> Self {
        Self {
            fmt_width,
            fmt_prec,
            ..self
        }
    }

    /// `type1` scaled the way field types are usually quoted (10, 20, ...).
    pub fn type_code(&self) -> i16 {
        self.type1.saturating_mul(10)
    }

    pub fn field_type(&self) -> Option<FieldType> {
        FieldType::from_type1(self.type1)
    }

    pub fn is_deleted(&self) -> bool {
        self.index <= 0
    }

    fn unsupported(&self) -> ErrorDetails {
        ErrorDetails::UnsupportedField {
            type_: self.type_code(),
            size: self.size,
        }
    }

    /// Returns the type of this field, checked against its size.
    pub fn checked_type(&self) -> Result<FieldType, ErrorDetails> {
        match (self.field_type(), self.size) {
            (Some(type_), size) if type_.is_text() && size >= 0 => Ok(type_),
            (Some(FieldType::BinInt), 2 | 4) => Ok(FieldType::BinInt),
            (Some(FieldType::BinFloat), 4 | 8) => Ok(FieldType::BinFloat),
            _ => Err(self.unsupported()),
        }
    }

    /// Number of characters this field occupies in an E00 table record.
    pub fn e00_len(&self) -> Result<usize, ErrorDetails> {
        Ok(match (self.checked_type()?, self.size) {
            (FieldType::Date | FieldType::Char | FieldType::FixInt, size) => size as usize,
            (FieldType::BinInt, 4) => 11,
            (FieldType::BinInt, _) => 6,
            (FieldType::BinFloat, 4) | (FieldType::FixNum, _) => 14,
            (FieldType::BinFloat, _) => 24,
        })
    }
}

/// Schema and location of an INFO table.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TableDef {
    /// Table name, e.g. `COVER.PAT`, without trailing spaces.
    pub name: String,

    /// Base name of the table's files in the INFO directory, e.g. `ARC0003`.
    pub info_file: String,

    /// Number of non-deleted fields.
    pub num_fields: i16,

    /// Size of one binary record in bytes.
    pub rec_size: i16,

    pub num_records: i32,

    /// True if the data lives in the coverage directory rather than the INFO
    /// directory.
    pub external: bool,

    /// Data file, once the table has been located on disk.
    pub data_file: Option<PathBuf>,

    /// Non-deleted fields, in order.
    pub fields: Vec<FieldInfo>,
}

impl TableDef {
    /// Creates an internal table with `fields`.  The record size is taken
    /// from the last byte covered by any field.
    pub fn new(name: &str, fields: Vec<FieldInfo>) -> Self {
        let rec_size = fields
            .iter()
            .map(|field| field.offset - 1 + field.size)
            .max()
            .unwrap_or(0);
        Self {
            name: name.into(),
            info_file: String::new(),
            num_fields: fields.len() as i16,
            rec_size,
            num_records: 0,
            external: false,
            data_file: None,
            fields,
        }
    }

    /// Record size rounded up to a whole number of 2-byte words, as written
    /// to disk.
    pub fn padded_rec_size(&self) -> usize {
        (self.rec_size.max(0) as usize).div_ceil(2) * 2
    }

    /// Number of characters in one E00 record of this table.
    pub fn e00_record_len(&self) -> Result<usize, ErrorDetails> {
        self.fields.iter().map(FieldInfo::e00_len).sum()
    }
}
