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

//! E00, the ASCII exchange format for coverages.
//!
//! An E00 file is a sequence of sections, one per coverage file or INFO
//! table, framed by literal lines such as `EXP  0 ...` and `EOS`.  Within a
//! section, each record spans one or more lines of fixed-width columns:
//! integers are right-justified in 10 (sometimes 6 or 11) characters, and
//! reals are written in scientific notation with a width that depends on
//! the coverage precision.  No line exceeds 80 characters except the text
//! of annotations and projections.
//!
//! [Generator] turns records into lines and [Parser] turns lines back into
//! records.  [E00Reader] and [E00Writer] drive them over a whole coverage.

use crate::record::Precision;

pub mod generate;
pub mod parse;
pub mod read;
pub mod write;

pub use generate::Generator;
pub use parse::{Parsed, Parser};
pub use read::{E00Reader, ReadOptions, Section};
pub use write::{E00Writer, WriteOptions};

/// Number of characters in an E00 line, as far as fixed-width data goes.
pub const LINE_LEN: usize = 80;

/// The ways to write a real number in E00.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum RealFormat {
    /// 14 characters, 7 decimals.
    Single,

    /// 21 characters, 14 decimals.
    Double,

    /// 24 characters, 17 decimals, for 8-byte floats in table records.
    TableDouble,
}

impl RealFormat {
    /// The format for reals outside tables in a file of `precision`.
    pub fn for_precision(precision: Precision) -> Self {
        match precision {
            Precision::Single => Self::Single,
            Precision::Double => Self::Double,
        }
    }

    /// Usual width, which grows by one when the exponent needs 3 digits.
    pub fn width(self) -> usize {
        self.decimals() + 7
    }

    fn decimals(self) -> usize {
        match self {
            Self::Single => 7,
            Self::Double => 14,
            Self::TableDouble => 17,
        }
    }
}

/// Appends `value` to `out` in `format`: a space or `-`, then the magnitude
/// as `d.dddE+dd`.  The exponent has two digits unless it needs three.
pub fn push_real(out: &mut String, value: f64, format: RealFormat) {
    out.push(if value < 0.0 { '-' } else { ' ' });
    let magnitude = format!("{:.*E}", format.decimals(), value.abs());
    match magnitude.split_once('E') {
        Some((mantissa, exponent)) => {
            let exponent = exponent.parse::<i32>().unwrap_or(0);
            let sign = if exponent < 0 { '-' } else { '+' };
            out.push_str(&format!("{mantissa}E{sign}{:02}", exponent.unsigned_abs()));
        }
        None => out.push_str(&format!("{magnitude:>width$}", width = format.width() - 1)),
    }
}

/// Formats `value` as [push_real] would.
pub fn format_real(value: f64, format: RealFormat) -> String {
    let mut s = String::with_capacity(format.width());
    push_real(&mut s, value, format);
    s
}

/// Appends each of `values` right-justified in `width` characters.
pub(crate) fn push_ints<I>(out: &mut String, values: I, width: usize)
where
    I: IntoIterator<Item = i32>,
{
    for value in values {
        out.push_str(&format!("{value:width$}"));
    }
}

/// Parses `s` the way C `atof` does: leading blanks are skipped, anything
/// unparseable is 0.
pub(crate) fn atof(s: &str) -> f64 {
    s.trim().parse().unwrap_or(0.0)
}

/// Reads fixed-width columns from one E00 line.
pub(crate) struct Columns<'a> {
    line: &'a str,
    pos: usize,
}

impl<'a> Columns<'a> {
    pub fn new(line: &'a str) -> Self {
        Self { line, pos: 0 }
    }

    /// Returns the next `width` characters, or what is left of the line if
    /// that is less.  Returns `None` at the end of the line or if the line
    /// is not ASCII where the column falls.
    fn next(&mut self, width: usize) -> Option<&'a str> {
        if self.pos >= self.line.len() {
            return None;
        }
        let end = (self.pos + width).min(self.line.len());
        let column = self.line.get(self.pos..end)?;
        self.pos = end;
        Some(column)
    }

    /// Returns the next `width` characters as text.
    pub fn text(&mut self, width: usize) -> Option<&'a str> {
        self.next(width)
    }

    pub fn int(&mut self, width: usize) -> Option<i32> {
        self.next(width)?.trim().parse().ok()
    }

    /// Parses a real in `format`, allowing for a 3-digit exponent.
    pub fn real(&mut self, format: RealFormat) -> Option<f64> {
        let rest = self.line.get(self.pos..)?;
        let width = format.width();
        let width = match rest.as_bytes().get(width) {
            Some(c) if c.is_ascii_digit() => width + 1,
            _ => width,
        };
        self.next(width)?.trim().parse().ok()
    }

    /// Parses `n` integers of `width` characters each.
    pub fn ints<const N: usize>(&mut self, width: usize) -> Option<[i32; N]> {
        let mut values = [0; N];
        for value in &mut values {
            *value = self.int(width)?;
        }
        Some(values)
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.line[self.pos.min(self.line.len())..].trim().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::{Columns, RealFormat, format_real};

    #[test]
    fn reals() {
        for (value, format, expected) in [
            (0.0, RealFormat::Single, " 0.0000000E+00"),
            (-0.0, RealFormat::Single, " 0.0000000E+00"),
            (123.45, RealFormat::Single, " 1.2345000E+02"),
            (-1e20, RealFormat::Single, "-1.0000000E+20"),
            (0.000123, RealFormat::Single, " 1.2300000E-04"),
            (9.999999999, RealFormat::Single, " 1.0000000E+01"),
            (1.5, RealFormat::Double, " 1.50000000000000E+00"),
            (-2.0e-5, RealFormat::Double, "-2.00000000000000E-05"),
            (1.25, RealFormat::TableDouble, " 1.25000000000000000E+00"),
            (1e-300, RealFormat::Double, " 1.00000000000000E-300"),
        ] {
            assert_eq!(format_real(value, format), expected, "{value} as {format:?}");
        }
        assert_eq!(format_real(1.0, RealFormat::Single).len(), RealFormat::Single.width());
        assert_eq!(format_real(1.0, RealFormat::Double).len(), RealFormat::Double.width());
        assert_eq!(
            format_real(1.0, RealFormat::TableDouble).len(),
            RealFormat::TableDouble.width()
        );
    }

    #[test]
    fn columns() {
        let mut columns = Columns::new("         5        -1 1.5000000E+00-2.0000000E-01");
        assert_eq!(columns.ints::<2>(10), Some([5, -1]));
        assert_eq!(columns.real(RealFormat::Single), Some(1.5));
        assert!(!columns.is_empty());
        assert_eq!(columns.real(RealFormat::Single), Some(-0.2));
        assert!(columns.is_empty());
        assert_eq!(columns.int(10), None);

        let mut columns = Columns::new(" 1.00000000000000E-300 2.00000000000000E+00");
        assert_eq!(columns.real(RealFormat::Double), Some(1e-300));
        assert_eq!(columns.real(RealFormat::Double), Some(2.0));

        assert_eq!(Columns::new("       abc").int(10), None);
        assert_eq!(Columns::new("\u{e9}\u{e9}\u{e9}\u{e9}\u{e9}\u{e9}").int(3), None);
    }
}
