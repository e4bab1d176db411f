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

//! Converting `[u8]` arrays to and from the primitive types stored in
//! coverage files.
//!
//! Coverage files are always big-endian, but the traits take a
//! [binrw::Endian] so that the same code can check byte layouts in both
//! orders.

use binrw::Endian;

/// Converts a primitive type into a big- or little-endian `[u8]` array.
pub trait ToBytes<T, const N: usize> {
    fn to_bytes(self, value: T) -> [u8; N];
}
impl ToBytes<i32, 4> for Endian {
    fn to_bytes(self, value: i32) -> [u8; 4] {
        match self {
            Endian::Big => i32::to_be_bytes(value),
            Endian::Little => i32::to_le_bytes(value),
        }
    }
}
impl ToBytes<i16, 2> for Endian {
    fn to_bytes(self, value: i16) -> [u8; 2] {
        match self {
            Endian::Big => i16::to_be_bytes(value),
            Endian::Little => i16::to_le_bytes(value),
        }
    }
}
impl ToBytes<f64, 8> for Endian {
    fn to_bytes(self, value: f64) -> [u8; 8] {
        match self {
            Endian::Big => f64::to_be_bytes(value),
            Endian::Little => f64::to_le_bytes(value),
        }
    }
}
impl ToBytes<f32, 4> for Endian {
    fn to_bytes(self, value: f32) -> [u8; 4] {
        match self {
            Endian::Big => f32::to_be_bytes(value),
            Endian::Little => f32::to_le_bytes(value),
        }
    }
}

/// Parses a `[u8]` array as a big- or little-endian primitive type.
pub trait FromBytes<T, const N: usize> {
    /// Given 'bytes', returns `T`.
    fn parse(self, bytes: [u8; N]) -> T;
}
impl FromBytes<i32, 4> for Endian {
    fn parse(self, bytes: [u8; 4]) -> i32 {
        match self {
            Endian::Big => i32::from_be_bytes(bytes),
            Endian::Little => i32::from_le_bytes(bytes),
        }
    }
}
impl FromBytes<i16, 2> for Endian {
    fn parse(self, bytes: [u8; 2]) -> i16 {
        match self {
            Endian::Big => i16::from_be_bytes(bytes),
            Endian::Little => i16::from_le_bytes(bytes),
        }
    }
}
impl FromBytes<f64, 8> for Endian {
    fn parse(self, bytes: [u8; 8]) -> f64 {
        match self {
            Endian::Big => f64::from_be_bytes(bytes),
            Endian::Little => f64::from_le_bytes(bytes),
        }
    }
}
impl FromBytes<f32, 4> for Endian {
    fn parse(self, bytes: [u8; 4]) -> f32 {
        match self {
            Endian::Big => f32::from_be_bytes(bytes),
            Endian::Little => f32::from_le_bytes(bytes),
        }
    }
}

#[cfg(test)]
mod tests {
    use binrw::Endian;

    use super::{FromBytes, ToBytes};

    #[test]
    fn big_endian_layout() {
        let bytes: [u8; 4] = Endian::Big.to_bytes(9994i32);
        assert_eq!(bytes, [0x00, 0x00, 0x27, 0x0a]);
        let value: i32 = Endian::Big.parse(bytes);
        assert_eq!(value, 9994);

        let bytes: [u8; 2] = Endian::Big.to_bytes(-2i16);
        assert_eq!(bytes, [0xff, 0xfe]);
        let bytes: [u8; 2] = Endian::Little.to_bytes(-2i16);
        assert_eq!(bytes, [0xfe, 0xff]);
    }

    #[test]
    fn reals() {
        let bytes: [u8; 8] = Endian::Big.to_bytes(1.5f64);
        assert_eq!(bytes, [0x3f, 0xf8, 0, 0, 0, 0, 0, 0]);
        let value: f32 = Endian::Big.parse([0x3f, 0xc0, 0, 0]);
        assert_eq!(value, 1.5);
    }
}
