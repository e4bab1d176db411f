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

//! Reading and writing Arc/Info vector coverages, and converting them to
//! and from the E00 interchange format.
//!
//! A coverage is a directory of binary files (`arc.adf`, `pal.adf`, ...)
//! plus attribute tables kept in an INFO directory that it shares with
//! other coverages.  [binary] reads and writes those files one record at a
//! time and [info] manages the tables.  [e00] turns records into E00 lines
//! and back, and drives whole-coverage export ([e00::E00Reader]) and import
//! ([e00::E00Writer]).

pub mod binary;
pub mod coverage;
pub mod e00;
pub mod endian;
pub mod error;
pub mod info;
pub mod raw;
pub mod record;
pub mod table;

pub use error::{Error, ErrorDetails, Result, Warning};
