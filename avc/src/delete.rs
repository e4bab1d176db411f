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

use std::path::PathBuf;

use anyhow::Result;
use avc::coverage::delete_coverage;
use clap::Args;

/// Delete a coverage, along with its tables in the INFO directory.
#[derive(Args, Clone, Debug)]
pub struct Delete {
    /// Coverage directory, or any file in it.
    cover: PathBuf,
}

impl Delete {
    pub fn run(self) -> Result<()> {
        delete_coverage(&self.cover)?;
        Ok(())
    }
}
