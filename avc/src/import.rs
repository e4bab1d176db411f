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

use std::{
    fs::File,
    io::{BufRead, BufReader, stdin},
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use avc::{e00::WriteOptions, record::Precision};
use clap::{Args, ValueEnum};
use encoding_rs::Encoding;
use log::warn;

use crate::parse_encoding;

/// Build a new coverage from E00.
#[derive(Args, Clone, Debug)]
pub struct Import {
    /// E00 input file, or `-` for stdin.
    input: PathBuf,

    /// Coverage directory to create.  It must not already exist.
    cover: PathBuf,

    /// Precision of the new coverage.
    #[arg(long, value_enum, default_value_t)]
    precision: PrecisionArg,

    /// The encoding of text in annotations and tables.
    #[arg(short = 'e', long, value_parser = parse_encoding)]
    encoding: Option<&'static Encoding>,

    /// INFO directory, if not the one beside the coverage.
    #[arg(long)]
    info_dir: Option<PathBuf>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
enum PrecisionArg {
    /// 32-bit reals.
    Single,
    /// 64-bit reals.
    Double,
    /// Whatever each section of the input uses.
    #[default]
    Auto,
}

impl From<PrecisionArg> for Option<Precision> {
    fn from(value: PrecisionArg) -> Self {
        match value {
            PrecisionArg::Single => Some(Precision::Single),
            PrecisionArg::Double => Some(Precision::Double),
            PrecisionArg::Auto => None,
        }
    }
}

impl Import {
    pub fn run(self) -> Result<()> {
        let mut options = WriteOptions::new().with_precision(self.precision.into());
        if let Some(encoding) = self.encoding {
            options = options.with_encoding(encoding);
        }
        if let Some(info_dir) = &self.info_dir {
            options = options.with_info_dir(info_dir);
        }

        let input: Box<dyn BufRead> = if self.input == Path::new("-") {
            Box::new(stdin().lock())
        } else {
            let file = File::open(&self.input)
                .with_context(|| format!("{}: open failed", self.input.display()))?;
            Box::new(BufReader::new(file))
        };

        let mut writer = options.open(&self.cover, |warning| warn!("{warning}"))?;
        writer
            .write_lines(input)
            .with_context(|| format!("{}: import failed", self.input.display()))?;
        writer.close()?;
        Ok(())
    }
}
