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
    io::{BufWriter, Write, stdout},
    path::{Path, PathBuf},
};

use anyhow::{Context, Result, anyhow};
use avc::{e00::ReadOptions, record::FileType};
use clap::Args;
use encoding_rs::Encoding;

use crate::parse_encoding;

/// Export a coverage as E00.
#[derive(Args, Clone, Debug)]
pub struct Export {
    /// Coverage directory, or any file in it.
    cover: PathBuf,

    /// Output file name.  If omitted or `-`, output is written to stdout.
    output: Option<PathBuf>,

    /// Export only the section with this name, e.g. `arc.adf` or a table
    /// name such as `ROADS.AAT`.
    #[arg(long)]
    section: Option<String>,

    /// List the sections instead of exporting them.
    #[arg(long, conflicts_with = "section")]
    list: bool,

    /// The encoding of text in annotations and tables.
    #[arg(short = 'e', long, value_parser = parse_encoding)]
    encoding: Option<&'static Encoding>,

    /// INFO directory, if not the one beside the coverage.
    #[arg(long)]
    info_dir: Option<PathBuf>,
}

impl Export {
    pub fn run(self) -> Result<()> {
        let mut options = ReadOptions::new();
        if let Some(encoding) = self.encoding {
            options = options.with_encoding(encoding);
        }
        if let Some(info_dir) = &self.info_dir {
            options = options.with_info_dir(info_dir);
        }
        let mut reader = options.open(&self.cover)?;

        if self.list {
            for section in reader.sections() {
                match section.type_ {
                    FileType::Unknown => println!("    {}", section.name),
                    type_ => println!("{type_} {}", section.name),
                }
            }
            return Ok(());
        }

        if let Some(name) = &self.section {
            let (type_, name) = reader
                .sections()
                .iter()
                .find(|section| {
                    section.type_ != FileType::Unknown && section.name.eq_ignore_ascii_case(name)
                })
                .map(|section| (section.type_, section.name.clone()))
                .ok_or_else(|| anyhow!("{}: no section named {name}", self.cover.display()))?;
            reader.goto_section(type_, &name, false)?;
        }

        let output: Box<dyn Write> = match &self.output {
            Some(path) if path != Path::new("-") => Box::new(BufWriter::new(
                File::create(path).with_context(|| format!("{}: create failed", path.display()))?,
            )),
            _ => Box::new(stdout().lock()),
        };
        reader.write_to(output)?;
        Ok(())
    }
}
