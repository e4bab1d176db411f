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

//! Importing E00 into a new coverage.

use std::{
    fs::{self, OpenOptions},
    io::BufRead,
    path::{Path, PathBuf},
};

use encoding_rs::{Encoding, WINDOWS_1252};
use log::debug;

use crate::{
    binary::write::BinWriter,
    coverage::CoverPath,
    e00::parse::{Parsed, Parser},
    error::{Error, ErrorDetails, Result, Warning},
    info,
    record::{FileType, Precision},
    table::TableDef,
};

/// Options for importing E00.
#[derive(Clone, Debug)]
pub struct WriteOptions {
    /// Precision of the new coverage's files.  `None` keeps the precision
    /// of each section of the input.
    pub precision: Option<Precision>,

    /// Encoding for text in annotations and tables.
    pub encoding: &'static Encoding,

    /// INFO directory to use in place of the one beside the coverage.
    pub info_dir: Option<PathBuf>,
}

impl Default for WriteOptions {
    fn default() -> Self {
        Self {
            precision: None,
            encoding: WINDOWS_1252,
            info_dir: None,
        }
    }
}

impl WriteOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_precision(self, precision: Option<Precision>) -> Self {
        Self { precision, ..self }
    }

    pub fn with_encoding(self, encoding: &'static Encoding) -> Self {
        Self { encoding, ..self }
    }

    pub fn with_info_dir(self, info_dir: impl Into<PathBuf>) -> Self {
        Self {
            info_dir: Some(info_dir.into()),
            ..self
        }
    }

    /// Creates the coverage at `path` with these options.
    pub fn open<'a>(self, path: &Path, warn: impl FnMut(Warning) + 'a) -> Result<E00Writer<'a>> {
        E00Writer::open(path, self, warn)
    }
}

/// Builds a coverage from E00 lines.
///
/// Lines must be fed in order with [E00Writer::write_line], and then
/// [E00Writer::close] completes the last file.
pub struct E00Writer<'a> {
    cover: CoverPath,
    precision: Option<Precision>,
    encoding: &'static Encoding,
    parser: Parser,
    file: Option<BinWriter>,

    /// True inside a `LOG` section, which ends with `EOL`.
    in_log: bool,

    warn: Box<dyn FnMut(Warning) + 'a>,
}

impl<'a> E00Writer<'a> {
    /// Creates a new, empty coverage at `path`, which must not exist yet.
    /// The INFO directory and its `arc.dir` are created if they are
    /// missing.  Warnings are reported through `warn`.
    pub fn open(
        path: &Path,
        options: WriteOptions,
        warn: impl FnMut(Warning) + 'a,
    ) -> Result<Self> {
        let mut cover = CoverPath::new_cover(path)?;
        if let Some(info_dir) = options.info_dir {
            cover = cover.with_info_dir(info_dir);
        }
        if cover.dir.exists() {
            return Err(ErrorDetails::CoverageExists(cover.dir).into());
        }

        fs::create_dir(&cover.dir).map_err(|error| Error::from(error).with_path(&cover.dir))?;
        fs::create_dir_all(&cover.info_dir)
            .map_err(|error| Error::from(error).with_path(&cover.info_dir))?;
        let arc_dir = info::arc_dir_path(&cover.info_dir);
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(&arc_dir)
            .map_err(|error| Error::from(error).with_path(&arc_dir))?;
        debug!("created coverage {}", cover.dir.display());

        Ok(Self {
            cover,
            precision: options.precision,
            encoding: options.encoding,
            parser: Parser::new(),
            file: None,
            in_log: false,
            warn: Box::new(warn),
        })
    }

    pub fn cover(&self) -> &CoverPath {
        &self.cover
    }

    /// Feeds one line of E00, without its line ending.
    pub fn write_line(&mut self, line: &str) -> Result<()> {
        let line = line.trim_end_matches(['\r', '\n']);
        if self.parser.section() == FileType::Unknown {
            self.write_outside_section(line)
        } else {
            self.write_in_section(line)
        }
    }

    /// Feeds every line of `input`, decoding each with the configured
    /// encoding.
    pub fn write_lines<R>(&mut self, mut input: R) -> Result<()>
    where
        R: BufRead,
    {
        let mut bytes = Vec::new();
        loop {
            bytes.clear();
            if input.read_until(b'\n', &mut bytes)? == 0 {
                return Ok(());
            }
            let (line, _) = self.encoding.decode_without_bom_handling(&bytes);
            self.write_line(&line)?;
        }
    }

    fn ignore(&mut self, line: &str) {
        (self.warn)(Warning::IgnoredE00Line(line.into()));
    }

    fn write_outside_section(&mut self, line: &str) -> Result<()> {
        if self.in_log {
            if line.starts_with("EOL") {
                self.in_log = false;
            } else {
                self.ignore(line);
            }
            return Ok(());
        }
        if self.parser.parse_super_section_end(line) || self.parser.parse_section_end(line, true) {
            return Ok(());
        }

        if self.parser.super_section() == FileType::Unknown {
            if line.starts_with("EXP  1") {
                return Err(ErrorDetails::CompressedE00.into());
            }
            if ["EXP ", "SIN ", "EOX", "EOS"]
                .iter()
                .any(|prefix| line.starts_with(prefix))
            {
                return Ok(());
            }
            if line.starts_with("LOG ") {
                self.in_log = true;
                return Ok(());
            }
            if self.parser.parse_super_section_header(line).is_some() {
                return Ok(());
            }
        }

        match self.parser.parse_section_header(line) {
            // The first line of a table's header also names the table.
            Some(FileType::Table) => self.write_in_section(line),
            Some(type_) => {
                let file_name = self.file_name(type_)?;
                let precision = self.precision.unwrap_or(self.parser.precision());
                self.file = Some(BinWriter::create(
                    &self.cover.file(&file_name),
                    type_,
                    precision,
                    self.encoding,
                )?);
                Ok(())
            }
            None => {
                if !line.trim().is_empty() {
                    self.ignore(line);
                }
                Ok(())
            }
        }
    }

    /// Returns the name of the file for a section of type `type_` that just
    /// started.
    fn file_name(&self, type_: FileType) -> Result<String> {
        let precision = self.precision.unwrap_or(self.parser.precision());
        let name = self.parser.section_name();
        let extension = match type_ {
            FileType::Arc => return Ok("arc.adf".into()),
            FileType::Pal => return Ok("pal.adf".into()),
            FileType::Cnt => return Ok("cnt.adf".into()),
            FileType::Lab => return Ok("lab.adf".into()),
            FileType::Txt => return Ok("txt.adf".into()),
            FileType::Prj => return Ok("prj.adf".into()),
            FileType::Tol if precision == Precision::Double => return Ok("par.adf".into()),
            FileType::Tol => return Ok("tol.adf".into()),
            FileType::Tx6 => "txt",
            FileType::Rxp => "rxp",
            FileType::Rpl => "pal",
            FileType::Table | FileType::Unknown => {
                return Err(ErrorDetails::UnsupportedFileType(type_).into());
            }
        };
        if name.starts_with('.') || name.contains(['/', '\\', ':']) {
            return Err(ErrorDetails::BadE00Line(name.into()).into());
        }
        Ok(format!("{}.{extension}", name.to_ascii_lowercase()))
    }

    fn write_in_section(&mut self, line: &str) -> Result<()> {
        if self.parser.parse_section_end(line, false) {
            self.close_file()?;
            self.parser.parse_section_end(line, true);
            return Ok(());
        }

        let Self {
            cover,
            precision,
            encoding,
            parser,
            file,
            warn,
            ..
        } = self;
        let precision = precision.unwrap_or(parser.precision());
        match parser.parse_line(line)? {
            Some(Parsed::Record(record)) => match file {
                Some(file) => file.write_record(record)?,
                None => return Err(ErrorDetails::BadE00Line(line.into()).into()),
            },
            Some(Parsed::TableDef(def)) => {
                let def = rename_table(def, &cover.name, &mut **warn)?;
                *file = Some(BinWriter::create_table(
                    &cover.info_dir,
                    &def,
                    precision,
                    *encoding,
                )?);
            }
            None => (),
        }

        if self.parser.section_ended() {
            self.close_file()?;
            self.parser.reset();
        }
        Ok(())
    }

    fn close_file(&mut self) -> Result<()> {
        match self.file.take() {
            Some(file) => file.close(),
            None => Ok(()),
        }
    }

    /// Completes the file in progress, if any.
    pub fn close(mut self) -> Result<()> {
        if self.parser.section() != FileType::Unknown {
            debug!("E00 input ended inside a {} section", self.parser.section());
        }
        self.close_file()
    }
}

/// Returns `def` renamed to belong to coverage `cover_name`.  `ROADS.AAT`
/// becomes `STREETS.AAT` in coverage `streets`.
fn rename_table(
    def: &TableDef,
    cover_name: &str,
    warn: &mut dyn FnMut(Warning),
) -> Result<TableDef> {
    if def.name.contains(['/', '\\']) {
        return Err(ErrorDetails::BadTableName(def.name.clone()).into());
    }
    let cover_name = cover_name.to_ascii_uppercase();
    let mut def = def.clone();
    let (prefix, extension) = def
        .name
        .split_once('.')
        .ok_or_else(|| ErrorDetails::BadTableName(def.name.clone()))?;
    if !prefix.eq_ignore_ascii_case(&cover_name) {
        let name = format!("{cover_name}.{extension}");
        warn(Warning::TableRenamed {
            from: def.name.clone(),
            to: name.clone(),
        });
        def.name = name;
    }
    Ok(def)
}

#[cfg(test)]
mod tests;
