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

//! Exporting a coverage as E00.
//!
//! [E00Reader] lays out the sections of a coverage once, when it is opened,
//! and then produces the E00 output one line at a time on demand.  The
//! order of the sections is fixed, because some software that reads E00
//! depends on it:
//!
//! 1. The `EXP  0` header.
//! 2. `ARC`, `CNT`, `LAB` and `PAL`, for whichever of `arc.adf`, `cnt.adf`,
//!    `lab.adf` and `pal.adf` exist.
//! 3. `TOL` for `tol.adf` and `par.adf`, then `TXT` for `txt.adf`.
//! 4. A `TX6` super-section holding every `*.txt` annotation file.
//! 5. `SIN` and `EOX`.
//! 6. `PRJ` for `prj.adf`.
//! 7. `RXP` and `RPL` super-sections for `*.rxp` and `*.pal`.
//! 8. An `IFO` super-section holding the coverage's INFO tables.
//! 9. `EOS`.

use std::{
    fs,
    io::Write,
    path::{Path, PathBuf},
};

use encoding_rs::{Encoding, WINDOWS_1252};
use log::debug;
use serde::Serialize;
use unicase::UniCase;

use crate::{
    binary::read::BinReader,
    coverage::CoverPath,
    e00::generate::Generator,
    error::{Error, ErrorDetails, Result, log_warning},
    info,
    record::{FileType, Precision, Record},
    table::{Field, TableDef},
};

/// One section of E00 output.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Section {
    /// [FileType::Unknown] for a literal line such as `EOS`.
    #[serde(rename = "type")]
    pub type_: FileType,

    /// The file name within the coverage directory, the table name for
    /// [FileType::Table], or the literal line for [FileType::Unknown].
    pub name: String,
}

impl Section {
    fn literal(line: impl Into<String>) -> Self {
        Self {
            type_: FileType::Unknown,
            name: line.into(),
        }
    }

    fn file(type_: FileType, name: impl Into<String>) -> Self {
        Self {
            type_,
            name: name.into(),
        }
    }
}

/// Options for exporting a coverage.
#[derive(Clone, Debug)]
pub struct ReadOptions {
    /// Encoding of text in annotations and tables.
    pub encoding: &'static Encoding,

    /// Path to put in the `EXP  0` line in place of the coverage's own.
    pub exp_path: Option<String>,

    /// INFO directory to use in place of the one beside the coverage.
    pub info_dir: Option<PathBuf>,
}

impl Default for ReadOptions {
    fn default() -> Self {
        Self {
            encoding: WINDOWS_1252,
            exp_path: None,
            info_dir: None,
        }
    }
}

impl ReadOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_encoding(self, encoding: &'static Encoding) -> Self {
        Self { encoding, ..self }
    }

    /// Returns `self` with the `EXP  0` line naming `exp_path`.
    pub fn with_exp_path(self, exp_path: impl Into<String>) -> Self {
        Self {
            exp_path: Some(exp_path.into()),
            ..self
        }
    }

    pub fn with_info_dir(self, info_dir: impl Into<PathBuf>) -> Self {
        Self {
            info_dir: Some(info_dir.into()),
            ..self
        }
    }

    /// Opens the coverage at `path` for export with these options.
    pub fn open(self, path: &Path) -> Result<E00Reader> {
        E00Reader::open(path, self)
    }
}

/// Where the reader is within the current section.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Step {
    NotStarted,
    Data,
    EndSection,
    TableHeader,
    TableData,
}

/// What produced the current line.
enum Produced {
    /// The name of the section with this index.
    Literal(usize),
    /// The generator.
    Generated,
}

/// Produces the E00 lines for a coverage.
pub struct E00Reader {
    cover: CoverPath,
    encoding: &'static Encoding,
    precision: Precision,
    sections: Vec<Section>,
    current: usize,
    step: Step,
    read_all: bool,
    generator: Generator,
    file: Option<BinReader>,
}

impl E00Reader {
    /// Opens the coverage at `path`, which may be the coverage directory or
    /// a file in it, and lays out its sections.
    pub fn open(path: &Path, options: ReadOptions) -> Result<Self> {
        let mut cover = CoverPath::resolve(path)?;
        if let Some(info_dir) = options.info_dir {
            cover = cover.with_info_dir(info_dir);
        }
        cover.check_info_dir()?;

        let exp_line = match &options.exp_path {
            Some(exp_path) => format!("EXP  0 {exp_path}"),
            None => cover.exp_line(),
        };
        let (sections, precision) = build_sections(&cover, exp_line, options.encoding)?;
        debug!(
            "coverage {} has {} sections in {precision} precision",
            cover.name,
            sections.len()
        );
        Ok(Self {
            cover,
            encoding: options.encoding,
            precision,
            sections,
            current: 0,
            step: Step::NotStarted,
            read_all: true,
            generator: Generator::new(precision),
            file: None,
        })
    }

    pub fn cover(&self) -> &CoverPath {
        &self.cover
    }

    /// The coverage precision, from the header of its first geometry file.
    pub fn precision(&self) -> Precision {
        self.precision
    }

    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    /// Returns the next line of output, or `None` after the last.
    ///
    /// After an error, the reader should be rewound or dropped.
    pub fn next_line(&mut self) -> Result<Option<&str>> {
        Ok(match self.advance()? {
            Some(Produced::Literal(index)) => Some(self.sections[index].name.as_str()),
            Some(Produced::Generated) => Some(self.generator.line()),
            None => None,
        })
    }

    /// Writes every remaining line to `out`, each followed by a new-line.
    pub fn write_to<W>(&mut self, mut out: W) -> Result<()>
    where
        W: Write,
    {
        while let Some(line) = self.next_line()? {
            writeln!(out, "{line}")?;
        }
        out.flush()?;
        Ok(())
    }

    /// Moves to the section of type `type_` whose name is `name`, ignoring
    /// case.  If `cont` is true, output continues through the following
    /// sections; otherwise it stops at the end of this one.
    pub fn goto_section(&mut self, type_: FileType, name: &str, cont: bool) -> Result<()> {
        let index = self
            .sections
            .iter()
            .position(|section| {
                section.type_ == type_ && UniCase::new(section.name.as_str()) == UniCase::new(name)
            })
            .ok_or_else(|| {
                Error::new(
                    None,
                    ErrorDetails::NoSuchSection {
                        type_,
                        name: name.into(),
                    },
                )
            })?;
        debug!("moving to {type_} section {name}");
        self.file = None;
        self.current = index;
        self.step = Step::NotStarted;
        self.read_all = cont;
        Ok(())
    }

    /// Starts over from the first section, continuing through all of them.
    pub fn rewind(&mut self) {
        self.file = None;
        self.current = 0;
        self.step = Step::NotStarted;
        self.read_all = true;
    }

    fn next_section(&mut self) {
        self.file = None;
        self.step = Step::NotStarted;
        if self.read_all {
            self.current += 1;
        } else {
            self.current = self.sections.len();
        }
    }

    fn advance(&mut self) -> Result<Option<Produced>> {
        loop {
            let Some(section) = self.sections.get(self.current) else {
                return Ok(None);
            };
            let type_ = section.type_;
            match (type_, self.step) {
                (FileType::Unknown, _) => {
                    let index = self.current;
                    self.next_section();
                    return Ok(Some(Produced::Literal(index)));
                }

                (FileType::Table, Step::NotStarted) => {
                    let file = self.file.insert(BinReader::open_table(
                        &self.cover.info_dir,
                        &section.name,
                        self.encoding,
                        &mut log_warning,
                    )?);
                    self.generator.reset();
                    if let Some(def) = file.table_def() {
                        self.generator.table_header(def, false);
                    }
                    self.step = Step::TableHeader;
                    return Ok(Some(Produced::Generated));
                }
                (FileType::Table, Step::TableHeader) => {
                    let def = self.file.as_ref().and_then(BinReader::table_def);
                    if let Some(def) = def
                        && self.generator.table_header(def, true).is_some()
                    {
                        return Ok(Some(Produced::Generated));
                    }
                    self.generator.reset();
                    self.step = Step::TableData;
                }
                (FileType::Table, _) => {
                    let Some(file) = self.file.as_mut() else {
                        self.next_section();
                        continue;
                    };
                    if let Some((def, fields)) = table_record(file)
                        && self.generator.table_record(def, fields, true)?.is_some()
                    {
                        return Ok(Some(Produced::Generated));
                    }
                    if file.next_record()?.is_none() {
                        self.next_section();
                        continue;
                    }
                    if let Some((def, fields)) = table_record(file)
                        && self.generator.table_record(def, fields, false)?.is_some()
                    {
                        return Ok(Some(Produced::Generated));
                    }
                }

                (_, Step::NotStarted) => {
                    let path = self.cover.file(&section.name);
                    self.file = Some(BinReader::open(&path, type_, self.encoding)?);
                    self.generator.start_section(type_, &section.name);
                    self.step = Step::Data;
                    return Ok(Some(Produced::Generated));
                }
                (_, Step::Data) => {
                    if let Some(file) = self.file.as_mut() {
                        if self.generator.record(type_, file.record(), true).is_some() {
                            return Ok(Some(Produced::Generated));
                        }
                        if file.next_record()?.is_some()
                            && self.generator.record(type_, file.record(), false).is_some()
                        {
                            return Ok(Some(Produced::Generated));
                        }
                    }
                    self.file = None;
                    self.step = Step::EndSection;
                    if self.generator.end_section(type_, false).is_some() {
                        return Ok(Some(Produced::Generated));
                    }
                    self.next_section();
                }
                (_, _) => {
                    if self.generator.end_section(type_, true).is_some() {
                        return Ok(Some(Produced::Generated));
                    }
                    self.next_section();
                }
            }
        }
    }
}

impl Iterator for E00Reader {
    type Item = Result<String>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_line()
            .map(|line| line.map(String::from))
            .transpose()
    }
}

/// Splits the current record of a table reader into the table definition
/// and the record's fields.
fn table_record(file: &BinReader) -> Option<(&TableDef, &[Field])> {
    match (file.table_def(), file.record()) {
        (Some(def), Record::Table(fields)) => Some((def, fields.as_slice())),
        _ => None,
    }
}

fn build_sections(
    cover: &CoverPath,
    exp_line: String,
    encoding: &'static Encoding,
) -> Result<(Vec<Section>, Precision)> {
    let exists = |name: &str| cover.file(name).is_file();
    let mut sections = vec![Section::literal(exp_line)];
    for (type_, name) in [
        (FileType::Arc, "arc.adf"),
        (FileType::Cnt, "cnt.adf"),
        (FileType::Lab, "lab.adf"),
        (FileType::Pal, "pal.adf"),
    ] {
        if exists(name) {
            sections.push(Section::file(type_, name));
        }
    }

    let precision = find_precision(cover, &sections, encoding);
    let code = precision.e00_code();

    for (type_, name) in [
        (FileType::Tol, "tol.adf"),
        (FileType::Tol, "par.adf"),
        (FileType::Txt, "txt.adf"),
    ] {
        if exists(name) {
            sections.push(Section::file(type_, name));
        }
    }

    let mut files = fs::read_dir(&cover.dir)
        .map_err(|error| Error::from(error).with_path(&cover.dir))?
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.path().is_file())
        .filter_map(|entry| entry.file_name().into_string().ok())
        .collect::<Vec<_>>();
    files.sort();

    add_super_section(&mut sections, FileType::Tx6, "TX6", code, ".txt", &files);
    sections.push(Section::literal(format!("SIN  {code}")));
    sections.push(Section::literal("EOX"));
    if exists("prj.adf") {
        sections.push(Section::file(FileType::Prj, "prj.adf"));
    }
    add_super_section(&mut sections, FileType::Rxp, "RXP", code, ".rxp", &files);
    add_super_section(&mut sections, FileType::Rpl, "RPL", code, ".pal", &files);

    let tables = info::list_tables(&cover.info_dir, Some(&cover.name))?;
    if !tables.is_empty() {
        sections.push(Section::literal(format!("IFO  {code}")));
        for (name, info_file) in tables {
            debug!("table {name} is {info_file}");
            sections.push(Section::file(FileType::Table, name));
        }
        sections.push(Section::literal("EOI"));
    }
    sections.push(Section::literal("EOS"));
    Ok((sections, precision))
}

/// Returns the precision in the header of the first geometry file that can
/// be opened, or single precision if there is none.
fn find_precision(
    cover: &CoverPath,
    sections: &[Section],
    encoding: &'static Encoding,
) -> Precision {
    sections
        .iter()
        .filter(|section| {
            matches!(
                section.type_,
                FileType::Arc | FileType::Pal | FileType::Rpl | FileType::Cnt | FileType::Lab
            )
        })
        .find_map(|section| {
            BinReader::open(&cover.file(&section.name), section.type_, encoding).ok()
        })
        .map_or(Precision::Single, |reader| reader.precision())
}

/// Adds a super-section with one section for each file in `files` with
/// extension `extension`.  Nothing is added if there are no such files.
fn add_super_section(
    sections: &mut Vec<Section>,
    type_: FileType,
    code: &str,
    precision: char,
    extension: &str,
    files: &[String],
) {
    let mut matching = files
        .iter()
        .filter(|name| {
            name.len() > extension.len()
                && name
                    .get(name.len() - extension.len()..)
                    .is_some_and(|tail| tail.eq_ignore_ascii_case(extension))
        })
        .peekable();
    if matching.peek().is_none() {
        return;
    }
    sections.push(Section::literal(format!("{code}  {precision}")));
    sections.extend(matching.map(|name| Section::file(type_, name.as_str())));
    sections.push(Section::literal("JABBERWOCKY"));
}
