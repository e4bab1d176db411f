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
    cell::RefCell,
    fmt::Display,
    fs::File,
    io::{Write, stdout},
    path::{Path, PathBuf},
};

use anyhow::{Result, anyhow};
use avc::{binary::BinReader, record::FileType};
use clap::{Args, ValueEnum};
use encoding_rs::{Encoding, WINDOWS_1252};
use serde::Serialize;

use crate::parse_encoding;

/// Show the records in one coverage file or INFO table.
#[derive(Args, Clone, Debug)]
pub struct Show {
    /// File to show.  With `--table`, the INFO directory.
    #[arg(required = true)]
    input: PathBuf,

    /// Output file name.  If omitted, output is written to stdout.
    output: Option<PathBuf>,

    /// Type of file, e.g. `arc` or `tol`.  If omitted, the type is inferred
    /// from the file name.
    #[arg(long = "type", value_parser = parse_file_type, conflicts_with = "table")]
    type_: Option<FileType>,

    /// Show INFO table NAME from the INFO directory given as the input.
    #[arg(long, value_name = "NAME")]
    table: Option<String>,

    /// The encoding of text in annotations and tables.
    #[arg(short = 'e', long, value_parser = parse_encoding)]
    encoding: Option<&'static Encoding>,

    /// Output format.
    #[arg(long, short = 'f', value_enum, default_value_t)]
    format: ShowFormat,
}

fn parse_file_type(arg: &str) -> Result<FileType> {
    FileType::from_name(arg)
        .filter(|type_| !matches!(type_, FileType::Table | FileType::Unknown))
        .ok_or_else(|| anyhow!("{arg}: unknown file type"))
}

/// Infers the type of a coverage file from its name: `arc.adf` is an arc
/// file, `roads.txt` is an annotation subclass, and so on.
fn infer_file_type(path: &Path) -> Option<FileType> {
    let name = path.file_name()?.to_str()?.to_ascii_lowercase();
    let (stem, extension) = name.rsplit_once('.')?;
    match extension {
        "adf" => FileType::from_name(stem).filter(|type_| *type_ != FileType::Table),
        "txt" => Some(FileType::Tx6),
        "rxp" => Some(FileType::Rxp),
        "pal" => Some(FileType::Rpl),
        _ => None,
    }
}

struct Output {
    writer: RefCell<Box<dyn Write>>,
    pretty: bool,
}

impl Output {
    fn show_json<T>(&self, value: &T) -> Result<()>
    where
        T: Serialize,
    {
        let mut writer = self.writer.borrow_mut();
        match self.pretty {
            true => serde_json::to_writer_pretty(&mut *writer, value)?,
            false => serde_json::to_writer(&mut *writer, value)?,
        };
        writeln!(writer)?;
        Ok(())
    }

    fn warn(&self, warning: &impl Display) {
        #[derive(Serialize)]
        struct Warning {
            warning: String,
        }
        let warning = Warning {
            warning: warning.to_string(),
        };
        let _ = self.show_json(&warning);
    }
}

impl Show {
    pub fn run(self) -> Result<()> {
        let output = Output {
            pretty: self.format == ShowFormat::Json,
            writer: RefCell::new(match &self.output {
                Some(output_file) => Box::new(File::create(output_file)?),
                None => Box::new(stdout()),
            }),
        };
        let encoding = self.encoding.unwrap_or(WINDOWS_1252);

        let mut reader = match &self.table {
            Some(name) => {
                BinReader::open_table(&self.input, name, encoding, &mut |warning| {
                    output.warn(&warning)
                })?
            }
            None => {
                let type_ = self
                    .type_
                    .or_else(|| infer_file_type(&self.input))
                    .ok_or_else(|| {
                        anyhow!(
                            "{}: cannot tell the type of file from its name (use --type)",
                            self.input.display()
                        )
                    })?;
                BinReader::open(&self.input, type_, encoding)?
            }
        };

        #[derive(Serialize)]
        struct Summary<'a> {
            #[serde(rename = "type")]
            type_: FileType,
            precision: avc::record::Precision,
            header: Option<&'a avc::binary::Header>,
            table: Option<&'a avc::table::TableDef>,
        }
        output.show_json(&Summary {
            type_: reader.file_type(),
            precision: reader.precision(),
            header: reader.header(),
            table: reader.table_def(),
        })?;
        while let Some(record) = reader.next_record()? {
            output.show_json(record)?;
        }
        output.writer.borrow_mut().flush()?;
        Ok(())
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
enum ShowFormat {
    /// Pretty-printed JSON.
    #[default]
    Json,
    /// Newline-delimited JSON.
    Ndjson,
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use avc::record::FileType;

    use super::infer_file_type;

    #[test]
    fn file_types_from_names() {
        for (name, expected) in [
            ("cover/arc.adf", Some(FileType::Arc)),
            ("cover/PAR.ADF", Some(FileType::Tol)),
            ("cover/roads.txt", Some(FileType::Tx6)),
            ("cover/txt.adf", Some(FileType::Txt)),
            ("cover/zones.pal", Some(FileType::Rpl)),
            ("cover/zones.rxp", Some(FileType::Rxp)),
            ("cover/arx.adf", None),
            ("cover/readme", None),
        ] {
            assert_eq!(infer_file_type(Path::new(name)), expected, "{name}");
        }
    }
}
