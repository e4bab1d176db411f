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

//! The INFO directory.
//!
//! Attribute tables do not live in a coverage directory.  They live in a
//! sibling directory named `info`, which holds tables for every coverage in
//! the workspace:
//!
//! - `arc.dir` lists the tables as a sequence of 380-byte entries with no
//!   header.  Each entry names a table and gives it a number `####`.
//!
//! - `arc####.nit` holds one 144-byte definition per field of table `####`.
//!   Deleted fields stay in the file with a nonpositive index.
//!
//! - `arc####.dat` holds the records of an internal table.  For an
//!   external table, it instead holds the path of the data file, relative
//!   to the INFO directory and padded with spaces to 80 bytes.
//!
//! Nothing here locks `arc.dir`.  Creating or deleting a table reads the
//! directory and then writes it, so two processes doing so at the same time
//! can lose an entry or assign the same number twice.

use std::{
    fs::{self, File, OpenOptions},
    io::{BufReader, BufWriter, Cursor},
    path::{Path, PathBuf},
};

use binrw::{BinRead, binrw};
use encoding_rs::WINDOWS_1252;
use log::debug;
use unicase::UniCase;

use crate::{
    error::{Error, ErrorDetails, Result, Warning},
    raw::{RawReader, RawWriter},
    record::Precision,
    table::{FieldInfo, TableDef},
};

/// Size of an `arc.dir` entry.
pub const DIR_ENTRY_SIZE: usize = 380;

/// Size of a field definition in an `arc####.nit` file.
pub const FIELD_ENTRY_SIZE: usize = 144;

/// Size of the data file pointer of an external table.
pub const EXTERNAL_PATH_SIZE: usize = 80;

#[binrw]
#[brw(big)]
#[derive(Clone, Debug)]
struct RawDirEntry {
    name: [u8; 32],
    info_file: [u8; 8],
    num_fields: i16,
    rec_size: i16,

    #[br(temp)]
    #[bw(calc = [b' '; 16])]
    _blanks: [u8; 16],

    #[br(temp)]
    #[bw(calc = 132)]
    _v132: i16,

    #[br(temp)]
    #[bw(calc = 0)]
    _v0: i16,

    num_records: i32,

    #[brw(pad_before = 10)]
    external: [u8; 2],

    #[brw(pad_before = 238, pad_after = 54)]
    #[br(temp)]
    #[bw(calc = [b' '; 8])]
    _trailer: [u8; 8],
}

#[binrw]
#[brw(big)]
#[derive(Clone, Debug)]
struct RawFieldEntry {
    name: [u8; 16],
    size: i16,
    v2: i16,
    offset: i16,
    v4: i16,
    v5: i16,
    fmt_width: i16,
    fmt_prec: i16,
    type1: i16,
    type2: i16,
    v10: i16,
    v11: i16,
    v12: i16,
    v13: i16,
    alt_name: [u8; 16],
    #[brw(pad_before = 56, pad_after = 28)]
    index: i16,
}

/// Decodes a fixed-width, space-padded name.
fn decode_name(bytes: &[u8]) -> String {
    let (name, _) = WINDOWS_1252.decode_without_bom_handling(bytes);
    name.trim_end_matches([' ', '\0']).into()
}

/// Encodes `name` into a space-padded array, truncating if necessary.
fn encode_name<const N: usize>(name: &str) -> [u8; N] {
    let (bytes, _, _) = WINDOWS_1252.encode(name);
    let mut array = [b' '; N];
    let n = bytes.len().min(N);
    array[..n].copy_from_slice(&bytes[..n]);
    array
}

/// One entry in `arc.dir`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DirEntry {
    pub name: String,
    /// E.g. `ARC0003`.
    pub info_file: String,
    pub num_fields: i16,
    pub rec_size: i16,
    pub num_records: i32,
    pub external: bool,
}

impl DirEntry {
    /// The table number encoded in the info file name, `3` for `ARC0003`.
    /// Like C `atoi`, this stops at the first non-digit and yields 0 if
    /// there are none.
    pub fn suffix(&self) -> i32 {
        let digits = self.info_file.get(3..).unwrap_or("");
        let digits = digits
            .trim_start()
            .split(|c: char| !c.is_ascii_digit())
            .next()
            .unwrap_or("");
        digits.parse().unwrap_or(0)
    }

    /// Base name shared by this table's files in the INFO directory, e.g.
    /// `arc0003`.
    pub fn file_stem(&self) -> String {
        self.info_file.to_ascii_lowercase()
    }

    fn matches(&self, name: &str) -> bool {
        self.name
            .get(..name.len())
            .is_some_and(|prefix| UniCase::new(prefix) == UniCase::new(name))
    }

    fn is_exactly(&self, name: &str) -> bool {
        UniCase::new(self.name.as_str()) == UniCase::new(name)
    }
}

impl From<RawDirEntry> for DirEntry {
    fn from(raw: RawDirEntry) -> Self {
        Self {
            name: decode_name(&raw.name),
            info_file: decode_name(&raw.info_file),
            num_fields: raw.num_fields,
            rec_size: raw.rec_size,
            num_records: raw.num_records,
            external: &raw.external == b"XX",
        }
    }
}

impl From<&DirEntry> for RawDirEntry {
    fn from(entry: &DirEntry) -> Self {
        Self {
            name: encode_name(&entry.name),
            info_file: encode_name(&entry.info_file),
            num_fields: entry.num_fields,
            rec_size: (entry.rec_size.max(0) + 1) / 2 * 2,
            num_records: entry.num_records,
            external: if entry.external { *b"XX" } else { *b"  " },
        }
    }
}

impl From<RawFieldEntry> for FieldInfo {
    fn from(raw: RawFieldEntry) -> Self {
        Self {
            name: decode_name(&raw.name),
            size: raw.size,
            v2: raw.v2,
            offset: raw.offset,
            v4: raw.v4,
            v5: raw.v5,
            fmt_width: raw.fmt_width,
            fmt_prec: raw.fmt_prec,
            type1: raw.type1,
            type2: raw.type2,
            v10: raw.v10,
            v11: raw.v11,
            v12: raw.v12,
            v13: raw.v13,
            alt_name: decode_name(&raw.alt_name),
            index: raw.index,
        }
    }
}

impl From<&FieldInfo> for RawFieldEntry {
    fn from(field: &FieldInfo) -> Self {
        Self {
            name: encode_name(&field.name),
            size: field.size,
            v2: field.v2,
            offset: field.offset,
            v4: field.v4,
            v5: field.v5,
            fmt_width: field.fmt_width,
            fmt_prec: field.fmt_prec,
            type1: field.type1,
            type2: field.type2,
            v10: field.v10,
            v11: field.v11,
            v12: field.v12,
            v13: field.v13,
            alt_name: encode_name(&field.alt_name),
            index: field.index,
        }
    }
}

/// Returns the path of `arc.dir` in `info_dir`.
pub fn arc_dir_path(info_dir: &Path) -> PathBuf {
    info_dir.join("arc.dir")
}

fn read_entries_from<R>(reader: &mut RawReader<R>) -> Result<Vec<DirEntry>>
where
    R: std::io::Read + std::io::Seek,
{
    let mut entries = Vec::new();
    while !reader.eof()? {
        let offset = reader.position();
        let bytes = match reader.read_bytes::<DIR_ENTRY_SIZE>() {
            Ok(bytes) => bytes,
            // A partial entry at the end of the file is ignored.
            Err(Error {
                details: ErrorDetails::UnexpectedEof,
                ..
            }) => break,
            Err(error) => return Err(error),
        };
        let raw = RawDirEntry::read(&mut Cursor::new(&bytes))
            .map_err(|error| Error::from(error).with_offset(offset))?;
        entries.push(raw.into());
    }
    Ok(entries)
}

/// Reads every entry in `info_dir/arc.dir`.
pub fn read_dir(info_dir: &Path) -> Result<Vec<DirEntry>> {
    let path = arc_dir_path(info_dir);
    let file = File::open(&path).map_err(|error| Error::from(error).with_path(&path))?;
    read_entries_from(&mut RawReader::new(BufReader::new(file)))
        .map_err(|error| error.with_path(&path))
}

/// Finds the entry for table `name`.  An entry named exactly `name`
/// (ignoring case) wins; otherwise the first entry whose name starts with
/// `name` is used.
pub fn find_entry<'a>(entries: &'a [DirEntry], name: &str) -> Option<(usize, &'a DirEntry)> {
    let name = name.trim_end();
    entries
        .iter()
        .enumerate()
        .find(|(_, entry)| entry.is_exactly(name))
        .or_else(|| entries.iter().enumerate().find(|(_, entry)| entry.matches(name)))
}

/// Lists `(table name, info file)` for the tables in `info_dir`.  With
/// `cover_name`, only the tables of that coverage are listed, that is,
/// those whose names begin with the first 28 characters of `cover_name`
/// followed by `.`.  Empty tables are included.
pub fn list_tables(info_dir: &Path, cover_name: Option<&str>) -> Result<Vec<(String, String)>> {
    let prefix = cover_name.map(|cover| {
        let cover = cover.char_indices().nth(28).map_or(cover, |(i, _)| &cover[..i]);
        format!("{cover}.")
    });
    Ok(read_dir(info_dir)?
        .into_iter()
        .filter(|entry| prefix.as_ref().is_none_or(|prefix| entry.matches(prefix)))
        .map(|entry| (entry.name, entry.info_file))
        .collect())
}

/// Reads the non-deleted field definitions of the table described by
/// `entry`, reporting each deleted field skipped via `warn`.
fn read_fields(
    info_dir: &Path,
    entry: &DirEntry,
    warn: &mut dyn FnMut(Warning),
) -> Result<Vec<FieldInfo>> {
    let path = info_dir.join(format!("{}.nit", entry.file_stem()));
    let file = File::open(&path).map_err(|error| Error::from(error).with_path(&path))?;
    let mut reader = RawReader::new(BufReader::new(file));
    let expected = entry.num_fields.max(0) as usize;
    let mut fields = Vec::with_capacity(expected);
    while fields.len() < expected {
        if reader.eof().map_err(|error| error.with_path(&path))? {
            return Err(Error::new(
                None,
                ErrorDetails::MissingFields {
                    table: entry.name.clone(),
                    expected,
                    found: fields.len(),
                },
            )
            .with_path(&path));
        }
        let offset = reader.position();
        let bytes = reader
            .read_bytes::<FIELD_ENTRY_SIZE>()
            .map_err(|error| error.with_path(&path))?;
        let field = FieldInfo::from(
            RawFieldEntry::read(&mut Cursor::new(&bytes))
                .map_err(|error| Error::from(error).with_offset(offset).with_path(&path))?,
        );
        if field.is_deleted() {
            warn(Warning::DeletedFieldSkipped {
                table: entry.name.clone(),
                field: field.name,
            });
        } else {
            fields.push(field);
        }
    }
    Ok(fields)
}

/// Reads the data file pointer of an external table.
fn read_external_path(path: &Path) -> Result<String> {
    let bytes = fs::read(path).map_err(|error| Error::from(error).with_path(path))?;
    let bytes = &bytes[..bytes.len().min(EXTERNAL_PATH_SIZE)];
    Ok(decode_name(bytes).trim_end().into())
}

/// Reads the definition of table `name` and locates its data file.
///
/// If the table has records and its data file size disagrees with the
/// record count in `arc.dir`, the count is corrected from the file size and
/// a warning is reported through `warn`.
pub fn read_table_def(
    info_dir: &Path,
    name: &str,
    warn: &mut dyn FnMut(Warning),
) -> Result<TableDef> {
    let entries = read_dir(info_dir)?;
    let (_, entry) = find_entry(&entries, name)
        .ok_or_else(|| Error::new(None, ErrorDetails::NoSuchTable(name.into())))?;
    let fields = read_fields(info_dir, entry, warn)?;

    let pointer = info_dir.join(format!("{}.dat", entry.file_stem()));
    let data_file = if entry.external {
        info_dir.join(read_external_path(&pointer)?)
    } else {
        pointer
    };

    let mut num_records = entry.num_records;
    if num_records > 0 && entry.rec_size > 0 {
        let size = fs::metadata(&data_file)
            .map_err(|error| Error::from(error).with_path(&data_file))?
            .len();
        let actual = (size / entry.rec_size as u64) as i32;
        if actual != num_records {
            warn(Warning::RecordCountMismatch {
                table: entry.name.clone(),
                stored: num_records,
                actual,
            });
            num_records = actual;
        }
    }

    debug!(
        "table {} is {} with {} fields, data in {}",
        entry.name,
        entry.info_file,
        fields.len(),
        data_file.display()
    );
    Ok(TableDef {
        name: entry.name.clone(),
        info_file: entry.info_file.clone(),
        num_fields: fields.len() as i16,
        rec_size: entry.rec_size,
        num_records,
        external: entry.external,
        data_file: Some(data_file),
        fields,
    })
}

/// Returns the data file of external table `name`, relative to the INFO
/// directory.
///
/// A table named `<cover>.<ext><subclass>` stores its data in
/// `../<cover>/<subclass>.<ext>`, or in `../<cover>/<ext>.adf` if there is no
/// subclass.  In double precision, `TIC` and `BND` tables use
/// `dbltic.adf` and `dblbnd.adf` instead.
pub fn external_data_path(name: &str, precision: Precision) -> Result<String, ErrorDetails> {
    let name = name.trim_end().to_ascii_lowercase();
    let (cover, rest) = name
        .split_once('.')
        .ok_or_else(|| ErrorDetails::BadTableName(name.clone()))?;
    let cover = cover.split(' ').next().unwrap_or("");
    let rest = rest.split(' ').next().unwrap_or("");
    let split = rest.char_indices().nth(3).map_or(rest.len(), |(i, _)| i);
    let (ext, subclass) = rest.split_at(split);
    if cover.is_empty() || ext.is_empty() {
        return Err(ErrorDetails::BadTableName(name));
    }

    Ok(if !subclass.is_empty() {
        format!("../{cover}/{subclass}.{ext}")
    } else if precision == Precision::Double && (ext == "tic" || ext == "bnd") {
        format!("../{cover}/dbl{ext}.adf")
    } else {
        format!("../{cover}/{ext}.adf")
    })
}

fn write_entry(writer: &mut RawWriter<&mut File>, entry: &DirEntry) -> Result<()> {
    writer.write_binrw(&RawDirEntry::from(entry))
}

/// Adds table `def` to `info_dir`, or replaces the existing table with the
/// same name, and writes its field definitions.  Returns a copy of `def`
/// with `info_file` and `data_file` filled in.
///
/// A replaced table keeps its number.  A new table gets one more than the
/// highest number in `arc.dir`, or 0 if it is empty.  For an external table,
/// this also writes the data file pointer.
pub fn create_table(info_dir: &Path, def: &TableDef, precision: Precision) -> Result<TableDef> {
    let dir_path = arc_dir_path(info_dir);
    let mut file = OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(false)
        .open(&dir_path)
        .map_err(|error| Error::from(error).with_path(&dir_path))?;
    let entries =
        read_entries_from(&mut RawReader::new(&mut file))
            .map_err(|error| error.with_path(&dir_path))?;

    let (index, suffix) = match find_entry(&entries, &def.name) {
        Some((index, entry)) => {
            debug!("reusing {} for table {}", entry.info_file, def.name);
            (index, entry.suffix())
        }
        None => {
            let max = entries.iter().map(DirEntry::suffix).max().unwrap_or(-1);
            (entries.len(), max + 1)
        }
    };

    let mut def = def.clone();
    def.info_file = format!("ARC{suffix:04}");
    def.num_fields = def.fields.len() as i16;
    let entry = DirEntry {
        name: def.name.clone(),
        info_file: def.info_file.clone(),
        num_fields: def.num_fields,
        rec_size: def.rec_size,
        num_records: def.num_records,
        external: def.external,
    };
    let mut writer = RawWriter::new(&mut file);
    writer.seek((index * DIR_ENTRY_SIZE) as u64)?;
    write_entry(&mut writer, &entry).map_err(|error| error.with_path(&dir_path))?;
    writer.flush()?;
    debug!("wrote arc.dir entry {index} for {} as {}", def.name, def.info_file);

    let stem = entry.file_stem();
    let nit_path = info_dir.join(format!("{stem}.nit"));
    let nit = File::create(&nit_path).map_err(|error| Error::from(error).with_path(&nit_path))?;
    let mut writer = RawWriter::new(BufWriter::new(nit));
    for field in &def.fields {
        writer
            .write_binrw(&RawFieldEntry::from(field))
            .map_err(|error| error.with_path(&nit_path))?;
    }
    writer.into_inner()?;

    let dat_path = info_dir.join(format!("{stem}.dat"));
    def.data_file = Some(if def.external {
        let relative = external_data_path(&def.name, precision)?;
        let dat = File::create(&dat_path).map_err(|error| Error::from(error).with_path(&dat_path))?;
        let mut writer = RawWriter::new(BufWriter::new(dat));
        writer.write_padded(relative.as_bytes(), EXTERNAL_PATH_SIZE)?;
        writer.into_inner()?;
        info_dir.join(relative)
    } else {
        dat_path
    });
    Ok(def)
}

/// Rewrites the record count of table `def` in `arc.dir`.
pub fn update_record_count(info_dir: &Path, def: &TableDef) -> Result<()> {
    let dir_path = arc_dir_path(info_dir);
    let mut file = OpenOptions::new()
        .read(true)
        .write(true)
        .open(&dir_path)
        .map_err(|error| Error::from(error).with_path(&dir_path))?;
    let entries = read_entries_from(&mut RawReader::new(&mut file))?;
    let Some((index, entry)) = entries
        .iter()
        .enumerate()
        .find(|(_, entry)| entry.info_file == def.info_file)
    else {
        return Err(Error::new(None, ErrorDetails::NoSuchTable(def.name.clone())));
    };
    let entry = DirEntry {
        num_records: def.num_records,
        ..entry.clone()
    };
    let mut writer = RawWriter::new(&mut file);
    writer.seek((index * DIR_ENTRY_SIZE) as u64)?;
    write_entry(&mut writer, &entry)?;
    writer.flush()
}

/// Removes the tables whose info files are listed in `info_files` from
/// `arc.dir`, along with their `.nit` and `.dat` files and, for external
/// tables, their data files.  Other entries keep their numbers.
pub fn remove_tables(info_dir: &Path, info_files: &[String]) -> Result<()> {
    let dir_path = arc_dir_path(info_dir);
    let entries = read_dir(info_dir)?;
    let (removed, kept): (Vec<_>, Vec<_>) = entries
        .into_iter()
        .partition(|entry| info_files.iter().any(|name| name == &entry.info_file));

    for entry in &removed {
        let stem = entry.file_stem();
        let dat_path = info_dir.join(format!("{stem}.dat"));
        if entry.external {
            if let Ok(relative) = read_external_path(&dat_path) {
                remove_if_present(&info_dir.join(relative))?;
            }
        }
        remove_if_present(&dat_path)?;
        remove_if_present(&info_dir.join(format!("{stem}.nit")))?;
        debug!("removed table {} ({})", entry.name, entry.info_file);
    }

    let mut file =
        File::create(&dir_path).map_err(|error| Error::from(error).with_path(&dir_path))?;
    let mut writer = RawWriter::new(&mut file);
    for entry in &kept {
        write_entry(&mut writer, entry)?;
    }
    writer.flush()
}

fn remove_if_present(path: &Path) -> Result<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(error) if error.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(error) => Err(Error::from(error).with_path(path)),
    }
}
