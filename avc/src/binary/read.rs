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

//! Reading records from coverage files.

use std::{
    fs::File,
    io::{BufReader, Cursor, Read, Seek},
    path::{Path, PathBuf},
};

use binrw::BinRead;
use encoding_rs::Encoding;
use log::{debug, trace};

use crate::{
    binary::{ALT_SIGNATURE, HEADER_SIZE, Header, SIGNATURE},
    error::{Error, ErrorDetails, Result, Warning},
    info,
    raw::RawReader,
    record::{Arc, Cnt, FileType, Lab, Pal, PalArc, Precision, Record, Rxp, Tol, Txt, Vertex},
    table::{Field, FieldType, TableDef},
};

enum Source<R> {
    Stream(RawReader<R>),
    /// Projection file, read all at once.  The flag is true once its lines
    /// have been returned.
    Lines(Vec<String>, bool),
    /// Table with no records.
    Empty,
}

/// Reads the records of one coverage file or INFO table in order.
///
/// The reader owns a single [Record] that each call to
/// [BinReader::next_record] overwrites.
pub struct BinReader<R = BufReader<File>> {
    path: Option<PathBuf>,
    type_: FileType,
    precision: Precision,
    header: Option<Header>,
    encoding: &'static Encoding,
    source: Source<R>,
    record: Record,
    table: Option<TableDef>,
    records_read: i32,
}

impl BinReader<BufReader<File>> {
    /// Opens the coverage file at `path` as a file of type `type_`.  Text is
    /// decoded with `encoding`.
    ///
    /// INFO tables must be opened with [BinReader::open_table] instead.
    pub fn open(path: &Path, type_: FileType, encoding: &'static Encoding) -> Result<Self> {
        debug!("opening {} as {type_}", path.display());
        let file = File::open(path).map_err(|error| Error::from(error).with_path(path))?;
        let mut reader = Self::new(BufReader::new(file), type_, encoding)
            .map_err(|error| error.with_path(path))?;
        reader.path = Some(path.to_path_buf());
        Ok(reader)
    }

    /// Opens table `name` in INFO directory `info_dir`.  Warnings about the
    /// table's definition are reported through `warn`.
    pub fn open_table(
        info_dir: &Path,
        name: &str,
        encoding: &'static Encoding,
        warn: &mut dyn FnMut(Warning),
    ) -> Result<Self> {
        let def = info::read_table_def(info_dir, name, warn)?;
        let path = def.data_file.clone();
        let data = match &path {
            Some(path) if def.num_records > 0 => {
                debug!("opening {} for table {}", path.display(), def.name);
                let file = File::open(path).map_err(|error| Error::from(error).with_path(path))?;
                Some(BufReader::new(file))
            }
            _ => None,
        };
        let mut reader = Self::from_table(def, data, encoding);
        reader.path = path;
        Ok(reader)
    }
}

impl<R> BinReader<R>
where
    R: Read + Seek,
{
    /// Reads a coverage file of type `type_` from `inner`, starting with its
    /// header if it has one.
    pub fn new(mut inner: R, type_: FileType, encoding: &'static Encoding) -> Result<Self> {
        let (source, precision, header) = match type_ {
            FileType::Table => return Err(ErrorDetails::UnsupportedFileType(type_).into()),
            FileType::Unknown => return Err(ErrorDetails::UnsupportedFileType(type_).into()),
            FileType::Prj => {
                let mut bytes = Vec::new();
                inner.read_to_end(&mut bytes)?;
                let (text, _) = encoding.decode_without_bom_handling(&bytes);
                let lines = text.lines().map(String::from).collect();
                (Source::Lines(lines, false), Precision::Single, None)
            }
            _ => {
                let mut raw = RawReader::new(inner);
                let (precision, header) = read_header(&mut raw, type_)?;
                (Source::Stream(raw), precision, header)
            }
        };
        Ok(Self {
            path: None,
            type_,
            precision,
            header,
            encoding,
            source,
            record: Record::empty(type_).ok_or(ErrorDetails::UnsupportedFileType(type_))?,
            table: None,
            records_read: 0,
        })
    }

    /// Reads the records of table `def` from `data`, which may be `None` if
    /// the table has no records.
    pub fn from_table(def: TableDef, data: Option<R>, encoding: &'static Encoding) -> Self {
        let source = match data {
            Some(data) if def.num_records > 0 => Source::Stream(RawReader::new(data)),
            _ => Source::Empty,
        };
        Self {
            path: None,
            type_: FileType::Table,
            precision: Precision::Single,
            header: None,
            encoding,
            source,
            record: Record::Table(Vec::with_capacity(def.fields.len())),
            table: Some(def),
            records_read: 0,
        }
    }

    pub fn file_type(&self) -> FileType {
        self.type_
    }

    pub fn precision(&self) -> Precision {
        self.precision
    }

    pub fn header(&self) -> Option<&Header> {
        self.header.as_ref()
    }

    /// The definition of the table being read, if this reader is for a table.
    pub fn table_def(&self) -> Option<&TableDef> {
        self.table.as_ref()
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// The record most recently returned by [BinReader::next_record].
    pub fn record(&self) -> &Record {
        &self.record
    }

    fn annotate(&self, error: Error) -> Error {
        match &self.path {
            Some(path) => error.with_path(path),
            None => error,
        }
    }

    /// Reads the next record.  Returns `None` at the end of the file.
    ///
    /// The returned record stays valid until the next call.
    pub fn next_record(&mut self) -> Result<Option<&Record>> {
        match self.read_next() {
            Ok(true) => {
                self.records_read += 1;
                trace!("{} record {}: {:?}", self.type_, self.records_read, self.record);
                Ok(Some(&self.record))
            }
            Ok(false) => Ok(None),
            Err(error) => Err(self.annotate(error)),
        }
    }

    fn read_next(&mut self) -> Result<bool> {
        let Self {
            precision,
            encoding,
            source,
            record,
            table,
            records_read,
            ..
        } = self;
        let precision = *precision;
        let encoding = *encoding;
        match source {
            Source::Empty => Ok(false),
            Source::Lines(lines, done) => {
                if *done {
                    return Ok(false);
                }
                *done = true;
                if let Record::Prj(prj) = record {
                    prj.clone_from(lines);
                }
                Ok(true)
            }
            Source::Stream(reader) => match record {
                Record::Arc(arc) => read_arc(reader, precision, arc),
                Record::Pal(pal) => read_pal(reader, precision, pal),
                Record::Cnt(cnt) => read_cnt(reader, precision, cnt),
                Record::Lab(lab) => read_lab(reader, precision, lab),
                Record::Tol(tol) => read_tol(reader, precision, tol),
                Record::Txt(txt) => read_txt(reader, precision, encoding, txt),
                Record::Rxp(rxp) => read_rxp(reader, rxp),
                Record::Table(fields) => match table {
                    Some(def) if *records_read < def.num_records => {
                        read_table_record(reader, def, encoding, fields)
                    }
                    _ => Ok(false),
                },
                Record::Prj(_) => Ok(false),
            },
        }
    }

    /// Goes back to the first record.
    pub fn rewind(&mut self) -> Result<()> {
        self.records_read = 0;
        let start = if self.header.is_some() { HEADER_SIZE } else { 0 };
        match &mut self.source {
            Source::Stream(reader) => reader.seek(start)?,
            Source::Lines(_, done) => *done = false,
            Source::Empty => (),
        }
        Ok(())
    }
}

fn read_header<R>(reader: &mut RawReader<R>, type_: FileType) -> Result<(Precision, Option<Header>)>
where
    R: Read + Seek,
{
    match type_ {
        FileType::Rxp => return Ok((Precision::Single, None)),
        FileType::Tol => {
            // tol.adf has no header.  par.adf, its double precision
            // counterpart, has one.
            if reader.eof()? || reader.read_i32()? != ALT_SIGNATURE {
                reader.seek(0)?;
                return Ok((Precision::Single, None));
            }
            reader.seek(0)?;
        }
        _ => (),
    }

    let bytes = reader.read_bytes::<{ HEADER_SIZE as usize }>()?;
    let header = Header::read(&mut Cursor::new(&bytes))?;
    if header.signature != SIGNATURE && header.signature != ALT_SIGNATURE {
        return Err(Error::new(Some(0), ErrorDetails::BadSignature(header.signature)));
    }
    let precision = match type_ {
        FileType::Tol => Precision::Double,
        _ => Precision::from_header(header.precision),
    };
    Ok((precision, Some(header)))
}

fn read_vertex<R>(reader: &mut RawReader<R>, precision: Precision) -> Result<Vertex>
where
    R: Read + Seek,
{
    let x = reader.read_real(precision)?;
    let y = reader.read_real(precision)?;
    Ok(Vertex { x, y })
}

fn read_count<R>(reader: &mut RawReader<R>) -> Result<usize>
where
    R: Read + Seek,
{
    Ok(reader.read_i32()?.max(0) as usize)
}

fn read_arc<R>(reader: &mut RawReader<R>, precision: Precision, arc: &mut Arc) -> Result<bool>
where
    R: Read + Seek,
{
    if reader.eof()? {
        return Ok(false);
    }
    arc.arc_id = reader.read_i32()?;
    reader.skip(4)?;
    arc.user_id = reader.read_i32()?;
    arc.f_node = reader.read_i32()?;
    arc.t_node = reader.read_i32()?;
    arc.l_poly = reader.read_i32()?;
    arc.r_poly = reader.read_i32()?;
    let n = read_count(reader)?;
    arc.vertices.clear();
    for _ in 0..n {
        arc.vertices.push(read_vertex(reader, precision)?);
    }
    Ok(true)
}

fn read_pal<R>(reader: &mut RawReader<R>, precision: Precision, pal: &mut Pal) -> Result<bool>
where
    R: Read + Seek,
{
    if reader.eof()? {
        return Ok(false);
    }
    pal.poly_id = reader.read_i32()?;
    reader.skip(4)?;
    pal.min = read_vertex(reader, precision)?;
    pal.max = read_vertex(reader, precision)?;
    let n = read_count(reader)?;
    pal.arcs.clear();
    for _ in 0..n {
        pal.arcs.push(PalArc {
            arc_id: reader.read_i32()?,
            f_node: reader.read_i32()?,
            adj_poly: reader.read_i32()?,
        });
    }
    Ok(true)
}

fn read_cnt<R>(reader: &mut RawReader<R>, precision: Precision, cnt: &mut Cnt) -> Result<bool>
where
    R: Read + Seek,
{
    if reader.eof()? {
        return Ok(false);
    }
    cnt.poly_id = reader.read_i32()?;
    reader.skip(4)?;
    cnt.coord = read_vertex(reader, precision)?;
    let n = read_count(reader)?;
    cnt.labels.clear();
    for _ in 0..n {
        cnt.labels.push(reader.read_i32()?);
    }
    Ok(true)
}

fn read_lab<R>(reader: &mut RawReader<R>, precision: Precision, lab: &mut Lab) -> Result<bool>
where
    R: Read + Seek,
{
    if reader.eof()? {
        return Ok(false);
    }
    lab.value = reader.read_i32()?;
    lab.poly_id = reader.read_i32()?;
    for coord in &mut lab.coords {
        *coord = read_vertex(reader, precision)?;
    }
    Ok(true)
}

fn read_tol<R>(reader: &mut RawReader<R>, precision: Precision, tol: &mut Tol) -> Result<bool>
where
    R: Read + Seek,
{
    if reader.eof()? {
        return Ok(false);
    }
    tol.index = reader.read_i32()?;
    tol.flag = reader.read_i32()?;
    tol.value = reader.read_real(precision)?;
    Ok(true)
}

fn read_txt<R>(
    reader: &mut RawReader<R>,
    precision: Precision,
    encoding: &'static Encoding,
    txt: &mut Txt,
) -> Result<bool>
where
    R: Read + Seek,
{
    if reader.eof()? {
        return Ok(false);
    }
    txt.txt_id = reader.read_i32()?;
    reader.skip(4)?;
    txt.user_id = reader.read_i32()?;
    txt.level = reader.read_i32()?;
    txt.f_1e2 = reader.read_f32()?;
    txt.symbol = reader.read_i32()?;
    txt.num_vertices_line = reader.read_i32()?;
    txt.n28 = reader.read_i32()?;
    txt.num_chars = reader.read_i32()?;
    txt.num_vertices_arrow = reader.read_i32()?;
    for just in &mut txt.just1 {
        *just = reader.read_i16()?;
    }
    for just in &mut txt.just2 {
        *just = reader.read_i16()?;
    }
    txt.height = reader.read_real(precision)?;
    txt.v2 = reader.read_real(precision)?;
    txt.v3 = reader.read_real(precision)?;

    let num_chars = txt.num_chars.max(0) as usize;
    let bytes = reader.read_vec(num_chars.div_ceil(4) * 4)?;
    let (text, _) = encoding.decode_without_bom_handling(&bytes[..num_chars]);
    txt.text.clear();
    txt.text.push_str(&text);

    txt.vertices.clear();
    for _ in 0..txt.num_vertices() {
        txt.vertices.push(read_vertex(reader, precision)?);
    }
    reader.skip(8)?;
    Ok(true)
}

fn read_rxp<R>(reader: &mut RawReader<R>, rxp: &mut Rxp) -> Result<bool>
where
    R: Read + Seek,
{
    if reader.eof()? {
        return Ok(false);
    }
    rxp.n1 = reader.read_i32()?;
    rxp.n2 = reader.read_i32()?;
    Ok(true)
}

fn read_table_record<R>(
    reader: &mut RawReader<R>,
    def: &TableDef,
    encoding: &'static Encoding,
    fields: &mut Vec<Field>,
) -> Result<bool>
where
    R: Read + Seek,
{
    fields.clear();
    let mut bytes_read = 0;
    for (index, info) in def.fields.iter().enumerate() {
        if reader.eof()? {
            if index == 0 {
                return Ok(false);
            }
            return Err(Error::new(Some(reader.position()), ErrorDetails::UnexpectedEof));
        }
        let size = info.size as usize;
        let field = match (info.checked_type()?, size) {
            (FieldType::BinInt, 4) => Field::Int32(reader.read_i32()?),
            (FieldType::BinInt, _) => Field::Int16(reader.read_i16()?),
            (FieldType::BinFloat, 4) => Field::Float(reader.read_f32()?),
            (FieldType::BinFloat, _) => Field::Double(reader.read_f64()?),
            (_, size) => {
                let bytes = reader.read_vec(size)?;
                Field::Str(encoding.decode_without_bom_handling(&bytes).0.into_owned())
            }
        };
        fields.push(field);
        bytes_read += size;
    }

    let rec_size = def.padded_rec_size();
    if bytes_read < rec_size {
        reader.skip((rec_size - bytes_read) as u64)?;
    }
    Ok(true)
}
