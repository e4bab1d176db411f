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

//! Writing records to coverage files.

use std::{
    fs::File,
    io::{BufWriter, Seek, Write},
    path::{Path, PathBuf},
};

use encoding_rs::Encoding;
use log::{debug, trace};

use crate::{
    binary::{Header, index_path},
    error::{Error, ErrorDetails, Result},
    info,
    raw::RawWriter,
    record::{Arc, Cnt, FileType, Lab, Pal, Precision, Record, Rxp, Tol, Txt, Vertex},
    table::{Field, FieldType, TableDef},
};

/// Offset of the file length in a [Header].
const LENGTH_OFFSET: u64 = 24;

/// Writes records to one coverage file or INFO table.
///
/// [BinWriter::close] must be called to complete the file headers.
pub struct BinWriter<W = BufWriter<File>> {
    path: Option<PathBuf>,
    type_: FileType,
    precision: Precision,
    encoding: &'static Encoding,
    writer: RawWriter<W>,
    index: Option<RawWriter<W>>,
    has_header: bool,
    table: Option<TableDef>,
    info_dir: Option<PathBuf>,
    records_written: i32,
}

fn create_file(path: &Path) -> Result<BufWriter<File>> {
    let file = File::create(path).map_err(|error| Error::from(error).with_path(path))?;
    Ok(BufWriter::new(file))
}

impl BinWriter<BufWriter<File>> {
    /// Creates a coverage file of type `type_` at `path`, along with its
    /// index file if it has one.
    pub fn create(
        path: &Path,
        type_: FileType,
        precision: Precision,
        encoding: &'static Encoding,
    ) -> Result<Self> {
        if type_ == FileType::Table {
            return Err(ErrorDetails::TableThroughGenericCreate.into());
        }
        debug!("creating {} as {type_} ({precision} precision)", path.display());
        let data = create_file(path)?;
        let index = index_path(type_, path)
            .map(|index_path| create_file(&index_path))
            .transpose()?;
        let mut writer = Self::new(data, index, type_, precision, encoding)
            .map_err(|error| error.with_path(path))?;
        writer.path = Some(path.to_path_buf());
        Ok(writer)
    }

    /// Creates table `def` in INFO directory `info_dir`, replacing any table
    /// with the same name, and opens its data file for writing.
    ///
    /// `def` is copied.  Its record count is only a starting point: closing
    /// the writer updates `arc.dir` if a different number of records was
    /// written.
    pub fn create_table(
        info_dir: &Path,
        def: &TableDef,
        precision: Precision,
        encoding: &'static Encoding,
    ) -> Result<Self> {
        let def = info::create_table(info_dir, def, precision)?;
        let path = def
            .data_file
            .clone()
            .unwrap_or_else(|| {
                info_dir.join(format!("{}.dat", def.info_file.to_ascii_lowercase()))
            });
        debug!("writing table {} to {}", def.name, path.display());
        let data = create_file(&path)?;
        let mut writer = Self::for_table(def, data, precision, encoding);
        writer.path = Some(path);
        writer.info_dir = Some(info_dir.to_path_buf());
        Ok(writer)
    }
}

impl<W> BinWriter<W>
where
    W: Write + Seek,
{
    /// Writes a coverage file of type `type_` to `data`, with its index, if
    /// any, to `index`.  Writes the headers immediately.
    pub fn new(
        data: W,
        index: Option<W>,
        type_: FileType,
        precision: Precision,
        encoding: &'static Encoding,
    ) -> Result<Self> {
        match type_ {
            FileType::Table => return Err(ErrorDetails::TableThroughGenericCreate.into()),
            FileType::Unknown => return Err(ErrorDetails::UnsupportedFileType(type_).into()),
            _ => (),
        }
        let mut writer = RawWriter::new(data);
        let mut index = index.map(RawWriter::new);
        let header = Header::for_file(type_, precision);
        if let Some(header) = &header {
            writer.write_binrw(header)?;
            if let Some(index) = &mut index {
                index.write_binrw(header)?;
            }
        }
        Ok(Self {
            path: None,
            type_,
            precision,
            encoding,
            writer,
            index,
            has_header: header.is_some(),
            table: None,
            info_dir: None,
            records_written: 0,
        })
    }

    /// Writes the records of table `def` to `data`.
    pub fn for_table(
        def: TableDef,
        data: W,
        precision: Precision,
        encoding: &'static Encoding,
    ) -> Self {
        Self {
            path: None,
            type_: FileType::Table,
            precision,
            encoding,
            writer: RawWriter::new(data),
            index: None,
            has_header: false,
            table: Some(def),
            info_dir: None,
            records_written: 0,
        }
    }

    pub fn file_type(&self) -> FileType {
        self.type_
    }

    pub fn precision(&self) -> Precision {
        self.precision
    }

    /// The table being written, if this writer is for a table.
    pub fn table_def(&self) -> Option<&TableDef> {
        self.table.as_ref()
    }

    fn annotate(&self, error: Error) -> Error {
        match &self.path {
            Some(path) => error.with_path(path),
            None => error,
        }
    }

    /// Appends `record`, which must have the shape of this file's records.
    pub fn write_record(&mut self, record: &Record) -> Result<()> {
        if !record.fits(self.type_) {
            return Err(ErrorDetails::WrongRecordType(self.type_).into());
        }
        trace!("writing {} record {:?}", self.type_, record);
        self.write_inner(record)
            .map_err(|error| self.annotate(error))?;
        self.records_written += 1;
        Ok(())
    }

    fn write_inner(&mut self, record: &Record) -> Result<()> {
        let precision = self.precision;
        let w = &mut self.writer;
        let start = (w.position() / 2) as i32;
        let rec_size = match record {
            Record::Arc(arc) => Some(write_arc(w, precision, arc)?),
            Record::Pal(pal) => Some(write_pal(w, precision, pal)?),
            Record::Cnt(cnt) => Some(write_cnt(w, precision, cnt)?),
            Record::Txt(txt) => Some(write_txt(w, precision, self.encoding, txt)?),
            Record::Lab(lab) => write_lab(w, precision, lab).map(|()| None)?,
            Record::Tol(tol) => write_tol(w, precision, tol).map(|()| None)?,
            Record::Rxp(rxp) => write_rxp(w, rxp).map(|()| None)?,
            Record::Prj(lines) => {
                for line in lines {
                    let (bytes, _, _) = self.encoding.encode(line);
                    w.write_bytes(&bytes)?;
                    w.write_bytes(b"\n")?;
                }
                None
            }
            Record::Table(fields) => {
                let def = self
                    .table
                    .as_ref()
                    .ok_or(ErrorDetails::WrongRecordType(self.type_))?;
                write_table_record(w, def, self.encoding, fields)?;
                None
            }
        };
        if let (Some(index), Some(rec_size)) = (&mut self.index, rec_size) {
            index.write_i32(start)?;
            index.write_i32(rec_size)?;
        }
        Ok(())
    }

    /// Completes the file and returns the underlying writers.
    ///
    /// This stores the final length of the file, in 2-byte words, in its
    /// header and in its index's header.  For a table, it updates the record
    /// count in `arc.dir` if it changed.
    pub fn finish(mut self) -> Result<(W, Option<W>)> {
        if self.has_header {
            patch_length(&mut self.writer)?;
            if let Some(index) = &mut self.index {
                patch_length(index)?;
            }
        }
        if let (Some(def), Some(info_dir)) = (&mut self.table, &self.info_dir) {
            if def.num_records != self.records_written {
                debug!(
                    "table {} declared {} records but {} were written",
                    def.name, def.num_records, self.records_written
                );
                def.num_records = self.records_written;
                info::update_record_count(info_dir, def)?;
            }
        }
        let data = self.writer.into_inner()?;
        let index = self.index.map(RawWriter::into_inner).transpose()?;
        Ok((data, index))
    }

    /// Completes the file.  See [BinWriter::finish].
    pub fn close(self) -> Result<()> {
        let path = self.path.clone();
        self.finish().map(|_| ()).map_err(|error| match &path {
            Some(path) => error.with_path(path),
            None => error,
        })
    }
}

fn patch_length<W>(writer: &mut RawWriter<W>) -> Result<()>
where
    W: Write + Seek,
{
    let length = (writer.position() / 2) as i32;
    writer.seek(LENGTH_OFFSET)?;
    writer.write_i32(length)
}

fn real_size(precision: Precision) -> i32 {
    precision.real_size() as i32
}

fn write_vertex<W>(w: &mut RawWriter<W>, precision: Precision, vertex: &Vertex) -> Result<()>
where
    W: Write + Seek,
{
    w.write_real(precision, vertex.x)?;
    w.write_real(precision, vertex.y)
}

/// Writes `arc` and returns its record size in 2-byte words.  The record
/// size excludes the leading id and size words.
fn write_arc<W>(w: &mut RawWriter<W>, precision: Precision, arc: &Arc) -> Result<i32>
where
    W: Write + Seek,
{
    let n = arc.vertices.len() as i32;
    let rec_size = (6 * 4 + n * 2 * real_size(precision)) / 2;
    for value in [
        arc.arc_id,
        rec_size,
        arc.user_id,
        arc.f_node,
        arc.t_node,
        arc.l_poly,
        arc.r_poly,
        n,
    ] {
        w.write_i32(value)?;
    }
    for vertex in &arc.vertices {
        write_vertex(w, precision, vertex)?;
    }
    Ok(rec_size)
}

fn write_pal<W>(w: &mut RawWriter<W>, precision: Precision, pal: &Pal) -> Result<i32>
where
    W: Write + Seek,
{
    let n = pal.arcs.len() as i32;
    let rec_size = (4 + n * 3 * 4 + 4 * real_size(precision)) / 2;
    w.write_i32(pal.poly_id)?;
    w.write_i32(rec_size)?;
    write_vertex(w, precision, &pal.min)?;
    write_vertex(w, precision, &pal.max)?;
    w.write_i32(n)?;
    for arc in &pal.arcs {
        w.write_i32(arc.arc_id)?;
        w.write_i32(arc.f_node)?;
        w.write_i32(arc.adj_poly)?;
    }
    Ok(rec_size)
}

fn write_cnt<W>(w: &mut RawWriter<W>, precision: Precision, cnt: &Cnt) -> Result<i32>
where
    W: Write + Seek,
{
    let n = cnt.labels.len() as i32;
    let rec_size = (4 + n * 4 + 2 * real_size(precision)) / 2;
    w.write_i32(cnt.poly_id)?;
    w.write_i32(rec_size)?;
    write_vertex(w, precision, &cnt.coord)?;
    w.write_i32(n)?;
    for label in &cnt.labels {
        w.write_i32(*label)?;
    }
    Ok(rec_size)
}

fn write_lab<W>(w: &mut RawWriter<W>, precision: Precision, lab: &Lab) -> Result<()>
where
    W: Write + Seek,
{
    w.write_i32(lab.value)?;
    w.write_i32(lab.poly_id)?;
    for coord in &lab.coords {
        write_vertex(w, precision, coord)?;
    }
    Ok(())
}

fn write_tol<W>(w: &mut RawWriter<W>, precision: Precision, tol: &Tol) -> Result<()>
where
    W: Write + Seek,
{
    w.write_i32(tol.index)?;
    w.write_i32(tol.flag)?;
    w.write_real(precision, tol.value)
}

fn write_txt<W>(
    w: &mut RawWriter<W>,
    precision: Precision,
    encoding: &'static Encoding,
    txt: &Txt,
) -> Result<i32>
where
    W: Write + Seek,
{
    let (text, _, _) = encoding.encode(&txt.text);
    // Readers take `num_chars` bytes, so the text field must hold at least that many.
    let text_len = text.len().max(txt.num_chars.max(0) as usize).div_ceil(4) * 4;
    let n = txt.num_vertices();
    let rec_size = (112 + 8 + text_len as i32 + (n as i32 * 2 + 3) * real_size(precision)) / 2;

    w.write_i32(txt.txt_id)?;
    w.write_i32(rec_size)?;
    w.write_i32(txt.user_id)?;
    w.write_i32(txt.level)?;
    w.write_f32(txt.f_1e2)?;
    w.write_i32(txt.symbol)?;
    w.write_i32(txt.num_vertices_line)?;
    w.write_i32(txt.n28)?;
    w.write_i32(txt.num_chars)?;
    w.write_i32(txt.num_vertices_arrow)?;
    for just in txt.just1.iter().chain(&txt.just2) {
        w.write_i16(*just)?;
    }
    for value in [txt.height, txt.v2, txt.v3] {
        w.write_real(precision, value)?;
    }
    w.write_padded(&text, text_len)?;
    for i in 0..n {
        let vertex = txt.vertices.get(i).copied().unwrap_or_default();
        write_vertex(w, precision, &vertex)?;
    }
    w.write_zeros(8)?;
    Ok(rec_size)
}

fn write_rxp<W>(w: &mut RawWriter<W>, rxp: &Rxp) -> Result<()>
where
    W: Write + Seek,
{
    w.write_i32(rxp.n1)?;
    w.write_i32(rxp.n2)
}

fn write_table_record<W>(
    w: &mut RawWriter<W>,
    def: &TableDef,
    encoding: &'static Encoding,
    fields: &[Field],
) -> Result<()>
where
    W: Write + Seek,
{
    if fields.len() != def.fields.len() {
        return Err(ErrorDetails::WrongRecordType(FileType::Table).into());
    }
    let mut bytes_written = 0;
    for (info, field) in def.fields.iter().zip(fields) {
        let size = info.size as usize;
        match (info.checked_type()?, size, field) {
            (type_, size, Field::Str(s)) if type_.is_text() => {
                let (bytes, _, _) = encoding.encode(s);
                w.write_padded(&bytes, size)?;
            }
            (FieldType::BinInt, 4, Field::Int32(value)) => w.write_i32(*value)?,
            (FieldType::BinInt, 2, Field::Int16(value)) => w.write_i16(*value)?,
            (FieldType::BinFloat, 4, Field::Float(value)) => w.write_f32(*value)?,
            (FieldType::BinFloat, 8, Field::Double(value)) => w.write_f64(*value)?,
            _ => return Err(ErrorDetails::WrongRecordType(FileType::Table).into()),
        }
        bytes_written += size;
    }
    let rec_size = def.padded_rec_size();
    if bytes_written < rec_size {
        w.write_zeros(rec_size - bytes_written)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests;
