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

//! Parsing E00 lines back into records.

use std::mem::take;

use crate::{
    e00::{Columns, LINE_LEN, RealFormat},
    error::{ErrorDetails, Result},
    record::{Arc, Cnt, FileType, Lab, Pal, PalArc, Precision, Record, Rxp, Tol, Txt, Vertex},
    table::{Field, FieldInfo, FieldType, TableDef},
};

/// Prefix of every end-of-section line except `EOP`.
const END_PREFIX: &str = "        -1         0";

/// Something [Parser::parse_line] finished assembling.
#[derive(Debug, PartialEq)]
pub enum Parsed<'a> {
    Record(&'a Record),
    /// The header of a table section.  The table's records follow.
    TableDef(&'a TableDef),
}

/// Turns E00 lines into records, one line at a time.
///
/// The caller drives the parser through the structure of the file.  At the
/// top level it offers each line to [Parser::parse_super_section_header] and
/// [Parser::parse_section_header].  Inside a section it offers each line to
/// [Parser::parse_section_end] and, if that returns false, to
/// [Parser::parse_line].  Some sections (projections and tables) have no end
/// line.  For those, [Parser::section_ended] becomes true after the last
/// record.
#[derive(Debug)]
pub struct Parser {
    section: FileType,
    super_section: FileType,
    precision: Precision,
    super_precision: Precision,
    name: String,
    record: Record,
    table: TableDef,

    /// Line of the current record that comes next; 0 for its first line.
    line: usize,

    /// Number of items (vertices, arcs, labels, fields) the current record
    /// or table header declared.
    expected: usize,

    /// Reals collected for a `TXT` annotation.
    reals: Vec<f64>,

    /// Table record being reassembled, and its length in characters.
    buf: String,
    buf_len: usize,
    record_len: usize,
    records_left: i32,

    /// Implicit id of the last record.
    id: i32,

    force_end: bool,

    /// True right after the end line of a double precision polygon
    /// section, which is followed by a second end line.
    trailer: bool,
}

impl Default for Parser {
    fn default() -> Self {
        Self::new()
    }
}

impl Parser {
    pub fn new() -> Self {
        Self {
            section: FileType::Unknown,
            super_section: FileType::Unknown,
            precision: Precision::Single,
            super_precision: Precision::Single,
            name: String::new(),
            record: Record::Prj(Vec::new()),
            table: TableDef::new("", Vec::new()),
            line: 0,
            expected: 0,
            reals: Vec::with_capacity(15),
            buf: String::new(),
            buf_len: 0,
            record_len: 0,
            records_left: 0,
            id: 0,
            force_end: false,
            trailer: false,
        }
    }

    /// Type of the section in progress, or [FileType::Unknown] between
    /// sections.
    pub fn section(&self) -> FileType {
        self.section
    }

    /// Type of the super-section in progress: [FileType::Tx6],
    /// [FileType::Rxp], [FileType::Rpl] or [FileType::Table], or
    /// [FileType::Unknown] outside one.
    pub fn super_section(&self) -> FileType {
        self.super_section
    }

    /// Precision of the section in progress, as its header line gave it.
    pub fn precision(&self) -> Precision {
        self.precision
    }

    /// Name of the subsection in progress, e.g. `ROADS` for the annotation
    /// subsection that came from `roads.txt`.  Empty for ordinary sections.
    pub fn section_name(&self) -> &str {
        &self.name
    }

    /// True once a section without an end line is complete.
    pub fn section_ended(&self) -> bool {
        self.force_end
    }

    /// Abandons the section in progress, keeping any super-section.
    pub fn reset(&mut self) {
        self.section = FileType::Unknown;
        self.name.clear();
        self.line = 0;
        self.expected = 0;
        self.buf.clear();
        self.buf_len = 0;
        self.force_end = false;
    }

    fn start_section(&mut self, type_: FileType, precision: Precision) {
        self.reset();
        self.trailer = false;
        self.section = type_;
        self.precision = precision;
        self.id = 0;
        if let Some(record) = Record::empty(type_) {
            self.record = record;
        }
    }

    /// Recognizes the first line of a section and starts parsing it:
    ///
    /// - At the top level, `ARC`, `PAL`, `CNT`, `LAB`, `TOL`, `TXT` or `PRJ`
    ///   followed by two spaces and a precision digit.
    ///
    /// - In an annotation, region or region polygon super-section, any line,
    ///   which names the subsection.
    ///
    /// - In an `IFO` super-section, any line.  It names the table and is
    ///   also the first line of the table's header, so it must be passed to
    ///   [Parser::parse_line] next.
    ///
    /// Call [Parser::parse_super_section_end] first to catch the end of a
    /// super-section.
    pub fn parse_section_header(&mut self, line: &str) -> Option<FileType> {
        match self.super_section {
            FileType::Tx6 | FileType::Rxp | FileType::Rpl => {
                let name = line.trim();
                if name.is_empty() {
                    return None;
                }
                self.start_section(self.super_section, self.super_precision);
                self.name = name.into();
            }
            FileType::Table => {
                if line.trim().is_empty() {
                    return None;
                }
                self.start_section(FileType::Table, self.super_precision);
            }
            _ => {
                let (code, precision) = split_header(line)?;
                let type_ = match code {
                    "ARC" => FileType::Arc,
                    "PAL" => FileType::Pal,
                    "CNT" => FileType::Cnt,
                    "LAB" => FileType::Lab,
                    "TOL" => FileType::Tol,
                    "TXT" => FileType::Txt,
                    "PRJ" => FileType::Prj,
                    _ => return None,
                };
                self.start_section(type_, precision);
            }
        }
        Some(self.section)
    }

    /// Recognizes the line that opens a super-section: `TX6` (or `TX7`),
    /// `RXP`, `RPL` or `IFO`, followed by two spaces and a precision digit.
    pub fn parse_super_section_header(&mut self, line: &str) -> Option<FileType> {
        let (code, precision) = split_header(line)?;
        let type_ = match code {
            "TX6" | "TX7" => FileType::Tx6,
            "RXP" => FileType::Rxp,
            "RPL" => FileType::Rpl,
            "IFO" => FileType::Table,
            _ => return None,
        };
        self.reset();
        self.trailer = false;
        self.super_section = type_;
        self.super_precision = precision;
        Some(type_)
    }

    /// Recognizes `JABBERWOCKY`, which ends an annotation, region or region
    /// polygon super-section, and `EOI`, which ends an `IFO` super-section.
    pub fn parse_super_section_end(&mut self, line: &str) -> bool {
        let end = match self.super_section {
            FileType::Tx6 | FileType::Rxp | FileType::Rpl => "JABBERWOCKY",
            FileType::Table => "EOI",
            _ => return false,
        };
        if !line.starts_with(end) {
            return false;
        }
        self.reset();
        self.trailer = false;
        self.super_section = FileType::Unknown;
        true
    }

    /// Recognizes the end of the section in progress.  With `reset`, also
    /// returns to the top level (or to the enclosing super-section).
    ///
    /// Sections without an end line end once [Parser::section_ended] is
    /// true, whatever `line` is.  That line does not belong to the section.
    ///
    /// A double precision `PAL` or `RPL` section ends with a second line of
    /// two zero reals.  This returns true for that line too, when it
    /// directly follows the first end line.
    pub fn parse_section_end(&mut self, line: &str, reset: bool) -> bool {
        if self.trailer && self.section == FileType::Unknown {
            let mut columns = Columns::new(line);
            let format = RealFormat::Double;
            if columns.real(format) == Some(0.0) && columns.real(format) == Some(0.0) {
                if reset {
                    self.trailer = false;
                }
                return true;
            }
            self.trailer = false;
        }

        let end = self.force_end
            || (self.line == 0
                && !matches!(
                    self.section,
                    FileType::Unknown | FileType::Prj | FileType::Table
                )
                && line.starts_with(END_PREFIX));
        if end && reset {
            let trailer = self.precision == Precision::Double
                && matches!(self.section, FileType::Pal | FileType::Rpl)
                && !self.force_end;
            self.reset();
            self.trailer = trailer;
        }
        end
    }

    /// Feeds one line of the section in progress.  Returns the record (or
    /// for a table, first the header) once its last line has been fed, and
    /// `None` while more lines are needed.
    pub fn parse_line(&mut self, line: &str) -> Result<Option<Parsed<'_>>> {
        if self.section == FileType::Table {
            return self.parse_table_line(line);
        }
        let bad_line = || ErrorDetails::BadE00Line(line.into());
        let precision = self.precision;
        let index = self.line;
        let complete = match (self.section, &mut self.record) {
            (FileType::Arc, Record::Arc(arc)) => {
                parse_arc(arc, &mut self.expected, index, line, precision)
            }
            (FileType::Pal | FileType::Rpl, Record::Pal(pal)) => {
                parse_pal(pal, &mut self.expected, &mut self.id, index, line, precision)
            }
            (FileType::Cnt, Record::Cnt(cnt)) => {
                parse_cnt(cnt, &mut self.expected, &mut self.id, index, line, precision)
            }
            (FileType::Lab, Record::Lab(lab)) => parse_lab(lab, index, line, precision),
            (FileType::Tol, Record::Tol(tol)) => parse_tol(tol, line, precision),
            (FileType::Rxp, Record::Rxp(rxp)) => parse_rxp(rxp, line),
            (FileType::Txt, Record::Txt(txt)) => {
                parse_txt(txt, &mut self.reals, &mut self.id, index, line, precision)
            }
            (FileType::Tx6, Record::Txt(txt)) => {
                parse_tx6(txt, &mut self.id, index, line, precision)
            }
            (FileType::Prj, Record::Prj(lines)) => {
                let done = parse_prj(lines, index, line);
                self.force_end = done;
                Some(done)
            }
            _ => None,
        };
        if complete.ok_or_else(bad_line)? {
            self.line = 0;
            Ok(Some(Parsed::Record(&self.record)))
        } else {
            self.line += 1;
            Ok(None)
        }
    }

    fn parse_table_line(&mut self, line: &str) -> Result<Option<Parsed<'_>>> {
        let bad_line = || ErrorDetails::BadE00Line(line.into());
        if self.force_end {
            return Err(bad_line().into());
        }

        if self.line == 0 {
            let (def, num_fields) = parse_table_summary(line).ok_or_else(bad_line)?;
            self.table = def;
            self.expected = num_fields;
            self.line = 1;
        } else if self.table.fields.len() < self.expected {
            let field = parse_field_line(line).ok_or_else(bad_line)?;
            self.table.fields.push(field);
            self.line += 1;
        } else {
            return self.parse_table_record_line(line);
        }

        if self.table.fields.len() < self.expected {
            return Ok(None);
        }
        self.table.num_fields = self.table.fields.len() as i16;
        self.record_len = self.table.e00_record_len()?;
        self.records_left = self.table.num_records;
        self.buf.clear();
        self.buf_len = 0;
        // Records with no characters cannot be told apart, so a table whose
        // records are empty ends with its header.
        self.force_end = self.records_left <= 0 || self.record_len == 0;
        self.record = Record::Table(Vec::with_capacity(self.table.fields.len()));
        Ok(Some(Parsed::TableDef(&self.table)))
    }

    fn parse_table_record_line(&mut self, line: &str) -> Result<Option<Parsed<'_>>> {
        let bad_line = || ErrorDetails::BadE00Line(line.into());
        let chunk = (self.record_len - self.buf_len).min(LINE_LEN);
        let text = line.trim_end_matches([' ', '\r', '\n']);
        let len = text.chars().count();
        if len > chunk {
            return Err(bad_line().into());
        }
        self.buf.push_str(text);
        self.buf.extend(std::iter::repeat_n(' ', chunk - len));
        self.buf_len += chunk;
        self.line += 1;
        if self.buf_len < self.record_len {
            return Ok(None);
        }

        let Record::Table(fields) = &mut self.record else {
            return Err(bad_line().into());
        };
        decode_table_record(&self.table, &self.buf, fields).ok_or_else(bad_line)?;
        self.buf.clear();
        self.buf_len = 0;
        self.records_left -= 1;
        self.force_end = self.records_left <= 0;
        Ok(Some(Parsed::Record(&self.record)))
    }
}

/// Splits a line like `ARC  2` into its code and precision.
fn split_header(line: &str) -> Option<(&str, Precision)> {
    let code = line.get(..3)?;
    if line.get(3..5)? != "  " {
        return None;
    }
    let digit = line.get(5..)?.chars().next()?;
    let precision = Precision::from_e00_code(digit).ok()?;
    Some((code, precision))
}

fn next_id(id: &mut i32) -> i32 {
    *id += 1;
    *id
}

fn vertex(columns: &mut Columns, format: RealFormat) -> Option<Vertex> {
    Some(Vertex::new(columns.real(format)?, columns.real(format)?))
}

fn count(value: i32) -> Option<usize> {
    usize::try_from(value).ok()
}

// Each of the functions below takes the index of `line` within its record
// and returns whether the record is complete, or `None` if the line is
// malformed.

fn parse_arc(
    arc: &mut Arc,
    expected: &mut usize,
    index: usize,
    line: &str,
    precision: Precision,
) -> Option<bool> {
    let mut columns = Columns::new(line);
    if index == 0 {
        let [arc_id, user_id, f_node, t_node, l_poly, r_poly, n] = columns.ints::<7>(10)?;
        *expected = count(n)?;
        arc.arc_id = arc_id;
        arc.user_id = user_id;
        arc.f_node = f_node;
        arc.t_node = t_node;
        arc.l_poly = l_poly;
        arc.r_poly = r_poly;
        arc.vertices.clear();
    } else {
        let per_line = match precision {
            Precision::Single => 2,
            Precision::Double => 1,
        };
        let format = RealFormat::for_precision(precision);
        for _ in 0..per_line.min(*expected - arc.vertices.len()) {
            arc.vertices.push(vertex(&mut columns, format)?);
        }
    }
    Some(arc.vertices.len() == *expected)
}

fn parse_pal(
    pal: &mut Pal,
    expected: &mut usize,
    id: &mut i32,
    index: usize,
    line: &str,
    precision: Precision,
) -> Option<bool> {
    let format = RealFormat::for_precision(precision);
    let mut columns = Columns::new(line);
    let double = precision == Precision::Double;
    if index == 0 {
        *expected = count(columns.int(10)?)?;
        pal.poly_id = next_id(id);
        pal.min = vertex(&mut columns, format)?;
        if !double {
            pal.max = vertex(&mut columns, format)?;
        }
        pal.arcs.clear();
        return Some(!double && *expected == 0);
    }
    if double && index == 1 {
        pal.max = vertex(&mut columns, format)?;
    } else {
        for _ in 0..2.min(*expected - pal.arcs.len()) {
            let [arc_id, f_node, adj_poly] = columns.ints::<3>(10)?;
            pal.arcs.push(PalArc {
                arc_id,
                f_node,
                adj_poly,
            });
        }
    }
    Some(pal.arcs.len() == *expected)
}

fn parse_cnt(
    cnt: &mut Cnt,
    expected: &mut usize,
    id: &mut i32,
    index: usize,
    line: &str,
    precision: Precision,
) -> Option<bool> {
    let mut columns = Columns::new(line);
    if index == 0 {
        *expected = count(columns.int(10)?)?;
        cnt.poly_id = next_id(id);
        cnt.coord = vertex(&mut columns, RealFormat::for_precision(precision))?;
        cnt.labels.clear();
    } else {
        for _ in 0..8.min(*expected - cnt.labels.len()) {
            cnt.labels.push(columns.int(10)?);
        }
    }
    Some(cnt.labels.len() == *expected)
}

fn parse_lab(lab: &mut Lab, index: usize, line: &str, precision: Precision) -> Option<bool> {
    let format = RealFormat::for_precision(precision);
    let mut columns = Columns::new(line);
    match (precision, index) {
        (_, 0) => {
            [lab.value, lab.poly_id] = columns.ints::<2>(10)?;
            lab.coords[0] = vertex(&mut columns, format)?;
            Some(false)
        }
        (Precision::Single, _) => {
            lab.coords[1] = vertex(&mut columns, format)?;
            lab.coords[2] = vertex(&mut columns, format)?;
            Some(true)
        }
        (Precision::Double, index) => {
            *lab.coords.get_mut(index)? = vertex(&mut columns, format)?;
            Some(index == 2)
        }
    }
}

fn parse_tol(tol: &mut Tol, line: &str, precision: Precision) -> Option<bool> {
    let mut columns = Columns::new(line);
    [tol.index, tol.flag] = columns.ints::<2>(10)?;
    tol.value = columns.real(RealFormat::for_precision(precision))?;
    Some(true)
}

fn parse_rxp(rxp: &mut Rxp, line: &str) -> Option<bool> {
    [rxp.n1, rxp.n2] = Columns::new(line).ints::<2>(10)?;
    Some(true)
}

/// Parses a `TXT` annotation.
///
/// The format only carries line vertices 1 through 4 and the first 3 arrow
/// vertices.  Line vertex 0 becomes a copy of line vertex 1.
fn parse_txt(
    txt: &mut Txt,
    reals: &mut Vec<f64>,
    id: &mut i32,
    index: usize,
    line: &str,
    precision: Precision,
) -> Option<bool> {
    let format = RealFormat::for_precision(precision);
    let per_line = match precision {
        Precision::Single => 5,
        Precision::Double => 3,
    };
    let value_lines = 15 / per_line;
    let mut columns = Columns::new(line);
    match index {
        0 => {
            let [level, line_minus_1, arrow, symbol, num_chars] = columns.ints::<5>(10)?;
            *txt = Txt {
                txt_id: next_id(id),
                level,
                num_vertices_line: line_minus_1.checked_add(1)?,
                num_vertices_arrow: arrow,
                symbol,
                num_chars,
                vertices: take(&mut txt.vertices),
                text: take(&mut txt.text),
                ..Txt::default()
            };
            reals.clear();
        }
        index if index <= value_lines => {
            for _ in 0..per_line {
                reals.push(columns.real(format)?);
            }
        }
        index if index == value_lines + 1 => {
            txt.f_1e2 = columns.real(RealFormat::Single)? as f32;
        }
        _ => {
            txt.text.clear();
            txt.text.push_str(line);

            let line_len = txt.num_vertices_line.clamp(0, 5) as usize;
            let arrow_len = (txt.num_vertices_arrow.unsigned_abs() as usize).min(3);
            let slot = |i: usize| reals.get(i).copied().unwrap_or_default();
            txt.vertices.clear();
            txt.vertices.resize(line_len + arrow_len, Vertex::default());
            for i in 1..line_len {
                txt.vertices[i] = Vertex::new(slot(i - 1), slot(i + 3));
            }
            if line_len > 1 {
                txt.vertices[0] = txt.vertices[1];
            }
            for i in 0..arrow_len {
                txt.vertices[line_len + i] = Vertex::new(slot(i + 8), slot(i + 11));
            }
            txt.height = slot(14);
            return Some(true);
        }
    }
    Some(false)
}

fn parse_tx6(
    txt: &mut Txt,
    id: &mut i32,
    index: usize,
    line: &str,
    precision: Precision,
) -> Option<bool> {
    let format = RealFormat::for_precision(precision);
    let mut columns = Columns::new(line);
    match index {
        0 => {
            let [user_id, level, line_count, arrow, symbol, n28, num_chars] =
                columns.ints::<7>(10)?;
            *txt = Txt {
                txt_id: next_id(id),
                user_id,
                level,
                num_vertices_line: line_count,
                num_vertices_arrow: arrow,
                symbol,
                n28,
                num_chars,
                vertices: take(&mut txt.vertices),
                text: take(&mut txt.text),
                ..Txt::default()
            };
            txt.vertices.clear();
        }
        1..=6 => {
            let just = if index <= 3 {
                &mut txt.just2
            } else {
                &mut txt.just1
            };
            let range = match (index - 1) % 3 {
                0 => 0..7,
                1 => 7..14,
                _ => 14..20,
            };
            for value in &mut just[range] {
                *value = i16::try_from(columns.int(10)?).ok()?;
            }
        }
        7 => txt.f_1e2 = columns.real(RealFormat::Single)? as f32,
        8 => {
            txt.height = columns.real(format)?;
            txt.v2 = columns.real(format)?;
            txt.v3 = columns.real(format)?;
        }
        _ if txt.vertices.len() < txt.num_vertices() => {
            txt.vertices.push(vertex(&mut columns, format)?);
        }
        _ => {
            txt.text.clear();
            txt.text.push_str(line);
            return Some(true);
        }
    }
    Some(false)
}

/// Projection text lines arrive each followed by a `~` line.  A line that
/// begins with `~` continues the line before it.  The record is complete at
/// `EOP`.
fn parse_prj(lines: &mut Vec<String>, index: usize, line: &str) -> bool {
    if index == 0 {
        lines.clear();
    }
    if line.starts_with("EOP") {
        return true;
    }
    match (line.strip_prefix('~'), lines.last_mut()) {
        (Some(rest), Some(last)) => last.push_str(rest),
        (Some(rest), None) if rest.is_empty() => (),
        _ => lines.push(line.into()),
    }
    false
}

/// Parses the first line of a table header: the name, the external flag,
/// the field counts, the record size and the record count.
fn parse_table_summary(line: &str) -> Option<(TableDef, usize)> {
    let name = line.get(..32)?.trim_end();
    let external = line.get(32..34)? == "XX";
    let mut columns = Columns::new(line.get(34..)?);
    let [num_fields, _, rec_size] = columns.ints::<3>(4)?;
    let num_records = columns.int(10)?;
    let mut def = TableDef::new(name, Vec::new());
    def.rec_size = i16::try_from(rec_size).ok()?;
    def.num_records = num_records;
    def.external = external;
    Some((def, count(num_fields)?))
}

/// Parses one field definition line of a table header.
fn parse_field_line(line: &str) -> Option<FieldInfo> {
    let name = line.get(..16)?.trim_end();
    let mut columns = Columns::new(line.get(16..)?);
    let mut int = |width| i16::try_from(columns.int(width)?).ok();
    let size = int(3)?;
    let v2 = int(2)?;
    let offset = int(4)?;
    let v4 = int(1)?;
    let v5 = int(2)?;
    let fmt_width = int(4)?;
    let fmt_prec = int(2)?;
    let type1 = int(2)?;
    let type2 = int(1)?;
    let v10 = int(2)?;
    let v11 = int(4)?;
    let v12 = int(4)?;
    let v13 = int(2)?;
    let alt_name = columns.text(16)?.trim_end().to_string();
    let index = i16::try_from(columns.int(4)?).ok()?;
    Some(FieldInfo {
        name: name.into(),
        size,
        v2,
        offset,
        v4,
        v5,
        fmt_width,
        fmt_prec,
        type1,
        type2,
        v10,
        v11,
        v12,
        v13,
        alt_name,
        index,
    })
}

/// Splits off the first `n` characters of `s`.
fn split_chars<'a>(s: &mut &'a str, n: usize) -> &'a str {
    let end = s.char_indices().nth(n).map_or(s.len(), |(offset, _)| offset);
    let (head, tail) = s.split_at(end);
    *s = tail;
    head
}

/// Decodes one reassembled table record.  A fixnum value is written back as
/// text right-justified in the field's size, with the field's number of
/// decimals.
fn decode_table_record(def: &TableDef, buf: &str, fields: &mut Vec<Field>) -> Option<()> {
    fields.clear();
    let mut rest = buf;
    for info in &def.fields {
        let text = split_chars(&mut rest, info.e00_len().ok()?);
        let number = || text.trim().parse::<f64>().ok();
        let size = info.size.max(0) as usize;
        let field = match (info.checked_type().ok()?, size) {
            (FieldType::FixNum, size) => {
                let decimals = info.fmt_prec.max(0) as usize;
                Field::Str(format!("{:>size$.decimals$}", number()?))
            }
            (FieldType::Date | FieldType::Char | FieldType::FixInt, _) => Field::Str(text.into()),
            (FieldType::BinInt, 4) => Field::Int32(text.trim().parse().ok()?),
            (FieldType::BinInt, _) => Field::Int16(text.trim().parse().ok()?),
            (FieldType::BinFloat, 4) => Field::Float(number()? as f32),
            (FieldType::BinFloat, _) => Field::Double(number()?),
        };
        fields.push(field);
    }
    Some(())
}
