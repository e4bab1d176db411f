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

//! Generating E00 lines from records.

use itertools::Itertools;

use crate::{
    e00::{LINE_LEN, RealFormat, atof, push_ints, push_real},
    error::ErrorDetails,
    record::{Arc, Cnt, FileType, Lab, Pal, Precision, Record, Rxp, Tol, Txt, Vertex},
    table::{Field, FieldType, TableDef},
};

/// End line shared by most sections.
const END_LINE: &str = "        -1         0         0         0         0         0         0";

/// Turns one record at a time into E00 lines.
///
/// Every method here follows the same protocol.  A call with `cont` false
/// returns the first line for a record and a call with `cont` true returns
/// the next one, until the record is exhausted and the call returns `None`.
/// The number of lines depends on the record and on the precision, so
/// callers keep calling until they get `None`.
///
/// The returned line is only valid until the next call.
#[derive(Debug)]
pub struct Generator {
    precision: Precision,
    buf: String,

    /// Record buffer for table records, emitted in chunks.
    record: String,

    /// Index of the next line (or for table records, the byte offset in
    /// `record` of the next chunk).
    cur: usize,

    /// Number of lines after the first (or bytes in `record`).
    count: usize,
}

impl Generator {
    pub fn new(precision: Precision) -> Self {
        Self {
            precision,
            buf: String::with_capacity(LINE_LEN + 1),
            record: String::new(),
            cur: 0,
            count: 0,
        }
    }

    pub fn precision(&self) -> Precision {
        self.precision
    }

    pub fn set_precision(&mut self, precision: Precision) {
        self.precision = precision;
    }

    /// The line most recently returned.
    pub fn line(&self) -> &str {
        &self.buf
    }

    /// Makes the next call with `cont` true return `None`.
    pub fn reset(&mut self) {
        self.cur = 0;
        self.count = 0;
    }

    fn real_format(&self) -> RealFormat {
        RealFormat::for_precision(self.precision)
    }

    fn push_real(&mut self, value: f64) {
        let format = self.real_format();
        push_real(&mut self.buf, value, format);
    }

    fn push_vertex(&mut self, vertex: &Vertex) {
        self.push_real(vertex.x);
        self.push_real(vertex.y);
    }

    fn start(&mut self, count: usize) {
        self.cur = 0;
        self.count = count;
        self.buf.clear();
    }

    /// Begins the next line after the first, or returns false if there
    /// are no more.
    fn advance(&mut self) -> bool {
        if self.cur < self.count {
            self.cur += 1;
            self.buf.clear();
            true
        } else {
            false
        }
    }

    /// Returns the line that opens a section for a file of type `type_`
    /// named `file_name`.
    ///
    /// Annotation, region and region polygon subsections are named after
    /// their file: `roads.txt` opens with `ROADS`.  Other sections open with
    /// their code and precision digit, e.g. `ARC  2`.
    pub fn start_section(&mut self, type_: FileType, file_name: &str) -> &str {
        self.reset();
        self.buf.clear();
        match type_ {
            FileType::Tx6 | FileType::Rxp | FileType::Rpl => {
                let stem = file_name.split('.').next().unwrap_or_default();
                self.buf.push_str(&stem.to_uppercase());
            }
            _ => {
                self.buf.push_str(type_.code());
                self.buf.push_str("  ");
                self.buf.push(self.precision.e00_code());
            }
        }
        &self.buf
    }

    /// Returns the lines that close a section of type `type_`.
    pub fn end_section(&mut self, type_: FileType, cont: bool) -> Option<&str> {
        if !cont {
            let double_pal = self.precision == Precision::Double
                && matches!(type_, FileType::Pal | FileType::Rpl);
            self.start(if double_pal { 1 } else { 0 });
            match type_ {
                FileType::Lab => {
                    self.buf.push_str("        -1         0");
                    self.push_real(0.0);
                    self.push_real(0.0);
                }
                FileType::Prj => self.buf.push_str("EOP"),
                FileType::Rxp => self.buf.push_str("        -1         0"),
                FileType::Unknown | FileType::Table => return None,
                _ => self.buf.push_str(END_LINE),
            }
        } else if self.advance() {
            self.push_real(0.0);
            self.push_real(0.0);
        } else {
            return None;
        }
        Some(&self.buf)
    }

    /// Generates lines for `record`, which must have the shape stored in
    /// files of type `type_`.  Returns `None` for a mismatched record, or
    /// for a table record, which needs [Generator::table_record].
    pub fn record(&mut self, type_: FileType, record: &Record, cont: bool) -> Option<&str> {
        match (type_, record) {
            (FileType::Arc, Record::Arc(arc)) => self.arc(arc, cont),
            (FileType::Pal | FileType::Rpl, Record::Pal(pal)) => self.pal(pal, cont),
            (FileType::Cnt, Record::Cnt(cnt)) => self.cnt(cnt, cont),
            (FileType::Lab, Record::Lab(lab)) => self.lab(lab, cont),
            (FileType::Tol, Record::Tol(tol)) => self.tol(tol, cont),
            (FileType::Txt, Record::Txt(txt)) => self.txt(txt, cont),
            (FileType::Tx6, Record::Txt(txt)) => self.tx6(txt, cont),
            (FileType::Rxp, Record::Rxp(rxp)) => self.rxp(rxp, cont),
            (FileType::Prj, Record::Prj(lines)) => self.prj(lines, cont),
            _ => None,
        }
    }

    /// An arc is a header line followed by its vertices, one per line in
    /// double precision and two per line in single precision.
    pub fn arc(&mut self, arc: &Arc, cont: bool) -> Option<&str> {
        let n = arc.vertices.len();
        let per_line = self.vertices_per_line();
        if !cont {
            self.start(n.div_ceil(per_line));
            push_ints(
                &mut self.buf,
                [
                    arc.arc_id,
                    arc.user_id,
                    arc.f_node,
                    arc.t_node,
                    arc.l_poly,
                    arc.r_poly,
                    n as i32,
                ],
                10,
            );
        } else if self.advance() {
            let first = (self.cur - 1) * per_line;
            for vertex in arc.vertices.iter().skip(first).take(per_line) {
                self.push_vertex(vertex);
            }
        } else {
            return None;
        }
        Some(&self.buf)
    }

    fn vertices_per_line(&self) -> usize {
        match self.precision {
            Precision::Single => 2,
            Precision::Double => 1,
        }
    }

    /// A polygon is a header line with its arc count and bounding box (on
    /// two lines in double precision) followed by its arcs, two per line.
    pub fn pal(&mut self, pal: &Pal, cont: bool) -> Option<&str> {
        let n = pal.arcs.len();
        let extra = match self.precision {
            Precision::Single => 0,
            Precision::Double => 1,
        };
        if !cont {
            self.start(extra + n.div_ceil(2));
            push_ints(&mut self.buf, [n as i32], 10);
            self.push_vertex(&pal.min);
            if extra == 0 {
                self.push_vertex(&pal.max);
            }
        } else if self.advance() {
            if self.cur <= extra {
                self.push_vertex(&pal.max);
            } else {
                let first = (self.cur - 1 - extra) * 2;
                let values = pal.arcs[first..]
                    .iter()
                    .take(2)
                    .flat_map(|arc| [arc.arc_id, arc.f_node, arc.adj_poly]);
                push_ints(&mut self.buf, values, 10);
            }
        } else {
            return None;
        }
        Some(&self.buf)
    }

    /// A centroid is a header line followed by its label ids, 8 per line.
    pub fn cnt(&mut self, cnt: &Cnt, cont: bool) -> Option<&str> {
        if !cont {
            self.start(cnt.labels.len().div_ceil(8));
            push_ints(&mut self.buf, [cnt.labels.len() as i32], 10);
            self.push_vertex(&cnt.coord);
        } else if self.advance() {
            let first = (self.cur - 1) * 8;
            push_ints(&mut self.buf, cnt.labels[first..].iter().take(8).copied(), 10);
        } else {
            return None;
        }
        Some(&self.buf)
    }

    pub fn lab(&mut self, lab: &Lab, cont: bool) -> Option<&str> {
        if !cont {
            self.start(match self.precision {
                Precision::Single => 1,
                Precision::Double => 2,
            });
            push_ints(&mut self.buf, [lab.value, lab.poly_id], 10);
            self.push_vertex(&lab.coords[0]);
        } else if self.advance() {
            match (self.precision, self.cur) {
                (Precision::Single, _) => {
                    self.push_vertex(&lab.coords[1]);
                    self.push_vertex(&lab.coords[2]);
                }
                (Precision::Double, line) => self.push_vertex(&lab.coords[line]),
            }
        } else {
            return None;
        }
        Some(&self.buf)
    }

    pub fn tol(&mut self, tol: &Tol, cont: bool) -> Option<&str> {
        if cont {
            return None;
        }
        self.start(0);
        push_ints(&mut self.buf, [tol.index, tol.flag], 10);
        self.push_real(tol.value);
        Some(&self.buf)
    }

    pub fn rxp(&mut self, rxp: &Rxp, cont: bool) -> Option<&str> {
        if cont {
            return None;
        }
        self.start(0);
        push_ints(&mut self.buf, [rxp.n1, rxp.n2], 10);
        Some(&self.buf)
    }

    /// Projection lines each come out followed by a `~` line.  There is no
    /// header, so the first call returns the first text line, or `None` if
    /// there are no lines.
    pub fn prj(&mut self, lines: &[String], cont: bool) -> Option<&str> {
        if !cont {
            self.start(lines.len() * 2);
        }
        if self.cur >= self.count {
            return None;
        }
        self.buf.clear();
        match lines.get(self.cur / 2) {
            Some(line) if self.cur % 2 == 0 => self.buf.push_str(line),
            _ => self.buf.push('~'),
        }
        self.cur += 1;
        Some(&self.buf)
    }

    /// A `TXT` annotation.  After the header come 15 reals laid out as in
    /// [txt_values], then the `f_1e2` value (always in single precision),
    /// then the text.
    pub fn txt(&mut self, txt: &Txt, cont: bool) -> Option<&str> {
        let per_line = self.txt_values_per_line();
        let value_lines = 15 / per_line;
        if !cont {
            self.start(value_lines + 2);
            push_ints(
                &mut self.buf,
                [
                    txt.level,
                    txt.num_vertices_line.saturating_sub(1),
                    txt.num_vertices_arrow,
                    txt.symbol,
                    txt.num_chars,
                ],
                10,
            );
        } else if self.advance() {
            let line = self.cur - 1;
            if line < value_lines {
                let values = txt_values(txt);
                for value in &values[line * per_line..(line + 1) * per_line] {
                    self.push_real(*value);
                }
            } else if line == value_lines {
                push_real(&mut self.buf, txt.f_1e2.into(), RealFormat::Single);
            } else {
                self.buf.push_str(&txt.text);
            }
        } else {
            return None;
        }
        Some(&self.buf)
    }

    fn txt_values_per_line(&self) -> usize {
        match self.precision {
            Precision::Single => 5,
            Precision::Double => 3,
        }
    }

    /// A `TX6` annotation.  After the header come `just2` and `just1` on 3
    /// lines each, the `f_1e2` value (always in single precision), the
    /// height and the other two reals, one line per vertex, and finally the
    /// text.
    pub fn tx6(&mut self, txt: &Txt, cont: bool) -> Option<&str> {
        let n = txt.num_vertices();
        if !cont {
            self.start(8 + n + 1);
            push_ints(
                &mut self.buf,
                [
                    txt.user_id,
                    txt.level,
                    txt.num_vertices_line,
                    txt.num_vertices_arrow,
                    txt.symbol,
                    txt.n28,
                    txt.num_chars,
                ],
                10,
            );
        } else if self.advance() {
            match self.cur - 1 {
                line @ 0..6 => {
                    let just = if line < 3 { &txt.just2 } else { &txt.just1 };
                    let values = JUST_SPLITS[line % 3].clone().map(|i| i32::from(just[i]));
                    push_ints(&mut self.buf, values, 10);
                }
                6 => push_real(&mut self.buf, txt.f_1e2.into(), RealFormat::Single),
                7 => {
                    for value in [txt.height, txt.v2, txt.v3] {
                        self.push_real(value);
                    }
                }
                line if line < 8 + n => {
                    let vertex = txt.vertices.get(line - 8).copied().unwrap_or_default();
                    self.push_vertex(&vertex);
                }
                _ => self.buf.push_str(&txt.text),
            }
        } else {
            return None;
        }
        Some(&self.buf)
    }

    /// A table header is a summary line followed by one line per field.
    pub fn table_header(&mut self, def: &TableDef, cont: bool) -> Option<&str> {
        if !cont {
            self.start(def.fields.len());
            let name = def.name.chars().take(32).collect::<String>();
            let external = if def.external { "XX" } else { "  " };
            self.buf.push_str(&format!(
                "{name:<32}{external}{:4}{:4}{:4}{:10}",
                def.num_fields, def.num_fields, def.rec_size, def.num_records
            ));
        } else if self.advance() {
            let field = &def.fields[self.cur - 1];
            let name = field.name.chars().take(16).collect::<String>();
            let alt_name = field.alt_name.chars().take(16).collect::<String>();
            self.buf.push_str(&format!(
                "{name:<16}{:3}{:2}{:4}{:1}{:2}{:4}{:2}{:2}{:1}{:2}{:4}{:4}{:2}{alt_name:<16}{:4}-",
                field.size,
                field.v2,
                field.offset,
                field.v4,
                field.v5,
                field.fmt_width,
                field.fmt_prec,
                field.type1,
                field.type2,
                field.v10,
                field.v11,
                field.v12,
                field.v13,
                field.index
            ));
        } else {
            return None;
        }
        Some(&self.buf)
    }

    /// A table record is formatted all at once and then returned in
    /// 80-character chunks, each with its trailing spaces removed.  A record
    /// with no fields produces no lines.
    pub fn table_record(
        &mut self,
        def: &TableDef,
        fields: &[Field],
        cont: bool,
    ) -> Result<Option<&str>, ErrorDetails> {
        if !cont {
            self.record.clear();
            format_table_record(&mut self.record, def, fields)?;
            self.cur = 0;
            self.count = self.record.len();
        }
        if self.cur >= self.count {
            return Ok(None);
        }
        let rest = &self.record[self.cur..];
        let len = rest
            .char_indices()
            .nth(LINE_LEN)
            .map_or(rest.len(), |(offset, _)| offset);
        self.buf.clear();
        self.buf.push_str(rest[..len].trim_end_matches(' '));
        self.cur += len;
        Ok(Some(&self.buf))
    }
}

/// Indexes of the justification values on each of the 3 lines they
/// occupy.
const JUST_SPLITS: [std::ops::Range<usize>; 3] = [0..7, 7..14, 14..20];

/// Lays out the 15 reals of a `TXT` annotation:
///
/// - 0..4: x of line vertices 1 through 4 (vertex 0 is not exported);
/// - 4..8: y of the same;
/// - 8..11: x of the first 3 arrow vertices;
/// - 11..14: y of the same;
/// - 14: height.
///
/// Missing vertices are 0.
pub(crate) fn txt_values(txt: &Txt) -> [f64; 15] {
    let mut values = [0.0; 15];
    values[14] = txt.height;
    let line = i64::from(txt.num_vertices_line);
    let vertex = |index: i64| {
        usize::try_from(index)
            .ok()
            .and_then(|index| txt.vertices.get(index))
            .copied()
            .unwrap_or_default()
    };
    for i in 0..(line - 1).clamp(0, 4) {
        let v = vertex(i + 1);
        values[i as usize] = v.x;
        values[i as usize + 4] = v.y;
    }
    for i in 0..i64::from(txt.num_vertices_arrow.unsigned_abs()).min(3) {
        let v = vertex(i + line);
        values[i as usize + 8] = v.x;
        values[i as usize + 11] = v.y;
    }
    values
}

/// Appends the E00 form of `fields`, a record of table `def`, to `out`.
fn format_table_record(
    out: &mut String,
    def: &TableDef,
    fields: &[Field],
) -> Result<(), ErrorDetails> {
    if fields.len() != def.fields.len() {
        return Err(ErrorDetails::WrongRecordType(FileType::Table));
    }
    for (info, field) in def.fields.iter().zip(fields) {
        let size = info.size.max(0) as usize;
        match (info.checked_type()?, size, field) {
            (FieldType::Date | FieldType::Char | FieldType::FixInt, size, Field::Str(s)) => {
                let s = s.chars().take(size).collect::<String>();
                out.push_str(&format!("{s:<size$}"));
            }
            (FieldType::FixNum, _, Field::Str(s)) => {
                push_real(out, atof(s), RealFormat::Single);
            }
            (FieldType::BinInt, 4, Field::Int32(value)) => push_ints(out, [*value], 11),
            (FieldType::BinInt, 2, Field::Int16(value)) => push_ints(out, [i32::from(*value)], 6),
            (FieldType::BinFloat, 4, Field::Float(value)) => {
                push_real(out, f64::from(*value), RealFormat::Single)
            }
            (FieldType::BinFloat, 8, Field::Double(value)) => {
                push_real(out, *value, RealFormat::TableDouble)
            }
            _ => return Err(ErrorDetails::WrongRecordType(FileType::Table)),
        }
    }
    Ok(())
}

/// Collects every line `generate` produces for one record, for callers
/// that want them all at once.
pub fn collect_lines<F>(mut generate: F) -> Vec<String>
where
    F: FnMut(bool) -> Option<String>,
{
    let mut lines = Vec::new();
    let mut cont = false;
    while let Some(line) = generate(cont) {
        lines.push(line);
        cont = true;
    }
    lines
}

/// Joins `lines` into one newline-terminated string.
pub fn join_lines<S>(lines: &[S]) -> String
where
    S: AsRef<str>,
{
    lines.iter().map(|line| format!("{}\n", line.as_ref())).join("")
}

#[cfg(test)]
pub(crate) mod tests;
