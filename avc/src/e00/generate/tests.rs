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

use std::fmt::Display;

use crate::{
    e00::generate::{Generator, collect_lines, join_lines},
    record::{Arc, Cnt, FileType, Lab, Pal, PalArc, Precision, Record, Rxp, Tol, Txt, Vertex},
    table::{Field, FieldInfo, FieldType, TableDef},
};

pub fn assert_lines_eq<E, A>(expected: &str, expected_name: E, actual: &str, actual_name: A)
where
    E: Display,
    A: Display,
{
    if expected != actual {
        eprintln!("Unexpected output:\n--- {expected_name}\n+++ {actual_name}");
        for result in diff::lines(expected, actual) {
            let (prefix, line) = match result {
                diff::Result::Left(line) => ('-', line),
                diff::Result::Both(line, _) => (' ', line),
                diff::Result::Right(line) => ('+', line),
            };
            let suffix = if line.trim_end().len() != line.len() {
                "$"
            } else {
                ""
            };
            eprintln!("{prefix}{line}{suffix}");
        }
        panic!();
    }
}

/// Generates every line for `record` in `precision` and compares them
/// against `expected`.
#[track_caller]
fn check(type_: FileType, precision: Precision, record: &Record, expected: &[&str]) {
    let mut generator = Generator::new(precision);
    let lines = collect_lines(|cont| generator.record(type_, record, cont).map(String::from));
    assert_lines_eq(
        &join_lines(expected),
        format!("{type_} expected"),
        &join_lines(&lines),
        format!("{type_} actual"),
    );

    // Once exhausted, the generator stays exhausted.
    assert_eq!(generator.record(type_, record, true), None);
}

fn v(x: f64, y: f64) -> Vertex {
    Vertex::new(x, y)
}

fn scenario_arc() -> Record {
    Record::Arc(Arc {
        arc_id: 1,
        user_id: 10,
        f_node: 1,
        t_node: 2,
        l_poly: 1,
        r_poly: 2,
        vertices: vec![v(0.0, 0.0), v(1.0, 1.0), v(2.0, 0.0)],
    })
}

#[test]
fn arc_section() {
    let mut generator = Generator::new(Precision::Single);
    let mut lines = vec![generator.start_section(FileType::Arc, "arc.adf").to_string()];
    lines.extend(collect_lines(|cont| {
        generator.record(FileType::Arc, &scenario_arc(), cont).map(String::from)
    }));
    lines.extend(collect_lines(|cont| {
        generator.end_section(FileType::Arc, cont).map(String::from)
    }));
    assert_lines_eq(
        &join_lines(&[
            "ARC  2",
            "         1        10         1         2         1         2         3",
            " 0.0000000E+00 0.0000000E+00 1.0000000E+00 1.0000000E+00",
            " 2.0000000E+00 0.0000000E+00",
            "        -1         0         0         0         0         0         0",
        ]),
        "expected",
        &join_lines(&lines),
        "actual",
    );
}

#[test]
fn double_precision_arc() {
    check(
        FileType::Arc,
        Precision::Double,
        &scenario_arc(),
        &[
            "         1        10         1         2         1         2         3",
            " 0.00000000000000E+00 0.00000000000000E+00",
            " 1.00000000000000E+00 1.00000000000000E+00",
            " 2.00000000000000E+00 0.00000000000000E+00",
        ],
    );
}

#[test]
fn arc_without_vertices() {
    check(
        FileType::Arc,
        Precision::Single,
        &Record::Arc(Arc::default()),
        &["         0         0         0         0         0         0         0"],
    );
}

fn pal() -> Record {
    Record::Pal(Pal {
        poly_id: 1,
        min: v(-1.0, -2.0),
        max: v(3.0, 4.5),
        arcs: vec![
            PalArc {
                arc_id: 1,
                f_node: 1,
                adj_poly: 2,
            },
            PalArc {
                arc_id: -3,
                f_node: 4,
                adj_poly: 0,
            },
            PalArc {
                arc_id: 5,
                f_node: 6,
                adj_poly: 7,
            },
        ],
    })
}

#[test]
fn polygons() {
    check(
        FileType::Pal,
        Precision::Single,
        &pal(),
        &[
            "         3-1.0000000E+00-2.0000000E+00 3.0000000E+00 4.5000000E+00",
            "         1         1         2        -3         4         0",
            "         5         6         7",
        ],
    );
    check(
        FileType::Rpl,
        Precision::Double,
        &pal(),
        &[
            "         3-1.00000000000000E+00-2.00000000000000E+00",
            " 3.00000000000000E+00 4.50000000000000E+00",
            "         1         1         2        -3         4         0",
            "         5         6         7",
        ],
    );
}

#[test]
fn double_precision_polygon_sections_end_with_two_lines() {
    let mut generator = Generator::new(Precision::Double);
    let lines = collect_lines(|cont| generator.end_section(FileType::Pal, cont).map(String::from));
    assert_eq!(
        lines,
        [
            "        -1         0         0         0         0         0         0",
            " 0.00000000000000E+00 0.00000000000000E+00",
        ]
    );

    generator.set_precision(Precision::Single);
    let lines = collect_lines(|cont| generator.end_section(FileType::Rpl, cont).map(String::from));
    assert_eq!(lines.len(), 1);
}

#[test]
fn centroids() {
    check(
        FileType::Cnt,
        Precision::Single,
        &Record::Cnt(Cnt {
            poly_id: 1,
            coord: v(0.25, 0.75),
            labels: (1..=9).collect(),
        }),
        &[
            "         9 2.5000000E-01 7.5000000E-01",
            "         1         2         3         4         5         6         7         8",
            "         9",
        ],
    );
}

#[test]
fn labels() {
    let lab = Record::Lab(Lab {
        value: 7,
        poly_id: 3,
        coords: [v(1.0, 2.0), v(3.0, 4.0), v(5.0, 6.0)],
    });
    check(
        FileType::Lab,
        Precision::Single,
        &lab,
        &[
            "         7         3 1.0000000E+00 2.0000000E+00",
            " 3.0000000E+00 4.0000000E+00 5.0000000E+00 6.0000000E+00",
        ],
    );
    check(
        FileType::Lab,
        Precision::Double,
        &lab,
        &[
            "         7         3 1.00000000000000E+00 2.00000000000000E+00",
            " 3.00000000000000E+00 4.00000000000000E+00",
            " 5.00000000000000E+00 6.00000000000000E+00",
        ],
    );

    let mut generator = Generator::new(Precision::Double);
    assert_eq!(
        generator.end_section(FileType::Lab, false),
        Some("        -1         0 0.00000000000000E+00 0.00000000000000E+00")
    );
    assert_eq!(generator.end_section(FileType::Lab, true), None);
}

#[test]
fn single_line_records() {
    let tol = Record::Tol(Tol {
        index: 1,
        flag: 1,
        value: 0.002,
    });
    check(FileType::Tol, Precision::Single, &tol, &["         1         1 2.0000000E-03"]);
    check(
        FileType::Tol,
        Precision::Double,
        &tol,
        &["         1         1 2.00000000000000E-03"],
    );
    check(
        FileType::Rxp,
        Precision::Single,
        &Record::Rxp(Rxp { n1: 3, n2: -4 }),
        &["         3        -4"],
    );
    let mut generator = Generator::new(Precision::Single);
    assert_eq!(generator.end_section(FileType::Rxp, false), Some("        -1         0"));
}

#[test]
fn projection() {
    check(
        FileType::Prj,
        Precision::Single,
        &Record::Prj(vec!["Projection    UTM".into(), "Zone          17".into()]),
        &["Projection    UTM", "~", "Zone          17", "~"],
    );
    check(FileType::Prj, Precision::Single, &Record::Prj(Vec::new()), &[]);

    let mut generator = Generator::new(Precision::Double);
    assert_eq!(generator.start_section(FileType::Prj, "prj.adf"), "PRJ  3");
    assert_eq!(generator.end_section(FileType::Prj, false), Some("EOP"));
}

fn annotation() -> Txt {
    Txt {
        txt_id: 1,
        user_id: 4,
        level: 1,
        symbol: 5,
        num_vertices_line: 3,
        num_chars: 5,
        num_vertices_arrow: 2,
        just2: std::array::from_fn(|i| i as i16 + 1),
        height: 10.0,
        text: "Hello".into(),
        vertices: vec![v(0.0, 0.0), v(1.0, 2.0), v(3.0, 4.0), v(5.0, 6.0), v(7.0, 8.0)],
        ..Txt::default()
    }
}

#[test]
fn annotations() {
    let txt = Record::Txt(annotation());
    check(
        FileType::Txt,
        Precision::Single,
        &txt,
        &[
            "         1         2         2         5         5",
            " 1.0000000E+00 3.0000000E+00 0.0000000E+00 0.0000000E+00 2.0000000E+00",
            " 4.0000000E+00 0.0000000E+00 0.0000000E+00 5.0000000E+00 7.0000000E+00",
            " 0.0000000E+00 6.0000000E+00 8.0000000E+00 0.0000000E+00 1.0000000E+01",
            "-1.0000000E+20",
            "Hello",
        ],
    );
    check(
        FileType::Txt,
        Precision::Double,
        &txt,
        &[
            "         1         2         2         5         5",
            " 1.00000000000000E+00 3.00000000000000E+00 0.00000000000000E+00",
            " 0.00000000000000E+00 2.00000000000000E+00 4.00000000000000E+00",
            " 0.00000000000000E+00 0.00000000000000E+00 5.00000000000000E+00",
            " 7.00000000000000E+00 0.00000000000000E+00 6.00000000000000E+00",
            " 8.00000000000000E+00 0.00000000000000E+00 1.00000000000000E+01",
            "-1.0000000E+20",
            "Hello",
        ],
    );
}

#[test]
fn tx6_annotations() {
    let mut generator = Generator::new(Precision::Single);
    assert_eq!(generator.start_section(FileType::Tx6, "roads.txt"), "ROADS");
    assert_eq!(generator.start_section(FileType::Rpl, "Region.pal"), "REGION");

    check(
        FileType::Tx6,
        Precision::Single,
        &Record::Txt(annotation()),
        &[
            "         4         1         3         2         5         0         5",
            "         1         2         3         4         5         6         7",
            "         8         9        10        11        12        13        14",
            "        15        16        17        18        19        20",
            "         0         0         0         0         0         0         0",
            "         0         0         0         0         0         0         0",
            "         0         0         0         0         0         0",
            "-1.0000000E+20",
            " 1.0000000E+01 0.0000000E+00 0.0000000E+00",
            " 0.0000000E+00 0.0000000E+00",
            " 1.0000000E+00 2.0000000E+00",
            " 3.0000000E+00 4.0000000E+00",
            " 5.0000000E+00 6.0000000E+00",
            " 7.0000000E+00 8.0000000E+00",
            "Hello",
        ],
    );
}

#[test]
fn mismatched_records_produce_nothing() {
    let mut generator = Generator::new(Precision::Single);
    assert_eq!(generator.record(FileType::Lab, &scenario_arc(), false), None);
    assert_eq!(generator.record(FileType::Table, &Record::Table(Vec::new()), false), None);
}

pub fn test_table() -> TableDef {
    let mut def = TableDef::new(
        "TEST.PAT",
        vec![
            FieldInfo::new("AREA", FieldType::BinFloat, 8, 1, 1).with_format(18, 5),
            FieldInfo::new("PERIMETER", FieldType::BinFloat, 8, 9, 2).with_format(18, 5),
            FieldInfo::new("COVER#", FieldType::BinInt, 4, 17, 3).with_format(5, -1),
            FieldInfo::new("COVER-ID", FieldType::BinInt, 4, 21, 4).with_format(5, -1),
            FieldInfo::new("NAME", FieldType::Char, 20, 25, 5).with_format(20, -1),
        ],
    );
    def.num_records = 2;
    def
}

#[test]
fn table_header() {
    let def = test_table();
    let mut generator = Generator::new(Precision::Single);
    let lines = collect_lines(|cont| generator.table_header(&def, cont).map(String::from));
    assert_eq!(lines.len(), 6);
    assert_eq!(lines[0], "TEST.PAT                             5   5  44         2");
    assert_eq!(
        lines[1],
        "AREA              8-1   14-1  18 5 60-1  -1  -1-1                   1-"
    );
    assert_eq!(
        lines[3],
        "COVER#            4-1  174-1   5-1 50-1  -1  -1-1                   3-"
    );
}

#[test]
fn table_records_are_chunked() {
    let def = test_table();
    let mut generator = Generator::new(Precision::Single);
    let mut generate = |fields: &[Field]| {
        let mut lines = Vec::new();
        let mut cont = false;
        while let Some(line) = generator.table_record(&def, fields, cont).unwrap() {
            lines.push(line.to_string());
            cont = true;
        }
        lines
    };

    assert_eq!(
        generate(&[
            Field::Double(1.5),
            Field::Double(-123.25),
            Field::Int32(42),
            Field::Int32(-7),
            Field::Str("Main Street".into()),
        ]),
        [
            " 1.50000000000000000E+00-1.23250000000000000E+02         42         -7Main Stree",
            "t",
        ]
    );

    // A blank tail still produces its (empty) line.
    assert_eq!(
        generate(&[
            Field::Double(0.0),
            Field::Double(0.0),
            Field::Int32(0),
            Field::Int32(0),
            Field::Str(String::new()),
        ]),
        [
            " 0.00000000000000000E+00 0.00000000000000000E+00          0          0",
            "",
        ]
    );
}

#[test]
fn table_record_field_types() {
    let def = TableDef::new(
        "T.TAB",
        vec![
            FieldInfo::new("N", FieldType::BinInt, 2, 1, 1),
            FieldInfo::new("C", FieldType::Char, 3, 3, 2),
            FieldInfo::new("F", FieldType::FixNum, 6, 6, 3).with_format(6, 2),
            FieldInfo::new("R", FieldType::BinFloat, 4, 12, 4),
        ],
    );
    let mut generator = Generator::new(Precision::Double);
    let line = generator
        .table_record(
            &def,
            &[
                Field::Int16(-5),
                Field::Str("ab".into()),
                Field::Str(" 12.50".into()),
                Field::Float(3.25),
            ],
            false,
        )
        .unwrap();
    assert_eq!(line, Some("    -5ab  1.2500000E+01 3.2500000E+00"));

    assert!(generator
        .table_record(&def, &[Field::Int32(1)], false)
        .is_err());
}
