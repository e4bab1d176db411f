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

use std::path::Path;

use encoding_rs::WINDOWS_1252;
use tempfile::TempDir;

use crate::{
    binary::read::BinReader,
    e00::{
        generate::{Generator, collect_lines, join_lines, tests::assert_lines_eq},
        read::ReadOptions,
        write::{E00Writer, WriteOptions},
    },
    error::ErrorDetails,
    info,
    record::{FileType, Pal, PalArc, Precision, Record, Vertex},
};

const END_LINE: &str = "        -1         0         0         0         0         0         0";

const STREETS_E00: &[&str] = &[
    "EXP  0 /OLD/PLACE/STREETS.E00",
    "ARC  2",
    "         1        10         1         2         1         2         3",
    " 0.0000000E+00 0.0000000E+00 1.0000000E+00 1.0000000E+00",
    " 2.0000000E+00 0.0000000E+00",
    END_LINE,
    "LAB  2",
    "         7         3 1.0000000E+00 2.0000000E+00",
    " 3.0000000E+00 4.0000000E+00 5.0000000E+00 6.0000000E+00",
    "        -1         0 0.0000000E+00 0.0000000E+00",
    "TOL  2",
    "         1         1 2.5000000E-01",
    END_LINE,
    "TX6  2",
    "NAMES",
    END_LINE,
    "JABBERWOCKY",
    "SIN  2",
    "EOX",
    "PRJ  2",
    "Projection    GEOGRAPHIC",
    "~",
    "EOP",
    "IFO  2",
    "STREETS.AAT                          2   2   8         2",
    "LENGTH            4-1   14-1  12 3 60-1  -1  -1-1                   1-",
    "ROADS-ID          4-1   54-1   5-1 50-1  -1  -1-1                   2-",
    " 1.2500000E+01          3",
    "-4.0000000E+00         -1",
    "EOI",
    "EOS",
];

/// Imports `lines` into coverage `name` under `tmp`, returning the warnings.
fn import(tmp: &Path, name: &str, options: WriteOptions, lines: &[&str]) -> Vec<String> {
    let mut warnings = Vec::new();
    let mut writer = options
        .open(&tmp.join(name), |warning| warnings.push(warning.to_string()))
        .unwrap();
    for line in lines {
        writer.write_line(line).unwrap();
    }
    writer.close().unwrap();
    warnings
}

fn export(dir: &Path, exp_path: &str) -> Vec<String> {
    ReadOptions::new()
        .with_exp_path(exp_path)
        .open(dir)
        .unwrap()
        .collect::<Result<Vec<_>, _>>()
        .unwrap()
}

#[test]
fn import_then_export() {
    let tmp = TempDir::new().unwrap();
    let warnings = import(tmp.path(), "avenues", WriteOptions::new(), STREETS_E00);
    assert_eq!(warnings, ["Renaming table STREETS.AAT to AVENUES.AAT."]);

    let dir = tmp.path().join("avenues");
    for file in ["arc.adf", "arx.adf", "lab.adf", "tol.adf", "names.txt", "prj.adf"] {
        assert!(dir.join(file).is_file(), "{file}");
    }
    assert_eq!(
        info::list_tables(&tmp.path().join("info"), Some("avenues")).unwrap(),
        [("AVENUES.AAT".to_string(), "ARC0000".to_string())]
    );

    let mut expected = STREETS_E00.to_vec();
    expected[24] = "AVENUES.AAT                          2   2   8         2";
    let actual = export(&dir, "/OLD/PLACE/STREETS.E00");
    assert_lines_eq(
        &join_lines(&expected),
        "expected",
        &join_lines(&actual),
        "actual",
    );
}

#[test]
fn forced_precision() {
    let tmp = TempDir::new().unwrap();
    import(
        tmp.path(),
        "wide",
        WriteOptions::new().with_precision(Some(Precision::Double)),
        STREETS_E00,
    );
    let dir = tmp.path().join("wide");
    assert!(dir.join("par.adf").is_file());
    assert!(!dir.join("tol.adf").exists());

    let lines = export(&dir, "W.E00");
    assert_eq!(lines[1], "ARC  3");
    assert_eq!(lines[3], " 0.00000000000000E+00 0.00000000000000E+00");
    assert!(lines.contains(&"TOL  3".to_string()));
    assert!(lines.contains(&"SIN  3".to_string()));

    let reader = BinReader::open(&dir.join("arc.adf"), FileType::Arc, WINDOWS_1252).unwrap();
    assert_eq!(reader.precision(), Precision::Double);
}

#[test]
fn double_precision_polygons() {
    let pal = Record::Pal(Pal {
        poly_id: 1,
        min: Vertex::new(-1.5, -2.0),
        max: Vertex::new(3.0, 4.25),
        arcs: vec![
            PalArc {
                arc_id: 1,
                f_node: 1,
                adj_poly: 2,
            },
            PalArc {
                arc_id: -2,
                f_node: 3,
                adj_poly: 0,
            },
        ],
    });
    let mut generator = Generator::new(Precision::Double);
    let mut lines = vec![
        "EXP  0 P.E00".to_string(),
        generator.start_section(FileType::Pal, "pal.adf").to_string(),
    ];
    for _ in 0..2 {
        lines.extend(collect_lines(|cont| {
            generator.record(FileType::Pal, &pal, cont).map(String::from)
        }));
    }
    lines.extend(collect_lines(|cont| {
        generator.end_section(FileType::Pal, cont).map(String::from)
    }));
    lines.extend(["SIN  3".into(), "EOX".into(), "RPL  3".into()]);
    lines.push("ZONES".into());
    lines.extend(collect_lines(|cont| {
        generator.record(FileType::Rpl, &pal, cont).map(String::from)
    }));
    lines.extend(collect_lines(|cont| {
        generator.end_section(FileType::Rpl, cont).map(String::from)
    }));
    lines.extend(["JABBERWOCKY".into(), "EOS".into()]);

    let tmp = TempDir::new().unwrap();
    let input = lines.iter().map(String::as_str).collect::<Vec<_>>();
    let warnings = import(tmp.path(), "polys", WriteOptions::new(), &input);
    assert_eq!(warnings, Vec::<String>::new());

    let dir = tmp.path().join("polys");
    let mut reader = BinReader::open(&dir.join("pal.adf"), FileType::Pal, WINDOWS_1252).unwrap();
    assert_eq!(reader.precision(), Precision::Double);
    assert_eq!(reader.next_record().unwrap(), Some(&pal));
    let Record::Pal(mut second) = pal.clone() else {
        unreachable!()
    };
    second.poly_id = 2;
    assert_eq!(reader.next_record().unwrap(), Some(&Record::Pal(second)));
    assert_eq!(reader.next_record().unwrap(), None);

    let mut reader = BinReader::open(&dir.join("zones.pal"), FileType::Rpl, WINDOWS_1252).unwrap();
    assert_eq!(reader.next_record().unwrap(), Some(&pal));

    let exported = export(&dir, "P.E00");
    assert_lines_eq(&join_lines(&lines), "imported", &join_lines(&exported), "exported");
}

#[test]
fn ignored_lines() {
    let tmp = TempDir::new().unwrap();
    let warnings = import(
        tmp.path(),
        "notes",
        WriteOptions::new(),
        &[
            "EXP  0 NOTES.E00",
            "LOG  2",
            "1999-05-11 built",
            "EOL",
            "",
            "XYZ  2",
            "SIN  2\r",
            "EOX",
            "EOS",
        ],
    );
    assert_eq!(
        warnings,
        [
            "Ignoring E00 line \"1999-05-11 built\".",
            "Ignoring E00 line \"XYZ  2\".",
        ]
    );
    assert!(tmp.path().join("notes").is_dir());
    assert!(tmp.path().join("info/arc.dir").is_file());
}

#[test]
fn errors() {
    let tmp = TempDir::new().unwrap();
    let open = |name: &str| E00Writer::open(&tmp.path().join(name), WriteOptions::new(), |_| ());

    let mut writer = open("packed").unwrap();
    let error = writer.write_line("EXP  1 PACKED.E00").unwrap_err();
    assert!(matches!(error.details, ErrorDetails::CompressedE00));
    writer.close().unwrap();

    let error = open("packed").err().unwrap();
    assert!(matches!(error.details, ErrorDetails::CoverageExists(_)));

    let error = open("no good").err().unwrap();
    assert!(matches!(error.details, ErrorDetails::InvalidCoverName(_)));

    let mut writer = open("bad_arc").unwrap();
    writer.write_line("ARC  2").unwrap();
    let error = writer
        .write_line("         1        10         x")
        .unwrap_err();
    assert!(matches!(error.details, ErrorDetails::BadE00Line(_)));

    let mut writer = open("sneaky").unwrap();
    writer.write_line("TX6  2").unwrap();
    let error = writer.write_line("../ESCAPE").unwrap_err();
    assert!(matches!(error.details, ErrorDetails::BadE00Line(_)));
    assert!(!tmp.path().join("escape.txt").exists());
}
