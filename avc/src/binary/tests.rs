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
    io::Cursor,
    path::{Path, PathBuf},
};

use binrw::BinWrite;
use encoding_rs::WINDOWS_1252;

use crate::{
    binary::{BinReader, BinWriter, HEADER_SIZE, Header, index_path},
    record::{Arc, Cnt, FileType, Lab, Pal, PalArc, Precision, Record, Rxp, Tol, Txt, Vertex},
    table::{Field, FieldInfo, FieldType, TableDef},
};

#[test]
fn header_values() {
    let header = Header::for_file(FileType::Lab, Precision::Double).unwrap();
    assert_eq!((header.signature, header.precision, header.rec_size), (9993, -2, 28));
    let header = Header::for_file(FileType::Rpl, Precision::Single).unwrap();
    assert_eq!((header.signature, header.precision, header.rec_size), (9994, 11, 0));
    let header = Header::for_file(FileType::Tol, Precision::Double).unwrap();
    assert_eq!((header.signature, header.precision, header.rec_size), (9993, 40, 8));
    assert!(Header::for_file(FileType::Tol, Precision::Single).is_none());
    assert!(Header::for_file(FileType::Rxp, Precision::Double).is_none());
    assert!(Header::for_file(FileType::Prj, Precision::Double).is_none());

    let mut cursor = Cursor::new(Vec::new());
    Header {
        length: 0x1234,
        ..Header::for_file(FileType::Txt, Precision::Double).unwrap()
    }
    .write(&mut cursor)
    .unwrap();
    let bytes = cursor.into_inner();
    assert_eq!(bytes.len(), HEADER_SIZE as usize);
    assert_eq!(&bytes[..12], &[0, 0, 0x27, 0x0a, 0xff, 0xff, 0xff, 0xbd, 0, 0, 0, 0]);
    assert_eq!(&bytes[24..28], &[0, 0, 0x12, 0x34]);
    assert!(bytes[12..24].iter().chain(&bytes[28..]).all(|b| *b == 0));
}

#[test]
fn index_names() {
    let check = |type_, path: &str| index_path(type_, Path::new(path));
    assert_eq!(check(FileType::Arc, "cover/arc.adf"), Some(PathBuf::from("cover/arx.adf")));
    assert_eq!(check(FileType::Pal, "cover/PAL.ADF"), Some(PathBuf::from("cover/pax.adf")));
    assert_eq!(check(FileType::Rpl, "cover/region.pal"), Some(PathBuf::from("cover/region.pax")));
    assert_eq!(check(FileType::Cnt, "cover/cnt.adf"), Some(PathBuf::from("cover/cnx.adf")));
    assert_eq!(check(FileType::Tx6, "cover/road.txt"), Some(PathBuf::from("cover/road.txx")));
    assert_eq!(check(FileType::Txt, "cover/txt.adf"), Some(PathBuf::from("cover/txx.adf")));
    assert_eq!(check(FileType::Lab, "cover/lab.adf"), None);
    assert_eq!(check(FileType::Arc, "cover/other.adf"), None);
}

struct Written {
    data: Vec<u8>,
    index: Option<Vec<u8>>,
}

fn write(type_: FileType, precision: Precision, with_index: bool, records: &[Record]) -> Written {
    let index = with_index.then(|| Cursor::new(Vec::new()));
    let mut writer =
        BinWriter::new(Cursor::new(Vec::new()), index, type_, precision, WINDOWS_1252).unwrap();
    for record in records {
        writer.write_record(record).unwrap();
    }
    let (data, index) = writer.finish().unwrap();
    Written {
        data: data.into_inner(),
        index: index.map(Cursor::into_inner),
    }
}

fn read_all(type_: FileType, data: Vec<u8>) -> (Precision, Vec<Record>) {
    let mut reader = BinReader::new(Cursor::new(data), type_, WINDOWS_1252).unwrap();
    let mut records = Vec::new();
    while let Some(record) = reader.next_record().unwrap() {
        records.push(record.clone());
    }
    (reader.precision(), records)
}

#[track_caller]
fn assert_round_trip(type_: FileType, records: Vec<Record>) {
    for precision in [Precision::Single, Precision::Double] {
        let written = write(type_, precision, false, &records);
        let (read_precision, read) = read_all(type_, written.data);
        if type_ != FileType::Rxp && type_ != FileType::Prj {
            assert_eq!(read_precision, precision);
        }
        assert_eq!(read, records, "{type_} in {precision} precision");
    }
}

fn v(x: f64, y: f64) -> Vertex {
    Vertex::new(x, y)
}

#[test]
fn arcs() {
    assert_round_trip(
        FileType::Arc,
        vec![
            Record::Arc(Arc {
                arc_id: 1,
                user_id: 10,
                f_node: 1,
                t_node: 2,
                l_poly: 1,
                r_poly: 2,
                vertices: vec![v(0.0, 0.0), v(1.5, 1.25), v(2.0, -0.5)],
            }),
            Record::Arc(Arc {
                arc_id: 2,
                vertices: Vec::new(),
                ..Arc::default()
            }),
        ],
    );
}

#[test]
fn polygons_and_centroids() {
    let pal = Pal {
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
        ],
    };
    assert_round_trip(FileType::Pal, vec![Record::Pal(pal.clone())]);
    assert_round_trip(FileType::Rpl, vec![Record::Pal(pal)]);
    assert_round_trip(
        FileType::Cnt,
        vec![
            Record::Cnt(Cnt {
                poly_id: 1,
                coord: v(0.25, 0.75),
                labels: vec![5, 6, 7],
            }),
            Record::Cnt(Cnt {
                poly_id: 2,
                coord: v(0.0, 0.0),
                labels: Vec::new(),
            }),
        ],
    );
}

#[test]
fn labels_tolerances_and_regions() {
    assert_round_trip(
        FileType::Lab,
        vec![Record::Lab(Lab {
            value: 7,
            poly_id: 3,
            coords: [v(1.0, 2.0), v(1.0, 2.0), v(1.0, 2.0)],
        })],
    );
    assert_round_trip(
        FileType::Tol,
        (1..=10)
            .map(|index| {
                Record::Tol(Tol {
                    index,
                    flag: index % 2,
                    value: index as f64 / 4.0,
                })
            })
            .collect(),
    );
    assert_round_trip(FileType::Rxp, vec![Record::Rxp(Rxp { n1: 1, n2: 2 })]);
}

#[test]
fn annotations() {
    let txt = Txt {
        txt_id: 1,
        user_id: 4,
        level: 1,
        symbol: 2,
        num_vertices_line: 2,
        num_chars: 5,
        num_vertices_arrow: -1,
        just1: [1; 20],
        just2: [2; 20],
        height: 12.5,
        text: "Hello".into(),
        vertices: vec![v(1.0, 1.0), v(2.0, 2.0), v(3.0, 3.0)],
        ..Txt::default()
    };
    assert_round_trip(FileType::Txt, vec![Record::Txt(txt.clone())]);
    assert_round_trip(FileType::Tx6, vec![Record::Txt(txt)]);
}

#[test]
fn projection() {
    assert_round_trip(
        FileType::Prj,
        vec![Record::Prj(vec![
            "Projection    UTM".into(),
            "Zone          17".into(),
            "Units         METERS".into(),
        ])],
    );
}

#[test]
fn tolerance_header_depends_on_precision() {
    let tol = [Record::Tol(Tol {
        index: 1,
        flag: 1,
        value: 0.5,
    })];
    let single = write(FileType::Tol, Precision::Single, false, &tol).data;
    assert_eq!(single.len(), 12);
    assert_eq!(&single[..4], &[0, 0, 0, 1]);

    let double = write(FileType::Tol, Precision::Double, false, &tol).data;
    assert_eq!(double.len(), 100 + 16);
    assert_eq!(&double[..4], &[0, 0, 0x27, 0x09]);
    assert_eq!(&double[24..28], &[0, 0, 0, 58]);

    let mut reader = BinReader::new(Cursor::new(double), FileType::Tol, WINDOWS_1252).unwrap();
    assert_eq!(reader.precision(), Precision::Double);
    assert_eq!(reader.header().unwrap().signature, 9993);
    assert_eq!(reader.next_record().unwrap(), Some(&tol[0]));
}

#[test]
fn lengths_and_index_entries() {
    let arcs = [3, 1]
        .into_iter()
        .map(|n| {
            Record::Arc(Arc {
                vertices: vec![Vertex::default(); n],
                ..Arc::default()
            })
        })
        .collect::<Vec<_>>();
    let written = write(FileType::Arc, Precision::Single, true, &arcs);
    // 100-byte header, then 32 + 24 and 32 + 8 bytes of records.
    assert_eq!(written.data.len(), 196);
    assert_eq!(&written.data[24..28], &[0, 0, 0, 98]);

    let index = written.index.unwrap();
    assert_eq!(index.len(), 116);
    assert_eq!(&index[..4], &[0, 0, 0x27, 0x0a]);
    assert_eq!(&index[24..28], &[0, 0, 0, 58]);
    let mut expected = Cursor::new(Vec::new());
    (50i32, 24i32, 78i32, 16i32).write_be(&mut expected).unwrap();
    assert_eq!(&index[100..], expected.get_ref().as_slice());
}

#[test]
fn table_records() {
    let def = TableDef::new(
        "TEST.PAT",
        vec![
            FieldInfo::new("AREA", FieldType::BinFloat, 8, 1, 1),
            FieldInfo::new("ID", FieldType::BinInt, 4, 9, 2),
            FieldInfo::new("CODE", FieldType::BinInt, 2, 13, 3),
            FieldInfo::new("NAME", FieldType::Char, 5, 15, 4),
        ],
    );
    assert_eq!(def.rec_size, 19);
    let records = [
        Record::Table(vec![
            Field::Double(1.25),
            Field::Int32(-7),
            Field::Int16(3),
            Field::Str("abc  ".into()),
        ]),
        Record::Table(vec![
            Field::Double(-0.5),
            Field::Int32(100000),
            Field::Int16(-3),
            Field::Str("vwxyz".into()),
        ]),
    ];

    let mut writer =
        BinWriter::for_table(def.clone(), Cursor::new(Vec::new()), Precision::Single, WINDOWS_1252);
    for record in &records {
        writer.write_record(record).unwrap();
    }
    let (data, _) = writer.finish().unwrap();
    let data = data.into_inner();
    assert_eq!(data.len(), 40);
    assert_eq!(data[19], 0);

    let mut def = def;
    def.num_records = 2;
    let mut reader = BinReader::from_table(def, Some(Cursor::new(data)), WINDOWS_1252);
    assert_eq!(reader.next_record().unwrap(), Some(&records[0]));
    assert_eq!(reader.next_record().unwrap(), Some(&records[1]));
    assert_eq!(reader.next_record().unwrap(), None);
}
