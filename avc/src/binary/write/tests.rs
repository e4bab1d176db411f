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

use std::{fs, io::Cursor};

use binrw::BinWrite;
use encoding_rs::WINDOWS_1252;
use tempfile::TempDir;

use crate::{
    binary::{BinReader, BinWriter},
    error::ErrorDetails,
    info,
    record::{Arc, FileType, Lab, Precision, Record, Tol, Txt, Vertex},
    table::{Field, FieldInfo, FieldType, TableDef},
};

fn writer(type_: FileType, precision: Precision) -> BinWriter<Cursor<Vec<u8>>> {
    BinWriter::new(Cursor::new(Vec::new()), None, type_, precision, WINDOWS_1252).unwrap()
}

#[test]
fn arc_layout() {
    let mut writer = writer(FileType::Arc, Precision::Single);
    writer
        .write_record(&Record::Arc(Arc {
            arc_id: 3,
            user_id: 30,
            f_node: 4,
            t_node: 5,
            l_poly: 6,
            r_poly: 7,
            vertices: vec![Vertex::new(1.0, 2.0)],
        }))
        .unwrap();
    let (data, index) = writer.finish().unwrap();
    assert!(index.is_none());

    let mut expected = Cursor::new(Vec::new());
    (3i32, 16i32, 30i32, 4i32, 5i32, 6i32, 7i32, 1i32, 1.0f32, 2.0f32)
        .write_be(&mut expected)
        .unwrap();
    assert_eq!(&data.get_ref()[100..], expected.get_ref().as_slice());
    assert_eq!(&data.get_ref()[24..28], &[0, 0, 0, 70]);
}

#[test]
fn double_precision_tolerances_have_a_header() {
    let mut writer = writer(FileType::Tol, Precision::Double);
    writer
        .write_record(&Record::Tol(Tol {
            index: 1,
            flag: 0,
            value: 0.001,
        }))
        .unwrap();
    let (data, _) = writer.finish().unwrap();
    let data = data.into_inner();
    assert_eq!(data.len(), 116);
    assert_eq!(&data[100..108], &[0, 0, 0, 1, 0, 0, 0, 0]);
    assert_eq!(&data[108..], &0.001f64.to_be_bytes());
}

#[test]
fn missing_annotation_vertices_are_zero() {
    let mut writer = writer(FileType::Txt, Precision::Double);
    let txt = Txt {
        txt_id: 1,
        num_vertices_line: 2,
        num_chars: 2,
        text: "Hi".into(),
        vertices: vec![Vertex::new(5.0, 6.0)],
        ..Txt::default()
    };
    writer.write_record(&Record::Txt(txt)).unwrap();
    let (data, _) = writer.finish().unwrap();

    let mut reader =
        BinReader::new(Cursor::new(data.into_inner()), FileType::Txt, WINDOWS_1252).unwrap();
    let Some(Record::Txt(txt)) = reader.next_record().unwrap() else {
        panic!();
    };
    assert_eq!(txt.text, "Hi");
    assert_eq!(txt.vertices, [Vertex::new(5.0, 6.0), Vertex::default()]);
}

#[test]
fn records_must_match_the_file() {
    let mut writer = writer(FileType::Lab, Precision::Single);
    let error = writer
        .write_record(&Record::Tol(Tol::default()))
        .unwrap_err();
    assert!(matches!(error.details, ErrorDetails::WrongRecordType(FileType::Lab)));
    writer.write_record(&Record::Lab(Lab::default())).unwrap();
}

#[test]
fn table_values_must_match_fields() {
    let def = TableDef::new("T.TAB", vec![FieldInfo::new("N", FieldType::BinInt, 4, 1, 1)]);
    let mut writer =
        BinWriter::for_table(def, Cursor::new(Vec::new()), Precision::Single, WINDOWS_1252);
    let error = writer
        .write_record(&Record::Table(vec![Field::Int16(1)]))
        .unwrap_err();
    assert!(matches!(error.details, ErrorDetails::WrongRecordType(FileType::Table)));
    writer.write_record(&Record::Table(vec![Field::Int32(1)])).unwrap();
}

#[test]
fn tables_are_not_coverage_files() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("x.dat");
    let Err(error) = BinWriter::create(&path, FileType::Table, Precision::Single, WINDOWS_1252)
    else {
        panic!();
    };
    assert!(matches!(error.details, ErrorDetails::TableThroughGenericCreate));
    assert!(!path.exists());
}

#[test]
fn create_writes_data_and_index() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("arc.adf");
    let mut writer =
        BinWriter::create(&path, FileType::Arc, Precision::Double, WINDOWS_1252).unwrap();
    writer
        .write_record(&Record::Arc(Arc {
            arc_id: 1,
            vertices: vec![Vertex::new(0.0, 0.0), Vertex::new(1.0, 1.0)],
            ..Arc::default()
        }))
        .unwrap();
    writer.close().unwrap();

    assert_eq!(fs::metadata(&path).unwrap().len(), 100 + 32 + 32);
    assert_eq!(fs::metadata(dir.path().join("arx.adf")).unwrap().len(), 108);
}

#[test]
fn closing_a_table_updates_its_record_count() {
    let dir = TempDir::new().unwrap();
    let info_dir = dir.path().join("info");
    fs::create_dir(&info_dir).unwrap();

    let def = TableDef::new(
        "ROADS.AAT",
        vec![
            FieldInfo::new("FNODE#", FieldType::BinInt, 4, 1, 1),
            FieldInfo::new("CLASS", FieldType::Char, 3, 5, 2),
        ],
    );
    let mut writer =
        BinWriter::create_table(&info_dir, &def, Precision::Single, WINDOWS_1252).unwrap();
    for (n, class) in [(1, "A"), (2, "B"), (3, "C")] {
        writer
            .write_record(&Record::Table(vec![Field::Int32(n), Field::Str(class.into())]))
            .unwrap();
    }
    writer.close().unwrap();

    let entries = info::read_dir(&info_dir).unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].num_records, 3);
    assert_eq!(entries[0].rec_size, 8);
    assert_eq!(fs::metadata(info_dir.join("arc0000.dat")).unwrap().len(), 24);

    let mut reader = BinReader::open_table(&info_dir, "roads.aat", WINDOWS_1252, &mut |warning| {
        panic!("{warning}")
    })
    .unwrap();
    let mut classes = Vec::new();
    while let Some(Record::Table(fields)) = reader.next_record().unwrap() {
        classes.push(fields[1].clone());
    }
    assert_eq!(
        classes,
        ["A  ", "B  ", "C  "].map(|class| Field::Str(class.into()))
    );
}
