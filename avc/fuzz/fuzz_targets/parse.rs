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


#![no_main]

use avc::{e00::Parser, record::FileType};
use libfuzzer_sys::fuzz_target;

fn parse_line(parser: &mut Parser, line: &str) {
    if parser.parse_line(line).is_err() || parser.section_ended() {
        parser.reset();
    }
}

fuzz_target!(|data: &[u8]| {
    let Ok(input) = std::str::from_utf8(data) else {
        return;
    };
    let mut parser = Parser::new();
    for line in input.lines() {
        if parser.section() != FileType::Unknown {
            if !parser.parse_section_end(line, true) {
                parse_line(&mut parser, line);
            }
        } else if !parser.parse_super_section_end(line)
            && parser.parse_super_section_header(line).is_none()
            && parser.parse_section_header(line) == Some(FileType::Table)
        {
            parse_line(&mut parser, line);
        }
    }
});
