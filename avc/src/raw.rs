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

//! Buffered random-access streams over coverage files.
//!
//! [RawReader] and [RawWriter] move primitive values in and out of a single
//! underlying file, always in big-endian byte order, and keep track of the
//! current file offset so that errors can say where they happened.

use std::io::{Read, Seek, SeekFrom, Write};

use binrw::{BinWrite, Endian};

use crate::{
    endian::{FromBytes, ToBytes},
    error::{Error, ErrorDetails, Result},
    record::Precision,
};

const BUFFER_SIZE: usize = 1024;

/// A big-endian reader with a read-ahead buffer.
#[derive(Debug)]
pub struct RawReader<R> {
    inner: R,
    buffer: Vec<u8>,

    /// File offset of `buffer[0]`.
    buf_start: u64,

    /// Number of valid bytes in `buffer`.
    buf_len: usize,

    /// Read cursor within `buffer`.
    buf_pos: usize,
}

impl<R> RawReader<R>
where
    R: Read + Seek,
{
    /// Wraps `inner`, which must be positioned at its beginning.
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            buffer: vec![0; BUFFER_SIZE],
            buf_start: 0,
            buf_len: 0,
            buf_pos: 0,
        }
    }

    /// Returns the offset of the next byte to be read.
    pub fn position(&self) -> u64 {
        self.buf_start + self.buf_pos as u64
    }

    fn fill(&mut self) -> Result<usize> {
        self.buf_start += self.buf_len as u64;
        self.buf_pos = 0;
        self.buf_len = 0;
        loop {
            match self.inner.read(&mut self.buffer) {
                Ok(n) => {
                    self.buf_len = n;
                    return Ok(n);
                }
                Err(error) if error.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(error) => return Err(Error::new(Some(self.buf_start), error.into())),
            }
        }
    }

    /// Returns true if every byte in the file has been read.
    pub fn eof(&mut self) -> Result<bool> {
        if self.buf_pos < self.buf_len {
            return Ok(false);
        }
        Ok(self.fill()? == 0)
    }

    /// Fills `buf` completely.  Running out of data partway is an
    /// [ErrorDetails::UnexpectedEof] error.
    pub fn read_into(&mut self, mut buf: &mut [u8]) -> Result<()> {
        let start = self.position();
        while !buf.is_empty() {
            if self.buf_pos >= self.buf_len && self.fill()? == 0 {
                return Err(Error::new(Some(start), ErrorDetails::UnexpectedEof));
            }
            let n = buf.len().min(self.buf_len - self.buf_pos);
            buf[..n].copy_from_slice(&self.buffer[self.buf_pos..self.buf_pos + n]);
            self.buf_pos += n;
            buf = &mut buf[n..];
        }
        Ok(())
    }

    /// Reads exactly `N` bytes.
    pub fn read_bytes<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut buf = [0; N];
        self.read_into(&mut buf)?;
        Ok(buf)
    }

    /// Reads exactly `n` bytes into a new vector.
    pub fn read_vec(&mut self, n: usize) -> Result<Vec<u8>> {
        let mut vec = vec![0; n];
        self.read_into(&mut vec)?;
        Ok(vec)
    }

    pub fn read_i16(&mut self) -> Result<i16> {
        Ok(Endian::Big.parse(self.read_bytes()?))
    }

    pub fn read_i32(&mut self) -> Result<i32> {
        Ok(Endian::Big.parse(self.read_bytes()?))
    }

    pub fn read_f32(&mut self) -> Result<f32> {
        Ok(Endian::Big.parse(self.read_bytes()?))
    }

    pub fn read_f64(&mut self) -> Result<f64> {
        Ok(Endian::Big.parse(self.read_bytes()?))
    }

    /// Reads a real number stored with `precision`.
    pub fn read_real(&mut self, precision: Precision) -> Result<f64> {
        match precision {
            Precision::Single => Ok(self.read_f32()? as f64),
            Precision::Double => self.read_f64(),
        }
    }

    /// Skips `n` bytes.
    pub fn skip(&mut self, n: u64) -> Result<()> {
        let available = (self.buf_len - self.buf_pos) as u64;
        if n <= available {
            self.buf_pos += n as usize;
            Ok(())
        } else {
            self.seek(self.position() + n)
        }
    }

    /// Moves to absolute offset `offset`, discarding buffered data.
    pub fn seek(&mut self, offset: u64) -> Result<()> {
        self.inner
            .seek(SeekFrom::Start(offset))
            .map_err(|error| Error::new(Some(offset), error.into()))?;
        self.buf_start = offset;
        self.buf_len = 0;
        self.buf_pos = 0;
        Ok(())
    }

    /// Returns the underlying reader.
    pub fn into_inner(self) -> R {
        self.inner
    }
}

/// A big-endian writer that tracks its position.
#[derive(Debug)]
pub struct RawWriter<W> {
    inner: W,
    position: u64,
}

impl<W> RawWriter<W>
where
    W: Write + Seek,
{
    /// Wraps `inner`, which must be positioned at its beginning.
    pub fn new(inner: W) -> Self {
        Self { inner, position: 0 }
    }

    /// Returns the offset of the next byte to be written.
    pub fn position(&self) -> u64 {
        self.position
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        self.inner
            .write_all(bytes)
            .map_err(|error| Error::new(Some(self.position), error.into()))?;
        self.position += bytes.len() as u64;
        Ok(())
    }

    pub fn write_i16(&mut self, value: i16) -> Result<()> {
        self.write_bytes(&Endian::Big.to_bytes(value))
    }

    pub fn write_i32(&mut self, value: i32) -> Result<()> {
        self.write_bytes(&Endian::Big.to_bytes(value))
    }

    pub fn write_f32(&mut self, value: f32) -> Result<()> {
        self.write_bytes(&Endian::Big.to_bytes(value))
    }

    pub fn write_f64(&mut self, value: f64) -> Result<()> {
        self.write_bytes(&Endian::Big.to_bytes(value))
    }

    /// Writes `value` with `precision`.
    pub fn write_real(&mut self, precision: Precision, value: f64) -> Result<()> {
        match precision {
            Precision::Single => self.write_f32(value as f32),
            Precision::Double => self.write_f64(value),
        }
    }

    /// Writes `n` zero bytes.
    pub fn write_zeros(&mut self, n: usize) -> Result<()> {
        self.write_binrw(&Pad::new(n, 0))
    }

    /// Writes `bytes` left-justified in a field of `length` bytes, truncating
    /// or padding with spaces as needed.
    pub fn write_padded(&mut self, bytes: &[u8], length: usize) -> Result<()> {
        self.write_binrw(&Padded::exact(bytes, length, b' '))
    }

    /// Writes a value through its [BinWrite] implementation, big-endian.
    pub fn write_binrw<T>(&mut self, value: &T) -> Result<()>
    where
        T: for<'a> BinWrite<Args<'a> = ()>,
    {
        let start = self.inner.stream_position()?;
        value
            .write_be(&mut self.inner)
            .map_err(|error| Error::from(error).with_offset(self.position))?;
        let end = self.inner.stream_position()?;
        self.position += end - start;
        Ok(())
    }

    /// Moves to absolute offset `offset`.
    pub fn seek(&mut self, offset: u64) -> Result<()> {
        self.inner
            .seek(SeekFrom::Start(offset))
            .map_err(|error| Error::new(Some(offset), error.into()))?;
        self.position = offset;
        Ok(())
    }

    pub fn flush(&mut self) -> Result<()> {
        Ok(self.inner.flush()?)
    }

    /// Flushes and returns the underlying writer.
    pub fn into_inner(mut self) -> Result<W> {
        self.flush()?;
        Ok(self.inner)
    }
}

/// Bytes truncated or padded to an exact length.
pub struct Padded<'a> {
    bytes: &'a [u8],
    padding: Pad,
}

impl<'a> Padded<'a> {
    pub fn exact(bytes: &'a [u8], length: usize, pad: u8) -> Self {
        let min = bytes.len().min(length);
        Self {
            bytes: &bytes[..min],
            padding: Pad::new(length - min, pad),
        }
    }
}

impl BinWrite for Padded<'_> {
    type Args<'a> = ();

    fn write_options<W: Write + Seek>(
        &self,
        writer: &mut W,
        endian: Endian,
        args: Self::Args<'_>,
    ) -> binrw::BinResult<()> {
        self.bytes.write_options(writer, endian, args)?;
        self.padding.write_options(writer, endian, args)
    }
}

/// `n` copies of the byte `pad`.
pub struct Pad {
    n: usize,
    pad: u8,
}

impl Pad {
    pub fn new(n: usize, pad: u8) -> Self {
        Self { n, pad }
    }
}

impl BinWrite for Pad {
    type Args<'a> = ();

    fn write_options<W: Write + Seek>(
        &self,
        writer: &mut W,
        _endian: Endian,
        _args: Self::Args<'_>,
    ) -> binrw::BinResult<()> {
        for _ in 0..self.n {
            writer.write_all(&[self.pad])?;
        }
        Ok(())
    }
}
