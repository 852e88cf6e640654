//! gzip framing (RFC 1952) around the DEFLATE encoder.
//!
//! The header carries no file name and a zero modification time, so equal
//! input always yields byte-identical output.

use std::io::{self, Write};

use super::DeflateEncoder;
use crate::error::{classify_io, Error, Stage};

const MAGIC: [u8; 2] = [0x1F, 0x8B];
const METHOD_DEFLATE: u8 = 8;
const OS_UNKNOWN: u8 = 255;

fn header(effort: u8) -> [u8; 10] {
    // XFL: 2 = maximum compression, 4 = fastest
    let xfl = match effort {
        9.. => 2,
        0..=1 => 4,
        _ => 0,
    };
    [
        MAGIC[0],
        MAGIC[1],
        METHOD_DEFLATE,
        0, // FLG
        0,
        0,
        0,
        0, // MTIME
        xfl,
        OS_UNKNOWN,
    ]
}

/// Streaming gzip encoder: header, DEFLATE stream, CRC-32 and ISIZE.
pub struct GzipEncoder<W: Write> {
    inner: DeflateEncoder<W>,
    crc: crc32fast::Hasher,
}

impl<W: Write> GzipEncoder<W> {
    pub fn new(sink: W, effort: u8) -> Self {
        Self {
            inner: DeflateEncoder::new(sink, effort).with_header(&header(effort)),
            crc: crc32fast::Hasher::new(),
        }
    }

    pub fn total_in(&self) -> u64 {
        self.inner.total_in()
    }

    /// Finish the stream, append the trailer and return the sink.
    pub fn finish(self) -> io::Result<W> {
        // ISIZE is the input length modulo 2^32
        let isize = self.inner.total_in() as u32;
        let crc = self.crc.finalize();
        let mut sink = self.inner.finish()?;
        sink.write_all(&crc.to_le_bytes())?;
        sink.write_all(&isize.to_le_bytes())?;
        Ok(sink)
    }
}

impl<W: Write> Write for GzipEncoder<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.inner.write(buf)?;
        self.crc.update(&buf[..n]);
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

/// Compress `data` into a gzip member.
pub fn gzip_compress(data: &[u8], effort: u8) -> Result<Vec<u8>, Error> {
    let mut encoder = GzipEncoder::new(Vec::new(), effort);
    encoder
        .write_all(data)
        .and_then(|_| encoder.finish())
        .map_err(|e| classify_io(Stage::Deflating, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::read::GzDecoder;
    use std::io::Read;

    fn gunzip(bytes: &[u8]) -> Vec<u8> {
        let mut out = Vec::new();
        GzDecoder::new(bytes).read_to_end(&mut out).unwrap();
        out
    }

    #[test]
    fn test_header_layout() {
        let bytes = gzip_compress(b"", 9).unwrap();
        assert_eq!(&bytes[..10], &[0x1F, 0x8B, 8, 0, 0, 0, 0, 0, 2, 255]);
        assert_eq!(header(1)[8], 4);
        assert_eq!(header(6)[8], 0);
    }

    #[test]
    fn test_trailer() {
        let data = b"gzip trailer check";
        let bytes = gzip_compress(data, 6).unwrap();
        let n = bytes.len();
        assert_eq!(bytes[n - 8..n - 4], crc32fast::hash(data).to_le_bytes());
        assert_eq!(bytes[n - 4..], (data.len() as u32).to_le_bytes());
    }

    #[test]
    fn test_roundtrip_with_flate2() {
        let data: Vec<u8> = (0..100_000u32).map(|i| (i % 97) as u8).collect();
        for effort in [0, 1, 6, 9] {
            assert_eq!(gunzip(&gzip_compress(&data, effort).unwrap()), data);
        }
    }

    #[test]
    fn test_output_is_deterministic() {
        let data = b"same input, same bytes".repeat(30);
        assert_eq!(gzip_compress(&data, 6).unwrap(), gzip_compress(&data, 6).unwrap());
    }
}
