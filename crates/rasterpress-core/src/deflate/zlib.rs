//! zlib framing (RFC 1950) around the DEFLATE encoder.

use std::io::{self, Write};

use super::DeflateEncoder;
use crate::error::{classify_io, Error, Stage};

/// Largest n such that 255·n·(n+1)/2 + (n+1)·(65521-1) fits in a u32.
const NMAX: usize = 5552;
const MOD_ADLER: u32 = 65521;

/// Running Adler-32 checksum.
#[derive(Debug, Clone, Copy)]
pub struct Adler32 {
    a: u32,
    b: u32,
}

impl Default for Adler32 {
    fn default() -> Self {
        Self { a: 1, b: 0 }
    }
}

impl Adler32 {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&mut self, data: &[u8]) {
        for chunk in data.chunks(NMAX) {
            for &byte in chunk {
                self.a += byte as u32;
                self.b += self.a;
            }
            self.a %= MOD_ADLER;
            self.b %= MOD_ADLER;
        }
    }

    pub fn finish(&self) -> u32 {
        (self.b << 16) | self.a
    }
}

/// CMF/FLG header for the given effort.
fn header(effort: u8) -> [u8; 2] {
    // Deflate, 32 KiB window
    let cmf: u8 = 0x78;
    let flevel: u8 = match effort {
        0..=1 => 0,
        2..=5 => 1,
        6 => 2,
        _ => 3,
    };
    let flg = flevel << 6;
    let check = (31 - ((cmf as u16) << 8 | flg as u16) % 31) % 31;
    [cmf, flg | check as u8]
}

/// Streaming zlib encoder: header, DEFLATE stream, big-endian Adler-32.
#[derive(Debug)]
pub struct ZlibEncoder<W: Write> {
    inner: DeflateEncoder<W>,
    checksum: Adler32,
}

impl<W: Write> ZlibEncoder<W> {
    pub fn new(sink: W, effort: u8) -> Self {
        Self {
            inner: DeflateEncoder::new(sink, effort).with_header(&header(effort)),
            checksum: Adler32::new(),
        }
    }

    /// Reject writes once more than `limit` bytes have been accepted.
    pub fn with_limit(mut self, limit: u64) -> Self {
        self.inner = self.inner.with_limit(limit);
        self
    }

    pub fn total_in(&self) -> u64 {
        self.inner.total_in()
    }

    pub fn get_ref(&self) -> &W {
        self.inner.get_ref()
    }

    /// Finish the stream, append the trailer and return the sink.
    pub fn finish(self) -> io::Result<W> {
        let mut sink = self.inner.finish()?;
        sink.write_all(&self.checksum.finish().to_be_bytes())?;
        Ok(sink)
    }
}

impl<W: Write> Write for ZlibEncoder<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.inner.write(buf)?;
        self.checksum.update(&buf[..n]);
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

/// Compress `data` into a zlib stream.
pub fn zlib_compress(data: &[u8], effort: u8) -> Result<Vec<u8>, Error> {
    let mut encoder = ZlibEncoder::new(Vec::new(), effort);
    encoder
        .write_all(data)
        .and_then(|_| encoder.finish())
        .map_err(|e| classify_io(Stage::Deflating, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::read::ZlibDecoder;
    use std::io::Read;

    #[test]
    fn test_adler32_known_values() {
        let mut adler = Adler32::new();
        adler.update(b"Wikipedia");
        assert_eq!(adler.finish(), 0x11E6_0398);

        assert_eq!(Adler32::new().finish(), 1);
    }

    #[test]
    fn test_adler32_incremental() {
        let data: Vec<u8> = (0..20_000u32).map(|i| (i * 13) as u8).collect();
        let mut whole = Adler32::new();
        whole.update(&data);

        let mut parts = Adler32::new();
        for piece in data.chunks(777) {
            parts.update(piece);
        }
        assert_eq!(whole.finish(), parts.finish());
    }

    #[test]
    fn test_adler32_all_ff_does_not_overflow() {
        let mut adler = Adler32::new();
        adler.update(&vec![0xFF; 100_000]);
        let (a, b) = (adler.finish() & 0xFFFF, adler.finish() >> 16);
        assert!(a < MOD_ADLER && b < MOD_ADLER);
    }

    #[test]
    fn test_header_check_bits() {
        for effort in 0..=9 {
            let [cmf, flg] = header(effort);
            assert_eq!(cmf, 0x78);
            assert_eq!(((cmf as u16) << 8 | flg as u16) % 31, 0);
            assert_eq!(flg & 0x20, 0, "no preset dictionary");
        }
        assert_eq!(header(6), [0x78, 0x9C]);
        assert_eq!(header(9), [0x78, 0xDA]);
        assert_eq!(header(1), [0x78, 0x01]);
    }

    #[test]
    fn test_roundtrip_with_flate2() {
        let data = b"zlib framing around our own deflate stream ".repeat(100);
        let bytes = zlib_compress(&data, 6).unwrap();
        let mut out = Vec::new();
        ZlibDecoder::new(&bytes[..]).read_to_end(&mut out).unwrap();
        assert_eq!(out, data);
    }

    #[test]
    fn test_trailer_is_big_endian_adler() {
        let data = b"abc";
        let bytes = zlib_compress(data, 6).unwrap();
        let mut adler = Adler32::new();
        adler.update(data);
        assert_eq!(bytes[bytes.len() - 4..], adler.finish().to_be_bytes());
    }

    #[test]
    fn test_empty_stream_decodes() {
        let bytes = zlib_compress(&[], 9).unwrap();
        let mut out = Vec::new();
        ZlibDecoder::new(&bytes[..]).read_to_end(&mut out).unwrap();
        assert!(out.is_empty());
    }
}
