//! PNG container serialization.
//!
//! A PNG file is the 8-byte signature followed by chunks, each laid out as
//! big-endian length, 4-byte type, payload and a CRC-32 over type + payload.
//! [`ChunkWriter`] enforces the IHDR, IDAT..., IEND order and
//! [`IdatWriter`] cuts a compressed stream into IDAT chunks.

use std::io::{self, Write};

use crate::config::{MAX_CHUNK_LEN, MAX_IDAT_LEN};
use crate::error::{encode_to_io, EncodeError};
use crate::raster::{ColorType, BIT_DEPTH};

/// Magic bytes at the start of every PNG file.
pub const PNG_SIGNATURE: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

/// Chunk types written by the encoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkType {
    Ihdr,
    Idat,
    Iend,
}

impl ChunkType {
    pub fn tag(self) -> [u8; 4] {
        match self {
            ChunkType::Ihdr => *b"IHDR",
            ChunkType::Idat => *b"IDAT",
            ChunkType::Iend => *b"IEND",
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            ChunkType::Ihdr => "IHDR",
            ChunkType::Idat => "IDAT",
            ChunkType::Iend => "IEND",
        }
    }
}

/// One serialized chunk record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk<'a> {
    pub kind: ChunkType,
    pub data: &'a [u8],
}

impl<'a> Chunk<'a> {
    pub fn new(kind: ChunkType, data: &'a [u8]) -> Self {
        Self { kind, data }
    }

    /// CRC-32 over the type tag and payload.
    pub fn crc(&self) -> u32 {
        let mut hasher = crc32fast::Hasher::new();
        hasher.update(&self.kind.tag());
        hasher.update(self.data);
        hasher.finalize()
    }

    /// Serialized size including length, type and CRC fields.
    pub fn encoded_len(&self) -> usize {
        self.data.len() + 12
    }

    /// Write the chunk record to `out`.
    pub fn write_to<W: Write>(&self, out: &mut W) -> io::Result<()> {
        if self.data.len() > MAX_CHUNK_LEN as usize {
            return Err(encode_to_io(EncodeError::ChunkTooLarge(self.data.len())));
        }
        out.write_all(&(self.data.len() as u32).to_be_bytes())?;
        out.write_all(&self.kind.tag())?;
        out.write_all(self.data)?;
        out.write_all(&self.crc().to_be_bytes())
    }
}

/// Image header fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageHeader {
    pub width: u32,
    pub height: u32,
    pub color: ColorType,
}

impl ImageHeader {
    /// The 13-byte IHDR payload. Compression, filter method and interlace
    /// are always 0.
    pub fn to_bytes(&self) -> [u8; 13] {
        let mut out = [0u8; 13];
        out[0..4].copy_from_slice(&self.width.to_be_bytes());
        out[4..8].copy_from_slice(&self.height.to_be_bytes());
        out[8] = BIT_DEPTH;
        out[9] = self.color.code();
        out
    }
}

/// Writes the signature and chunks in container order.
#[derive(Debug)]
pub struct ChunkWriter<W: Write> {
    sink: W,
    last: Option<ChunkType>,
}

impl<W: Write> ChunkWriter<W> {
    pub fn new(sink: W) -> Self {
        Self { sink, last: None }
    }

    /// Write the signature and IHDR. Must be the first call.
    pub fn write_header(&mut self, header: &ImageHeader) -> io::Result<()> {
        self.check_order(ChunkType::Ihdr)?;
        self.sink.write_all(&PNG_SIGNATURE)?;
        self.emit(ChunkType::Ihdr, &header.to_bytes())
    }

    /// Write one IDAT chunk.
    pub fn write_data(&mut self, data: &[u8]) -> io::Result<()> {
        self.check_order(ChunkType::Idat)?;
        self.emit(ChunkType::Idat, data)
    }

    /// Write IEND and return the sink.
    pub fn finish(mut self) -> io::Result<W> {
        self.check_order(ChunkType::Iend)?;
        self.emit(ChunkType::Iend, &[])?;
        Ok(self.sink)
    }

    pub fn get_ref(&self) -> &W {
        &self.sink
    }

    fn check_order(&self, next: ChunkType) -> io::Result<()> {
        let allowed = matches!(
            (self.last, next),
            (None, ChunkType::Ihdr)
                | (Some(ChunkType::Ihdr), ChunkType::Idat)
                | (Some(ChunkType::Idat), ChunkType::Idat)
                | (Some(ChunkType::Idat), ChunkType::Iend)
        );
        if allowed {
            Ok(())
        } else {
            Err(encode_to_io(EncodeError::ChunkOrder {
                chunk: next.name(),
                previous: self.last.map_or("signature", ChunkType::name),
            }))
        }
    }

    fn emit(&mut self, kind: ChunkType, data: &[u8]) -> io::Result<()> {
        Chunk::new(kind, data).write_to(&mut self.sink)?;
        self.last = Some(kind);
        log::trace!("{} chunk: {} bytes", kind.name(), data.len());
        Ok(())
    }
}

/// Buffers a compressed stream and emits it as IDAT chunks of at most
/// `chunk_len` bytes. `chunk_len` is clamped to 1..=[`MAX_IDAT_LEN`].
#[derive(Debug)]
pub struct IdatWriter<W: Write> {
    chunks: ChunkWriter<W>,
    buffer: Vec<u8>,
    chunk_len: usize,
}

impl<W: Write> IdatWriter<W> {
    pub fn new(chunks: ChunkWriter<W>, chunk_len: usize) -> Self {
        let chunk_len = chunk_len.clamp(1, MAX_IDAT_LEN as usize);
        Self {
            chunks,
            buffer: Vec::with_capacity(chunk_len.min(1 << 16)),
            chunk_len,
        }
    }

    /// Emit any buffered bytes and hand back the chunk writer.
    pub fn finish(mut self) -> io::Result<ChunkWriter<W>> {
        if !self.buffer.is_empty() {
            self.chunks.write_data(&self.buffer)?;
        }
        Ok(self.chunks)
    }
}

impl<W: Write> Write for IdatWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut rest = buf;
        while !rest.is_empty() {
            let take = (self.chunk_len - self.buffer.len()).min(rest.len());
            self.buffer.extend_from_slice(&rest[..take]);
            rest = &rest[take..];
            if self.buffer.len() == self.chunk_len {
                self.chunks.write_data(&self.buffer)?;
                self.buffer.clear();
            }
        }
        Ok(buf.len())
    }

    /// Partial chunks stay buffered until [`IdatWriter::finish`].
    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
