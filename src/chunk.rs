// PNG container parsing.
//
// `ChunkReader` walks the chunk stream straight off the byte source.
// Length, type and CRC fields are read directly; payloads are either
// parsed in place (IHDR), pulled through the reader by the caller (IDAT,
// see `ByteSource` impl below) or skipped unread.

use core::fmt;

use crate::error::{CrcCheck, Error, Unsupported};
use crate::source::ByteSource;

pub const PNG_SIG: [u8; 8] = [137, 80, 78, 71, 13, 10, 26, 10];

// chunk lengths are limited to 2^31 - 1 by the format
const MAX_CHUNK_LEN: u32 = 0x7FFF_FFFF;

const IHDR_LEN: usize = 13;

#[derive(Clone, Copy, PartialEq, Eq)]
pub struct ChunkType(pub [u8; 4]);

impl ChunkType {
    pub const IHDR: Self = Self(*b"IHDR");
    pub const IDAT: Self = Self(*b"IDAT");
    pub const IEND: Self = Self(*b"IEND");

    /// Lowercase first letter marks an ancillary chunk.
    pub fn is_critical(&self) -> bool {
        self.0[0].is_ascii_uppercase()
    }
}

impl fmt::Display for ChunkType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for &b in &self.0 {
            let c = if b.is_ascii_graphic() { b as char } else { '?' };
            write!(f, "{}", c)?;
        }
        Ok(())
    }
}

impl fmt::Debug for ChunkType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ChunkType({})", self)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkHeader {
    pub length: u32,
    pub kind: ChunkType,
}

/// Truecolor layouts the reconstructor handles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorType {
    Rgb = 2,
    Rgba = 6,
}

impl ColorType {
    pub const fn bytes_per_pixel(self) -> usize {
        match self {
            ColorType::Rgb => 3,
            ColorType::Rgba => 4,
        }
    }
}

/// IHDR contents as stored in the file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageHeader {
    pub width: u32,
    pub height: u32,
    pub bit_depth: u8,
    pub color_type: u8,
    pub compression_method: u8,
    pub filter_method: u8,
    pub interlace_method: u8,
}

impl ImageHeader {
    /// Parse the 13 IHDR bytes; only structural checks are made here.
    pub fn parse(raw: &[u8; IHDR_LEN]) -> Result<Self, Error> {
        let header = Self {
            width: be_u32(raw, 0),
            height: be_u32(raw, 4),
            bit_depth: raw[8],
            color_type: raw[9],
            compression_method: raw[10],
            filter_method: raw[11],
            interlace_method: raw[12],
        };
        if header.width == 0 || header.height == 0 {
            return Err(Error::Format("zero dimensions"));
        }
        if header.width > MAX_CHUNK_LEN || header.height > MAX_CHUNK_LEN {
            return Err(Error::Format("dimensions out of range"));
        }
        Ok(header)
    }

    /// Check the header against what can be reconstructed: 8-bit,
    /// non-interlaced RGB or RGBA.
    pub fn validate(&self) -> Result<ColorType, Error> {
        if self.bit_depth != 8 {
            return Err(Unsupported::BitDepth(self.bit_depth).into());
        }
        let color = match self.color_type {
            2 => ColorType::Rgb,
            6 => ColorType::Rgba,
            c => return Err(Unsupported::ColorType(c).into()),
        };
        if self.interlace_method != 0 {
            return Err(Unsupported::Interlace(self.interlace_method).into());
        }
        Ok(color)
    }
}

// big-endian u32 (PNG uses network byte order)
#[inline]
fn be_u32(d: &[u8], o: usize) -> u32 {
    u32::from_be_bytes([d[o], d[o + 1], d[o + 2], d[o + 3]])
}

/// Sequential chunk parser over a byte source.
///
/// While a chunk is open the reader itself is a [`ByteSource`] limited to
/// that chunk's payload, so IDAT bytes can be filled into a ring buffer
/// without an intermediate copy while the CRC is accumulated on the way.
pub struct ChunkReader<S> {
    src: S,
    crc: CrcCheck,
    current: Option<ChunkHeader>,
    payload_left: usize,
    hasher: Option<crc32fast::Hasher>,
    mismatches: u32,
}

impl<S: ByteSource> ChunkReader<S> {
    pub fn new(src: S, crc: CrcCheck) -> Self {
        Self {
            src,
            crc,
            current: None,
            payload_left: 0,
            hasher: None,
            mismatches: 0,
        }
    }

    /// Consume the 8-byte signature; compare it unless `verify` is off.
    pub fn read_signature(&mut self, verify: bool) -> Result<(), Error> {
        let mut sig = [0u8; 8];
        self.src.read_exact(&mut sig)?;
        if verify && sig != PNG_SIG {
            return Err(Error::Format("invalid signature"));
        }
        Ok(())
    }

    /// Read the next length/type pair. `None` at a clean end of file.
    pub fn next_chunk(&mut self) -> Result<Option<ChunkHeader>, Error> {
        debug_assert!(self.current.is_none(), "previous chunk still open");

        let mut len = [0u8; 4];
        match self.src.read_full(&mut len)? {
            0 => return Ok(None),
            4 => {}
            _ => return Err(Error::Format("truncated chunk header")),
        }
        let length = u32::from_be_bytes(len);
        if length > MAX_CHUNK_LEN {
            return Err(Error::Format("chunk length out of range"));
        }
        let mut kind = [0u8; 4];
        self.src.read_exact(&mut kind)?;

        let header = ChunkHeader {
            length,
            kind: ChunkType(kind),
        };
        self.current = Some(header);
        self.payload_left = length as usize;
        self.hasher = if self.crc.enabled() {
            let mut h = crc32fast::Hasher::new();
            h.update(&kind);
            Some(h)
        } else {
            None
        };
        Ok(Some(header))
    }

    /// Payload bytes of the open chunk not yet read.
    #[inline]
    pub fn payload_left(&self) -> usize {
        self.payload_left
    }

    /// CRC mismatches tolerated so far under [`CrcCheck::Warn`].
    #[inline]
    pub fn crc_mismatches(&self) -> u32 {
        self.mismatches
    }

    /// Read an open IHDR chunk to its end, CRC included.
    pub fn read_header(&mut self) -> Result<ImageHeader, Error> {
        if self.payload_left < IHDR_LEN {
            return Err(Error::Format("invalid IHDR length"));
        }
        let mut raw = [0u8; IHDR_LEN];
        ByteSource::read_exact(self, &mut raw)?;
        self.finish_chunk()?;
        ImageHeader::parse(&raw)
    }

    /// Skip the open chunk's payload and CRC without looking at them.
    pub fn skip_chunk(&mut self) -> Result<(), Error> {
        self.src.skip(self.payload_left + 4)?;
        self.payload_left = 0;
        self.current = None;
        self.hasher = None;
        Ok(())
    }

    /// Discard any unread payload, then read and check the CRC.
    pub fn finish_chunk(&mut self) -> Result<(), Error> {
        if self.payload_left > 0 {
            let extra = self.payload_left;
            ByteSource::skip(self, extra)?;
        }
        let mut stored = [0u8; 4];
        self.src.read_exact(&mut stored)?;
        let expected = u32::from_be_bytes(stored);

        let header = self.current.take();
        if let (Some(hasher), Some(header)) = (self.hasher.take(), header) {
            let actual = hasher.finalize();
            if actual != expected {
                match self.crc {
                    CrcCheck::Strict => {
                        return Err(Error::Integrity {
                            chunk: header.kind,
                            expected,
                            actual,
                        });
                    }
                    _ => {
                        log::warn!(
                            "png: crc mismatch in {} (stored {:08x}, computed {:08x})",
                            header.kind,
                            expected,
                            actual
                        );
                        self.mismatches += 1;
                    }
                }
            }
        }
        Ok(())
    }
}

// payload-limited reads; feeds the CRC as bytes pass through
impl<S: ByteSource> ByteSource for ChunkReader<S> {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Error> {
        let want = buf.len().min(self.payload_left);
        if want == 0 {
            return Ok(0);
        }
        let n = self.src.read(&mut buf[..want])?;
        if n == 0 {
            return Err(Error::Format("unexpected end of file in chunk"));
        }
        if let Some(h) = self.hasher.as_mut() {
            h.update(&buf[..n]);
        }
        self.payload_left -= n;
        Ok(n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec::Vec;

    fn chunk(kind: &[u8; 4], payload: &[u8], good_crc: bool) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(&(payload.len() as u32).to_be_bytes());
        out.extend_from_slice(kind);
        out.extend_from_slice(payload);
        let mut h = crc32fast::Hasher::new();
        h.update(kind);
        h.update(payload);
        let crc = h.finalize() ^ if good_crc { 0 } else { 1 };
        out.extend_from_slice(&crc.to_be_bytes());
        out
    }

    fn ihdr(w: u32, h: u32, depth: u8, color: u8, interlace: u8) -> [u8; 13] {
        let mut raw = [0u8; 13];
        raw[..4].copy_from_slice(&w.to_be_bytes());
        raw[4..8].copy_from_slice(&h.to_be_bytes());
        raw[8] = depth;
        raw[9] = color;
        raw[12] = interlace;
        raw
    }

    #[test]
    fn header_fields_are_big_endian() {
        let h = ImageHeader::parse(&ihdr(0x0102, 3, 8, 6, 0)).unwrap();
        assert_eq!((h.width, h.height), (258, 3));
        assert_eq!(h.validate().unwrap(), ColorType::Rgba);
    }

    #[test]
    fn unsupported_headers() {
        let cases = [
            (ihdr(1, 1, 16, 2, 0), Unsupported::BitDepth(16)),
            (ihdr(1, 1, 8, 3, 0), Unsupported::ColorType(3)),
            (ihdr(1, 1, 8, 0, 0), Unsupported::ColorType(0)),
            (ihdr(1, 1, 8, 2, 1), Unsupported::Interlace(1)),
        ];
        for (raw, want) in cases {
            let h = ImageHeader::parse(&raw).unwrap();
            assert_eq!(h.validate(), Err(Error::Unsupported(want)));
        }
    }

    #[test]
    fn zero_width_is_format_error() {
        assert!(matches!(
            ImageHeader::parse(&ihdr(0, 1, 8, 2, 0)),
            Err(Error::Format(_))
        ));
    }

    #[test]
    fn signature_check_can_be_disabled() {
        let data = [0u8; 8];
        let mut r = ChunkReader::new(&data[..], CrcCheck::Skip);
        assert!(matches!(r.read_signature(true), Err(Error::Format(_))));
        let mut r = ChunkReader::new(&data[..], CrcCheck::Skip);
        assert!(r.read_signature(false).is_ok());
    }

    #[test]
    fn walks_chunks_and_skips_unknown() {
        let mut file = Vec::new();
        file.extend(chunk(b"IHDR", &ihdr(4, 2, 8, 2, 0), true));
        file.extend(chunk(b"tEXt", b"Comment\0hello", true));
        file.extend(chunk(b"IEND", &[], true));

        let mut r = ChunkReader::new(&file[..], CrcCheck::Strict);
        let c = r.next_chunk().unwrap().unwrap();
        assert_eq!(c.kind, ChunkType::IHDR);
        let h = r.read_header().unwrap();
        assert_eq!((h.width, h.height), (4, 2));

        let c = r.next_chunk().unwrap().unwrap();
        assert_eq!(c.kind, ChunkType(*b"tEXt"));
        assert!(!c.kind.is_critical());
        r.skip_chunk().unwrap();

        let c = r.next_chunk().unwrap().unwrap();
        assert_eq!(c.kind, ChunkType::IEND);
        r.finish_chunk().unwrap();
        assert_eq!(r.next_chunk().unwrap(), None);
    }

    #[test]
    fn payload_reads_are_bounded_by_chunk() {
        let file = chunk(b"IDAT", &[1, 2, 3], true);
        let mut r = ChunkReader::new(&file[..], CrcCheck::Strict);
        r.next_chunk().unwrap();
        let mut buf = [0u8; 8];
        assert_eq!(r.read_full(&mut buf).unwrap(), 3);
        assert_eq!(&buf[..3], &[1, 2, 3]);
        assert_eq!(r.payload_left(), 0);
        r.finish_chunk().unwrap();
    }

    #[test]
    fn crc_modes() {
        let file = chunk(b"IDAT", &[1, 2, 3], false);

        let mut r = ChunkReader::new(&file[..], CrcCheck::Strict);
        r.next_chunk().unwrap();
        r.skip(3).unwrap();
        assert!(matches!(
            r.finish_chunk(),
            Err(Error::Integrity {
                chunk: ChunkType::IDAT,
                ..
            })
        ));

        let mut r = ChunkReader::new(&file[..], CrcCheck::Warn);
        r.next_chunk().unwrap();
        r.finish_chunk().unwrap();
        assert_eq!(r.crc_mismatches(), 1);

        let mut r = ChunkReader::new(&file[..], CrcCheck::Skip);
        r.next_chunk().unwrap();
        r.finish_chunk().unwrap();
        assert_eq!(r.crc_mismatches(), 0);
    }

    #[test]
    fn short_ihdr_is_rejected() {
        let file = chunk(b"IHDR", &[0u8; 9], true);
        let mut r = ChunkReader::new(&file[..], CrcCheck::Skip);
        r.next_chunk().unwrap();
        assert!(matches!(r.read_header(), Err(Error::Format(_))));
    }

    #[test]
    fn truncated_length_field() {
        let data = [0u8, 0];
        let mut r = ChunkReader::new(&data[..], CrcCheck::Skip);
        assert!(matches!(r.next_chunk(), Err(Error::Format(_))));
    }
}
