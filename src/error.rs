// Decode error taxonomy. Every failure is local to one file's decode;
// the caller decides whether to retry (e.g. with smaller buffers).

use core::fmt;

use crate::chunk::ChunkType;

/// Header fields outside what the decoder reconstructs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Unsupported {
    /// Only 8 bits per channel.
    BitDepth(u8),
    /// Only truecolor (2) and truecolor with alpha (6).
    ColorType(u8),
    /// Adam7 (1) is rejected.
    Interlace(u8),
}

impl fmt::Display for Unsupported {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Unsupported::BitDepth(d) => write!(f, "bit depth {}", d),
            Unsupported::ColorType(c) => write!(f, "colour type {}", c),
            Unsupported::Interlace(i) => write!(f, "interlace method {}", i),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// Bad signature, invalid filter type or malformed chunk sequence.
    Format(&'static str),
    Unsupported(Unsupported),
    /// Buffer storage could not be obtained.
    Allocation { requested: usize },
    /// A ring buffer write would land on bytes not yet consumed.
    Overwrite { requested: usize, free: usize },
    /// miniz_oxide reported a corrupt stream; carries the `MZError` code.
    Compression(i32),
    /// CRC mismatch with [`CrcCheck::Strict`].
    Integrity {
        chunk: ChunkType,
        expected: u32,
        actual: u32,
    },
    /// The byte source failed.
    Io(&'static str),
    /// Rejected [`crate::Config`].
    Config(&'static str),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Format(msg) => write!(f, "png: {}", msg),
            Error::Unsupported(what) => write!(f, "png: unsupported {}", what),
            Error::Allocation { requested } => {
                write!(f, "png: cannot allocate {} bytes", requested)
            }
            Error::Overwrite { requested, free } => write!(
                f,
                "png: ring buffer overwrite ({} bytes requested, {} free)",
                requested, free
            ),
            Error::Compression(code) => write!(f, "png: zlib decompression error ({})", code),
            Error::Integrity {
                chunk,
                expected,
                actual,
            } => write!(
                f,
                "png: crc mismatch in {} (stored {:08x}, computed {:08x})",
                chunk, expected, actual
            ),
            Error::Io(msg) => write!(f, "png: read failed: {}", msg),
            Error::Config(msg) => write!(f, "png: bad config: {}", msg),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for Error {}

impl From<Unsupported> for Error {
    fn from(u: Unsupported) -> Self {
        Error::Unsupported(u)
    }
}

/// What to do with chunk CRCs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CrcCheck {
    /// Read and discard the stored CRC.
    #[default]
    Skip,
    /// Verify; log and count mismatches, keep decoding.
    Warn,
    /// Verify; a mismatch aborts with [`Error::Integrity`].
    Strict,
}

impl CrcCheck {
    pub const fn enabled(self) -> bool {
        !matches!(self, CrcCheck::Skip)
    }
}
