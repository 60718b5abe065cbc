// pulp-png: streaming no_std PNG decoder with bounded working memory.
// source:   byte sources (slices, io::Read behind the std feature)
// memory:   allocators for the decoder's working buffers
// ring:     fixed-capacity ring buffer with wrap-aware bulk fill
// chunk:    signature check, chunk framing, CRC, IHDR parsing
// inflate:  incremental zlib decompression between two rings
// scanline: byte-at-a-time filter reversal (None/Sub/Up/Average/Paeth)
// color:    RGB888 -> packed 16-bit lookup with brightness scaling
// canvas:   placement, centering and cropping on the destination
// sink:     pixel destinations (owned framebuffer, embedded-graphics)
// decoder:  configuration and the end-to-end decode

#![cfg_attr(not(any(test, feature = "std")), no_std)]

extern crate alloc;

pub mod canvas;
pub mod chunk;
pub mod color;
pub mod decoder;
pub mod error;
pub mod inflate;
pub mod memory;
pub mod ring;
pub mod scanline;
pub mod sink;
pub mod source;

pub use canvas::CanvasGeometry;
pub use chunk::{ColorType, ImageHeader};
pub use color::ColorLookup;
pub use decoder::{Config, DecodeReport, Decoder, decode_png};
pub use error::{CrcCheck, Error, Unsupported};
pub use memory::{BufferAllocator, Capped, Heap};
pub use ring::RingBuffer;
pub use sink::{DisplaySink, Framebuffer, Sink};
#[cfg(feature = "std")]
pub use source::IoSource;
pub use source::ByteSource;
