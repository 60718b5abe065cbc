// End-to-end decode: file bytes -> input ring -> inflate -> output ring ->
// scanline reconstruction -> colour lookup -> sink.
// All per-file state (rings, header, geometry, filter state) lives on the
// stack of one `decode` call and is released when it returns, on success
// or failure alike.

use crate::canvas::CanvasGeometry;
use crate::chunk::{ChunkReader, ChunkType, ImageHeader};
use crate::color::ColorLookup;
use crate::error::{CrcCheck, Error};
use crate::inflate::InflateSession;
use crate::memory::{BufferAllocator, Heap};
use crate::ring::RingBuffer;
use crate::scanline::ScanlineReconstructor;
use crate::sink::Sink;
use crate::source::ByteSource;

// buffer sizes per factor unit
pub const INPUT_UNIT: usize = 64 * 1024;
pub const OUTPUT_UNIT: usize = 128 * 1024;
pub const DEFAULT_BUFFER_FACTOR: u32 = 8;
pub const MAX_BUFFER_FACTOR: u32 = 32;

// filter byte + one RGBA pixel, with room left to resume
const MIN_OUTPUT_CAPACITY: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Config {
    /// Bytes of compressed IDAT data staged between inflate passes.
    pub input_capacity: usize,
    /// Bytes of inflated scanline data staged for reconstruction.
    pub output_capacity: usize,
    /// Percent, 1-100.
    pub brightness: u8,
    /// Centre images smaller than the canvas.
    pub centering: bool,
    pub check_signature: bool,
    pub crc: CrcCheck,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            input_capacity: INPUT_UNIT * DEFAULT_BUFFER_FACTOR as usize,
            output_capacity: OUTPUT_UNIT * DEFAULT_BUFFER_FACTOR as usize,
            brightness: 100,
            centering: false,
            check_signature: true,
            crc: CrcCheck::Skip,
        }
    }
}

impl Config {
    /// Default config with both buffers scaled by `factor` (1-32):
    /// 64 KB input and 128 KB output per unit.
    pub fn with_buffer_factor(factor: u32) -> Result<Self, Error> {
        if !(1..=MAX_BUFFER_FACTOR).contains(&factor) {
            return Err(Error::Config("buffer factor must be 1-32"));
        }
        Ok(Self {
            input_capacity: INPUT_UNIT * factor as usize,
            output_capacity: OUTPUT_UNIT * factor as usize,
            ..Self::default()
        })
    }

    pub fn validate(&self) -> Result<(), Error> {
        if !(1..=100).contains(&self.brightness) {
            return Err(Error::Config("brightness must be 1-100"));
        }
        if self.input_capacity == 0 {
            return Err(Error::Config("input buffer is empty"));
        }
        if self.output_capacity < MIN_OUTPUT_CAPACITY {
            return Err(Error::Config("output buffer below 8 bytes"));
        }
        Ok(())
    }
}

/// Outcome of a successful decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodeReport {
    pub header: ImageHeader,
    pub geometry: CanvasGeometry,
    /// Image rows reconstructed; stops early once rows fall below the
    /// canvas.
    pub rows: u32,
    /// The zlib stream reached its end.
    pub complete: bool,
    /// Chunks whose CRC did not match under [`CrcCheck::Warn`].
    pub crc_mismatches: u32,
}

pub struct Decoder<A = Heap> {
    config: Config,
    colors: ColorLookup,
    alloc: A,
}

impl Decoder<Heap> {
    pub fn new(config: Config) -> Result<Self, Error> {
        Self::with_allocator(config, Heap)
    }
}

impl<A: BufferAllocator> Decoder<A> {
    pub fn with_allocator(config: Config, alloc: A) -> Result<Self, Error> {
        config.validate()?;
        Ok(Self {
            config,
            colors: ColorLookup::build(config.brightness),
            alloc,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn colors(&self) -> &ColorLookup {
        &self.colors
    }

    /// Read just the signature and IHDR. The header is returned as stored,
    /// whether or not [`decode`](Self::decode) could handle it.
    pub fn describe<S: ByteSource>(&mut self, src: S) -> Result<ImageHeader, Error> {
        let mut chunks = ChunkReader::new(src, self.config.crc);
        chunks.read_signature(self.config.check_signature)?;
        open_ihdr(&mut chunks)?;
        chunks.read_header()
    }

    /// Decode one PNG from `src` onto `sink`.
    ///
    /// Pixels already handed to the sink stay there if a later error
    /// aborts the decode.
    pub fn decode<S, K>(&mut self, src: S, sink: &mut K) -> Result<DecodeReport, Error>
    where
        S: ByteSource,
        K: Sink + ?Sized,
    {
        let mut chunks = ChunkReader::new(src, self.config.crc);
        chunks.read_signature(self.config.check_signature)?;

        open_ihdr(&mut chunks)?;
        let header = chunks.read_header()?;
        let color = header.validate()?;

        let (canvas_w, canvas_h) = sink.canvas_size();
        let geometry = CanvasGeometry::new(
            header.width,
            header.height,
            canvas_w,
            canvas_h,
            self.config.centering,
        );
        log::info!(
            "png: streaming {}x{} {:?} onto {}x{} at ({}, {})",
            header.width,
            header.height,
            color,
            canvas_w,
            canvas_h,
            geometry.offset_x,
            geometry.offset_y
        );

        let mut recon =
            ScanlineReconstructor::new(header.width, header.height, color, &mut self.alloc)?;
        let mut input = RingBuffer::open(self.config.input_capacity, &mut self.alloc)?;
        let mut output = RingBuffer::open(self.config.output_capacity, &mut self.alloc)?;
        let mut inflater = InflateSession::new();

        let colors = &self.colors;
        let mut drain = |bytes: &[u8]| recon.feed(bytes, &geometry, colors, &mut *sink);

        let mut seen_iend = false;
        while let Some(chunk) = chunks.next_chunk()? {
            match chunk.kind {
                ChunkType::IDAT => {
                    if chunk.length as usize > input.free() {
                        inflater.pump(&mut input, &mut output, false, &mut drain)?;
                    }
                    if inflater.is_finished() {
                        if chunk.length > 0 {
                            return Err(Error::Format("IDAT after end of image data"));
                        }
                        chunks.finish_chunk()?;
                        continue;
                    }
                    while chunks.payload_left() > 0 {
                        if input.free() == 0 {
                            inflater.pump(&mut input, &mut output, false, &mut drain)?;
                        }
                        let want = chunks.payload_left().min(input.free());
                        if input.fill(&mut chunks, Some(want), true)? == 0 {
                            return Err(Error::Format("truncated IDAT"));
                        }
                    }
                    chunks.finish_chunk()?;
                }
                ChunkType::IEND => {
                    chunks.finish_chunk()?;
                    seen_iend = true;
                    break;
                }
                ChunkType::IHDR => return Err(Error::Format("duplicate IHDR")),
                other => {
                    log::debug!("png: skipping {} chunk ({} bytes)", other, chunk.length);
                    chunks.skip_chunk()?;
                }
            }
        }
        if !seen_iend {
            log::warn!("png: end of file without IEND");
        }

        // whatever is still staged, plus anything the decompressor holds
        inflater.pump(&mut input, &mut output, true, &mut drain)?;

        let complete = inflater.is_finished();
        let rows = recon.rows();
        if !complete {
            log::warn!("png: image data ended before the zlib stream did");
        }
        if rows < header.height && geometry.target_row(rows).is_some() {
            log::warn!("png: expected {} rows, got {}", header.height, rows);
        }

        Ok(DecodeReport {
            header,
            geometry,
            rows,
            complete,
            crc_mismatches: chunks.crc_mismatches(),
        })
    }
}

// the first chunk must be IHDR; leaves it open for `read_header`
fn open_ihdr<S: ByteSource>(chunks: &mut ChunkReader<S>) -> Result<(), Error> {
    match chunks.next_chunk()? {
        Some(c) if c.kind == ChunkType::IHDR => Ok(()),
        Some(_) => Err(Error::Format("first chunk is not IHDR")),
        None => Err(Error::Format("missing IHDR")),
    }
}

/// Decode an in-memory PNG with the default configuration.
pub fn decode_png<K: Sink + ?Sized>(data: &[u8], sink: &mut K) -> Result<DecodeReport, Error> {
    Decoder::new(Config::default())?.decode(data, sink)
}
