// Byte-wise scanline reconstruction.
//
// Inflated image data arrives in fragments of any size: a fragment can
// end inside a pixel or right after a filter-type byte. The
// reconstructor walks the bytes as a small state machine
// (`Phase`) and reports how much of each fragment it used; whatever it
// leaves must be handed back, prefixed to the next fragment.
//
// Only three channels are kept per pixel. The up-row cache trails the
// current column by one: column `c - 1` is overwritten with this row's
// value once column `c` has been reconstructed, which keeps the
// upper-left neighbour Paeth needs intact until it has been read.

use alloc::boxed::Box;

use crate::canvas::CanvasGeometry;
use crate::chunk::ColorType;
use crate::color::ColorLookup;
use crate::error::Error;
use crate::memory::BufferAllocator;
use crate::sink::Sink;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterType {
    None = 0,
    Sub = 1,
    Up = 2,
    Average = 3,
    Paeth = 4,
}

impl FilterType {
    pub fn from_byte(b: u8) -> Result<Self, Error> {
        Ok(match b {
            0 => FilterType::None,
            1 => FilterType::Sub,
            2 => FilterType::Up,
            3 => FilterType::Average,
            4 => FilterType::Paeth,
            _ => return Err(Error::Format("invalid filter type")),
        })
    }
}

/// Where the next byte belongs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Next byte is the current row's filter type.
    AwaitingFilterByte,
    /// Next bytes are the channels of pixel `column`.
    AwaitingPixel { column: u32 },
}

pub struct ReconstructionState {
    pub phase: Phase,
    pub row: u32,
    pub filter: FilterType,
    /// Last reconstructed (r, g, b) in the current row.
    pub left: [u8; 3],
    // width * 3 bytes, r/g/b interleaved per column
    up: Box<[u8]>,
}

impl ReconstructionState {
    /// Cached (r, g, b) for `column`; see the module docs for which row
    /// each column currently holds.
    pub fn up(&self, column: u32) -> [u8; 3] {
        let i = column as usize * 3;
        [self.up[i], self.up[i + 1], self.up[i + 2]]
    }
}

pub struct ScanlineReconstructor {
    width: u32,
    height: u32,
    bpp: usize,
    state: ReconstructionState,
}

impl ScanlineReconstructor {
    pub fn new<A: BufferAllocator + ?Sized>(
        width: u32,
        height: u32,
        color: ColorType,
        alloc: &mut A,
    ) -> Result<Self, Error> {
        let up_len = (width as usize)
            .checked_mul(3)
            .ok_or(Error::Allocation {
                requested: usize::MAX,
            })?;
        let up = alloc.allocate(up_len)?;
        Ok(Self {
            width,
            height,
            bpp: color.bytes_per_pixel(),
            state: ReconstructionState {
                phase: Phase::AwaitingFilterByte,
                row: 0,
                filter: FilterType::None,
                left: [0; 3],
                up,
            },
        })
    }

    pub fn state(&self) -> &ReconstructionState {
        &self.state
    }

    /// Rows fully reconstructed so far.
    #[inline]
    pub fn rows(&self) -> u32 {
        self.state.row
    }

    #[inline]
    pub fn is_complete(&self) -> bool {
        self.state.row >= self.height
    }

    /// Reconstruct as much of `data` as possible, emitting visible pixels.
    ///
    /// Returns the number of bytes consumed. Anything less than
    /// `data.len()` is a partial pixel that must be resubmitted. Once the
    /// current row lies below the canvas (or past the last image row)
    /// everything is reported consumed without being examined.
    pub fn feed<K: Sink + ?Sized>(
        &mut self,
        data: &[u8],
        geometry: &CanvasGeometry,
        colors: &ColorLookup,
        sink: &mut K,
    ) -> Result<usize, Error> {
        let mut pos = 0usize;

        while pos < data.len() {
            let Some(y) = self.visible_row(geometry) else {
                return Ok(data.len());
            };

            match self.state.phase {
                Phase::AwaitingFilterByte => {
                    self.state.filter = FilterType::from_byte(data[pos])?;
                    pos += 1;
                    self.state.phase = Phase::AwaitingPixel { column: 0 };
                }
                Phase::AwaitingPixel { column } => {
                    if data.len() - pos < self.bpp {
                        break;
                    }
                    // 4th (alpha) byte of RGBA is skipped
                    let raw = [data[pos], data[pos + 1], data[pos + 2]];
                    pos += self.bpp;

                    let [r, g, b] = self.reconstruct(column, raw);
                    if let Some(x) = geometry.target_col(column) {
                        sink.write_pixel(x, y, colors.lookup(r, g, b));
                    }
                    self.advance(column);
                }
            }
        }

        Ok(pos)
    }

    // canvas y of the current row, None once nothing more can be shown
    #[inline]
    fn visible_row(&self, geometry: &CanvasGeometry) -> Option<u32> {
        if self.state.row >= self.height {
            return None;
        }
        geometry.target_row(self.state.row)
    }

    fn reconstruct(&mut self, column: u32, raw: [u8; 3]) -> [u8; 3] {
        let st = &mut self.state;
        let col = column as usize;
        let has_left = col > 0;
        let has_up = st.row > 0;

        let mut out = [0u8; 3];
        for ch in 0..3 {
            let a = if has_left { st.left[ch] } else { 0 };
            let b = if has_up { st.up[col * 3 + ch] } else { 0 };
            let c = if has_left && has_up {
                st.up[(col - 1) * 3 + ch]
            } else {
                0
            };
            let pred = match st.filter {
                FilterType::None => 0,
                FilterType::Sub => a,
                FilterType::Up => b,
                FilterType::Average => ((a as u16 + b as u16) >> 1) as u8,
                FilterType::Paeth => paeth(a, b, c),
            };
            out[ch] = raw[ch].wrapping_add(pred);
        }

        // cache for the next row
        if has_left {
            st.up[(col - 1) * 3..col * 3].copy_from_slice(&st.left);
        }
        if column + 1 == self.width {
            st.up[col * 3..col * 3 + 3].copy_from_slice(&out);
        }
        st.left = out;
        out
    }

    fn advance(&mut self, column: u32) {
        let next = column + 1;
        if next >= self.width {
            self.state.phase = Phase::AwaitingFilterByte;
            self.state.row += 1;
        } else {
            self.state.phase = Phase::AwaitingPixel { column: next };
        }
    }
}

/// PNG filter 4 predictor; ties resolve to `a`, then `b`.
#[inline]
pub fn paeth(a: u8, b: u8, c: u8) -> u8 {
    let a = a as i16;
    let b = b as i16;
    let c = c as i16;
    let p = a + b - c;
    let pa = (p - a).unsigned_abs();
    let pb = (p - b).unsigned_abs();
    let pc = (p - c).unsigned_abs();
    if pa <= pb && pa <= pc {
        a as u8
    } else if pb <= pc {
        b as u8
    } else {
        c as u8
    }
}
