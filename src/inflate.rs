// Incremental zlib decompression between two ring buffers.
//
// One miniz_oxide stream state lives for the whole decode (its 32 KB
// history window is internal, so the output ring can be any size and
// can be compacted freely). Each `InflateSession::pump` feeds whatever
// the input ring holds, and every time output is produced hands it to a
// drain callback (the scanline reconstructor). Bytes the drain does not
// take are moved to the front of the output ring and decompression
// resumes into the space after them; nothing is ever dropped.

use alloc::boxed::Box;

use miniz_oxide::inflate::stream::{InflateState, inflate};
use miniz_oxide::{DataFormat, MZError, MZFlush, MZStatus};

use crate::error::Error;
use crate::ring::RingBuffer;

pub struct InflateSession {
    state: Box<InflateState>,
    finished: bool,
    // last call filled the output ring; the stream may hold more
    saturated: bool,
    total_in: usize,
    total_out: usize,
}

impl Default for InflateSession {
    fn default() -> Self {
        Self::new()
    }
}

impl InflateSession {
    pub fn new() -> Self {
        Self {
            state: InflateState::new_boxed(DataFormat::Zlib),
            finished: false,
            saturated: false,
            total_in: 0,
            total_out: 0,
        }
    }

    /// True once the zlib stream end (and its checksum) has been seen.
    #[inline]
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    #[inline]
    pub fn total_in(&self) -> usize {
        self.total_in
    }

    #[inline]
    pub fn total_out(&self) -> usize {
        self.total_out
    }

    /// Decompress everything staged in `input` into `output`, draining
    /// `output` through `drain` as it fills.
    ///
    /// `drain` receives all unread output bytes and returns how many it
    /// consumed. With `flush` set the session also empties whatever the
    /// decompressor still holds once input runs out; use it after the
    /// last IDAT chunk.
    ///
    /// Once the stream has ended, any byte still staged in `input` is a
    /// `Format` error.
    pub fn pump<F>(
        &mut self,
        input: &mut RingBuffer,
        output: &mut RingBuffer,
        flush: bool,
        mut drain: F,
    ) -> Result<(), Error>
    where
        F: FnMut(&[u8]) -> Result<usize, Error>,
    {
        loop {
            if self.finished {
                // nothing may follow the stream end
                if !input.is_empty() {
                    log::error!(
                        "png: {} bytes after end of zlib stream",
                        input.available()
                    );
                    return Err(Error::Format("IDAT after end of image data"));
                }
                return Ok(());
            }

            let in_len = input.contiguous().len();
            if in_len == 0 && !self.saturated && !flush {
                return Ok(());
            }
            if output.spare_mut().is_empty() {
                // drain took nothing from a full ring
                return Err(Error::Overwrite {
                    requested: 1,
                    free: 0,
                });
            }

            let res = {
                let src = input.contiguous();
                let dst = output.spare_mut();
                let room = dst.len();
                let res = inflate(&mut self.state, src, dst, MZFlush::None);
                self.saturated = res.bytes_written == room;
                res
            };
            input.skip(res.bytes_consumed);
            output.commit(res.bytes_written);
            self.total_in += res.bytes_consumed;
            self.total_out += res.bytes_written;

            match res.status {
                Ok(MZStatus::StreamEnd) => {
                    Self::drain_output(output, &mut drain)?;
                    self.finished = true;
                    log::debug!(
                        "png: zlib stream end ({} in, {} out)",
                        self.total_in,
                        self.total_out
                    );
                }
                Ok(_) => {
                    if res.bytes_written > 0 {
                        Self::drain_output(output, &mut drain)?;
                    } else if res.bytes_consumed == 0 && in_len == 0 {
                        // nothing more to get without further input
                        self.saturated = false;
                        if flush {
                            return Ok(());
                        }
                    }
                }
                Err(MZError::Buf) if in_len == 0 => {
                    // needs more input; with flush set the stream is short
                    self.saturated = false;
                    if flush {
                        log::warn!("png: zlib stream ended early");
                    }
                    return Ok(());
                }
                Err(e) => {
                    log::error!("png: inflate failed: {:?}", e);
                    return Err(Error::Compression(e as i32));
                }
            }
        }
    }

    // hand pending output to the drain, keep what it leaves at the front
    fn drain_output<F>(output: &mut RingBuffer, drain: &mut F) -> Result<(), Error>
    where
        F: FnMut(&[u8]) -> Result<usize, Error>,
    {
        let pending = output.contiguous().len();
        let used = drain(output.contiguous())?;
        debug_assert!(used <= pending);
        output.skip(used);
        output.compact();
        log::trace!("png: drained {} of {} inflated bytes", used, pending);
        Ok(())
    }
}
