// Fixed-capacity circular byte store.
//
// Used twice per decode: once to stage IDAT payload read from the file,
// once to stage inflated scanline bytes for the reconstructor. Reads
// and writes wrap at most once per call; every operation is bounded by
// the capacity.
//
// The write cursor may lap to the front while unread bytes remain at the
// tail (`wrapped`); any write that would reach the read cursor fails with
// `Error::Overwrite` before touching the storage.

use alloc::boxed::Box;

use crate::error::Error;
use crate::memory::BufferAllocator;
use crate::source::ByteSource;

pub struct RingBuffer {
    data: Box<[u8]>,
    rofs: usize,
    wofs: usize,
    wrapped: bool,
}

impl RingBuffer {
    /// Allocate `capacity` bytes; both cursors start at 0.
    pub fn open<A: BufferAllocator + ?Sized>(
        capacity: usize,
        alloc: &mut A,
    ) -> Result<Self, Error> {
        let data = alloc.allocate(capacity)?;
        Ok(Self {
            data,
            rofs: 0,
            wofs: 0,
            wrapped: false,
        })
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    #[inline]
    pub fn read_offset(&self) -> usize {
        self.rofs
    }

    #[inline]
    pub fn write_offset(&self) -> usize {
        self.wofs
    }

    /// True while unread bytes sit at the tail and new bytes at the front.
    #[inline]
    pub fn is_wrapped(&self) -> bool {
        self.wrapped
    }

    /// Bytes written but not yet read.
    pub fn available(&self) -> usize {
        if self.wrapped {
            self.capacity() - self.rofs + self.wofs
        } else {
            self.wofs - self.rofs
        }
    }

    pub fn free(&self) -> usize {
        self.capacity() - self.available()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.available() == 0
    }

    /// Pull up to `len` bytes from `src` into the buffer at the write cursor.
    ///
    /// `None` means "all contiguous space at the write cursor": up to the
    /// physical end, or up to the read cursor once wrapped. A request that
    /// reaches past the physical end is truncated there unless
    /// `wrap_to_top`, in which case the remainder continues at offset 0.
    /// Returns the bytes actually transferred (short only at end of
    /// stream).
    pub fn fill<S: ByteSource + ?Sized>(
        &mut self,
        src: &mut S,
        len: Option<usize>,
        wrap_to_top: bool,
    ) -> Result<usize, Error> {
        let cap = self.capacity();

        if self.wrapped {
            let gap = self.rofs - self.wofs;
            let want = len.unwrap_or(gap);
            if want > gap {
                return Err(Error::Overwrite {
                    requested: want,
                    free: gap,
                });
            }
            return self.pull(src, want);
        }

        // write cursor parked at the physical end
        if self.wofs >= cap {
            if !wrap_to_top {
                return Ok(0);
            }
            self.restart_at_top();
            let want = len.unwrap_or(if self.wrapped { self.rofs } else { cap });
            let limit = if self.wrapped { self.rofs } else { cap };
            if want > limit {
                return Err(Error::Overwrite {
                    requested: want,
                    free: self.free(),
                });
            }
            return self.pull(src, want);
        }

        let want = len.unwrap_or(cap - self.wofs);
        if self.wofs + want <= cap {
            return self.pull(src, want);
        }

        // request straddles the physical end
        let first = cap - self.wofs;
        if !wrap_to_top {
            return self.pull(src, first);
        }
        if self.rofs == self.wofs {
            // nothing unread; start over from the top
            self.rofs = 0;
            self.wofs = 0;
            if want > cap {
                return Err(Error::Overwrite {
                    requested: want,
                    free: cap,
                });
            }
            return self.pull(src, want);
        }
        let rest = want - first;
        if rest > self.rofs {
            return Err(Error::Overwrite {
                requested: want,
                free: self.free(),
            });
        }
        let got = self.pull(src, first)?;
        if got < first {
            return Ok(got);
        }
        self.wofs = 0;
        self.wrapped = true;
        Ok(got + self.pull(src, rest)?)
    }

    // move the write cursor from the physical end to offset 0
    fn restart_at_top(&mut self) {
        if self.rofs == self.wofs {
            self.rofs = 0;
        } else {
            self.wrapped = true;
        }
        self.wofs = 0;
    }

    // contiguous read from src into [wofs, wofs + want)
    fn pull<S: ByteSource + ?Sized>(&mut self, src: &mut S, want: usize) -> Result<usize, Error> {
        let n = src.read_full(&mut self.data[self.wofs..self.wofs + want])?;
        self.wofs += n;
        Ok(n)
    }

    /// Copy exactly `dest.len()` bytes out, tail first then head.
    ///
    /// Panics if fewer bytes are available.
    pub fn read(&mut self, dest: &mut [u8]) {
        let len = dest.len();
        assert!(len <= self.available(), "ring: read past write cursor");
        let tail = self.contiguous().len();
        if len <= tail {
            dest.copy_from_slice(&self.data[self.rofs..self.rofs + len]);
        } else {
            dest[..tail].copy_from_slice(&self.data[self.rofs..]);
            dest[tail..].copy_from_slice(&self.data[..len - tail]);
        }
        self.advance_read(len);
    }

    /// Copy `src` in at the write cursor, wrapping to the front if needed.
    pub fn write(&mut self, src: &[u8]) -> Result<(), Error> {
        let len = src.len();
        let free = self.free();
        if len > free {
            return Err(Error::Overwrite {
                requested: len,
                free,
            });
        }
        let cap = self.capacity();
        if self.wrapped || self.wofs + len <= cap {
            self.data[self.wofs..self.wofs + len].copy_from_slice(src);
            self.wofs += len;
        } else {
            let first = cap - self.wofs;
            self.data[self.wofs..].copy_from_slice(&src[..first]);
            self.data[..len - first].copy_from_slice(&src[first..]);
            self.wofs = len - first;
            self.wrapped = true;
        }
        self.normalize();
        Ok(())
    }

    /// Advance the read cursor without copying.
    ///
    /// Panics if fewer bytes are available.
    pub fn skip(&mut self, len: usize) {
        assert!(len <= self.available(), "ring: skip past write cursor");
        self.advance_read(len);
    }

    fn advance_read(&mut self, len: usize) {
        let pos = self.rofs + len;
        let cap = self.capacity();
        if self.wrapped && pos >= cap {
            self.rofs = pos - cap;
            self.wrapped = false;
        } else {
            self.rofs = pos;
        }
    }

    // a wrapped ring whose read cursor sits on the physical end holds
    // everything at the front
    fn normalize(&mut self) {
        if self.wrapped && self.rofs == self.capacity() {
            self.rofs = 0;
            self.wrapped = false;
        }
    }

    /// Zero both cursors; storage is kept.
    pub fn reset(&mut self) {
        self.rofs = 0;
        self.wofs = 0;
        self.wrapped = false;
    }

    /// Unread bytes that sit contiguously at the read cursor.
    pub fn contiguous(&self) -> &[u8] {
        if self.wrapped {
            &self.data[self.rofs..]
        } else {
            &self.data[self.rofs..self.wofs]
        }
    }

    /// Writable space that sits contiguously at the write cursor.
    pub fn spare_mut(&mut self) -> &mut [u8] {
        if self.wrapped {
            &mut self.data[self.wofs..self.rofs]
        } else {
            &mut self.data[self.wofs..]
        }
    }

    /// Mark `n` bytes of [`spare_mut`](Self::spare_mut) as written.
    pub fn commit(&mut self, n: usize) {
        let spare = if self.wrapped {
            self.rofs - self.wofs
        } else {
            self.capacity() - self.wofs
        };
        assert!(n <= spare, "ring: commit past free space");
        self.wofs += n;
    }

    /// Move unread bytes to the front; cursors become `(0, available)`.
    pub fn compact(&mut self) {
        let avail = self.available();
        if self.wrapped {
            self.data.rotate_left(self.rofs);
        } else if self.rofs > 0 {
            self.data.copy_within(self.rofs..self.wofs, 0);
        }
        self.rofs = 0;
        self.wofs = avail;
        self.wrapped = false;
    }
}

#[cfg(test)]
mod tests {
    use super::RingBuffer;
    use crate::error::Error;
    use crate::memory::Heap;
    use alloc::vec;
    use alloc::vec::Vec;

    fn ring(cap: usize) -> RingBuffer {
        RingBuffer::open(cap, &mut Heap).unwrap()
    }

    fn pattern(n: usize, seed: u8) -> Vec<u8> {
        (0..n)
            .map(|i| (i as u8).wrapping_mul(31).wrapping_add(seed))
            .collect()
    }

    #[test]
    fn write_read_round_trip_from_any_start() {
        let cap = 13;
        for start in 0..=cap {
            for n in 0..=cap {
                let mut r = ring(cap);
                r.write(&pattern(start, 7)).unwrap();
                r.skip(start);
                let data = pattern(n, start as u8);
                r.write(&data).unwrap();
                assert_eq!(r.available(), n);
                let mut out = vec![0u8; n];
                r.read(&mut out);
                assert_eq!(out, data, "start {} len {}", start, n);
                assert!(r.is_empty());
            }
        }
    }

    #[test]
    fn fill_in_place() {
        let mut r = ring(8);
        let data = [1u8, 2, 3, 4, 5];
        let mut src: &[u8] = &data;
        assert_eq!(r.fill(&mut src, Some(3), false).unwrap(), 3);
        assert_eq!((r.read_offset(), r.write_offset()), (0, 3));
        assert_eq!(r.contiguous(), &[1, 2, 3]);
    }

    #[test]
    fn fill_unspecified_length_stops_at_physical_end() {
        let mut r = ring(4);
        let data = [9u8; 10];
        let mut src: &[u8] = &data;
        assert_eq!(r.fill(&mut src, None, false).unwrap(), 4);
        assert_eq!(src.len(), 6);
    }

    #[test]
    fn fill_at_end_without_wrap_pulls_nothing() {
        let mut r = ring(4);
        let data = [1u8; 8];
        let mut src: &[u8] = &data;
        r.fill(&mut src, None, false).unwrap();
        r.skip(2);
        assert_eq!(r.fill(&mut src, Some(2), false).unwrap(), 0);
        assert_eq!(src.len(), 4);
    }

    #[test]
    fn fill_at_end_with_wrap_restarts_at_zero() {
        let mut r = ring(4);
        let data = [1u8, 2, 3, 4, 5, 6];
        let mut src: &[u8] = &data;
        r.fill(&mut src, None, false).unwrap();
        r.skip(3);
        assert_eq!(r.fill(&mut src, Some(2), true).unwrap(), 2);
        assert!(r.is_wrapped());
        assert_eq!(r.write_offset(), 2);
        let mut out = [0u8; 3];
        r.read(&mut out);
        assert_eq!(out, [4, 5, 6]);
    }

    #[test]
    fn fill_straddling_end() {
        let mut r = ring(6);
        let data: Vec<u8> = (1..=10).collect();
        let mut src: &[u8] = &data;
        r.fill(&mut src, Some(4), false).unwrap();
        r.skip(3);
        // 2 bytes fit before the end, 2 more go to the top
        assert_eq!(r.fill(&mut src, Some(4), true).unwrap(), 4);
        assert_eq!(r.write_offset(), 2);
        assert_eq!(r.available(), 5);
        let mut out = [0u8; 5];
        r.read(&mut out);
        assert_eq!(out, [4, 5, 6, 7, 8]);
    }

    #[test]
    fn fill_straddling_end_without_wrap_truncates() {
        let mut r = ring(6);
        let data = [7u8; 10];
        let mut src: &[u8] = &data;
        r.fill(&mut src, Some(4), false).unwrap();
        assert_eq!(r.fill(&mut src, Some(4), false).unwrap(), 2);
        assert!(!r.is_wrapped());
    }

    #[test]
    fn wrap_onto_unread_data_is_rejected() {
        let mut r = ring(6);
        let data = [1u8; 20];
        let mut src: &[u8] = &data;
        r.fill(&mut src, Some(5), false).unwrap();
        r.skip(1);
        let before = (r.read_offset(), r.write_offset());
        assert!(matches!(
            r.fill(&mut src, Some(3), true),
            Err(Error::Overwrite { requested: 3, .. })
        ));
        // nothing moved
        assert_eq!((r.read_offset(), r.write_offset()), before);
        assert_eq!(r.available(), 4);
    }

    #[test]
    fn write_beyond_free_space_is_rejected() {
        let mut r = ring(4);
        r.write(&[1, 2, 3]).unwrap();
        assert_eq!(
            r.write(&[4, 5]),
            Err(Error::Overwrite {
                requested: 2,
                free: 1
            })
        );
    }

    #[test]
    fn bounded_sequences_never_overwrite() {
        // mixed fills, writes, reads and skips whose total written stays
        // within capacity between resets
        let cap = 32;
        let data = pattern(cap, 3);
        for step in 1..cap {
            let mut r = ring(cap);
            let mut src: &[u8] = &data;
            let mut written = 0;
            let mut toggle = false;
            while written + step <= cap {
                if toggle {
                    r.write(&data[..step]).unwrap();
                } else {
                    assert_eq!(r.fill(&mut src, Some(step), true).unwrap(), step);
                }
                written += step;
                toggle = !toggle;
                let mut out = vec![0u8; step / 2];
                r.read(&mut out);
                r.skip(step - step / 2);
            }
            r.reset();
            assert_eq!((r.read_offset(), r.write_offset()), (0, 0));
        }
    }

    #[test]
    fn compact_moves_leftover_to_front() {
        let mut r = ring(8);
        r.write(&[1, 2, 3, 4, 5, 6]).unwrap();
        r.skip(4);
        r.compact();
        assert_eq!((r.read_offset(), r.write_offset()), (0, 2));
        assert_eq!(r.contiguous(), &[5, 6]);
    }

    #[test]
    fn compact_unwraps() {
        let mut r = ring(5);
        r.write(&[1, 2, 3, 4]).unwrap();
        r.skip(3);
        r.write(&[5, 6, 7]).unwrap();
        assert!(r.is_wrapped());
        r.compact();
        assert_eq!(r.contiguous(), &[4, 5, 6, 7]);
        assert_eq!(r.spare_mut().len(), 1);
    }

    #[test]
    fn spare_and_commit() {
        let mut r = ring(4);
        r.spare_mut()[..3].copy_from_slice(&[7, 8, 9]);
        r.commit(3);
        assert_eq!(r.contiguous(), &[7, 8, 9]);
        assert_eq!(r.spare_mut().len(), 1);
    }

    #[test]
    #[should_panic]
    fn over_read_panics() {
        let mut r = ring(4);
        r.write(&[1]).unwrap();
        let mut out = [0u8; 2];
        r.read(&mut out);
    }
}
