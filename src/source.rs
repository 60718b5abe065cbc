// Sequential byte sources. The decoder only ever reads forward and skips
// forward; it never seeks back.

use crate::error::Error;

/// Forward-only byte stream: a PNG file on disk, in flash, or in memory.
pub trait ByteSource {
    /// Read up to `buf.len()` bytes. Returns 0 only at end of stream.
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Error>;

    /// Read until `buf` is full or the stream ends; returns bytes read.
    fn read_full(&mut self, buf: &mut [u8]) -> Result<usize, Error> {
        let mut done = 0usize;
        while done < buf.len() {
            let n = self.read(&mut buf[done..])?;
            if n == 0 {
                break;
            }
            done += n;
        }
        Ok(done)
    }

    fn read_exact(&mut self, buf: &mut [u8]) -> Result<(), Error> {
        if self.read_full(buf)? < buf.len() {
            return Err(Error::Format("unexpected end of file"));
        }
        Ok(())
    }

    fn skip(&mut self, mut n: usize) -> Result<(), Error> {
        let mut trash = [0u8; 64];
        while n > 0 {
            let chunk = n.min(trash.len());
            self.read_exact(&mut trash[..chunk])?;
            n -= chunk;
        }
        Ok(())
    }
}

impl<S: ByteSource + ?Sized> ByteSource for &mut S {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Error> {
        (**self).read(buf)
    }

    fn skip(&mut self, n: usize) -> Result<(), Error> {
        (**self).skip(n)
    }
}

// whole file already in memory; reading consumes from the front
impl ByteSource for &[u8] {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Error> {
        let n = buf.len().min(self.len());
        buf[..n].copy_from_slice(&self[..n]);
        *self = &self[n..];
        Ok(n)
    }

    fn skip(&mut self, n: usize) -> Result<(), Error> {
        if n > self.len() {
            return Err(Error::Format("unexpected end of file"));
        }
        *self = &self[n..];
        Ok(())
    }
}

/// Adapter for anything implementing [`std::io::Read`].
#[cfg(feature = "std")]
pub struct IoSource<R> {
    inner: R,
}

#[cfg(feature = "std")]
impl<R: std::io::Read> IoSource<R> {
    pub fn new(inner: R) -> Self {
        Self { inner }
    }

    pub fn into_inner(self) -> R {
        self.inner
    }
}

#[cfg(feature = "std")]
impl<R: std::io::Read> ByteSource for IoSource<R> {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Error> {
        loop {
            match self.inner.read(buf) {
                Ok(n) => return Ok(n),
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    log::error!("png: source read failed: {}", e);
                    return Err(Error::Io("i/o error"));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::ByteSource;
    use crate::error::Error;

    // hands out at most 3 bytes per call
    struct Dribble<'a>(&'a [u8]);

    impl ByteSource for Dribble<'_> {
        fn read(&mut self, buf: &mut [u8]) -> Result<usize, Error> {
            let n = buf.len().min(self.0.len()).min(3);
            buf[..n].copy_from_slice(&self.0[..n]);
            self.0 = &self.0[n..];
            Ok(n)
        }
    }

    #[test]
    fn read_exact_gathers_short_reads() {
        let mut src = Dribble(&[1, 2, 3, 4, 5, 6, 7, 8]);
        let mut buf = [0u8; 7];
        src.read_exact(&mut buf).unwrap();
        assert_eq!(buf, [1, 2, 3, 4, 5, 6, 7]);
        assert_eq!(src.read_full(&mut buf).unwrap(), 1);
    }

    #[test]
    fn slice_skip_past_end_is_format_error() {
        let data = [0u8; 10];
        let mut src: &[u8] = &data;
        src.skip(4).unwrap();
        assert_eq!(src.len(), 6);
        assert!(matches!(src.skip(7), Err(Error::Format(_))));
    }

    #[test]
    fn default_skip_reads_through() {
        let data: [u8; 100] = core::array::from_fn(|i| i as u8);
        let mut src = Dribble(&data);
        src.skip(90).unwrap();
        let mut b = [0u8; 1];
        src.read_exact(&mut b).unwrap();
        assert_eq!(b[0], 90);
    }
}
