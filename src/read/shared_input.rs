//! One seekable archive input shared by every folder job of an extraction run.

use std::io::{self, Read, Seek, SeekFrom};
use std::sync::{Arc, Mutex};

use tracing::trace;

/// A thread-safe handle to the packed data.
///
/// Clones share the same underlying reader. Reads only happen through
/// [`InputWindow`]s, which seek to an absolute position under the lock before every read,
/// so windows used from different threads never see each other's cursor.
#[derive(Debug)]
pub struct SharedInput<R> {
    inner: Arc<Mutex<R>>,
}

impl<R> Clone for SharedInput<R> {
    fn clone(&self) -> Self {
        return SharedInput {
            inner: Arc::clone(&self.inner),
        };
    }
}

impl<R: Read + Seek> SharedInput<R> {
    pub fn new(reader: R) -> SharedInput<R> {
        return SharedInput {
            inner: Arc::new(Mutex::new(reader)),
        };
    }

    /// A reader over `len` bytes starting at absolute position `offset`.
    pub fn window(&self, offset: u64, len: u64) -> InputWindow<R> {
        trace!(offset, len, "opening input window");
        return InputWindow {
            inner: Arc::clone(&self.inner),
            start: offset,
            len,
            pos: 0,
        };
    }

    /// Get the reader back if no other handle or window is alive.
    pub fn into_inner(self) -> Option<R> {
        let mutex = Arc::try_unwrap(self.inner).ok()?;
        return mutex.into_inner().ok();
    }
}

/// A bounded view into a [`SharedInput`].
///
/// Reading past the end of the window yields EOF, while the underlying input
/// ending before the window does is an error.
#[derive(Debug)]
pub struct InputWindow<R> {
    inner: Arc<Mutex<R>>,
    start: u64,
    len: u64,
    pos: u64,
}

impl<R> InputWindow<R> {
    pub fn remaining(&self) -> u64 {
        return self.len - self.pos;
    }
}

impl<R: Read + Seek> Read for InputWindow<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let remaining = self.remaining();
        if remaining == 0 || buf.is_empty() {
            return Ok(0);
        }
        let want = buf.len().min(usize::try_from(remaining).unwrap_or(usize::MAX));

        let mut reader = self
            .inner
            .lock()
            .map_err(|_| io::Error::new(io::ErrorKind::Other, "shared input lock poisoned"))?;
        reader.seek(SeekFrom::Start(self.start + self.pos))?;
        let n = reader.read(&mut buf[..want])?;
        drop(reader);

        if n == 0 {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!(
                    "input ended {} bytes into a {} byte window at {}",
                    self.pos, self.len, self.start
                ),
            ));
        }
        self.pos += n as u64;
        return Ok(n);
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::io::Cursor;

    fn input() -> SharedInput<Cursor<Vec<u8>>> {
        return SharedInput::new(Cursor::new((0u8..100).collect()));
    }

    #[test]
    fn windows_are_bounded() {
        let shared = input();
        let mut w = shared.window(10, 5);
        let mut out = Vec::new();
        w.read_to_end(&mut out).unwrap();
        assert_eq!(out, vec![10, 11, 12, 13, 14]);
        assert_eq!(w.remaining(), 0);
    }

    #[test]
    fn interleaved_windows_keep_their_positions() {
        let shared = input();
        let mut a = shared.window(0, 4);
        let mut b = shared.clone().window(50, 4);
        let mut buf = [0u8; 2];
        a.read_exact(&mut buf).unwrap();
        assert_eq!(buf, [0, 1]);
        b.read_exact(&mut buf).unwrap();
        assert_eq!(buf, [50, 51]);
        a.read_exact(&mut buf).unwrap();
        assert_eq!(buf, [2, 3]);
        b.read_exact(&mut buf).unwrap();
        assert_eq!(buf, [52, 53]);
    }

    #[test]
    fn truncated_input_is_an_error() {
        let shared = input();
        let mut w = shared.window(95, 10);
        let mut out = Vec::new();
        let err = w.read_to_end(&mut out).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
    }

    #[test]
    fn threads_share_one_reader() {
        let shared = input();
        let handles: Vec<_> = (0..4u64)
            .map(|i| {
                let s = shared.clone();
                std::thread::spawn(move || {
                    let mut out = Vec::new();
                    s.window(i * 20, 20).read_to_end(&mut out).unwrap();
                    out
                })
            })
            .collect();
        for (i, h) in handles.into_iter().enumerate() {
            let expected: Vec<u8> = (i as u8 * 20..i as u8 * 20 + 20).collect();
            assert_eq!(h.join().unwrap(), expected);
        }
        assert!(shared.into_inner().is_some());
    }
}
