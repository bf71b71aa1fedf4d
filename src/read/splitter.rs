//! Cuts a folder's unpacked stream into the files it's made of.

use std::io::{self, Write};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use bitvec::slice::BitSlice;
use crc::Digest;
use either::Either;
use tracing::warn;

use super::callback::{AskMode, CallbackCell, OperationResult};
use super::checksum::sevenz_digest;
use super::database::FileEntry;
use super::plan::FolderJob;

use crate::err::{Error, Result};

struct ActiveFile {
    index: usize,
    remaining: u64,
    out: Either<Box<dyn Write>, io::Sink>,
    /// Only requested files are checksummed and reported.
    digest: Option<Digest<'static, u32>>,
}

/// The sink a folder is decoded into.
///
/// Consecutive byte ranges go to the files of the job in order: requested files to the
/// stream the callback hands out, all others nowhere.
/// Empty files are opened and closed without waiting for data,
/// and bytes past the job's last file are dropped.
pub struct FolderOutputSplitter<'a, 'c> {
    files: &'a [FileEntry],
    start_file: usize,
    materialize: &'a BitSlice,
    callback: &'a CallbackCell<'c>,
    mode: AskMode,
    /// Position in `materialize` of the next file to open.
    next: usize,
    active: Option<ActiveFile>,
    expected: u64,
    received: u64,
    important: Arc<AtomicU64>,
    files_ok: usize,
    crc_failures: Vec<usize>,
}

impl<'a, 'c> FolderOutputSplitter<'a, 'c> {
    pub(crate) fn new(
        job: &'a FolderJob,
        files: &'a [FileEntry],
        callback: &'a CallbackCell<'c>,
        test_mode: bool,
    ) -> FolderOutputSplitter<'a, 'c> {
        return FolderOutputSplitter {
            files,
            start_file: job.start_file,
            materialize: job.materialize.as_bitslice(),
            callback,
            mode: if test_mode {
                AskMode::Test
            } else {
                AskMode::Extract
            },
            next: 0,
            active: None,
            expected: job.unpack_size,
            received: 0,
            important: Arc::new(AtomicU64::new(0)),
            files_ok: 0,
            crc_failures: Vec::new(),
        };
    }

    /// Counts the bytes that reached requested files.
    pub fn important_counter(&self) -> Arc<AtomicU64> {
        return Arc::clone(&self.important);
    }

    /// Number of requested files that were completed without error.
    pub fn files_ok(&self) -> usize {
        return self.files_ok;
    }

    /// Requested files whose data didn't match their CRC.
    pub fn crc_failures(&self) -> &[usize] {
        return &self.crc_failures;
    }

    fn file_size(&self, index: usize) -> io::Result<u64> {
        match self.files.get(index) {
            Some(f) => Ok(f.unpack_size),
            None => Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("job refers to missing file {}", index),
            )),
        }
    }

    fn open_next(&mut self) -> io::Result<()> {
        while self.active.is_none() && self.next < self.materialize.len() {
            let index = self.start_file + self.next;
            let size = self.file_size(index)?;
            let wanted = self.materialize[self.next];
            let out = if wanted {
                let mode = self.mode;
                self.callback.with(|cb| cb.get_stream(index, mode))??
            } else {
                None
            };
            self.active = Some(ActiveFile {
                index,
                remaining: size,
                out: match out {
                    Some(w) => Either::Left(w),
                    None => Either::Right(io::sink()),
                },
                digest: if wanted { Some(sevenz_digest()) } else { None },
            });
            if size == 0 {
                self.finish_file()?;
            }
        }
        return Ok(());
    }

    fn finish_file(&mut self) -> io::Result<()> {
        let file = match self.active.take() {
            Some(f) => f,
            None => return Ok(()),
        };
        self.next += 1;
        let mut out = file.out;
        out.flush()?;
        drop(out);

        let digest = match file.digest {
            Some(d) => d,
            None => return Ok(()),
        };
        let actual = digest.finalize();
        let result = match self.files[file.index].crc {
            Some(expected) if expected != actual => {
                warn!(
                    file = file.index,
                    expected, actual, "file CRC mismatch"
                );
                self.crc_failures.push(file.index);
                OperationResult::CrcError
            }
            _ => {
                self.files_ok += 1;
                OperationResult::Ok
            }
        };
        return self
            .callback
            .with(|cb| cb.set_operation_result(file.index, result));
    }

    /// Check that the folder delivered every byte the job's files need,
    /// and close any empty files at the end of the job.
    pub fn was_writing_finished(&mut self) -> Result<()> {
        if self.received < self.expected {
            return Err(Error::IncompleteWrite {
                expected: self.expected,
                written: self.received,
            });
        }
        self.open_next()?;
        return Ok(());
    }

    /// Close the file being written and report `result` for it
    /// and every requested file not reached yet.
    pub fn flush_corrupted(&mut self, result: OperationResult) -> io::Result<()> {
        if let Some(file) = self.active.take() {
            self.next += 1;
            let mut out = file.out;
            out.flush()?;
            drop(out);
            if file.digest.is_some() {
                self.callback
                    .with(|cb| cb.set_operation_result(file.index, result))?;
            }
        }
        while self.next < self.materialize.len() {
            if self.materialize[self.next] {
                let index = self.start_file + self.next;
                self.callback
                    .with(|cb| cb.set_operation_result(index, result))?;
            }
            self.next += 1;
        }
        return Ok(());
    }
}

impl Write for FolderOutputSplitter<'_, '_> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut rest = buf;
        while !rest.is_empty() {
            self.open_next()?;
            let file = match self.active.as_mut() {
                Some(f) => f,
                None => break,
            };
            let n = usize::try_from(file.remaining).map_or(rest.len(), |r| r.min(rest.len()));
            let (chunk, tail) = rest.split_at(n);
            file.out.write_all(chunk)?;
            if let Some(digest) = file.digest.as_mut() {
                digest.update(chunk);
                self.important.fetch_add(n as u64, Ordering::Relaxed);
            }
            file.remaining -= n as u64;
            rest = tail;
            if file.remaining == 0 {
                self.finish_file()?;
            }
        }
        self.received += buf.len() as u64;
        return Ok(buf.len());
    }

    fn flush(&mut self) -> io::Result<()> {
        match self.active.as_mut() {
            Some(file) => file.out.flush(),
            None => Ok(()),
        }
    }
}
