//! This module implements extracting files from the folders of an archive.
//!
//! Requested files are grouped into folder jobs by [`plan`], every job is decoded by
//! [`decode`] into a [`FolderOutputSplitter`], and a [`ProgressAggregator`] keeps
//! the running totals reported to the caller's [`ExtractCallback`].

mod callback;
mod checksum;
mod database;
mod executor;
mod plan;
mod progress;
mod shared_input;
mod splitter;

pub use callback::{AskMode, ExtractCallback, OperationResult};
pub use checksum::*;
pub use database::*;
pub use executor::*;
pub use plan::*;
pub use progress::*;
pub use shared_input::*;
pub use splitter::*;

use std::io::{Read, Seek};
use std::ops::ControlFlow;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tracing::{debug, warn};

use callback::CallbackCell;

use crate::codec::{CodecError, CodecRegistry};
use crate::err::{Error, FatalError, Result};
use crate::method::MethodId;

/// How an extraction run behaves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ExtractOptions {
    /// Decode and check files without asking for real output streams.
    pub test_mode: bool,
    /// Turn a run that lost any data into an error.
    pub require_full_success: bool,
}

/// What an extraction run achieved.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ExtractSummary {
    /// Folders that were skipped because of a data error or an unsupported method.
    pub failed_folders: Vec<usize>,
    /// Files whose data didn't match their CRC.
    pub crc_failures: Vec<usize>,
    /// Requested files that were written (or tested) without error.
    pub files_written: usize,
}

impl ExtractSummary {
    /// Whether every requested file came out intact.
    pub fn is_complete(&self) -> bool {
        return self.failed_folders.is_empty() && self.crc_failures.is_empty();
    }
}

enum JobOutcome {
    Done,
    Unsupported(MethodId),
}

/// Reports a job's progress to the callback after every coder step.
struct JobProgress<'a, 'c> {
    callback: &'a CallbackCell<'c>,
    base: u64,
    important: Arc<AtomicU64>,
}

impl DecodeProgress for JobProgress<'_, '_> {
    fn coder_finished(&mut self, packed: u64, unpacked: u64) -> Result<()> {
        let completed = self.base + self.important.load(Ordering::Relaxed);
        debug!(packed, unpacked, completed, "coder step finished");
        return poll(self.callback, completed);
    }
}

fn poll(callback: &CallbackCell<'_>, completed: u64) -> Result<()> {
    match callback.with(|cb| cb.set_completed(completed))? {
        ControlFlow::Continue(()) => Ok(()),
        ControlFlow::Break(()) => Err(FatalError::Cancelled.into()),
    }
}

/// Extracts files from an archive described by an [`ArchiveDatabase`].
pub struct Extractor<'a, R> {
    db: &'a ArchiveDatabase,
    input: SharedInput<R>,
    registry: &'a CodecRegistry,
}

impl<'a, R: Read + Seek> Extractor<'a, R> {
    pub fn new(
        db: &'a ArchiveDatabase,
        input: SharedInput<R>,
        registry: &'a CodecRegistry,
    ) -> Extractor<'a, R> {
        return Extractor {
            db,
            input,
            registry,
        };
    }

    /// Extract every file of the archive.
    pub fn extract_all(
        &self,
        options: ExtractOptions,
        callback: &mut dyn ExtractCallback,
    ) -> Result<ExtractSummary> {
        let indices: Vec<usize> = (0..self.db.files.len()).collect();
        return self.extract(&indices, options, callback);
    }

    /// Extract the files with the given indices.
    ///
    /// A folder that fails to decode is reported through the callback and skipped,
    /// the returned summary lists it. Fatal errors abort the run.
    pub fn extract(
        &self,
        indices: &[usize],
        options: ExtractOptions,
        callback: &mut dyn ExtractCallback,
    ) -> Result<ExtractSummary> {
        let mut indices = indices.to_vec();
        indices.sort_unstable();
        indices.dedup();

        let jobs = plan(
            &indices,
            self.db.file_index_to_folder_index(),
            self.db.folder_start_file_index(),
            &self.db.file_sizes(),
        )?;
        let progress = ProgressAggregator::new();
        let total = progress.set_total(jobs.iter().map(|j| j.important_size).sum());
        callback.set_total(total);

        let callback = CallbackCell::new(callback);
        let mut summary = ExtractSummary::default();
        let mut first_failure: Option<Error> = None;

        for job in jobs.iter() {
            poll(&callback, progress.completed())?;
            debug!(
                folder = ?job.folder,
                start_file = job.start_file,
                files = job.materialize.len(),
                "starting folder job"
            );
            match self.run_job(job, options, &callback, &progress, &mut summary) {
                Ok(JobOutcome::Done) => {}
                Ok(JobOutcome::Unsupported(method)) => {
                    warn!(folder = ?job.folder, %method, "skipping folder with unsupported method");
                    summary.failed_folders.extend(job.folder);
                    first_failure.get_or_insert(CodecError::UnsupportedMethod(method).into());
                }
                Err(e) if e.is_recoverable() => {
                    warn!(folder = ?job.folder, error = %e, "skipping corrupt folder");
                    summary.failed_folders.extend(job.folder);
                    first_failure.get_or_insert(e);
                }
                Err(e) => return Err(e),
            }
            progress.advance(job.important_size);
        }
        poll(&callback, progress.completed())?;

        if options.require_full_success && !summary.is_complete() {
            return Err(match first_failure {
                Some(e) => e,
                None => Error::Data {
                    folder: None,
                    reason: format!("{} files failed their CRC check", summary.crc_failures.len()),
                },
            });
        }
        return Ok(summary);
    }

    fn run_job(
        &self,
        job: &FolderJob,
        options: ExtractOptions,
        callback: &CallbackCell<'_>,
        progress: &ProgressAggregator,
        summary: &mut ExtractSummary,
    ) -> Result<JobOutcome> {
        let mut splitter =
            FolderOutputSplitter::new(job, &self.db.files, callback, options.test_mode);
        let res = self.decode_job(job, &mut splitter, callback, progress);

        let outcome = match res {
            Ok(JobOutcome::Unsupported(method)) => {
                splitter.flush_corrupted(OperationResult::Unsupported)?;
                Ok(JobOutcome::Unsupported(method))
            }
            Err(e) if e.is_recoverable() => {
                splitter.flush_corrupted(OperationResult::DataError)?;
                Err(match job.folder {
                    Some(f) => e.in_folder(f),
                    None => e,
                })
            }
            other => other,
        };
        summary.files_written += splitter.files_ok();
        summary.crc_failures.extend_from_slice(splitter.crc_failures());
        return outcome;
    }

    fn decode_job(
        &self,
        job: &FolderJob,
        splitter: &mut FolderOutputSplitter<'_, '_>,
        callback: &CallbackCell<'_>,
        progress: &ProgressAggregator,
    ) -> Result<JobOutcome> {
        let index = match job.folder {
            Some(f) => f,
            None => {
                splitter.was_writing_finished()?;
                return Ok(JobOutcome::Done);
            }
        };
        let folder = &self.db.folders[index];
        if let Some(coder) = folder
            .graph()
            .coders()
            .iter()
            .find(|c| !self.registry.supports(&c.method))
        {
            return Ok(JobOutcome::Unsupported(coder.method.clone()));
        }

        let mut job_progress = JobProgress {
            callback,
            base: progress.completed(),
            important: splitter.important_counter(),
        };
        decode(
            &self.input,
            self.db.folder_pack_offsets(index),
            folder,
            self.registry,
            splitter,
            &mut job_progress,
        )?;
        splitter.was_writing_finished()?;
        debug!(folder = index, "folder job finished");
        return Ok(JobOutcome::Done);
    }
}
