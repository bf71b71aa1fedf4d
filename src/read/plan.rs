//! Groups requested files into per-folder extraction jobs.

use bitvec::prelude::*;

use crate::err::{Error, Result};

/// The work for one folder, or for one file stored outside any folder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FolderJob {
    /// `None` for a file without packed data.
    pub folder: Option<usize>,
    /// Index of the file the first `materialize` flag belongs to.
    pub start_file: usize,
    /// One flag per file from `start_file` on: write it out, or decode and drop it.
    pub materialize: BitVec,
    /// Unpacked size of all files the job covers.
    pub unpack_size: u64,
    /// Unpacked size of the files that are written out.
    pub important_size: u64,
}

impl FolderJob {
    /// A job covering `files` with nothing requested yet.
    fn spanning(folder: Option<usize>, files: std::ops::Range<usize>, sizes: &[u64]) -> FolderJob {
        return FolderJob {
            folder,
            start_file: files.start,
            materialize: BitVec::repeat(false, files.len()),
            unpack_size: sizes[files].iter().sum(),
            important_size: 0,
        };
    }

    /// The file indices this job covers.
    pub fn files(&self) -> std::ops::Range<usize> {
        return self.start_file..self.start_file + self.materialize.len();
    }

    fn request(&mut self, file: usize, sizes: &[u64]) {
        let pos = file - self.start_file;
        if !self.materialize[pos] {
            self.materialize.set(pos, true);
            self.important_size += sizes[file];
        }
    }
}

/// Plan the extraction of `requested`, which must be sorted and free of duplicates.
///
/// Decoding a folder always runs from its first file to its last,
/// so a folder job covers all of the folder's files and only flags the requested ones.
pub fn plan(
    requested: &[usize],
    file_to_folder: &[Option<usize>],
    folder_start_file: &[usize],
    file_sizes: &[u64],
) -> Result<Vec<FolderJob>> {
    if file_to_folder.len() != file_sizes.len() {
        return Err(Error::invalid(
            "file_sizes",
            format!(
                "{} sizes for {} files",
                file_sizes.len(),
                file_to_folder.len()
            ),
        ));
    }

    let mut jobs: Vec<FolderJob> = Vec::new();
    let mut previous: Option<usize> = None;
    for &file in requested {
        if previous.map_or(false, |p| p >= file) {
            return Err(Error::invalid(
                file.to_string(),
                "file indices must be sorted and unique",
            ));
        }
        previous = Some(file);

        let folder = match file_to_folder.get(file) {
            Some(f) => *f,
            None => {
                return Err(Error::invalid(
                    file.to_string(),
                    format!("archive has {} files", file_to_folder.len()),
                ))
            }
        };
        let folder = match folder {
            Some(f) => f,
            None => {
                let mut job = FolderJob::spanning(None, file..file + 1, file_sizes);
                job.request(file, file_sizes);
                jobs.push(job);
                continue;
            }
        };

        if let Some(job) = jobs.last_mut() {
            if job.folder == Some(folder) {
                job.request(file, file_sizes);
                continue;
            }
        }
        let start = match folder_start_file.get(folder) {
            Some(&s) if s <= file => s,
            _ => {
                return Err(Error::invalid(
                    file.to_string(),
                    format!("folder {} has no valid start file", folder),
                ))
            }
        };
        let end = start
            + file_to_folder[start..]
                .iter()
                .take_while(|f| **f == Some(folder))
                .count();
        if end <= file {
            return Err(Error::invalid(
                file.to_string(),
                format!("file is not among the files of folder {}", folder),
            ));
        }
        let mut job = FolderJob::spanning(Some(folder), start..end, file_sizes);
        job.request(file, file_sizes);
        jobs.push(job);
    }
    return Ok(jobs);
}
