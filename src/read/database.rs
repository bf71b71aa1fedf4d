//! The in-memory index of an opened archive, as far as extraction needs it.

use crate::err::{Error, Result};
use crate::graph::Folder;

/// What extraction needs to know about a single file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FileEntry {
    pub unpack_size: u64,
    pub crc: Option<u32>,
    /// Files without a stream are empty and stored outside any folder.
    pub has_stream: bool,
}

/// Folders, files and the link tables between them.
#[derive(Debug, Clone, PartialEq)]
pub struct ArchiveDatabase {
    /// Absolute position of the first pack stream.
    pub pack_pos: u64,
    pub folders: Vec<Folder>,
    /// Number of files with data in each folder.
    pub num_unpack_streams: Vec<usize>,
    pub files: Vec<FileEntry>,

    folder_start_pack_stream_index: Vec<usize>,
    pack_stream_offsets: Vec<u64>,
    folder_start_file_index: Vec<usize>,
    file_index_to_folder_index: Vec<Option<usize>>,
}

impl ArchiveDatabase {
    /// Build the database and its link tables.
    ///
    /// Files with data are assigned to folders in order, each folder taking
    /// `num_unpack_streams` of them. Files without data that come between files of the
    /// same folder belong to that folder, all others belong to no folder.
    pub fn new(
        pack_pos: u64,
        folders: Vec<Folder>,
        num_unpack_streams: Vec<usize>,
        files: Vec<FileEntry>,
    ) -> Result<ArchiveDatabase> {
        if num_unpack_streams.len() != folders.len() {
            return Err(Error::invalid(
                "num_unpack_streams",
                format!(
                    "{} entries for {} folders",
                    num_unpack_streams.len(),
                    folders.len()
                ),
            ));
        }

        let mut folder_start_pack_stream_index = Vec::with_capacity(folders.len());
        let mut pack_stream_offsets = Vec::new();
        let mut pos = pack_pos;
        for folder in folders.iter() {
            folder_start_pack_stream_index.push(pack_stream_offsets.len());
            for size in folder.pack_sizes().iter() {
                pack_stream_offsets.push(pos);
                pos = match pos.checked_add(*size) {
                    Some(p) => p,
                    None => return Err(Error::invalid("pack_sizes", "pack streams overflow")),
                };
            }
        }

        let mut folder_start_file_index = vec![files.len(); folders.len()];
        let mut file_index_to_folder_index = Vec::with_capacity(files.len());
        let mut folder_index = 0;
        let mut index_in_folder = 0;
        for (i, file) in files.iter().enumerate() {
            if !file.has_stream && index_in_folder == 0 {
                file_index_to_folder_index.push(None);
                continue;
            }
            if index_in_folder == 0 {
                // Folders without any file streams own no files.
                loop {
                    if folder_index >= folders.len() {
                        return Err(Error::invalid(
                            "files",
                            format!("file {} has data but all folders are used up", i),
                        ));
                    }
                    folder_start_file_index[folder_index] = i;
                    if num_unpack_streams[folder_index] != 0 {
                        break;
                    }
                    folder_index += 1;
                }
            }
            file_index_to_folder_index.push(Some(folder_index));
            if !file.has_stream {
                continue;
            }
            index_in_folder += 1;
            if index_in_folder >= num_unpack_streams[folder_index] {
                folder_index += 1;
                index_in_folder = 0;
            }
        }

        return Ok(ArchiveDatabase {
            pack_pos,
            folders,
            num_unpack_streams,
            files,
            folder_start_pack_stream_index,
            pack_stream_offsets,
            folder_start_file_index,
            file_index_to_folder_index,
        });
    }

    pub fn folder_start_file_index(&self) -> &[usize] {
        return &self.folder_start_file_index;
    }

    pub fn file_index_to_folder_index(&self) -> &[Option<usize>] {
        return &self.file_index_to_folder_index;
    }

    pub fn folder_start_pack_stream_index(&self) -> &[usize] {
        return &self.folder_start_pack_stream_index;
    }

    /// Absolute position of every pack stream.
    pub fn pack_stream_offsets(&self) -> &[u64] {
        return &self.pack_stream_offsets;
    }

    /// Absolute positions of the pack streams of one folder.
    pub fn folder_pack_offsets(&self, folder: usize) -> &[u64] {
        let start = self.folder_start_pack_stream_index[folder];
        let len = self.folders[folder].pack_sizes().len();
        return &self.pack_stream_offsets[start..start + len];
    }

    pub fn file_sizes(&self) -> Vec<u64> {
        return self.files.iter().map(|f| f.unpack_size).collect();
    }
}
