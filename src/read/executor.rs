//! Drives the bytes of a folder's pack streams through its coder graph.
//!
//! Coders run one at a time in the graph's topological order. Each coder reads its inputs
//! to the end, so outputs feeding another coder are buffered until that coder runs,
//! while the folder's main output goes straight into the sink.

use std::io::{self, Cursor, Read, Seek, Write};

use crc::Digest;
use either::Either;
use tracing::debug;

use super::checksum::sevenz_digest;
use super::progress::DecodeProgress;
use super::shared_input::{InputWindow, SharedInput};

use crate::codec::CodecRegistry;
use crate::err::{Error, Result};
use crate::graph::{Folder, GraphError, InputSource, OutStream};

/// Counts and checksums what reaches the sink.
struct MainOutput<'a> {
    sink: &'a mut dyn Write,
    written: u64,
    digest: Digest<'static, u32>,
}

impl Write for MainOutput<'_> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.sink.write(buf)?;
        self.digest.update(&buf[..n]);
        self.written += n as u64;
        return Ok(n);
    }

    fn flush(&mut self) -> io::Result<()> {
        return self.sink.flush();
    }
}

/// Decode one folder.
///
/// `pack_offsets` holds the absolute position of each of the folder's pack streams in `input`.
/// Data mismatches reported by a codec and a wrong folder CRC are [`Error::Data`],
/// every other failure is fatal.
pub fn decode<R: Read + Seek>(
    input: &SharedInput<R>,
    pack_offsets: &[u64],
    folder: &Folder,
    registry: &CodecRegistry,
    sink: &mut dyn Write,
    progress: &mut dyn DecodeProgress,
) -> Result<()> {
    let graph = folder.graph();
    if pack_offsets.len() != folder.pack_sizes().len() {
        return Err(GraphError::SizeMismatch {
            what: "pack offset",
            expected: folder.pack_sizes().len(),
            got: pack_offsets.len(),
        }
        .into());
    }

    // Create every decoder before touching the input, so configuration errors surface first.
    let mut decoders = Vec::with_capacity(graph.coders().len());
    for coder in graph.coders() {
        decoders.push(Some(registry.create(coder)?));
    }

    let main = graph.main_output();
    let mut main_output = MainOutput {
        sink,
        written: 0,
        digest: sevenz_digest(),
    };
    let mut buffers: Vec<Vec<Option<Vec<u8>>>> = graph
        .coders()
        .iter()
        .map(|c| vec![None; c.num_out_streams])
        .collect();
    let mut packed: u64 = 0;

    for &index in graph.order() {
        let coder = &graph.coders()[index];
        let mut decoder = match decoders[index].take() {
            Some(d) => d,
            None => return Err(GraphError::Cycle.into()),
        };

        let mut readers: Vec<Either<InputWindow<R>, Cursor<Vec<u8>>>> =
            Vec::with_capacity(coder.num_in_streams);
        for source in graph.sources(index) {
            match *source {
                InputSource::Pack(p) => {
                    let size = folder.pack_sizes()[p];
                    readers.push(Either::Left(input.window(pack_offsets[p], size)));
                    packed += size;
                }
                InputSource::Coder(out) => {
                    // Every output feeds at most one input and its coder ran earlier.
                    let data = buffers[out.coder][out.stream]
                        .take()
                        .ok_or(GraphError::Cycle)?;
                    readers.push(Either::Right(Cursor::new(data)));
                }
            }
        }

        let out_sizes: Vec<Option<u64>> = (0..coder.num_out_streams)
            .map(|stream| folder.out_size(OutStream { coder: index, stream }))
            .collect();
        let mut produced: Vec<Vec<u8>> = vec![Vec::new(); coder.num_out_streams];
        {
            let mut main_slot = if main.coder == index {
                Some(&mut main_output)
            } else {
                None
            };
            let mut outputs: Vec<&mut dyn Write> = Vec::with_capacity(coder.num_out_streams);
            for (stream, buf) in produced.iter_mut().enumerate() {
                if stream == main.stream {
                    if let Some(m) = main_slot.take() {
                        outputs.push(m);
                        continue;
                    }
                }
                outputs.push(buf);
            }
            let mut inputs: Vec<&mut dyn Read> =
                readers.iter_mut().map(|r| r as &mut dyn Read).collect();

            debug!(coder = index, method = %coder.method, "running coder");
            decoder.decode(&mut inputs, &mut outputs, &out_sizes)?;
        }

        for (stream, buf) in produced.into_iter().enumerate() {
            if (OutStream { coder: index, stream }) != main {
                buffers[index][stream] = Some(buf);
            }
        }
        progress.coder_finished(packed, main_output.written)?;
    }

    main_output.flush()?;
    let MainOutput {
        written, digest, ..
    } = main_output;
    debug!(packed, unpacked = written, "folder decoded");

    if let Some(expected) = folder.unpack_crc() {
        let actual = digest.finalize();
        if actual != expected {
            return Err(Error::Data {
                folder: None,
                reason: format!(
                    "folder CRC mismatch: expected {:08x}, got {:08x}",
                    expected, actual
                ),
            });
        }
    }
    return Ok(());
}
