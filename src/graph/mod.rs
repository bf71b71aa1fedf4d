//! The coder graph of a 7zip folder.
//!
//! Coders are nodes addressed by their index in the folder, bind pairs are edges
//! from one coder's output stream to another coder's input stream.
//! Every input that isn't bound is fed by a pack stream, and exactly one output
//! is left unbound: that's the folder's unpacked data.
//!
//! All arities are given in decoding direction, i.e. a coder's inputs are
//! on the packed side.
//!
//! The graph is validated once when it's constructed, so consumers may rely on it
//! being a single DAG with a single sink.

mod coder;
pub use coder::*;

use std::fmt;

use thiserror::Error;

/// Most input or output streams a single folder may have in total.
pub const MAX_FOLDER_STREAMS: usize = 64;

/// An input stream of a coder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InStream {
    pub coder: usize,
    pub stream: usize,
}

/// An output stream of a coder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OutStream {
    pub coder: usize,
    pub stream: usize,
}

/// Connects the output of one coder to the input of another.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BindPair {
    pub out_coder: usize,
    pub out_stream: usize,
    pub in_coder: usize,
    pub in_stream: usize,
}

impl BindPair {
    pub fn new(output: OutStream, input: InStream) -> BindPair {
        return BindPair {
            out_coder: output.coder,
            out_stream: output.stream,
            in_coder: input.coder,
            in_stream: input.stream,
        };
    }

    pub fn output(&self) -> OutStream {
        return OutStream {
            coder: self.out_coder,
            stream: self.out_stream,
        };
    }

    pub fn input(&self) -> InStream {
        return InStream {
            coder: self.in_coder,
            stream: self.in_stream,
        };
    }
}

/// Formats as a bind directive, always spelling out the stream numbers.
impl fmt::Display for BindPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "B{}S{}:{}S{}",
            self.out_coder, self.out_stream, self.in_coder, self.in_stream
        )
    }
}

/// Where a coder input gets its bytes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputSource {
    /// The n-th pack stream of the folder.
    Pack(usize),
    Coder(OutStream),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphError {
    #[error("graph has no coders")]
    NoCoders,
    #[error("coder {0} has no input or no output streams")]
    ZeroArity(usize),
    #[error("bind pair {0} refers to a coder or stream that doesn't exist")]
    DanglingBindPair(BindPair),
    #[error("pack stream refers to missing input stream {0:?}")]
    DanglingPackStream(InStream),
    #[error("input {0:?} is fed more than once")]
    InputFedTwice(InStream),
    #[error("output {0:?} is bound more than once")]
    OutputBoundTwice(OutStream),
    #[error("input {0:?} has no source")]
    UnfedInput(InStream),
    #[error("expected exactly one unbound output, found {0}")]
    UnboundOutputs(usize),
    #[error("bind pairs form a cycle")]
    Cycle,
    #[error("folder has too many {0} streams")]
    TooManyStreams(&'static str),
    #[error("folder has {expected} {what} sizes, got {got}")]
    SizeMismatch {
        what: &'static str,
        expected: usize,
        got: usize,
    },
}

/// A validated coder graph.
#[derive(Debug, Clone, PartialEq)]
pub struct CoderGraph {
    coders: Vec<Coder>,
    bind_pairs: Vec<BindPair>,
    pack_streams: Vec<InStream>,
    sources: Vec<Vec<InputSource>>,
    main_output: OutStream,
    order: Vec<usize>,
    /// Folder-wide number of each coder's first output.
    out_offsets: Vec<usize>,
    num_out_streams_total: usize,
}

/// Add `n` streams to a folder-wide total, staying within [`MAX_FOLDER_STREAMS`].
pub fn add_streams(total: usize, n: usize, what: &'static str) -> Result<usize, GraphError> {
    match total.checked_add(n) {
        Some(t) if t <= MAX_FOLDER_STREAMS => Ok(t),
        _ => Err(GraphError::TooManyStreams(what)),
    }
}

impl CoderGraph {
    /// Build a graph, feeding pack stream `i` into `pack_streams[i]`.
    pub fn new(
        coders: Vec<Coder>,
        bind_pairs: Vec<BindPair>,
        pack_streams: Vec<InStream>,
    ) -> Result<CoderGraph, GraphError> {
        if coders.is_empty() {
            return Err(GraphError::NoCoders);
        }
        let mut num_in_streams_total = 0;
        let mut num_out_streams_total = 0;
        let mut out_offsets = Vec::with_capacity(coders.len());
        for (i, c) in coders.iter().enumerate() {
            if c.num_in_streams == 0 || c.num_out_streams == 0 {
                return Err(GraphError::ZeroArity(i));
            }
            out_offsets.push(num_out_streams_total);
            num_in_streams_total = add_streams(num_in_streams_total, c.num_in_streams, "input")?;
            num_out_streams_total = add_streams(num_out_streams_total, c.num_out_streams, "output")?;
        }

        let mut sources: Vec<Vec<Option<InputSource>>> = coders
            .iter()
            .map(|c| vec![None; c.num_in_streams])
            .collect();
        let mut bound_outputs: Vec<Vec<bool>> = coders
            .iter()
            .map(|c| vec![false; c.num_out_streams])
            .collect();

        for bp in bind_pairs.iter() {
            let out_ok = coders
                .get(bp.out_coder)
                .map_or(false, |c| bp.out_stream < c.num_out_streams);
            let in_ok = coders
                .get(bp.in_coder)
                .map_or(false, |c| bp.in_stream < c.num_in_streams);
            if !out_ok || !in_ok {
                return Err(GraphError::DanglingBindPair(*bp));
            }
            let slot = &mut sources[bp.in_coder][bp.in_stream];
            if slot.is_some() {
                return Err(GraphError::InputFedTwice(bp.input()));
            }
            *slot = Some(InputSource::Coder(bp.output()));
            let out = &mut bound_outputs[bp.out_coder][bp.out_stream];
            if *out {
                return Err(GraphError::OutputBoundTwice(bp.output()));
            }
            *out = true;
        }

        for (i, ps) in pack_streams.iter().enumerate() {
            let slot = match sources.get_mut(ps.coder).and_then(|s| s.get_mut(ps.stream)) {
                Some(slot) => slot,
                None => return Err(GraphError::DanglingPackStream(*ps)),
            };
            if slot.is_some() {
                return Err(GraphError::InputFedTwice(*ps));
            }
            *slot = Some(InputSource::Pack(i));
        }

        let mut resolved: Vec<Vec<InputSource>> = Vec::with_capacity(coders.len());
        for (coder, inputs) in sources.into_iter().enumerate() {
            let mut v = Vec::with_capacity(inputs.len());
            for (stream, src) in inputs.into_iter().enumerate() {
                match src {
                    Some(s) => v.push(s),
                    None => return Err(GraphError::UnfedInput(InStream { coder, stream })),
                }
            }
            resolved.push(v);
        }

        let unbound: Vec<OutStream> = bound_outputs
            .iter()
            .enumerate()
            .flat_map(|(coder, outs)| {
                outs.iter()
                    .enumerate()
                    .filter(|(_, bound)| !**bound)
                    .map(move |(stream, _)| OutStream { coder, stream })
            })
            .collect();
        if unbound.len() != 1 {
            return Err(GraphError::UnboundOutputs(unbound.len()));
        }
        let main_output = unbound[0];

        // With a single unbound output and no cycles every coder drains into the
        // main output, so a topological order also proves connectivity.
        let order = topological_order(&resolved)?;

        return Ok(CoderGraph {
            coders,
            bind_pairs,
            pack_streams,
            sources: resolved,
            main_output,
            order,
            out_offsets,
            num_out_streams_total,
        });
    }

    /// Build a graph whose pack streams feed the unbound inputs in coder/stream order.
    pub fn with_implicit_pack_streams(
        coders: Vec<Coder>,
        bind_pairs: Vec<BindPair>,
    ) -> Result<CoderGraph, GraphError> {
        coders
            .iter()
            .try_fold(0, |t, c| add_streams(t, c.num_in_streams, "input"))?;
        let mut pack_streams = Vec::new();
        for (coder, c) in coders.iter().enumerate() {
            for stream in 0..c.num_in_streams {
                if !bind_pairs
                    .iter()
                    .any(|bp| bp.in_coder == coder && bp.in_stream == stream)
                {
                    pack_streams.push(InStream { coder, stream });
                }
            }
        }
        return CoderGraph::new(coders, bind_pairs, pack_streams);
    }

    pub fn coders(&self) -> &[Coder] {
        return &self.coders;
    }

    pub fn bind_pairs(&self) -> &[BindPair] {
        return &self.bind_pairs;
    }

    /// Inputs fed by pack streams, in pack stream order.
    pub fn pack_streams(&self) -> &[InStream] {
        return &self.pack_streams;
    }

    pub fn num_pack_streams(&self) -> usize {
        return self.pack_streams.len();
    }

    /// The output carrying the folder's unpacked data.
    pub fn main_output(&self) -> OutStream {
        return self.main_output;
    }

    /// Coder indices such that every coder comes after all coders feeding it.
    pub fn order(&self) -> &[usize] {
        return &self.order;
    }

    pub fn source(&self, input: InStream) -> InputSource {
        return self.sources[input.coder][input.stream];
    }

    pub fn sources(&self, coder: usize) -> &[InputSource] {
        return &self.sources[coder];
    }

    pub fn num_out_streams_total(&self) -> usize {
        return self.num_out_streams_total;
    }

    /// Position of an output when all outputs of the folder are numbered consecutively,
    /// or `None` if the graph has no such output.
    pub fn out_stream_index(&self, out: OutStream) -> Option<usize> {
        let coder = self.coders.get(out.coder)?;
        if out.stream >= coder.num_out_streams {
            return None;
        }
        return Some(self.out_offsets[out.coder] + out.stream);
    }
}

/// Kahn's algorithm, always picking the lowest ready coder index.
fn topological_order(sources: &[Vec<InputSource>]) -> Result<Vec<usize>, GraphError> {
    let n = sources.len();
    let mut pending: Vec<usize> = sources
        .iter()
        .map(|inputs| {
            inputs
                .iter()
                .filter(|s| matches!(s, InputSource::Coder(_)))
                .count()
        })
        .collect();
    let mut done = vec![false; n];
    let mut order = Vec::with_capacity(n);

    while order.len() < n {
        let next = match (0..n).find(|&i| !done[i] && pending[i] == 0) {
            Some(i) => i,
            None => return Err(GraphError::Cycle),
        };
        done[next] = true;
        order.push(next);
        for (consumer, inputs) in sources.iter().enumerate() {
            for s in inputs.iter() {
                if let InputSource::Coder(out) = s {
                    if out.coder == next {
                        pending[consumer] -= 1;
                    }
                }
            }
        }
    }
    return Ok(order);
}

/// A solid block: a coder graph plus the sizes of the streams flowing through it.
///
/// Only [`Folder::new`] builds one, so the sizes always fit the graph.
#[derive(Debug, Clone, PartialEq)]
pub struct Folder {
    graph: CoderGraph,
    pack_sizes: Vec<u64>,
    unpack_sizes: Vec<u64>,
    unpack_crc: Option<u32>,
}

impl Folder {
    pub fn new(
        graph: CoderGraph,
        pack_sizes: Vec<u64>,
        unpack_sizes: Vec<u64>,
        unpack_crc: Option<u32>,
    ) -> Result<Folder, GraphError> {
        if pack_sizes.len() != graph.num_pack_streams() {
            return Err(GraphError::SizeMismatch {
                what: "pack stream",
                expected: graph.num_pack_streams(),
                got: pack_sizes.len(),
            });
        }
        if !unpack_sizes.is_empty() && unpack_sizes.len() != graph.num_out_streams_total() {
            return Err(GraphError::SizeMismatch {
                what: "unpack stream",
                expected: graph.num_out_streams_total(),
                got: unpack_sizes.len(),
            });
        }
        return Ok(Folder {
            graph,
            pack_sizes,
            unpack_sizes,
            unpack_crc,
        });
    }

    pub fn graph(&self) -> &CoderGraph {
        return &self.graph;
    }

    /// Size of each pack stream, in pack stream order.
    pub fn pack_sizes(&self) -> &[u64] {
        return &self.pack_sizes;
    }

    /// Size of every coder output, numbered consecutively over all coders.
    /// Empty if unknown.
    pub fn unpack_sizes(&self) -> &[u64] {
        return &self.unpack_sizes;
    }

    pub fn unpack_crc(&self) -> Option<u32> {
        return self.unpack_crc;
    }

    pub fn packed_size(&self) -> u64 {
        return self.pack_sizes.iter().sum();
    }

    /// Size of the folder's unpacked data, if known.
    pub fn unpack_size(&self) -> Option<u64> {
        return self.out_size(self.graph.main_output());
    }

    pub fn out_size(&self, out: OutStream) -> Option<u64> {
        return self
            .unpack_sizes
            .get(self.graph.out_stream_index(out)?)
            .copied();
    }
}
