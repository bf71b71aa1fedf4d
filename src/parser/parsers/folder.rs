//! The folder record as it's stored in a 7zip header.

use super::*;

use crate::graph::{add_streams, Coder, CoderGraph, InStream, OutStream};
use crate::method::MethodId;

/// Maps a folder-wide stream number to the coder and stream it belongs to.
fn locate(arities: &[usize], mut index: usize) -> Option<(usize, usize)> {
    for (coder, n) in arities.iter().enumerate() {
        if index < *n {
            return Some((coder, index));
        }
        index -= n;
    }
    return None;
}

fn graph_error<'a, T>(e: GraphError) -> BinResult<'a, T> {
    return Err(nom::Err::Failure(ParserError::new(
        ParserErrorKind::InvalidGraph(e),
    )));
}

pub fn coder(input: &[u8]) -> BinResult<Coder> {
    fn id_len(flags: u8) -> usize {
        (flags & 0b0000_1111) as usize
    }
    fn is_complex(flags: u8) -> bool {
        (flags & 0b0001_0000) > 0
    }
    fn has_attrs(flags: u8) -> bool {
        (flags & 0b0010_0000) > 0
    }
    fn has_alternatives(flags: u8) -> bool {
        (flags & 0b1000_0000) > 0
    }

    let (input, flags) = context("coder flags", u8)(input)?;
    if has_alternatives(flags) {
        return Err(nom::Err::Failure(ParserError::new(
            ParserErrorKind::InvalidCoderFlags(flags),
        )));
    }
    let (input, id) = context("coder ID", take(id_len(flags)))(input)?;

    let (input, arity) = cond(
        is_complex(flags),
        context(
            "coder number of complex streams",
            pair(sevenz_uint64_as_usize, sevenz_uint64_as_usize),
        ),
    )(input)?;
    let (num_in_streams, num_out_streams) = arity.unwrap_or((1, 1));

    let (input, attrs) = context(
        "coder attributes",
        cond(has_attrs(flags), length_count(sevenz_uint64_as_usize, u8)),
    )(input)?;

    let mut coder = Coder::from_id(MethodId::from(id), num_in_streams, num_out_streams);
    coder.attrs = attrs;
    return Ok((input, coder));
}

pub fn folder_coders(input: &[u8]) -> BinResult<Vec<Coder>> {
    let (input, coders_vec) = context(
        "folder_coders coders",
        length_count(
            context("folder_coders num_coders", sevenz_uint64_as_usize),
            context("folder_coders coder", coder),
        ),
    )(input)?;
    return Ok((input, coders_vec));
}

/// A folder record: coders, bind pairs and the inputs fed by pack streams.
pub fn folder(input: &[u8]) -> BinResult<CoderGraph> {
    let (input, coders_vec) = context("folder coders", folder_coders)(input)?;

    let ins: Vec<usize> = coders_vec.iter().map(|c| c.num_in_streams).collect();
    let outs: Vec<usize> = coders_vec.iter().map(|c| c.num_out_streams).collect();
    let num_out_streams_total = match outs.iter().try_fold(0, |t, n| add_streams(t, *n, "output")) {
        Ok(t) => t,
        Err(e) => return graph_error(e),
    };
    let num_in_streams_total = match ins.iter().try_fold(0, |t, n| add_streams(t, *n, "input")) {
        Ok(t) => t,
        Err(e) => return graph_error(e),
    };
    if num_out_streams_total == 0 {
        return graph_error(GraphError::NoCoders);
    }

    // Exactly one output is left unbound.
    let num_bind_pairs = num_out_streams_total - 1;
    let (input, raw_pairs) = context(
        "folder bind_pairs",
        count(
            pair(sevenz_uint64_as_usize, sevenz_uint64_as_usize),
            num_bind_pairs,
        ),
    )(input)?;

    let mut bind_pairs = Vec::with_capacity(raw_pairs.len());
    for (in_index, out_index) in raw_pairs {
        match (locate(&ins, in_index), locate(&outs, out_index)) {
            (Some((in_coder, in_stream)), Some((out_coder, out_stream))) => {
                bind_pairs.push(BindPair::new(
                    OutStream {
                        coder: out_coder,
                        stream: out_stream,
                    },
                    InStream {
                        coder: in_coder,
                        stream: in_stream,
                    },
                ))
            }
            _ => {
                return Err(nom::Err::Failure(ParserError::new(
                    ParserErrorKind::Nom(input, nom::error::ErrorKind::Verify),
                )))
            }
        }
    }

    if num_in_streams_total < num_bind_pairs {
        return graph_error(GraphError::UnboundOutputs(
            num_out_streams_total - num_in_streams_total,
        ));
    }
    let num_packed_streams = num_in_streams_total - num_bind_pairs;

    // A single packed stream isn't stored, it's whichever input is left unbound.
    let (input, pack_indices) = context(
        "folder packed_streams_indices",
        cond(
            num_packed_streams > 1,
            count(sevenz_uint64_as_usize, num_packed_streams),
        ),
    )(input)?;

    let pack_streams: Vec<InStream> = match pack_indices {
        Some(indices) => {
            let mut v = Vec::with_capacity(indices.len());
            for i in indices {
                match locate(&ins, i) {
                    Some((coder, stream)) => v.push(InStream { coder, stream }),
                    None => {
                        return Err(nom::Err::Failure(ParserError::new(
                            ParserErrorKind::Nom(input, nom::error::ErrorKind::Verify),
                        )))
                    }
                }
            }
            v
        }
        None => (0..num_in_streams_total)
            .filter_map(|i| locate(&ins, i))
            .map(|(coder, stream)| InStream { coder, stream })
            .filter(|s| !bind_pairs.iter().any(|bp| bp.input() == *s))
            .take(num_packed_streams)
            .collect(),
    };

    return match CoderGraph::new(coders_vec, bind_pairs, pack_streams) {
        Ok(graph) => Ok((input, graph)),
        Err(e) => graph_error(e),
    };
}
