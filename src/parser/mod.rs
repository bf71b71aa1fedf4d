//! Parsing of everything this crate reads from text or bytes:
//! the user-facing method mini-language and the folder records stored in archives.
//!
//! The parsers themselves live in `parsers`, this module wraps them
//! into functions that either consume their whole input or fail.

mod err;
pub mod parsers;

pub use err::*;

use nom::combinator::all_consuming;

use crate::err::Error;
use crate::graph::{BindPair, CoderGraph};

fn invalid<I: core::fmt::Debug>(field: &str, e: ParserError<I>) -> Error {
    return Error::invalid(field, e.describe());
}

/// Parse a bind directive such as `B0S1:1S0` or `b0:1`.
pub fn parse_bind(s: &str) -> Result<BindPair, Error> {
    let res = all_consuming(parsers::bind_directive)(s);
    return finish(s, res).map_err(|e| invalid(s, e));
}

/// Parse a dictionary literal into `(bytes, log)`.
///
/// `24` is `1 << 24`, `64K` and `32M` are multiples of 1024, `1000B` is a byte count.
pub fn parse_dictionary_size(s: &str) -> Result<(u32, u8), Error> {
    let res = all_consuming(parsers::dictionary_size)(s);
    return finish(s, res)
        .map_err(|e| Error::invalid("dictionary size", format!("`{}`: {}", s, e.describe())));
}

/// A whole-string unsigned decimal, or `None` if the string isn't one.
pub fn parse_u32(s: &str) -> Option<u32> {
    return finish(s, all_consuming(parsers::decimal_u32)(s)).ok();
}

/// Split a method parameter into name and optional value.
pub fn split_param(s: &str) -> (&str, Option<&str>) {
    match parsers::method_param(s) {
        Ok((_, parts)) => parts,
        // Both alternatives accept any input, so this is unreachable in practice.
        Err(_) => (s, None),
    }
}

/// Parse a folder record as stored in the archive's coders info.
pub fn parse_folder(bytes: &[u8]) -> Result<CoderGraph, Error> {
    let res = all_consuming(parsers::folder)(bytes);
    return finish(bytes, res).map_err(|e| match e.kind {
        ParserErrorKind::InvalidGraph(g) => Error::from(g),
        _ => invalid("folder", e),
    });
}
