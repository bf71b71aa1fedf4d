#![forbid(unsafe_code)]
//! The coder graph layer of 7zip archives.
//!
//! A folder (solid block) is decoded by a graph of coders wired together by bind pairs.
//! This crate compiles the method mini-language into such graphs, reads them back from
//! folder records, and drives decoding of whole folders into the files they contain.
//! The codec algorithms themselves are plugged in through [`codec::CodecRegistry`].

#![allow(clippy::needless_return)]

pub mod codec;
pub mod compile;
mod err;
pub mod graph;
pub mod method;
pub mod parser;
pub mod read;

pub use err::*;
