//! Custom nom parsers for the method mini-language and 7z folder records

mod sevenz_uint64;
pub use sevenz_uint64::*;
mod method_spec;
pub use method_spec::*;
mod folder;
pub use folder::*;

use super::err::*;

use crate::graph::{BindPair, GraphError};

use nom::branch::alt;
use nom::bytes::complete::{take, take_till};
use nom::character::complete::{char, digit1, one_of};
use nom::combinator::{cond, map, opt, rest};
use nom::error::context;
use nom::multi::{count, length_count};
use nom::number::complete::u8;
use nom::sequence::{pair, preceded, separated_pair};

/// Result type of the binary folder record parsers.
pub type BinResult<'a, T> = nom::IResult<&'a [u8], T, ParserError<&'a [u8]>>;

/// Result type of the method mini-language parsers.
pub type TextResult<'a, T> = nom::IResult<&'a str, T, ParserError<&'a str>>;
