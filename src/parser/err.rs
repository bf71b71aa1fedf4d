use nom::error::*;

use crate::graph::GraphError;

/// The types of errors that may be returned by the parsers.
#[derive(Debug, Clone, PartialEq)]
pub enum ParserErrorKind<I> {
    Nom(I, nom::error::ErrorKind),
    ToUsizeConversionFailure,
    // NumberOverflow(digits)
    NumberOverflow(I),
    // DictionaryTooLarge(bytes)
    DictionaryTooLarge(u64),
    // InvalidCoderFlags(flags)
    InvalidCoderFlags(u8),
    InvalidGraph(GraphError),
}

/// The error type returned by all parsers.
#[derive(Debug, Clone, PartialEq)]
pub struct ParserError<I> {
    /// What kind of error this is
    pub kind: ParserErrorKind<I>,
    /// All the context we have accumulated from previous errors.
    pub ctx: Vec<(I, &'static str)>,
}

impl<I> ParseError<I> for ParserError<I> {
    fn from_error_kind(input: I, kind: ErrorKind) -> Self {
        return ParserError::new(ParserErrorKind::Nom(input, kind));
    }

    fn append(_: I, _: ErrorKind, other: Self) -> Self {
        other
    }
}

impl<I> ContextError<I> for ParserError<I> {
    fn add_context(input: I, ctx: &'static str, mut other: Self) -> Self {
        other.ctx.push((input, ctx));
        return other;
    }
}

impl<I> ParserError<I> {
    /// Creates a new error.
    pub fn new(kind: ParserErrorKind<I>) -> Self {
        return ParserError {
            kind,
            ctx: Vec::new(),
        };
    }

    /// The outermost context, which names the construct that failed to parse.
    pub fn outer_context(&self) -> Option<&'static str> {
        return self.ctx.last().map(|(_, c)| *c);
    }

    /// Human readable description, used when converting into the crate's `InvalidArgument`.
    pub fn describe(&self) -> String
    where
        I: core::fmt::Debug,
    {
        let what = match &self.kind {
            ParserErrorKind::Nom(input, kind) => format!("unexpected input {:?} ({:?})", input, kind),
            ParserErrorKind::ToUsizeConversionFailure => "number doesn't fit into usize".into(),
            ParserErrorKind::NumberOverflow(digits) => format!("number {:?} is too large", digits),
            ParserErrorKind::DictionaryTooLarge(bytes) => {
                format!("dictionary size {} exceeds 2^31 bytes", bytes)
            }
            ParserErrorKind::InvalidCoderFlags(f) => format!("invalid coder flags {:#04x}", f),
            ParserErrorKind::InvalidGraph(g) => g.to_string(),
        };
        match self.outer_context() {
            Some(c) => format!("{}: {}", c, what),
            None => what,
        }
    }
}

/// Unwrap the result of a complete parser.
///
/// Complete parsers never report `Incomplete`, but it's mapped to an error
/// anyway instead of being assumed away.
pub fn finish<I: Clone, O>(
    input: I,
    res: nom::IResult<I, O, ParserError<I>>,
) -> Result<O, ParserError<I>> {
    match res {
        Ok((_, o)) => Ok(o),
        Err(nom::Err::Error(e)) | Err(nom::Err::Failure(e)) => Err(e),
        Err(nom::Err::Incomplete(_)) => Err(ParserError::new(ParserErrorKind::Nom(
            input,
            ErrorKind::Complete,
        ))),
    }
}

/// Macro for converting from u64 to usize, or returning the correct error if conversion not possible
#[macro_export]
macro_rules! to_usize_or_err {
( $( $x:expr ),+ ) => {
        {
            $(
                match usize::try_from($x) {
			Ok(res) => res,
        		Err(_) => return Err(nom::Err::Error($crate::parser::ParserError::new($crate::parser::ParserErrorKind::ToUsizeConversionFailure))),
		}
            )+
        }
    };
}
