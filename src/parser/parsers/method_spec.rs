//! Parsers for the method mini-language:
//! bind directives (`B0S1:1S0`), dictionary literals (`24`, `64K`, `32M`)
//! and `name[=value]` method parameters (`d=24`, `fb64`).

use super::*;

/// Highest exponent a dictionary size may round up to.
pub const MAX_DICTIONARY_LOG: u8 = 31;

/// An unsigned decimal number that must fit into a `u32`.
pub fn decimal_u32(input: &str) -> TextResult<u32> {
    let (rest, digits) = context("decimal digits", digit1)(input)?;
    match digits.parse::<u32>() {
        Ok(n) => Ok((rest, n)),
        Err(_) => Err(nom::Err::Failure(ParserError::new(
            ParserErrorKind::NumberOverflow(digits),
        ))),
    }
}

/// `<coder>[S<stream>]`, the stream defaulting to 0.
pub fn bind_endpoint(input: &str) -> TextResult<(usize, usize)> {
    let (input, coder) = context("bind coder index", decimal_u32)(input)?;
    let (input, stream) = context(
        "bind stream index",
        opt(preceded(one_of("Ss"), decimal_u32)),
    )(input)?;
    return Ok((input, (coder as usize, stream.unwrap_or(0) as usize)));
}

/// `B<coder>[S<stream>]:<coder>[S<stream>]`, output endpoint first.
pub fn bind_directive(input: &str) -> TextResult<BindPair> {
    let (input, _) = context("bind prefix", one_of("Bb"))(input)?;
    let (input, (out_coder, out_stream)) = context("bind output", bind_endpoint)(input)?;
    let (input, _) = context("bind separator", char(':'))(input)?;
    let (input, (in_coder, in_stream)) = context("bind input", bind_endpoint)(input)?;
    return Ok((
        input,
        BindPair {
            out_coder,
            out_stream,
            in_coder,
            in_stream,
        },
    ));
}

/// Smallest `log` such that `size <= 1 << log`.
pub fn size_log(size: u64) -> u8 {
    let mut log = 0u8;
    while log < 64 && (1u64 << log) < size {
        log += 1;
    }
    return log;
}

/// `<digits>[BKM]`, returning `(bytes, log)`.
///
/// Without a unit the number is an exponent and must be below 32.
pub fn dictionary_size(input: &str) -> TextResult<(u32, u8)> {
    let (rest, n) = context("dictionary digits", decimal_u32)(input)?;
    let (rest, unit) = context("dictionary unit", opt(one_of("bBkKmM")))(rest)?;

    let bytes: u64 = match unit.map(|c| c.to_ascii_uppercase()) {
        None => {
            if n > MAX_DICTIONARY_LOG as u32 {
                return Err(nom::Err::Failure(ParserError::new(
                    ParserErrorKind::DictionaryTooLarge(1u64.checked_shl(n).unwrap_or(u64::MAX)),
                )));
            }
            return Ok((rest, (1u32 << n, n as u8)));
        }
        Some('B') => n as u64,
        Some('K') => (n as u64) << 10,
        Some(_) => (n as u64) << 20,
    };
    let log = size_log(bytes);
    if log > MAX_DICTIONARY_LOG {
        return Err(nom::Err::Failure(ParserError::new(
            ParserErrorKind::DictionaryTooLarge(bytes),
        )));
    }
    return Ok((rest, (bytes as u32, log)));
}

/// Split a parameter into name and value.
///
/// `name=value` splits at the `=`, otherwise the value starts at the first digit (`fb64`).
/// A parameter without either has no value.
pub fn method_param(input: &str) -> TextResult<(&str, Option<&str>)> {
    return context(
        "method parameter",
        alt((
            map(
                separated_pair(take_till(|c: char| c == '='), char('='), rest),
                |(name, value)| (name, Some(value)),
            ),
            map(
                pair(take_till(|c: char| c.is_ascii_digit()), rest),
                |(name, value): (&str, &str)| (name, Some(value).filter(|v| !v.is_empty())),
            ),
        )),
    )(input);
}
