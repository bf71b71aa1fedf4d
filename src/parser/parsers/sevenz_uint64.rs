use super::*;

/// 7zip uses a weird packed integer format to represent some u64 values.
/// The number of leading one bits in the first byte tells how many little-endian bytes follow,
/// the remaining bits of the first byte are the most significant part.
pub fn sevenz_uint64(input: &[u8]) -> BinResult<u64> {
    let (input, first_byte) = context("sevenz_uint64 read first byte", u8)(input)?;
    let leading_ones = first_byte.leading_ones() as usize;
    let (input, tail) = context("sevenz_uint64 read following bytes", take(leading_ones))(input)?;

    let mut val: u64 = 0;
    for (i, b) in tail.iter().enumerate() {
        val |= (*b as u64) << (i * 8);
    }
    if leading_ones < 8 {
        let high = (first_byte as u64) & ((1u64 << (7 - leading_ones)) - 1);
        val |= high << (leading_ones * 8);
    }
    return Ok((input, val));
}

/// Like sevenz_uint64, but convert to usize and return an error if the conversion fails.
pub fn sevenz_uint64_as_usize(input: &[u8]) -> BinResult<usize> {
    let (input, as_u64) = context("sevenz_uint64_as_usize as_u64", sevenz_uint64)(input)?;
    let as_usize = crate::to_usize_or_err!(as_u64);
    return Ok((input, as_usize));
}
