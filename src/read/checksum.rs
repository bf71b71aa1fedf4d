//! This module exposes the CRC algorithm used by 7zip.

use crc::{Crc, Digest, CRC_32_ISO_HDLC};

/// 7zip checksums with the common reflected CRC-32 (as used by zlib and PNG).
pub static SEVENZ_CRC: Crc<u32> = Crc::<u32>::new(&CRC_32_ISO_HDLC);

pub fn sevenz_crc(input: &[u8]) -> u32 {
    return SEVENZ_CRC.checksum(input);
}

/// A running checksum for data that arrives in pieces.
pub fn sevenz_digest() -> Digest<'static, u32> {
    return SEVENZ_CRC.digest();
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn check_value() {
        assert_eq!(sevenz_crc(b"123456789"), 0xCBF4_3926);
    }

    #[test]
    fn digest_matches_oneshot() {
        let mut d = sevenz_digest();
        d.update(b"1234");
        d.update(b"56789");
        assert_eq!(d.finalize(), sevenz_crc(b"123456789"));
    }
}
