//! CRC-CCITT (polynomial 0x1021, seed 0xFFFF) over the unescaped payload
//! plus the trailing `ETX` byte, as required by the frame trailer.

use crc::{Algorithm, Crc};

/// `CRC-16/CCITT-FALSE`: poly 0x1021, init 0xFFFF, no reflection, no xorout.
/// This is the dialect the frame trailer uses; the `crc` crate ships it as
/// a named constant in its catalog, not hand-derived here.
const CCITT_FALSE: Algorithm<u16> = crc::CRC_16_CCITT_FALSE;

/// Computes the CRC over `data` (already the unescaped payload plus `ETX`).
pub fn crc_ccitt(data: &[u8]) -> u16 {
    let crc = Crc::<u16>::new(&CCITT_FALSE);
    crc.checksum(data)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_payload_plus_etx() {
        // Not a literal spec vector, just a stability/regression check.
        let crc = crc_ccitt(&[0x03]);
        assert_eq!(crc_ccitt(&[0x03]), crc);
    }

    #[test]
    fn differs_by_payload() {
        assert_ne!(crc_ccitt(&[0x01, 0x03]), crc_ccitt(&[0x02, 0x03]));
    }
}
