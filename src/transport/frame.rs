//! Byte-level serial framing: `DLE STX payload DLE ETX crc_lo crc_hi`, with
//! every `DLE` inside `payload` doubled. Pure byte-in/byte-out functions,
//! kept free of any I/O so the framing rules can be tested without a real
//! serial port.

use crate::crc::crc_ccitt;
use crate::errors::{Error, Result};

pub const DLE: u8 = 0x10;
pub const STX: u8 = 0x02;
pub const ETX: u8 = 0x03;
pub const ACK: u8 = 0x06;
pub const NAK: u8 = 0x15;

/// Builds `DLE STX stuff(payload) DLE ETX crc_lo crc_hi`.
pub fn encode_frame(payload: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(payload.len() + 6);
    out.push(DLE);
    out.push(STX);
    for &b in payload {
        if b == DLE {
            out.push(DLE);
        }
        out.push(b);
    }
    out.push(DLE);
    out.push(ETX);

    let mut crc_input = Vec::with_capacity(payload.len() + 1);
    crc_input.extend_from_slice(payload);
    crc_input.push(ETX);
    let crc = crc_ccitt(&crc_input);
    out.push((crc & 0xFF) as u8);
    out.push((crc >> 8) as u8);
    out
}

/// Un-stuffs and CRC-checks a complete frame (starting with `DLE STX`,
/// including its two trailing CRC bytes). Returns the recovered payload.
/// Any framing or CRC error is reported as [`Error::TransportLayerException`];
/// the caller is expected to NAK and retry at the transport layer.
pub fn decode_frame(frame: &[u8]) -> Result<Vec<u8>> {
    if frame.len() < 6 || frame[0] != DLE || frame[1] != STX {
        return Err(Error::TransportLayerException(
            "frame does not start with DLE STX".into(),
        ));
    }
    let mut payload = Vec::new();
    let mut i = 2;
    let body = &frame[..frame.len() - 2];
    loop {
        if i >= body.len() {
            return Err(Error::TransportLayerException(
                "frame truncated before DLE ETX".into(),
            ));
        }
        let b = body[i];
        if b == DLE {
            let next = body.get(i + 1).copied().ok_or_else(|| {
                Error::TransportLayerException("dangling DLE at end of frame".into())
            })?;
            if next == ETX {
                i += 2;
                break;
            } else if next == DLE {
                payload.push(DLE);
                i += 2;
                continue;
            } else {
                return Err(Error::TransportLayerException(format!(
                    "unescaped DLE followed by {next:#04x}"
                )));
            }
        }
        payload.push(b);
        i += 1;
    }
    if i != body.len() {
        return Err(Error::TransportLayerException(
            "trailing bytes after DLE ETX".into(),
        ));
    }
    if frame.len() < i + 2 {
        return Err(Error::TransportLayerException("missing CRC bytes".into()));
    }
    let crc_lo = frame[frame.len() - 2];
    let crc_hi = frame[frame.len() - 1];
    let received_crc = (crc_lo as u16) | ((crc_hi as u16) << 8);

    let mut crc_input = payload.clone();
    crc_input.push(ETX);
    let expected_crc = crc_ccitt(&crc_input);
    if received_crc != expected_crc {
        return Err(Error::TransportLayerException(format!(
            "CRC mismatch: received {received_crc:#06x}, expected {expected_crc:#06x}"
        )));
    }
    Ok(payload)
}

#[cfg(test)]
mod tests {
    use hex_literal::hex;
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn round_trips_arbitrary_payload() {
        let payload = vec![0x06, 0x00, 0x07, 0x12, 0x34, 0x56, 0xBE, 0x09, 0x78];
        let frame = encode_frame(&payload);
        assert_eq!(decode_frame(&frame).unwrap(), payload);
    }

    #[test]
    fn stuffs_every_dle_byte_in_payload() {
        let payload = vec![0x01, DLE, 0x02, DLE, DLE, 0x03];
        let frame = encode_frame(&payload);
        // Every payload DLE must appear doubled; the terminator DLE ETX is
        // the only unescaped DLE sequence.
        let body = &frame[2..frame.len() - 4]; // strip DLE STX .. DLE ETX crc crc
        let mut i = 0;
        while i < body.len() {
            if body[i] == DLE {
                assert_eq!(body.get(i + 1), Some(&DLE), "unescaped DLE in stuffed body");
                i += 2;
            } else {
                i += 1;
            }
        }
        assert_eq!(decode_frame(&frame).unwrap(), payload);
    }

    #[test]
    fn scenario_s1_registration_frame() {
        let payload = hex!("06 00 07 12 34 56 BE 09 78 03 01 00").to_vec();
        let frame = encode_frame(&payload);
        assert_eq!(&frame[0..2], &[DLE, STX]);
        assert_eq!(&frame[frame.len() - 4..frame.len() - 2], &[DLE, ETX]);
        assert_eq!(decode_frame(&frame).unwrap(), payload);
    }

    #[test]
    fn corrupted_crc_is_rejected() {
        let payload = vec![0x04, 0x0F, 0x00];
        let mut frame = encode_frame(&payload);
        let last = frame.len() - 1;
        frame[last] ^= 0xFF;
        assert!(decode_frame(&frame).is_err());
    }

    #[test]
    fn empty_payload_round_trips() {
        let frame = encode_frame(&[]);
        assert_eq!(decode_frame(&frame).unwrap(), Vec::<u8>::new());
    }

    proptest! {
        // Spec law 1: unframe(frame(P)) == P for any payload.
        #[test]
        fn round_trips_any_payload(payload in prop::collection::vec(any::<u8>(), 0..512)) {
            let frame = encode_frame(&payload);
            prop_assert_eq!(decode_frame(&frame).unwrap(), payload);
        }

        // Spec law 2: every payload DLE appears doubled; DLE ETX occurs only
        // as the terminator.
        #[test]
        fn every_payload_dle_is_doubled(payload in prop::collection::vec(any::<u8>(), 0..512)) {
            let frame = encode_frame(&payload);
            let body = &frame[2..frame.len() - 4];
            let mut i = 0;
            while i < body.len() {
                if body[i] == DLE {
                    prop_assert_eq!(body.get(i + 1), Some(&DLE));
                    i += 2;
                } else {
                    i += 1;
                }
            }
        }
    }
}
