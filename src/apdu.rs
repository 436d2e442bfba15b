//! The APDU codec: `{cmd_class, cmd_instr, body}`, where `body` on the wire
//! is prefixed by a length field (one byte if < 255, else `0xFF lo hi`).
//! This module only knows about that envelope; dispatch to typed command
//! variants lives in [`crate::commands`].

use crate::codec::int_word_split;
use crate::errors::{Error, Result};

/// A raw APDU: header bytes plus the already length-framed body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Apdu {
    pub cmd_class: u8,
    pub cmd_instr: u8,
    pub body: Vec<u8>,
}

impl Apdu {
    pub fn new(cmd_class: u8, cmd_instr: u8, body: Vec<u8>) -> Self {
        Self {
            cmd_class,
            cmd_instr,
            body,
        }
    }

    /// Encodes a body length per the one- or three-byte rule.
    pub fn encode_length(len: usize) -> Result<Vec<u8>> {
        if len < 0xFF {
            Ok(vec![len as u8])
        } else if len <= 0xFFFF {
            let [lo, hi] = int_word_split(len as u16);
            Ok(vec![0xFF, lo, hi])
        } else {
            Err(Error::UsageError(format!(
                "APDU body length {len} exceeds the 16-bit length field"
            )))
        }
    }

    /// Decodes a body length off the front of `data`, returning
    /// `(length, rest)`.
    fn decode_length(data: &[u8]) -> Result<(usize, &[u8])> {
        let (&first, rest) = data.split_first().ok_or(Error::NotEnoughData {
            expected: 1,
            actual: 0,
        })?;
        if first != 0xFF {
            return Ok((first as usize, rest));
        }
        if rest.len() < 2 {
            return Err(Error::NotEnoughData {
                expected: 2,
                actual: rest.len(),
            });
        }
        let len = (rest[0] as usize) | ((rest[1] as usize) << 8);
        Ok((len, &rest[2..]))
    }

    /// Serialises to `[cmd_class, cmd_instr] || length || body`.
    pub fn serialize(&self) -> Result<Vec<u8>> {
        let mut out = vec![self.cmd_class, self.cmd_instr];
        out.extend(Self::encode_length(self.body.len())?);
        out.extend_from_slice(&self.body);
        Ok(out)
    }

    /// Parses `[cmd_class, cmd_instr] || length || body` off the front of
    /// `data`. Trailing bytes beyond the declared body length are ignored
    /// (a frame carries exactly one APDU in this protocol).
    pub fn parse(data: &[u8]) -> Result<Self> {
        if data.len() < 2 {
            return Err(Error::NotEnoughData {
                expected: 2,
                actual: data.len(),
            });
        }
        let (cmd_class, cmd_instr) = (data[0], data[1]);
        let (len, rest) = Self::decode_length(&data[2..])?;
        if rest.len() < len {
            return Err(Error::NotEnoughData {
                expected: len,
                actual: rest.len(),
            });
        }
        Ok(Self {
            cmd_class,
            cmd_instr,
            body: rest[..len].to_vec(),
        })
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn short_body_uses_one_byte_length() {
        let apdu = Apdu::new(0x06, 0x00, vec![0xAA; 10]);
        let bytes = apdu.serialize().unwrap();
        assert_eq!(&bytes[0..3], &[0x06, 0x00, 0x0A]);
        assert_eq!(Apdu::parse(&bytes).unwrap(), apdu);
    }

    #[test]
    fn boundary_length_254_is_one_byte() {
        let apdu = Apdu::new(0x06, 0x00, vec![0x00; 254]);
        let bytes = apdu.serialize().unwrap();
        assert_eq!(bytes[2], 254);
        assert_eq!(Apdu::parse(&bytes).unwrap(), apdu);
    }

    #[test]
    fn boundary_length_255_is_three_bytes() {
        let apdu = Apdu::new(0x06, 0x00, vec![0x00; 255]);
        let bytes = apdu.serialize().unwrap();
        assert_eq!(&bytes[2..5], &[0xFF, 255, 0]);
        assert_eq!(Apdu::parse(&bytes).unwrap(), apdu);
    }

    #[test]
    fn long_body_round_trips() {
        let apdu = Apdu::new(0x06, 0x01, vec![0x7A; 1000]);
        let bytes = apdu.serialize().unwrap();
        assert_eq!(Apdu::parse(&bytes).unwrap(), apdu);
    }

    #[test]
    fn truncated_body_is_not_enough_data() {
        let apdu = Apdu::new(0x06, 0x00, vec![0x00; 5]);
        let mut bytes = apdu.serialize().unwrap();
        bytes.truncate(bytes.len() - 2);
        assert!(matches!(
            Apdu::parse(&bytes),
            Err(Error::NotEnoughData { .. })
        ));
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(256))]

        // Spec law 4: length < 255 is one byte, else 0xFF lo hi.
        #[test]
        fn length_encoding_matches_the_one_or_three_byte_rule(len in 0usize..=65535) {
            let encoded = Apdu::encode_length(len).unwrap();
            if len < 0xFF {
                prop_assert_eq!(encoded, vec![len as u8]);
            } else {
                prop_assert_eq!(encoded[0], 0xFF);
                let lo = (len & 0xFF) as u8;
                let hi = (len >> 8) as u8;
                prop_assert_eq!(&encoded[1..], &[lo, hi][..]);
            }
        }

        #[test]
        fn round_trips_any_body(class: u8, instr: u8, body in prop::collection::vec(any::<u8>(), 0..600)) {
            let apdu = Apdu::new(class, instr, body);
            let bytes = apdu.serialize().unwrap();
            prop_assert_eq!(Apdu::parse(&bytes).unwrap(), apdu);
        }
    }
}
