//! Variable-length ASCII fields prefixed by a BCD length: `LLVAR` (two BCD
//! digits, max 99 bytes) and `LLLVAR` (three BCD digits, max 999 bytes).

use super::Bcd;
use crate::errors::{Error, Result};

/// `LLVAR`: a two-BCD-digit length prefix followed by that many ASCII bytes.
pub struct LlVar;

impl LlVar {
    pub const MAX_LEN: usize = 99;

    /// Serialises `value` as `[length_bcd] || value`. Errors if `value` is
    /// longer than [`Self::MAX_LEN`].
    pub fn encode(value: &[u8]) -> Result<Vec<u8>> {
        if value.len() > Self::MAX_LEN {
            return Err(Error::UsageError(format!(
                "LLVAR value too long: {} > {}",
                value.len(),
                Self::MAX_LEN
            )));
        }
        let mut out = Bcd::encode(value.len() as u64, 2);
        out.extend_from_slice(value);
        Ok(out)
    }

    /// Parses `[length_bcd] || value` off the front of `data`, returning
    /// `(value, rest)`.
    pub fn decode(data: &[u8]) -> Result<(Vec<u8>, &[u8])> {
        if data.is_empty() {
            return Err(Error::NotEnoughData {
                expected: 1,
                actual: 0,
            });
        }
        let len = Bcd::decode(&data[0..1])? as usize;
        let data = &data[1..];
        if data.len() < len {
            return Err(Error::NotEnoughData {
                expected: len,
                actual: data.len(),
            });
        }
        Ok((data[..len].to_vec(), &data[len..]))
    }
}

/// `LLLVAR`: a three-BCD-digit length prefix (⌈3/2⌉ = 2 bytes) followed by
/// that many ASCII bytes.
pub struct LllVar;

impl LllVar {
    pub const MAX_LEN: usize = 999;

    pub fn encode(value: &[u8]) -> Result<Vec<u8>> {
        if value.len() > Self::MAX_LEN {
            return Err(Error::UsageError(format!(
                "LLLVAR value too long: {} > {}",
                value.len(),
                Self::MAX_LEN
            )));
        }
        let mut out = Bcd::encode(value.len() as u64, 3);
        out.extend_from_slice(value);
        Ok(out)
    }

    pub fn decode(data: &[u8]) -> Result<(Vec<u8>, &[u8])> {
        if data.len() < 2 {
            return Err(Error::NotEnoughData {
                expected: 2,
                actual: data.len(),
            });
        }
        let len = Bcd::decode(&data[0..2])? as usize;
        let data = &data[2..];
        if data.len() < len {
            return Err(Error::NotEnoughData {
                expected: len,
                actual: data.len(),
            });
        }
        Ok((data[..len].to_vec(), &data[len..]))
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn llvar_round_trips() {
        let encoded = LlVar::encode(b"hello").unwrap();
        assert_eq!(encoded, vec![0x00, 0x05, b'h', b'e', b'l', b'l', b'o']);
        let (value, rest) = LlVar::decode(&encoded).unwrap();
        assert_eq!(value, b"hello");
        assert!(rest.is_empty());
    }

    #[test]
    fn llvar_leaves_trailing_bytes() {
        let mut encoded = LlVar::encode(b"hi").unwrap();
        encoded.extend_from_slice(&[0xAA, 0xBB]);
        let (value, rest) = LlVar::decode(&encoded).unwrap();
        assert_eq!(value, b"hi");
        assert_eq!(rest, &[0xAA, 0xBB]);
    }

    #[test]
    fn llvar_rejects_too_long() {
        let value = vec![0u8; LlVar::MAX_LEN + 1];
        assert!(LlVar::encode(&value).is_err());
    }

    #[test]
    fn lllvar_round_trips() {
        let value = vec![b'x'; 123];
        let encoded = LllVar::encode(&value).unwrap();
        assert_eq!(&encoded[0..2], &[0x01, 0x23]);
        let (decoded, rest) = LllVar::decode(&encoded).unwrap();
        assert_eq!(decoded, value);
        assert!(rest.is_empty());
    }

    #[test]
    fn lllvar_rejects_too_long() {
        let value = vec![0u8; LllVar::MAX_LEN + 1];
        assert!(LllVar::encode(&value).is_err());
    }

    proptest! {
        #[test]
        fn llvar_round_trips_any_allowed_length(len in 0usize..=LlVar::MAX_LEN) {
            let value = vec![b'x'; len];
            let encoded = LlVar::encode(&value).unwrap();
            let (decoded, rest) = LlVar::decode(&encoded).unwrap();
            prop_assert_eq!(decoded, value);
            prop_assert!(rest.is_empty());
        }

        #[test]
        fn lllvar_round_trips_any_allowed_length(len in 0usize..=LllVar::MAX_LEN) {
            let value = vec![b'x'; len];
            let encoded = LllVar::encode(&value).unwrap();
            let (decoded, rest) = LllVar::decode(&encoded).unwrap();
            prop_assert_eq!(decoded, value);
            prop_assert!(rest.is_empty());
        }
    }
}
