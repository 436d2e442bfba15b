//! The bitmap registry: a process-wide, read-only mapping from a symbolic
//! field name to `(id byte, codec, description)`. A bitmap entry on the
//! wire is `id || codec(value)`; there is no explicit length ahead of a
//! fixed-width field, the codec alone determines how many bytes to
//! consume. Unknown ids abort parsing of the current APDU.

use crate::codec::{Bcd, LlVar, LllVar};
use crate::errors::{Error, Result};
use crate::tlv::{self, Tlv};

/// How a bitmap field's value is encoded on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Codec {
    /// Raw bytes of a fixed, known width.
    Fixed(usize),
    /// BCD integer of `digits` decimal digits (`⌈digits/2⌉` bytes).
    Bcd(usize),
    /// Two-BCD-digit-length-prefixed ASCII.
    LlVar,
    /// Three-BCD-digit-length-prefixed ASCII.
    LllVar,
    /// A nested BER-TLV container, consuming the rest of the APDU body.
    TlvContainer,
}

/// A decoded bitmap field's value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Bytes(Vec<u8>),
    Number(u64),
    Text(String),
    Tlv(Vec<Tlv>),
}

/// A registry entry: the field's symbolic name, wire id, codec and a short
/// human description (surfaced for diagnostics, never parsed).
#[derive(Debug, Clone, Copy)]
pub struct Field {
    pub name: &'static str,
    pub id: u8,
    pub codec: Codec,
    pub description: &'static str,
}

/// The well-known bitmap fields this crate's command variants use. IDs not
/// pinned down by the protocol description (everything but `amount`,
/// `payment_type`, `totals`, `time` and `date_day`) follow the values used
/// by real-world ZVT deployments; see DESIGN.md for the source of each.
pub const FIELDS: &[Field] = &[
    Field {
        name: "amount",
        id: 0x04,
        codec: Codec::Bcd(12),
        description: "transaction amount, minor units",
    },
    Field {
        name: "service_byte",
        id: 0x03,
        codec: Codec::Fixed(1),
        description: "service configuration flags",
    },
    Field {
        name: "timeout",
        id: 0x01,
        codec: Codec::Fixed(1),
        description: "requested command timeout, seconds",
    },
    Field {
        name: "additional",
        id: 0x06,
        codec: Codec::TlvContainer,
        description: "additional data, generic TLV container",
    },
    Field {
        name: "time",
        id: 0x0C,
        codec: Codec::Bcd(6),
        description: "time of day, HHMMSS",
    },
    Field {
        name: "date_day",
        id: 0x0D,
        codec: Codec::Bcd(4),
        description: "day/month, MMDD",
    },
    Field {
        name: "card_number",
        id: 0x0E,
        codec: Codec::LlVar,
        description: "primary account number",
    },
    Field {
        name: "card_expire",
        id: 0x0F,
        codec: Codec::Fixed(2),
        description: "card expiry, BCD YYMM",
    },
    Field {
        name: "payment_type",
        id: 0x19,
        codec: Codec::Fixed(1),
        description: "payment type",
    },
    Field {
        name: "track_1",
        id: 0x22,
        codec: Codec::LlVar,
        description: "magstripe track 1",
    },
    Field {
        name: "track_2",
        id: 0x23,
        codec: Codec::LlVar,
        description: "magstripe track 2",
    },
    Field {
        name: "track_3",
        id: 0x24,
        codec: Codec::LlVar,
        description: "magstripe track 3",
    },
    Field {
        name: "tid",
        id: 0x29,
        codec: Codec::Bcd(8),
        description: "terminal id",
    },
    Field {
        name: "max_status_infos",
        id: 0x1F,
        codec: Codec::Fixed(1),
        description: "maximum number of intermediate status infos",
    },
    Field {
        name: "pump_nr",
        id: 0x2F,
        codec: Codec::Fixed(1),
        description: "fuel pump number",
    },
    Field {
        name: "cvv",
        id: 0x3B,
        codec: Codec::LlVar,
        description: "card verification value",
    },
    Field {
        name: "card_type",
        id: 0x3D,
        codec: Codec::Fixed(1),
        description: "card type",
    },
    Field {
        name: "currency",
        id: 0x49,
        codec: Codec::Fixed(2),
        description: "ISO 4217 numeric currency code",
    },
    Field {
        name: "totals",
        id: 0x60,
        codec: Codec::Fixed(53),
        description: "end-of-day card brand totals",
    },
    Field {
        name: "display_duration",
        id: 0xF0,
        codec: Codec::Fixed(1),
        description: "display duration, seconds (0 = forever)",
    },
    Field {
        name: "line1",
        id: 0xF1,
        codec: Codec::LlVar,
        description: "display line 1",
    },
    Field {
        name: "line2",
        id: 0xF2,
        codec: Codec::LlVar,
        description: "display line 2",
    },
    Field {
        name: "line3",
        id: 0xF3,
        codec: Codec::LlVar,
        description: "display line 3",
    },
    Field {
        name: "line4",
        id: 0xF4,
        codec: Codec::LlVar,
        description: "display line 4",
    },
    Field {
        name: "line5",
        id: 0xF5,
        codec: Codec::LlVar,
        description: "display line 5",
    },
    Field {
        name: "line6",
        id: 0xF6,
        codec: Codec::LlVar,
        description: "display line 6",
    },
    Field {
        name: "line7",
        id: 0xF7,
        codec: Codec::LlVar,
        description: "display line 7",
    },
    Field {
        name: "line8",
        id: 0xF8,
        codec: Codec::LlVar,
        description: "display line 8",
    },
    Field {
        name: "beeps",
        id: 0xF9,
        codec: Codec::Fixed(1),
        description: "number of beeps",
    },
];

pub fn by_name(name: &str) -> Option<&'static Field> {
    FIELDS.iter().find(|f| f.name == name)
}

pub fn by_id(id: u8) -> Option<&'static Field> {
    FIELDS.iter().find(|f| f.id == id)
}

/// A single `id || codec(value)` entry, decoded or ready to serialise.
#[derive(Debug, Clone, PartialEq)]
pub struct Entry {
    pub id: u8,
    pub value: Value,
}

impl Entry {
    /// Builds an entry for a named field, checking the value against the
    /// field's declared codec.
    pub fn new(name: &str, value: Value) -> Result<Self> {
        let field = by_name(name)
            .ok_or_else(|| Error::UsageError(format!("unknown bitmap field: {name}")))?;
        check_value_matches_codec(field.codec, &value)?;
        Ok(Self {
            id: field.id,
            value,
        })
    }

    pub fn field(&self) -> Option<&'static Field> {
        by_id(self.id)
    }

    /// Serialises as `id || codec(value)`.
    pub fn serialize(&self) -> Result<Vec<u8>> {
        let field = self
            .field()
            .ok_or_else(|| Error::UsageError(format!("unknown bitmap id: {:#04x}", self.id)))?;
        let mut out = vec![self.id];
        out.extend(encode_value(field.codec, &self.value)?);
        Ok(out)
    }

    /// Peeks the id, selects the codec from the registry, and consumes
    /// exactly the number of bytes the codec requires. Returns the entry
    /// and the remaining bytes.
    pub fn parse(data: &[u8]) -> Result<(Self, &[u8])> {
        let (&id, rest) = data
            .split_first()
            .ok_or(Error::NotEnoughData {
                expected: 1,
                actual: 0,
            })?;
        let field = by_id(id).ok_or_else(|| {
            Error::ProtocolError {
                class: id,
                instr: 0,
            }
        })?;
        let (value, rest) = decode_value(field.codec, rest)?;
        Ok((Entry { id, value }, rest))
    }
}

/// Parses a run of bitmap entries covering the whole of `data`, in order.
/// Most command bodies are `fixed_bytes || entries`, so callers slice off
/// the fixed prefix first and hand the remainder here.
pub fn parse_all(mut data: &[u8]) -> Result<Vec<Entry>> {
    let mut out = Vec::new();
    while !data.is_empty() {
        let (entry, rest) = Entry::parse(data)?;
        out.push(entry);
        data = rest;
    }
    Ok(out)
}

fn check_value_matches_codec(codec: Codec, value: &Value) -> Result<()> {
    let ok = matches!(
        (codec, value),
        (Codec::Fixed(_), Value::Bytes(_))
            | (Codec::Bcd(_), Value::Number(_))
            | (Codec::LlVar, Value::Text(_))
            | (Codec::LllVar, Value::Text(_))
            | (Codec::TlvContainer, Value::Tlv(_))
    );
    if ok {
        Ok(())
    } else {
        Err(Error::UsageError(format!(
            "value {value:?} does not match codec {codec:?}"
        )))
    }
}

fn encode_value(codec: Codec, value: &Value) -> Result<Vec<u8>> {
    match (codec, value) {
        (Codec::Fixed(width), Value::Bytes(b)) => {
            if b.len() != width {
                return Err(Error::UsageError(format!(
                    "fixed field expects {width} bytes, got {}",
                    b.len()
                )));
            }
            Ok(b.clone())
        }
        (Codec::Bcd(digits), Value::Number(n)) => Ok(Bcd::encode(*n, digits)),
        (Codec::LlVar, Value::Text(s)) => LlVar::encode(s.as_bytes()),
        (Codec::LllVar, Value::Text(s)) => LllVar::encode(s.as_bytes()),
        (Codec::TlvContainer, Value::Tlv(objs)) => Ok(serialize_tlv(objs)),
        _ => Err(Error::UsageError("value/codec mismatch".into())),
    }
}

fn decode_value(codec: Codec, data: &[u8]) -> Result<(Value, &[u8])> {
    match codec {
        Codec::Fixed(width) => {
            if data.len() < width {
                return Err(Error::NotEnoughData {
                    expected: width,
                    actual: data.len(),
                });
            }
            let (value, rest) = data.split_at(width);
            Ok((Value::Bytes(value.to_vec()), rest))
        }
        Codec::Bcd(digits) => {
            let width = digits.div_ceil(2);
            if data.len() < width {
                return Err(Error::NotEnoughData {
                    expected: width,
                    actual: data.len(),
                });
            }
            let (value, rest) = data.split_at(width);
            Ok((Value::Number(Bcd::decode(value)?), rest))
        }
        Codec::LlVar => {
            let (value, rest) = LlVar::decode(data)?;
            Ok((Value::Text(String::from_utf8_lossy(&value).into_owned()), rest))
        }
        Codec::LllVar => {
            let (value, rest) = LllVar::decode(data)?;
            Ok((Value::Text(String::from_utf8_lossy(&value).into_owned()), rest))
        }
        Codec::TlvContainer => {
            // Consumes the remainder of the APDU body; the caller is
            // expected to have already trimmed `data` to this entry's
            // share of it.
            Ok((Value::Tlv(tlv::parse(data)?), &data[data.len()..]))
        }
    }
}

fn serialize_tlv(objs: &[Tlv]) -> Vec<u8> {
    let mut out = Vec::new();
    for obj in objs {
        out.push(obj.tag as u8);
        out.push(obj.data.len() as u8);
        out.extend_from_slice(&obj.data);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn amount_round_trips() {
        let entry = Entry::new("amount", Value::Number(12500)).unwrap();
        let bytes = entry.serialize().unwrap();
        assert_eq!(bytes[0], 0x04);
        let (parsed, rest) = Entry::parse(&bytes).unwrap();
        assert_eq!(parsed, entry);
        assert!(rest.is_empty());
    }

    #[test]
    fn llvar_line_round_trips() {
        let entry = Entry::new("line1", Value::Text("Hello world!".into())).unwrap();
        let bytes = entry.serialize().unwrap();
        let (parsed, rest) = Entry::parse(&bytes).unwrap();
        assert_eq!(parsed, entry);
        assert!(rest.is_empty());
    }

    #[test]
    fn fixed_width_rejects_wrong_length() {
        let err = Entry::new("payment_type", Value::Bytes(vec![0x01, 0x02]));
        assert!(err.is_err());
    }

    #[test]
    fn unknown_id_is_an_error() {
        assert!(Entry::parse(&[0xEE, 0x00]).is_err());
    }

    #[test]
    fn leaves_trailing_bytes_for_the_next_entry() {
        let mut bytes = Entry::new("payment_type", Value::Bytes(vec![0x00]))
            .unwrap()
            .serialize()
            .unwrap();
        bytes.extend(
            Entry::new("card_type", Value::Bytes(vec![0x01]))
                .unwrap()
                .serialize()
                .unwrap(),
        );
        let (first, rest) = Entry::parse(&bytes).unwrap();
        assert_eq!(first.id, 0x19);
        let (second, rest) = Entry::parse(rest).unwrap();
        assert_eq!(second.id, 0x3D);
        assert!(rest.is_empty());
    }
}
