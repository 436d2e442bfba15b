//! ISO 7816 / BER-TLV flavoured tag-length-value parser.
//!
//! This is the same dialect used by EMV Book 3 Annex B: tags extend while
//! bits 1-5 of the first byte are all set and the continuation byte has bit
//! 8 set; lengths are short-form (< 0x80) or long-form `0x81`/`0x82`
//! (one/two following bytes, big-endian). Indefinite and longer long-forms
//! are not valid in this dialect and are rejected.
//!
//! Unlike a one-shot decoder, an unknown tag is never dropped: its raw
//! bytes are preserved verbatim in the tree for the caller to inspect.

use nom::bytes::complete::take;
use nom::number::complete::be_u8;

use crate::errors::{Error, Result};

pub type IResult<'a, T> = nom::IResult<&'a [u8], T>;

/// A single decoded TLV object. Constructed objects carry their decoded
/// `children`; primitive objects have an empty `children` vec.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tlv {
    pub tag: u32,
    pub length: u32,
    pub data: Vec<u8>,
    pub children: Vec<Tlv>,
}

impl Tlv {
    /// Does this tag denote a constructed (nested) value? Bit 6 (0x20) of
    /// the tag's first byte.
    pub fn is_constructed(tag: u32) -> bool {
        first_tag_byte(tag) & 0b0010_0000 != 0
    }
}

fn first_tag_byte(tag: u32) -> u8 {
    // The first byte read ends up as the most significant non-zero byte.
    let mut t = tag;
    let mut first = (t & 0xFF) as u8;
    while t > 0xFF {
        first = ((t >> 8) & 0xFF) as u8;
        t >>= 8;
    }
    first
}

fn take_tag(data: &[u8]) -> IResult<u32> {
    let (rest, b0) = be_u8(data)?;
    if b0 & 0b0001_1111 != 0b0001_1111 {
        return Ok((rest, b0 as u32));
    }
    let mut tag = b0 as u32;
    let mut cursor = rest;
    for _ in 0..7 {
        let (next, b) = be_u8(cursor)?;
        tag = (tag << 8) | b as u32;
        cursor = next;
        if b & 0x80 == 0 {
            return Ok((cursor, tag));
        }
    }
    Err(nom::Err::Error(nom::error::Error::new(
        data,
        nom::error::ErrorKind::TooLarge,
    )))
}

fn take_len(data: &[u8]) -> IResult<u32> {
    let (rest, b0) = be_u8(data)?;
    if b0 < 0x80 {
        return Ok((rest, b0 as u32));
    }
    match b0 {
        0x81 => {
            let (rest, b) = be_u8(rest)?;
            Ok((rest, b as u32))
        }
        0x82 => {
            let (rest, bytes) = take(2usize)(rest)?;
            Ok((rest, ((bytes[0] as u32) << 8) | bytes[1] as u32))
        }
        _ => Err(nom::Err::Error(nom::error::Error::new(
            data,
            nom::error::ErrorKind::TooLarge,
        ))),
    }
}

fn map_nom_err(data: &[u8], what: &str) -> impl FnOnce(nom::Err<nom::error::Error<&[u8]>>) -> Error + '_ {
    move |_| Error::MalformedTlv(format!("{what} (remaining {} bytes)", data.len()))
}

/// Parses one `(tag, length, data)` triple off the front of `data`,
/// recursing into `data` if the tag is constructed.
fn parse_one(data: &[u8]) -> Result<(Tlv, &[u8])> {
    let (rest, tag) = take_tag(data).map_err(map_nom_err(data, "truncated tag"))?;
    let (rest, length) = take_len(rest).map_err(map_nom_err(data, "truncated length"))?;
    if rest.len() < length as usize {
        return Err(Error::MalformedTlv(format!(
            "length {} exceeds remaining {} bytes",
            length,
            rest.len()
        )));
    }
    let (value, rest) = rest.split_at(length as usize);
    let children = if Tlv::is_constructed(tag) {
        parse(value)?
    } else {
        Vec::new()
    };
    Ok((
        Tlv {
            tag,
            length,
            data: value.to_vec(),
            children,
        },
        rest,
    ))
}

/// Parses a full byte slice into an ordered sequence of TLV objects
/// covering the whole slice.
pub fn parse(mut data: &[u8]) -> Result<Vec<Tlv>> {
    let mut out = Vec::new();
    while !data.is_empty() {
        let (tlv, rest) = parse_one(data)?;
        out.push(tlv);
        data = rest;
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn is_constructed_detects_bit6() {
        assert!(Tlv::is_constructed(0x6F));
        assert!(!Tlv::is_constructed(0x84));
        assert!(Tlv::is_constructed(0xBF0C));
        assert!(!Tlv::is_constructed(0x5F2D));
    }

    #[test]
    fn parses_flat_objects() {
        let objs = parse(&[0x84, 0x02, 0xAA, 0xBB, 0x9F, 0x11, 0x01, 0x01]).unwrap();
        assert_eq!(objs.len(), 2);
        assert_eq!(objs[0].tag, 0x84);
        assert_eq!(objs[0].data, vec![0xAA, 0xBB]);
        assert_eq!(objs[1].tag, 0x9F11);
        assert_eq!(objs[1].data, vec![0x01]);
    }

    #[test]
    fn parses_nested_constructed_objects() {
        // SELECT '1PAY.SYS.DDF01' response shape.
        let input = [
            0x6F, 0x1E, 0x84, 0x0E, 0x31, 0x50, 0x41, 0x59, 0x2E, 0x53, 0x59, 0x53, 0x2E, 0x44,
            0x44, 0x46, 0x30, 0x31, 0xA5, 0x0C, 0x88, 0x01, 0x01, 0x5F, 0x2D, 0x02, 0x65, 0x6E,
            0x9F, 0x11, 0x01, 0x01,
        ];
        let objs = parse(&input).unwrap();
        assert_eq!(objs.len(), 1);
        let top = &objs[0];
        assert_eq!(top.tag, 0x6F);
        assert_eq!(top.children.len(), 2);
        assert_eq!(top.children[0].tag, 0x84);
        assert_eq!(top.children[0].data, b"1PAY.SYS.DDF01");
        assert_eq!(top.children[1].tag, 0xA5);
        assert_eq!(top.children[1].children.len(), 2);
    }

    #[test]
    fn long_form_length_0x81() {
        let mut input = vec![0x5A, 0x81, 0x02, 0x11, 0x22];
        let objs = parse(&input).unwrap();
        assert_eq!(objs[0].data, vec![0x11, 0x22]);

        input[2] = 0xFF; // length byte lies about remaining data.
        assert!(parse(&input).is_err());
    }

    #[test]
    fn long_form_length_0x82() {
        let value = vec![0xAB; 300];
        let mut input = vec![0x5A, 0x82, 0x01, 0x2C];
        input.extend_from_slice(&value);
        let objs = parse(&input).unwrap();
        assert_eq!(objs[0].length, 300);
        assert_eq!(objs[0].data, value);
    }

    #[test]
    fn truncated_tag_is_an_error() {
        assert!(parse(&[0x1F]).is_err());
    }

    #[test]
    fn unknown_tag_preserves_raw_bytes() {
        let objs = parse(&[0xDF, 0x7F, 0x02, 0x01, 0x02]).unwrap();
        assert_eq!(objs[0].data, vec![0x01, 0x02]);
    }

    #[test]
    fn re_serialising_reproduces_input_bytes() {
        fn serialise(tlv: &Tlv) -> Vec<u8> {
            let mut out = vec![tlv.tag as u8];
            out.push(tlv.length as u8);
            out.extend_from_slice(&tlv.data);
            out
        }
        let input = [0x84, 0x02, 0xAA, 0xBB];
        let objs = parse(&input).unwrap();
        assert_eq!(serialise(&objs[0]), input);
    }

    fn serialise_flat(tag: u8, data: &[u8]) -> Vec<u8> {
        let mut out = vec![tag, data.len() as u8];
        out.extend_from_slice(data);
        out
    }

    proptest! {
        // Spec law 5: re-serialising a parsed (primitive, short-form-length)
        // tree reproduces the input bytes.
        #[test]
        fn flat_short_form_parse_is_idempotent(
            // non-constructed tags (bit 6 clear) and low-5-bits != 0x1F so the
            // tag stays single-byte; length stays under 0x80 (short form).
            tag in (0u8..0x1F).prop_filter("not the constructed bit", |t| t & 0b0010_0000 == 0),
            data in prop::collection::vec(any::<u8>(), 0..0x80),
        ) {
            let input = serialise_flat(tag, &data);
            let objs = parse(&input).unwrap();
            prop_assert_eq!(objs.len(), 1);
            prop_assert_eq!(objs[0].data.clone(), data);
            prop_assert_eq!(serialise_flat(tag, &objs[0].data), input);
        }
    }
}
