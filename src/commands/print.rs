//! `06 D1` PrintLine and `06 D3` PrintTextBlock — receipt output. PrintLine
//! is one attribute byte plus raw CP437 text; PrintTextBlock wraps the same
//! idea in a small TLV tree (`0x06 { 0x1F07, 0x25 { 0x07, 0x07, ... } }`).

use crate::errors::{Error, Result};
use crate::text::{decode_cp437, encode_cp437};
use crate::tlv;

/// Attribute value marking the final line of a printout.
pub const ATTRIBUTE_END_OF_PRINTOUT: u8 = 0xFF;

#[derive(Debug, Clone, PartialEq)]
pub struct PrintLine {
    pub attribute: u8,
    pub text: String,
}

impl PrintLine {
    pub const CMD_CLASS: u8 = 0x06;
    pub const CMD_INSTR: u8 = 0xD1;

    pub fn new(attribute: u8, text: impl Into<String>) -> Self {
        Self {
            attribute,
            text: text.into(),
        }
    }

    pub fn is_end_of_printout(&self) -> bool {
        self.attribute == ATTRIBUTE_END_OF_PRINTOUT
    }

    pub fn wait_for_completion(&self) -> bool {
        false
    }

    pub fn to_body(&self) -> Result<Vec<u8>> {
        let mut out = vec![self.attribute];
        out.extend(encode_cp437(&self.text));
        Ok(out)
    }

    pub fn from_body(body: &[u8]) -> Result<Self> {
        let (&attribute, rest) = body.split_first().ok_or(Error::NotEnoughData {
            expected: 1,
            actual: 0,
        })?;
        Ok(Self {
            attribute,
            text: decode_cp437(rest),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct PrintTextBlock {
    pub receipt_type: u8,
    pub lines: Vec<String>,
}

impl PrintTextBlock {
    pub const CMD_CLASS: u8 = 0x06;
    pub const CMD_INSTR: u8 = 0xD3;

    pub fn new(receipt_type: u8, lines: Vec<String>) -> Self {
        Self { receipt_type, lines }
    }

    pub fn wait_for_completion(&self) -> bool {
        false
    }

    /// The lines joined with `\n`, each followed by a trailing newline
    /// (matching the source's receipt-string accumulation).
    pub fn text(&self) -> String {
        self.lines
            .iter()
            .map(|l| format!("{l}\n"))
            .collect::<Vec<_>>()
            .concat()
    }

    pub fn to_body(&self) -> Result<Vec<u8>> {
        let text_lines: Vec<u8> = self
            .lines
            .iter()
            .flat_map(|line| {
                let bytes = encode_cp437(line);
                let mut tag = vec![0x07, bytes.len() as u8];
                tag.extend(bytes);
                tag
            })
            .collect();
        let mut print_texts = vec![0x25, text_lines.len() as u8];
        print_texts.extend(text_lines);

        let mut inner = vec![0x1F, 0x07, 0x01, self.receipt_type];
        inner.extend(print_texts);

        let mut out = vec![0x06, inner.len() as u8];
        out.extend(inner);
        Ok(out)
    }

    /// The body is a pure TLV tree starting at tag `0x06`, not a TLV tree
    /// prefixed by a separate attribute byte.
    pub fn from_body(body: &[u8]) -> Result<Self> {
        let mut lines = Vec::new();
        let mut receipt_type = 0u8;

        let outer = tlv::parse(body)?;
        if let Some(restriction) = outer.iter().find(|t| t.tag == 0x06) {
            let inner = tlv::parse(&restriction.data)?;
            if let Some(rt) = inner.iter().find(|t| t.tag == 0x1F07) {
                receipt_type = rt.data.first().copied().unwrap_or(0);
            }
            if let Some(print_texts) = inner.iter().find(|t| t.tag == 0x25) {
                for line in &print_texts.children {
                    if line.tag == 0x07 {
                        lines.push(decode_cp437(&line.data));
                    }
                }
            }
        }
        Ok(Self { receipt_type, lines })
    }
}

#[cfg(test)]
mod tests {
    use hex_literal::hex;

    use super::*;

    #[test]
    fn print_line_round_trips() {
        let cmd = PrintLine::new(0x00, "SUCCESS");
        let body = cmd.to_body().unwrap();
        assert_eq!(PrintLine::from_body(&body).unwrap(), cmd);
    }

    #[test]
    fn attribute_0xff_marks_end_of_printout() {
        assert!(PrintLine::new(0xFF, "").is_end_of_printout());
    }

    #[test]
    fn scenario_s6_print_text_block() {
        let cmd = PrintTextBlock::new(
            0,
            vec!["Line one".to_string(), String::new(), "Line 3".to_string()],
        );
        assert_eq!(cmd.lines, vec!["Line one", "", "Line 3"]);
        assert_eq!(cmd.text(), "Line one\n\nLine 3\n");

        let body = cmd.to_body().unwrap();
        let decoded = PrintTextBlock::from_body(&body).unwrap();
        assert_eq!(decoded, cmd);
        assert_eq!(decoded.receipt_type, 0);
    }

    #[test]
    fn scenario_s6_print_text_block_decodes_pure_tlv_body() {
        // 06 1A { 1F 07 01 00, 25 14 { 07 08 "Line one", 07 00, 07 06 "Line 3" } }
        let body = hex!(
            "06 1A 1F 07 01 00 25 14 07 08 4C 69 6E 65 20 6F 6E 65 07 00 07 06 4C 69 6E 65 20 33"
        );
        let decoded = PrintTextBlock::from_body(&body).unwrap();
        assert_eq!(decoded.receipt_type, 0);
        assert_eq!(decoded.lines, vec!["Line one", "", "Line 3"]);
    }
}
