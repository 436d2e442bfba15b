//! `06 E0` DisplayText and `06 E2` DisplayTextIntInput — pure-bitmap bodies
//! that drive the terminal's customer display.

use crate::bitmap::{self, Entry, Value};
use crate::errors::Result;
use crate::text::ascii_display_line;

const MAX_LINE_CHARS: usize = 24;

fn line_entry(index: u8, text: &str) -> Result<Entry> {
    let name = match index {
        1 => "line1",
        2 => "line2",
        3 => "line3",
        4 => "line4",
        5 => "line5",
        6 => "line6",
        7 => "line7",
        8 => "line8",
        _ => unreachable!("display text only has 8 lines"),
    };
    Entry::new(name, Value::Text(ascii_display_line(text, MAX_LINE_CHARS)))
}

macro_rules! display_bitmap_command {
    ($name:ident, $instr:expr) => {
        #[derive(Debug, Clone, PartialEq, Default)]
        pub struct $name {
            pub entries: Vec<Entry>,
        }

        impl $name {
            pub const CMD_CLASS: u8 = 0x06;
            pub const CMD_INSTR: u8 = $instr;

            pub fn new() -> Self {
                Self::default()
            }

            /// `lines[0]` becomes line1, `lines[1]` line2, and so on; at
            /// most 8 lines are accepted (BZT restricts line5-8 to some
            /// terminals, but the wire format allows all eight).
            pub fn with_lines(mut self, lines: &[&str]) -> Result<Self> {
                for (i, text) in lines.iter().enumerate().take(8) {
                    self.entries.push(line_entry(i as u8 + 1, text)?);
                }
                Ok(self)
            }

            pub fn with_duration(mut self, seconds: u8) -> Result<Self> {
                self.entries
                    .push(Entry::new("display_duration", Value::Bytes(vec![seconds]))?);
                Ok(self)
            }

            pub fn with_beeps(mut self, count: u8) -> Result<Self> {
                self.entries.push(Entry::new("beeps", Value::Bytes(vec![count]))?);
                Ok(self)
            }

            pub fn wait_for_completion(&self) -> bool {
                false
            }

            pub fn to_body(&self) -> Result<Vec<u8>> {
                let mut out = Vec::new();
                for entry in &self.entries {
                    out.extend(entry.serialize()?);
                }
                Ok(out)
            }

            pub fn from_body(body: &[u8]) -> Result<Self> {
                Ok(Self {
                    entries: bitmap::parse_all(body)?,
                })
            }
        }
    };
}

display_bitmap_command!(DisplayText, 0xE0);
display_bitmap_command!(DisplayTextIntInput, 0xE2);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_text_round_trips() {
        let cmd = DisplayText::new()
            .with_duration(0)
            .unwrap()
            .with_lines(&["Hello world!"])
            .unwrap();
        let body = cmd.to_body().unwrap();
        assert_eq!(DisplayText::from_body(&body).unwrap(), cmd);
    }

    #[test]
    fn line_is_truncated_to_24_ascii_chars() {
        let long = "x".repeat(40);
        let cmd = DisplayText::new().with_lines(&[&long]).unwrap();
        match &cmd.entries[0].value {
            Value::Text(s) => assert_eq!(s.len(), 24),
            other => panic!("expected text value, got {other:?}"),
        }
    }
}
