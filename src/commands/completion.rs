//! `06 0F` Completion and `06 1E` Abort — the two APDUs that return master
//! rights to the ECR.

use crate::bitmap::{self, Entry, Value};
use crate::codec::LllVar;
use crate::errorcodes::error_description;
use crate::errors::Result;

/// Completion's fixed-field consumer is data-directed: a single byte is a
/// terminal-status code; two or more bytes are tried as an LLLVAR
/// software-version string followed by a status byte. Whatever is left
/// after that is the usual bitmap tail (eg. `0x29` terminal id); anything
/// that doesn't parse as bitmap entries is kept raw rather than rejected.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Completion {
    pub terminal_status: Option<u8>,
    pub software_version: Option<String>,
    pub entries: Vec<Entry>,
    pub raw: Vec<u8>,
}

impl Completion {
    pub const CMD_CLASS: u8 = 0x06;
    pub const CMD_INSTR: u8 = 0x0F;

    pub fn wait_for_completion(&self) -> bool {
        false
    }

    /// Terminal id, bitmap `0x29`, when the terminal included one in the
    /// bitmap tail (ecr.py's `packet.bitmaps_as_dict().get('tid')`).
    pub fn tid(&self) -> Option<u64> {
        self.entries.iter().find_map(|e| match (e.id, &e.value) {
            (0x29, Value::Number(n)) => Some(*n),
            _ => None,
        })
    }

    pub fn to_body(&self) -> Result<Vec<u8>> {
        let mut out = if let Some(version) = &self.software_version {
            let mut out = LllVar::encode(version.as_bytes())?;
            if let Some(status) = self.terminal_status {
                out.push(status);
            }
            out
        } else if let Some(status) = self.terminal_status {
            vec![status]
        } else {
            self.raw.clone()
        };
        for entry in &self.entries {
            out.extend(entry.serialize()?);
        }
        Ok(out)
    }

    pub fn from_body(body: &[u8]) -> Result<Self> {
        let (&status, tail) = match body.split_first() {
            Some(pair) => pair,
            None => return Ok(Self::default()),
        };
        if body.len() >= 2 {
            if let Ok((version, rest)) = LllVar::decode(body) {
                let software_version = Some(String::from_utf8_lossy(&version).into_owned());
                return match rest.split_first() {
                    Some((&status, tail)) => {
                        let (entries, raw) = parse_tail(tail);
                        Ok(Self {
                            terminal_status: Some(status),
                            software_version,
                            entries,
                            raw,
                        })
                    }
                    None => Ok(Self {
                        terminal_status: None,
                        software_version,
                        entries: Vec::new(),
                        raw: Vec::new(),
                    }),
                };
            }
        }
        let (entries, raw) = parse_tail(tail);
        Ok(Self {
            terminal_status: Some(status),
            software_version: None,
            entries,
            raw,
        })
    }
}

/// Parses a bitmap tail, falling back to keeping it raw if it doesn't
/// decode as a run of bitmap entries (the original's "ignores TLV
/// components" escape hatch).
fn parse_tail(tail: &[u8]) -> (Vec<Entry>, Vec<u8>) {
    match bitmap::parse_all(tail) {
        Ok(entries) => (entries, Vec::new()),
        Err(_) => (Vec::new(), tail.to_vec()),
    }
}

/// `06 1E` — terminates with a one-byte error code, usually of length 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Abort {
    pub error_code: u8,
}

impl Abort {
    pub const CMD_CLASS: u8 = 0x06;
    pub const CMD_INSTR: u8 = 0x1E;

    pub fn new(error_code: u8) -> Self {
        Self { error_code }
    }

    pub fn description(&self) -> &'static str {
        error_description(self.error_code)
    }

    pub fn wait_for_completion(&self) -> bool {
        false
    }

    pub fn to_body(&self) -> Result<Vec<u8>> {
        if self.error_code == 0 {
            Ok(Vec::new())
        } else {
            Ok(vec![self.error_code])
        }
    }

    pub fn from_body(body: &[u8]) -> Result<Self> {
        Ok(Self {
            error_code: body.first().copied().unwrap_or(0),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn completion_single_status_byte() {
        let body = vec![0x00];
        let parsed = Completion::from_body(&body).unwrap();
        assert_eq!(parsed.terminal_status, Some(0x00));
        assert_eq!(parsed.to_body().unwrap(), body);
    }

    #[test]
    fn completion_with_software_version() {
        let cmd = Completion {
            terminal_status: Some(0x01),
            software_version: Some("v1.23".into()),
            entries: Vec::new(),
            raw: Vec::new(),
        };
        let body = cmd.to_body().unwrap();
        assert_eq!(Completion::from_body(&body).unwrap(), cmd);
    }

    #[test]
    fn completion_status_carries_terminal_id() {
        let tid_entry = Entry::new("tid", Value::Number(12345678)).unwrap();
        let mut body = vec![0x00];
        body.extend(tid_entry.serialize().unwrap());

        let parsed = Completion::from_body(&body).unwrap();
        assert_eq!(parsed.terminal_status, Some(0x00));
        assert_eq!(parsed.tid(), Some(12345678));
        assert_eq!(parsed.to_body().unwrap(), body);
    }

    #[test]
    fn scenario_s4_abort_error_0x6c() {
        let abort = Abort::from_body(&[0x6C]).unwrap();
        assert_eq!(abort.error_code, 0x6C);
        assert_eq!(abort.description(), "Card not readable (LRC-/parity error)");
    }
}
