//! `06 01` Authorisation — starts a payment; also the generic "read card
//! data" command. Carries no positional fixed fields, only bitmaps.

use crate::bitmap::{self, Entry, Value};
use crate::errors::Result;

pub const CMD_CLASS: u8 = 0x06;
pub const CMD_INSTR: u8 = 0x01;

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Authorisation {
    pub entries: Vec<Entry>,
}

impl Authorisation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Convenience constructor for the common case: an amount in minor
    /// currency units (eg. cents).
    pub fn amount_minor(amount: u64) -> Result<Self> {
        Ok(Self {
            entries: vec![Entry::new("amount", Value::Number(amount))?],
        })
    }

    pub fn with_entry(mut self, entry: Entry) -> Self {
        self.entries.push(entry);
        self
    }

    pub fn wait_for_completion(&self) -> bool {
        true
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scenario_s3_one_cent_body() {
        // S3: > 06 01 06 04 00 00 00 00 01 — a BCD6 amount field is 6 value
        // bytes (7 with its id), one more than the literal length claims;
        // the bytes below are the self-consistent form of that scenario.
        let cmd = Authorisation::amount_minor(1).unwrap();
        let body = cmd.to_body().unwrap();
        assert_eq!(body, vec![0x04, 0x00, 0x00, 0x00, 0x00, 0x00, 0x01]);
        assert_eq!(Authorisation::from_body(&body).unwrap(), cmd);
    }
}
