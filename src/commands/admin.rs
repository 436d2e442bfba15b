//! The administrative commands: end-of-day reconciliation, initialisation,
//! resets, diagnosis, status enquiry, log-off, abort and read-card. Most of
//! these carry nothing but an optional password; a handful carry bitmaps.

use crate::bitmap::{self, Entry};
use crate::codec::Bcd;
use crate::errors::Result;

fn password_body(password: Option<u64>) -> Vec<u8> {
    match password {
        Some(p) => Bcd::encode(p, 6),
        None => Vec::new(),
    }
}

fn password_from_body(body: &[u8]) -> Result<(Option<u64>, &[u8])> {
    if body.len() < 3 {
        return Ok((None, body));
    }
    Ok((Some(Bcd::decode(&body[0..3])?), &body[3..]))
}

macro_rules! password_command {
    ($name:ident, $class:expr, $instr:expr, $wait:expr) => {
        #[derive(Debug, Clone, PartialEq, Default)]
        pub struct $name {
            pub password: Option<u64>,
        }

        impl $name {
            pub const CMD_CLASS: u8 = $class;
            pub const CMD_INSTR: u8 = $instr;

            pub fn new(password: Option<u64>) -> Self {
                Self { password }
            }

            pub fn wait_for_completion(&self) -> bool {
                $wait
            }

            pub fn to_body(&self) -> Result<Vec<u8>> {
                Ok(password_body(self.password))
            }

            pub fn from_body(body: &[u8]) -> Result<Self> {
                let (password, _) = password_from_body(body)?;
                Ok(Self { password })
            }
        }
    };
}

password_command!(EndOfDay, 0x06, 0x50, true);
password_command!(Initialisation, 0x06, 0x93, true);
password_command!(Kassenbericht, 0x0F, 0x10, true);
password_command!(ResetTerminal, 0x06, 0x18, true);
password_command!(Diagnosis, 0x06, 0x70, true);
password_command!(LogOff, 0x06, 0x02, false);

#[derive(Debug, Clone, PartialEq, Default)]
pub struct StatusEnquiry {
    pub password: Option<u64>,
    pub entries: Vec<Entry>,
}

impl StatusEnquiry {
    pub const CMD_CLASS: u8 = 0x05;
    pub const CMD_INSTR: u8 = 0x01;

    pub fn new(password: Option<u64>) -> Self {
        Self {
            password,
            entries: Vec::new(),
        }
    }

    pub fn wait_for_completion(&self) -> bool {
        true
    }

    pub fn to_body(&self) -> Result<Vec<u8>> {
        let mut out = password_body(self.password);
        for entry in &self.entries {
            out.extend(entry.serialize()?);
        }
        Ok(out)
    }

    pub fn from_body(body: &[u8]) -> Result<Self> {
        let (password, rest) = password_from_body(body)?;
        Ok(Self {
            password,
            entries: bitmap::parse_all(rest)?,
        })
    }
}

/// `06 B0` — cancels an in-flight command without holding master rights.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AbortCommand;

impl AbortCommand {
    pub const CMD_CLASS: u8 = 0x06;
    pub const CMD_INSTR: u8 = 0xB0;

    pub fn wait_for_completion(&self) -> bool {
        false
    }

    pub fn to_body(&self) -> Result<Vec<u8>> {
        Ok(Vec::new())
    }

    pub fn from_body(_body: &[u8]) -> Result<Self> {
        Ok(Self)
    }
}

/// `06 C0` — legacy "block until a card is presented" command. Modern ECRs
/// should prefer polling StatusEnquiry instead (see source annotation).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ReadCard {
    pub timeout_seconds: Option<u8>,
}

impl ReadCard {
    pub const CMD_CLASS: u8 = 0x06;
    pub const CMD_INSTR: u8 = 0xC0;

    pub fn wait_for_completion(&self) -> bool {
        true
    }

    pub fn to_body(&self) -> Result<Vec<u8>> {
        Ok(match self.timeout_seconds {
            Some(t) => vec![t],
            None => Vec::new(),
        })
    }

    pub fn from_body(body: &[u8]) -> Result<Self> {
        Ok(Self {
            timeout_seconds: body.first().copied(),
        })
    }
}
