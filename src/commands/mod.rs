//! Typed commands and responses, and the `(cmd_class, cmd_instr)` registry
//! that dispatches a parsed [`Apdu`](crate::apdu::Apdu) to one of them.

pub mod ack;
pub mod admin;
pub mod authorisation;
pub mod completion;
pub mod display;
pub mod print;
pub mod registration;
pub mod status;

use crate::apdu::Apdu;
use crate::errors::Result;

pub use ack::{PacketReceived, PacketReceivedError};
pub use admin::{
    AbortCommand, Diagnosis, EndOfDay, Initialisation, Kassenbericht, LogOff, ReadCard,
    ResetTerminal, StatusEnquiry,
};
pub use authorisation::Authorisation;
pub use completion::{Abort, Completion};
pub use display::{DisplayText, DisplayTextIntInput};
pub use print::{PrintLine, PrintTextBlock};
pub use registration::Registration;
pub use status::{IntermediateStatusInformation, StatusInformation};

/// Anything that can be sent as one APDU. Implemented directly on each
/// command struct rather than derived, since a handful (`Registration`,
/// `Authorisation`) keep their class/instr as free constants instead of
/// associated ones.
pub trait Command {
    fn cmd_class(&self) -> u8;
    fn cmd_instr(&self) -> u8;
    fn wait_for_completion(&self) -> bool;
    fn to_body(&self) -> Result<Vec<u8>>;

    fn to_apdu(&self) -> Result<Apdu> {
        Ok(Apdu::new(self.cmd_class(), self.cmd_instr(), self.to_body()?))
    }
}

macro_rules! impl_command {
    ($ty:ty, $class:expr, $instr:expr) => {
        impl Command for $ty {
            fn cmd_class(&self) -> u8 {
                $class
            }
            fn cmd_instr(&self) -> u8 {
                $instr
            }
            fn wait_for_completion(&self) -> bool {
                self.wait_for_completion()
            }
            fn to_body(&self) -> Result<Vec<u8>> {
                self.to_body()
            }
        }
    };
}

impl_command!(Registration, registration::CMD_CLASS, registration::CMD_INSTR);
impl_command!(Authorisation, authorisation::CMD_CLASS, authorisation::CMD_INSTR);
impl_command!(EndOfDay, EndOfDay::CMD_CLASS, EndOfDay::CMD_INSTR);
impl_command!(Initialisation, Initialisation::CMD_CLASS, Initialisation::CMD_INSTR);
impl_command!(Kassenbericht, Kassenbericht::CMD_CLASS, Kassenbericht::CMD_INSTR);
impl_command!(ResetTerminal, ResetTerminal::CMD_CLASS, ResetTerminal::CMD_INSTR);
impl_command!(Diagnosis, Diagnosis::CMD_CLASS, Diagnosis::CMD_INSTR);
impl_command!(LogOff, LogOff::CMD_CLASS, LogOff::CMD_INSTR);
impl_command!(StatusEnquiry, StatusEnquiry::CMD_CLASS, StatusEnquiry::CMD_INSTR);
impl_command!(AbortCommand, AbortCommand::CMD_CLASS, AbortCommand::CMD_INSTR);
impl_command!(ReadCard, ReadCard::CMD_CLASS, ReadCard::CMD_INSTR);
impl_command!(DisplayText, DisplayText::CMD_CLASS, DisplayText::CMD_INSTR);
impl_command!(
    DisplayTextIntInput,
    DisplayTextIntInput::CMD_CLASS,
    DisplayTextIntInput::CMD_INSTR
);
impl_command!(PrintLine, PrintLine::CMD_CLASS, PrintLine::CMD_INSTR);
impl_command!(PrintTextBlock, PrintTextBlock::CMD_CLASS, PrintTextBlock::CMD_INSTR);

impl Command for PacketReceived {
    fn cmd_class(&self) -> u8 {
        Self::CMD_CLASS
    }
    fn cmd_instr(&self) -> u8 {
        Self::CMD_INSTR
    }
    fn wait_for_completion(&self) -> bool {
        PacketReceived::wait_for_completion(self)
    }
    fn to_body(&self) -> Result<Vec<u8>> {
        PacketReceived::to_body(self)
    }
}

impl Command for PacketReceivedError {
    fn cmd_class(&self) -> u8 {
        Self::CMD_CLASS
    }
    fn cmd_instr(&self) -> u8 {
        PacketReceivedError::cmd_instr(self)
    }
    fn wait_for_completion(&self) -> bool {
        PacketReceivedError::wait_for_completion(self)
    }
    fn to_body(&self) -> Result<Vec<u8>> {
        PacketReceivedError::to_body(self)
    }
}

/// A parsed, dispatched response. Carries the same set of variants the
/// terminal can send back, plus `Unknown` for anything the registry below
/// doesn't recognise (forward-compatibility rather than a hard parse error).
#[derive(Debug, Clone, PartialEq)]
pub enum Response {
    StatusInformation(StatusInformation),
    IntermediateStatusInformation(IntermediateStatusInformation),
    PrintLine(PrintLine),
    PrintTextBlock(PrintTextBlock),
    Completion(Completion),
    Abort(Abort),
    PacketReceived(PacketReceived),
    PacketReceivedError(PacketReceivedError),
    Unknown { class: u8, instr: u8, body: Vec<u8> },
}

impl Response {
    /// Whether this response type ever terminates a transmission on its
    /// own (spec §4.7 / the original `handle_response` semantics):
    /// `Completion` and `Abort` always end it; `PacketReceived` ends it
    /// only when the command that provoked it didn't ask to wait for
    /// completion; everything else (status/print chatter, and the always-
    /// terminal-as-failure `PacketReceivedError`) is handled by the
    /// transmission state machine directly rather than through this flag.
    pub fn is_informational(&self) -> bool {
        matches!(
            self,
            Response::StatusInformation(_)
                | Response::IntermediateStatusInformation(_)
                | Response::PrintLine(_)
                | Response::PrintTextBlock(_)
        )
    }
}

/// Dispatches a parsed APDU to its typed [`Response`] by `(cmd_class,
/// cmd_instr)`. Class `0x84` is special: any instr byte is a valid
/// `PacketReceivedError`, since the error code itself rides in that byte.
pub fn parse_response(apdu: &Apdu) -> Result<Response> {
    if apdu.cmd_class == PacketReceivedError::CMD_CLASS {
        return Ok(Response::PacketReceivedError(PacketReceivedError::from_instr(
            apdu.cmd_instr,
            &apdu.body,
        )?));
    }
    Ok(match (apdu.cmd_class, apdu.cmd_instr) {
        (StatusInformation::CMD_CLASS, StatusInformation::CMD_INSTR) => {
            Response::StatusInformation(StatusInformation::from_body(&apdu.body)?)
        }
        (IntermediateStatusInformation::CMD_CLASS, IntermediateStatusInformation::CMD_INSTR) => {
            Response::IntermediateStatusInformation(IntermediateStatusInformation::from_body(
                &apdu.body,
            )?)
        }
        (PrintLine::CMD_CLASS, PrintLine::CMD_INSTR) => {
            Response::PrintLine(PrintLine::from_body(&apdu.body)?)
        }
        (PrintTextBlock::CMD_CLASS, PrintTextBlock::CMD_INSTR) => {
            Response::PrintTextBlock(PrintTextBlock::from_body(&apdu.body)?)
        }
        (Completion::CMD_CLASS, Completion::CMD_INSTR) => {
            Response::Completion(Completion::from_body(&apdu.body)?)
        }
        (Abort::CMD_CLASS, Abort::CMD_INSTR) => Response::Abort(Abort::from_body(&apdu.body)?),
        (PacketReceived::CMD_CLASS, PacketReceived::CMD_INSTR) => {
            Response::PacketReceived(PacketReceived::from_body(&apdu.body)?)
        }
        (class, instr) => Response::Unknown {
            class,
            instr,
            body: apdu.body.clone(),
        },
    })
}
