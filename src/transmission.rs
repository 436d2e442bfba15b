//! The transmission state machine: send one command, then read responses
//! until the terminal hands control back — mirroring the "who holds
//! master rights" turn-taking a ZVT link is built around (spec §4.7).
//!
//! The per-response termination rules below are not a literal reading of
//! the distilled bitmap-level spec; they are the actual control flow of
//! the reference `ecrterm` implementation's response loop, which always
//! re-enters after the frame-level ACK and only exits on a response that
//! explicitly returns master rights.

use std::thread::sleep;
use std::time::Duration;

use tracing::{debug, trace_span, warn};

use crate::apdu::Apdu;
use crate::commands::{Command, Response};
use crate::errors::{Error, Result};
use crate::transport::Transport;

/// Which side sent a given entry in an [`Exchange`]'s history.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Outgoing,
    Incoming,
}

#[derive(Debug, Clone, PartialEq)]
pub enum HistoryEntry {
    Command { class: u8, instr: u8, body: Vec<u8> },
    Response(Response),
}

/// How an [`Exchange`] finally resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Completed,
    Aborted,
    Failed,
}

/// The full record of one `transmit` call: everything sent and received,
/// and how it ended.
#[derive(Debug, Clone, PartialEq)]
pub struct Exchange {
    pub history: Vec<(Direction, HistoryEntry)>,
    pub completion: Option<crate::commands::Completion>,
    pub abort: Option<crate::commands::Abort>,
    pub outcome: Outcome,
}

impl Exchange {
    fn new() -> Self {
        Self {
            history: Vec::new(),
            completion: None,
            abort: None,
            outcome: Outcome::Failed,
        }
    }
}

/// Drives one [`Transport`] through full command/response exchanges.
pub struct Transmission<T: Transport> {
    transport: T,
    last: Option<Exchange>,
}

impl<T: Transport> Transmission<T> {
    pub fn new(transport: T) -> Self {
        Self { transport, last: None }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    pub fn last_exchange(&self) -> Option<&Exchange> {
        self.last.as_ref()
    }

    /// Sends `cmd` and reads responses until master rights return to the
    /// ECR. `listener`, if given, is invoked for every response that does
    /// not itself end the exchange (status updates, print lines).
    pub fn transmit<C: Command>(
        &mut self,
        cmd: &C,
        timeout: Duration,
        mut listener: Option<&mut dyn FnMut(&Response)>,
    ) -> Result<Exchange> {
        let span = trace_span!("transmit", class = cmd.cmd_class(), instr = cmd.cmd_instr());
        let _enter = span.enter();

        let mut exchange = Exchange::new();
        let apdu = cmd.to_apdu()?;
        exchange.history.push((
            Direction::Outgoing,
            HistoryEntry::Command {
                class: apdu.cmd_class,
                instr: apdu.cmd_instr,
                body: apdu.body.clone(),
            },
        ));

        if self.transport.insert_delays() {
            sleep(Duration::from_millis(5));
        }
        self.transport.send_apdu(&apdu.serialize()?)?;

        let wait_for_completion = cmd.wait_for_completion();
        let outcome = loop {
            let bytes = self.transport.recv_apdu(timeout)?;
            let response_apdu = Apdu::parse(&bytes)?;
            let response = crate::commands::parse_response(&response_apdu)?;
            exchange
                .history
                .push((Direction::Incoming, HistoryEntry::Response(response.clone())));

            match response {
                Response::PacketReceived(_) => {
                    if wait_for_completion {
                        continue;
                    }
                    break Outcome::Completed;
                }
                Response::PacketReceivedError(ref e) => {
                    warn!(error_code = e.error_code, description = e.description(), "command rejected");
                    break Outcome::Failed;
                }
                Response::Completion(ref c) => {
                    exchange.completion = Some(c.clone());
                    break Outcome::Completed;
                }
                Response::Abort(ref a) => {
                    debug!(error_code = a.error_code, description = a.description(), "terminal aborted");
                    exchange.abort = Some(*a);
                    break Outcome::Aborted;
                }
                Response::StatusInformation(_)
                | Response::IntermediateStatusInformation(_)
                | Response::PrintLine(_)
                | Response::PrintTextBlock(_) => {
                    if let Some(listener) = listener.as_deref_mut() {
                        listener(&response);
                    }
                    continue;
                }
                Response::Unknown { class, instr, .. } => {
                    warn!(class, instr, "ignoring unrecognised response, master rights unchanged");
                    continue;
                }
            }
        };

        exchange.outcome = outcome;
        self.last = Some(exchange.clone());
        Ok(exchange)
    }
}
