//! The high-level client: one `Transmission` plus the ECR-facing
//! operations a real point-of-sale integration actually calls, wrapping
//! the typed command/response layer in plain `Result`s instead of the
//! sentinel return codes the original source used.

use std::time::Duration;

use tracing::{debug, info};

use crate::bitmap::{Entry, Value};
use crate::clock::{Clock, SystemClock};
use crate::commands::{
    self, Abort, Authorisation, Command, Completion, DisplayText, EndOfDay, PrintTextBlock,
    Registration, ResetTerminal, Response, StatusEnquiry,
};
use crate::config::{Config, CurrencyCode};
use crate::errors::{Error, Result};
use crate::transmission::{Outcome, Transmission};
use crate::transport::{DeviceAddress, SerialTransport, SocketTransport, Transport};

const PRINT_CHUNK_SIZE: usize = 10;

/// Result of a successful [`Client::register`] call.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RegistrationOutcome {
    pub terminal_id: Option<u64>,
}

/// Result of a successful [`Client::status`] call.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TerminalStatus {
    pub terminal_status: Option<u8>,
    pub software_version: Option<String>,
}

/// Result of a [`Client::payment`] call.
#[derive(Debug, Clone, PartialEq)]
pub enum PaymentOutcome {
    Approved { receipt_lines: Vec<String> },
    Declined { error_code: u8 },
}

/// Result of a successful [`Client::end_of_day`] call.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct EndOfDayReport {
    pub totals: Option<commands::status::EndOfDayReport>,
    pub lines: Vec<String>,
}

enum AnyTransport {
    Serial(SerialTransport),
    Socket(SocketTransport),
}

impl Transport for AnyTransport {
    fn send_apdu(&mut self, apdu_bytes: &[u8]) -> Result<()> {
        match self {
            Self::Serial(t) => t.send_apdu(apdu_bytes),
            Self::Socket(t) => t.send_apdu(apdu_bytes),
        }
    }
    fn recv_apdu(&mut self, timeout: Duration) -> Result<Vec<u8>> {
        match self {
            Self::Serial(t) => t.recv_apdu(timeout),
            Self::Socket(t) => t.recv_apdu(timeout),
        }
    }
    fn reset(&mut self) -> Result<()> {
        match self {
            Self::Serial(t) => t.reset(),
            Self::Socket(t) => t.reset(),
        }
    }
    fn close(&mut self) -> Result<()> {
        match self {
            Self::Serial(t) => t.close(),
            Self::Socket(t) => t.close(),
        }
    }
    fn insert_delays(&self) -> bool {
        match self {
            Self::Serial(t) => t.insert_delays(),
            Self::Socket(t) => t.insert_delays(),
        }
    }
}

/// Owns one transport and the configuration used to drive it.
pub struct Client {
    config: Config,
    transmission: Transmission<AnyTransport>,
    clock: Box<dyn Clock>,
    version: Option<String>,
}

impl Client {
    /// Parses `config.device_address`, opens the matching transport, and
    /// returns a connected (but not yet registered) client.
    pub fn connect(config: Config) -> Result<Self> {
        let transport = match &config.device_address {
            DeviceAddress::Serial { path } => {
                AnyTransport::Serial(SerialTransport::open(path)?.with_insert_delays(config.insert_delays))
            }
            DeviceAddress::Socket { host, port } => AnyTransport::Socket(
                SocketTransport::connect(host, *port, Duration::from_secs(10))?
                    .with_insert_delays(config.insert_delays),
            ),
        };
        info!(?config.device_address, "connected to terminal");
        Ok(Self {
            config,
            transmission: Transmission::new(transport),
            clock: Box::new(SystemClock),
            version: None,
        })
    }

    /// Swaps the clock used to resolve the end-of-day date's year. Intended
    /// for tests; production callers get [`SystemClock`] by default.
    pub fn with_clock(mut self, clock: Box<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    fn find_tid(completion: &Completion) -> Option<u64> {
        completion.tid()
    }

    pub fn register(&mut self) -> Result<RegistrationOutcome> {
        let cmd = Registration::new(self.config.password, 0xBE, self.config.currency.to_bytes());
        let exchange = self
            .transmission
            .transmit(&cmd, self.config.timeouts.registration, None)?;
        match exchange.outcome {
            Outcome::Completed => {
                let terminal_id = exchange.completion.as_ref().and_then(Self::find_tid);
                Ok(RegistrationOutcome { terminal_id })
            }
            Outcome::Aborted => Err(abort_error(exchange.abort)),
            Outcome::Failed => Err(Error::TransportLayerException(
                "registration did not complete".into(),
            )),
        }
    }

    pub fn status(&mut self) -> Result<TerminalStatus> {
        let cmd = StatusEnquiry::new(Some(self.config.password));
        let exchange = self
            .transmission
            .transmit(&cmd, self.config.timeouts.status, None)?;
        match exchange.outcome {
            Outcome::Completed => {
                let completion = exchange.completion.clone().unwrap_or_default();
                if let Some(version) = &completion.software_version {
                    self.version = Some(version.clone());
                }
                Ok(TerminalStatus {
                    terminal_status: completion.terminal_status,
                    software_version: completion.software_version.or_else(|| self.version.clone()),
                })
            }
            Outcome::Aborted => Err(abort_error(exchange.abort)),
            Outcome::Failed => Err(Error::TransportLayerException(
                "status enquiry did not complete".into(),
            )),
        }
    }

    pub fn payment(&mut self, amount_minor: u32, currency: Option<CurrencyCode>) -> Result<PaymentOutcome> {
        if amount_minor == 0 {
            return Err(Error::UsageError("payment amount must be non-zero".into()));
        }
        let mut cmd = Authorisation::amount_minor(amount_minor as u64)?;
        if let Some(currency) = currency {
            cmd = cmd.with_entry(Entry::new("currency", Value::Bytes(currency.to_bytes().to_vec()))?);
        }

        let mut receipt_lines = Vec::new();
        let exchange = {
            let mut listener = |response: &Response| match response {
                Response::PrintTextBlock(block) => receipt_lines.extend(block.lines.clone()),
                Response::PrintLine(line) => receipt_lines.push(line.text.clone()),
                _ => {}
            };
            self.transmission
                .transmit(&cmd, self.config.timeouts.payment, Some(&mut listener))?
        };

        match exchange.outcome {
            Outcome::Completed => Ok(PaymentOutcome::Approved { receipt_lines }),
            Outcome::Aborted => Ok(PaymentOutcome::Declined {
                error_code: exchange.abort.map(|a| a.error_code).unwrap_or(0),
            }),
            Outcome::Failed => Err(Error::TransportLayerException(
                "payment did not complete".into(),
            )),
        }
    }

    pub fn end_of_day(&mut self) -> Result<EndOfDayReport> {
        let cmd = EndOfDay::new(Some(self.config.password));
        let mut lines = Vec::new();
        let mut totals = None;
        let exchange = {
            let clock = self.clock.as_ref();
            let mut listener = |response: &Response| match response {
                Response::PrintTextBlock(block) => lines.extend(block.lines.clone()),
                Response::PrintLine(line) => lines.push(line.text.clone()),
                Response::StatusInformation(status) => {
                    if let Some(report) = status.end_of_day_report(clock) {
                        totals = Some(report);
                    }
                }
                _ => {}
            };
            self.transmission
                .transmit(&cmd, self.config.timeouts.end_of_day, Some(&mut listener))?
        };

        match exchange.outcome {
            Outcome::Completed => Ok(EndOfDayReport { totals, lines }),
            Outcome::Aborted => Err(abort_error(exchange.abort)),
            Outcome::Failed => Err(Error::TransportLayerException(
                "end of day did not complete".into(),
            )),
        }
    }

    pub fn show_text(&mut self, lines: &[&str], duration: u8, beeps: u8) -> Result<()> {
        let cmd = DisplayText::new()
            .with_lines(lines)?
            .with_duration(duration)?
            .with_beeps(beeps)?;
        let exchange = self
            .transmission
            .transmit(&cmd, self.config.timeouts.display, None)?;
        match exchange.outcome {
            Outcome::Completed => Ok(()),
            Outcome::Aborted => Err(abort_error(exchange.abort)),
            Outcome::Failed => Err(Error::TransportLayerException(
                "display text did not complete".into(),
            )),
        }
    }

    /// Sends `lines` as one or more PrintTextBlock exchanges, chunked at
    /// [`PRINT_CHUNK_SIZE`] lines per block.
    pub fn print_text(&mut self, lines: &[(String, u8)]) -> Result<()> {
        for chunk in lines.chunks(PRINT_CHUNK_SIZE) {
            let receipt_type = chunk.first().map(|(_, t)| *t).unwrap_or(0);
            let cmd = PrintTextBlock::new(
                receipt_type,
                chunk.iter().map(|(text, _)| text.clone()).collect(),
            );
            let exchange = self
                .transmission
                .transmit(&cmd, self.config.timeouts.print, None)?;
            match exchange.outcome {
                Outcome::Completed => continue,
                Outcome::Aborted => return Err(abort_error(exchange.abort)),
                Outcome::Failed => {
                    return Err(Error::TransportLayerException(
                        "print text did not complete".into(),
                    ))
                }
            }
        }
        Ok(())
    }

    pub fn reset(&mut self) -> Result<()> {
        debug!("resetting transport and reissuing ResetTerminal");
        self.transmission.transport_mut().reset()?;
        if self.transmission.transport().insert_delays() {
            // Terminals tolerate a settling delay after a link reset.
            std::thread::sleep(Duration::from_secs(1));
        }
        let cmd = ResetTerminal::new(Some(self.config.password));
        let exchange = self
            .transmission
            .transmit(&cmd, self.config.timeouts.reset, None)?;
        match exchange.outcome {
            Outcome::Completed => Ok(()),
            Outcome::Aborted => Err(abort_error(exchange.abort)),
            Outcome::Failed => Err(Error::TransportLayerException(
                "reset did not complete".into(),
            )),
        }
    }

    /// Sends `AbortCommand` on the current transport; does not itself wait
    /// for the in-flight exchange to finish (cooperative cancellation).
    pub fn abort(&mut self) -> Result<()> {
        let cmd = commands::AbortCommand;
        let bytes = cmd.to_apdu()?.serialize()?;
        self.transmission.transport_mut().send_apdu(&bytes)
    }

    pub fn close(mut self) -> Result<()> {
        self.transmission.transport_mut().close()
    }
}

fn abort_error(abort: Option<Abort>) -> Error {
    match abort {
        Some(a) => Error::CommandFailed {
            error_code: a.error_code,
            description: a.description(),
        },
        None => Error::TransportLayerException("terminal aborted the exchange".into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn abort_error_with_no_abort_payload_is_still_an_error() {
        let err = abort_error(None);
        assert!(matches!(err, Error::TransportLayerException(_)));
    }

    #[test]
    fn abort_error_carries_description() {
        let err = abort_error(Some(Abort::new(0x6C)));
        match err {
            Error::CommandFailed { error_code, description } => {
                assert_eq!(error_code, 0x6C);
                assert_eq!(description, "Card not readable (LRC-/parity error)");
            }
            other => panic!("expected CommandFailed, got {other:?}"),
        }
    }
}
