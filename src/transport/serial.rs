//! Serial (RS-232/USB-serial) transport: 9600 8E1, DTR asserted, framed with
//! DLE/STX/ETX and CRC-CCITT as described in spec §4.6.

use std::io::{Read, Write};
use std::time::{Duration, Instant};

use tracing::{debug, trace, trace_span, warn};

use super::frame::{self, ACK, ETX, NAK};
use super::Transport;
use crate::errors::{Error, Result};

/// How long to wait for the frame-level ACK/NAK after a write, by default.
pub const DEFAULT_ACK_TIMEOUT: Duration = Duration::from_secs(5);
/// Resend budget on NAK before giving up (spec §4.6: "Resend up to 2 times").
const MAX_RESENDS: u32 = 2;

pub struct SerialTransport {
    port: Box<dyn serialport::SerialPort>,
    path: String,
    ack_timeout: Duration,
    insert_delays: bool,
}

impl SerialTransport {
    /// Opens `path` at 9600 8E1 with DTR asserted, the fixed line
    /// configuration every ZVT terminal on a serial link expects.
    pub fn open(path: &str) -> Result<Self> {
        let span = trace_span!("serial_open", path);
        let _enter = span.enter();

        let mut port = serialport::new(path, 9600)
            .data_bits(serialport::DataBits::Eight)
            .parity(serialport::Parity::Even)
            .stop_bits(serialport::StopBits::One)
            .timeout(Duration::from_millis(250))
            .open()
            .map_err(|e| Error::TransportConnectionFailed(format!("{path}: {e}")))?;
        port.write_data_terminal_ready(true)
            .map_err(|e| Error::TransportConnectionFailed(format!("{path}: DTR: {e}")))?;

        debug!(path, "serial transport connected");
        Ok(Self {
            port,
            path: path.to_string(),
            ack_timeout: DEFAULT_ACK_TIMEOUT,
            insert_delays: false,
        })
    }

    pub fn with_insert_delays(mut self, insert_delays: bool) -> Self {
        self.insert_delays = insert_delays;
        self
    }

    pub fn with_ack_timeout(mut self, timeout: Duration) -> Self {
        self.ack_timeout = timeout;
        self
    }

    /// Probes `candidates` in turn, opening each and sending a bare
    /// StatusEnquiry; the first port that answers with any parseable frame
    /// within `timeout` is returned connected. Exposed as a capability,
    /// never invoked automatically by client construction (spec §6).
    pub fn autodetect(candidates: &[&str], timeout: Duration) -> Result<Self> {
        for &path in candidates {
            let mut transport = match Self::open(path) {
                Ok(t) => t,
                Err(_) => continue,
            };
            // `05 01 00`: StatusEnquiry with no password, no bitmaps.
            let probe = crate::apdu::Apdu::new(0x05, 0x01, vec![0x00]);
            let bytes = match probe.serialize() {
                Ok(b) => b,
                Err(_) => continue,
            };
            if transport.send_apdu(&bytes).is_ok() && transport.recv_apdu(timeout).is_ok() {
                debug!(path, "autodetect found a responding terminal");
                return Ok(transport);
            }
            let _ = transport.close();
        }
        Err(Error::TransportConnectionFailed(
            "no candidate serial port answered".into(),
        ))
    }

    fn read_byte(&mut self, deadline: Instant, budget: Duration) -> Result<u8> {
        let mut buf = [0u8; 1];
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Err(Error::Timeout(budget));
            }
            self.port
                .set_timeout(remaining.min(Duration::from_millis(250)))
                .map_err(Error::Serial)?;
            match self.port.read_exact(&mut buf) {
                Ok(()) => return Ok(buf[0]),
                Err(e) if e.kind() == std::io::ErrorKind::TimedOut => continue,
                Err(e) => return Err(Error::Io(e)),
            }
        }
    }

    fn write_ack_byte(&mut self, byte: u8) -> Result<()> {
        self.port.write_all(&[byte])?;
        self.port.flush()?;
        Ok(())
    }
}

impl Transport for SerialTransport {
    fn send_apdu(&mut self, apdu_bytes: &[u8]) -> Result<()> {
        let span = trace_span!("serial_send_apdu");
        let _enter = span.enter();
        let frame = frame::encode_frame(apdu_bytes);

        for attempt in 0..=MAX_RESENDS {
            trace!(attempt, len = frame.len(), "writing frame");
            self.port.write_all(&frame)?;
            self.port.flush()?;

            let deadline = Instant::now() + self.ack_timeout;
            match self.read_byte(deadline, self.ack_timeout) {
                Ok(ACK) => return Ok(()),
                Ok(NAK) => {
                    warn!(attempt, "peer NAKed frame, retrying");
                    continue;
                }
                Ok(other) => {
                    return Err(Error::TransportLayerException(format!(
                        "unexpected byte {other:#04x} while awaiting frame ACK"
                    )));
                }
                Err(Error::Timeout(_)) => {
                    warn!(attempt, "timed out awaiting frame ACK, retrying");
                    continue;
                }
                Err(e) => return Err(e),
            }
        }
        Err(Error::TransportLayerException(
            "frame not acknowledged after retries exhausted".into(),
        ))
    }

    fn recv_apdu(&mut self, timeout: Duration) -> Result<Vec<u8>> {
        let span = trace_span!("serial_recv_apdu");
        let _enter = span.enter();
        let deadline = Instant::now() + timeout;

        loop {
            let first = self.read_byte(deadline, timeout)?;
            if first != frame::DLE {
                return Err(Error::TransportLayerException(format!(
                    "expected frame start DLE, got {first:#04x}"
                )));
            }
            let second = self.read_byte(deadline, timeout)?;
            if second != frame::STX {
                return Err(Error::TransportLayerException(format!(
                    "expected STX after DLE, got {second:#04x}"
                )));
            }

            let mut stuffed = vec![frame::DLE, frame::STX];
            loop {
                let b = self.read_byte(deadline, timeout)?;
                if b == frame::DLE {
                    let next = self.read_byte(deadline, timeout)?;
                    stuffed.push(frame::DLE);
                    if next == ETX {
                        stuffed.push(ETX);
                        break;
                    }
                    stuffed.push(next);
                } else {
                    stuffed.push(b);
                }
            }
            stuffed.push(self.read_byte(deadline, timeout)?);
            stuffed.push(self.read_byte(deadline, timeout)?);

            match frame::decode_frame(&stuffed) {
                Ok(payload) => {
                    self.write_ack_byte(ACK)?;
                    return Ok(payload);
                }
                Err(e) => {
                    warn!(error = %e, "CRC/framing error on received frame, sending NAK");
                    self.write_ack_byte(NAK)?;
                    continue;
                }
            }
        }
    }

    fn reset(&mut self) -> Result<()> {
        debug!(path = self.path, "resetting serial transport");
        let reopened = serialport::new(&self.path, 9600)
            .data_bits(serialport::DataBits::Eight)
            .parity(serialport::Parity::Even)
            .stop_bits(serialport::StopBits::One)
            .timeout(Duration::from_millis(250))
            .open()
            .map_err(|e| Error::TransportConnectionFailed(format!("{}: {e}", self.path)))?;
        self.port = reopened;
        self.port.write_data_terminal_ready(true)?;
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        debug!(path = self.path, "closing serial transport");
        Ok(())
    }

    fn insert_delays(&self) -> bool {
        self.insert_delays
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn autodetect_reports_failure_when_nothing_answers() {
        let err = SerialTransport::autodetect(
            &["/dev/nonexistent-zvt-test-port"],
            Duration::from_millis(50),
        )
        .unwrap_err();
        assert!(matches!(err, Error::TransportConnectionFailed(_)));
    }
}
