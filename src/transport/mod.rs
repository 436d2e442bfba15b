//! Transport layer: the byte-oriented serial transport (DLE/STX/ETX framing,
//! CRC, ACK/NAK) and the unframed TCP socket transport, behind one
//! `Transport` trait the transmission state machine drives.

pub mod frame;
pub mod serial;
pub mod socket;

pub use serial::SerialTransport;
pub use socket::SocketTransport;

use std::time::Duration;

use crate::errors::{Error, Result};

/// A parsed device address (spec §6): `"/dev/..."`/`"COM..."` selects the
/// serial transport, `"socket://HOST:PORT"` selects TCP.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceAddress {
    Serial { path: String },
    Socket { host: String, port: u16 },
}

/// Default ZVT TCP port, used when `"socket://HOST"` omits a port.
pub const DEFAULT_SOCKET_PORT: u16 = 20007;

/// Parses a device address string. No schemes beyond the two below are
/// recognised.
pub fn parse_device_address(s: &str) -> Result<DeviceAddress> {
    if let Some(rest) = s.strip_prefix("socket://") {
        let (host, port) = match rest.rsplit_once(':') {
            Some((host, port_str)) => {
                let port = port_str
                    .parse::<u16>()
                    .map_err(|_| Error::UsageError(format!("invalid socket port: {port_str}")))?;
                (host.to_string(), port)
            }
            None => (rest.to_string(), DEFAULT_SOCKET_PORT),
        };
        if host.is_empty() {
            return Err(Error::UsageError("socket:// address has no host".into()));
        }
        return Ok(DeviceAddress::Socket { host, port });
    }
    if s.starts_with('/') || s.starts_with("COM") {
        return Ok(DeviceAddress::Serial { path: s.to_string() });
    }
    Err(Error::UsageError(format!(
        "unrecognised device address: {s} (expected /dev/..., COM..., or socket://host:port)"
    )))
}

/// Abstraction the transmission state machine drives: send one APDU, then
/// receive zero or more response APDUs, each delivered as exactly one
/// logical payload (serial un-stuffs and CRC-checks the frame; socket just
/// delimits by the APDU's own length field).
pub trait Transport {
    /// Sends one APDU's wire bytes. On the serial transport this frames,
    /// writes, and blocks for the frame-level ACK/NAK handshake (resending
    /// on NAK up to twice); on the socket transport it is a plain write.
    fn send_apdu(&mut self, apdu_bytes: &[u8]) -> Result<()>;

    /// Blocks until the next response APDU's wire bytes arrive, or
    /// `timeout` elapses. On the serial transport this also ACKs the frame
    /// once its CRC validates.
    fn recv_apdu(&mut self, timeout: Duration) -> Result<Vec<u8>>;

    /// Drops and re-establishes the underlying connection.
    fn reset(&mut self) -> Result<()>;

    /// Closes the connection. Errors here are logged, never fatal to the
    /// caller's own teardown.
    fn close(&mut self) -> Result<()>;

    /// Whether this transport should pace writes with small sleeps between
    /// frames (§4.6); terminals on slower serial links benefit from it.
    fn insert_delays(&self) -> bool;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_serial_paths() {
        assert_eq!(
            parse_device_address("/dev/ttyUSB0").unwrap(),
            DeviceAddress::Serial {
                path: "/dev/ttyUSB0".into()
            }
        );
        assert_eq!(
            parse_device_address("COM3").unwrap(),
            DeviceAddress::Serial { path: "COM3".into() }
        );
    }

    #[test]
    fn parses_socket_address_with_port() {
        assert_eq!(
            parse_device_address("socket://192.168.1.163:20007").unwrap(),
            DeviceAddress::Socket {
                host: "192.168.1.163".into(),
                port: 20007,
            }
        );
    }

    #[test]
    fn socket_address_without_port_uses_default() {
        assert_eq!(
            parse_device_address("socket://192.168.1.163").unwrap(),
            DeviceAddress::Socket {
                host: "192.168.1.163".into(),
                port: DEFAULT_SOCKET_PORT,
            }
        );
    }

    #[test]
    fn rejects_unknown_scheme() {
        assert!(parse_device_address("http://example.com").is_err());
    }
}
