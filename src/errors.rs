//! Crate-wide error type.
//!
//! One variant per error kind in the protocol design: frame-layer failures
//! recover locally (NAK + retry) and are only surfaced here once retries are
//! exhausted; everything else propagates straight to the caller.

use thiserror::Error;

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// Connect/reopen failed at the OS layer. Fatal to the current client.
    #[error("transport connect failed: {0}")]
    TransportConnectionFailed(String),

    /// Malformed frame header, CRC mismatch, or unexpected byte, surfaced
    /// after NAK/retry at the frame layer has been exhausted.
    #[error("transport layer error: {0}")]
    TransportLayerException(String),

    /// An APDU length promised more bytes than the body actually holds.
    #[error("not enough data: expected {expected} bytes, got {actual}")]
    NotEnoughData { expected: usize, actual: usize },

    /// `(class, instr)` has no exact or class-only registry match.
    #[error("unknown command (class={class:#04x}, instr={instr:#04x})")]
    ProtocolError { class: u8, instr: u8 },

    /// The exchange ended in Abort or PacketReceivedError.
    #[error("command failed: {description} (code={error_code:#04x})")]
    CommandFailed {
        error_code: u8,
        description: &'static str,
    },

    /// The per-command deadline elapsed while awaiting a response.
    #[error("timeout after {0:?} waiting for a response")]
    Timeout(std::time::Duration),

    /// An invalid argument was supplied by the caller (bad amount, text too
    /// long, password not 6 BCD digits, ...).
    #[error("usage error: {0}")]
    UsageError(String),

    /// A BCD nibble was not a decimal digit.
    #[error("invalid BCD nibble {0:#03x}")]
    InvalidBcdDigit(u8),

    /// A TLV tag or length field ran off the end of the buffer.
    #[error("malformed TLV: {0}")]
    MalformedTlv(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Serial(#[from] serialport::Error),
}
