//! A ZVT payment-terminal protocol client: the ECR (electronic cash
//! register) side of the serial/TCP link to a payment terminal.
//!
//! [`client::Client`] is the entry point for most callers; the lower
//! layers (framing, APDU codec, bitmap registry, typed commands) are
//! public for callers who need to drive the protocol by hand.

pub mod apdu;
pub mod bitmap;
pub mod client;
pub mod clock;
pub mod codec;
pub mod commands;
pub mod config;
pub mod crc;
pub mod errorcodes;
pub mod errors;
pub mod text;
pub mod tlv;
pub mod transmission;
pub mod transport;

pub use client::Client;
pub use config::{Config, ConfigBuilder, CurrencyCode};
pub use errors::{Error, Result};
