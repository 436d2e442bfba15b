//! Client configuration: the password, device address, currency and
//! per-command timeouts a [`crate::client::Client`] needs, built with a
//! validating builder rather than a bag of public fields callers can leave
//! half-filled.

use std::time::Duration;

use crate::codec::Bcd;
use crate::errors::{Error, Result};
use crate::transport::{parse_device_address, DeviceAddress};

/// An ISO 4217 numeric currency code (eg. 978 for EUR), stored the way the
/// wire wants it: two BCD-packed bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CurrencyCode(u16);

impl CurrencyCode {
    pub const EUR: CurrencyCode = CurrencyCode(978);

    /// Validates `code` is representable as 4 BCD digits (0-9999).
    pub fn new(code: u16) -> Result<Self> {
        if code > 9999 {
            return Err(Error::UsageError(format!(
                "currency code {code} is not a valid 4-digit ISO 4217 numeric code"
            )));
        }
        Ok(Self(code))
    }

    pub fn numeric(&self) -> u16 {
        self.0
    }

    pub fn to_bytes(self) -> [u8; 2] {
        let bcd = Bcd::encode(self.0 as u64, 4);
        [bcd[0], bcd[1]]
    }
}

impl Default for CurrencyCode {
    fn default() -> Self {
        Self::EUR
    }
}

/// Per-command timeouts, all defaulting to values that work for a terminal
/// on a typical serial or LAN link.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    pub registration: Duration,
    pub status: Duration,
    pub payment: Duration,
    pub end_of_day: Duration,
    pub display: Duration,
    pub print: Duration,
    pub reset: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            registration: Duration::from_secs(10),
            status: Duration::from_secs(10),
            payment: Duration::from_secs(90),
            end_of_day: Duration::from_secs(120),
            display: Duration::from_secs(10),
            print: Duration::from_secs(10),
            reset: Duration::from_secs(10),
        }
    }
}

/// Everything a [`Client`](crate::client::Client) needs to connect and
/// register with a terminal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub password: u64,
    pub device_address: DeviceAddress,
    pub currency: CurrencyCode,
    pub timeouts: Timeouts,
    pub insert_delays: bool,
}

/// Builds a [`Config`], validating as each field is set rather than
/// deferring everything to `build()`.
#[derive(Debug, Clone)]
pub struct ConfigBuilder {
    password: Option<u64>,
    device: Option<String>,
    currency: CurrencyCode,
    timeouts: Timeouts,
    insert_delays: bool,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self {
            password: None,
            device: None,
            currency: CurrencyCode::default(),
            timeouts: Timeouts::default(),
            insert_delays: false,
        }
    }

    /// Sets the registration password. Must be exactly 6 decimal digits
    /// (the field is BCD-packed into 3 bytes on the wire).
    pub fn password(mut self, password: u64) -> Result<Self> {
        if password > 999_999 {
            return Err(Error::UsageError(format!(
                "password {password} is not 6 BCD digits"
            )));
        }
        self.password = Some(password);
        Ok(self)
    }

    pub fn device(mut self, device: impl Into<String>) -> Self {
        self.device = Some(device.into());
        self
    }

    pub fn currency(mut self, currency: CurrencyCode) -> Self {
        self.currency = currency;
        self
    }

    pub fn timeouts(mut self, timeouts: Timeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    pub fn insert_delays(mut self, insert_delays: bool) -> Self {
        self.insert_delays = insert_delays;
        self
    }

    pub fn build(self) -> Result<Config> {
        let password = self
            .password
            .ok_or_else(|| Error::UsageError("config is missing a password".into()))?;
        let device = self
            .device
            .ok_or_else(|| Error::UsageError("config is missing a device address".into()))?;
        Ok(Config {
            password,
            device_address: parse_device_address(&device)?,
            currency: self.currency,
            timeouts: self.timeouts,
            insert_delays: self.insert_delays,
        })
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_a_valid_config() {
        let config = ConfigBuilder::new()
            .password(123456)
            .unwrap()
            .device("/dev/ttyUSB0")
            .build()
            .unwrap();
        assert_eq!(config.password, 123456);
        assert_eq!(
            config.device_address,
            DeviceAddress::Serial {
                path: "/dev/ttyUSB0".into()
            }
        );
    }

    #[test]
    fn rejects_password_over_six_digits() {
        assert!(ConfigBuilder::new().password(1_000_000).is_err());
    }

    #[test]
    fn missing_device_is_a_usage_error() {
        let err = ConfigBuilder::new().password(123456).unwrap().build().unwrap_err();
        assert!(matches!(err, Error::UsageError(_)));
    }

    #[test]
    fn eur_currency_encodes_to_registration_bytes() {
        assert_eq!(CurrencyCode::EUR.to_bytes(), [0x09, 0x78]);
    }

    #[test]
    fn rejects_currency_over_four_digits() {
        assert!(CurrencyCode::new(10_000).is_err());
    }
}
