//! `06 00` Registration — the first command an ECR sends; negotiates which
//! side prints receipts, controls the admin menu, and so on.

use crate::bitmap::{self, Entry, Value};
use crate::codec::Bcd;
use crate::errors::{Error, Result};

pub const CMD_CLASS: u8 = 0x06;
pub const CMD_INSTR: u8 = 0x00;

/// The RFU bits of the config byte (bit 0 and bit 6) — must always be clear.
pub const CONFIG_RFU_MASK: u8 = 0x41;

/// The flags `generate_config` turns into a single config byte.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConfigFlags {
    pub ecr_prints_receipt: bool,
    pub ecr_prints_admin_receipt: bool,
    pub ecr_intermediate_status: bool,
    pub ecr_controls_payment: bool,
    pub ecr_controls_admin: bool,
    pub ecr_uses_print_lines: bool,
}

/// Packs `flags` into the Registration config byte. RFU bits 0 and 6 are
/// always cleared, regardless of `flags`.
pub fn generate_config(flags: ConfigFlags) -> u8 {
    let mut ret = 0u8;
    if flags.ecr_prints_receipt {
        ret |= 0x02;
    }
    if flags.ecr_prints_admin_receipt {
        ret |= 0x04;
    }
    if flags.ecr_intermediate_status {
        ret |= 0x08;
    } else {
        tracing::warn!("intermediate status not requested; most terminals require it");
    }
    if flags.ecr_controls_payment {
        ret |= 0x10;
    }
    if flags.ecr_controls_admin {
        ret |= 0x20;
    }
    if flags.ecr_uses_print_lines {
        ret |= 0x80;
    }
    ret & !CONFIG_RFU_MASK
}

/// Packs the service bitmap byte: bit 0 = do not assign the terminal's own
/// service menu, bit 1 = use capital letters on the display. Bits 2-7 RFU.
pub fn generate_service(do_not_assign_service_menu: bool, use_capitals: bool) -> u8 {
    let mut ret = 0u8;
    if do_not_assign_service_menu {
        ret |= 0x01;
    }
    if use_capitals {
        ret |= 0x02;
    }
    ret & 0x03
}

#[derive(Debug, Clone, PartialEq)]
pub struct Registration {
    pub password: u64,
    pub config_byte: u8,
    pub currency: [u8; 2],
    pub entries: Vec<Entry>,
}

impl Registration {
    pub fn new(password: u64, config_byte: u8, currency: [u8; 2]) -> Self {
        Self {
            password,
            config_byte,
            currency,
            entries: Vec::new(),
        }
    }

    pub fn with_service_byte(mut self, service_byte: u8) -> Result<Self> {
        self.entries
            .push(Entry::new("service_byte", Value::Bytes(vec![service_byte]))?);
        Ok(self)
    }

    pub fn wait_for_completion(&self) -> bool {
        true
    }

    pub fn to_body(&self) -> Result<Vec<u8>> {
        let mut out = Bcd::encode(self.password, 6);
        out.push(self.config_byte);
        out.extend_from_slice(&self.currency);
        for entry in &self.entries {
            out.extend(entry.serialize()?);
        }
        Ok(out)
    }

    pub fn from_body(body: &[u8]) -> Result<Self> {
        if body.len() < 6 {
            return Err(Error::NotEnoughData {
                expected: 6,
                actual: body.len(),
            });
        }
        let password = Bcd::decode(&body[0..3])?;
        let config_byte = body[3];
        let currency = [body[4], body[5]];
        let entries = bitmap::parse_all(&body[6..])?;
        Ok(Self {
            password,
            config_byte,
            currency,
            entries,
        })
    }
}

#[cfg(test)]
mod tests {
    use hex_literal::hex;
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn generate_config_clears_rfu_bits() {
        let all_true = ConfigFlags {
            ecr_prints_receipt: true,
            ecr_prints_admin_receipt: true,
            ecr_intermediate_status: true,
            ecr_controls_payment: true,
            ecr_controls_admin: true,
            ecr_uses_print_lines: true,
        };
        assert_eq!(generate_config(all_true), 0xBE);
        assert_eq!(generate_config(ConfigFlags::default()) & CONFIG_RFU_MASK, 0);
    }

    #[test]
    fn generate_service_masks_to_two_bits() {
        assert_eq!(generate_service(true, true), 0x03);
        assert_eq!(generate_service(false, false), 0x00);
    }

    proptest! {
        // Spec law 7: RFU bits always clear, regardless of flags.
        #[test]
        fn generate_config_never_sets_rfu_bits(
            ecr_prints_receipt: bool,
            ecr_prints_admin_receipt: bool,
            ecr_intermediate_status: bool,
            ecr_controls_payment: bool,
            ecr_controls_admin: bool,
            ecr_uses_print_lines: bool,
        ) {
            let flags = ConfigFlags {
                ecr_prints_receipt,
                ecr_prints_admin_receipt,
                ecr_intermediate_status,
                ecr_controls_payment,
                ecr_controls_admin,
                ecr_uses_print_lines,
            };
            prop_assert_eq!(generate_config(flags) & CONFIG_RFU_MASK, 0);
        }
    }

    #[test]
    fn scenario_s1_body_matches_literal_bytes() {
        // S1: password 123456, config 0xBE, EUR, plus service_byte = 0x00.
        let cmd = Registration::new(123456, 0xBE, [0x09, 0x78])
            .with_service_byte(0x00)
            .unwrap();
        let body = cmd.to_body().unwrap();
        assert_eq!(body.as_slice(), hex!("12 34 56 BE 09 78 03 01 00"));
        assert_eq!(Registration::from_body(&body).unwrap(), cmd);
    }
}
