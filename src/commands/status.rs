//! `04 0F` StatusInformation and `04 FF` IntermediateStatusInformation —
//! pure-bitmap status APDUs sent by the terminal. StatusInformation
//! doubles as the end-of-day totals report when bitmap 0x60 is present.

use chrono::{NaiveDate, NaiveTime};

use crate::bitmap::{self, Entry, Value};
use crate::clock::{resolve_date_day, Clock};
use crate::codec::Bcd;
use crate::errors::{Error, Result};
use crate::tlv::Tlv;

const BRANDS: [&str; 7] = [
    "ec-card", "jcb", "eurocard", "amex", "visa", "diners", "remaining",
];

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BrandTotal {
    pub name: &'static str,
    pub count: u64,
    pub turnover: u64,
    pub float_turnover: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EndOfDayReport {
    pub amount: u64,
    pub receipt_number_start: u64,
    pub receipt_number_end: u64,
    pub brands: Vec<BrandTotal>,
    pub number_total: u64,
    pub date: Option<NaiveDate>,
    pub time: Option<NaiveTime>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct StatusInformation {
    pub entries: Vec<Entry>,
}

impl StatusInformation {
    pub const CMD_CLASS: u8 = 0x04;
    pub const CMD_INSTR: u8 = 0x0F;

    pub fn wait_for_completion(&self) -> bool {
        false
    }

    pub fn to_body(&self) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        for entry in &self.entries {
            out.extend(entry.serialize()?);
        }
        Ok(out)
    }

    pub fn from_body(body: &[u8]) -> Result<Self> {
        Ok(Self {
            entries: bitmap::parse_all(body)?,
        })
    }

    fn find(&self, name: &str) -> Option<&Entry> {
        self.entries.iter().find(|e| e.field().map(|f| f.name) == Some(name))
    }

    /// Decodes bitmap 0x60 (totals) against 0x04 (amount), 0x0C (time) and
    /// 0x0D (date) into a full end-of-day report. `None` if this status
    /// information carries no amount at all (ie. it is not an end-of-day
    /// summary).
    pub fn end_of_day_report(&self, clock: &dyn Clock) -> Option<EndOfDayReport> {
        let amount = match self.find("amount")?.value {
            Value::Number(n) => n,
            _ => return None,
        };

        let time = match self.find("time").map(|e| &e.value) {
            Some(Value::Number(n)) => {
                let n = *n;
                NaiveTime::from_hms_opt((n / 10000) as u32, ((n / 100) % 100) as u32, (n % 100) as u32)
            }
            _ => None,
        };
        let date = match self.find("date_day").map(|e| &e.value) {
            Some(Value::Number(n)) => resolve_date_day(*n, clock),
            _ => None,
        };

        let totals = match self.find("totals").map(|e| &e.value) {
            Some(Value::Bytes(b)) => b,
            _ => {
                return Some(EndOfDayReport {
                    amount,
                    receipt_number_start: 0,
                    receipt_number_end: 0,
                    brands: Vec::new(),
                    number_total: 0,
                    date,
                    time,
                });
            }
        };
        if totals.len() != 53 {
            return None;
        }

        let receipt_number_start = Bcd::decode(&totals[0..2]).ok()?;
        let receipt_number_end = Bcd::decode(&totals[2..4]).ok()?;

        let mut brands = Vec::with_capacity(7);
        let mut number_total = 0u64;
        for (i, name) in BRANDS.iter().enumerate() {
            let offset = 4 + i * 7;
            let count = totals[offset] as u64;
            let turnover = Bcd::decode(&totals[offset + 1..offset + 7]).ok()?;
            number_total += count;
            brands.push(BrandTotal {
                name,
                count,
                turnover,
                float_turnover: turnover as f64 / 100.0,
            });
        }

        Some(EndOfDayReport {
            amount,
            receipt_number_start,
            receipt_number_end,
            brands,
            number_total,
            date,
            time,
        })
    }
}

/// Re-serialises one TLV object as `tag || length || data`, single-byte tag
/// and short-form length (the only shapes `IntermediateStatusInformation`'s
/// tail actually carries).
fn serialize_tlv(tlv: &Tlv) -> Vec<u8> {
    let mut out = vec![tlv.tag as u8, tlv.data.len() as u8];
    out.extend_from_slice(&tlv.data);
    out
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct IntermediateStatusInformation {
    pub status: u8,
    pub timeout: Option<u8>,
    pub tlv: Vec<Tlv>,
}

impl IntermediateStatusInformation {
    pub const CMD_CLASS: u8 = 0x04;
    pub const CMD_INSTR: u8 = 0xFF;

    pub fn wait_for_completion(&self) -> bool {
        false
    }

    pub fn to_body(&self) -> Result<Vec<u8>> {
        let mut out = vec![self.status];
        if let Some(timeout) = self.timeout {
            out.push(timeout);
        }
        for tlv in &self.tlv {
            out.extend(serialize_tlv(tlv));
        }
        Ok(out)
    }

    pub fn from_body(body: &[u8]) -> Result<Self> {
        let (&status, rest) = body.split_first().ok_or(Error::NotEnoughData {
            expected: 1,
            actual: 0,
        })?;
        let timeout = rest.first().copied();
        let tail = if timeout.is_some() { &rest[1..] } else { rest };
        let tlv = crate::tlv::parse(tail)?;
        Ok(Self { status, timeout, tlv })
    }
}
