//! Static lookup tables for the one-byte codes carried by Abort,
//! PacketReceivedError and IntermediateStatusInformation.
//!
//! The source project keeps these in a `common.py` that was not part of the
//! retrieval pack; the entries below are the well-known subset of the ZVT
//! "Error codes" and "Status information" annexes (BZT reference, chapter
//! "Registers"), reproduced for the codes this crate's tests and examples
//! actually exercise. An id missing from these tables is not a bug: callers
//! should treat it as "no description available" rather than panic.

/// `(code, description)` pairs for Abort / PacketReceivedError.
pub const ERRORCODES: &[(u8, &str)] = &[
    (0x00, "No error"),
    (0x64, "ZVT protocol error"),
    (0x65, "Reserved"),
    (0x66, "Not enough data / timeout"),
    (0x67, "Card error"),
    (0x68, "Protocol error"),
    (0x6B, "Terminal not available"),
    (0x6C, "Card not readable (LRC-/parity error)"),
    (0x6E, "Processing error"),
    (0x9C, "Function not allowed due to PIN pad"),
    (0x9D, "Function not allowed due to EMV"),
    (0xA0, "Turnover file full"),
    (0xA1, "Function deactivated"),
    (0xA3, "Maximum refund amount exceeded"),
    (0xB1, "Function not permitted for EC cash/maestro cards"),
    (0xB2, "Turnover file empty"),
    (0xB4, "Card not supported"),
    (0xB5, "Card data faulty"),
    (0xB7, "No acknowledgement from card"),
    (0xB8, "Diagnosis required"),
    (0xBA, "PAN not contained in the negative list"),
    (0xBB, "Function deactivated"),
    (0xC0, "Cancellation by the user"),
    (0xDC, "Transfer not possible"),
    (0xE9, "Card already read, please remove"),
    (0xF1, "Turnover file update error"),
    (0xF6, "Device cannot be operated with its current configuration"),
    (0xFF, "Zero balance / no processing necessary"),
];

/// `(code, description)` for IntermediateStatusInformation's status byte.
pub const INTERMEDIATE_STATUS_CODES: &[(u8, &str)] = &[
    (0x00, "Reserved"),
    (0x01, "Insert/swipe/present card"),
    (0x02, "Card detected; do not remove"),
    (0x03, "Insert card, tap/insert card"),
    (0x04, "Processing"),
    (0x05, "Use chip reader"),
    (0x06, "Use magstripe reader"),
    (0x0D, "Processing, please wait"),
    (0x11, "Select application / media"),
    (0x13, "Present card again"),
    (0x15, "Authorisation in progress"),
    (0x17, "Please wait"),
    (0x19, "Enter PIN"),
    (0x1A, "PIN entered, processing"),
    (0x1C, "Wrong PIN, please re-enter"),
    (0x35, "Card expired"),
    (0x4D, "Remove card"),
    (0x61, "Checking, please wait"),
];

/// `(code, description)` for Completion's optional terminal-status byte.
pub const TERMINAL_STATUS_CODES: &[(u8, &str)] = &[
    (0x00, "No special status"),
    (0x01, "Terminal busy with another transaction"),
    (0x02, "Terminal out of paper"),
    (0x03, "Terminal offline"),
];

fn lookup(table: &[(u8, &str)], code: u8) -> &'static str {
    table
        .iter()
        .find(|(c, _)| *c == code)
        .map(|(_, d)| *d)
        .unwrap_or("unknown code")
}

pub fn error_description(code: u8) -> &'static str {
    lookup(ERRORCODES, code)
}

pub fn intermediate_status_description(code: u8) -> &'static str {
    lookup(INTERMEDIATE_STATUS_CODES, code)
}

pub fn terminal_status_description(code: u8) -> &'static str {
    lookup(TERMINAL_STATUS_CODES, code)
}
