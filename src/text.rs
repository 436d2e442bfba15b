//! CP437 receipt text and 7-bit display-line handling.
//!
//! `encoding_rs` only implements the WHATWG encodings (Latin-1 variants,
//! Shift_JIS, IBM866, ...) and has no code page 437 table, so decoding is a
//! small static lookup instead of a crate call. The table is total over all
//! 256 byte values, so unlike the source's `try/except` around a failing
//! Python codec, this decode can never fail.

/// Code page 437, bytes 0x80-0xFF. 0x00-0x7F are identical to ASCII.
const CP437_HIGH: [char; 128] = [
    'Ç', 'ü', 'é', 'â', 'ä', 'à', 'å', 'ç', 'ê', 'ë', 'è', 'ï', 'î', 'ì', 'Ä', 'Å', 'É', 'æ', 'Æ',
    'ô', 'ö', 'ò', 'û', 'ù', 'ÿ', 'Ö', 'Ü', '¢', '£', '¥', '₧', 'ƒ', 'á', 'í', 'ó', 'ú', 'ñ', 'Ñ',
    'ª', 'º', '¿', '⌐', '¬', '½', '¼', '¡', '«', '»', '░', '▒', '▓', '│', '┤', '╡', '╢', '╖', '╕',
    '╣', '║', '╗', '╝', '╜', '╛', '┐', '└', '┴', '┬', '├', '─', '┼', '╞', '╟', '╚', '╔', '╩', '╦',
    '╠', '═', '╬', '╧', '╨', '╤', '╥', '╙', '╘', '╒', '╓', '╫', '╪', '┘', '┌', '█', '▄', '▌', '▐',
    '▀', 'α', 'ß', 'Γ', 'π', 'Σ', 'σ', 'µ', 'τ', 'Φ', 'Θ', 'Ω', 'δ', '∞', 'φ', 'ε', '∩', '≡', '±',
    '≥', '≤', '⌠', '⌡', '÷', '≈', '°', '∙', '·', '√', 'ⁿ', '²', '■', '\u{00A0}',
];

/// Decodes a CP437 byte string into a `String`, one code point per byte.
pub fn decode_cp437(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|&b| {
            if b < 0x80 {
                b as char
            } else {
                CP437_HIGH[(b - 0x80) as usize]
            }
        })
        .collect()
}

/// Encodes `text` to CP437 bytes. Characters outside the table are dropped
/// rather than failing the whole print job over a single glyph.
pub fn encode_cp437(text: &str) -> Vec<u8> {
    text.chars()
        .filter_map(|c| {
            if c.is_ascii() {
                Some(c as u8)
            } else {
                CP437_HIGH
                    .iter()
                    .position(|&h| h == c)
                    .map(|i| (i + 0x80) as u8)
            }
        })
        .collect()
}

/// Truncates `text` to `max_chars` and strips anything outside 7-bit ASCII,
/// the rule display lines are held to.
pub fn ascii_display_line(text: &str, max_chars: usize) -> String {
    text.chars()
        .filter(|c| c.is_ascii())
        .take(max_chars)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ascii_range_is_unchanged() {
        assert_eq!(decode_cp437(b"SUCCESS"), "SUCCESS");
    }

    #[test]
    fn high_byte_maps_to_box_drawing() {
        assert_eq!(decode_cp437(&[0xC4]), "─");
    }

    #[test]
    fn display_line_truncates_and_drops_non_ascii() {
        assert_eq!(ascii_display_line("Hello, world! Extra", 5), "Hello");
        assert_eq!(decode_cp437(&[0x81]).chars().count(), 1);
    }

    #[test]
    fn encode_decode_round_trips_ascii() {
        let bytes = encode_cp437("SUCCESS");
        assert_eq!(decode_cp437(&bytes), "SUCCESS");
    }

    #[test]
    fn encode_decode_round_trips_box_drawing() {
        let original = decode_cp437(&[0xC4, 0xB3]);
        assert_eq!(encode_cp437(&original), vec![0xC4, 0xB3]);
    }
}
