//! WinAnsi (cp1252) text encoding for simple PDF fonts.

/// Printable code range written into simple font dictionaries.
pub(crate) const FIRST_CODE: u8 = 32;
pub(crate) const LAST_CODE: u8 = 255;

const CP1252_HIGH: [(u8, char); 27] = [
    (0x80, '\u{20AC}'),
    (0x82, '\u{201A}'),
    (0x83, '\u{0192}'),
    (0x84, '\u{201E}'),
    (0x85, '\u{2026}'),
    (0x86, '\u{2020}'),
    (0x87, '\u{2021}'),
    (0x88, '\u{02C6}'),
    (0x89, '\u{2030}'),
    (0x8A, '\u{0160}'),
    (0x8B, '\u{2039}'),
    (0x8C, '\u{0152}'),
    (0x8E, '\u{017D}'),
    (0x91, '\u{2018}'),
    (0x92, '\u{2019}'),
    (0x93, '\u{201C}'),
    (0x94, '\u{201D}'),
    (0x95, '\u{2022}'),
    (0x96, '\u{2013}'),
    (0x97, '\u{2014}'),
    (0x98, '\u{02DC}'),
    (0x99, '\u{2122}'),
    (0x9A, '\u{0161}'),
    (0x9B, '\u{203A}'),
    (0x9C, '\u{0153}'),
    (0x9E, '\u{017E}'),
    (0x9F, '\u{0178}'),
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WinAnsiText {
    pub bytes: Vec<u8>,
    /// Characters with no WinAnsi code, written as `?`.
    pub replaced: usize,
}

impl WinAnsiText {
    pub fn is_lossy(&self) -> bool {
        self.replaced > 0
    }
}

pub fn encode_winansi(input: &str) -> WinAnsiText {
    let mut bytes = Vec::with_capacity(input.len());
    let mut replaced = 0usize;
    for ch in input.chars() {
        match ch {
            '\u{2265}' => {
                bytes.extend_from_slice(b">=");
                continue;
            }
            '\u{2264}' => {
                bytes.extend_from_slice(b"<=");
                continue;
            }
            // Control characters have no glyph in a single-line overlay.
            '\t' | '\n' | '\r' => {
                bytes.push(b' ');
                continue;
            }
            _ => {}
        }
        match code_for_char(ch) {
            Some(code) => bytes.push(code),
            None => {
                replaced += 1;
                bytes.push(b'?');
            }
        }
    }
    WinAnsiText { bytes, replaced }
}

pub(crate) fn code_for_char(ch: char) -> Option<u8> {
    match ch {
        '\u{0020}'..='\u{007E}' => Some(ch as u8),
        '\u{00A0}'..='\u{00FF}' => Some(ch as u8),
        _ => CP1252_HIGH
            .iter()
            .find(|(_, mapped)| *mapped == ch)
            .map(|(code, _)| *code),
    }
}

pub(crate) fn char_for_code(code: u8) -> Option<char> {
    match code {
        0x20..=0x7E | 0xA0..=0xFF => Some(code as char),
        _ => CP1252_HIGH
            .iter()
            .find(|(mapped, _)| *mapped == code)
            .map(|(_, ch)| *ch),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ascii_and_latin1_pass_through() {
        let out = encode_winansi("Café 01/15/2025");
        assert_eq!(out.bytes, b"Caf\xe9 01/15/2025".to_vec());
        assert!(!out.is_lossy());
    }

    #[test]
    fn cp1252_extensions_map_to_high_codes() {
        let out = encode_winansi("\u{201C}Skyhawk\u{201D} \u{2013} \u{20AC}5");
        assert_eq!(out.bytes[0], 0x93);
        assert_eq!(out.bytes[8], 0x94);
        assert_eq!(out.bytes[10], 0x96);
        assert_eq!(out.bytes[12], 0x80);
    }

    #[test]
    fn unencodable_characters_are_replaced_and_counted() {
        let out = encode_winansi("N\u{4E2D}1");
        assert_eq!(out.bytes, b"N?1".to_vec());
        assert_eq!(out.replaced, 1);
        let out = encode_winansi("\u{2265}300");
        assert_eq!(out.bytes, b">=300".to_vec());
        assert!(!out.is_lossy());
    }

    #[test]
    fn code_lookup_is_symmetric() {
        for code in FIRST_CODE..=LAST_CODE {
            if let Some(ch) = char_for_code(code) {
                assert_eq!(code_for_char(ch), Some(code));
            }
        }
    }
}
