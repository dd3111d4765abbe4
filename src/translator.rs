//! Code page decoding and encoding
//!
//! [`Translator`] turns EBCDIC bytes into text through the code page tables.
//! Lossy decoding never fails: every byte the code page leaves undefined
//! becomes exactly one [`REPLACEMENT_CHARACTER`].

use std::collections::HashMap;

use crate::tables::{self, UNMAPPED};
use crate::{CodePage, Error, Result};

/// Marker substituted for undecodable bytes
pub const REPLACEMENT_CHARACTER: char = '\u{FFFD}';

/// Text produced by a lossy decode
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decoded {
    /// Decoded text
    pub text: String,
    /// Number of replacement characters in `text`
    pub replacements: usize,
}

/// Single code page translator backed by a 256-entry table
#[derive(Debug, Clone, Copy)]
pub struct Translator {
    codepage: CodePage,
    chars: &'static [u16; 256],
}

impl Translator {
    /// Create a translator for a code page
    pub fn new(codepage: CodePage) -> Self {
        Self {
            codepage,
            chars: tables::get_encoding_chars(codepage),
        }
    }

    /// Create a translator from a code page name such as `cp500`
    pub fn for_name(name: &str) -> Result<Self> {
        name.parse().map(Self::new)
    }

    /// Code page this translator reads
    pub fn codepage(&self) -> CodePage {
        self.codepage
    }

    /// Character for a single byte, `None` when the code page leaves it undefined
    #[inline]
    pub fn char_for(&self, byte: u8) -> Option<char> {
        match self.chars[byte as usize] {
            UNMAPPED => None,
            code => char::from_u32(u32::from(code)),
        }
    }

    /// Decode, substituting one replacement character per undefined byte
    pub fn decode_lossy(&self, input: &[u8]) -> Decoded {
        let mut text = String::with_capacity(input.len());

        for &byte in input {
            text.push(self.char_for(byte).unwrap_or(REPLACEMENT_CHARACTER));
        }

        let replacements = count_replacements(&text);
        Decoded { text, replacements }
    }

    /// Number of replacement characters a lossy decode would produce
    ///
    /// Equivalent to `decode_lossy(input).replacements` without building the text.
    pub fn count_replacements(&self, input: &[u8]) -> usize {
        input
            .iter()
            .filter(|&&byte| {
                self.char_for(byte)
                    .is_none_or(|ch| ch == REPLACEMENT_CHARACTER)
            })
            .count()
    }

    /// Decode, failing on the first undefined byte
    pub fn decode(&self, input: &[u8]) -> Result<String> {
        input
            .iter()
            .enumerate()
            .map(|(position, &byte)| {
                self.char_for(byte)
                    .ok_or(Error::UnmappableSource { byte, position })
            })
            .collect()
    }

    /// Encode text into this code page, failing on the first character it cannot represent
    pub fn encode(&self, text: &str) -> Result<Vec<u8>> {
        let mut char_to_byte = HashMap::with_capacity(256);
        for byte in (0..=255u8).rev() {
            if let Some(ch) = self.char_for(byte) {
                // lowest byte wins when a character appears twice
                char_to_byte.insert(ch, byte);
            }
        }

        text.chars()
            .enumerate()
            .map(|(position, character)| {
                char_to_byte
                    .get(&character)
                    .copied()
                    .ok_or(Error::UnmappableTarget {
                        character,
                        position,
                    })
            })
            .collect()
    }
}

/// Decode `raw` under the named code page with replacement characters
///
/// Fails only when `encoding` is not a registered code page.
pub fn decode(raw: &[u8], encoding: &str) -> Result<Decoded> {
    Ok(Translator::for_name(encoding)?.decode_lossy(raw))
}

pub(crate) fn count_replacements(text: &str) -> usize {
    text.chars().filter(|&ch| ch == REPLACEMENT_CHARACTER).count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ebcdic_037_complete_alphabet() {
        let translator = Translator::new(CodePage::Cp037);

        let ebcdic_alphabet = &[
            // A-I
            0xC1, 0xC2, 0xC3, 0xC4, 0xC5, 0xC6, 0xC7, 0xC8, 0xC9, // J-R
            0xD1, 0xD2, 0xD3, 0xD4, 0xD5, 0xD6, 0xD7, 0xD8, 0xD9, // S-Z
            0xE2, 0xE3, 0xE4, 0xE5, 0xE6, 0xE7, 0xE8, 0xE9,
        ];

        let result = translator.decode(ebcdic_alphabet).unwrap();
        assert_eq!(result, "ABCDEFGHIJKLMNOPQRSTUVWXYZ");
    }

    #[test]
    fn test_digits_and_space_agree_across_latin_pages() {
        let input = &[0xC1, 0xC2, 0xC3, 0x40, 0xF1, 0xF2, 0xF3]; // "ABC 123"
        for cp in [CodePage::Cp037, CodePage::Cp500, CodePage::Cp1047, CodePage::Cp1148] {
            assert_eq!(Translator::new(cp).decode(input).unwrap(), "ABC 123", "{cp}");
        }
    }

    #[test]
    fn test_regional_differences() {
        // 0x4A is the cent sign in US EBCDIC and '[' in the international page
        assert_eq!(Translator::new(CodePage::Cp037).char_for(0x4A), Some('¢'));
        assert_eq!(Translator::new(CodePage::Cp500).char_for(0x4A), Some('['));
        // 0x9F is the euro sign in the euro variants
        assert_eq!(Translator::new(CodePage::Cp1140).char_for(0x9F), Some('€'));
        assert_eq!(Translator::new(CodePage::Cp037).char_for(0x9F), Some('¤'));
    }

    #[test]
    fn test_lossy_decode_substitutes_one_marker_per_byte() {
        // cp891 leaves the upper half undefined
        let translator = Translator::new(CodePage::Cp891);
        let decoded = translator.decode_lossy(&[0x41, 0x80, 0xFF, 0x42]);

        assert_eq!(decoded.text, "A\u{FFFD}\u{FFFD}B");
        assert_eq!(decoded.replacements, 2);
        assert_eq!(translator.count_replacements(&[0x41, 0x80, 0xFF, 0x42]), 2);
    }

    #[test]
    fn test_total_code_pages_never_produce_markers() {
        let every_byte: Vec<u8> = (0..=255).collect();
        for cp in [CodePage::Cp037, CodePage::Cp500, CodePage::Cp1047, CodePage::Cp1140] {
            let decoded = Translator::new(cp).decode_lossy(&every_byte);
            assert_eq!(decoded.replacements, 0, "{cp}");
            assert_eq!(decoded.text.chars().count(), 256);
        }
    }

    #[test]
    fn test_strict_decode_reports_position() {
        let err = Translator::new(CodePage::Cp903)
            .decode(&[0x41, 0x42, 0x90])
            .unwrap_err();

        match err {
            Error::UnmappableSource { byte, position } => {
                assert_eq!(byte, 0x90);
                assert_eq!(position, 2);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_encode_then_decode() {
        let translator = Translator::new(CodePage::Cp500);
        let text = "ABCDEFGHIJKLMNOPQRSTUVWXYZÅÄÖabcdefghijklmnopqrstuvwxyzåäö0123456789 .,;:!?-_";

        let bytes = translator.encode(text).unwrap();
        assert_eq!(bytes.len(), text.chars().count());
        assert_eq!(translator.decode(&bytes).unwrap(), text);
    }

    #[test]
    fn test_encode_rejects_foreign_characters() {
        let err = Translator::new(CodePage::Cp037).encode("ok €").unwrap_err();
        match err {
            Error::UnmappableTarget {
                character,
                position,
            } => {
                assert_eq!(character, '€');
                assert_eq!(position, 3);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_decode_by_name() {
        let decoded = decode(&[0xC8, 0xC9], "CP037").unwrap();
        assert_eq!(decoded.text, "HI");

        assert!(matches!(
            decode(&[0xC8], "ebcdic-xyz"),
            Err(Error::UnsupportedEncoding { .. })
        ));
    }
}
