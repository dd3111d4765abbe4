//! Unicode destination encodings and destination selection
//!
//! Decoded text is written out as UTF-8, UTF-16 or UTF-32. The selector
//! picks whichever of the three needs the fewest bytes, with replacement
//! characters weighted so heavily that they dominate any size difference.

use std::fmt;
use std::str::FromStr;

use serde::{Serialize, Serializer};
use tracing::debug;

use crate::translator::count_replacements;
use crate::{Error, Result};

/// Cost added per replacement character when ranking destinations
pub const REPLACEMENT_PENALTY: usize = 1000;

/// Supported destination encodings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnicodeEncoding {
    /// UTF-8, no byte order mark
    Utf8,
    /// UTF-16 with a byte order mark, little endian
    Utf16,
    /// UTF-16LE, no byte order mark
    Utf16Le,
    /// UTF-16BE, no byte order mark
    Utf16Be,
    /// UTF-32 with a byte order mark, little endian
    Utf32,
    /// UTF-32LE, no byte order mark
    Utf32Le,
    /// UTF-32BE, no byte order mark
    Utf32Be,
}

impl UnicodeEncoding {
    /// Encodings considered by [`choose_destination`], in tie-break order
    pub const CANDIDATES: [UnicodeEncoding; 3] = [
        UnicodeEncoding::Utf8,
        UnicodeEncoding::Utf16,
        UnicodeEncoding::Utf32,
    ];

    /// Every encoding accepted as an explicit destination
    pub const ALL: [UnicodeEncoding; 7] = [
        UnicodeEncoding::Utf8,
        UnicodeEncoding::Utf16,
        UnicodeEncoding::Utf16Le,
        UnicodeEncoding::Utf16Be,
        UnicodeEncoding::Utf32,
        UnicodeEncoding::Utf32Le,
        UnicodeEncoding::Utf32Be,
    ];

    /// Canonical lowercase name, also used in output file names
    pub fn name(self) -> &'static str {
        match self {
            UnicodeEncoding::Utf8 => "utf-8",
            UnicodeEncoding::Utf16 => "utf-16",
            UnicodeEncoding::Utf16Le => "utf-16-le",
            UnicodeEncoding::Utf16Be => "utf-16-be",
            UnicodeEncoding::Utf32 => "utf-32",
            UnicodeEncoding::Utf32Le => "utf-32-le",
            UnicodeEncoding::Utf32Be => "utf-32-be",
        }
    }

    /// Uppercase label used in conversion reports, e.g. `UTF-8`
    pub fn label(self) -> String {
        self.name().to_ascii_uppercase()
    }

    /// Size of one code unit in bytes
    pub fn unit_size(self) -> usize {
        match self {
            UnicodeEncoding::Utf8 => 1,
            UnicodeEncoding::Utf16 | UnicodeEncoding::Utf16Le | UnicodeEncoding::Utf16Be => 2,
            UnicodeEncoding::Utf32 | UnicodeEncoding::Utf32Le | UnicodeEncoding::Utf32Be => 4,
        }
    }

    /// Byte order mark written ahead of the text, if any
    pub fn bom(self) -> Option<&'static [u8]> {
        match self {
            UnicodeEncoding::Utf16 => Some(&[0xFF, 0xFE]),
            UnicodeEncoding::Utf32 => Some(&[0xFF, 0xFE, 0x00, 0x00]),
            _ => None,
        }
    }

    /// Encode text, including the byte order mark
    pub fn encode(self, text: &str) -> Vec<u8> {
        let mut output = Vec::with_capacity(self.encoded_len(text));
        if let Some(bom) = self.bom() {
            output.extend_from_slice(bom);
        }

        match self {
            UnicodeEncoding::Utf8 => output.extend_from_slice(text.as_bytes()),
            UnicodeEncoding::Utf16 | UnicodeEncoding::Utf16Le => {
                for unit in text.encode_utf16() {
                    output.extend_from_slice(&unit.to_le_bytes());
                }
            }
            UnicodeEncoding::Utf16Be => {
                for unit in text.encode_utf16() {
                    output.extend_from_slice(&unit.to_be_bytes());
                }
            }
            UnicodeEncoding::Utf32 | UnicodeEncoding::Utf32Le => {
                for ch in text.chars() {
                    output.extend_from_slice(&u32::from(ch).to_le_bytes());
                }
            }
            UnicodeEncoding::Utf32Be => {
                for ch in text.chars() {
                    output.extend_from_slice(&u32::from(ch).to_be_bytes());
                }
            }
        }

        output
    }

    /// Length of `encode(text)` without encoding
    pub fn encoded_len(self, text: &str) -> usize {
        let bom = self.bom().map_or(0, <[u8]>::len);
        let body = match self.unit_size() {
            1 => text.len(),
            2 => text.encode_utf16().count() * 2,
            _ => text.chars().count() * 4,
        };
        bom + body
    }

    /// Selection cost of writing `text` in this encoding
    ///
    /// Every Unicode form represents every character, so the only
    /// replacement characters in the output are those already in the text.
    pub fn cost(self, text: &str) -> usize {
        self.encoded_len(text) + count_replacements(text) * REPLACEMENT_PENALTY
    }
}

impl fmt::Display for UnicodeEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for UnicodeEncoding {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let normalized: String = s
            .trim()
            .chars()
            .filter(|c| !matches!(c, '-' | '_'))
            .collect::<String>()
            .to_ascii_lowercase();

        let encoding = match normalized.as_str() {
            "utf8" => UnicodeEncoding::Utf8,
            "utf16" => UnicodeEncoding::Utf16,
            "utf16le" => UnicodeEncoding::Utf16Le,
            "utf16be" => UnicodeEncoding::Utf16Be,
            "utf32" => UnicodeEncoding::Utf32,
            "utf32le" => UnicodeEncoding::Utf32Le,
            "utf32be" => UnicodeEncoding::Utf32Be,
            _ => return Err(Error::unsupported(s)),
        };

        Ok(encoding)
    }
}

impl Serialize for UnicodeEncoding {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.name())
    }
}

/// Pick the destination encoding for `text` among [`UnicodeEncoding::CANDIDATES`]
pub fn choose_destination(text: &str) -> UnicodeEncoding {
    choose_destination_among(text, &UnicodeEncoding::CANDIDATES)
}

/// Pick the cheapest encoding among `candidates`, earliest wins ties
///
/// Falls back to UTF-8 when `candidates` is empty.
pub fn choose_destination_among(text: &str, candidates: &[UnicodeEncoding]) -> UnicodeEncoding {
    let mut best: Option<(UnicodeEncoding, usize)> = None;

    for &encoding in candidates {
        let cost = encoding.cost(text);
        debug!(encoding = %encoding, cost, "scored destination");

        if best.is_none_or(|(_, best_cost)| cost < best_cost) {
            best = Some((encoding, cost));
        }
    }

    best.map_or(UnicodeEncoding::Utf8, |(encoding, _)| encoding)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ascii_text_prefers_utf8() {
        assert_eq!(choose_destination("ABC 123"), UnicodeEncoding::Utf8);
        assert_eq!(choose_destination(""), UnicodeEncoding::Utf8);
        assert_eq!(
            choose_destination(&"ABC 123".repeat(10_000)),
            UnicodeEncoding::Utf8
        );
    }

    #[test]
    fn test_cjk_text_prefers_utf16() {
        // three bytes per character in UTF-8, two in UTF-16
        let text = "漢字".repeat(100);
        assert_eq!(choose_destination(&text), UnicodeEncoding::Utf16);
    }

    #[test]
    fn test_replacement_penalty_applies_to_every_candidate() {
        let text = "AB\u{FFFD}";
        assert_eq!(UnicodeEncoding::Utf8.cost(text), 5 + REPLACEMENT_PENALTY);
        assert_eq!(UnicodeEncoding::Utf16.cost(text), 8 + REPLACEMENT_PENALTY);
        assert_eq!(UnicodeEncoding::Utf32.cost(text), 16 + REPLACEMENT_PENALTY);
        assert_eq!(choose_destination(text), UnicodeEncoding::Utf8);
    }

    #[test]
    fn test_empty_candidate_list_defaults_to_utf8() {
        assert_eq!(choose_destination_among("漢字", &[]), UnicodeEncoding::Utf8);
    }

    #[test]
    fn test_tie_keeps_earliest_candidate() {
        // 2 CJK chars: UTF-8 = 6 bytes, UTF-16LE = 4 bytes, UTF-16BE = 4 bytes
        let text = "漢字";
        let order = [UnicodeEncoding::Utf16Be, UnicodeEncoding::Utf16Le];
        assert_eq!(choose_destination_among(text, &order), UnicodeEncoding::Utf16Be);

        let order = [UnicodeEncoding::Utf16Le, UnicodeEncoding::Utf16Be];
        assert_eq!(choose_destination_among(text, &order), UnicodeEncoding::Utf16Le);
    }

    #[test]
    fn test_encoding_with_bom() {
        assert_eq!(UnicodeEncoding::Utf16.encode("Hi"), vec![0xFF, 0xFE, 0x48, 0x00, 0x69, 0x00]);
        assert_eq!(UnicodeEncoding::Utf16Be.encode("Hi"), vec![0x00, 0x48, 0x00, 0x69]);
        assert_eq!(
            UnicodeEncoding::Utf32.encode("A"),
            vec![0xFF, 0xFE, 0x00, 0x00, 0x41, 0x00, 0x00, 0x00]
        );
        assert_eq!(UnicodeEncoding::Utf32Be.encode("A"), vec![0x00, 0x00, 0x00, 0x41]);
        assert_eq!(UnicodeEncoding::Utf8.encode("é"), "é".as_bytes());
    }

    #[test]
    fn test_encoded_len_matches_encode() {
        let text = "Grüße, 漢字 and 🌍 \u{FFFD}";
        for encoding in UnicodeEncoding::ALL {
            assert_eq!(
                encoding.encoded_len(text),
                encoding.encode(text).len(),
                "{encoding}"
            );
        }
    }

    #[test]
    fn test_parse_names() {
        assert_eq!("UTF-8".parse::<UnicodeEncoding>().unwrap(), UnicodeEncoding::Utf8);
        assert_eq!("utf8".parse::<UnicodeEncoding>().unwrap(), UnicodeEncoding::Utf8);
        assert_eq!("utf-16le".parse::<UnicodeEncoding>().unwrap(), UnicodeEncoding::Utf16Le);
        assert_eq!("UTF_32_BE".parse::<UnicodeEncoding>().unwrap(), UnicodeEncoding::Utf32Be);
        for encoding in UnicodeEncoding::ALL {
            assert_eq!(encoding.name().parse::<UnicodeEncoding>().unwrap(), encoding);
        }
        assert!(matches!(
            "latin-1".parse::<UnicodeEncoding>(),
            Err(Error::UnsupportedEncoding { .. })
        ));
    }

    #[test]
    fn test_labels() {
        assert_eq!(UnicodeEncoding::Utf8.label(), "UTF-8");
        assert_eq!(UnicodeEncoding::Utf32Le.label(), "UTF-32-LE");
    }
}
