//! # ebcdic-convert - EBCDIC to Unicode Text Conversion
//!
//! Converts mainframe text files written in one of many IBM EBCDIC code pages
//! into a Unicode encoding, guessing the source code page and the most
//! compact destination encoding when the caller does not name them.
//!
//! ## Features
//!
//! - **32 compiled-in code pages** with lossy and strict decoding
//! - **Source detection** by fewest replacement characters, earliest code page wins ties
//! - **Destination selection** between UTF-8, UTF-16 and UTF-32 by encoded size
//! - **JSON conversion reports** next to every converted file
//! - **Plausibility gate** to reject data that does not look like EBCDIC at all
//!
//! ## Quick Start
//!
//! ```rust
//! use ebcdic_convert::{CodePage, Translator};
//!
//! // "HELLO" in EBCDIC
//! let translator = Translator::new(CodePage::Cp037);
//! let decoded = translator.decode_lossy(&[0xC8, 0xC5, 0xD3, 0xD3, 0xD6]);
//! assert_eq!(decoded.text, "HELLO");
//! assert_eq!(decoded.replacements, 0);
//! ```
//!
//! Whole files go through [`convert_file`], which also writes the converted
//! text and an optional report:
//!
//! ```rust,no_run
//! use std::path::Path;
//!
//! let result = ebcdic_convert::convert_file(
//!     "payroll.ebc",
//!     "auto",
//!     "",
//!     Some(Path::new("payroll_report.json")),
//! )?;
//! println!("{} -> {}", result.source_encoding, result.output_path.display());
//! # Ok::<(), ebcdic_convert::Error>(())
//! ```

#![deny(missing_docs)]

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

pub mod batch;
pub mod convert;
pub mod detection;
pub mod multibyte;
pub mod report;
mod tables;
pub mod translator;

pub use batch::{BatchOptions, FileOutcome, Rejection, run_batch};
pub use convert::{
    Conversion, ConversionRequest, ConversionResult, SourceSelection, convert, convert_bytes,
    convert_file, output_path_for,
};
pub use detection::{DetectionResult, EncodingDetector, detect_encoding, detect_plausibility};
pub use multibyte::{UnicodeEncoding, choose_destination};
pub use report::ConversionReport;
pub use translator::{Decoded, REPLACEMENT_CHARACTER, Translator, decode};

/// Result type for conversion operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while converting
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A file could not be read or written
    #[error("I/O error on '{}': {source}", path.display())]
    Io {
        /// The file being accessed
        path: PathBuf,
        /// Underlying I/O failure
        #[source]
        source: std::io::Error,
    },

    /// An encoding name that is not registered
    #[error("Unsupported encoding: {name}")]
    UnsupportedEncoding {
        /// The name as supplied by the caller
        name: String,
    },

    /// Byte value has no character in the source code page
    #[error("Unmappable source byte 0x{byte:02X} at position {position}")]
    UnmappableSource {
        /// The unmappable byte value
        byte: u8,
        /// Position of the byte in input
        position: usize,
    },

    /// Character cannot be encoded in the target code page
    #[error("Cannot encode character '{character}' at position {position}")]
    UnmappableTarget {
        /// The unmappable character
        character: char,
        /// Character position in input
        position: usize,
    },

    /// The conversion report could not be serialized or parsed
    #[error("Invalid conversion report '{}': {source}", path.display())]
    Report {
        /// Report location
        path: PathBuf,
        /// Underlying JSON failure
        #[source]
        source: serde_json::Error,
    },
}

impl Error {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn unsupported(name: &str) -> Self {
        Error::UnsupportedEncoding {
            name: name.to_string(),
        }
    }
}

/// Candidate source code pages
///
/// The declaration order is the detection order: when two code pages decode
/// an input equally well, the one listed first wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CodePage {
    /// IBM 037 (US/Canada)
    Cp037,
    /// IBM 273 (Germany/Austria)
    Cp273,
    /// IBM 277 (Denmark/Norway)
    Cp277,
    /// IBM 278 (Finland/Sweden)
    Cp278,
    /// IBM 280 (Italy)
    Cp280,
    /// IBM 281 (Japan, Latin)
    Cp281,
    /// IBM 284 (Spain/Latin America)
    Cp284,
    /// IBM 285 (United Kingdom)
    Cp285,
    /// IBM 297 (France)
    Cp297,
    /// IBM 420 (Arabic)
    Cp420,
    /// IBM 424 (Hebrew)
    Cp424,
    /// IBM 437 (DOS US, ASCII based)
    Cp437,
    /// IBM 500 (International)
    Cp500,
    /// IBM 875 (Greek)
    Cp875,
    /// IBM 880 (Cyrillic multilingual)
    Cp880,
    /// IBM 891 (Korean single-byte, ASCII based)
    Cp891,
    /// IBM 903 (Simplified Chinese single-byte, ASCII based)
    Cp903,
    /// IBM 904 (Traditional Chinese single-byte, ASCII based)
    Cp904,
    /// IBM 905 (Turkish, Latin-3)
    Cp905,
    /// IBM 918 (Urdu)
    Cp918,
    /// IBM 1026 (Turkish, Latin-5)
    Cp1026,
    /// IBM 1047 (Latin-1 / Open Systems)
    Cp1047,
    /// IBM 1140 (US/Canada with euro)
    Cp1140,
    /// IBM 1141 (Germany/Austria with euro)
    Cp1141,
    /// IBM 1142 (Denmark/Norway with euro)
    Cp1142,
    /// IBM 1143 (Finland/Sweden with euro)
    Cp1143,
    /// IBM 1144 (Italy with euro)
    Cp1144,
    /// IBM 1145 (Spain/Latin America with euro)
    Cp1145,
    /// IBM 1146 (United Kingdom with euro)
    Cp1146,
    /// IBM 1147 (France with euro)
    Cp1147,
    /// IBM 1148 (International with euro)
    Cp1148,
    /// IBM 1149 (Icelandic with euro)
    Cp1149,
}

impl CodePage {
    /// Every supported code page, in detection order
    pub const ALL: [CodePage; 32] = [
        CodePage::Cp037,
        CodePage::Cp273,
        CodePage::Cp277,
        CodePage::Cp278,
        CodePage::Cp280,
        CodePage::Cp281,
        CodePage::Cp284,
        CodePage::Cp285,
        CodePage::Cp297,
        CodePage::Cp420,
        CodePage::Cp424,
        CodePage::Cp437,
        CodePage::Cp500,
        CodePage::Cp875,
        CodePage::Cp880,
        CodePage::Cp891,
        CodePage::Cp903,
        CodePage::Cp904,
        CodePage::Cp905,
        CodePage::Cp918,
        CodePage::Cp1026,
        CodePage::Cp1047,
        CodePage::Cp1140,
        CodePage::Cp1141,
        CodePage::Cp1142,
        CodePage::Cp1143,
        CodePage::Cp1144,
        CodePage::Cp1145,
        CodePage::Cp1146,
        CodePage::Cp1147,
        CodePage::Cp1148,
        CodePage::Cp1149,
    ];

    /// Code page used when detection has nothing to score
    pub const FALLBACK: CodePage = CodePage::Cp037;

    /// IBM code page number
    pub fn id(self) -> u16 {
        match self {
            CodePage::Cp037 => 37,
            CodePage::Cp273 => 273,
            CodePage::Cp277 => 277,
            CodePage::Cp278 => 278,
            CodePage::Cp280 => 280,
            CodePage::Cp281 => 281,
            CodePage::Cp284 => 284,
            CodePage::Cp285 => 285,
            CodePage::Cp297 => 297,
            CodePage::Cp420 => 420,
            CodePage::Cp424 => 424,
            CodePage::Cp437 => 437,
            CodePage::Cp500 => 500,
            CodePage::Cp875 => 875,
            CodePage::Cp880 => 880,
            CodePage::Cp891 => 891,
            CodePage::Cp903 => 903,
            CodePage::Cp904 => 904,
            CodePage::Cp905 => 905,
            CodePage::Cp918 => 918,
            CodePage::Cp1026 => 1026,
            CodePage::Cp1047 => 1047,
            CodePage::Cp1140 => 1140,
            CodePage::Cp1141 => 1141,
            CodePage::Cp1142 => 1142,
            CodePage::Cp1143 => 1143,
            CodePage::Cp1144 => 1144,
            CodePage::Cp1145 => 1145,
            CodePage::Cp1146 => 1146,
            CodePage::Cp1147 => 1147,
            CodePage::Cp1148 => 1148,
            CodePage::Cp1149 => 1149,
        }
    }

    /// Canonical lowercase name, e.g. `cp037`
    pub fn name(self) -> &'static str {
        match self {
            CodePage::Cp037 => "cp037",
            CodePage::Cp273 => "cp273",
            CodePage::Cp277 => "cp277",
            CodePage::Cp278 => "cp278",
            CodePage::Cp280 => "cp280",
            CodePage::Cp281 => "cp281",
            CodePage::Cp284 => "cp284",
            CodePage::Cp285 => "cp285",
            CodePage::Cp297 => "cp297",
            CodePage::Cp420 => "cp420",
            CodePage::Cp424 => "cp424",
            CodePage::Cp437 => "cp437",
            CodePage::Cp500 => "cp500",
            CodePage::Cp875 => "cp875",
            CodePage::Cp880 => "cp880",
            CodePage::Cp891 => "cp891",
            CodePage::Cp903 => "cp903",
            CodePage::Cp904 => "cp904",
            CodePage::Cp905 => "cp905",
            CodePage::Cp918 => "cp918",
            CodePage::Cp1026 => "cp1026",
            CodePage::Cp1047 => "cp1047",
            CodePage::Cp1140 => "cp1140",
            CodePage::Cp1141 => "cp1141",
            CodePage::Cp1142 => "cp1142",
            CodePage::Cp1143 => "cp1143",
            CodePage::Cp1144 => "cp1144",
            CodePage::Cp1145 => "cp1145",
            CodePage::Cp1146 => "cp1146",
            CodePage::Cp1147 => "cp1147",
            CodePage::Cp1148 => "cp1148",
            CodePage::Cp1149 => "cp1149",
        }
    }

    /// Region or script the code page was designed for
    pub fn description(self) -> &'static str {
        match self {
            CodePage::Cp037 => "US/Canada",
            CodePage::Cp273 => "Germany/Austria",
            CodePage::Cp277 => "Denmark/Norway",
            CodePage::Cp278 => "Finland/Sweden",
            CodePage::Cp280 => "Italy",
            CodePage::Cp281 => "Japan (Latin)",
            CodePage::Cp284 => "Spain/Latin America",
            CodePage::Cp285 => "United Kingdom",
            CodePage::Cp297 => "France",
            CodePage::Cp420 => "Arabic",
            CodePage::Cp424 => "Hebrew",
            CodePage::Cp437 => "DOS US (ASCII based)",
            CodePage::Cp500 => "International",
            CodePage::Cp875 => "Greek",
            CodePage::Cp880 => "Cyrillic multilingual",
            CodePage::Cp891 => "Korean single-byte (ASCII based)",
            CodePage::Cp903 => "Simplified Chinese single-byte (ASCII based)",
            CodePage::Cp904 => "Traditional Chinese single-byte (ASCII based)",
            CodePage::Cp905 => "Turkish (Latin-3)",
            CodePage::Cp918 => "Urdu",
            CodePage::Cp1026 => "Turkish (Latin-5)",
            CodePage::Cp1047 => "Latin-1 / Open Systems",
            CodePage::Cp1140 => "US/Canada with euro",
            CodePage::Cp1141 => "Germany/Austria with euro",
            CodePage::Cp1142 => "Denmark/Norway with euro",
            CodePage::Cp1143 => "Finland/Sweden with euro",
            CodePage::Cp1144 => "Italy with euro",
            CodePage::Cp1145 => "Spain/Latin America with euro",
            CodePage::Cp1146 => "United Kingdom with euro",
            CodePage::Cp1147 => "France with euro",
            CodePage::Cp1148 => "International with euro",
            CodePage::Cp1149 => "Icelandic with euro",
        }
    }

    /// Look up a code page by its IBM number
    pub fn from_id(id: u16) -> Option<CodePage> {
        CodePage::ALL.iter().copied().find(|cp| cp.id() == id)
    }
}

impl fmt::Display for CodePage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for CodePage {
    type Err = Error;

    /// Accepts `cp037`, `IBM037`, `ibm-037`, `ccsid37` and bare numbers such as `1047`
    fn from_str(s: &str) -> Result<Self> {
        let lowered = s.trim().to_ascii_lowercase();
        let digits = ["cp", "ibm-", "ibm", "ccsid"]
            .iter()
            .find_map(|prefix| lowered.strip_prefix(prefix))
            .unwrap_or(&lowered);

        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(Error::unsupported(s));
        }

        digits
            .parse::<u16>()
            .ok()
            .and_then(CodePage::from_id)
            .ok_or_else(|| Error::unsupported(s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_page_names_round_trip() {
        for cp in CodePage::ALL {
            assert_eq!(cp.name().parse::<CodePage>().unwrap(), cp);
            assert_eq!(cp.to_string(), cp.name());
        }
    }

    #[test]
    fn test_code_page_aliases() {
        assert_eq!("CP500".parse::<CodePage>().unwrap(), CodePage::Cp500);
        assert_eq!("IBM037".parse::<CodePage>().unwrap(), CodePage::Cp037);
        assert_eq!("ibm-1047".parse::<CodePage>().unwrap(), CodePage::Cp1047);
        assert_eq!("ccsid1140".parse::<CodePage>().unwrap(), CodePage::Cp1140);
        assert_eq!("37".parse::<CodePage>().unwrap(), CodePage::Cp037);
        assert_eq!(" cp273 ".parse::<CodePage>().unwrap(), CodePage::Cp273);
    }

    #[test]
    fn test_unknown_code_pages_are_rejected() {
        for name in ["cp1252", "utf-8", "auto", "", "cp", "cp-500", "ibm99999999"] {
            match name.parse::<CodePage>() {
                Err(Error::UnsupportedEncoding { name: reported }) => assert_eq!(reported, name),
                other => panic!("expected UnsupportedEncoding for {name:?}, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_candidate_order() {
        assert_eq!(CodePage::ALL.len(), 32);
        assert_eq!(CodePage::ALL[0], CodePage::Cp037);
        assert_eq!(CodePage::ALL[12], CodePage::Cp500);
        assert_eq!(CodePage::ALL[31], CodePage::Cp1149);
        assert_eq!(CodePage::FALLBACK, CodePage::Cp037);
    }

    #[test]
    fn test_error_messages() {
        let err = Error::unsupported("cp9999");
        assert_eq!(err.to_string(), "Unsupported encoding: cp9999");

        let err = Error::UnmappableSource {
            byte: 0x8F,
            position: 3,
        };
        assert_eq!(err.to_string(), "Unmappable source byte 0x8F at position 3");
    }
}
