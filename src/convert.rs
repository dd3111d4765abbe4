//! File conversion entry points
//!
//! A conversion reads the whole input, resolves the source code page
//! (explicit or detected), decodes it, resolves the destination encoding
//! (explicit or selected), writes the converted text and finally the report.
//! The text file is written before the report and neither write is rolled
//! back when a later step fails.

use std::ffi::OsString;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use tracing::{debug, info, warn};

use crate::detection::EncodingDetector;
use crate::multibyte::{UnicodeEncoding, choose_destination};
use crate::report::ConversionReport;
use crate::translator::Translator;
use crate::{CodePage, Error, Result};

/// How the source code page is chosen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SourceSelection {
    /// Run the detector
    #[default]
    Auto,
    /// Use this code page without detection
    Explicit(CodePage),
}

impl fmt::Display for SourceSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceSelection::Auto => f.write_str("auto"),
            SourceSelection::Explicit(codepage) => fmt::Display::fmt(codepage, f),
        }
    }
}

impl FromStr for SourceSelection {
    type Err = Error;

    /// `auto` (any case) or an empty string select detection
    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("auto") {
            Ok(SourceSelection::Auto)
        } else {
            s.parse().map(SourceSelection::Explicit)
        }
    }
}

/// In-memory outcome of decoding and destination selection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conversion {
    /// Decoded text, possibly containing replacement characters
    pub text: String,
    /// Code page used for decoding
    pub source_encoding: CodePage,
    /// Encoding the text should be written in
    pub destination_encoding: UnicodeEncoding,
    /// Replacement characters produced while decoding
    pub replacement_count: usize,
    /// Whether the source code page came from the detector
    pub detected: bool,
}

/// One file conversion
#[derive(Debug, Clone)]
pub struct ConversionRequest {
    /// EBCDIC input file
    pub input: PathBuf,
    /// Source code page selection
    pub source: SourceSelection,
    /// Destination encoding, selected automatically when `None`
    pub destination: Option<UnicodeEncoding>,
    /// Where to write the JSON report, if anywhere
    pub report_path: Option<PathBuf>,
    /// Detector used when the source is [`SourceSelection::Auto`]
    pub detector: EncodingDetector,
}

impl ConversionRequest {
    /// Request with automatic source and destination and no report
    pub fn new(input: impl Into<PathBuf>) -> Self {
        Self {
            input: input.into(),
            source: SourceSelection::Auto,
            destination: None,
            report_path: None,
            detector: EncodingDetector::new(),
        }
    }

    /// Set the source code page from a name or `auto`
    pub fn with_source(mut self, source: &str) -> Result<Self> {
        self.source = source.parse()?;
        Ok(self)
    }

    /// Set the destination encoding from a name; empty or `auto` selects automatically
    pub fn with_destination(mut self, destination: &str) -> Result<Self> {
        let trimmed = destination.trim();
        self.destination = if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("auto") {
            None
        } else {
            Some(destination.parse()?)
        };
        Ok(self)
    }

    /// Write a report to `path` after converting
    pub fn with_report(mut self, path: impl Into<PathBuf>) -> Self {
        self.report_path = Some(path.into());
        self
    }

    /// Use a custom detector for automatic source selection
    pub fn with_detector(mut self, detector: EncodingDetector) -> Self {
        self.detector = detector;
        self
    }
}

/// Outcome of a file conversion
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionResult {
    /// Where the converted text was written
    pub output_path: PathBuf,
    /// Where the report was written, if requested
    pub report_path: Option<PathBuf>,
    /// Decoded text
    pub text: String,
    /// Code page used for decoding
    pub source_encoding: CodePage,
    /// Encoding of the output file
    pub destination_encoding: UnicodeEncoding,
    /// Replacement characters produced while decoding
    pub replacement_count: usize,
    /// Size of the input in bytes
    pub input_bytes: usize,
    /// Size of the output file in bytes
    pub output_bytes: usize,
}

/// Decode `raw` and pick its destination encoding without touching the filesystem
pub fn convert_bytes(
    raw: &[u8],
    source: SourceSelection,
    destination: Option<UnicodeEncoding>,
) -> Conversion {
    convert_bytes_with(raw, source, destination, &EncodingDetector::new())
}

fn convert_bytes_with(
    raw: &[u8],
    source: SourceSelection,
    destination: Option<UnicodeEncoding>,
    detector: &EncodingDetector,
) -> Conversion {
    let (source_encoding, detected) = match source {
        SourceSelection::Explicit(codepage) => (codepage, false),
        SourceSelection::Auto => {
            let detection = detector.detect(raw);
            debug!(
                codepage = %detection.codepage,
                replacements = detection.replacements,
                fallback = detection.fallback,
                "detected source code page"
            );
            (detection.codepage, true)
        }
    };

    let decoded = Translator::new(source_encoding).decode_lossy(raw);
    let destination_encoding = destination.unwrap_or_else(|| choose_destination(&decoded.text));

    Conversion {
        text: decoded.text,
        source_encoding,
        destination_encoding,
        replacement_count: decoded.replacements,
        detected,
    }
}

/// Convert one file as described by `request`
pub fn convert(request: &ConversionRequest) -> Result<ConversionResult> {
    let input = request.input.as_path();
    info!(input = %input.display(), source = %request.source, "Starting conversion");

    let raw = fs::read(input).map_err(|e| Error::io(input, e))?;
    let conversion =
        convert_bytes_with(&raw, request.source, request.destination, &request.detector);

    let output_path = output_path_for(input, conversion.destination_encoding);
    let encoded = conversion.destination_encoding.encode(&conversion.text);
    fs::write(&output_path, &encoded).map_err(|e| Error::io(&output_path, e))?;

    let result = ConversionResult {
        output_path,
        report_path: request.report_path.clone(),
        text: conversion.text,
        source_encoding: conversion.source_encoding,
        destination_encoding: conversion.destination_encoding,
        replacement_count: conversion.replacement_count,
        input_bytes: raw.len(),
        output_bytes: encoded.len(),
    };

    if let Some(report_path) = &request.report_path {
        ConversionReport::from_result(input, &result).write(report_path)?;
        debug!(report = %report_path.display(), "Wrote conversion report");
    }

    if result.replacement_count > 0 {
        warn!(
            input = %input.display(),
            codepage = %result.source_encoding,
            replacements = result.replacement_count,
            "Converted text contains replacement characters"
        );
    }

    info!(
        output = %result.output_path.display(),
        source = %result.source_encoding,
        destination = %result.destination_encoding,
        input_bytes = result.input_bytes,
        output_bytes = result.output_bytes,
        "Conversion complete"
    );

    Ok(result)
}

/// Convert `input` with string overrides
///
/// `source_override` is a code page name or `auto`; an empty
/// `dest_override` selects the destination automatically. Unknown names
/// fail with [`Error::UnsupportedEncoding`] before the input is read.
pub fn convert_file(
    input: impl AsRef<Path>,
    source_override: &str,
    dest_override: &str,
    report_path: Option<&Path>,
) -> Result<ConversionResult> {
    let mut request = ConversionRequest::new(input.as_ref())
        .with_source(source_override)?
        .with_destination(dest_override)?;
    if let Some(path) = report_path {
        request = request.with_report(path);
    }
    convert(&request)
}

/// Output path for `input`: extension dropped, `_<encoding>.txt` appended
pub fn output_path_for(input: &Path, destination: UnicodeEncoding) -> PathBuf {
    let mut path: OsString = input.with_extension("").into_os_string();
    path.push(format!("_{}.txt", destination.name()));
    PathBuf::from(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_path_for() {
        assert_eq!(
            output_path_for(Path::new("uploads/report.ebc"), UnicodeEncoding::Utf8),
            PathBuf::from("uploads/report_utf-8.txt")
        );
        assert_eq!(
            output_path_for(Path::new("archive.tar.ebc"), UnicodeEncoding::Utf16),
            PathBuf::from("archive.tar_utf-16.txt")
        );
        assert_eq!(
            output_path_for(Path::new("noext"), UnicodeEncoding::Utf32),
            PathBuf::from("noext_utf-32.txt")
        );
    }

    #[test]
    fn test_source_selection_parsing() {
        assert_eq!("auto".parse::<SourceSelection>().unwrap(), SourceSelection::Auto);
        assert_eq!("AUTO".parse::<SourceSelection>().unwrap(), SourceSelection::Auto);
        assert_eq!("".parse::<SourceSelection>().unwrap(), SourceSelection::Auto);
        assert_eq!(
            "CP500".parse::<SourceSelection>().unwrap(),
            SourceSelection::Explicit(CodePage::Cp500)
        );
        assert!(matches!(
            "cp12345".parse::<SourceSelection>(),
            Err(Error::UnsupportedEncoding { .. })
        ));
    }

    #[test]
    fn test_auto_conversion_of_ascii_text() {
        let raw = [0xC1, 0xC2, 0xC3, 0x40, 0xF1, 0xF2, 0xF3];
        let conversion = convert_bytes(&raw, SourceSelection::Auto, None);

        assert_eq!(conversion.text, "ABC 123");
        assert_eq!(conversion.source_encoding, CodePage::Cp037);
        assert_eq!(conversion.destination_encoding, UnicodeEncoding::Utf8);
        assert_eq!(conversion.replacement_count, 0);
        assert!(conversion.detected);
    }

    #[test]
    fn test_explicit_source_skips_detection() {
        // cp903 leaves every one of these bytes undefined
        let raw = [0x90, 0xA0, 0xB0];
        let conversion = convert_bytes(
            &raw,
            SourceSelection::Explicit(CodePage::Cp903),
            Some(UnicodeEncoding::Utf32),
        );

        assert_eq!(conversion.source_encoding, CodePage::Cp903);
        assert_eq!(conversion.destination_encoding, UnicodeEncoding::Utf32);
        assert_eq!(conversion.replacement_count, 3);
        assert_eq!(conversion.text, "\u{FFFD}\u{FFFD}\u{FFFD}");
        assert!(!conversion.detected);
    }

    #[test]
    fn test_request_overrides() {
        let request = ConversionRequest::new("in.ebc")
            .with_source("cp1047")
            .unwrap()
            .with_destination("UTF-16")
            .unwrap();
        assert_eq!(request.source, SourceSelection::Explicit(CodePage::Cp1047));
        assert_eq!(request.destination, Some(UnicodeEncoding::Utf16));

        let request = request.with_destination("").unwrap();
        assert_eq!(request.destination, None);

        assert!(ConversionRequest::new("in.ebc").with_destination("latin-1").is_err());
    }

    #[test]
    fn test_unsupported_override_fails_before_reading() {
        let err = convert_file("/definitely/missing.ebc", "cp9999", "", None).unwrap_err();
        assert!(matches!(err, Error::UnsupportedEncoding { ref name } if name == "cp9999"));
    }

    #[test]
    fn test_missing_input_is_io_error() {
        let err = convert_file("/definitely/missing.ebc", "auto", "", None).unwrap_err();
        assert!(matches!(err, Error::Io { .. }));
    }
}
