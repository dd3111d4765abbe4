//! Multi-file conversion with upload-style gates
//!
//! Each file is handled on its own: it must carry an allowed extension, stay
//! under the size limit and pass the plausibility check before it is
//! converted. A rejected or failed file never stops the rest of the batch.

use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{info, warn};

use crate::convert::{ConversionRequest, SourceSelection, convert};
use crate::detection::EncodingDetector;
use crate::multibyte::UnicodeEncoding;
use crate::{CodePage, Error, Result};

/// Default upper bound on input size (50 MiB)
pub const DEFAULT_MAX_INPUT_BYTES: u64 = 50 * 1024 * 1024;

/// Why a file was not converted
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Rejection {
    /// File name does not carry an allowed extension
    #[error("Invalid file type. Allowed extensions: {allowed}")]
    DisallowedExtension {
        /// Comma separated allowed extensions
        allowed: String,
    },
    /// File exceeds the size limit
    #[error("File too large: {size} bytes (limit: {limit} bytes)")]
    TooLarge {
        /// Actual size in bytes
        size: u64,
        /// Configured limit in bytes
        limit: u64,
    },
    /// Content does not decode plausibly under any candidate code page
    #[error("File rejected: content does not look like valid EBCDIC data")]
    NotEbcdic,
}

/// Result for one file of a batch
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FileOutcome {
    /// Converted, with text and report written
    Converted {
        /// Input file
        input: PathBuf,
        /// Converted text file
        output: PathBuf,
        /// JSON report file
        report: PathBuf,
        /// Code page used for decoding
        #[serde(serialize_with = "serialize_codepage")]
        source_encoding: CodePage,
        /// Encoding of the output file
        destination_encoding: UnicodeEncoding,
        /// Replacement characters produced while decoding
        replacement_count: usize,
    },
    /// Stopped by one of the gates
    Rejected {
        /// Input file
        input: PathBuf,
        /// Gate that stopped it
        reason: Rejection,
    },
    /// Conversion was attempted and failed
    Failed {
        /// Input file
        input: PathBuf,
        /// Error message
        error: String,
    },
}

impl FileOutcome {
    /// Input file this outcome belongs to
    pub fn input(&self) -> &Path {
        match self {
            FileOutcome::Converted { input, .. }
            | FileOutcome::Rejected { input, .. }
            | FileOutcome::Failed { input, .. } => input,
        }
    }

    /// Whether the file was converted
    pub fn is_converted(&self) -> bool {
        matches!(self, FileOutcome::Converted { .. })
    }
}

fn serialize_codepage<S: serde::Serializer>(
    codepage: &CodePage,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    serializer.serialize_str(codepage.name())
}

/// Settings shared by every file of a batch
#[derive(Debug, Clone)]
pub struct BatchOptions {
    /// Source code page selection
    pub source: SourceSelection,
    /// Destination encoding, selected per file when `None`
    pub destination: Option<UnicodeEncoding>,
    /// Allowed file extensions without the dot; empty allows every file
    pub allowed_extensions: Vec<String>,
    /// Largest accepted input in bytes
    pub max_input_bytes: u64,
    /// Detector for plausibility checks and automatic source selection
    pub detector: EncodingDetector,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            source: SourceSelection::Auto,
            destination: None,
            allowed_extensions: vec!["ebc".to_string()],
            max_input_bytes: DEFAULT_MAX_INPUT_BYTES,
            detector: EncodingDetector::new(),
        }
    }
}

impl BatchOptions {
    /// Defaults: automatic encodings, `.ebc` files only, 50 MiB limit
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the source code page from a name or `auto`
    pub fn with_source(mut self, source: &str) -> Result<Self> {
        self.source = source.parse()?;
        Ok(self)
    }

    /// Set a fixed destination encoding
    pub fn with_destination(mut self, destination: Option<UnicodeEncoding>) -> Self {
        self.destination = destination;
        self
    }

    /// Replace the allowed extensions
    pub fn with_allowed_extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed_extensions = extensions
            .into_iter()
            .map(|ext| {
                let ext: String = ext.into();
                ext.trim_start_matches('.').to_ascii_lowercase()
            })
            .collect();
        self
    }

    /// Set the size limit
    pub fn with_max_input_bytes(mut self, limit: u64) -> Self {
        self.max_input_bytes = limit;
        self
    }

    /// Use a custom detector
    pub fn with_detector(mut self, detector: EncodingDetector) -> Self {
        self.detector = detector;
        self
    }

    fn extension_allowed(&self, path: &Path) -> bool {
        if self.allowed_extensions.is_empty() {
            return true;
        }
        path.extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| {
                self.allowed_extensions
                    .iter()
                    .any(|allowed| allowed.eq_ignore_ascii_case(ext))
            })
    }
}

/// Report path for an input: extension dropped, `_report.json` appended
pub fn report_path_for(input: &Path) -> PathBuf {
    let mut path = input.with_extension("").into_os_string();
    path.push("_report.json");
    PathBuf::from(path)
}

/// Convert every input in order, collecting one outcome per file
pub fn run_batch<P: AsRef<Path>>(inputs: &[P], options: &BatchOptions) -> Vec<FileOutcome> {
    let outcomes: Vec<FileOutcome> = inputs
        .iter()
        .map(|input| process_file(input.as_ref(), options))
        .collect();

    let converted = outcomes.iter().filter(|o| o.is_converted()).count();
    info!(
        total = outcomes.len(),
        converted,
        skipped = outcomes.len() - converted,
        "Batch complete"
    );

    outcomes
}

fn process_file(input: &Path, options: &BatchOptions) -> FileOutcome {
    match check_gates(input, options) {
        Ok(None) => {}
        Ok(Some(reason)) => {
            warn!(input = %input.display(), %reason, "Rejected input");
            return FileOutcome::Rejected {
                input: input.to_path_buf(),
                reason,
            };
        }
        Err(e) => return failed(input, e),
    }

    let report = report_path_for(input);
    let request = ConversionRequest {
        input: input.to_path_buf(),
        source: options.source,
        destination: options.destination,
        report_path: Some(report.clone()),
        detector: options.detector.clone(),
    };

    match convert(&request) {
        Ok(result) => FileOutcome::Converted {
            input: input.to_path_buf(),
            output: result.output_path,
            report,
            source_encoding: result.source_encoding,
            destination_encoding: result.destination_encoding,
            replacement_count: result.replacement_count,
        },
        Err(e) => failed(input, e),
    }
}

fn failed(input: &Path, error: Error) -> FileOutcome {
    warn!(input = %input.display(), %error, "Conversion failed");
    FileOutcome::Failed {
        input: input.to_path_buf(),
        error: error.to_string(),
    }
}

/// First gate the file fails, if any
fn check_gates(input: &Path, options: &BatchOptions) -> Result<Option<Rejection>> {
    if !options.extension_allowed(input) {
        return Ok(Some(Rejection::DisallowedExtension {
            allowed: options.allowed_extensions.join(", "),
        }));
    }

    let size = fs::metadata(input).map_err(|e| Error::io(input, e))?.len();
    if size > options.max_input_bytes {
        return Ok(Some(Rejection::TooLarge {
            size,
            limit: options.max_input_bytes,
        }));
    }

    let mut sample = Vec::with_capacity(options.detector.sample_size());
    fs::File::open(input)
        .and_then(|file| {
            file.take(options.detector.sample_size() as u64)
                .read_to_end(&mut sample)
        })
        .map_err(|e| Error::io(input, e))?;

    if !options.detector.is_plausible(&sample) {
        return Ok(Some(Rejection::NotEbcdic));
    }

    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_path_for() {
        assert_eq!(
            report_path_for(Path::new("uploads/payroll.ebc")),
            PathBuf::from("uploads/payroll_report.json")
        );
    }

    #[test]
    fn test_extension_gate() {
        let options = BatchOptions::new();
        assert!(options.extension_allowed(Path::new("a/b.ebc")));
        assert!(options.extension_allowed(Path::new("a/b.EBC")));
        assert!(!options.extension_allowed(Path::new("a/b.txt")));
        assert!(!options.extension_allowed(Path::new("a/ebc")));

        let options = options.with_allowed_extensions([".TXT", "dat"]);
        assert_eq!(options.allowed_extensions, vec!["txt", "dat"]);
        assert!(options.extension_allowed(Path::new("b.txt")));

        let options = options.with_allowed_extensions(Vec::<String>::new());
        assert!(options.extension_allowed(Path::new("anything")));
    }

    #[test]
    fn test_rejection_messages() {
        assert_eq!(
            Rejection::TooLarge { size: 10, limit: 5 }.to_string(),
            "File too large: 10 bytes (limit: 5 bytes)"
        );
        assert_eq!(
            Rejection::NotEbcdic.to_string(),
            "File rejected: content does not look like valid EBCDIC data"
        );
    }

    #[test]
    fn test_outcome_serialization() {
        let outcome = FileOutcome::Rejected {
            input: PathBuf::from("x.txt"),
            reason: Rejection::DisallowedExtension {
                allowed: "ebc".to_string(),
            },
        };
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "status": "rejected",
                "input": "x.txt",
                "reason": { "kind": "disallowed_extension", "allowed": "ebc" }
            })
        );
    }
}
