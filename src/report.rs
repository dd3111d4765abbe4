//! Conversion report written next to each converted file

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::convert::ConversionResult;
use crate::{Error, Result};

/// Machine-readable summary of one conversion
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversionReport {
    /// Path of the EBCDIC input
    pub input_file: String,
    /// Path of the converted text
    pub output_file: String,
    /// Lowercase source code page, e.g. `cp500`
    pub source_encoding: String,
    /// Uppercase destination encoding, e.g. `UTF-8`
    pub destination_encoding: String,
    /// Size of the input in bytes
    pub input_bytes: usize,
    /// Size of the converted text in bytes
    pub output_bytes: usize,
    /// Replacement characters produced while decoding
    pub replacement_characters: usize,
}

impl ConversionReport {
    /// Build the report for a finished conversion
    pub fn from_result(input: &Path, result: &ConversionResult) -> Self {
        Self {
            input_file: input.display().to_string(),
            output_file: result.output_path.display().to_string(),
            source_encoding: result.source_encoding.name().to_string(),
            destination_encoding: result.destination_encoding.label(),
            input_bytes: result.input_bytes,
            output_bytes: result.output_bytes,
            replacement_characters: result.replacement_count,
        }
    }

    /// Serialize as pretty-printed JSON
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// Write the report as UTF-8 JSON
    pub fn write(&self, path: &Path) -> Result<()> {
        let json = self.to_json().map_err(|source| Error::Report {
            path: path.to_path_buf(),
            source,
        })?;
        fs::write(path, json).map_err(|e| Error::io(path, e))
    }

    /// Load a previously written report
    pub fn read(path: &Path) -> Result<Self> {
        let json = fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        serde_json::from_str(&json).map_err(|source| Error::Report {
            path: path.to_path_buf(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> ConversionReport {
        ConversionReport {
            input_file: "uploads/sample.ebc".to_string(),
            output_file: "uploads/sample_utf-8.txt".to_string(),
            source_encoding: "cp500".to_string(),
            destination_encoding: "UTF-8".to_string(),
            input_bytes: 7,
            output_bytes: 7,
            replacement_characters: 0,
        }
    }

    #[test]
    fn test_field_names_and_order() {
        let json = sample().to_json().unwrap();
        let expected = r#"{
  "input_file": "uploads/sample.ebc",
  "output_file": "uploads/sample_utf-8.txt",
  "source_encoding": "cp500",
  "destination_encoding": "UTF-8",
  "input_bytes": 7,
  "output_bytes": 7,
  "replacement_characters": 0
}"#;
        assert_eq!(json, expected);
    }

    #[test]
    fn test_non_ascii_paths_are_kept_verbatim() {
        let mut report = sample();
        report.input_file = "uploads/größe.ebc".to_string();
        assert!(report.to_json().unwrap().contains("größe.ebc"));
    }

    #[test]
    fn test_read_rejects_malformed_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.json");
        fs::write(&path, "{ not json").unwrap();

        assert!(matches!(
            ConversionReport::read(&path),
            Err(Error::Report { .. })
        ));
    }
}
