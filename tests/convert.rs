//! End-to-end conversion tests against real files

use std::fs;
use std::path::{Path, PathBuf};

use ebcdic_convert::{
    BatchOptions, CodePage, ConversionReport, ConversionRequest, EncodingDetector, Error,
    FileOutcome, Rejection, SourceSelection, UnicodeEncoding, convert, convert_file, run_batch,
};
use pretty_assertions::assert_eq;
use tempfile::TempDir;

/// "ABC 123" in EBCDIC; identical under every Latin code page
const ABC_123: [u8; 7] = [0xC1, 0xC2, 0xC3, 0x40, 0xF1, 0xF2, 0xF3];

fn write_input(dir: &TempDir, name: &str, content: &[u8]) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, content).unwrap();
    path
}

fn repeated(bytes: &[u8], times: usize) -> Vec<u8> {
    bytes.repeat(times)
}

#[test]
fn test_auto_conversion_of_large_file() {
    let dir = TempDir::new().unwrap();
    let input = write_input(&dir, "sample.ebc", &repeated(&ABC_123, 10_000));
    let report_path = dir.path().join("sample_report.json");

    let result = convert_file(&input, "auto", "", Some(&report_path)).unwrap();

    assert_eq!(result.source_encoding, CodePage::Cp037);
    assert_eq!(result.destination_encoding, UnicodeEncoding::Utf8);
    assert_eq!(result.replacement_count, 0);
    assert_eq!(result.input_bytes, 70_000);
    assert_eq!(result.output_bytes, 70_000);
    assert_eq!(result.output_path, dir.path().join("sample_utf-8.txt"));

    let written = fs::read_to_string(&result.output_path).unwrap();
    assert_eq!(written, "ABC 123".repeat(10_000));

    let report = ConversionReport::read(&report_path).unwrap();
    assert_eq!(
        report,
        ConversionReport {
            input_file: input.display().to_string(),
            output_file: result.output_path.display().to_string(),
            source_encoding: "cp037".to_string(),
            destination_encoding: "UTF-8".to_string(),
            input_bytes: 70_000,
            output_bytes: 70_000,
            replacement_characters: 0,
        }
    );
}

#[test]
fn test_restricted_detector_prefers_first_candidate() {
    let dir = TempDir::new().unwrap();
    let input = write_input(&dir, "sample.ebc", &repeated(&ABC_123, 100));

    let request = ConversionRequest::new(&input).with_detector(
        EncodingDetector::new().with_candidates([CodePage::Cp500, CodePage::Cp037]),
    );
    let result = convert(&request).unwrap();

    assert_eq!(result.source_encoding, CodePage::Cp500);
    assert_eq!(result.replacement_count, 0);
}

#[test]
fn test_explicit_source_bypasses_detection() {
    let dir = TempDir::new().unwrap();
    // cp037 places '[' at 0xBA, cp500 places it at 0x4A
    let input = write_input(&dir, "brackets.ebc", &[0x4A, 0xC1, 0x5A]);

    let result = convert_file(&input, "cp500", "", None).unwrap();
    assert_eq!(result.source_encoding, CodePage::Cp500);
    assert_eq!(result.text, "[A]");

    let result = convert_file(&input, "auto", "", None).unwrap();
    assert_eq!(result.source_encoding, CodePage::Cp037);
    assert_eq!(result.text, "¢A!");
}

#[test]
fn test_explicit_utf16_output_has_bom() {
    let dir = TempDir::new().unwrap();
    let input = write_input(&dir, "hello.ebc", &[0xC8, 0x89]);

    let result = convert_file(&input, "cp037", "utf-16", None).unwrap();

    assert_eq!(result.output_path, dir.path().join("hello_utf-16.txt"));
    assert_eq!(
        fs::read(&result.output_path).unwrap(),
        vec![0xFF, 0xFE, 0x48, 0x00, 0x69, 0x00]
    );
    assert_eq!(result.output_bytes, 6);
}

#[test]
fn test_replacement_characters_are_counted_and_reported() {
    let dir = TempDir::new().unwrap();
    let input = write_input(&dir, "mixed.ebc", &[0x41, 0x90, 0x42, 0xA0]);
    let report_path = dir.path().join("mixed_report.json");

    let result = convert_file(&input, "cp903", "", Some(&report_path)).unwrap();

    assert_eq!(result.replacement_count, 2);
    assert_eq!(result.text, "A\u{FFFD}B\u{FFFD}");

    let report = ConversionReport::read(&report_path).unwrap();
    assert_eq!(report.replacement_characters, 2);
    assert_eq!(report.source_encoding, "cp903");
}

#[test]
fn test_report_output_bytes_match_written_file() {
    let dir = TempDir::new().unwrap();
    let input = write_input(&dir, "nordic.ebc", &repeated(&[0xC1, 0x5B, 0x7B, 0x7C], 50));
    let report_path = dir.path().join("nordic_report.json");

    for destination in ["utf-8", "utf-16", "utf-32-be"] {
        let result = convert_file(&input, "cp277", destination, Some(&report_path)).unwrap();
        let report = ConversionReport::read(&report_path).unwrap();
        let written = fs::metadata(&result.output_path).unwrap().len() as usize;

        assert_eq!(report.output_bytes, written, "{destination}");
        assert_eq!(report.input_bytes, 200);
    }
}

#[test]
fn test_empty_input_converts_to_empty_utf8() {
    let dir = TempDir::new().unwrap();
    let input = write_input(&dir, "empty.ebc", &[]);

    let result = convert_file(&input, "auto", "", None).unwrap();

    assert_eq!(result.source_encoding, CodePage::Cp037);
    assert_eq!(result.destination_encoding, UnicodeEncoding::Utf8);
    assert_eq!(result.output_bytes, 0);
    assert_eq!(fs::read(&result.output_path).unwrap(), Vec::<u8>::new());
}

#[test]
fn test_unknown_destination_is_rejected_before_writing() {
    let dir = TempDir::new().unwrap();
    let input = write_input(&dir, "sample.ebc", &ABC_123);

    let err = convert_file(&input, "auto", "latin-1", None).unwrap_err();

    assert!(matches!(err, Error::UnsupportedEncoding { ref name } if name == "latin-1"));
    assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
}

#[test]
fn test_report_written_to_missing_directory_fails_after_text() {
    let dir = TempDir::new().unwrap();
    let input = write_input(&dir, "sample.ebc", &ABC_123);
    let report_path = dir.path().join("missing").join("report.json");

    let err = convert_file(&input, "auto", "", Some(&report_path)).unwrap_err();

    assert!(matches!(err, Error::Io { ref path, .. } if path == &report_path));
    assert!(dir.path().join("sample_utf-8.txt").exists());
}

fn outcome_for<'a>(outcomes: &'a [FileOutcome], input: &Path) -> &'a FileOutcome {
    outcomes
        .iter()
        .find(|outcome| outcome.input() == input)
        .unwrap()
}

#[test]
fn test_batch_converts_and_rejects_per_file() {
    let dir = TempDir::new().unwrap();
    let good = write_input(&dir, "good.ebc", &repeated(&ABC_123, 10));
    let wrong_type = write_input(&dir, "notes.txt", &ABC_123);
    let missing = dir.path().join("missing.ebc");
    let big = write_input(&dir, "big.ebc", &repeated(&ABC_123, 100));

    let options = BatchOptions::new().with_max_input_bytes(500);
    let inputs = [&good, &wrong_type, &missing, &big];
    let outcomes = run_batch(&inputs, &options);

    assert_eq!(outcomes.len(), 4);
    assert_eq!(
        outcome_for(&outcomes, &good),
        &FileOutcome::Converted {
            input: good.clone(),
            output: dir.path().join("good_utf-8.txt"),
            report: dir.path().join("good_report.json"),
            source_encoding: CodePage::Cp037,
            destination_encoding: UnicodeEncoding::Utf8,
            replacement_count: 0,
        }
    );
    assert!(dir.path().join("good_report.json").exists());

    assert_eq!(
        outcome_for(&outcomes, &wrong_type),
        &FileOutcome::Rejected {
            input: wrong_type.clone(),
            reason: Rejection::DisallowedExtension {
                allowed: "ebc".to_string()
            },
        }
    );
    assert!(matches!(
        outcome_for(&outcomes, &missing),
        FileOutcome::Failed { .. }
    ));
    assert_eq!(
        outcome_for(&outcomes, &big),
        &FileOutcome::Rejected {
            input: big.clone(),
            reason: Rejection::TooLarge {
                size: 700,
                limit: 500
            },
        }
    );
}

#[test]
fn test_batch_rejects_implausible_content() {
    let dir = TempDir::new().unwrap();
    // every byte in the upper half is undefined in cp891 and cp903
    let binary: Vec<u8> = (0x80..=0xFF).collect();
    let input = write_input(&dir, "blob.ebc", &binary);

    let options = BatchOptions::new()
        .with_detector(EncodingDetector::new().with_candidates([CodePage::Cp891, CodePage::Cp903]));
    let outcomes = run_batch(&[&input], &options);

    assert_eq!(
        outcomes,
        vec![FileOutcome::Rejected {
            input: input.clone(),
            reason: Rejection::NotEbcdic,
        }]
    );
    assert!(!dir.path().join("blob_utf-8.txt").exists());
}

#[test]
fn test_batch_honours_explicit_encodings() {
    let dir = TempDir::new().unwrap();
    let input = write_input(&dir, "data.dat", &[0x4A, 0x5A]);

    let options = BatchOptions::new()
        .with_source("cp500")
        .unwrap()
        .with_destination(Some(UnicodeEncoding::Utf32))
        .with_allowed_extensions(["dat"]);
    let outcomes = run_batch(&[&input], &options);

    assert_eq!(options.source, SourceSelection::Explicit(CodePage::Cp500));
    match &outcomes[0] {
        FileOutcome::Converted {
            output,
            destination_encoding,
            ..
        } => {
            assert_eq!(*destination_encoding, UnicodeEncoding::Utf32);
            assert_eq!(output, &dir.path().join("data_utf-32.txt"));
            assert_eq!(fs::metadata(output).unwrap().len(), 4 + 2 * 4);
        }
        other => panic!("unexpected outcome: {other:?}"),
    }
}
