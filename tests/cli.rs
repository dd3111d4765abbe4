#![cfg(feature = "cli")]

use std::fs;
use std::path::Path;

use predicates::prelude::*;

/// "ABC 123" in EBCDIC
const ABC_123: [u8; 7] = [0xC1, 0xC2, 0xC3, 0x40, 0xF1, 0xF2, 0xF3];

fn ebcdic_convert<I, S>(args: I) -> Result<assert_cmd::Command, Box<dyn std::error::Error>>
where
    I: IntoIterator<Item = S>,
    S: AsRef<std::ffi::OsStr>,
{
    let mut cmd = assert_cmd::Command::cargo_bin("ebcdic-convert")?;
    cmd.args(args);
    Ok(cmd)
}

fn temp_path(dir: &tempfile::TempDir, name: &str) -> String {
    dir.path().join(name).to_string_lossy().into_owned()
}

#[test]
fn run_version() -> Result<(), Box<dyn std::error::Error>> {
    let version_string = format!("ebcdic-convert {}", env!("CARGO_PKG_VERSION"));

    ebcdic_convert(["-V"])?
        .assert()
        .success()
        .stdout(predicate::str::starts_with(version_string));

    Ok(())
}

#[test]
fn run_convert_text_output() -> Result<(), Box<dyn std::error::Error>> {
    let tempdir = tempfile::tempdir()?;
    let input = temp_path(&tempdir, "sample.ebc");
    fs::write(&input, ABC_123.repeat(3))?;

    ebcdic_convert(["convert", input.as_str()])?
        .assert()
        .success()
        .stdout(predicate::str::contains("cp037 (detected)"))
        .stdout(predicate::str::contains("UTF-8 (selected)"))
        .stdout(predicate::str::contains("Replacement characters: 0"));

    let output = fs::read_to_string(tempdir.path().join("sample_utf-8.txt"))?;
    assert_eq!(output, "ABC 123ABC 123ABC 123");

    Ok(())
}

#[test]
fn run_convert_json_with_report() -> Result<(), Box<dyn std::error::Error>> {
    let tempdir = tempfile::tempdir()?;
    let input = temp_path(&tempdir, "sample.ebc");
    let report = temp_path(&tempdir, "sample_report.json");
    fs::write(&input, ABC_123)?;

    let assert = ebcdic_convert([
        "--format",
        "json",
        "convert",
        input.as_str(),
        "--from",
        "cp500",
        "--to",
        "utf-32",
        "--report",
        report.as_str(),
    ])?
    .assert()
    .success();

    let stdout: serde_json::Value = serde_json::from_slice(&assert.get_output().stdout)?;
    let written: serde_json::Value = serde_json::from_str(&fs::read_to_string(&report)?)?;

    assert_eq!(stdout, written);
    assert_eq!(stdout["source_encoding"], "cp500");
    assert_eq!(stdout["destination_encoding"], "UTF-32");
    assert_eq!(stdout["input_bytes"], 7);
    assert_eq!(stdout["output_bytes"], 4 + 7 * 4);
    assert!(Path::new(&temp_path(&tempdir, "sample_utf-32.txt")).exists());

    Ok(())
}

#[test]
fn run_convert_unknown_code_page() -> Result<(), Box<dyn std::error::Error>> {
    let tempdir = tempfile::tempdir()?;
    let input = temp_path(&tempdir, "sample.ebc");
    fs::write(&input, ABC_123)?;

    ebcdic_convert(["convert", input.as_str(), "--from", "cp9999"])?
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unsupported encoding: cp9999"));

    Ok(())
}

#[test]
fn run_convert_missing_file() -> Result<(), Box<dyn std::error::Error>> {
    let tempdir = tempfile::tempdir()?;
    let input = temp_path(&tempdir, "missing.ebc");

    ebcdic_convert(["convert", input.as_str()])?
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to convert"));

    Ok(())
}

#[test]
fn run_detect_json() -> Result<(), Box<dyn std::error::Error>> {
    let tempdir = tempfile::tempdir()?;
    let input = temp_path(&tempdir, "sample.ebc");
    fs::write(&input, ABC_123)?;

    let assert = ebcdic_convert(["--format", "json", "detect", "--input", input.as_str()])?
        .assert()
        .success();

    let json: serde_json::Value = serde_json::from_slice(&assert.get_output().stdout)?;
    assert_eq!(json["detected_encoding"], "cp037");
    assert_eq!(json["replacement_characters"], 0);
    assert_eq!(json["fallback"], false);
    assert_eq!(json["candidates"].as_array().map(Vec::len), Some(32));

    Ok(())
}

#[test]
fn run_detect_from_stdin() -> Result<(), Box<dyn std::error::Error>> {
    ebcdic_convert(["detect", "--candidates"])?
        .write_stdin(ABC_123.to_vec())
        .assert()
        .success()
        .stdout(predicate::str::contains("Detected encoding: cp037"))
        .stdout(predicate::str::contains("cp1149"));

    Ok(())
}

#[test]
fn run_check() -> Result<(), Box<dyn std::error::Error>> {
    ebcdic_convert(["check"])?
        .write_stdin(ABC_123.to_vec())
        .assert()
        .success()
        .stdout(predicate::str::contains("Looks like EBCDIC"));

    Ok(())
}

#[test]
fn run_batch_with_rejections() -> Result<(), Box<dyn std::error::Error>> {
    let tempdir = tempfile::tempdir()?;
    let good = temp_path(&tempdir, "good.ebc");
    let wrong_type = temp_path(&tempdir, "notes.txt");
    fs::write(&good, ABC_123)?;
    fs::write(&wrong_type, ABC_123)?;

    ebcdic_convert(["batch", good.as_str(), wrong_type.as_str()])?
        .assert()
        .failure()
        .stdout(predicate::str::contains("good_utf-8.txt"))
        .stdout(predicate::str::contains(
            "Invalid file type. Allowed extensions: ebc",
        ));

    assert!(tempdir.path().join("good_report.json").exists());
    assert!(!tempdir.path().join("notes_utf-8.txt").exists());

    Ok(())
}

#[test]
fn run_batch_any_extension() -> Result<(), Box<dyn std::error::Error>> {
    let tempdir = tempfile::tempdir()?;
    let input = temp_path(&tempdir, "notes.txt");
    fs::write(&input, ABC_123)?;

    let assert = ebcdic_convert(["--format", "json", "batch", "--any-extension", input.as_str()])?
        .assert()
        .success();

    let json: serde_json::Value = serde_json::from_slice(&assert.get_output().stdout)?;
    assert_eq!(json[0]["status"], "converted");
    assert_eq!(json[0]["source_encoding"], "cp037");
    assert_eq!(json[0]["destination_encoding"], "utf-8");

    Ok(())
}

#[test]
fn run_list() -> Result<(), Box<dyn std::error::Error>> {
    ebcdic_convert(["list"])?
        .assert()
        .success()
        .stdout(predicate::str::contains("32 total"))
        .stdout(predicate::str::contains("cp037"))
        .stdout(predicate::str::contains("cp1149"));

    ebcdic_convert(["list", "--destinations"])?
        .assert()
        .success()
        .stdout(predicate::str::contains("utf-16-be"));

    Ok(())
}
