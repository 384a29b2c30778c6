mod common;

use std::fs;

use billsweep::{BillConfig, BillConverter, BillError, BillWriter, Config};

fn config(download_dir: &std::path::Path, keep_pages: Option<u32>) -> Config {
    config_with_password(download_dir, keep_pages, "")
}

fn config_with_password(download_dir: &std::path::Path, keep_pages: Option<u32>, password: &str) -> Config {
    Config::from_bills(
        download_dir,
        [(
            "jio",
            BillConfig {
                label: "Jio".to_string(),
                password: password.to_string(),
                keep_pages,
                watermark: None,
            },
        )],
    )
    .unwrap()
}

#[test]
fn test_convert_file_writes_next_to_bill_name() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("March.pdf");
    fs::write(&input, common::sample_pdf(6)).unwrap();

    let config = config(&dir.path().join("out"), Some(2));
    let output = BillWriter::new(&config).convert_file("JIO", &input).unwrap();

    assert_eq!(output, dir.path().join("out").join("jio").join("jio--March.pdf"));
    assert_eq!(common::page_count(&fs::read(&output).unwrap()), 2);
    assert_eq!(common::page_count(&fs::read(&input).unwrap()), 6);
}

#[test]
fn test_convert_file_unknown_bill() {
    let dir = tempfile::tempdir().unwrap();
    let config = config(dir.path(), None);
    let err = BillWriter::new(&config)
        .convert_file("bsnl", &dir.path().join("missing.pdf"))
        .unwrap_err();
    assert!(matches!(err, BillError::BillNotConfigured(_)));
}

#[test]
fn test_convert_file_missing_input() {
    let dir = tempfile::tempdir().unwrap();
    let config = config(dir.path(), None);
    let err = BillWriter::new(&config)
        .convert_file("jio", &dir.path().join("missing.pdf"))
        .unwrap_err();
    assert!(matches!(err, BillError::Io { .. }));
}

#[test]
fn test_unprotected_bill_with_empty_password_round_trips() {
    let dir = tempfile::tempdir().unwrap();
    let config = config(dir.path(), None);
    let input = common::sample_pdf(4);

    let mut output = Vec::new();
    BillConverter::new(&config)
        .convert("jio", input.as_slice(), &mut output)
        .unwrap();

    assert_eq!(common::page_count(&output), 4);
    assert!(!common::is_encrypted(&output));
}

#[test]
fn test_trim_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let config = config(dir.path(), Some(2));
    let converter = BillConverter::new(&config);

    let once = converter.convert_bytes("jio", &common::sample_pdf(5)).unwrap();
    let twice = converter.convert_bytes("jio", &once).unwrap();

    assert_eq!(common::page_count(&once), 2);
    assert_eq!(common::page_count(&twice), 2);
}

#[test]
fn test_protected_bill_is_unlocked_and_trimmed() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("protected.pdf");
    fs::write(&input, common::encrypted_pdf(5, "secret", "owner")).unwrap();

    let config = config_with_password(&dir.path().join("out"), Some(1), "secret");
    let output = BillWriter::new(&config).convert_file("jio", &input).unwrap();

    let data = fs::read(&output).unwrap();
    assert_eq!(common::page_count(&data), 1);
    assert!(!common::is_encrypted(&data));
}

#[test]
fn test_wrong_password_fails_without_output() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("protected.pdf");
    fs::write(&input, common::encrypted_pdf(3, "secret", "owner")).unwrap();

    let config = config_with_password(&dir.path().join("out"), None, "not-it");
    let err = BillWriter::new(&config).convert_file("jio", &input).unwrap_err();

    assert!(matches!(err, BillError::DecryptionFailed { bill, .. } if bill == "jio"));
    assert!(!dir.path().join("out").join("jio").join("jio--protected.pdf").exists());
}

#[test]
fn test_owner_only_protection_opens_with_empty_password() {
    let dir = tempfile::tempdir().unwrap();
    let config = config(dir.path(), Some(2));

    let output = BillConverter::new(&config)
        .convert_bytes("jio", &common::encrypted_pdf(4, "", "owner"))
        .unwrap();

    assert_eq!(common::page_count(&output), 2);
    assert!(!common::is_encrypted(&output));
}
