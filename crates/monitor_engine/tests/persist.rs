use std::collections::HashMap;
use std::fs;

use monitor_engine::{ensure_state_dir, AtomicFileWriter, PersistError};
use tempfile::TempDir;

#[test]
fn creates_missing_state_dir() {
    let temp = TempDir::new().unwrap();
    let new_dir = temp.path().join("state");
    assert!(!new_dir.exists());
    ensure_state_dir(&new_dir).unwrap();
    assert!(new_dir.is_dir());
}

#[test]
fn atomic_write_replaces_existing() {
    let temp = TempDir::new().unwrap();
    let writer = AtomicFileWriter::new(temp.path().to_path_buf());

    let first = writer.write("session.json", b"{\"a\":1}").unwrap();
    assert_eq!(first.file_name().unwrap(), "session.json");
    assert_eq!(fs::read_to_string(&first).unwrap(), "{\"a\":1}");

    let second = writer.write("session.json", b"{\"a\":2}").unwrap();
    assert_eq!(first, second);
    assert_eq!(fs::read_to_string(&second).unwrap(), "{\"a\":2}");
}

#[test]
fn state_dir_that_is_a_file_is_rejected() {
    let temp = TempDir::new().unwrap();
    let file_path = temp.path().join("not_a_dir");
    fs::write(&file_path, "x").unwrap();

    let writer = AtomicFileWriter::new(file_path.clone());
    assert!(writer.write("session.json", b"{}").is_err());
    assert!(!file_path.with_file_name("session.json").exists());
}

#[test]
fn write_json_encodes_pretty_json() {
    let temp = TempDir::new().unwrap();
    let writer = AtomicFileWriter::new(temp.path().to_path_buf());
    let path = writer
        .write_json("record.json", &serde_json::json!({"agentId": "a-1"}))
        .unwrap();
    let text = fs::read_to_string(path).unwrap();
    assert_eq!(text, "{\n  \"agentId\": \"a-1\"\n}");
}

#[test]
fn write_json_reports_encode_failure_and_leaves_no_file() {
    let temp = TempDir::new().unwrap();
    let writer = AtomicFileWriter::new(temp.path().to_path_buf());
    // JSON object keys must be strings.
    let unencodable: HashMap<(u8, u8), u8> = HashMap::from([((1, 2), 3)]);
    let err = writer.write_json("record.json", &unencodable).unwrap_err();
    assert!(matches!(err, PersistError::Encode(_)));
    assert!(!temp.path().join("record.json").exists());
}
