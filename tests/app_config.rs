#[path = "common/mod.rs"]
mod common;

use common::EnvGuard;
use once_cell::sync::Lazy;
use std::io::Write;
use std::sync::Mutex;
use tempfile::NamedTempFile;
use webtoolkit::{Tools, DEFAULT_MAX_JSON_BYTES, DEFAULT_MAX_UPLOAD_BYTES};

static ENV_MUTEX: Lazy<Mutex<()>> = Lazy::new(|| Mutex::new(()));

const VARS: &[&str] = &[
    "WEBTOOLKIT_CONFIG",
    "WEBTOOLKIT_MAX_UPLOAD_BYTES",
    "WEBTOOLKIT_ALLOWED_FILE_TYPES",
    "WEBTOOLKIT_MAX_JSON_BYTES",
    "WEBTOOLKIT_ALLOW_UNKNOWN_FIELDS",
];

fn clean_env() -> EnvGuard {
    let mut env = EnvGuard::new();
    for var in VARS {
        env.remove(var);
    }
    env
}

#[test]
fn rejects_invalid_boolean_env_values() {
    let _lock = ENV_MUTEX.lock().unwrap();
    let mut env = clean_env();
    env.set("WEBTOOLKIT_ALLOW_UNKNOWN_FIELDS", "maybe");

    let err = Tools::from_env().expect_err("expected invalid boolean to error");
    assert!(format!("{}", err).contains("WEBTOOLKIT_ALLOW_UNKNOWN_FIELDS"));
}

#[test]
fn rejects_non_numeric_limits() {
    let _lock = ENV_MUTEX.lock().unwrap();
    let mut env = clean_env();
    env.set("WEBTOOLKIT_MAX_JSON_BYTES", "lots");

    let err = Tools::from_env().expect_err("expected invalid integer to error");
    assert!(format!("{}", err).contains("WEBTOOLKIT_MAX_JSON_BYTES"));
}

#[test]
fn builds_tools_from_environment() {
    let _lock = ENV_MUTEX.lock().unwrap();
    let mut env = clean_env();
    env.set_many(&[
        ("WEBTOOLKIT_MAX_UPLOAD_BYTES", "10485760"),
        ("WEBTOOLKIT_ALLOWED_FILE_TYPES", "image/png,image/gif"),
        ("WEBTOOLKIT_ALLOW_UNKNOWN_FIELDS", "true"),
    ]);

    let tools = Tools::from_env().unwrap();
    assert_eq!(tools.max_upload_bytes(), 10 * 1024 * 1024);
    assert_eq!(tools.max_json_bytes(), DEFAULT_MAX_JSON_BYTES);
    assert_eq!(tools.allowed_file_types, vec!["image/png", "image/gif"]);
    assert!(tools.allow_unknown_fields);
}

#[test]
fn reads_json_config_file() {
    let _lock = ENV_MUTEX.lock().unwrap();
    let mut env = clean_env();

    let mut file = NamedTempFile::new().unwrap();
    write!(
        file,
        "{}",
        serde_json::json!({ "maxJsonBytes": 4096, "allowedFileTypes": ["application/pdf"] })
    )
    .unwrap();
    env.set("WEBTOOLKIT_CONFIG", file.path().to_str().unwrap());

    let tools = Tools::from_env().unwrap();
    assert_eq!(tools.max_json_bytes(), 4096);
    assert_eq!(tools.max_upload_bytes(), DEFAULT_MAX_UPLOAD_BYTES);
    assert_eq!(tools.allowed_file_types, vec!["application/pdf"]);
    assert!(!tools.allow_unknown_fields);
}

#[test]
fn rejects_malformed_config_file() {
    let _lock = ENV_MUTEX.lock().unwrap();
    let mut env = clean_env();

    let mut file = NamedTempFile::new().unwrap();
    write!(file, "{{ not json").unwrap();
    env.set("WEBTOOLKIT_CONFIG", file.path().to_str().unwrap());

    let err = Tools::from_env().expect_err("malformed file should error");
    assert!(format!("{}", err).contains("invalid JSON configuration"));
}
