use fieldkit_core::config::loader::{ConfigError, ConfigLoader};
use std::fs;
use std::path::PathBuf;
use tempfile::tempdir;

fn write_file(path: &PathBuf, content: &str) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, content).unwrap();
}

#[test]
fn missing_file_fails() {
    let tmp = tempdir().unwrap();
    let cfg_path = tmp.path().join("nope/config.toml");
    let err = ConfigLoader::load(Some(&cfg_path)).unwrap_err();
    match err {
        ConfigError::NotFound(_) => {}
        other => panic!("expected NotFound, got {other:?}"),
    }
}

#[test]
fn bad_version_fails() {
    let tmp = tempdir().unwrap();
    let cfg_path = tmp.path().join("config.toml");
    write_file(&cfg_path, "version = 2\nschema_dir = \"/tmp/schema\"\n");

    let err = ConfigLoader::load(Some(&cfg_path)).unwrap_err();
    match err {
        ConfigError::BadVersion(2) => {}
        other => panic!("expected BadVersion(2), got {other:?}"),
    }
}

#[test]
fn zero_depth_fails() {
    let tmp = tempdir().unwrap();
    let cfg_path = tmp.path().join("config.toml");
    let toml = r#"
version = 1
schema_dir = "/tmp/schema"

[population]
max_depth = 0
"#;
    write_file(&cfg_path, toml);

    let err = ConfigLoader::load(Some(&cfg_path)).unwrap_err();
    match err {
        ConfigError::InvalidDepth => {}
        other => panic!("expected InvalidDepth, got {other:?}"),
    }
}

#[test]
fn malformed_toml_fails() {
    let tmp = tempdir().unwrap();
    let cfg_path = tmp.path().join("config.toml");
    write_file(&cfg_path, "version = \n");

    let err = ConfigLoader::load(Some(&cfg_path)).unwrap_err();
    match err {
        ConfigError::ParseError(path, _) => assert!(path.ends_with("config.toml")),
        other => panic!("expected ParseError, got {other:?}"),
    }
}

#[test]
fn missing_schema_dir_fails_to_parse() {
    let tmp = tempdir().unwrap();
    let cfg_path = tmp.path().join("config.toml");
    write_file(&cfg_path, "version = 1\n");

    let err = ConfigLoader::load(Some(&cfg_path)).unwrap_err();
    assert!(matches!(err, ConfigError::ParseError(..)));
}
