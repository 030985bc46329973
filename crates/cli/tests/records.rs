use assert_cmd::prelude::*;
use predicates::prelude::*;
use serde_json::{Value, json};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::tempdir;

fn write_file(path: &PathBuf, content: &str) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, content).unwrap();
}

/// Schema, record fixture and config under `root`; returns the config path.
fn seed(root: &Path) -> PathBuf {
    write_file(
        &root.join("schema/collections/posts.yaml"),
        r#"
search: [title, tags]
fields:
  title:
    type: text
    options: { required: true }
  slug:
    type: slug
    additional: { unique: true }
  tags:
    type: records
    options: { collection: tags, fields: [name] }
"#,
    );
    write_file(
        &root.join("schema/collections/tags.yaml"),
        "fields:\n  name: { type: text }\n",
    );
    write_file(
        &root.join("records.json"),
        &json!({
            "posts": [{ "id": 1, "title": "Hello", "slug": "hello", "tags": [2] }],
            "tags": [{ "id": 1, "name": "rust" }, { "id": 2, "name": "cms" }]
        })
        .to_string(),
    );

    let cfg = root.join("config.toml");
    write_file(&cfg, "version = 1\nschema_dir = \"schema\"\nrecords = \"records.json\"\n");
    cfg
}

fn fieldkit(cfg: &Path) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("fieldkit"));
    cmd.arg("--config").arg(cfg);
    cmd
}

fn stdout_json(cmd: &mut Command) -> Value {
    let assert = cmd.assert().success();
    serde_json::from_slice(&assert.get_output().stdout).unwrap()
}

#[test]
fn process_prints_the_sanitized_record() {
    let tmp = tempdir().unwrap();
    let cfg = seed(tmp.path());
    let input = tmp.path().join("input.json");
    write_file(&input, r#"{ "title": "  World ", "slug": "Hello World", "tags": "[\"1\"]" }"#);

    let out = stdout_json(fieldkit(&cfg).args([
        "process",
        "--collection",
        "posts",
        "--input",
        input.to_str().unwrap(),
    ]));
    assert_eq!(out, json!({ "title": "World", "slug": "hello-world", "tags": [1] }));
}

#[test]
fn process_failure_exits_with_two() {
    let tmp = tempdir().unwrap();
    let cfg = seed(tmp.path());
    let input = tmp.path().join("input.json");
    write_file(&input, r#"{ "slug": "hello", "tags": [7] }"#);

    fieldkit(&cfg)
        .args(["process", "--collection", "posts", "--input", input.to_str().unwrap(), "--json"])
        .assert()
        .code(2)
        .stdout(predicate::str::contains(r#""title": "This field is required""#))
        .stdout(predicate::str::contains(r#""slug": "This value already exists""#))
        .stdout(predicate::str::contains(r#""tags": "The referenced record does not exist""#));
}

#[test]
fn process_failure_prints_a_table() {
    let tmp = tempdir().unwrap();
    let cfg = seed(tmp.path());
    let input = tmp.path().join("input.json");
    write_file(&input, r#"{ "title": "x", "colour": "red" }"#);

    fieldkit(&cfg)
        .args(["process", "--collection", "posts", "--input", input.to_str().unwrap()])
        .assert()
        .code(2)
        .stdout(predicate::str::contains("colour"))
        .stdout(predicate::str::contains("Unrecognized field name"))
        .stdout(predicate::str::contains("-- 1 errors --"));
}

#[test]
fn process_update_skips_absent_fields() {
    let tmp = tempdir().unwrap();
    let cfg = seed(tmp.path());
    let input = tmp.path().join("input.json");
    write_file(&input, r#"{ "id": 1, "slug": "hello" }"#);

    let out = stdout_json(fieldkit(&cfg).args([
        "process",
        "--collection",
        "posts",
        "--operation",
        "update",
        "--input",
        input.to_str().unwrap(),
    ]));
    assert_eq!(out, json!({ "id": 1, "slug": "hello" }));
}

#[test]
fn process_batch_prefixes_errors() {
    let tmp = tempdir().unwrap();
    let cfg = seed(tmp.path());
    let input = tmp.path().join("input.json");
    write_file(&input, r#"[{ "title": "a", "slug": "same" }, { "title": "b", "slug": "same" }]"#);

    fieldkit(&cfg)
        .args(["process", "--collection", "posts", "--input", input.to_str().unwrap(), "--json"])
        .assert()
        .code(2)
        .stdout(predicate::str::contains(r#""0.slug""#))
        .stdout(predicate::str::contains(r#""1.slug""#));
}

#[test]
fn unknown_collection_exits_with_one() {
    let tmp = tempdir().unwrap();
    let cfg = seed(tmp.path());
    let input = tmp.path().join("input.json");
    write_file(&input, "{}");

    fieldkit(&cfg)
        .args(["process", "--collection", "authors", "--input", input.to_str().unwrap()])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("unknown collection: authors"));
}

#[test]
fn populate_expands_relations() {
    let tmp = tempdir().unwrap();
    let cfg = seed(tmp.path());
    let input = tmp.path().join("input.json");
    write_file(&input, r#"{ "id": 1, "title": "Hello", "tags": [2, 1] }"#);

    let out = stdout_json(fieldkit(&cfg).args([
        "populate",
        "--collection",
        "posts",
        "--input",
        input.to_str().unwrap(),
    ]));
    assert_eq!(
        out,
        json!({
            "id": 1,
            "title": "Hello",
            "tags": [{ "id": 2, "name": "cms" }, { "id": 1, "name": "rust" }]
        })
    );
}

#[test]
fn keywords_prints_one_line_per_record() {
    let tmp = tempdir().unwrap();
    let cfg = seed(tmp.path());
    let input = tmp.path().join("input.json");
    write_file(&input, r#"[{ "title": " First ", "slug": "first" }, { "title": "Second" }]"#);

    fieldkit(&cfg)
        .args(["keywords", "--collection", "posts", "--input", input.to_str().unwrap()])
        .assert()
        .success()
        .stdout("First\nSecond\n");
}
