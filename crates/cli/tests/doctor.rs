use assert_cmd::prelude::*;
use predicates::prelude::*;
use regex::Regex;
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

fn seed_schema(root: &Path) {
    write_file(&root.join("schema/collections/posts.yaml"), "fields:\n  title: { type: text }\n");
    write_file(&root.join("schema/collections/pages.yaml"), "fields:\n  body: { type: blocks }\n");
    write_file(&root.join("schema/blocks/hero.yaml"), "fields:\n  heading: { type: text }\n");
}

fn normalize_paths(s: &str) -> String {
    let re = Regex::new(r"(?m)^(path|schema_dir): .*$").unwrap();
    re.replace_all(s, "$1: <PATH>").to_string()
}

#[test]
fn doctor_reads_provided_config_path() {
    let tmp = tempdir().unwrap();
    seed_schema(tmp.path());
    let cfg = tmp.path().join("config.toml");
    write_file(&cfg, "version = 1\nschema_dir = \"schema\"\n\n[population]\nmax_depth = 5\n");

    let assert = Command::new(assert_cmd::cargo::cargo_bin!("fieldkit"))
        .args(["doctor", "--config", cfg.to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("OK   fieldkit doctor"));

    let out = String::from_utf8(assert.get_output().stdout.clone()).unwrap();
    insta::assert_snapshot!(normalize_paths(&out), @r"
    OK   fieldkit doctor
    path: <PATH>
    schema_dir: <PATH>
    records: (none)
    population.max_depth: 5
    logging.level: info
    field types: 16
    collections: pages, posts
    blocks: hero
    ");
}

#[test]
fn doctor_uses_xdg_default_when_present() {
    let tmp = tempdir().unwrap();
    seed_schema(tmp.path());
    let schema_dir = tmp.path().join("schema");
    write_file(
        &tmp.path().join("fieldkit/config.toml"),
        &format!("version = 1\nschema_dir = \"{}\"\n", schema_dir.display()),
    );

    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("fieldkit"));
    cmd.env("XDG_CONFIG_HOME", tmp.path());
    cmd.arg("doctor");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("OK   fieldkit doctor"))
        .stdout(predicate::str::contains("collections: pages, posts"));
}

#[test]
fn doctor_fails_when_config_missing() {
    let tmp = tempdir().unwrap();
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("fieldkit"));
    cmd.env("XDG_CONFIG_HOME", tmp.path());
    cmd.arg("doctor");
    cmd.assert()
        .failure()
        .stdout(predicate::str::contains("FAIL fieldkit doctor"))
        .stdout(predicate::str::contains("looked for:"));
}

#[test]
fn doctor_fails_on_broken_schema() {
    let tmp = tempdir().unwrap();
    write_file(&tmp.path().join("schema/collections/posts.yaml"), "fields: [unclosed");
    let cfg = tmp.path().join("config.toml");
    write_file(&cfg, "version = 1\nschema_dir = \"schema\"\n");

    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("fieldkit"));
    cmd.args(["doctor", "--config", cfg.to_str().unwrap()]);
    cmd.assert()
        .failure()
        .stdout(predicate::str::contains("FAIL fieldkit doctor"))
        .stdout(predicate::str::contains("posts.yaml"));
}
