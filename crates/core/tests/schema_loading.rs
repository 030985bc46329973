use fieldkit_core::fields::{FieldEngine, FieldKind, Operation};
use fieldkit_core::schema::{SchemaLoadError, SchemaRegistry, SchemaRepository};
use serde_json::json;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::tempdir;

fn write(path: &PathBuf, content: &str) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, content).unwrap();
}

fn seed(root: &Path) {
    write(
        &root.join("blocks/gallery.yaml"),
        r#"
fields:
  title: { type: text }
slots:
  default:
    label: Images
    allowed-child-blocks: [image]
"#,
    );
    write(
        &root.join("blocks/image.json"),
        r#"{ "fields": { "src": { "type": "text", "options": { "required": true } } } }"#,
    );
    write(
        &root.join("collections/pages.yaml"),
        r#"
label: Pages
search: [title]
fields:
  title:
    type: text
    options: { required: true, max-length: 40 }
  slug:
    type: slug
    additional: { unique: true }
  body:
    type: blocks
    options: { allowed-blocks: [gallery] }
"#,
    );
}

#[test]
fn loads_a_schema_directory() {
    let tmp = tempdir().unwrap();
    seed(tmp.path());

    let repo = SchemaRepository::new(tmp.path()).unwrap();
    let registry = SchemaRegistry::from_repository(&repo).unwrap();

    assert_eq!(registry.collection_names(), vec!["pages"]);
    assert_eq!(registry.block_names(), vec!["gallery", "image"]);

    let pages = registry.collection("pages").unwrap();
    assert_eq!(pages.fields["body"].kind, FieldKind::Blocks);
    assert!(pages.fields["slug"].additional.unique);
    assert_eq!(pages.search.as_deref(), Some(&["title".to_string()][..]));
}

#[test]
fn loaded_schemas_drive_processing() {
    let tmp = tempdir().unwrap();
    seed(tmp.path());
    let repo = SchemaRepository::new(tmp.path()).unwrap();
    let engine = FieldEngine::new(Arc::new(SchemaRegistry::from_repository(&repo).unwrap()));

    let mut input = json!({
        "title": "About us",
        "slug": "About Us",
        "body": [{ "name": "gallery", "slots": { "default": [{ "name": "image", "fields": {} }] } }]
    });
    let errors = engine.process_record("pages", &mut input, Operation::Create, &[]).unwrap();

    insta::assert_snapshot!(errors, @"body.0.slots.default.0.fields.src: This field is required");
    assert_eq!(input["slug"], json!("about-us"));
}

#[test]
fn slot_referencing_unknown_block_fails() {
    let tmp = tempdir().unwrap();
    write(
        &tmp.path().join("blocks/gallery.yaml"),
        "slots:\n  default:\n    allowed-child-blocks: [video]\n",
    );

    let repo = SchemaRepository::new(tmp.path()).unwrap();
    let err = SchemaRegistry::from_repository(&repo).unwrap_err();
    match err {
        SchemaLoadError::UnknownChildBlock { block, slot, child } => {
            assert_eq!((block.as_str(), slot.as_str(), child.as_str()), ("gallery", "default", "video"));
        }
        other => panic!("expected UnknownChildBlock, got {other:?}"),
    }
}

#[test]
fn duplicate_collection_names_fail() {
    let tmp = tempdir().unwrap();
    write(&tmp.path().join("collections/posts.yaml"), "fields: {}\n");
    write(&tmp.path().join("collections/posts.json"), r#"{ "fields": {} }"#);

    let repo = SchemaRepository::new(tmp.path()).unwrap();
    let err = SchemaRegistry::from_repository(&repo).unwrap_err();
    assert!(matches!(err, SchemaLoadError::Duplicate { kind: "collection", ref name } if name == "posts"));
}
