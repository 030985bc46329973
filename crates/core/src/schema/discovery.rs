//! Schema file discovery and loading.

use std::fs;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use super::errors::SchemaLoadError;
use super::types::{BlockDefinition, Collection, SchemaKind};

/// Metadata about a discovered schema file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaFileInfo {
    /// Name taken from the file stem.
    pub name: String,
    pub kind: SchemaKind,
    pub path: PathBuf,
}

/// Discover schema files of one kind under `root`.
///
/// Looks at direct children of `root/collections` or `root/blocks` with a
/// `.yaml`, `.yml` or `.json` extension. Returns an empty list if the
/// directory doesn't exist.
pub fn discover_schemas(root: &Path, kind: SchemaKind) -> Result<Vec<SchemaFileInfo>, SchemaLoadError> {
    let dir = root.join(kind.dir_name());
    if !dir.exists() {
        return Ok(vec![]);
    }

    let dir = dir
        .canonicalize()
        .map_err(|_| SchemaLoadError::MissingDir(dir.display().to_string()))?;

    let mut out = Vec::new();
    for entry in WalkDir::new(&dir).max_depth(1) {
        let entry = entry.map_err(|e| SchemaLoadError::WalkError(dir.display().to_string(), e))?;

        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        if !is_schema_file(path) {
            tracing::debug!(path = %path.display(), "skipping non-schema file");
            continue;
        }

        let name = path.file_stem().and_then(|s| s.to_str()).unwrap_or("").to_string();
        if !name.is_empty() {
            out.push(SchemaFileInfo { name, kind, path: path.to_path_buf() });
        }
    }

    out.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(out)
}

fn is_schema_file(path: &Path) -> bool {
    matches!(path.extension().and_then(|e| e.to_str()), Some("yaml" | "yml" | "json"))
}

/// Repository of collection and block files in a schema directory.
pub struct SchemaRepository {
    pub root: PathBuf,
    pub collections: Vec<SchemaFileInfo>,
    pub blocks: Vec<SchemaFileInfo>,
}

impl SchemaRepository {
    /// Scan a schema directory.
    ///
    /// Returns an empty repository if the directory doesn't exist.
    pub fn new(root: &Path) -> Result<Self, SchemaLoadError> {
        Ok(Self {
            root: root.to_path_buf(),
            collections: discover_schemas(root, SchemaKind::Collection)?,
            blocks: discover_schemas(root, SchemaKind::Block)?,
        })
    }

    pub fn list_all(&self) -> impl Iterator<Item = &SchemaFileInfo> {
        self.collections.iter().chain(&self.blocks)
    }

    pub fn load_collections(&self) -> Result<Vec<Collection>, SchemaLoadError> {
        self.collections.iter().map(load_collection).collect()
    }

    pub fn load_blocks(&self) -> Result<Vec<BlockDefinition>, SchemaLoadError> {
        self.blocks.iter().map(load_block).collect()
    }
}

/// Load a collection file. An empty `name` is taken from the file stem.
pub fn load_collection(info: &SchemaFileInfo) -> Result<Collection, SchemaLoadError> {
    let mut collection: Collection = parse_file(&info.path)?;
    if collection.name.is_empty() {
        collection.name = info.name.clone();
    }
    Ok(collection)
}

/// Load a block file. An empty `name` is taken from the file stem.
pub fn load_block(info: &SchemaFileInfo) -> Result<BlockDefinition, SchemaLoadError> {
    let mut block: BlockDefinition = parse_file(&info.path)?;
    if block.name.is_empty() {
        block.name = info.name.clone();
    }
    Ok(block)
}

fn parse_file<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, SchemaLoadError> {
    let source = fs::read_to_string(path)
        .map_err(|e| SchemaLoadError::Io { path: path.to_path_buf(), source: e })?;

    let parse_error = |message: String| SchemaLoadError::Parse { path: path.to_path_buf(), message };
    if path.extension().and_then(|e| e.to_str()) == Some("json") {
        serde_json::from_str(&source).map_err(|e| parse_error(e.to_string()))
    } else {
        serde_yaml::from_str(&source).map_err(|e| parse_error(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields::FieldKind;
    use tempfile::TempDir;

    fn write(dir: &Path, rel: &str, content: &str) {
        let path = dir.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    #[test]
    fn test_missing_dir_is_empty() {
        let repo = SchemaRepository::new(Path::new("/nonexistent/schema")).unwrap();
        assert_eq!(repo.list_all().count(), 0);
    }

    #[test]
    fn test_discovers_supported_extensions() {
        let tmp = TempDir::new().unwrap();
        write(tmp.path(), "collections/posts.yaml", "fields: {}");
        write(tmp.path(), "collections/pages.json", r#"{"fields": {}}"#);
        write(tmp.path(), "collections/notes.txt", "ignored");
        write(tmp.path(), "blocks/hero.yml", "fields: {}");

        let repo = SchemaRepository::new(tmp.path()).unwrap();
        let names: Vec<_> = repo.collections.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["pages", "posts"]);
        assert_eq!(repo.blocks.len(), 1);
        assert_eq!(repo.blocks[0].kind, SchemaKind::Block);
    }

    #[test]
    fn test_load_collection_from_yaml() {
        let tmp = TempDir::new().unwrap();
        write(
            tmp.path(),
            "collections/posts.yaml",
            r#"
label: Posts
search: [title]
fields:
  title:
    type: text
    options: { required: true }
  tags:
    type: chips
"#,
        );

        let repo = SchemaRepository::new(tmp.path()).unwrap();
        let collections = repo.load_collections().unwrap();
        assert_eq!(collections[0].name, "posts");
        assert_eq!(collections[0].label.as_deref(), Some("Posts"));
        assert_eq!(collections[0].fields["tags"].kind, FieldKind::Chips);
        assert!(collections[0].fields["title"].is_required());
    }

    #[test]
    fn test_parse_error_names_file() {
        let tmp = TempDir::new().unwrap();
        write(tmp.path(), "blocks/broken.yaml", "fields: [unclosed");

        let repo = SchemaRepository::new(tmp.path()).unwrap();
        let err = repo.load_blocks().unwrap_err();
        assert!(err.to_string().contains("broken.yaml"));
    }
}
