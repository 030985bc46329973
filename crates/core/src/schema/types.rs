//! Collection and block definitions.

use indexmap::IndexMap;
use serde::Deserialize;

use crate::fields::Schema;

/// Which table a schema file belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaKind {
    Collection,
    Block,
}

impl SchemaKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Collection => "collection",
            Self::Block => "block",
        }
    }

    /// Subdirectory holding files of this kind.
    pub fn dir_name(&self) -> &'static str {
        match self {
            Self::Collection => "collections",
            Self::Block => "blocks",
        }
    }
}

/// A stored record type.
#[derive(Debug, Clone, Deserialize)]
pub struct Collection {
    /// Collection name (defaults to the file name when loaded from disk).
    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub label: Option<String>,

    pub fields: Schema,

    /// Fields contributing search keywords; all fields when unset.
    #[serde(default)]
    pub search: Option<Vec<String>>,
}

impl Collection {
    pub fn new(name: &str, fields: Schema) -> Self {
        Self { name: name.to_string(), label: None, fields, search: None }
    }

    pub fn with_search(mut self, fields: &[&str]) -> Self {
        self.search = Some(fields.iter().map(|f| f.to_string()).collect());
        self
    }
}

/// A named, reusable group of fields and slots.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BlockDefinition {
    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub fields: Schema,

    #[serde(default)]
    pub slots: IndexMap<String, SlotDefinition>,
}

impl BlockDefinition {
    pub fn new(name: &str) -> Self {
        Self { name: name.to_string(), ..Default::default() }
    }

    pub fn field(mut self, name: &str, declaration: crate::fields::Declaration) -> Self {
        self.fields.insert(name.to_string(), declaration);
        self
    }

    pub fn slot(mut self, name: &str, slot: SlotDefinition) -> Self {
        self.slots.insert(name.to_string(), slot);
        self
    }
}

/// A place inside a block that holds child blocks.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct SlotDefinition {
    #[serde(default)]
    pub label: Option<String>,

    /// Block names accepted in this slot; any block when unset.
    #[serde(default)]
    pub allowed_child_blocks: Option<Vec<String>>,
}

impl SlotDefinition {
    pub fn allowing(blocks: &[&str]) -> Self {
        Self {
            label: None,
            allowed_child_blocks: Some(blocks.iter().map(|b| b.to_string()).collect()),
        }
    }

    pub fn allows(&self, block: &str) -> bool {
        self.allowed_child_blocks.as_ref().is_none_or(|allowed| allowed.iter().any(|b| b == block))
    }
}
