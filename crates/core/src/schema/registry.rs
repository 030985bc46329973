//! Read-only lookup of collections and blocks.

use std::collections::HashMap;
use std::sync::Arc;

use super::discovery::SchemaRepository;
use super::errors::SchemaLoadError;
use super::types::{BlockDefinition, Collection};

/// Every known collection and block, by name.
#[derive(Debug, Default)]
pub struct SchemaRegistry {
    collections: HashMap<String, Arc<Collection>>,
    blocks: HashMap<String, Arc<BlockDefinition>>,
}

impl SchemaRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry from every file of a schema repository.
    pub fn from_repository(repo: &SchemaRepository) -> Result<Self, SchemaLoadError> {
        let mut registry = Self::new();
        for block in repo.load_blocks()? {
            registry.register_block(block)?;
        }
        for collection in repo.load_collections()? {
            registry.register_collection(collection)?;
        }
        registry.check_slots()?;
        tracing::info!(
            root = %repo.root.display(),
            collections = registry.collections.len(),
            blocks = registry.blocks.len(),
            "schema registry loaded"
        );
        Ok(registry)
    }

    pub fn register_collection(&mut self, collection: Collection) -> Result<(), SchemaLoadError> {
        if self.collections.contains_key(&collection.name) {
            return Err(SchemaLoadError::Duplicate { kind: "collection", name: collection.name });
        }
        self.collections.insert(collection.name.clone(), Arc::new(collection));
        Ok(())
    }

    pub fn register_block(&mut self, block: BlockDefinition) -> Result<(), SchemaLoadError> {
        if self.blocks.contains_key(&block.name) {
            return Err(SchemaLoadError::Duplicate { kind: "block", name: block.name });
        }
        self.blocks.insert(block.name.clone(), Arc::new(block));
        Ok(())
    }

    /// Builder form of [`register_collection`](Self::register_collection).
    pub fn with_collection(mut self, collection: Collection) -> Result<Self, SchemaLoadError> {
        self.register_collection(collection)?;
        Ok(self)
    }

    /// Builder form of [`register_block`](Self::register_block).
    pub fn with_block(mut self, block: BlockDefinition) -> Result<Self, SchemaLoadError> {
        self.register_block(block)?;
        Ok(self)
    }

    /// Ensure every slot allow-list names registered blocks.
    pub fn check_slots(&self) -> Result<(), SchemaLoadError> {
        for block in self.blocks.values() {
            for (slot_name, slot) in &block.slots {
                let Some(allowed) = &slot.allowed_child_blocks else { continue };
                if let Some(child) = allowed.iter().find(|b| !self.blocks.contains_key(*b)) {
                    return Err(SchemaLoadError::UnknownChildBlock {
                        block: block.name.clone(),
                        slot: slot_name.clone(),
                        child: child.clone(),
                    });
                }
            }
        }
        Ok(())
    }

    pub fn collection(&self, name: &str) -> Option<&Arc<Collection>> {
        self.collections.get(name)
    }

    pub fn block(&self, name: &str) -> Option<&Arc<BlockDefinition>> {
        self.blocks.get(name)
    }

    /// Collection names, sorted.
    pub fn collection_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.collections.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Block names, sorted.
    pub fn block_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.blocks.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields::{Declaration, FieldKind, Schema};
    use crate::schema::types::SlotDefinition;

    #[test]
    fn test_register_and_lookup() {
        let mut fields = Schema::new();
        fields.insert("title".into(), Declaration::new(FieldKind::Text));
        let registry = SchemaRegistry::new()
            .with_collection(Collection::new("posts", fields))
            .unwrap()
            .with_block(BlockDefinition::new("Hero"))
            .unwrap();

        assert!(registry.collection("posts").is_some());
        assert!(registry.collection("pages").is_none());
        assert_eq!(registry.block_names(), vec!["Hero"]);
    }

    #[test]
    fn test_duplicate_collection() {
        let mut registry = SchemaRegistry::new();
        registry.register_collection(Collection::new("posts", Schema::new())).unwrap();
        let err = registry.register_collection(Collection::new("posts", Schema::new())).unwrap_err();
        assert!(matches!(err, SchemaLoadError::Duplicate { kind: "collection", .. }));
    }

    #[test]
    fn test_unknown_child_block() {
        let registry = SchemaRegistry::new()
            .with_block(BlockDefinition::new("Gallery").slot("default", SlotDefinition::allowing(&["Image"])))
            .unwrap();
        assert!(matches!(registry.check_slots(), Err(SchemaLoadError::UnknownChildBlock { .. })));
    }
}
