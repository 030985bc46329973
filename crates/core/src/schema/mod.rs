//! Collection and block schemas.
//!
//! Collections describe stored records; blocks are named, reusable field
//! groups with slots that hold child blocks. Both are read-only lookup tables
//! for the field engine, loaded programmatically or from YAML/JSON files:
//!
//! ```yaml
//! # schema/blocks/gallery.yaml
//! fields:
//!   title: { type: text, options: { required: true } }
//! slots:
//!   default:
//!     allowed-child-blocks: [Image]
//! ```

pub mod discovery;
pub mod errors;
pub mod registry;
pub mod types;

pub use discovery::{SchemaFileInfo, SchemaRepository};
pub use errors::SchemaLoadError;
pub use registry::SchemaRegistry;
pub use types::{BlockDefinition, Collection, SchemaKind, SlotDefinition};
