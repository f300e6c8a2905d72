// Trust Wallet - Core Library
// Accessor-based persistence with deferred reference resolution and a
// symmetric link graph, plus the wallet entities built on it

pub mod error;
pub mod value;
pub mod accessor;       // Attribute descriptors bound to one live object
pub mod serializable;   // Serializable contract + tree traversal
pub mod linkable;       // Symmetric link graph keyed by (type, id)
pub mod attributes;     // Typed key → value maps
pub mod resolve;        // Registry + resolution pass
pub mod reader;         // Structural pass (XML → objects + pending ids)
pub mod writer;         // Objects → XML
pub mod config;
pub mod persist;        // Whole-document load/save
pub mod entities;

// Re-export commonly used types
pub use accessor::{AttributeKind, ChildKey, Descriptor, Placement, SerializationAccessor};
pub use attributes::{AttrKind, AttrValue, Attributes};
pub use config::{ConfigError, PersistConfig, ReaderConfig, WriterConfig};
pub use error::{ConversionError, LoadIssue, LoadReport, ReadError, WriteError};
pub use linkable::{
    ensure_bidirectional_links, link_entities, sever_links, unlink_entities,
    EntityRef, Link, LinkGraph, LinkSet, Linkable,
};
pub use persist::{load_file, load_str, save_file, save_string, Loaded};
pub use reader::{DocumentReader, Parsed, ProgressHook};
pub use resolve::{
    resolve_references, IdRegistry, PendingReferences, Registry, ResolutionSummary, Resolver,
};
pub use serializable::{visit_mut, visit_path, ObjectPath, Serializable};
pub use value::{ScalarValue, Value};
pub use writer::DocumentWriter;
pub use entities::{
    Account, AccountGroup, Cabinet, Category, Document, Filter, Tag, Transaction, Wallet,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
