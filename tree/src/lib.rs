//! Conversion between XML documents and flat files, driven by a tree built from an XML Schema.
//!
//! The [`SchemaTree`] mirrors the element and attribute structure a schema allows, materialised
//! lazily. The [`Flattener`] binds a document to it and writes one delimited line per occurrence
//! of a line node; the [`XmlMaker`] goes the other way and assembles documents from flat file
//! records. Both persist their setup as XML mapping files.

pub mod aligner;
pub mod check;
pub mod config;
pub mod error;
pub mod flattener;
pub mod loader;
pub mod maker;
pub mod mapping;
pub mod node;
pub mod references;
pub mod schema_tree;
pub mod selection;
pub mod validation;
pub mod writer;

pub use check::{FlattenerCheck, NodeCheck};
pub use config::{TreeConfig, DEFAULT_SEPARATOR};
pub use error::{LoadError, TreeError};
pub use flattener::Flattener;
pub use loader::{load_schema, mapping_location, LoadedSchema};
pub use maker::{MakerCheck, XmlMaker};
pub use mapping::{
    DictionaryAssociation, DictionaryMapping, FieldReference, FlatFileMapping, FlattenerMapping,
    MakerMapping, TreeMapping,
};
pub use node::{NodeKind, NodeRef, SchemaNode};
pub use schema_tree::{ExpansionRecord, SchemaTree};
pub use selection::{Filter, SelectionModel};
pub use validation::{validate_document, ErrorCollector, ValidationProblem};
pub use writer::FlatWriter;
