use roxmltree::Node;
use thiserror::Error;

use super::xstypes::XS_NAMESPACE;

/// A schema document as loaded from its location
#[derive(Clone, Debug)]
pub struct SchemaDocument {
    /// The location the document was loaded from; relative `schemaLocation`s of its
    /// `<include>`/`<import>`s resolve against it.
    pub location: String,
    pub text: String,
}

/// This structure represents `include`, `import`, `redefine` and `override` elements; they are
/// not schema components.
#[derive(Clone, Debug)]
pub struct Import {
    pub namespace: Option<String>,
    pub schema_location: Option<String>,
}

impl Import {
    pub const TAG_NAMES: [&'static str; 4] = ["include", "import", "redefine", "override"];

    pub fn map_from_xml(import: Node) -> Option<Self> {
        if import.tag_name().namespace() != Some(XS_NAMESPACE)
            || !Self::TAG_NAMES.contains(&import.tag_name().name())
        {
            return None;
        }
        Some(Import {
            namespace: import.attribute("namespace").map(str::to_string),
            schema_location: import.attribute("schemaLocation").map(str::to_string),
        })
    }
}

#[derive(Debug, Error)]
pub enum ImportError {
    #[error("the resolver does not support the import")]
    UnsupportedImport,
    #[error("an unspecified error occurred while loading the schema")]
    UnspecifiedLoad(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// Loads the schema documents named by `schemaLocation`s.
pub trait ImportResolver {
    /// Loads `schema_location` relative to `base`, the location of the importing document.
    fn resolve_import(
        &self,
        base: &str,
        schema_location: &str,
    ) -> Result<SchemaDocument, ImportError>;
}
