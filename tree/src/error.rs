use fm_flatfile::{FlatFileError, SourceError};
use fm_xsd::XsdError;
use thiserror::Error;

/// Why a schema or an instance document could not be acquired
#[derive(Debug, Error)]
pub enum LoadError {
    #[error(transparent)]
    Source(#[from] SourceError),
    #[error(transparent)]
    Xml(#[from] roxmltree::Error),
    #[error(transparent)]
    Schema(#[from] XsdError),
    #[error("the schema declares no global element")]
    NoGlobalElement,
}

#[derive(Debug, Error)]
pub enum TreeError {
    #[error("failed to load schema {location}: {source}")]
    SchemaLoad {
        location: String,
        #[source]
        source: LoadError,
    },
    #[error("failed to load document {location}: {source}")]
    DocumentLoad {
        location: String,
        #[source]
        source: LoadError,
    },
    #[error("no node at path {0:?}")]
    PathNotFound(String),
    #[error("{choice:?} is not an alternative of the choice at {path:?}")]
    UnknownChoice { path: String, choice: String },
    #[error("invalid filter {pattern:?}: {source}")]
    InvalidFilter {
        pattern: String,
        #[source]
        source: regex::Error,
    },
    #[error("invalid mapping: {0}")]
    Mapping(String),
    #[error("no schema loaded")]
    NoSchema,
    #[error("no document loaded")]
    NoDocument,
    #[error("failed to write XML: {0}")]
    XmlWrite(String),
    #[error(transparent)]
    FlatFile(#[from] FlatFileError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl TreeError {
    pub(crate) fn schema_load(location: &str, source: impl Into<LoadError>) -> Self {
        Self::SchemaLoad {
            location: location.to_string(),
            source: source.into(),
        }
    }

    pub(crate) fn document_load(location: &str, source: impl Into<LoadError>) -> Self {
        Self::DocumentLoad {
            location: location.to_string(),
            source: source.into(),
        }
    }

    pub(crate) fn xml_write(error: impl std::fmt::Display) -> Self {
        Self::XmlWrite(error.to_string())
    }
}
