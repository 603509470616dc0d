use thiserror::Error;

use super::xstypes::QName;

#[derive(Debug, Error)]
pub enum XsdError {
    #[error("failed to parse schema document: {0}")]
    Xml(#[from] roxmltree::Error),
    #[error("root element is <{0}>, expected <schema>")]
    NotASchema(String),
    #[error("failed to resolve prefix {0:?} to a namespace URI")]
    NamePrefixNotResolved(String),
    #[error("no {kind} named {name}")]
    UnresolvedReference { kind: &'static str, name: QName },
    #[error("<{element}> is missing the required attribute {attribute:?}")]
    MissingAttribute {
        element: String,
        attribute: &'static str,
    },
    #[error("invalid value {value:?} for attribute {attribute:?}")]
    InvalidAttributeValue {
        attribute: &'static str,
        value: String,
    },
    #[error("<{element}> is missing a <{child}> child")]
    MissingChild {
        element: String,
        child: &'static str,
    },
    #[error("unexpected <{0}> in schema")]
    UnexpectedElement(String),
    #[error("a {0} was reserved but never mapped")]
    IncompleteComponent(&'static str),
    #[error("failed to load {location}: {reason}")]
    Import { location: String, reason: String },
}
