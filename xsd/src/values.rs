use crate::{error::XsdError, particle::MaxOccurs, xstypes::QName};
use roxmltree::Node;

/// Conversion of an attribute's lexical value into its actual value
pub trait ActualValue<'a>: Sized {
    fn convert(src: &'a str, parent: Node) -> Result<Self, String>;
}

impl<'a> ActualValue<'a> for &'a str {
    fn convert(src: &'a str, _parent: Node) -> Result<Self, String> {
        Ok(src)
    }
}

impl ActualValue<'_> for String {
    fn convert(src: &'_ str, _parent: Node) -> Result<Self, String> {
        Ok(src.to_string())
    }
}

impl ActualValue<'_> for QName {
    fn convert(src: &'_ str, parent: Node) -> Result<Self, String> {
        QName::parse(src, parent).map_err(|e| e.to_string())
    }
}

impl ActualValue<'_> for bool {
    fn convert(src: &str, _parent: Node) -> Result<Self, String> {
        match src.trim() {
            "true" | "1" => Ok(true),
            "false" | "0" => Ok(false),
            other => Err(format!("invalid boolean {other:?}")),
        }
    }
}

impl ActualValue<'_> for u64 {
    fn convert(src: &str, _parent: Node) -> Result<Self, String> {
        src.trim().parse().map_err(|e| format!("{e}"))
    }
}

impl ActualValue<'_> for MaxOccurs {
    fn convert(src: &str, _parent: Node) -> Result<Self, String> {
        match src.trim() {
            "unbounded" => Ok(MaxOccurs::Unbounded),
            count => count
                .parse()
                .map(MaxOccurs::Count)
                .map_err(|e| format!("{e}")),
        }
    }
}

/// Reads and converts the attribute `name` of `node`, if present.
pub fn attribute_value<'a, T: ActualValue<'a>>(
    node: Node<'a, '_>,
    name: &'static str,
) -> Result<Option<T>, XsdError> {
    node.attribute(name)
        .map(|value| {
            T::convert(value, node).map_err(|_| XsdError::InvalidAttributeValue {
                attribute: name,
                value: value.to_string(),
            })
        })
        .transpose()
}

/// Like [`attribute_value`], but the attribute must be present.
pub fn required_attribute_value<'a, T: ActualValue<'a>>(
    node: Node<'a, '_>,
    name: &'static str,
) -> Result<T, XsdError> {
    attribute_value(node, name)?.ok_or_else(|| XsdError::MissingAttribute {
        element: node.tag_name().name().to_string(),
        attribute: name,
    })
}
