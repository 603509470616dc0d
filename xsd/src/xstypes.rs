use super::error::XsdError;
use std::fmt;

pub type NCName = String;
pub type AnyURI = String;

pub const XS_NAMESPACE: &str = "http://www.w3.org/2001/XMLSchema";

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct QName {
    pub namespace_name: Option<AnyURI>,
    pub local_name: NCName,
}

impl fmt::Display for QName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(namespace_name) = self.namespace_name.as_ref() {
            write!(f, "{{{}}}:{}", namespace_name, self.local_name)
        } else {
            write!(f, "{}", self.local_name)
        }
    }
}

impl QName {
    pub fn with_namespace(
        namespace_name: impl Into<String>,
        local_name: impl Into<String>,
    ) -> Self {
        Self::with_optional_namespace(Some(namespace_name), local_name)
    }

    pub fn with_optional_namespace(
        namespace_name: Option<impl Into<String>>,
        local_name: impl Into<String>,
    ) -> Self {
        Self {
            namespace_name: namespace_name.map(Into::into),
            local_name: local_name.into(),
        }
    }

    /// A name in the XML Schema namespace, e.g. `xs:string`
    pub fn xs(local_name: impl Into<String>) -> Self {
        Self::with_namespace(XS_NAMESPACE, local_name)
    }

    pub fn qualified(
        prefix: impl AsRef<str>,
        local_name: impl Into<String>,
        context: roxmltree::Node,
    ) -> Result<Self, XsdError> {
        let prefix = prefix.as_ref();
        let resolved_prefix = if prefix == "xml" {
            // The prefix xml is bound to this namespace by definition
            // (Namespaces in XML 1.0, §3)
            "http://www.w3.org/XML/1998/namespace"
        } else {
            context
                .lookup_namespace_uri(Some(prefix))
                .ok_or_else(|| XsdError::NamePrefixNotResolved(prefix.into()))?
        };
        Ok(Self::with_namespace(resolved_prefix, local_name))
    }

    pub fn unqualified(local_name: impl Into<String>, context: roxmltree::Node) -> Self {
        // An unprefixed name takes the default namespace in scope, if any
        // (Namespaces in XML 1.0, §6.2)
        let namespace_name = context.lookup_namespace_uri(None);
        QName::with_optional_namespace(namespace_name, local_name)
    }

    pub fn parse(source: &str, context: roxmltree::Node) -> Result<Self, XsdError> {
        if let Some((prefix, local)) = source.trim().rsplit_once(':') {
            Self::qualified(prefix, local, context)
        } else {
            Ok(Self::unqualified(source.trim(), context))
        }
    }

    pub fn is_xs(&self, local_name: &str) -> bool {
        self.namespace_name.as_deref() == Some(XS_NAMESPACE) && self.local_name == local_name
    }
}

pub type Sequence<T> = Vec<T>;
pub type Set<T> = Vec<T>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_resolves_prefix_and_default_namespace() {
        let doc = roxmltree::Document::parse(
            r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema" xmlns="urn:test"/>"#,
        )
        .unwrap();
        let root = doc.root_element();

        let string = QName::parse("xs:string", root).unwrap();
        assert!(string.is_xs("string"));

        let local = QName::parse("entry", root).unwrap();
        assert_eq!(local, QName::with_namespace("urn:test", "entry"));
        assert_eq!(local.to_string(), "{urn:test}:entry");
    }

    #[test]
    fn unknown_prefix_is_an_error() {
        let doc = roxmltree::Document::parse("<schema/>").unwrap();
        let err = QName::parse("foo:bar", doc.root_element()).unwrap_err();
        assert!(matches!(err, XsdError::NamePrefixNotResolved(p) if p == "foo"));
    }
}
