//! Acquisition of schemas and instance documents from paths or URLs.

use std::cell::RefCell;
use std::path::Path;

use fm_flatfile::source;
use fm_xsd::{ImportError, ImportResolver, Schema, SchemaComponentTable, SchemaDocument};

use crate::error::{LoadError, TreeError};

/// A schema together with the raw documents it was read from. The raw documents are kept for
/// the identity constraint scan.
pub struct LoadedSchema {
    pub location: String,
    pub schema: Schema,
    pub components: SchemaComponentTable,
    pub documents: Vec<SchemaDocument>,
}

/// Resolves `schemaLocation`s through [`source`], so that included documents may live on the
/// web like the main one. Every document it hands out is remembered.
#[derive(Default)]
struct SourceResolver {
    loaded: RefCell<Vec<SchemaDocument>>,
}

impl ImportResolver for SourceResolver {
    fn resolve_import(
        &self,
        base: &str,
        schema_location: &str,
    ) -> Result<SchemaDocument, ImportError> {
        let location = source::resolve_relative(base, schema_location);
        let text = source::read_text(&location)
            .map_err(|e| ImportError::UnspecifiedLoad(Box::new(e)))?;
        let document = SchemaDocument { location, text };
        self.loaded.borrow_mut().push(document.clone());
        Ok(document)
    }
}

pub(crate) fn parsing_options() -> roxmltree::ParsingOptions {
    roxmltree::ParsingOptions {
        allow_dtd: true,
        ..Default::default()
    }
}

fn read_schema(main: SchemaDocument) -> Result<LoadedSchema, TreeError> {
    let location = main.location.clone();
    let resolver = SourceResolver::default();
    let (schema, components) = fm_xsd::read_schema(main.clone(), &resolver)
        .map_err(|e| TreeError::schema_load(&location, e))?;

    let mut documents = vec![main];
    for document in resolver.loaded.into_inner() {
        if documents.iter().all(|d| d.location != document.location) {
            documents.push(document);
        }
    }
    log::info!(
        "schema {location}: {} documents, {} global elements",
        documents.len(),
        schema.element_declarations.len()
    );
    Ok(LoadedSchema {
        location,
        schema,
        components,
        documents,
    })
}

pub fn load_schema(location: &str) -> Result<LoadedSchema, TreeError> {
    let text = source::read_text(location).map_err(|e| TreeError::schema_load(location, e))?;
    read_schema(SchemaDocument {
        location: location.to_string(),
        text,
    })
}

/// Reads a schema held in memory; relative includes resolve against the working directory.
pub fn schema_from_str(text: &str) -> Result<LoadedSchema, TreeError> {
    read_schema(SchemaDocument {
        location: String::from("schema.xsd"),
        text: text.to_string(),
    })
}

/// Reads an instance document and checks that it is well-formed.
pub fn load_document(location: &str) -> Result<String, TreeError> {
    let text = source::read_text(location).map_err(|e| TreeError::document_load(location, e))?;
    check_well_formed(location, &text)?;
    Ok(text)
}

pub(crate) fn check_well_formed(location: &str, text: &str) -> Result<(), TreeError> {
    roxmltree::Document::parse_with_options(text, parsing_options())
        .map(|_| ())
        .map_err(|e| TreeError::document_load(location, LoadError::Xml(e)))
}

/// Makes a location read from a mapping file independent of the working directory: relative
/// paths resolve against the mapping's own location and then against the working directory.
pub fn mapping_location(mapping: &str, location: &str) -> String {
    let resolved = source::resolve_relative(mapping, location);
    if source::is_url(&resolved) || Path::new(&resolved).is_absolute() {
        return resolved;
    }
    match std::env::current_dir() {
        Ok(dir) => dir.join(&resolved).to_string_lossy().into_owned(),
        Err(_) => resolved,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn included_documents_are_kept() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("main.xsd"),
            r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
                 <xs:include schemaLocation="types.xsd"/>
                 <xs:element name="root" type="RootType"/>
               </xs:schema>"#,
        )
        .unwrap();
        std::fs::write(
            dir.path().join("types.xsd"),
            r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
                 <xs:complexType name="RootType">
                   <xs:attribute name="id" type="xs:string"/>
                 </xs:complexType>
               </xs:schema>"#,
        )
        .unwrap();

        let main = dir.path().join("main.xsd");
        let loaded = load_schema(main.to_str().unwrap()).unwrap();
        assert_eq!(loaded.documents.len(), 2);
        assert!(loaded.documents[1].location.ends_with("types.xsd"));
        assert_eq!(loaded.schema.element_declarations.len(), 1);
    }

    #[test]
    fn missing_schema_is_a_load_error() {
        let err = load_schema("/nonexistent/schema.xsd").err().unwrap();
        assert!(matches!(err, TreeError::SchemaLoad { .. }));
    }

    #[test]
    fn malformed_document_is_a_load_error() {
        let err = check_well_formed("doc.xml", "<a><b></a>").unwrap_err();
        assert!(matches!(err, TreeError::DocumentLoad { .. }));
    }
}
