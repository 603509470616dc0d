//! Model and parser for the parts of XML Schema (XSD 1.1) that describe document structure:
//! element and attribute declarations, complex and simple types and model groups. Identity
//! constraints are left to the consumers, which read them from the raw documents.

pub mod attribute_decl;
pub mod attribute_group_def;
pub mod attribute_use;
pub mod complex_type_def;
pub mod element_decl;
pub mod error;
pub mod import;
pub mod model_group;
pub mod model_group_def;
pub mod particle;
pub mod schema;
pub mod shared;
pub mod simple_type_def;
pub mod xstypes;

mod builtins;
mod components;
mod mapping_context;
mod values;

use std::collections::HashSet;

pub use attribute_decl::AttributeDeclaration;
pub use attribute_group_def::AttributeGroupDefinition;
pub use attribute_use::AttributeUse;
pub use complex_type_def::ComplexTypeDefinition;
pub use element_decl::ElementDeclaration;
pub use error::XsdError;
pub use model_group::{Compositor, ModelGroup};
pub use model_group_def::ModelGroupDefinition;
pub use particle::{MaxOccurs, Particle};
pub use schema::Schema;
pub use shared::{Term, TypeDefinition};
pub use simple_type_def::SimpleTypeDefinition;

pub use components::{ComponentTable, Named, Ref, SchemaComponentTable};
pub use import::{ImportError, ImportResolver, SchemaDocument};
use mapping_context::MappingContext;
pub use mapping_context::RootContext;

fn parsing_options() -> roxmltree::ParsingOptions {
    roxmltree::ParsingOptions {
        allow_dtd: true,
        ..Default::default()
    }
}

/// Loads `main` and, transitively, every document it includes or imports.
///
/// Documents that fail to load are reported and skipped; a schema is still usable without them
/// as long as nothing refers to their components.
fn collect_documents(main: SchemaDocument, resolver: &dyn ImportResolver) -> Vec<SchemaDocument> {
    let mut seen = HashSet::from([main.location.clone()]);
    let mut documents = vec![main];
    let mut next = 0;

    while next < documents.len() {
        let mut found = Vec::new();
        {
            let current = &documents[next];
            let Ok(doc) = roxmltree::Document::parse_with_options(&current.text, parsing_options())
            else {
                // Reported when the documents are mapped
                next += 1;
                continue;
            };
            for import in Schema::imports(doc.root_element()) {
                let Some(location) = import.schema_location else {
                    log::debug!("import of {:?} without schemaLocation", import.namespace);
                    continue;
                };
                match resolver.resolve_import(&current.location, &location) {
                    Ok(document) => found.push(document),
                    Err(e) => log::warn!("failed to resolve {location} from {}: {e}", current.location),
                }
            }
        }
        for document in found {
            if seen.insert(document.location.clone()) {
                log::debug!("loaded schema document {}", document.location);
                documents.push(document);
            }
        }
        next += 1;
    }

    documents
}

/// Reads a schema from its main document, following `<include>`s and `<import>`s through
/// `resolver`.
pub fn read_schema(
    main: SchemaDocument,
    resolver: &dyn ImportResolver,
) -> Result<(Schema, SchemaComponentTable), XsdError> {
    let documents = collect_documents(main, resolver);

    let mut parsed = Vec::with_capacity(documents.len());
    for (index, document) in documents.iter().enumerate() {
        match roxmltree::Document::parse_with_options(&document.text, parsing_options()) {
            Ok(doc) if Schema::is_schema_element(doc.root_element()) => parsed.push(doc),
            Ok(doc) if index == 0 => {
                return Err(XsdError::NotASchema(
                    doc.root_element().tag_name().name().to_string(),
                ))
            }
            Err(e) if index == 0 => return Err(e.into()),
            Ok(_) => log::warn!("{} is not a schema document, skipping", document.location),
            Err(e) => log::warn!("failed to parse {}: {e}", document.location),
        }
    }

    let mut root_context = RootContext::new();
    builtins::register_builtins(&mut root_context);

    let mut top_levels = Vec::with_capacity(parsed.len());
    for doc in &parsed {
        top_levels.push(Schema::reserve_top_level(
            &mut root_context,
            doc.root_element(),
        )?);
    }

    let mut schema = Schema {
        target_namespace: parsed[0]
            .root_element()
            .attribute("targetNamespace")
            .map(str::to_string),
        ..Default::default()
    };
    for (doc, top_level) in parsed.iter().zip(&top_levels) {
        schema.map_from_xml(&mut root_context, doc.root_element(), top_level)?;
    }

    let components = root_context
        .into_components()
        .convert_to_schema_table()?;
    Ok((schema, components))
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NoImports;

    impl ImportResolver for NoImports {
        fn resolve_import(&self, _: &str, _: &str) -> Result<SchemaDocument, ImportError> {
            Err(ImportError::UnsupportedImport)
        }
    }

    fn read_schema_str(text: &str) -> Result<(Schema, SchemaComponentTable), XsdError> {
        read_schema(
            SchemaDocument {
                location: String::from("schema.xsd"),
                text: text.to_string(),
            },
            &NoImports,
        )
    }

    const SCHEMA: &str = r#"
        <xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
          <xs:element name="Root">
            <xs:complexType>
              <xs:sequence>
                <xs:element name="A" type="AType" maxOccurs="unbounded"/>
                <xs:element ref="Target" minOccurs="0"/>
              </xs:sequence>
            </xs:complexType>
            <xs:key name="aKey">
              <xs:selector xpath="./A"/>
              <xs:field xpath="@id"/>
            </xs:key>
          </xs:element>
          <xs:element name="Target" type="xs:string"/>
          <xs:complexType name="AType">
            <xs:complexContent>
              <xs:extension base="Base">
                <xs:choice>
                  <xs:element name="x" type="xs:int"/>
                  <xs:element name="y" type="xs:string"/>
                </xs:choice>
              </xs:extension>
            </xs:complexContent>
          </xs:complexType>
          <xs:complexType name="Base">
            <xs:attribute name="id" type="xs:ID" use="required"/>
          </xs:complexType>
        </xs:schema>"#;

    #[test]
    fn forward_references_resolve() {
        let (schema, table) = read_schema_str(SCHEMA).unwrap();
        assert_eq!(schema.element_declarations.len(), 2);

        let root = schema.element_declaration_by_name("Root", &table).unwrap();
        let root = root.get(&table);
        assert!(!root.nillable && !root.abstract_);

        let root_type = root.complex_type().unwrap().get(&table);
        let particle = root_type.content_type.particle().unwrap().get(&table);
        let group = particle.term.model_group(&table).unwrap().get(&table);
        assert_eq!(group.compositor, Compositor::Sequence);
        assert_eq!(group.particles.len(), 2);

        let a = group.particles[0].get(&table);
        assert_eq!(a.max_occurs, MaxOccurs::Unbounded);
        let Term::ElementDeclaration(a_decl) = a.term else {
            panic!("expected an element");
        };
        let a_type = a_decl.get(&table).complex_type().unwrap().get(&table);
        let base = a_type.extended_base().unwrap().get(&table);
        let id_use = base.all_attribute_uses(&table)[0].get(&table);
        assert!(id_use.required);
        assert!(id_use.attribute_declaration.get(&table).is_id(&table));
    }

    #[test]
    fn unresolved_type_is_an_error() {
        let err = read_schema_str(
            r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
                 <xs:element name="E" type="Missing"/>
               </xs:schema>"#,
        )
        .err()
        .unwrap();
        assert!(matches!(err, XsdError::UnresolvedReference { .. }));
    }

    #[test]
    fn non_schema_root_is_rejected() {
        let err = read_schema_str("<html/>").err().unwrap();
        assert!(matches!(err, XsdError::NotASchema(name) if name == "html"));
    }
}
