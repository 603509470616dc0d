//! Cross references inside instance documents: `xs:key`/`xs:keyref` pairs declared in the
//! schema, and elements pointing at others through their identifier attribute.

use std::collections::{HashMap, HashSet};

use fm_xsd::{xstypes::XS_NAMESPACE, SchemaComponentTable, SchemaDocument};
use roxmltree::{Document, Node, NodeId};

use crate::{config::TreeConfig, loader::parsing_options};

/// One step of a restricted XPath: a child (or, after `//`, a descendant) with a given local
/// name, `*` matching any element
#[derive(Clone, Debug, PartialEq, Eq)]
struct Step {
    name: String,
    descendant: bool,
}

/// The subset of XPath identity constraints use in practice: `|`-separated relative paths of
/// element steps.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SelectorPath {
    alternatives: Vec<Vec<Step>>,
}

impl SelectorPath {
    pub fn parse(xpath: &str) -> Self {
        let alternatives = xpath
            .split('|')
            .map(|alternative| {
                let mut steps = Vec::new();
                let mut descendant = false;
                for part in alternative.trim().split('/') {
                    let part = part.trim();
                    let part = part.strip_prefix("child::").unwrap_or(part);
                    match part {
                        // Between the slashes of `//`
                        "" => descendant = true,
                        "." => {}
                        _ => {
                            let name = part.rsplit(':').next().unwrap_or(part);
                            steps.push(Step {
                                name: name.to_string(),
                                descendant,
                            });
                            descendant = false;
                        }
                    }
                }
                steps
            })
            .filter(|steps| !steps.is_empty())
            .collect();
        Self { alternatives }
    }

    /// The elements reached from `context`, in document order, without repetitions
    pub fn select<'a, 'input>(&self, context: Node<'a, 'input>) -> Vec<Node<'a, 'input>> {
        let mut selected = Vec::new();
        let mut seen = HashSet::new();
        for steps in &self.alternatives {
            let mut frontier = vec![context];
            for step in steps {
                let matches = |n: &Node| {
                    n.is_element() && (step.name == "*" || n.tag_name().name() == step.name)
                };
                frontier = frontier
                    .into_iter()
                    .flat_map(|n| {
                        if step.descendant {
                            n.descendants().skip(1).filter(matches).collect::<Vec<_>>()
                        } else {
                            n.children().filter(matches).collect::<Vec<_>>()
                        }
                    })
                    .collect();
            }
            for node in frontier {
                if seen.insert(node.id()) {
                    selected.push(node);
                }
            }
        }
        selected.sort_by_key(|n| n.id().get());
        selected
    }
}

/// An `xs:key`: the elements its selector reaches from each instance of the declaring element
/// are identified by their `field` attribute.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KeyDeclaration {
    pub name: String,
    /// Names of the enclosing element declarations, outermost first
    pub scope: Vec<String>,
    pub selector: SelectorPath,
    /// Attribute named by the field, if the field is a plain attribute step
    pub field: Option<String>,
}

/// An `xs:keyref`: the elements its selector reaches refer to entries of the key `refer`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KeyRefDeclaration {
    pub name: String,
    pub scope: Vec<String>,
    pub selector: SelectorPath,
    pub refer: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct KeyDeclarations {
    pub keys: Vec<KeyDeclaration>,
    pub key_refs: Vec<KeyRefDeclaration>,
}

fn local_part(name: &str) -> &str {
    name.rsplit(':').next().unwrap_or(name)
}

fn is_xs(node: &Node, name: &str) -> bool {
    node.is_element()
        && node.tag_name().namespace() == Some(XS_NAMESPACE)
        && node.tag_name().name() == name
}

impl KeyDeclarations {
    /// Scans a raw schema document for `xs:key` and `xs:keyref` elements.
    pub fn extract(schema: &Document) -> Self {
        let mut declarations = Self::default();
        for constraint in schema.descendants() {
            let is_key = is_xs(&constraint, "key");
            if !is_key && !is_xs(&constraint, "keyref") {
                continue;
            }
            let Some(name) = constraint.attribute("name") else {
                log::warn!("identity constraint without a name");
                continue;
            };
            let Some(selector) = constraint
                .children()
                .find(|c| is_xs(c, "selector"))
                .and_then(|c| c.attribute("xpath"))
            else {
                log::warn!("identity constraint {name} has no selector");
                continue;
            };
            let mut scope: Vec<String> = constraint
                .ancestors()
                .filter(|a| is_xs(a, "element"))
                .filter_map(|a| a.attribute("name").or_else(|| a.attribute("ref")))
                .map(|name| local_part(name).to_string())
                .collect();
            scope.reverse();
            let selector = SelectorPath::parse(selector);

            if is_key {
                let field = constraint
                    .children()
                    .find(|c| is_xs(c, "field"))
                    .and_then(|c| c.attribute("xpath"))
                    .and_then(|xpath| xpath.trim().strip_prefix('@'))
                    .filter(|attribute| !attribute.contains('/'))
                    .map(|attribute| local_part(attribute).to_string());
                declarations.keys.push(KeyDeclaration {
                    name: name.to_string(),
                    scope,
                    selector,
                    field,
                });
            } else {
                let Some(refer) = constraint.attribute("refer") else {
                    log::warn!("keyref {name} does not name the key it refers to");
                    continue;
                };
                declarations.key_refs.push(KeyRefDeclaration {
                    name: name.to_string(),
                    scope,
                    selector,
                    refer: local_part(refer).to_string(),
                });
            }
        }
        declarations
    }

    /// Scans every document of a schema. Documents that do not parse contribute nothing.
    pub fn extract_all(documents: &[SchemaDocument]) -> Self {
        let mut declarations = Self::default();
        for document in documents {
            match Document::parse_with_options(&document.text, parsing_options()) {
                Ok(doc) => {
                    let found = Self::extract(&doc);
                    declarations.keys.extend(found.keys);
                    declarations.key_refs.extend(found.key_refs);
                }
                Err(e) => log::warn!("skipping identity constraints of {}: {e}", document.location),
            }
        }
        log::debug!(
            "{} keys, {} keyrefs",
            declarations.keys.len(),
            declarations.key_refs.len()
        );
        declarations
    }
}

/// Whether `element` is an instance of the element declared at the end of `scope`: its own name
/// and those of its ancestors end with the scope's names.
fn in_scope(element: Node, scope: &[String]) -> bool {
    let mut ancestors = element.ancestors().filter(Node::is_element);
    scope
        .iter()
        .rev()
        .all(|name| ancestors.next().is_some_and(|a| a.tag_name().name() == name))
}

/// The first text node of `element` that is not blank, trimmed. Whitespace left by indentation
/// before child elements is skipped.
pub fn element_text<'a>(element: Node<'a, '_>) -> Option<&'a str> {
    element
        .children()
        .filter(Node::is_text)
        .filter_map(|t| t.text())
        .map(str::trim)
        .find(|t| !t.is_empty())
}

/// Names of attributes whose values identify their element document-wide: the configured
/// identifier attribute and every attribute declared with an `xs:ID` type.
pub fn id_attribute_names(components: &SchemaComponentTable, config: &TreeConfig) -> Vec<String> {
    let mut names = vec![config.id_attribute.clone()];
    for declaration in components.attribute_declarations() {
        if declaration.is_id(components) && !names.contains(&declaration.name) {
            names.push(declaration.name.clone());
        }
    }
    names
}

/// Lookup tables built once per loaded document. Elements are remembered by their
/// [`NodeId`], which is stable across parses of the same text.
#[derive(Clone, Debug, Default)]
pub struct ReferenceIndex {
    /// `keyName#value` to keyed element
    keys: HashMap<String, NodeId>,
    /// Referencing element to the name of the key it refers to
    referers: HashMap<NodeId, String>,
    ids: HashMap<String, NodeId>,
}

impl ReferenceIndex {
    pub fn build(doc: &Document, declarations: &KeyDeclarations, id_attributes: &[String]) -> Self {
        let mut index = Self::default();
        let elements: Vec<Node> = doc.descendants().filter(Node::is_element).collect();

        for key in &declarations.keys {
            let field = key
                .field
                .as_deref()
                .or_else(|| id_attributes.first().map(String::as_str))
                .unwrap_or("id");
            for scope in elements.iter().filter(|e| in_scope(**e, &key.scope)) {
                for keyed in key.selector.select(*scope) {
                    let Some(value) = keyed.attribute(field) else {
                        continue;
                    };
                    index
                        .keys
                        .entry(format!("{}#{}", key.name, value.trim()))
                        .or_insert(keyed.id());
                }
            }
        }

        for key_ref in &declarations.key_refs {
            for scope in elements.iter().filter(|e| in_scope(**e, &key_ref.scope)) {
                for referer in key_ref.selector.select(*scope) {
                    index
                        .referers
                        .entry(referer.id())
                        .or_insert_with(|| key_ref.refer.clone());
                }
            }
        }

        for element in &elements {
            for attribute in element.attributes() {
                if attribute.namespace().is_none()
                    && id_attributes.iter().any(|name| name == attribute.name())
                {
                    index
                        .ids
                        .entry(attribute.value().trim().to_string())
                        .or_insert(element.id());
                }
            }
        }

        log::debug!(
            "indexed {} keyed elements, {} references and {} identifiers",
            index.keys.len(),
            index.referers.len(),
            index.ids.len()
        );
        index
    }

    /// Whether a keyref selects `element`
    pub fn is_reference(&self, element: Node) -> bool {
        self.referers.contains_key(&element.id())
    }

    /// The element a key reference points at. Its value is its text, or else its reference
    /// attribute. Unresolvable references give `None`.
    pub fn resolve<'a, 'input>(
        &self,
        doc: &'a Document<'input>,
        element: Node,
        config: &TreeConfig,
    ) -> Option<Node<'a, 'input>> {
        let key = self.referers.get(&element.id())?;
        let value = element_text(element)
            .or_else(|| element.attribute(config.reference_attribute.as_str()))?;
        let target = self.keys.get(&format!("{key}#{}", value.trim())).copied();
        if target.is_none() {
            log::debug!("unresolved reference {key}#{value}");
        }
        target.and_then(|id| doc.get_node(id))
    }

    pub fn resolve_by_id<'a, 'input>(
        &self,
        doc: &'a Document<'input>,
        id: &str,
    ) -> Option<Node<'a, 'input>> {
        self.ids.get(id.trim()).and_then(|node| doc.get_node(*node))
    }

    /// Whether `element` refers to another one through its identifier
    pub fn is_id_reference(element: Node, config: &TreeConfig) -> bool {
        element.tag_name().name() == config.id_reference_tag
    }

    /// The element an identifier reference points at
    pub fn resolve_id_reference<'a, 'input>(
        &self,
        doc: &'a Document<'input>,
        element: Node,
        config: &TreeConfig,
    ) -> Option<Node<'a, 'input>> {
        let id = element
            .attribute(config.reference_attribute.as_str())
            .or_else(|| element_text(element))?;
        let target = self.resolve_by_id(doc, id);
        if target.is_none() {
            log::debug!("unresolved identifier reference {id}");
        }
        target
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCHEMA: &str = r#"
        <xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema" xmlns:p="urn:p">
          <xs:element name="entry">
            <xs:complexType>
              <xs:sequence>
                <xs:element name="interactorList">
                  <xs:complexType>
                    <xs:sequence>
                      <xs:element name="interactor" maxOccurs="unbounded"/>
                    </xs:sequence>
                  </xs:complexType>
                </xs:element>
                <xs:element name="participant" maxOccurs="unbounded"/>
              </xs:sequence>
            </xs:complexType>
            <xs:key name="interactorKey">
              <xs:selector xpath=".//p:interactor"/>
              <xs:field xpath="@id"/>
            </xs:key>
            <xs:keyref name="interactorRef" refer="p:interactorKey">
              <xs:selector xpath="./participant/interactorRef"/>
              <xs:field xpath="."/>
            </xs:keyref>
            <xs:unique name="ignored">
              <xs:selector xpath="participant"/>
              <xs:field xpath="@id"/>
            </xs:unique>
          </xs:element>
        </xs:schema>"#;

    const DOCUMENT: &str = r#"
        <set>
          <entry>
            <interactorList>
              <interactor id="1"><name>first</name></interactor>
              <interactor id="2"><name>second</name></interactor>
            </interactorList>
            <participant><interactorRef> 2 </interactorRef></participant>
            <participant><interactorRef>9</interactorRef></participant>
            <participant><refType ref="1"/></participant>
          </entry>
        </set>"#;

    fn declarations() -> KeyDeclarations {
        KeyDeclarations::extract(&Document::parse(SCHEMA).unwrap())
    }

    #[test]
    fn extracts_keys_and_keyrefs() {
        let declarations = declarations();
        assert_eq!(declarations.keys.len(), 1);
        assert_eq!(declarations.key_refs.len(), 1);

        let key = &declarations.keys[0];
        assert_eq!(key.scope, ["entry"]);
        assert_eq!(key.field.as_deref(), Some("id"));
        assert_eq!(declarations.key_refs[0].refer, "interactorKey");
    }

    #[test]
    fn selector_paths() {
        let doc = Document::parse(DOCUMENT).unwrap();
        let entry = doc.descendants().find(|n| n.has_tag_name("entry")).unwrap();
        assert_eq!(SelectorPath::parse(".//interactor").select(entry).len(), 2);
        assert_eq!(SelectorPath::parse("./interactor").select(entry).len(), 0);
        assert_eq!(
            SelectorPath::parse("interactorList/interactor | participant").select(entry).len(),
            5
        );
        assert_eq!(SelectorPath::parse("participant/*").select(entry).len(), 3);
    }

    #[test]
    fn key_references_resolve() {
        let doc = Document::parse(DOCUMENT).unwrap();
        let config = TreeConfig::flattener();
        let index = ReferenceIndex::build(&doc, &declarations(), &[String::from("id")]);

        let refs: Vec<Node> = doc
            .descendants()
            .filter(|n| n.has_tag_name("interactorRef"))
            .collect();
        assert!(index.is_reference(refs[0]));
        let target = index.resolve(&doc, refs[0], &config).unwrap();
        assert_eq!(target.attribute("id"), Some("2"));
        assert!(index.resolve(&doc, refs[1], &config).is_none());

        let id_ref = doc.descendants().find(|n| n.has_tag_name("refType")).unwrap();
        assert!(ReferenceIndex::is_id_reference(id_ref, &config));
        assert!(!index.is_reference(id_ref));
        let target = index.resolve_id_reference(&doc, id_ref, &config).unwrap();
        assert_eq!(element_text(target.first_element_child().unwrap()), Some("first"));
    }

    #[test]
    fn element_text_skips_blank_text_nodes() {
        let doc = Document::parse("<a>\n  <b/> v \n<c>w</c></a>").unwrap();
        assert_eq!(element_text(doc.root_element()), Some("v"));

        let doc = Document::parse("<a>\n  <b/>\n</a>").unwrap();
        assert_eq!(element_text(doc.root_element()), None);
    }
}
