use std::collections::HashMap;

use roxmltree::{Document, Node};

use crate::{
    config::TreeConfig,
    node::NodeRef,
    references::{element_text, ReferenceIndex},
    schema_tree::SchemaTree,
    selection::SelectionModel,
};

/// A document aligned with a schema tree for one conversion.
///
/// Document elements are matched to tree nodes by tag name, or by following identifier and key
/// references. The largest number of instances of each node found under one parent, across all
/// rows, is memoised; it sizes the output columns reserved for the node.
pub struct DocumentBinding<'a, 'input> {
    doc: &'a Document<'input>,
    tree: &'a SchemaTree,
    selection: &'a SelectionModel,
    references: &'a ReferenceIndex,
    config: &'a TreeConfig,
    line_node: NodeRef,
    max_counts: HashMap<NodeRef, usize>,
}

impl<'a, 'input> DocumentBinding<'a, 'input> {
    pub fn new(
        doc: &'a Document<'input>,
        tree: &'a SchemaTree,
        selection: &'a SelectionModel,
        references: &'a ReferenceIndex,
        line_node: NodeRef,
    ) -> Self {
        Self {
            doc,
            tree,
            selection,
            references,
            config: tree.config(),
            line_node,
            max_counts: HashMap::new(),
        }
    }

    pub fn tree(&self) -> &'a SchemaTree {
        self.tree
    }

    pub fn selection(&self) -> &'a SelectionModel {
        self.selection
    }

    pub fn line_node(&self) -> NodeRef {
        self.line_node
    }

    /// Whether a document element is the counterpart of the tree node named `name`, directly or
    /// through a reference. The interpretations are tried in order and the first match wins.
    fn counterpart(&self, child: Node<'a, 'input>, name: &str) -> Option<Node<'a, 'input>> {
        if child.tag_name().name() == name {
            return Some(child);
        }
        if ReferenceIndex::is_id_reference(child, self.config) {
            if let Some(target) = self
                .references
                .resolve_id_reference(self.doc, child, self.config)
                .filter(|t| t.tag_name().name() == name)
            {
                return Some(target);
            }
        }
        if self.references.is_reference(child) {
            return self
                .references
                .resolve(self.doc, child, self.config)
                .filter(|t| t.tag_name().name() == name);
        }
        None
    }

    /// The document elements matching `node` below `parent`, in document order.
    ///
    /// When the tree holds several copies of `node`, the n-th copy takes the n-th match and the
    /// last copy takes all remaining ones.
    pub fn matches(&self, node: NodeRef, parent: Node<'a, 'input>) -> Vec<Node<'a, 'input>> {
        let name = self.tree.node(node).name();
        let mut found: Vec<Node<'a, 'input>> = parent
            .children()
            .filter(Node::is_element)
            .filter_map(|child| self.counterpart(child, name))
            .collect();

        let copies = self.tree.copies_of(node);
        if copies.len() > 1 {
            let copy = copies.iter().position(|c| *c == node).unwrap_or_default();
            found = if copy + 1 < copies.len() {
                found.get(copy).copied().into_iter().collect()
            } else {
                found.into_iter().skip(copy).collect()
            };
        }
        found
    }

    /// Whether `element` passes the filters of `node` and of its attributes. Missing attributes
    /// are tested as empty values.
    pub fn passes(&self, node: NodeRef, element: Node) -> bool {
        if let Some(filter) = self.selection.filter(node) {
            if !filter.is_match(element_text(element).unwrap_or_default()) {
                return false;
            }
        }
        self.tree.node(node).children().iter().all(|child| {
            let child_node = self.tree.node(*child);
            match self.selection.filter(*child) {
                Some(filter) if child_node.is_attribute() => {
                    filter.is_match(element.attribute(child_node.name()).unwrap_or_default())
                }
                _ => true,
            }
        })
    }

    /// The instances of `node` below `parent` that are written out: its matches passing their
    /// filters.
    pub fn instances(&self, node: NodeRef, parent: Node<'a, 'input>) -> Vec<Node<'a, 'input>> {
        self.matches(node, parent)
            .into_iter()
            .filter(|e| self.passes(node, *e))
            .collect()
    }

    /// Every document element reached by following the path of `node` from the document root.
    /// Ancestors are filtered; the instances of `node` itself are not.
    pub fn elements_matching(&self, node: NodeRef) -> Vec<Node<'a, 'input>> {
        let path = self.tree.element_path(node);
        let Some((first, rest)) = path.split_first() else {
            return Vec::new();
        };
        let root = self.doc.root_element();
        if root.tag_name().name() != self.tree.node(*first).name() {
            log::warn!(
                "document root <{}> does not match schema root <{}>",
                root.tag_name().name(),
                self.tree.node(*first).name()
            );
            return Vec::new();
        }

        let mut frontier = vec![root];
        for (depth, step) in rest.iter().enumerate() {
            let last = depth + 1 == rest.len();
            frontier = frontier
                .into_iter()
                .flat_map(|parent| {
                    if last {
                        self.matches(*step, parent)
                    } else {
                        self.instances(*step, parent)
                    }
                })
                .collect();
        }
        frontier
    }

    /// The document instances of the line node, one per output row
    pub fn line_elements(&self) -> Vec<Node<'a, 'input>> {
        self.elements_matching(self.line_node)
    }

    /// Number of instances of the last node of `path` below `element`: summed over the last
    /// step, maximised over intermediate ones.
    fn count(&self, element: Node<'a, 'input>, path: &[NodeRef]) -> usize {
        match path {
            [] => 1,
            [target] => self.instances(*target, element).len(),
            [next, rest @ ..] => self
                .instances(*next, element)
                .into_iter()
                .map(|child| self.count(child, rest))
                .max()
                .unwrap_or_default(),
        }
    }

    /// Number of blocks reserved for `node` in every row: the largest number of instances
    /// found under one parent instance, never less than one nor than the declared minimum.
    /// Attributes take the count of their element.
    pub fn max_count(&mut self, node: NodeRef) -> usize {
        if let Some(count) = self.max_counts.get(&node) {
            return *count;
        }
        let tree_node = self.tree.node(node);
        let count = if tree_node.is_attribute() {
            match self.tree.owning_element(node) {
                Some(element) => self.max_count(element),
                None => 1,
            }
        } else {
            let floor = usize::try_from(tree_node.min_occurs())
                .unwrap_or(usize::MAX)
                .max(1);
            self.count_from_anchor(node).max(floor)
        };
        self.max_counts.insert(node, count);
        count
    }

    fn count_from_anchor(&self, node: NodeRef) -> usize {
        let path = self.tree.element_path(node);
        let line_path = self.tree.element_path(self.line_node);
        if path.len() <= line_path.len() || !path.starts_with(&line_path) {
            // The line node itself, its ancestors and nodes outside of it occur once per row
            // as far as the writer is concerned
            if line_path.starts_with(&path) {
                return 1;
            }
            let root = self.doc.root_element();
            return match path.first() {
                Some(first) if root.tag_name().name() == self.tree.node(*first).name() => {
                    self.count(root, &path[1..])
                }
                _ => 0,
            };
        }
        let below = &path[line_path.len()..];
        self.line_elements()
            .into_iter()
            .map(|line| self.count(line, below))
            .max()
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{loader::schema_from_str, references::KeyDeclarations};

    const SCHEMA: &str = r#"
        <xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
          <xs:element name="set">
            <xs:complexType>
              <xs:sequence>
                <xs:element name="group" maxOccurs="unbounded">
                  <xs:complexType>
                    <xs:sequence>
                      <xs:element name="item" minOccurs="0" maxOccurs="unbounded">
                        <xs:complexType>
                          <xs:simpleContent>
                            <xs:extension base="xs:string">
                              <xs:attribute name="kind" type="xs:string"/>
                            </xs:extension>
                          </xs:simpleContent>
                        </xs:complexType>
                      </xs:element>
                      <xs:element name="note" type="xs:string" minOccurs="2" maxOccurs="2"/>
                    </xs:sequence>
                  </xs:complexType>
                </xs:element>
              </xs:sequence>
            </xs:complexType>
          </xs:element>
        </xs:schema>"#;

    const DOCUMENT: &str = r#"
        <set>
          <group><item kind="a">1</item><item kind="b">2</item><item kind="a">3</item></group>
          <group><item kind="b">4</item></group>
          <group/>
        </set>"#;

    struct Fixture {
        tree: SchemaTree,
        selection: SelectionModel,
        references: ReferenceIndex,
    }

    fn fixture() -> Fixture {
        let tree =
            SchemaTree::from_loaded(schema_from_str(SCHEMA).unwrap(), TreeConfig::flattener())
                .unwrap();
        Fixture {
            tree,
            selection: SelectionModel::default(),
            references: ReferenceIndex::default(),
        }
    }

    #[test]
    fn max_count_is_the_largest_sibling_count() {
        let mut f = fixture();
        let group = f.tree.resolve_path("0").unwrap();
        let item = f.tree.resolve_path("0.0").unwrap();
        let kind = f.tree.resolve_path("0.0.0").unwrap();
        let note = f.tree.resolve_path("0.1").unwrap();
        let doc = Document::parse(DOCUMENT).unwrap();

        let mut binding = DocumentBinding::new(&doc, &f.tree, &f.selection, &f.references, group);
        assert_eq!(binding.line_elements().len(), 3);
        assert_eq!(binding.elements_matching(item).len(), 4);
        assert_eq!(binding.max_count(item), 3);
        assert_eq!(binding.max_count(kind), 3);
        assert_eq!(binding.max_count(note), 2, "floored at minOccurs");
        assert_eq!(binding.max_count(group), 1);

        let mut binding =
            DocumentBinding::new(&doc, &f.tree, &f.selection, &f.references, f.tree.root());
        assert_eq!(binding.max_count(group), 3);
        assert_eq!(binding.max_count(item), 3);
    }

    #[test]
    fn filtered_instances_do_not_count() {
        let mut f = fixture();
        let group = f.tree.resolve_path("0").unwrap();
        let item = f.tree.resolve_path("0.0").unwrap();
        let kind = f.tree.resolve_path("0.0.0").unwrap();
        f.selection.select(kind);
        f.selection.set_filter(kind, Some("a")).unwrap();
        let doc = Document::parse(DOCUMENT).unwrap();

        let mut binding = DocumentBinding::new(&doc, &f.tree, &f.selection, &f.references, group);
        assert_eq!(binding.max_count(item), 2);
        let first = binding.line_elements()[0];
        let values: Vec<&str> = binding
            .instances(item, first)
            .iter()
            .filter_map(|e| element_text(*e))
            .collect();
        assert_eq!(values, ["1", "3"]);
    }

    #[test]
    fn copies_split_the_matches() {
        let mut f = fixture();
        let group = f.tree.resolve_path("0").unwrap();
        let item = f.tree.resolve_path("0.0").unwrap();
        let copy = f.tree.duplicate(item).unwrap();
        let doc = Document::parse(DOCUMENT).unwrap();

        let mut binding =
            DocumentBinding::new(&doc, &f.tree, &f.selection, &f.references, f.tree.root());
        let first = binding.elements_matching(group)[0];
        assert_eq!(binding.matches(item, first).len(), 1);
        assert_eq!(binding.matches(copy, first).len(), 2);
        assert_eq!(binding.max_count(item), 1);
        assert_eq!(binding.max_count(copy), 2);
    }

    #[test]
    fn references_stand_in_for_their_targets() {
        let schema = r#"
            <xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
              <xs:element name="doc">
                <xs:complexType>
                  <xs:sequence>
                    <xs:element name="Target" maxOccurs="unbounded">
                      <xs:complexType>
                        <xs:attribute name="id" type="xs:string"/>
                        <xs:attribute name="value" type="xs:string"/>
                      </xs:complexType>
                    </xs:element>
                    <xs:element name="holder" maxOccurs="unbounded">
                      <xs:complexType>
                        <xs:choice>
                          <xs:element name="Ref" type="xs:string"/>
                          <xs:element ref="Target"/>
                        </xs:choice>
                      </xs:complexType>
                    </xs:element>
                  </xs:sequence>
                </xs:complexType>
                <xs:key name="targetKey">
                  <xs:selector xpath="Target"/>
                  <xs:field xpath="@id"/>
                </xs:key>
                <xs:keyref name="targetRef" refer="targetKey">
                  <xs:selector xpath="holder/Ref"/>
                  <xs:field xpath="."/>
                </xs:keyref>
              </xs:element>
              <xs:element name="Target">
                <xs:complexType>
                  <xs:attribute name="id" type="xs:string"/>
                  <xs:attribute name="value" type="xs:string"/>
                </xs:complexType>
              </xs:element>
            </xs:schema>"#;
        let document = r#"<doc>
              <Target id="X" value="found"/>
              <holder><Ref>X</Ref></holder>
              <holder><Ref>missing</Ref></holder>
            </doc>"#;

        let loaded = schema_from_str(schema).unwrap();
        let declarations = KeyDeclarations::extract_all(&loaded.documents);
        let mut tree = SchemaTree::from_loaded(loaded, TreeConfig::flattener()).unwrap();
        let holder = tree.resolve_path("1").unwrap();
        let target = tree.resolve_path("1.1").unwrap();
        assert_eq!(tree.node(target).name(), "Target");

        let doc = Document::parse(document).unwrap();
        let references = ReferenceIndex::build(&doc, &declarations, &[String::from("id")]);
        let selection = SelectionModel::default();
        let binding = DocumentBinding::new(&doc, &tree, &selection, &references, holder);
        let holders = binding.line_elements();
        let found = binding.matches(target, holders[0]);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].attribute("value"), Some("found"));
        assert!(binding.matches(target, holders[1]).is_empty());
    }
}
