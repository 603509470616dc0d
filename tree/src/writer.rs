use roxmltree::Node;

use crate::{aligner::DocumentBinding, node::NodeRef, references::element_text};

/// Renders a [`DocumentBinding`] as delimited text: a title row, then one row per instance of
/// the line node.
///
/// Titles and rows walk the same used nodes and reserve `max_count` blocks for every element,
/// so every row has as many fields as the title row.
pub struct FlatWriter<'b, 'a, 'input> {
    binding: &'b mut DocumentBinding<'a, 'input>,
    separator: &'b str,
}

impl<'b, 'a, 'input> FlatWriter<'b, 'a, 'input> {
    pub fn new(binding: &'b mut DocumentBinding<'a, 'input>, separator: &'b str) -> Self {
        Self { binding, separator }
    }

    pub fn title_fields(&mut self) -> Vec<String> {
        let mut fields = Vec::new();
        let line = self.binding.line_node();
        self.titles(line, &mut Vec::new(), &mut fields);
        fields
    }

    pub fn title_line(&mut self) -> String {
        self.title_fields().join(self.separator)
    }

    pub fn row_fields(&mut self, line_element: Node<'a, 'input>) -> Vec<String> {
        let mut fields = Vec::new();
        let line = self.binding.line_node();
        self.values(line, Some(line_element), &mut fields);
        fields
    }

    /// The data rows, one per line node instance
    pub fn rows(&mut self) -> Vec<String> {
        self.binding
            .line_elements()
            .into_iter()
            .map(|line| self.row_fields(line).join(self.separator))
            .collect()
    }

    fn title(&self, node: NodeRef, counters: &[usize]) -> String {
        let selection = self.binding.selection();
        let name = selection
            .custom_name(node)
            .unwrap_or_else(|| self.binding.tree().node(node).name());
        let suffix: Vec<String> = counters
            .iter()
            .filter(|c| **c > 0)
            .map(usize::to_string)
            .collect();
        if suffix.is_empty() {
            name.to_string()
        } else {
            format!("{name}-{}", suffix.join("."))
        }
    }

    /// Used children of `node`, transparent groups looked through. Unchosen groups have no
    /// counterpart in documents and are left out.
    fn used_children(&self, node: NodeRef) -> Vec<NodeRef> {
        let tree = self.binding.tree();
        let selection = self.binding.selection();
        tree.logical_children(node)
            .into_iter()
            .filter(|child| !tree.node(*child).is_group() && selection.is_used(tree, *child))
            .collect()
    }

    fn titles(&mut self, node: NodeRef, counters: &mut Vec<usize>, out: &mut Vec<String>) {
        let tree = self.binding.tree();
        if self.binding.selection().is_selected(node) {
            out.push(self.title(node, counters));
        }
        for child in self.used_children(node) {
            if tree.node(child).is_attribute() {
                if self.binding.selection().is_selected(child) {
                    out.push(self.title(child, counters));
                }
                continue;
            }
            let blocks = self.binding.max_count(child);
            let numbered = tree.node(child).is_duplicable();
            for block in 0..blocks {
                if numbered {
                    counters.push(block);
                }
                self.titles(child, counters, out);
                if numbered {
                    counters.pop();
                }
            }
        }
    }

    fn values(&mut self, node: NodeRef, element: Option<Node<'a, 'input>>, out: &mut Vec<String>) {
        let tree = self.binding.tree();
        let selection = self.binding.selection();
        if selection.is_selected(node) {
            let value = element.and_then(element_text).unwrap_or_default();
            out.push(filtered(selection.filter(node), value));
        }
        for child in self.used_children(node) {
            let child_node = tree.node(child);
            if child_node.is_attribute() {
                if selection.is_selected(child) {
                    let value = element
                        .and_then(|e| e.attribute(child_node.name()))
                        .unwrap_or_default();
                    out.push(filtered(selection.filter(child), value));
                }
                continue;
            }
            let blocks = self.binding.max_count(child);
            let instances = element
                .map(|e| self.binding.instances(child, e))
                .unwrap_or_default();
            if instances.len() > blocks {
                log::warn!(
                    "{} instances of {} but only {blocks} blocks, dropping the rest",
                    instances.len(),
                    tree.print_path(child)
                );
            }
            for block in 0..blocks {
                self.values(child, instances.get(block).copied(), out);
            }
        }
    }
}

/// A value failing its filter is written as an empty field
fn filtered(filter: Option<&crate::selection::Filter>, value: &str) -> String {
    match filter {
        Some(filter) if !filter.is_match(value) => String::new(),
        _ => value.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use roxmltree::Document;

    use super::*;
    use crate::{
        config::TreeConfig, loader::schema_from_str, references::ReferenceIndex,
        schema_tree::SchemaTree, selection::SelectionModel,
    };

    const SCHEMA: &str = r#"
        <xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
          <xs:element name="list">
            <xs:complexType>
              <xs:sequence>
                <xs:element name="protein" maxOccurs="unbounded">
                  <xs:complexType>
                    <xs:sequence>
                      <xs:element name="name" type="xs:string"/>
                      <xs:element name="xref" minOccurs="0" maxOccurs="unbounded">
                        <xs:complexType>
                          <xs:attribute name="db" type="xs:string"/>
                          <xs:attribute name="id" type="xs:string"/>
                        </xs:complexType>
                      </xs:element>
                    </xs:sequence>
                    <xs:attribute name="id" type="xs:string"/>
                  </xs:complexType>
                </xs:element>
              </xs:sequence>
            </xs:complexType>
          </xs:element>
        </xs:schema>"#;

    const DOCUMENT: &str = r#"
        <list>
          <protein id="p1">
            <name>kinase</name>
            <xref db="uniprot" id="P12345"/>
            <xref db="ensembl" id="ENSG1"/>
          </protein>
          <protein id="p2"><name>42</name></protein>
        </list>"#;

    fn tree() -> SchemaTree {
        SchemaTree::from_loaded(schema_from_str(SCHEMA).unwrap(), TreeConfig::flattener()).unwrap()
    }

    fn render(tree: &SchemaTree, selection: &SelectionModel) -> (String, Vec<String>) {
        let doc = Document::parse(DOCUMENT).unwrap();
        let references = ReferenceIndex::default();
        let line = selection.line_node(tree);
        let mut binding = DocumentBinding::new(&doc, tree, selection, &references, line);
        let mut writer = FlatWriter::new(&mut binding, "\t");
        (writer.title_line(), writer.rows())
    }

    #[test]
    fn repeated_blocks_are_numbered_and_padded() {
        let mut tree = tree();
        let mut selection = SelectionModel::default();
        selection.select(tree.resolve_path("0.0").unwrap());
        selection.select(tree.resolve_path("0.1").unwrap());
        selection.select(tree.resolve_path("0.2.1").unwrap());
        selection.set_name(tree.resolve_path("0.0").unwrap(), Some("protein"));

        let (titles, rows) = render(&tree, &selection);
        assert_eq!(titles, "protein\tname\tid\tid-1");
        assert_eq!(rows, ["p1\tkinase\tP12345\tENSG1", "p2\t42\t\t"]);
    }

    #[test]
    fn failing_values_leave_empty_fields() {
        let mut tree = tree();
        let name = tree.resolve_path("0.1").unwrap();
        let mut selection = SelectionModel::default();
        selection.select(tree.resolve_path("0.0").unwrap());
        selection.select(name);
        selection.set_filter(name, Some("^[0-9]+$")).unwrap();

        let (titles, rows) = render(&tree, &selection);
        assert_eq!(titles, "id\tname");
        assert_eq!(rows, ["p1\t", "p2\t42"]);
    }
}
