use std::collections::{BTreeMap, BTreeSet};

use regex::Regex;

use crate::{error::TreeError, node::NodeRef, schema_tree::SchemaTree};

/// A regular expression a value must match as a whole
#[derive(Clone, Debug)]
pub struct Filter {
    pattern: String,
    regex: Regex,
}

impl Filter {
    pub fn new(pattern: &str) -> Result<Self, TreeError> {
        let regex = Regex::new(&format!("^(?:{pattern})$")).map_err(|source| {
            TreeError::InvalidFilter {
                pattern: pattern.to_string(),
                source,
            }
        })?;
        Ok(Self {
            pattern: pattern.to_string(),
            regex,
        })
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn is_match(&self, value: &str) -> bool {
        self.regex.is_match(value)
    }
}

/// The nodes chosen as output columns, with their custom titles and filters
#[derive(Clone, Debug, Default)]
pub struct SelectionModel {
    selected: BTreeSet<NodeRef>,
    names: BTreeMap<NodeRef, String>,
    filters: BTreeMap<NodeRef, Filter>,
}

impl SelectionModel {
    pub fn select(&mut self, node: NodeRef) {
        self.selected.insert(node);
    }

    pub fn unselect(&mut self, node: NodeRef) {
        self.selected.remove(&node);
    }

    pub fn is_selected(&self, node: NodeRef) -> bool {
        self.selected.contains(&node)
    }

    pub fn selected(&self) -> impl Iterator<Item = NodeRef> + '_ {
        self.selected.iter().copied()
    }

    pub fn is_empty(&self) -> bool {
        self.selected.is_empty()
    }

    pub fn set_name(&mut self, node: NodeRef, name: Option<&str>) {
        match name {
            Some(name) => self.names.insert(node, name.to_string()),
            None => self.names.remove(&node),
        };
    }

    pub fn custom_name(&self, node: NodeRef) -> Option<&str> {
        self.names.get(&node).map(String::as_str)
    }

    pub fn names(&self) -> impl Iterator<Item = (NodeRef, &str)> + '_ {
        self.names.iter().map(|(node, name)| (*node, name.as_str()))
    }

    /// Sets or clears the filter of `node`. An invalid pattern leaves the previous filter.
    pub fn set_filter(&mut self, node: NodeRef, pattern: Option<&str>) -> Result<(), TreeError> {
        match pattern {
            Some(pattern) => {
                self.filters.insert(node, Filter::new(pattern)?);
            }
            None => {
                self.filters.remove(&node);
            }
        }
        Ok(())
    }

    pub fn filter(&self, node: NodeRef) -> Option<&Filter> {
        self.filters.get(&node)
    }

    pub fn filters(&self) -> impl Iterator<Item = (NodeRef, &Filter)> + '_ {
        self.filters.iter().map(|(node, filter)| (*node, filter))
    }

    /// Whether `node` is selected or has a selected descendant
    pub fn is_used(&self, tree: &SchemaTree, node: NodeRef) -> bool {
        self.selected
            .iter()
            .any(|selected| tree.is_ancestor_or_self(node, *selected))
    }

    /// Drops everything recorded for nodes `keep` rejects.
    pub fn retain(&mut self, mut keep: impl FnMut(NodeRef) -> bool) {
        self.selected.retain(|node| keep(*node));
        self.names.retain(|node, _| keep(*node));
        self.filters.retain(|node, _| keep(*node));
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }

    /// The element whose document instances each give one output row.
    ///
    /// Starting at the root, descend while the current element is not selected itself and
    /// exactly one of its children is used, that child being an element. The element where the
    /// descent stops is the deepest common ancestor of all selections. Without selections the
    /// root is the line node.
    pub fn line_node(&self, tree: &SchemaTree) -> NodeRef {
        let mut current = tree.root();
        if self.is_empty() {
            return current;
        }
        loop {
            if self.is_selected(current) {
                return current;
            }
            let mut used = tree
                .logical_children(current)
                .into_iter()
                .filter(|child| self.is_used(tree, *child));
            match (used.next(), used.next()) {
                (Some(child), None) if tree.node(child).is_element() => current = child,
                _ => return current,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{config::TreeConfig, loader::schema_from_str};

    const SCHEMA: &str = r#"
        <xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
          <xs:element name="set">
            <xs:complexType>
              <xs:sequence>
                <xs:element name="entry" maxOccurs="unbounded">
                  <xs:complexType>
                    <xs:sequence>
                      <xs:element name="name" type="xs:string"/>
                      <xs:element name="alias" type="xs:string" maxOccurs="unbounded"/>
                    </xs:sequence>
                    <xs:attribute name="id" type="xs:string"/>
                  </xs:complexType>
                </xs:element>
              </xs:sequence>
            </xs:complexType>
          </xs:element>
        </xs:schema>"#;

    fn tree() -> SchemaTree {
        SchemaTree::from_loaded(schema_from_str(SCHEMA).unwrap(), TreeConfig::flattener()).unwrap()
    }

    #[test]
    fn filters_match_whole_values() {
        let filter = Filter::new("[0-9]+").unwrap();
        assert!(filter.is_match("123"));
        assert!(!filter.is_match("12a"));
        assert!(Filter::new("^[0-9]+$").unwrap().is_match("42"));
        assert!(matches!(
            Filter::new("(unclosed"),
            Err(TreeError::InvalidFilter { .. })
        ));
    }

    #[test]
    fn line_node_is_the_deepest_common_ancestor() {
        let mut tree = tree();
        let mut selection = SelectionModel::default();
        assert_eq!(selection.line_node(&tree), tree.root());

        let id = tree.resolve_path("0.0").unwrap();
        selection.select(id);
        let entry = tree.resolve_path("0").unwrap();
        assert_eq!(selection.line_node(&tree), entry);

        let alias = tree.resolve_path("0.2").unwrap();
        selection.select(alias);
        assert_eq!(selection.line_node(&tree), entry);

        selection.unselect(id);
        assert_eq!(selection.line_node(&tree), alias);

        selection.select(tree.root());
        assert_eq!(selection.line_node(&tree), tree.root());
    }

    #[test]
    fn used_nodes_lead_to_selections() {
        let mut tree = tree();
        let name = tree.resolve_path("0.1").unwrap();
        let mut selection = SelectionModel::default();
        selection.select(name);
        selection.set_name(name, Some("entry name"));
        selection.set_filter(name, Some("[A-Z].*")).unwrap();
        assert!(selection.is_used(&tree, tree.root()));
        let unused = tree.resolve_path("0.2").unwrap();
        assert!(!selection.is_used(&tree, unused));

        selection.retain(|node| node != name);
        assert!(selection.is_empty());
        assert!(selection.custom_name(name).is_none());
        assert!(selection.filter(name).is_none());
    }
}
