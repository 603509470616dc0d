use std::collections::BTreeMap;
use std::io::Write;

use fm_flatfile::{parse_field_path, Dictionary, FlatFile};
use quick_xml::{
    events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event},
    Writer,
};

use crate::{
    check::NodeCheck,
    config::TreeConfig,
    error::TreeError,
    loader::{self, mapping_location},
    mapping::{DictionaryAssociation, FieldReference, MakerMapping, TreeMapping},
    node::{NodeKind, NodeRef},
    schema_tree::SchemaTree,
    selection::Filter,
};

/// Where one node takes its value from
#[derive(Debug, Default)]
struct ValueSources {
    field: Option<FieldReference>,
    dictionary: Option<DictionaryAssociation>,
    fixed: Option<String>,
    generated_id: bool,
    validation: Option<Filter>,
}

/// The associations of a maker mapping, resolved to tree nodes. Also judges whether the tree is
/// fit to produce documents.
#[derive(Debug, Default)]
pub struct MakerCheck {
    flat_files: BTreeMap<NodeRef, usize>,
    sources: BTreeMap<NodeRef, ValueSources>,
}

impl MakerCheck {
    fn resolve(tree: &mut SchemaTree, mapping: &TreeMapping) -> Result<Self, TreeError> {
        let mut check = Self::default();
        for (path, index) in &mapping.flat_files {
            check.flat_files.insert(tree.resolve_path(path)?, *index);
        }
        for (path, field) in &mapping.fields {
            check.sources_at(tree, path)?.field = Some(field.clone());
        }
        for (path, association) in &mapping.dictionaries {
            check.sources_at(tree, path)?.dictionary = Some(association.clone());
        }
        for (path, value) in &mapping.values {
            check.sources_at(tree, path)?.fixed = Some(value.clone());
        }
        for path in &mapping.generated_ids {
            check.sources_at(tree, path)?.generated_id = true;
        }
        for (path, pattern) in &mapping.validations {
            check.sources_at(tree, path)?.validation = Some(Filter::new(pattern)?);
        }
        Ok(check)
    }

    fn sources_at(
        &mut self,
        tree: &mut SchemaTree,
        path: &str,
    ) -> Result<&mut ValueSources, TreeError> {
        let node = tree.resolve_path(path)?;
        Ok(self.sources.entry(node).or_default())
    }

    fn has_value_source(&self, node: NodeRef) -> bool {
        self.sources.get(&node).is_some_and(|s| {
            s.field.is_some() || s.dictionary.is_some() || s.fixed.is_some() || s.generated_id
        })
    }

    /// Whether `node` or a node below it gets content from the mapping
    pub fn feeds(&self, tree: &SchemaTree, node: NodeRef) -> bool {
        self.flat_files
            .keys()
            .chain(self.sources.keys().filter(|n| self.has_value_source(**n)))
            .any(|n| tree.is_ancestor_or_self(node, *n))
    }

    pub fn flat_file(&self, node: NodeRef) -> Option<usize> {
        self.flat_files.get(&node).copied()
    }
}

impl NodeCheck for MakerCheck {
    /// Fails for malformed field paths, and for required nodes nothing fills although their
    /// element is written.
    fn check_node(&self, tree: &SchemaTree, node: NodeRef) -> bool {
        if let Some(sources) = self.sources.get(&node) {
            let fields = sources
                .field
                .iter()
                .chain(sources.dictionary.iter().map(|d| &d.source));
            for field in fields {
                if parse_field_path(&field.field).is_err() {
                    return false;
                }
            }
        }

        let tree_node = tree.node(node);
        if tree_node.is_group() || !tree_node.is_required() || self.feeds(tree, node) {
            return true;
        }
        let written = match tree.owning_element(node) {
            None => true,
            Some(owner) => owner == tree.root() || self.feeds(tree, owner),
        };
        if !written {
            return true;
        }
        // Empty required elements are written as they are when auto-duplicating
        tree_node.is_element() && !tree.can_have_value(node) && tree.config().auto_duplicate
    }
}

/// An element of the document being made
#[derive(Debug)]
struct OutputElement {
    name: String,
    attributes: Vec<(String, String)>,
    text: Option<String>,
    children: Vec<OutputElement>,
    /// Whether the element or a descendant got a value from the mapping
    valued: bool,
}

impl OutputElement {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            attributes: Vec::new(),
            text: None,
            children: Vec::new(),
            valued: false,
        }
    }

    fn write(&self, writer: &mut Writer<impl Write>) -> Result<(), TreeError> {
        let start = BytesStart::new(self.name.as_str()).with_attributes(
            self.attributes
                .iter()
                .map(|(name, value)| (name.as_str(), value.as_str())),
        );
        if self.text.is_none() && self.children.is_empty() {
            return writer
                .write_event(Event::Empty(start))
                .map_err(TreeError::xml_write);
        }
        writer
            .write_event(Event::Start(start))
            .map_err(TreeError::xml_write)?;
        if let Some(text) = &self.text {
            writer
                .write_event(Event::Text(BytesText::new(text)))
                .map_err(TreeError::xml_write)?;
        }
        for child in &self.children {
            child.write(writer)?;
        }
        writer
            .write_event(Event::End(BytesEnd::new(self.name.as_str())))
            .map_err(TreeError::xml_write)
    }
}

/// Makes XML documents out of flat files, following a schema tree whose nodes are associated
/// with flat file fields, dictionary entries, fixed values and generated identifiers.
///
/// A node associated with a flat file is written once per record of that file. Other elements
/// are written when they or a descendant get a value; required ones are also written empty when
/// auto-duplication is on. Each flat file is read through once.
pub struct XmlMaker {
    tree: SchemaTree,
    check: MakerCheck,
    flat_files: Vec<FlatFile>,
    dictionaries: Vec<Dictionary>,
    id_prefix: String,
    last_id: usize,
}

impl XmlMaker {
    /// Applies the choices of `mapping` to `tree` and resolves its associations.
    pub fn new(
        mut tree: SchemaTree,
        mapping: &TreeMapping,
        flat_files: Vec<FlatFile>,
        dictionaries: Vec<Dictionary>,
    ) -> Result<Self, TreeError> {
        tree.apply_expansions(&mapping.expand_choices)?;
        let check = MakerCheck::resolve(&mut tree, mapping)?;
        Ok(Self {
            tree,
            check,
            flat_files,
            dictionaries,
            id_prefix: mapping.id_prefix.clone(),
            last_id: 0,
        })
    }

    /// Opens the flat files, dictionaries and schema named by `mapping`. Relative locations
    /// resolve against `base`, the location of the mapping file.
    pub fn load(mapping: &MakerMapping, base: Option<&str>) -> Result<Self, TreeError> {
        let locate = |location: &str| match base {
            Some(base) => mapping_location(base, location),
            None => location.to_string(),
        };

        let mut flat_files = Vec::new();
        for flat_file_mapping in &mapping.flat_files {
            let mut flat_file = FlatFile::open(
                &locate(&flat_file_mapping.url),
                flat_file_mapping.line_separator.as_deref(),
            )?;
            for (path, separator) in &flat_file_mapping.separators {
                flat_file.set_separator(path.as_str(), separator.as_str());
            }
            flat_file.set_first_line_for_titles(flat_file_mapping.first_line_for_titles);
            if flat_file.first_line_for_titles() {
                flat_file.next_line();
            }
            flat_files.push(flat_file);
        }

        let mut dictionaries = Vec::new();
        for dictionary in &mapping.dictionaries {
            dictionaries.push(Dictionary::open(
                &locate(&dictionary.url),
                &dictionary.separator,
                dictionary.case_sensitive,
            )?);
        }

        let tree_mapping = &mapping.tree;
        let schema = tree_mapping
            .schema_url
            .as_deref()
            .ok_or_else(|| TreeError::Mapping(String::from("the mapping names no schema")))?;
        let config = TreeConfig {
            manage_choices: tree_mapping.manage_choices,
            auto_duplicate: tree_mapping.auto_duplicate,
            ..TreeConfig::maker()
        };
        let tree = SchemaTree::from_loaded(loader::load_schema(&locate(schema))?, config)?;
        Self::new(tree, tree_mapping, flat_files, dictionaries)
    }

    pub fn tree(&self) -> &SchemaTree {
        &self.tree
    }

    /// Checks every node of the tree, logging the ones that fail.
    pub fn check(&self) -> bool {
        self.tree.check(&self.check)
    }

    pub fn info(&self, node: NodeRef) -> String {
        self.tree.info(node, &self.check)
    }

    fn field_value(&self, field: &FieldReference) -> Result<Option<String>, TreeError> {
        let Some(flat_file) = self.flat_files.get(field.flat_file) else {
            log::warn!("there is no flat file {}", field.flat_file);
            return Ok(None);
        };
        if !flat_file.has_line() {
            return Ok(None);
        }
        let value = flat_file.element_at(&field.field, None)?;
        Ok((!value.is_empty()).then_some(value))
    }

    fn dictionary_value(
        &self,
        association: &DictionaryAssociation,
    ) -> Result<Option<String>, TreeError> {
        let Some(key) = self.field_value(&association.source)? else {
            return Ok(None);
        };
        let Some(dictionary) = self.dictionaries.get(association.dictionary) else {
            log::warn!("there is no dictionary {}", association.dictionary);
            return Ok(None);
        };
        let value = dictionary.lookup(&key, association.column);
        if value.is_none() {
            log::debug!("{key:?} not found in dictionary {}", association.dictionary);
        }
        Ok(value.map(str::to_string))
    }

    /// The value of `node`: from its field, else its dictionary, else its fixed value, else a
    /// generated identifier. Values failing the node's validation are dropped.
    fn value(&mut self, node: NodeRef) -> Result<Option<String>, TreeError> {
        let Some(sources) = self.check.sources.get(&node) else {
            return Ok(None);
        };
        let generated_id = sources.generated_id;
        let mut value = match (&sources.field, &sources.dictionary) {
            (Some(field), _) => self.field_value(field)?,
            (None, Some(association)) => self.dictionary_value(association)?,
            (None, None) => None,
        };
        if value.is_none() {
            value = sources.fixed.clone();
        }
        if value.is_none() && generated_id {
            self.last_id += 1;
            value = Some(format!("{}{}", self.id_prefix, self.last_id));
        }

        let validation = self
            .check
            .sources
            .get(&node)
            .and_then(|s| s.validation.as_ref());
        match (value, validation) {
            (Some(value), Some(validation)) if !validation.is_match(&value) => {
                log::warn!(
                    "{value:?} does not match {:?}, leaving {} out",
                    validation.pattern(),
                    self.tree.print_path(node)
                );
                Ok(None)
            }
            (value, _) => Ok(value),
        }
    }

    fn element(&mut self, node: NodeRef) -> Result<OutputElement, TreeError> {
        let mut element = OutputElement::new(self.tree.node(node).name());
        if self.tree.can_have_value(node) {
            if let Some(text) = self.value(node)? {
                element.text = Some(text);
                element.valued = true;
            }
        }
        self.children(node, &mut element)?;
        Ok(element)
    }

    fn children(&mut self, node: NodeRef, parent: &mut OutputElement) -> Result<(), TreeError> {
        let children = self.tree.node(node).children().to_vec();
        for child in children {
            match self.tree.node(child).kind() {
                NodeKind::Attribute => {
                    if let Some(value) = self.value(child)? {
                        let name = self.tree.node(child).name().to_string();
                        parent.attributes.push((name, value));
                        parent.valued = true;
                    }
                }
                NodeKind::Group(_) => self.children(child, parent)?,
                NodeKind::Element => self.child_element(child, parent)?,
            }
        }
        Ok(())
    }

    fn child_element(&mut self, node: NodeRef, parent: &mut OutputElement) -> Result<(), TreeError> {
        if let Some(index) = self.check.flat_file(node) {
            if index >= self.flat_files.len() {
                log::warn!(
                    "{} is associated with the missing flat file {index}",
                    self.tree.print_path(node)
                );
                return Ok(());
            }
            while self.flat_files[index].has_line() {
                let element = self.element(node)?;
                if element.valued {
                    parent.valued = true;
                    parent.children.push(element);
                }
                self.flat_files[index].next_line();
            }
            return Ok(());
        }

        let element = self.element(node)?;
        if element.valued {
            parent.valued = true;
            parent.children.push(element);
        } else if self.tree.node(node).is_required() && self.tree.config().auto_duplicate {
            parent.children.push(element);
        }
        Ok(())
    }

    /// Makes the document and writes it to `out`.
    pub fn write(&mut self, out: &mut impl Write) -> Result<(), TreeError> {
        let mut root = self.element(self.tree.root())?;
        if let Some(namespace) = &self.tree.schema().target_namespace {
            root.attributes
                .insert(0, (String::from("xmlns"), namespace.clone()));
        }

        let mut writer = Writer::new_with_indent(out, b' ', 2);
        writer
            .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
            .map_err(TreeError::xml_write)?;
        root.write(&mut writer)?;
        writeln!(writer.get_mut())?;
        log::info!("made {} with {} generated identifiers", root.name, self.last_id);
        Ok(())
    }

    pub fn to_xml(&mut self) -> Result<String, TreeError> {
        let mut out = Vec::new();
        self.write(&mut out)?;
        String::from_utf8(out).map_err(TreeError::xml_write)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::schema_from_str;

    const SCHEMA: &str = r#"
        <xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
          <xs:element name="entrySet">
            <xs:complexType>
              <xs:sequence>
                <xs:element name="source" type="xs:string"/>
                <xs:element name="interactor" maxOccurs="unbounded">
                  <xs:complexType>
                    <xs:sequence>
                      <xs:element name="name" type="xs:string"/>
                      <xs:element name="organism" type="xs:string" minOccurs="0"/>
                      <xs:element name="note" type="xs:string" minOccurs="0"/>
                    </xs:sequence>
                    <xs:attribute name="id" type="xs:string" use="required"/>
                  </xs:complexType>
                </xs:element>
              </xs:sequence>
              <xs:attribute name="version" type="xs:string"/>
            </xs:complexType>
          </xs:element>
        </xs:schema>"#;

    fn mapping() -> TreeMapping {
        let mut mapping = TreeMapping::default();
        mapping.values.insert(String::from("0"), String::from("1.0"));
        mapping.values.insert(String::from("1"), String::from("MINT"));
        mapping.flat_files.insert(String::from("2"), 0);
        mapping.generated_ids.insert(String::from("2.0"));
        mapping.fields.insert(
            String::from("2.1"),
            FieldReference {
                flat_file: 0,
                field: String::from("0"),
            },
        );
        mapping
            .validations
            .insert(String::from("2.1"), String::from("[A-Z]+[0-9]*"));
        mapping.dictionaries.insert(
            String::from("2.2"),
            DictionaryAssociation {
                dictionary: 0,
                column: 0,
                source: FieldReference {
                    flat_file: 0,
                    field: String::from("1"),
                },
            },
        );
        mapping
    }

    fn maker(mapping: &TreeMapping) -> XmlMaker {
        let tree = SchemaTree::from_loaded(schema_from_str(SCHEMA).unwrap(), TreeConfig::maker())
            .unwrap();
        let mut interactors = FlatFile::from_text(
            "name\ttaxid\nP53\t9606\nbad name\t10090\nMDM2\t0000\n",
            None,
        );
        interactors.set_separator("", "\t");
        interactors.set_first_line_for_titles(true);
        interactors.next_line();
        let organisms = Dictionary::from_text("9606;human\n10090;mouse\n", ";", false);
        XmlMaker::new(tree, mapping, vec![interactors], vec![organisms]).unwrap()
    }

    #[test]
    fn makes_one_element_per_record() {
        let mut maker = maker(&mapping());
        assert!(maker.check());
        let xml = maker.to_xml().unwrap();

        assert!(xml.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>"));
        assert!(xml.contains(r#"<entrySet version="1.0">"#), "{xml}");
        assert!(xml.contains("<source>MINT</source>"), "{xml}");
        assert_eq!(xml.matches("<interactor ").count(), 3, "{xml}");
        assert!(xml.contains(r#"<interactor id="ID1">"#), "{xml}");
        assert!(xml.contains("<name>P53</name>"), "{xml}");
        assert!(xml.contains("<organism>human</organism>"), "{xml}");
        assert!(xml.contains("<organism>mouse</organism>"), "{xml}");
        assert!(xml.contains("<name>MDM2</name>"), "{xml}");
        assert!(!xml.contains("bad name"), "{xml}");
        // The failing name is required, so it is written empty
        assert!(xml.contains("<name/>"), "{xml}");
        assert!(!xml.contains("<note"), "{xml}");
        assert!(!xml.contains("taxid"), "{xml}");
    }

    #[test]
    fn flat_files_are_read_once() {
        let mut maker = maker(&mapping());
        maker.to_xml().unwrap();
        let again = maker.to_xml().unwrap();
        assert_eq!(again.matches("<interactor").count(), 0, "{again}");
    }

    #[test]
    fn unfilled_required_nodes_fail_the_check() {
        let mut unfilled = mapping();
        unfilled.values.remove("1");
        let unfilled = maker(&unfilled);
        assert!(!unfilled.check());
        let tree = unfilled.tree();
        let source = tree
            .node(tree.root())
            .children()
            .iter()
            .copied()
            .find(|n| tree.node(*n).name() == "source")
            .unwrap();
        assert!(unfilled.info(source).ends_with("check: failed"));

        let mut malformed = mapping();
        malformed.fields.insert(
            String::from("2.3"),
            FieldReference {
                flat_file: 0,
                field: String::from("one"),
            },
        );
        assert!(!maker(&malformed).check());
    }
}
