//! Mapping files: what a user set up on a schema tree, saved so that a conversion can be run
//! again without the tree editor.
//!
//! Mappings are XML documents, written with `quick-xml` and read back with `roxmltree`. Nodes
//! are referred to by their tree paths.

use std::collections::{BTreeMap, BTreeSet};
use std::io::Write;
use std::path::Path;

use quick_xml::{
    events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event},
    Writer,
};
use roxmltree::{Document, Node};

use crate::{config::DEFAULT_SEPARATOR, error::TreeError, schema_tree::ExpansionRecord};

/// The setup of a flattening: sources, choices, selected nodes and their titles and filters
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FlattenerMapping {
    pub schema_url: Option<String>,
    pub document_url: Option<String>,
    pub separator: String,
    /// Tree settings the expansions were recorded under
    pub manage_choices: bool,
    pub auto_duplicate: bool,
    pub line_node: Option<String>,
    pub expand_choices: Vec<ExpansionRecord>,
    pub selections: Vec<String>,
    pub names: BTreeMap<String, String>,
    pub filters: BTreeMap<String, String>,
}

impl Default for FlattenerMapping {
    fn default() -> Self {
        Self {
            schema_url: None,
            document_url: None,
            separator: String::from(DEFAULT_SEPARATOR),
            manage_choices: false,
            auto_duplicate: false,
            line_node: None,
            expand_choices: Vec::new(),
            selections: Vec::new(),
            names: BTreeMap::new(),
            filters: BTreeMap::new(),
        }
    }
}

/// A flat file read by the maker, with the separators splitting its fields
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FlatFileMapping {
    pub url: String,
    /// Record separator; records are lines when absent
    pub line_separator: Option<String>,
    pub first_line_for_titles: bool,
    /// Field separators by field path prefix, `""` splitting the whole record
    pub separators: BTreeMap<String, String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DictionaryMapping {
    pub url: String,
    pub separator: String,
    pub case_sensitive: bool,
}

/// A field of the current record of a flat file
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FieldReference {
    pub flat_file: usize,
    pub field: String,
}

/// A value looked up in a dictionary with the content of a flat file field as key
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DictionaryAssociation {
    pub dictionary: usize,
    pub column: usize,
    pub source: FieldReference,
}

/// Where the nodes of the maker tree take their values from
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TreeMapping {
    pub schema_url: Option<String>,
    pub manage_choices: bool,
    pub auto_duplicate: bool,
    /// Prefix of generated identifiers
    pub id_prefix: String,
    pub expand_choices: Vec<ExpansionRecord>,
    /// Nodes written once per record of a flat file, by path
    pub flat_files: BTreeMap<String, usize>,
    pub fields: BTreeMap<String, FieldReference>,
    pub values: BTreeMap<String, String>,
    pub dictionaries: BTreeMap<String, DictionaryAssociation>,
    pub generated_ids: BTreeSet<String>,
    pub validations: BTreeMap<String, String>,
}

impl Default for TreeMapping {
    fn default() -> Self {
        Self {
            schema_url: None,
            manage_choices: true,
            auto_duplicate: true,
            id_prefix: String::from("ID"),
            expand_choices: Vec::new(),
            flat_files: BTreeMap::new(),
            fields: BTreeMap::new(),
            values: BTreeMap::new(),
            dictionaries: BTreeMap::new(),
            generated_ids: BTreeSet::new(),
            validations: BTreeMap::new(),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MakerMapping {
    pub flat_files: Vec<FlatFileMapping>,
    pub dictionaries: Vec<DictionaryMapping>,
    pub tree: TreeMapping,
}

struct MappingWriter {
    writer: Writer<Vec<u8>>,
}

impl MappingWriter {
    fn new() -> Result<Self, TreeError> {
        let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
        writer
            .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
            .map_err(TreeError::xml_write)?;
        Ok(Self { writer })
    }

    fn start(&mut self, name: &str, attributes: &[(&str, &str)]) -> Result<(), TreeError> {
        let start = BytesStart::new(name).with_attributes(attributes.iter().copied());
        self.writer
            .write_event(Event::Start(start))
            .map_err(TreeError::xml_write)
    }

    fn end(&mut self, name: &str) -> Result<(), TreeError> {
        self.writer
            .write_event(Event::End(BytesEnd::new(name)))
            .map_err(TreeError::xml_write)
    }

    fn empty(&mut self, name: &str, attributes: &[(&str, &str)]) -> Result<(), TreeError> {
        let start = BytesStart::new(name).with_attributes(attributes.iter().copied());
        self.writer
            .write_event(Event::Empty(start))
            .map_err(TreeError::xml_write)
    }

    /// An element holding `text`. Text keeps whitespace, which attributes would normalise.
    fn text(
        &mut self,
        name: &str,
        attributes: &[(&str, &str)],
        text: &str,
    ) -> Result<(), TreeError> {
        if text.is_empty() {
            return self.empty(name, attributes);
        }
        self.start(name, attributes)?;
        self.writer
            .write_event(Event::Text(BytesText::new(text)))
            .map_err(TreeError::xml_write)?;
        self.end(name)
    }

    fn optional_text(&mut self, name: &str, text: Option<&str>) -> Result<(), TreeError> {
        match text {
            Some(text) => self.text(name, &[], text),
            None => Ok(()),
        }
    }

    fn flag(&mut self, name: &str, value: bool) -> Result<(), TreeError> {
        self.text(name, &[], if value { "true" } else { "false" })
    }

    fn expansions(&mut self, records: &[ExpansionRecord]) -> Result<(), TreeError> {
        self.start("expandChoices", &[])?;
        for record in records {
            let path = ("path", record.path.as_str());
            match &record.choice {
                Some(value) => self.empty("choice", &[path, ("value", value.as_str())])?,
                None => self.empty("choice", &[path])?,
            }
        }
        self.end("expandChoices")
    }

    fn path_texts(
        &mut self,
        list: &str,
        item: &str,
        map: &BTreeMap<String, String>,
    ) -> Result<(), TreeError> {
        self.start(list, &[])?;
        for (path, text) in map {
            self.text(item, &[("path", path.as_str())], text)?;
        }
        self.end(list)
    }

    fn finish(self) -> Result<String, TreeError> {
        let mut bytes = self.writer.into_inner();
        bytes.push(b'\n');
        String::from_utf8(bytes).map_err(TreeError::xml_write)
    }
}

fn parse_mapping<'input>(text: &'input str, root: &str) -> Result<Document<'input>, TreeError> {
    let doc = Document::parse(text).map_err(|e| TreeError::Mapping(e.to_string()))?;
    let found = doc.root_element().tag_name().name();
    if found != root {
        return Err(TreeError::Mapping(format!(
            "expected a <{root}> document, found <{found}>"
        )));
    }
    Ok(doc)
}

fn child<'a, 'input>(node: Node<'a, 'input>, name: &str) -> Option<Node<'a, 'input>> {
    node.children()
        .find(|c| c.is_element() && c.tag_name().name() == name)
}

fn children<'a, 'input: 'a>(
    node: Node<'a, 'input>,
    name: &'a str,
) -> impl Iterator<Item = Node<'a, 'input>> + 'a {
    node.children()
        .filter(move |c| c.is_element() && c.tag_name().name() == name)
}

/// The untrimmed text of element `name` below `node`; separators may be whitespace
fn child_text(node: Node, name: &str) -> Option<String> {
    child(node, name).map(|c| c.text().unwrap_or_default().to_string())
}

fn child_flag(node: Node, name: &str, default: bool) -> Result<bool, TreeError> {
    match child_text(node, name).as_deref().map(str::trim) {
        None => Ok(default),
        Some("true") => Ok(true),
        Some("false") => Ok(false),
        Some(other) => Err(TreeError::Mapping(format!(
            "<{name}> must be true or false, not {other:?}"
        ))),
    }
}

fn required_attribute<'a>(node: Node<'a, '_>, name: &str) -> Result<&'a str, TreeError> {
    node.attribute(name).ok_or_else(|| {
        TreeError::Mapping(format!(
            "<{}> lacks the {name:?} attribute",
            node.tag_name().name()
        ))
    })
}

fn index_attribute(node: Node, name: &str) -> Result<usize, TreeError> {
    let value = required_attribute(node, name)?;
    value.trim().parse().map_err(|_| {
        TreeError::Mapping(format!("{name:?} must be an index, not {value:?}"))
    })
}

fn read_expansions(node: Node) -> Result<Vec<ExpansionRecord>, TreeError> {
    let Some(list) = child(node, "expandChoices") else {
        return Ok(Vec::new());
    };
    children(list, "choice")
        .map(|choice| {
            Ok(ExpansionRecord {
                path: required_attribute(choice, "path")?.to_string(),
                choice: choice.attribute("value").map(str::to_string),
            })
        })
        .collect()
}

fn read_path_texts(
    node: Node,
    list: &str,
    item: &str,
) -> Result<BTreeMap<String, String>, TreeError> {
    let Some(list) = child(node, list) else {
        return Ok(BTreeMap::new());
    };
    children(list, item)
        .map(|entry| {
            Ok((
                required_attribute(entry, "path")?.to_string(),
                entry.text().unwrap_or_default().to_string(),
            ))
        })
        .collect()
}

fn field_reference(node: Node) -> Result<FieldReference, TreeError> {
    Ok(FieldReference {
        flat_file: index_attribute(node, "flatFile")?,
        field: required_attribute(node, "field")?.to_string(),
    })
}

impl FlattenerMapping {
    pub fn to_xml(&self) -> Result<String, TreeError> {
        let mut out = MappingWriter::new()?;
        out.start("flattenerMapping", &[])?;
        out.optional_text("schemaURL", self.schema_url.as_deref())?;
        out.optional_text("documentURL", self.document_url.as_deref())?;
        out.text("separator", &[], &self.separator)?;
        out.flag("manageChoices", self.manage_choices)?;
        out.flag("autoDuplicate", self.auto_duplicate)?;
        out.optional_text("lineNode", self.line_node.as_deref())?;
        out.expansions(&self.expand_choices)?;
        out.start("selections", &[])?;
        for path in &self.selections {
            out.empty("node", &[("path", path.as_str())])?;
        }
        out.end("selections")?;
        out.path_texts("names", "name", &self.names)?;
        out.path_texts("filters", "filter", &self.filters)?;
        out.end("flattenerMapping")?;
        out.finish()
    }

    pub fn from_xml(text: &str) -> Result<Self, TreeError> {
        let doc = parse_mapping(text, "flattenerMapping")?;
        let root = doc.root_element();
        let selections = match child(root, "selections") {
            Some(list) => children(list, "node")
                .map(|node| required_attribute(node, "path").map(str::to_string))
                .collect::<Result<Vec<_>, _>>()?,
            None => Vec::new(),
        };
        Ok(Self {
            schema_url: child_text(root, "schemaURL").map(|s| s.trim().to_string()),
            document_url: child_text(root, "documentURL").map(|s| s.trim().to_string()),
            separator: child_text(root, "separator")
                .unwrap_or_else(|| String::from(DEFAULT_SEPARATOR)),
            manage_choices: child_flag(root, "manageChoices", false)?,
            auto_duplicate: child_flag(root, "autoDuplicate", false)?,
            line_node: child_text(root, "lineNode").map(|s| s.trim().to_string()),
            expand_choices: read_expansions(root)?,
            selections,
            names: read_path_texts(root, "names", "name")?,
            filters: read_path_texts(root, "filters", "filter")?,
        })
    }

    pub fn read(path: &Path) -> Result<Self, TreeError> {
        Self::from_xml(&std::fs::read_to_string(path)?)
    }

    pub fn save(&self, path: &Path) -> Result<(), TreeError> {
        std::fs::File::create(path)?.write_all(self.to_xml()?.as_bytes())?;
        Ok(())
    }
}

impl MakerMapping {
    pub fn to_xml(&self) -> Result<String, TreeError> {
        let mut out = MappingWriter::new()?;
        out.start("makerMapping", &[])?;

        for flat_file in &self.flat_files {
            out.start("flatFile", &[])?;
            out.text("url", &[], &flat_file.url)?;
            out.optional_text("lineSeparator", flat_file.line_separator.as_deref())?;
            out.flag("firstLineForTitles", flat_file.first_line_for_titles)?;
            for (path, separator) in &flat_file.separators {
                out.text("separator", &[("path", path.as_str())], separator)?;
            }
            out.end("flatFile")?;
        }
        for dictionary in &self.dictionaries {
            out.start("dictionary", &[])?;
            out.text("url", &[], &dictionary.url)?;
            out.text("separator", &[], &dictionary.separator)?;
            out.flag("caseSensitive", dictionary.case_sensitive)?;
            out.end("dictionary")?;
        }

        let tree = &self.tree;
        out.start("tree", &[])?;
        out.optional_text("schemaURL", tree.schema_url.as_deref())?;
        out.flag("manageChoices", tree.manage_choices)?;
        out.flag("autoDuplicate", tree.auto_duplicate)?;
        out.text("idPrefix", &[], &tree.id_prefix)?;
        out.expansions(&tree.expand_choices)?;
        out.start("associations", &[])?;
        for (path, index) in &tree.flat_files {
            out.empty(
                "flatFile",
                &[("path", path.as_str()), ("flatFile", index.to_string().as_str())],
            )?;
        }
        for (path, field) in &tree.fields {
            out.empty(
                "field",
                &[
                    ("path", path.as_str()),
                    ("flatFile", field.flat_file.to_string().as_str()),
                    ("field", field.field.as_str()),
                ],
            )?;
        }
        for (path, value) in &tree.values {
            out.text("value", &[("path", path.as_str())], value)?;
        }
        for (path, association) in &tree.dictionaries {
            out.empty(
                "dictionary",
                &[
                    ("path", path.as_str()),
                    ("dictionary", association.dictionary.to_string().as_str()),
                    ("column", association.column.to_string().as_str()),
                    ("flatFile", association.source.flat_file.to_string().as_str()),
                    ("field", association.source.field.as_str()),
                ],
            )?;
        }
        for path in &tree.generated_ids {
            out.empty("generatedId", &[("path", path.as_str())])?;
        }
        for (path, pattern) in &tree.validations {
            out.text("validation", &[("path", path.as_str())], pattern)?;
        }
        out.end("associations")?;
        out.end("tree")?;

        out.end("makerMapping")?;
        out.finish()
    }

    pub fn from_xml(text: &str) -> Result<Self, TreeError> {
        let doc = parse_mapping(text, "makerMapping")?;
        let root = doc.root_element();

        let mut flat_files = Vec::new();
        for node in children(root, "flatFile") {
            let mut separators = BTreeMap::new();
            for separator in children(node, "separator") {
                separators.insert(
                    required_attribute(separator, "path")?.to_string(),
                    separator.text().unwrap_or_default().to_string(),
                );
            }
            flat_files.push(FlatFileMapping {
                url: child_text(node, "url").unwrap_or_default().trim().to_string(),
                line_separator: child_text(node, "lineSeparator"),
                first_line_for_titles: child_flag(node, "firstLineForTitles", false)?,
                separators,
            });
        }

        let mut dictionaries = Vec::new();
        for node in children(root, "dictionary") {
            dictionaries.push(DictionaryMapping {
                url: child_text(node, "url").unwrap_or_default().trim().to_string(),
                separator: child_text(node, "separator")
                    .unwrap_or_else(|| String::from(DEFAULT_SEPARATOR)),
                case_sensitive: child_flag(node, "caseSensitive", false)?,
            });
        }

        let tree_node = child(root, "tree")
            .ok_or_else(|| TreeError::Mapping(String::from("no <tree> section")))?;
        let mut tree = TreeMapping {
            schema_url: child_text(tree_node, "schemaURL").map(|s| s.trim().to_string()),
            manage_choices: child_flag(tree_node, "manageChoices", true)?,
            auto_duplicate: child_flag(tree_node, "autoDuplicate", true)?,
            id_prefix: child_text(tree_node, "idPrefix").unwrap_or_else(|| String::from("ID")),
            expand_choices: read_expansions(tree_node)?,
            ..Default::default()
        };
        if let Some(associations) = child(tree_node, "associations") {
            for node in associations.children().filter(Node::is_element) {
                let path = required_attribute(node, "path")?.to_string();
                match node.tag_name().name() {
                    "flatFile" => {
                        tree.flat_files.insert(path, index_attribute(node, "flatFile")?);
                    }
                    "field" => {
                        tree.fields.insert(path, field_reference(node)?);
                    }
                    "value" => {
                        tree.values
                            .insert(path, node.text().unwrap_or_default().to_string());
                    }
                    "dictionary" => {
                        let association = DictionaryAssociation {
                            dictionary: index_attribute(node, "dictionary")?,
                            column: index_attribute(node, "column")?,
                            source: field_reference(node)?,
                        };
                        tree.dictionaries.insert(path, association);
                    }
                    "generatedId" => {
                        tree.generated_ids.insert(path);
                    }
                    "validation" => {
                        tree.validations
                            .insert(path, node.text().unwrap_or_default().to_string());
                    }
                    other => log::warn!("ignoring unknown association <{other}>"),
                }
            }
        }

        Ok(Self {
            flat_files,
            dictionaries,
            tree,
        })
    }

    pub fn read(path: &Path) -> Result<Self, TreeError> {
        Self::from_xml(&std::fs::read_to_string(path)?)
    }

    pub fn save(&self, path: &Path) -> Result<(), TreeError> {
        std::fs::File::create(path)?.write_all(self.to_xml()?.as_bytes())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flattener_mapping() -> FlattenerMapping {
        FlattenerMapping {
            schema_url: Some(String::from("/data/MIF254.xsd")),
            document_url: Some(String::from("http://example.org/interactions.xml")),
            separator: String::from("\t"),
            manage_choices: true,
            auto_duplicate: false,
            line_node: Some(String::from("1.0")),
            expand_choices: vec![
                ExpansionRecord {
                    path: String::from("1.0.3"),
                    choice: Some(String::from("interactorRef")),
                },
                ExpansionRecord {
                    path: String::from("1.0.2"),
                    choice: None,
                },
            ],
            selections: vec![String::from("1.0.0"), String::from("")],
            names: BTreeMap::from([(String::from("1.0.0"), String::from("interaction id"))]),
            filters: BTreeMap::from([(String::from("1.0.0"), String::from("[0-9]+ & <x>"))]),
        }
    }

    #[test]
    fn flattener_mappings_read_back_unchanged() {
        let mapping = flattener_mapping();
        let xml = mapping.to_xml().unwrap();
        assert!(xml.contains("<separator>\t</separator>"), "{xml}");
        let read = FlattenerMapping::from_xml(&xml).unwrap();
        assert_eq!(read, mapping);
        assert_eq!(read.to_xml().unwrap(), xml);
    }

    #[test]
    fn missing_sections_take_defaults() {
        let mapping = FlattenerMapping::from_xml(
            "<flattenerMapping><schemaURL> s.xsd </schemaURL></flattenerMapping>",
        )
        .unwrap();
        assert_eq!(mapping.schema_url.as_deref(), Some("s.xsd"));
        assert_eq!(mapping.separator, "\t");
        assert!(mapping.selections.is_empty());
        assert!(!mapping.manage_choices && !mapping.auto_duplicate);

        assert!(matches!(
            FlattenerMapping::from_xml("<makerMapping/>"),
            Err(TreeError::Mapping(_))
        ));
        assert!(matches!(
            FlattenerMapping::from_xml(
                "<flattenerMapping><selections><node/></selections></flattenerMapping>"
            ),
            Err(TreeError::Mapping(_))
        ));
    }

    #[test]
    fn maker_mappings_read_back_unchanged() {
        let mut tree = TreeMapping {
            schema_url: Some(String::from("schema.xsd")),
            ..Default::default()
        };
        tree.flat_files.insert(String::from("0.1"), 0);
        tree.fields.insert(
            String::from("0.1.0"),
            FieldReference {
                flat_file: 0,
                field: String::from("2.1"),
            },
        );
        tree.values.insert(String::from("0.0"), String::from("2.5.4"));
        tree.dictionaries.insert(
            String::from("0.1.1"),
            DictionaryAssociation {
                dictionary: 0,
                column: 1,
                source: FieldReference {
                    flat_file: 0,
                    field: String::from("3"),
                },
            },
        );
        tree.generated_ids.insert(String::from("0.1.2"));
        tree.validations
            .insert(String::from("0.1.0"), String::from("[A-Z][0-9]+"));
        let mapping = MakerMapping {
            flat_files: vec![FlatFileMapping {
                url: String::from("interactions.txt"),
                line_separator: Some(String::from("//")),
                first_line_for_titles: true,
                separators: BTreeMap::from([
                    (String::from(""), String::from("\t")),
                    (String::from("2"), String::from(" ")),
                ]),
            }],
            dictionaries: vec![DictionaryMapping {
                url: String::from("organisms.txt"),
                separator: String::from(";"),
                case_sensitive: false,
            }],
            tree,
        };

        let xml = mapping.to_xml().unwrap();
        let read = MakerMapping::from_xml(&xml).unwrap();
        assert_eq!(read, mapping);
    }
}
