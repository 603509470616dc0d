use std::io::Write;
use std::path::Path;

use roxmltree::Document;

use crate::{
    aligner::DocumentBinding,
    check::FlattenerCheck,
    config::{TreeConfig, DEFAULT_SEPARATOR},
    error::TreeError,
    loader::{self, check_well_formed, mapping_location, parsing_options, LoadedSchema},
    mapping::FlattenerMapping,
    node::NodeRef,
    references::{id_attribute_names, KeyDeclarations, ReferenceIndex},
    schema_tree::SchemaTree,
    selection::SelectionModel,
    validation::{validate_document, ValidationProblem},
    writer::FlatWriter,
};

/// A loaded instance document with its reference index
struct LoadedDocument {
    location: Option<String>,
    text: String,
    references: ReferenceIndex,
}

/// Flattens XML documents into delimited text, one row per instance of the line node.
///
/// A flattener owns everything one conversion touches: the schema tree, the selections made on
/// it and the bound document. Mappings capture that setup so it can be restored later.
pub struct Flattener {
    config: TreeConfig,
    schema_location: Option<String>,
    tree: Option<SchemaTree>,
    keys: KeyDeclarations,
    id_attributes: Vec<String>,
    document: Option<LoadedDocument>,
    selection: SelectionModel,
    line_node: Option<NodeRef>,
    separator: String,
    problems: Vec<ValidationProblem>,
}

impl Default for Flattener {
    fn default() -> Self {
        Self::new(TreeConfig::flattener())
    }
}

impl Flattener {
    pub fn new(config: TreeConfig) -> Self {
        Self {
            config,
            schema_location: None,
            tree: None,
            keys: KeyDeclarations::default(),
            id_attributes: Vec::new(),
            document: None,
            selection: SelectionModel::default(),
            line_node: None,
            separator: String::from(DEFAULT_SEPARATOR),
            problems: Vec::new(),
        }
    }

    pub fn config(&self) -> &TreeConfig {
        &self.config
    }

    pub fn set_validate_document(&mut self, validate: bool) {
        self.config.validate_document = validate;
    }

    pub fn tree(&self) -> Option<&SchemaTree> {
        self.tree.as_ref()
    }

    pub fn selection(&self) -> &SelectionModel {
        &self.selection
    }

    pub fn separator(&self) -> &str {
        &self.separator
    }

    pub fn set_separator(&mut self, separator: &str) {
        self.separator = separator.to_string();
    }

    pub fn schema_location(&self) -> Option<&str> {
        self.schema_location.as_deref()
    }

    pub fn document_location(&self) -> Option<&str> {
        self.document.as_ref().and_then(|d| d.location.as_deref())
    }

    /// Problems found by the last document validation
    pub fn validation_errors(&self) -> &[ValidationProblem] {
        &self.problems
    }

    fn tree_mut(&mut self) -> Result<&mut SchemaTree, TreeError> {
        self.tree.as_mut().ok_or(TreeError::NoSchema)
    }

    fn tree_ref(&self) -> Result<&SchemaTree, TreeError> {
        self.tree.as_ref().ok_or(TreeError::NoSchema)
    }

    /// Loads the schema at `location` (a path or URL), replacing the tree and every selection.
    pub fn load_schema(&mut self, location: &str) -> Result<(), TreeError> {
        let loaded = loader::load_schema(location)?;
        self.set_schema(loaded)?;
        self.schema_location = Some(location.to_string());
        Ok(())
    }

    pub fn load_schema_str(&mut self, text: &str) -> Result<(), TreeError> {
        let loaded = loader::schema_from_str(text)?;
        self.set_schema(loaded)?;
        self.schema_location = None;
        Ok(())
    }

    fn set_schema(&mut self, loaded: LoadedSchema) -> Result<(), TreeError> {
        let keys = KeyDeclarations::extract_all(&loaded.documents);
        let tree = SchemaTree::from_loaded(loaded, self.config.clone())?;
        log::info!(
            "schema tree rooted at <{}>, {} keys and {} key references",
            tree.node(tree.root()).name(),
            keys.keys.len(),
            keys.key_refs.len()
        );
        self.id_attributes = id_attribute_names(tree.components(), &self.config);
        self.keys = keys;
        self.tree = Some(tree);
        self.selection.clear();
        self.line_node = None;
        if let Some(document) = self.document.take() {
            self.bind_document(document.location, document.text)?;
        }
        Ok(())
    }

    /// Loads the instance document at `location`. With validation on, the problems found are
    /// collected rather than failing the load.
    pub fn load_document(&mut self, location: &str) -> Result<(), TreeError> {
        let text = loader::load_document(location)?;
        self.bind_document(Some(location.to_string()), text)
    }

    pub fn load_document_str(&mut self, text: &str) -> Result<(), TreeError> {
        check_well_formed("document", text)?;
        self.bind_document(None, text.to_string())
    }

    fn bind_document(&mut self, location: Option<String>, text: String) -> Result<(), TreeError> {
        let name = location.as_deref().unwrap_or("document");
        let doc = Document::parse_with_options(&text, parsing_options())
            .map_err(|e| TreeError::document_load(name, e))?;
        let references = ReferenceIndex::build(&doc, &self.keys, &self.id_attributes);

        self.problems.clear();
        if self.config.validate_document {
            match &self.tree {
                Some(tree) => {
                    validate_document(&doc, tree.schema(), tree.components(), &mut self.problems);
                    log::info!("{name}: {} validation problems", self.problems.len());
                }
                None => log::warn!("cannot validate {name} without a schema"),
            }
        }
        drop(doc);
        self.document = Some(LoadedDocument {
            location,
            text,
            references,
        });
        Ok(())
    }

    /// The node at `path`, materialised if needed
    pub fn node_at(&mut self, path: &str) -> Result<NodeRef, TreeError> {
        self.tree_mut()?.resolve_path(path)
    }

    pub fn select(&mut self, node: NodeRef) {
        self.selection.select(node);
    }

    pub fn unselect(&mut self, node: NodeRef) {
        self.selection.unselect(node);
    }

    pub fn set_name(&mut self, node: NodeRef, name: Option<&str>) {
        self.selection.set_name(node, name);
    }

    pub fn set_filter(&mut self, node: NodeRef, pattern: Option<&str>) -> Result<(), TreeError> {
        self.selection.set_filter(node, pattern)
    }

    /// Fixes the line node instead of deriving it from the selections.
    pub fn set_line_node(&mut self, node: Option<NodeRef>) {
        self.line_node = node;
    }

    /// The explicit line node, or the one the selections lead to
    pub fn line_node(&self) -> Result<NodeRef, TreeError> {
        let tree = self.tree_ref()?;
        Ok(self
            .line_node
            .unwrap_or_else(|| self.selection.line_node(tree)))
    }

    pub fn choose(&mut self, node: NodeRef, choice: &str) -> Result<(), TreeError> {
        self.tree_mut()?.choose(node, choice)
    }

    pub fn duplicate(&mut self, node: NodeRef) -> Result<Option<NodeRef>, TreeError> {
        Ok(self.tree_mut()?.duplicate(node))
    }

    /// Undoes the choice made for `node`, dropping what was set up below it.
    pub fn undo_choice(&mut self, node: NodeRef) -> Result<(), TreeError> {
        let removed = self.tree_mut()?.undo_choice(node);
        self.selection.retain(|n| !removed.contains(&n));
        if self.line_node.is_some_and(|line| removed.contains(&line)) {
            self.line_node = None;
        }
        Ok(())
    }

    pub fn info(&self, node: NodeRef) -> Result<String, TreeError> {
        Ok(self.tree_ref()?.info(node, &FlattenerCheck))
    }

    /// Aligns the document with the tree and hands the binding to `f`.
    fn with_binding<T>(
        &self,
        f: impl FnOnce(&mut DocumentBinding) -> Result<T, TreeError>,
    ) -> Result<T, TreeError> {
        let tree = self.tree_ref()?;
        let document = self.document.as_ref().ok_or(TreeError::NoDocument)?;
        let name = document.location.as_deref().unwrap_or("document");
        let doc = Document::parse_with_options(&document.text, parsing_options())
            .map_err(|e| TreeError::document_load(name, e))?;
        let line_node = self.line_node()?;
        let mut binding =
            DocumentBinding::new(&doc, tree, &self.selection, &document.references, line_node);
        f(&mut binding)
    }

    /// Number of line node instances in the document, that is the number of rows
    pub fn element_count(&self) -> Result<usize, TreeError> {
        self.with_binding(|binding| Ok(binding.line_elements().len()))
    }

    /// Writes the title row and every data row to `out`.
    pub fn write(&self, out: &mut impl Write) -> Result<(), TreeError> {
        self.with_binding(|binding| {
            let mut writer = FlatWriter::new(binding, &self.separator);
            writeln!(out, "{}", writer.title_line())?;
            let rows = writer.rows();
            for row in &rows {
                writeln!(out, "{row}")?;
            }
            log::info!("wrote {} rows", rows.len());
            Ok(())
        })
    }

    /// The title row and at most `rows` data rows
    pub fn preview(&self, rows: usize) -> Result<String, TreeError> {
        self.with_binding(|binding| {
            let mut writer = FlatWriter::new(binding, &self.separator);
            let mut lines = vec![writer.title_line()];
            lines.extend(writer.rows().into_iter().take(rows));
            Ok(lines.join("\n"))
        })
    }

    pub fn export_mapping(&self) -> Result<FlattenerMapping, TreeError> {
        let tree = self.tree_ref()?;
        Ok(FlattenerMapping {
            schema_url: self.schema_location.clone(),
            document_url: self.document_location().map(str::to_string),
            separator: self.separator.clone(),
            manage_choices: self.config.manage_choices,
            auto_duplicate: self.config.auto_duplicate,
            line_node: self.line_node.map(|node| tree.path_for(node)),
            expand_choices: tree.expansions().to_vec(),
            selections: self.selection.selected().map(|n| tree.path_for(n)).collect(),
            names: self
                .selection
                .names()
                .map(|(n, name)| (tree.path_for(n), name.to_string()))
                .collect(),
            filters: self
                .selection
                .filters()
                .map(|(n, filter)| (tree.path_for(n), filter.pattern().to_string()))
                .collect(),
        })
    }

    /// Restores the setup captured by `mapping`: tree settings, schema, expansions, line node,
    /// document, separator, selections, names and filters, in that order. Relative locations resolve
    /// against `base`, the location of the mapping file.
    pub fn load_mapping(
        &mut self,
        mapping: &FlattenerMapping,
        base: Option<&str>,
    ) -> Result<(), TreeError> {
        let locate = |location: &str| match base {
            Some(base) => mapping_location(base, location),
            None => location.to_string(),
        };
        let schema = mapping
            .schema_url
            .as_deref()
            .ok_or_else(|| TreeError::Mapping(String::from("the mapping names no schema")))?;
        self.config.manage_choices = mapping.manage_choices;
        self.config.auto_duplicate = mapping.auto_duplicate;
        self.load_schema(&locate(schema))?;
        self.tree_mut()?.apply_expansions(&mapping.expand_choices)?;

        self.line_node = match &mapping.line_node {
            Some(path) => Some(self.node_at(path)?),
            None => None,
        };
        match &mapping.document_url {
            Some(document) => self.load_document(&locate(document))?,
            None => self.document = None,
        }
        self.separator = mapping.separator.clone();

        for path in &mapping.selections {
            let node = self.node_at(path)?;
            self.selection.select(node);
        }
        for (path, name) in &mapping.names {
            let node = self.node_at(path)?;
            self.selection.set_name(node, Some(name));
        }
        for (path, pattern) in &mapping.filters {
            let node = self.node_at(path)?;
            self.selection.set_filter(node, Some(pattern))?;
        }
        Ok(())
    }

    pub fn load_mapping_file(&mut self, path: &Path) -> Result<(), TreeError> {
        let mapping = FlattenerMapping::read(path)?;
        self.load_mapping(&mapping, Some(&path.to_string_lossy()))
    }

    pub fn save_mapping_file(&self, path: &Path) -> Result<(), TreeError> {
        self.export_mapping()?.save(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCHEMA: &str = r#"
        <xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
          <xs:element name="entrySet">
            <xs:complexType>
              <xs:sequence>
                <xs:element name="entry" maxOccurs="unbounded">
                  <xs:complexType>
                    <xs:sequence>
                      <xs:element name="label" type="xs:string" minOccurs="0"/>
                    </xs:sequence>
                    <xs:attribute name="id" type="xs:string" use="required"/>
                  </xs:complexType>
                </xs:element>
              </xs:sequence>
            </xs:complexType>
          </xs:element>
        </xs:schema>"#;

    const DOCUMENT: &str = r#"<entrySet>
        <entry id="1"><label>first</label></entry>
        <entry id="2"/>
        <entry id="3" colour="blue"><label>third</label></entry>
      </entrySet>"#;

    fn flattener() -> Flattener {
        let mut flattener = Flattener::default();
        flattener.load_schema_str(SCHEMA).unwrap();
        flattener.load_document_str(DOCUMENT).unwrap();
        flattener
    }

    #[test]
    fn writes_titles_and_rows() {
        let mut flattener = flattener();
        let id = flattener.node_at("0.0").unwrap();
        let label = flattener.node_at("0.1").unwrap();
        flattener.select(id);
        flattener.select(label);
        flattener.set_separator(";");

        let mut out = Vec::new();
        flattener.write(&mut out).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "id;label\n1;first\n2;\n3;third\n"
        );
        assert_eq!(flattener.element_count().unwrap(), 3);
        assert_eq!(flattener.preview(1).unwrap(), "id;label\n1;first");
    }

    #[test]
    fn writing_needs_a_schema_and_a_document() {
        let flattener = Flattener::default();
        assert!(matches!(
            flattener.write(&mut Vec::new()),
            Err(TreeError::NoSchema)
        ));

        let mut flattener = Flattener::default();
        flattener.load_schema_str(SCHEMA).unwrap();
        assert!(matches!(flattener.preview(3), Err(TreeError::NoDocument)));
        assert!(matches!(
            flattener.load_document_str("<entrySet>"),
            Err(TreeError::DocumentLoad { .. })
        ));
    }

    #[test]
    fn validation_problems_are_collected() {
        let mut flattener = Flattener::default();
        flattener.set_validate_document(true);
        flattener.load_schema_str(SCHEMA).unwrap();
        flattener.load_document_str(DOCUMENT).unwrap();
        assert_eq!(flattener.validation_errors().len(), 1);
        assert_eq!(flattener.validation_errors()[0].path, "/entrySet/entry[3]");
    }

    #[test]
    fn exported_mappings_name_nodes_by_path() {
        let mut flattener = flattener();
        let label = flattener.node_at("0.1").unwrap();
        flattener.select(label);
        flattener.set_name(label, Some("entry label"));
        flattener.set_filter(label, Some("f.*")).unwrap();
        let entry = flattener.node_at("0").unwrap();
        flattener.set_line_node(Some(entry));

        let mapping = flattener.export_mapping().unwrap();
        assert_eq!(mapping.selections, ["0.1"]);
        assert_eq!(mapping.line_node.as_deref(), Some("0"));
        assert_eq!(mapping.names["0.1"], "entry label");
        assert_eq!(mapping.filters["0.1"], "f.*");
        assert_eq!(flattener.preview(3).unwrap(), "entry label\nfirst\n\n");
    }
}
