use std::collections::HashSet;

use fm_xsd::{
    ComplexTypeDefinition, Compositor, ElementDeclaration, MaxOccurs, ModelGroup, Particle, Ref,
    Schema, SchemaComponentTable, Term, TypeDefinition,
};

use crate::{
    check::NodeCheck,
    config::TreeConfig,
    error::{LoadError, TreeError},
    loader::LoadedSchema,
    node::{Declaration, NodeKind, NodeRef, SchemaNode},
};

/// One step in shaping a tree beyond what the schema alone determines: the alternative taken
/// for the choice group at `path`, or (when `choice` is `None`) a duplication of the node at
/// `path`. Replaying the records in order rebuilds the same tree.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExpansionRecord {
    pub path: String,
    pub choice: Option<String>,
}

/// Occurrence context inherited from the groups around a particle
#[derive(Copy, Clone, Debug)]
struct Occurs {
    optional: bool,
    max: MaxOccurs,
}

impl Occurs {
    const ONE: Self = Self {
        optional: false,
        max: MaxOccurs::Count(1),
    };
}

/// A tree of elements, attributes and choice groups mirroring a schema, rooted at its first
/// global element. Nodes are materialised lazily by [`expand`](Self::expand).
///
/// Paths address nodes by the dot-separated indices of their ancestors in the raw children
/// lists, starting below the root: `""` is the root, `"0.2"` the third child of its first child.
pub struct SchemaTree {
    schema: Schema,
    components: SchemaComponentTable,
    config: TreeConfig,
    nodes: Vec<SchemaNode>,
    root: NodeRef,
    expansions: Vec<ExpansionRecord>,
}

impl SchemaTree {
    pub fn new(
        schema: Schema,
        components: SchemaComponentTable,
        config: TreeConfig,
    ) -> Result<Self, LoadError> {
        let root_decl = *schema
            .element_declarations
            .first()
            .ok_or(LoadError::NoGlobalElement)?;
        let mut tree = Self {
            schema,
            components,
            config,
            nodes: Vec::new(),
            root: NodeRef(0),
            expansions: Vec::new(),
        };
        let name = root_decl.get(&tree.components).name.clone();
        tree.root = tree.push_node(SchemaNode {
            name,
            kind: NodeKind::Element,
            declaration: Declaration::Element(root_decl),
            parent: None,
            children: Vec::new(),
            min_occurs: 1,
            max_occurs: MaxOccurs::Count(1),
            required: true,
            extended: false,
            transparent: false,
        });
        tree.expand(tree.root);
        Ok(tree)
    }

    pub fn from_loaded(loaded: LoadedSchema, config: TreeConfig) -> Result<Self, TreeError> {
        let location = loaded.location;
        Self::new(loaded.schema, loaded.components, config)
            .map_err(|e| TreeError::schema_load(&location, e))
    }

    pub fn root(&self) -> NodeRef {
        self.root
    }

    pub fn node(&self, node: NodeRef) -> &SchemaNode {
        &self.nodes[node.0]
    }

    pub fn config(&self) -> &TreeConfig {
        &self.config
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn components(&self) -> &SchemaComponentTable {
        &self.components
    }

    pub fn expansions(&self) -> &[ExpansionRecord] {
        &self.expansions
    }

    fn push_node(&mut self, node: SchemaNode) -> NodeRef {
        self.nodes.push(node);
        NodeRef(self.nodes.len() - 1)
    }

    fn add_child(&mut self, parent: NodeRef, mut node: SchemaNode) -> NodeRef {
        node.parent = Some(parent);
        let child = self.push_node(node);
        self.nodes[parent.0].children.push(child);
        child
    }

    /// Materialises the children of `node`, once.
    ///
    /// Elements get one child per attribute, then one per particle of their content, with the
    /// members inherited through extension first. Groups other than managed choices are spliced
    /// into their parent. A managed choice only expands once an alternative was chosen for it.
    pub fn expand(&mut self, node: NodeRef) {
        if self.node(node).extended {
            return;
        }
        match self.node(node).declaration {
            Declaration::Attribute(_) => self.nodes[node.0].extended = true,
            Declaration::Element(decl) => {
                self.nodes[node.0].extended = true;
                self.expand_element(node, decl);
            }
            Declaration::Group(group) => self.expand_choice(node, group),
        }
    }

    fn expand_element(&mut self, node: NodeRef, decl: Ref<ElementDeclaration>) {
        let decl = decl.get(&self.components);
        let type_definition = match decl.type_definition {
            Some(TypeDefinition::Complex(complex)) => complex,
            Some(TypeDefinition::Simple(_)) => return,
            None => {
                log::warn!("element {} has no type, it is left without children", decl.name);
                return;
            }
        };

        let chain = self.extension_chain(type_definition);
        let mut attribute_uses = Vec::new();
        let mut particles = Vec::new();
        for complex in &chain {
            let complex = complex.get(&self.components);
            attribute_uses.extend(complex.all_attribute_uses(&self.components));
            particles.extend(complex.content_type.particle());
        }

        let mut seen = HashSet::new();
        for use_ref in attribute_uses {
            let use_ = use_ref.get(&self.components);
            let name = use_.attribute_declaration.get(&self.components).name.clone();
            // A derived type may restate an inherited attribute
            if !seen.insert(name.clone()) {
                continue;
            }
            let required = use_.required;
            self.add_child(
                node,
                SchemaNode {
                    name,
                    kind: NodeKind::Attribute,
                    declaration: Declaration::Attribute(use_ref),
                    parent: None,
                    children: Vec::new(),
                    min_occurs: u64::from(required),
                    max_occurs: MaxOccurs::Count(1),
                    required,
                    extended: true,
                    transparent: false,
                },
            );
        }

        for particle in particles {
            self.add_particle(node, particle, Occurs::ONE);
        }

        if self.config.auto_duplicate {
            let elements: Vec<NodeRef> = self
                .node(node)
                .children
                .iter()
                .copied()
                .filter(|c| self.node(*c).is_element())
                .collect();
            for child in elements {
                for _ in 1..self.node(child).min_occurs {
                    if self.duplicate_node(child).is_none() {
                        break;
                    }
                }
            }
        }
    }

    /// The type and the complex types it extends, base-most first
    fn extension_chain(
        &self,
        complex: Ref<ComplexTypeDefinition>,
    ) -> Vec<Ref<ComplexTypeDefinition>> {
        let mut chain = vec![complex];
        let mut current = complex.get(&self.components).extended_base();
        while let Some(base) = current {
            if chain.contains(&base) {
                break;
            }
            chain.push(base);
            current = base.get(&self.components).extended_base();
        }
        chain.reverse();
        chain
    }

    fn add_particle(&mut self, parent: NodeRef, particle: Ref<Particle>, occurs: Occurs) {
        let particle = particle.get(&self.components);
        let min_occurs = if occurs.optional {
            0
        } else {
            particle.min_occurs
        };
        let max_occurs = particle.max_occurs.mul(&occurs.max);

        match particle.term {
            Term::ElementDeclaration(decl) => {
                let name = decl.get(&self.components).name.clone();
                self.add_child(
                    parent,
                    SchemaNode {
                        name,
                        kind: NodeKind::Element,
                        declaration: Declaration::Element(decl),
                        parent: None,
                        children: Vec::new(),
                        min_occurs,
                        max_occurs,
                        required: min_occurs > 0,
                        extended: false,
                        transparent: false,
                    },
                );
            }
            Term::ModelGroup(_) | Term::GroupReference(_) => {
                let Some(group_ref) = particle.term.model_group(&self.components) else {
                    return;
                };
                let compositor = group_ref.get(&self.components).compositor;
                if compositor == Compositor::Choice && self.config.manage_choices {
                    let name = self.group_label(group_ref);
                    self.add_child(
                        parent,
                        SchemaNode {
                            name,
                            kind: NodeKind::Group(compositor),
                            declaration: Declaration::Group(group_ref),
                            parent: None,
                            children: Vec::new(),
                            min_occurs,
                            max_occurs,
                            required: min_occurs > 0,
                            extended: false,
                            transparent: false,
                        },
                    );
                } else {
                    // Alternatives of an unmanaged choice are all kept, so none of them is
                    // required on its own
                    let inner = Occurs {
                        optional: min_occurs == 0 || compositor == Compositor::Choice,
                        max: max_occurs,
                    };
                    let members = group_ref.get(&self.components).particles.clone();
                    for member in members {
                        self.add_particle(parent, member, inner);
                    }
                }
            }
            Term::Wildcard => {
                log::debug!("skipping wildcard below {}", self.node(parent).name);
            }
        }
    }

    fn expand_choice(&mut self, node: NodeRef, group: Ref<ModelGroup>) {
        let path = self.path_for(node);
        let Some(label) = self
            .expansions
            .iter()
            .find(|r| r.path == path)
            .and_then(|r| r.choice.clone())
        else {
            log::debug!("no alternative chosen for the choice at {path:?} yet");
            return;
        };

        let alternatives = group.get(&self.components).particles.clone();
        let Some(alternative) = alternatives
            .into_iter()
            .find(|p| self.particle_label(*p) == label)
        else {
            log::warn!("{label:?} is not an alternative of the choice at {path:?}");
            return;
        };

        let node_data = &mut self.nodes[node.0];
        node_data.extended = true;
        node_data.transparent = true;
        let occurs = Occurs {
            optional: node_data.min_occurs == 0,
            max: MaxOccurs::Count(1),
        };
        self.add_particle(node, alternative, occurs);
    }

    fn particle_label(&self, particle: Ref<Particle>) -> String {
        let particle = particle.get(&self.components);
        match particle.term {
            Term::ElementDeclaration(decl) => decl.get(&self.components).name.clone(),
            Term::Wildcard => String::from("any"),
            term => term
                .model_group(&self.components)
                .map(|group| self.group_label(group))
                .unwrap_or_default(),
        }
    }

    fn group_label(&self, group: Ref<ModelGroup>) -> String {
        let group = group.get(&self.components);
        let labels: Vec<String> = group
            .particles
            .iter()
            .map(|p| self.particle_label(*p))
            .collect();
        format!("({})", labels.join(group.compositor.separator()))
    }

    /// Labels of the alternatives of a choice group node; empty for other nodes.
    pub fn choice_alternatives(&self, node: NodeRef) -> Vec<String> {
        match self.node(node).declaration {
            Declaration::Group(group) => group
                .get(&self.components)
                .particles
                .iter()
                .map(|p| self.particle_label(*p))
                .collect(),
            _ => Vec::new(),
        }
    }

    /// Records `label` as the alternative of the choice group `node` and expands the group
    /// with it, replacing an earlier choice.
    pub fn choose(&mut self, node: NodeRef, label: &str) -> Result<(), TreeError> {
        let path = self.path_for(node);
        if !self.choice_alternatives(node).iter().any(|a| a == label) {
            return Err(TreeError::UnknownChoice {
                path,
                choice: label.to_string(),
            });
        }
        if self.node(node).extended {
            self.undo_choice(node);
        }
        self.expansions.push(ExpansionRecord {
            path,
            choice: Some(label.to_string()),
        });
        self.expand(node);
        Ok(())
    }

    /// Reverts the choice made for `node`: drops the records at and below its path and
    /// detaches its children. Returns every detached node.
    pub fn undo_choice(&mut self, node: NodeRef) -> Vec<NodeRef> {
        let path = self.path_for(node);
        let below = format!("{path}.");
        self.expansions
            .retain(|r| r.path != path && !r.path.starts_with(&below));

        let mut removed = Vec::new();
        let mut pending = std::mem::take(&mut self.nodes[node.0].children);
        while let Some(child) = pending.pop() {
            removed.push(child);
            let child_node = &mut self.nodes[child.0];
            child_node.parent = None;
            pending.append(&mut child_node.children);
        }
        let node_data = &mut self.nodes[node.0];
        node_data.extended = false;
        node_data.transparent = false;
        removed
    }

    /// Adds a copy of `node` after its last sibling of the same declaration and records the
    /// duplication. Returns `None` if the node is not duplicable or its siblings already reach
    /// the declared maximum.
    pub fn duplicate(&mut self, node: NodeRef) -> Option<NodeRef> {
        let path = self.path_for(node);
        let copy = self.duplicate_node(node)?;
        self.expansions.push(ExpansionRecord { path, choice: None });
        Some(copy)
    }

    fn duplicate_node(&mut self, node: NodeRef) -> Option<NodeRef> {
        let original = self.node(node);
        let parent = original.parent?;
        if !original.is_duplicable() {
            return None;
        }
        let copies = self.copies_of(node);
        if !original.max_occurs.allows(copies.len() as u64 + 1) {
            return None;
        }
        let last = *copies.last()?;

        let mut copy = original.copy_of();
        copy.parent = Some(parent);
        let copy = self.push_node(copy);
        let siblings = &mut self.nodes[parent.0].children;
        let position = siblings.iter().position(|c| *c == last)?;
        siblings.insert(position + 1, copy);
        Some(copy)
    }

    /// `node` and the siblings sharing its declaration, in order
    pub fn copies_of(&self, node: NodeRef) -> Vec<NodeRef> {
        let declaration = self.node(node).declaration;
        match self.node(node).parent {
            Some(parent) => self
                .node(parent)
                .children
                .iter()
                .copied()
                .filter(|c| self.node(*c).declaration == declaration)
                .collect(),
            None => vec![node],
        }
    }

    /// Finds the node at `path`, expanding nodes on the way. A path one past the last child of a
    /// node is served by duplicating that child once, which keeps mappings written against
    /// trees without the duplication usable.
    pub fn resolve_path(&mut self, path: &str) -> Result<NodeRef, TreeError> {
        let mut node = self.root;
        if path.is_empty() {
            return Ok(node);
        }
        let not_found = || TreeError::PathNotFound(path.to_string());
        for step in path.split('.') {
            let index: usize = step.trim().parse().map_err(|_| not_found())?;
            self.expand(node);
            let children = &self.node(node).children;
            if index == children.len() && index > 0 {
                let last = children[index - 1];
                log::debug!("duplicating the node before missing index {index} of {path:?}");
                self.duplicate(last).ok_or_else(not_found)?;
            }
            node = *self.node(node).children.get(index).ok_or_else(not_found)?;
        }
        Ok(node)
    }

    /// The path of `node`, the inverse of [`resolve_path`](Self::resolve_path)
    pub fn path_for(&self, node: NodeRef) -> String {
        let mut indices = Vec::new();
        let mut current = node;
        while let Some(parent) = self.node(current).parent {
            let index = self
                .node(parent)
                .children
                .iter()
                .position(|c| *c == current)
                .unwrap_or_default();
            indices.push(index.to_string());
            current = parent;
        }
        indices.reverse();
        indices.join(".")
    }

    /// Replays expansion records, typically those of a mapping, on this tree.
    pub fn apply_expansions(&mut self, records: &[ExpansionRecord]) -> Result<(), TreeError> {
        for record in records {
            let node = self.resolve_path(&record.path)?;
            match &record.choice {
                Some(choice) => self.choose(node, choice)?,
                None => {
                    if self.duplicate(node).is_none() {
                        log::warn!("the node at {:?} cannot be duplicated", record.path);
                    }
                }
            }
        }
        Ok(())
    }

    /// Children with transparent groups replaced by their own children
    pub fn logical_children(&self, node: NodeRef) -> Vec<NodeRef> {
        let mut children = Vec::new();
        self.push_logical_children(node, &mut children);
        children
    }

    fn push_logical_children(&self, node: NodeRef, out: &mut Vec<NodeRef>) {
        for &child in &self.node(node).children {
            let child_node = self.node(child);
            if child_node.is_group() && child_node.transparent {
                self.push_logical_children(child, out);
            } else {
                out.push(child);
            }
        }
    }

    /// The element nodes from the root down to `node` (or its owning element, for attributes)
    pub fn element_path(&self, node: NodeRef) -> Vec<NodeRef> {
        let mut path = Vec::new();
        let mut current = Some(node);
        while let Some(n) = current {
            if self.node(n).is_element() {
                path.push(n);
            }
            current = self.node(n).parent;
        }
        path.reverse();
        path
    }

    /// The element owning `node`: the nearest element ancestor
    pub fn owning_element(&self, node: NodeRef) -> Option<NodeRef> {
        let mut current = self.node(node).parent;
        while let Some(n) = current {
            if self.node(n).is_element() {
                return Some(n);
            }
            current = self.node(n).parent;
        }
        None
    }

    pub fn is_ancestor_or_self(&self, ancestor: NodeRef, node: NodeRef) -> bool {
        let mut current = Some(node);
        while let Some(n) = current {
            if n == ancestor {
                return true;
            }
            current = self.node(n).parent;
        }
        false
    }

    /// Whether the document counterpart of `node` carries a value: attributes, elements of a
    /// simple type and elements whose complex type allows text.
    pub fn can_have_value(&self, node: NodeRef) -> bool {
        match self.node(node).declaration {
            Declaration::Attribute(_) => true,
            Declaration::Group(_) => false,
            Declaration::Element(decl) => match decl.get(&self.components).type_definition {
                None | Some(TypeDefinition::Simple(_)) => true,
                Some(TypeDefinition::Complex(complex)) => {
                    complex.get(&self.components).accepts_text(&self.components)
                }
            },
        }
    }

    /// `[root][child][leaf]`, leaving out group nodes
    pub fn print_path(&self, node: NodeRef) -> String {
        let mut names = Vec::new();
        let mut current = Some(node);
        while let Some(n) = current {
            if !self.node(n).is_group() {
                names.push(format!("[{}]", self.node(n).name));
            }
            current = self.node(n).parent;
        }
        names.reverse();
        names.concat()
    }

    pub fn info(&self, node: NodeRef, check: &dyn NodeCheck) -> String {
        let n = self.node(node);
        let kind = match n.kind {
            NodeKind::Element => String::from("element"),
            NodeKind::Attribute => String::from("attribute"),
            NodeKind::Group(compositor) => format!("{compositor:?} group").to_lowercase(),
        };
        let max = match n.max_occurs {
            MaxOccurs::Unbounded => String::from("unbounded"),
            MaxOccurs::Count(count) => count.to_string(),
        };
        let yes_no = |flag: bool| if flag { "yes" } else { "no" };
        format!(
            "name: {}\nkind: {kind}\npath: {}\nmin occurs: {}\nmax occurs: {max}\nrequired: {}\n\
             transparent: {}\nhas value: {}\ncheck: {}",
            n.name,
            self.print_path(node),
            n.min_occurs,
            yes_no(n.required),
            yes_no(n.transparent),
            yes_no(self.can_have_value(node)),
            if check.check_node(self, node) { "ok" } else { "failed" },
        )
    }

    /// Runs `check` over every materialised node attached to the tree.
    pub fn check(&self, check: &dyn NodeCheck) -> bool {
        let mut ok = true;
        let mut pending = vec![self.root];
        while let Some(node) = pending.pop() {
            if !check.check_node(self, node) {
                log::warn!("check failed for {}", self.print_path(node));
                ok = false;
            }
            pending.extend(self.node(node).children.iter().copied());
        }
        ok
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{check::FlattenerCheck, loader::schema_from_str};

    const SCHEMA: &str = r#"
        <xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
          <xs:element name="root">
            <xs:complexType>
              <xs:sequence>
                <xs:element name="item" type="Item" minOccurs="2" maxOccurs="3"/>
                <xs:choice minOccurs="0">
                  <xs:element name="left" type="xs:string"/>
                  <xs:sequence>
                    <xs:element name="up" type="xs:string"/>
                    <xs:element name="down" type="xs:string"/>
                  </xs:sequence>
                </xs:choice>
                <xs:element name="loose"/>
              </xs:sequence>
              <xs:attribute name="version" type="xs:string" use="required"/>
            </xs:complexType>
          </xs:element>
          <xs:complexType name="Base">
            <xs:sequence>
              <xs:element name="label" type="xs:string"/>
            </xs:sequence>
            <xs:attribute name="id" type="xs:ID"/>
          </xs:complexType>
          <xs:complexType name="Item">
            <xs:complexContent>
              <xs:extension base="Base">
                <xs:sequence>
                  <xs:element name="value" type="xs:int" maxOccurs="unbounded"/>
                </xs:sequence>
              </xs:extension>
            </xs:complexContent>
          </xs:complexType>
        </xs:schema>"#;

    fn tree(config: TreeConfig) -> SchemaTree {
        SchemaTree::from_loaded(schema_from_str(SCHEMA).unwrap(), config).unwrap()
    }

    fn names(tree: &SchemaTree, nodes: &[NodeRef]) -> Vec<String> {
        nodes.iter().map(|n| tree.node(*n).name().to_string()).collect()
    }

    #[test]
    fn unmanaged_choices_are_spliced() {
        let tree = tree(TreeConfig::flattener());
        let root = tree.root();
        assert_eq!(
            names(&tree, tree.node(root).children()),
            ["version", "item", "left", "up", "down", "loose"]
        );
        let left = tree.node(root).children()[2];
        assert_eq!(tree.node(left).min_occurs(), 0);
        assert!(!tree.node(left).is_required());
        assert!(tree.node(tree.node(root).children()[0]).is_required());
    }

    #[test]
    fn inherited_members_come_first() {
        let mut tree = tree(TreeConfig::flattener());
        let item = tree.resolve_path("1").unwrap();
        assert!(tree.node(item).is_duplicable());
        tree.expand(item);
        assert_eq!(names(&tree, tree.node(item).children()), ["id", "label", "value"]);
        assert_eq!(tree.path_for(tree.node(item).children()[2]), "1.2");
    }

    #[test]
    fn typeless_elements_are_leaves() {
        let mut tree = tree(TreeConfig::flattener());
        let loose = tree.resolve_path("5").unwrap();
        tree.expand(loose);
        assert!(tree.node(loose).children().is_empty());
        assert!(tree.can_have_value(loose));
    }

    #[test]
    fn managed_choice_expands_the_chosen_alternative() {
        let mut tree = tree(TreeConfig {
            auto_duplicate: false,
            ..TreeConfig::maker()
        });
        let group = tree.resolve_path("2").unwrap();
        assert_eq!(tree.node(group).name(), "(left | (up, down))");
        assert_eq!(tree.choice_alternatives(group), ["left", "(up, down)"]);
        assert!(tree.node(group).children().is_empty());

        tree.choose(group, "(up, down)").unwrap();
        assert!(tree.node(group).is_transparent());
        assert_eq!(
            names(&tree, &tree.logical_children(tree.root())),
            ["version", "item", "up", "down", "loose"]
        );
        let down = tree.resolve_path("2.1").unwrap();
        assert_eq!(tree.print_path(down), "[root][down]");

        let removed = tree.undo_choice(group);
        assert_eq!(removed.len(), 2);
        assert!(tree.expansions().is_empty());
        assert!(!tree.node(group).is_extended());

        assert!(matches!(
            tree.choose(group, "right"),
            Err(TreeError::UnknownChoice { .. })
        ));
    }

    #[test]
    fn replayed_choices_rebuild_the_same_shape() {
        let mut first = tree(TreeConfig::maker());
        let group = first.resolve_path("3").unwrap();
        first.choose(group, "left").unwrap();
        let records = first.expansions().to_vec();

        let mut second = tree(TreeConfig::maker());
        second.apply_expansions(&records).unwrap();
        assert_eq!(second.expansions(), records.as_slice());
        let left = second.resolve_path("3.0").unwrap();
        assert_eq!(second.node(left).name(), "left");
    }

    #[test]
    fn auto_duplication_creates_min_occurs_instances() {
        let mut tree = tree(TreeConfig::maker());
        let root = tree.root();
        assert_eq!(
            names(&tree, tree.node(root).children()),
            ["version", "item", "item", "(left | (up, down))", "loose"]
        );
        let item = tree.node(root).children()[1];
        assert_eq!(tree.copies_of(item).len(), 2);

        let third = tree.duplicate(item).unwrap();
        assert_eq!(tree.path_for(third), "3");
        assert!(tree.duplicate(item).is_none(), "maxOccurs is 3");
        assert_eq!(
            tree.expansions(),
            [ExpansionRecord {
                path: String::from("1"),
                choice: None
            }]
        );
    }

    #[test]
    fn resolve_path_duplicates_once_past_the_end() {
        let mut tree = tree(TreeConfig::flattener());
        let item = tree.resolve_path("1").unwrap();
        tree.expand(item);
        let value = tree.resolve_path("1.3").unwrap();
        assert_eq!(tree.node(value).name(), "value");
        assert_eq!(tree.copies_of(value).len(), 2);
        assert!(matches!(
            tree.resolve_path("1.5"),
            Err(TreeError::PathNotFound(_))
        ));
        assert!(matches!(
            tree.resolve_path("0.0"),
            Err(TreeError::PathNotFound(_))
        ));
    }

    #[test]
    fn info_describes_the_node() {
        let mut tree = tree(TreeConfig::flattener());
        let value = tree.resolve_path("1.2").unwrap();
        let info = tree.info(value, &FlattenerCheck);
        assert!(info.contains("name: value"));
        assert!(info.contains("max occurs: unbounded"));
        assert!(info.contains("path: [root][item][value]"));
        assert!(tree.check(&FlattenerCheck));
    }
}
