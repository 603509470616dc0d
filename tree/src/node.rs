use fm_xsd::{AttributeUse, Compositor, ElementDeclaration, MaxOccurs, ModelGroup, Ref};

/// Handle of a node in a [`SchemaTree`](crate::SchemaTree). Handles stay valid for the lifetime
/// of the tree, even for nodes that were detached by undoing a choice.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeRef(pub(crate) usize);

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum NodeKind {
    Element,
    Attribute,
    /// A model group kept as a node of its own. Only choices are, and only when choices are
    /// managed; other groups merge their particles into the parent.
    Group(Compositor),
}

/// The schema component a node was materialised from. Copies made by duplication share it.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) enum Declaration {
    Element(Ref<ElementDeclaration>),
    Attribute(Ref<AttributeUse>),
    Group(Ref<ModelGroup>),
}

#[derive(Clone, Debug)]
pub struct SchemaNode {
    pub(crate) name: String,
    pub(crate) kind: NodeKind,
    pub(crate) declaration: Declaration,
    pub(crate) parent: Option<NodeRef>,
    pub(crate) children: Vec<NodeRef>,
    pub(crate) min_occurs: u64,
    pub(crate) max_occurs: MaxOccurs,
    pub(crate) required: bool,
    pub(crate) extended: bool,
    pub(crate) transparent: bool,
}

impl SchemaNode {
    /// Local name of the element or attribute; for groups a summary of the alternatives
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    pub fn is_element(&self) -> bool {
        self.kind == NodeKind::Element
    }

    pub fn is_attribute(&self) -> bool {
        self.kind == NodeKind::Attribute
    }

    pub fn is_group(&self) -> bool {
        matches!(self.kind, NodeKind::Group(_))
    }

    pub fn parent(&self) -> Option<NodeRef> {
        self.parent
    }

    /// Materialised children, in schema order, including group nodes
    pub fn children(&self) -> &[NodeRef] {
        &self.children
    }

    pub fn min_occurs(&self) -> u64 {
        self.min_occurs
    }

    pub fn max_occurs(&self) -> MaxOccurs {
        self.max_occurs
    }

    /// Whether the schema allows more than one sibling instance
    pub fn is_duplicable(&self) -> bool {
        self.max_occurs.is_repeatable()
    }

    pub fn is_required(&self) -> bool {
        self.required
    }

    pub fn is_extended(&self) -> bool {
        self.extended
    }

    /// Whether this group's children stand in for it, as if they were children of its parent
    pub fn is_transparent(&self) -> bool {
        self.transparent
    }

    pub(crate) fn copy_of(&self) -> Self {
        Self {
            children: Vec::new(),
            extended: false,
            transparent: false,
            ..self.clone()
        }
    }
}
