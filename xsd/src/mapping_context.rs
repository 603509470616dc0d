use std::collections::HashMap;

use roxmltree::{Node, NodeId};

use super::{
    components::{
        Component, ComponentResolver, ComponentTraits, ConstructionComponentTable,
        HasArenaContainer, Lookup, LookupTables, SymbolKind,
    },
    error::XsdError,
    xstypes::QName,
    AttributeDeclaration, AttributeGroupDefinition, ComplexTypeDefinition, ElementDeclaration,
    ModelGroupDefinition, Ref, SimpleTypeDefinition,
};

/// Refs reserved for the top-level components of one schema document, keyed by the node that
/// declares them.
#[derive(Default)]
pub(super) struct TopLevelElements {
    simple_type_definitions: HashMap<NodeId, Ref<SimpleTypeDefinition>>,
    complex_type_definitions: HashMap<NodeId, Ref<ComplexTypeDefinition>>,
    attribute_declarations: HashMap<NodeId, Ref<AttributeDeclaration>>,
    element_declarations: HashMap<NodeId, Ref<ElementDeclaration>>,
    attribute_group_definitions: HashMap<NodeId, Ref<AttributeGroupDefinition>>,
    model_group_definitions: HashMap<NodeId, Ref<ModelGroupDefinition>>,
}

pub(super) trait TopLevel<C>
where
    C: Component,
    ComponentTraits: HasArenaContainer<C>,
{
    fn insert(&mut self, node: Node, ref_: Ref<C>);
    fn get_ref_by_node_id(&self, id: NodeId) -> Option<Ref<C>>;
}

macro_rules! impl_top_level {
    ($field_name:ident: $value_type:ty) => {
        impl TopLevel<$value_type> for TopLevelElements {
            fn insert(&mut self, node: Node, ref_: Ref<$value_type>) {
                self.$field_name.insert(node.id(), ref_);
            }

            fn get_ref_by_node_id(&self, id: NodeId) -> Option<Ref<$value_type>> {
                self.$field_name.get(&id).copied()
            }
        }
    };
}

impl_top_level!(simple_type_definitions: SimpleTypeDefinition);
impl_top_level!(complex_type_definitions: ComplexTypeDefinition);
impl_top_level!(attribute_declarations: AttributeDeclaration);
impl_top_level!(element_declarations: ElementDeclaration);
impl_top_level!(attribute_group_definitions: AttributeGroupDefinition);
impl_top_level!(model_group_definitions: ModelGroupDefinition);

pub(super) trait TopLevelMappable: Component + Sized
where
    ComponentTraits: HasArenaContainer<Self>,
{
    /// Map this component from a top-level XML element into its pre-reserved slot `self_ref`.
    fn map_from_top_level_xml(
        context: &mut MappingContext,
        self_ref: Ref<Self>,
        self_node: Node,
    ) -> Result<(), XsdError>;
}

/// State shared by all schema documents that make up one schema.
#[derive(Default)]
pub struct RootContext {
    components: ConstructionComponentTable,
    resolver: ComponentResolver,
}

impl RootContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub(super) fn components(&self) -> &ConstructionComponentTable {
        &self.components
    }

    pub(super) fn into_components(self) -> ConstructionComponentTable {
        self.components
    }

    pub(super) fn reserve<R>(&mut self) -> Ref<R>
    where
        R: Component,
        ComponentTraits: HasArenaContainer<R>,
    {
        self.components.reserve::<R>()
    }

    pub(super) fn create<R>(&mut self, value: R) -> Ref<R>
    where
        R: Component,
        ComponentTraits: HasArenaContainer<R>,
    {
        self.components.create(value)
    }

    pub(super) fn insert<R>(&mut self, ref_: Ref<R>, value: R) -> Ref<R>
    where
        R: Component,
        ComponentTraits: HasArenaContainer<R>,
    {
        self.components.insert(ref_, value)
    }

    pub(super) fn register_with_name<R>(&mut self, name: QName, value: R)
    where
        R: Copy,
        LookupTables: Lookup<R>,
    {
        self.resolver.register_with_name(name, value)
    }

    pub(super) fn resolve<R>(&self, key: &QName) -> Result<R, XsdError>
    where
        R: Copy + SymbolKind,
        LookupTables: Lookup<R>,
    {
        self.resolver.resolve(key)
    }
}

/// Per-document view on the [`RootContext`]
pub(super) struct MappingContext<'a, 'input: 'a, 'p> {
    root: &'p mut RootContext,
    schema_node: Node<'a, 'input>,
    top_level_refs: &'p TopLevelElements,
}

impl<'a, 'input: 'a, 'p> MappingContext<'a, 'input, 'p> {
    pub(super) fn new(
        root: &'p mut RootContext,
        schema_node: Node<'a, 'input>,
        top_level_refs: &'p TopLevelElements,
    ) -> Self {
        Self {
            root,
            schema_node,
            top_level_refs,
        }
    }

    pub(super) fn target_namespace(&self) -> Option<String> {
        self.schema_node
            .attribute("targetNamespace")
            .map(str::to_string)
    }

    /// Whether local declarations named by `form_default` (`elementFormDefault` or
    /// `attributeFormDefault`) are qualified, unless `node` overrides it with `form`.
    pub(super) fn is_qualified(&self, node: Node, form_default: &str) -> bool {
        node.attribute("form")
            .or_else(|| self.schema_node.attribute(form_default))
            .is_some_and(|form| form == "qualified")
    }

    pub(super) fn components(&self) -> &ConstructionComponentTable {
        self.root.components()
    }

    pub(super) fn reserve<R>(&mut self) -> Ref<R>
    where
        R: Component,
        ComponentTraits: HasArenaContainer<R>,
    {
        self.root.reserve::<R>()
    }

    pub(super) fn create<R>(&mut self, value: R) -> Ref<R>
    where
        R: Component,
        ComponentTraits: HasArenaContainer<R>,
    {
        self.root.create(value)
    }

    pub(super) fn insert<R>(&mut self, ref_: Ref<R>, value: R) -> Ref<R>
    where
        R: Component,
        ComponentTraits: HasArenaContainer<R>,
    {
        self.root.insert(ref_, value)
    }

    pub(super) fn resolve<R>(&self, key: &QName) -> Result<R, XsdError>
    where
        R: Copy + SymbolKind,
        LookupTables: Lookup<R>,
    {
        self.root.resolve(key)
    }

    /// Looks up the ref reserved for the top-level `node` in the first pass.
    pub(super) fn top_level_ref<C>(&self, node: Node) -> Option<Ref<C>>
    where
        C: Component,
        ComponentTraits: HasArenaContainer<C>,
        TopLevelElements: TopLevel<C>,
    {
        self.top_level_refs.get_ref_by_node_id(node.id())
    }
}
