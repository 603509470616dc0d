use super::{
    attribute_decl::AttributeDeclaration,
    attribute_group_def::AttributeGroupDefinition,
    components::{Component, ComponentTraits, HasArenaContainer, Lookup, LookupTables},
    element_decl::ElementDeclaration,
    error::XsdError,
    import::Import,
    mapping_context::{RootContext, TopLevel, TopLevelElements, TopLevelMappable},
    model_group_def::ModelGroupDefinition,
    shared::TypeDefinition,
    values::required_attribute_value,
    xstypes::{QName, Set, XS_NAMESPACE},
    ComplexTypeDefinition, MappingContext, Ref, SimpleTypeDefinition,
};
use roxmltree::Node;

/// Schema Component: Schema (§3.17), assembled from one or more schema documents
#[derive(Clone, Debug, Default)]
pub struct Schema {
    pub type_definitions: Set<TypeDefinition>,
    pub attribute_declarations: Set<Ref<AttributeDeclaration>>,
    pub element_declarations: Set<Ref<ElementDeclaration>>,
    pub attribute_group_definitions: Set<Ref<AttributeGroupDefinition>>,
    pub model_group_definitions: Set<Ref<ModelGroupDefinition>>,

    /// The target namespace of the main schema document
    pub target_namespace: Option<String>,
}

impl Schema {
    pub fn is_schema_element(node: Node) -> bool {
        node.tag_name().name() == "schema" && node.tag_name().namespace() == Some(XS_NAMESPACE)
    }

    /// The `<include>`/`<import>`/... elements of a schema document
    pub fn imports<'a, 'input>(schema: Node<'a, 'input>) -> impl Iterator<Item = Import> + 'a {
        schema.children().filter_map(Import::map_from_xml)
    }

    /// First pass over a schema document: reserves a [`Ref`] for each top-level component and
    /// registers it under its name, so that the second pass can resolve references regardless
    /// of declaration order or document.
    pub(super) fn reserve_top_level(
        context: &mut RootContext,
        schema: Node,
    ) -> Result<TopLevelElements, XsdError> {
        fn reserve<C>(
            context: &mut RootContext,
            top_level: &mut TopLevelElements,
            node: Node,
            name: QName,
        ) -> Ref<C>
        where
            C: Component,
            ComponentTraits: HasArenaContainer<C>,
            LookupTables: Lookup<Ref<C>>,
            TopLevelElements: TopLevel<C>,
        {
            let ref_ = context.reserve::<C>();
            context.register_with_name(name, ref_);
            top_level.insert(node, ref_);
            ref_
        }

        let target_namespace = schema.attribute("targetNamespace");
        let mut top_level = TopLevelElements::default();

        for node in schema.children().filter(|e| e.is_element()) {
            if node.tag_name().namespace() != Some(XS_NAMESPACE) {
                continue;
            }
            let name = || -> Result<QName, XsdError> {
                let local: String = required_attribute_value(node, "name")?;
                Ok(QName::with_optional_namespace(target_namespace, local))
            };

            match node.tag_name().name() {
                SimpleTypeDefinition::TAG_NAME => {
                    let ref_ = context.reserve::<SimpleTypeDefinition>();
                    context.register_with_name(name()?, TypeDefinition::Simple(ref_));
                    top_level.insert(node, ref_);
                }
                ComplexTypeDefinition::TAG_NAME => {
                    let ref_ = context.reserve::<ComplexTypeDefinition>();
                    context.register_with_name(name()?, TypeDefinition::Complex(ref_));
                    top_level.insert(node, ref_);
                }
                AttributeDeclaration::TAG_NAME => {
                    reserve::<AttributeDeclaration>(context, &mut top_level, node, name()?);
                }
                ElementDeclaration::TAG_NAME => {
                    reserve::<ElementDeclaration>(context, &mut top_level, node, name()?);
                }
                AttributeGroupDefinition::TAG_NAME => {
                    reserve::<AttributeGroupDefinition>(context, &mut top_level, node, name()?);
                }
                ModelGroupDefinition::TAG_NAME => {
                    reserve::<ModelGroupDefinition>(context, &mut top_level, node, name()?);
                }
                "annotation" | "notation" | "defaultOpenContent" => {}
                tag if Import::TAG_NAMES.contains(&tag) => {}
                tag => log::warn!("ignoring unknown top level element <{tag}>"),
            }
        }

        Ok(top_level)
    }

    /// Second pass over a schema document: maps each top-level component into the slot reserved
    /// for it and records it in this schema.
    pub(super) fn map_from_xml(
        &mut self,
        root_context: &mut RootContext,
        schema: Node,
        top_level: &TopLevelElements,
    ) -> Result<(), XsdError> {
        let mut context = MappingContext::new(root_context, schema, top_level);

        fn map<C>(
            context: &mut MappingContext,
            node: Node,
        ) -> Result<Option<Ref<C>>, XsdError>
        where
            C: TopLevelMappable,
            ComponentTraits: HasArenaContainer<C>,
            TopLevelElements: TopLevel<C>,
        {
            let Some(ref_) = context.top_level_ref::<C>(node) else {
                return Ok(None);
            };
            C::map_from_top_level_xml(context, ref_, node)?;
            Ok(Some(ref_))
        }

        for node in schema.children().filter(|e| e.is_element()) {
            match node.tag_name().name() {
                SimpleTypeDefinition::TAG_NAME => {
                    if let Some(r) = map::<SimpleTypeDefinition>(&mut context, node)? {
                        self.type_definitions.push(TypeDefinition::Simple(r));
                    }
                }
                ComplexTypeDefinition::TAG_NAME => {
                    if let Some(r) = map::<ComplexTypeDefinition>(&mut context, node)? {
                        self.type_definitions.push(TypeDefinition::Complex(r));
                    }
                }
                AttributeDeclaration::TAG_NAME => {
                    self.attribute_declarations
                        .extend(map::<AttributeDeclaration>(&mut context, node)?);
                }
                ElementDeclaration::TAG_NAME => {
                    self.element_declarations
                        .extend(map::<ElementDeclaration>(&mut context, node)?);
                }
                AttributeGroupDefinition::TAG_NAME => {
                    self.attribute_group_definitions
                        .extend(map::<AttributeGroupDefinition>(&mut context, node)?);
                }
                ModelGroupDefinition::TAG_NAME => {
                    self.model_group_definitions
                        .extend(map::<ModelGroupDefinition>(&mut context, node)?);
                }
                _ => {}
            }
        }
        Ok(())
    }

    /// Finds a top-level element declaration by its local name.
    pub fn element_declaration_by_name(
        &self,
        name: &str,
        table: &impl super::components::ComponentTable,
    ) -> Option<Ref<ElementDeclaration>> {
        self.element_declarations
            .iter()
            .copied()
            .find(|e| e.get(table).name == name)
    }
}
