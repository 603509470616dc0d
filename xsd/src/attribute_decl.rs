use super::{
    builtins::XS_ANY_SIMPLE_TYPE_NAME,
    components::{Component, Named},
    error::XsdError,
    mapping_context::TopLevelMappable,
    shared::{self, TypeDefinition, ValueConstraint},
    simple_type_def::SimpleTypeDefinition,
    values::{attribute_value, required_attribute_value},
    xstypes::{AnyURI, NCName, QName},
    MappingContext, Ref,
};
use roxmltree::Node;

/// Schema Component: Attribute Declaration, a kind of Annotated Component (§3.2)
#[derive(Clone, Debug)]
pub struct AttributeDeclaration {
    pub name: NCName,
    pub target_namespace: Option<AnyURI>,
    pub type_definition: Option<TypeDefinition>,
    pub scope: Scope,
    pub value_constraint: Option<ValueConstraint>,
}

/// Property Record: Scope (§3.2)
pub type Scope = shared::Scope<()>;

impl AttributeDeclaration {
    pub const TAG_NAME: &'static str = "attribute";

    fn map_from_xml_common(
        context: &mut MappingContext,
        attribute: Node,
        target_namespace: Option<AnyURI>,
        scope: Scope,
    ) -> Result<Self, XsdError> {
        let name: NCName = required_attribute_value(attribute, "name")?;

        // {type definition}
        //   The simple type definition corresponding to the <simpleType> child, or the one
        //   ·resolved· to by the type [attribute], otherwise ·xs:anySimpleType·.
        let type_definition = if let Some(simple_type) = attribute
            .children()
            .find(|c| c.tag_name().name() == SimpleTypeDefinition::TAG_NAME)
        {
            Some(TypeDefinition::Simple(SimpleTypeDefinition::map_from_xml(
                context,
                simple_type,
                None,
            )?))
        } else if let Some(type_name) = attribute_value::<QName>(attribute, "type")? {
            Some(context.resolve(&type_name)?)
        } else {
            context.resolve(&XS_ANY_SIMPLE_TYPE_NAME).ok()
        };

        Ok(Self {
            name,
            target_namespace,
            type_definition,
            scope,
            value_constraint: ValueConstraint::map_from_xml(attribute),
        })
    }

    /// Maps a local `<attribute>` with a name attribute to a new declaration.
    pub(super) fn map_from_xml_local(
        context: &mut MappingContext,
        attribute: Node,
    ) -> Result<Ref<Self>, XsdError> {
        let target_namespace = if context.is_qualified(attribute, "attributeFormDefault") {
            context.target_namespace()
        } else {
            None
        };
        let decl =
            Self::map_from_xml_common(context, attribute, target_namespace, Scope::Local(()))?;
        Ok(context.create(decl))
    }

    /// Whether this attribute carries document-wide `xs:ID` values
    pub fn is_id(&self, table: &impl super::components::ComponentTable) -> bool {
        self.type_definition.is_some_and(|t| t.is_id(table))
    }
}

impl TopLevelMappable for AttributeDeclaration {
    fn map_from_top_level_xml(
        context: &mut MappingContext,
        self_ref: Ref<Self>,
        attribute: Node,
    ) -> Result<(), XsdError> {
        let target_namespace = context.target_namespace();
        let decl = Self::map_from_xml_common(context, attribute, target_namespace, Scope::Global)?;
        context.insert(self_ref, decl);
        Ok(())
    }
}

impl Component for AttributeDeclaration {
    const DISPLAY_NAME: &'static str = "AttributeDeclaration";
}

impl Named for AttributeDeclaration {
    fn name(&self) -> Option<QName> {
        Some(QName::with_optional_namespace(
            self.target_namespace.as_ref(),
            &self.name,
        ))
    }
}
