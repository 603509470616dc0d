use super::{
    complex_type_def::ComplexTypeDefinition,
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

/// Schema Component: Element Declaration, a kind of [Term](super::shared::Term) (§3.3)
#[derive(Clone, Debug)]
pub struct ElementDeclaration {
    pub name: NCName,
    pub target_namespace: Option<AnyURI>,
    /// `None` if the declaration names no type at all. Such elements accept any content, but
    /// nothing is known about their structure.
    pub type_definition: Option<TypeDefinition>,
    pub scope: Scope,
    pub value_constraint: Option<ValueConstraint>,
    pub nillable: bool,
    pub abstract_: bool,
}

/// Property Record: Scope (§3.3)
pub type Scope = shared::Scope<()>;

impl ElementDeclaration {
    pub const TAG_NAME: &'static str = "element";

    fn map_from_xml_common(
        context: &mut MappingContext,
        element: Node,
        target_namespace: Option<AnyURI>,
        scope: Scope,
    ) -> Result<Self, XsdError> {
        // {name} The ·actual value· of the name [attribute].
        let name: NCName = required_attribute_value(element, "name")?;

        // {type definition}
        //   The type definition corresponding to the <simpleType> or <complexType> child, if
        //   either is present, otherwise the type ·resolved· to by the type [attribute].
        let inline_type = element
            .children()
            .find(|c| {
                c.tag_name().name() == SimpleTypeDefinition::TAG_NAME
                    || c.tag_name().name() == ComplexTypeDefinition::TAG_NAME
            });
        let type_definition = match inline_type {
            Some(simple) if simple.tag_name().name() == SimpleTypeDefinition::TAG_NAME => Some(
                TypeDefinition::Simple(SimpleTypeDefinition::map_from_xml(context, simple, None)?),
            ),
            Some(complex) => Some(TypeDefinition::Complex(
                ComplexTypeDefinition::map_from_xml(context, complex, None)?,
            )),
            None => match attribute_value::<QName>(element, "type")? {
                Some(type_name) => Some(context.resolve(&type_name)?),
                None => None,
            },
        };

        Ok(Self {
            name,
            target_namespace,
            type_definition,
            scope,
            value_constraint: ValueConstraint::map_from_xml(element),
            nillable: attribute_value(element, "nillable")?.unwrap_or(false),
            abstract_: attribute_value(element, "abstract")?.unwrap_or(false),
        })
    }

    /// Maps a local `<element>` with a name (element references are handled by the particle).
    pub(super) fn map_from_xml_local(
        context: &mut MappingContext,
        element: Node,
    ) -> Result<Ref<Self>, XsdError> {
        // {target namespace}
        //   The target namespace of the schema if the declaration is qualified, otherwise
        //   ·absent·.
        let target_namespace = if context.is_qualified(element, "elementFormDefault") {
            context.target_namespace()
        } else {
            None
        };
        let decl = Self::map_from_xml_common(context, element, target_namespace, Scope::Local(()))?;
        Ok(context.create(decl))
    }

    /// The declared type, as a complex type, if it is one
    pub fn complex_type(&self) -> Option<Ref<ComplexTypeDefinition>> {
        self.type_definition.and_then(TypeDefinition::complex)
    }
}

impl TopLevelMappable for ElementDeclaration {
    fn map_from_top_level_xml(
        context: &mut MappingContext,
        self_ref: Ref<Self>,
        element: Node,
    ) -> Result<(), XsdError> {
        let target_namespace = context.target_namespace();
        let decl = Self::map_from_xml_common(context, element, target_namespace, Scope::Global)?;
        context.insert(self_ref, decl);
        Ok(())
    }
}

impl Component for ElementDeclaration {
    const DISPLAY_NAME: &'static str = "ElementDeclaration";
}

impl Named for ElementDeclaration {
    fn name(&self) -> Option<QName> {
        Some(QName::with_optional_namespace(
            self.target_namespace.as_ref(),
            &self.name,
        ))
    }
}
