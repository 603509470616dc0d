use roxmltree::Node;

use super::{
    attribute_decl::AttributeDeclaration,
    components::Component,
    error::XsdError,
    shared,
    values::attribute_value,
    xstypes::QName,
    MappingContext, Ref,
};

/// Schema Component: Attribute Use, a kind of Annotated Component (§3.5)
#[derive(Clone, Debug)]
pub struct AttributeUse {
    pub required: bool,
    pub attribute_declaration: Ref<AttributeDeclaration>,
    pub value_constraint: Option<ValueConstraint>,
}

/// Property Record: Value Constraint (§3.5)
pub use shared::ValueConstraint;

impl AttributeUse {
    /// Maps an `<attribute>` inside a complex type or attribute group. Prohibited uses map to
    /// `None`.
    pub(super) fn map_from_xml(
        context: &mut MappingContext,
        attribute: Node,
    ) -> Result<Option<Ref<Self>>, XsdError> {
        let use_ = attribute.attribute("use").unwrap_or("optional");
        if use_ == "prohibited" {
            return Ok(None);
        }

        let attribute_declaration = match attribute_value::<QName>(attribute, "ref")? {
            Some(name) => context.resolve(&name)?,
            None => AttributeDeclaration::map_from_xml_local(context, attribute)?,
        };

        Ok(Some(context.create(Self {
            required: use_ == "required",
            attribute_declaration,
            value_constraint: ValueConstraint::map_from_xml(attribute),
        })))
    }
}

impl Component for AttributeUse {
    const DISPLAY_NAME: &'static str = "AttributeUse";
}
