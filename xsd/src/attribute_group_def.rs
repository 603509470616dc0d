use std::collections::HashSet;

use super::{
    attribute_decl::AttributeDeclaration,
    attribute_use::AttributeUse,
    components::{Component, ComponentTable, Named},
    error::XsdError,
    mapping_context::TopLevelMappable,
    values::required_attribute_value,
    xstypes::{AnyURI, NCName, QName},
    MappingContext, Ref,
};
use roxmltree::Node;

/// Schema Component: Attribute Group Definition, a kind of Annotated Component (§3.6)
///
/// References to other attribute groups are kept as such and flattened on demand, so groups may
/// refer to groups declared later in the schema.
#[derive(Clone, Debug)]
pub struct AttributeGroupDefinition {
    pub name: NCName,
    pub target_namespace: Option<AnyURI>,
    pub attribute_uses: Vec<Ref<AttributeUse>>,
    pub attribute_group_references: Vec<Ref<AttributeGroupDefinition>>,
}

impl AttributeGroupDefinition {
    pub const TAG_NAME: &'static str = "attributeGroup";

    /// Maps the `<attribute>` and `<attributeGroup ref=..>` children of `parent`, which is a
    /// complex type, an extension/restriction or an attribute group.
    pub(super) fn map_attribute_children(
        context: &mut MappingContext,
        parent: Node,
    ) -> Result<(Vec<Ref<AttributeUse>>, Vec<Ref<Self>>), XsdError> {
        let mut attribute_uses = Vec::new();
        let mut groups = Vec::new();
        for child in parent.children().filter(|c| c.is_element()) {
            match child.tag_name().name() {
                AttributeDeclaration::TAG_NAME => {
                    if let Some(use_) = AttributeUse::map_from_xml(context, child)? {
                        attribute_uses.push(use_);
                    }
                }
                Self::TAG_NAME => {
                    let name: QName = required_attribute_value(child, "ref")?;
                    groups.push(context.resolve(&name)?);
                }
                _ => {}
            }
        }
        Ok((attribute_uses, groups))
    }

    /// Collects the attribute uses of `groups` and all groups they reference, in declaration
    /// order.
    pub fn flatten(
        groups: &[Ref<Self>],
        table: &impl ComponentTable,
        seen: &mut HashSet<Ref<Self>>,
        out: &mut Vec<Ref<AttributeUse>>,
    ) {
        for &group in groups {
            if !seen.insert(group) {
                continue;
            }
            let group_def = group.get(table);
            out.extend(group_def.attribute_uses.iter().copied());
            Self::flatten(&group_def.attribute_group_references, table, seen, out);
        }
    }
}

impl TopLevelMappable for AttributeGroupDefinition {
    fn map_from_top_level_xml(
        context: &mut MappingContext,
        self_ref: Ref<Self>,
        attribute_group: Node,
    ) -> Result<(), XsdError> {
        let name: NCName = required_attribute_value(attribute_group, "name")?;
        let (attribute_uses, attribute_group_references) =
            Self::map_attribute_children(context, attribute_group)?;
        let target_namespace = context.target_namespace();
        context.insert(
            self_ref,
            Self {
                name,
                target_namespace,
                attribute_uses,
                attribute_group_references,
            },
        );
        Ok(())
    }
}

impl Component for AttributeGroupDefinition {
    const DISPLAY_NAME: &'static str = "AttributeGroupDefinition";
}

impl Named for AttributeGroupDefinition {
    fn name(&self) -> Option<QName> {
        Some(QName::with_optional_namespace(
            self.target_namespace.as_ref(),
            &self.name,
        ))
    }
}
