use super::{
    components::{Component, Named},
    error::XsdError,
    mapping_context::TopLevelMappable,
    model_group::ModelGroup,
    values::required_attribute_value,
    xstypes::{AnyURI, NCName, QName},
    MappingContext, Particle, Ref,
};
use roxmltree::Node;

/// Schema Component: Model Group Definition, a kind of Annotated Component (§3.7)
#[derive(Clone, Debug)]
pub struct ModelGroupDefinition {
    pub name: NCName,
    pub target_namespace: Option<AnyURI>,
    pub model_group: Ref<ModelGroup>,
}

impl ModelGroupDefinition {
    pub const TAG_NAME: &'static str = "group";
}

impl TopLevelMappable for ModelGroupDefinition {
    fn map_from_top_level_xml(
        context: &mut MappingContext,
        self_ref: Ref<Self>,
        group: Node,
    ) -> Result<(), XsdError> {
        let name: NCName = required_attribute_value(group, "name")?;

        // {model group}
        //   The model group which is the {term} of the <all>, <choice> or <sequence> among the
        //   [children]. An empty sequence stands in for a missing one.
        let model_group = match group
            .children()
            .find(|c| matches!(c.tag_name().name(), "all" | "choice" | "sequence"))
        {
            Some(term) => Particle::map_from_xml_model_group_term(context, term)?,
            None => context.create(ModelGroup {
                compositor: super::model_group::Compositor::Sequence,
                particles: Vec::new(),
            }),
        };

        let target_namespace = context.target_namespace();
        context.insert(
            self_ref,
            Self {
                name,
                target_namespace,
                model_group,
            },
        );
        Ok(())
    }
}

impl Component for ModelGroupDefinition {
    const DISPLAY_NAME: &'static str = "ModelGroupDefinition";
}

impl Named for ModelGroupDefinition {
    fn name(&self) -> Option<QName> {
        Some(QName::with_optional_namespace(
            self.target_namespace.as_ref(),
            &self.name,
        ))
    }
}
