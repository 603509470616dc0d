use std::collections::HashSet;

use super::{
    attribute_group_def::AttributeGroupDefinition,
    attribute_use::AttributeUse,
    builtins::XS_ANY_TYPE_NAME,
    components::{Component, ComponentTable, Named},
    error::XsdError,
    mapping_context::TopLevelMappable,
    shared::TypeDefinition,
    simple_type_def::SimpleTypeDefinition,
    values::{attribute_value, required_attribute_value},
    xstypes::{AnyURI, NCName, QName},
    MappingContext, Particle, Ref,
};
use roxmltree::Node;

/// Schema Component: Complex Type Definition, a kind of Type Definition (§3.4)
#[derive(Clone, Debug)]
pub struct ComplexTypeDefinition {
    pub name: Option<NCName>,
    pub target_namespace: Option<AnyURI>,
    /// `None` only for `xs:anyType`
    pub base_type_definition: Option<TypeDefinition>,
    pub derivation_method: DerivationMethod,
    pub abstract_: bool,
    /// Attribute uses declared directly on this type (not inherited)
    pub attribute_uses: Vec<Ref<AttributeUse>>,
    pub attribute_group_references: Vec<Ref<AttributeGroupDefinition>>,
    /// Content declared directly on this type. For extensions, the base content precedes it.
    pub content_type: ContentType,
    pub is_builtin: bool,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum DerivationMethod {
    Extension,
    Restriction,
}

#[derive(Clone, Debug)]
pub enum ContentType {
    Empty,
    Simple {
        simple_type_definition: Option<TypeDefinition>,
    },
    ElementOnly {
        particle: Ref<Particle>,
    },
    Mixed {
        particle: Option<Ref<Particle>>,
    },
}

impl ContentType {
    pub fn particle(&self) -> Option<Ref<Particle>> {
        match self {
            Self::ElementOnly { particle } => Some(*particle),
            Self::Mixed { particle } => *particle,
            Self::Empty | Self::Simple { .. } => None,
        }
    }

    /// Whether character data is allowed in elements of this type
    pub fn accepts_text(&self) -> bool {
        matches!(self, Self::Simple { .. } | Self::Mixed { .. })
    }
}

impl ComplexTypeDefinition {
    pub const TAG_NAME: &'static str = "complexType";

    /// All attribute uses declared on this type, including those from referenced attribute
    /// groups, in declaration order.
    pub fn all_attribute_uses(&self, table: &impl ComponentTable) -> Vec<Ref<AttributeUse>> {
        let mut uses = self.attribute_uses.clone();
        AttributeGroupDefinition::flatten(
            &self.attribute_group_references,
            table,
            &mut HashSet::new(),
            &mut uses,
        );
        uses
    }

    /// The base type if this type extends a complex type. Restrictions restate their whole
    /// content, so only extensions inherit members.
    pub fn extended_base(&self) -> Option<Ref<ComplexTypeDefinition>> {
        match self.derivation_method {
            DerivationMethod::Extension => self.base_type_definition?.complex(),
            DerivationMethod::Restriction => None,
        }
    }

    /// Whether text is allowed in elements of this type, considering the extension chain
    pub fn accepts_text(&self, table: &impl ComponentTable) -> bool {
        if self.content_type.accepts_text() {
            return true;
        }
        let mut seen = HashSet::new();
        let mut base = self.extended_base();
        while let Some(base_ref) = base {
            if !seen.insert(base_ref) {
                break;
            }
            let base_def = base_ref.get(table);
            if base_def.content_type.accepts_text() {
                return true;
            }
            base = base_def.extended_base();
        }
        false
    }

    fn map_particle(context: &mut MappingContext, parent: Node) -> Result<Option<Ref<Particle>>, XsdError> {
        let term = parent.children().find(|c| {
            matches!(
                c.tag_name().name(),
                "all" | "choice" | "sequence" | "group"
            )
        });
        match term {
            Some(term) => Particle::map_from_xml(context, term),
            None => Ok(None),
        }
    }

    /// Maps a `<complexType>`, either top-level (with a pre-reserved `self_ref`) or anonymous.
    pub(super) fn map_from_xml(
        context: &mut MappingContext,
        complex_type: Node,
        self_ref: Option<Ref<Self>>,
    ) -> Result<Ref<Self>, XsdError> {
        let self_ref = self_ref.unwrap_or_else(|| context.reserve());

        let name = complex_type.attribute("name").map(str::to_string);
        let target_namespace = name.as_ref().and_then(|_| context.target_namespace());
        let abstract_ = attribute_value(complex_type, "abstract")?.unwrap_or(false);
        let mut mixed: bool = attribute_value(complex_type, "mixed")?.unwrap_or(false);

        let simple_content = complex_type
            .children()
            .find(|c| c.tag_name().name() == "simpleContent");
        let complex_content = complex_type
            .children()
            .find(|c| c.tag_name().name() == "complexContent");

        let value = if let Some(simple_content) = simple_content {
            let derivation = Self::derivation_node(simple_content)?;
            let base: QName = required_attribute_value(derivation, "base")?;
            let base_type_definition: TypeDefinition = context.resolve(&base)?;

            // A restriction may carry an inline simple type narrowing the base.
            let simple_type_definition = match derivation
                .children()
                .find(|c| c.tag_name().name() == SimpleTypeDefinition::TAG_NAME)
            {
                Some(inline) => Some(TypeDefinition::Simple(SimpleTypeDefinition::map_from_xml(
                    context, inline, None,
                )?)),
                None => Some(base_type_definition),
            };

            let (attribute_uses, attribute_group_references) =
                AttributeGroupDefinition::map_attribute_children(context, derivation)?;

            Self {
                name,
                target_namespace,
                base_type_definition: Some(base_type_definition),
                derivation_method: Self::derivation_method(derivation),
                abstract_,
                attribute_uses,
                attribute_group_references,
                content_type: ContentType::Simple {
                    simple_type_definition,
                },
                is_builtin: false,
            }
        } else if let Some(complex_content) = complex_content {
            if let Some(m) = attribute_value(complex_content, "mixed")? {
                mixed = m;
            }
            let derivation = Self::derivation_node(complex_content)?;
            let base: QName = required_attribute_value(derivation, "base")?;
            let base_type_definition: TypeDefinition = context.resolve(&base)?;
            let particle = Self::map_particle(context, derivation)?;
            let (attribute_uses, attribute_group_references) =
                AttributeGroupDefinition::map_attribute_children(context, derivation)?;

            Self {
                name,
                target_namespace,
                base_type_definition: Some(base_type_definition),
                derivation_method: Self::derivation_method(derivation),
                abstract_,
                attribute_uses,
                attribute_group_references,
                content_type: Self::content_type(particle, mixed),
                is_builtin: false,
            }
        } else {
            // Shorthand for a restriction of xs:anyType
            let particle = Self::map_particle(context, complex_type)?;
            let (attribute_uses, attribute_group_references) =
                AttributeGroupDefinition::map_attribute_children(context, complex_type)?;

            Self {
                name,
                target_namespace,
                base_type_definition: context.resolve(&XS_ANY_TYPE_NAME).ok(),
                derivation_method: DerivationMethod::Restriction,
                abstract_,
                attribute_uses,
                attribute_group_references,
                content_type: Self::content_type(particle, mixed),
                is_builtin: false,
            }
        };

        Ok(context.insert(self_ref, value))
    }

    fn derivation_node<'a, 'input>(
        content: Node<'a, 'input>,
    ) -> Result<Node<'a, 'input>, XsdError> {
        content
            .children()
            .find(|c| matches!(c.tag_name().name(), "extension" | "restriction"))
            .ok_or_else(|| XsdError::MissingChild {
                element: content.tag_name().name().to_string(),
                child: "extension",
            })
    }

    fn derivation_method(derivation: Node) -> DerivationMethod {
        if derivation.tag_name().name() == "extension" {
            DerivationMethod::Extension
        } else {
            DerivationMethod::Restriction
        }
    }

    fn content_type(particle: Option<Ref<Particle>>, mixed: bool) -> ContentType {
        match (particle, mixed) {
            (_, true) => ContentType::Mixed { particle },
            (Some(particle), false) => ContentType::ElementOnly { particle },
            (None, false) => ContentType::Empty,
        }
    }
}

impl TopLevelMappable for ComplexTypeDefinition {
    fn map_from_top_level_xml(
        context: &mut MappingContext,
        self_ref: Ref<Self>,
        complex_type: Node,
    ) -> Result<(), XsdError> {
        Self::map_from_xml(context, complex_type, Some(self_ref)).map(|_| ())
    }
}

impl Component for ComplexTypeDefinition {
    const DISPLAY_NAME: &'static str = "ComplexTypeDefinition";
}

impl Named for ComplexTypeDefinition {
    fn name(&self) -> Option<QName> {
        self.name
            .as_ref()
            .map(|name| QName::with_optional_namespace(self.target_namespace.as_ref(), name))
    }
}
