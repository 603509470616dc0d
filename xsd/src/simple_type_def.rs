use super::{
    builtins::XS_ANY_SIMPLE_TYPE_NAME,
    components::{Component, Named},
    error::XsdError,
    mapping_context::TopLevelMappable,
    shared::TypeDefinition,
    values::attribute_value,
    xstypes::{AnyURI, NCName, QName},
    MappingContext, Ref,
};
use roxmltree::Node;

/// Schema Component: Simple Type Definition, a kind of Type Definition (§3.16)
///
/// Only the facets the converter makes use of are kept.
#[derive(Clone, Debug)]
pub struct SimpleTypeDefinition {
    pub name: Option<NCName>,
    pub target_namespace: Option<AnyURI>,
    pub base_type_definition: Option<TypeDefinition>,
    /// `None` only for `xs:anySimpleType`
    pub variety: Option<Variety>,
    /// Values of the enumeration facets of a restriction
    pub enumeration: Vec<String>,
    /// Values of the pattern facets of a restriction
    pub patterns: Vec<String>,
    pub is_builtin: bool,
}

#[derive(Clone, Debug)]
pub enum Variety {
    Atomic,
    List(Ref<SimpleTypeDefinition>),
    Union(Vec<Ref<SimpleTypeDefinition>>),
}

impl SimpleTypeDefinition {
    pub const TAG_NAME: &'static str = "simpleType";

    /// Maps a `<simpleType>`, either top-level (with a pre-reserved `self_ref`) or anonymous.
    pub(super) fn map_from_xml(
        context: &mut MappingContext,
        simple_type: Node,
        self_ref: Option<Ref<Self>>,
    ) -> Result<Ref<Self>, XsdError> {
        let self_ref = self_ref.unwrap_or_else(|| context.reserve());

        let name = simple_type.attribute("name").map(str::to_string);
        let target_namespace = name.as_ref().and_then(|_| context.target_namespace());
        let any_simple_type: Option<TypeDefinition> =
            context.resolve(&XS_ANY_SIMPLE_TYPE_NAME).ok();

        let derivation = simple_type
            .children()
            .find(|c| matches!(c.tag_name().name(), "restriction" | "list" | "union"))
            .ok_or_else(|| XsdError::MissingChild {
                element: Self::TAG_NAME.to_string(),
                child: "restriction",
            })?;

        let mut enumeration = Vec::new();
        let mut patterns = Vec::new();

        let (base_type_definition, variety) = match derivation.tag_name().name() {
            "restriction" => {
                let base = match attribute_value::<QName>(derivation, "base")? {
                    Some(base) => context.resolve::<TypeDefinition>(&base)?,
                    None => Self::map_inline_member(context, derivation)?
                        .map(TypeDefinition::Simple)
                        .or(any_simple_type)
                        .ok_or(XsdError::MissingChild {
                            element: "restriction".into(),
                            child: Self::TAG_NAME,
                        })?,
                };
                for facet in derivation.children().filter(|c| c.is_element()) {
                    match (facet.tag_name().name(), facet.attribute("value")) {
                        ("enumeration", Some(value)) => enumeration.push(value.to_string()),
                        ("pattern", Some(value)) => patterns.push(value.to_string()),
                        _ => {}
                    }
                }
                // A base declared further down the document is not mapped yet; treat it as atomic.
                let variety = base
                    .simple()
                    .and_then(|simple| context.components().try_get(simple))
                    .and_then(|simple| simple.variety.clone());
                (Some(base), Some(variety.unwrap_or(Variety::Atomic)))
            }
            "list" => {
                let item_type = match attribute_value::<QName>(derivation, "itemType")? {
                    Some(item) => Self::resolve_simple(context, &item)?,
                    None => Self::map_inline_member(context, derivation)?.ok_or(
                        XsdError::MissingChild {
                            element: "list".into(),
                            child: Self::TAG_NAME,
                        },
                    )?,
                };
                (any_simple_type, Some(Variety::List(item_type)))
            }
            _ => {
                let mut members = Vec::new();
                if let Some(member_types) = derivation.attribute("memberTypes") {
                    for member in member_types.split_ascii_whitespace() {
                        let member = QName::parse(member, derivation)?;
                        members.push(Self::resolve_simple(context, &member)?);
                    }
                }
                for inline in derivation
                    .children()
                    .filter(|c| c.tag_name().name() == Self::TAG_NAME)
                {
                    members.push(Self::map_from_xml(context, inline, None)?);
                }
                (any_simple_type, Some(Variety::Union(members)))
            }
        };

        Ok(context.insert(
            self_ref,
            Self {
                name,
                target_namespace,
                base_type_definition,
                variety,
                enumeration,
                patterns,
                is_builtin: false,
            },
        ))
    }

    fn map_inline_member(
        context: &mut MappingContext,
        parent: Node,
    ) -> Result<Option<Ref<Self>>, XsdError> {
        parent
            .children()
            .find(|c| c.tag_name().name() == Self::TAG_NAME)
            .map(|inline| Self::map_from_xml(context, inline, None))
            .transpose()
    }

    fn resolve_simple(context: &MappingContext, name: &QName) -> Result<Ref<Self>, XsdError> {
        context
            .resolve::<TypeDefinition>(name)?
            .simple()
            .ok_or_else(|| XsdError::UnresolvedReference {
                kind: "simple type definition",
                name: name.clone(),
            })
    }
}

impl TopLevelMappable for SimpleTypeDefinition {
    fn map_from_top_level_xml(
        context: &mut MappingContext,
        self_ref: Ref<Self>,
        simple_type: Node,
    ) -> Result<(), XsdError> {
        Self::map_from_xml(context, simple_type, Some(self_ref)).map(|_| ())
    }
}

impl Component for SimpleTypeDefinition {
    const DISPLAY_NAME: &'static str = "SimpleTypeDefinition";
}

impl Named for SimpleTypeDefinition {
    fn name(&self) -> Option<QName> {
        self.name
            .as_ref()
            .map(|name| QName::with_optional_namespace(self.target_namespace.as_ref(), name))
    }
}
