use super::{
    components::{Component, ComponentTable},
    element_decl::ElementDeclaration,
    error::XsdError,
    model_group::Compositor,
    shared::Term,
    values::{attribute_value, required_attribute_value},
    xstypes::QName,
    MappingContext, ModelGroup, ModelGroupDefinition, Ref,
};
use roxmltree::Node;

/// Schema Component: Particle, a kind of Component (§3.9)
#[derive(Clone, Debug)]
pub struct Particle {
    pub min_occurs: u64,
    pub max_occurs: MaxOccurs,
    pub term: Term,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum MaxOccurs {
    Unbounded,
    Count(u64),
}

impl MaxOccurs {
    pub fn add(&self, other: &Self) -> Self {
        match (self, other) {
            (Self::Unbounded, _) | (_, Self::Unbounded) => Self::Unbounded,
            (Self::Count(a), Self::Count(b)) => Self::Count(a.saturating_add(*b)),
        }
    }

    pub fn mul(&self, other: &Self) -> Self {
        match (self, other) {
            (Self::Count(0), _) | (_, Self::Count(0)) => Self::Count(0),
            (Self::Unbounded, _) | (_, Self::Unbounded) => Self::Unbounded,
            (Self::Count(a), Self::Count(b)) => Self::Count(a.saturating_mul(*b)),
        }
    }

    pub fn max(&self, other: &Self) -> Self {
        match (self, other) {
            (Self::Unbounded, _) | (_, Self::Unbounded) => Self::Unbounded,
            (Self::Count(a), Self::Count(b)) => Self::Count((*a).max(*b)),
        }
    }

    /// Whether more than one occurrence is allowed
    pub fn is_repeatable(&self) -> bool {
        !matches!(self, Self::Count(0 | 1))
    }

    /// Whether `count` occurrences stay within this bound
    pub fn allows(&self, count: u64) -> bool {
        match self {
            Self::Unbounded => true,
            Self::Count(max) => count <= *max,
        }
    }
}

impl Particle {
    pub const DEFAULT_OCCURS: u64 = 1;

    /// Whether the particle may match nothing at all. A choice is emptiable if any of its branches
    /// is; sequences and `all` groups need all members to be emptiable.
    pub fn is_emptiable(&self, components: &impl ComponentTable) -> bool {
        if self.min_occurs == 0 {
            return true;
        }
        let Some(group) = self.term.model_group(components) else {
            return false;
        };
        let group = group.get(components);
        let mut members = group.particles.iter().map(|p| p.get(components));
        match group.compositor {
            Compositor::Choice => members.any(|p| p.is_emptiable(components)),
            Compositor::All | Compositor::Sequence => {
                members.all(|p| p.is_emptiable(components))
            }
        }
    }

    fn map_occurs(particle: Node) -> Result<(u64, MaxOccurs), XsdError> {
        let min_occurs = attribute_value(particle, "minOccurs")?.unwrap_or(Self::DEFAULT_OCCURS);
        let max_occurs = attribute_value(particle, "maxOccurs")?
            .unwrap_or(MaxOccurs::Count(Self::DEFAULT_OCCURS));
        Ok((min_occurs, max_occurs))
    }

    /// Maps any particle element information item: `<element>`, `<group>`, `<all>`, `<choice>`,
    /// `<sequence>` or `<any>`. Returns `None` for other elements (e.g. annotations).
    pub(super) fn map_from_xml(
        context: &mut MappingContext,
        particle: Node,
    ) -> Result<Option<Ref<Self>>, XsdError> {
        let term = match particle.tag_name().name() {
            ElementDeclaration::TAG_NAME => {
                if let Some(name) = particle.attribute("ref") {
                    let name = QName::parse(name, particle)?;
                    Term::ElementDeclaration(context.resolve(&name)?)
                } else {
                    Term::ElementDeclaration(ElementDeclaration::map_from_xml_local(
                        context, particle,
                    )?)
                }
            }
            ModelGroupDefinition::TAG_NAME => {
                let name: QName = required_attribute_value(particle, "ref")?;
                Term::GroupReference(context.resolve(&name)?)
            }
            "all" | "choice" | "sequence" => {
                Term::ModelGroup(Self::map_from_xml_model_group_term(context, particle)?)
            }
            "any" => Term::Wildcard,
            _ => return Ok(None),
        };

        let (min_occurs, max_occurs) = Self::map_occurs(particle)?;
        Ok(Some(context.create(Self {
            min_occurs,
            max_occurs,
            term,
        })))
    }

    /// Maps a `<all>`, `<choice>` or `<sequence>` element to its model group (§3.8.2)
    pub(super) fn map_from_xml_model_group_term(
        context: &mut MappingContext,
        group: Node,
    ) -> Result<Ref<ModelGroup>, XsdError> {
        let compositor = match group.tag_name().name() {
            "all" => Compositor::All,
            "choice" => Compositor::Choice,
            "sequence" => Compositor::Sequence,
            other => return Err(XsdError::UnexpectedElement(other.to_string())),
        };

        let mut particles = Vec::new();
        for child in group.children().filter(|c| c.is_element()) {
            if let Some(particle) = Self::map_from_xml(context, child)? {
                particles.push(particle);
            }
        }

        Ok(context.create(ModelGroup {
            compositor,
            particles,
        }))
    }
}

impl Component for Particle {
    const DISPLAY_NAME: &'static str = "Particle";
}
