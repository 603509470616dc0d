use super::{
    complex_type_def::ComplexTypeDefinition,
    components::{ComponentTable, Named},
    element_decl::ElementDeclaration,
    model_group::ModelGroup,
    model_group_def::ModelGroupDefinition,
    simple_type_def::SimpleTypeDefinition,
    xstypes::QName,
    Ref,
};

/// Base type for the scope of element and attribute declarations, with `P` being the Scope's
/// parent type.
#[derive(Clone, Debug)]
pub enum Scope<P> {
    Global,
    Local(P),
}

impl<P> Scope<P> {
    pub fn is_global(&self) -> bool {
        matches!(self, Self::Global)
    }

    pub fn parent(&self) -> Option<&P> {
        match self {
            Self::Global => None,
            Self::Local(p) => Some(p),
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ValueConstraintVariety {
    Default,
    Fixed,
}

/// Property Record: Value Constraint, shared by element declarations and attribute uses
#[derive(Clone, Debug)]
pub struct ValueConstraint {
    pub variety: ValueConstraintVariety,
    pub lexical_form: String,
}

impl ValueConstraint {
    pub(super) fn map_from_xml(node: roxmltree::Node) -> Option<Self> {
        if let Some(default) = node.attribute("default") {
            Some(Self {
                variety: ValueConstraintVariety::Default,
                lexical_form: default.to_string(),
            })
        } else {
            node.attribute("fixed").map(|fixed| Self {
                variety: ValueConstraintVariety::Fixed,
                lexical_form: fixed.to_string(),
            })
        }
    }
}

/// Supertype of [simple](SimpleTypeDefinition) and [complex](ComplexTypeDefinition) type
/// definitions
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum TypeDefinition {
    Simple(Ref<SimpleTypeDefinition>),
    Complex(Ref<ComplexTypeDefinition>),
}

impl TypeDefinition {
    pub fn simple(self) -> Option<Ref<SimpleTypeDefinition>> {
        match self {
            Self::Simple(simple) => Some(simple),
            Self::Complex(_) => None,
        }
    }

    pub fn complex(self) -> Option<Ref<ComplexTypeDefinition>> {
        match self {
            Self::Complex(complex) => Some(complex),
            Self::Simple(_) => None,
        }
    }

    pub fn name(self, table: &impl ComponentTable) -> Option<QName> {
        match self {
            Self::Simple(simple) => simple.get(table).name(),
            Self::Complex(complex) => complex.get(table).name(),
        }
    }

    /// The base type, or `None` for the roots of the type hierarchy
    pub fn base_type_definition(self, table: &impl ComponentTable) -> Option<TypeDefinition> {
        match self {
            Self::Simple(simple) => simple.get(table).base_type_definition,
            Self::Complex(complex) => complex.get(table).base_type_definition,
        }
    }

    /// Whether values of this type are `xs:ID`s, i.e. whether `xs:ID` is among its ancestors.
    pub fn is_id(self, table: &impl ComponentTable) -> bool {
        let mut current = Some(self);
        // Builtin hierarchies are shallow; the bound guards against cyclic user derivations.
        for _ in 0..64 {
            let Some(type_def) = current else {
                return false;
            };
            if type_def.name(table).is_some_and(|name| name.is_xs("ID")) {
                return true;
            }
            current = type_def.base_type_definition(table);
        }
        false
    }
}

/// Supertype of element declarations, model groups and group references. Wildcards are kept as
/// a variant so the content model stays complete even though they are never expanded.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Term {
    ElementDeclaration(Ref<ElementDeclaration>),
    ModelGroup(Ref<ModelGroup>),
    GroupReference(Ref<ModelGroupDefinition>),
    Wildcard,
}

impl Term {
    pub fn is_model_group(&self) -> bool {
        matches!(self, Self::ModelGroup(_) | Self::GroupReference(_))
    }

    /// Resolves group references to the model group they name.
    pub fn model_group(&self, table: &impl ComponentTable) -> Option<Ref<ModelGroup>> {
        match *self {
            Self::ModelGroup(group) => Some(group),
            Self::GroupReference(definition) => Some(definition.get(table).model_group),
            _ => None,
        }
    }
}
