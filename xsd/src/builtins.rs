use lazy_static::lazy_static;

use super::complex_type_def::{ComplexTypeDefinition, ContentType, DerivationMethod};
use super::mapping_context::RootContext;
use super::model_group::Compositor;
use super::particle::MaxOccurs;
use super::simple_type_def::{SimpleTypeDefinition, Variety};
use super::xstypes::{QName, XS_NAMESPACE};
use super::{ModelGroup, Particle, Term, TypeDefinition};

lazy_static! {
    /// The `xs:anyType` qualified name
    pub static ref XS_ANY_TYPE_NAME: QName = QName::xs("anyType");
    /// The `xs:anySimpleType` qualified name
    pub static ref XS_ANY_SIMPLE_TYPE_NAME: QName = QName::xs("anySimpleType");
}

/// Built-in atomic types as `(name, base)`, ordered so that every base precedes its derivations.
const ATOMIC_TYPES: &[(&str, &str)] = &[
    ("anyAtomicType", "anySimpleType"),
    ("string", "anyAtomicType"),
    ("boolean", "anyAtomicType"),
    ("decimal", "anyAtomicType"),
    ("float", "anyAtomicType"),
    ("double", "anyAtomicType"),
    ("duration", "anyAtomicType"),
    ("dateTime", "anyAtomicType"),
    ("time", "anyAtomicType"),
    ("date", "anyAtomicType"),
    ("gYearMonth", "anyAtomicType"),
    ("gYear", "anyAtomicType"),
    ("gMonthDay", "anyAtomicType"),
    ("gDay", "anyAtomicType"),
    ("gMonth", "anyAtomicType"),
    ("hexBinary", "anyAtomicType"),
    ("base64Binary", "anyAtomicType"),
    ("anyURI", "anyAtomicType"),
    ("QName", "anyAtomicType"),
    ("NOTATION", "anyAtomicType"),
    ("normalizedString", "string"),
    ("token", "normalizedString"),
    ("language", "token"),
    ("NMTOKEN", "token"),
    ("Name", "token"),
    ("NCName", "Name"),
    ("ID", "NCName"),
    ("IDREF", "NCName"),
    ("ENTITY", "NCName"),
    ("integer", "decimal"),
    ("nonPositiveInteger", "integer"),
    ("negativeInteger", "nonPositiveInteger"),
    ("long", "integer"),
    ("int", "long"),
    ("short", "int"),
    ("byte", "short"),
    ("nonNegativeInteger", "integer"),
    ("unsignedLong", "nonNegativeInteger"),
    ("unsignedInt", "unsignedLong"),
    ("unsignedShort", "unsignedInt"),
    ("unsignedByte", "unsignedShort"),
    ("positiveInteger", "nonNegativeInteger"),
    ("dateTimeStamp", "dateTime"),
    ("dayTimeDuration", "duration"),
    ("yearMonthDuration", "duration"),
];

/// Built-in list types as `(name, item type)`
const LIST_TYPES: &[(&str, &str)] = &[
    ("NMTOKENS", "NMTOKEN"),
    ("IDREFS", "IDREF"),
    ("ENTITIES", "ENTITY"),
];

pub(super) fn register_builtins(context: &mut RootContext) {
    register_xs_any_type(context);

    let any_type = context.resolve::<TypeDefinition>(&XS_ANY_TYPE_NAME).ok();
    let any_simple_type = context.create(SimpleTypeDefinition {
        name: Some("anySimpleType".into()),
        target_namespace: Some(XS_NAMESPACE.into()),
        base_type_definition: any_type,
        variety: None,
        enumeration: Vec::new(),
        patterns: Vec::new(),
        is_builtin: true,
    });
    context.register_with_name(
        XS_ANY_SIMPLE_TYPE_NAME.clone(),
        TypeDefinition::Simple(any_simple_type),
    );

    for (name, base) in ATOMIC_TYPES {
        register_builtin_simple_type(context, name, base, Variety::Atomic);
    }
    for (name, item) in LIST_TYPES {
        let item_type = context
            .resolve::<TypeDefinition>(&QName::xs(*item))
            .ok()
            .and_then(TypeDefinition::simple);
        let Some(item_type) = item_type else {
            continue;
        };
        register_builtin_simple_type(context, name, "anySimpleType", Variety::List(item_type));
    }
}

fn register_builtin_simple_type(
    context: &mut RootContext,
    name: &str,
    base: &str,
    variety: Variety,
) {
    let base_type_definition = context.resolve::<TypeDefinition>(&QName::xs(base)).ok();
    let simple = context.create(SimpleTypeDefinition {
        name: Some(name.into()),
        target_namespace: Some(XS_NAMESPACE.into()),
        base_type_definition,
        variety: Some(variety),
        enumeration: Vec::new(),
        patterns: Vec::new(),
        is_builtin: true,
    });
    context.register_with_name(QName::xs(name), TypeDefinition::Simple(simple));
}

/// Registers the only built-in complex type, `xs:anyType`, which accepts any content.
fn register_xs_any_type(context: &mut RootContext) {
    let wildcard = context.create(Particle {
        min_occurs: 0,
        max_occurs: MaxOccurs::Unbounded,
        term: Term::Wildcard,
    });
    let group = context.create(ModelGroup {
        compositor: Compositor::Sequence,
        particles: vec![wildcard],
    });
    let particle = context.create(Particle {
        min_occurs: 1,
        max_occurs: MaxOccurs::Count(1),
        term: Term::ModelGroup(group),
    });

    let xs_any_type = context.create(ComplexTypeDefinition {
        name: Some("anyType".into()),
        target_namespace: Some(XS_NAMESPACE.into()),
        base_type_definition: None,
        derivation_method: DerivationMethod::Restriction,
        abstract_: false,
        attribute_uses: Vec::new(),
        attribute_group_references: Vec::new(),
        content_type: ContentType::Mixed {
            particle: Some(particle),
        },
        is_builtin: true,
    });
    context.register_with_name(XS_ANY_TYPE_NAME.clone(), TypeDefinition::Complex(xs_any_type));
}
