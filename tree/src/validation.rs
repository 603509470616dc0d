//! Structural checking of instance documents against the schema model.
//!
//! Only the shape is checked: element and attribute names, required attributes and occurrence
//! counts. Simple type values are not validated.

use std::collections::{BTreeMap, HashSet};
use std::fmt;

use fm_xsd::{
    AttributeUse, ComplexTypeDefinition, Compositor, ElementDeclaration, MaxOccurs, Particle, Ref,
    Schema, SchemaComponentTable, Term, TypeDefinition,
};
use roxmltree::{Document, Node};

/// A problem found in a document, located by the element path it was found at
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ValidationProblem {
    pub path: String,
    pub message: String,
}

impl fmt::Display for ValidationProblem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}

/// Receives the problems found while validating a document
pub trait ErrorCollector {
    fn collect(&mut self, problem: ValidationProblem);
}

impl ErrorCollector for Vec<ValidationProblem> {
    fn collect(&mut self, problem: ValidationProblem) {
        self.push(problem);
    }
}

/// The elements a content model allows, by name, with their cumulated occurrence bounds
#[derive(Default)]
struct AllowedContent<'a> {
    elements: BTreeMap<&'a str, (Ref<ElementDeclaration>, u64, MaxOccurs)>,
    open: bool,
}

impl<'a> AllowedContent<'a> {
    fn of_type(complex: &'a ComplexTypeDefinition, components: &'a SchemaComponentTable) -> Self {
        let mut content = Self::default();
        let mut seen = HashSet::new();
        let mut current = Some(complex);
        while let Some(def) = current {
            if let Some(particle) = def.content_type.particle() {
                content.add(particle.get(components), false, MaxOccurs::Count(1), components);
            }
            current = def
                .extended_base()
                .filter(|base| seen.insert(*base))
                .map(|base| base.get(components));
        }
        content
    }

    fn add(
        &mut self,
        particle: &'a Particle,
        optional: bool,
        outer_max: MaxOccurs,
        components: &'a SchemaComponentTable,
    ) {
        let optional = optional || particle.min_occurs == 0;
        let max = particle.max_occurs.mul(&outer_max);
        match particle.term {
            Term::ElementDeclaration(decl) => {
                let name = decl.get(components).name.as_str();
                let min = if optional { 0 } else { particle.min_occurs };
                self.elements
                    .entry(name)
                    .and_modify(|(_, lo, hi)| {
                        *lo += min;
                        *hi = hi.add(&max);
                    })
                    .or_insert((decl, min, max));
            }
            Term::Wildcard => self.open = true,
            Term::ModelGroup(_) | Term::GroupReference(_) => {
                let Some(group) = particle.term.model_group(components) else {
                    return;
                };
                let group = group.get(components);
                let alternatives =
                    group.compositor == Compositor::Choice && group.particles.len() > 1;
                for member in group.particles.iter() {
                    self.add(member.get(components), optional || alternatives, max, components);
                }
            }
        }
    }
}

fn attribute_uses<'a>(
    complex: &'a ComplexTypeDefinition,
    components: &'a SchemaComponentTable,
) -> Vec<&'a AttributeUse> {
    let mut uses = Vec::new();
    let mut seen = HashSet::new();
    let mut current = Some(complex);
    while let Some(def) = current {
        uses.extend(def.all_attribute_uses(components).into_iter().map(|u| u.get(components)));
        current = def
            .extended_base()
            .filter(|base| seen.insert(*base))
            .map(|base| base.get(components));
    }
    uses
}

struct Validator<'a, C: ErrorCollector + ?Sized> {
    components: &'a SchemaComponentTable,
    collector: &'a mut C,
    problems: usize,
}

impl<'a, C: ErrorCollector + ?Sized> Validator<'a, C> {
    fn report(&mut self, path: &str, message: String) {
        self.problems += 1;
        self.collector.collect(ValidationProblem {
            path: path.to_string(),
            message,
        });
    }

    fn element(&mut self, element: Node, decl: &ElementDeclaration, path: &str) {
        let complex = match decl.type_definition {
            Some(TypeDefinition::Complex(complex)) => complex.get(self.components),
            None => return,
            Some(TypeDefinition::Simple(_)) => {
                if element.children().any(|c| c.is_element()) {
                    self.report(path, String::from("element content where a value is expected"));
                }
                return;
            }
        };
        self.attributes(element, complex, path);

        let content = AllowedContent::of_type(complex, self.components);
        let mut counts: BTreeMap<&str, u64> = BTreeMap::new();
        let mut positions: BTreeMap<&str, usize> = BTreeMap::new();
        for child in element.children().filter(Node::is_element) {
            let name = child.tag_name().name();
            let position = positions.entry(name).or_default();
            *position += 1;
            let child_path = format!("{path}/{name}[{position}]");
            match content.elements.get(name) {
                Some((child_decl, _, _)) => {
                    *counts.entry(name).or_default() += 1;
                    self.element(child, child_decl.get(self.components), &child_path);
                }
                None if content.open => {}
                None => self.report(&child_path, format!("element <{name}> is not allowed here")),
            }
        }

        for (name, (_, min, max)) in &content.elements {
            let count = counts.get(name).copied().unwrap_or_default();
            if count < *min {
                self.report(
                    path,
                    format!("expected at least {min} <{name}> elements, found {count}"),
                );
            }
            if !max.allows(count) {
                self.report(path, format!("too many <{name}> elements: {count}"));
            }
        }
    }

    fn attributes(&mut self, element: Node, complex: &ComplexTypeDefinition, path: &str) {
        let uses = attribute_uses(complex, self.components);
        let declared: HashSet<&str> = uses
            .iter()
            .map(|u| u.attribute_declaration.get(self.components).name.as_str())
            .collect();
        for attribute in element.attributes() {
            // xsi:type and friends live in a namespace
            if attribute.namespace().is_none() && !declared.contains(attribute.name()) {
                self.report(
                    path,
                    format!("attribute {:?} is not declared", attribute.name()),
                );
            }
        }
        for use_ in uses.iter().filter(|u| u.required) {
            let name = &use_.attribute_declaration.get(self.components).name;
            if element.attribute(name.as_str()).is_none() {
                self.report(path, format!("required attribute {name:?} is missing"));
            }
        }
    }
}

/// Checks `doc` against the global element declarations of `schema`, handing every problem to
/// `collector`. Returns whether the document is free of problems.
pub fn validate_document<C: ErrorCollector + ?Sized>(
    doc: &Document,
    schema: &Schema,
    components: &SchemaComponentTable,
    collector: &mut C,
) -> bool {
    let root = doc.root_element();
    let name = root.tag_name().name();
    let path = format!("/{name}");
    let mut validator = Validator {
        components,
        collector,
        problems: 0,
    };
    match schema.element_declaration_by_name(name, components) {
        Some(decl) => validator.element(root, decl.get(components), &path),
        None => validator.report(&path, format!("no global element declaration for <{name}>")),
    }
    log::debug!("validation found {} problems", validator.problems);
    validator.problems == 0
}
