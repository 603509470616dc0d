use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;
use std::marker::PhantomData;
use std::num::{NonZeroU32, NonZeroUsize};

use super::{
    error::XsdError, xstypes::QName, AttributeDeclaration, AttributeGroupDefinition, AttributeUse,
    ComplexTypeDefinition, ElementDeclaration, ModelGroup, ModelGroupDefinition, Particle,
    SimpleTypeDefinition, TypeDefinition,
};

/// Trait implemented by all concrete schema components.
pub trait Component {
    const DISPLAY_NAME: &'static str;
}

/// Type on which internal component traits are implemented.
///
/// This type is used to prevent leaking internal functions into the [`Component`]
pub struct ComponentTraits;

/// A component referencable via [`Ref`]. Intended for internal use.
pub trait HasArenaContainer<R: Component>: Sized {
    fn get_container_from_construction_component_table(
        table: &ConstructionComponentTable,
    ) -> &[Option<R>];
    fn get_container_from_construction_component_table_mut(
        table: &mut ConstructionComponentTable,
    ) -> &mut Vec<Option<R>>;
    fn get_container_from_schema_component_table(table: &SchemaComponentTable) -> &[R];
}

/// A reference to a [`Component`] stored in a [`ComponentTable`]
pub struct Ref<R>(NonZeroU32, PhantomData<R>)
where
    R: Component,
    ComponentTraits: HasArenaContainer<R>;

impl<R> Ref<R>
where
    R: Component,
    ComponentTraits: HasArenaContainer<R>,
{
    const fn from_inner(inner: NonZeroU32) -> Self {
        Self(inner, PhantomData)
    }

    fn index(self) -> usize {
        // u32 always fits into usize on the platforms we build for
        self.0.get() as usize - 1
    }

    pub fn get(self, table: &impl ComponentTable) -> &R {
        table.get(self)
    }
}

// derive(...) does not work if R itself does not derive the trait, even though it is only "used"
// in the PhantomData; hence the manual impls.

impl<R> Copy for Ref<R>
where
    R: Component,
    ComponentTraits: HasArenaContainer<R>,
{
}

impl<R> Clone for Ref<R>
where
    R: Component,
    ComponentTraits: HasArenaContainer<R>,
{
    fn clone(&self) -> Self {
        *self
    }
}

impl<R> fmt::Debug for Ref<R>
where
    R: Component,
    ComponentTraits: HasArenaContainer<R>,
{
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "<{} #{}>", R::DISPLAY_NAME, self.0)
    }
}

impl<R> PartialEq for Ref<R>
where
    R: Component,
    ComponentTraits: HasArenaContainer<R>,
{
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

impl<R> Eq for Ref<R>
where
    R: Component,
    ComponentTraits: HasArenaContainer<R>,
{
}

impl<R> Hash for Ref<R>
where
    R: Component,
    ComponentTraits: HasArenaContainer<R>,
{
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.0.hash(state);
    }
}

/// An arena-like container for various [`Component`]s
pub trait ComponentTable {
    /// Retrieves a component's value by reference from this component table.
    /// This function panics if the component value is not present in the table.
    fn get<R>(&self, ref_: Ref<R>) -> &R
    where
        R: Component,
        ComponentTraits: HasArenaContainer<R>;
}

/// The [component table](ComponentTable) used while a schema is being mapped.
///
/// Slots are `Option`s because top-level components are reserved before they are mapped, so that
/// forward and recursive references can be handed out early.
#[derive(Default)]
pub struct ConstructionComponentTable {
    attribute_declarations: Vec<Option<AttributeDeclaration>>,
    attribute_group_definitions: Vec<Option<AttributeGroupDefinition>>,
    attribute_uses: Vec<Option<AttributeUse>>,
    complex_type_definitions: Vec<Option<ComplexTypeDefinition>>,
    element_declarations: Vec<Option<ElementDeclaration>>,
    model_group_definitions: Vec<Option<ModelGroupDefinition>>,
    model_groups: Vec<Option<ModelGroup>>,
    particles: Vec<Option<Particle>>,
    simple_type_definitions: Vec<Option<SimpleTypeDefinition>>,
}

impl ComponentTable for ConstructionComponentTable {
    fn get<R>(&self, ref_: Ref<R>) -> &R
    where
        R: Component,
        ComponentTraits: HasArenaContainer<R>,
    {
        let container = ComponentTraits::get_container_from_construction_component_table(self);
        container
            .get(ref_.index())
            .expect("Invalid component reference (out-of-bounds)")
            .as_ref()
            .expect("Component is not present")
    }
}

impl ConstructionComponentTable {
    /// Like [`ComponentTable::get`], but returns `None` for reserved slots that were not mapped
    /// yet.
    pub(super) fn try_get<R>(&self, ref_: Ref<R>) -> Option<&R>
    where
        R: Component,
        ComponentTraits: HasArenaContainer<R>,
    {
        ComponentTraits::get_container_from_construction_component_table(self)
            .get(ref_.index())
            .and_then(Option::as_ref)
    }

    /// Creates a [`Ref`] which points to an absent, reserved slot in the table.
    pub(super) fn reserve<R>(&mut self) -> Ref<R>
    where
        R: Component,
        ComponentTraits: HasArenaContainer<R>,
    {
        let container = ComponentTraits::get_container_from_construction_component_table_mut(self);
        container.push(None);

        // The length is non-zero right after the push
        let size = NonZeroUsize::new(container.len()).expect("container is non-empty");
        let id: NonZeroU32 = size.try_into().expect("ID did not fit into 32-bit integer");
        Ref::from_inner(id)
    }

    /// Inserts the `value` into the slot pointed to by `ref_`. Returns `ref_` for convenience.
    pub(super) fn insert<R>(&mut self, ref_: Ref<R>, value: R) -> Ref<R>
    where
        R: Component,
        ComponentTraits: HasArenaContainer<R>,
    {
        let container = ComponentTraits::get_container_from_construction_component_table_mut(self);
        let slot = container
            .get_mut(ref_.index())
            .expect("Invalid component reference (out-of-bounds)");
        *slot = Some(value);
        ref_
    }

    /// Shorthand for `insert(reserve(), value)`
    pub(super) fn create<R>(&mut self, value: R) -> Ref<R>
    where
        R: Component,
        ComponentTraits: HasArenaContainer<R>,
    {
        let ref_ = self.reserve();
        self.insert(ref_, value)
    }

    /// Converts this construction table to a [schema table](`SchemaComponentTable`).
    /// Fails if a reserved slot was never filled.
    pub(super) fn convert_to_schema_table(self) -> Result<SchemaComponentTable, XsdError> {
        Ok(SchemaComponentTable {
            attribute_declarations: Self::convert_container(self.attribute_declarations)?,
            attribute_group_definitions: Self::convert_container(self.attribute_group_definitions)?,
            attribute_uses: Self::convert_container(self.attribute_uses)?,
            complex_type_definitions: Self::convert_container(self.complex_type_definitions)?,
            element_declarations: Self::convert_container(self.element_declarations)?,
            model_group_definitions: Self::convert_container(self.model_group_definitions)?,
            model_groups: Self::convert_container(self.model_groups)?,
            particles: Self::convert_container(self.particles)?,
            simple_type_definitions: Self::convert_container(self.simple_type_definitions)?,
        })
    }

    fn convert_container<R: Component>(container: Vec<Option<R>>) -> Result<Box<[R]>, XsdError> {
        container
            .into_iter()
            .map(|component| component.ok_or(XsdError::IncompleteComponent(R::DISPLAY_NAME)))
            .collect()
    }
}

/// The read-only [component table](ComponentTable) handed out alongside the final schema.
///
/// Components for which a [`Ref`] exists are always present in this table.
pub struct SchemaComponentTable {
    attribute_declarations: Box<[AttributeDeclaration]>,
    attribute_group_definitions: Box<[AttributeGroupDefinition]>,
    attribute_uses: Box<[AttributeUse]>,
    complex_type_definitions: Box<[ComplexTypeDefinition]>,
    element_declarations: Box<[ElementDeclaration]>,
    model_group_definitions: Box<[ModelGroupDefinition]>,
    model_groups: Box<[ModelGroup]>,
    particles: Box<[Particle]>,
    simple_type_definitions: Box<[SimpleTypeDefinition]>,
}

impl SchemaComponentTable {
    /// All attribute declarations, global and local
    pub fn attribute_declarations(&self) -> &[AttributeDeclaration] {
        &self.attribute_declarations
    }

    /// All element declarations, global and local
    pub fn element_declarations(&self) -> &[ElementDeclaration] {
        &self.element_declarations
    }
}

impl ComponentTable for SchemaComponentTable {
    fn get<R>(&self, ref_: Ref<R>) -> &R
    where
        R: Component,
        ComponentTraits: HasArenaContainer<R>,
    {
        let container = ComponentTraits::get_container_from_schema_component_table(self);
        container
            .get(ref_.index())
            .expect("Invalid component reference (out-of-bounds)")
    }
}

macro_rules! has_arena_container_impl {
    ($type_name:ty, $field_name:ident) => {
        impl HasArenaContainer<$type_name> for ComponentTraits {
            fn get_container_from_construction_component_table(
                table: &ConstructionComponentTable,
            ) -> &[Option<$type_name>] {
                &table.$field_name
            }

            fn get_container_from_construction_component_table_mut(
                table: &mut ConstructionComponentTable,
            ) -> &mut Vec<Option<$type_name>> {
                &mut table.$field_name
            }

            fn get_container_from_schema_component_table(
                table: &SchemaComponentTable,
            ) -> &[$type_name] {
                &table.$field_name
            }
        }
    };
}

has_arena_container_impl!(AttributeDeclaration, attribute_declarations);
has_arena_container_impl!(AttributeGroupDefinition, attribute_group_definitions);
has_arena_container_impl!(AttributeUse, attribute_uses);
has_arena_container_impl!(ComplexTypeDefinition, complex_type_definitions);
has_arena_container_impl!(ElementDeclaration, element_declarations);
has_arena_container_impl!(ModelGroupDefinition, model_group_definitions);
has_arena_container_impl!(ModelGroup, model_groups);
has_arena_container_impl!(Particle, particles);
has_arena_container_impl!(SimpleTypeDefinition, simple_type_definitions);

/// A component that may have a [qualified name](QName)
pub trait Named: Component {
    fn name(&self) -> Option<QName>;
}

/// Trait that allows components to be looked up by their [qualified name](QName).
/// `V` is the value type (usually `Ref<Component>` or a wrapper like [`TypeDefinition`]).
pub(super) trait Lookup<V: Copy> {
    /// Registers a value in its symbol space. Returns `true` if the name was already taken.
    fn register_value_for_lookup(&mut self, key: QName, value: V) -> bool;

    fn lookup_value(&self, key: &QName) -> Option<V>;
}

type LookupTable<T> = HashMap<QName, T>;

#[derive(Default)]
pub(super) struct LookupTables {
    /// Shared symbol space for simple and complex type definitions
    type_definitions: LookupTable<TypeDefinition>,
    attribute_declarations: LookupTable<Ref<AttributeDeclaration>>,
    element_declarations: LookupTable<Ref<ElementDeclaration>>,
    attribute_group_definitions: LookupTable<Ref<AttributeGroupDefinition>>,
    model_group_definitions: LookupTable<Ref<ModelGroupDefinition>>,
}

macro_rules! impl_lookup {
    ($field_name:ident: $value_type:ty) => {
        impl Lookup<$value_type> for LookupTables {
            fn register_value_for_lookup(&mut self, key: QName, value: $value_type) -> bool {
                self.$field_name.insert(key, value).is_some()
            }

            fn lookup_value(&self, key: &QName) -> Option<$value_type> {
                self.$field_name.get(key).copied()
            }
        }
    };
}

impl_lookup!(type_definitions: TypeDefinition);
impl_lookup!(attribute_declarations: Ref<AttributeDeclaration>);
impl_lookup!(element_declarations: Ref<ElementDeclaration>);
impl_lookup!(attribute_group_definitions: Ref<AttributeGroupDefinition>);
impl_lookup!(model_group_definitions: Ref<ModelGroupDefinition>);

/// Symbol kinds, used in error messages
pub(super) trait SymbolKind {
    const SYMBOL_KIND: &'static str;
}

impl SymbolKind for TypeDefinition {
    const SYMBOL_KIND: &'static str = "type definition";
}

impl<R> SymbolKind for Ref<R>
where
    R: Component,
    ComponentTraits: HasArenaContainer<R>,
{
    const SYMBOL_KIND: &'static str = R::DISPLAY_NAME;
}

/// QName resolution across all mapped schema documents
#[derive(Default)]
pub(super) struct ComponentResolver {
    lookup_tables: LookupTables,
}

impl ComponentResolver {
    pub(super) fn resolve<R>(&self, key: &QName) -> Result<R, XsdError>
    where
        R: Copy + SymbolKind,
        LookupTables: Lookup<R>,
    {
        self.lookup_tables
            .lookup_value(key)
            .ok_or_else(|| XsdError::UnresolvedReference {
                kind: R::SYMBOL_KIND,
                name: key.clone(),
            })
    }

    pub(super) fn register_with_name<R>(&mut self, name: QName, value: R)
    where
        R: Copy,
        LookupTables: Lookup<R>,
    {
        let prev = self
            .lookup_tables
            .register_value_for_lookup(name.clone(), value);
        if prev {
            log::warn!("duplicate definition of {name}, the last one wins");
        }
    }
}
