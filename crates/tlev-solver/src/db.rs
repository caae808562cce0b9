//! The storage seam between evaluation rules and the interner.
//!
//! Rules, the subtype checker and the formatter all take `&dyn TypeDatabase`
//! so they only see reads of interned payloads plus the normalizing
//! constructors. [`TypeInterner`] is the one implementation.

use crate::def::DefId;
use crate::intern::TypeInterner;
use crate::types::{
    ConditionalType, ConditionalTypeId, FunctionShape, FunctionShapeId, MappedType, MappedTypeId,
    ObjectShape, ObjectShapeId, StringIntrinsicKind, TemplateLiteralId, TemplateSpan,
    TupleElement, TupleListId, TypeApplication, TypeApplicationId, TypeData, TypeId, TypeListId,
};
use std::sync::Arc;
use tlev_common::interner::Atom;

pub trait TypeDatabase {
    // Reads.
    fn lookup(&self, id: TypeId) -> Option<TypeData>;
    fn intern_string(&self, text: &str) -> Atom;
    fn resolve_atom(&self, atom: Atom) -> String;
    fn resolve_atom_ref(&self, atom: Atom) -> Arc<str>;
    fn type_list(&self, id: TypeListId) -> Arc<[TypeId]>;
    fn tuple_list(&self, id: TupleListId) -> Arc<[TupleElement]>;
    fn template_list(&self, id: TemplateLiteralId) -> Arc<[TemplateSpan]>;
    fn object_shape(&self, id: ObjectShapeId) -> Arc<ObjectShape>;
    fn function_shape(&self, id: FunctionShapeId) -> Arc<FunctionShape>;
    fn conditional_type(&self, id: ConditionalTypeId) -> Arc<ConditionalType>;
    fn mapped_type(&self, id: MappedTypeId) -> Arc<MappedType>;
    fn type_application(&self, id: TypeApplicationId) -> Arc<TypeApplication>;
    /// Source text of a string, number or bigint literal.
    fn literal_text(&self, id: TypeId) -> Option<String>;

    // Leaves.
    fn literal_string(&self, value: &str) -> TypeId;
    fn literal_string_atom(&self, atom: Atom) -> TypeId;
    fn literal_number(&self, value: f64) -> TypeId;
    fn literal_boolean(&self, value: bool) -> TypeId;
    fn literal_bigint(&self, digits: &str) -> TypeId;
    fn type_ref(&self, name: Atom) -> TypeId;

    // Composites. These normalize, so callers never build `TypeData` by hand.
    fn union(&self, members: Vec<TypeId>) -> TypeId;
    fn union2(&self, left: TypeId, right: TypeId) -> TypeId;
    fn intersection(&self, members: Vec<TypeId>) -> TypeId;
    fn array(&self, element: TypeId) -> TypeId;
    fn tuple(&self, elements: Vec<TupleElement>) -> TypeId;
    fn object_with_index(&self, shape: ObjectShape) -> TypeId;
    fn function(&self, shape: FunctionShape) -> TypeId;
    fn template_literal(&self, spans: Vec<TemplateSpan>) -> TypeId;
    fn conditional(&self, conditional: ConditionalType) -> TypeId;
    fn mapped(&self, mapped: MappedType) -> TypeId;
    fn application(&self, def: DefId, args: Vec<TypeId>) -> TypeId;
    fn index_access(&self, object: TypeId, key: TypeId) -> TypeId;
    fn keyof(&self, target: TypeId) -> TypeId;
    fn string_intrinsic(&self, kind: StringIntrinsicKind, arg: TypeId) -> TypeId;
}

macro_rules! forward_to_interner {
    ($($name:ident($($arg:ident: $ty:ty),*) -> $ret:ty;)*) => {
        impl TypeDatabase for TypeInterner {
            $(
                #[inline]
                fn $name(&self, $($arg: $ty),*) -> $ret {
                    TypeInterner::$name(self, $($arg),*)
                }
            )*
        }
    };
}

forward_to_interner! {
    lookup(id: TypeId) -> Option<TypeData>;
    intern_string(text: &str) -> Atom;
    resolve_atom(atom: Atom) -> String;
    resolve_atom_ref(atom: Atom) -> Arc<str>;
    type_list(id: TypeListId) -> Arc<[TypeId]>;
    tuple_list(id: TupleListId) -> Arc<[TupleElement]>;
    template_list(id: TemplateLiteralId) -> Arc<[TemplateSpan]>;
    object_shape(id: ObjectShapeId) -> Arc<ObjectShape>;
    function_shape(id: FunctionShapeId) -> Arc<FunctionShape>;
    conditional_type(id: ConditionalTypeId) -> Arc<ConditionalType>;
    mapped_type(id: MappedTypeId) -> Arc<MappedType>;
    type_application(id: TypeApplicationId) -> Arc<TypeApplication>;
    literal_text(id: TypeId) -> Option<String>;
    literal_string(value: &str) -> TypeId;
    literal_string_atom(atom: Atom) -> TypeId;
    literal_number(value: f64) -> TypeId;
    literal_boolean(value: bool) -> TypeId;
    literal_bigint(digits: &str) -> TypeId;
    type_ref(name: Atom) -> TypeId;
    union(members: Vec<TypeId>) -> TypeId;
    union2(left: TypeId, right: TypeId) -> TypeId;
    intersection(members: Vec<TypeId>) -> TypeId;
    array(element: TypeId) -> TypeId;
    tuple(elements: Vec<TupleElement>) -> TypeId;
    object_with_index(shape: ObjectShape) -> TypeId;
    function(shape: FunctionShape) -> TypeId;
    template_literal(spans: Vec<TemplateSpan>) -> TypeId;
    conditional(conditional: ConditionalType) -> TypeId;
    mapped(mapped: MappedType) -> TypeId;
    application(def: DefId, args: Vec<TypeId>) -> TypeId;
    index_access(object: TypeId, key: TypeId) -> TypeId;
    keyof(target: TypeId) -> TypeId;
    string_intrinsic(kind: StringIntrinsicKind, arg: TypeId) -> TypeId;
}
