//! Type Visitor Pattern
//!
//! A `TypeVisitor` dispatches on [`TypeData`] so passes over the type graph
//! don't each repeat the full match. The free-reference walkers at the
//! bottom of the module are scope aware: mapped type iteration variables
//! and conditional `infer` slots bind names inside their own bodies.

use crate::db::TypeDatabase;
use crate::diagnostics::{PathSegment, TypePath};
use crate::subtype::{STACK_GROWTH, STACK_RED_ZONE};
use crate::types::*;
use rustc_hash::FxHashSet;
use smallvec::SmallVec;
use tlev_common::interner::Atom;

// =============================================================================
// Type Visitor Trait
// =============================================================================

/// Visitor over a single level of [`TypeData`].
///
/// Only the two leaf methods are required; composite kinds fall back to
/// [`default_output`](TypeVisitor::default_output).
pub trait TypeVisitor: Sized {
    type Output;

    fn visit_intrinsic(&mut self, kind: IntrinsicKind) -> Self::Output;

    fn visit_literal(&mut self, value: &LiteralValue) -> Self::Output;

    fn visit_object(&mut self, _shape: &ObjectShape) -> Self::Output {
        Self::default_output()
    }

    fn visit_union(&mut self, _members: &[TypeId]) -> Self::Output {
        Self::default_output()
    }

    fn visit_intersection(&mut self, _members: &[TypeId]) -> Self::Output {
        Self::default_output()
    }

    fn visit_array(&mut self, _element_type: TypeId) -> Self::Output {
        Self::default_output()
    }

    fn visit_tuple(&mut self, _elements: &[TupleElement]) -> Self::Output {
        Self::default_output()
    }

    fn visit_function(&mut self, _shape: &FunctionShape) -> Self::Output {
        Self::default_output()
    }

    fn visit_type_ref(&mut self, _name: Atom) -> Self::Output {
        Self::default_output()
    }

    fn visit_application(&mut self, _app: &TypeApplication) -> Self::Output {
        Self::default_output()
    }

    fn visit_conditional(&mut self, _cond: &ConditionalType) -> Self::Output {
        Self::default_output()
    }

    fn visit_mapped(&mut self, _mapped: &MappedType) -> Self::Output {
        Self::default_output()
    }

    fn visit_template_literal(&mut self, _spans: &[TemplateSpan]) -> Self::Output {
        Self::default_output()
    }

    fn visit_string_intrinsic(
        &mut self,
        _kind: StringIntrinsicKind,
        _type_arg: TypeId,
    ) -> Self::Output {
        Self::default_output()
    }

    fn visit_index_access(&mut self, _object_type: TypeId, _key_type: TypeId) -> Self::Output {
        Self::default_output()
    }

    fn visit_keyof(&mut self, _type_id: TypeId) -> Self::Output {
        Self::default_output()
    }

    fn visit_error(&mut self) -> Self::Output {
        Self::default_output()
    }

    fn default_output() -> Self::Output;

    /// Visit a type by dispatching to the appropriate method.
    fn visit_type(&mut self, db: &dyn TypeDatabase, type_id: TypeId) -> Self::Output {
        match db.lookup(type_id) {
            Some(ref data) => self.visit_type_data(db, data),
            None => Self::default_output(),
        }
    }

    fn visit_type_data(&mut self, db: &dyn TypeDatabase, data: &TypeData) -> Self::Output {
        match data {
            TypeData::Intrinsic(kind) => self.visit_intrinsic(*kind),
            TypeData::Literal(value) => self.visit_literal(value),
            TypeData::Object(id) => self.visit_object(&db.object_shape(*id)),
            TypeData::Array(element) => self.visit_array(*element),
            TypeData::Tuple(id) => self.visit_tuple(&db.tuple_list(*id)),
            TypeData::Union(id) => self.visit_union(&db.type_list(*id)),
            TypeData::Intersection(id) => self.visit_intersection(&db.type_list(*id)),
            TypeData::Function(id) => self.visit_function(&db.function_shape(*id)),
            TypeData::TypeRef(name) => self.visit_type_ref(*name),
            TypeData::Application(id) => self.visit_application(&db.type_application(*id)),
            TypeData::Conditional(id) => self.visit_conditional(&db.conditional_type(*id)),
            TypeData::Mapped(id) => self.visit_mapped(&db.mapped_type(*id)),
            TypeData::TemplateLiteral(id) => self.visit_template_literal(&db.template_list(*id)),
            TypeData::StringIntrinsic { kind, type_arg } => {
                self.visit_string_intrinsic(*kind, *type_arg)
            }
            TypeData::IndexAccess(object, key) => self.visit_index_access(*object, *key),
            TypeData::KeyOf(target) => self.visit_keyof(*target),
            TypeData::Error => self.visit_error(),
        }
    }
}

// =============================================================================
// Kinds
// =============================================================================

/// Classification of types into broad categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeKind {
    Primitive,
    Literal,
    Object,
    Array,
    Tuple,
    Union,
    Intersection,
    Function,
    /// Alias applications.
    Generic,
    TypeParameter,
    Conditional,
    /// Deferred meta types (mapped, template, keyof, indexed access).
    Other,
}

struct TypeKindVisitor;

impl TypeVisitor for TypeKindVisitor {
    type Output = TypeKind;

    fn visit_intrinsic(&mut self, _kind: IntrinsicKind) -> TypeKind {
        TypeKind::Primitive
    }

    fn visit_literal(&mut self, _value: &LiteralValue) -> TypeKind {
        TypeKind::Literal
    }

    fn visit_type_data(&mut self, _db: &dyn TypeDatabase, data: &TypeData) -> TypeKind {
        match data {
            TypeData::Intrinsic(_) | TypeData::Error => TypeKind::Primitive,
            TypeData::Literal(_) => TypeKind::Literal,
            TypeData::Object(_) => TypeKind::Object,
            TypeData::Array(_) => TypeKind::Array,
            TypeData::Tuple(_) => TypeKind::Tuple,
            TypeData::Union(_) => TypeKind::Union,
            TypeData::Intersection(_) => TypeKind::Intersection,
            TypeData::Function(_) => TypeKind::Function,
            TypeData::Application(_) => TypeKind::Generic,
            TypeData::TypeRef(_) => TypeKind::TypeParameter,
            TypeData::Conditional(_) => TypeKind::Conditional,
            TypeData::Mapped(_)
            | TypeData::TemplateLiteral(_)
            | TypeData::StringIntrinsic { .. }
            | TypeData::IndexAccess(..)
            | TypeData::KeyOf(_) => TypeKind::Other,
        }
    }

    fn default_output() -> TypeKind {
        TypeKind::Other
    }
}

pub fn type_kind(db: &dyn TypeDatabase, type_id: TypeId) -> TypeKind {
    TypeKindVisitor.visit_type(db, type_id)
}

pub fn is_type_kind(db: &dyn TypeDatabase, type_id: TypeId, kind: TypeKind) -> bool {
    type_kind(db, type_id) == kind
}

// =============================================================================
// Children
// =============================================================================

/// Call `f` on every type directly referenced by `type_id`.
pub fn for_each_child(db: &dyn TypeDatabase, type_id: TypeId, mut f: impl FnMut(TypeId)) {
    let Some(data) = db.lookup(type_id) else {
        return;
    };
    match data {
        TypeData::Intrinsic(_) | TypeData::Literal(_) | TypeData::TypeRef(_) | TypeData::Error => {}
        TypeData::Object(id) => {
            let shape = db.object_shape(id);
            for prop in &shape.properties {
                f(prop.type_id);
            }
            if let Some(index) = &shape.index {
                f(index.key_type);
                f(index.value_type);
            }
        }
        TypeData::Array(element) => f(element),
        TypeData::Tuple(id) => db.tuple_list(id).iter().for_each(|e| f(e.type_id)),
        TypeData::Union(id) | TypeData::Intersection(id) => {
            db.type_list(id).iter().for_each(|&m| f(m))
        }
        TypeData::Function(id) => {
            let shape = db.function_shape(id);
            shape.params.iter().for_each(|p| f(p.type_id));
            if let Some(rest) = shape.rest {
                f(rest);
            }
            f(shape.return_type);
        }
        TypeData::Application(id) => db.type_application(id).args.iter().for_each(|&a| f(a)),
        TypeData::Conditional(id) => {
            let cond = db.conditional_type(id);
            f(cond.check_type);
            f(cond.extends_type);
            f(cond.true_type);
            f(cond.false_type);
        }
        TypeData::Mapped(id) => {
            let mapped = db.mapped_type(id);
            f(mapped.constraint);
            if let Some(name_type) = mapped.name_type {
                f(name_type);
            }
            f(mapped.template);
        }
        TypeData::TemplateLiteral(id) => {
            for span in db.template_list(id).iter() {
                if let TemplateSpan::Type(t) = span {
                    f(*t);
                }
            }
        }
        TypeData::StringIntrinsic { type_arg, .. } => f(type_arg),
        TypeData::IndexAccess(object, key) => {
            f(object);
            f(key);
        }
        TypeData::KeyOf(target) => f(target),
    }
}

/// Collect all types reachable from a type, including itself.
pub fn collect_referenced_types(db: &dyn TypeDatabase, type_id: TypeId) -> FxHashSet<TypeId> {
    let mut seen = FxHashSet::default();
    let mut stack = vec![type_id];
    while let Some(current) = stack.pop() {
        if seen.insert(current) {
            for_each_child(db, current, |child| stack.push(child));
        }
    }
    seen
}

// =============================================================================
// Free type references
// =============================================================================

/// Walks a type looking for `TypeRef`s not bound by an enclosing mapped type
/// or conditional `infer` clause.
struct FreeRefFinder<'a> {
    db: &'a dyn TypeDatabase,
    bound: SmallVec<[Atom; 4]>,
    /// Types already known to be closed under an empty scope.
    closed: FxHashSet<TypeId>,
    path: TypePath,
}

impl<'a> FreeRefFinder<'a> {
    fn new(db: &'a dyn TypeDatabase) -> Self {
        FreeRefFinder {
            db,
            bound: SmallVec::new(),
            closed: FxHashSet::default(),
            path: TypePath::new(),
        }
    }

    fn find(&mut self, type_id: TypeId) -> Option<Atom> {
        if type_id.is_intrinsic() || (self.bound.is_empty() && self.closed.contains(&type_id)) {
            return None;
        }
        let found = stacker::maybe_grow(STACK_RED_ZONE, STACK_GROWTH, || self.find_inner(type_id));
        if found.is_none() && self.bound.is_empty() {
            self.closed.insert(type_id);
        }
        found
    }

    fn find_at(&mut self, segment: PathSegment, type_id: TypeId) -> Option<Atom> {
        self.path.push(segment);
        let found = self.find(type_id);
        if found.is_none() {
            self.path.pop();
        }
        found
    }

    fn find_scoped(&mut self, names: &[Atom], type_id: TypeId) -> Option<Atom> {
        let mark = self.bound.len();
        self.bound.extend_from_slice(names);
        let found = self.find(type_id);
        self.bound.truncate(mark);
        found
    }

    fn find_inner(&mut self, type_id: TypeId) -> Option<Atom> {
        let db = self.db;
        match db.lookup(type_id)? {
            TypeData::Intrinsic(_) | TypeData::Literal(_) | TypeData::Error => None,
            TypeData::TypeRef(name) => (!self.bound.contains(&name)).then_some(name),
            TypeData::Object(id) => {
                let shape = db.object_shape(id);
                for prop in &shape.properties {
                    let segment = PathSegment::Property(db.resolve_atom_ref(prop.name));
                    if let Some(name) = self.find_at(segment, prop.type_id) {
                        return Some(name);
                    }
                }
                let index = shape.index.as_ref()?;
                let (key_type, value_type) = (index.key_type, index.value_type);
                self.find_at(PathSegment::IndexSignature, key_type)
                    .or_else(|| self.find_at(PathSegment::IndexSignature, value_type))
            }
            TypeData::Array(element) => self.find_at(PathSegment::ArrayElement, element),
            TypeData::Tuple(id) => {
                let elements = db.tuple_list(id);
                elements
                    .iter()
                    .enumerate()
                    .find_map(|(i, e)| self.find_at(PathSegment::TupleElement(i), e.type_id))
            }
            TypeData::Union(id) => {
                let members = db.type_list(id);
                members
                    .iter()
                    .enumerate()
                    .find_map(|(i, &m)| self.find_at(PathSegment::UnionMember(i), m))
            }
            TypeData::Intersection(id) => {
                let members = db.type_list(id);
                members.iter().find_map(|&m| self.find(m))
            }
            TypeData::Function(id) => {
                let shape = db.function_shape(id);
                for (i, param) in shape.params.iter().enumerate() {
                    if let Some(name) = self.find_at(PathSegment::Parameter(i), param.type_id) {
                        return Some(name);
                    }
                }
                if let Some(rest) = shape.rest
                    && let Some(name) = self.find_at(PathSegment::Parameter(shape.params.len()), rest)
                {
                    return Some(name);
                }
                self.find_at(PathSegment::ReturnType, shape.return_type)
            }
            TypeData::Application(id) => {
                let app = db.type_application(id);
                app.args
                    .iter()
                    .enumerate()
                    .find_map(|(i, &a)| self.find_at(PathSegment::TypeArgument(i), a))
            }
            TypeData::Conditional(id) => {
                let cond = db.conditional_type(id);
                self.find(cond.check_type)
                    .or_else(|| self.find_scoped(&cond.infer_slots, cond.extends_type))
                    .or_else(|| self.find_scoped(&cond.infer_slots, cond.true_type))
                    .or_else(|| self.find(cond.false_type))
            }
            TypeData::Mapped(id) => {
                let mapped = db.mapped_type(id);
                let param = [mapped.type_param];
                self.find(mapped.constraint)
                    .or_else(|| {
                        mapped
                            .name_type
                            .and_then(|name_type| self.find_scoped(&param, name_type))
                    })
                    .or_else(|| self.find_scoped(&param, mapped.template))
            }
            TypeData::TemplateLiteral(id) => {
                let spans = db.template_list(id);
                spans.iter().enumerate().find_map(|(i, span)| match span {
                    TemplateSpan::Type(t) => self.find_at(PathSegment::TemplateSpan(i), *t),
                    TemplateSpan::Text(_) => None,
                })
            }
            TypeData::StringIntrinsic { type_arg, .. } => self.find(type_arg),
            TypeData::IndexAccess(object, key) => self.find(object).or_else(|| self.find(key)),
            TypeData::KeyOf(target) => self.find(target),
        }
    }
}

/// First unbound type reference in `type_id`, with its structural location.
pub fn find_free_type_ref(db: &dyn TypeDatabase, type_id: TypeId) -> Option<(Atom, TypePath)> {
    let mut finder = FreeRefFinder::new(db);
    let name = finder.find(type_id)?;
    Some((name, finder.path))
}

/// True when the type still mentions a generic parameter.
pub fn contains_free_type_refs(db: &dyn TypeDatabase, type_id: TypeId) -> bool {
    FreeRefFinder::new(db).find(type_id).is_some()
}

/// Names of every type reference that occurs in the type, bound or not.
pub fn collect_type_ref_names(db: &dyn TypeDatabase, type_id: TypeId) -> FxHashSet<Atom> {
    collect_referenced_types(db, type_id)
        .into_iter()
        .filter_map(|id| match db.lookup(id) {
            Some(TypeData::TypeRef(name)) => Some(name),
            _ => None,
        })
        .collect()
}
