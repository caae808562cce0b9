//! Hash-consing of types.
//!
//! Each distinct [`TypeData`] is stored once and handed out as a `TypeId`,
//! so type equality is id equality. Payloads that do not fit in a key
//! (member lists, object shapes, conditional bodies) live in side pools and
//! the key holds their slot. Unions and intersections are normalized on the
//! way in, so nothing downstream ever sees an unnormalized one.

use crate::def::DefId;
use crate::types::*;
use dashmap::DashMap;
use rustc_hash::{FxBuildHasher, FxHashMap};
use smallvec::SmallVec;
use std::hash::Hash;
use std::sync::{Arc, RwLock};
use tlev_common::interner::{Atom, AtomTable};
use tlev_common::limits::INTERSECTION_DISTRIBUTION_LIMIT;

type MemberBuffer = SmallVec<[TypeId; 8]>;

const INTRINSIC_KINDS: [IntrinsicKind; 11] = [
    IntrinsicKind::Never,
    IntrinsicKind::Unknown,
    IntrinsicKind::Any,
    IntrinsicKind::Void,
    IntrinsicKind::Null,
    IntrinsicKind::Undefined,
    IntrinsicKind::Boolean,
    IntrinsicKind::Number,
    IntrinsicKind::String,
    IntrinsicKind::Bigint,
    IntrinsicKind::Symbol,
];

#[derive(Copy, Clone, PartialEq, Eq)]
enum Combinator {
    Union,
    Intersection,
}

/// Disjointness classes used when reducing intersections.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum PrimitiveClass {
    String,
    Number,
    Boolean,
    Bigint,
    Symbol,
    Null,
    Undefined,
}

/// Append-only store of shared payloads addressed by insertion slot.
struct Pool<T: ?Sized> {
    slots: RwLock<PoolSlots<T>>,
}

struct PoolSlots<T: ?Sized> {
    items: Vec<Arc<T>>,
    index: FxHashMap<Arc<T>, u32>,
}

impl<T: ?Sized + Eq + Hash> Pool<T> {
    fn new() -> Self {
        Pool {
            slots: RwLock::new(PoolSlots {
                items: Vec::new(),
                index: FxHashMap::default(),
            }),
        }
    }

    /// Pool whose slot 0 holds `first`. List pools put the empty list there.
    fn starting_with(first: Box<T>) -> Self {
        let pool = Self::new();
        pool.insert(first);
        pool
    }

    fn insert(&self, value: Box<T>) -> u32 {
        let mut slots = self.slots.write().expect("type pool lock poisoned");
        if let Some(&slot) = slots.index.get(&*value) {
            return slot;
        }
        let shared: Arc<T> = Arc::from(value);
        let slot = slots.items.len() as u32;
        slots.items.push(shared.clone());
        slots.index.insert(shared, slot);
        slot
    }

    fn get(&self, slot: u32) -> Option<Arc<T>> {
        let slots = self.slots.read().expect("type pool lock poisoned");
        slots.items.get(slot as usize).cloned()
    }
}

fn intrinsic_id(key: &TypeData) -> Option<TypeId> {
    match key {
        TypeData::Intrinsic(kind) => Some(kind.to_type_id()),
        TypeData::Literal(LiteralValue::Boolean(value)) => Some(if *value {
            TypeId::BOOLEAN_TRUE
        } else {
            TypeId::BOOLEAN_FALSE
        }),
        TypeData::Error => Some(TypeId::ERROR),
        _ => None,
    }
}

fn intrinsic_key(id: TypeId) -> Option<TypeData> {
    match id {
        TypeId::NONE | TypeId::ERROR => Some(TypeData::Error),
        TypeId::BOOLEAN_TRUE => Some(TypeData::Literal(LiteralValue::Boolean(true))),
        TypeId::BOOLEAN_FALSE => Some(TypeData::Literal(LiteralValue::Boolean(false))),
        _ => INTRINSIC_KINDS
            .into_iter()
            .find(|kind| kind.to_type_id() == id)
            .map(TypeData::Intrinsic),
    }
}

/// The type table. Shared by reference across evaluator threads.
pub struct TypeInterner {
    atoms: AtomTable,
    ids: DashMap<TypeData, TypeId, FxBuildHasher>,
    keys: RwLock<Vec<TypeData>>,
    type_lists: Pool<[TypeId]>,
    tuple_lists: Pool<[TupleElement]>,
    template_lists: Pool<[TemplateSpan]>,
    object_shapes: Pool<ObjectShape>,
    function_shapes: Pool<FunctionShape>,
    conditionals: Pool<ConditionalType>,
    mapped_types: Pool<MappedType>,
    applications: Pool<TypeApplication>,
}

impl TypeInterner {
    pub fn new() -> Self {
        TypeInterner {
            atoms: AtomTable::preloaded(),
            ids: DashMap::with_hasher(FxBuildHasher),
            keys: RwLock::new(Vec::new()),
            type_lists: Pool::starting_with(Vec::new().into_boxed_slice()),
            tuple_lists: Pool::starting_with(Vec::new().into_boxed_slice()),
            template_lists: Pool::starting_with(Vec::new().into_boxed_slice()),
            object_shapes: Pool::new(),
            function_shapes: Pool::new(),
            conditionals: Pool::new(),
            mapped_types: Pool::new(),
            applications: Pool::new(),
        }
    }

    pub fn intern(&self, key: TypeData) -> TypeId {
        if let Some(id) = intrinsic_id(&key) {
            return id;
        }
        if let Some(id) = self.ids.get(&key) {
            return *id;
        }
        // The entry guard makes racing inserts of one key agree on an id.
        *self.ids.entry(key.clone()).or_insert_with(|| {
            let mut keys = self.keys.write().expect("type table lock poisoned");
            let id = TypeId(TypeId::FIRST_USER + keys.len() as u32);
            keys.push(key);
            id
        })
    }

    pub fn lookup(&self, id: TypeId) -> Option<TypeData> {
        if id.is_intrinsic() {
            return intrinsic_key(id);
        }
        let slot = id.0.checked_sub(TypeId::FIRST_USER)?;
        let keys = self.keys.read().expect("type table lock poisoned");
        keys.get(slot as usize).cloned()
    }

    /// Number of ids in use, counting the reserved intrinsic range.
    pub fn len(&self) -> usize {
        TypeId::FIRST_USER as usize + self.keys.read().expect("type table lock poisoned").len()
    }

    /// True until the first non-intrinsic type is interned.
    pub fn is_empty(&self) -> bool {
        self.len() <= TypeId::FIRST_USER as usize
    }

    pub fn intern_string(&self, text: &str) -> Atom {
        self.atoms.intern(text)
    }

    pub fn resolve_atom(&self, atom: Atom) -> String {
        self.atoms.resolve(atom).to_string()
    }

    pub fn resolve_atom_ref(&self, atom: Atom) -> Arc<str> {
        self.atoms.resolve(atom)
    }

    // Payload reads. A slot from a different interner reads as an empty or
    // error-typed payload rather than panicking.

    pub fn type_list(&self, id: TypeListId) -> Arc<[TypeId]> {
        self.type_lists.get(id.0).unwrap_or_else(|| Arc::from(Vec::new()))
    }

    pub fn tuple_list(&self, id: TupleListId) -> Arc<[TupleElement]> {
        self.tuple_lists.get(id.0).unwrap_or_else(|| Arc::from(Vec::new()))
    }

    pub fn template_list(&self, id: TemplateLiteralId) -> Arc<[TemplateSpan]> {
        self.template_lists.get(id.0).unwrap_or_else(|| Arc::from(Vec::new()))
    }

    pub fn object_shape(&self, id: ObjectShapeId) -> Arc<ObjectShape> {
        self.object_shapes.get(id.0).unwrap_or_default()
    }

    pub fn function_shape(&self, id: FunctionShapeId) -> Arc<FunctionShape> {
        self.function_shapes.get(id.0).unwrap_or_else(|| {
            Arc::new(FunctionShape {
                params: Vec::new(),
                rest: None,
                return_type: TypeId::ERROR,
            })
        })
    }

    pub fn conditional_type(&self, id: ConditionalTypeId) -> Arc<ConditionalType> {
        self.conditionals.get(id.0).unwrap_or_else(|| {
            Arc::new(ConditionalType {
                check_type: TypeId::ERROR,
                extends_type: TypeId::ERROR,
                infer_slots: Vec::new(),
                true_type: TypeId::ERROR,
                false_type: TypeId::ERROR,
                is_distributive: false,
            })
        })
    }

    pub fn mapped_type(&self, id: MappedTypeId) -> Arc<MappedType> {
        self.mapped_types.get(id.0).unwrap_or_else(|| {
            Arc::new(MappedType {
                type_param: Atom::NONE,
                constraint: TypeId::ERROR,
                name_type: None,
                template: TypeId::ERROR,
                optional_modifier: None,
                readonly_modifier: None,
            })
        })
    }

    pub fn type_application(&self, id: TypeApplicationId) -> Arc<TypeApplication> {
        self.applications.get(id.0).unwrap_or_else(|| {
            Arc::new(TypeApplication {
                def: DefId::INVALID,
                args: Vec::new(),
            })
        })
    }

    fn list_of(&self, members: Vec<TypeId>) -> TypeListId {
        TypeListId(self.type_lists.insert(members.into_boxed_slice()))
    }

    // Leaves

    pub fn intrinsic(&self, kind: IntrinsicKind) -> TypeId {
        kind.to_type_id()
    }

    pub fn literal_string(&self, value: &str) -> TypeId {
        let atom = self.intern_string(value);
        self.intern(TypeData::Literal(LiteralValue::String(atom)))
    }

    pub fn literal_string_atom(&self, atom: Atom) -> TypeId {
        self.intern(TypeData::Literal(LiteralValue::String(atom)))
    }

    pub fn literal_number(&self, value: f64) -> TypeId {
        self.intern(TypeData::Literal(LiteralValue::Number(OrderedFloat(value))))
    }

    pub fn literal_boolean(&self, value: bool) -> TypeId {
        if value {
            TypeId::BOOLEAN_TRUE
        } else {
            TypeId::BOOLEAN_FALSE
        }
    }

    pub fn literal_bigint(&self, value: &str) -> TypeId {
        let atom = self.intern_string(value);
        self.intern(TypeData::Literal(LiteralValue::BigInt(atom)))
    }

    /// Reference to a generic parameter or infer slot.
    pub fn type_ref(&self, name: Atom) -> TypeId {
        self.intern(TypeData::TypeRef(name))
    }

    /// Reference to a generic parameter by its spelled name.
    pub fn type_param(&self, name: &str) -> TypeId {
        let atom = self.intern_string(name);
        self.type_ref(atom)
    }

    // Unions

    /// Flattened, deduplicated and reduced; a single survivor is returned
    /// as itself and an empty union is `never`.
    pub fn union(&self, members: Vec<TypeId>) -> TypeId {
        match members.as_slice() {
            [] => TypeId::NEVER,
            [only] => *only,
            _ => self.reduce_union(self.flatten(members, Combinator::Union)),
        }
    }

    pub fn union2(&self, left: TypeId, right: TypeId) -> TypeId {
        if left == right {
            return left;
        }
        self.union(vec![left, right])
    }

    /// Splice nested members of the same combinator in place, then sort.
    fn flatten(&self, members: Vec<TypeId>, combinator: Combinator) -> MemberBuffer {
        let mut flat = MemberBuffer::with_capacity(members.len());
        for member in members {
            let nested = match (combinator, self.lookup(member)) {
                (Combinator::Union, Some(TypeData::Union(list)))
                | (Combinator::Intersection, Some(TypeData::Intersection(list))) => Some(list),
                _ => None,
            };
            match nested {
                Some(list) => flat.extend_from_slice(&self.type_list(list)),
                None => flat.push(member),
            }
        }
        flat.sort_unstable();
        flat.dedup();
        flat
    }

    fn reduce_union(&self, mut flat: MemberBuffer) -> TypeId {
        for top in [TypeId::ERROR, TypeId::ANY, TypeId::UNKNOWN] {
            if flat.contains(&top) {
                return top;
            }
        }
        flat.retain(|member| *member != TypeId::NEVER);

        let has_true = flat.contains(&TypeId::BOOLEAN_TRUE);
        if has_true && flat.contains(&TypeId::BOOLEAN_FALSE) {
            flat.retain(|member| !matches!(*member, TypeId::BOOLEAN_TRUE | TypeId::BOOLEAN_FALSE));
            if !flat.contains(&TypeId::BOOLEAN) {
                flat.push(TypeId::BOOLEAN);
                flat.sort_unstable();
            }
        }

        self.absorb_literals_into_primitives(&mut flat);

        match flat.as_slice() {
            [] => TypeId::NEVER,
            [only] => *only,
            _ => {
                let list_id = self.list_of(flat.into_vec());
                self.intern(TypeData::Union(list_id))
            }
        }
    }

    fn absorb_literals_into_primitives(&self, flat: &mut MemberBuffer) {
        let has_string = flat.contains(&TypeId::STRING);
        let has_number = flat.contains(&TypeId::NUMBER);
        let has_boolean = flat.contains(&TypeId::BOOLEAN);
        let has_bigint = flat.contains(&TypeId::BIGINT);
        if !(has_string || has_number || has_boolean || has_bigint) {
            return;
        }

        flat.retain(|id| {
            if id.is_intrinsic() && !matches!(*id, TypeId::BOOLEAN_TRUE | TypeId::BOOLEAN_FALSE) {
                return true;
            }
            match self.lookup(*id) {
                Some(TypeData::Literal(LiteralValue::String(_))) => !has_string,
                Some(TypeData::Literal(LiteralValue::Number(_))) => !has_number,
                Some(TypeData::Literal(LiteralValue::Boolean(_))) => !has_boolean,
                Some(TypeData::Literal(LiteralValue::BigInt(_))) => !has_bigint,
                Some(TypeData::TemplateLiteral(_)) => !has_string,
                _ => true,
            }
        });
    }

    // Intersections

    pub fn intersection(&self, members: Vec<TypeId>) -> TypeId {
        match members.as_slice() {
            [] => TypeId::UNKNOWN,
            [only] => *only,
            _ => self.reduce_intersection(self.flatten(members, Combinator::Intersection)),
        }
    }

    pub fn intersection2(&self, left: TypeId, right: TypeId) -> TypeId {
        if left == right {
            return left;
        }
        self.intersection(vec![left, right])
    }

    fn reduce_intersection(&self, mut flat: MemberBuffer) -> TypeId {
        for bottom in [TypeId::ERROR, TypeId::NEVER, TypeId::ANY] {
            if flat.contains(&bottom) {
                return bottom;
            }
        }
        flat.retain(|member| *member != TypeId::UNKNOWN);
        match flat.as_slice() {
            [] => return TypeId::UNKNOWN,
            [only] => return *only,
            _ => {}
        }

        // (A | B) & C => (A & C) | (B & C), while the product stays small.
        if let Some(distributed) = self.distribute_intersection_over_unions(&flat) {
            return distributed;
        }

        if self.has_disjoint_primitives(&mut flat) {
            return TypeId::NEVER;
        }

        self.merge_object_members(&mut flat);

        match flat.len() {
            0 => TypeId::UNKNOWN,
            1 => flat[0],
            _ => {
                flat.sort_unstable();
                let list_id = self.list_of(flat.into_vec());
                self.intern(TypeData::Intersection(list_id))
            }
        }
    }

    fn distribute_intersection_over_unions(&self, flat: &[TypeId]) -> Option<TypeId> {
        let mut choices: Vec<Arc<[TypeId]>> = Vec::with_capacity(flat.len());
        let mut product = 1usize;
        let mut any_union = false;
        for &member in flat {
            if let Some(TypeData::Union(list)) = self.lookup(member) {
                let members = self.type_list(list);
                product = product.saturating_mul(members.len());
                choices.push(members);
                any_union = true;
            } else {
                choices.push(Arc::from(vec![member]));
            }
        }
        if !any_union || product > INTERSECTION_DISTRIBUTION_LIMIT {
            return None;
        }

        let mut results = Vec::with_capacity(product);
        let mut indices = vec![0usize; choices.len()];
        loop {
            let combo: Vec<TypeId> = indices
                .iter()
                .zip(&choices)
                .map(|(&i, members)| members[i])
                .collect();
            results.push(self.intersection(combo));

            // Odometer increment over the choice lists.
            let mut pos = choices.len();
            loop {
                if pos == 0 {
                    return Some(self.union(results));
                }
                pos -= 1;
                indices[pos] += 1;
                if indices[pos] < choices[pos].len() {
                    break;
                }
                indices[pos] = 0;
            }
        }
    }

    fn primitive_class(&self, id: TypeId) -> Option<PrimitiveClass> {
        match id {
            TypeId::STRING => Some(PrimitiveClass::String),
            TypeId::NUMBER => Some(PrimitiveClass::Number),
            TypeId::BOOLEAN | TypeId::BOOLEAN_TRUE | TypeId::BOOLEAN_FALSE => {
                Some(PrimitiveClass::Boolean)
            }
            TypeId::BIGINT => Some(PrimitiveClass::Bigint),
            TypeId::SYMBOL => Some(PrimitiveClass::Symbol),
            TypeId::NULL => Some(PrimitiveClass::Null),
            TypeId::UNDEFINED | TypeId::VOID => Some(PrimitiveClass::Undefined),
            _ => match self.lookup(id) {
                Some(TypeData::Literal(LiteralValue::String(_)))
                | Some(TypeData::TemplateLiteral(_)) => Some(PrimitiveClass::String),
                Some(TypeData::Literal(LiteralValue::Number(_))) => Some(PrimitiveClass::Number),
                Some(TypeData::Literal(LiteralValue::BigInt(_))) => Some(PrimitiveClass::Bigint),
                _ => None,
            },
        }
    }

    fn is_unit_literal(&self, id: TypeId) -> bool {
        matches!(id, TypeId::BOOLEAN_TRUE | TypeId::BOOLEAN_FALSE)
            || matches!(self.lookup(id), Some(TypeData::Literal(_)))
    }

    /// Detect `string & number`, `"a" & "b"`, `null & {..}` and friends.
    /// Also drops a primitive that a literal member already narrows
    /// (`"a" & string` keeps `"a"`).
    fn has_disjoint_primitives(&self, flat: &mut MemberBuffer) -> bool {
        let mut class: Option<PrimitiveClass> = None;
        let mut literal: Option<TypeId> = None;
        let mut has_structured = false;
        for &member in flat.iter() {
            match self.primitive_class(member) {
                Some(c) => {
                    if class.is_some_and(|existing| existing != c) {
                        return true;
                    }
                    class = Some(c);
                    if self.is_unit_literal(member) {
                        if literal.is_some_and(|existing| existing != member) {
                            return true;
                        }
                        literal = Some(member);
                    }
                }
                None => {
                    if matches!(
                        self.lookup(member),
                        Some(TypeData::Object(_) | TypeData::Array(_) | TypeData::Tuple(_) | TypeData::Function(_))
                    ) {
                        has_structured = true;
                    }
                }
            }
        }
        if has_structured && matches!(class, Some(PrimitiveClass::Null | PrimitiveClass::Undefined)) {
            return true;
        }
        if let Some(lit) = literal {
            flat.retain(|id| *id == lit || self.primitive_class(*id).is_none());
        }
        false
    }

    /// Fold every plain object member into a single shape.
    fn merge_object_members(&self, flat: &mut MemberBuffer) {
        let mut shapes: Vec<Arc<ObjectShape>> = Vec::new();
        flat.retain(|id| match self.lookup(*id) {
            Some(TypeData::Object(shape_id)) => {
                shapes.push(self.object_shape(shape_id));
                false
            }
            _ => true,
        });
        if shapes.is_empty() {
            return;
        }
        if shapes.len() == 1 {
            let merged = self.object_with_index((*shapes[0]).clone());
            flat.push(merged);
            return;
        }

        let mut by_name: FxHashMap<Atom, PropertyInfo> = FxHashMap::default();
        let mut index: Option<IndexSignature> = None;
        for shape in &shapes {
            for prop in &shape.properties {
                match by_name.get_mut(&prop.name) {
                    Some(existing) => {
                        existing.type_id = self.intersection2(existing.type_id, prop.type_id);
                        existing.optional &= prop.optional;
                        existing.readonly &= prop.readonly;
                    }
                    None => {
                        by_name.insert(prop.name, prop.clone());
                    }
                }
            }
            if let Some(sig) = &shape.index {
                index = Some(match index {
                    Some(existing) => IndexSignature {
                        key_type: self.union2(existing.key_type, sig.key_type),
                        value_type: self.intersection2(existing.value_type, sig.value_type),
                        readonly: existing.readonly && sig.readonly,
                    },
                    None => sig.clone(),
                });
            }
        }
        let properties: Vec<PropertyInfo> = by_name.into_values().collect();
        flat.push(self.object_with_index(ObjectShape { properties, index }));
    }

    // Structured types

    pub fn array(&self, element: TypeId) -> TypeId {
        self.intern(TypeData::Array(element))
    }

    /// Intern a tuple. Spreads of fixed tuples are flattened in place.
    pub fn tuple(&self, elements: Vec<TupleElement>) -> TypeId {
        let mut flat = Vec::with_capacity(elements.len());
        for element in elements {
            if element.rest {
                if let Some(TypeData::Tuple(inner)) = self.lookup(element.type_id) {
                    flat.extend(self.tuple_list(inner).iter().cloned());
                    continue;
                }
            }
            flat.push(element);
        }
        let list_id = TupleListId(self.tuple_lists.insert(flat.into_boxed_slice()));
        self.intern(TypeData::Tuple(list_id))
    }

    /// Intern an object type with the given properties.
    pub fn object(&self, properties: Vec<PropertyInfo>) -> TypeId {
        self.object_with_index(ObjectShape {
            properties,
            index: None,
        })
    }

    /// Intern an object shape. Properties are sorted by name and duplicate
    /// names keep the last declaration.
    pub fn object_with_index(&self, mut shape: ObjectShape) -> TypeId {
        shape.properties.sort_by_key(|p| p.name);
        shape.properties.reverse();
        shape.properties.dedup_by_key(|p| p.name);
        shape.properties.reverse();
        let shape_id = ObjectShapeId(self.object_shapes.insert(Box::new(shape)));
        self.intern(TypeData::Object(shape_id))
    }

    pub fn function(&self, shape: FunctionShape) -> TypeId {
        let shape_id = FunctionShapeId(self.function_shapes.insert(Box::new(shape)));
        self.intern(TypeData::Function(shape_id))
    }

    /// Intern a template literal. Literal spans are folded into the text,
    /// adjacent text is merged, an all-text template becomes a string
    /// literal and `${string}` alone becomes `string`.
    pub fn template_literal(&self, spans: Vec<TemplateSpan>) -> TypeId {
        let mut normalized: Vec<TemplateSpan> = Vec::with_capacity(spans.len());
        let mut text = String::new();
        for span in spans {
            match span {
                TemplateSpan::Text(atom) => text.push_str(&self.resolve_atom_ref(atom)),
                TemplateSpan::Type(TypeId::NEVER) => return TypeId::NEVER,
                TemplateSpan::Type(type_id) => match self.literal_text(type_id) {
                    Some(literal) => text.push_str(&literal),
                    None => {
                        if !text.is_empty() {
                            normalized.push(TemplateSpan::Text(
                                self.atoms.intern_owned(std::mem::take(&mut text)),
                            ));
                        }
                        normalized.push(TemplateSpan::Type(type_id));
                    }
                },
            }
        }

        if normalized.is_empty() {
            return self.literal_string(&text);
        }
        if !text.is_empty() {
            normalized.push(TemplateSpan::Text(self.atoms.intern_owned(text)));
        }
        if normalized.len() == 1 && normalized[0] == TemplateSpan::Type(TypeId::STRING) {
            return TypeId::STRING;
        }

        let list_id = TemplateLiteralId(self.template_lists.insert(normalized.into_boxed_slice()));
        self.intern(TypeData::TemplateLiteral(list_id))
    }

    /// The text a unit type contributes when interpolated into a template.
    pub fn literal_text(&self, type_id: TypeId) -> Option<String> {
        match type_id {
            TypeId::NULL => return Some("null".to_string()),
            TypeId::UNDEFINED => return Some("undefined".to_string()),
            TypeId::BOOLEAN_TRUE => return Some("true".to_string()),
            TypeId::BOOLEAN_FALSE => return Some("false".to_string()),
            _ => {}
        }
        match self.lookup(type_id)? {
            TypeData::Literal(LiteralValue::String(atom)) => Some(self.resolve_atom(atom)),
            TypeData::Literal(LiteralValue::Number(n)) => Some(format_number(n.0)),
            TypeData::Literal(LiteralValue::BigInt(atom)) => Some(self.resolve_atom(atom)),
            _ => None,
        }
    }

    pub fn conditional(&self, conditional: ConditionalType) -> TypeId {
        let id = ConditionalTypeId(self.conditionals.insert(Box::new(conditional)));
        self.intern(TypeData::Conditional(id))
    }

    pub fn mapped(&self, mapped: MappedType) -> TypeId {
        let id = MappedTypeId(self.mapped_types.insert(Box::new(mapped)));
        self.intern(TypeData::Mapped(id))
    }

    pub fn application(&self, def: DefId, args: Vec<TypeId>) -> TypeId {
        let id = TypeApplicationId(self.applications.insert(Box::new(TypeApplication { def, args })));
        self.intern(TypeData::Application(id))
    }

    pub fn index_access(&self, object: TypeId, key: TypeId) -> TypeId {
        self.intern(TypeData::IndexAccess(object, key))
    }

    pub fn keyof(&self, target: TypeId) -> TypeId {
        self.intern(TypeData::KeyOf(target))
    }

    pub fn string_intrinsic(&self, kind: StringIntrinsicKind, type_arg: TypeId) -> TypeId {
        self.intern(TypeData::StringIntrinsic { kind, type_arg })
    }
}

impl Default for TypeInterner {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[path = "../tests/intern_tests.rs"]
mod tests;
