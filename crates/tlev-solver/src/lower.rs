//! Lowering of `TypeExpr` trees into interned types.
//!
//! Names in a `ref` resolve innermost first: a type parameter or infer slot
//! in scope, then a declared alias, then the built-ins (`Array<T>`, the case
//! intrinsics and primitive names). An unknown name without arguments is
//! kept as a free type reference and reported when evaluation finds it
//! still dangling.

use crate::db::TypeDatabase;
use crate::def::{DefId, DefinitionStore};
use crate::diagnostics::{Diagnostic, PathSegment};
use crate::expr::{AliasDecl, ModifierExpr, ParamDecl, TemplatePart, TypeExpr};
use crate::subtype::{STACK_GROWTH, STACK_RED_ZONE};
use crate::types::*;
use tlev_common::interner::Atom;
use tracing::trace;

pub struct Lowerer<'a> {
    db: &'a dyn TypeDatabase,
    defs: &'a DefinitionStore,
    /// Bound names, outermost first.
    scope: Vec<Atom>,
}

impl<'a> Lowerer<'a> {
    pub fn new(db: &'a dyn TypeDatabase, defs: &'a DefinitionStore) -> Self {
        Lowerer {
            db,
            defs,
            scope: Vec::new(),
        }
    }

    /// Bring names into scope, e.g. the generic parameters of a call.
    pub fn with_scope<'n>(mut self, names: impl IntoIterator<Item = &'n str>) -> Self {
        for name in names {
            let atom = self.db.intern_string(name);
            self.scope.push(atom);
        }
        self
    }

    pub fn lower(&mut self, expr: &TypeExpr) -> Result<TypeId, Diagnostic> {
        stacker::maybe_grow(STACK_RED_ZONE, STACK_GROWTH, || self.lower_expr(expr))
    }

    fn lower_expr(&mut self, expr: &TypeExpr) -> Result<TypeId, Diagnostic> {
        let db = self.db;
        Ok(match expr {
            TypeExpr::Primitive { name } => IntrinsicKind::from_name(name)
                .map(IntrinsicKind::to_type_id)
                .ok_or_else(|| Diagnostic::unresolved(name))?,
            TypeExpr::String { value } => db.literal_string(value),
            TypeExpr::Number { value } => db.literal_number(*value),
            TypeExpr::Boolean { value } => db.literal_boolean(*value),
            TypeExpr::Bigint { value } => db.literal_bigint(value.trim_end_matches('n')),
            TypeExpr::Object { properties, index } => {
                let mut props = Vec::with_capacity(properties.len());
                for prop in properties {
                    let type_id = self
                        .lower(&prop.type_expr)
                        .map_err(|d| d.at(PathSegment::Property(prop.name.as_str().into())))?;
                    props.push(PropertyInfo {
                        name: db.intern_string(&prop.name),
                        type_id,
                        optional: prop.optional,
                        readonly: prop.readonly,
                    });
                }
                let index = match index {
                    Some(index) => Some(IndexSignature {
                        key_type: self.lower(&index.key).map_err(|d| d.at(PathSegment::IndexSignature))?,
                        value_type: self.lower(&index.value).map_err(|d| d.at(PathSegment::IndexSignature))?,
                        readonly: index.readonly,
                    }),
                    None => None,
                };
                db.object_with_index(ObjectShape {
                    properties: props,
                    index,
                })
            }
            TypeExpr::Array { element } => {
                let element = self.lower(element).map_err(|d| d.at(PathSegment::ArrayElement))?;
                db.array(element)
            }
            TypeExpr::Tuple { elements } => {
                let mut lowered = Vec::with_capacity(elements.len());
                for (index, element) in elements.iter().enumerate() {
                    let type_id = self
                        .lower(&element.type_expr)
                        .map_err(|d| d.at(PathSegment::TupleElement(index)))?;
                    lowered.push(TupleElement {
                        type_id,
                        optional: element.optional,
                        rest: element.rest,
                    });
                }
                db.tuple(lowered)
            }
            TypeExpr::Union { members } => {
                let members = self.lower_members(members)?;
                db.union(members)
            }
            TypeExpr::Intersection { members } => {
                let members = self.lower_members(members)?;
                db.intersection(members)
            }
            TypeExpr::Function { params, rest, returns } => {
                let mut lowered = Vec::with_capacity(params.len());
                for (index, param) in params.iter().enumerate() {
                    let type_id = self
                        .lower(&param.type_expr)
                        .map_err(|d| d.at(PathSegment::Parameter(index)))?;
                    lowered.push(ParamInfo {
                        name: param.name.as_deref().map(|n| db.intern_string(n)),
                        type_id,
                        optional: param.optional,
                    });
                }
                let rest = match rest {
                    Some(rest) => Some(
                        self.lower(rest)
                            .map_err(|d| d.at(PathSegment::Parameter(params.len())))?,
                    ),
                    None => None,
                };
                let return_type = self.lower(returns).map_err(|d| d.at(PathSegment::ReturnType))?;
                db.function(FunctionShape {
                    params: lowered,
                    rest,
                    return_type,
                })
            }
            TypeExpr::Ref { name, args } => self.lower_ref(name, args)?,
            TypeExpr::Infer { name } => db.type_ref(db.intern_string(name)),
            TypeExpr::Conditional {
                check,
                extends,
                infer,
                true_type,
                false_type,
            } => {
                let mut infer_slots: Vec<Atom> = infer.iter().map(|n| db.intern_string(n)).collect();
                collect_infer_names(extends, &mut |name| {
                    let atom = db.intern_string(name);
                    if !infer_slots.contains(&atom) {
                        infer_slots.push(atom);
                    }
                });

                let check_type = self.lower(check)?;
                let mark = self.scope.len();
                self.scope.extend(infer_slots.iter().copied());
                let branches = self
                    .lower(extends)
                    .and_then(|extends| Ok((extends, self.lower(true_type)?)));
                self.scope.truncate(mark);
                let (extends_type, true_type) = branches?;
                let false_type = self.lower(false_type)?;

                let is_distributive = matches!(
                    db.lookup(check_type),
                    Some(TypeData::TypeRef(name)) if !infer_slots.contains(&name)
                );
                db.conditional(ConditionalType {
                    check_type,
                    extends_type,
                    infer_slots,
                    true_type,
                    false_type,
                    is_distributive,
                })
            }
            TypeExpr::Mapped {
                param,
                constraint,
                name_type,
                template,
                optional,
                readonly,
            } => {
                let constraint = self.lower(constraint)?;
                let type_param = db.intern_string(param);
                self.scope.push(type_param);
                let body = self.lower_mapped_body(name_type.as_deref(), template);
                self.scope.pop();
                let (name_type, template) = body?;
                db.mapped(MappedType {
                    type_param,
                    constraint,
                    name_type,
                    template,
                    optional_modifier: optional.map(lower_modifier),
                    readonly_modifier: readonly.map(lower_modifier),
                })
            }
            TypeExpr::Template { parts } => {
                let mut spans = Vec::with_capacity(parts.len());
                for (index, part) in parts.iter().enumerate() {
                    spans.push(match part {
                        TemplatePart::Text(text) => TemplateSpan::Text(db.intern_string(text)),
                        TemplatePart::Type(expr) => TemplateSpan::Type(
                            self.lower(expr)
                                .map_err(|d| d.at(PathSegment::TemplateSpan(index)))?,
                        ),
                    });
                }
                db.template_literal(spans)
            }
            TypeExpr::Index { object, index } => {
                let object = self.lower(object)?;
                let index = self.lower(index)?;
                db.index_access(object, index)
            }
            TypeExpr::Keyof { target } => {
                let target = self.lower(target)?;
                db.keyof(target)
            }
        })
    }

    fn lower_members(&mut self, members: &[TypeExpr]) -> Result<Vec<TypeId>, Diagnostic> {
        let mut lowered = Vec::with_capacity(members.len());
        for (index, member) in members.iter().enumerate() {
            lowered.push(self.lower(member).map_err(|d| d.at(PathSegment::UnionMember(index)))?);
        }
        Ok(lowered)
    }

    fn lower_mapped_body(
        &mut self,
        name_type: Option<&TypeExpr>,
        template: &TypeExpr,
    ) -> Result<(Option<TypeId>, TypeId), Diagnostic> {
        let name_type = match name_type {
            Some(expr) => Some(self.lower(expr)?),
            None => None,
        };
        Ok((name_type, self.lower(template)?))
    }

    fn lower_ref(&mut self, name: &str, args: &[TypeExpr]) -> Result<TypeId, Diagnostic> {
        let db = self.db;
        let atom = db.intern_string(name);
        if args.is_empty() && self.scope.iter().rev().any(|&bound| bound == atom) {
            return Ok(db.type_ref(atom));
        }

        let mut lowered = Vec::with_capacity(args.len());
        for (index, arg) in args.iter().enumerate() {
            lowered.push(self.lower(arg).map_err(|d| d.at(PathSegment::TypeArgument(index)))?);
        }

        if let Some(def) = self.defs.find_by_name(atom) {
            return Ok(db.application(def, lowered));
        }
        match lowered.as_slice() {
            [] => Ok(IntrinsicKind::from_name(name)
                .map(IntrinsicKind::to_type_id)
                .unwrap_or_else(|| db.type_ref(atom))),
            &[element] if name == "Array" || name == "ReadonlyArray" => Ok(db.array(element)),
            &[arg] => match StringIntrinsicKind::from_name(name) {
                Some(kind) => Ok(db.string_intrinsic(kind, arg)),
                None => Err(Diagnostic::unresolved(name)),
            },
            _ => Err(Diagnostic::unresolved(name)),
        }
    }

    /// Lower generic parameter declarations, leaving their names in scope.
    ///
    /// Each parameter is in scope for its own constraint and default, and
    /// for those of later parameters.
    pub fn lower_params(&mut self, params: &[ParamDecl]) -> Result<Vec<TypeParamInfo>, Diagnostic> {
        let mut lowered = Vec::with_capacity(params.len());
        for (index, param) in params.iter().enumerate() {
            let name = self.db.intern_string(&param.name);
            self.scope.push(name);
            let mut info = TypeParamInfo::new(name);
            if let Some(constraint) = &param.constraint {
                let constraint = self
                    .lower(constraint)
                    .map_err(|d| d.at(PathSegment::TypeArgument(index)))?;
                info = info.with_constraint(constraint);
            }
            if let Some(default) = &param.default {
                let default = self
                    .lower(default)
                    .map_err(|d| d.at(PathSegment::TypeArgument(index)))?;
                info = info.with_default(default);
            }
            if let Some(variance) = param.variance {
                info = info.with_variance(variance);
            }
            lowered.push(info);
        }
        Ok(lowered)
    }

    /// Register a group of aliases that may refer to each other.
    ///
    /// All names are declared before any body is lowered, so recursive and
    /// mutually recursive aliases resolve to their own `DefId`s.
    pub fn declare_aliases(&mut self, aliases: &[AliasDecl]) -> Result<Vec<DefId>, Diagnostic> {
        let db = self.db;
        let ids: Vec<DefId> = aliases
            .iter()
            .map(|alias| {
                let params = alias
                    .params
                    .iter()
                    .map(|p| TypeParamInfo::new(db.intern_string(&p.name)))
                    .collect();
                self.defs.declare(db.intern_string(&alias.name), params)
            })
            .collect();

        for (alias, &id) in aliases.iter().zip(&ids) {
            let mark = self.scope.len();
            let lowered = self
                .lower_params(&alias.params)
                .and_then(|params| Ok((params, self.lower(&alias.body)?)));
            self.scope.truncate(mark);
            let (params, body) = lowered?;
            trace!(alias = %alias.name, def_id = %id.0, "declared alias");
            self.defs.define(id, params, body);
        }
        Ok(ids)
    }
}

fn lower_modifier(modifier: ModifierExpr) -> MappedModifier {
    match modifier {
        ModifierExpr::Add => MappedModifier::Add,
        ModifierExpr::Remove => MappedModifier::Remove,
    }
}

/// Slot names bound by `infer` nodes in `expr`, in first-seen order.
pub fn infer_names(expr: &TypeExpr) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    collect_infer_names(expr, &mut |name| {
        if !names.iter().any(|seen| seen == name) {
            names.push(name.to_string());
        }
    });
    names
}

/// Names introduced by `infer` nodes, not descending into nested
/// conditionals (their slots are their own).
fn collect_infer_names<'e>(expr: &'e TypeExpr, found: &mut impl FnMut(&'e str)) {
    stacker::maybe_grow(STACK_RED_ZONE, STACK_GROWTH, || collect_infer_names_in(expr, found));
}

fn collect_infer_names_in<'e>(expr: &'e TypeExpr, found: &mut impl FnMut(&'e str)) {
    match expr {
        TypeExpr::Infer { name } => found(name),
        TypeExpr::Conditional { .. }
        | TypeExpr::Primitive { .. }
        | TypeExpr::String { .. }
        | TypeExpr::Number { .. }
        | TypeExpr::Boolean { .. }
        | TypeExpr::Bigint { .. } => {}
        TypeExpr::Object { properties, index } => {
            for prop in properties {
                collect_infer_names(&prop.type_expr, found);
            }
            if let Some(index) = index {
                collect_infer_names(&index.key, found);
                collect_infer_names(&index.value, found);
            }
        }
        TypeExpr::Array { element } => collect_infer_names(element, found),
        TypeExpr::Tuple { elements } => {
            for element in elements {
                collect_infer_names(&element.type_expr, found);
            }
        }
        TypeExpr::Union { members } | TypeExpr::Intersection { members } => {
            for member in members {
                collect_infer_names(member, found);
            }
        }
        TypeExpr::Function { params, rest, returns } => {
            for param in params {
                collect_infer_names(&param.type_expr, found);
            }
            if let Some(rest) = rest {
                collect_infer_names(rest, found);
            }
            collect_infer_names(returns, found);
        }
        TypeExpr::Ref { args, .. } => {
            for arg in args {
                collect_infer_names(arg, found);
            }
        }
        TypeExpr::Mapped {
            constraint,
            name_type,
            template,
            ..
        } => {
            collect_infer_names(constraint, found);
            if let Some(name_type) = name_type {
                collect_infer_names(name_type, found);
            }
            collect_infer_names(template, found);
        }
        TypeExpr::Template { parts } => {
            for part in parts {
                if let TemplatePart::Type(expr) = part {
                    collect_infer_names(expr, found);
                }
            }
        }
        TypeExpr::Index { object, index } => {
            collect_infer_names(object, found);
            collect_infer_names(index, found);
        }
        TypeExpr::Keyof { target } => collect_infer_names(target, found),
    }
}

/// Lower one expression with no names in scope.
pub fn lower_type(
    db: &dyn TypeDatabase,
    defs: &DefinitionStore,
    expr: &TypeExpr,
) -> Result<TypeId, Diagnostic> {
    Lowerer::new(db, defs).lower(expr)
}

#[cfg(test)]
#[path = "../tests/lower_tests.rs"]
mod tests;
