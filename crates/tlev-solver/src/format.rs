//! Rendering types in the familiar surface syntax for messages and output.

use crate::db::TypeDatabase;
use crate::subtype::TypeResolver;
use crate::types::*;
use tlev_common::interner::Atom;

const MAX_FORMAT_DEPTH: u32 = 32;

pub struct TypeFormatter<'a> {
    db: &'a dyn TypeDatabase,
    resolver: Option<&'a dyn TypeResolver>,
    /// Names currently introduced by `infer` in the extends clause being printed.
    infer_scope: Vec<Atom>,
    depth: u32,
}

impl<'a> TypeFormatter<'a> {
    pub fn new(db: &'a dyn TypeDatabase) -> Self {
        TypeFormatter {
            db,
            resolver: None,
            infer_scope: Vec::new(),
            depth: 0,
        }
    }

    /// Use alias names instead of `def#N` when printing applications.
    pub fn with_resolver(mut self, resolver: &'a dyn TypeResolver) -> Self {
        self.resolver = Some(resolver);
        self
    }

    pub fn format(&mut self, type_id: TypeId) -> String {
        if self.depth >= MAX_FORMAT_DEPTH {
            return "...".to_string();
        }
        self.depth += 1;
        let text = self.format_inner(type_id);
        self.depth -= 1;
        text
    }

    fn format_inner(&mut self, type_id: TypeId) -> String {
        let Some(key) = self.db.lookup(type_id) else {
            return "error".to_string();
        };
        match key {
            TypeData::Intrinsic(kind) => kind.name().to_string(),
            TypeData::Literal(value) => self.format_literal(&value),
            TypeData::Object(shape_id) => self.format_object(&self.db.object_shape(shape_id)),
            TypeData::Array(element) => format!("{}[]", self.format_operand(element)),
            TypeData::Tuple(list_id) => {
                let elements = self.db.tuple_list(list_id);
                let parts: Vec<String> = elements
                    .iter()
                    .map(|e| {
                        let ty = self.format(e.type_id);
                        if e.rest {
                            format!("...{ty}")
                        } else if e.optional {
                            format!("{}?", self.format_operand_str(e.type_id, ty))
                        } else {
                            ty
                        }
                    })
                    .collect();
                format!("[{}]", parts.join(", "))
            }
            TypeData::Union(list_id) => {
                let members = self.db.type_list(list_id);
                let mut parts: Vec<String> = members.iter().map(|m| self.format(*m)).collect();
                parts.sort();
                parts.join(" | ")
            }
            TypeData::Intersection(list_id) => {
                let members = self.db.type_list(list_id);
                let mut parts: Vec<String> =
                    members.iter().map(|m| self.format_operand(*m)).collect();
                parts.sort();
                parts.join(" & ")
            }
            TypeData::Function(shape_id) => {
                let shape = self.db.function_shape(shape_id);
                self.format_function(&shape)
            }
            TypeData::TypeRef(name) => {
                let text = self.db.resolve_atom(name);
                if self.infer_scope.contains(&name) {
                    format!("infer {text}")
                } else {
                    text
                }
            }
            TypeData::Application(app_id) => {
                let app = self.db.type_application(app_id);
                let name = self
                    .resolver
                    .and_then(|r| r.alias_name(app.def))
                    .map(|atom| self.db.resolve_atom(atom))
                    .unwrap_or_else(|| app.def.to_string());
                if app.args.is_empty() {
                    name
                } else {
                    let args: Vec<String> = app.args.iter().map(|a| self.format(*a)).collect();
                    format!("{name}<{}>", args.join(", "))
                }
            }
            TypeData::Conditional(cond_id) => {
                let cond = self.db.conditional_type(cond_id);
                let check = self.format_operand(cond.check_type);
                let scope_len = self.infer_scope.len();
                self.infer_scope.extend(cond.infer_slots.iter().copied());
                let extends = self.format(cond.extends_type);
                self.infer_scope.truncate(scope_len);
                let true_branch = self.format(cond.true_type);
                let false_branch = self.format(cond.false_type);
                format!("{check} extends {extends} ? {true_branch} : {false_branch}")
            }
            TypeData::Mapped(mapped_id) => {
                let mapped = self.db.mapped_type(mapped_id);
                self.format_mapped(&mapped)
            }
            TypeData::TemplateLiteral(list_id) => {
                let spans = self.db.template_list(list_id);
                let mut out = String::from("`");
                for span in spans.iter() {
                    match span {
                        TemplateSpan::Text(atom) => out.push_str(&self.db.resolve_atom_ref(*atom)),
                        TemplateSpan::Type(ty) => {
                            out.push_str("${");
                            out.push_str(&self.format(*ty));
                            out.push('}');
                        }
                    }
                }
                out.push('`');
                out
            }
            TypeData::StringIntrinsic { kind, type_arg } => {
                format!("{}<{}>", kind.name(), self.format(type_arg))
            }
            TypeData::IndexAccess(object, key) => {
                format!("{}[{}]", self.format_operand(object), self.format(key))
            }
            TypeData::KeyOf(target) => format!("keyof {}", self.format_operand(target)),
            TypeData::Error => "error".to_string(),
        }
    }

    fn format_literal(&self, value: &LiteralValue) -> String {
        match value {
            LiteralValue::String(atom) => {
                let text = self.db.resolve_atom_ref(*atom);
                format!("\"{}\"", text.replace('\\', "\\\\").replace('"', "\\\""))
            }
            LiteralValue::Number(n) => format_number(n.0),
            LiteralValue::Boolean(b) => b.to_string(),
            LiteralValue::BigInt(atom) => format!("{}n", self.db.resolve_atom_ref(*atom)),
        }
    }

    fn format_object(&mut self, shape: &ObjectShape) -> String {
        if shape.is_empty() {
            return "{}".to_string();
        }
        let mut members: Vec<(String, String)> = shape
            .properties
            .iter()
            .map(|prop| {
                let name = self.db.resolve_atom(prop.name);
                let mut text = String::new();
                if prop.readonly {
                    text.push_str("readonly ");
                }
                text.push_str(&format_property_name(&name));
                if prop.optional {
                    text.push('?');
                }
                text.push_str(": ");
                text.push_str(&self.format(prop.type_id));
                (name, text)
            })
            .collect();
        members.sort_by(|a, b| a.0.cmp(&b.0));
        let mut parts: Vec<String> = members.into_iter().map(|(_, text)| text).collect();
        if let Some(index) = &shape.index {
            let prefix = if index.readonly { "readonly " } else { "" };
            parts.push(format!(
                "{prefix}[key: {}]: {}",
                self.format(index.key_type),
                self.format(index.value_type)
            ));
        }
        format!("{{ {} }}", parts.join("; "))
    }

    fn format_function(&mut self, shape: &FunctionShape) -> String {
        let mut params: Vec<String> = shape
            .params
            .iter()
            .enumerate()
            .map(|(i, p)| {
                let name = p
                    .name
                    .map(|atom| self.db.resolve_atom(atom))
                    .unwrap_or_else(|| format!("arg{i}"));
                let optional = if p.optional { "?" } else { "" };
                format!("{name}{optional}: {}", self.format(p.type_id))
            })
            .collect();
        if let Some(rest) = shape.rest {
            params.push(format!("...args: {}", self.format(rest)));
        }
        format!("({}) => {}", params.join(", "), self.format(shape.return_type))
    }

    fn format_mapped(&mut self, mapped: &MappedType) -> String {
        let readonly = match mapped.readonly_modifier {
            Some(MappedModifier::Add) => "readonly ",
            Some(MappedModifier::Remove) => "-readonly ",
            None => "",
        };
        let optional = match mapped.optional_modifier {
            Some(MappedModifier::Add) => "?",
            Some(MappedModifier::Remove) => "-?",
            None => "",
        };
        let param = self.db.resolve_atom(mapped.type_param);
        let constraint = self.format(mapped.constraint);
        let remap = match mapped.name_type {
            Some(name_type) => format!(" as {}", self.format(name_type)),
            None => String::new(),
        };
        format!(
            "{{ {readonly}[{param} in {constraint}{remap}]{optional}: {} }}",
            self.format(mapped.template)
        )
    }

    /// Wrap types whose syntax would bind looser than a postfix operator.
    fn format_operand(&mut self, type_id: TypeId) -> String {
        let text = self.format(type_id);
        self.format_operand_str(type_id, text)
    }

    fn format_operand_str(&self, type_id: TypeId, text: String) -> String {
        match self.db.lookup(type_id) {
            Some(
                TypeData::Union(_)
                | TypeData::Intersection(_)
                | TypeData::Function(_)
                | TypeData::Conditional(_)
                | TypeData::KeyOf(_),
            ) => format!("({text})"),
            _ => text,
        }
    }
}

fn format_property_name(name: &str) -> String {
    let is_identifier = name
        .chars()
        .next()
        .is_some_and(|c| c.is_alphabetic() || c == '_' || c == '$')
        && name
            .chars()
            .all(|c| c.is_alphanumeric() || c == '_' || c == '$');
    let is_numeric = !name.is_empty() && name.chars().all(|c| c.is_ascii_digit());
    if is_identifier || is_numeric {
        name.to_string()
    } else {
        format!("\"{name}\"")
    }
}

#[cfg(test)]
#[path = "../tests/format_tests.rs"]
mod tests;
