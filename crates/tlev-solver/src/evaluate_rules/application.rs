//! Alias application: `Alias<Args>`.
//!
//! Arguments are evaluated first, then bound to the declared parameters
//! (defaults and constraints included) and substituted through the body.
//! The expansion is memoized by `(DefId, canonical application, mode)`.

use crate::diagnostics::{Diagnostic, PathSegment};
use crate::evaluate::TypeEvaluator;
use crate::expansion_cache::ExpansionKey;
use crate::instantiate::instantiate_type;
use crate::types::*;
use tlev_common::diagnostics::DiagnosticKind;
use tracing::trace;

impl<'a> TypeEvaluator<'a> {
    pub(crate) fn evaluate_application(&mut self, app: &TypeApplication) -> Result<TypeId, Diagnostic> {
        let db = self.db();
        let Some(alias) = self.resolver().resolve_alias(app.def) else {
            return Err(Diagnostic::unresolved(&app.def.to_string()));
        };
        let Some(body) = alias.body else {
            return Err(Diagnostic::unresolved(&db.resolve_atom(alias.name)));
        };

        if app.args.len() > alias.type_params.len() {
            return Err(Diagnostic::new(
                DiagnosticKind::TypeMismatch,
                format!(
                    "Expected at most {} type arguments, but got {}.",
                    alias.type_params.len(),
                    app.args.len()
                ),
            )
            .at(PathSegment::TypeArgument(alias.type_params.len())));
        }

        let mut args = Vec::with_capacity(app.args.len());
        for (index, &arg) in app.args.iter().enumerate() {
            args.push(
                self.evaluate(arg)
                    .map_err(|d| d.at(PathSegment::TypeArgument(index)))?,
            );
        }
        let (subst, bindings) = self.bind_type_params(&alias.type_params, &args, &[])?;

        let canonical = db.application(app.def, bindings.values().copied().collect());
        let key = ExpansionKey {
            def: app.def,
            fingerprint: canonical,
            mode: self.options().expansion_mode(),
        };
        if let Some(hit) = self.cached_expansion(canonical, &key) {
            return Ok(hit);
        }
        if let Some(deferred) = self.defer_if_in_flight(canonical) {
            return Ok(deferred);
        }

        trace!(alias = %db.resolve_atom(alias.name), "expanding alias");
        self.with_expansion(canonical, key, |evaluator| {
            let instantiated = instantiate_type(db, body, &subst)?;
            evaluator.evaluate(instantiated)
        })
    }
}
