//! Runs a query document against an `Engine`.
//!
//! Aliases are declared once up front; the queries are independent and run
//! in parallel against the shared engine. Reports come back in document
//! order.

use anyhow::{Context, Result};
use indexmap::IndexMap;
use rayon::prelude::*;
use serde::Serialize;
use std::io::Read;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info, info_span};

use tlev_solver::{
    Atom, ContextualHint, Diagnostic, Document, Engine, EvalOptions, Instantiation, PathSegment,
    Query, TypeId, infer_names,
};

use crate::args::CliArgs;

/// Outcome of one query.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct QueryReport {
    pub index: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub query: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,
    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    pub bindings: IndexMap<String, String>,
    /// Diagnostics of union members dropped during evaluation.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub provenance: Vec<Diagnostic>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<Diagnostic>,
}

impl QueryReport {
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

#[derive(Default)]
struct Answer {
    result: Option<String>,
    bindings: IndexMap<String, String>,
    provenance: Vec<Diagnostic>,
}

pub struct Driver {
    engine: Engine,
    options: EvalOptions,
    timeout: Option<Duration>,
}

impl Driver {
    pub fn new(engine: Engine, options: EvalOptions) -> Self {
        Driver {
            engine,
            options,
            timeout: None,
        }
    }

    pub fn from_args(args: &CliArgs) -> Result<Self> {
        let engine = if args.no_prelude {
            Engine::new()
        } else {
            Engine::with_prelude().context("failed to declare the utility aliases")?
        };
        Ok(Self::new(engine, args.eval_options()).with_timeout(args.timeout()))
    }

    /// Deadline applied to every query, measured from the query's start.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    pub fn run(&self, document: &Document) -> Result<Vec<QueryReport>> {
        let _span = info_span!("run", aliases = document.aliases.len(), queries = document.queries.len()).entered();
        self.engine
            .declare_aliases(&document.aliases)
            .context("failed to declare aliases")?;

        let reports: Vec<QueryReport> = document
            .queries
            .par_iter()
            .enumerate()
            .map(|(index, query)| self.run_query(index, query))
            .collect();

        let failed = reports.iter().filter(|r| !r.is_ok()).count();
        info!(total = reports.len(), failed, "queries finished");
        Ok(reports)
    }

    fn query_options(&self, query: &Query) -> EvalOptions {
        let base = match self.timeout {
            Some(timeout) => self.options.with_timeout(timeout),
            None => self.options,
        };
        query.options().apply(base)
    }

    pub fn run_query(&self, index: usize, query: &Query) -> QueryReport {
        let options = self.query_options(query);
        let outcome = self.answer(query, options);
        debug!(index, query = query.kind(), ok = outcome.is_ok(), "query answered");
        let mut report = QueryReport {
            index,
            name: query.name().map(str::to_string),
            query: query.kind(),
            result: None,
            bindings: IndexMap::new(),
            provenance: Vec::new(),
            error: None,
        };
        match outcome {
            Ok(answer) => {
                report.result = answer.result;
                report.bindings = answer.bindings;
                report.provenance = answer.provenance;
            }
            Err(diagnostic) => report.error = Some(diagnostic),
        }
        report
    }

    fn answer(&self, query: &Query, options: EvalOptions) -> Result<Answer, Diagnostic> {
        let engine = &self.engine;
        match query {
            Query::Evaluate { expr, env, .. } => {
                let resolved = engine.evaluate_expr(expr, env, options)?;
                Ok(Answer {
                    result: Some(engine.format_type(resolved.type_id)),
                    provenance: resolved.provenance,
                    ..Answer::default()
                })
            }
            Query::Assignable { source, target, .. } => {
                let source = engine.lower(source)?;
                let target = engine.lower(target)?;
                engine.check_assignable(source, target, options)?;
                Ok(Answer {
                    result: Some("true".to_string()),
                    ..Answer::default()
                })
            }
            Query::Instantiate {
                alias, args, hints, ..
            } => {
                let def = engine.alias(alias).ok_or_else(|| Diagnostic::unresolved(alias))?;
                let decl = engine.generic_decl(def)?;
                let names: Vec<String> = decl
                    .type_params
                    .iter()
                    .map(|p| engine.interner().resolve_atom(p.name))
                    .collect();
                let scope: Vec<&str> = names.iter().map(String::as_str).collect();

                let explicit = args
                    .iter()
                    .enumerate()
                    .map(|(i, arg)| engine.lower(arg).map_err(|d| d.at(PathSegment::TypeArgument(i))))
                    .collect::<Result<Vec<TypeId>, Diagnostic>>()?;
                let hints = hints
                    .iter()
                    .map(|hint| -> Result<ContextualHint, Diagnostic> {
                        Ok(ContextualHint {
                            pattern: engine.lower_in_scope(&hint.pattern, &scope)?,
                            actual: engine.lower(&hint.actual)?,
                        })
                    })
                    .collect::<Result<Vec<_>, _>>()?;

                let instantiation = engine.instantiate(&decl, &explicit, &hints, options)?;
                Ok(self.instantiation_answer(&instantiation))
            }
            Query::Match {
                pattern,
                subject,
                infer,
                ..
            } => {
                let mut slot_names = infer.clone();
                for name in infer_names(pattern) {
                    if !slot_names.contains(&name) {
                        slot_names.push(name);
                    }
                }
                let scope: Vec<&str> = slot_names.iter().map(String::as_str).collect();
                let pattern = engine.lower_in_scope(pattern, &scope)?;
                let subject = engine.lower(subject)?;
                let slots: Vec<Atom> = slot_names.iter().map(|n| engine.interner().intern_string(n)).collect();

                let bindings = engine
                    .try_match(pattern, subject, &slots)
                    .map_err(|e| e.into_diagnostic(engine.db()))?;
                Ok(Answer {
                    result: Some("true".to_string()),
                    bindings: bindings
                        .iter()
                        .map(|(name, ty)| (engine.interner().resolve_atom(name), engine.format_type(ty)))
                        .collect(),
                    ..Answer::default()
                })
            }
            Query::Call {
                type_params,
                params,
                returns,
                args,
                ..
            } => {
                let func = engine.lower_signature(type_params, params, returns)?;
                let args = args
                    .iter()
                    .enumerate()
                    .map(|(i, arg)| engine.lower(arg).map_err(|d| d.at(PathSegment::Parameter(i))))
                    .collect::<Result<Vec<TypeId>, Diagnostic>>()?;
                let instantiation = engine.infer_call(&func, &args, options)?;
                Ok(self.instantiation_answer(&instantiation))
            }
            Query::WriteProperty {
                object,
                property,
                value,
                ..
            } => {
                let object = engine.lower(object)?;
                let value = engine.lower(value)?;
                engine.check_property_write(object, property, value, options)?;
                Ok(Answer {
                    result: Some("true".to_string()),
                    ..Answer::default()
                })
            }
        }
    }

    fn instantiation_answer(&self, instantiation: &Instantiation) -> Answer {
        let engine = &self.engine;
        Answer {
            result: Some(engine.format_type(instantiation.type_id)),
            bindings: instantiation
                .bindings
                .iter()
                .map(|(&name, &ty)| (engine.interner().resolve_atom(name), engine.format_type(ty)))
                .collect(),
            provenance: Vec::new(),
        }
    }
}

pub fn parse_document(text: &str) -> Result<Document> {
    serde_json::from_str(text).context("invalid query document")
}

/// Read a document from `path`, or from stdin when `path` is `None`.
pub fn load_document(path: Option<&Path>) -> Result<Document> {
    let text = match path {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?,
        None => {
            let mut text = String::new();
            std::io::stdin()
                .read_to_string(&mut text)
                .context("failed to read stdin")?;
            text
        }
    };
    parse_document(&text)
}
