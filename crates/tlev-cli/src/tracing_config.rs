//! Diagnostic logging for the `tlev` binary.
//!
//! Off unless `TLEV_LOG` (or `RUST_LOG`) holds a filter. `TLEV_LOG_FORMAT`
//! picks the layout: `text` lines, an indented `tree` of spans, or `json`.
//!
//! ```bash
//! TLEV_LOG=debug TLEV_LOG_FORMAT=tree tlev queries.json
//! TLEV_LOG="tlev_solver::evaluate=trace" tlev queries.json
//! ```

use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, Registry, fmt};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    /// Span tree via `tracing-tree`.
    Tree,
    Json,
}

impl LogFormat {
    /// Unknown values fall back to `Text`.
    pub fn parse(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "tree" => Self::Tree,
            "json" => Self::Json,
            _ => Self::Text,
        }
    }

    fn from_env() -> Self {
        Self::parse(&std::env::var("TLEV_LOG_FORMAT").unwrap_or_default())
    }
}

/// `TLEV_LOG` wins over `RUST_LOG`. `None` when neither is set.
fn filter_from_env() -> Option<EnvFilter> {
    match std::env::var("TLEV_LOG") {
        Ok(directives) => Some(EnvFilter::builder().parse_lossy(directives)),
        Err(_) if std::env::var_os("RUST_LOG").is_some() => Some(EnvFilter::from_default_env()),
        Err(_) => None,
    }
}

/// Install the global subscriber, writing to stderr so logs never mix
/// with query output.
pub fn init_tracing() {
    let Some(filter) = filter_from_env() else {
        return;
    };
    let registry = Registry::default().with(filter);
    match LogFormat::from_env() {
        LogFormat::Tree => registry
            .with(
                tracing_tree::HierarchicalLayer::new(2)
                    .with_indent_lines(true)
                    .with_deferred_spans(true)
                    .with_targets(true),
            )
            .init(),
        LogFormat::Json => registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init(),
        LogFormat::Text => registry
            .with(fmt::layer().with_writer(std::io::stderr))
            .init(),
    }
}
