use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use std::time::Duration;

use tlev_common::limits::DEFAULT_RECURSION_LIMIT;
use tlev_solver::EvalOptions;

/// CLI arguments for the tlev binary.
#[derive(Parser, Debug)]
#[command(
    name = "tlev",
    version,
    about = "Evaluate type-level programs: conditional, mapped and template literal types"
)]
pub struct CliArgs {
    /// Query document (JSON). Reads stdin when omitted or `-`.
    pub input: Option<PathBuf>,

    /// Output format for query results.
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,

    /// Colorize text output.
    #[arg(long, value_enum, default_value_t = ColorChoice::Auto)]
    pub color: ColorChoice,

    // ==================== Evaluation Options ====================
    /// Maximum depth of nested alias expansion.
    #[arg(long = "recursion-limit", default_value_t = DEFAULT_RECURSION_LIMIT)]
    pub recursion_limit: u32,

    /// Expand recursive aliases eagerly instead of deferring re-entrant ones.
    #[arg(long = "full-expansion")]
    pub full_expansion: bool,

    /// Reject object sources that name properties the target lacks.
    #[arg(long = "excess-property-check")]
    pub excess_property_check: bool,

    /// Include index signature key types in `keyof`.
    #[arg(long = "keyof-index-signatures")]
    pub keyof_index_signatures: bool,

    /// Per-query evaluation deadline in milliseconds.
    #[arg(long = "timeout-ms")]
    pub timeout_ms: Option<u64>,

    /// Do not declare the built-in utility aliases (`Partial`, `Pick`, ...).
    #[arg(long = "no-prelude")]
    pub no_prelude: bool,
}

impl CliArgs {
    /// Evaluation options shared by every query, before per-query overrides.
    pub fn eval_options(&self) -> EvalOptions {
        EvalOptions::default()
            .with_recursion_limit(self.recursion_limit)
            .with_full_expansion(self.full_expansion)
            .with_excess_property_check(self.excess_property_check)
            .with_keyof_index_signatures(self.keyof_index_signatures)
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }

    /// `None` means standard input.
    pub fn input_path(&self) -> Option<&std::path::Path> {
        self.input.as_deref().filter(|path| path.as_os_str() != "-")
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum ColorChoice {
    Auto,
    Always,
    Never,
}
