use clap::Parser;
use std::path::Path;
use std::time::Duration;

use super::args::{CliArgs, ColorChoice, OutputFormat};
use tlev_common::limits::DEFAULT_RECURSION_LIMIT;

#[test]
fn parses_defaults() {
    let args = CliArgs::try_parse_from(["tlev"]).expect("default args should parse");

    assert!(args.input.is_none());
    assert!(args.input_path().is_none());
    assert_eq!(args.format, OutputFormat::Text);
    assert_eq!(args.color, ColorChoice::Auto);
    assert_eq!(args.recursion_limit, DEFAULT_RECURSION_LIMIT);
    assert!(!args.full_expansion);
    assert!(!args.excess_property_check);
    assert!(!args.no_prelude);
    assert_eq!(args.timeout(), None);
}

#[test]
fn parses_evaluation_flags() {
    let args = CliArgs::try_parse_from([
        "tlev",
        "--recursion-limit",
        "10",
        "--full-expansion",
        "--excess-property-check",
        "--keyof-index-signatures",
        "--timeout-ms",
        "250",
        "--format",
        "json",
        "--color",
        "never",
        "--no-prelude",
        "queries.json",
    ])
    .expect("flagged args should parse");

    assert_eq!(args.input_path(), Some(Path::new("queries.json")));
    assert_eq!(args.format, OutputFormat::Json);
    assert_eq!(args.color, ColorChoice::Never);
    assert_eq!(args.timeout(), Some(Duration::from_millis(250)));
    assert!(args.no_prelude);

    let options = args.eval_options();
    assert_eq!(options.recursion_limit, 10);
    assert!(options.full_expansion);
    assert!(options.excess_property_check);
    assert!(options.keyof_includes_index_signatures);
}

#[test]
fn dash_reads_stdin() {
    let args = CliArgs::try_parse_from(["tlev", "-"]).expect("dash should parse");
    assert!(args.input.is_some());
    assert!(args.input_path().is_none());
}

#[test]
fn rejects_unknown_format() {
    assert!(CliArgs::try_parse_from(["tlev", "--format", "yaml"]).is_err());
}
