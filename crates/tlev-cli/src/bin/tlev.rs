use anyhow::Result;
use clap::Parser;
use std::io::IsTerminal;

use tlev_cli::args::{CliArgs, ColorChoice, OutputFormat};
use tlev_cli::driver::{Driver, load_document};
use tlev_cli::reporter::Reporter;

const EXIT_QUERY_FAILED: i32 = 1;

fn main() -> Result<()> {
    // Initialize tracing if TLEV_LOG or RUST_LOG is set.
    // Supports TLEV_LOG_FORMAT=tree|json|text.
    tlev_cli::tracing_config::init_tracing();

    let args = CliArgs::parse();
    let document = load_document(args.input_path())?;
    let driver = Driver::from_args(&args)?;
    let reports = driver.run(&document)?;

    let output = match args.format {
        OutputFormat::Json => Reporter::render_json(&reports)?,
        OutputFormat::Text => {
            let color = match args.color {
                ColorChoice::Always => true,
                ColorChoice::Never => false,
                ColorChoice::Auto => std::io::stdout().is_terminal(),
            };
            Reporter::new(color).render(&reports)
        }
    };
    println!("{output}");

    if reports.iter().any(|report| !report.is_ok()) {
        std::process::exit(EXIT_QUERY_FAILED);
    }
    Ok(())
}
