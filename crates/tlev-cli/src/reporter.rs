use anyhow::{Context, Result};
use colored::Colorize;

use tlev_solver::Diagnostic;

use crate::driver::QueryReport;

pub struct Reporter {
    color: bool,
}

impl Reporter {
    pub fn new(color: bool) -> Self {
        Reporter { color }
    }

    /// One block per query followed by a summary line.
    pub fn render(&self, reports: &[QueryReport]) -> String {
        let mut out = String::new();
        for report in reports {
            out.push_str(&self.format_report(report));
            out.push('\n');
        }
        out.push_str(&self.format_summary(reports));
        out
    }

    pub fn render_json(reports: &[QueryReport]) -> Result<String> {
        serde_json::to_string_pretty(reports).context("failed to serialize query reports")
    }

    pub fn format_report(&self, report: &QueryReport) -> String {
        let mut output = self.format_label(report);
        output.push_str(": ");

        match &report.error {
            Some(diagnostic) => output.push_str(&self.format_diagnostic(diagnostic)),
            None => output.push_str(report.result.as_deref().unwrap_or("ok")),
        }

        for (name, ty) in &report.bindings {
            output.push_str(&format!("\n    {name} = {ty}"));
        }
        for dropped in &report.provenance {
            output.push_str("\n    dropped ");
            output.push_str(&self.format_diagnostic(dropped));
        }
        output
    }

    pub fn format_diagnostic(&self, diagnostic: &Diagnostic) -> String {
        let mut output = String::new();
        output.push_str(&self.format_category());
        output.push(' ');
        output.push_str(&self.format_code(diagnostic.kind.code()));
        if !diagnostic.path.is_empty() {
            output.push_str(" at ");
            output.push_str(&self.format_path(&diagnostic.path.to_string()));
        }
        output.push_str(": ");
        output.push_str(&diagnostic.message);
        output
    }

    fn format_label(&self, report: &QueryReport) -> String {
        let label = match &report.name {
            Some(name) => format!("[{}] {} {}", report.index, report.query, name),
            None => format!("[{}] {}", report.index, report.query),
        };
        if self.color {
            label.bold().to_string()
        } else {
            label
        }
    }

    fn format_category(&self) -> String {
        if self.color {
            "error".red().bold().to_string()
        } else {
            "error".to_string()
        }
    }

    fn format_code(&self, code: u32) -> String {
        let label = format!("TL{code}");
        if self.color {
            label.bright_blue().to_string()
        } else {
            label
        }
    }

    fn format_path(&self, path: &str) -> String {
        if self.color {
            path.cyan().to_string()
        } else {
            path.to_string()
        }
    }

    fn format_summary(&self, reports: &[QueryReport]) -> String {
        let failed = reports.iter().filter(|r| !r.is_ok()).count();
        let summary = format!("{} queries, {} failed", reports.len(), failed);
        if !self.color {
            return summary;
        }
        if failed == 0 {
            summary.green().to_string()
        } else {
            summary.red().to_string()
        }
    }
}
