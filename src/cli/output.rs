//! Colored output helpers for CLI
//!
//! Provides consistent, colored terminal output for the toolscout CLI.

use crate::research::ResearchState;
use crate::types::{StageFailure, ToolAnalysis};
use owo_colors::OwoColorize;

/// Output style configuration
pub struct Output {
    /// Whether to use colored output
    pub colored: bool,
}

impl Default for Output {
    fn default() -> Self {
        Self::new()
    }
}

impl Output {
    /// Create a new output helper with colors enabled
    pub fn new() -> Self {
        Self { colored: true }
    }

    /// Create a new output helper with colors disabled
    pub fn no_color() -> Self {
        Self { colored: false }
    }

    /// Print a success message with a checkmark
    pub fn success(&self, message: &str) {
        if self.colored {
            println!("  {} {}", "✓".green().bold(), message.green());
        } else {
            println!("  [OK] {}", message);
        }
    }

    /// Print an info message
    pub fn info(&self, message: &str) {
        if self.colored {
            println!("  {} {}", "•".blue(), message);
        } else {
            println!("  [INFO] {}", message);
        }
    }

    /// Print a warning message
    pub fn warning(&self, message: &str) {
        if self.colored {
            println!("  {} {}", "⚠".yellow().bold(), message.yellow());
        } else {
            println!("  [WARN] {}", message);
        }
    }

    /// Print an error message
    pub fn error(&self, message: &str) {
        if self.colored {
            eprintln!("  {} {}", "✗".red().bold(), message.red());
        } else {
            eprintln!("  [ERROR] {}", message);
        }
    }

    /// Print a file creation message
    pub fn created(&self, file_type: &str, path: &str) {
        if self.colored {
            println!(
                "  {} {} {}",
                "✓".green().bold(),
                file_type.dimmed(),
                path.bright_white()
            );
        } else {
            println!("  [CREATED] {} {}", file_type, path);
        }
    }

    /// Print a file skipped message
    pub fn skipped(&self, path: &str, reason: &str) {
        if self.colored {
            println!(
                "  {} {} {}",
                "○".yellow(),
                path.dimmed(),
                format!("({})", reason).yellow()
            );
        } else {
            println!("  [SKIPPED] {} ({})", path, reason);
        }
    }

    /// Print a header for a section
    pub fn header(&self, title: &str) {
        if self.colored {
            println!("\n  {}", title.bright_white().bold().underline());
        } else {
            println!("\n  === {} ===", title);
        }
    }

    /// Print a subheader
    pub fn subheader(&self, title: &str) {
        if self.colored {
            println!("\n  {}", title.cyan().bold());
        } else {
            println!("\n  --- {} ---", title);
        }
    }

    /// Print a key-value pair
    pub fn kv(&self, key: &str, value: &str) {
        if self.colored {
            println!("    {}: {}", key.dimmed(), value.bright_white());
        } else {
            println!("    {}: {}", key, value);
        }
    }

    /// Print a hint/tip message
    pub fn hint(&self, message: &str) {
        if self.colored {
            println!("\n  {} {}", "💡".dimmed(), message.dimmed().italic());
        } else {
            println!("\n  [TIP] {}", message);
        }
    }

    /// Print a command suggestion
    pub fn command(&self, cmd: &str) {
        if self.colored {
            println!("     {}", format!("$ {}", cmd).bright_cyan());
        } else {
            println!("     $ {}", cmd);
        }
    }

    /// Print completion message
    pub fn complete(&self, message: &str) {
        if self.colored {
            println!("\n  {} {}", "🚀".green(), message.bright_green().bold());
        } else {
            println!("\n  [DONE] {}", message);
        }
    }

    /// Print a table header row
    pub fn table_header(&self, columns: &[&str]) {
        let header = pad_columns(columns);
        if self.colored {
            println!("    {}", header.bright_white().bold());
            println!("    {}", "─".repeat(columns.len() * 16).dimmed());
        } else {
            println!("    {}", header);
            println!("    {}", "-".repeat(columns.len() * 16));
        }
    }

    /// Print a table row
    pub fn table_row(&self, values: &[&str]) {
        println!("    {}", pad_columns(values));
    }

    /// Print one recorded failure
    pub fn failure(&self, failure: &StageFailure) {
        if self.colored {
            println!("    {} {}", "✗".red(), failure.to_string().dimmed());
        } else {
            println!("    - {}", failure);
        }
    }

    /// Print the descriptive fields of one analysis
    pub fn tool_details(&self, analysis: &ToolAnalysis) {
        self.subheader(&analysis.name);
        for (key, value) in detail_fields(analysis) {
            self.kv(key, &value);
        }
    }

    /// Print newline
    pub fn newline(&self) {
        println!();
    }

    /// Print the outcome of a research run
    pub fn research_report(&self, state: &ResearchState) {
        self.header(&format!("Recommendation: {}", state.query()));
        self.newline();
        for line in state.final_report().unwrap_or_default().lines() {
            println!("  {}", line);
        }

        if !state.analyses().is_empty() {
            self.subheader("Analyzed tools");
            self.table_header(&ANALYSIS_COLUMNS);
            for analysis in state.analyses() {
                let row = analysis_row(analysis);
                let row: Vec<&str> = row.iter().map(String::as_str).collect();
                self.table_row(&row);
            }
            for analysis in state.analyses() {
                self.tool_details(analysis);
            }
        }

        if !state.failures().is_empty() {
            self.subheader("Failures");
            for failure in state.failures() {
                self.failure(failure);
            }
        }

        match state.failure_summary() {
            Some(summary) => self.warning(&summary),
            None => self.success(&format!(
                "{} of {} tools analyzed",
                state.analyses().len(),
                state.candidates().len()
            )),
        }
    }
}

const ANALYSIS_COLUMNS: [&str; 5] = ["Tool", "Pricing", "Open source", "API", "Confidence"];

fn pad_columns(values: &[&str]) -> String {
    values
        .iter()
        .map(|v| format!("{:<15}", v))
        .collect::<Vec<_>>()
        .join(" ")
}

fn analysis_row(analysis: &ToolAnalysis) -> [String; 5] {
    let flag = |value: bool| (if value { "yes" } else { "no" }).to_string();
    [
        analysis.name.clone(),
        analysis.pricing_model.to_string(),
        flag(analysis.is_open_source),
        flag(analysis.api_available),
        format!("{:.2}", analysis.confidence),
    ]
}

/// Non-empty descriptive fields, in display order
fn detail_fields(analysis: &ToolAnalysis) -> Vec<(&'static str, String)> {
    let join = |values: &std::collections::BTreeSet<String>| {
        values.iter().cloned().collect::<Vec<_>>().join(", ")
    };
    [
        ("Website", analysis.website.clone()),
        ("Description", analysis.description.clone()),
        ("Tech stack", join(&analysis.tech_stack)),
        ("Languages", join(&analysis.language_support)),
        ("Integration", analysis.integration_notes.clone()),
    ]
    .into_iter()
    .filter(|(_, value)| !value.trim().is_empty())
    .collect()
}
