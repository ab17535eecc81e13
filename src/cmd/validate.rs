//! Validate command - list everything that needs manual review before filing

use crate::cmd::InputArgs;
use crate::core::ReviewItem;
use clap::Args;
use serde::Serialize;

#[derive(Args, Debug)]
pub struct ValidateCommand {
    #[command(flatten)]
    input: InputArgs,

    /// Output as JSON instead of formatted text
    #[arg(long)]
    json: bool,
}

/// JSON output structure
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ValidationOutput<'a> {
    fiscal_year: String,
    issue_count: usize,
    issues: &'a [ReviewItem],
}

impl ValidateCommand {
    pub fn exec(&self) -> anyhow::Result<()> {
        let (books, run) = self.input.classify()?;
        let issues = run.review_items();
        for issue in &issues {
            log::warn!("{}: {}", issue.kind.display(), issue.detail);
        }

        if self.json {
            let output = ValidationOutput {
                fiscal_year: books.period.label.clone(),
                issue_count: issues.len(),
                issues: &issues,
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
        } else {
            print_text(&issues, &books.period.label);
        }

        // Exit with code 1 if issues found
        if !issues.is_empty() {
            std::process::exit(1);
        }
        Ok(())
    }
}

fn print_text(issues: &[ReviewItem], year: &str) {
    println!();
    println!("VALIDATION RESULTS (FY {})", year);
    println!();

    if issues.is_empty() {
        println!("\u{2713} No issues found.");
        return;
    }

    println!("\u{26A0} {} issue(s) found:", issues.len());
    println!();
    for (i, issue) in issues.iter().enumerate() {
        println!(
            "  {}. [{}] {}",
            i + 1,
            issue.kind.display(),
            issue.id.as_deref().unwrap_or("-")
        );
        println!("     {}", issue.detail);
    }
}
