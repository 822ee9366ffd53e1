//! Terminal prompts, progress lines and the final report.

use std::collections::HashMap;
use std::sync::Mutex;

use colored::Colorize;
use dialoguer::Confirm;

use envault_core::config::CONFIG_FILE;
use envault_sync::{
    FileSync, Flow, ProgressEvent, ProgressSink, Prompter, RunReport, Stage, SyncReport,
    Workspace,
};

// ---------------------------------------------------------------------------
// Prompts
// ---------------------------------------------------------------------------

/// Yes/no questions on the controlling terminal, defaulting to yes.
pub struct TerminalPrompter;

impl Prompter for TerminalPrompter {
    fn confirm(&self, prompt: &str) -> bool {
        match Confirm::new().with_prompt(prompt).default(true).interact() {
            Ok(answer) => answer,
            Err(e) => {
                tracing::warn!(error = %e, "prompt unavailable; answering no");
                false
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Progress
// ---------------------------------------------------------------------------

/// Prints status lines; per-file percentages in 10% steps.
#[derive(Default)]
pub struct ConsoleProgress {
    deciles: Mutex<HashMap<String, u64>>,
}

impl ConsoleProgress {
    /// `Some(percent)` when `written` crosses into a new 10% step.
    fn next_step(&self, name: &str, written: u64, total: u64) -> Option<u64> {
        if total == 0 {
            return None;
        }
        let decile = (written.saturating_mul(10) / total).min(10);
        let mut deciles = self.deciles.lock().ok()?;
        let last = deciles.entry(name.to_string()).or_insert(0);
        if decile > *last && decile < 10 {
            *last = decile;
            Some(decile * 10)
        } else {
            None
        }
    }
}

impl ProgressSink for ConsoleProgress {
    fn report(&self, event: ProgressEvent<'_>) {
        match event {
            ProgressEvent::Stage(Stage::Connecting) => {
                println!("{}", "Connecting to your Envault server...".dimmed())
            }
            ProgressEvent::Stage(Stage::Connected) => {}
            ProgressEvent::Stage(Stage::Reconciling) => {
                println!("Deleting files which do not exist on the server...")
            }
            ProgressEvent::Stage(Stage::Downloading) => println!("Downloading files..."),
            ProgressEvent::Skipped { name } => {
                println!("  {} {name} matches the server copy", "·".dimmed())
            }
            ProgressEvent::Started { name, total } => match total {
                Some(total) => println!("  {} {name} ({total} bytes)", "↓".cyan()),
                None => println!("  {} {name}", "↓".cyan()),
            },
            ProgressEvent::Advanced {
                name,
                written,
                total: Some(total),
            } => {
                if let Some(percent) = self.next_step(name, written, total) {
                    println!("  {} {name} {percent}%", "↓".cyan());
                }
            }
            ProgressEvent::Advanced { .. } => {}
            ProgressEvent::Finished { name, written } => {
                println!("  {} {name} ({written} bytes)", "✓".green())
            }
            ProgressEvent::Failed { name, message } => {
                println!("  {} {name}: {message}", "✗".red())
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Report
// ---------------------------------------------------------------------------

pub fn print_welcome() {
    println!("Welcome to Envault! No more .env update nightmares from now on, we promise 🤗");
}

pub fn print_report(workspace: &Workspace, report: &RunReport) {
    match &report.files {
        FileSync::Synced(files) => print_files(files),
        FileSync::Declined => println!(
            "{} File synchronization aborted as a {} directory exists.",
            "Warning:".yellow().bold(),
            workspace.secure_files_dir.display()
        ),
        FileSync::NotRequested => {}
    }

    if report.env_file_created {
        println!("Created {}.", report.filename);
    }
    if report.flow == Flow::Setup {
        println!("Configuration file set up.");
        if report.gitignore_updated {
            println!(".gitignore updated with {CONFIG_FILE}.");
        }
    }

    print_updates(report);
}

fn print_files(files: &SyncReport) {
    for path in &files.deleted {
        println!("  {} removed {}", "-".red(), path.display());
    }
    if files.is_clean() {
        println!(
            "{} All files synchronized ({} downloaded, {} up to date).",
            "✓".green(),
            files.downloaded.len(),
            files.skipped.len()
        );
        return;
    }
    println!(
        "{} {} file(s) failed to download:",
        "✗".red(),
        files.failed.len()
    );
    for failure in &files.failed {
        println!("  └ {failure}");
    }
}

fn print_updates(report: &RunReport) {
    if report.updates.is_empty() {
        println!("You are already up to date 🎉");
        return;
    }
    let noun = if report.updates.len() > 1 {
        "variables"
    } else {
        "variable"
    };
    println!("We updated {} {noun}:", report.updates.len());
    for update in &report.updates {
        println!("  └ {}", update.to_string().bold());
    }
}
