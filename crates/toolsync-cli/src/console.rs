//! Console reporter with styled output.

use crossterm::style::Stylize;
use toolsync_core::Reporter;

/// Prints progress to stdout and failures to stderr.
#[derive(Debug, Clone, Copy)]
pub struct ConsoleReporter;

impl Reporter for ConsoleReporter {
    fn installing(&self, name: &str, version: &str) {
        println!("{} installing {}@{version}", "→".blue(), name.bold());
    }

    fn removing(&self, name: &str) {
        println!("{} removing {}", "→".blue(), name.bold());
    }

    fn done(&self, name: &str, detail: &str) {
        println!("{} {} {detail}", "✓".green(), name.bold());
    }

    fn failed(&self, name: &str, reason: &str) {
        eprintln!("{} {} {reason}", "✗".red(), name.bold());
    }

    fn info(&self, msg: &str) {
        println!("  {}", msg.to_string().dim());
    }

    fn warning(&self, msg: &str) {
        eprintln!("{} {msg}", "warning:".yellow());
    }

    fn error(&self, msg: &str) {
        eprintln!("{} {msg}", "error:".red());
    }

    fn summary(&self, installed: usize, removed: usize, failed: usize) {
        if installed == 0 && removed == 0 && failed == 0 {
            println!("{}", "nothing to do".dim());
            return;
        }
        let mut parts = Vec::new();
        if installed > 0 {
            parts.push(format!("{installed} installed"));
        }
        if removed > 0 {
            parts.push(format!("{removed} removed"));
        }
        if failed > 0 {
            parts.push(format!("{failed} failed"));
        }
        println!("{} {}", "done:".bold(), parts.join(", "));
    }
}
