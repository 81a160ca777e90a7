//! Console [`poks_core::Reporter`]: one line per event, no live
//! redraw. `poks-cli` is a thin dispatcher, not an interactive
//! terminal app, so this trades the teacher's multi-threaded
//! live-table renderer for plain sequential output honoring
//! `POKS_NO_COLOR`/`--no-color`.

use crossterm::style::Stylize;

/// Prints install/uninstall progress to stdout.
#[derive(Debug, Clone, Copy)]
pub struct ConsoleReporter {
    color: bool,
}

impl ConsoleReporter {
    /// Build a reporter; `color` disables styling when `false`
    /// (`POKS_NO_COLOR`/`--no-color`).
    pub fn new(color: bool) -> Self {
        Self { color }
    }

    fn paint(&self, text: &str, color_fn: impl Fn(&str) -> String) -> String {
        if self.color {
            color_fn(text)
        } else {
            text.to_string()
        }
    }
}

impl poks_core::Reporter for ConsoleReporter {
    fn syncing_bucket(&self, name: &str) {
        println!("  {} syncing bucket '{name}'", self.paint("~", |s| s.cyan().to_string()));
    }

    fn downloading(&self, name: &str, version: &str, current: u64, total: Option<u64>) {
        let pct = total
            .filter(|&t| t > 0)
            .map(|t| format!(" ({}%)", (current * 100 / t).min(100)))
            .unwrap_or_default();
        println!("  {} {name}@{version} downloading{pct}", self.paint("↓", |s| s.cyan().to_string()));
    }

    fn extracting(&self, name: &str, version: &str) {
        println!("  {} {name}@{version} extracting", self.paint("»", |s| s.cyan().to_string()));
    }

    fn poking(&self, name: &str, version: &str) {
        println!("  {} {name}@{version} patching prefix", self.paint("»", |s| s.cyan().to_string()));
    }

    fn done(&self, name: &str, version: &str, status: &str) {
        let icon = self.paint("✓", |s| s.green().to_string());
        println!("  {icon} {name}@{version} {status}");
    }

    fn failed(&self, name: &str, version: &str, reason: &str) {
        let icon = self.paint("✗", |s| s.red().to_string());
        println!("  {icon} {name}@{version} failed: {reason}");
    }

    fn info(&self, msg: &str) {
        println!("  {msg}");
    }

    fn warning(&self, msg: &str) {
        let icon = self.paint("!", |s| s.yellow().to_string());
        println!("  {icon} {msg}");
    }

    fn error(&self, msg: &str) {
        let icon = self.paint("✗", |s| s.red().to_string());
        eprintln!("  {icon} {msg}");
    }

    fn summary(&self, installed: usize, skipped: usize, failed: usize) {
        println!();
        println!("  {installed} installed, {skipped} skipped, {failed} failed");
    }
}
