//! Terminal progress display for mirror runs

use crate::display::format_bytes;
use console::style;
use ftpmirror_sync::{ProgressObserver, SyncPhase};
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// Renders engine progress with an indicatif bar
pub struct TerminalProgress {
    bar: ProgressBar,
    verbose: bool,
}

impl TerminalProgress {
    /// Create a progress display; `quiet` hides all output
    pub fn new(quiet: bool, verbose: bool) -> Self {
        let bar = if quiet {
            ProgressBar::hidden()
        } else {
            let bar = ProgressBar::new_spinner();
            bar.set_style(spinner_style());
            bar.enable_steady_tick(Duration::from_millis(100));
            bar
        };
        Self { bar, verbose }
    }

    /// Clear the bar from the terminal
    pub fn finish_and_clear(&self) {
        self.bar.finish_and_clear();
    }

    fn print_line(&self, line: String) {
        if !self.bar.is_hidden() {
            self.bar.suspend(|| println!("{}", line));
        }
    }
}

fn spinner_style() -> ProgressStyle {
    ProgressStyle::default_spinner()
        .template("{spinner:.green} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
}

fn upload_style() -> ProgressStyle {
    ProgressStyle::default_bar()
        .template("{spinner:.green} {msg} [{wide_bar:.cyan/blue}] {bytes}/{total_bytes} ({eta})")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
}

impl ProgressObserver for TerminalProgress {
    fn phase_changed(&self, phase: SyncPhase) {
        self.bar.set_style(spinner_style());
        self.bar.set_message(phase.to_string());
    }

    fn directory_indexed(&self, path: &str, entries: usize) {
        let shown = if path.is_empty() { "/" } else { path };
        self.bar
            .set_message(format!("Indexing remote: {} ({} entries)", shown, entries));
    }

    fn scan_completed(&self, directories: usize, files: u64) {
        if self.verbose {
            self.print_line(format!(
                "  {} {} files in {} directories",
                style("ℹ").blue(),
                files,
                directories
            ));
        }
    }

    fn upload_started(&self, path: &str, size: u64) {
        self.bar.set_style(upload_style());
        self.bar.set_length(size);
        self.bar.set_position(0);
        self.bar.set_message(format!("Uploading {}", path));
    }

    fn block_sent(&self, _path: &str, bytes: usize) {
        self.bar.inc(bytes as u64);
    }

    fn upload_finished(&self, path: &str, bytes: u64) {
        self.bar.set_style(spinner_style());
        self.bar.set_message(SyncPhase::Uploading.to_string());
        self.print_line(format!(
            "  {} {} ({})",
            style("↑").green(),
            style(path).cyan(),
            style(format_bytes(bytes)).dim()
        ));
    }

    fn file_unchanged(&self, path: &str) {
        if self.verbose {
            self.print_line(format!("  {} {}", style("=").dim(), style(path).dim()));
        }
    }

    fn file_deleted(&self, path: &str) {
        self.print_line(format!("  {} {}", style("✗").red(), style(path).yellow()));
    }
}
