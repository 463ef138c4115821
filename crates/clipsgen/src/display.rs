//! Display Library - consistent terminal output for the session
//!
//! Every message the session shows goes through `Ui`, which writes to any
//! `Write` so tests can capture the transcript.

use clipsgen_common::ColorMode;
use owo_colors::OwoColorize;
use std::io::Write;

/// Separator line (70 chars)
pub const SEPARATOR: &str =
    "======================================================================";
/// Thin separator
pub const THIN_SEPARATOR: &str =
    "----------------------------------------------------------------------";

/// Resolve a configured color mode against the current terminal
pub fn use_color(mode: ColorMode) -> bool {
    match mode {
        ColorMode::Always => true,
        ColorMode::Never => false,
        ColorMode::Auto => console::colors_enabled(),
    }
}

pub struct Ui<W: Write> {
    out: W,
    color: bool,
}

impl<W: Write> Ui<W> {
    pub fn new(out: W, color: bool) -> Self {
        Self { out, color }
    }

    pub fn writer(&self) -> &W {
        &self.out
    }

    pub fn into_writer(self) -> W {
        self.out
    }

    fn emit(&mut self, text: &str) {
        // A closed stdout leaves nothing useful to report to
        let _ = writeln!(self.out, "{}", text);
    }

    pub fn line(&mut self, text: &str) {
        self.emit(text);
    }

    pub fn blank(&mut self) {
        self.emit("");
    }

    pub fn info(&mut self, text: &str) {
        if self.color {
            self.emit(&format!("{}", text.cyan()));
        } else {
            self.emit(text);
        }
    }

    pub fn success(&mut self, text: &str) {
        let text = format!("✓ {}", text);
        if self.color {
            self.emit(&format!("{}", text.green()));
        } else {
            self.emit(&text);
        }
    }

    pub fn warning(&mut self, text: &str) {
        let text = format!("⚠ {}", text);
        if self.color {
            self.emit(&format!("{}", text.yellow()));
        } else {
            self.emit(&text);
        }
    }

    pub fn error(&mut self, text: &str) {
        let text = format!("✗ {}", text);
        if self.color {
            self.emit(&format!("{}", text.red().bold()));
        } else {
            self.emit(&text);
        }
    }

    /// Pipeline progress line, e.g. "  [1/4] Generating CLIPS code..."
    pub fn step(&mut self, index: u8, total: u8, text: &str) {
        let label = format!("[{}/{}]", index, total);
        if self.color {
            self.emit(&format!("  {} {}", label.dimmed(), text));
        } else {
            self.emit(&format!("  {} {}", label, text));
        }
    }

    pub fn section(&mut self, title: &str) {
        self.blank();
        self.emit(SEPARATOR);
        if self.color {
            self.emit(&format!("{}", title.bold()));
        } else {
            self.emit(title);
        }
        self.emit(SEPARATOR);
    }

    /// Titled block of verbatim text (generated code, raw output)
    pub fn block(&mut self, title: &str, body: &str) {
        self.blank();
        self.emit(title);
        self.emit(THIN_SEPARATOR);
        if body.trim().is_empty() {
            self.emit("(empty)");
        } else {
            self.emit(body);
        }
    }

    /// Question awaiting an answer on the same line
    pub fn question(&mut self, text: &str) {
        let _ = write!(self.out, "{}", text);
        let _ = self.out.flush();
    }

    /// Input prompt without newline
    pub fn prompt(&mut self) {
        self.blank();
        self.emit(THIN_SEPARATOR);
        let _ = write!(self.out, "You: ");
        let _ = self.out.flush();
    }

    pub fn welcome(&mut self) {
        self.blank();
        self.emit(SEPARATOR);
        self.emit("           clipsgen - Expert System Generator");
        self.emit(SEPARATOR);
        self.blank();
        self.emit("Describe your problem and I'll generate a CLIPS expert system!");
        self.blank();
        self.emit("Examples:");
        self.emit("  - 'Classify if a person is adult based on age >= 18'");
        self.emit("  - 'Recommend coffee type: morning=espresso, afternoon=latte'");
        self.emit("  - 'Diagnose if student needs help: grade<6 or attendance<70%'");
        self.blank();
        self.emit("Commands:");
        self.emit("  'quit', 'exit' or 'q' - Exit the program");
        self.emit("  'help' - Show examples");
        self.emit(SEPARATOR);
    }

    pub fn help(&mut self) {
        self.section("HOW TO USE");
        self.blank();
        self.emit("1. Describe your problem clearly");
        self.emit("2. Include the data/facts to evaluate");
        self.emit("3. Specify the rules or logic");
        self.blank();
        self.emit("EXAMPLE 1:");
        self.emit("Problem: Check if a temperature is hot, warm, or cold");
        self.emit("Data: Temperature is 35 degrees");
        self.emit("Rules: >30=hot, 15-30=warm, <15=cold");
        self.blank();
        self.emit("EXAMPLE 2:");
        self.emit("Problem: Decide if someone can get a loan");
        self.emit("Data: Person has income=3000, credit=good, debt=20%");
        self.emit("Rules: Approve if income>2500 AND credit=good AND debt<30%");
        self.emit(SEPARATOR);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(ui: Ui<Vec<u8>>) -> String {
        String::from_utf8(ui.into_writer()).unwrap()
    }

    #[test]
    fn test_plain_output_has_no_escape_codes() {
        let mut ui = Ui::new(Vec::new(), false);
        ui.error("boom");
        ui.step(1, 4, "Generating CLIPS code...");
        let out = text(ui);
        assert_eq!(out, "✗ boom\n  [1/4] Generating CLIPS code...\n");
        assert!(!out.contains('\u{1b}'));
    }

    #[test]
    fn test_colored_output_keeps_text() {
        let mut ui = Ui::new(Vec::new(), true);
        ui.success("Code generated");
        let out = text(ui);
        assert!(out.contains('\u{1b}'));
        assert!(out.contains("Code generated"));
    }

    #[test]
    fn test_block_marks_empty_body() {
        let mut ui = Ui::new(Vec::new(), false);
        ui.block("Generated code (for debugging):", "");
        assert!(text(ui).contains("(empty)"));
    }

    #[test]
    fn test_use_color_modes() {
        assert!(use_color(ColorMode::Always));
        assert!(!use_color(ColorMode::Never));
    }
}
