//! Code Sanitizer - strips prose and markdown from model output
//!
//! Models asked for "only CLIPS code" still wrap it in fences and chatter.
//! The sanitizer keeps lines that could plausibly be CLIPS source:
//! - blank lines
//! - lines starting with `(` (an expression)
//! - lines starting with `;` (a CLIPS comment)
//! - continuation lines of an expression that is still open, so a
//!   multi-line `defrule` keeps its `=>` line
//!
//! A continuation line must itself look like CLIPS: it starts with `=>`, a
//! variable (`?x`, `$?x`) or a constraint connective (`~`, `&`, `|`, `:`,
//! `=`), or it ends with `)`. Anything else inside an open expression is
//! prose; it is dropped and closes the expression.
//!
//! Fence lines (```) flip the fence state and are always dropped.

/// Markdown fence marker
const FENCE: &str = "```";

/// CLIPS line comment marker
const COMMENT: char = ';';

/// Where the scanner is relative to a markdown fence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FenceState {
    #[default]
    Outside,
    Inside,
}

impl FenceState {
    fn toggled(self) -> Self {
        match self {
            FenceState::Outside => FenceState::Inside,
            FenceState::Inside => FenceState::Outside,
        }
    }
}

/// What the sanitizer decided about a single line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind {
    /// Opens or closes a fenced block, never kept
    Fence,
    /// Empty after trimming
    Blank,
    /// Starts with `(`
    Expression,
    /// Starts with `;`
    Comment,
    /// Inside an expression opened on an earlier line
    Continuation,
    /// Anything else - dropped
    Prose,
}

impl LineKind {
    pub fn is_retained(self) -> bool {
        matches!(
            self,
            LineKind::Blank | LineKind::Expression | LineKind::Comment | LineKind::Continuation
        )
    }
}

/// Classify one raw line on its own, without expression context
pub fn classify_line(line: &str) -> LineKind {
    let trimmed = line.trim();
    if trimmed.starts_with(FENCE) {
        LineKind::Fence
    } else if trimmed.is_empty() {
        LineKind::Blank
    } else if trimmed.starts_with('(') {
        LineKind::Expression
    } else if trimmed.starts_with(COMMENT) {
        LineKind::Comment
    } else {
        LineKind::Prose
    }
}

/// Prefixes a CLIPS continuation line can start with
const CONTINUATION_PREFIXES: &[&str] = &["=>", "?", "$?", "~", "&", "|", ":", "="];

/// Whether a line inside an open expression reads as CLIPS syntax
fn is_clips_continuation(line: &str) -> bool {
    let trimmed = line.trim();
    CONTINUATION_PREFIXES
        .iter()
        .any(|prefix| trimmed.starts_with(prefix))
        || trimmed.ends_with(')')
}

/// Net parenthesis change on a line, ignoring strings and comments
fn paren_delta(line: &str) -> i64 {
    let mut delta = 0;
    let mut in_string = false;
    let mut escaped = false;
    for c in line.chars() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            COMMENT => break,
            '(' => delta += 1,
            ')' => delta -= 1,
            _ => {}
        }
    }
    delta
}

/// Line-by-line scanner carrying the fence state and expression depth
#[derive(Debug, Default)]
pub struct Sanitizer {
    state: FenceState,
    depth: usize,
    retained: Vec<String>,
}

impl Sanitizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> FenceState {
        self.state
    }

    /// Open parentheses not yet closed by retained lines
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Feed one line. Returns how it was classified.
    pub fn feed(&mut self, line: &str) -> LineKind {
        let kind = match classify_line(line) {
            LineKind::Prose if self.depth > 0 && is_clips_continuation(line) => {
                LineKind::Continuation
            }
            LineKind::Prose => {
                self.depth = 0;
                LineKind::Prose
            }
            kind => kind,
        };
        match kind {
            LineKind::Fence => self.state = self.state.toggled(),
            kind if kind.is_retained() => {
                let depth = self.depth as i64 + paren_delta(line);
                self.depth = depth.max(0) as usize;
                self.retained.push(line.to_string());
            }
            _ => {}
        }
        kind
    }

    /// Join retained lines, trimming surrounding blank lines
    pub fn finish(self) -> String {
        self.retained.join("\n").trim().to_string()
    }
}

/// Extract the plausible CLIPS source from raw model output.
///
/// Never fails. Output with nothing that looks like CLIPS yields an empty
/// string; rejecting that is the execution stage's job.
pub fn sanitize(raw: &str) -> String {
    let mut sanitizer = Sanitizer::new();
    for line in raw.lines() {
        sanitizer.feed(line);
    }
    sanitizer.finish()
}
