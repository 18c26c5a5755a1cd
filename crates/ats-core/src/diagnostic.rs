//! Structured diagnostics for the AX/AS pipeline.
//!
//! A diagnostic carries a kind, severity, message, token position, optional
//! source range, and concrete suggestions. Two renderers ship with the core:
//! a terminal form (ANSI colours, token tape with cursor) and a plain
//! single-line form. Editor integrations consume the language-agnostic
//! [`LspDiagnostic`] record instead.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::parser::position::Range;

/// Diagnostic kinds; the per-kind suggestion catalogue is keyed off these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorKind {
    Syntax,
    Semantic,
    Temporal,
    Context,
    Unknown,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::Syntax => write!(f, "syntax"),
            ErrorKind::Semantic => write!(f, "semantic"),
            ErrorKind::Temporal => write!(f, "temporal"),
            ErrorKind::Context => write!(f, "context"),
            ErrorKind::Unknown => write!(f, "unknown"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
    Info,
    Hint,
}

impl Severity {
    /// LSP DiagnosticSeverity numbering.
    pub fn lsp_code(self) -> u8 {
        match self {
            Severity::Error => 1,
            Severity::Warning => 2,
            Severity::Info => 3,
            Severity::Hint => 4,
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
            Severity::Info => write!(f, "info"),
            Severity::Hint => write!(f, "hint"),
        }
    }
}

/// A structured parse diagnostic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub kind: ErrorKind,
    pub severity: Severity,
    pub message: String,

    /// Index of the offending token in the token stream
    pub position: usize,
    /// Total number of tokens in the stream
    pub token_count: usize,

    /// The offending token's text, when one exists
    pub token: Option<String>,
    /// Source range of the offending token
    pub range: Option<Range>,

    /// Up to three concrete suggestions
    #[serde(default)]
    pub suggestions: Vec<String>,

    /// Arbitrary key/value context for downstream consumers
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub context: BTreeMap<String, String>,
}

/// Maximum suggestions surfaced to the user.
const MAX_SUGGESTIONS: usize = 3;

const ANSI_RED: &str = "\x1b[31m";
const ANSI_YELLOW: &str = "\x1b[33m";
const ANSI_CYAN: &str = "\x1b[36m";
const ANSI_DIM: &str = "\x1b[2m";
const ANSI_BOLD: &str = "\x1b[1m";
const ANSI_RESET: &str = "\x1b[0m";

/// One-line grammar cheatsheet appended at high verbosity.
const GRAMMAR_LINE: &str =
    "[subjects] (is|are) [predicates] (of|from) [contexts] (by|via) [actors] [since|until|on|between <time>] [over N<y|m|w|d>] [so <actions>]";

impl Diagnostic {
    pub fn new(kind: ErrorKind, severity: Severity, message: impl Into<String>) -> Self {
        Self {
            kind,
            severity,
            message: message.into(),
            position: 0,
            token_count: 0,
            token: None,
            range: None,
            suggestions: Vec::new(),
            context: BTreeMap::new(),
        }
    }

    pub fn at(mut self, position: usize, token_count: usize) -> Self {
        self.position = position;
        self.token_count = token_count;
        self
    }

    pub fn with_token(mut self, token: impl Into<String>, range: Range) -> Self {
        self.token = Some(token.into());
        self.range = Some(range);
        self
    }

    pub fn with_suggestions(mut self, suggestions: Vec<String>) -> Self {
        self.suggestions = suggestions;
        self.suggestions.truncate(MAX_SUGGESTIONS);
        self
    }

    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }

    /// Plain single-line rendering: severity, kind, message, suggestions
    /// comma-joined.
    pub fn render_plain(&self) -> String {
        let mut line = format!("{} [{}]: {}", self.severity, self.kind, self.message);
        if let Some(token) = &self.token {
            line.push_str(&format!(" ('{}')", token));
        }
        if !self.suggestions.is_empty() {
            line.push_str(&format!(" — try: {}", self.suggestions.join(", ")));
        }
        line
    }

    /// Terminal rendering: coloured header, position row, a token tape with
    /// a cursor under the offending token, and the grammar line when
    /// verbosity >= 2.
    pub fn render_terminal(&self, tokens: &[String], verbosity: u8) -> String {
        let colour = match self.severity {
            Severity::Error => ANSI_RED,
            Severity::Warning => ANSI_YELLOW,
            _ => ANSI_CYAN,
        };

        let mut out = format!(
            "{}{}{}{} [{}]: {}{}\n",
            ANSI_BOLD, colour, self.severity, ANSI_RESET, self.kind, self.message, ANSI_RESET
        );

        if let Some(range) = &self.range {
            out.push_str(&format!(
                "{}  at line {}, character {} (token {}/{}){}\n",
                ANSI_DIM,
                range.start.line,
                range.start.character,
                self.position + 1,
                self.token_count.max(self.position + 1),
                ANSI_RESET
            ));
        }

        if !tokens.is_empty() {
            let mut tape = String::from("  ");
            let mut cursor = String::from("  ");
            for (i, text) in tokens.iter().enumerate() {
                let cell = format!("[{}] ", text);
                let marker = if i == self.position {
                    "^".repeat(cell.len().saturating_sub(1))
                } else {
                    " ".repeat(cell.len())
                };
                tape.push_str(&cell);
                cursor.push_str(&marker);
            }
            out.push_str(&tape);
            out.push('\n');
            out.push_str(&format!("{}{}{}\n", colour, cursor.trim_end(), ANSI_RESET));
        }

        for suggestion in &self.suggestions {
            out.push_str(&format!("  {}hint:{} {}\n", ANSI_CYAN, ANSI_RESET, suggestion));
        }

        if verbosity >= 2 {
            out.push_str(&format!("{}  grammar: {}{}\n", ANSI_DIM, GRAMMAR_LINE, ANSI_RESET));
        }

        out
    }

    /// Convert to the language-agnostic record consumed by editors.
    pub fn to_lsp(&self) -> LspDiagnostic {
        LspDiagnostic {
            range: self.range.unwrap_or_default(),
            severity: self.severity.lsp_code(),
            kind: self.kind,
            message: self.message.clone(),
            suggestions: self.suggestions.clone(),
        }
    }
}

/// Language-server-shaped diagnostic record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LspDiagnostic {
    pub range: Range,
    pub severity: u8,
    pub kind: ErrorKind,
    pub message: String,
    #[serde(default)]
    pub suggestions: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::position::Position;

    fn sample_range() -> Range {
        Range {
            start: Position {
                line: 1,
                character: 6,
                offset: 6,
            },
            end: Position {
                line: 1,
                character: 10,
                offset: 10,
            },
        }
    }

    #[test]
    fn plain_rendering() {
        let diag = Diagnostic::new(ErrorKind::Temporal, Severity::Warning, "bad date")
            .with_token("wednesdy", sample_range())
            .with_suggestions(vec!["2024-01-15".into(), "3 days ago".into()]);

        let line = diag.render_plain();
        assert_eq!(
            line,
            "warning [temporal]: bad date ('wednesdy') — try: 2024-01-15, 3 days ago"
        );
    }

    #[test]
    fn suggestions_capped_at_three() {
        let diag = Diagnostic::new(ErrorKind::Syntax, Severity::Error, "x").with_suggestions(vec![
            "a".into(),
            "b".into(),
            "c".into(),
            "d".into(),
        ]);
        assert_eq!(diag.suggestions.len(), 3);
    }

    #[test]
    fn terminal_rendering_has_cursor_and_grammar() {
        let diag = Diagnostic::new(ErrorKind::Syntax, Severity::Error, "unexpected token")
            .at(1, 3)
            .with_token("of", sample_range());

        let tokens = vec!["ALICE".to_string(), "of".to_string(), "acme".to_string()];
        let out = diag.render_terminal(&tokens, 2);

        assert!(out.contains("[ALICE] [of] [acme]"));
        assert!(out.contains('^'));
        assert!(out.contains("grammar:"));

        let quiet = diag.render_terminal(&tokens, 0);
        assert!(!quiet.contains("grammar:"));
    }

    #[test]
    fn lsp_conversion() {
        let diag = Diagnostic::new(ErrorKind::Semantic, Severity::Warning, "empty segment")
            .with_token("by", sample_range());
        let lsp = diag.to_lsp();
        assert_eq!(lsp.severity, 2);
        assert_eq!(lsp.kind, ErrorKind::Semantic);
        assert_eq!(lsp.range.start.character, 6);
    }
}
