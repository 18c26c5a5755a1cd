//! Tokenizer for the AX/AS surface languages.
//!
//! Input arrives either as a raw query string or as a sequence of arguments
//! (argv style). Both paths produce the same token stream:
//!
//! - A single-quoted span is one verbatim token; `''` yields the empty
//!   string; an unterminated quote consumes to end of input and is accepted
//!   with a warning.
//! - An unquoted multi-word argument is split on whitespace iff its first
//!   word is a grammatical connector, a natural predicate, or a transition
//!   keyword. An `is`/`are` phrase containing a context keyword is kept
//!   whole as a phrase token for the grammar engine to dissect.
//!
//! Every token carries a source range from the position tracker; for argv
//! input, ranges refer to the arguments joined with single spaces.

use crate::diagnostic::{Diagnostic, ErrorKind, Severity};
use crate::parser::keywords::{self, KeywordKind};
use crate::parser::position::{PositionTracker, Range};
use crate::parser::token::Token;

/// Tokenize a raw query string.
pub fn tokenize_str(input: &str) -> (Vec<Token>, Vec<Diagnostic>) {
    let mut tokens = Vec::new();
    let mut warnings = Vec::new();
    let mut tracker = PositionTracker::new();
    let mut chars = input.char_indices().peekable();

    while let Some(&(offset, c)) = chars.peek() {
        if c.is_whitespace() {
            tracker.advance(c);
            chars.next();
            continue;
        }

        if c == '\'' {
            let start = tracker.position();
            tracker.advance(c);
            chars.next();

            let content_start = tracker.position().offset;
            let mut content_end = content_start;
            let mut terminated = false;

            while let Some(&(_, qc)) = chars.peek() {
                tracker.advance(qc);
                chars.next();
                if qc == '\'' {
                    terminated = true;
                    break;
                }
                content_end = tracker.position().offset;
            }

            let end = tracker.position();
            let text = &input[content_start..content_end];
            let range = Range { start, end };
            if !terminated {
                warnings.push(
                    Diagnostic::new(
                        ErrorKind::Syntax,
                        Severity::Warning,
                        "unterminated quote; taking the rest of the input verbatim",
                    )
                    .at(tokens.len(), 0)
                    .with_token(text, range),
                );
            }
            tokens.push(Token::quoted(text, range));
            continue;
        }

        // Bare word: read to the next whitespace or quote
        let start = tracker.position();
        let word_start = offset;
        let mut word_end = offset;
        while let Some(&(i, wc)) = chars.peek() {
            if wc.is_whitespace() || wc == '\'' {
                break;
            }
            tracker.advance(wc);
            chars.next();
            word_end = i + wc.len_utf8();
        }
        let end = tracker.position();
        tokens.push(Token::word(&input[word_start..word_end], Range { start, end }));
    }

    fixup_token_counts(&mut warnings, tokens.len());
    (tokens, warnings)
}

/// Tokenize argv-style arguments.
///
/// `extra_predicates` extends the natural-predicate set; plugins surface
/// their sentence-initial predicates through it.
pub fn tokenize_args(args: &[String], extra_predicates: &[String]) -> (Vec<Token>, Vec<Diagnostic>) {
    let mut tokens = Vec::new();
    let mut warnings = Vec::new();
    let mut tracker = PositionTracker::new();

    for (i, arg) in args.iter().enumerate() {
        if i > 0 {
            tracker.advance(' ');
        }
        tokenize_arg(arg, extra_predicates, &mut tracker, &mut tokens, &mut warnings);
    }

    fixup_token_counts(&mut warnings, tokens.len());
    (tokens, warnings)
}

fn tokenize_arg(
    arg: &str,
    extra_predicates: &[String],
    tracker: &mut PositionTracker,
    tokens: &mut Vec<Token>,
    warnings: &mut Vec<Diagnostic>,
) {
    if let Some(inner) = arg.strip_prefix('\'') {
        let start = tracker.position();
        tracker.advance_str(arg);
        let end = tracker.position();
        let range = Range { start, end };

        let (text, terminated) = match inner.strip_suffix('\'') {
            Some(body) => (body, true),
            // A lone quote opens an empty unterminated literal
            None => (inner, false),
        };
        if !terminated {
            warnings.push(
                Diagnostic::new(
                    ErrorKind::Syntax,
                    Severity::Warning,
                    "unterminated quote; taking the rest of the argument verbatim",
                )
                .at(tokens.len(), 0)
                .with_token(text, range),
            );
        }
        tokens.push(Token::quoted(text, range));
        return;
    }

    if !arg.contains(char::is_whitespace) {
        push_word(arg, tracker, tokens);
        return;
    }

    // Multi-word unquoted argument: eligible for natural-language splitting
    // only when the first word signals sentence structure.
    let words: Vec<&str> = arg.split_whitespace().collect();
    let first = words[0];

    let split = match keywords::classify(first) {
        Some(KeywordKind::Grammatical) => {
            // A connector phrase containing a context keyword is kept whole;
            // the grammar engine extracts predicate and contexts from it.
            if words[1..].iter().any(|w| keywords::is_context_keyword(w)) {
                let start = tracker.position();
                tracker.advance_str(arg);
                let end = tracker.position();
                let token = Token::word(first, Range { start, end })
                    .with_phrase(words[1..].iter().map(|w| w.to_string()).collect());
                tokens.push(token);
                return;
            }
            true
        }
        Some(_) => true,
        None => {
            extra_predicates
                .iter()
                .any(|p| p.eq_ignore_ascii_case(first))
        }
    };

    if split {
        let mut rest = arg;
        loop {
            let trimmed = rest.trim_start();
            let skipped = rest.len() - trimmed.len();
            tracker.advance_str(&rest[..skipped]);
            if trimmed.is_empty() {
                break;
            }
            let word_len = trimmed
                .find(char::is_whitespace)
                .unwrap_or(trimmed.len());
            push_word(&trimmed[..word_len], tracker, tokens);
            rest = &trimmed[word_len..];
        }
    } else {
        // Keep the whole argument as one token
        let start = tracker.position();
        tracker.advance_str(arg);
        let end = tracker.position();
        tokens.push(Token::word(arg, Range { start, end }));
    }
}

fn push_word(word: &str, tracker: &mut PositionTracker, tokens: &mut Vec<Token>) {
    let start = tracker.position();
    tracker.advance_str(word);
    let end = tracker.position();
    tokens.push(Token::word(word, Range { start, end }));
}

/// Warnings are created before the final token count is known.
fn fixup_token_counts(warnings: &mut [Diagnostic], count: usize) {
    for warning in warnings {
        warning.token_count = count;
    }
}
