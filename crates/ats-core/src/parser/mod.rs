//! AX/AS grammar engine.
//!
//! A state machine over tokens with segments
//! `Subjects → Predicates → Contexts → Actors → Temporal → So`. Keyword
//! tokens drive transitions; regular tokens accumulate into a buffer that is
//! committed on each transition. The parser is best-effort: recoverable
//! problems (bad temporal expressions, empty segments, repeated keywords)
//! become warnings on the returned value, and only unrecoverable failures
//! abort with a [`ParseError`].
//!
//! # Grammar
//!
//! ```text
//! query ::= [subjects] [("is"|"are") predicates] [("of"|"from") contexts]
//!           [("by"|"via") actors] [temporal] [("so"|"therefore") actions]
//! temporal ::= ("since"|"until"|"on") TIME
//!            | "between" TIME "and" TIME
//!            | "over" NUM UNIT
//! ```

pub mod keywords;
pub mod lexer;
pub mod position;
pub mod token;

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::attestation::{AsCommand, AxFilter, OverComparison};
use crate::diagnostic::{Diagnostic, ErrorKind, Severity};
use crate::parser::keywords::KeywordKind;
use crate::parser::token::{SemanticTokenType, Token};
use crate::resolve::{ActorDetector, QueryExpander, SystemActorDetector};
use crate::temporal::{self, TemporalError, TimeSpec};

/// Grammar segments, in sentence order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Segment {
    Subjects,
    Predicates,
    Contexts,
    Actors,
    Temporal,
    So,
}

/// A successful parse plus any accumulated warnings.
#[derive(Debug, Clone)]
pub struct Parsed<T> {
    pub value: T,
    pub warnings: Vec<Diagnostic>,
}

/// Unrecoverable parse failure.
#[derive(Debug, Clone, Error, PartialEq)]
#[error("{}", .diagnostic.render_plain())]
pub struct ParseError {
    pub diagnostic: Diagnostic,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Query,
    Assert,
}

static DEFAULT_DETECTOR: SystemActorDetector = SystemActorDetector;

/// Entry point for parsing AX queries and AS assertions.
///
/// Construction is cheap; a parser is immutable and may be shared across
/// threads. `now` is injectable for deterministic temporal resolution.
pub struct Parser<'a> {
    now: DateTime<Utc>,
    extra_predicates: Vec<String>,
    actor_detector: &'a dyn ActorDetector,
}

impl Default for Parser<'static> {
    fn default() -> Self {
        Self::new()
    }
}

impl Parser<'static> {
    pub fn new() -> Self {
        Self {
            now: Utc::now(),
            extra_predicates: Vec::new(),
            actor_detector: &DEFAULT_DETECTOR,
        }
    }
}

impl<'a> Parser<'a> {
    pub fn with_now(mut self, now: DateTime<Utc>) -> Self {
        self.now = now;
        self
    }

    /// Adopt the expander's sentence-initial predicates.
    pub fn with_expander(mut self, expander: &dyn QueryExpander) -> Self {
        self.extra_predicates = expander.natural_language_predicates();
        self
    }

    pub fn with_actor_detector<'b>(self, detector: &'b dyn ActorDetector) -> Parser<'b> {
        Parser {
            now: self.now,
            extra_predicates: self.extra_predicates,
            actor_detector: detector,
        }
    }

    /// Parse argv-style arguments into a query filter.
    pub fn parse_query(&self, args: &[String]) -> Result<Parsed<AxFilter>, ParseError> {
        let (tokens, warnings) = lexer::tokenize_args(args, &self.extra_predicates);
        self.run_query(tokens, warnings)
    }

    /// Parse a raw query string into a query filter.
    pub fn parse_query_str(&self, input: &str) -> Result<Parsed<AxFilter>, ParseError> {
        let (tokens, warnings) = lexer::tokenize_str(input);
        self.run_query(tokens, warnings)
    }

    /// Parse argv-style arguments into an assertion command.
    pub fn parse_command(&self, args: &[String]) -> Result<Parsed<AsCommand>, ParseError> {
        let (tokens, warnings) = lexer::tokenize_args(args, &self.extra_predicates);
        self.run_command(tokens, warnings)
    }

    /// Parse a raw assertion string into an assertion command.
    pub fn parse_command_str(&self, input: &str) -> Result<Parsed<AsCommand>, ParseError> {
        let (tokens, warnings) = lexer::tokenize_str(input);
        self.run_command(tokens, warnings)
    }

    fn run_query(
        &self,
        tokens: Vec<Token>,
        mut warnings: Vec<Diagnostic>,
    ) -> Result<Parsed<AxFilter>, ParseError> {
        let mut engine = Engine::new(&tokens, Mode::Query, self.now, &self.extra_predicates);
        engine.run()?;
        warnings.append(&mut engine.warnings);

        let filter = AxFilter {
            subjects: engine.subjects,
            predicates: engine.predicates,
            contexts: engine.contexts,
            actors: engine.actors,
            time_start: engine.time_start,
            time_end: engine.time_end,
            over_comparison: engine.over,
            so_actions: engine.so_actions,
            ..Default::default()
        };

        if filter.is_unconstrained() {
            warnings.push(Diagnostic::new(
                ErrorKind::Semantic,
                Severity::Warning,
                "empty query may return a large result set",
            ));
        }

        Ok(Parsed {
            value: filter,
            warnings,
        })
    }

    fn run_command(
        &self,
        tokens: Vec<Token>,
        mut warnings: Vec<Diagnostic>,
    ) -> Result<Parsed<AsCommand>, ParseError> {
        let mut engine = Engine::new(&tokens, Mode::Assert, self.now, &self.extra_predicates);
        engine.run()?;
        warnings.append(&mut engine.warnings);

        let mut subjects = engine.subjects;
        let mut predicates = engine.predicates;
        let mut contexts = engine.contexts;
        let mut actors = engine.actors;

        // Three-subject inference: "NAME PREDICATE CONTEXT"
        if subjects.len() == 3 && predicates.is_empty() && contexts.is_empty() {
            let context = subjects.pop().unwrap_or_default();
            let predicate = subjects.pop().unwrap_or_default();
            predicates.push(predicate.to_lowercase());
            contexts.push(context);
        }

        if subjects.is_empty() {
            return Err(ParseError {
                diagnostic: Diagnostic::new(
                    ErrorKind::Syntax,
                    Severity::Error,
                    "empty assertion: at least one subject is required",
                )
                .with_suggestions(vec![
                    "ALICE is employee of acme".to_string(),
                    "'John Doe' works_at ACME".to_string(),
                ]),
            });
        }

        if actors.is_empty() {
            actors.push(self.actor_detector.system_actor());
        }
        if let Some(llm) = self.actor_detector.llm_actor() {
            if !actors.contains(&llm) {
                actors.push(llm);
            }
        }

        Ok(Parsed {
            value: AsCommand {
                subjects,
                predicates,
                contexts,
                actors,
                timestamp: engine.explicit_timestamp,
                attributes: Default::default(),
            },
            warnings,
        })
    }
}

/// Classify a token for editor highlighting, given the segment the parser
/// attributed it to.
pub fn semantic_token_type(token: &Token, segment: Segment) -> SemanticTokenType {
    if token.quoted {
        return SemanticTokenType::String;
    }
    let text = token.text.as_str();
    if text.is_empty() {
        return SemanticTokenType::Unknown;
    }
    if text.starts_with("http://") || text.starts_with("https://") {
        return SemanticTokenType::Url;
    }
    if text.chars().all(|c| !c.is_alphanumeric()) {
        return SemanticTokenType::Symbol;
    }
    if keywords::is_keyword(text) {
        return SemanticTokenType::Keyword;
    }
    match segment {
        Segment::Subjects => SemanticTokenType::Subject,
        Segment::Predicates => SemanticTokenType::Predicate,
        Segment::Contexts => SemanticTokenType::Context,
        Segment::Actors => SemanticTokenType::Actor,
        Segment::Temporal => SemanticTokenType::Temporal,
        Segment::So => SemanticTokenType::Command,
    }
}

/// Words the temporal lookahead recognises besides digit-bearing tokens.
const TEMPORAL_WORDS: &[&str] = &[
    "now", "today", "yesterday", "tomorrow", "last", "next", "this", "ago", "in", "week", "weeks",
    "month", "months", "year", "years", "day", "days", "hour", "hours", "hr", "hrs", "minute",
    "minutes", "min", "mins", "second", "seconds", "sec", "secs", "monday", "mon", "tuesday",
    "tue", "wednesday", "wed", "thursday", "thu", "friday", "fri", "saturday", "sat", "sunday",
    "sun",
];

/// Heuristic for the temporal lookahead: digit-bearing tokens are
/// date-shaped, otherwise the word must belong to the temporal vocabulary.
pub fn looks_temporal(word: &str) -> bool {
    if word.chars().any(|c| c.is_ascii_digit()) {
        return true;
    }
    let lower = word.to_ascii_lowercase();
    TEMPORAL_WORDS.contains(&lower.as_str())
}

struct Engine<'t> {
    tokens: &'t [Token],
    idx: usize,
    segment: Segment,
    buffer: Vec<String>,
    /// Keyword that opened the current segment, its token index, and the
    /// target length at open time, for empty-segment warnings
    opened_by: Option<(String, usize, usize)>,
    mode: Mode,
    now: DateTime<Utc>,
    extra_predicates: &'t [String],

    subjects: Vec<String>,
    predicates: Vec<String>,
    contexts: Vec<String>,
    actors: Vec<String>,
    so_actions: Vec<String>,
    time_start: Option<i64>,
    time_end: Option<i64>,
    over: Option<OverComparison>,
    explicit_timestamp: Option<i64>,

    warnings: Vec<Diagnostic>,
}

impl<'t> Engine<'t> {
    fn new(
        tokens: &'t [Token],
        mode: Mode,
        now: DateTime<Utc>,
        extra_predicates: &'t [String],
    ) -> Self {
        Self {
            tokens,
            idx: 0,
            segment: Segment::Subjects,
            buffer: Vec::new(),
            opened_by: None,
            mode,
            now,
            extra_predicates,
            subjects: Vec::new(),
            predicates: Vec::new(),
            contexts: Vec::new(),
            actors: Vec::new(),
            so_actions: Vec::new(),
            time_start: None,
            time_end: None,
            over: None,
            explicit_timestamp: None,
            warnings: Vec::new(),
        }
    }

    fn run(&mut self) -> Result<(), ParseError> {
        while self.idx < self.tokens.len() {
            let token = self.tokens[self.idx].clone();

            if token.quoted {
                self.buffer.push(token.text);
                self.idx += 1;
                continue;
            }

            match keywords::classify(&token.text) {
                Some(KeywordKind::Grammatical) => self.on_connector(),
                Some(KeywordKind::ContextTransit) => self.on_transition(Segment::Contexts),
                Some(KeywordKind::ActorTransit) => self.on_transition(Segment::Actors),
                Some(KeywordKind::SoAction) => self.on_transition(Segment::So),
                Some(KeywordKind::Temporal) => self.on_temporal()?,
                Some(KeywordKind::NaturalPredicate) => self.on_natural_predicate(),
                None => {
                    if self.is_extra_predicate(&token.text) && self.segment == Segment::Subjects {
                        self.on_natural_predicate();
                    } else {
                        self.buffer.push(token.text.clone());
                        self.idx += 1;
                    }
                }
            }
        }

        self.commit_buffer();
        self.check_empty_segment();
        Ok(())
    }

    fn is_extra_predicate(&self, word: &str) -> bool {
        self.extra_predicates
            .iter()
            .any(|p| p.eq_ignore_ascii_case(word))
    }

    fn current_token(&self) -> &Token {
        &self.tokens[self.idx]
    }

    /// Apply the commit case rule for a segment. Query filters normalise
    /// contexts and actors to lowercase; assertions keep them as written.
    fn apply_case(&self, segment: Segment, text: &str) -> String {
        match segment {
            Segment::Subjects => text.to_uppercase(),
            Segment::Contexts | Segment::Actors => {
                if self.mode == Mode::Query {
                    text.to_lowercase()
                } else {
                    text.to_string()
                }
            }
            _ => text.to_string(),
        }
    }

    /// Move the buffered tokens into the current segment's output.
    /// Returns the number of committed tokens.
    fn commit_buffer(&mut self) -> usize {
        let segment = self.segment;
        let taken = std::mem::take(&mut self.buffer);
        let committed = taken.len();
        let items: Vec<String> = taken
            .into_iter()
            .map(|text| self.apply_case(segment, &text))
            .collect();
        let target = match segment {
            Segment::Subjects => &mut self.subjects,
            Segment::Predicates => &mut self.predicates,
            Segment::Contexts => &mut self.contexts,
            Segment::Actors => &mut self.actors,
            Segment::So | Segment::Temporal => &mut self.so_actions,
        };
        target.extend(items);
        committed
    }

    fn segment_len(&self, segment: Segment) -> usize {
        match segment {
            Segment::Subjects => self.subjects.len(),
            Segment::Predicates => self.predicates.len(),
            Segment::Contexts => self.contexts.len(),
            Segment::Actors => self.actors.len(),
            Segment::So | Segment::Temporal => self.so_actions.len(),
        }
    }

    /// Warn when a keyword opened a segment that received no tokens.
    fn check_empty_segment(&mut self) {
        if let Some((keyword, at, len_at_open)) = self.opened_by.take() {
            let empty = self.segment_len(self.segment) == len_at_open;
            if empty {
                self.warnings.push(
                    Diagnostic::new(
                        ErrorKind::Semantic,
                        Severity::Warning,
                        format!("empty segment after '{}'", keyword),
                    )
                    .at(at, self.tokens.len()),
                );
            }
        }
    }

    fn on_transition(&mut self, next: Segment) {
        let token = self.current_token().clone();
        self.commit_buffer();

        if self.segment == next {
            self.warnings.push(
                Diagnostic::new(
                    ErrorKind::Semantic,
                    Severity::Warning,
                    format!("repeated keyword '{}'", token.text),
                )
                .at(self.idx, self.tokens.len())
                .with_token(token.text.clone(), token.range),
            );
            self.idx += 1;
            return;
        }

        self.check_empty_segment();
        self.segment = next;
        self.opened_by = Some((token.text.to_lowercase(), self.idx, self.segment_len(next)));
        self.idx += 1;
    }

    fn on_connector(&mut self) {
        let token = self.current_token().clone();
        self.commit_buffer();
        self.check_empty_segment();

        if token.has_phrase() {
            // Kept-whole phrase: extract the predicate and any trailing
            // contexts, then continue collecting contexts.
            self.extract_phrase(&token.phrase);
            self.segment = Segment::Contexts;
            self.opened_by = None;
        } else {
            self.segment = Segment::Predicates;
            self.opened_by = Some((
                token.text.to_lowercase(),
                self.idx,
                self.predicates.len(),
            ));
        }
        self.idx += 1;
    }

    /// Dissect a kept-whole connector phrase: words up to the first context
    /// keyword form the predicate, words after it are contexts. Predicate
    /// phrases of two or three words stay a single predicate; complex
    /// titles of four or more words split into individual predicates.
    fn extract_phrase(&mut self, words: &[String]) {
        let boundary = words.iter().position(|w| keywords::is_context_keyword(w));
        let (pred_words, ctx_words) = match boundary {
            Some(i) => (&words[..i], &words[i + 1..]),
            None => (words, &[] as &[String]),
        };

        match pred_words.len() {
            0 => {}
            1 => self.predicates.push(pred_words[0].clone()),
            2 | 3 => self.predicates.push(pred_words.join(" ")),
            _ => self.predicates.extend(pred_words.iter().cloned()),
        }

        for word in ctx_words {
            let value = self.apply_case(Segment::Contexts, word);
            self.contexts.push(value);
        }
    }

    fn on_natural_predicate(&mut self) {
        let token = self.current_token().clone();
        if self.segment == Segment::Subjects {
            self.commit_buffer();
            self.segment = Segment::Predicates;
            self.opened_by = None;
        }
        self.buffer.push(token.text);
        self.idx += 1;
    }

    fn on_temporal(&mut self) -> Result<(), ParseError> {
        let keyword_token = self.current_token().clone();
        let keyword = keyword_token.text.to_lowercase();
        let keyword_at = self.idx;
        self.commit_buffer();
        self.check_empty_segment();
        self.idx += 1;

        let collected = self.collect_temporal_tokens(&keyword);

        if collected.is_empty() {
            self.warnings.push(
                Diagnostic::new(
                    ErrorKind::Temporal,
                    Severity::Warning,
                    format!("missing date or duration after '{}'", keyword),
                )
                .at(keyword_at, self.tokens.len())
                .with_token(keyword_token.text.clone(), keyword_token.range)
                .with_suggestions(TemporalError::suggestions()),
            );
            return Ok(());
        }

        match keyword.as_str() {
            "since" => {
                if let Some(spec) = self.resolve_when(&collected.join(" "), keyword_at) {
                    self.time_start = Some(spec.instant());
                }
            }
            "until" => {
                if let Some(spec) = self.resolve_when(&collected.join(" "), keyword_at) {
                    self.time_end = Some(spec.instant());
                }
            }
            "on" => {
                if let Some(spec) = self.resolve_when(&collected.join(" "), keyword_at) {
                    if self.mode == Mode::Assert {
                        self.explicit_timestamp = Some(spec.instant());
                    } else if let TimeSpec::Range { start, end } = spec.into_day_range() {
                        self.time_start = Some(start);
                        self.time_end = Some(end);
                    }
                }
            }
            "between" => {
                let and_at = collected.iter().position(|w| w.eq_ignore_ascii_case("and"));
                let Some(split) = and_at.filter(|i| *i > 0 && *i < collected.len() - 1) else {
                    return Err(ParseError {
                        diagnostic: Diagnostic::new(
                            ErrorKind::Syntax,
                            Severity::Error,
                            "'between' requires two dates joined by 'and'",
                        )
                        .at(keyword_at, self.tokens.len())
                        .with_token(keyword_token.text, keyword_token.range)
                        .with_suggestions(vec![
                            "between 2024-01-01 and 2024-12-31".to_string(),
                        ]),
                    });
                };
                if let Some(spec) = self.resolve_when(&collected[..split].join(" "), keyword_at) {
                    self.time_start = Some(spec.instant());
                }
                if let Some(spec) =
                    self.resolve_when(&collected[split + 1..].join(" "), keyword_at)
                {
                    self.time_end = Some(spec.instant());
                }
            }
            "over" => {
                let expr = collected.join(" ");
                match OverComparison::parse(&expr) {
                    Some(over) => self.over = Some(over),
                    None => self.warnings.push(
                        Diagnostic::new(
                            ErrorKind::Syntax,
                            Severity::Warning,
                            format!("malformed over-expression '{}'", expr),
                        )
                        .at(keyword_at, self.tokens.len())
                        .with_suggestions(vec!["over 5y".to_string(), "over 18m".to_string()]),
                    ),
                }
            }
            _ => {}
        }

        Ok(())
    }

    /// Consume contiguous temporal-looking tokens following a temporal
    /// keyword: numbers, date-shaped tokens, recognised day and unit words,
    /// and the `and` joining a `between` pair. Stops at the next keyword or
    /// end of input.
    fn collect_temporal_tokens(&mut self, keyword: &str) -> Vec<String> {
        let mut collected = Vec::new();
        let mut seen_and = false;

        while self.idx < self.tokens.len() {
            let token = &self.tokens[self.idx];
            let text = token.text.clone();

            if !token.quoted && keywords::is_keyword(&text) {
                break;
            }

            let is_between_and =
                keyword == "between" && !seen_and && text.eq_ignore_ascii_case("and");

            if is_between_and || looks_temporal(&text) {
                seen_and = seen_and || is_between_and;
                collected.push(text);
                self.idx += 1;
            } else {
                break;
            }
        }

        collected
    }

    /// Parse a temporal expression, degrading failures to warnings.
    fn resolve_when(&mut self, expr: &str, at: usize) -> Option<TimeSpec> {
        match temporal::parse_when(expr, self.now) {
            Ok(spec) => Some(spec),
            Err(err) => {
                self.warnings.push(
                    Diagnostic::new(ErrorKind::Temporal, Severity::Warning, err.to_string())
                        .at(at, self.tokens.len())
                        .with_suggestions(TemporalError::suggestions()),
                );
                None
            }
        }
    }
}
