//! Token model for the AX/AS surface languages.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::parser::position::Range;

/// A single token with its source range.
///
/// Quoted tokens carry their contents verbatim and never match keywords.
/// A kept-whole connector phrase ("is senior engineer at acme") is a single
/// token whose `text` is the connector and whose `phrase` holds the
/// embedded words for later extraction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    pub text: String,
    pub quoted: bool,
    pub range: Range,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub phrase: Vec<String>,
}

impl Token {
    pub fn word(text: impl Into<String>, range: Range) -> Self {
        Self {
            text: text.into(),
            quoted: false,
            range,
            phrase: Vec::new(),
        }
    }

    pub fn quoted(text: impl Into<String>, range: Range) -> Self {
        Self {
            text: text.into(),
            quoted: true,
            range,
            phrase: Vec::new(),
        }
    }

    pub fn with_phrase(mut self, phrase: Vec<String>) -> Self {
        self.phrase = phrase;
        self
    }

    /// True when this token carries embedded phrase words.
    pub fn has_phrase(&self) -> bool {
        !self.phrase.is_empty()
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.quoted {
            write!(f, "'{}'", self.text)
        } else {
            write!(f, "{}", self.text)
        }
    }
}

/// Semantic token classification for editor integration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SemanticTokenType {
    Command,
    Keyword,
    Subject,
    Predicate,
    Context,
    Actor,
    Temporal,
    Symbol,
    String,
    Url,
    Unknown,
}

impl fmt::Display for SemanticTokenType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SemanticTokenType::Command => "command",
            SemanticTokenType::Keyword => "keyword",
            SemanticTokenType::Subject => "subject",
            SemanticTokenType::Predicate => "predicate",
            SemanticTokenType::Context => "context",
            SemanticTokenType::Actor => "actor",
            SemanticTokenType::Temporal => "temporal",
            SemanticTokenType::Symbol => "symbol",
            SemanticTokenType::String => "string",
            SemanticTokenType::Url => "url",
            SemanticTokenType::Unknown => "unknown",
        };
        write!(f, "{}", s)
    }
}
