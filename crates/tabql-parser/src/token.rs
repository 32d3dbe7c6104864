use std::fmt;

use serde::{Deserialize, Serialize};

use crate::span::Span;

/// A single lexical unit after tokenization.
///
/// Keywords and operators are lower-cased during lexing; string literals
/// retain their surrounding quotes; whitespace and line comments never
/// survive into a `Token`.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}

impl Token {
    pub fn new(kind: TokenKind, span: Span) -> Self {
        Token { kind, span }
    }

    /// The text this token was built from. Used by `regex`/`verbatim` at
    /// the grammar level, which re-match against an already-lexed token.
    pub fn text(&self) -> &str {
        match &self.kind {
            TokenKind::Keyword(s) => s,
            TokenKind::Operator(s) => s,
            TokenKind::Name(s) => s,
            TokenKind::Integer(s) => s,
            TokenKind::Float(s) => s,
            TokenKind::String(s) => s,
            TokenKind::QuotedName(s) => s,
        }
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}: {:?}", self.span, self.kind)
    }
}

#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub enum TokenKind {
    /// Lower-cased reserved word, e.g. `select`.
    Keyword(String),
    /// Lower-cased operator or punctuation token, e.g. `>=`, `,`, `(`.
    Operator(String),
    /// A bare identifier, case preserved.
    Name(String),
    /// Integer literal text, preserved verbatim.
    Integer(String),
    /// Float literal text, preserved verbatim.
    Float(String),
    /// A single-quoted string literal, quotes retained.
    String(String),
    /// A double-quoted delimited identifier, quotes stripped — lets a
    /// reserved word be used as a column or table name.
    QuotedName(String),
}

impl fmt::Debug for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::Keyword(s) => write!(f, "keyword {s}"),
            TokenKind::Operator(s) => write!(f, "operator {s}"),
            TokenKind::Name(s) => write!(f, "name {s}"),
            TokenKind::Integer(s) => write!(f, "integer {s}"),
            TokenKind::Float(s) => write!(f, "float {s}"),
            TokenKind::String(s) => write!(f, "string {s}"),
            TokenKind::QuotedName(s) => write!(f, "quoted name {s}"),
        }
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::Keyword(s) | TokenKind::Operator(s) | TokenKind::Name(s) => write!(f, "{s}"),
            TokenKind::Integer(s) | TokenKind::Float(s) => write!(f, "{s}"),
            TokenKind::String(s) => write!(f, "{s}"),
            TokenKind::QuotedName(s) => write!(f, "{s}"),
        }
    }
}
