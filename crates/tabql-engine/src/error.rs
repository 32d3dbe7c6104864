//! Planning and backend errors, shaped the same way as
//! [`tabql_parser::error::Error`]: a `kind` + `span` + `reason` + `hints`,
//! so a host surfacing both crates' errors can handle them uniformly.

use std::fmt;

use tabql_parser::span::Span;

#[derive(Debug, Clone)]
pub struct Error {
    pub kind: ErrorKind,
    pub span: Option<Span>,
    pub reason: Reason,
    pub hints: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// A parser error, passed through unchanged.
    Parse,
    /// Unknown table/column, ambiguous reference, or an unsupported
    /// expression shape (indirect aggregation, indirect group-by, unknown
    /// set function).
    Plan,
    /// Raised by a [`crate::backend::Table`] operation and propagated as-is.
    Backend,
}

#[derive(Debug, Clone)]
pub enum Reason {
    Simple(String),
    Bug { details: String },
}

impl Error {
    pub fn parse(err: tabql_parser::error::Error) -> Self {
        Error {
            kind: ErrorKind::Parse,
            span: err.span,
            reason: Reason::Simple(err.to_string()),
            hints: Vec::new(),
        }
    }

    pub fn plan(message: impl Into<String>) -> Self {
        Error {
            kind: ErrorKind::Plan,
            span: None,
            reason: Reason::Simple(message.into()),
            hints: Vec::new(),
        }
    }

    pub fn backend(message: impl Into<String>) -> Self {
        Error {
            kind: ErrorKind::Backend,
            span: None,
            reason: Reason::Simple(message.into()),
            hints: Vec::new(),
        }
    }

    pub fn new_bug(details: impl Into<String>) -> Self {
        Error {
            kind: ErrorKind::Plan,
            span: None,
            reason: Reason::Bug {
                details: details.into(),
            },
            hints: Vec::new(),
        }
    }
}

/// Mirrors `tabql_parser::error`'s builder style for attaching context to an
/// error as it unwinds through the planner/executor. Plan/backend errors have
/// no token to point at, so `with_span`/`with_span_fallback` mostly matter
/// for `Parse` errors passed through from `tabql-parser`.
pub trait WithErrorInfo: Sized {
    fn with_span(self, span: Option<Span>) -> Self;
    fn with_span_fallback(self, span: Option<Span>) -> Self;
    fn push_hint(self, hint: impl Into<String>) -> Self;
}

impl WithErrorInfo for Error {
    fn with_span(mut self, span: Option<Span>) -> Self {
        self.span = span;
        self
    }

    fn with_span_fallback(mut self, span: Option<Span>) -> Self {
        if self.span.is_none() {
            self.span = span;
        }
        self
    }

    fn push_hint(mut self, hint: impl Into<String>) -> Self {
        self.hints.push(hint.into());
        self
    }
}

impl<T> WithErrorInfo for Result<T, Error> {
    fn with_span(self, span: Option<Span>) -> Self {
        self.map_err(|e| e.with_span(span))
    }

    fn with_span_fallback(self, span: Option<Span>) -> Self {
        self.map_err(|e| e.with_span_fallback(span))
    }

    fn push_hint(self, hint: impl Into<String>) -> Self {
        self.map_err(|e| e.push_hint(hint))
    }
}

impl From<tabql_parser::error::Error> for Error {
    fn from(err: tabql_parser::error::Error) -> Self {
        Error::parse(err)
    }
}

impl fmt::Display for Reason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reason::Simple(s) => f.write_str(s),
            Reason::Bug { details } => write!(f, "internal engine error: {details}"),
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.reason)?;
        for hint in &self.hints {
            write!(f, "\nhint: {hint}")?;
        }
        Ok(())
    }
}

impl std::error::Error for Error {}
