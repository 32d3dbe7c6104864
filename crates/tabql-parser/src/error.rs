//! Lexical and syntactic errors, shaped like `prqlc_parser::error`: a
//! `kind` + `span` + `reason` + `hints`, rather than a `thiserror` enum,
//! since the reason text is built dynamically out of the kernel's
//! [`crate::kernel::Reason`] trace rather than known statically at each
//! call site.

use std::fmt;

use crate::span::Span;

#[derive(Debug, Clone)]
pub struct Error {
    pub kind: ErrorKind,
    pub span: Option<Span>,
    pub reason: Reason,
    pub hints: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Lexical,
    Syntactic,
}

#[derive(Debug, Clone)]
pub enum Reason {
    Simple(String),
    /// Exhausted input with residual tokens left over, carrying the
    /// deepest-progress alternative trace from `any`.
    ResidualTokens { residual: String, trace: String },
    Bug { details: String },
}

impl Error {
    pub fn lexical(residual: impl Into<String>) -> Self {
        Error {
            kind: ErrorKind::Lexical,
            span: None,
            reason: Reason::Simple(format!("unrecognized input: {}", residual.into())),
            hints: Vec::new(),
        }
    }

    pub fn syntactic(residual: impl Into<String>, trace: impl Into<String>) -> Self {
        Error {
            kind: ErrorKind::Syntactic,
            span: None,
            reason: Reason::ResidualTokens {
                residual: residual.into(),
                trace: trace.into(),
            },
            hints: Vec::new(),
        }
    }

    pub fn new_bug(details: impl Into<String>) -> Self {
        Error {
            kind: ErrorKind::Syntactic,
            span: None,
            reason: Reason::Bug {
                details: details.into(),
            },
            hints: Vec::new(),
        }
    }
}

/// Builder-style context attachment, shared in shape with
/// `tabql_engine::error::WithErrorInfo`.
pub trait WithErrorInfo: Sized {
    fn with_span(self, span: Option<Span>) -> Self;
    /// Attaches `span` only if no span is already set, for call sites
    /// further from the original failure that shouldn't overwrite a more
    /// precise one set closer to it.
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

impl fmt::Display for Reason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reason::Simple(s) => f.write_str(s),
            Reason::ResidualTokens { residual, trace } => {
                write!(f, "extra tokens: {residual}\n{trace}")
            }
            Reason::Bug { details } => write!(f, "internal parser error: {details}"),
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
