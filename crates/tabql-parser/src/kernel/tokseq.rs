use std::rc::Rc;

use super::strmatch::StrMatcher;
use super::{engine, BoxParser, Match, Reason};
use crate::token::{Token, TokenKind};

/// Lifts a raw-string matcher so it works against a token list: it takes
/// the first token and requires `matcher` to match its *entire* text (not
/// just a prefix — tokens are atomic once lexed).
pub fn one<'a>(where_: &'static str, matcher: StrMatcher) -> BoxParser<&'a [Token]> {
    Rc::new(move |input: &'a [Token]| match input.split_first() {
        Some((tok, rest)) => match matcher(tok.text()) {
            Some((text, n)) if n == tok.text().len() => {
                (Some(vec![Match::Text(text)]), rest, Reason::success(where_, 1))
            }
            _ => (
                None,
                input,
                Reason::failure(where_, format!("expected {where_}, found {}", tok.text()), 0),
            ),
        },
        None => (
            None,
            input,
            Reason::failure(where_, format!("expected {where_}, found end of input"), 0),
        ),
    })
}

/// Consumes one token iff `pred` is truthy for its text.
pub fn pred<'a>(
    where_: &'static str,
    pred: impl Fn(&str) -> bool + 'static,
) -> BoxParser<&'a [Token]> {
    Rc::new(move |input: &'a [Token]| match input.split_first() {
        Some((tok, rest)) if pred(tok.text()) => (
            Some(vec![Match::Text(tok.text().to_string())]),
            rest,
            Reason::success(where_, 1),
        ),
        Some((tok, _)) => (
            None,
            input,
            Reason::failure(where_, format!("unexpected {}", tok.text()), 0),
        ),
        None => (
            None,
            input,
            Reason::failure(where_, "unexpected end of input", 0),
        ),
    })
}

/// `verbatim_token('select', 'from', ...)`: matches one token whose text is
/// exactly one of `words`.
pub fn verbatim_token<'a>(words: &[&str]) -> BoxParser<&'a [Token]> {
    one("verbatim", super::strmatch::verbatim(words))
}

/// `regex_token(pattern)`: matches one token whose entire text matches
/// `pattern`.
pub fn regex_token<'a>(pattern: &str) -> BoxParser<&'a [Token]> {
    one("regex", super::strmatch::regex(pattern))
}

/// Matches and discards one token equal to any of `words` — shorthand for
/// punctuation/keywords that carry no information once matched (`svtok` in
/// the original grammar).
pub fn silent_token<'a>(words: &[&str]) -> BoxParser<&'a [Token]> {
    engine::ignore(verbatim_token(words))
}

/// Consumes one token iff `pred` is truthy for its classified [`TokenKind`]
/// rather than its raw text — the grammar-level counterpart of the
/// tokenizer's text-level primitives, used wherever a rule cares about a
/// token's lexical class (is this a name? a quoted identifier? a numeric
/// literal?) rather than its exact spelling.
pub fn kind<'a>(
    where_: &'static str,
    pred: impl Fn(&TokenKind) -> bool + 'static,
) -> BoxParser<&'a [Token]> {
    Rc::new(move |input: &'a [Token]| match input.split_first() {
        Some((tok, rest)) if pred(&tok.kind) => (
            Some(vec![Match::Text(tok.text().to_string())]),
            rest,
            Reason::success(where_, 1),
        ),
        Some((tok, _)) => (
            None,
            input,
            Reason::failure(where_, format!("unexpected {}", tok.text()), 0),
        ),
        None => (
            None,
            input,
            Reason::failure(where_, "unexpected end of input", 0),
        ),
    })
}
