use std::rc::Rc;

use once_cell::sync::Lazy;
use regex::Regex;

use super::{BoxParser, Match, Reason};

/// A matcher against the *front* of a string: it either matches a prefix
/// (returning the matched text and how many bytes it consumed) or fails
/// without consuming anything. This is the raw primitive both `regex` and
/// `verbatim` compile down to; [`lift`] adapts one into a full
/// text-layer parser for use by the tokenizer's `repeat(any(...))`.
pub type StrMatcher = Rc<dyn Fn(&str) -> Option<(String, usize)>>;

/// Matches a prefix of the input against `pattern` (anchored at the
/// start). Used by the tokenizer for floats, integers, and names, and by
/// the grammar (via [`crate::kernel::one_regex`]) to re-match a single
/// token's full text.
pub fn regex(pattern: &str) -> StrMatcher {
    let anchored = format!("^(?:{pattern})");
    let re = Regex::new(&anchored).expect("invalid regex pattern in grammar");
    Rc::new(move |s: &str| re.find(s).map(|m| (m.as_str().to_string(), m.end())))
}

/// Matches any one of `words` as a literal prefix, preferring the longest
/// match (so `<=` is matched before `<` when both are in the operator
/// set).
pub fn verbatim(words: &[&str]) -> StrMatcher {
    let mut words: Vec<String> = words.iter().map(|w| w.to_string()).collect();
    words.sort_by_key(|w| std::cmp::Reverse(w.len()));
    Rc::new(move |s: &str| {
        words
            .iter()
            .find(|w| s.starts_with(w.as_str()))
            .map(|w| (w.clone(), w.len()))
    })
}

/// Like [`verbatim`], but applies `f` to the consumed text before it is
/// emitted — used to lower-case keywords and operators during tokenization.
pub fn map_verbatim(f: fn(&str) -> String, words: &[&str]) -> StrMatcher {
    let inner = verbatim(words);
    Rc::new(move |s: &str| inner(s).map(|(matched, n)| (f(&matched), n)))
}

/// Matches a raw quoted run `quote ... quote`, doubled-quote escaping a
/// literal quote character, and returns the matched text *with* the quotes.
pub fn string(quote: char) -> StrMatcher {
    Rc::new(move |s: &str| {
        let mut chars = s.char_indices();
        let (_, first) = chars.next()?;
        if first != quote {
            return None;
        }
        let mut end = None;
        while let Some((i, c)) = chars.next() {
            if c == quote {
                // A doubled quote is an escaped literal quote; skip past it.
                let mut lookahead = chars.clone();
                if lookahead.next().map(|(_, c2)| c2) == Some(quote) {
                    chars.next();
                    continue;
                }
                end = Some(i + c.len_utf8());
                break;
            }
        }
        end.map(|end| (s[..end].to_string(), end))
    })
}

/// Adapts a [`StrMatcher`] into a full text-layer parser: success emits a
/// single [`Match::Text`], failure rewinds (trivially, since `StrMatcher`
/// never partially consumes).
pub fn lift<'a>(where_: &'static str, matcher: StrMatcher) -> BoxParser<&'a str> {
    Rc::new(move |input: &'a str| match matcher(input) {
        Some((text, n)) => (
            Some(vec![Match::Text(text)]),
            &input[n..],
            Reason::success(where_, n),
        ),
        None => (
            None,
            input,
            Reason::failure(where_, format!("expected {where_}"), 0),
        ),
    })
}

// Cached with `once_cell::sync::Lazy` rather than compiled fresh: `tokenize`
// rebuilds its branch list on every call (there is no cached "compiled
// grammar" object), so these fixed patterns would otherwise re-run regex
// compilation on every parse.
pub fn float_matcher() -> StrMatcher {
    static RE: Lazy<Regex> = Lazy::new(|| {
        Regex::new(r"^(?:\d+\.\d*(e[+-]?\d+)?|\.\d+(e[+-]?\d+)?|\d+e[+-]?\d+)").unwrap()
    });
    Rc::new(|s: &str| RE.find(s).map(|m| (m.as_str().to_string(), m.end())))
}

pub fn integer_matcher() -> StrMatcher {
    static RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(?:\d+)").unwrap());
    Rc::new(|s: &str| RE.find(s).map(|m| (m.as_str().to_string(), m.end())))
}

/// Letters, underscore, CJK ideographs, or digits/underscore thereafter.
pub fn name_matcher() -> StrMatcher {
    static RE: Lazy<Regex> = Lazy::new(|| {
        Regex::new(r"^(?:[A-Za-z_\u{4e00}-\u{9fa5}][A-Za-z0-9_\u{4e00}-\u{9fa5}]*)").unwrap()
    });
    Rc::new(|s: &str| RE.find(s).map(|m| (m.as_str().to_string(), m.end())))
}

pub fn whitespace_matcher() -> StrMatcher {
    static RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(?:\s+)").unwrap());
    Rc::new(|s: &str| RE.find(s).map(|m| (m.as_str().to_string(), m.end())))
}

pub fn line_comment_matcher() -> StrMatcher {
    static RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(?:--[^\n]*)").unwrap());
    Rc::new(|s: &str| RE.find(s).map(|m| (m.as_str().to_string(), m.end())))
}
