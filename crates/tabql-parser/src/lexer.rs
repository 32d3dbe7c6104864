//! Tokenizer (spec.md §4.2): folds raw SQL text into canonical [`Token`]s
//! using the kernel's `repeat(any(...))` shape. Line comments and
//! whitespace are matched and discarded; everything else is classified and
//! given a byte-offset [`Span`] in the original input.

use crate::error::{Error, WithErrorInfo};
use crate::kernel::{self, strmatch, BoxParser, Match};
use crate::span::Span;
use crate::token::{Token, TokenKind};

const KEYWORDS: &[&str] = &[
    "select", "as", "from", "where", "not", "and", "or", "like", "in", "having", "distinct",
    "all", "order", "by", "group", "with", "join", "inner", "left", "right", "outer", "on",
    "lateral", "cast", "case", "when", "then", "else", "end", "trim", "both", "leading",
    "trailing", "position", "copy", "to", "drop", "table", "create", "show", "null", "true",
    "false", "over", "partition", "asc", "desc", "limit", "offset",
];

const OPERATORS: &[&str] = &[
    ",", ".", "(", ")", "::", "*", "/", "%", "||", "+", "-", "&", "|", "^", "#", "<<", ">>", "~",
    "=", "!=", ">", "<", ">=", "<=", "<>", "!>", "!<",
];

fn lexeme<'a>(where_: &'static str, matcher: strmatch::StrMatcher, ctor: fn(String) -> TokenKind) -> BoxParser<&'a str> {
    kernel::transform(
        move |m| vec![Match::Lexeme(ctor(only(m)))],
        strmatch::lift(where_, matcher),
    )
}

fn only(m: Vec<Match>) -> String {
    m.into_iter().next().expect("lifted matcher always emits one match").text()
}

/// Only accepts a keyword/operator match that is not immediately followed
/// by an identifier character — so `selectx` lexes as the name `selectx`,
/// not the keyword `select` glued to the name `x`.
fn full_word<'a>(matcher: strmatch::StrMatcher) -> BoxParser<&'a str> {
    let lifted = strmatch::lift("full_word", matcher);
    kernel::delegate(lifted, "full_word", |_before: &&str, after: &&str| {
        !after
            .chars()
            .next()
            .is_some_and(|c| c.is_alphanumeric() || c == '_')
    })
}

fn keyword_branch<'a>() -> BoxParser<&'a str> {
    let matcher = strmatch::map_verbatim(|s| s.to_lowercase(), KEYWORDS);
    kernel::transform(
        |m| vec![Match::Lexeme(TokenKind::Keyword(only(m)))],
        full_word(matcher),
    )
}

fn operator_branch<'a>() -> BoxParser<&'a str> {
    let matcher = strmatch::map_verbatim(|s| s.to_lowercase(), OPERATORS);
    lexeme_from_matcher(matcher, TokenKind::Operator)
}

fn lexeme_from_matcher<'a>(matcher: strmatch::StrMatcher, ctor: fn(String) -> TokenKind) -> BoxParser<&'a str> {
    kernel::transform(
        move |m| vec![Match::Lexeme(ctor(only(m)))],
        strmatch::lift("token", matcher),
    )
}

/// Single quotes lex as a string literal, quotes retained. Double quotes
/// lex as a delimited identifier, quotes stripped and doubled-quote
/// escapes collapsed — this is what lets `"select"` name a column.
fn string_branch<'a>() -> BoxParser<&'a str> {
    let single = kernel::transform(
        |m| vec![Match::Lexeme(TokenKind::String(only(m)))],
        strmatch::lift("string", strmatch::string('\'')),
    );
    let double = kernel::transform(
        |m| vec![Match::Lexeme(TokenKind::QuotedName(unquote(only(m), '"')))],
        strmatch::lift("quoted name", strmatch::string('"')),
    );
    kernel::any(vec![single, double])
}

/// Strips the surrounding `quote` characters and collapses `quote`-doubled
/// escapes back into a single literal quote.
fn unquote(s: String, quote: char) -> String {
    s[quote.len_utf8()..s.len() - quote.len_utf8()].replace(&format!("{quote}{quote}"), &quote.to_string())
}

fn dispatch<'a>() -> BoxParser<&'a str> {
    kernel::any(vec![
        kernel::ignore(strmatch::lift("comment", strmatch::line_comment_matcher())),
        lexeme("float", strmatch::float_matcher(), TokenKind::Float),
        lexeme("integer", strmatch::integer_matcher(), TokenKind::Integer),
        keyword_branch(),
        operator_branch(),
        lexeme("name", strmatch::name_matcher(), TokenKind::Name),
        kernel::ignore(strmatch::lift("whitespace", strmatch::whitespace_matcher())),
        string_branch(),
    ])
}

/// Folds `input` into a token list, or a lexical [`Error`] carrying the
/// first unrecognized remainder.
pub fn tokenize(input: &str) -> Result<Vec<Token>, Error> {
    let step = dispatch();

    let mut tokens = Vec::new();
    let mut rest: &str = input;
    let mut offset = 0usize;

    while !rest.is_empty() {
        let (matches, next_rest, reason) = step(rest);
        let Some(matches) = matches else {
            return Err(Error::lexical(rest)
                .with_span(Some(Span::new(offset, offset + rest.len())))
                .push_hint(reason.message));
        };

        let consumed = rest.len() - next_rest.len();
        if consumed == 0 {
            return Err(Error::new_bug("tokenizer rule matched zero-length input"));
        }

        for m in matches {
            if let Match::Lexeme(kind) = m {
                tokens.push(Token::new(kind, Span::new(offset, offset + consumed)));
            }
        }

        offset += consumed;
        rest = next_rest;
    }

    Ok(tokens)
}

#[cfg(test)]
mod test {
    use super::*;

    fn texts(tokens: &[Token]) -> Vec<&str> {
        tokens.iter().map(|t| t.text()).collect()
    }

    #[test]
    fn tokenizes_scenario_seven() {
        let tokens = tokenize("select 1 -- comment\n , 2").unwrap();
        assert_eq!(texts(&tokens), vec!["select", "1", ",", "2"]);
    }

    #[test]
    fn lowercases_keywords_and_operators() {
        let tokens = tokenize("SELECT a FROM t WHERE a >= 1").unwrap();
        assert_eq!(
            texts(&tokens),
            vec!["select", "a", "from", "t", "where", "a", ">=", "1"]
        );
    }

    #[test]
    fn reserved_word_does_not_glue_to_identifier() {
        let tokens = tokenize("selectx").unwrap();
        assert_eq!(tokens.len(), 1);
        assert!(matches!(tokens[0].kind, TokenKind::Name(_)));
    }

    #[test]
    fn retains_quotes_on_strings() {
        let tokens = tokenize("'it''s fine'").unwrap();
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].text(), "'it''s fine'");
    }

    #[test]
    fn double_quotes_lex_as_quoted_name_not_keyword() {
        let tokens = tokenize("\"select\"").unwrap();
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].text(), "select");
        assert!(matches!(tokens[0].kind, TokenKind::QuotedName(_)));
    }

    #[test]
    fn floats_and_integers() {
        let tokens = tokenize("1 1.5 .5 1e10 1.5e-3").unwrap();
        assert_eq!(texts(&tokens), vec!["1", "1.5", ".5", "1e10", "1.5e-3"]);
        assert!(matches!(tokens[0].kind, TokenKind::Integer(_)));
        assert!(matches!(tokens[1].kind, TokenKind::Float(_)));
    }

    #[test]
    fn rejects_unrecognized_input() {
        let err = tokenize("select @@@").unwrap_err();
        assert_eq!(err.kind, crate::error::ErrorKind::Lexical);
    }
}
