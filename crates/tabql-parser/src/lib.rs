//! The monadic parser-combinator kernel, tokenizer, AST, and SQL grammar.
//!
//! [`parse`] is the crate's one public entry point: raw SQL text in, a
//! single [`ast::Node`] out, or a lexical/syntactic [`error::Error`].

pub mod ast;
pub mod error;
pub mod grammar;
pub mod kernel;
pub mod lexer;
pub mod span;
pub mod token;

use ast::Node;
use error::Error;

/// Tokenizes and parses `sql` into a single AST root. Residual tokens
/// after a successful statement parse are a syntactic error, mirroring the
/// original's `parse()`: a parser producing anything other than exactly
/// one root, with nothing left over, never leaks a partial AST.
pub fn parse(sql: &str) -> Result<Node, Error> {
    let tokens = lexer::tokenize(sql)?;
    let statement = grammar::statement();
    let (matches, rest, reason) = statement(&tokens);

    let Some(matches) = matches else {
        return Err(Error::syntactic(
            describe_residual(&tokens),
            reason.message,
        ));
    };

    if !rest.is_empty() {
        return Err(Error::syntactic(describe_residual(rest), reason.message));
    }

    let mut matches = matches;
    if matches.len() != 1 {
        return Err(Error::new_bug(format!(
            "statement parser produced {} roots, expected 1",
            matches.len()
        )));
    }

    Ok(matches.remove(0).node())
}

fn describe_residual(tokens: &[token::Token]) -> String {
    tokens
        .iter()
        .map(|t| t.text().to_string())
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn parses_a_full_select() {
        let node = parse("select a, b + 1 as c from t where a > 1").unwrap();
        assert!(matches!(node, Node::Select { .. }));
    }

    #[test]
    fn rejects_empty_input() {
        assert!(parse("").is_err());
    }

    #[test]
    fn rejects_mismatched_parens() {
        assert!(parse("select (a from t").is_err());
    }

    #[test]
    fn rejects_reserved_word_as_bare_identifier() {
        assert!(parse("select select from t").is_err());
    }

    #[test]
    fn accepts_quoted_identifier_containing_a_reserved_word() {
        let node = parse("select \"select\" from t").unwrap();
        assert!(matches!(node, Node::Select { .. }));
    }
}
