use std::collections::HashMap;

use crate::ast::Node;
use crate::token::TokenKind;

/// The single value type every combinator shuffles around. `construct`
/// assembles one or more of these into a [`Node`]; `keyword` tags one with
/// a field name so `construct` can recover it by name instead of position.
#[derive(Debug, Clone)]
pub enum Match {
    /// Raw matched text: an operator, a keyword, a name, a numeric literal
    /// body, or a quoted string body.
    Text(String),
    /// A fully constructed AST node.
    Node(Node),
    /// The flattened output of `list_of`, or the grouped output of a
    /// `keyword`-tagged sub-parser that produced more than one match.
    List(Vec<Match>),
    /// A `keyword(name = parser)` tagged match. Only ever produced by
    /// [`crate::kernel::keyword`] and consumed by [`crate::kernel::construct`].
    Keyed(&'static str, Box<Match>),
    /// A classified token, produced only by the tokenizer's text-layer
    /// branches and consumed only by [`crate::lexer::tokenize`] itself.
    Lexeme(TokenKind),
}

impl Match {
    pub fn text(self) -> String {
        match self {
            Match::Text(s) => s,
            other => panic!("internal parser error: expected text match, got {other:?}"),
        }
    }

    pub fn node(self) -> Node {
        match self {
            Match::Node(n) => n,
            other => panic!("internal parser error: expected node match, got {other:?}"),
        }
    }

    pub fn into_list(self) -> Vec<Match> {
        match self {
            Match::List(v) => v,
            other => vec![other],
        }
    }
}

/// Fields accumulated by [`crate::kernel::construct`] out of a matched
/// sequence: positional (untagged) matches in order, plus matches tagged by
/// [`crate::kernel::keyword`].
#[derive(Debug, Default)]
pub struct Fields {
    pub positional: Vec<Match>,
    keyed: HashMap<&'static str, Match>,
}

impl Fields {
    pub fn from_matches(matches: Vec<Match>) -> Self {
        let mut fields = Fields::default();
        for m in matches {
            match m {
                Match::Keyed(name, inner) => {
                    fields.keyed.insert(name, *inner);
                }
                other => fields.positional.push(other),
            }
        }
        fields
    }

    /// Take a required keyed field as a single match, unwrapping a
    /// single-element `List` if the inner parser produced one.
    pub fn take(&mut self, name: &str) -> Match {
        let m = self
            .keyed
            .remove(name)
            .unwrap_or_else(|| panic!("internal parser error: missing field `{name}`"));
        match m {
            Match::List(mut v) if v.len() == 1 => v.pop().unwrap(),
            other => other,
        }
    }

    /// Take an optional keyed field.
    pub fn take_opt(&mut self, name: &str) -> Option<Match> {
        self.keyed.remove(name).map(|m| match m {
            Match::List(mut v) if v.len() == 1 => v.pop().unwrap(),
            other => other,
        })
    }

    /// Take a keyed field whose sub-parser emits its matches flat (e.g.
    /// `repeat`, which contributes each match directly rather than nesting
    /// them in one `Match::List`).
    pub fn take_list(&mut self, name: &str) -> Vec<Match> {
        self.keyed
            .remove(name)
            .map(Match::into_list)
            .unwrap_or_default()
    }

    /// Take a keyed field whose sub-parser is `list_of`, which nests its
    /// whole result in a single `Match::List` — one extra unwrap versus
    /// [`Fields::take_list`].
    pub fn take_items(&mut self, name: &str) -> Vec<Match> {
        self.keyed
            .remove(name)
            .map(|m| match m {
                Match::List(mut v) if v.len() == 1 => v.pop().unwrap(),
                other => other,
            })
            .map(Match::into_list)
            .unwrap_or_default()
    }
}
