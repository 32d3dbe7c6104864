use std::rc::Rc;

use super::{BoxParser, Fields, Match, Reason, Remainder};
use crate::ast::Node;

/// Parses nothing and always succeeds, emitting `v`.
pub fn literal<R: Remainder>(v: Match) -> BoxParser<R> {
    Rc::new(move |input: R| (Some(vec![v.clone()]), input, Reason::success("literal", 0)))
}

/// Runs `a`; on success, discards its matches.
pub fn ignore<R: Remainder>(a: BoxParser<R>) -> BoxParser<R> {
    Rc::new(move |input: R| {
        let (matches, rest, reason) = a(input);
        match matches {
            Some(_) => (Some(vec![]), rest, reason),
            None => (None, rest, reason),
        }
    })
}

/// Runs parsers in order. On any failure, rewinds to the starting
/// remainder. Matches from every part are concatenated in order.
pub fn sequence<R: Remainder>(parts: Vec<BoxParser<R>>) -> BoxParser<R> {
    Rc::new(move |input: R| {
        let mut rest = input.clone();
        let mut acc = Vec::new();
        let mut consumed = 0usize;
        for part in &parts {
            let (matches, next_rest, reason) = part(rest.clone());
            match matches {
                Some(m) => {
                    acc.extend(m);
                    consumed += rest.remaining_len() - next_rest.remaining_len();
                    rest = next_rest;
                }
                None => {
                    return (
                        None,
                        input,
                        Reason::failure("sequence", reason.message, consumed + reason.progress),
                    );
                }
            }
        }
        (Some(acc), rest, Reason::success("sequence", consumed))
    })
}

/// Tries alternatives left to right, returning the first success.
/// On total failure, reports the alternative that made the most progress.
pub fn any<R: Remainder>(alts: Vec<BoxParser<R>>) -> BoxParser<R> {
    Rc::new(move |input: R| {
        let mut best: Option<Reason> = None;
        for alt in &alts {
            let (matches, rest, reason) = alt(input.clone());
            if let Some(m) = matches {
                return (Some(m), rest, Reason::success("any", reason.progress));
            }
            best = Some(match best.take() {
                Some(b) => super::deepest(b, reason),
                None => reason,
            });
        }
        let reason = best.unwrap_or_else(|| Reason::failure("any", "no alternatives", 0));
        (
            None,
            input,
            Reason::failure("any", reason.message, reason.progress),
        )
    })
}

/// Succeeds with zero matches if `a` fails.
pub fn optional<R: Remainder>(a: BoxParser<R>) -> BoxParser<R> {
    Rc::new(move |input: R| {
        let (matches, rest, reason) = a(input.clone());
        match matches {
            Some(m) => (Some(m), rest, reason),
            None => (Some(vec![]), input, Reason::success("optional", 0)),
        }
    })
}

/// Zero or more, greedy; stops at first failure.
pub fn repeat<R: Remainder>(a: BoxParser<R>) -> BoxParser<R> {
    Rc::new(move |input: R| {
        let mut rest = input;
        let mut acc = Vec::new();
        loop {
            let (matches, next_rest, _reason) = a(rest.clone());
            match matches {
                Some(m) if next_rest.remaining_len() < rest.remaining_len() || !m.is_empty() => {
                    acc.extend(m);
                    rest = next_rest;
                }
                _ => break,
            }
        }
        (Some(acc), rest, Reason::success("repeat", 0))
    })
}

/// One or more `item`s separated by `sep`; emits the flat concatenation of
/// every item's matches (and `sep`'s, if it produces any — `ignore`d
/// separators like a plain comma contribute nothing, but an operator token
/// kept as a separator, as in `binary_op`, is interleaved with the operands)
/// as a single nested [`Match::List`].
pub fn list_of<R: Remainder>(sep: BoxParser<R>, item: BoxParser<R>) -> BoxParser<R> {
    Rc::new(move |input: R| {
        let (first, rest, reason) = item(input.clone());
        let Some(first) = first else {
            return (None, input, reason);
        };
        let mut acc = first;
        let mut rest = rest;
        loop {
            let (sep_matches, after_sep, _) = sep(rest.clone());
            let Some(sep_matches) = sep_matches else {
                break;
            };
            let (more, after_item, reason) = item(after_sep);
            match more {
                Some(m) => {
                    acc.extend(sep_matches);
                    acc.extend(m);
                    rest = after_item;
                }
                None => {
                    return (
                        None,
                        input,
                        Reason::failure("list_of", reason.message, reason.progress),
                    );
                }
            }
        }
        (Some(vec![Match::List(acc)]), rest, Reason::success("list_of", 0))
    })
}

/// Applies `f` to the whole match list on success.
pub fn transform<R: Remainder>(
    f: impl Fn(Vec<Match>) -> Vec<Match> + 'static,
    a: BoxParser<R>,
) -> BoxParser<R> {
    Rc::new(move |input: R| {
        let (matches, rest, reason) = a(input);
        (matches.map(&f), rest, reason)
    })
}

/// Tags a sub-parser's match list with a field name, for later retrieval by
/// [`construct`]'s builder via [`Fields::take`]/[`Fields::take_opt`].
pub fn keyword<R: Remainder>(name: &'static str, a: BoxParser<R>) -> BoxParser<R> {
    Rc::new(move |input: R| {
        let (matches, rest, reason) = a(input);
        match matches {
            Some(m) => (
                Some(vec![Match::Keyed(name, Box::new(Match::List(m)))]),
                rest,
                reason,
            ),
            None => (None, rest, reason),
        }
    })
}

/// Runs `parts` in sequence, then hands the accumulated [`Fields`] to
/// `builder` to assemble one AST node.
pub fn construct<R: Remainder>(
    builder: impl Fn(Fields) -> Node + 'static,
    parts: Vec<BoxParser<R>>,
) -> BoxParser<R> {
    let seq = sequence(parts);
    Rc::new(move |input: R| {
        let (matches, rest, reason) = seq(input);
        match matches {
            Some(m) => {
                let fields = Fields::from_matches(m);
                let node = builder(fields);
                (Some(vec![Match::Node(node)]), rest, reason)
            }
            None => (None, rest, reason),
        }
    })
}

/// Custom lookahead: runs `a`, then lets `post` inspect the surrounding
/// remainders to accept or reject the match (used by `full_word`, which
/// only accepts a keyword match when it is not immediately followed by an
/// identifier character).
pub fn delegate<R: Remainder>(
    a: BoxParser<R>,
    where_: &'static str,
    post: impl Fn(&R, &R) -> bool + 'static,
) -> BoxParser<R> {
    Rc::new(move |input: R| {
        let (matches, rest, reason) = a(input.clone());
        match matches {
            Some(m) if post(&input, &rest) => (Some(m), rest, reason),
            Some(_) => (
                None,
                input,
                Reason::failure(where_, "lookahead rejected match", reason.progress),
            ),
            None => (None, rest, reason),
        }
    })
}

/// Ties a recursive knot: `build` receives a handle to the parser being
/// defined, for use in its own definition (e.g. `value` referencing itself
/// inside a parenthesized sub-expression).
pub fn define<R: Remainder>(
    build: impl FnOnce(BoxParser<R>) -> BoxParser<R>,
) -> BoxParser<R> {
    use std::cell::RefCell;

    let cell: Rc<RefCell<Option<BoxParser<R>>>> = Rc::new(RefCell::new(None));
    let cell_for_handle = cell.clone();
    let handle: BoxParser<R> = Rc::new(move |input: R| {
        let parser = cell_for_handle
            .borrow()
            .clone()
            .expect("recursive parser invoked before it finished being defined");
        parser(input)
    });
    let real = build(handle.clone());
    *cell.borrow_mut() = Some(real);
    handle
}
