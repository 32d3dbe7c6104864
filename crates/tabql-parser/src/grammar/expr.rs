//! `value`, the expression grammar (spec.md §4.3): a recursive-descent
//! precedence chain built entirely out of [`crate::kernel`] combinators,
//! from tightest-binding atoms down to `OR`/`IN`/`LIKE`.

use crate::ast::Node;
use crate::kernel::{self, tokseq, BoxParser, Fields, Match};
use crate::token::{Token, TokenKind};

pub fn base_name<'a>() -> BoxParser<&'a [Token]> {
    tokseq::kind("name", |k| {
        matches!(k, TokenKind::Name(_) | TokenKind::QuotedName(_))
    })
}

/// Dotted name, up to three parts: `schema.table.col`.
pub fn name<'a>() -> BoxParser<&'a [Token]> {
    kernel::transform(
        |m: Vec<Match>| {
            let joined = m
                .into_iter()
                .map(Match::text)
                .collect::<Vec<_>>()
                .join(".");
            vec![Match::Node(Node::Name(joined))]
        },
        kernel::sequence(vec![
            kernel::optional(kernel::sequence(vec![
                base_name(),
                tokseq::silent_token(&["."]),
            ])),
            kernel::optional(kernel::sequence(vec![
                base_name(),
                tokseq::silent_token(&["."]),
            ])),
            base_name(),
        ]),
    )
}

fn null_literal<'a>() -> BoxParser<&'a [Token]> {
    kernel::transform(
        |_| vec![Match::Node(Node::Null)],
        tokseq::verbatim_token(&["null"]),
    )
}

fn integer_literal<'a>() -> BoxParser<&'a [Token]> {
    kernel::transform(
        |m: Vec<Match>| vec![Match::Node(Node::Integer(m.into_iter().next().unwrap().text()))],
        tokseq::kind("integer", |k| matches!(k, TokenKind::Integer(_))),
    )
}

fn float_literal<'a>() -> BoxParser<&'a [Token]> {
    kernel::transform(
        |m: Vec<Match>| vec![Match::Node(Node::Float(m.into_iter().next().unwrap().text()))],
        tokseq::kind("float", |k| matches!(k, TokenKind::Float(_))),
    )
}

fn string_literal<'a>() -> BoxParser<&'a [Token]> {
    kernel::transform(
        |m: Vec<Match>| vec![Match::Node(Node::String(m.into_iter().next().unwrap().text()))],
        tokseq::kind("string", |k| matches!(k, TokenKind::String(_))),
    )
}

fn bool_literal<'a>() -> BoxParser<&'a [Token]> {
    kernel::transform(
        |m: Vec<Match>| vec![Match::Node(Node::Bool(m.into_iter().next().unwrap().text()))],
        tokseq::verbatim_token(&["true", "false"]),
    )
}

fn name_expr<'a>() -> BoxParser<&'a [Token]> {
    name()
}

fn paren<'a>(value: BoxParser<&'a [Token]>) -> BoxParser<&'a [Token]> {
    kernel::sequence(vec![
        tokseq::silent_token(&["("]),
        value,
        tokseq::silent_token(&[")"]),
    ])
}

fn case_expr<'a>(value: BoxParser<&'a [Token]>) -> BoxParser<&'a [Token]> {
    let one_case = kernel::construct(
        |mut f: Fields| Node::Case {
            condition: Box::new(f.take("condition").node()),
            result: Box::new(f.take("result").node()),
        },
        vec![
            tokseq::silent_token(&["when"]),
            kernel::keyword("condition", value.clone()),
            tokseq::silent_token(&["then"]),
            kernel::keyword("result", value.clone()),
        ],
    );
    kernel::construct(
        |mut f: Fields| Node::CaseExpression {
            cases: f.take_list("cases").into_iter().map(Match::node).collect(),
            else_: f.take_opt("else_").map(|m| Box::new(m.node())),
        },
        vec![
            tokseq::silent_token(&["case"]),
            kernel::keyword("cases", kernel::repeat(one_case)),
            kernel::optional(kernel::keyword(
                "else_",
                kernel::sequence(vec![tokseq::silent_token(&["else"]), value.clone()]),
            )),
            tokseq::silent_token(&["end"]),
        ],
    )
}

/// A type name for `CAST`/`::`: a bare name, optionally followed by a
/// parenthesized size/precision that is folded into the name text verbatim
/// (e.g. `varchar(10)`), since the engine treats type names as opaque tags.
fn type_name<'a>() -> BoxParser<&'a [Token]> {
    kernel::transform(
        |m: Vec<Match>| {
            let mut parts = m.into_iter().map(Match::text);
            let base = parts.next().unwrap_or_default();
            let rest: Vec<String> = parts.collect();
            let joined = if rest.is_empty() {
                base
            } else {
                format!("{base}({})", rest.join(","))
            };
            vec![Match::Text(joined)]
        },
        kernel::sequence(vec![
            base_name(),
            kernel::optional(kernel::sequence(vec![
                tokseq::silent_token(&["("]),
                kernel::list_of(tokseq::silent_token(&[","]), integer_text()),
                tokseq::silent_token(&[")"]),
            ])),
        ]),
    )
}

fn integer_text<'a>() -> BoxParser<&'a [Token]> {
    tokseq::kind("integer", |k| matches!(k, TokenKind::Integer(_)))
}

fn cast_call<'a>(value: BoxParser<&'a [Token]>) -> BoxParser<&'a [Token]> {
    kernel::construct(
        |mut f: Fields| Node::Cast {
            value: Box::new(f.take("value").node()),
            type_name: f.take("type_name").text(),
        },
        vec![
            tokseq::silent_token(&["cast"]),
            tokseq::silent_token(&["("]),
            kernel::keyword("value", value),
            tokseq::silent_token(&["as"]),
            kernel::keyword("type_name", type_name()),
            tokseq::silent_token(&[")"]),
        ],
    )
}

fn postfix_cast<'a>(atom: BoxParser<&'a [Token]>) -> BoxParser<&'a [Token]> {
    kernel::transform(
        |m: Vec<Match>| {
            let mut iter = m.into_iter();
            let mut node = iter.next().expect("atom always yields a node").node();
            for type_match in iter {
                node = Node::Cast {
                    value: Box::new(node),
                    type_name: type_match.text(),
                };
            }
            vec![Match::Node(node)]
        },
        kernel::sequence(vec![
            atom,
            kernel::repeat(kernel::sequence(vec![
                tokseq::silent_token(&["::"]),
                type_name(),
            ])),
        ]),
    )
}

fn count_all<'a>() -> BoxParser<&'a [Token]> {
    kernel::construct(
        |_f: Fields| Node::Call {
            func: "count".to_string(),
            args: vec![Node::WildCard { table: None }],
        },
        vec![
            tokseq::silent_token(&["count"]),
            tokseq::silent_token(&["("]),
            tokseq::silent_token(&["*"]),
            tokseq::silent_token(&[")"]),
        ],
    )
}

/// Exhaustive set-function name list per the corrected reading of the
/// original's adjacent-string-literal typo (`'some' 'count'` collapsing to
/// `'somecount'`): `SOME` and `COUNT` kept distinct.
const SET_FUNCTIONS: &[&str] = &[
    "avg",
    "max",
    "min",
    "sum",
    "every",
    "any",
    "some",
    "count",
    "stddev_pop",
    "stddev_samp",
    "var_samp",
    "var_pop",
    "collect",
    "fusion",
    "intersection",
    "first_value",
];

fn call_set_function<'a>(value: BoxParser<&'a [Token]>) -> BoxParser<&'a [Token]> {
    kernel::construct(
        |mut f: Fields| Node::CallSetFunction {
            func: f.take("func").text(),
            quantifier: f.take_opt("quantifier").map(Match::text),
            arg: Box::new(f.take("args").node()),
        },
        vec![
            kernel::keyword("func", tokseq::verbatim_token(SET_FUNCTIONS)),
            tokseq::silent_token(&["("]),
            kernel::optional(kernel::keyword(
                "quantifier",
                tokseq::verbatim_token(&["distinct", "all"]),
            )),
            kernel::keyword("args", value),
            tokseq::silent_token(&[")"]),
        ],
    )
}

fn partition_by_clause<'a>(value: BoxParser<&'a [Token]>) -> BoxParser<&'a [Token]> {
    kernel::sequence(vec![
        tokseq::silent_token(&["partition"]),
        tokseq::silent_token(&["by"]),
        kernel::list_of(tokseq::silent_token(&[","]), value),
    ])
}

pub fn order_by_item<'a>(value: BoxParser<&'a [Token]>) -> BoxParser<&'a [Token]> {
    kernel::construct(
        |mut f: Fields| Node::OrderBy {
            value: Box::new(f.take("value").node()),
            order: f
                .take_opt("order")
                .map(Match::text)
                .unwrap_or_else(|| "asc".to_string()),
        },
        vec![
            kernel::keyword("value", value),
            kernel::optional(kernel::keyword(
                "order",
                tokseq::verbatim_token(&["desc", "asc"]),
            )),
        ],
    )
}

pub fn order_by_clause<'a>(value: BoxParser<&'a [Token]>) -> BoxParser<&'a [Token]> {
    kernel::sequence(vec![
        tokseq::silent_token(&["order"]),
        tokseq::silent_token(&["by"]),
        kernel::list_of(tokseq::silent_token(&[","]), order_by_item(value)),
    ])
}

fn call_analytics_function<'a>(value: BoxParser<&'a [Token]>) -> BoxParser<&'a [Token]> {
    kernel::construct(
        |mut f: Fields| Node::CallAnalyticsFunction {
            call: Box::new(f.take("call").node()),
            partition_by: {
                let items = f.take_items("partition_by");
                (!items.is_empty()).then(|| items.into_iter().map(Match::node).collect())
            },
            order_by: {
                let items = f.take_items("order_by");
                (!items.is_empty()).then(|| items.into_iter().map(Match::node).collect())
            },
        },
        vec![
            kernel::keyword("call", call(value.clone())),
            tokseq::silent_token(&["over"]),
            tokseq::silent_token(&["("]),
            kernel::optional(kernel::keyword(
                "partition_by",
                partition_by_clause(value.clone()),
            )),
            kernel::optional(kernel::keyword("order_by", order_by_clause(value))),
            tokseq::silent_token(&[")"]),
        ],
    )
}

/// `TRIM([BOTH|LEADING|TRAILING] [chars] FROM value)`. Desugars to a
/// generic `Call` named `trim`/`ltrim`/`rtrim`, since the executor treats
/// it as an ordinary function once parsed.
fn trim_call<'a>(value: BoxParser<&'a [Token]>) -> BoxParser<&'a [Token]> {
    kernel::construct(
        |mut f: Fields| {
            let side = f
                .take_opt("side")
                .map(Match::text)
                .unwrap_or_else(|| "both".to_string());
            let mut args = Vec::new();
            if let Some(chars) = f.take_opt("chars") {
                args.push(chars.node());
            }
            args.push(f.take("value").node());
            Node::Call {
                func: format!("trim_{side}"),
                args,
            }
        },
        vec![
            tokseq::silent_token(&["trim"]),
            tokseq::silent_token(&["("]),
            kernel::optional(kernel::keyword(
                "side",
                tokseq::verbatim_token(&["both", "leading", "trailing"]),
            )),
            kernel::optional(kernel::keyword("chars", value.clone())),
            tokseq::silent_token(&["from"]),
            kernel::keyword("value", value),
            tokseq::silent_token(&[")"]),
        ],
    )
}

/// `POSITION(substr IN str)`, desugared to `Call{func: "position", args}`.
fn position_call<'a>(value: BoxParser<&'a [Token]>) -> BoxParser<&'a [Token]> {
    kernel::construct(
        |mut f: Fields| Node::Call {
            func: "position".to_string(),
            args: vec![f.take("needle").node(), f.take("haystack").node()],
        },
        vec![
            tokseq::silent_token(&["position"]),
            tokseq::silent_token(&["("]),
            kernel::keyword("needle", value.clone()),
            tokseq::silent_token(&["in"]),
            kernel::keyword("haystack", value),
            tokseq::silent_token(&[")"]),
        ],
    )
}

fn call<'a>(value: BoxParser<&'a [Token]>) -> BoxParser<&'a [Token]> {
    kernel::construct(
        |mut f: Fields| Node::Call {
            func: f.take("func").text(),
            args: f.take_items("args").into_iter().map(Match::node).collect(),
        },
        vec![
            kernel::keyword("func", base_name()),
            tokseq::silent_token(&["("]),
            kernel::any(vec![
                kernel::keyword("args", kernel::list_of(tokseq::silent_token(&[","]), value)),
                kernel::keyword("args", kernel::literal(Match::List(vec![]))),
            ]),
            tokseq::silent_token(&[")"]),
        ],
    )
}

fn build_binary_tree(matches: Vec<Match>) -> Vec<Match> {
    vec![Match::Node(fold_binary_tree(matches))]
}

fn fold_binary_tree(mut items: Vec<Match>) -> Node {
    debug_assert!(items.len() % 2 == 1, "binary_op list must have odd length");
    if items.len() == 1 {
        return items.pop().expect("checked non-empty above").node();
    }
    let first = items.remove(0).node();
    let op = items.remove(0).text();
    let right = fold_binary_tree(items);
    Node::BinaryOp {
        op,
        left: Box::new(first),
        right: Box::new(right),
    }
}

fn binary_op<'a>(value: BoxParser<&'a [Token]>, ops: &'static [&'static str]) -> BoxParser<&'a [Token]> {
    kernel::transform(
        build_binary_tree,
        kernel::list_of(tokseq::verbatim_token(ops), value),
    )
}

fn unary_op<'a>(value: BoxParser<&'a [Token]>, ops: &'static [&'static str]) -> BoxParser<&'a [Token]> {
    let tagged = kernel::construct(
        |mut f: Fields| Node::UnaryOp {
            op: f.take("op").text(),
            arg: Box::new(f.take("arg").node()),
        },
        vec![
            kernel::keyword("op", tokseq::verbatim_token(ops)),
            kernel::keyword("arg", value.clone()),
        ],
    );
    kernel::any(vec![tagged, value])
}

fn compound_token<'a>(words: &'static [&'static str]) -> BoxParser<&'a [Token]> {
    let parts: Vec<BoxParser<&'a [Token]>> = words
        .iter()
        .map(|w| tokseq::verbatim_token(std::slice::from_ref(w)))
        .collect();
    kernel::transform(
        |m: Vec<Match>| {
            let joined = m.into_iter().map(Match::text).collect::<Vec<_>>().join(" ");
            vec![Match::Text(joined)]
        },
        kernel::sequence(parts),
    )
}

/// The full expression grammar, tied recursively: `value` appears inside
/// its own parenthesized/call/case/cast atoms.
pub fn value<'a>() -> BoxParser<&'a [Token]> {
    kernel::define(|value_rec: BoxParser<&'a [Token]>| {
        let atom = kernel::any(vec![
            paren(value_rec.clone()),
            case_expr(value_rec.clone()),
            cast_call(value_rec.clone()),
            count_all(),
            call_set_function(value_rec.clone()),
            call_analytics_function(value_rec.clone()),
            trim_call(value_rec.clone()),
            position_call(value_rec.clone()),
            call(value_rec.clone()),
            null_literal(),
            integer_literal(),
            string_literal(),
            bool_literal(),
            name_expr(),
            float_literal(),
        ]);

        let v = postfix_cast(atom);
        let v = unary_op(v, &["+", "-"]);
        let v = binary_op(v, &["^"]);
        let v = binary_op(v, &["*", "/", "%"]);
        let v = binary_op(v, &["||"]);
        let v = binary_op(v, &["+", "-", "&", "|"]);
        let v = binary_op(v, &["#", "<<", ">>"]);
        let v = unary_op(v, &["~"]);
        let v = binary_op(
            v,
            &["=", "!=", ">", "<", ">=", "<=", "<>", "!>", "!<"],
        );
        let v = unary_op(v, &["not"]);
        let v = binary_op(v, &["and"]);

        let or_in_like_sep = kernel::any(vec![
            compound_token(&["not", "like"]),
            compound_token(&["not", "in"]),
            tokseq::verbatim_token(&["in", "or", "like"]),
        ]);
        kernel::transform(build_binary_tree, kernel::list_of(or_in_like_sep, v))
    })
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::lexer::tokenize;

    fn parse_value(sql: &str) -> Node {
        let tokens = tokenize(sql).unwrap();
        let (matches, rest, _) = value()(&tokens);
        assert!(rest.is_empty(), "residual tokens: {rest:?}");
        matches.unwrap().into_iter().next().unwrap().node()
    }

    #[test]
    fn parses_arithmetic_precedence() {
        let node = parse_value("1 + 2 * 3");
        assert_eq!(
            node,
            Node::BinaryOp {
                op: "+".into(),
                left: Box::new(Node::Integer("1".into())),
                right: Box::new(Node::BinaryOp {
                    op: "*".into(),
                    left: Box::new(Node::Integer("2".into())),
                    right: Box::new(Node::Integer("3".into())),
                }),
            }
        );
    }

    #[test]
    fn parses_dotted_name() {
        assert_eq!(parse_value("t.a"), Node::Name("t.a".into()));
    }

    #[test]
    fn parses_not_like_as_compound_op() {
        let node = parse_value("a not like 'x'");
        match node {
            Node::BinaryOp { op, .. } => assert_eq!(op, "not like"),
            other => panic!("expected BinaryOp, got {other:?}"),
        }
    }

    #[test]
    fn parses_cast_postfix_and_call_form() {
        assert_eq!(
            parse_value("a::int"),
            Node::Cast {
                value: Box::new(Node::Name("a".into())),
                type_name: "int".into(),
            }
        );
        assert_eq!(
            parse_value("cast(a as int)"),
            Node::Cast {
                value: Box::new(Node::Name("a".into())),
                type_name: "int".into(),
            }
        );
    }

    #[test]
    fn parses_count_star() {
        assert_eq!(
            parse_value("count(*)"),
            Node::Call {
                func: "count".into(),
                args: vec![Node::WildCard { table: None }],
            }
        );
    }

    #[test]
    fn parses_set_function_with_quantifier() {
        let node = parse_value("sum(distinct a)");
        assert_eq!(
            node,
            Node::CallSetFunction {
                func: "sum".into(),
                quantifier: Some("distinct".into()),
                arg: Box::new(Node::Name("a".into())),
            }
        );
    }
}
