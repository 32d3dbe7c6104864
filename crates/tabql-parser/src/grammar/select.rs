//! `SELECT`, `WITH` CTEs, `FROM`/join chains, and the clause tail
//! (`WHERE`/`GROUP BY`/`HAVING`/`ORDER BY`/`LIMIT`/`OFFSET`) — spec.md
//! §4.3's `select` production, plus the join/CTE extensions SPEC_FULL.md
//! adds on top of the original grammar's plain `from_clause`.

use crate::ast::Node;
use crate::grammar::expr::{base_name, order_by_clause, value};
use crate::kernel::{self, tokseq, BoxParser, Fields, Match};
use crate::token::Token;

fn alias<'a>() -> BoxParser<&'a [Token]> {
    kernel::transform(
        |m: Vec<Match>| vec![Match::Text(m.into_iter().next().unwrap().text())],
        kernel::sequence(vec![kernel::optional(tokseq::silent_token(&["as"])), base_name()]),
    )
}

fn table_ref<'a>() -> BoxParser<&'a [Token]> {
    kernel::construct(
        |mut f: Fields| Node::TableRef {
            schema: f.take_opt("schema").map(Match::text),
            name: f.take("name").text(),
            alias: f.take_opt("alias").map(Match::text),
        },
        vec![
            kernel::optional(kernel::sequence(vec![
                kernel::keyword("schema", base_name()),
                tokseq::silent_token(&["."]),
            ])),
            kernel::keyword("name", base_name()),
            kernel::optional(kernel::keyword("alias", alias())),
        ],
    )
}

fn table_function<'a>() -> BoxParser<&'a [Token]> {
    kernel::construct(
        |mut f: Fields| Node::TableFunction {
            func: f.take("func").text(),
            args: f.take_items("args").into_iter().map(Match::node).collect(),
            alias: f.take_opt("alias").map(Match::text),
        },
        vec![
            kernel::keyword("func", base_name()),
            tokseq::silent_token(&["("]),
            kernel::any(vec![
                kernel::keyword("args", kernel::list_of(tokseq::silent_token(&[","]), value())),
                kernel::keyword("args", kernel::literal(Match::List(vec![]))),
            ]),
            tokseq::silent_token(&[")"]),
            kernel::optional(kernel::keyword("alias", alias())),
        ],
    )
}

fn subquery<'a>(select: BoxParser<&'a [Token]>) -> BoxParser<&'a [Token]> {
    kernel::construct(
        |mut f: Fields| Node::SubQuery {
            query: Box::new(f.take("query").node()),
            alias: f.take_opt("alias").map(Match::text),
        },
        vec![
            tokseq::silent_token(&["("]),
            kernel::keyword("query", select),
            tokseq::silent_token(&[")"]),
            kernel::optional(kernel::keyword("alias", alias())),
        ],
    )
}

fn base_from_item<'a>(select: BoxParser<&'a [Token]>) -> BoxParser<&'a [Token]> {
    kernel::any(vec![subquery(select), table_function(), table_ref()])
}

fn from_item<'a>(select: BoxParser<&'a [Token]>) -> BoxParser<&'a [Token]> {
    let base = base_from_item(select);
    let lateral = kernel::construct(
        |mut f: Fields| Node::Lateral {
            table: Box::new(f.take("table").node()),
        },
        vec![
            tokseq::silent_token(&["lateral"]),
            kernel::keyword("table", base.clone()),
        ],
    );
    kernel::any(vec![lateral, base])
}

fn join_tail<'a>(select: BoxParser<&'a [Token]>) -> BoxParser<&'a [Token]> {
    kernel::construct(
        |mut f: Fields| Node::Join {
            how: f
                .take_opt("how")
                .map(Match::text)
                .unwrap_or_else(|| "inner".to_string()),
            left: None,
            right: Box::new(f.take("right").node()),
            on: Box::new(f.take("on").node()),
        },
        vec![
            kernel::optional(kernel::keyword(
                "how",
                tokseq::verbatim_token(&["inner", "left", "right", "outer"]),
            )),
            tokseq::silent_token(&["join"]),
            kernel::keyword("right", from_item(select.clone())),
            tokseq::silent_token(&["on"]),
            kernel::keyword("on", value()),
        ],
    )
}

/// Folds `(base, [join1, join2, …])` into a left-nested `Join` chain: each
/// subsequent join's `left` is the result so far.
fn build_joins(matches: Vec<Match>) -> Vec<Match> {
    let mut iter = matches.into_iter();
    let mut acc = iter
        .next()
        .expect("table_chain always yields a base table item")
        .node();
    for m in iter {
        match m.node() {
            Node::Join { how, right, on, .. } => {
                acc = Node::Join {
                    how,
                    left: Some(Box::new(acc)),
                    right,
                    on,
                };
            }
            other => acc = other,
        }
    }
    vec![Match::Node(acc)]
}

fn table_chain<'a>(select: BoxParser<&'a [Token]>) -> BoxParser<&'a [Token]> {
    kernel::transform(
        build_joins,
        kernel::sequence(vec![
            from_item(select.clone()),
            kernel::repeat(join_tail(select)),
        ]),
    )
}

fn from_clause<'a>(select: BoxParser<&'a [Token]>) -> BoxParser<&'a [Token]> {
    kernel::construct(
        |mut f: Fields| Node::FromClause {
            tables: f.take_items("tables").into_iter().map(Match::node).collect(),
        },
        vec![
            tokseq::silent_token(&["from"]),
            kernel::keyword(
                "tables",
                kernel::list_of(tokseq::silent_token(&[","]), table_chain(select)),
            ),
        ],
    )
}

fn wildcard<'a>() -> BoxParser<&'a [Token]> {
    kernel::construct(
        |mut f: Fields| Node::WildCard {
            table: f.take_opt("table").map(Match::text),
        },
        vec![
            kernel::optional(kernel::sequence(vec![
                kernel::keyword("table", base_name()),
                tokseq::silent_token(&["."]),
            ])),
            tokseq::silent_token(&["*"]),
        ],
    )
}

fn column<'a>() -> BoxParser<&'a [Token]> {
    kernel::construct(
        |mut f: Fields| Node::Column {
            value: Box::new(f.take("value").node()),
            alias: f.take_opt("alias").map(Match::text),
        },
        vec![
            kernel::keyword("value", value()),
            kernel::optional(kernel::keyword("alias", alias())),
        ],
    )
}

fn select_item<'a>() -> BoxParser<&'a [Token]> {
    kernel::any(vec![wildcard(), column()])
}

fn cte_item<'a>(select: BoxParser<&'a [Token]>) -> BoxParser<&'a [Token]> {
    kernel::construct(
        |mut f: Fields| Node::SubQuery {
            query: Box::new(f.take("query").node()),
            alias: Some(f.take("name").text()),
        },
        vec![
            kernel::keyword("name", base_name()),
            tokseq::silent_token(&["as"]),
            tokseq::silent_token(&["("]),
            kernel::keyword("query", select),
            tokseq::silent_token(&[")"]),
        ],
    )
}

fn cte_clause<'a>(select: BoxParser<&'a [Token]>) -> BoxParser<&'a [Token]> {
    kernel::sequence(vec![
        tokseq::silent_token(&["with"]),
        kernel::list_of(tokseq::silent_token(&[","]), cte_item(select)),
    ])
}

/// `value` as a bare limit/offset count: an integer literal, kept as a
/// `Node` so the planner can evaluate it the same way it evaluates any
/// other scalar expression.
fn count_literal<'a>() -> BoxParser<&'a [Token]> {
    value()
}

pub fn select<'a>() -> BoxParser<&'a [Token]> {
    kernel::define(|select_rec: BoxParser<&'a [Token]>| {
        kernel::construct(
            |mut f: Fields| Node::Select {
                cte: {
                    let items = f.take_items("cte");
                    (!items.is_empty()).then(|| items.into_iter().map(Match::node).collect())
                },
                quantifier: f.take_opt("quantifier").map(Match::text),
                columns: f.take_items("columns").into_iter().map(Match::node).collect(),
                from_clause: f.take_opt("from_clause").map(|m| Box::new(m.node())),
                where_clause: f.take_opt("where_clause").map(|m| Box::new(m.node())),
                group_by_clause: {
                    let items = f.take_items("group_by_clause");
                    (!items.is_empty()).then(|| items.into_iter().map(Match::node).collect())
                },
                having_clause: f.take_opt("having_clause").map(|m| Box::new(m.node())),
                order_by_clause: {
                    let items = f.take_items("order_by_clause");
                    (!items.is_empty()).then(|| items.into_iter().map(Match::node).collect())
                },
                limit_clause: f.take_opt("limit_clause").map(|m| Box::new(m.node())),
                offset_clause: f.take_opt("offset_clause").map(|m| Box::new(m.node())),
            },
            vec![
                kernel::optional(kernel::keyword("cte", cte_clause(select_rec.clone()))),
                tokseq::silent_token(&["select"]),
                kernel::optional(kernel::keyword(
                    "quantifier",
                    tokseq::verbatim_token(&["distinct", "all"]),
                )),
                kernel::keyword(
                    "columns",
                    kernel::list_of(tokseq::silent_token(&[","]), select_item()),
                ),
                kernel::optional(kernel::keyword("from_clause", from_clause(select_rec))),
                kernel::optional(kernel::keyword(
                    "where_clause",
                    kernel::sequence(vec![tokseq::silent_token(&["where"]), value()]),
                )),
                kernel::optional(kernel::keyword(
                    "group_by_clause",
                    kernel::sequence(vec![
                        tokseq::silent_token(&["group"]),
                        tokseq::silent_token(&["by"]),
                        kernel::list_of(tokseq::silent_token(&[","]), value()),
                    ]),
                )),
                kernel::optional(kernel::keyword(
                    "having_clause",
                    kernel::sequence(vec![tokseq::silent_token(&["having"]), value()]),
                )),
                kernel::optional(kernel::keyword("order_by_clause", order_by_clause(value()))),
                kernel::optional(kernel::keyword(
                    "limit_clause",
                    kernel::sequence(vec![tokseq::silent_token(&["limit"]), count_literal()]),
                )),
                kernel::optional(kernel::keyword(
                    "offset_clause",
                    kernel::sequence(vec![tokseq::silent_token(&["offset"]), count_literal()]),
                )),
            ],
        )
    })
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::lexer::tokenize;

    fn parse_select(sql: &str) -> Node {
        let tokens = tokenize(sql).unwrap();
        let (matches, rest, _) = select()(&tokens);
        assert!(rest.is_empty(), "residual tokens: {rest:?}");
        matches.unwrap().into_iter().next().unwrap().node()
    }

    #[test]
    fn parses_simple_select() {
        let node = parse_select("select a, b + 1 as c from t");
        match node {
            Node::Select { columns, from_clause, .. } => {
                assert_eq!(columns.len(), 2);
                assert!(from_clause.is_some());
            }
            other => panic!("expected Select, got {other:?}"),
        }
    }

    #[test]
    fn parses_join_chain_left_nested() {
        let node = parse_select("select l.a, r.b from l join r on l.k = r.k");
        let Node::Select { from_clause: Some(from), .. } = node else {
            panic!("expected from clause");
        };
        let Node::FromClause { tables } = *from else {
            panic!("expected FromClause");
        };
        match &tables[0] {
            Node::Join { how, left, .. } => {
                assert_eq!(how, "inner");
                assert!(matches!(left.as_deref(), Some(Node::TableRef { .. })));
            }
            other => panic!("expected Join, got {other:?}"),
        }
    }

    #[test]
    fn parses_cte() {
        let node = parse_select("with u as (select a from t where a = 1) select count(*) from u");
        match node {
            Node::Select { cte: Some(cte), .. } => assert_eq!(cte.len(), 1),
            other => panic!("expected Select with cte, got {other:?}"),
        }
    }

    #[test]
    fn parses_group_by_having_order_limit_offset() {
        let node = parse_select(
            "select a, sum(b) as s from t group by a having sum(b) > 1 order by a desc limit 10 offset 5",
        );
        match node {
            Node::Select {
                group_by_clause: Some(g),
                having_clause: Some(_),
                order_by_clause: Some(o),
                limit_clause: Some(_),
                offset_clause: Some(_),
                ..
            } => {
                assert_eq!(g.len(), 1);
                assert_eq!(o.len(), 1);
            }
            other => panic!("expected full clause set, got {other:?}"),
        }
    }

    #[test]
    fn parses_from_dual() {
        let node = parse_select("select 1 from dual");
        match node {
            Node::Select { from_clause: Some(from), .. } => {
                let Node::FromClause { tables } = *from else {
                    panic!("expected FromClause");
                };
                assert!(matches!(&tables[0], Node::TableRef { name, .. } if name == "dual"));
            }
            other => panic!("expected Select, got {other:?}"),
        }
    }
}
