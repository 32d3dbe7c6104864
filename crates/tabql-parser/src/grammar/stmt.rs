//! The non-`SELECT` top-level statements (`COPY`, `DROP TABLE`,
//! `CREATE TABLE AS`, `SHOW`) and the statement dispatcher,
//! `any(select, copy_from, copy_to, drop_table, create_table_as, show)`
//! (spec.md §4.3).

use crate::ast::Node;
use crate::grammar::expr::{base_name, value};
use crate::grammar::select;
use crate::kernel::{self, tokseq, BoxParser, Fields, Match};
use crate::token::{Token, TokenKind};

fn path_literal<'a>() -> BoxParser<&'a [Token]> {
    tokseq::kind("string", |k| matches!(k, TokenKind::String(_)))
}

/// Strips the surrounding single quotes a string-literal token retains and
/// collapses `''` escapes, for contexts (a `COPY` path) that want the bare
/// text rather than a SQL string value.
fn unquote_single(s: String) -> String {
    let inner = &s[1..s.len() - 1];
    inner.replace("''", "'")
}

fn option_item<'a>() -> BoxParser<&'a [Token]> {
    kernel::sequence(vec![base_name(), tokseq::silent_token(&["="]), value()])
}

fn with_options<'a>() -> BoxParser<&'a [Token]> {
    kernel::sequence(vec![
        tokseq::silent_token(&["with"]),
        tokseq::silent_token(&["("]),
        kernel::list_of(tokseq::silent_token(&[","]), option_item()),
        tokseq::silent_token(&[")"]),
    ])
}

fn pairs_from_flat(flat: Vec<Match>) -> Vec<(String, Node)> {
    let mut iter = flat.into_iter();
    let mut out = Vec::new();
    while let Some(name) = iter.next() {
        let val = iter
            .next()
            .expect("option_item always pairs a name with a value");
        out.push((name.text(), val.node()));
    }
    out
}

fn copy_from<'a>() -> BoxParser<&'a [Token]> {
    kernel::construct(
        |mut f: Fields| Node::CopyFrom {
            table: f.take("table").text(),
            path: unquote_single(f.take("path").text()),
            options: pairs_from_flat(f.take_items("options")),
        },
        vec![
            tokseq::silent_token(&["copy"]),
            kernel::keyword("table", base_name()),
            tokseq::silent_token(&["from"]),
            kernel::keyword("path", path_literal()),
            kernel::optional(kernel::keyword("options", with_options())),
        ],
    )
}

fn copy_to<'a>() -> BoxParser<&'a [Token]> {
    kernel::construct(
        |mut f: Fields| Node::CopyTo {
            source: Box::new(Node::Name(f.take("table").text())),
            path: unquote_single(f.take("path").text()),
            options: pairs_from_flat(f.take_items("options")),
        },
        vec![
            tokseq::silent_token(&["copy"]),
            kernel::keyword("table", base_name()),
            tokseq::silent_token(&["to"]),
            kernel::keyword("path", path_literal()),
            kernel::optional(kernel::keyword("options", with_options())),
        ],
    )
}

fn drop_table<'a>() -> BoxParser<&'a [Token]> {
    kernel::construct(
        |mut f: Fields| Node::DropTable {
            names: f.take_items("names").into_iter().map(Match::text).collect(),
        },
        vec![
            tokseq::silent_token(&["drop"]),
            tokseq::silent_token(&["table"]),
            kernel::keyword(
                "names",
                kernel::list_of(tokseq::silent_token(&[","]), base_name()),
            ),
        ],
    )
}

fn create_table_as<'a>(select: BoxParser<&'a [Token]>) -> BoxParser<&'a [Token]> {
    kernel::construct(
        |mut f: Fields| Node::CreateTableAs {
            name: f.take("name").text(),
            query: Box::new(f.take("query").node()),
        },
        vec![
            tokseq::silent_token(&["create"]),
            tokseq::silent_token(&["table"]),
            kernel::keyword("name", base_name()),
            tokseq::silent_token(&["as"]),
            kernel::keyword("query", select),
        ],
    )
}

/// `SHOW …` captures the remaining token tail verbatim, whatever it is —
/// evaluating it is left to the host.
fn show<'a>() -> BoxParser<&'a [Token]> {
    kernel::construct(
        |mut f: Fields| Node::Show {
            tail: f.take_list("tail").into_iter().map(Match::text).collect(),
        },
        vec![
            tokseq::silent_token(&["show"]),
            kernel::keyword("tail", kernel::repeat(tokseq::pred("any", |_| true))),
        ],
    )
}

pub fn statement<'a>() -> BoxParser<&'a [Token]> {
    let select_parser = select::select();
    kernel::any(vec![
        select_parser.clone(),
        copy_from(),
        copy_to(),
        drop_table(),
        create_table_as(select_parser),
        show(),
    ])
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::lexer::tokenize;

    fn parse_stmt(sql: &str) -> Node {
        let tokens = tokenize(sql).unwrap();
        let (matches, rest, _) = statement()(&tokens);
        assert!(rest.is_empty(), "residual tokens: {rest:?}");
        matches.unwrap().into_iter().next().unwrap().node()
    }

    #[test]
    fn parses_copy_from_with_options() {
        let node = parse_stmt("copy t from '/tmp/t.csv' with (header=true, delimiter=',')");
        match node {
            Node::CopyFrom { table, path, options } => {
                assert_eq!(table, "t");
                assert_eq!(path, "/tmp/t.csv");
                assert_eq!(options.len(), 2);
            }
            other => panic!("expected CopyFrom, got {other:?}"),
        }
    }

    #[test]
    fn parses_drop_table_multiple() {
        match parse_stmt("drop table a, b") {
            Node::DropTable { names } => assert_eq!(names, vec!["a".to_string(), "b".to_string()]),
            other => panic!("expected DropTable, got {other:?}"),
        }
    }

    #[test]
    fn parses_create_table_as() {
        match parse_stmt("create table u as select a from t") {
            Node::CreateTableAs { name, query } => {
                assert_eq!(name, "u");
                assert!(matches!(*query, Node::Select { .. }));
            }
            other => panic!("expected CreateTableAs, got {other:?}"),
        }
    }

    #[test]
    fn parses_show_tail_verbatim() {
        match parse_stmt("show tables") {
            Node::Show { tail } => assert_eq!(tail, vec!["tables".to_string()]),
            other => panic!("expected Show, got {other:?}"),
        }
    }
}
