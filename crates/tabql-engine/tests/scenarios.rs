//! End-to-end `parse → plan → execute` tests, one per spec scenario group,
//! plus the boundary cases not already covered at the parser level (empty
//! input, mismatched parens, reserved/quoted identifiers all live in
//! `tabql-parser`'s own tests).

use std::collections::HashMap;

use tabql_engine::backend::{Table, Value};
use tabql_engine::executor::Executor;
use tabql_engine::ir::Dag;
use tabql_engine::memtable::MemTable;
use tabql_engine::planner::Plan;
use tabql_engine::{execute, Options};
use tabql_parser::ast::Node;

fn scope(tables: Vec<(&str, MemTable)>) -> HashMap<String, MemTable> {
    tables.into_iter().map(|(n, t)| (n.to_string(), t)).collect()
}

fn ints(vals: &[i64]) -> Vec<Value> {
    vals.iter().map(|&i| Value::Int(i)).collect()
}

/// Looks up a result column by its user-facing suffix (`.a`), ignoring the
/// synthetic `table_id` prefix the executor assigns.
fn col<'a>(table: &'a MemTable, suffix: &str) -> &'a [Value] {
    let name = table
        .columns()
        .into_iter()
        .find(|c| c.ends_with(suffix))
        .unwrap_or_else(|| panic!("no column ending in `{suffix}`, got {:?}", table.columns()));
    table.column(&name).unwrap()
}

fn only_col<'a>(table: &'a MemTable) -> &'a [Value] {
    let cols = table.columns();
    assert_eq!(cols.len(), 1, "expected exactly one column, got {cols:?}");
    table.column(&cols[0]).unwrap()
}

#[test]
fn projection_with_a_computed_column() {
    let t = MemTable::new(vec![("t.a".into(), ints(&[1, 2])), ("t.b".into(), ints(&[10, 20]))]);
    let result = execute("SELECT a, b + 1 AS c FROM t", scope(vec![("t", t)]), Options::default()).unwrap();
    assert_eq!(col(&result, ".a"), ints(&[1, 2]).as_slice());
    assert_eq!(col(&result, ".c"), ints(&[11, 21]).as_slice());
}

#[test]
fn count_star_with_a_where_clause() {
    let t = MemTable::new(vec![("t.a".into(), ints(&[1, 2]))]);
    let result = execute(
        "SELECT COUNT(*) AS n FROM t WHERE a > 1",
        scope(vec![("t", t)]),
        Options::default(),
    )
    .unwrap();
    assert_eq!(result.num_rows(), 1);
    assert_eq!(col(&result, ".n"), &[Value::Int(1)]);
}

#[test]
fn group_by_with_sum() {
    let t = MemTable::new(vec![("t.a".into(), ints(&[1, 1, 2])), ("t.b".into(), ints(&[10, 20, 30]))]);
    let result = execute(
        "SELECT a, SUM(b) AS s FROM t GROUP BY a",
        scope(vec![("t", t)]),
        Options::default(),
    )
    .unwrap();
    assert_eq!(result.num_rows(), 2);
    assert_eq!(col(&result, ".a"), ints(&[1, 2]).as_slice());
    assert_eq!(col(&result, ".s"), ints(&[30, 30]).as_slice());
}

#[test]
fn cte_with_count_star() {
    let t = MemTable::new(vec![("t.a".into(), ints(&[1, 1, 2]))]);
    let result = execute(
        "WITH u AS (SELECT a FROM t WHERE a = 1) SELECT COUNT(*) FROM u",
        scope(vec![("t", t)]),
        Options::default(),
    )
    .unwrap();
    assert_eq!(result.num_rows(), 1);
    assert_eq!(only_col(&result), &[Value::Int(2)]);
}

#[test]
fn equi_join() {
    let l = MemTable::new(vec![("l.k".into(), ints(&[1, 2])), ("l.a".into(), ints(&[10, 20]))]);
    let r = MemTable::new(vec![("r.k".into(), ints(&[2, 3])), ("r.b".into(), ints(&[100, 300]))]);
    let result = execute(
        "SELECT l.a, r.b FROM l JOIN r ON l.k = r.k",
        scope(vec![("l", l), ("r", r)]),
        Options::default(),
    )
    .unwrap();
    assert_eq!(result.num_rows(), 1);
    assert_eq!(col(&result, ".a"), &[Value::Int(20)]);
    assert_eq!(col(&result, ".b"), &[Value::Int(100)]);
}

#[test]
fn distinct_preserves_row_order() {
    let t = MemTable::new(vec![("t.a".into(), ints(&[1, 1, 2]))]);
    let result = execute("SELECT DISTINCT a FROM t", scope(vec![("t", t)]), Options::default()).unwrap();
    assert_eq!(col(&result, ".a"), ints(&[1, 2]).as_slice());
}

#[test]
fn order_by_limit_and_offset() {
    let t = MemTable::new(vec![("t.a".into(), ints(&[3, 1, 2]))]);
    let result = execute(
        "SELECT a FROM t ORDER BY a DESC LIMIT 2 OFFSET 1",
        scope(vec![("t", t)]),
        Options::default(),
    )
    .unwrap();
    assert_eq!(col(&result, ".a"), ints(&[2, 1]).as_slice());
}

#[test]
fn from_dual_yields_a_single_row() {
    let result = execute("SELECT 1 AS x FROM DUAL", HashMap::new(), Options::default()).unwrap();
    assert_eq!(result.num_rows(), 1);
    assert_eq!(col(&result, ".x"), &[Value::Int(1)]);
}

#[test]
fn aggregate_over_an_empty_table() {
    let t = MemTable::new(vec![("t.a".into(), Vec::<Value>::new())]);
    let result = execute(
        "SELECT COUNT(*) AS n, SUM(a) AS s FROM t",
        scope(vec![("t", t)]),
        Options::default(),
    )
    .unwrap();
    assert_eq!(result.num_rows(), 1);
    assert_eq!(col(&result, ".n"), &[Value::Int(0)]);
    assert_eq!(col(&result, ".s"), &[Value::Null]);
}

#[test]
fn rejects_a_reference_to_an_unknown_table() {
    let err = execute("SELECT a FROM missing", HashMap::new(), Options::default()).unwrap_err();
    assert_eq!(err.kind, tabql_engine::error::ErrorKind::Plan);
}

#[test]
fn strict_mode_drops_null_padded_rows_that_fail_the_original_predicate() {
    let l = MemTable::new(vec![("l.k".into(), ints(&[1, 2])), ("l.a".into(), ints(&[10, 20]))]);
    let r = MemTable::new(vec![("r.k".into(), ints(&[1])), ("r.b".into(), ints(&[100]))]);

    let lenient = execute(
        "SELECT l.a, r.b FROM l LEFT JOIN r ON l.k = r.k",
        scope(vec![("l", l.clone()), ("r", r.clone())]),
        Options::default(),
    )
    .unwrap();
    assert_eq!(lenient.num_rows(), 2);

    // `l.k = 2` has no right-side match. Strict mode re-tests `l.k = r.k`
    // against the null-padded row, which evaluates to null (not truthy),
    // so the row is dropped.
    let options = Options { strict: true, id_generator: None };
    let strict = execute(
        "SELECT l.a, r.b FROM l LEFT JOIN r ON l.k = r.k",
        scope(vec![("l", l), ("r", r)]),
        options,
    )
    .unwrap();
    assert_eq!(strict.num_rows(), 1);
    assert_eq!(col(&strict, ".a"), &[Value::Int(10)]);
    assert_eq!(col(&strict, ".b"), &[Value::Int(100)]);
}

fn gt(col: &str, n: i64) -> Node {
    Node::BinaryOp {
        op: ">".to_string(),
        left: Box::new(Node::Name(col.to_string())),
        right: Box::new(Node::Integer(n.to_string())),
    }
}

/// `Filter(Filter(T,p),q) ≡ Filter(T, p∧q)` (spec.md §8): two chained
/// filters produce the same rows as one filter over their conjunction.
#[test]
fn chained_filters_equal_one_conjoined_filter() {
    let t = MemTable::new(vec![("t.a".into(), ints(&[1, 5, 9, 12]))]);

    let chained = Dag::Filter {
        input: Box::new(Dag::Filter {
            input: Box::new(Dag::GetTable { name: "t".to_string(), alias: None }),
            predicate: gt("t.a", 2),
        }),
        predicate: gt("t.a", 8),
    };
    let conjoined = Dag::Filter {
        input: Box::new(Dag::GetTable { name: "t".to_string(), alias: None }),
        predicate: Node::BinaryOp {
            op: "and".to_string(),
            left: Box::new(gt("t.a", 2)),
            right: Box::new(gt("t.a", 8)),
        },
    };

    let mut chained_exec = Executor::with_default_id_gen(scope(vec![("t", t.clone())]), false);
    let chained_result = chained_exec
        .run(Plan { dag: chained, order_by: Vec::new(), limit: None, offset: None })
        .unwrap();

    let mut conjoined_exec = Executor::with_default_id_gen(scope(vec![("t", t)]), false);
    let conjoined_result = conjoined_exec
        .run(Plan { dag: conjoined, order_by: Vec::new(), limit: None, offset: None })
        .unwrap();

    assert_eq!(col(&chained_result, ".a"), col(&conjoined_result, ".a"));
    assert_eq!(col(&chained_result, ".a"), ints(&[9, 12]).as_slice());
}

/// Every fresh `table_id` issued within one `execute` call is unique
/// (spec.md §8), even across several `GetTable`/`Join`/`DefineTables` nodes.
#[test]
fn table_ids_assigned_within_one_query_are_pairwise_distinct() {
    let issued = std::rc::Rc::new(std::cell::RefCell::new(Vec::new()));
    let recorder = issued.clone();
    let mut gen = tabql_engine::id_gen::NameGenerator::default();
    let id_generator: Box<dyn FnMut() -> String> = Box::new(move || {
        let id = gen.gen();
        recorder.borrow_mut().push(id.clone());
        id
    });

    let l = MemTable::new(vec![("l.k".into(), ints(&[1, 2]))]);
    let r = MemTable::new(vec![("r.k".into(), ints(&[1, 2]))]);
    let options = Options { strict: false, id_generator: Some(id_generator) };
    execute(
        "WITH u AS (SELECT l.k AS k FROM l JOIN r ON l.k = r.k) SELECT k FROM u",
        scope(vec![("l", l), ("r", r)]),
        options,
    )
    .unwrap();

    let issued = issued.borrow();
    assert!(issued.len() >= 4, "expected several table_ids to have been issued, got {issued:?}");
    let mut unique = issued.clone();
    unique.sort();
    unique.dedup();
    assert_eq!(issued.len(), unique.len(), "table_ids were reused: {issued:?}");
}
