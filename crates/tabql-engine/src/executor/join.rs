//! Evaluation of `Join` DAG nodes: equi-join detection against the `on`
//! clause, falling back to a generic cross-product + `Filter` for anything
//! that isn't a conjunction of column equalities.

use std::collections::HashMap;

use tabql_parser::ast::Node;

use super::expr::resolve_column;
use crate::backend::Table;
use crate::error::Error;
use crate::ir::Expr;

fn conjuncts(expr: &Expr) -> Vec<&Expr> {
    match expr {
        Node::BinaryOp { op, left, right } if op == "and" => {
            let mut out = conjuncts(left);
            out.extend(conjuncts(right));
            out
        }
        other => vec![other],
    }
}

/// Tries to read `on` as a conjunction of `left_col = right_col` equalities,
/// one column from each side. Returns `None` (rather than erroring) on any
/// shape it doesn't recognize, signaling the cross-product fallback.
pub fn extract_equi_join<T: Table>(
    on: &Expr,
    left: &T,
    left_q: &HashMap<String, String>,
    right: &T,
    right_q: &HashMap<String, String>,
) -> Option<(Vec<String>, Vec<String>)> {
    let mut left_keys = Vec::new();
    let mut right_keys = Vec::new();
    for conjunct in conjuncts(on) {
        let Node::BinaryOp { op, left: l, right: r } = conjunct else {
            return None;
        };
        if op != "=" {
            return None;
        }
        let (Node::Name(a), Node::Name(b)) = (l.as_ref(), r.as_ref()) else {
            return None;
        };
        if let (Ok(lc), Ok(rc)) = (resolve_column(left, left_q, a), resolve_column(right, right_q, b)) {
            left_keys.push(lc);
            right_keys.push(rc);
        } else if let (Ok(lc), Ok(rc)) = (resolve_column(left, left_q, b), resolve_column(right, right_q, a)) {
            left_keys.push(lc);
            right_keys.push(rc);
        } else {
            return None;
        }
    }
    Some((left_keys, right_keys))
}

/// Cartesian product of two tables, built only from the `Table` contract
/// (no backend-specific support needed) for the non-equi-join fallback.
pub fn cross_join<T: Table>(left: &T, right: &T) -> T {
    let lrows = left.num_rows();
    let rrows = right.num_rows();
    let mut columns = Vec::new();
    for name in left.columns() {
        let col = left.column(&name).expect("column exists");
        let mut out = Vec::with_capacity(lrows * rrows);
        for v in col {
            for _ in 0..rrows {
                out.push(v.clone());
            }
        }
        columns.push((name, out));
    }
    for name in right.columns() {
        let col = right.column(&name).expect("column exists");
        let mut out = Vec::with_capacity(lrows * rrows);
        for _ in 0..lrows {
            out.extend(col.iter().cloned());
        }
        columns.push((name, out));
    }
    T::from_columns(columns)
}

pub fn merge_qualifiers(
    left: &HashMap<String, String>,
    right: &HashMap<String, String>,
) -> HashMap<String, String> {
    let mut out = left.clone();
    out.extend(right.clone());
    out
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::memtable::MemTable;

    #[test]
    fn cross_join_produces_the_product_of_both_row_sets() {
        use crate::backend::Value;
        let l = MemTable::new(vec![("l.a".into(), vec![Value::Int(1), Value::Int(2)])]);
        let r = MemTable::new(vec![("r.b".into(), vec![Value::Int(10), Value::Int(20), Value::Int(30)])]);
        let joined = cross_join(&l, &r);
        assert_eq!(joined.num_rows(), 6);
        assert_eq!(
            joined.column("l.a").unwrap(),
            &[
                Value::Int(1),
                Value::Int(1),
                Value::Int(1),
                Value::Int(2),
                Value::Int(2),
                Value::Int(2)
            ]
        );
    }
}
