//! Evaluation of `Aggregate` DAG nodes: scalar (no `GROUP BY`) and grouped
//! aggregation, both built on the backend's six scalar-aggregate functions.

use std::collections::{HashMap, HashSet};

use itertools::Itertools;
use once_cell::sync::Lazy;
use tabql_parser::ast::Node;

use super::expr::resolve_column;
use crate::backend::{Table, Value};
use crate::error::Error;
use crate::ir::{Expr, NamedExpr};

/// The allowed set-function name set (spec.md §4.4): anything else the
/// grammar accepts (`EVERY`, `STDDEV_POP`, ...) is parsed but rejected here.
static SUPPORTED_SET_FUNCTIONS: Lazy<HashSet<&'static str>> =
    Lazy::new(|| ["sum", "avg", "min", "max", "count", "first_value"].into_iter().collect());

fn apply_set_function<T: Table>(func: &str, col: &[Value]) -> Result<Value, Error> {
    match func {
        "sum" => Ok(T::sum(col)),
        "avg" => Ok(T::mean(col)),
        "min" => Ok(T::min(col)),
        "max" => Ok(T::max(col)),
        "count" => Ok(T::count(col)),
        "first_value" => Ok(T::first(col)),
        other => Err(Error::plan(format!(
            "unsupported set function `{other}` (supported: {})",
            SUPPORTED_SET_FUNCTIONS.iter().sorted().join(", ")
        ))),
    }
}

/// Evaluates one aggregate-stage column expression over either the whole
/// table (`rows = None`) or one group's row indices.
fn eval_aggregate_expr<T: Table>(
    table: &T,
    qualifiers: &HashMap<String, String>,
    expr: &Expr,
    rows: Option<&[usize]>,
) -> Result<Value, Error> {
    match expr {
        Node::CallSetFunction { func, arg, .. } => {
            let Node::Name(col_ref) = arg.as_ref() else {
                return Err(Error::new_bug("aggregate argument is not a bare column reference"));
            };
            let resolved = resolve_column(table, qualifiers, col_ref)?;
            let full_col = table.column(&resolved)?;
            let subset: Vec<Value> = match rows {
                Some(idxs) => idxs.iter().map(|&i| full_col[i].clone()).collect(),
                None => full_col.to_vec(),
            };
            apply_set_function::<T>(func, &subset)
        }
        Node::Call { func, args } if func == "count" && matches!(args.as_slice(), [Node::WildCard { .. }]) => {
            let count = rows.map(|r| r.len()).unwrap_or_else(|| table.num_rows());
            Ok(Value::Int(count as i64))
        }
        // A bare group-key passthrough: every row in the group shares the
        // same value, so any representative (the first) will do.
        Node::Name(full) => {
            let resolved = resolve_column(table, qualifiers, full)?;
            let col = table.column(&resolved)?;
            let idx = rows.and_then(|r| r.first().copied()).unwrap_or(0);
            Ok(col.get(idx).cloned().unwrap_or(Value::Null))
        }
        other => Err(Error::new_bug(format!(
            "aggregate column is neither a set-function call nor a bare name: {other:?}"
        ))),
    }
}

pub fn eval_aggregate<T: Table>(
    table: &T,
    qualifiers: &HashMap<String, String>,
    fresh_id: &str,
    columns: &[NamedExpr],
    group_by: Option<&[String]>,
) -> Result<T, Error> {
    match group_by {
        None => {
            let mut out = Vec::with_capacity(columns.len());
            for ne in columns {
                let value = eval_aggregate_expr(table, qualifiers, &ne.expr, None)?;
                out.push((format!("{fresh_id}.{}", ne.col_id), vec![value]));
            }
            Ok(T::from_columns(out))
        }
        Some(group_by) => {
            let resolved_gb: Vec<String> = group_by
                .iter()
                .map(|g| resolve_column(table, qualifiers, g))
                .collect::<Result<_, _>>()?;
            let n = table.num_rows();

            // Group rows by key, preserving first-seen order. `Value` isn't
            // `Hash` (floats), so the index is keyed on a rendered string.
            let mut order: Vec<Vec<usize>> = Vec::new();
            let mut index: HashMap<Vec<String>, usize> = HashMap::new();
            for row in 0..n {
                let key: Vec<String> = resolved_gb
                    .iter()
                    .map(|c| format!("{:?}", table.column(c).expect("resolved column exists")[row]))
                    .collect();
                match index.get(&key) {
                    Some(&gi) => order[gi].push(row),
                    None => {
                        index.insert(key, order.len());
                        order.push(vec![row]);
                    }
                }
            }

            let mut out: Vec<(String, Vec<Value>)> = columns
                .iter()
                .map(|ne| (format!("{fresh_id}.{}", ne.col_id), Vec::with_capacity(order.len())))
                .collect();
            for rows in &order {
                for (i, ne) in columns.iter().enumerate() {
                    let value = eval_aggregate_expr(table, qualifiers, &ne.expr, Some(rows))?;
                    out[i].1.push(value);
                }
            }
            Ok(T::from_columns(out))
        }
    }
}
