//! Scalar expression evaluation: turns an [`Expr`] into a column (one
//! [`Value`] per input row) against a table and its qualifier map.

use std::cmp::Ordering;
use std::collections::HashMap;

use tabql_parser::ast::Node;

use crate::backend::{Table, Value};
use crate::error::Error;
use crate::ir::Expr;

/// Resolves a user-facing column reference (`"l.a"` or bare `"a"`) against a
/// table's physical `table_id.column_id` names. `qualifiers` maps aliases
/// (and table names) introduced by `GetTable`/`Join` to the physical
/// `table_id` prefix currently in scope.
pub fn resolve_column<T: Table>(
    table: &T,
    qualifiers: &HashMap<String, String>,
    name: &str,
) -> Result<String, Error> {
    let cols = table.columns();
    if let Some((qual, col)) = name.rsplit_once('.') {
        let table_id = qualifiers.get(qual).cloned().unwrap_or_else(|| qual.to_string());
        let full = format!("{table_id}.{col}");
        if cols.iter().any(|c| c == &full) {
            Ok(full)
        } else {
            Err(Error::plan(format!("unknown column: {name}")))
        }
    } else {
        let suffix = format!(".{name}");
        let matches: Vec<&String> = cols.iter().filter(|c| c.ends_with(&suffix)).collect();
        match matches.len() {
            1 => Ok(matches[0].clone()),
            0 => Err(Error::plan(format!("unknown column: {name}"))),
            _ => Err(Error::plan(format!("ambiguous column reference: {name}"))),
        }
    }
}

pub fn eval_expr<T: Table>(
    table: &T,
    qualifiers: &HashMap<String, String>,
    expr: &Expr,
) -> Result<Vec<Value>, Error> {
    let n = table.num_rows();
    match expr {
        Node::Null => Ok(vec![Value::Null; n]),
        Node::Integer(s) => {
            let v = s
                .parse::<i64>()
                .map_err(|e| Error::plan(format!("invalid integer literal `{s}`: {e}")))?;
            Ok(vec![Value::Int(v); n])
        }
        Node::Float(s) => {
            let v = s
                .parse::<f64>()
                .map_err(|e| Error::plan(format!("invalid float literal `{s}`: {e}")))?;
            Ok(vec![Value::Float(v); n])
        }
        Node::Bool(s) => Ok(vec![Value::Bool(s.eq_ignore_ascii_case("true")); n]),
        Node::String(s) => {
            let inner = s.get(1..s.len().saturating_sub(1)).unwrap_or("");
            Ok(vec![Value::Str(inner.replace("''", "'")); n])
        }
        Node::Name(full) => {
            let resolved = resolve_column(table, qualifiers, full)?;
            Ok(table.column(&resolved)?.to_vec())
        }
        Node::BinaryOp { op, left, right } => {
            let l = eval_expr(table, qualifiers, left)?;
            let r = eval_expr(table, qualifiers, right)?;
            l.iter().zip(r.iter()).map(|(a, b)| apply_binary(op, a, b)).collect()
        }
        Node::UnaryOp { op, arg } => {
            let a = eval_expr(table, qualifiers, arg)?;
            a.iter().map(|v| apply_unary(op, v)).collect()
        }
        Node::Cast { value, type_name } => {
            let v = eval_expr(table, qualifiers, value)?;
            v.iter().map(|x| cast_value(x, type_name)).collect()
        }
        Node::Call { func, args } => {
            let arg_cols: Vec<Vec<Value>> = args
                .iter()
                .map(|a| eval_expr(table, qualifiers, a))
                .collect::<Result<_, _>>()?;
            eval_call(func, &arg_cols, n)
        }
        Node::CaseExpression { cases, else_ } => {
            let mut result: Vec<Option<Value>> = vec![None; n];
            for case in cases {
                let Node::Case { condition, result: branch } = case else {
                    return Err(Error::new_bug("CaseExpression entry is not a Case node"));
                };
                let cond = eval_expr(table, qualifiers, condition)?;
                let vals = eval_expr(table, qualifiers, branch)?;
                for i in 0..n {
                    if result[i].is_none() && cond[i].is_truthy() {
                        result[i] = Some(vals[i].clone());
                    }
                }
            }
            let else_vals = match else_ {
                Some(e) => Some(eval_expr(table, qualifiers, e)?),
                None => None,
            };
            Ok((0..n)
                .map(|i| {
                    result[i]
                        .clone()
                        .or_else(|| else_vals.as_ref().map(|v| v[i].clone()))
                        .unwrap_or(Value::Null)
                })
                .collect())
        }
        Node::Case { .. } => Err(Error::new_bug("bare Case node outside a CaseExpression")),
        Node::CallSetFunction { .. } => {
            Err(Error::plan("aggregate call outside an aggregated query context"))
        }
        Node::CallAnalyticsFunction { .. } => {
            Err(Error::plan("analytic (OVER (...)) functions are parsed but not evaluated"))
        }
        Node::WildCard { .. } => Err(Error::new_bug("wildcard expression reached eval_expr directly")),
        other => Err(Error::plan(format!("unsupported expression: {other:?}"))),
    }
}

/// A predicate column, coerced to `bool` (`NULL` is treated as not-matching).
pub fn eval_bool<T: Table>(
    table: &T,
    qualifiers: &HashMap<String, String>,
    expr: &Expr,
) -> Result<Vec<bool>, Error> {
    eval_expr(table, qualifiers, expr)?
        .into_iter()
        .map(|v| match v {
            Value::Bool(b) => Ok(b),
            Value::Null => Ok(false),
            other => Err(Error::plan(format!("predicate did not evaluate to a boolean: {other:?}"))),
        })
        .collect()
}

fn numeric_op(
    l: &Value,
    r: &Value,
    int_f: impl Fn(i64, i64) -> i64,
    float_f: impl Fn(f64, f64) -> f64,
) -> Result<Value, Error> {
    match (l, r) {
        (Value::Int(a), Value::Int(b)) => Ok(Value::Int(int_f(*a, *b))),
        _ => {
            let a = l.as_f64().ok_or_else(|| Error::plan("expected a numeric operand"))?;
            let b = r.as_f64().ok_or_else(|| Error::plan("expected a numeric operand"))?;
            Ok(Value::Float(float_f(a, b)))
        }
    }
}

fn float_op(l: &Value, r: &Value, f: impl Fn(f64, f64) -> f64) -> Result<Value, Error> {
    let a = l.as_f64().ok_or_else(|| Error::plan("expected a numeric operand"))?;
    let b = r.as_f64().ok_or_else(|| Error::plan("expected a numeric operand"))?;
    Ok(Value::Float(f(a, b)))
}

fn int_op(l: &Value, r: &Value, f: impl Fn(i64, i64) -> i64) -> Result<Value, Error> {
    match (l, r) {
        (Value::Int(a), Value::Int(b)) => Ok(Value::Int(f(*a, *b))),
        _ => Err(Error::plan("bitwise operators require integer operands")),
    }
}

pub fn values_equal(l: &Value, r: &Value) -> bool {
    match (l, r) {
        (Value::Int(a), Value::Int(b)) => a == b,
        (Value::Str(a), Value::Str(b)) => a == b,
        (Value::Bool(a), Value::Bool(b)) => a == b,
        _ => l.as_f64().zip(r.as_f64()).map(|(a, b)| a == b).unwrap_or(false),
    }
}

pub fn compare_values(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Null, Value::Null) => Ordering::Equal,
        (Value::Null, _) => Ordering::Greater,
        (_, Value::Null) => Ordering::Less,
        (Value::Str(x), Value::Str(y)) => x.cmp(y),
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        _ => a.as_f64().partial_cmp(&b.as_f64()).unwrap_or(Ordering::Equal),
    }
}

fn apply_unary(op: &str, v: &Value) -> Result<Value, Error> {
    if matches!(v, Value::Null) {
        return Ok(Value::Null);
    }
    match op {
        "+" => Ok(v.clone()),
        "-" => match v {
            Value::Int(i) => Ok(Value::Int(-i)),
            Value::Float(f) => Ok(Value::Float(-f)),
            _ => Err(Error::plan("unary `-` requires a numeric operand")),
        },
        "~" => match v {
            Value::Int(i) => Ok(Value::Int(!i)),
            _ => Err(Error::plan("`~` requires an integer operand")),
        },
        "not" => match v {
            Value::Bool(b) => Ok(Value::Bool(!b)),
            _ => Err(Error::plan("`NOT` requires a boolean operand")),
        },
        other => Err(Error::plan(format!("unsupported unary operator: {other}"))),
    }
}

fn apply_binary(op: &str, l: &Value, r: &Value) -> Result<Value, Error> {
    if matches!(l, Value::Null) || matches!(r, Value::Null) {
        return Ok(Value::Null);
    }
    match op {
        "+" => numeric_op(l, r, |a, b| a.wrapping_add(b), |a, b| a + b),
        "-" => numeric_op(l, r, |a, b| a.wrapping_sub(b), |a, b| a - b),
        "*" => numeric_op(l, r, |a, b| a.wrapping_mul(b), |a, b| a * b),
        "/" => float_op(l, r, |a, b| a / b),
        "%" => match (l, r) {
            (Value::Int(a), Value::Int(0)) => {
                let _ = a;
                Err(Error::backend("division by zero"))
            }
            (Value::Int(a), Value::Int(b)) => Ok(Value::Int(a % b)),
            _ => float_op(l, r, |a, b| a % b),
        },
        "^" => float_op(l, r, f64::powf),
        "&" => int_op(l, r, |a, b| a & b),
        "|" => int_op(l, r, |a, b| a | b),
        "#" => int_op(l, r, |a, b| a ^ b),
        "<<" => int_op(l, r, |a, b| a << b),
        ">>" => int_op(l, r, |a, b| a >> b),
        "||" => match (l, r) {
            (Value::Str(a), Value::Str(b)) => Ok(Value::Str(format!("{a}{b}"))),
            _ => Err(Error::plan("`||` requires string operands")),
        },
        "=" => Ok(Value::Bool(values_equal(l, r))),
        "!=" | "<>" => Ok(Value::Bool(!values_equal(l, r))),
        ">" => Ok(Value::Bool(compare_values(l, r) == Ordering::Greater)),
        "<" => Ok(Value::Bool(compare_values(l, r) == Ordering::Less)),
        ">=" | "!<" => Ok(Value::Bool(compare_values(l, r) != Ordering::Less)),
        "<=" | "!>" => Ok(Value::Bool(compare_values(l, r) != Ordering::Greater)),
        "and" => match (l, r) {
            (Value::Bool(a), Value::Bool(b)) => Ok(Value::Bool(*a && *b)),
            _ => Err(Error::plan("`AND` requires boolean operands")),
        },
        "or" => match (l, r) {
            (Value::Bool(a), Value::Bool(b)) => Ok(Value::Bool(*a || *b)),
            _ => Err(Error::plan("`OR` requires boolean operands")),
        },
        "like" => match (l, r) {
            (Value::Str(a), Value::Str(b)) => Ok(Value::Bool(like_match(a, b))),
            _ => Err(Error::plan("`LIKE` requires string operands")),
        },
        "not like" => match (l, r) {
            (Value::Str(a), Value::Str(b)) => Ok(Value::Bool(!like_match(a, b))),
            _ => Err(Error::plan("`NOT LIKE` requires string operands")),
        },
        // The grammar treats `IN`/`NOT IN` as a plain binary separator rather
        // than a list construct, so the right side is a single value here.
        "in" => Ok(Value::Bool(values_equal(l, r))),
        "not in" => Ok(Value::Bool(!values_equal(l, r))),
        other => Err(Error::plan(format!("unsupported operator: {other}"))),
    }
}

fn like_match(text: &str, pattern: &str) -> bool {
    fn helper(t: &[char], p: &[char]) -> bool {
        match p.first() {
            None => t.is_empty(),
            Some('%') => helper(t, &p[1..]) || (!t.is_empty() && helper(&t[1..], p)),
            Some('_') => !t.is_empty() && helper(&t[1..], &p[1..]),
            Some(c) => !t.is_empty() && t[0] == *c && helper(&t[1..], &p[1..]),
        }
    }
    let t: Vec<char> = text.chars().collect();
    let p: Vec<char> = pattern.chars().collect();
    helper(&t, &p)
}

fn cast_value(v: &Value, type_name: &str) -> Result<Value, Error> {
    if matches!(v, Value::Null) {
        return Ok(Value::Null);
    }
    let t = type_name.to_lowercase();
    if t.starts_with("int") || t.starts_with("bigint") || t.starts_with("smallint") {
        let i = match v {
            Value::Int(i) => *i,
            Value::Float(f) => *f as i64,
            Value::Str(s) => s
                .trim()
                .parse()
                .map_err(|_| Error::plan(format!("cannot cast `{s}` to {type_name}")))?,
            Value::Bool(b) => *b as i64,
            Value::Null => unreachable!(),
        };
        Ok(Value::Int(i))
    } else if t.starts_with("float")
        || t.starts_with("double")
        || t.starts_with("real")
        || t.starts_with("numeric")
        || t.starts_with("decimal")
    {
        let f = match v {
            Value::Int(i) => *i as f64,
            Value::Float(f) => *f,
            Value::Str(s) => s
                .trim()
                .parse()
                .map_err(|_| Error::plan(format!("cannot cast `{s}` to {type_name}")))?,
            Value::Bool(b) => {
                if *b {
                    1.0
                } else {
                    0.0
                }
            }
            Value::Null => unreachable!(),
        };
        Ok(Value::Float(f))
    } else if t.starts_with("bool") {
        let b = match v {
            Value::Bool(b) => *b,
            Value::Int(i) => *i != 0,
            Value::Str(s) => matches!(s.to_lowercase().as_str(), "true" | "t" | "1"),
            _ => return Err(Error::plan(format!("cannot cast to {type_name}"))),
        };
        Ok(Value::Bool(b))
    } else if t.starts_with("text") || t.starts_with("varchar") || t.starts_with("char") || t.starts_with("string") {
        let s = match v {
            Value::Str(s) => s.clone(),
            Value::Int(i) => i.to_string(),
            Value::Float(f) => f.to_string(),
            Value::Bool(b) => b.to_string(),
            Value::Null => unreachable!(),
        };
        Ok(Value::Str(s))
    } else {
        Err(Error::plan(format!("unsupported cast target type: {type_name}")))
    }
}

fn eval_call(func: &str, arg_cols: &[Vec<Value>], n: usize) -> Result<Vec<Value>, Error> {
    match func {
        "trim_both" | "trim_leading" | "trim_trailing" => {
            let (chars_col, value_col) = if arg_cols.len() == 2 {
                (Some(&arg_cols[0]), &arg_cols[1])
            } else {
                (None, &arg_cols[0])
            };
            let mut out = Vec::with_capacity(n);
            for i in 0..n {
                let Value::Str(s) = &value_col[i] else {
                    return Err(Error::plan(format!("{func} expects a string argument")));
                };
                let pat: Vec<char> = match chars_col {
                    Some(col) => match &col[i] {
                        Value::Str(c) => c.chars().collect(),
                        _ => return Err(Error::plan(format!("{func} expects a string trim-set"))),
                    },
                    None => vec![' '],
                };
                let trimmed = match func {
                    "trim_both" => s.trim_matches(|c| pat.contains(&c)),
                    "trim_leading" => s.trim_start_matches(|c| pat.contains(&c)),
                    "trim_trailing" => s.trim_end_matches(|c| pat.contains(&c)),
                    _ => unreachable!(),
                };
                out.push(Value::Str(trimmed.to_string()));
            }
            Ok(out)
        }
        "position" => {
            let needle = &arg_cols[0];
            let haystack = &arg_cols[1];
            let mut out = Vec::with_capacity(n);
            for i in 0..n {
                let (Value::Str(needle), Value::Str(haystack)) = (&needle[i], &haystack[i]) else {
                    return Err(Error::plan("POSITION expects string arguments"));
                };
                let pos = haystack
                    .find(needle.as_str())
                    .map(|byte| haystack[..byte].chars().count() as i64 + 1)
                    .unwrap_or(0);
                out.push(Value::Int(pos));
            }
            Ok(out)
        }
        other => Err(Error::plan(format!("unknown function: {other}"))),
    }
}
