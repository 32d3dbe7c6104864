//! Lowers a parsed AST into the logical DAG (spec.md §4.4). Column-id
//! assignment and reference normalization follow spec.md §4.4 verbatim;
//! actual schema matching against a relation's live column set happens
//! later, in [`crate::executor`], once real `table_id`s exist.

use tabql_parser::ast::Node;

use crate::backend::JoinKind;
use crate::error::Error;
use crate::id_gen::NameGenerator;
use crate::ir::{Dag, Expr, NamedExpr};

/// A wildcard projection is carried through to the executor rather than
/// expanded here, since expanding `t.*` requires the live column set of
/// `t`, which only exists once `GetTable`/`Join` have actually run.
pub const WILDCARD_SENTINEL: &str = "*";

pub struct OrderKey {
    pub expr: Expr,
    pub descending: bool,
}

pub struct Plan<T> {
    pub dag: Dag<T>,
    pub order_by: Vec<OrderKey>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// The non-`SELECT` top-level statements pass straight through planning —
/// there is no DAG to build for them, only a description of what the host
/// (or [`crate::execute`]) should do.
pub enum Statement<T> {
    Query(Plan<T>),
    CreateTableAs { name: String, query: Plan<T> },
    DropTable(Vec<String>),
    Show(Vec<String>),
    CopyFrom {
        table: String,
        path: String,
        options: Vec<(String, Node)>,
    },
    CopyTo {
        table: String,
        path: String,
        options: Vec<(String, Node)>,
    },
}

pub fn plan_statement<T>(node: &Node, id_gen: &mut NameGenerator) -> Result<Statement<T>, Error> {
    match node {
        Node::Select { .. } => Ok(Statement::Query(plan_select(node, id_gen)?)),
        Node::CreateTableAs { name, query } => Ok(Statement::CreateTableAs {
            name: name.clone(),
            query: plan_select(query, id_gen)?,
        }),
        Node::DropTable { names } => Ok(Statement::DropTable(names.clone())),
        Node::Show { tail } => Ok(Statement::Show(tail.clone())),
        Node::CopyFrom {
            table,
            path,
            options,
        } => Ok(Statement::CopyFrom {
            table: table.clone(),
            path: path.clone(),
            options: options.clone(),
        }),
        Node::CopyTo {
            source,
            path,
            options,
        } => Ok(Statement::CopyTo {
            table: source.name().unwrap_or_default().to_string(),
            path: path.clone(),
            options: options.clone(),
        }),
        other => Err(Error::new_bug(format!(
            "unexpected top-level statement node: {other:?}"
        ))),
    }
}

pub fn plan_select<T>(node: &Node, id_gen: &mut NameGenerator) -> Result<Plan<T>, Error> {
    let Node::Select {
        cte,
        quantifier,
        columns,
        from_clause,
        where_clause,
        group_by_clause,
        having_clause,
        order_by_clause,
        limit_clause,
        offset_clause,
    } = node
    else {
        return Err(Error::new_bug("plan_select called on a non-Select node"));
    };

    let mut dag = match from_clause {
        Some(fc) => plan_from_clause(fc, id_gen)?,
        None => Dag::GetTable {
            name: "dual".to_string(),
            alias: None,
        },
    };

    if let Some(where_expr) = where_clause {
        dag = Dag::Filter {
            input: Box::new(dag),
            predicate: (**where_expr).clone(),
        };
    }

    let is_aggregated = group_by_clause.is_some() || columns.iter().any(column_is_aggregate);

    if is_aggregated {
        let mut agg_columns: Vec<NamedExpr> = Vec::new();
        let mut select_exprs = Vec::new();

        for c in columns {
            match c {
                Node::Column { value, alias } => {
                    let preferred = alias.clone().or_else(|| value.name().map(terminal_owned));
                    let rewritten = rewrite_against_aggregate(
                        value,
                        preferred.as_deref(),
                        &mut agg_columns,
                        id_gen,
                    )?;
                    let col_id = preferred.unwrap_or_else(|| id_gen.gen());
                    select_exprs.push(NamedExpr {
                        col_id,
                        expr: rewritten,
                    });
                }
                Node::WildCard { .. } => {
                    return Err(Error::plan(
                        "wildcard projection is not supported in an aggregated query",
                    ))
                }
                other => {
                    return Err(Error::new_bug(format!(
                        "unexpected select-item node: {other:?}"
                    )))
                }
            }
        }

        let group_by = group_by_clause
            .as_ref()
            .map(|cols| cols.iter().map(bare_column_name).collect::<Result<Vec<_>, _>>())
            .transpose()?;

        if let Some(gb) = &group_by {
            for g in gb {
                if !agg_columns.iter().any(|c| &c.col_id == g) {
                    agg_columns.push(NamedExpr {
                        col_id: g.clone(),
                        expr: Node::Name(g.clone()),
                    });
                }
            }
        }

        let having_rewritten = having_clause
            .as_ref()
            .map(|h| rewrite_against_aggregate(h, None, &mut agg_columns, id_gen))
            .transpose()?;

        dag = Dag::Aggregate {
            input: Box::new(dag),
            columns: agg_columns,
            group_by,
        };

        if let Some(h) = having_rewritten {
            dag = Dag::Filter {
                input: Box::new(dag),
                predicate: h,
            };
        }

        dag = Dag::Transform {
            input: Box::new(dag),
            columns: select_exprs,
        };
    } else {
        let projection = plan_projection(columns, id_gen)?;
        dag = Dag::Transform {
            input: Box::new(dag),
            columns: projection,
        };
    }

    if quantifier.as_deref() == Some("distinct") {
        dag = Dag::DropDuplicates { input: Box::new(dag) };
    }

    if let Some(cte_nodes) = cte {
        let mut tables = Vec::new();
        for c in cte_nodes {
            let Node::SubQuery { query, alias } = c else {
                return Err(Error::new_bug("cte entry is not a SubQuery node"));
            };
            let name = alias
                .clone()
                .ok_or_else(|| Error::new_bug("cte entry missing its alias"))?;
            tables.push((name, plan_select(query, id_gen)?.dag));
        }
        dag = Dag::DefineTables {
            tables,
            body: Box::new(dag),
        };
    }

    let order_by = order_by_clause
        .as_ref()
        .map(|items| plan_order_by(items))
        .transpose()?
        .unwrap_or_default();
    let limit = limit_clause.as_deref().map(literal_i64).transpose()?;
    let offset = offset_clause.as_deref().map(literal_i64).transpose()?;

    Ok(Plan {
        dag,
        order_by,
        limit,
        offset,
    })
}

fn plan_from_clause<T>(fc: &Node, id_gen: &mut NameGenerator) -> Result<Dag<T>, Error> {
    let Node::FromClause { tables } = fc else {
        return Err(Error::new_bug("expected a FromClause node"));
    };
    let mut iter = tables.iter();
    let mut dag = plan_from_item(
        iter.next()
            .ok_or_else(|| Error::new_bug("FromClause has no tables"))?,
        id_gen,
    )?;
    for t in iter {
        let right = plan_from_item(t, id_gen)?;
        dag = Dag::Join {
            left: Box::new(dag),
            right: Box::new(right),
            how: JoinKind::Inner,
            on: Node::Bool("true".to_string()),
        };
    }
    Ok(dag)
}

fn plan_from_item<T>(node: &Node, id_gen: &mut NameGenerator) -> Result<Dag<T>, Error> {
    match node {
        Node::TableRef { schema, name, alias } => {
            let qualified = match schema {
                Some(s) => format!("{s}.{name}"),
                None => name.clone(),
            };
            Ok(Dag::GetTable {
                name: qualified,
                alias: alias.clone(),
            })
        }
        Node::SubQuery { query, alias } => {
            let binding_name = id_gen.gen();
            let sub_plan = plan_select(query, id_gen)?;
            Ok(Dag::DefineTables {
                tables: vec![(binding_name.clone(), sub_plan.dag)],
                body: Box::new(Dag::GetTable {
                    name: binding_name,
                    alias: alias.clone(),
                }),
            })
        }
        Node::Lateral { table } => plan_from_item(table, id_gen),
        Node::TableFunction { func, .. } => Err(Error::plan(format!(
            "table function `{func}` is not supported by the executor"
        ))),
        Node::Join { how, left, right, on } => {
            let left_dag = match left {
                Some(l) => plan_from_item(l, id_gen)?,
                None => return Err(Error::new_bug("join node missing its left side")),
            };
            let right_dag = plan_from_item(right, id_gen)?;
            Ok(Dag::Join {
                left: Box::new(left_dag),
                right: Box::new(right_dag),
                how: join_kind_from_str(how)?,
                on: (**on).clone(),
            })
        }
        other => Err(Error::new_bug(format!(
            "unexpected from-item node: {other:?}"
        ))),
    }
}

fn plan_projection(columns: &[Node], id_gen: &mut NameGenerator) -> Result<Vec<NamedExpr>, Error> {
    let mut out = Vec::new();
    for c in columns {
        match c {
            Node::WildCard { table } => out.push(NamedExpr {
                col_id: WILDCARD_SENTINEL.to_string(),
                expr: Node::WildCard {
                    table: table.clone(),
                },
            }),
            Node::Column { value, alias } => {
                let col_id = match alias {
                    Some(a) => a.clone(),
                    None => match value.name() {
                        Some(full) => terminal_owned(full),
                        None => id_gen.gen(),
                    },
                };
                out.push(NamedExpr {
                    col_id,
                    expr: (**value).clone(),
                });
            }
            other => {
                return Err(Error::new_bug(format!(
                    "unexpected select-item node: {other:?}"
                )))
            }
        }
    }
    Ok(out)
}

fn plan_order_by(items: &[Node]) -> Result<Vec<OrderKey>, Error> {
    items
        .iter()
        .map(|n| match n {
            Node::OrderBy { value, order } => Ok(OrderKey {
                expr: (**value).clone(),
                descending: order == "desc",
            }),
            other => Err(Error::new_bug(format!(
                "unexpected order-by node: {other:?}"
            ))),
        })
        .collect()
}

fn literal_i64(n: &Node) -> Result<i64, Error> {
    match n {
        Node::Integer(s) => s
            .parse::<i64>()
            .map_err(|e| Error::plan(format!("invalid integer literal: {e}"))),
        other => Err(Error::plan(format!(
            "LIMIT/OFFSET must be an integer literal, got {other:?}"
        ))),
    }
}

fn join_kind_from_str(how: &str) -> Result<JoinKind, Error> {
    match how {
        "inner" => Ok(JoinKind::Inner),
        "left" => Ok(JoinKind::Left),
        "right" => Ok(JoinKind::Right),
        "outer" => Ok(JoinKind::Outer),
        other => Err(Error::plan(format!("unsupported join type: {other}"))),
    }
}

fn terminal_owned(full: &str) -> String {
    full.rsplit('.').next().unwrap_or(full).to_string()
}

fn bare_column_name(n: &Node) -> Result<String, Error> {
    match n {
        Node::Name(s) => Ok(s.clone()),
        other => Err(Error::plan(format!(
            "expected a bare column reference, got {other:?}"
        ))),
    }
}

fn column_is_aggregate(c: &Node) -> bool {
    match c {
        Node::Column { value, .. } => is_aggregate_call(value),
        _ => false,
    }
}

fn is_aggregate_call(n: &Node) -> bool {
    matches!(n, Node::CallSetFunction { .. })
        || matches!(n, Node::Call { func, args } if func == "count" && matches!(args.as_slice(), [Node::WildCard { .. }]))
}

fn validate_aggregate_arg(call: &Node) -> Result<(), Error> {
    match call {
        Node::CallSetFunction { arg, quantifier, .. } => {
            if quantifier.is_some() {
                return Err(Error::plan(
                    "aggregate quantifiers (DISTINCT/ALL) are not supported",
                ));
            }
            match arg.as_ref() {
                Node::Name(_) => Ok(()),
                other => Err(Error::plan(format!(
                    "indirect aggregation is not supported: {other:?}"
                ))),
            }
        }
        Node::Call { func, args } if func == "count" => match args.as_slice() {
            [Node::WildCard { .. }] => Ok(()),
            _ => Err(Error::plan("count() only supports count(*)")),
        },
        _ => Ok(()),
    }
}

/// Rewrites `expr` for use inside an aggregated query: every aggregate call
/// and every bare group-key column reference becomes a `Name` pointing at a
/// fresh `Aggregate` output column, and the corresponding [`NamedExpr`] is
/// appended to `agg_columns`. `preferred_id` is only honored at the top of
/// the recursion (a `Column`'s own alias), never for a nested sub-expression.
fn rewrite_against_aggregate(
    expr: &Node,
    preferred_id: Option<&str>,
    agg_columns: &mut Vec<NamedExpr>,
    id_gen: &mut NameGenerator,
) -> Result<Node, Error> {
    if is_aggregate_call(expr) {
        validate_aggregate_arg(expr)?;
        let col_id = preferred_id
            .map(str::to_string)
            .unwrap_or_else(|| id_gen.gen());
        agg_columns.push(NamedExpr {
            col_id: col_id.clone(),
            expr: expr.clone(),
        });
        return Ok(Node::Name(col_id));
    }
    match expr {
        Node::Name(full) => {
            let col_id = preferred_id
                .map(str::to_string)
                .unwrap_or_else(|| terminal_owned(full));
            if !agg_columns.iter().any(|c| c.col_id == col_id) {
                agg_columns.push(NamedExpr {
                    col_id: col_id.clone(),
                    expr: expr.clone(),
                });
            }
            Ok(Node::Name(col_id))
        }
        Node::BinaryOp { op, left, right } => Ok(Node::BinaryOp {
            op: op.clone(),
            left: Box::new(rewrite_against_aggregate(left, None, agg_columns, id_gen)?),
            right: Box::new(rewrite_against_aggregate(right, None, agg_columns, id_gen)?),
        }),
        Node::UnaryOp { op, arg } => Ok(Node::UnaryOp {
            op: op.clone(),
            arg: Box::new(rewrite_against_aggregate(arg, None, agg_columns, id_gen)?),
        }),
        literal @ (Node::Null | Node::Integer(_) | Node::Float(_) | Node::Bool(_) | Node::String(_)) => {
            Ok(literal.clone())
        }
        other => Err(Error::plan(format!(
            "unsupported expression shape in an aggregated query: {other:?}"
        ))),
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::ir::Dag;

    fn parse(sql: &str) -> Node {
        tabql_parser::parse(sql).unwrap()
    }

    #[test]
    fn plans_simple_select_into_gettable_and_transform() {
        let node = parse("select a, b + 1 as c from t");
        let mut gen = NameGenerator::default();
        let plan = plan_select::<()>(&node, &mut gen).unwrap();
        let Dag::Transform { input, columns } = plan.dag else {
            panic!("expected a Transform at the top of the plan");
        };
        assert_eq!(columns.len(), 2);
        assert_eq!(columns[0].col_id, "a");
        assert_eq!(columns[1].col_id, "c");
        assert!(matches!(*input, Dag::GetTable { .. }));
    }

    #[test]
    fn plans_group_by_into_aggregate_then_transform() {
        let node = parse("select a, sum(b) as s from t group by a");
        let mut gen = NameGenerator::default();
        let plan = plan_select::<()>(&node, &mut gen).unwrap();
        let Dag::Transform { input, .. } = plan.dag else {
            panic!("expected a Transform at the top of the plan");
        };
        let Dag::Aggregate { group_by, columns, .. } = *input else {
            panic!("expected an Aggregate under the Transform");
        };
        assert_eq!(group_by, Some(vec!["a".to_string()]));
        assert!(columns.iter().any(|c| c.col_id == "s"));
    }

    #[test]
    fn rejects_indirect_aggregation() {
        let node = parse("select sum(b + 1) as s from t");
        let mut gen = NameGenerator::default();
        assert!(plan_select::<()>(&node, &mut gen).is_err());
    }

    #[test]
    fn plans_join_chain_left_nested() {
        let node = parse("select l.a from l join r on l.k = r.k");
        let mut gen = NameGenerator::default();
        let plan = plan_select::<()>(&node, &mut gen).unwrap();
        let Dag::Transform { input, .. } = plan.dag else {
            panic!("expected a Transform at the top of the plan");
        };
        assert!(matches!(*input, Dag::Join { .. }));
    }
}
