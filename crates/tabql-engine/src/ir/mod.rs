//! The logical DAG (spec.md §3/§4.4): the small set of relational operators
//! the planner lowers a `Select` into and the executor evaluates. Generic
//! over the backend table type so `Literal` can embed one directly.

use tabql_parser::ast::Node;

use crate::backend::JoinKind;

/// A value expression attached to a DAG node — a projection's computed
/// column, a filter predicate, a join's `on` clause. Reuses the parser's
/// `Node` type directly: the planner only needs to *read* these (resolving
/// `Name` references against the input relation's columns), never to
/// reparse them.
pub type Expr = Node;

#[derive(Debug, Clone)]
pub struct NamedExpr {
    pub col_id: String,
    pub expr: Expr,
}

#[derive(Clone)]
pub enum Dag<T> {
    /// Injects a materialized table, used for the reference parameter of a
    /// bound CTE and for tests that want to splice in a fixed result.
    Literal(T),
    /// Resolves a name against the current scope, or produces the
    /// canonical 1-row 0-column table when `name == "dual"`.
    GetTable {
        name: String,
        alias: Option<String>,
    },
    /// Introduces CTE bindings before evaluating `body`.
    DefineTables {
        tables: Vec<(String, Dag<T>)>,
        body: Box<Dag<T>>,
    },
    /// Projection/computation: replaces the input's column set.
    Transform {
        input: Box<Dag<T>>,
        columns: Vec<NamedExpr>,
    },
    /// Row selection: preserves the input's column set.
    Filter {
        input: Box<Dag<T>>,
        predicate: Expr,
    },
    /// Distinct: preserves the input's column set.
    DropDuplicates { input: Box<Dag<T>> },
    /// Grouped or scalar aggregation.
    Aggregate {
        input: Box<Dag<T>>,
        columns: Vec<NamedExpr>,
        group_by: Option<Vec<String>>,
    },
    /// Produces the disjoint union of its inputs' columns.
    Join {
        left: Box<Dag<T>>,
        right: Box<Dag<T>>,
        how: JoinKind,
        on: Expr,
    },
}
