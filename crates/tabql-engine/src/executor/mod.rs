//! Evaluates a [`Dag`] against a scope of backend tables (spec.md §4.5).
//!
//! Every node kind is handled by its own `eval_*` method; all of them return
//! the resulting table together with a *qualifier map* — aliases/table names
//! currently in scope, mapped to the physical `table_id` prefix their
//! columns carry. `GetTable` introduces a fresh mapping; `Join` unions its
//! inputs'; `Transform`/`Aggregate` collapse to just their own fresh id,
//! since a `Transform`'s output is only ever referenced again through a
//! `GetTable` rebranding (subqueries, CTEs) that replaces the mapping wholesale.

mod aggregate;
mod expr;
mod join;

use std::collections::HashMap;

use crate::backend::Table;
use crate::error::Error;
use crate::id_gen::NameGenerator;
use crate::ir::Dag;
use crate::planner::{OrderKey, Plan};

use expr::{compare_values, eval_bool, eval_expr};

pub struct Executor<T: Table> {
    scope: HashMap<String, T>,
    id_gen: Box<dyn FnMut() -> String>,
    strict: bool,
}

impl<T: Table> Executor<T> {
    pub fn new(scope: HashMap<String, T>, id_gen: Box<dyn FnMut() -> String>, strict: bool) -> Self {
        Executor { scope, id_gen, strict }
    }

    pub fn with_default_id_gen(scope: HashMap<String, T>, strict: bool) -> Self {
        let mut gen = NameGenerator::default();
        Self::new(scope, Box::new(move || gen.gen()), strict)
    }

    fn fresh_id(&mut self) -> String {
        (self.id_gen)()
    }

    /// Runs a full plan: evaluates the DAG, then applies `ORDER BY`/`LIMIT`/
    /// `OFFSET` as a post-processing pass — these aren't DAG node kinds
    /// (spec.md §3 names exactly eight), so they live on `Plan` instead.
    pub fn run(&mut self, plan: Plan<T>) -> Result<T, Error> {
        let (table, qualifiers) = self.eval_rel(&plan.dag)?;
        apply_order_limit_offset(table, &qualifiers, &plan.order_by, plan.limit, plan.offset)
    }

    fn eval_rel(&mut self, dag: &Dag<T>) -> Result<(T, HashMap<String, String>), Error> {
        match dag {
            Dag::Literal(t) => {
                log::debug!("evaluating Literal");
                let mut qualifiers = HashMap::new();
                for name in t.columns() {
                    if let Some((prefix, _)) = name.split_once('.') {
                        qualifiers.insert(prefix.to_string(), prefix.to_string());
                    }
                }
                Ok((t.clone(), qualifiers))
            }
            Dag::GetTable { name, alias } => self.eval_get_table(name, alias.as_deref()),
            Dag::DefineTables { tables, body } => self.eval_define_tables(tables, body),
            Dag::Transform { input, columns } => self.eval_transform(input, columns),
            Dag::Filter { input, predicate } => self.eval_filter(input, predicate),
            Dag::DropDuplicates { input } => {
                log::debug!("evaluating DropDuplicates");
                let (t, qualifiers) = self.eval_rel(input)?;
                Ok((t.drop_duplicates(), qualifiers))
            }
            Dag::Aggregate { input, columns, group_by } => {
                self.eval_aggregate(input, columns, group_by.as_deref())
            }
            Dag::Join { left, right, how, on } => self.eval_join(left, right, *how, on),
        }
    }

    fn eval_get_table(&mut self, name: &str, alias: Option<&str>) -> Result<(T, HashMap<String, String>), Error> {
        log::debug!("evaluating GetTable({name})");
        let table = if name.eq_ignore_ascii_case("dual") {
            T::dual()
        } else {
            self.scope
                .get(name)
                .cloned()
                .ok_or_else(|| Error::plan(format!("unknown table: {name}")))?
        };

        let fresh_id = self.fresh_id();
        let old_columns = table.columns();
        let rebranded = if old_columns.is_empty() {
            // `from_columns(vec![])` can't recover a nonzero row count (the
            // `DUAL` placeholder relies on exactly that), so a zero-column
            // table is passed through rather than reconstructed.
            table
        } else {
            let renamed = old_columns
                .into_iter()
                .map(|old_full| {
                    let col_id = old_full.rsplit('.').next().unwrap_or(&old_full).to_string();
                    let data = table.column(&old_full).expect("column exists").to_vec();
                    (format!("{fresh_id}.{col_id}"), data)
                })
                .collect();
            T::from_columns(renamed)
        };

        let branding = alias.unwrap_or(name).to_string();
        let mut qualifiers = HashMap::new();
        qualifiers.insert(branding, fresh_id.clone());
        qualifiers.insert(fresh_id.clone(), fresh_id);
        Ok((rebranded, qualifiers))
    }

    fn eval_define_tables(
        &mut self,
        tables: &[(String, Dag<T>)],
        body: &Dag<T>,
    ) -> Result<(T, HashMap<String, String>), Error> {
        log::debug!("evaluating DefineTables ({} binding(s))", tables.len());
        // Scopes are immutable; a derived scope is a shallow copy plus
        // insertion, restored once `body` has been evaluated.
        let saved_scope = self.scope.clone();
        for (name, sub) in tables {
            let (t, _) = self.eval_rel(sub)?;
            self.scope.insert(name.clone(), t);
        }
        let result = self.eval_rel(body);
        self.scope = saved_scope;
        result
    }

    fn eval_transform(
        &mut self,
        input: &Dag<T>,
        columns: &[crate::ir::NamedExpr],
    ) -> Result<(T, HashMap<String, String>), Error> {
        log::debug!("evaluating Transform ({} column(s))", columns.len());
        let (input_table, qualifiers) = self.eval_rel(input)?;
        let fresh_id = self.fresh_id();
        let mut out_columns = Vec::new();

        for ne in columns {
            if let tabql_parser::ast::Node::WildCard { table } = &ne.expr {
                let input_cols = input_table.columns();
                let matching: Vec<String> = match table {
                    Some(qual) => {
                        let table_id = qualifiers.get(qual).cloned().unwrap_or_else(|| qual.clone());
                        let prefix = format!("{table_id}.");
                        input_cols.into_iter().filter(|c| c.starts_with(&prefix)).collect()
                    }
                    None => input_cols,
                };
                for full in matching {
                    let col_id = full.rsplit('.').next().unwrap_or(&full).to_string();
                    let data = input_table.column(&full)?.to_vec();
                    out_columns.push((format!("{fresh_id}.{col_id}"), data));
                }
            } else {
                let data = eval_expr(&input_table, &qualifiers, &ne.expr)?;
                out_columns.push((format!("{fresh_id}.{}", ne.col_id), data));
            }
        }

        let out = T::from_columns(out_columns);
        let mut new_qualifiers = HashMap::new();
        new_qualifiers.insert(fresh_id.clone(), fresh_id);
        Ok((out, new_qualifiers))
    }

    fn eval_filter(
        &mut self,
        input: &Dag<T>,
        predicate: &crate::ir::Expr,
    ) -> Result<(T, HashMap<String, String>), Error> {
        log::debug!("evaluating Filter");
        let (table, qualifiers) = self.eval_rel(input)?;
        let mask = eval_bool(&table, &qualifiers, predicate)?;
        let filtered = table.mask(&mask)?.reset_index();
        Ok((filtered, qualifiers))
    }

    fn eval_aggregate(
        &mut self,
        input: &Dag<T>,
        columns: &[crate::ir::NamedExpr],
        group_by: Option<&[String]>,
    ) -> Result<(T, HashMap<String, String>), Error> {
        log::debug!("evaluating Aggregate (grouped = {})", group_by.is_some());
        let (table, qualifiers) = self.eval_rel(input)?;
        let fresh_id = self.fresh_id();
        let out = aggregate::eval_aggregate(&table, &qualifiers, &fresh_id, columns, group_by)?;
        let mut new_qualifiers = HashMap::new();
        new_qualifiers.insert(fresh_id.clone(), fresh_id);
        Ok((out, new_qualifiers))
    }

    fn eval_join(
        &mut self,
        left: &Dag<T>,
        right: &Dag<T>,
        how: crate::backend::JoinKind,
        on: &crate::ir::Expr,
    ) -> Result<(T, HashMap<String, String>), Error> {
        log::debug!("evaluating Join({how:?})");
        let (left_table, left_q) = self.eval_rel(left)?;
        let (right_table, right_q) = self.eval_rel(right)?;
        let qualifiers = join::merge_qualifiers(&left_q, &right_q);

        if let Some((left_keys, right_keys)) =
            join::extract_equi_join(on, &left_table, &left_q, &right_table, &right_q)
        {
            let joined = left_table.merge(&right_table, how, &left_keys, &right_keys)?;
            if self.strict {
                log::warn!("strict mode: re-applying the join predicate after the equi-merge");
                let mask = eval_bool(&joined, &qualifiers, on)?;
                let joined = joined.mask(&mask)?;
                return Ok((joined, qualifiers));
            }
            Ok((joined, qualifiers))
        } else {
            let crossed = join::cross_join(&left_table, &right_table);
            let mask = eval_bool(&crossed, &qualifiers, on)?;
            let filtered = crossed.mask(&mask)?.reset_index();
            Ok((filtered, qualifiers))
        }
    }
}

fn apply_order_limit_offset<T: Table>(
    table: T,
    qualifiers: &HashMap<String, String>,
    order_by: &[OrderKey],
    limit: Option<i64>,
    offset: Option<i64>,
) -> Result<T, Error> {
    let mut perm: Vec<usize> = (0..table.num_rows()).collect();

    if !order_by.is_empty() {
        let keys: Vec<Vec<crate::backend::Value>> = order_by
            .iter()
            .map(|ok| eval_expr(&table, qualifiers, &ok.expr))
            .collect::<Result<_, _>>()?;
        perm.sort_by(|&a, &b| {
            for (i, ok) in order_by.iter().enumerate() {
                let cmp = compare_values(&keys[i][a], &keys[i][b]);
                let cmp = if ok.descending { cmp.reverse() } else { cmp };
                if cmp != std::cmp::Ordering::Equal {
                    return cmp;
                }
            }
            a.cmp(&b)
        });
    }

    let start = offset.unwrap_or(0).max(0) as usize;
    let selected: Vec<usize> = if start >= perm.len() {
        Vec::new()
    } else {
        let end = match limit {
            Some(l) => (start + l.max(0) as usize).min(perm.len()),
            None => perm.len(),
        };
        perm[start..end.max(start)].to_vec()
    };

    if selected.len() == table.num_rows() && order_by.is_empty() {
        return Ok(table);
    }

    let mut columns = Vec::new();
    for name in table.columns() {
        let col = table.column(&name)?;
        columns.push((name, selected.iter().map(|&i| col[i].clone()).collect()));
    }
    Ok(T::from_columns(columns))
}
