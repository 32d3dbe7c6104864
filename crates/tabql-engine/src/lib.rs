//! Logical-plan executor and in-memory table backend for `tabql`.
//!
//! [`execute`] is the crate's entry point: SQL text plus a scope of named
//! tables in, the resulting table out. `tabql-parser` handles lexing and
//! parsing; this crate lowers the parsed statement to a [`Dag`] and
//! evaluates it against a [`backend::Table`] implementor.

pub mod backend;
pub mod error;
pub mod executor;
pub mod id_gen;
pub mod ir;
pub mod memtable;
pub mod planner;

#[cfg(feature = "cli")]
pub mod cli;

use std::collections::HashMap;

use backend::{Table, Value};
use error::Error;
use executor::Executor;
use id_gen::NameGenerator;
use planner::Statement;

/// Execution-time settings. Distinct from the planner's own id generator
/// (which mints column ids at plan time): `id_generator` controls the
/// `table_id` sequence the executor assigns to `GetTable`/`Transform`/
/// `Aggregate` outputs, and can be overridden for deterministic tests.
pub struct Options {
    pub strict: bool,
    pub id_generator: Option<Box<dyn FnMut() -> String>>,
}

impl Default for Options {
    fn default() -> Self {
        Options { strict: false, id_generator: None }
    }
}

/// Parses, plans, and evaluates `sql` against `tables`. Mirrors
/// `tabql_parser::parse`: one call does the whole pipeline, since the
/// engine has no persistent catalog or session state to thread across
/// statements.
pub fn execute<T: Table>(sql: &str, tables: HashMap<String, T>, options: Options) -> Result<T, Error> {
    let ast = tabql_parser::parse(sql)?;
    let mut plan_id_gen = NameGenerator::new("_col");
    let statement = planner::plan_statement::<T>(&ast, &mut plan_id_gen)?;

    let exec_id_gen = options.id_generator.unwrap_or_else(|| {
        let mut gen = NameGenerator::default();
        Box::new(move || gen.gen())
    });
    let mut executor = Executor::new(tables, exec_id_gen, options.strict);

    match statement {
        Statement::Query(plan) => executor.run(plan),
        Statement::CreateTableAs { name, query } => {
            log::info!("CREATE TABLE {name} AS ...: no persistent catalog, returning the query's result");
            executor.run(query)
        }
        Statement::DropTable(names) => {
            log::info!("DROP TABLE {names:?}: no persistent catalog, this is a no-op");
            Ok(T::dual())
        }
        Statement::Show(tail) => {
            let text = tail.join(" ");
            Ok(T::from_columns(vec![("show.tail".to_string(), vec![Value::Str(text)])]))
        }
        Statement::CopyFrom { table, .. } => {
            Err(Error::plan(format!("COPY FROM for `{table}` is delegated to the host")))
        }
        Statement::CopyTo { table, .. } => {
            Err(Error::plan(format!("COPY TO for `{table}` is delegated to the host")))
        }
    }
}
