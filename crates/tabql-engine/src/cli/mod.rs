//! Thin CLI (spec.md §6, ambient): loads CSV files into [`MemTable`]s, runs
//! one SQL string against them, prints the result. Exists so a developer can
//! manually smoke-test the engine — not a product surface.

use std::collections::HashMap;
use std::fs::File;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};

use crate::backend::{Table, Value};
use crate::memtable::MemTable;
use crate::Options;

#[derive(Parser, Debug)]
#[command(name = "tabql", about, version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Load CSV tables and run a SQL query against them.
    Run {
        /// `name=path.csv`, one per table. May be repeated.
        #[arg(long = "table", value_name = "NAME=PATH")]
        tables: Vec<String>,
        /// The SQL text to run.
        sql: String,
        /// Re-apply a join's full predicate after an equi-merge.
        #[arg(long)]
        strict: bool,
    },
}

pub fn main() -> Result<()> {
    env_logger::builder().format_timestamp(None).init();
    let cli = Cli::parse();
    match cli.command {
        Command::Run { tables, sql, strict } => run(&tables, &sql, strict),
    }
}

fn run(table_args: &[String], sql: &str, strict: bool) -> Result<()> {
    let mut scope = HashMap::new();
    for arg in table_args {
        let (name, path) = arg
            .split_once('=')
            .with_context(|| format!("expected `name=path.csv`, got `{arg}`"))?;
        let table = load_csv(name, PathBuf::from(path))?;
        scope.insert(name.to_string(), table);
    }

    let options = Options { strict, id_generator: None };
    let result = crate::execute(sql, scope, options)?;
    print_table(&result);
    Ok(())
}

fn load_csv(name: &str, path: PathBuf) -> Result<MemTable> {
    let file = File::open(&path).with_context(|| format!("opening {}", path.display()))?;
    let mut reader = csv::Reader::from_reader(file);
    let headers: Vec<String> = reader.headers()?.iter().map(|h| h.to_string()).collect();
    if headers.is_empty() {
        bail!("{}: no header row", path.display());
    }

    let mut columns: Vec<Vec<Value>> = vec![Vec::new(); headers.len()];
    for record in reader.records() {
        let record = record?;
        for (i, field) in record.iter().enumerate() {
            columns[i].push(parse_csv_value(field));
        }
    }

    let named: Vec<(String, Vec<Value>)> = headers
        .into_iter()
        .zip(columns)
        .map(|(h, c)| (format!("{name}.{h}"), c))
        .collect();
    Ok(MemTable::new(named))
}

fn parse_csv_value(field: &str) -> Value {
    if field.is_empty() {
        return Value::Null;
    }
    if let Ok(i) = field.parse::<i64>() {
        return Value::Int(i);
    }
    if let Ok(f) = field.parse::<f64>() {
        return Value::Float(f);
    }
    Value::Str(field.to_string())
}

fn print_table<T: Table>(table: &T) {
    let columns = table.columns();
    println!("{}", columns.join(","));
    for row in 0..table.num_rows() {
        let rendered: Vec<String> = columns
            .iter()
            .map(|c| render_value(&table.column(c).expect("column exists")[row]))
            .collect();
        println!("{}", rendered.join(","));
    }
}

fn render_value(v: &Value) -> String {
    match v {
        Value::Null => String::new(),
        Value::Int(i) => i.to_string(),
        Value::Float(f) => f.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Str(s) => s.clone(),
    }
}
