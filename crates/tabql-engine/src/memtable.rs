//! A simple `Vec<Value>`-column implementation of [`Table`], used by the
//! executor's tests and the CLI. Not part of the contract a host is
//! required to use — a host may bring its own `Table` implementor (an
//! Arrow-backed one, for instance).

use std::collections::HashSet;

use crate::backend::{JoinKind, Table, Value};
use crate::error::Error;

#[derive(Debug, Clone, Default)]
pub struct MemTable {
    names: Vec<String>,
    data: Vec<Vec<Value>>,
    /// Row count, tracked separately so a 0-column table can still have rows
    /// (the `DUAL` placeholder and empty-projection results both need this).
    rows: usize,
}

impl MemTable {
    pub fn new(columns: Vec<(String, Vec<Value>)>) -> Self {
        <Self as Table>::from_columns(columns)
    }

    fn col_index(&self, name: &str) -> Result<usize, Error> {
        self.names
            .iter()
            .position(|n| n == name)
            .ok_or_else(|| Error::backend(format!("no such column: {name}")))
    }
}

impl Table for MemTable {
    fn columns(&self) -> Vec<String> {
        self.names.clone()
    }

    fn num_rows(&self) -> usize {
        self.rows
    }

    fn column(&self, name: &str) -> Result<&[Value], Error> {
        let idx = self.col_index(name)?;
        Ok(&self.data[idx])
    }

    fn mask(&self, predicate: &[bool]) -> Result<Self, Error> {
        if predicate.len() != self.rows {
            return Err(Error::backend(format!(
                "mask length {} does not match row count {}",
                predicate.len(),
                self.rows
            )));
        }
        let kept = predicate.iter().filter(|&&b| b).count();
        let data = self
            .data
            .iter()
            .map(|col| {
                col.iter()
                    .zip(predicate)
                    .filter_map(|(v, &keep)| keep.then(|| v.clone()))
                    .collect()
            })
            .collect();
        Ok(MemTable {
            names: self.names.clone(),
            data,
            rows: kept,
        })
    }

    fn drop_duplicates(&self) -> Self {
        let mut seen = HashSet::new();
        let mut keep = Vec::with_capacity(self.rows);
        for row in 0..self.rows {
            let key: Vec<String> = self.data.iter().map(|col| format!("{:?}", col[row])).collect();
            keep.push(seen.insert(key));
        }
        self.mask(&keep).expect("keep mask matches row count")
    }

    fn merge(
        &self,
        other: &Self,
        how: JoinKind,
        left_on: &[String],
        right_on: &[String],
    ) -> Result<Self, Error> {
        let left_idx: Vec<usize> = left_on
            .iter()
            .map(|n| self.col_index(n))
            .collect::<Result<_, _>>()?;
        let right_idx: Vec<usize> = right_on
            .iter()
            .map(|n| other.col_index(n))
            .collect::<Result<_, _>>()?;

        let key = |table: &MemTable, idx: &[usize], row: usize| -> Vec<Value> {
            idx.iter().map(|&i| table.data[i][row].clone()).collect()
        };

        let mut left_matched = vec![false; self.rows];
        let mut right_matched = vec![false; other.rows];
        let mut pairs: Vec<(Option<usize>, Option<usize>)> = Vec::new();

        for l in 0..self.rows {
            let lkey = key(self, &left_idx, l);
            for r in 0..other.rows {
                if lkey == key(other, &right_idx, r) {
                    pairs.push((Some(l), Some(r)));
                    left_matched[l] = true;
                    right_matched[r] = true;
                }
            }
        }

        if matches!(how, JoinKind::Left | JoinKind::Outer) {
            for (l, matched) in left_matched.iter().enumerate() {
                if !matched {
                    pairs.push((Some(l), None));
                }
            }
        }
        if matches!(how, JoinKind::Right | JoinKind::Outer) {
            for (r, matched) in right_matched.iter().enumerate() {
                if !matched {
                    pairs.push((None, Some(r)));
                }
            }
        }

        let mut names = self.names.clone();
        names.extend(other.names.clone());
        let mut data: Vec<Vec<Value>> = vec![Vec::with_capacity(pairs.len()); names.len()];
        let left_cols = self.data.len();

        for &(l, r) in &pairs {
            for (i, col) in self.data.iter().enumerate() {
                data[i].push(l.map(|l| col[l].clone()).unwrap_or(Value::Null));
            }
            for (i, col) in other.data.iter().enumerate() {
                data[left_cols + i].push(r.map(|r| col[r].clone()).unwrap_or(Value::Null));
            }
        }

        Ok(MemTable {
            rows: pairs.len(),
            names,
            data,
        })
    }

    fn reset_index(&self) -> Self {
        self.clone()
    }

    fn from_columns(columns: Vec<(String, Vec<Value>)>) -> Self {
        let rows = columns.first().map(|(_, c)| c.len()).unwrap_or(0);
        let (names, data) = columns.into_iter().unzip();
        MemTable { names, data, rows }
    }

    fn dual() -> Self {
        MemTable {
            names: Vec::new(),
            data: Vec::new(),
            rows: 1,
        }
    }

    fn sum(col: &[Value]) -> Value {
        let values: Vec<f64> = col.iter().filter_map(Value::as_f64).collect();
        if values.is_empty() {
            return Value::Null;
        }
        let total: f64 = values.iter().sum();
        if col.iter().all(|v| matches!(v, Value::Int(_) | Value::Null)) {
            Value::Int(total as i64)
        } else {
            Value::Float(total)
        }
    }

    fn mean(col: &[Value]) -> Value {
        let values: Vec<f64> = col.iter().filter_map(Value::as_f64).collect();
        if values.is_empty() {
            Value::Null
        } else {
            Value::Float(values.iter().sum::<f64>() / values.len() as f64)
        }
    }

    fn min(col: &[Value]) -> Value {
        col.iter()
            .filter_map(Value::as_f64)
            .fold(None, |acc: Option<f64>, v| Some(acc.map_or(v, |a| a.min(v))))
            .map(Value::Float)
            .unwrap_or(Value::Null)
    }

    fn max(col: &[Value]) -> Value {
        col.iter()
            .filter_map(Value::as_f64)
            .fold(None, |acc: Option<f64>, v| Some(acc.map_or(v, |a| a.max(v))))
            .map(Value::Float)
            .unwrap_or(Value::Null)
    }

    fn count(col: &[Value]) -> Value {
        Value::Int(col.iter().filter(|v| !matches!(v, Value::Null)).count() as i64)
    }

    fn first(col: &[Value]) -> Value {
        col.first().cloned().unwrap_or(Value::Null)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn ints(vals: &[i64]) -> Vec<Value> {
        vals.iter().map(|&i| Value::Int(i)).collect()
    }

    #[test]
    fn masks_rows_and_preserves_columns() {
        let t = MemTable::new(vec![("t.a".into(), ints(&[1, 2, 3]))]);
        let masked = t.mask(&[true, false, true]).unwrap();
        assert_eq!(masked.num_rows(), 2);
        assert_eq!(masked.column("t.a").unwrap(), &[Value::Int(1), Value::Int(3)]);
    }

    #[test]
    fn drops_duplicate_rows_preserving_order() {
        let t = MemTable::new(vec![("t.a".into(), ints(&[1, 1, 2]))]);
        let deduped = t.drop_duplicates();
        assert_eq!(deduped.column("t.a").unwrap(), &[Value::Int(1), Value::Int(2)]);
    }

    #[test]
    fn inner_merge_keeps_matching_rows_only() {
        let l = MemTable::new(vec![
            ("l.k".into(), ints(&[1, 2])),
            ("l.a".into(), ints(&[10, 20])),
        ]);
        let r = MemTable::new(vec![
            ("r.k".into(), ints(&[2, 3])),
            ("r.b".into(), ints(&[100, 300])),
        ]);
        let joined = l
            .merge(&r, JoinKind::Inner, &["l.k".into()], &["r.k".into()])
            .unwrap();
        assert_eq!(joined.num_rows(), 1);
        assert_eq!(joined.column("l.a").unwrap(), &[Value::Int(20)]);
        assert_eq!(joined.column("r.b").unwrap(), &[Value::Int(100)]);
    }

    #[test]
    fn left_merge_pads_unmatched_rows_with_null() {
        let l = MemTable::new(vec![("l.k".into(), ints(&[1, 2]))]);
        let r = MemTable::new(vec![("r.k".into(), ints(&[2]))]);
        let joined = l
            .merge(&r, JoinKind::Left, &["l.k".into()], &["r.k".into()])
            .unwrap();
        assert_eq!(joined.num_rows(), 2);
        assert_eq!(joined.column("r.k").unwrap(), &[Value::Null, Value::Int(2)]);
    }

    #[test]
    fn dual_is_a_single_empty_row() {
        let dual = MemTable::dual();
        assert_eq!(dual.num_rows(), 1);
        assert!(dual.columns().is_empty());
    }

    #[test]
    fn count_over_empty_column_is_zero() {
        assert_eq!(MemTable::count(&[]), Value::Int(0));
    }

    #[test]
    fn sum_over_empty_column_is_null() {
        assert_eq!(MemTable::sum(&[]), Value::Null);
    }
}
