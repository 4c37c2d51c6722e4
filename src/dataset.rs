//! In-memory row sets.
//!
//! A [`Dataset`] is what a fetched table becomes: named columns plus ordered
//! rows of [`Value`]s. This module holds the preparation stage (column-name
//! cleanup and the keyed inner join) and the row operations the later stages
//! need (numeric column extraction, ordering, filtering).

use crate::db::{QueryResult, Row, Value};
use crate::error::{ReportError, Result};
use std::cmp::Ordering;
use std::collections::HashMap;

/// Byte-order mark that leaks into the first header of some CSV imports.
const BOM: char = '\u{feff}';

/// An ordered collection of rows with named columns.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dataset {
    columns: Vec<String>,
    rows: Vec<Row>,
}

/// Sort direction for [`Dataset::sorted_by`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Ascending,
    Descending,
}

impl Dataset {
    /// Creates a dataset, checking that every row has one value per column.
    pub fn new(columns: Vec<String>, rows: Vec<Row>) -> Result<Self> {
        if let Some((index, row)) = rows
            .iter()
            .enumerate()
            .find(|(_, row)| row.len() != columns.len())
        {
            return Err(ReportError::shape(format!(
                "row {index} has {} values but there are {} columns",
                row.len(),
                columns.len()
            )));
        }
        Ok(Self { columns, rows })
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Position of a column by exact name.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    fn require_column(&self, name: &str) -> Result<usize> {
        self.column_index(name).ok_or_else(|| {
            ReportError::shape(format!(
                "column '{name}' not found (available: {})",
                self.columns.join(", ")
            ))
        })
    }

    /// Strips surrounding whitespace and embedded byte-order marks from every
    /// column name.
    pub fn normalize_column_names(&mut self) {
        for column in &mut self.columns {
            let cleaned: String = column.chars().filter(|&c| c != BOM).collect();
            *column = cleaned.trim().to_string();
        }
    }

    /// Reads a column as numbers.
    ///
    /// NULL cells map to `None`; any other value that does not read as a
    /// number is an error.
    pub fn numeric_column(&self, name: &str) -> Result<Vec<Option<f64>>> {
        let index = self.require_column(name)?;
        self.rows
            .iter()
            .enumerate()
            .map(|(row_index, row)| {
                let value = &row[index];
                if value.is_null() {
                    return Ok(None);
                }
                value.as_f64().map(Some).ok_or_else(|| {
                    ReportError::shape(format!(
                        "column '{name}' has non-numeric value '{value}' in row {row_index}"
                    ))
                })
            })
            .collect()
    }

    /// Returns a copy ordered by a numeric column.
    ///
    /// Descending order is stable: ties keep their original row order, and
    /// rows without a number go last. Ascending order is defined as the exact
    /// reverse of the descending one, so the ranking table and the chart
    /// always agree.
    pub fn sorted_by(&self, name: &str, order: SortOrder) -> Result<Self> {
        let keys = self.numeric_column(name)?;

        let mut indices: Vec<usize> = (0..self.rows.len()).collect();
        indices.sort_by(|&a, &b| match (keys[a], keys[b]) {
            (Some(x), Some(y)) => y.partial_cmp(&x).unwrap_or(Ordering::Equal),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        });
        if order == SortOrder::Ascending {
            indices.reverse();
        }

        Ok(Self {
            columns: self.columns.clone(),
            rows: indices.into_iter().map(|i| self.rows[i].clone()).collect(),
        })
    }

    /// Keeps the rows whose value in `name` satisfies the predicate.
    /// NULL cells never match.
    pub fn filter_numeric<F>(&self, name: &str, predicate: F) -> Result<Self>
    where
        F: Fn(f64) -> bool,
    {
        let keys = self.numeric_column(name)?;
        let rows = self
            .rows
            .iter()
            .zip(keys)
            .filter(|(_, key)| key.is_some_and(&predicate))
            .map(|(row, _)| row.clone())
            .collect();

        Ok(Self {
            columns: self.columns.clone(),
            rows,
        })
    }

    /// Reads a column as display labels.
    pub fn labels(&self, name: &str) -> Result<Vec<String>> {
        let index = self.require_column(name)?;
        Ok(self
            .rows
            .iter()
            .map(|row| row[index].to_display_string())
            .collect())
    }

    /// Inner join on an explicit list of key columns.
    ///
    /// Output columns are all left columns followed by the right columns that
    /// are not keys; other names present on both sides get `_x`/`_y`
    /// suffixes. Rows come out in left order, then right order. A key
    /// containing NULL matches nothing. Key values are compared by type and
    /// value, with integers and floats compared numerically.
    pub fn inner_join(&self, right: &Dataset, keys: &[String]) -> Result<Dataset> {
        if keys.is_empty() {
            return Err(ReportError::shape("no join keys given"));
        }

        let mut left_keys = Vec::with_capacity(keys.len());
        let mut right_keys = Vec::with_capacity(keys.len());
        for key in keys {
            left_keys.push(self.column_index(key).ok_or_else(|| {
                ReportError::shape(format!("join key '{key}' missing from left table"))
            })?);
            right_keys.push(right.column_index(key).ok_or_else(|| {
                ReportError::shape(format!("join key '{key}' missing from right table"))
            })?);
        }

        let right_payload: Vec<usize> = (0..right.columns.len())
            .filter(|i| !right_keys.contains(i))
            .collect();

        let mut columns = Vec::with_capacity(self.columns.len() + right_payload.len());
        for (i, name) in self.columns.iter().enumerate() {
            let clashes = !left_keys.contains(&i)
                && right_payload.iter().any(|&j| &right.columns[j] == name);
            columns.push(if clashes {
                format!("{name}_x")
            } else {
                name.clone()
            });
        }
        for &j in &right_payload {
            let name = &right.columns[j];
            let clashes = self
                .columns
                .iter()
                .enumerate()
                .any(|(i, left_name)| left_name == name && !left_keys.contains(&i));
            columns.push(if clashes {
                format!("{name}_y")
            } else {
                name.clone()
            });
        }

        let mut index: HashMap<Vec<JoinKey>, Vec<usize>> = HashMap::new();
        for (row_index, row) in right.rows.iter().enumerate() {
            if let Some(key) = join_key(row, &right_keys) {
                index.entry(key).or_default().push(row_index);
            }
        }

        let mut rows = Vec::new();
        for left_row in &self.rows {
            let Some(key) = join_key(left_row, &left_keys) else {
                continue;
            };
            let Some(matches) = index.get(&key) else {
                continue;
            };
            for &m in matches {
                let mut row = left_row.clone();
                row.extend(right_payload.iter().map(|&j| right.rows[m][j].clone()));
                rows.push(row);
            }
        }

        Ok(Dataset { columns, rows })
    }
}

impl From<QueryResult> for Dataset {
    fn from(result: QueryResult) -> Self {
        Self {
            columns: result.columns.into_iter().map(|c| c.name).collect(),
            rows: result.rows,
        }
    }
}

/// Hashable form of a join key cell.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum JoinKey {
    Bool(bool),
    /// Integers and whole floats share this variant so `1` joins `1.0`.
    Int(i64),
    Float(u64),
    Text(String),
    Bytes(Vec<u8>),
}

fn join_key(row: &Row, indices: &[usize]) -> Option<Vec<JoinKey>> {
    indices
        .iter()
        .map(|&i| match &row[i] {
            Value::Null => None,
            Value::Bool(b) => Some(JoinKey::Bool(*b)),
            Value::Int(v) => Some(JoinKey::Int(*v)),
            Value::Float(f) if f.fract() == 0.0 && f.abs() < i64::MAX as f64 => {
                Some(JoinKey::Int(*f as i64))
            }
            Value::Float(f) if f.is_nan() => None,
            Value::Float(f) => Some(JoinKey::Float(f.to_bits())),
            Value::String(s) => Some(JoinKey::Text(s.clone())),
            Value::Bytes(b) => Some(JoinKey::Bytes(b.clone())),
        })
        .collect()
}
