// Licensed to the Apache Software Foundation (ASF) under one
// or more contributor license agreements.  See the NOTICE file
// distributed with this work for additional information
// regarding copyright ownership.  The ASF licenses this file
// to you under the Apache License, Version 2.0 (the
// "License"); you may not use this file except in compliance
// with the License.  You may obtain a copy of the License at
//
//   http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing,
// software distributed under the License is distributed on an
// "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied.  See the License for the
// specific language governing permissions and limitations
// under the License.

//! The narrow interface through which summaries read a partition.
//!
//! Storage is an external collaborator: a partition is anything implementing [`Table`],
//! exposing a cursor over its member rows and per-column cell access through [`Column`].
//! [`MemoryTable`] is a simple in-memory implementation.
//!
//! Cells are compared through [`Value`], which has a total order (doubles use
//! [`f64::total_cmp`]), so rows can be used as keys in ordered and hashed containers.

use std::cmp::Ordering;
use std::cmp::Reverse;
use std::fmt;
use std::hash::Hash;
use std::hash::Hasher;

use crate::error::Error;

mod memory;

pub use self::memory::ColumnData;
pub use self::memory::MemoryTable;
pub use self::memory::MemoryTableBuilder;

/// Physical kind of a column's cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContentsKind {
    /// 64-bit signed integers.
    Integer,
    /// 64-bit floating point numbers.
    Double,
    /// UTF-8 strings.
    String,
}

/// Maps strings to numbers so that string columns can feed numeric summaries.
pub trait StringConverter: fmt::Debug + Send + Sync {
    /// Converts a string; `None` when the string has no numeric image.
    fn convert(&self, value: &str) -> Option<f64>;
}

/// Converts a string to the index of the last boundary not greater than it.
///
/// Strings sorting before the first boundary convert to `-1`.
///
/// # Examples
///
/// ```
/// # use sketchtree::table::SortedStringsConverter;
/// # use sketchtree::table::StringConverter;
/// let converter = SortedStringsConverter::new(["b", "d", "f"]).unwrap();
/// assert_eq!(converter.convert("a"), Some(-1.0));
/// assert_eq!(converter.convert("c"), Some(0.0));
/// assert_eq!(converter.convert("f"), Some(2.0));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortedStringsConverter {
    boundaries: Vec<String>,
}

impl SortedStringsConverter {
    /// Creates a converter; boundaries must be strictly increasing and non-empty.
    pub fn new<I, S>(boundaries: I) -> Result<Self, Error>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let boundaries: Vec<String> = boundaries.into_iter().map(Into::into).collect();
        if boundaries.is_empty() {
            return Err(Error::invalid_parameter("string boundaries must not be empty"));
        }
        if boundaries.windows(2).any(|w| w[0] >= w[1]) {
            return Err(Error::invalid_parameter(
                "string boundaries must be strictly increasing",
            ));
        }
        Ok(Self { boundaries })
    }
}

impl StringConverter for SortedStringsConverter {
    fn convert(&self, value: &str) -> Option<f64> {
        let position = self.boundaries.partition_point(|b| b.as_str() <= value);
        Some(position as f64 - 1.0)
    }
}

/// Cell access for one column of a partition.
pub trait Column: Send + Sync {
    /// Returns the column name.
    fn name(&self) -> &str;

    /// Returns the kind of the cells.
    fn kind(&self) -> ContentsKind;

    /// Returns true if the cell at `row` holds no value.
    fn is_missing(&self, row: usize) -> bool;

    /// Returns the cell as a number, converting strings with `converter`.
    ///
    /// Returns `None` for missing cells and for strings when no converter is given.
    fn as_double(&self, row: usize, converter: Option<&dyn StringConverter>) -> Option<f64>;

    /// Returns the cell rendered as a string, `None` when missing.
    fn as_string(&self, row: usize) -> Option<String>;

    /// Returns the cell as a comparable value, `None` when missing.
    fn comparable(&self, row: usize) -> Option<Value>;
}

/// One partition of a dataset: a set of member rows over named columns.
pub trait Table: Send + Sync {
    /// Returns the number of member rows.
    fn num_rows(&self) -> usize;

    /// Iterates the member row indexes in increasing order.
    fn rows(&self) -> Box<dyn Iterator<Item = usize> + '_>;

    /// Looks a column up by name.
    fn column(&self, name: &str) -> Result<&dyn Column, Error>;
}

/// A comparable cell value.
#[derive(Debug, Clone)]
pub enum Value {
    /// Integer cell.
    Integer(i64),
    /// Floating point cell.
    Double(f64),
    /// String cell.
    String(String),
}

impl Value {
    /// Returns the numeric image of an integer or double value.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Integer(v) => Some(*v as f64),
            Value::Double(v) => Some(*v),
            Value::String(_) => None,
        }
    }

    fn variant_rank(&self) -> u8 {
        match self {
            Value::Integer(_) => 0,
            Value::Double(_) => 1,
            Value::String(_) => 2,
        }
    }
}

impl Ord for Value {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Value::Integer(a), Value::Integer(b)) => a.cmp(b),
            (Value::Double(a), Value::Double(b)) => a.total_cmp(b),
            (Value::String(a), Value::String(b)) => a.cmp(b),
            _ => self.variant_rank().cmp(&other.variant_rank()),
        }
    }
}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Value {}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.variant_rank().hash(state);
        match self {
            Value::Integer(v) => v.hash(state),
            // total_cmp equality is bit equality
            Value::Double(v) => v.to_bits().hash(state),
            Value::String(v) => v.hash(state),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Integer(v) => write!(f, "{v}"),
            Value::Double(v) => write!(f, "{v}"),
            Value::String(v) => write!(f, "{v}"),
        }
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Integer(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Double(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value)
    }
}

/// The cells of selected columns of one row; missing cells are `None` and sort first.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RowSnapshot(Vec<Option<Value>>);

impl RowSnapshot {
    /// Creates a snapshot from cell values.
    pub fn new(values: Vec<Option<Value>>) -> Self {
        Self(values)
    }

    /// Creates a snapshot of present values.
    pub fn of<I, V>(values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Self(values.into_iter().map(|v| Some(v.into())).collect())
    }

    /// Returns the cells.
    pub fn values(&self) -> &[Option<Value>] {
        &self.0
    }

    /// Returns the cell at `index`.
    pub fn get(&self, index: usize) -> Option<&Value> {
        self.0.get(index).and_then(Option::as_ref)
    }
}

/// Columns of a table resolved once, used to snapshot many rows.
pub(crate) struct ColumnSet<'a> {
    columns: Vec<&'a dyn Column>,
}

impl<'a> ColumnSet<'a> {
    pub fn resolve<T, S>(table: &'a T, names: &[S]) -> Result<Self, Error>
    where
        T: Table + ?Sized,
        S: AsRef<str>,
    {
        let columns = names
            .iter()
            .map(|name| table.column(name.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { columns })
    }

    pub fn snapshot(&self, row: usize) -> RowSnapshot {
        RowSnapshot(self.columns.iter().map(|c| c.comparable(row)).collect())
    }
}

/// Sort direction of one column of a [`RecordOrder`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ColumnSortOrientation {
    column: String,
    ascending: bool,
}

impl ColumnSortOrientation {
    /// Returns the column name.
    pub fn column(&self) -> &str {
        &self.column
    }

    /// Returns true for increasing order.
    pub fn is_ascending(&self) -> bool {
        self.ascending
    }
}

/// A lexicographic row order over several columns, each ascending or descending.
///
/// # Examples
///
/// ```
/// # use std::cmp::Ordering;
/// # use sketchtree::table::RecordOrder;
/// # use sketchtree::table::RowSnapshot;
/// let order = RecordOrder::new().ascending("city").descending("age");
/// let a = RowSnapshot::of(["Oslo".into(), sketchtree::table::Value::Integer(40)]);
/// let b = RowSnapshot::of(["Oslo".into(), sketchtree::table::Value::Integer(30)]);
/// assert_eq!(order.compare(&a, &b), Ordering::Less);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct RecordOrder {
    orientations: Vec<ColumnSortOrientation>,
}

impl RecordOrder {
    /// Creates an empty order.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an increasing column.
    pub fn ascending(mut self, column: impl Into<String>) -> Self {
        self.orientations.push(ColumnSortOrientation {
            column: column.into(),
            ascending: true,
        });
        self
    }

    /// Appends a decreasing column.
    pub fn descending(mut self, column: impl Into<String>) -> Self {
        self.orientations.push(ColumnSortOrientation {
            column: column.into(),
            ascending: false,
        });
        self
    }

    /// Returns the column orientations, most significant first.
    pub fn orientations(&self) -> &[ColumnSortOrientation] {
        &self.orientations
    }

    /// Returns the column names, most significant first.
    pub fn columns(&self) -> Vec<&str> {
        self.orientations.iter().map(|o| o.column.as_str()).collect()
    }

    /// Returns true if no column is ordered.
    pub fn is_empty(&self) -> bool {
        self.orientations.is_empty()
    }

    /// Compares two snapshots taken over [`RecordOrder::columns`].
    pub fn compare(&self, left: &RowSnapshot, right: &RowSnapshot) -> Ordering {
        for (index, orientation) in self.orientations.iter().enumerate() {
            let l = left.0.get(index);
            let r = right.0.get(index);
            let ordering = if orientation.ascending {
                l.cmp(&r)
            } else {
                r.cmp(&l)
            };
            if ordering != Ordering::Equal {
                return ordering;
            }
        }
        Ordering::Equal
    }

    /// Builds a key whose natural order is this record order.
    pub fn sort_key(&self, row: RowSnapshot) -> SortKey {
        let parts = row
            .0
            .into_iter()
            .zip(self.orientations.iter())
            .map(|(value, orientation)| {
                if orientation.ascending {
                    Directed::Ascending(value)
                } else {
                    Directed::Descending(Reverse(value))
                }
            })
            .collect();
        SortKey(parts)
    }

    pub(crate) fn validate(&self) -> Result<(), Error> {
        if self.is_empty() {
            return Err(Error::invalid_parameter(
                "record order must name at least one column",
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
enum Directed {
    Ascending(Option<Value>),
    Descending(Reverse<Option<Value>>),
}

/// A row snapshot whose derived order follows a [`RecordOrder`].
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct SortKey(Vec<Directed>);

impl SortKey {
    /// Recovers the underlying snapshot.
    pub fn into_row(self) -> RowSnapshot {
        RowSnapshot(
            self.0
                .into_iter()
                .map(|part| match part {
                    Directed::Ascending(v) => v,
                    Directed::Descending(Reverse(v)) => v,
                })
                .collect(),
        )
    }
}

/// Visits the member rows of `table`, checking `cancel` every
/// [`CANCEL_CHECK_ROWS`](crate::common::CANCEL_CHECK_ROWS) rows.
pub(crate) fn scan_rows<T: Table + ?Sized>(
    table: &T,
    cancel: &tokio_util::sync::CancellationToken,
    mut visit: impl FnMut(usize),
) -> Result<(), Error> {
    for (position, row) in table.rows().enumerate() {
        if position % crate::common::CANCEL_CHECK_ROWS == 0 && cancel.is_cancelled() {
            return Err(Error::cancelled());
        }
        visit(row);
    }
    Ok(())
}
