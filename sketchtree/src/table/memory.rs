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

//! In-memory column store implementing [`Table`].

use std::collections::HashSet;

use super::Column;
use super::ContentsKind;
use super::StringConverter;
use super::Table;
use super::Value;
use crate::error::Error;

/// Cells of one in-memory column; `None` marks a missing cell.
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnData {
    /// Integer cells.
    Integer(Vec<Option<i64>>),
    /// Floating point cells.
    Double(Vec<Option<f64>>),
    /// String cells.
    String(Vec<Option<String>>),
}

impl ColumnData {
    fn len(&self) -> usize {
        match self {
            ColumnData::Integer(cells) => cells.len(),
            ColumnData::Double(cells) => cells.len(),
            ColumnData::String(cells) => cells.len(),
        }
    }

    fn select(&self, rows: &[usize]) -> ColumnData {
        match self {
            ColumnData::Integer(cells) => {
                ColumnData::Integer(rows.iter().map(|r| cells[*r]).collect())
            }
            ColumnData::Double(cells) => ColumnData::Double(rows.iter().map(|r| cells[*r]).collect()),
            ColumnData::String(cells) => {
                ColumnData::String(rows.iter().map(|r| cells[*r].clone()).collect())
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
struct MemoryColumn {
    name: String,
    data: ColumnData,
}

impl Column for MemoryColumn {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> ContentsKind {
        match self.data {
            ColumnData::Integer(_) => ContentsKind::Integer,
            ColumnData::Double(_) => ContentsKind::Double,
            ColumnData::String(_) => ContentsKind::String,
        }
    }

    fn is_missing(&self, row: usize) -> bool {
        match &self.data {
            ColumnData::Integer(cells) => cells[row].is_none(),
            ColumnData::Double(cells) => cells[row].is_none(),
            ColumnData::String(cells) => cells[row].is_none(),
        }
    }

    fn as_double(&self, row: usize, converter: Option<&dyn StringConverter>) -> Option<f64> {
        match &self.data {
            ColumnData::Integer(cells) => cells[row].map(|v| v as f64),
            ColumnData::Double(cells) => cells[row],
            ColumnData::String(cells) => {
                let converter = converter?;
                cells[row].as_deref().and_then(|s| converter.convert(s))
            }
        }
    }

    fn as_string(&self, row: usize) -> Option<String> {
        match &self.data {
            ColumnData::Integer(cells) => cells[row].map(|v| v.to_string()),
            ColumnData::Double(cells) => cells[row].map(|v| v.to_string()),
            ColumnData::String(cells) => cells[row].clone(),
        }
    }

    fn comparable(&self, row: usize) -> Option<Value> {
        match &self.data {
            ColumnData::Integer(cells) => cells[row].map(Value::Integer),
            ColumnData::Double(cells) => cells[row].map(Value::Double),
            ColumnData::String(cells) => cells[row].clone().map(Value::String),
        }
    }
}

/// A table whose columns live in vectors, optionally restricted to a subset of rows.
///
/// # Examples
///
/// ```
/// # use sketchtree::table::MemoryTable;
/// # use sketchtree::table::Table;
/// let table = MemoryTable::builder()
///     .integers("id", [1, 2, 3, 4])
///     .strings("name", ["a", "b", "c", "d"])
///     .members([0, 2])
///     .build()
///     .unwrap();
/// assert_eq!(table.num_rows(), 2);
/// assert_eq!(table.rows().collect::<Vec<_>>(), vec![0, 2]);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct MemoryTable {
    columns: Vec<MemoryColumn>,
    row_count: usize,
    members: Option<Vec<usize>>,
}

impl MemoryTable {
    /// Creates a builder for a table.
    pub fn builder() -> MemoryTableBuilder {
        MemoryTableBuilder::default()
    }

    /// Splits the member rows into `parts` contiguous tables of near-equal size.
    ///
    /// # Panics
    ///
    /// Panics if `parts` is zero.
    pub fn split(&self, parts: usize) -> Vec<MemoryTable> {
        assert!(parts > 0, "parts must be positive");
        let total = self.num_rows();
        self.partition_by(parts, |position| position * parts / total.max(1))
    }

    /// Distributes member rows to `parts` tables; `assign` maps the position of a member
    /// row (0 for the first member) to its target table.
    ///
    /// # Panics
    ///
    /// Panics if `parts` is zero or `assign` returns an index out of range.
    pub fn partition_by(&self, parts: usize, assign: impl Fn(usize) -> usize) -> Vec<MemoryTable> {
        assert!(parts > 0, "parts must be positive");
        let mut selections = vec![Vec::new(); parts];
        for (position, row) in self.rows().enumerate() {
            let target = assign(position);
            assert!(target < parts, "partition index {target} out of range");
            selections[target].push(row);
        }
        selections
            .into_iter()
            .map(|rows| MemoryTable {
                columns: self
                    .columns
                    .iter()
                    .map(|c| MemoryColumn {
                        name: c.name.clone(),
                        data: c.data.select(&rows),
                    })
                    .collect(),
                row_count: rows.len(),
                members: None,
            })
            .collect()
    }
}

impl Table for MemoryTable {
    fn num_rows(&self) -> usize {
        match &self.members {
            Some(members) => members.len(),
            None => self.row_count,
        }
    }

    fn rows(&self) -> Box<dyn Iterator<Item = usize> + '_> {
        match &self.members {
            Some(members) => Box::new(members.iter().copied()),
            None => Box::new(0..self.row_count),
        }
    }

    fn column(&self, name: &str) -> Result<&dyn Column, Error> {
        self.columns
            .iter()
            .find(|c| c.name == name)
            .map(|c| c as &dyn Column)
            .ok_or_else(|| Error::column_not_found(name))
    }
}

/// Builder for [`MemoryTable`].
#[derive(Debug, Default)]
pub struct MemoryTableBuilder {
    columns: Vec<MemoryColumn>,
    members: Option<Vec<usize>>,
}

impl MemoryTableBuilder {
    /// Adds a column of cells, `None` cells being missing.
    pub fn column(mut self, name: impl Into<String>, data: ColumnData) -> Self {
        self.columns.push(MemoryColumn {
            name: name.into(),
            data,
        });
        self
    }

    /// Adds an integer column without missing cells.
    pub fn integers(self, name: impl Into<String>, values: impl IntoIterator<Item = i64>) -> Self {
        let cells = values.into_iter().map(Some).collect();
        self.column(name, ColumnData::Integer(cells))
    }

    /// Adds a double column without missing cells.
    pub fn doubles(self, name: impl Into<String>, values: impl IntoIterator<Item = f64>) -> Self {
        let cells = values.into_iter().map(Some).collect();
        self.column(name, ColumnData::Double(cells))
    }

    /// Adds a string column without missing cells.
    pub fn strings<I, S>(self, name: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let cells = values.into_iter().map(|s| Some(s.into())).collect();
        self.column(name, ColumnData::String(cells))
    }

    /// Restricts the table to the given rows.
    pub fn members(mut self, rows: impl IntoIterator<Item = usize>) -> Self {
        self.members = Some(rows.into_iter().collect());
        self
    }

    /// Validates and builds the table.
    ///
    /// Columns must have equal lengths and distinct names; members must be strictly
    /// increasing row indexes within range.
    pub fn build(self) -> Result<MemoryTable, Error> {
        let row_count = self.columns.first().map_or(0, |c| c.data.len());
        let mut names = HashSet::new();
        for column in &self.columns {
            if !names.insert(column.name.as_str()) {
                return Err(Error::invalid_parameter("duplicate column name")
                    .with_context("column", &column.name));
            }
            if column.data.len() != row_count {
                return Err(Error::invalid_parameter("columns have different lengths")
                    .with_context("column", &column.name)
                    .with_context("expected", row_count)
                    .with_context("actual", column.data.len()));
            }
        }
        if let Some(members) = &self.members {
            if members.windows(2).any(|w| w[0] >= w[1]) {
                return Err(Error::invalid_parameter(
                    "member rows must be strictly increasing",
                ));
            }
            if members.last().is_some_and(|last| *last >= row_count) {
                return Err(Error::invalid_parameter("member row out of range")
                    .with_context("rows", row_count));
            }
        }
        Ok(MemoryTable {
            columns: self.columns,
            row_count,
            members: self.members,
        })
    }
}
