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

//! The smallest distinct strings of a column.

use std::collections::BTreeSet;

use tokio_util::sync::CancellationToken;

use crate::error::Error;
use crate::monoid::Monoid;
use crate::monoid::Sketch;
use crate::table::Table;
use crate::table::scan_rows;

/// At most `max_size` distinct strings, the lexicographically smallest ones seen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DistinctStrings {
    max_size: usize,
    values: BTreeSet<String>,
    truncated: bool,
    rows_scanned: u64,
    has_missing: bool,
}

impl DistinctStrings {
    /// Creates an empty set keeping up to `max_size` strings.
    pub fn new(max_size: usize) -> Self {
        Self {
            max_size,
            values: BTreeSet::new(),
            truncated: false,
            rows_scanned: 0,
            has_missing: false,
        }
    }

    /// Returns the maximum number of strings kept.
    pub fn max_size(&self) -> usize {
        self.max_size
    }

    /// Returns the kept strings in increasing order.
    pub fn values(&self) -> impl Iterator<Item = &str> {
        self.values.iter().map(String::as_str)
    }

    /// Returns the number of kept strings.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns true if no string is kept.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Returns true if `value` is kept.
    pub fn contains(&self, value: &str) -> bool {
        self.values.contains(value)
    }

    /// Returns true if more than `max_size` distinct strings were seen.
    pub fn is_truncated(&self) -> bool {
        self.truncated
    }

    /// Returns the number of rows scanned.
    pub fn rows_scanned(&self) -> u64 {
        self.rows_scanned
    }

    /// Returns true if a missing cell was seen.
    pub fn has_missing(&self) -> bool {
        self.has_missing
    }

    fn insert(&mut self, value: String) {
        if self.values.len() == self.max_size {
            match self.values.last() {
                Some(largest) if value >= *largest => {
                    if value != *largest {
                        self.truncated = true;
                    }
                    return;
                }
                _ => {}
            }
        }
        if self.values.insert(value) && self.values.len() > self.max_size {
            self.values.pop_last();
            self.truncated = true;
        }
    }

    /// Unions two sets, keeping the `max_size` smallest strings.
    pub fn union(&self, other: &Self) -> Result<Self, Error> {
        if self.max_size != other.max_size {
            return Err(Error::schema_mismatch("maximum sizes")
                .with_context("left", self.max_size)
                .with_context("right", other.max_size));
        }
        let mut values: BTreeSet<String> = self.values.union(&other.values).cloned().collect();
        let mut truncated = self.truncated || other.truncated;
        while values.len() > self.max_size {
            values.pop_last();
            truncated = true;
        }
        Ok(Self {
            max_size: self.max_size,
            values,
            truncated,
            rows_scanned: self.rows_scanned + other.rows_scanned,
            has_missing: self.has_missing || other.has_missing,
        })
    }
}

/// Collects the distinct strings of one column.
///
/// # Examples
///
/// ```
/// # use sketchtree::distinct::DistinctStringsSketch;
/// # use sketchtree::monoid::summarize;
/// # use sketchtree::table::MemoryTable;
/// let table = MemoryTable::builder()
///     .strings("city", ["Oslo", "Bergen", "Oslo", "Tromsø"])
///     .build()
///     .unwrap();
/// let sketch = DistinctStringsSketch::new("city", 2).unwrap();
/// let distinct = summarize(&sketch, &table).unwrap();
/// assert_eq!(distinct.values().collect::<Vec<_>>(), vec!["Bergen", "Oslo"]);
/// assert!(distinct.is_truncated());
/// ```
#[derive(Debug, Clone)]
pub struct DistinctStringsSketch {
    column: String,
    max_size: usize,
}

impl DistinctStringsSketch {
    /// Creates a sketch keeping up to `max_size` strings of `column`.
    pub fn new(column: impl Into<String>, max_size: usize) -> Result<Self, Error> {
        if max_size == 0 {
            return Err(Error::invalid_parameter("max_size must be positive"));
        }
        Ok(Self {
            column: column.into(),
            max_size,
        })
    }
}

impl Monoid for DistinctStringsSketch {
    type Value = DistinctStrings;

    fn zero(&self) -> Self::Value {
        DistinctStrings::new(self.max_size)
    }

    fn add(&self, left: &Self::Value, right: &Self::Value) -> Result<Self::Value, Error> {
        left.union(right)
    }
}

impl<T: Table + ?Sized> Sketch<T> for DistinctStringsSketch {
    fn create(&self, data: &T, cancel: &CancellationToken) -> Result<Self::Value, Error> {
        let column = data.column(&self.column)?;
        let mut distinct = self.zero();
        scan_rows(data, cancel, |row| {
            distinct.rows_scanned += 1;
            match column.as_string(row) {
                Some(value) => distinct.insert(value),
                None => distinct.has_missing = true,
            }
        })?;
        Ok(distinct)
    }
}
