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

use tokio_util::sync::CancellationToken;
use tracing::trace;

use super::frequency_map::FrequencyMap;
use super::list::FrequencyList;
use crate::error::Error;
use crate::monoid::Monoid;
use crate::monoid::Sketch;
use crate::table::ColumnSet;
use crate::table::Table;
use crate::table::scan_rows;

/// Heavy hitters over the combined values of some columns, using at most `k` counters.
///
/// See the [frequencies module level documentation](crate::frequencies) for more.
#[derive(Debug, Clone)]
pub struct FrequencySketch {
    columns: Vec<String>,
    k: usize,
}

impl FrequencySketch {
    /// Creates a sketch counting the values of `columns` with `k` counters.
    pub fn new<I, S>(columns: I, k: usize) -> Result<Self, Error>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let columns: Vec<String> = columns.into_iter().map(Into::into).collect();
        if columns.is_empty() {
            return Err(Error::invalid_parameter("at least one column is required"));
        }
        if k == 0 {
            return Err(Error::invalid_parameter("k must be positive"));
        }
        Ok(Self { columns, k })
    }

    /// Returns the number of counters.
    pub fn k(&self) -> usize {
        self.k
    }

    /// Returns the counted columns.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }
}

impl Monoid for FrequencySketch {
    type Value = FrequencyList;

    fn zero(&self) -> Self::Value {
        FrequencyList::empty(self.columns.clone(), self.k)
    }

    fn add(&self, left: &Self::Value, right: &Self::Value) -> Result<Self::Value, Error> {
        left.merge(right)
    }
}

impl<T: Table + ?Sized> Sketch<T> for FrequencySketch {
    fn create(&self, data: &T, cancel: &CancellationToken) -> Result<Self::Value, Error> {
        let columns = ColumnSet::resolve(data, &self.columns)?;
        let mut map = FrequencyMap::with_expected(self.k);
        let mut rows = 0u64;
        scan_rows(data, cancel, |row| {
            rows += 1;
            map.increment_bounded(columns.snapshot(row), self.k);
        })?;
        trace!(rows, candidates = map.num_active(), "built frequency list");
        Ok(FrequencyList::from_map(self.columns.clone(), self.k, rows, map))
    }
}
