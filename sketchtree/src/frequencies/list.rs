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

use std::cmp::Ordering;

use super::frequency_map::FrequencyMap;
use crate::error::Error;
use crate::table::RowSnapshot;

/// Error guarantees for frequent item queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorType {
    /// Include items if upper bound exceeds threshold (no false negatives).
    NoFalseNegatives,
    /// Include items if lower bound exceeds threshold (no false positives).
    NoFalsePositives,
}

/// Result row for frequent item queries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
    item: RowSnapshot,
    estimate: u64,
    upper_bound: u64,
    lower_bound: u64,
}

impl Row {
    /// Returns the item.
    pub fn item(&self) -> &RowSnapshot {
        &self.item
    }

    /// Returns the estimated frequency.
    pub fn estimate(&self) -> u64 {
        self.estimate
    }

    /// Returns the upper bound for the frequency.
    pub fn upper_bound(&self) -> u64 {
        self.upper_bound
    }

    /// Returns the lower bound for the frequency.
    pub fn lower_bound(&self) -> u64 {
        self.lower_bound
    }
}

/// Up to `k` candidate heavy hitters with counts that never exceed their true frequency.
///
/// Any item occurring more than `total_rows() / (k + 1)` times is present, and its
/// reported count is short of its true frequency by at most that much.
#[derive(Debug, Clone, PartialEq)]
pub struct FrequencyList {
    columns: Vec<String>,
    k: usize,
    total_rows: u64,
    counts: Vec<(RowSnapshot, u64)>,
}

impl FrequencyList {
    /// Creates a list over no data.
    pub fn empty(columns: Vec<String>, k: usize) -> Self {
        Self {
            columns,
            k,
            total_rows: 0,
            counts: vec![],
        }
    }

    pub(crate) fn from_map(
        columns: Vec<String>,
        k: usize,
        total_rows: u64,
        map: FrequencyMap<RowSnapshot>,
    ) -> Self {
        let mut counts: Vec<_> = map
            .into_entries()
            .into_iter()
            .filter(|(_, count)| *count > 0)
            .map(|(item, count)| (item, count as u64))
            .collect();
        counts.sort_by(by_count_then_item);
        debug_assert!(counts.len() <= k);
        Self {
            columns,
            k,
            total_rows,
            counts,
        }
    }

    /// Returns the columns an item is made of.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Returns the maximum number of candidates.
    pub fn k(&self) -> usize {
        self.k
    }

    /// Returns the number of rows summarized.
    pub fn total_rows(&self) -> u64 {
        self.total_rows
    }

    /// Returns the candidates with their lower-bound counts, largest count first.
    pub fn counts(&self) -> &[(RowSnapshot, u64)] {
        &self.counts
    }

    /// Returns true if there are no candidates.
    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// Returns the most a reported count may fall short of the true frequency.
    pub fn maximum_error(&self) -> u64 {
        self.total_rows / (self.k as u64 + 1)
    }

    /// Returns the lower bound of the frequency of `item`.
    pub fn lower_bound(&self, item: &RowSnapshot) -> u64 {
        self.counts
            .iter()
            .find(|(candidate, _)| candidate == item)
            .map_or(0, |(_, count)| *count)
    }

    /// Returns the upper bound of the frequency of `item`.
    pub fn upper_bound(&self, item: &RowSnapshot) -> u64 {
        self.lower_bound(item) + self.maximum_error()
    }

    /// Returns the estimated frequency of `item`, zero if it is not a candidate.
    pub fn estimate(&self, item: &RowSnapshot) -> u64 {
        match self.lower_bound(item) {
            0 => 0,
            count => count + self.maximum_error(),
        }
    }

    /// Returns frequent items using the maximum error as threshold.
    pub fn frequent_items(&self, error_type: ErrorType) -> Vec<Row> {
        let threshold = self.maximum_error();
        self.counts
            .iter()
            .filter_map(|(item, count)| {
                let lower = *count;
                let upper = count + threshold;
                let include = match error_type {
                    ErrorType::NoFalseNegatives => upper > threshold,
                    ErrorType::NoFalsePositives => lower > threshold,
                };
                include.then(|| Row {
                    item: item.clone(),
                    estimate: upper,
                    upper_bound: upper,
                    lower_bound: lower,
                })
            })
            .collect()
    }

    /// Returns the `n` candidates with the largest counts.
    pub fn top(&self, n: usize) -> &[(RowSnapshot, u64)] {
        &self.counts[..n.min(self.counts.len())]
    }

    /// Sums the candidate counts and evicts down to `k` candidates.
    pub fn merge(&self, other: &Self) -> Result<Self, Error> {
        if self.columns != other.columns {
            return Err(Error::schema_mismatch("columns"));
        }
        if self.k != other.k {
            return Err(Error::schema_mismatch("k")
                .with_context("left", self.k)
                .with_context("right", other.k));
        }
        let mut map = FrequencyMap::with_expected(self.counts.len() + other.counts.len());
        for (item, count) in self.counts.iter().chain(other.counts.iter()) {
            map.adjust_or_put_value(item.clone(), *count as i64);
        }
        map.retain_largest(self.k);
        Ok(Self::from_map(
            self.columns.clone(),
            self.k,
            self.total_rows + other.total_rows,
            map,
        ))
    }
}

fn by_count_then_item(a: &(RowSnapshot, u64), b: &(RowSnapshot, u64)) -> Ordering {
    b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0))
}
