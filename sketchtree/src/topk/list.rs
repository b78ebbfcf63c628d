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

use crate::error::Error;
use crate::table::RecordOrder;
use crate::table::RowSnapshot;

/// The first `k` distinct rows under a [`RecordOrder`], with their exact counts.
#[derive(Debug, Clone, PartialEq)]
pub struct TopKList {
    order: RecordOrder,
    k: usize,
    entries: Vec<(RowSnapshot, u64)>,
}

impl TopKList {
    /// Creates a list over no data.
    pub fn empty(order: RecordOrder, k: usize) -> Self {
        Self {
            order,
            k,
            entries: vec![],
        }
    }

    pub(crate) fn from_sorted(
        order: RecordOrder,
        k: usize,
        entries: Vec<(RowSnapshot, u64)>,
    ) -> Self {
        debug_assert!(entries.len() <= k);
        Self { order, k, entries }
    }

    /// Returns the record order.
    pub fn order(&self) -> &RecordOrder {
        &self.order
    }

    /// Returns the maximum number of rows kept.
    pub fn k(&self) -> usize {
        self.k
    }

    /// Returns the number of rows kept.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if no row is kept.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns the rows and their counts, first row first.
    pub fn entries(&self) -> &[(RowSnapshot, u64)] {
        &self.entries
    }

    /// Returns the rows, first row first.
    pub fn rows(&self) -> impl Iterator<Item = &RowSnapshot> {
        self.entries.iter().map(|(row, _)| row)
    }

    /// Returns the count of `row`, if it is kept.
    pub fn count(&self, row: &RowSnapshot) -> Option<u64> {
        self.entries
            .binary_search_by(|(probe, _)| self.order.compare(probe, row))
            .ok()
            .map(|index| self.entries[index].1)
    }

    /// Returns the sum of the counts of the kept rows.
    pub fn total_count(&self) -> u64 {
        self.entries.iter().map(|(_, count)| count).sum()
    }

    /// Merges two lists, summing the counts of equal rows, and keeps the first `k` rows.
    pub fn merge(&self, other: &Self) -> Result<Self, Error> {
        if self.order != other.order {
            return Err(Error::schema_mismatch("record orders"));
        }
        if self.k != other.k {
            return Err(Error::schema_mismatch("k")
                .with_context("left", self.k)
                .with_context("right", other.k));
        }

        let mut entries = Vec::with_capacity(self.k.min(self.len() + other.len()));
        let mut left = self.entries.iter().peekable();
        let mut right = other.entries.iter().peekable();
        while entries.len() < self.k {
            let next = match (left.peek(), right.peek()) {
                (None, None) => break,
                (Some(_), None) => left.next().cloned(),
                (None, Some(_)) => right.next().cloned(),
                (Some((l, lc)), Some((r, rc))) => match self.order.compare(l, r) {
                    Ordering::Less => left.next().cloned(),
                    Ordering::Greater => right.next().cloned(),
                    Ordering::Equal => {
                        let merged = (l.clone(), lc + rc);
                        left.next();
                        right.next();
                        Some(merged)
                    }
                },
            };
            entries.extend(next);
        }
        Ok(Self::from_sorted(self.order.clone(), self.k, entries))
    }
}
