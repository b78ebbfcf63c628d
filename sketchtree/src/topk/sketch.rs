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

use std::collections::BTreeMap;

use tokio_util::sync::CancellationToken;
use tracing::trace;

use super::list::TopKList;
use crate::error::Error;
use crate::monoid::Monoid;
use crate::monoid::Sketch;
use crate::table::ColumnSet;
use crate::table::RecordOrder;
use crate::table::SortKey;
use crate::table::Table;
use crate::table::scan_rows;

/// Exact counts of the first `k` distinct rows of a table under a [`RecordOrder`].
///
/// Each partition keeps its own first `k` rows, so the merged result is exact only when
/// no row of the global top `k` was cut from a partition's list. Choose `k` at least as
/// large as the number of rows finally needed, with room for rows shared across
/// partitions.
///
/// # Examples
///
/// ```
/// # use sketchtree::monoid::summarize;
/// # use sketchtree::table::MemoryTable;
/// # use sketchtree::table::RecordOrder;
/// # use sketchtree::table::RowSnapshot;
/// # use sketchtree::topk::TopKSketch;
/// let table = MemoryTable::builder()
///     .strings("name", ["b", "a", "c", "a", "d"])
///     .build()
///     .unwrap();
/// let sketch = TopKSketch::new(RecordOrder::new().ascending("name"), 2).unwrap();
/// let top = summarize(&sketch, &table).unwrap();
/// assert_eq!(top.entries(), &[(RowSnapshot::of(["a"]), 2), (RowSnapshot::of(["b"]), 1)]);
/// ```
#[derive(Debug, Clone)]
pub struct TopKSketch {
    order: RecordOrder,
    k: usize,
}

impl TopKSketch {
    /// Creates a sketch keeping the first `k` rows under `order`.
    pub fn new(order: RecordOrder, k: usize) -> Result<Self, Error> {
        order.validate()?;
        if k == 0 {
            return Err(Error::invalid_parameter("k must be positive"));
        }
        Ok(Self { order, k })
    }

    /// Returns the record order.
    pub fn order(&self) -> &RecordOrder {
        &self.order
    }

    /// Returns the number of rows kept.
    pub fn k(&self) -> usize {
        self.k
    }
}

impl Monoid for TopKSketch {
    type Value = TopKList;

    fn zero(&self) -> Self::Value {
        TopKList::empty(self.order.clone(), self.k)
    }

    fn add(&self, left: &Self::Value, right: &Self::Value) -> Result<Self::Value, Error> {
        left.merge(right)
    }
}

impl<T: Table + ?Sized> Sketch<T> for TopKSketch {
    fn create(&self, data: &T, cancel: &CancellationToken) -> Result<Self::Value, Error> {
        let names = self.order.columns();
        let columns = ColumnSet::resolve(data, &names)?;
        let mut top: BTreeMap<SortKey, u64> = BTreeMap::new();
        let mut dropped = 0u64;
        scan_rows(data, cancel, |row| {
            let key = self.order.sort_key(columns.snapshot(row));
            if let Some(count) = top.get_mut(&key) {
                *count += 1;
                return;
            }
            if top.len() < self.k {
                top.insert(key, 1);
                return;
            }
            let beats_cutoff = top.last_key_value().is_some_and(|(cutoff, _)| key < *cutoff);
            if beats_cutoff {
                if let Some((_, evicted)) = top.pop_last() {
                    dropped += evicted;
                }
                top.insert(key, 1);
            } else {
                dropped += 1;
            }
        })?;
        trace!(kept = top.len(), dropped, "built top-k list");
        let entries = top
            .into_iter()
            .map(|(key, count)| (key.into_row(), count))
            .collect();
        Ok(TopKList::from_sorted(self.order.clone(), self.k, entries))
    }
}
