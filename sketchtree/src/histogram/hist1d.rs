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

use tokio_util::sync::CancellationToken;

use crate::buckets::BucketKey;
use crate::buckets::BucketsDescription;
use crate::error::Error;
use crate::error::ErrorKind;
use crate::table::ColumnSet;
use crate::table::RowSnapshot;
use crate::table::StringConverter;
use crate::table::Table;
use crate::table::scan_rows;

/// Bucket counts of one column plus the rows that fell outside the buckets.
///
/// Invariant: `total() + missing_data() + out_of_range()` is the number of rows scanned.
#[derive(Debug, Clone, PartialEq)]
pub struct Histogram1D<B: BucketsDescription> {
    buckets: B,
    counts: Vec<u64>,
    missing_data: u64,
    out_of_range: u64,
    initialized: bool,
}

impl<B: BucketsDescription> Histogram1D<B> {
    /// Creates an empty histogram over `buckets`.
    pub fn new(buckets: B) -> Self {
        let counts = vec![0; buckets.num_buckets()];
        Self {
            buckets,
            counts,
            missing_data: 0,
            out_of_range: 0,
            initialized: false,
        }
    }

    /// Returns the bucket description.
    pub fn buckets(&self) -> &B {
        &self.buckets
    }

    /// Returns the per-bucket counts.
    pub fn counts(&self) -> &[u64] {
        &self.counts
    }

    /// Returns the count of one bucket.
    pub fn bucket_count(&self, bucket: usize) -> u64 {
        self.counts[bucket]
    }

    /// Returns the number of rows whose cell was missing.
    pub fn missing_data(&self) -> u64 {
        self.missing_data
    }

    /// Returns the number of rows whose value fell outside every bucket.
    pub fn out_of_range(&self) -> u64 {
        self.out_of_range
    }

    /// Returns the number of rows counted in some bucket.
    pub fn total(&self) -> u64 {
        self.counts.iter().sum()
    }

    /// Returns every row accounted for: bucketed, missing or out of range.
    pub fn row_count(&self) -> u64 {
        self.total() + self.missing_data + self.out_of_range
    }

    /// Returns true once data has been scanned into this histogram or one merged into it.
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Returns the running sums of the bucket counts.
    pub fn cdf(&self) -> Vec<u64> {
        self.counts
            .iter()
            .scan(0u64, |sum, count| {
                *sum += count;
                Some(*sum)
            })
            .collect()
    }

    /// Scans `column` of every member row of `table` into this histogram.
    ///
    /// Fails with [`ErrorKind::DoubleInitialization`] if the histogram was already populated.
    pub fn create_histogram<T: Table + ?Sized>(
        &mut self,
        table: &T,
        column: &str,
        converter: Option<&dyn StringConverter>,
        cancel: &CancellationToken,
    ) -> Result<(), Error> {
        self.begin_population()?;
        let column = table.column(column)?;
        B::Key::check_column(column, converter)?;
        scan_rows(table, cancel, |row| {
            self.record(B::Key::read(column, row, converter).as_ref());
        })
    }

    /// Returns the sum of two histograms over the same buckets.
    pub fn union(&self, other: &Self) -> Result<Self, Error> {
        if self.buckets != other.buckets {
            return Err(Error::schema_mismatch("bucket boundaries"));
        }
        let counts = self
            .counts
            .iter()
            .zip(other.counts.iter())
            .map(|(a, b)| a + b)
            .collect();
        Ok(Self {
            buckets: self.buckets.clone(),
            counts,
            missing_data: self.missing_data + other.missing_data,
            out_of_range: self.out_of_range + other.out_of_range,
            initialized: self.initialized || other.initialized,
        })
    }

    pub(crate) fn begin_population(&mut self) -> Result<(), Error> {
        if self.initialized {
            return Err(Error::new(
                ErrorKind::DoubleInitialization,
                "histogram has already been populated",
            ));
        }
        self.initialized = true;
        Ok(())
    }

    /// Counts one observation and returns the bucket it landed in.
    pub(crate) fn record(&mut self, key: Option<&B::Key>) -> Option<usize> {
        let Some(key) = key else {
            self.missing_data += 1;
            return None;
        };
        match self.buckets.index_of(key) {
            Some(index) => {
                self.counts[index] += 1;
                Some(index)
            }
            None => {
                self.out_of_range += 1;
                None
            }
        }
    }
}

/// Smallest and largest value seen in a bucket with the rows that held them.
#[derive(Debug, Clone, PartialEq)]
pub struct BucketExtremes<K> {
    min: K,
    min_row: RowSnapshot,
    max: K,
    max_row: RowSnapshot,
}

impl<K: BucketKey> BucketExtremes<K> {
    pub(crate) fn single(value: K, row: RowSnapshot) -> Self {
        Self {
            min: value.clone(),
            min_row: row.clone(),
            max: value,
            max_row: row,
        }
    }

    /// Returns the smallest value.
    pub fn min(&self) -> &K {
        &self.min
    }

    /// Returns the row holding the smallest value.
    pub fn min_row(&self) -> &RowSnapshot {
        &self.min_row
    }

    /// Returns the largest value.
    pub fn max(&self) -> &K {
        &self.max
    }

    /// Returns the row holding the largest value.
    pub fn max_row(&self) -> &RowSnapshot {
        &self.max_row
    }

    /// True if `(value, row)` would replace the minimum. Equal values are decided by row
    /// so the outcome does not depend on scan or merge order.
    pub(crate) fn improves_min(&self, value: &K, row: &RowSnapshot) -> bool {
        match value.partial_cmp(&self.min) {
            Some(Ordering::Less) => true,
            Some(Ordering::Equal) => row < &self.min_row,
            _ => false,
        }
    }

    pub(crate) fn improves_max(&self, value: &K, row: &RowSnapshot) -> bool {
        match value.partial_cmp(&self.max) {
            Some(Ordering::Greater) => true,
            Some(Ordering::Equal) => row > &self.max_row,
            _ => false,
        }
    }

    pub(crate) fn union(&self, other: &Self) -> Self {
        let mut result = self.clone();
        if result.improves_min(&other.min, &other.min_row) {
            result.min = other.min.clone();
            result.min_row = other.min_row.clone();
        }
        if result.improves_max(&other.max, &other.max_row) {
            result.max = other.max.clone();
            result.max_row = other.max_row.clone();
        }
        result
    }
}

pub(crate) fn observe_extremes<K: BucketKey>(
    slot: &mut Option<BucketExtremes<K>>,
    value: &K,
    snapshot: impl FnOnce() -> RowSnapshot,
) {
    match slot {
        None => *slot = Some(BucketExtremes::single(value.clone(), snapshot())),
        Some(extremes) => {
            // only snapshot rows that can win: anything not strictly inside (min, max)
            let beyond_min = value.partial_cmp(&extremes.min) != Some(Ordering::Greater);
            let beyond_max = value.partial_cmp(&extremes.max) != Some(Ordering::Less);
            if !beyond_min && !beyond_max {
                return;
            }
            let row = snapshot();
            if beyond_min && extremes.improves_min(value, &row) {
                extremes.min = value.clone();
                extremes.min_row = row.clone();
            }
            if beyond_max && extremes.improves_max(value, &row) {
                extremes.max = value.clone();
                extremes.max_row = row;
            }
        }
    }
}

pub(crate) fn union_extremes<K: BucketKey>(
    left: &[Option<BucketExtremes<K>>],
    right: &[Option<BucketExtremes<K>>],
) -> Vec<Option<BucketExtremes<K>>> {
    left.iter()
        .zip(right.iter())
        .map(|(l, r)| match (l, r) {
            (Some(l), Some(r)) => Some(l.union(r)),
            (Some(x), None) | (None, Some(x)) => Some(x.clone()),
            (None, None) => None,
        })
        .collect()
}

/// A [`Histogram1D`] that also keeps, per bucket, the extreme values and their rows.
///
/// Rows are captured as snapshots of a configured list of columns.
#[derive(Debug, Clone, PartialEq)]
pub struct HeavyHistogram1D<B: BucketsDescription> {
    histogram: Histogram1D<B>,
    extremes: Vec<Option<BucketExtremes<B::Key>>>,
}

impl<B: BucketsDescription> HeavyHistogram1D<B> {
    /// Creates an empty heavy histogram over `buckets`.
    pub fn new(buckets: B) -> Self {
        let extremes = vec![None; buckets.num_buckets()];
        Self {
            histogram: Histogram1D::new(buckets),
            extremes,
        }
    }

    /// Returns the plain bucket counts.
    pub fn histogram(&self) -> &Histogram1D<B> {
        &self.histogram
    }

    /// Returns the extremes of one bucket, `None` if the bucket is empty.
    pub fn extremes(&self, bucket: usize) -> Option<&BucketExtremes<B::Key>> {
        self.extremes[bucket].as_ref()
    }

    /// Scans the member rows of `table`, snapshotting `row_columns` for extreme rows.
    pub fn create_histogram<T: Table + ?Sized, S: AsRef<str>>(
        &mut self,
        table: &T,
        column: &str,
        row_columns: &[S],
        converter: Option<&dyn StringConverter>,
        cancel: &CancellationToken,
    ) -> Result<(), Error> {
        self.histogram.begin_population()?;
        let column = table.column(column)?;
        B::Key::check_column(column, converter)?;
        let row_columns = ColumnSet::resolve(table, row_columns)?;
        let histogram = &mut self.histogram;
        let extremes = &mut self.extremes;
        scan_rows(table, cancel, |row| {
            let key = B::Key::read(column, row, converter);
            if let Some(index) = histogram.record(key.as_ref()) {
                if let Some(key) = &key {
                    observe_extremes(&mut extremes[index], key, || row_columns.snapshot(row));
                }
            }
        })
    }

    /// Returns the union of two heavy histograms over the same buckets.
    pub fn union(&self, other: &Self) -> Result<Self, Error> {
        Ok(Self {
            histogram: self.histogram.union(&other.histogram)?,
            extremes: union_extremes(&self.extremes, &other.extremes),
        })
    }
}
