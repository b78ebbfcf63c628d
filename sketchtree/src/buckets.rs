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

//! Bucket boundaries shared by the histogram summaries.
//!
//! A description defines `n ≥ 1` contiguous buckets. Bucket `i` covers
//! `[lower_bound(i), upper_bound(i))`, except the last one which is closed on the right.
//! Values outside `[lower_bound(0), upper_bound(n - 1)]` belong to no bucket.
//!
//! # Usage
//!
//! ```rust
//! # use sketchtree::buckets::BucketsDescription;
//! # use sketchtree::buckets::ExplicitBuckets;
//! # use sketchtree::buckets::UniformBuckets;
//! let explicit = ExplicitBuckets::new(vec![0.0, 10.0, 20.0, 30.0]).unwrap();
//! assert_eq!(explicit.index_of(&10.0), Some(1));
//! assert_eq!(explicit.index_of(&30.0), Some(2));
//! assert_eq!(explicit.index_of(&35.0), None);
//!
//! let uniform = UniformBuckets::new(0.0, 30.0, 3).unwrap();
//! assert_eq!(uniform.index_of(&20.0), Some(2));
//! ```

use std::fmt;

use crate::error::Error;
use crate::table::Column;
use crate::table::ContentsKind;
use crate::table::StringConverter;

/// A value that can be placed into buckets and read from a column.
pub trait BucketKey: Clone + PartialOrd + fmt::Debug + Send + Sync + 'static {
    /// Reads the cell at `row`; `None` when it is missing.
    fn read(column: &dyn Column, row: usize, converter: Option<&dyn StringConverter>)
    -> Option<Self>;

    /// Rejects columns this key cannot be read from.
    fn check_column(
        column: &dyn Column,
        converter: Option<&dyn StringConverter>,
    ) -> Result<(), Error>;
}

impl BucketKey for f64 {
    fn read(
        column: &dyn Column,
        row: usize,
        converter: Option<&dyn StringConverter>,
    ) -> Option<Self> {
        column.as_double(row, converter)
    }

    fn check_column(
        column: &dyn Column,
        converter: Option<&dyn StringConverter>,
    ) -> Result<(), Error> {
        if column.kind() == ContentsKind::String && converter.is_none() {
            return Err(Error::invalid_parameter(
                "numeric buckets over a string column need a string converter",
            )
            .with_context("column", column.name()));
        }
        Ok(())
    }
}

impl BucketKey for String {
    fn read(
        column: &dyn Column,
        row: usize,
        _converter: Option<&dyn StringConverter>,
    ) -> Option<Self> {
        column.as_string(row)
    }

    fn check_column(
        _column: &dyn Column,
        _converter: Option<&dyn StringConverter>,
    ) -> Result<(), Error> {
        Ok(())
    }
}

/// Boundaries of a set of contiguous buckets.
pub trait BucketsDescription: Clone + PartialEq + fmt::Debug + Send + Sync + 'static {
    /// Type of the bucketed values.
    type Key: BucketKey;

    /// Returns the number of buckets.
    fn num_buckets(&self) -> usize;

    /// Returns the bucket containing `key`, `None` when it is out of range.
    fn index_of(&self, key: &Self::Key) -> Option<usize>;

    /// Returns the inclusive left boundary of `bucket`.
    fn lower_bound(&self, bucket: usize) -> Self::Key;

    /// Returns the right boundary of `bucket`, exclusive except for the last bucket.
    fn upper_bound(&self, bucket: usize) -> Self::Key;
}

/// Buckets given by an explicit, strictly increasing boundary array.
///
/// `n + 1` boundaries describe `n` buckets.
#[derive(Debug, Clone, PartialEq)]
pub struct ExplicitBuckets<K> {
    boundaries: Vec<K>,
}

impl<K: BucketKey> ExplicitBuckets<K> {
    /// Creates buckets from at least two strictly increasing boundaries.
    pub fn new(boundaries: Vec<K>) -> Result<Self, Error> {
        if boundaries.len() < 2 {
            return Err(Error::invalid_parameter(
                "at least two bucket boundaries are required",
            )
            .with_context("boundaries", boundaries.len()));
        }
        // `<` is false for NaN, which rejects it as well
        if let Some(position) = boundaries.windows(2).position(|w| !(w[0] < w[1])) {
            return Err(
                Error::invalid_parameter("bucket boundaries must be strictly increasing")
                    .with_context("position", position + 1),
            );
        }
        Ok(Self { boundaries })
    }

    /// Returns the boundary array.
    pub fn boundaries(&self) -> &[K] {
        &self.boundaries
    }
}

impl<K: BucketKey> BucketsDescription for ExplicitBuckets<K> {
    type Key = K;

    fn num_buckets(&self) -> usize {
        self.boundaries.len() - 1
    }

    fn index_of(&self, key: &K) -> Option<usize> {
        let first = &self.boundaries[0];
        let last = &self.boundaries[self.boundaries.len() - 1];
        if !(key >= first && key <= last) {
            return None;
        }
        if key == last {
            return Some(self.num_buckets() - 1);
        }
        // first boundary strictly greater than key, minus one
        Some(self.boundaries.partition_point(|b| b <= key) - 1)
    }

    fn lower_bound(&self, bucket: usize) -> K {
        self.boundaries[bucket].clone()
    }

    fn upper_bound(&self, bucket: usize) -> K {
        self.boundaries[bucket + 1].clone()
    }
}

/// `count` equal-width numeric buckets covering `[min, max]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UniformBuckets {
    min: f64,
    max: f64,
    count: usize,
}

impl UniformBuckets {
    /// Creates uniform buckets.
    ///
    /// `min` and `max` must be finite with `min <= max`; `count` must be positive and is
    /// required to be 1 when `min == max`.
    pub fn new(min: f64, max: f64, count: usize) -> Result<Self, Error> {
        if !min.is_finite() || !max.is_finite() {
            return Err(Error::invalid_parameter("bucket range must be finite"));
        }
        if min > max {
            return Err(Error::invalid_parameter("bucket minimum exceeds maximum")
                .with_context("min", min)
                .with_context("max", max));
        }
        if count == 0 {
            return Err(Error::invalid_parameter("bucket count must be positive"));
        }
        if min == max && count != 1 {
            return Err(Error::invalid_parameter(
                "an empty range supports a single bucket",
            )
            .with_context("count", count));
        }
        Ok(Self { min, max, count })
    }

    /// Returns the low end of the range.
    pub fn min(&self) -> f64 {
        self.min
    }

    /// Returns the high end of the range.
    pub fn max(&self) -> f64 {
        self.max
    }

    fn boundary(&self, index: usize) -> f64 {
        if index >= self.count {
            return self.max;
        }
        self.min + (self.max - self.min) * (index as f64) / (self.count as f64)
    }
}

impl BucketsDescription for UniformBuckets {
    type Key = f64;

    fn num_buckets(&self) -> usize {
        self.count
    }

    fn index_of(&self, key: &f64) -> Option<usize> {
        let value = *key;
        if !(value >= self.min && value <= self.max) {
            return None;
        }
        if value == self.max {
            return Some(self.count - 1);
        }
        let scaled = (value - self.min) / (self.max - self.min) * (self.count as f64);
        let mut index = (scaled.floor() as usize).min(self.count - 1);
        // the arithmetic guess may be off by one near a boundary; settle it against
        // the same boundary formula lower_bound/upper_bound report
        while index > 0 && value < self.boundary(index) {
            index -= 1;
        }
        while index + 1 < self.count && value >= self.boundary(index + 1) {
            index += 1;
        }
        Some(index)
    }

    fn lower_bound(&self, bucket: usize) -> f64 {
        self.boundary(bucket)
    }

    fn upper_bound(&self, bucket: usize) -> f64 {
        self.boundary(bucket + 1)
    }
}
