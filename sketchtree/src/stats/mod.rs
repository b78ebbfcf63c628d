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

//! Minimum, maximum, counts and raw moments of a numeric column.
//!
//! Moments are kept as running averages of `x^i` rather than sums, updated with
//! `moment = α·moment + β·x^i` where `α = n / (n + 1)` and `β = 1 - α`, so they stay on
//! the scale of the data however many rows are seen.
//!
//! Cells that read as NaN or an infinity are counted as missing. Extremes that tie on the
//! number keep the smaller cell, so the result does not depend on row or partition order.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::buckets::BucketKey;
use crate::error::Error;
use crate::monoid::Monoid;
use crate::monoid::Sketch;
use crate::table::StringConverter;
use crate::table::Table;
use crate::table::Value;
use crate::table::scan_rows;

/// Largest number of moments a [`BasicStatsSketch`] tracks.
pub const MAX_MOMENTS: usize = 16;

/// Statistics of the present cells of one column.
#[derive(Debug, Clone, PartialEq)]
pub struct BasicColStats {
    min: Option<f64>,
    max: Option<f64>,
    min_value: Option<Value>,
    max_value: Option<Value>,
    present_count: u64,
    missing_count: u64,
    moments: Vec<f64>,
}

impl BasicColStats {
    /// Creates statistics of no data, tracking `moments` moments.
    pub fn new(moments: usize) -> Self {
        Self {
            min: None,
            max: None,
            min_value: None,
            max_value: None,
            present_count: 0,
            missing_count: 0,
            moments: vec![0.0; moments],
        }
    }

    /// Returns the smallest value, if any cell was present.
    pub fn min(&self) -> Option<f64> {
        self.min
    }

    /// Returns the largest value, if any cell was present.
    pub fn max(&self) -> Option<f64> {
        self.max
    }

    /// Returns the cell holding the smallest value.
    pub fn min_value(&self) -> Option<&Value> {
        self.min_value.as_ref()
    }

    /// Returns the cell holding the largest value.
    pub fn max_value(&self) -> Option<&Value> {
        self.max_value.as_ref()
    }

    /// Returns the number of present cells.
    pub fn present_count(&self) -> u64 {
        self.present_count
    }

    /// Returns the number of missing cells.
    pub fn missing_count(&self) -> u64 {
        self.missing_count
    }

    /// Returns the number of rows seen.
    pub fn row_count(&self) -> u64 {
        self.present_count + self.missing_count
    }

    /// Returns the averages of `x`, `x^2`, ... over the present cells.
    pub fn moments(&self) -> &[f64] {
        &self.moments
    }

    /// Returns the mean, if at least one moment is tracked and a cell was present.
    pub fn mean(&self) -> Option<f64> {
        if self.present_count == 0 {
            return None;
        }
        self.moments.first().copied()
    }

    /// Returns the population variance, if at least two moments are tracked.
    pub fn variance(&self) -> Option<f64> {
        if self.present_count == 0 || self.moments.len() < 2 {
            return None;
        }
        let mean = self.moments[0];
        Some((self.moments[1] - mean * mean).max(0.0))
    }

    /// Returns the population standard deviation.
    pub fn stddev(&self) -> Option<f64> {
        self.variance().map(f64::sqrt)
    }

    fn observe(&mut self, x: f64, cell: impl FnOnce() -> Option<Value>) {
        let below = self.min.is_none_or(|min| x <= min);
        let above = self.max.is_none_or(|max| x >= max);
        if below || above {
            let cell = cell();
            if below && (self.min != Some(x) || cell < self.min_value) {
                self.min = Some(x);
                self.min_value = cell.clone();
            }
            if above && (self.max != Some(x) || cell < self.max_value) {
                self.max = Some(x);
                self.max_value = cell;
            }
        }

        let n = self.present_count as f64;
        let alpha = n / (n + 1.0);
        let beta = 1.0 - alpha;
        let mut power = 1.0;
        for moment in &mut self.moments {
            power *= x;
            *moment = alpha * *moment + beta * power;
        }
        self.present_count += 1;
    }

    /// Combines two statistics, weighting moments by present counts.
    pub fn union(&self, other: &Self) -> Result<Self, Error> {
        if self.moments.len() != other.moments.len() {
            return Err(Error::schema_mismatch("moment counts"));
        }
        let missing_count = self.missing_count + other.missing_count;
        if other.present_count == 0 {
            return Ok(Self {
                missing_count,
                ..self.clone()
            });
        }
        if self.present_count == 0 {
            return Ok(Self {
                missing_count,
                ..other.clone()
            });
        }

        let present_count = self.present_count + other.present_count;
        let alpha = self.present_count as f64 / present_count as f64;
        let beta = 1.0 - alpha;
        let moments = self
            .moments
            .iter()
            .zip(other.moments.iter())
            .map(|(l, r)| alpha * l + beta * r)
            .collect();

        let (min, min_value) = pick_extreme(
            (self.min, &self.min_value),
            (other.min, &other.min_value),
            |l, r| l < r,
        );
        let (max, max_value) = pick_extreme(
            (self.max, &self.max_value),
            (other.max, &other.max_value),
            |l, r| l > r,
        );
        Ok(Self {
            min,
            max,
            min_value,
            max_value,
            present_count,
            missing_count,
            moments,
        })
    }
}

/// Picks the side whose number wins `better`; ties go to the smaller cell so the choice
/// does not depend on operand order.
fn pick_extreme(
    left: (Option<f64>, &Option<Value>),
    right: (Option<f64>, &Option<Value>),
    better: impl Fn(f64, f64) -> bool,
) -> (Option<f64>, Option<Value>) {
    let take_left = match (left.0, right.0) {
        (Some(l), Some(r)) if l == r => left.1 <= right.1,
        (Some(l), Some(r)) => better(l, r),
        (Some(_), None) => true,
        (None, _) => false,
    };
    if take_left {
        (left.0, left.1.clone())
    } else {
        (right.0, right.1.clone())
    }
}

/// Summarizes one numeric column into [`BasicColStats`].
///
/// # Examples
///
/// ```
/// # use sketchtree::monoid::summarize;
/// # use sketchtree::stats::BasicStatsSketch;
/// # use sketchtree::table::MemoryTable;
/// let table = MemoryTable::builder()
///     .doubles("x", [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0])
///     .build()
///     .unwrap();
/// let stats = summarize(&BasicStatsSketch::new("x", 2).unwrap(), &table).unwrap();
/// assert_eq!(stats.min(), Some(2.0));
/// assert_eq!(stats.max(), Some(9.0));
/// assert!((stats.mean().unwrap() - 5.0).abs() < 1e-9);
/// assert!((stats.stddev().unwrap() - 2.0).abs() < 1e-9);
/// ```
#[derive(Debug, Clone)]
pub struct BasicStatsSketch {
    column: String,
    moments: usize,
    converter: Option<Arc<dyn StringConverter>>,
}

impl BasicStatsSketch {
    /// Creates a sketch of `column` tracking the first `moments` raw moments.
    pub fn new(column: impl Into<String>, moments: usize) -> Result<Self, Error> {
        if moments > MAX_MOMENTS {
            return Err(
                Error::invalid_parameter(format!("at most {MAX_MOMENTS} moments are supported"))
                    .with_context("moments", moments),
            );
        }
        Ok(Self {
            column: column.into(),
            moments,
            converter: None,
        })
    }

    /// Converts string cells to numbers.
    pub fn with_converter(mut self, converter: Arc<dyn StringConverter>) -> Self {
        self.converter = Some(converter);
        self
    }
}

impl Monoid for BasicStatsSketch {
    type Value = BasicColStats;

    fn zero(&self) -> Self::Value {
        BasicColStats::new(self.moments)
    }

    fn add(&self, left: &Self::Value, right: &Self::Value) -> Result<Self::Value, Error> {
        left.union(right)
    }
}

impl<T: Table + ?Sized> Sketch<T> for BasicStatsSketch {
    fn create(&self, data: &T, cancel: &CancellationToken) -> Result<Self::Value, Error> {
        let column = data.column(&self.column)?;
        let converter = self.converter.as_deref();
        f64::check_column(column, converter)?;
        let mut stats = self.zero();
        scan_rows(data, cancel, |row| match f64::read(column, row, converter) {
            Some(x) if x.is_finite() => stats.observe(x, || column.comparable(row)),
            _ => stats.missing_count += 1,
        })?;
        Ok(stats)
    }
}
