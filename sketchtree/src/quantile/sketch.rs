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
use tracing::trace;

use super::list::QuantileList;
use super::list::equally_spaced;
use super::list::pick;
use crate::common::RandomSource;
use crate::common::XorShift64;
use crate::error::Error;
use crate::monoid::Monoid;
use crate::monoid::Sketch;
use crate::table::ColumnSet;
use crate::table::RecordOrder;
use crate::table::RowSnapshot;
use crate::table::Table;
use crate::table::scan_rows;

/// Default number of requested quantile buckets.
pub const DEFAULT_RESOLUTION: usize = 100;
/// Default number of rows sampled per requested bucket.
pub const DEFAULT_PER_BIN: usize = 100;
/// Default number of samples kept per requested bucket.
pub const DEFAULT_SLACK: usize = 10;

/// How rank bounds are assigned to the samples of one partition.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum RankBounds {
    /// Count exactly, with a second pass, the rows sorting strictly before and after each
    /// kept sample.
    #[default]
    Counted,
    /// Interpolate from the sample position: for sample `i` of `m` drawn from `n` rows,
    /// `wins = round((i + 1) * n / (m + 1))` and `losses = round((m - i - 1) * n / (m + 1))`.
    ///
    /// Needs a single pass, but the bounds are estimates and may not contain the true rank.
    Interpolated,
}

/// Approximate quantiles of a table under a [`RecordOrder`].
///
/// # Examples
///
/// ```
/// # use sketchtree::monoid::summarize;
/// # use sketchtree::quantile::QuantileSketch;
/// # use sketchtree::table::MemoryTable;
/// # use sketchtree::table::RecordOrder;
/// let table = MemoryTable::builder()
///     .integers("x", 0..1000)
///     .build()
///     .unwrap();
/// let sketch = QuantileSketch::builder(RecordOrder::new().ascending("x"))
///     .resolution(10)
///     .build()
///     .unwrap();
/// let list = summarize(&sketch, &table).unwrap();
/// assert_eq!(list.data_size(), 1000);
/// for i in 0..list.len() {
///     let (lower, upper) = list.rank_bounds(i).unwrap();
///     assert!(lower <= upper);
/// }
/// ```
#[derive(Debug, Clone)]
pub struct QuantileSketch {
    order: RecordOrder,
    resolution: usize,
    per_bin: usize,
    slack: usize,
    seed: u64,
    rank_bounds: RankBounds,
}

impl QuantileSketch {
    /// Starts configuring a sketch over `order`.
    pub fn builder(order: RecordOrder) -> QuantileSketchBuilder {
        QuantileSketchBuilder {
            order,
            resolution: DEFAULT_RESOLUTION,
            per_bin: DEFAULT_PER_BIN,
            slack: DEFAULT_SLACK,
            seed: None,
            rank_bounds: RankBounds::default(),
        }
    }

    /// Returns the record order.
    pub fn order(&self) -> &RecordOrder {
        &self.order
    }

    /// Returns the number of rows sampled from each partition.
    pub fn sample_size(&self) -> usize {
        self.resolution * self.per_bin
    }

    /// Returns the maximum number of samples in a [`QuantileList`].
    pub fn max_size(&self) -> usize {
        self.resolution * self.slack
    }

    /// Returns the rank bounds mode.
    pub fn rank_bounds(&self) -> RankBounds {
        self.rank_bounds
    }

    fn reservoir<T: Table + ?Sized>(
        &self,
        table: &T,
        columns: &ColumnSet<'_>,
        cancel: &CancellationToken,
    ) -> Result<(Vec<RowSnapshot>, u64), Error> {
        let capacity = self.sample_size();
        let mut rng = XorShift64::seeded(self.seed);
        let mut reservoir = Vec::with_capacity(capacity.min(table.num_rows()));
        let mut seen = 0u64;
        scan_rows(table, cancel, |row| {
            seen += 1;
            if reservoir.len() < capacity {
                reservoir.push(columns.snapshot(row));
            } else {
                let slot = rng.next_below(seen) as usize;
                if slot < capacity {
                    reservoir[slot] = columns.snapshot(row);
                }
            }
        })?;
        Ok((reservoir, seen))
    }

    /// Counts the rows of `table` sorting strictly before and after each of `samples`.
    fn count_bounds<T: Table + ?Sized>(
        &self,
        table: &T,
        columns: &ColumnSet<'_>,
        samples: &[RowSnapshot],
        cancel: &CancellationToken,
    ) -> Result<(Vec<u64>, Vec<u64>), Error> {
        // below_from[a]: rows strictly before every sample from position a on.
        // above_until[b]: rows strictly after every sample before position b.
        let mut below_from = vec![0u64; samples.len() + 1];
        let mut above_until = vec![0u64; samples.len() + 1];
        scan_rows(table, cancel, |row| {
            let row = columns.snapshot(row);
            let not_after =
                samples.partition_point(|s| self.order.compare(s, &row) != Ordering::Greater);
            let before =
                samples.partition_point(|s| self.order.compare(s, &row) == Ordering::Less);
            below_from[not_after] += 1;
            above_until[before] += 1;
        })?;

        let mut wins = Vec::with_capacity(samples.len());
        let mut running = 0;
        for count in &below_from[..samples.len()] {
            running += count;
            wins.push(running);
        }
        let mut losses = vec![0; samples.len()];
        let mut running = 0;
        for index in (0..samples.len()).rev() {
            running += above_until[index + 1];
            losses[index] = running;
        }
        Ok((wins, losses))
    }
}

/// Builder for [`QuantileSketch`].
#[derive(Debug, Clone)]
pub struct QuantileSketchBuilder {
    order: RecordOrder,
    resolution: usize,
    per_bin: usize,
    slack: usize,
    seed: Option<u64>,
    rank_bounds: RankBounds,
}

impl QuantileSketchBuilder {
    /// Sets the number of quantile buckets the result should resolve.
    pub fn resolution(mut self, resolution: usize) -> Self {
        self.resolution = resolution;
        self
    }

    /// Sets how many rows are sampled per bucket.
    pub fn per_bin(mut self, per_bin: usize) -> Self {
        self.per_bin = per_bin;
        self
    }

    /// Sets how many samples are kept per bucket.
    pub fn slack(mut self, slack: usize) -> Self {
        self.slack = slack;
        self
    }

    /// Fixes the sampling seed. Without one, a seed is drawn when the sketch is built.
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Sets the rank bounds mode.
    pub fn rank_bounds(mut self, rank_bounds: RankBounds) -> Self {
        self.rank_bounds = rank_bounds;
        self
    }

    /// Validates the parameters and builds the sketch.
    pub fn build(self) -> Result<QuantileSketch, Error> {
        self.order.validate()?;
        if self.resolution == 0 || self.per_bin == 0 || self.slack == 0 {
            return Err(Error::invalid_parameter(
                "resolution, per_bin and slack must be positive",
            )
            .with_context("resolution", self.resolution)
            .with_context("per_bin", self.per_bin)
            .with_context("slack", self.slack));
        }
        let Some(max_size) = self.resolution.checked_mul(self.slack) else {
            return Err(Error::invalid_parameter("resolution * slack overflows"));
        };
        if max_size < 2 {
            return Err(Error::invalid_parameter(
                "resolution * slack must be at least 2",
            ));
        }
        if self.resolution.checked_mul(self.per_bin).is_none() {
            return Err(Error::invalid_parameter("resolution * per_bin overflows"));
        }
        let seed = self
            .seed
            .unwrap_or_else(|| XorShift64::default().next_u64());
        Ok(QuantileSketch {
            order: self.order,
            resolution: self.resolution,
            per_bin: self.per_bin,
            slack: self.slack,
            seed,
            rank_bounds: self.rank_bounds,
        })
    }
}

impl Monoid for QuantileSketch {
    type Value = QuantileList;

    fn zero(&self) -> Self::Value {
        QuantileList::empty(self.order.clone())
    }

    fn add(&self, left: &Self::Value, right: &Self::Value) -> Result<Self::Value, Error> {
        left.merge(right, self.max_size())
    }
}

impl<T: Table + ?Sized> Sketch<T> for QuantileSketch {
    fn create(&self, data: &T, cancel: &CancellationToken) -> Result<Self::Value, Error> {
        let names = self.order.columns();
        let columns = ColumnSet::resolve(data, &names)?;
        let (mut reservoir, data_size) = self.reservoir(data, &columns, cancel)?;
        reservoir.sort_by(|a, b| self.order.compare(a, b));

        let exact = data_size as usize <= self.sample_size();
        let keep = equally_spaced(reservoir.len(), self.max_size());
        let (wins, losses) = if exact {
            exact_bounds(&self.order, &reservoir, &keep)
        } else {
            match self.rank_bounds {
                RankBounds::Counted => {
                    let samples = pick(reservoir.clone(), &keep);
                    self.count_bounds(data, &columns, &samples, cancel)?
                }
                RankBounds::Interpolated => {
                    interpolated_bounds(reservoir.len(), data_size, &keep)
                }
            }
        };
        trace!(
            rows = data_size,
            sampled = reservoir.len(),
            kept = keep.len(),
            exact,
            "built quantile list"
        );
        Ok(QuantileList::from_parts(
            self.order.clone(),
            pick(reservoir, &keep),
            wins,
            losses,
            data_size,
        ))
    }
}

/// Bounds of `keep` when `sorted` holds every row of the partition.
fn exact_bounds(
    order: &RecordOrder,
    sorted: &[RowSnapshot],
    keep: &[usize],
) -> (Vec<u64>, Vec<u64>) {
    keep.iter()
        .map(|&position| {
            let sample = &sorted[position];
            let below = sorted.partition_point(|s| order.compare(s, sample) == Ordering::Less);
            let not_above =
                sorted.partition_point(|s| order.compare(s, sample) != Ordering::Greater);
            (below as u64, (sorted.len() - not_above) as u64)
        })
        .unzip()
}

fn interpolated_bounds(
    sample_size: usize,
    data_size: u64,
    keep: &[usize],
) -> (Vec<u64>, Vec<u64>) {
    let m = sample_size as f64;
    let n = data_size as f64;
    keep.iter()
        .map(|&i| {
            let i = i as f64;
            let wins = ((i + 1.0) * n / (m + 1.0)).round() as u64;
            let losses = ((m - i - 1.0) * n / (m + 1.0)).round() as u64;
            (wins, losses)
        })
        .unzip()
}
