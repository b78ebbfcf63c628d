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

use super::hist1d::BucketExtremes;
use super::hist1d::observe_extremes;
use super::hist1d::union_extremes;
use crate::buckets::BucketKey;
use crate::buckets::BucketsDescription;
use crate::error::Error;
use crate::error::ErrorKind;
use crate::table::ColumnSet;
use crate::table::StringConverter;
use crate::table::Table;
use crate::table::scan_rows;

/// Column read by one axis of a two-dimensional histogram.
#[derive(Debug, Clone, Copy)]
pub struct AxisSource<'a> {
    /// Column name.
    pub column: &'a str,
    /// Converter applied when a numeric axis reads a string column.
    pub converter: Option<&'a dyn StringConverter>,
}

impl<'a> AxisSource<'a> {
    /// Reads `column` without conversion.
    pub fn new(column: &'a str) -> Self {
        Self {
            column,
            converter: None,
        }
    }
}

/// Counts of rows per cell of the cross product of two bucket descriptions.
///
/// A row missing on either axis counts as missing; otherwise a row outside either
/// axis's range counts as out of range.
#[derive(Debug, Clone, PartialEq)]
pub struct Histogram2D<X: BucketsDescription, Y: BucketsDescription> {
    x_buckets: X,
    y_buckets: Y,
    counts: Vec<u64>,
    missing_data: u64,
    out_of_range: u64,
    initialized: bool,
}

impl<X: BucketsDescription, Y: BucketsDescription> Histogram2D<X, Y> {
    /// Creates an empty histogram.
    pub fn new(x_buckets: X, y_buckets: Y) -> Self {
        let counts = vec![0; x_buckets.num_buckets() * y_buckets.num_buckets()];
        Self {
            x_buckets,
            y_buckets,
            counts,
            missing_data: 0,
            out_of_range: 0,
            initialized: false,
        }
    }

    /// Returns the buckets of the first axis.
    pub fn x_buckets(&self) -> &X {
        &self.x_buckets
    }

    /// Returns the buckets of the second axis.
    pub fn y_buckets(&self) -> &Y {
        &self.y_buckets
    }

    /// Returns the count of cell `(x, y)`.
    pub fn count(&self, x: usize, y: usize) -> u64 {
        self.counts[self.cell(x, y)]
    }

    /// Returns the number of rows missing on some axis.
    pub fn missing_data(&self) -> u64 {
        self.missing_data
    }

    /// Returns the number of rows outside the range of some axis.
    pub fn out_of_range(&self) -> u64 {
        self.out_of_range
    }

    /// Returns the number of rows counted in some cell.
    pub fn total(&self) -> u64 {
        self.counts.iter().sum()
    }

    /// Returns the per-bucket totals of the first axis.
    pub fn x_marginal(&self) -> Vec<u64> {
        self.counts
            .chunks(self.y_buckets.num_buckets())
            .map(|row| row.iter().sum())
            .collect()
    }

    /// Scans two columns of every member row of `table`.
    pub fn create_histogram<T: Table + ?Sized>(
        &mut self,
        table: &T,
        x: AxisSource<'_>,
        y: AxisSource<'_>,
        cancel: &CancellationToken,
    ) -> Result<(), Error> {
        self.begin_population()?;
        let x_column = table.column(x.column)?;
        let y_column = table.column(y.column)?;
        X::Key::check_column(x_column, x.converter)?;
        Y::Key::check_column(y_column, y.converter)?;
        scan_rows(table, cancel, |row| {
            let x_key = X::Key::read(x_column, row, x.converter);
            let y_key = Y::Key::read(y_column, row, y.converter);
            self.record(x_key.as_ref(), y_key.as_ref());
        })
    }

    /// Returns the sum of two histograms over the same buckets.
    pub fn union(&self, other: &Self) -> Result<Self, Error> {
        if self.x_buckets != other.x_buckets || self.y_buckets != other.y_buckets {
            return Err(Error::schema_mismatch("bucket boundaries"));
        }
        Ok(Self {
            x_buckets: self.x_buckets.clone(),
            y_buckets: self.y_buckets.clone(),
            counts: self
                .counts
                .iter()
                .zip(other.counts.iter())
                .map(|(a, b)| a + b)
                .collect(),
            missing_data: self.missing_data + other.missing_data,
            out_of_range: self.out_of_range + other.out_of_range,
            initialized: self.initialized || other.initialized,
        })
    }

    fn cell(&self, x: usize, y: usize) -> usize {
        x * self.y_buckets.num_buckets() + y
    }

    fn begin_population(&mut self) -> Result<(), Error> {
        if self.initialized {
            return Err(Error::new(
                ErrorKind::DoubleInitialization,
                "histogram has already been populated",
            ));
        }
        self.initialized = true;
        Ok(())
    }

    fn record(&mut self, x: Option<&X::Key>, y: Option<&Y::Key>) -> Option<usize> {
        let (Some(x), Some(y)) = (x, y) else {
            self.missing_data += 1;
            return None;
        };
        match (self.x_buckets.index_of(x), self.y_buckets.index_of(y)) {
            (Some(i), Some(j)) => {
                let cell = self.cell(i, j);
                self.counts[cell] += 1;
                Some(cell)
            }
            _ => {
                self.out_of_range += 1;
                None
            }
        }
    }
}

/// Extremes of both axes within one cell.
#[derive(Debug, Clone, PartialEq)]
pub struct CellExtremes<XK, YK> {
    x: Option<BucketExtremes<XK>>,
    y: Option<BucketExtremes<YK>>,
}

impl<XK: BucketKey, YK: BucketKey> CellExtremes<XK, YK> {
    /// Returns the extremes along the first axis.
    pub fn x(&self) -> Option<&BucketExtremes<XK>> {
        self.x.as_ref()
    }

    /// Returns the extremes along the second axis.
    pub fn y(&self) -> Option<&BucketExtremes<YK>> {
        self.y.as_ref()
    }
}

/// A [`Histogram2D`] that keeps, per cell and per axis, the extreme values and their rows.
#[derive(Debug, Clone, PartialEq)]
pub struct HeavyHistogram2D<X: BucketsDescription, Y: BucketsDescription> {
    histogram: Histogram2D<X, Y>,
    x_extremes: Vec<Option<BucketExtremes<X::Key>>>,
    y_extremes: Vec<Option<BucketExtremes<Y::Key>>>,
}

impl<X: BucketsDescription, Y: BucketsDescription> HeavyHistogram2D<X, Y> {
    /// Creates an empty heavy histogram.
    pub fn new(x_buckets: X, y_buckets: Y) -> Self {
        let cells = x_buckets.num_buckets() * y_buckets.num_buckets();
        Self {
            histogram: Histogram2D::new(x_buckets, y_buckets),
            x_extremes: vec![None; cells],
            y_extremes: vec![None; cells],
        }
    }

    /// Returns the plain cell counts.
    pub fn histogram(&self) -> &Histogram2D<X, Y> {
        &self.histogram
    }

    /// Returns the extremes of cell `(x, y)`.
    pub fn extremes(&self, x: usize, y: usize) -> CellExtremes<X::Key, Y::Key> {
        let cell = self.histogram.cell(x, y);
        CellExtremes {
            x: self.x_extremes[cell].clone(),
            y: self.y_extremes[cell].clone(),
        }
    }

    /// Scans two columns of every member row, snapshotting `row_columns` for extreme rows.
    pub fn create_histogram<T: Table + ?Sized, S: AsRef<str>>(
        &mut self,
        table: &T,
        x: AxisSource<'_>,
        y: AxisSource<'_>,
        row_columns: &[S],
        cancel: &CancellationToken,
    ) -> Result<(), Error> {
        self.histogram.begin_population()?;
        let x_column = table.column(x.column)?;
        let y_column = table.column(y.column)?;
        X::Key::check_column(x_column, x.converter)?;
        Y::Key::check_column(y_column, y.converter)?;
        let row_columns = ColumnSet::resolve(table, row_columns)?;
        let histogram = &mut self.histogram;
        let x_extremes = &mut self.x_extremes;
        let y_extremes = &mut self.y_extremes;
        scan_rows(table, cancel, |row| {
            let x_key = X::Key::read(x_column, row, x.converter);
            let y_key = Y::Key::read(y_column, row, y.converter);
            let Some(cell) = histogram.record(x_key.as_ref(), y_key.as_ref()) else {
                return;
            };
            if let (Some(x_key), Some(y_key)) = (x_key, y_key) {
                observe_extremes(&mut x_extremes[cell], &x_key, || row_columns.snapshot(row));
                observe_extremes(&mut y_extremes[cell], &y_key, || row_columns.snapshot(row));
            }
        })
    }

    /// Returns the union of two heavy histograms over the same buckets.
    pub fn union(&self, other: &Self) -> Result<Self, Error> {
        Ok(Self {
            histogram: self.histogram.union(&other.histogram)?,
            x_extremes: union_extremes(&self.x_extremes, &other.x_extremes),
            y_extremes: union_extremes(&self.y_extremes, &other.y_extremes),
        })
    }
}
