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

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use super::hist1d::HeavyHistogram1D;
use super::hist1d::Histogram1D;
use super::hist2d::AxisSource;
use super::hist2d::HeavyHistogram2D;
use super::hist2d::Histogram2D;
use crate::buckets::BucketsDescription;
use crate::error::Error;
use crate::monoid::Monoid;
use crate::monoid::Sketch;
use crate::table::StringConverter;
use crate::table::Table;

/// Histogram of one column over fixed buckets.
#[derive(Debug, Clone)]
pub struct HistogramSketch<B> {
    column: String,
    buckets: B,
    converter: Option<Arc<dyn StringConverter>>,
}

impl<B: BucketsDescription> HistogramSketch<B> {
    /// Creates a sketch bucketing `column` with `buckets`.
    pub fn new(column: impl Into<String>, buckets: B) -> Self {
        Self {
            column: column.into(),
            buckets,
            converter: None,
        }
    }

    /// Converts string cells to numbers before bucketing.
    pub fn with_converter(mut self, converter: Arc<dyn StringConverter>) -> Self {
        self.converter = Some(converter);
        self
    }
}

impl<B: BucketsDescription> Monoid for HistogramSketch<B> {
    type Value = Histogram1D<B>;

    fn zero(&self) -> Self::Value {
        Histogram1D::new(self.buckets.clone())
    }

    fn add(&self, left: &Self::Value, right: &Self::Value) -> Result<Self::Value, Error> {
        left.union(right)
    }
}

impl<T: Table + ?Sized, B: BucketsDescription> Sketch<T> for HistogramSketch<B> {
    fn create(&self, data: &T, cancel: &CancellationToken) -> Result<Self::Value, Error> {
        let mut histogram = self.zero();
        histogram.create_histogram(data, &self.column, self.converter.as_deref(), cancel)?;
        Ok(histogram)
    }
}

/// Histogram of one column that also reports the extreme rows of every bucket.
#[derive(Debug, Clone)]
pub struct HeavyHistogramSketch<B> {
    column: String,
    buckets: B,
    row_columns: Vec<String>,
    converter: Option<Arc<dyn StringConverter>>,
}

impl<B: BucketsDescription> HeavyHistogramSketch<B> {
    /// Creates a sketch bucketing `column`; extreme rows are snapshots of `row_columns`.
    pub fn new<I, S>(column: impl Into<String>, buckets: B, row_columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            column: column.into(),
            buckets,
            row_columns: row_columns.into_iter().map(Into::into).collect(),
            converter: None,
        }
    }

    /// Converts string cells to numbers before bucketing.
    pub fn with_converter(mut self, converter: Arc<dyn StringConverter>) -> Self {
        self.converter = Some(converter);
        self
    }
}

impl<B: BucketsDescription> Monoid for HeavyHistogramSketch<B> {
    type Value = HeavyHistogram1D<B>;

    fn zero(&self) -> Self::Value {
        HeavyHistogram1D::new(self.buckets.clone())
    }

    fn add(&self, left: &Self::Value, right: &Self::Value) -> Result<Self::Value, Error> {
        left.union(right)
    }
}

impl<T: Table + ?Sized, B: BucketsDescription> Sketch<T> for HeavyHistogramSketch<B> {
    fn create(&self, data: &T, cancel: &CancellationToken) -> Result<Self::Value, Error> {
        let mut histogram = self.zero();
        histogram.create_histogram(
            data,
            &self.column,
            &self.row_columns,
            self.converter.as_deref(),
            cancel,
        )?;
        Ok(histogram)
    }
}

#[derive(Debug, Clone)]
struct Axis<B> {
    column: String,
    buckets: B,
    converter: Option<Arc<dyn StringConverter>>,
}

impl<B> Axis<B> {
    fn new(column: String, buckets: B) -> Self {
        Self {
            column,
            buckets,
            converter: None,
        }
    }

    fn source(&self) -> AxisSource<'_> {
        AxisSource {
            column: &self.column,
            converter: self.converter.as_deref(),
        }
    }
}

/// Two-dimensional histogram of a pair of columns.
#[derive(Debug, Clone)]
pub struct Histogram2DSketch<X, Y> {
    x: Axis<X>,
    y: Axis<Y>,
}

impl<X: BucketsDescription, Y: BucketsDescription> Histogram2DSketch<X, Y> {
    /// Creates a sketch bucketing `x_column` by `x_buckets` and `y_column` by `y_buckets`.
    pub fn new(
        x_column: impl Into<String>,
        x_buckets: X,
        y_column: impl Into<String>,
        y_buckets: Y,
    ) -> Self {
        Self {
            x: Axis::new(x_column.into(), x_buckets),
            y: Axis::new(y_column.into(), y_buckets),
        }
    }

    /// Converts string cells of the first column to numbers.
    pub fn with_x_converter(mut self, converter: Arc<dyn StringConverter>) -> Self {
        self.x.converter = Some(converter);
        self
    }

    /// Converts string cells of the second column to numbers.
    pub fn with_y_converter(mut self, converter: Arc<dyn StringConverter>) -> Self {
        self.y.converter = Some(converter);
        self
    }
}

impl<X: BucketsDescription, Y: BucketsDescription> Monoid for Histogram2DSketch<X, Y> {
    type Value = Histogram2D<X, Y>;

    fn zero(&self) -> Self::Value {
        Histogram2D::new(self.x.buckets.clone(), self.y.buckets.clone())
    }

    fn add(&self, left: &Self::Value, right: &Self::Value) -> Result<Self::Value, Error> {
        left.union(right)
    }
}

impl<T, X, Y> Sketch<T> for Histogram2DSketch<X, Y>
where
    T: Table + ?Sized,
    X: BucketsDescription,
    Y: BucketsDescription,
{
    fn create(&self, data: &T, cancel: &CancellationToken) -> Result<Self::Value, Error> {
        let mut histogram = self.zero();
        histogram.create_histogram(data, self.x.source(), self.y.source(), cancel)?;
        Ok(histogram)
    }
}

/// Two-dimensional histogram that reports the extreme rows of every cell.
#[derive(Debug, Clone)]
pub struct HeavyHistogram2DSketch<X, Y> {
    x: Axis<X>,
    y: Axis<Y>,
    row_columns: Vec<String>,
}

impl<X: BucketsDescription, Y: BucketsDescription> HeavyHistogram2DSketch<X, Y> {
    /// Creates a sketch over two columns; extreme rows are snapshots of `row_columns`.
    pub fn new<I, S>(
        x_column: impl Into<String>,
        x_buckets: X,
        y_column: impl Into<String>,
        y_buckets: Y,
        row_columns: I,
    ) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            x: Axis::new(x_column.into(), x_buckets),
            y: Axis::new(y_column.into(), y_buckets),
            row_columns: row_columns.into_iter().map(Into::into).collect(),
        }
    }

    /// Converts string cells of the first column to numbers.
    pub fn with_x_converter(mut self, converter: Arc<dyn StringConverter>) -> Self {
        self.x.converter = Some(converter);
        self
    }

    /// Converts string cells of the second column to numbers.
    pub fn with_y_converter(mut self, converter: Arc<dyn StringConverter>) -> Self {
        self.y.converter = Some(converter);
        self
    }
}

impl<X: BucketsDescription, Y: BucketsDescription> Monoid for HeavyHistogram2DSketch<X, Y> {
    type Value = HeavyHistogram2D<X, Y>;

    fn zero(&self) -> Self::Value {
        HeavyHistogram2D::new(self.x.buckets.clone(), self.y.buckets.clone())
    }

    fn add(&self, left: &Self::Value, right: &Self::Value) -> Result<Self::Value, Error> {
        left.union(right)
    }
}

impl<T, X, Y> Sketch<T> for HeavyHistogram2DSketch<X, Y>
where
    T: Table + ?Sized,
    X: BucketsDescription,
    Y: BucketsDescription,
{
    fn create(&self, data: &T, cancel: &CancellationToken) -> Result<Self::Value, Error> {
        let mut histogram = self.zero();
        histogram.create_histogram(
            data,
            self.x.source(),
            self.y.source(),
            &self.row_columns,
            cancel,
        )?;
        Ok(histogram)
    }
}
