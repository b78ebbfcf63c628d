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

//! Recursive partitioned datasets and the operations that run over them.
//!
//! A [`Dataset`] is either a single partition or an ordered collection of datasets. Its
//! operations ([`Dataset::sketch`], [`Dataset::map`], [`Dataset::zip`]) return a
//! [`PartialResultStream`]: each leaf is processed on the tokio blocking pool, every
//! parallel node folds what its children report and forwards the increment upward, and
//! the subscriber sees the done fraction grow from 0 to 1.
//!
//! # Usage
//!
//! ```rust
//! # use sketchtree::dataset::Dataset;
//! # use sketchtree::stats::BasicStatsSketch;
//! # use sketchtree::table::MemoryTable;
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let table = MemoryTable::builder()
//!     .doubles("x", (0..100).map(f64::from))
//!     .build()
//!     .unwrap();
//! let dataset = Dataset::from_partitions(table.split(8), 3).unwrap();
//! let stats = dataset
//!     .run_sketch(BasicStatsSketch::new("x", 1).unwrap())
//!     .await
//!     .unwrap();
//! assert_eq!(stats.present_count(), 100);
//! assert_eq!(stats.max(), Some(99.0));
//! # }
//! ```

mod config;
mod driver;
mod stream;

use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

pub use self::config::DEFAULT_CHANNEL_CAPACITY;
pub use self::config::ExecutionConfig;
use self::driver::MonoidReducer;
use self::driver::RebuildReducer;
pub use self::stream::OperationState;
pub use self::stream::PartialResultStream;
use crate::consumer;
use crate::error::Error;
use crate::error::ErrorKind;
use crate::monoid::Monoid;
use crate::monoid::Sketch;

/// A partition, or an ordered collection of datasets.
pub enum Dataset<T: ?Sized> {
    /// A single partition.
    Leaf(Arc<T>),
    /// Datasets processed independently and combined.
    Parallel(Vec<Dataset<T>>),
}

/// The partitioning topology of a dataset, without its data.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Shape {
    /// A single partition.
    Leaf,
    /// An ordered collection.
    Parallel(Vec<Shape>),
}

impl<T> Dataset<T> {
    /// Creates a single-partition dataset.
    pub fn leaf(value: T) -> Self {
        Dataset::Leaf(Arc::new(value))
    }

    /// Bundles `parts` into leaves under parallel nodes of at most `fan_out` children.
    ///
    /// The result is always a parallel node; without parts it has no children.
    pub fn from_partitions<I>(parts: I, fan_out: usize) -> Result<Self, Error>
    where
        I: IntoIterator<Item = T>,
    {
        if fan_out < 2 {
            return Err(Error::invalid_parameter("fan_out must be at least 2")
                .with_context("fan_out", fan_out));
        }
        let mut level: Vec<Dataset<T>> = parts.into_iter().map(Dataset::leaf).collect();
        while level.len() > fan_out {
            let mut next = Vec::with_capacity(level.len().div_ceil(fan_out));
            let mut nodes = level.into_iter().peekable();
            while nodes.peek().is_some() {
                next.push(Dataset::Parallel(nodes.by_ref().take(fan_out).collect()));
            }
            level = next;
        }
        Ok(Dataset::Parallel(level))
    }
}

impl<T: ?Sized> Dataset<T> {
    /// Creates a single-partition dataset from a shared partition.
    pub fn from_arc(value: Arc<T>) -> Self {
        Dataset::Leaf(value)
    }

    /// Creates a dataset combining `children`.
    pub fn parallel(children: Vec<Dataset<T>>) -> Self {
        Dataset::Parallel(children)
    }

    /// Returns the number of partitions.
    pub fn leaf_count(&self) -> usize {
        match self {
            Dataset::Leaf(_) => 1,
            Dataset::Parallel(children) => children.iter().map(Dataset::leaf_count).sum(),
        }
    }

    /// Returns the partitioning topology.
    pub fn shape(&self) -> Shape {
        match self {
            Dataset::Leaf(_) => Shape::Leaf,
            Dataset::Parallel(children) => {
                Shape::Parallel(children.iter().map(Dataset::shape).collect())
            }
        }
    }

    /// Returns the partitions, leftmost first.
    pub fn leaves(&self) -> Vec<&Arc<T>> {
        let mut leaves = Vec::with_capacity(self.leaf_count());
        self.collect_leaves(&mut leaves);
        leaves
    }

    fn collect_leaves<'a>(&'a self, leaves: &mut Vec<&'a Arc<T>>) {
        match self {
            Dataset::Leaf(leaf) => leaves.push(leaf),
            Dataset::Parallel(children) => {
                for child in children {
                    child.collect_leaves(leaves);
                }
            }
        }
    }
}

impl<T: ?Sized + Send + Sync + 'static> Dataset<T> {
    /// Summarizes every partition with `sketch` and streams the combined increments.
    pub fn sketch<S>(&self, sketch: S) -> PartialResultStream<S::Value>
    where
        S: Sketch<T> + 'static,
    {
        self.launch_sketch(Arc::new(sketch), &ExecutionConfig::default())
    }

    /// Like [`Dataset::sketch`], with explicit execution parameters.
    pub fn sketch_with<S>(
        &self,
        sketch: S,
        config: &ExecutionConfig,
    ) -> Result<PartialResultStream<S::Value>, Error>
    where
        S: Sketch<T> + 'static,
    {
        config.validate()?;
        Ok(self.launch_sketch(Arc::new(sketch), config))
    }

    /// Runs `sketch` to completion and returns the summary of the whole dataset.
    pub async fn run_sketch<S>(&self, sketch: S) -> Result<S::Value, Error>
    where
        S: Sketch<T> + 'static,
    {
        let sketch = Arc::new(sketch);
        let stream = self.launch_sketch(sketch.clone(), &ExecutionConfig::default());
        consumer::fold(stream, sketch.as_ref()).await
    }

    fn launch_sketch<S>(
        &self,
        sketch: Arc<S>,
        config: &ExecutionConfig,
    ) -> PartialResultStream<S::Value>
    where
        S: Sketch<T> + 'static,
    {
        let job = {
            let sketch = sketch.clone();
            move |leaf: &Arc<T>, cancel: &CancellationToken| sketch.create(&**leaf, cancel)
        };
        PartialResultStream::launch(self.clone(), job, MonoidReducer(sketch), config)
    }

    /// Applies `f` to every partition, producing a dataset of the same shape.
    ///
    /// Intermediate items report progress with `None`; the final item carries the new
    /// dataset, whose leaves keep the order of this one. Fold with [`DatasetMonoid`].
    pub fn map<S, F>(&self, f: F) -> PartialResultStream<Option<Dataset<S>>>
    where
        S: Send + Sync + 'static,
        F: Fn(&T) -> S + Send + Sync + 'static,
    {
        let job = move |leaf: &Arc<T>, _: &CancellationToken| Ok(Some(Dataset::leaf(f(&**leaf))));
        PartialResultStream::launch(
            self.clone(),
            job,
            RebuildReducer::new(),
            &ExecutionConfig::default(),
        )
    }

    /// Pairs the partitions of two datasets with the same shape.
    ///
    /// If the shapes differ, the stream yields a single
    /// [`ShapeMismatch`](ErrorKind::ShapeMismatch) error.
    pub fn zip<S>(
        &self,
        other: &Dataset<S>,
    ) -> PartialResultStream<Option<Dataset<(Arc<T>, Arc<S>)>>>
    where
        S: ?Sized + Send + Sync + 'static,
    {
        match pair(self, other) {
            Ok(paired) => {
                let job = |leaf: &Arc<(Arc<T>, Arc<S>)>, _: &CancellationToken| {
                    Ok(Some(Dataset::from_arc(leaf.clone())))
                };
                PartialResultStream::launch(
                    paired,
                    job,
                    RebuildReducer::new(),
                    &ExecutionConfig::default(),
                )
            }
            Err(err) => PartialResultStream::failed(
                err.with_context("left_leaves", self.leaf_count())
                    .with_context("right_leaves", other.leaf_count()),
            ),
        }
    }
}

fn pair<T: ?Sized, S: ?Sized>(
    left: &Dataset<T>,
    right: &Dataset<S>,
) -> Result<Dataset<(Arc<T>, Arc<S>)>, Error> {
    match (left, right) {
        (Dataset::Leaf(l), Dataset::Leaf(r)) => Ok(Dataset::leaf((l.clone(), r.clone()))),
        (Dataset::Parallel(ls), Dataset::Parallel(rs)) if ls.len() == rs.len() => {
            let children = ls
                .iter()
                .zip(rs.iter())
                .map(|(l, r)| pair(l, r))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Dataset::Parallel(children))
        }
        _ => Err(Error::new(
            ErrorKind::ShapeMismatch,
            "cannot zip datasets with different partitioning",
        )),
    }
}

impl<T: ?Sized> Clone for Dataset<T> {
    fn clone(&self) -> Self {
        match self {
            Dataset::Leaf(leaf) => Dataset::Leaf(leaf.clone()),
            Dataset::Parallel(children) => Dataset::Parallel(children.clone()),
        }
    }
}

impl<T: ?Sized> fmt::Debug for Dataset<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Dataset::Leaf(_) => f.write_str("Leaf"),
            Dataset::Parallel(children) => f.debug_list().entries(children).finish(),
        }
    }
}

/// Folds the items of [`Dataset::map`] and [`Dataset::zip`] streams.
///
/// Zero is `None`; two datasets combine into a new parallel node holding both.
pub struct DatasetMonoid<S: ?Sized>(PhantomData<fn() -> Arc<S>>);

impl<S: ?Sized> DatasetMonoid<S> {
    /// Creates the monoid.
    pub fn new() -> Self {
        Self(PhantomData)
    }
}

impl<S: ?Sized> Default for DatasetMonoid<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: ?Sized> Clone for DatasetMonoid<S> {
    fn clone(&self) -> Self {
        Self::new()
    }
}

impl<S: ?Sized> fmt::Debug for DatasetMonoid<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("DatasetMonoid")
    }
}

impl<S: ?Sized + Send + Sync + 'static> Monoid for DatasetMonoid<S> {
    type Value = Option<Dataset<S>>;

    fn zero(&self) -> Self::Value {
        None
    }

    fn add(&self, left: &Self::Value, right: &Self::Value) -> Result<Self::Value, Error> {
        Ok(match (left, right) {
            (None, other) | (other, None) => other.clone(),
            (Some(l), Some(r)) => Some(Dataset::Parallel(vec![l.clone(), r.clone()])),
        })
    }
}
