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

//! The algebraic contract every summary satisfies.
//!
//! A [`Monoid`] has an identity ([`Monoid::zero`]) and an associative, commutative
//! combination ([`Monoid::add`]). A [`Sketch`] is a monoid whose values can also be
//! created from one partition of a dataset. Because `add` is order independent, leaf
//! summaries may be reduced in any tree shape and still yield the single-machine result.
//!
//! # Usage
//!
//! ```rust
//! # use sketchtree::monoid::Monoid;
//! # use sketchtree::monoid::summarize;
//! # use sketchtree::stats::BasicStatsSketch;
//! # use sketchtree::table::MemoryTable;
//! let table = MemoryTable::builder().doubles("x", [1.0, 2.0, 3.0]).build().unwrap();
//! let sketch = BasicStatsSketch::new("x", 2).unwrap();
//! let stats = summarize(&sketch, &table).unwrap();
//! let same = sketch.add(&sketch.zero(), &stats).unwrap();
//! assert_eq!(same, stats);
//! ```

use tokio_util::sync::CancellationToken;

use crate::error::Error;

/// Identity element plus an associative, commutative combination.
pub trait Monoid: Send + Sync {
    /// The summarized value.
    type Value: Send + 'static;

    /// Returns the identity: the summary of no data at all.
    fn zero(&self) -> Self::Value;

    /// Combines two values into a new one, leaving both inputs untouched.
    fn add(&self, left: &Self::Value, right: &Self::Value) -> Result<Self::Value, Error>;
}

impl<M: Monoid> Monoid for &M {
    type Value = M::Value;

    fn zero(&self) -> Self::Value {
        (**self).zero()
    }

    fn add(&self, left: &Self::Value, right: &Self::Value) -> Result<Self::Value, Error> {
        (**self).add(left, right)
    }
}

/// A monoid whose values are computed from a single partition of type `T`.
pub trait Sketch<T: ?Sized>: Monoid {
    /// Summarizes one partition.
    ///
    /// Implementations check `cancel` periodically and return an error of kind
    /// [`Cancelled`](crate::error::ErrorKind::Cancelled) once it fires.
    fn create(&self, data: &T, cancel: &CancellationToken) -> Result<Self::Value, Error>;
}

/// Runs `sketch` over a single partition outside of any dataset.
pub fn summarize<T: ?Sized, S: Sketch<T>>(sketch: &S, data: &T) -> Result<S::Value, Error> {
    sketch.create(data, &CancellationToken::new())
}

/// Two sketches computed together over the same partitions.
///
/// # Examples
///
/// ```
/// # use sketchtree::monoid::ConcurrentSketch;
/// # use sketchtree::monoid::summarize;
/// # use sketchtree::distinct::DistinctStringsSketch;
/// # use sketchtree::stats::BasicStatsSketch;
/// # use sketchtree::table::MemoryTable;
/// let table = MemoryTable::builder()
///     .doubles("x", [1.0, 5.0])
///     .strings("name", ["b", "a"])
///     .build()
///     .unwrap();
/// let both = ConcurrentSketch::new(
///     BasicStatsSketch::new("x", 1).unwrap(),
///     DistinctStringsSketch::new("name", 10).unwrap(),
/// );
/// let (stats, names) = summarize(&both, &table).unwrap();
/// assert_eq!(stats.max(), Some(5.0));
/// assert_eq!(names.len(), 2);
/// ```
#[derive(Debug, Clone)]
pub struct ConcurrentSketch<A, B> {
    first: A,
    second: B,
}

impl<A, B> ConcurrentSketch<A, B> {
    /// Pairs two sketches.
    pub fn new(first: A, second: B) -> Self {
        Self { first, second }
    }
}

impl<A: Monoid, B: Monoid> Monoid for ConcurrentSketch<A, B> {
    type Value = (A::Value, B::Value);

    fn zero(&self) -> Self::Value {
        (self.first.zero(), self.second.zero())
    }

    fn add(&self, left: &Self::Value, right: &Self::Value) -> Result<Self::Value, Error> {
        Ok((
            self.first.add(&left.0, &right.0)?,
            self.second.add(&left.1, &right.1)?,
        ))
    }
}

impl<T: ?Sized, A: Sketch<T>, B: Sketch<T>> Sketch<T> for ConcurrentSketch<A, B> {
    fn create(&self, data: &T, cancel: &CancellationToken) -> Result<Self::Value, Error> {
        Ok((
            self.first.create(data, cancel)?,
            self.second.create(data, cancel)?,
        ))
    }
}
