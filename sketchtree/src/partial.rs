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

//! Incremental progress reports of a distributed computation.
//!
//! A computation over a partitioned dataset reports a stream of [`PartialResult`]s. Each
//! one carries the fraction of work completed since the previous report and a value that
//! is an *increment* over everything reported so far: consumers fold the stream with the
//! summary's `add`, they never overwrite.
//!
//! # Usage
//!
//! ```rust
//! # use sketchtree::partial::PartialResult;
//! # use sketchtree::partial::combine;
//! let a = PartialResult::new(0.25, 3u64);
//! let b = PartialResult::new(0.5, 4u64);
//! let c = combine(&a, &b, |x, y| Ok(x + y)).unwrap();
//! assert_eq!(c.delta_done(), 0.75);
//! assert_eq!(*c.delta_value(), 7);
//! ```

use crate::error::Error;
use crate::monoid::Monoid;

/// Work-done fraction paired with an incremental value.
#[derive(Debug, Clone, PartialEq)]
pub struct PartialResult<T> {
    delta_done: f64,
    delta_value: T,
}

impl<T> PartialResult<T> {
    /// Creates a partial result; `delta_done` is clamped into `[0, 1]`.
    pub fn new(delta_done: f64, delta_value: T) -> Self {
        debug_assert!(!delta_done.is_nan(), "delta_done must not be NaN");
        Self {
            delta_done: delta_done.clamp(0.0, 1.0),
            delta_value,
        }
    }

    /// Returns the fraction of work completed by this increment.
    pub fn delta_done(&self) -> f64 {
        self.delta_done
    }

    /// Returns the value increment.
    pub fn delta_value(&self) -> &T {
        &self.delta_value
    }

    /// Splits the result into its done fraction and value.
    pub fn into_parts(self) -> (f64, T) {
        (self.delta_done, self.delta_value)
    }
}

/// Combines two partial results: done fractions add up (at most 1), values are added.
pub fn combine<T>(
    left: &PartialResult<T>,
    right: &PartialResult<T>,
    add: impl FnOnce(&T, &T) -> Result<T, Error>,
) -> Result<PartialResult<T>, Error> {
    let value = add(&left.delta_value, &right.delta_value)?;
    Ok(PartialResult::new(
        (left.delta_done + right.delta_done).min(1.0),
        value,
    ))
}

/// Lifts a [`Monoid`] over values into a monoid over partial results of those values.
#[derive(Debug, Clone)]
pub struct PartialResultMonoid<M> {
    inner: M,
}

impl<M: Monoid> PartialResultMonoid<M> {
    /// Wraps the value monoid.
    pub fn new(inner: M) -> Self {
        Self { inner }
    }

    /// Returns the wrapped value monoid.
    pub fn inner(&self) -> &M {
        &self.inner
    }
}

impl<M: Monoid> Monoid for PartialResultMonoid<M> {
    type Value = PartialResult<M::Value>;

    fn zero(&self) -> Self::Value {
        PartialResult::new(0.0, self.inner.zero())
    }

    fn add(&self, left: &Self::Value, right: &Self::Value) -> Result<Self::Value, Error> {
        combine(left, right, |l, r| self.inner.add(l, r))
    }
}
