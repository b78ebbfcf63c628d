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

//! Folding streams of partial results into final values.
//!
//! # Usage
//!
//! ```rust
//! # use futures::stream;
//! # use sketchtree::consumer::fold_with_progress;
//! # use sketchtree::distinct::DistinctStringsSketch;
//! # use sketchtree::monoid::summarize;
//! # use sketchtree::partial::PartialResult;
//! # use sketchtree::table::MemoryTable;
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let sketch = DistinctStringsSketch::new("s", 10).unwrap();
//! let left = MemoryTable::builder().strings("s", ["a", "b"]).build().unwrap();
//! let right = MemoryTable::builder().strings("s", ["b", "c"]).build().unwrap();
//! let items = vec![
//!     Ok(PartialResult::new(0.5, summarize(&sketch, &left).unwrap())),
//!     Ok(PartialResult::new(0.5, summarize(&sketch, &right).unwrap())),
//! ];
//! let mut progress = vec![];
//! let merged = fold_with_progress(stream::iter(items), &sketch, |done, _| progress.push(done))
//!     .await
//!     .unwrap();
//! assert_eq!(merged.values().collect::<Vec<_>>(), vec!["a", "b", "c"]);
//! assert_eq!(progress, vec![0.5, 1.0]);
//! # }
//! ```

use std::pin::pin;

use futures::Stream;
use futures::StreamExt;

use crate::error::Error;
use crate::monoid::Monoid;
use crate::partial::PartialResult;
use crate::partial::PartialResultMonoid;

/// Accumulates partial results into the progress and value seen so far.
pub struct ResultFolder<M: Monoid> {
    monoid: PartialResultMonoid<M>,
    acc: PartialResult<M::Value>,
}

impl<M: Monoid> ResultFolder<M> {
    /// Starts from zero progress and the monoid's zero.
    pub fn new(monoid: M) -> Self {
        let monoid = PartialResultMonoid::new(monoid);
        let acc = monoid.zero();
        Self { monoid, acc }
    }

    /// Folds one more partial result.
    pub fn push(&mut self, item: &PartialResult<M::Value>) -> Result<(), Error> {
        self.acc = self.monoid.add(&self.acc, item)?;
        Ok(())
    }

    /// Returns the fraction of work done so far.
    pub fn progress(&self) -> f64 {
        self.acc.delta_done()
    }

    /// Returns the value folded so far.
    pub fn value(&self) -> &M::Value {
        self.acc.delta_value()
    }

    /// Returns the folded value.
    pub fn into_value(self) -> M::Value {
        self.acc.into_parts().1
    }
}

/// Drives `stream` to its end and returns the folded value, or the first error.
pub async fn fold<S, M>(stream: S, monoid: &M) -> Result<M::Value, Error>
where
    S: Stream<Item = Result<PartialResult<M::Value>, Error>>,
    M: Monoid,
{
    fold_with_progress(stream, monoid, |_, _| {}).await
}

/// Like [`fold`], calling `on_progress` with the progress and value after every item.
pub async fn fold_with_progress<S, M, F>(
    stream: S,
    monoid: &M,
    mut on_progress: F,
) -> Result<M::Value, Error>
where
    S: Stream<Item = Result<PartialResult<M::Value>, Error>>,
    M: Monoid,
    F: FnMut(f64, &M::Value),
{
    let mut stream = pin!(stream);
    let mut folder = ResultFolder::new(monoid);
    while let Some(item) = stream.next().await {
        folder.push(&item?)?;
        on_progress(folder.progress(), folder.value());
    }
    Ok(folder.into_value())
}
