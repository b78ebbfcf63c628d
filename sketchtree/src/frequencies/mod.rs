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

//! Heavy hitters with bounded memory.
//!
//! Each partition runs Misra-Gries counting with `k` counters: a row whose value is not
//! tracked while all counters are taken decrements every counter instead of being added.
//! Two lists merge by summing counts and, past `k` candidates, subtracting the
//! `(k + 1)`-th largest count from all of them.
//!
//! Over `n` rows, every item occurring more than `n / (k + 1)` times is reported with a
//! count at most `n / (k + 1)` below its true frequency, and no count is ever above it.
//!
//! # Usage
//!
//! ```rust
//! # use sketchtree::frequencies::ErrorType;
//! # use sketchtree::frequencies::FrequencySketch;
//! # use sketchtree::monoid::summarize;
//! # use sketchtree::table::MemoryTable;
//! # use sketchtree::table::RowSnapshot;
//! let table = MemoryTable::builder()
//!     .strings("item", ["a", "a", "a", "b", "c", "a"])
//!     .build()
//!     .unwrap();
//! let sketch = FrequencySketch::new(["item"], 2).unwrap();
//! let list = summarize(&sketch, &table).unwrap();
//! assert!(list.lower_bound(&RowSnapshot::of(["a"])) >= 1);
//! let rows = list.frequent_items(ErrorType::NoFalseNegatives);
//! assert_eq!(rows[0].item(), &RowSnapshot::of(["a"]));
//! ```

mod frequency_map;
mod list;
mod sketch;

pub use self::list::ErrorType;
pub use self::list::FrequencyList;
pub use self::list::Row;
pub use self::sketch::FrequencySketch;
