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

//! Approximate quantiles from mergeable sorted samples.
//!
//! Each partition contributes a uniform random sample of its rows, sorted by a
//! [`RecordOrder`](crate::table::RecordOrder) and thinned to equally spaced elements.
//! Every kept element carries the number of rows known to sort before it (`wins`) and
//! after it (`losses`). Merging two lists interleaves them and adds up the bounds the other
//! side contributes, so no raw data is rescanned.
//!
//! With [`RankBounds::Counted`] the bounds are exact counts for the partition they came from
//! and remain valid under any sequence of merges.

mod list;
mod sketch;

pub use self::list::QuantileList;
pub use self::sketch::DEFAULT_PER_BIN;
pub use self::sketch::DEFAULT_RESOLUTION;
pub use self::sketch::DEFAULT_SLACK;
pub use self::sketch::QuantileSketch;
pub use self::sketch::QuantileSketchBuilder;
pub use self::sketch::RankBounds;
