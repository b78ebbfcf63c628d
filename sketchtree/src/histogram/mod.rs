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

//! Fixed-bucket histograms over one or two columns.
//!
//! A histogram is computed in a single pass over a partition and never rescans data:
//! two histograms over disjoint rows and equal buckets add up to the histogram of the
//! concatenated rows. Combining histograms over different buckets fails with
//! [`SchemaMismatch`](crate::error::ErrorKind::SchemaMismatch).
//!
//! The "heavy" variants additionally keep, per bucket, the smallest and largest value
//! together with a snapshot of the row that held it.
//!
//! # Usage
//!
//! ```rust
//! # use sketchtree::buckets::ExplicitBuckets;
//! # use sketchtree::histogram::HistogramSketch;
//! # use sketchtree::monoid::summarize;
//! # use sketchtree::table::MemoryTable;
//! let table = MemoryTable::builder()
//!     .doubles("x", [5.0, 15.0, 25.0, -1.0, 35.0])
//!     .build()
//!     .unwrap();
//! let buckets = ExplicitBuckets::new(vec![0.0, 10.0, 20.0, 30.0]).unwrap();
//! let histogram = summarize(&HistogramSketch::new("x", buckets), &table).unwrap();
//! assert_eq!(histogram.counts(), &[1, 1, 1]);
//! assert_eq!(histogram.out_of_range(), 2);
//! assert_eq!(histogram.missing_data(), 0);
//! ```

mod hist1d;
mod hist2d;
mod sketch;

pub use self::hist1d::BucketExtremes;
pub use self::hist1d::HeavyHistogram1D;
pub use self::hist1d::Histogram1D;
pub use self::hist2d::AxisSource;
pub use self::hist2d::CellExtremes;
pub use self::hist2d::HeavyHistogram2D;
pub use self::hist2d::Histogram2D;
pub use self::sketch::HeavyHistogram2DSketch;
pub use self::sketch::HeavyHistogramSketch;
pub use self::sketch::Histogram2DSketch;
pub use self::sketch::HistogramSketch;
