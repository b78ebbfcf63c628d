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

//! # sketchtree
//!
//! Mergeable summaries ("sketches") over horizontally partitioned datasets, computed
//! concurrently and reported as a stream of monotonically improving partial results.
//!
//! Every summary is a [`Monoid`](monoid::Monoid): it has an identity and an associative,
//! commutative `add`, so the summaries of individual partitions can be combined in any
//! order and any tree shape. A [`Dataset`](dataset::Dataset) runs a
//! [`Sketch`](monoid::Sketch) at each partition on the tokio runtime and folds the results
//! up its tree; the caller observes the done fraction grow toward 1 and may cancel at any
//! point.
//!
//! Summary families:
//!
//! - [`histogram`]: bucket counts over one or two columns, optionally with the extreme rows
//!   of every bucket.
//! - [`quantile`]: approximate quantiles from sorted samples with rank bounds.
//! - [`topk`]: exact counts of the first `k` distinct rows under a record order.
//! - [`frequencies`]: heavy hitters by Misra-Gries counting.
//! - [`stats`]: minimum, maximum, counts and moments of a numeric column.
//! - [`distinct`]: the smallest distinct strings of a column.
//!
//! Partitions are read through the [`table`] interface.

#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod buckets;
pub mod common;
pub mod consumer;
pub mod dataset;
pub mod distinct;
pub mod error;
pub mod frequencies;
pub mod histogram;
pub mod monoid;
pub mod partial;
pub mod quantile;
pub mod stats;
pub mod table;
pub mod topk;

mod hash;
