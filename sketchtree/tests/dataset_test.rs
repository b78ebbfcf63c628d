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

use std::error::Error as _;
use std::sync::Arc;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::time::Duration;

use futures::StreamExt;
use googletest::assert_that;
use googletest::prelude::contains_substring;
use sketchtree::buckets::UniformBuckets;
use sketchtree::consumer::fold;
use sketchtree::consumer::fold_with_progress;
use sketchtree::dataset::Dataset;
use sketchtree::dataset::DatasetMonoid;
use sketchtree::dataset::ExecutionConfig;
use sketchtree::dataset::OperationState;
use sketchtree::dataset::Shape;
use sketchtree::error::Error;
use sketchtree::error::ErrorKind;
use sketchtree::histogram::HistogramSketch;
use sketchtree::monoid::Monoid;
use sketchtree::monoid::Sketch;
use sketchtree::monoid::summarize;
use sketchtree::stats::BasicStatsSketch;
use sketchtree::table::MemoryTable;
use sketchtree::table::Table;
use tokio_util::sync::CancellationToken;

fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn table(rows: usize) -> MemoryTable {
    MemoryTable::builder()
        .doubles("x", (0..rows).map(|i| ((i * 7919) % 1000) as f64 / 10.0))
        .build()
        .unwrap()
}

fn histogram() -> HistogramSketch<UniformBuckets> {
    HistogramSketch::new("x", UniformBuckets::new(0.0, 100.0, 20).unwrap())
}

/// Counts leaves, tracking how many run at once.
#[derive(Debug, Default)]
struct Probe {
    running: AtomicUsize,
    max_running: AtomicUsize,
    started: AtomicUsize,
    stopped: AtomicUsize,
    block_until_cancelled: bool,
}

#[derive(Debug, Clone)]
struct ProbeSketch(Arc<Probe>);

impl Monoid for ProbeSketch {
    type Value = u64;

    fn zero(&self) -> u64 {
        0
    }

    fn add(&self, left: &u64, right: &u64) -> Result<u64, Error> {
        Ok(left + right)
    }
}

impl Sketch<MemoryTable> for ProbeSketch {
    fn create(&self, _data: &MemoryTable, cancel: &CancellationToken) -> Result<u64, Error> {
        let probe = &self.0;
        probe.started.fetch_add(1, Ordering::SeqCst);
        let now = probe.running.fetch_add(1, Ordering::SeqCst) + 1;
        probe.max_running.fetch_max(now, Ordering::SeqCst);
        let result = if probe.block_until_cancelled {
            while !cancel.is_cancelled() {
                std::thread::sleep(Duration::from_millis(1));
            }
            probe.stopped.fetch_add(1, Ordering::SeqCst);
            Err(Error::new(ErrorKind::Cancelled, "probe stopped"))
        } else {
            std::thread::sleep(Duration::from_millis(5));
            Ok(1)
        };
        probe.running.fetch_sub(1, Ordering::SeqCst);
        result
    }
}

async fn wait_for(counter: &AtomicUsize, expected: usize) {
    for _ in 0..2000 {
        if counter.load(Ordering::SeqCst) >= expected {
            return;
        }
        tokio::time::sleep(Duration::from_millis(1)).await;
    }
    panic!("counter stuck at {}", counter.load(Ordering::SeqCst));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_sketch_matches_single_partition() {
    init_logging();
    let whole = table(5000);
    let expected = summarize(&histogram(), &whole).unwrap();
    for (parts, fan_out) in [(1, 2), (7, 2), (16, 3), (33, 5)] {
        let dataset = Dataset::from_partitions(whole.split(parts), fan_out).unwrap();
        assert_eq!(dataset.leaf_count(), parts);
        let actual = dataset.run_sketch(histogram()).await.unwrap();
        assert_eq!(actual, expected, "{parts} parts, fan out {fan_out}");
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_progress_is_monotone_and_completes() {
    init_logging();
    for (parts, fan_out) in [(10, 3), (7, 2), (3, 3), (9, 3), (1, 2)] {
        let dataset = Dataset::from_partitions(table(3000).split(parts), fan_out).unwrap();
        let sketch = histogram();
        let mut stream = dataset.sketch(sketch.clone());
        assert_eq!(stream.state(), OperationState::Idle);

        let mut progress = vec![];
        let mut totals = vec![];
        let mut folder = sketchtree::consumer::ResultFolder::new(&sketch);
        while let Some(item) = stream.next().await {
            let item = item.unwrap();
            assert!(item.delta_done() >= 0.0);
            folder.push(&item).unwrap();
            progress.push(folder.progress());
            totals.push(folder.value().total());
        }
        assert_eq!(stream.state(), OperationState::Complete);
        assert!(stream.next().await.is_none());

        assert!(progress.windows(2).all(|w| w[0] <= w[1]));
        assert!(totals.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(*progress.last().unwrap(), 1.0, "{parts} parts, fan-out {fan_out}");
        assert!(progress[..progress.len() - 1].iter().all(|&done| done < 1.0));
        assert_eq!(*totals.last().unwrap(), 3000);
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_fold_with_progress_reports_every_item() {
    let dataset = Dataset::from_partitions(table(100).split(4), 2).unwrap();
    let sketch = BasicStatsSketch::new("x", 1).unwrap();
    let mut calls = 0;
    let mut last = 0.0;
    let stats = fold_with_progress(dataset.sketch(sketch.clone()), &sketch, |done, _| {
        calls += 1;
        last = done;
    })
    .await
    .unwrap();
    assert!(calls >= 1);
    assert_eq!(last, 1.0);
    assert_eq!(stats.present_count(), 100);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_single_leaf_and_empty_datasets() {
    let leaf = Dataset::leaf(table(10));
    let items: Vec<_> = leaf.sketch(histogram()).collect().await;
    assert_eq!(items.len(), 1);
    let item = items[0].as_ref().unwrap();
    assert_eq!(item.delta_done(), 1.0);
    assert_eq!(item.delta_value().total(), 10);

    let empty = Dataset::<MemoryTable>::from_partitions(vec![], 4).unwrap();
    assert_eq!(empty.shape(), Shape::Parallel(vec![]));
    let items: Vec<_> = empty.sketch(histogram()).collect().await;
    assert_eq!(items.len(), 1);
    let item = items[0].as_ref().unwrap();
    assert_eq!(item.delta_done(), 1.0);
    assert_eq!(item.delta_value(), &histogram().zero());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_cancel_stops_leaves() {
    init_logging();
    let probe = Arc::new(Probe {
        block_until_cancelled: true,
        ..Probe::default()
    });
    let dataset = Dataset::from_partitions(table(40).split(4), 2).unwrap();
    let mut stream = dataset.sketch(ProbeSketch(probe.clone()));

    let first = tokio::time::timeout(Duration::from_millis(50), stream.next()).await;
    assert!(first.is_err(), "no leaf can finish before cancellation");
    assert_eq!(stream.state(), OperationState::Dispatched);
    wait_for(&probe.started, 4).await;

    stream.cancel();
    assert_eq!(stream.state(), OperationState::Cancelled);
    assert!(stream.next().await.is_none());
    wait_for(&probe.stopped, 4).await;
    assert_eq!(stream.state(), OperationState::Cancelled);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_dropping_the_stream_cancels() {
    let probe = Arc::new(Probe {
        block_until_cancelled: true,
        ..Probe::default()
    });
    let dataset = Dataset::from_partitions(table(30).split(3), 3).unwrap();
    let mut stream = dataset.sketch(ProbeSketch(probe.clone()));
    let _ = tokio::time::timeout(Duration::from_millis(20), stream.next()).await;
    wait_for(&probe.started, 3).await;
    drop(stream);
    wait_for(&probe.stopped, 3).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_cancel_before_first_poll_dispatches_nothing() {
    let probe = Arc::new(Probe::default());
    let dataset = Dataset::from_partitions(table(30).split(3), 3).unwrap();
    let mut stream = dataset.sketch(ProbeSketch(probe.clone()));
    stream.cancel();
    assert!(stream.next().await.is_none());
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(probe.started.load(Ordering::SeqCst), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_leaf_failure_is_the_last_item() {
    init_logging();
    let good = table(20).split(3);
    let bad = MemoryTable::builder().doubles("y", [1.0]).build().unwrap();
    let parts = good.into_iter().chain(std::iter::once(bad));
    let dataset = Dataset::from_partitions(parts, 2).unwrap();

    let mut stream = dataset.sketch(BasicStatsSketch::new("x", 1).unwrap());
    let mut items = vec![];
    while let Some(item) = stream.next().await {
        items.push(item);
    }
    assert_eq!(stream.state(), OperationState::Failed);
    let (last, rest) = items.split_last().unwrap();
    assert!(rest.iter().all(Result::is_ok));
    let err = last.as_ref().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::LeafFailure);
    let source = err.source().expect("leaf failure keeps its cause");
    assert_that!(source.to_string(), contains_substring("column not found"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_leaf_panic_is_a_failure() {
    let parts = (1..=4).map(table);
    let dataset = Dataset::from_partitions(parts, 2).unwrap();
    let stream = dataset.map(|t: &MemoryTable| {
        assert_ne!(t.num_rows(), 3, "three rows");
        t.num_rows()
    });
    let err = fold(stream, &DatasetMonoid::new()).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::LeafFailure);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrency_bound() {
    let probe = Arc::new(Probe::default());
    let dataset = Dataset::from_partitions(table(80).split(8), 3).unwrap();
    let config = ExecutionConfig::default()
        .max_concurrent_leaves(1)
        .channel_capacity(1);
    let sketch = ProbeSketch(probe.clone());
    let stream = dataset.sketch_with(sketch.clone(), &config).unwrap();
    let count = fold(stream, &sketch).await.unwrap();
    assert_eq!(count, 8);
    assert_eq!(probe.max_running.load(Ordering::SeqCst), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_invalid_execution_config() {
    let dataset = Dataset::leaf(table(5));
    let err = dataset
        .sketch_with(histogram(), &ExecutionConfig::default().channel_capacity(0))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidParameter);
    let err = dataset
        .sketch_with(histogram(), &ExecutionConfig::default().max_concurrent_leaves(0))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidParameter);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_map_keeps_shape_and_order() {
    let parts = [3, 1, 4, 1, 5, 9, 2].map(table);
    let dataset = Dataset::from_partitions(parts, 3).unwrap();
    let stream = dataset.map(|t: &MemoryTable| t.num_rows());
    let mapped = fold(stream, &DatasetMonoid::new()).await.unwrap().unwrap();
    assert_eq!(mapped.shape(), dataset.shape());
    let sizes: Vec<usize> = mapped.leaves().into_iter().map(|leaf| **leaf).collect();
    assert_eq!(sizes, vec![3, 1, 4, 1, 5, 9, 2]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_zip_pairs_partitions() {
    let left = Dataset::from_partitions(table(40).split(5), 2).unwrap();
    let right = Dataset::from_partitions((0..5).map(|i| format!("part {i}")), 2).unwrap();
    let zipped = fold(left.zip(&right), &DatasetMonoid::new())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(zipped.shape(), left.shape());
    for ((pair, l), r) in zipped.leaves().into_iter().zip(left.leaves()).zip(right.leaves()) {
        assert!(Arc::ptr_eq(&pair.0, l));
        assert!(Arc::ptr_eq(&pair.1, r));
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_zip_shape_mismatch() {
    let left = Dataset::from_partitions(table(40).split(4), 2).unwrap();
    let right = Dataset::from_partitions(table(40).split(3), 2).unwrap();
    let mut stream = left.zip(&right);
    let err = stream.next().await.unwrap().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ShapeMismatch);
    assert_eq!(err.context("left_leaves"), Some("4"));
    assert_eq!(err.context("right_leaves"), Some("3"));
    assert!(stream.next().await.is_none());
    assert_eq!(stream.state(), OperationState::Failed);
}

#[test]
fn test_from_partitions_fan_out() {
    let dataset = Dataset::from_partitions(0..10, 3).unwrap();
    assert_eq!(dataset.leaf_count(), 10);
    fn check(shape: &Shape, fan_out: usize) {
        if let Shape::Parallel(children) = shape {
            assert!(children.len() <= fan_out);
            children.iter().for_each(|c| check(c, fan_out));
        }
    }
    check(&dataset.shape(), 3);
    let leaves: Vec<i32> = dataset.leaves().into_iter().map(|leaf| **leaf).collect();
    assert_eq!(leaves, (0..10).collect::<Vec<_>>());

    let single = Dataset::from_partitions([7], 2).unwrap();
    assert_eq!(single.shape(), Shape::Parallel(vec![Shape::Leaf]));

    let err = Dataset::from_partitions(0..10, 1).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidParameter);
}
