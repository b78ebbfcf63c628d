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

use googletest::assert_that;
use googletest::prelude::contains_substring;
use googletest::prelude::eq;
use sketchtree::buckets::ExplicitBuckets;
use sketchtree::buckets::UniformBuckets;
use sketchtree::error::ErrorKind;
use sketchtree::histogram::HeavyHistogram2DSketch;
use sketchtree::histogram::HeavyHistogramSketch;
use sketchtree::histogram::Histogram1D;
use sketchtree::histogram::Histogram2DSketch;
use sketchtree::histogram::HistogramSketch;
use sketchtree::monoid::Monoid;
use sketchtree::monoid::summarize;
use sketchtree::table::ColumnData;
use sketchtree::table::MemoryTable;
use sketchtree::table::RowSnapshot;
use sketchtree::table::SortedStringsConverter;
use sketchtree::table::Table;
use sketchtree::table::Value;
use tokio_util::sync::CancellationToken;

fn boundaries() -> ExplicitBuckets<f64> {
    ExplicitBuckets::new(vec![0.0, 10.0, 20.0, 30.0]).unwrap()
}

fn values(n: usize) -> MemoryTable {
    MemoryTable::builder()
        .column(
            "x",
            ColumnData::Double(
                (0..n)
                    .map(|i| if i % 7 == 0 { None } else { Some((i % 41) as f64 - 3.0) })
                    .collect(),
            ),
        )
        .integers("id", (0..n).map(|i| i as i64))
        .build()
        .unwrap()
}

#[test]
fn test_scenario_counts() {
    let table = MemoryTable::builder()
        .doubles("x", [5.0, 15.0, 25.0, -1.0, 35.0])
        .build()
        .unwrap();
    let histogram = summarize(&HistogramSketch::new("x", boundaries()), &table).unwrap();
    assert_eq!(histogram.counts(), &[1, 1, 1]);
    assert_eq!(histogram.out_of_range(), 2);
    assert_eq!(histogram.missing_data(), 0);
}

#[test]
fn test_boundaries_are_closed_open_except_last() {
    let table = MemoryTable::builder()
        .doubles("x", [0.0, 10.0, 20.0, 30.0, 29.999])
        .build()
        .unwrap();
    let histogram = summarize(&HistogramSketch::new("x", boundaries()), &table).unwrap();
    assert_eq!(histogram.counts(), &[1, 1, 3]);
    assert_eq!(histogram.out_of_range(), 0);
}

#[test]
fn test_counts_add_up_to_rows() {
    let table = values(1000);
    let histogram = summarize(&HistogramSketch::new("x", boundaries()), &table).unwrap();
    assert_eq!(
        histogram.total() + histogram.missing_data() + histogram.out_of_range(),
        table.num_rows() as u64
    );
    assert_eq!(histogram.missing_data(), 143);
    assert_eq!(histogram.cdf().last().copied(), Some(histogram.total()));
}

#[test]
fn test_union_of_parts_equals_whole() {
    let table = values(1000);
    let sketch = HistogramSketch::new("x", UniformBuckets::new(0.0, 30.0, 7).unwrap());
    let whole = summarize(&sketch, &table).unwrap();

    let mut merged = sketch.zero();
    for part in table.split(6) {
        let partial = summarize(&sketch, &part).unwrap();
        merged = sketch.add(&merged, &partial).unwrap();
    }
    assert_eq!(merged.counts(), whole.counts());
    assert_eq!(merged.missing_data(), whole.missing_data());
    assert_eq!(merged.out_of_range(), whole.out_of_range());
}

#[test]
fn test_union_requires_equal_buckets() {
    let table = values(10);
    let left = summarize(&HistogramSketch::new("x", boundaries()), &table).unwrap();
    let other = ExplicitBuckets::new(vec![0.0, 10.0, 20.0, 31.0]).unwrap();
    let right = summarize(&HistogramSketch::new("x", other), &table).unwrap();

    let err = left.union(&right).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::SchemaMismatch);
    assert_that!(err.to_string(), contains_substring("bucket boundaries"));
}

#[test]
fn test_populating_twice_fails() {
    let table = values(10);
    let mut histogram = Histogram1D::new(boundaries());
    let cancel = CancellationToken::new();
    histogram
        .create_histogram(&table, "x", None, &cancel)
        .unwrap();
    let err = histogram
        .create_histogram(&table, "x", None, &cancel)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::DoubleInitialization);
}

#[test]
fn test_missing_column() {
    let table = values(10);
    let err = summarize(&HistogramSketch::new("nope", boundaries()), &table).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidParameter);
    assert_eq!(err.context("column"), Some("nope"));
}

#[test]
fn test_cancelled_scan() {
    let table = values(10);
    let cancel = CancellationToken::new();
    cancel.cancel();
    let mut histogram = Histogram1D::new(boundaries());
    let err = histogram
        .create_histogram(&table, "x", None, &cancel)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Cancelled);
}

#[test]
fn test_string_buckets() {
    let table = MemoryTable::builder()
        .strings("name", ["apple", "kiwi", "banana", "zebra", "mango"])
        .build()
        .unwrap();
    let buckets = ExplicitBuckets::new(vec!["a".to_string(), "l".to_string(), "w".to_string()])
        .unwrap();
    let histogram = summarize(&HistogramSketch::new("name", buckets), &table).unwrap();
    assert_eq!(histogram.counts(), &[3, 1]);
    assert_eq!(histogram.out_of_range(), 1);
}

#[test]
fn test_string_column_through_converter() {
    let table = MemoryTable::builder()
        .strings("grade", ["b", "d", "a", "c", "c"])
        .build()
        .unwrap();
    let converter = SortedStringsConverter::new(["a", "b", "c", "d"]).unwrap();
    let sketch = HistogramSketch::new("grade", UniformBuckets::new(0.0, 3.0, 3).unwrap())
        .with_converter(Arc::new(converter));
    let histogram = summarize(&sketch, &table).unwrap();
    assert_eq!(histogram.counts(), &[1, 1, 3]);

    let err = summarize(
        &HistogramSketch::new("grade", UniformBuckets::new(0.0, 3.0, 3).unwrap()),
        &table,
    )
    .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidParameter);
}

#[test]
fn test_heavy_histogram_tracks_extremes() {
    let table = MemoryTable::builder()
        .doubles("x", [3.0, 12.0, 1.0, 18.0, 7.0, 25.0])
        .strings("who", ["c", "l", "a", "r", "g", "y"])
        .build()
        .unwrap();
    let sketch = HeavyHistogramSketch::new("x", boundaries(), ["who"]);
    let heavy = summarize(&sketch, &table).unwrap();

    let first = heavy.extremes(0).unwrap();
    assert_eq!(*first.min(), 1.0);
    assert_eq!(first.min_row(), &RowSnapshot::of(["a"]));
    assert_eq!(*first.max(), 7.0);
    assert_eq!(first.max_row(), &RowSnapshot::of(["g"]));

    let second = heavy.extremes(1).unwrap();
    assert_eq!(second.min_row(), &RowSnapshot::of(["l"]));
    assert_eq!(second.max_row(), &RowSnapshot::of(["r"]));
    assert_eq!(heavy.histogram().counts(), &[3, 2, 1]);
}

#[test]
fn test_heavy_union_matches_whole() {
    let table = values(500);
    let sketch = HeavyHistogramSketch::new("x", boundaries(), ["id"]);
    let whole = summarize(&sketch, &table).unwrap();
    let parts: Vec<_> = table
        .split(4)
        .iter()
        .map(|part| summarize(&sketch, part).unwrap())
        .collect();
    let merged = parts
        .iter()
        .rev()
        .try_fold(sketch.zero(), |acc, part| sketch.add(&acc, part))
        .unwrap();
    assert_eq!(merged, whole);
}

#[test]
fn test_two_dimensional_cells() {
    let table = MemoryTable::builder()
        .column(
            "x",
            ColumnData::Double(vec![Some(1.0), Some(11.0), Some(21.0), None, Some(99.0)]),
        )
        .doubles("y", [0.5, 1.5, 0.5, 1.0, 1.0])
        .integers("id", [1, 2, 3, 4, 5])
        .build()
        .unwrap();
    let y = UniformBuckets::new(0.0, 2.0, 2).unwrap();
    let sketch = Histogram2DSketch::new("x", boundaries(), "y", y.clone());
    let histogram = summarize(&sketch, &table).unwrap();
    assert_eq!(histogram.count(0, 0), 1);
    assert_eq!(histogram.count(1, 1), 1);
    assert_eq!(histogram.count(2, 0), 1);
    assert_eq!(histogram.missing_data(), 1);
    assert_eq!(histogram.out_of_range(), 1);
    assert_eq!(histogram.total(), 3);

    let heavy = summarize(
        &HeavyHistogram2DSketch::new("x", boundaries(), "y", y, ["id"]),
        &table,
    )
    .unwrap();
    let cell = heavy.extremes(1, 1);
    let x = cell.x().unwrap();
    assert_that!(x.min_row().get(0), eq(Some(&Value::Integer(2))));
    assert_eq!(*cell.y().unwrap().max(), 1.5);
    assert!(heavy.extremes(0, 1).x().is_none());
    assert_eq!(heavy.histogram().missing_data(), 1);
}

#[test]
fn test_heavy_two_dimensional_string_column_through_converter() {
    let table = MemoryTable::builder()
        .strings("grade", ["b", "d", "a", "c"])
        .doubles("y", [0.5, 1.5, 1.5, 0.5])
        .integers("id", [1, 2, 3, 4])
        .build()
        .unwrap();
    let grades = UniformBuckets::new(0.0, 3.0, 3).unwrap();
    let y = UniformBuckets::new(0.0, 2.0, 2).unwrap();
    let converter = Arc::new(SortedStringsConverter::new(["a", "b", "c", "d"]).unwrap());

    let err = summarize(
        &HeavyHistogram2DSketch::new("grade", grades.clone(), "y", y.clone(), ["id"]),
        &table,
    )
    .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidParameter);

    let sketch =
        HeavyHistogram2DSketch::new("grade", grades, "y", y, ["id"]).with_x_converter(converter);
    let heavy = summarize(&sketch, &table).unwrap();
    assert_eq!(heavy.histogram().count(0, 1), 1);
    assert_eq!(heavy.histogram().count(1, 0), 1);
    assert_eq!(heavy.histogram().count(2, 0), 1);
    assert_eq!(heavy.histogram().count(2, 1), 1);
    assert_eq!(heavy.histogram().total(), 4);
    let cell = heavy.extremes(2, 1);
    assert_that!(cell.x().unwrap().min_row().get(0), eq(Some(&Value::Integer(2))));
    assert_eq!(*cell.x().unwrap().min(), 3.0);
}
