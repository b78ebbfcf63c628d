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

use std::collections::HashMap;

use googletest::assert_that;
use googletest::prelude::ge;
use googletest::prelude::le;
use sketchtree::error::ErrorKind;
use sketchtree::frequencies::ErrorType;
use sketchtree::frequencies::FrequencySketch;
use sketchtree::monoid::Monoid;
use sketchtree::monoid::summarize;
use sketchtree::table::MemoryTable;
use sketchtree::table::RowSnapshot;

/// A skewed stream: value `v` in `0..20` occurs about `2000 / (v + 1)` times, the rest is noise.
fn skewed() -> Vec<i64> {
    let mut values = vec![];
    for v in 0..20i64 {
        values.extend(std::iter::repeat_n(v, 2000 / (v as usize + 1)));
    }
    values.extend(1000..4000);
    let len = values.len();
    // deterministic interleaving
    (0..len).map(|i| values[(i * 7907) % len]).collect()
}

fn true_counts(values: &[i64]) -> HashMap<i64, u64> {
    let mut counts = HashMap::new();
    for v in values {
        *counts.entry(*v).or_default() += 1;
    }
    counts
}

#[test]
fn test_scenario_survivor() {
    let table = MemoryTable::builder()
        .strings("item", ["a", "a", "a", "b", "c", "a"])
        .build()
        .unwrap();
    let sketch = FrequencySketch::new(["item"], 2).unwrap();
    let list = summarize(&sketch, &table).unwrap();
    let a = RowSnapshot::of(["a"]);
    assert_eq!(list.total_rows(), 6);
    assert_eq!(list.maximum_error(), 2);
    assert_that!(list.lower_bound(&a), ge(1));
    assert_that!(list.lower_bound(&a), le(4));
    assert_that!(list.upper_bound(&a), ge(4));
}

#[test]
fn test_guarantee_holds_after_merges() {
    let values = skewed();
    let len = values.len();
    let table = MemoryTable::builder()
        .integers("v", values.iter().copied())
        .build()
        .unwrap();
    let k = 30;
    let sketch = FrequencySketch::new(["v"], k).unwrap();
    let merged = table
        .split(6)
        .iter()
        .map(|part| summarize(&sketch, part).unwrap())
        .try_fold(sketch.zero(), |acc, part| sketch.add(&acc, &part))
        .unwrap();
    assert_eq!(merged.total_rows(), len as u64);
    assert!(merged.counts().len() <= k);

    let threshold = len as u64 / (k as u64 + 1);
    for (value, frequency) in true_counts(&values) {
        let row = RowSnapshot::of([value]);
        let reported = merged.lower_bound(&row);
        assert_that!(reported, le(frequency));
        if frequency > threshold {
            assert_that!(reported + threshold, ge(frequency));
        }
    }
}

#[test]
fn test_frequent_items() {
    let values = skewed();
    let table = MemoryTable::builder()
        .integers("v", values.iter().copied())
        .build()
        .unwrap();
    let list = summarize(&FrequencySketch::new(["v"], 30).unwrap(), &table).unwrap();
    let counts = true_counts(&values);

    let no_false_positives = list.frequent_items(ErrorType::NoFalsePositives);
    for row in &no_false_positives {
        let value = match row.item().get(0) {
            Some(sketchtree::table::Value::Integer(v)) => *v,
            other => panic!("unexpected item {other:?}"),
        };
        assert_that!(counts[&value], ge(row.lower_bound()));
        assert_that!(counts[&value], le(row.upper_bound()));
    }
    assert_eq!(no_false_positives[0].item(), &RowSnapshot::of([0i64]));

    let no_false_negatives = list.frequent_items(ErrorType::NoFalseNegatives);
    assert_that!(no_false_negatives.len(), ge(no_false_positives.len()));

    let top = list.top(3);
    assert_eq!(top.len(), 3);
    assert!(top.windows(2).all(|w| w[0].1 >= w[1].1));
    assert_eq!(list.estimate(&RowSnapshot::of([999_999i64])), 0);
}

#[test]
fn test_merge_is_commutative() {
    let sketch = FrequencySketch::new(["v"], 5).unwrap();
    let left = MemoryTable::builder()
        .integers("v", [1, 1, 1, 2, 2, 3, 4, 5, 6])
        .build()
        .unwrap();
    let right = MemoryTable::builder()
        .integers("v", [6, 6, 6, 7, 8, 1, 9])
        .build()
        .unwrap();
    let left = summarize(&sketch, &left).unwrap();
    let right = summarize(&sketch, &right).unwrap();
    assert_eq!(
        sketch.add(&left, &right).unwrap(),
        sketch.add(&right, &left).unwrap()
    );
    assert_eq!(sketch.add(&sketch.zero(), &left).unwrap(), left);
}

#[test]
fn test_multi_column_items() {
    let table = MemoryTable::builder()
        .strings("city", ["Oslo", "Oslo", "Bergen", "Oslo"])
        .integers("year", [2020, 2021, 2020, 2020])
        .build()
        .unwrap();
    let list = summarize(&FrequencySketch::new(["city", "year"], 4).unwrap(), &table).unwrap();
    let oslo_2020 = RowSnapshot::of(["Oslo".into(), sketchtree::table::Value::Integer(2020)]);
    assert_eq!(list.lower_bound(&oslo_2020), 2);
    assert_eq!(list.counts()[0].0, oslo_2020);
}

#[test]
fn test_invalid_parameters() {
    let err = FrequencySketch::new(["v"], 0).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidParameter);

    let err = FrequencySketch::new(Vec::<String>::new(), 3).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidParameter);

    let a = FrequencySketch::new(["a"], 3).unwrap();
    let b = FrequencySketch::new(["b"], 3).unwrap();
    let err = a.add(&a.zero(), &b.zero()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::SchemaMismatch);
}
