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

use std::collections::BTreeMap;

use sketchtree::error::ErrorKind;
use sketchtree::monoid::Monoid;
use sketchtree::monoid::summarize;
use sketchtree::table::ColumnData;
use sketchtree::table::MemoryTable;
use sketchtree::table::RecordOrder;
use sketchtree::table::RowSnapshot;
use sketchtree::topk::TopKSketch;

const A: i64 = 1;
const D: i64 = 2;
const B: i64 = 3;
const C: i64 = 4;

fn repeated(counts: &[(i64, usize)]) -> MemoryTable {
    MemoryTable::builder()
        .integers(
            "letter",
            counts
                .iter()
                .flat_map(|(value, count)| std::iter::repeat_n(*value, *count)),
        )
        .build()
        .unwrap()
}

fn row(value: i64) -> RowSnapshot {
    RowSnapshot::of([value])
}

#[test]
fn test_scenario_merge() {
    let sketch = TopKSketch::new(RecordOrder::new().ascending("letter"), 3).unwrap();
    let left = summarize(&sketch, &repeated(&[(C, 2), (A, 5), (B, 3)])).unwrap();
    let right = summarize(&sketch, &repeated(&[(B, 1), (D, 4), (A, 2)])).unwrap();
    assert_eq!(left.entries(), &[(row(A), 5), (row(B), 3), (row(C), 2)]);
    assert_eq!(right.entries(), &[(row(A), 2), (row(D), 4), (row(B), 1)]);

    let merged = sketch.add(&left, &right).unwrap();
    assert_eq!(merged.entries(), &[(row(A), 7), (row(D), 4), (row(B), 4)]);
    assert_eq!(sketch.add(&right, &left).unwrap(), merged);
    assert_eq!(merged.total_count(), 15);
    assert_eq!(merged.count(&row(D)), Some(4));
    assert_eq!(merged.count(&row(C)), None);
}

#[test]
fn test_create_keeps_first_rows_with_exact_counts() {
    let values: Vec<i64> = (0..2000).map(|i| (i * 37) % 101).collect();
    let table = MemoryTable::builder()
        .integers("v", values.iter().copied())
        .build()
        .unwrap();
    let sketch = TopKSketch::new(RecordOrder::new().ascending("v"), 10).unwrap();
    let top = summarize(&sketch, &table).unwrap();

    let mut expected: BTreeMap<i64, u64> = BTreeMap::new();
    for v in values {
        *expected.entry(v).or_default() += 1;
    }
    let expected: Vec<_> = expected
        .into_iter()
        .take(10)
        .map(|(v, count)| (row(v), count))
        .collect();
    assert_eq!(top.entries(), expected.as_slice());
}

#[test]
fn test_merge_of_parts_is_exact_when_k_is_generous() {
    let table = MemoryTable::builder()
        .integers("v", (0..3000).map(|i| (i * 13) % 50))
        .build()
        .unwrap();
    let sketch = TopKSketch::new(RecordOrder::new().ascending("v"), 50).unwrap();
    let whole = summarize(&sketch, &table).unwrap();
    let merged = table
        .split(9)
        .iter()
        .map(|part| summarize(&sketch, part).unwrap())
        .try_fold(sketch.zero(), |acc, part| sketch.add(&acc, &part))
        .unwrap();
    assert_eq!(merged, whole);
    assert_eq!(merged.total_count(), 3000);
}

#[test]
fn test_multi_column_order() {
    let table = MemoryTable::builder()
        .strings("city", ["Oslo", "Bergen", "Oslo", "Bergen", "Oslo"])
        .integers("age", [30, 40, 50, 40, 30])
        .build()
        .unwrap();
    let order = RecordOrder::new().ascending("city").descending("age");
    let sketch = TopKSketch::new(order, 2).unwrap();
    let top = summarize(&sketch, &table).unwrap();
    let rows: Vec<_> = top.rows().cloned().collect();
    assert_eq!(
        rows,
        vec![
            RowSnapshot::of(["Bergen".into(), sketchtree::table::Value::Integer(40)]),
            RowSnapshot::of(["Oslo".into(), sketchtree::table::Value::Integer(50)]),
        ]
    );
    assert_eq!(top.entries()[0].1, 2);
}

#[test]
fn test_missing_values_sort_first() {
    let table = MemoryTable::builder()
        .column("v", ColumnData::Integer(vec![Some(3), None, Some(1), None]))
        .build()
        .unwrap();
    let sketch = TopKSketch::new(RecordOrder::new().ascending("v"), 2).unwrap();
    let top = summarize(&sketch, &table).unwrap();
    assert_eq!(
        top.entries(),
        &[(RowSnapshot::new(vec![None]), 2), (row(1), 1)]
    );
}

#[test]
fn test_invalid_parameters() {
    let err = TopKSketch::new(RecordOrder::new().ascending("v"), 0).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidParameter);

    let err = TopKSketch::new(RecordOrder::new(), 3).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidParameter);

    let order = RecordOrder::new().ascending("v");
    let three = TopKSketch::new(order.clone(), 3).unwrap();
    let four = TopKSketch::new(order, 4).unwrap();
    let err = three.add(&three.zero(), &four.zero()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::SchemaMismatch);
}
