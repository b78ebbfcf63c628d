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

use sketchtree::distinct::DistinctStringsSketch;
use sketchtree::error::ErrorKind;
use sketchtree::monoid::Monoid;
use sketchtree::monoid::summarize;
use sketchtree::table::ColumnData;
use sketchtree::table::MemoryTable;

fn words() -> MemoryTable {
    MemoryTable::builder()
        .strings(
            "word",
            ["pear", "apple", "fig", "apple", "kiwi", "date", "fig", "banana"],
        )
        .build()
        .unwrap()
}

#[test]
fn test_keeps_smallest_strings() {
    let sketch = DistinctStringsSketch::new("word", 3).unwrap();
    let distinct = summarize(&sketch, &words()).unwrap();
    assert_eq!(
        distinct.values().collect::<Vec<_>>(),
        vec!["apple", "banana", "date"]
    );
    assert!(distinct.is_truncated());
    assert_eq!(distinct.rows_scanned(), 8);
    assert!(!distinct.has_missing());
}

#[test]
fn test_not_truncated_when_everything_fits() {
    let sketch = DistinctStringsSketch::new("word", 6).unwrap();
    let distinct = summarize(&sketch, &words()).unwrap();
    assert_eq!(distinct.len(), 6);
    assert!(!distinct.is_truncated());
    assert!(distinct.contains("kiwi"));
}

#[test]
fn test_union_matches_whole() {
    for max_size in [2, 4, 10] {
        let sketch = DistinctStringsSketch::new("word", max_size).unwrap();
        let whole = summarize(&sketch, &words()).unwrap();
        let merged = words()
            .split(3)
            .iter()
            .map(|part| summarize(&sketch, part).unwrap())
            .try_fold(sketch.zero(), |acc, part| sketch.add(&acc, &part))
            .unwrap();
        assert_eq!(merged, whole, "max_size {max_size}");
    }
}

#[test]
fn test_integers_are_rendered_and_missing_is_noted() {
    let table = MemoryTable::builder()
        .column("n", ColumnData::Integer(vec![Some(10), None, Some(9), Some(10)]))
        .build()
        .unwrap();
    let distinct = summarize(&DistinctStringsSketch::new("n", 5).unwrap(), &table).unwrap();
    // string order, not numeric order
    assert_eq!(distinct.values().collect::<Vec<_>>(), vec!["10", "9"]);
    assert!(distinct.has_missing());
}

#[test]
fn test_invalid_parameters() {
    let err = DistinctStringsSketch::new("word", 0).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidParameter);

    let a = DistinctStringsSketch::new("word", 2).unwrap();
    let b = DistinctStringsSketch::new("word", 3).unwrap();
    let err = a.add(&a.zero(), &b.zero()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::SchemaMismatch);
}
