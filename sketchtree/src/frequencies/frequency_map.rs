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

//! Open-addressing counter map with decrement-all eviction.

use std::hash::Hash;
use std::hash::Hasher;

use crate::hash::MurmurHash3X64128;

const LOAD_FACTOR: f64 = 0.75;
const DRIFT_LIMIT: usize = 1024;
const MIN_LENGTH: usize = 8;

/// Linear probing map from keys to signed counts.
///
/// `states[i]` is zero for an empty slot and otherwise one more than the distance of the
/// key from its home slot, which lets deletion shift displaced keys back without tombstones.
#[derive(Debug, Clone)]
pub(crate) struct FrequencyMap<T> {
    load_threshold: usize,
    keys: Vec<Option<T>>,
    values: Vec<i64>,
    states: Vec<u16>,
    num_active: usize,
}

impl<T: Eq + Hash> FrequencyMap<T> {
    /// Creates a map able to hold `expected` keys without growing.
    pub fn with_expected(expected: usize) -> Self {
        let wanted = ((expected as f64 / LOAD_FACTOR) as usize + 1).max(MIN_LENGTH);
        Self::with_length(wanted.next_power_of_two())
    }

    fn with_length(length: usize) -> Self {
        assert!(length.is_power_of_two(), "length must be power of 2");
        Self {
            load_threshold: (length as f64 * LOAD_FACTOR) as usize,
            keys: (0..length).map(|_| None).collect(),
            values: vec![0; length],
            states: vec![0; length],
            num_active: 0,
        }
    }

    #[cfg(test)]
    pub fn get(&self, key: &T) -> i64 {
        let probe = self.hash_probe(key);
        if self.states[probe] > 0 {
            return self.values[probe];
        }
        0
    }

    pub fn contains(&self, key: &T) -> bool {
        self.states[self.hash_probe(key)] > 0
    }

    pub fn num_active(&self) -> usize {
        self.num_active
    }

    /// Adds `adjust_amount` to the count of `key`, inserting it if absent.
    pub fn adjust_or_put_value(&mut self, key: T, adjust_amount: i64) {
        if self.num_active >= self.load_threshold {
            self.resize(self.keys.len() * 2);
        }
        let mask = self.keys.len() - 1;
        let mut probe = (hash_item(&key) as usize) & mask;
        let mut drift: usize = 1;
        while self.states[probe] != 0 {
            if self.keys[probe].as_ref() == Some(&key) {
                break;
            }
            probe = (probe + 1) & mask;
            drift += 1;
            debug_assert!(drift < DRIFT_LIMIT, "drift limit exceeded");
        }
        if self.states[probe] == 0 {
            self.keys[probe] = Some(key);
            self.values[probe] = adjust_amount;
            self.states[probe] = drift as u16;
            self.num_active += 1;
        } else {
            self.values[probe] += adjust_amount;
        }
    }

    /// Counts one occurrence of `key` while tracking at most `capacity` keys.
    ///
    /// An untracked key arriving at a full map is not inserted; instead every tracked
    /// count is decremented and the keys reaching zero are evicted.
    pub fn increment_bounded(&mut self, key: T, capacity: usize) {
        if self.num_active < capacity || self.contains(&key) {
            self.adjust_or_put_value(key, 1);
        } else {
            self.adjust_all_values_by(-1);
            self.keep_only_positive_counts();
        }
    }

    /// Keeps at most `capacity` keys by subtracting the `(capacity + 1)`-th largest count
    /// from every count and evicting the keys left non-positive.
    pub fn retain_largest(&mut self, capacity: usize) {
        if self.num_active <= capacity {
            return;
        }
        let mut counts = self.active_values();
        counts.select_nth_unstable_by(capacity, |a, b| b.cmp(a));
        let cutoff = counts[capacity];
        self.adjust_all_values_by(-cutoff);
        self.keep_only_positive_counts();
    }

    pub fn keep_only_positive_counts(&mut self) {
        let len = self.keys.len();
        let mut first_probe = len - 1;
        while self.states[first_probe] > 0 {
            first_probe -= 1;
        }
        for probe in (0..first_probe).rev() {
            if self.states[probe] > 0 && self.values[probe] <= 0 {
                self.hash_delete(probe);
                self.num_active -= 1;
            }
        }
        for probe in (first_probe..len).rev() {
            if self.states[probe] > 0 && self.values[probe] <= 0 {
                self.hash_delete(probe);
                self.num_active -= 1;
            }
        }
    }

    pub fn adjust_all_values_by(&mut self, adjust_amount: i64) {
        for value in &mut self.values {
            *value += adjust_amount;
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&T, i64)> {
        self.keys
            .iter()
            .zip(self.values.iter())
            .zip(self.states.iter())
            .filter(|(_, state)| **state > 0)
            .filter_map(|((key, value), _)| key.as_ref().map(|key| (key, *value)))
    }

    pub fn into_entries(self) -> Vec<(T, i64)> {
        let Self {
            keys,
            values,
            states,
            ..
        } = self;
        keys.into_iter()
            .zip(values)
            .zip(states)
            .filter(|(_, state)| *state > 0)
            .filter_map(|((key, value), _)| key.map(|key| (key, value)))
            .collect()
    }

    fn active_values(&self) -> Vec<i64> {
        self.iter().map(|(_, value)| value).collect()
    }

    fn resize(&mut self, new_length: usize) {
        let old = std::mem::replace(self, Self::with_length(new_length));
        for (key, value) in old.into_entries() {
            self.adjust_or_put_value(key, value);
        }
    }

    fn hash_probe(&self, key: &T) -> usize {
        let mask = self.keys.len() - 1;
        let mut probe = (hash_item(key) as usize) & mask;
        while self.states[probe] > 0 {
            if self.keys[probe].as_ref() == Some(key) {
                break;
            }
            probe = (probe + 1) & mask;
        }
        probe
    }

    fn hash_delete(&mut self, mut delete_probe: usize) {
        self.states[delete_probe] = 0;
        self.keys[delete_probe] = None;
        let mut drift: usize = 1;
        let mask = self.keys.len() - 1;
        let mut probe = (delete_probe + drift) & mask;
        while self.states[probe] != 0 {
            if self.states[probe] as usize > drift {
                self.keys[delete_probe] = self.keys[probe].take();
                self.values[delete_probe] = self.values[probe];
                self.states[delete_probe] = self.states[probe] - drift as u16;
                self.states[probe] = 0;
                drift = 0;
                delete_probe = probe;
            }
            probe = (probe + 1) & mask;
            drift += 1;
            debug_assert!(drift < DRIFT_LIMIT, "drift limit exceeded");
        }
    }
}

#[inline]
fn hash_item<T: Hash>(item: &T) -> u64 {
    let mut hasher = MurmurHash3X64128::default();
    item.hash(&mut hasher);
    hasher.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sorted(map: &FrequencyMap<&'static str>) -> Vec<(&'static str, i64)> {
        let mut entries: Vec<_> = map.iter().map(|(k, v)| (*k, v)).collect();
        entries.sort();
        entries
    }

    #[test]
    fn test_adjust_or_put_value() {
        let mut map = FrequencyMap::with_expected(4);
        map.adjust_or_put_value("a", 2);
        map.adjust_or_put_value("b", 1);
        map.adjust_or_put_value("a", 3);
        assert_eq!(map.get(&"a"), 5);
        assert_eq!(map.get(&"b"), 1);
        assert_eq!(map.get(&"c"), 0);
        assert_eq!(map.num_active(), 2);
    }

    #[test]
    fn test_grows_past_load_threshold() {
        let mut map = FrequencyMap::with_expected(1);
        for i in 0..1000i64 {
            map.adjust_or_put_value(i, i + 1);
        }
        assert_eq!(map.num_active(), 1000);
        for i in 0..1000i64 {
            assert_eq!(map.get(&i), i + 1);
        }
    }

    #[test]
    fn test_increment_bounded_decrements_all() {
        let mut map = FrequencyMap::with_expected(2);
        for key in ["a", "a", "a", "b", "c", "a"] {
            map.increment_bounded(key, 2);
        }
        assert_eq!(sorted(&map), vec![("a", 3)]);
    }

    #[test]
    fn test_retain_largest_subtracts_cutoff() {
        let mut map = FrequencyMap::with_expected(4);
        map.adjust_or_put_value("a", 10);
        map.adjust_or_put_value("b", 6);
        map.adjust_or_put_value("c", 4);
        map.adjust_or_put_value("d", 4);
        map.retain_largest(2);
        assert_eq!(sorted(&map), vec![("a", 6), ("b", 2)]);
    }

    #[test]
    fn test_delete_keeps_displaced_keys_reachable() {
        let mut map = FrequencyMap::with_expected(64);
        for i in 0..40i64 {
            map.adjust_or_put_value(i, if i % 3 == 0 { 1 } else { 2 });
        }
        map.adjust_all_values_by(-1);
        map.keep_only_positive_counts();
        for i in 0..40i64 {
            let expected = if i % 3 == 0 { 0 } else { 1 };
            assert_eq!(map.get(&i), expected, "key {i}");
        }
        assert_eq!(map.num_active(), 26);
    }
}
