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

use std::cmp::Ordering;

use crate::error::Error;
use crate::table::RecordOrder;
use crate::table::RowSnapshot;

/// A sorted sample of rows, each annotated with bounds on its rank in the data it was
/// drawn from.
///
/// For every sample `s` at position `i`, `wins(i)` rows are known to sort strictly before
/// `s` and `losses(i)` rows are known to sort strictly after it, so its true rank `r`
/// satisfies `wins(i) <= r <= data_size() - 1 - losses(i)`.
#[derive(Debug, Clone, PartialEq)]
pub struct QuantileList {
    order: RecordOrder,
    samples: Vec<RowSnapshot>,
    wins: Vec<u64>,
    losses: Vec<u64>,
    data_size: u64,
}

impl QuantileList {
    /// Creates a list over no data.
    pub fn empty(order: RecordOrder) -> Self {
        Self {
            order,
            samples: vec![],
            wins: vec![],
            losses: vec![],
            data_size: 0,
        }
    }

    pub(crate) fn from_parts(
        order: RecordOrder,
        samples: Vec<RowSnapshot>,
        wins: Vec<u64>,
        losses: Vec<u64>,
        data_size: u64,
    ) -> Self {
        debug_assert_eq!(samples.len(), wins.len());
        debug_assert_eq!(samples.len(), losses.len());
        Self {
            order,
            samples,
            wins,
            losses,
            data_size,
        }
    }

    /// Returns the order the samples are sorted by.
    pub fn order(&self) -> &RecordOrder {
        &self.order
    }

    /// Returns the number of rows summarized.
    pub fn data_size(&self) -> u64 {
        self.data_size
    }

    /// Returns the number of samples kept.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Returns true if no sample is kept.
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Returns the samples in order.
    pub fn samples(&self) -> &[RowSnapshot] {
        &self.samples
    }

    /// Returns the number of rows known to sort before each sample.
    pub fn wins(&self) -> &[u64] {
        &self.wins
    }

    /// Returns the number of rows known to sort after each sample.
    pub fn losses(&self) -> &[u64] {
        &self.losses
    }

    /// Returns the inclusive range of 0-based ranks the sample at `index` may hold.
    pub fn rank_bounds(&self, index: usize) -> Option<(u64, u64)> {
        let wins = *self.wins.get(index)?;
        let losses = self.losses[index];
        let upper = self.data_size.saturating_sub(1).saturating_sub(losses);
        Some((wins, upper.max(wins)))
    }

    /// Returns the sample whose rank range is centered closest to `q * (data_size - 1)`.
    ///
    /// Returns `None` if the list is empty; fails if `q` is not within `[0, 1]`.
    pub fn quantile(&self, q: f64) -> Result<Option<&RowSnapshot>, Error> {
        if !(0.0..=1.0).contains(&q) {
            return Err(Error::invalid_parameter("quantile must be within [0, 1]")
                .with_context("q", q));
        }
        let target = q * self.data_size.saturating_sub(1) as f64;
        let best = (0..self.samples.len()).min_by(|&a, &b| {
            self.distance(a, target)
                .total_cmp(&self.distance(b, target))
        });
        Ok(best.map(|index| &self.samples[index]))
    }

    fn distance(&self, index: usize, target: f64) -> f64 {
        let (lower, upper) = self.rank_bounds(index).unwrap_or_default();
        ((lower + upper) as f64 / 2.0 - target).abs()
    }

    /// Merges two lists and compresses the result to at most `max_size` samples.
    pub(crate) fn merge(&self, other: &Self, max_size: usize) -> Result<Self, Error> {
        if self.order != other.order {
            return Err(Error::schema_mismatch("record orders"));
        }

        let (left, right) = (self, other);
        let total = left.len() + right.len();
        let mut samples = Vec::with_capacity(total);
        let mut wins = Vec::with_capacity(total);
        let mut losses = Vec::with_capacity(total);

        let (mut i, mut j) = (0, 0);
        while i < left.len() || j < right.len() {
            let take_left = j == right.len()
                || (i < left.len()
                    && left.order.compare(&left.samples[i], &right.samples[j])
                        != Ordering::Greater);
            if take_left {
                wins.push(left.wins[i] + preceding(&right.wins, j));
                losses.push(left.losses[i] + following(&right.losses, j));
                samples.push(left.samples[i].clone());
                i += 1;
            } else {
                wins.push(right.wins[j] + preceding(&left.wins, i));
                losses.push(right.losses[j] + following(&left.losses, i));
                samples.push(right.samples[j].clone());
                j += 1;
            }
        }

        let keep = equally_spaced(samples.len(), max_size);
        Ok(Self {
            order: self.order.clone(),
            samples: pick(samples, &keep),
            wins: pick(wins, &keep),
            losses: pick(losses, &keep),
            data_size: left.data_size + right.data_size,
        })
    }
}

/// Wins of the last element consumed from the other list, if any.
fn preceding(wins: &[u64], consumed: usize) -> u64 {
    if consumed > 0 { wins[consumed - 1] } else { 0 }
}

/// Losses of the next element of the other list, if any remain.
fn following(losses: &[u64], consumed: usize) -> u64 {
    losses.get(consumed).copied().unwrap_or(0)
}

/// Returns up to `max_size` equally spaced positions in `0..len`, including the first and
/// the last.
pub(crate) fn equally_spaced(len: usize, max_size: usize) -> Vec<usize> {
    assert!(max_size >= 2, "max_size must be at least 2, got {max_size}");
    if len <= max_size {
        return (0..len).collect();
    }
    let step = (len - 1) as f64 / (max_size - 1) as f64;
    (0..max_size)
        .map(|t| ((t as f64 * step).round() as usize).min(len - 1))
        .collect()
}

pub(crate) fn pick<T: Clone>(items: Vec<T>, positions: &[usize]) -> Vec<T> {
    if positions.len() == items.len() {
        return items;
    }
    positions.iter().map(|&p| items[p].clone()).collect()
}
