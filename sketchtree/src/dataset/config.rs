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

use crate::error::Error;

/// Default number of partial results buffered between a node and its parent.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 64;

/// Execution parameters of one dataset operation.
///
/// # Examples
///
/// ```
/// # use sketchtree::dataset::ExecutionConfig;
/// let config = ExecutionConfig::default()
///     .channel_capacity(8)
///     .max_concurrent_leaves(4);
/// assert!(config.validate().is_ok());
/// assert!(ExecutionConfig::default().channel_capacity(0).validate().is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecutionConfig {
    channel_capacity: usize,
    max_concurrent_leaves: Option<usize>,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
            max_concurrent_leaves: None,
        }
    }
}

impl ExecutionConfig {
    /// Sets how many partial results each node buffers.
    pub fn channel_capacity(mut self, capacity: usize) -> Self {
        self.channel_capacity = capacity;
        self
    }

    /// Bounds how many leaf computations run at once. Unbounded by default.
    pub fn max_concurrent_leaves(mut self, leaves: usize) -> Self {
        self.max_concurrent_leaves = Some(leaves);
        self
    }

    /// Returns the per-node channel capacity.
    pub fn get_channel_capacity(&self) -> usize {
        self.channel_capacity
    }

    /// Returns the bound on concurrent leaf computations, if any.
    pub fn get_max_concurrent_leaves(&self) -> Option<usize> {
        self.max_concurrent_leaves
    }

    /// Rejects zero capacities.
    pub fn validate(&self) -> Result<(), Error> {
        if self.channel_capacity == 0 {
            return Err(Error::invalid_parameter("channel capacity must be positive"));
        }
        if self.max_concurrent_leaves == Some(0) {
            return Err(Error::invalid_parameter(
                "max concurrent leaves must be positive",
            ));
        }
        Ok(())
    }
}
