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

use std::hash::Hasher;

/// [`Hasher`] producing the first 64 bits of MurmurHash3 x64 128 over everything written.
///
/// Bytes are buffered until [`Hasher::finish`], so the result only depends on the
/// concatenation of the written slices.
#[derive(Debug, Clone, Default)]
pub(crate) struct MurmurHash3X64128 {
    seed: u32,
    buffer: Vec<u8>,
}

impl MurmurHash3X64128 {
    #[cfg(test)]
    pub fn with_seed(seed: u32) -> Self {
        Self {
            seed,
            buffer: Vec::new(),
        }
    }
}

impl Hasher for MurmurHash3X64128 {
    fn finish(&self) -> u64 {
        let (h1, _) = mur3::murmurhash3_x64_128(&self.buffer, self.seed);
        h1
    }

    fn write(&mut self, bytes: &[u8]) {
        self.buffer.extend_from_slice(bytes);
    }
}
