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

use std::fmt;
use std::pin::Pin;
use std::sync::Arc;
use std::task::Context as TaskContext;
use std::task::Poll;

use futures::Stream;
use tokio::sync::Semaphore;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::Dataset;
use super::config::ExecutionConfig;
use super::driver::Context;
use super::driver::Message;
use super::driver::Reducer;
use super::driver::Sink;
use super::driver::run_node;
use crate::error::Error;
use crate::error::ErrorKind;
use crate::partial::PartialResult;

/// Lifecycle of one dataset operation, as observed through its stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationState {
    /// Created; no work has been dispatched yet.
    Idle,
    /// Work was sent to the leaves; nothing has come back yet.
    Dispatched,
    /// Partial results are arriving.
    Combining,
    /// The last partial result was delivered.
    Complete,
    /// The subscriber cancelled; no further results are delivered.
    Cancelled,
    /// A leaf or a combination step failed; the error was the last item.
    Failed,
}

impl OperationState {
    /// Returns true once no further items will be produced.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Complete | Self::Cancelled | Self::Failed)
    }
}

type Launch<R> = Box<dyn FnOnce() -> mpsc::Receiver<Message<R>> + Send>;

/// The partial results of one dataset operation.
///
/// Work is dispatched when the stream is first polled, which must happen inside a tokio
/// runtime. Items are increments: fold them, for example with
/// [`fold`](crate::consumer::fold). The stream ends after the last partial result, or
/// after the first error. Dropping the stream or calling
/// [`cancel`](PartialResultStream::cancel) aborts the outstanding work.
pub struct PartialResultStream<R> {
    state: OperationState,
    cancel: CancellationToken,
    launch: Option<Launch<R>>,
    rx: Option<mpsc::Receiver<Message<R>>>,
    failure: Option<Error>,
}

impl<R: Send + 'static> PartialResultStream<R> {
    pub(crate) fn launch<T, J, D>(
        root: Dataset<T>,
        job: J,
        reducer: D,
        config: &ExecutionConfig,
    ) -> Self
    where
        T: ?Sized + Send + Sync + 'static,
        J: Fn(&Arc<T>, &CancellationToken) -> Result<R, Error> + Send + Sync + 'static,
        D: Reducer<R>,
    {
        let cancel = CancellationToken::new();
        let capacity = config.get_channel_capacity();
        let ctx = Arc::new(Context {
            job,
            reducer,
            leaves: cancel.child_token(),
            cancel: cancel.clone(),
            permits: config
                .get_max_concurrent_leaves()
                .map(|permits| Arc::new(Semaphore::new(permits))),
            capacity,
        });
        let launch: Launch<R> = Box::new(move || {
            debug!(leaves = root.leaf_count(), capacity, "dispatching dataset operation");
            let (tx, rx) = mpsc::channel(capacity);
            tokio::spawn(run_node(root, ctx, Sink { tx, index: 0 }));
            rx
        });
        Self {
            state: OperationState::Idle,
            cancel,
            launch: Some(launch),
            rx: None,
            failure: None,
        }
    }

    /// A stream whose only item is `error`.
    pub(crate) fn failed(error: Error) -> Self {
        Self {
            state: OperationState::Idle,
            cancel: CancellationToken::new(),
            launch: None,
            rx: None,
            failure: Some(error),
        }
    }
}

impl<R> PartialResultStream<R> {
    /// Returns the current state of the operation.
    pub fn state(&self) -> OperationState {
        self.state
    }

    /// Aborts outstanding work. No item is delivered afterwards.
    pub fn cancel(&mut self) {
        if !self.state.is_terminal() {
            debug!(state = ?self.state, "dataset operation cancelled");
            self.state = OperationState::Cancelled;
        }
        self.cancel.cancel();
        self.launch = None;
        self.rx = None;
        self.failure = None;
    }

    fn finish(&mut self, state: OperationState) {
        self.state = state;
        self.rx = None;
        self.cancel.cancel();
    }
}

impl<R> Stream for PartialResultStream<R> {
    type Item = Result<PartialResult<R>, Error>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut TaskContext<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        if this.state.is_terminal() {
            return Poll::Ready(None);
        }
        if let Some(error) = this.failure.take() {
            this.finish(OperationState::Failed);
            return Poll::Ready(Some(Err(error)));
        }
        if this.cancel.is_cancelled() {
            this.finish(OperationState::Cancelled);
            return Poll::Ready(None);
        }
        if let Some(launch) = this.launch.take() {
            this.rx = Some(launch());
            this.state = OperationState::Dispatched;
        }
        let Some(rx) = this.rx.as_mut() else {
            this.finish(OperationState::Complete);
            return Poll::Ready(None);
        };

        match rx.poll_recv(cx) {
            Poll::Pending => Poll::Pending,
            Poll::Ready(None) => {
                if this.cancel.is_cancelled() {
                    this.finish(OperationState::Cancelled);
                } else {
                    debug!("dataset operation complete");
                    this.finish(OperationState::Complete);
                }
                Poll::Ready(None)
            }
            Poll::Ready(Some(message)) => match message.item {
                Ok(item) => {
                    this.state = OperationState::Combining;
                    Poll::Ready(Some(Ok(item)))
                }
                Err(error) if error.kind() == ErrorKind::Cancelled => {
                    this.finish(OperationState::Cancelled);
                    Poll::Ready(None)
                }
                Err(error) => {
                    debug!(error = %error, "dataset operation failed");
                    this.finish(OperationState::Failed);
                    Poll::Ready(Some(Err(error)))
                }
            },
        }
    }
}

impl<R> Drop for PartialResultStream<R> {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

impl<R> fmt::Debug for PartialResultStream<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PartialResultStream")
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}
