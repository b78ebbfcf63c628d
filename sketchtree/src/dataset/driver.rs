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

//! Reduction of a dataset tree on the tokio runtime.
//!
//! Every parallel node is a spawned task owning a bounded channel its children report to.
//! Leaves run their job on the blocking pool and report once. A parallel node drains
//! whatever its children have buffered, folds the batch with a [`Reducer`] and forwards a
//! single partial result whose done fraction is scaled by the number of children. The last
//! report of a node tops its done fractions up to exactly 1.

use std::marker::PhantomData;
use std::sync::Arc;

use futures::FutureExt;
use futures::future::BoxFuture;
use tokio::sync::Semaphore;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::trace;
use tracing::warn;

use super::Dataset;
use crate::error::Error;
use crate::error::ErrorKind;
use crate::monoid::Monoid;
use crate::partial::PartialResult;

/// A report of child `index` to its parent; `finished` marks the child's last report.
pub(crate) struct Message<R> {
    pub index: usize,
    pub item: Result<PartialResult<R>, Error>,
    pub finished: bool,
}

/// How a parallel node folds the values its children report.
pub(crate) trait Reducer<R>: Send + Sync + 'static {
    type Slots: Send;

    /// State for a node with `children` children.
    fn start(&self, children: usize) -> Self::Slots;

    /// Folds one report of child `index`.
    fn absorb(&self, slots: &mut Self::Slots, index: usize, value: R) -> Result<(), Error>;

    /// Value to forward for the reports absorbed since the previous call.
    fn emit(&self, slots: &mut Self::Slots) -> R;

    /// Value of a node without children.
    fn empty(&self) -> R;
}

/// Folds each batch with a monoid.
pub(crate) struct MonoidReducer<M>(pub Arc<M>);

impl<M: Monoid + 'static> Reducer<M::Value> for MonoidReducer<M> {
    type Slots = Option<M::Value>;

    fn start(&self, _children: usize) -> Self::Slots {
        None
    }

    fn absorb(&self, slots: &mut Self::Slots, _index: usize, value: M::Value) -> Result<(), Error> {
        *slots = Some(match slots.take() {
            None => value,
            Some(acc) => self.0.add(&acc, &value)?,
        });
        Ok(())
    }

    fn emit(&self, slots: &mut Self::Slots) -> M::Value {
        slots.take().unwrap_or_else(|| self.0.zero())
    }

    fn empty(&self) -> M::Value {
        self.0.zero()
    }
}

/// Rebuilds a parallel node from the final datasets of its children, in child order.
pub(crate) struct RebuildReducer<S: ?Sized>(PhantomData<fn() -> Arc<S>>);

impl<S: ?Sized> RebuildReducer<S> {
    pub fn new() -> Self {
        Self(PhantomData)
    }
}

pub(crate) struct RebuildSlots<S: ?Sized> {
    children: Vec<Option<Dataset<S>>>,
    filled: usize,
}

impl<S: ?Sized + Send + Sync + 'static> Reducer<Option<Dataset<S>>> for RebuildReducer<S> {
    type Slots = RebuildSlots<S>;

    fn start(&self, children: usize) -> Self::Slots {
        RebuildSlots {
            children: (0..children).map(|_| None).collect(),
            filled: 0,
        }
    }

    fn absorb(
        &self,
        slots: &mut Self::Slots,
        index: usize,
        value: Option<Dataset<S>>,
    ) -> Result<(), Error> {
        if let Some(dataset) = value {
            debug_assert!(slots.children[index].is_none(), "child {index} reported twice");
            slots.children[index] = Some(dataset);
            slots.filled += 1;
        }
        Ok(())
    }

    fn emit(&self, slots: &mut Self::Slots) -> Option<Dataset<S>> {
        if slots.children.is_empty() || slots.filled < slots.children.len() {
            return None;
        }
        slots.filled = 0;
        let children = std::mem::take(&mut slots.children);
        Some(Dataset::Parallel(children.into_iter().flatten().collect()))
    }

    fn empty(&self) -> Option<Dataset<S>> {
        Some(Dataset::Parallel(vec![]))
    }
}

/// Everything a node task needs, shared by all nodes of one operation.
///
/// `cancel` fires when the subscriber goes away and stops every task. `leaves` is a child
/// of it that also fires when a leaf fails, which stops the remaining leaf jobs while
/// the failure still travels up to the root.
pub(crate) struct Context<J, D> {
    pub job: J,
    pub reducer: D,
    pub cancel: CancellationToken,
    pub leaves: CancellationToken,
    pub permits: Option<Arc<Semaphore>>,
    pub capacity: usize,
}

/// Where a node reports: its parent's channel, under its index among the siblings.
pub(crate) struct Sink<R> {
    pub tx: mpsc::Sender<Message<R>>,
    pub index: usize,
}

impl<R> Sink<R> {
    /// Delivers `item` unless the operation is cancelled or the parent has gone away.
    async fn send(
        &self,
        item: Result<PartialResult<R>, Error>,
        finished: bool,
        cancel: &CancellationToken,
    ) {
        let message = Message {
            index: self.index,
            item,
            finished,
        };
        tokio::select! {
            _ = cancel.cancelled() => {}
            _ = self.tx.send(message) => {}
        }
    }
}

/// Runs the subtree `node`, reporting to `sink`.
pub(crate) fn run_node<T, R, J, D>(
    node: Dataset<T>,
    ctx: Arc<Context<J, D>>,
    sink: Sink<R>,
) -> BoxFuture<'static, ()>
where
    T: ?Sized + Send + Sync + 'static,
    R: Send + 'static,
    J: Fn(&Arc<T>, &CancellationToken) -> Result<R, Error> + Send + Sync + 'static,
    D: Reducer<R>,
{
    async move {
        match node {
            Dataset::Leaf(leaf) => run_leaf(leaf, ctx, sink).await,
            Dataset::Parallel(children) => run_parallel(children, ctx, sink).await,
        }
    }
    .boxed()
}

async fn run_leaf<T, R, J, D>(leaf: Arc<T>, ctx: Arc<Context<J, D>>, sink: Sink<R>)
where
    T: ?Sized + Send + Sync + 'static,
    R: Send + 'static,
    J: Fn(&Arc<T>, &CancellationToken) -> Result<R, Error> + Send + Sync + 'static,
    D: Reducer<R>,
{
    let permit = match &ctx.permits {
        Some(permits) => tokio::select! {
            _ = ctx.leaves.cancelled() => return,
            permit = permits.clone().acquire_owned() => match permit {
                Ok(permit) => Some(permit),
                Err(_) => return,
            },
        },
        None => None,
    };
    if ctx.leaves.is_cancelled() {
        return;
    }

    let job_ctx = ctx.clone();
    let joined = tokio::task::spawn_blocking(move || (job_ctx.job)(&leaf, &job_ctx.leaves)).await;
    drop(permit);

    let outcome = match joined {
        Ok(outcome) => outcome,
        Err(panic) => Err(Error::new(ErrorKind::LeafFailure, "leaf task did not complete")
            .set_source(panic)),
    };
    match outcome {
        Ok(value) => {
            trace!(index = sink.index, "leaf complete");
            sink.send(Ok(PartialResult::new(1.0, value)), true, &ctx.cancel)
                .await;
        }
        Err(err) if err.kind() == ErrorKind::Cancelled => {
            trace!(index = sink.index, "leaf cancelled");
        }
        Err(err) => {
            let err = if err.kind() == ErrorKind::LeafFailure {
                err
            } else {
                Error::new(ErrorKind::LeafFailure, "leaf computation failed").set_source(err)
            };
            warn!(index = sink.index, error = %err, "leaf failed");
            ctx.leaves.cancel();
            sink.send(Err(err), true, &ctx.cancel).await;
        }
    }
}

async fn run_parallel<T, R, J, D>(children: Vec<Dataset<T>>, ctx: Arc<Context<J, D>>, sink: Sink<R>)
where
    T: ?Sized + Send + Sync + 'static,
    R: Send + 'static,
    J: Fn(&Arc<T>, &CancellationToken) -> Result<R, Error> + Send + Sync + 'static,
    D: Reducer<R>,
{
    let count = children.len();
    if count == 0 {
        let item = PartialResult::new(1.0, ctx.reducer.empty());
        sink.send(Ok(item), true, &ctx.cancel).await;
        return;
    }

    let (tx, mut rx) = mpsc::channel(ctx.capacity);
    for (index, child) in children.into_iter().enumerate() {
        let sink = Sink {
            tx: tx.clone(),
            index,
        };
        tokio::spawn(run_node(child, ctx.clone(), sink));
    }
    drop(tx);

    let mut slots = ctx.reducer.start(count);
    let mut finished = 0;
    let mut reported = 0.0;
    loop {
        let first = tokio::select! {
            _ = ctx.cancel.cancelled() => return,
            message = rx.recv() => message,
        };
        let Some(first) = first else {
            return;
        };

        let mut batch = vec![first];
        while let Ok(message) = rx.try_recv() {
            batch.push(message);
        }
        let batch_len = batch.len();
        match absorb_batch(&ctx.reducer, &mut slots, batch) {
            Ok((done, newly_finished)) => {
                finished += newly_finished;
                let last = finished == count;
                let value = ctx.reducer.emit(&mut slots);
                trace!(index = sink.index, children = count, batch = batch_len, last, "combined");
                // 1 - reported makes the parent's running sum land on exactly 1
                let delta = if last {
                    1.0 - reported
                } else {
                    done / count as f64
                };
                reported += delta;
                sink.send(Ok(PartialResult::new(delta, value)), last, &ctx.cancel)
                    .await;
            }
            Err(err) => {
                ctx.leaves.cancel();
                sink.send(Err(err), true, &ctx.cancel).await;
                return;
            }
        }
    }
}

/// Folds a batch of child reports, returning the sum of their done fractions and the
/// number of children that sent their last report.
fn absorb_batch<R, D: Reducer<R>>(
    reducer: &D,
    slots: &mut D::Slots,
    batch: Vec<Message<R>>,
) -> Result<(f64, usize), Error> {
    let mut done = 0.0;
    let mut finished = 0;
    for message in batch {
        let (delta_done, value) = message.item?.into_parts();
        reducer.absorb(slots, message.index, value)?;
        done += delta_done;
        finished += usize::from(message.finished);
    }
    Ok((done, finished))
}
