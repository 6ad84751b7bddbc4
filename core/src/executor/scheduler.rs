use std::future::Future;

use futures::future::BoxFuture;
use futures::stream::FuturesUnordered;
use futures::{FutureExt, StreamExt};

/// Bounded set of in-flight stage futures for one wave.
///
/// The caller pushes only while [`has_capacity`](Self::has_capacity) holds
/// and pulls completions one at a time, so every completion is handled by
/// the single control path that owns the run.
pub(crate) struct WaveDispatcher<T> {
    limit: usize,
    in_flight: FuturesUnordered<BoxFuture<'static, T>>,
}

impl<T: Send + 'static> WaveDispatcher<T> {
    pub fn new(limit: usize) -> Self {
        Self {
            limit: limit.max(1),
            in_flight: FuturesUnordered::new(),
        }
    }

    pub fn has_capacity(&self) -> bool {
        self.in_flight.len() < self.limit
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }

    pub fn push<F>(&mut self, fut: F)
    where
        F: Future<Output = T> + Send + 'static,
    {
        debug_assert!(self.has_capacity(), "worker limit exceeded");
        self.in_flight.push(fut.boxed());
    }

    /// Next completion, or `None` once nothing is in flight.
    pub async fn next(&mut self) -> Option<T> {
        self.in_flight.next().await
    }
}
