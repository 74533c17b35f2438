//! Windowed fan-out for schema discovery
//!
//! Sampling attributes for N types or connections for N edge types issues
//! N queries; at most `window_size` of them are in flight at once.

use futures::stream::{self, StreamExt, TryStreamExt};
use graphlens_config::BatchConfig;
use std::future::Future;

#[derive(Debug, Clone, Copy)]
pub struct BatchRunner {
    window_size: usize,
}

impl BatchRunner {
    /// A window of zero is treated as one
    pub fn new(window_size: usize) -> Self {
        Self {
            window_size: window_size.max(1),
        }
    }

    pub fn from_config(config: &BatchConfig) -> Self {
        Self::new(config.window_size)
    }

    pub fn window_size(&self) -> usize {
        self.window_size
    }

    /// Run every task, returning outputs in input order
    pub async fn run<I, F, Fut>(&self, items: I, task: F) -> Vec<Fut::Output>
    where
        I: IntoIterator,
        F: FnMut(I::Item) -> Fut,
        Fut: Future,
    {
        stream::iter(items)
            .map(task)
            .buffered(self.window_size)
            .collect()
            .await
    }

    /// Run fallible tasks in input order, stopping at the first error
    pub async fn try_run<I, F, Fut, T, E>(&self, items: I, task: F) -> Result<Vec<T>, E>
    where
        I: IntoIterator,
        F: FnMut(I::Item) -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        stream::iter(items)
            .map(task)
            .buffered(self.window_size)
            .try_collect()
            .await
    }
}

impl Default for BatchRunner {
    fn default() -> Self {
        Self::from_config(&BatchConfig::default())
    }
}
