//! Shared HTTP client with a swappable request path.

mod executor;
mod gate;
mod transport;

pub use executor::{Outcome, Request, RequestExecutor, Response};
pub use gate::{GatedExecutor, InterceptionScope};
pub use transport::HttpExecutor;

use std::sync::Arc;

use parking_lot::RwLock;

use crate::error::Result;

/// The ambient shared client.
///
/// All requests route through the executor currently installed in the slot.
/// The slot is the interception point: a scope activation swaps in a gated
/// executor wrapping the previous occupant and swaps it back out on exit.
pub struct SharedClient {
    executor: RwLock<Arc<dyn RequestExecutor>>,
}

impl SharedClient {
    /// Create a client issuing requests through the given executor.
    pub fn new(executor: Arc<dyn RequestExecutor>) -> Self {
        Self {
            executor: RwLock::new(executor),
        }
    }

    /// Issue a request through the currently installed executor.
    pub async fn request(&self, request: Request) -> Result<Outcome> {
        // Snapshot the executor so the lock never spans the transport call.
        let executor = Arc::clone(&*self.executor.read());
        executor.execute(request).await
    }

    /// Issue a GET request for `url`.
    pub async fn get(&self, url: &str) -> Result<Outcome> {
        let request = http::Request::builder()
            .method(http::Method::GET)
            .uri(url)
            .body(Vec::new())?;
        self.request(request).await
    }

    /// Swap the installed executor for one derived from it, returning the
    /// previous occupant. The derivation runs under the write lock so no
    /// request can slip between reading the old executor and installing the
    /// new one.
    pub(crate) fn swap(
        &self,
        derive: impl FnOnce(Arc<dyn RequestExecutor>) -> Arc<dyn RequestExecutor>,
    ) -> Arc<dyn RequestExecutor> {
        let mut slot = self.executor.write();
        let previous = Arc::clone(&*slot);
        *slot = derive(Arc::clone(&previous));
        previous
    }

    /// Reinstate a previously saved executor.
    pub(crate) fn restore(&self, executor: Arc<dyn RequestExecutor>) {
        *self.executor.write() = executor;
    }

    #[cfg(test)]
    pub(crate) fn current_executor(&self) -> Arc<dyn RequestExecutor> {
        Arc::clone(&*self.executor.read())
    }
}
