use std::future::Future;

pub mod agent;
pub mod aws;
pub mod http;
pub mod mongo;
pub mod notify;
pub mod queue;
pub mod store;
pub mod workflow;

/// Drives an async SDK call to completion from a synchronous adapter method.
///
/// Requires the multi-threaded Tokio runtime the Lambda binaries start.
pub(crate) fn block_on<F: Future>(future: F) -> F::Output {
    tokio::task::block_in_place(|| tokio::runtime::Handle::current().block_on(future))
}
