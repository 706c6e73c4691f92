//! Executors for filesystem work: tokio for the binary, inline for tests.

mod async_runtime;
mod inline;

pub use async_runtime::AsyncRuntime;
pub use inline::InlineExecutor;
