//! Output stage: batched embedding with retry, then batched upload

pub mod retry;
pub mod sink;

pub use retry::{classify, RetryPolicy, Retryability};
pub use sink::{skip_leading, OutputSink, SinkReport};
