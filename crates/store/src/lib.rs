//! Task persistence for toolclaw.
//!
//! A [`TaskStore`] owns the append-only message history of every task and
//! writes each change through a [`TaskSink`].

pub mod manager;
pub mod sink;

pub use manager::TaskStore;
pub use sink::{InMemorySink, JsonFileSink, TaskSink};
