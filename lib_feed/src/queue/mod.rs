//! # Work Queues
//!
//! The only channel from request-time code to the worker: de-duplicated
//! signals for reactive refreshes and plain FIFO queues for background jobs.

pub mod jobs;
pub mod signals;

pub use jobs::{
    Job, JobError, JobQueue, SavedThreadJob, SearchPersistJob, SummaryJob, SAVED_THREAD_QUEUE,
    SEARCH_PERSIST_QUEUE, SUMMARY_QUEUE,
};
pub use signals::{SignalQueue, SignalTopic};
