//! State module for tracking crawl progress
//!
//! # Components
//!
//! - `TaskStatus`: lifecycle of a single crawl task (not started, in progress, completed, failed)

mod task_status;

pub use task_status::TaskStatus;
