//! Scheduler layer for the crawler
//!
//! This layer drives the polling loop: list running jobs, merge their logs,
//! sleep, repeat.

pub mod poller;

pub use poller::LogPoller;
