//! Core domain types
//!
//! This module contains the core domain structures used across the crawler.
//! They are independent of the transport that produced them (client) and of
//! the on-disk store that consumes them (runner).

pub mod job;
pub mod log;
pub mod timestamp;
