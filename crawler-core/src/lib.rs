//! Crawler Core
//!
//! Core types shared by the run log crawler crates.
//!
//! This crate contains:
//! - Domain types: runs being crawled, their log lines, timestamp handling
//! - DTOs: wire shapes of the tracking service's GraphQL responses

pub mod domain;
pub mod dto;

pub use domain::timestamp::TimestampError;
