//! Repository layer
//!
//! Repositories are stateless clients that abstract communication with the
//! tracking service. They provide simple, focused interfaces without any
//! business logic.
//!
//! All repositories are trait-based to enable testing and mocking.

mod jobs;

// Re-export traits
pub use jobs::JobRepository;

// Re-export implementations
pub use jobs::GraphqlJobRepository;
