//! Memeforge render worker.
//!
//! The worker consumes render jobs from a message broker, composites text
//! layers onto a fetched template image, publishes the encoded artifact to
//! object storage, and records each task's terminal status in the shared
//! status store. The HTTP intake API and template catalog live elsewhere;
//! this crate only speaks their persistence and wire contracts.

pub mod application;
pub mod config;
pub mod domain;
pub mod infra;
