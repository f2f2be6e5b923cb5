//! Domain types for the poster generation pipeline.
//!
//! This crate holds the pure data model — job and queue-item records,
//! status transitions, prompt construction, and the durable-store key
//! namespace. It has no I/O; everything here is exercised by the
//! `posterlab-queue` worker and the operator API.

pub mod error;
pub mod job;
pub mod keys;
pub mod prompt;
pub mod queue_item;
pub mod types;
