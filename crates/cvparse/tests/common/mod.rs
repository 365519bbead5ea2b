//! Shared test utilities for cvparse integration tests.
//!
//! This module provides:
//! - builders for synthetic résumé text, DOCX fixtures and configs
//! - fake processors, admission checks and sinks for driving the job queue

pub mod builders;
pub mod fakes;

pub use builders::*;
pub use fakes::*;
