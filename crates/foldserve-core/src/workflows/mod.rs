//! # Workflows Module
//!
//! High-level entry points that tie the [`crate::engine`] and [`crate::core`]
//! layers together into complete procedures.
//!
//! - **Fold Workflow** ([`fold`]) - Sequence submission, the blocking per-job
//!   inference pipeline and status lookup.
//! - **Bench Workflow** ([`bench`]) - Inference timing across sequence lengths.
//!
//! Workflows are synchronous. The hosting runtime decides where a job runs:
//! the HTTP server hands each one to a blocking worker, the one-shot command
//! runs it inline.

pub mod bench;
pub mod fold;
