//! # Engine Module
//!
//! The stateful layer between the pure data models in [`crate::core`] and the
//! job workflow in [`crate::workflows`].
//!
//! ## Architecture
//!
//! - **Configuration** ([`config`]) - Sequence bounds, model identity and output locations
//! - **Model Ownership** ([`predictor`]) - The predictor contract and the process-wide `ModelHandle`
//! - **Job Persistence** ([`store`]) - The on-disk job registry and its live-job cache
//! - **Progress Monitoring** ([`progress`]) - Progress reporting for front ends
//! - **Error Handling** ([`error`]) - Engine-specific error types and error propagation
//!
//! Nothing in this layer spawns threads; callers decide where blocking work runs.

pub mod config;
pub mod error;
pub mod predictor;
pub mod progress;
pub mod store;
