//! # foldserve Core Library
//!
//! Job orchestration for serving a protein structure-prediction model: sequence
//! validation, a single shared model instance, per-recycle PDB output and an
//! on-disk job registry.
//!
//! ## Architectural Philosophy
//!
//! The library keeps the same three layers throughout:
//!
//! - **[`core`]: The Foundation.** Stateless data models (`Sequence`, `ResidueFrame`,
//!   `Job`), the atom14 residue tables and the PDB codec.
//!
//! - **[`engine`]: The Logic Core.** The stateful pieces: configuration, the
//!   `ModelHandle` that serializes access to the predictor, and the `JobStore`
//!   that persists every job under the data directory.
//!
//! - **[`workflows`]: The Public API.** `FoldService` submits jobs, runs the
//!   inference pipeline and answers status queries.

pub mod core;
pub mod engine;
pub mod workflows;
