//! # Core Module
//!
//! Stateless building blocks of foldserve.
//!
//! - **Models** ([`models`]) - sequences, atom14 residue frames, jobs and step results
//! - **File I/O** ([`io`]) - the PDB writer/reader behind the [`io::traits::StructureFile`] seam
//! - **Identifiers** ([`utils`]) - residue codes and per-residue atom14 name tables

pub mod io;
pub mod models;
pub mod utils;
