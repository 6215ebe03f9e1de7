//! Reading and writing structural file formats.
//!
//! Writers consume per-residue atom14 frames plus the one-letter sequence and
//! produce fixed-column text; readers parse atom records back for inspection.

pub mod pdb;
pub mod traits;
