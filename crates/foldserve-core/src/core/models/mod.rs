//! Data models shared by every layer: validated sequences, per-residue atom
//! frames, and job records with their state machine.

pub mod frame;
pub mod job;
pub mod sequence;
