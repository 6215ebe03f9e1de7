use crate::core::utils::identifiers::is_canonical_residue;
use std::fmt;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SequenceError {
    #[error("Invalid residue '{residue}' at position {position} (allowed: ACDEFGHIKLMNPQRSTVWY)")]
    InvalidResidue { residue: char, position: usize },

    #[error("Sequence length {length} is outside the allowed range [{min}, {max}]")]
    LengthOutOfRange {
        length: usize,
        min: usize,
        max: usize,
    },
}

/// Inclusive bounds on the normalized length of a sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SequenceLimits {
    pub min_length: usize,
    pub max_length: usize,
}

impl SequenceLimits {
    /// Bounds enforced on every submission, independent of the loaded model.
    pub const SUBMISSION: Self = Self::new(10, 1000);

    pub const fn new(min_length: usize, max_length: usize) -> Self {
        Self {
            min_length,
            max_length,
        }
    }

    /// Combines two sets of bounds; the tighter bound on each side wins.
    pub fn intersect(self, other: Self) -> Self {
        Self {
            min_length: self.min_length.max(other.min_length),
            max_length: self.max_length.min(other.max_length),
        }
    }

    pub fn contains(&self, length: usize) -> bool {
        (self.min_length..=self.max_length).contains(&length)
    }
}

impl Default for SequenceLimits {
    fn default() -> Self {
        Self::new(10, 600)
    }
}

/// A validated, normalized amino-acid sequence (upper-case, no whitespace).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Sequence(String);

impl Sequence {
    /// Upper-cases the input, strips all whitespace, then checks alphabet and length.
    pub fn parse(raw: &str, limits: &SequenceLimits) -> Result<Self, SequenceError> {
        let normalized: String = raw
            .chars()
            .filter(|c| !c.is_whitespace())
            .map(|c| c.to_ascii_uppercase())
            .collect();

        if let Some((idx, residue)) = normalized
            .chars()
            .enumerate()
            .find(|(_, c)| !is_canonical_residue(*c))
        {
            return Err(SequenceError::InvalidResidue {
                residue,
                position: idx + 1,
            });
        }

        let length = normalized.len();
        if !limits.contains(length) {
            return Err(SequenceError::LengthOutOfRange {
                length,
                min: limits.min_length,
                max: limits.max_length,
            });
        }

        Ok(Self(normalized))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn residues(&self) -> impl Iterator<Item = char> + '_ {
        self.0.chars()
    }
}

impl AsRef<str> for Sequence {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Sequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
