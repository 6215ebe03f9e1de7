use crate::core::models::frame::ResidueFrame;
use std::error::Error;
use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::Path;

/// Defines the interface for reading and writing structural file formats.
///
/// Writers take per-residue atom frames together with the one-letter sequence
/// those frames belong to. Readers return the flat list of atom records the
/// format stores.
pub trait StructureFile {
    /// Format-specific options applied while writing (chain id, remarks, ...).
    type Metadata: Default;

    /// One parsed atom record.
    type Record;

    /// The error type for I/O operations.
    type Error: Error + From<io::Error>;

    /// Reads every atom record from a buffered reader.
    ///
    /// # Errors
    ///
    /// Returns an error if parsing fails or I/O operations encounter issues.
    fn read_from(reader: &mut impl BufRead) -> Result<Vec<Self::Record>, Self::Error>;

    /// Writes frames and metadata to a writer.
    ///
    /// # Arguments
    ///
    /// * `frames` - One frame per residue.
    /// * `sequence` - One-letter code per residue, same length as `frames`.
    /// * `metadata` - Format options.
    /// * `writer` - The writer to output to.
    ///
    /// # Errors
    ///
    /// Returns an error if the inputs disagree or writing fails.
    fn write_to(
        frames: &[ResidueFrame],
        sequence: &str,
        metadata: &Self::Metadata,
        writer: &mut impl Write,
    ) -> Result<(), Self::Error>;

    /// Writes frames with default metadata.
    fn write_structure_to(
        frames: &[ResidueFrame],
        sequence: &str,
        writer: &mut impl Write,
    ) -> Result<(), Self::Error> {
        Self::write_to(frames, sequence, &Self::Metadata::default(), writer)
    }

    fn read_from_path<P: AsRef<Path>>(path: P) -> Result<Vec<Self::Record>, Self::Error> {
        let file = File::open(path)?;
        let mut reader = BufReader::new(file);
        Self::read_from(&mut reader)
    }

    /// Writes frames and metadata to a file, creating or truncating it.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be created, writing fails, or the
    /// buffered output cannot be flushed.
    fn write_to_path<P: AsRef<Path>>(
        frames: &[ResidueFrame],
        sequence: &str,
        metadata: &Self::Metadata,
        path: P,
    ) -> Result<(), Self::Error> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);
        Self::write_to(frames, sequence, metadata, &mut writer)?;
        writer.flush()?;
        Ok(())
    }

    fn write_structure_to_path<P: AsRef<Path>>(
        frames: &[ResidueFrame],
        sequence: &str,
        path: P,
    ) -> Result<(), Self::Error> {
        Self::write_to_path(frames, sequence, &Self::Metadata::default(), path)
    }
}
