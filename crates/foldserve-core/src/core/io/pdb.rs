use crate::core::io::traits::StructureFile;
use crate::core::models::frame::ResidueFrame;
use crate::core::utils::identifiers::{atom14_name, element_symbol, three_letter_code};
use nalgebra::Point3;
use std::io::{self, BufRead, Write};
use thiserror::Error;
use tracing::trace;

const OCCUPANCY: f64 = 1.0;
const MIN_ATOM_LINE_LEN: usize = 54;

#[derive(Debug, Clone, PartialEq)]
pub struct PdbMetadata {
    pub chain_id: char,
    /// Emitted verbatim as `REMARK` lines before the first atom.
    pub remarks: Vec<String>,
    /// One temperature factor per residue; `0.00` for every atom when absent.
    pub b_factors: Option<Vec<f64>>,
}

impl Default for PdbMetadata {
    fn default() -> Self {
        Self {
            chain_id: 'A',
            remarks: Vec::new(),
            b_factors: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PdbAtomRecord {
    pub serial: usize,
    pub name: String,
    pub residue_name: String,
    pub chain_id: char,
    pub residue_number: isize,
    pub position: Point3<f64>,
    pub occupancy: f64,
    pub b_factor: f64,
    pub element: String,
}

#[derive(Debug, Error)]
pub enum PdbError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("Parse error on line {line}: {kind}")]
    Parse {
        line: usize,
        kind: PdbParseErrorKind,
    },
    #[error("Inconsistent data: {0}")]
    Inconsistency(String),
}

#[derive(Debug, Error)]
pub enum PdbParseErrorKind {
    #[error("Invalid integer format in columns {columns} (value: '{value}')")]
    InvalidInt { columns: String, value: String },
    #[error("Invalid float format in columns {columns} (value: '{value}')")]
    InvalidFloat { columns: String, value: String },
    #[error("Required field in columns {columns} is empty")]
    MissingRequiredField { columns: String },
    #[error("Line is too short for ATOM/HETATM record (must be at least 54 chars)")]
    LineTooShort,
}

/// Columns past the end of a short line read as blank.
fn slice_and_trim(line: &str, start: usize, end: usize) -> &str {
    line.get(start..end.min(line.len())).unwrap_or("").trim()
}

fn parse_float(line: &str, line_num: usize, start: usize, end: usize) -> Result<f64, PdbError> {
    let raw = slice_and_trim(line, start, end);
    raw.parse().map_err(|_| PdbError::Parse {
        line: line_num,
        kind: PdbParseErrorKind::InvalidFloat {
            columns: format!("{}-{}", start + 1, end),
            value: raw.into(),
        },
    })
}

fn parse_optional_float(
    line: &str,
    line_num: usize,
    start: usize,
    end: usize,
    default: f64,
) -> Result<f64, PdbError> {
    if slice_and_trim(line, start, end).is_empty() {
        Ok(default)
    } else {
        parse_float(line, line_num, start, end)
    }
}

/// Atom names shorter than four characters start in column 14.
fn padded_atom_name(name: &str) -> String {
    if name.len() < 4 {
        format!(" {:<3}", name)
    } else {
        name.to_string()
    }
}

fn format_atom_record(
    serial: usize,
    atom_name: &str,
    residue_name: &str,
    chain_id: char,
    residue_number: usize,
    position: &Point3<f64>,
    b_factor: f64,
) -> String {
    format!(
        "ATOM  {:>5} {:<4}{:1}{:>3} {:1}{:>4}{:1}   {:>8.3}{:>8.3}{:>8.3}{:>6.2}{:>6.2}          {:>2}{:2}",
        serial,
        padded_atom_name(atom_name),
        ' ',
        residue_name,
        chain_id,
        residue_number,
        ' ',
        position.x,
        position.y,
        position.z,
        OCCUPANCY,
        b_factor,
        element_symbol(atom_name),
        ""
    )
}

pub struct PdbFile;

impl StructureFile for PdbFile {
    type Metadata = PdbMetadata;
    type Record = PdbAtomRecord;
    type Error = PdbError;

    fn read_from(reader: &mut impl BufRead) -> Result<Vec<Self::Record>, Self::Error> {
        let mut records = Vec::new();

        for (line_num, line_res) in reader.lines().enumerate() {
            let line = line_res?;
            let line_num = line_num + 1;

            match slice_and_trim(&line, 0, 6) {
                "ATOM" | "HETATM" => {
                    if line.len() < MIN_ATOM_LINE_LEN {
                        return Err(PdbError::Parse {
                            line: line_num,
                            kind: PdbParseErrorKind::LineTooShort,
                        });
                    }

                    let serial_str = slice_and_trim(&line, 6, 11);
                    let serial: usize = serial_str.parse().map_err(|_| PdbError::Parse {
                        line: line_num,
                        kind: PdbParseErrorKind::InvalidInt {
                            columns: "7-11".into(),
                            value: serial_str.into(),
                        },
                    })?;

                    let name = slice_and_trim(&line, 12, 16);
                    if name.is_empty() {
                        return Err(PdbError::Parse {
                            line: line_num,
                            kind: PdbParseErrorKind::MissingRequiredField {
                                columns: "13-16".into(),
                            },
                        });
                    }

                    let res_seq_str = slice_and_trim(&line, 22, 26);
                    let residue_number: isize =
                        res_seq_str.parse().map_err(|_| PdbError::Parse {
                            line: line_num,
                            kind: PdbParseErrorKind::InvalidInt {
                                columns: "23-26".into(),
                                value: res_seq_str.into(),
                            },
                        })?;

                    let x = parse_float(&line, line_num, 30, 38)?;
                    let y = parse_float(&line, line_num, 38, 46)?;
                    let z = parse_float(&line, line_num, 46, 54)?;
                    let occupancy = parse_optional_float(&line, line_num, 54, 60, OCCUPANCY)?;
                    let b_factor = parse_optional_float(&line, line_num, 60, 66, 0.0)?;

                    let element = match slice_and_trim(&line, 76, 78) {
                        "" => element_symbol(name).to_string(),
                        symbol => symbol.to_string(),
                    };

                    records.push(PdbAtomRecord {
                        serial,
                        name: name.to_string(),
                        residue_name: slice_and_trim(&line, 17, 20).to_string(),
                        chain_id: slice_and_trim(&line, 21, 22).chars().next().unwrap_or('A'),
                        residue_number,
                        position: Point3::new(x, y, z),
                        occupancy,
                        b_factor,
                        element,
                    });
                }
                "END" => break,
                _ => {}
            }
        }

        Ok(records)
    }

    fn write_to(
        frames: &[ResidueFrame],
        sequence: &str,
        metadata: &Self::Metadata,
        writer: &mut impl Write,
    ) -> Result<(), Self::Error> {
        let residues: Vec<char> = sequence.chars().collect();
        if residues.len() != frames.len() {
            return Err(PdbError::Inconsistency(format!(
                "{} residue frames but sequence has {} residues",
                frames.len(),
                residues.len()
            )));
        }
        if let Some(b_factors) = &metadata.b_factors {
            if b_factors.len() != frames.len() {
                return Err(PdbError::Inconsistency(format!(
                    "{} B-factors supplied for {} residues",
                    b_factors.len(),
                    frames.len()
                )));
            }
        }

        for remark in &metadata.remarks {
            writeln!(writer, "REMARK {}", remark)?;
        }

        let chain_id = metadata.chain_id;
        let mut serial = 0usize;
        let mut last_residue = None;

        for (index, (frame, &letter)) in frames.iter().zip(&residues).enumerate() {
            let residue_name = three_letter_code(letter);
            let residue_number = index + 1;
            let b_factor = metadata.b_factors.as_ref().map_or(0.0, |b| b[index]);

            for (slot, position) in frame.present_atoms() {
                let Some(atom_name) = atom14_name(residue_name, slot) else {
                    trace!(
                        "Skipping slot {} of {} {}: no atom name for this residue type",
                        slot, residue_name, residue_number
                    );
                    continue;
                };
                serial += 1;
                writeln!(
                    writer,
                    "{}",
                    format_atom_record(
                        serial,
                        atom_name,
                        residue_name,
                        chain_id,
                        residue_number,
                        position,
                        b_factor,
                    )
                )?;
            }
            last_residue = Some((residue_name, residue_number));
        }

        if let Some((residue_name, residue_number)) = last_residue {
            writeln!(
                writer,
                "TER   {:>5}      {:>3} {:1}{:>4}",
                serial + 1,
                residue_name,
                chain_id,
                residue_number
            )?;
        }
        writeln!(writer, "END")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn frame(coords: &[[f64; 3]]) -> ResidueFrame {
        ResidueFrame::from_slots(coords).unwrap()
    }

    fn write_to_string(frames: &[ResidueFrame], sequence: &str, metadata: &PdbMetadata) -> String {
        let mut buf = Vec::new();
        PdbFile::write_to(frames, sequence, metadata, &mut buf).unwrap();
        String::from_utf8(buf).unwrap()
    }

    fn read_back(text: &str) -> Vec<PdbAtomRecord> {
        PdbFile::read_from(&mut Cursor::new(text.as_bytes())).unwrap()
    }

    fn sample_frames() -> Vec<ResidueFrame> {
        vec![
            // ALA: backbone + CB
            frame(&[
                [1.0, 2.0, 3.0],
                [2.458, 2.0, 3.0],
                [3.009, 3.420, 3.0],
                [2.261, 4.400, 3.0],
                [2.950, 1.220, 1.783],
            ]),
            // GLY: slot 4 is populated but glycine has no CB
            frame(&[
                [4.3, 3.5, 3.1],
                [4.9, 4.8, 3.2],
                [6.4, 4.7, 3.3],
                [7.0, 3.6, 3.4],
                [9.9, 9.9, 9.9],
            ]),
            // LYS: CA absent, NZ present
            frame(&[
                [7.0, 5.8, 3.4],
                [0.0, 0.0, 0.0],
                [9.9, 5.9, 3.6],
                [10.5, 4.9, 3.7],
                [8.4, 7.3, 4.6],
                [8.9, 8.7, 4.9],
                [9.3, 9.0, 6.3],
                [9.9, 10.4, 6.6],
                [-10.2, -10.7, -8.012],
            ]),
        ]
    }

    #[test]
    fn atom_record_matches_fixed_columns() {
        let frames = vec![frame(&[[1.0, 2.0, 3.0]])];
        let text = write_to_string(&frames, "A", &PdbMetadata::default());
        let first = text.lines().next().unwrap();
        assert_eq!(
            first,
            "ATOM      1  N   ALA A   1       1.000   2.000   3.000  1.00  0.00           N  "
        );
        assert_eq!(first.len(), 80);
    }

    #[test]
    fn short_atom_names_are_shifted_into_column_fourteen() {
        let mut coords = vec![[1.0, 1.0, 1.0]; 14];
        coords[13] = [5.0, 5.0, 5.0];
        let text = write_to_string(&[frame(&coords)], "W", &PdbMetadata::default());
        let ch2 = text.lines().find(|l| l.contains("CH2")).unwrap();
        assert_eq!(&ch2[12..16], " CH2");
        let records = read_back(&text);
        assert_eq!(records.len(), 14);
        assert_eq!(records[13].name, "CH2");
    }

    #[test]
    fn absent_atoms_and_unnamed_slots_are_skipped() {
        let text = write_to_string(&sample_frames(), "AGK", &PdbMetadata::default());
        let records = read_back(&text);

        // ALA 5 atoms, GLY 4 (slot 4 unnamed), LYS 8 (CA absent)
        assert_eq!(records.len(), 5 + 4 + 8);
        assert!(records.iter().all(|r| !(r.residue_name == "GLY" && r.name == "CB")));
        let lys: Vec<&str> = records
            .iter()
            .filter(|r| r.residue_number == 3)
            .map(|r| r.name.as_str())
            .collect();
        assert_eq!(lys, vec!["N", "C", "O", "CB", "CG", "CD", "CE", "NZ"]);
    }

    #[test]
    fn serials_are_gapless_and_never_reset() {
        let text = write_to_string(&sample_frames(), "AGK", &PdbMetadata::default());
        let records = read_back(&text);
        for (i, record) in records.iter().enumerate() {
            assert_eq!(record.serial, i + 1);
        }
    }

    #[test]
    fn residue_numbers_are_one_based_indices() {
        let text = write_to_string(&sample_frames(), "AGK", &PdbMetadata::default());
        let records = read_back(&text);
        let names: Vec<(isize, &str)> = records
            .iter()
            .map(|r| (r.residue_number, r.residue_name.as_str()))
            .collect();
        assert!(names.iter().filter(|(n, _)| *n == 1).all(|(_, r)| *r == "ALA"));
        assert!(names.iter().filter(|(n, _)| *n == 2).all(|(_, r)| *r == "GLY"));
        assert!(names.iter().filter(|(n, _)| *n == 3).all(|(_, r)| *r == "LYS"));
    }

    #[test]
    fn round_trip_reproduces_coordinates_to_three_decimals() {
        let frames = vec![
            frame(&[[1.23456, -2.34567, 3.45678], [-45.6789, 0.0004, 12.0]]),
            frame(&[[100.001, -999.999, 0.5], [0.1, 0.2, 0.3]]),
        ];
        let text = write_to_string(&frames, "GG", &PdbMetadata::default());
        let records = read_back(&text);
        assert_eq!(records.len(), 4);

        let expected: Vec<&Point3<f64>> = frames
            .iter()
            .flat_map(|f| f.present_atoms().map(|(_, p)| p))
            .collect();
        for (record, original) in records.iter().zip(expected) {
            assert!((record.position - *original).abs().max() <= 5e-4 + 1e-9);
        }
    }

    #[test]
    fn unknown_letters_map_to_unk_with_backbone_only() {
        let coords = vec![[1.0, 1.0, 1.0]; 6];
        let text = write_to_string(&[frame(&coords)], "X", &PdbMetadata::default());
        let records = read_back(&text);
        assert_eq!(records.len(), 4);
        assert!(records.iter().all(|r| r.residue_name == "UNK"));
    }

    #[test]
    fn output_ends_with_ter_then_end() {
        let text = write_to_string(&sample_frames(), "AGK", &PdbMetadata::default());
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(*lines.last().unwrap(), "END");
        let ter = lines[lines.len() - 2];
        assert!(ter.starts_with("TER      18"));
        assert!(ter.contains("LYS A   3"));
    }

    #[test]
    fn empty_structure_still_writes_end_marker() {
        let text = write_to_string(&[], "", &PdbMetadata::default());
        assert_eq!(text, "END\n");
    }

    #[test]
    fn output_is_deterministic() {
        let meta = PdbMetadata {
            remarks: vec!["recycle 0".into()],
            b_factors: Some(vec![80.0, 70.5, 60.25]),
            ..Default::default()
        };
        let a = write_to_string(&sample_frames(), "AGK", &meta);
        let b = write_to_string(&sample_frames(), "AGK", &meta);
        assert_eq!(a, b);
    }

    #[test]
    fn metadata_controls_remarks_chain_and_b_factors() {
        let meta = PdbMetadata {
            chain_id: 'B',
            remarks: vec!["generated for test".into()],
            b_factors: Some(vec![91.5, 42.0, 0.0]),
        };
        let text = write_to_string(&sample_frames(), "AGK", &meta);
        assert!(text.starts_with("REMARK generated for test\n"));
        let records = read_back(&text);
        assert!(records.iter().all(|r| r.chain_id == 'B'));
        assert!(
            records
                .iter()
                .filter(|r| r.residue_number == 1)
                .all(|r| (r.b_factor - 91.5).abs() < 1e-9)
        );
        assert!(
            records
                .iter()
                .filter(|r| r.residue_number == 2)
                .all(|r| (r.b_factor - 42.0).abs() < 1e-9)
        );
    }

    #[test]
    fn mismatched_sequence_length_is_rejected() {
        let mut buf = Vec::new();
        let result = PdbFile::write_to(&sample_frames(), "AG", &PdbMetadata::default(), &mut buf);
        assert!(matches!(result, Err(PdbError::Inconsistency(_))));
    }

    #[test]
    fn mismatched_b_factor_count_is_rejected() {
        let meta = PdbMetadata {
            b_factors: Some(vec![1.0]),
            ..Default::default()
        };
        let mut buf = Vec::new();
        let result = PdbFile::write_to(&sample_frames(), "AGK", &meta, &mut buf);
        assert!(matches!(result, Err(PdbError::Inconsistency(_))));
    }

    #[test]
    fn read_rejects_malformed_coordinates() {
        let line = "ATOM      1  N   ALA A   1       1.000   abcde   3.000  1.00  0.00           N  ";
        let result = PdbFile::read_from(&mut Cursor::new(line.as_bytes()));
        assert!(matches!(
            result,
            Err(PdbError::Parse {
                line: 1,
                kind: PdbParseErrorKind::InvalidFloat { .. }
            })
        ));
    }

    #[test]
    fn read_rejects_truncated_atom_lines() {
        let line = "ATOM      1  N   ALA A   1       1.000";
        let result = PdbFile::read_from(&mut Cursor::new(line.as_bytes()));
        assert!(matches!(
            result,
            Err(PdbError::Parse {
                kind: PdbParseErrorKind::LineTooShort,
                ..
            })
        ));
    }

    #[test]
    fn read_ignores_non_atom_records_and_stops_at_end() {
        let text = "REMARK hello\nATOM      1  CA  GLY A   1       1.000   2.000   3.000\nEND\nATOM      2  CA  GLY A   2       1.000   2.000   3.000\n";
        let records = read_back(text);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].element, "C");
        assert_eq!(records[0].occupancy, 1.0);
    }

    #[test]
    fn records_after_the_written_end_marker_are_not_read() {
        let mut text = write_to_string(&sample_frames(), "AGK", &PdbMetadata::default());
        assert!(text.ends_with("END\n"));
        text.push_str("ATOM     99  CA  GLY A   9       1.000   2.000   3.000\n");

        let records = read_back(&text);
        assert_eq!(records.len(), 17);
        assert!(records.iter().all(|r| r.serial != 99));
    }

    #[test]
    fn write_and_read_through_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("step_0.pdb");
        PdbFile::write_structure_to_path(&sample_frames(), "AGK", &path).unwrap();
        let records = PdbFile::read_from_path(&path).unwrap();
        assert_eq!(records.len(), 17);
    }
}
