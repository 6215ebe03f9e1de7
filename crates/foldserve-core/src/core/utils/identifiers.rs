use phf::{Map, phf_map};

/// Number of atom slots per residue in the reduced (atom14) representation.
pub const ATOM14_SLOTS: usize = 14;

/// Residue name used for one-letter codes outside the canonical alphabet.
pub const UNKNOWN_RESIDUE: &str = "UNK";

/// The 20 canonical one-letter amino-acid codes.
pub const CANONICAL_ALPHABET: &str = "ACDEFGHIKLMNPQRSTVWY";

static ONE_TO_THREE: Map<char, &'static str> = phf_map! {
    'A' => "ALA", 'C' => "CYS", 'D' => "ASP", 'E' => "GLU", 'F' => "PHE",
    'G' => "GLY", 'H' => "HIS", 'I' => "ILE", 'K' => "LYS", 'L' => "LEU",
    'M' => "MET", 'N' => "ASN", 'P' => "PRO", 'Q' => "GLN", 'R' => "ARG",
    'S' => "SER", 'T' => "THR", 'V' => "VAL", 'W' => "TRP", 'Y' => "TYR",
};

// Backbone (N, CA, C, O) first, then side-chain heavy atoms in atom14 order.
// Empty strings mark slots the residue type does not use.
static ATOM14_NAMES: Map<&'static str, [&'static str; ATOM14_SLOTS]> = phf_map! {
    "ALA" => ["N", "CA", "C", "O", "CB", "", "", "", "", "", "", "", "", ""],
    "ARG" => ["N", "CA", "C", "O", "CB", "CG", "CD", "NE", "CZ", "NH1", "NH2", "", "", ""],
    "ASN" => ["N", "CA", "C", "O", "CB", "CG", "OD1", "ND2", "", "", "", "", "", ""],
    "ASP" => ["N", "CA", "C", "O", "CB", "CG", "OD1", "OD2", "", "", "", "", "", ""],
    "CYS" => ["N", "CA", "C", "O", "CB", "SG", "", "", "", "", "", "", "", ""],
    "GLN" => ["N", "CA", "C", "O", "CB", "CG", "CD", "OE1", "NE2", "", "", "", "", ""],
    "GLU" => ["N", "CA", "C", "O", "CB", "CG", "CD", "OE1", "OE2", "", "", "", "", ""],
    "GLY" => ["N", "CA", "C", "O", "", "", "", "", "", "", "", "", "", ""],
    "HIS" => ["N", "CA", "C", "O", "CB", "CG", "ND1", "CD2", "CE1", "NE2", "", "", "", ""],
    "ILE" => ["N", "CA", "C", "O", "CB", "CG1", "CG2", "CD1", "", "", "", "", "", ""],
    "LEU" => ["N", "CA", "C", "O", "CB", "CG", "CD1", "CD2", "", "", "", "", "", ""],
    "LYS" => ["N", "CA", "C", "O", "CB", "CG", "CD", "CE", "NZ", "", "", "", "", ""],
    "MET" => ["N", "CA", "C", "O", "CB", "CG", "SD", "CE", "", "", "", "", "", ""],
    "PHE" => ["N", "CA", "C", "O", "CB", "CG", "CD1", "CD2", "CE1", "CE2", "CZ", "", "", ""],
    "PRO" => ["N", "CA", "C", "O", "CB", "CG", "CD", "", "", "", "", "", "", ""],
    "SER" => ["N", "CA", "C", "O", "CB", "OG", "", "", "", "", "", "", "", ""],
    "THR" => ["N", "CA", "C", "O", "CB", "OG1", "CG2", "", "", "", "", "", "", ""],
    "TRP" => ["N", "CA", "C", "O", "CB", "CG", "CD1", "CD2", "NE1", "CE2", "CE3", "CZ2", "CZ3", "CH2"],
    "TYR" => ["N", "CA", "C", "O", "CB", "CG", "CD1", "CD2", "CE1", "CE2", "CZ", "OH", "", ""],
    "VAL" => ["N", "CA", "C", "O", "CB", "CG1", "CG2", "", "", "", "", "", "", ""],
    "UNK" => ["N", "CA", "C", "O", "", "", "", "", "", "", "", "", "", ""],
};

pub fn is_canonical_residue(one_letter: char) -> bool {
    ONE_TO_THREE.contains_key(&one_letter)
}

/// Maps a one-letter code to its three-letter residue name, falling back to `UNK`.
pub fn three_letter_code(one_letter: char) -> &'static str {
    ONE_TO_THREE
        .get(&one_letter.to_ascii_uppercase())
        .copied()
        .unwrap_or(UNKNOWN_RESIDUE)
}

/// Returns the atom name stored in `slot` for the given residue, if the residue uses that slot.
pub fn atom14_name(residue_name: &str, slot: usize) -> Option<&'static str> {
    let names = ATOM14_NAMES
        .get(residue_name.trim())
        .or_else(|| ATOM14_NAMES.get(UNKNOWN_RESIDUE))?;
    names.get(slot).copied().filter(|name| !name.is_empty())
}

pub fn element_symbol(atom_name: &str) -> &str {
    let trimmed = atom_name.trim();
    trimmed.get(..1).unwrap_or("")
}
