use crate::core::utils::identifiers::ATOM14_SLOTS;
use nalgebra::Point3;

/// Coordinates whose absolute component sum falls below this value mark an absent atom.
pub const ABSENT_ATOM_EPSILON: f64 = 1e-3;

pub fn is_atom_present(position: &Point3<f64>) -> bool {
    position.x.abs() + position.y.abs() + position.z.abs() >= ABSENT_ATOM_EPSILON
}

/// Atom coordinates of one residue in the atom14 slot layout.
///
/// Unused slots hold the origin and are treated as absent.
#[derive(Debug, Clone, PartialEq)]
pub struct ResidueFrame {
    slots: [Point3<f64>; ATOM14_SLOTS],
}

impl Default for ResidueFrame {
    fn default() -> Self {
        Self {
            slots: [Point3::origin(); ATOM14_SLOTS],
        }
    }
}

impl ResidueFrame {
    /// Builds a frame from up to 14 coordinate triples; trailing slots stay empty.
    ///
    /// Returns `None` when more than 14 triples are supplied.
    pub fn from_slots(coords: &[[f64; 3]]) -> Option<Self> {
        if coords.len() > ATOM14_SLOTS {
            return None;
        }
        let mut frame = Self::default();
        for (slot, xyz) in coords.iter().enumerate() {
            frame.slots[slot] = Point3::new(xyz[0], xyz[1], xyz[2]);
        }
        Some(frame)
    }

    pub fn slot(&self, index: usize) -> Option<&Point3<f64>> {
        self.slots.get(index)
    }

    pub fn set_slot(&mut self, index: usize, position: Point3<f64>) {
        if let Some(slot) = self.slots.get_mut(index) {
            *slot = position;
        }
    }

    pub fn is_present(&self, index: usize) -> bool {
        self.slots.get(index).is_some_and(is_atom_present)
    }

    /// Present atoms in slot order.
    pub fn present_atoms(&self) -> impl Iterator<Item = (usize, &Point3<f64>)> {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, pos)| is_atom_present(pos))
    }
}
