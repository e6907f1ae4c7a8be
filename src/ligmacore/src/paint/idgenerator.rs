// SPDX-License-Identifier: GPL-3.0-or-later

use super::LayerID;

use bitvec::prelude::*;

/// Hands out unique layer IDs.
///
/// Zero is never used as an ID. IDs of removed layers are not reused
/// until the generator wraps around.
#[derive(Debug, Clone)]
pub struct IDGenerator {
    used_ids: BitVec,
    next_id: Option<LayerID>,
}

impl IDGenerator {
    pub fn new(first_id: LayerID, used_ids: impl IntoIterator<Item = LayerID>) -> Self {
        assert!(first_id != 0);
        let mut used = bitvec![0; LayerID::MAX as usize + 1];
        for id in used_ids {
            used.set(id as usize, true);
        }
        assert!(!used[first_id as usize]);
        Self {
            used_ids: used,
            next_id: Some(first_id),
        }
    }

    pub fn take_next(&mut self) -> Option<LayerID> {
        let id = self.next_id?;
        self.used_ids.set(id as usize, true);

        let mut next_id = Self::successor(id);
        while next_id != id && self.used_ids[next_id as usize] {
            next_id = Self::successor(next_id);
        }

        self.next_id = if next_id != id { Some(next_id) } else { None };
        Some(id)
    }

    /// Mark an ID as free again
    pub fn release(&mut self, id: LayerID) {
        self.used_ids.set(id as usize, false);
        if self.next_id.is_none() {
            self.next_id = Some(id);
        }
    }

    fn successor(id: LayerID) -> LayerID {
        match id.wrapping_add(1) {
            0 => 1,
            n => n,
        }
    }
}

impl Default for IDGenerator {
    fn default() -> Self {
        IDGenerator::new(1, [])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_generation() {
        let mut idgen = IDGenerator::new(1, [3, 5]);
        let ids: Vec<_> = std::iter::from_fn(|| idgen.take_next()).take(4).collect();
        assert_eq!(ids, vec![1, 2, 4, 6]);
    }

    #[test]
    fn test_id_wraparound() {
        let mut idgen = IDGenerator::new(1, vec![2]);
        assert_eq!(idgen.take_next(), Some(1));
        assert_eq!(idgen.take_next(), Some(3));
        idgen.next_id = Some(LayerID::MAX);
        assert_eq!(idgen.take_next(), Some(LayerID::MAX));
        // zero is skipped
        assert_eq!(idgen.take_next(), Some(4));
    }

    #[test]
    fn test_exhaustion() {
        let mut idgen = IDGenerator::new(1, 2..=LayerID::MAX);
        assert_eq!(idgen.take_next(), Some(1));
        assert_eq!(idgen.take_next(), None);
        idgen.release(7);
        assert_eq!(idgen.take_next(), Some(7));
    }
}
