use crate::constants::DIRECTIONS;
use bitflags::bitflags;
use glam::IVec2;

bitflags! {
    /// Cardinal-direction bitmask used for airflow adjacency and airtight
    /// obstruction data. An empty mask means "no direction" (stale or reset
    /// flow state).
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct AtmosDirection: u8 {
        const NORTH = 1 << 0;
        const SOUTH = 1 << 1;
        const EAST = 1 << 2;
        const WEST = 1 << 3;
    }
}

impl AtmosDirection {
    pub const CARDINALS: [AtmosDirection; DIRECTIONS] = [
        AtmosDirection::NORTH,
        AtmosDirection::SOUTH,
        AtmosDirection::EAST,
        AtmosDirection::WEST,
    ];

    /// Single cardinal flag for an adjacency-array index.
    pub fn from_index(index: usize) -> AtmosDirection {
        Self::CARDINALS[index]
    }

    /// Adjacency-array index of a single cardinal flag.
    pub fn to_index(self) -> usize {
        debug_assert_eq!(self.bits().count_ones(), 1);
        self.bits().trailing_zeros() as usize
    }

    /// Mirror of the mask: each cardinal flag replaced by its opposite.
    pub fn opposite(self) -> AtmosDirection {
        let mut out = AtmosDirection::empty();
        if self.contains(AtmosDirection::NORTH) {
            out |= AtmosDirection::SOUTH;
        }
        if self.contains(AtmosDirection::SOUTH) {
            out |= AtmosDirection::NORTH;
        }
        if self.contains(AtmosDirection::EAST) {
            out |= AtmosDirection::WEST;
        }
        if self.contains(AtmosDirection::WEST) {
            out |= AtmosDirection::EAST;
        }
        out
    }

    /// Grid offset of the mask (single cardinals give unit steps).
    pub fn offset(self) -> IVec2 {
        let mut out = IVec2::ZERO;
        if self.contains(AtmosDirection::NORTH) {
            out += IVec2::new(0, 1);
        }
        if self.contains(AtmosDirection::SOUTH) {
            out += IVec2::new(0, -1);
        }
        if self.contains(AtmosDirection::EAST) {
            out += IVec2::new(1, 0);
        }
        if self.contains(AtmosDirection::WEST) {
            out += IVec2::new(-1, 0);
        }
        out
    }

    pub fn offset_tile(self, indices: IVec2) -> IVec2 {
        indices + self.offset()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cardinal_indices_round_trip() {
        for (i, dir) in AtmosDirection::CARDINALS.iter().enumerate() {
            assert_eq!(dir.to_index(), i);
            assert_eq!(AtmosDirection::from_index(i), *dir);
        }
    }

    #[test]
    fn opposites_cancel() {
        for dir in AtmosDirection::CARDINALS {
            assert_eq!(dir.opposite().opposite(), dir);
            assert_eq!(dir.offset() + dir.opposite().offset(), IVec2::ZERO);
        }
    }

    #[test]
    fn opposite_of_composite_mask() {
        let mask = AtmosDirection::NORTH | AtmosDirection::EAST;
        assert_eq!(
            mask.opposite(),
            AtmosDirection::SOUTH | AtmosDirection::WEST
        );
    }

    #[test]
    fn offset_tile_steps_one_cell() {
        let origin = IVec2::new(3, 4);
        assert_eq!(
            AtmosDirection::NORTH.offset_tile(origin),
            IVec2::new(3, 5)
        );
        assert_eq!(AtmosDirection::WEST.offset_tile(origin), IVec2::new(2, 4));
    }
}
