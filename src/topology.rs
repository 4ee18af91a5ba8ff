use crate::direction::AtmosDirection;
use glam::IVec2;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Identifier of one simulated grid.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct GridId(pub u32);

/// One airtight obstruction on a tile, as reported by the world layer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AirtightData {
    pub air_blocked: bool,
    pub blocked_direction: AtmosDirection,
    /// Whether removing this obstruction should repressurize the tile from
    /// its neighbors instead of leaving a vacuum.
    pub fix_vacuum: bool,
}

impl Default for AirtightData {
    fn default() -> AirtightData {
        AirtightData {
            air_blocked: true,
            blocked_direction: AtmosDirection::all(),
            fix_vacuum: true,
        }
    }
}

/// Read-only view of one grid's tile layout and obstructions. The engine
/// never stores this; callers pass it into the operations that need it.
pub trait GridMap {
    /// Every tile key the grid defines, simulated or space.
    fn all_tiles(&self) -> Vec<IVec2>;

    /// Whether the tile is open space. Off-map tiles count as space.
    fn is_space(&self, tile: IVec2) -> bool;

    /// All airtight obstructions currently on the tile.
    fn airtight_at(&self, tile: IVec2) -> Vec<AirtightData>;

    /// Side length of a tile in world units. Tile air volume scales with its
    /// square.
    fn tile_size(&self) -> i32 {
        1
    }
}

/// Resolves grid ids to maps, for operations spanning several grids.
pub trait TopologyProvider {
    fn grid_map(&self, grid: GridId) -> Option<&dyn GridMap>;
}

/// In-memory `GridMap` for tests and hosts without a live world layer.
#[derive(Debug, Default, Clone)]
pub struct StaticGridMap {
    tiles: HashSet<IVec2>,
    space: HashSet<IVec2>,
    airtight: HashMap<IVec2, Vec<AirtightData>>,
}

impl StaticGridMap {
    pub fn new() -> StaticGridMap {
        StaticGridMap::default()
    }

    pub fn insert_tile(&mut self, tile: IVec2) -> &mut Self {
        self.tiles.insert(tile);
        self
    }

    /// Inserts every tile in the inclusive rectangle.
    pub fn fill_rect(&mut self, min: IVec2, max: IVec2) -> &mut Self {
        for x in min.x..=max.x {
            for y in min.y..=max.y {
                self.tiles.insert(IVec2::new(x, y));
            }
        }
        self
    }

    pub fn set_space(&mut self, tile: IVec2, space: bool) -> &mut Self {
        self.tiles.insert(tile);
        if space {
            self.space.insert(tile);
        } else {
            self.space.remove(&tile);
        }
        self
    }

    pub fn place_airtight(&mut self, tile: IVec2, data: AirtightData) -> &mut Self {
        self.airtight.entry(tile).or_default().push(data);
        self
    }

    pub fn clear_airtight(&mut self, tile: IVec2) -> &mut Self {
        self.airtight.remove(&tile);
        self
    }
}

impl GridMap for StaticGridMap {
    fn all_tiles(&self) -> Vec<IVec2> {
        self.tiles.iter().copied().collect()
    }

    fn is_space(&self, tile: IVec2) -> bool {
        !self.tiles.contains(&tile) || self.space.contains(&tile)
    }

    fn airtight_at(&self, tile: IVec2) -> Vec<AirtightData> {
        self.airtight.get(&tile).cloned().unwrap_or_default()
    }
}

/// A bag of static grid maps keyed by id.
#[derive(Debug, Default)]
pub struct StaticTopology {
    pub grids: HashMap<GridId, StaticGridMap>,
}

impl StaticTopology {
    pub fn new() -> StaticTopology {
        StaticTopology::default()
    }

    pub fn insert(&mut self, grid: GridId, map: StaticGridMap) -> &mut Self {
        self.grids.insert(grid, map);
        self
    }
}

impl TopologyProvider for StaticTopology {
    fn grid_map(&self, grid: GridId) -> Option<&dyn GridMap> {
        self.grids.get(&grid).map(|map| map as &dyn GridMap)
    }
}
