use crate::constants::CELL_VOLUME_L;
use crate::direction::AtmosDirection;
use crate::error::AtmosError;
use crate::excited_group::{ExcitedGroup, ExcitedGroupId};
use crate::mixture::GasMixture;
use crate::tile::TileAtmosphere;
use crate::topology::GridId;
use glam::IVec2;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Handle to a pipe network registered on a grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PipeNetHandle(pub u64);

/// Handle to an atmos device registered on a grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AtmosDeviceHandle(pub u64);

/// Serialized form of a grid atmosphere: a pool of unique mixtures plus the
/// tiles that reference them by index.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GridAtmosphereData {
    pub unique_mixes: Vec<GasMixture>,
    pub tiles_unique_mixes: Vec<(IVec2, usize)>,
}

/// All simulation state for one grid: the tile map plus the scheduling sets
/// that keep per-tick work proportional to what actually changed.
#[derive(Debug, Default)]
pub struct GridAtmosphere {
    pub grid: GridId,
    pub tiles: HashMap<IVec2, TileAtmosphere>,
    pub active_tiles: HashSet<IVec2>,
    pub invalidated: HashSet<IVec2>,
    pub excited_groups: HashMap<ExcitedGroupId, ExcitedGroup>,
    next_group_id: u64,
    pub hotspot_tiles: HashSet<IVec2>,
    pub pipe_nets: Vec<PipeNetHandle>,
    pub devices: Vec<AtmosDeviceHandle>,
}

impl GridAtmosphere {
    pub fn new(grid: GridId) -> GridAtmosphere {
        GridAtmosphere {
            grid,
            ..GridAtmosphere::default()
        }
    }

    /// Builds a grid atmosphere from snapshot data. Every loaded tile is
    /// marked invalidated so the next pass recomputes adjacency and wakes it.
    pub fn from_snapshot(grid: GridId, data: &GridAtmosphereData) -> Result<GridAtmosphere, AtmosError> {
        let mut atmos = GridAtmosphere::new(grid);
        for &(indices, mix_index) in &data.tiles_unique_mixes {
            let Some(mix) = data.unique_mixes.get(mix_index) else {
                log::error!(
                    "grid {:?} tile {} points to a unique mix out of range ({} of {})",
                    grid,
                    indices,
                    mix_index,
                    data.unique_mixes.len()
                );
                return Err(AtmosError::UnknownMixIndex {
                    tile: indices,
                    index: mix_index,
                    available: data.unique_mixes.len(),
                });
            };
            atmos
                .tiles
                .insert(indices, TileAtmosphere::new(grid, indices, Some(mix.clone())));
            atmos.invalidated.insert(indices);
        }
        Ok(atmos)
    }

    pub fn from_json(grid: GridId, json: &str) -> Result<GridAtmosphere, AtmosError> {
        let data: GridAtmosphereData = serde_json::from_str(json)?;
        GridAtmosphere::from_snapshot(grid, &data)
    }

    /// Queues a tile for revalidation. Safe to call any number of times.
    pub fn invalidate(&mut self, indices: IVec2) {
        self.invalidated.insert(indices);
    }

    /// Neighbor keys this tile's open directions point at.
    pub fn open_neighbors(&self, indices: IVec2) -> Vec<IVec2> {
        let Some(tile) = self.tiles.get(&indices) else {
            return Vec::new();
        };
        let mut out = Vec::new();
        for (index, direction) in AtmosDirection::CARDINALS.iter().enumerate() {
            if tile.adjacent_bits.contains(*direction) {
                if let Some(neighbor) = tile.adjacent[index] {
                    out.push(neighbor);
                }
            }
        }
        out
    }

    /// Puts a tile on the active set. Tiles without air (space) stay inert.
    pub fn add_active_tile(&mut self, indices: IVec2) {
        let Some(tile) = self.tiles.get_mut(&indices) else {
            return;
        };
        if tile.air.is_none() {
            return;
        }
        tile.excited = true;
        self.active_tiles.insert(indices);
    }

    /// Takes a tile off the active set. With `dispose_group` the tile's
    /// whole excited group is disposed; otherwise the tile just leaves it.
    pub fn remove_active_tile(&mut self, indices: IVec2, dispose_group: bool) {
        self.active_tiles.remove(&indices);
        let Some(tile) = self.tiles.get_mut(&indices) else {
            return;
        };
        tile.excited = false;
        let Some(group_id) = tile.excited_group.take() else {
            return;
        };
        if dispose_group {
            self.excited_group_dispose(group_id);
        } else if let Some(group) = self.excited_groups.get_mut(&group_id) {
            group.tiles.retain(|t| *t != indices);
            group.reset_cooldowns();
            if group.tiles.is_empty() {
                self.excited_groups.remove(&group_id);
            }
        }
    }

    /// Removes a group, clearing member back-references but leaving the
    /// members active.
    pub fn excited_group_dispose(&mut self, group_id: ExcitedGroupId) {
        let Some(group) = self.excited_groups.remove(&group_id) else {
            return;
        };
        for indices in group.tiles {
            if let Some(tile) = self.tiles.get_mut(&indices) {
                tile.excited_group = None;
            }
        }
    }

    /// Removes a group and deactivates every member. Returns the members so
    /// the caller can emit visual updates.
    pub fn excited_group_dismantle(&mut self, group_id: ExcitedGroupId) -> Vec<IVec2> {
        let Some(group) = self.excited_groups.remove(&group_id) else {
            return Vec::new();
        };
        for &indices in &group.tiles {
            self.active_tiles.remove(&indices);
            if let Some(tile) = self.tiles.get_mut(&indices) {
                tile.excited = false;
                tile.excited_group = None;
            }
        }
        group.tiles
    }

    /// Averages the member mixtures in place: all member air is pooled,
    /// divided evenly, and written back, preserving each tile's volume.
    /// Returns the members touched.
    pub fn excited_group_self_breakdown(&mut self, group_id: ExcitedGroupId) -> Vec<IVec2> {
        let Some(group) = self.excited_groups.get_mut(&group_id) else {
            return Vec::new();
        };
        group.breakdown_cooldown = 0;
        let members = group.tiles.clone();

        let mut combined = GasMixture::new(CELL_VOLUME_L);
        let mut count = 0usize;
        for indices in &members {
            if let Some(air) = self.tiles.get(indices).and_then(|t| t.air.as_ref()) {
                combined.merge(air);
                count += 1;
            }
        }
        if count == 0 {
            return members;
        }
        combined.multiply(1.0 / count as f64);

        for indices in &members {
            if let Some(tile) = self.tiles.get_mut(indices) {
                if let Some(air) = tile.air.as_mut() {
                    let volume = air.volume_l();
                    *air = combined.clone();
                    air.set_volume_l(volume);
                }
            }
        }
        members
    }

    /// Links two converged active tiles into the same excited group, merging
    /// or creating groups as needed. Membership changes reset cooldowns.
    pub fn excite_pair(&mut self, a: IVec2, b: IVec2) {
        let group_a = self.tiles.get(&a).and_then(|t| t.excited_group);
        let group_b = self.tiles.get(&b).and_then(|t| t.excited_group);

        match (group_a, group_b) {
            (None, None) => {
                let id = self.alloc_group();
                self.excited_groups.insert(
                    id,
                    ExcitedGroup {
                        tiles: vec![a, b],
                        ..ExcitedGroup::default()
                    },
                );
                if let Some(tile) = self.tiles.get_mut(&a) {
                    tile.excited_group = Some(id);
                }
                if let Some(tile) = self.tiles.get_mut(&b) {
                    tile.excited_group = Some(id);
                }
            }
            (Some(id), None) => self.excited_group_add_tile(id, b),
            (None, Some(id)) => self.excited_group_add_tile(id, a),
            (Some(id_a), Some(id_b)) if id_a != id_b => {
                // Merge the smaller group into the larger one.
                let len_a = self.excited_groups.get(&id_a).map_or(0, |g| g.tiles.len());
                let len_b = self.excited_groups.get(&id_b).map_or(0, |g| g.tiles.len());
                let (keep, absorb) = if len_a >= len_b { (id_a, id_b) } else { (id_b, id_a) };
                let Some(absorbed) = self.excited_groups.remove(&absorb) else {
                    return;
                };
                for indices in &absorbed.tiles {
                    if let Some(tile) = self.tiles.get_mut(indices) {
                        tile.excited_group = Some(keep);
                    }
                }
                if let Some(group) = self.excited_groups.get_mut(&keep) {
                    group.tiles.extend(absorbed.tiles);
                    group.reset_cooldowns();
                }
            }
            _ => {}
        }
    }

    fn excited_group_add_tile(&mut self, group_id: ExcitedGroupId, indices: IVec2) {
        let Some(group) = self.excited_groups.get_mut(&group_id) else {
            return;
        };
        if !group.tiles.contains(&indices) {
            group.tiles.push(indices);
        }
        group.reset_cooldowns();
        if let Some(tile) = self.tiles.get_mut(&indices) {
            tile.excited_group = Some(group_id);
        }
    }

    fn alloc_group(&mut self) -> ExcitedGroupId {
        let id = ExcitedGroupId(self.next_group_id);
        self.next_group_id += 1;
        id
    }
}
