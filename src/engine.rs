use crate::constants::{
    CELL_VOLUME_L, EXCITED_GROUP_BREAKDOWN_CYCLES, EXCITED_GROUP_DISMANTLE_CYCLES,
    MINIMUM_HEAT_CAPACITY, MINIMUM_MOLES_DELTA_TO_MOVE, MINIMUM_PRESSURE_DELTA_TO_SUSPEND_KPA,
    MINIMUM_TEMPERATURE_DELTA_TO_SUSPEND_K, SAFE_TEMPERATURE_MAX_K, SAFE_TEMPERATURE_MIN_K,
    SPACE_HEAT_CAPACITY, WARNING_HIGH_PRESSURE_KPA, WARNING_LOW_PRESSURE_KPA,
};
use crate::error::AtmosError;
use crate::grid::{AtmosDeviceHandle, GridAtmosphere, GridAtmosphereData, PipeNetHandle};
use crate::mixture::{GasMixture, SPACE_GAS};
use crate::reactions::{ReactionResult, ReactionTable};
use crate::topology::{GridId, GridMap};
use glam::IVec2;
use std::collections::{HashMap, HashSet};
use std::time::Duration;

/// A tile whose visible gas state changed this pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TileChanged {
    pub grid: GridId,
    pub tile: IVec2,
}

/// Tunable scheduling parameters. Defaults come from the crate constants.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub excited_group_breakdown_cycles: u32,
    pub excited_group_dismantle_cycles: u32,
    pub minimum_moles_delta_to_move: f64,
    pub minimum_pressure_delta_to_suspend_kpa: f64,
    pub minimum_temperature_delta_to_suspend_k: f64,
}

impl Default for EngineConfig {
    fn default() -> EngineConfig {
        EngineConfig {
            excited_group_breakdown_cycles: EXCITED_GROUP_BREAKDOWN_CYCLES,
            excited_group_dismantle_cycles: EXCITED_GROUP_DISMANTLE_CYCLES,
            minimum_moles_delta_to_move: MINIMUM_MOLES_DELTA_TO_MOVE,
            minimum_pressure_delta_to_suspend_kpa: MINIMUM_PRESSURE_DELTA_TO_SUSPEND_KPA,
            minimum_temperature_delta_to_suspend_k: MINIMUM_TEMPERATURE_DELTA_TO_SUSPEND_K,
        }
    }
}

/// Top-level simulation driver. Owns every grid atmosphere, the reaction
/// table and the visual-update queue; the host calls `tick` with a topology
/// provider and drains the updates afterwards.
pub struct AtmosphereEngine {
    pub config: EngineConfig,
    pub(crate) grids: HashMap<GridId, GridAtmosphere>,
    pub(crate) reactions: ReactionTable,
    pub(crate) visual_updates: Vec<TileChanged>,
    pub(crate) tick_count: u64,
    pub(crate) phase_timings: Vec<(&'static str, Duration)>,
}

impl AtmosphereEngine {
    pub fn new() -> AtmosphereEngine {
        AtmosphereEngine::with_config(EngineConfig::default())
    }

    pub fn with_config(config: EngineConfig) -> AtmosphereEngine {
        AtmosphereEngine {
            config,
            grids: HashMap::new(),
            reactions: ReactionTable::with_defaults(),
            visual_updates: Vec::new(),
            tick_count: 0,
            phase_timings: Vec::new(),
        }
    }

    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    pub fn reactions_mut(&mut self) -> &mut ReactionTable {
        &mut self.reactions
    }

    /// Registers an empty atmosphere for a grid. Idempotent.
    pub fn add_grid(&mut self, grid: GridId) {
        self.grids
            .entry(grid)
            .or_insert_with(|| GridAtmosphere::new(grid));
    }

    /// Loads a grid atmosphere from snapshot data and seeds every map tile,
    /// so tiles the snapshot missed still get ambient air.
    pub fn load_grid(
        &mut self,
        grid: GridId,
        data: &GridAtmosphereData,
        map: &dyn GridMap,
    ) -> Result<(), AtmosError> {
        let atmos = GridAtmosphere::from_snapshot(grid, data)?;
        self.grids.insert(grid, atmos);
        self.grid_repopulate_tiles(map, grid);
        Ok(())
    }

    pub fn remove_grid(&mut self, grid: GridId) {
        if self.grids.remove(&grid).is_some() {
            log::info!("removed grid atmosphere {:?}", grid);
        }
        self.visual_updates.retain(|change| change.grid != grid);
    }

    pub fn is_simulated_grid(&self, grid: GridId) -> bool {
        self.grids.contains_key(&grid)
    }

    pub fn grid_atmosphere(&self, grid: GridId) -> Option<&GridAtmosphere> {
        self.grids.get(&grid)
    }

    pub fn grid_atmosphere_mut(&mut self, grid: GridId) -> Option<&mut GridAtmosphere> {
        self.grids.get_mut(&grid)
    }

    pub fn invalidate_tile(&mut self, grid: GridId, tile: IVec2) {
        if let Some(atmos) = self.grids.get_mut(&grid) {
            atmos.invalidate(tile);
        }
    }

    pub fn invalidate_visuals(&mut self, grid: GridId, tile: IVec2) {
        self.visual_updates.push(TileChanged { grid, tile });
    }

    /// Takes the queued visual updates, collapsed to one entry per tile in
    /// first-seen order. Several passes may touch the same tile in one tick;
    /// the host only needs to hear about it once.
    pub fn drain_visual_updates(&mut self) -> Vec<TileChanged> {
        let mut seen = HashSet::new();
        std::mem::take(&mut self.visual_updates)
            .into_iter()
            .filter(|change| seen.insert(*change))
            .collect()
    }

    pub fn add_active_tile(&mut self, grid: GridId, tile: IVec2) {
        if let Some(atmos) = self.grids.get_mut(&grid) {
            atmos.add_active_tile(tile);
        }
    }

    pub fn remove_active_tile(&mut self, grid: GridId, tile: IVec2, dispose_group: bool) {
        if let Some(atmos) = self.grids.get_mut(&grid) {
            atmos.remove_active_tile(tile, dispose_group);
        }
    }

    /// Whether a tile tracks no mixture. Unknown grids and unknown tiles
    /// count as space.
    pub fn is_tile_space(&self, grid: GridId, tile: IVec2) -> bool {
        match self.grids.get(&grid) {
            None => true,
            Some(atmos) => atmos.tiles.get(&tile).is_none_or(|t| t.air.is_none()),
        }
    }

    /// Read-only mixture lookup. An unknown grid resolves to the space
    /// mixture; a known grid's space tile resolves to `None`.
    pub fn get_tile_mixture(&self, grid: GridId, tile: IVec2) -> Option<&GasMixture> {
        match self.grids.get(&grid) {
            None => Some(&*SPACE_GAS),
            Some(atmos) => atmos.tiles.get(&tile).and_then(|t| t.air.as_ref()),
        }
    }

    /// Mutable mixture lookup. The tile is invalidated, since the caller is
    /// presumably about to change its contents.
    pub fn tile_mixture_mut(&mut self, grid: GridId, tile: IVec2) -> Option<&mut GasMixture> {
        let atmos = self.grids.get_mut(&grid)?;
        if atmos.tiles.get(&tile)?.air.is_some() {
            atmos.invalidate(tile);
        }
        atmos.tiles.get_mut(&tile)?.air.as_mut()
    }

    /// Every simulated tile mixture on a grid.
    pub fn all_tile_mixtures(&self, grid: GridId) -> Vec<(IVec2, &GasMixture)> {
        let Some(atmos) = self.grids.get(&grid) else {
            return Vec::new();
        };
        atmos
            .tiles
            .iter()
            .filter_map(|(coord, tile)| tile.air.as_ref().map(|air| (*coord, air)))
            .collect()
    }

    /// Neighboring tile keys of a tile, optionally including blocked sides.
    pub fn adjacent_tiles(&self, grid: GridId, tile: IVec2, include_blocked: bool) -> Vec<IVec2> {
        let Some(t) = self.grids.get(&grid).and_then(|a| a.tiles.get(&tile)) else {
            return Vec::new();
        };
        let mut out = Vec::new();
        for (index, neighbor) in t.adjacent.iter().enumerate() {
            let Some(coord) = neighbor else { continue };
            let direction = crate::direction::AtmosDirection::from_index(index);
            if include_blocked || t.adjacent_bits.contains(direction) {
                out.push(*coord);
            }
        }
        out
    }

    /// Neighboring mixtures of a tile, open directions only unless
    /// `include_blocked`. With `invalidate`, each returned neighbor is also
    /// queued for revalidation, for callers about to disturb what they read.
    pub fn adjacent_tile_mixtures(
        &mut self,
        grid: GridId,
        tile: IVec2,
        include_blocked: bool,
        invalidate: bool,
    ) -> Vec<(IVec2, &GasMixture)> {
        let coords = self.adjacent_tiles(grid, tile, include_blocked);
        if invalidate {
            if let Some(atmos) = self.grids.get_mut(&grid) {
                for &coord in &coords {
                    atmos.invalidate(coord);
                }
            }
        }
        let Some(atmos) = self.grids.get(&grid) else {
            return Vec::new();
        };
        coords
            .into_iter()
            .filter_map(|coord| {
                atmos
                    .tiles
                    .get(&coord)
                    .and_then(|t| t.air.as_ref())
                    .map(|air| (coord, air))
            })
            .collect()
    }

    /// Combined structural and gas heat capacity at a tile. Unknown grids
    /// report the space value.
    pub fn tile_heat_capacity(&self, grid: GridId, tile: IVec2) -> f64 {
        let Some(atmos) = self.grids.get(&grid) else {
            return SPACE_HEAT_CAPACITY;
        };
        let Some(t) = atmos.tiles.get(&tile) else {
            return MINIMUM_HEAT_CAPACITY;
        };
        t.heat_capacity_structure + t.air.as_ref().map_or(0.0, |air| air.heat_capacity())
    }

    /// Coarse habitability test: pressure inside the warning band and
    /// temperature inside the safe window.
    pub fn is_mixture_probably_safe(mixture: Option<&GasMixture>) -> bool {
        let Some(mixture) = mixture else { return false };
        let pressure = mixture.pressure_kpa();
        if pressure <= WARNING_LOW_PRESSURE_KPA || pressure >= WARNING_HIGH_PRESSURE_KPA {
            return false;
        }
        let temperature = mixture.temperature_k();
        if temperature <= SAFE_TEMPERATURE_MIN_K || temperature >= SAFE_TEMPERATURE_MAX_K {
            return false;
        }
        true
    }

    pub fn is_tile_mixture_probably_safe(&self, grid: GridId, tile: IVec2) -> bool {
        Self::is_mixture_probably_safe(self.get_tile_mixture(grid, tile))
    }

    /// Runs the reaction table on one tile immediately, outside the tick
    /// loop. The tile is invalidated regardless of outcome.
    pub fn react_tile(&mut self, grid: GridId, tile: IVec2) -> ReactionResult {
        let Some(atmos) = self.grids.get_mut(&grid) else {
            return ReactionResult::NoReaction;
        };
        atmos.invalidate(tile);
        let Some(air) = atmos.tiles.get_mut(&tile).and_then(|t| t.air.as_mut()) else {
            return ReactionResult::NoReaction;
        };
        let result = self.reactions.react(air);
        if result != ReactionResult::NoReaction {
            self.visual_updates.push(TileChanged { grid, tile });
        }
        result
    }

    pub fn add_pipe_net(&mut self, grid: GridId, net: PipeNetHandle) {
        if let Some(atmos) = self.grids.get_mut(&grid) {
            atmos.pipe_nets.push(net);
        }
    }

    pub fn remove_pipe_net(&mut self, grid: GridId, net: PipeNetHandle) {
        if let Some(atmos) = self.grids.get_mut(&grid) {
            atmos.pipe_nets.retain(|n| *n != net);
        }
    }

    pub fn add_atmos_device(&mut self, grid: GridId, device: AtmosDeviceHandle) {
        if let Some(atmos) = self.grids.get_mut(&grid) {
            atmos.devices.push(device);
        }
    }

    pub fn remove_atmos_device(&mut self, grid: GridId, device: AtmosDeviceHandle) {
        if let Some(atmos) = self.grids.get_mut(&grid) {
            atmos.devices.retain(|d| *d != device);
        }
    }

    /// Total air volume of `tile_count` tiles on a map, scaling with the
    /// square of the tile size.
    pub fn volume_for_tiles(map: &dyn GridMap, tile_count: usize) -> f64 {
        let size = map.tile_size() as f64;
        CELL_VOLUME_L * size * size * tile_count as f64
    }
}

impl Default for AtmosphereEngine {
    fn default() -> AtmosphereEngine {
        AtmosphereEngine::new()
    }
}
