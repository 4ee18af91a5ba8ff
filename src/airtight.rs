use crate::constants::DIRECTIONS;
use crate::direction::AtmosDirection;
use crate::engine::AtmosphereEngine;
use crate::mixture::GasMixture;
use crate::tile::TileAtmosphere;
use crate::topology::{GridId, GridMap, TopologyProvider};
use glam::IVec2;

/// Union of the directions every air-blocking obstruction on a tile covers.
pub fn blocked_directions(map: &dyn GridMap, tile: IVec2) -> AtmosDirection {
    let mut blocked = AtmosDirection::empty();
    for airtight in map.airtight_at(tile) {
        if airtight.air_blocked {
            blocked |= airtight.blocked_direction;
        }
    }
    blocked
}

/// Whether airflow from `tile` toward `direction` is blocked by either side:
/// the tile's own obstructions, or the neighbor blocking back toward it.
pub fn is_tile_air_blocked(map: &dyn GridMap, tile: IVec2, direction: AtmosDirection) -> bool {
    if blocked_directions(map, tile).contains(direction) {
        return true;
    }
    let neighbor = direction.offset_tile(tile);
    blocked_directions(map, neighbor).contains(direction.opposite())
}

/// Whether any obstruction on the tile asks for repressurization on removal.
pub fn needs_vacuum_fixing(map: &dyn GridMap, tile: IVec2) -> bool {
    map.airtight_at(tile).iter().any(|a| a.fix_vacuum)
}

impl AtmosphereEngine {
    /// Recomputes a tile's blocked and open directions and refreshes the
    /// matching side of each existing neighbor. Neighbors whose flow state
    /// went stale have their recorded pressure direction cleared.
    pub fn update_adjacent(&mut self, map: &dyn GridMap, grid: GridId, tile: IVec2) {
        let Some(atmos) = self.grids.get_mut(&grid) else {
            return;
        };
        if !atmos.tiles.contains_key(&tile) {
            return;
        }

        let blocked = blocked_directions(map, tile);
        let mut adjacent: [Option<IVec2>; DIRECTIONS] = [None; DIRECTIONS];
        let mut open_bits = AtmosDirection::empty();
        for (index, direction) in AtmosDirection::CARDINALS.iter().enumerate() {
            let neighbor = direction.offset_tile(tile);
            if !atmos.tiles.contains_key(&neighbor) {
                continue;
            }
            adjacent[index] = Some(neighbor);
            let open = !is_tile_air_blocked(map, tile, *direction);
            if open {
                open_bits |= *direction;
            }
            // Mirror the result on the neighbor's facing side.
            if let Some(neighbor_tile) = atmos.tiles.get_mut(&neighbor) {
                let opposite = direction.opposite();
                neighbor_tile.adjacent[opposite.to_index()] = Some(tile);
                if open {
                    neighbor_tile.adjacent_bits |= opposite;
                } else {
                    neighbor_tile.adjacent_bits &= !opposite;
                }
                clear_stale_pressure_direction(neighbor_tile);
            }
        }

        if let Some(t) = atmos.tiles.get_mut(&tile) {
            t.blocked_airflow = blocked;
            t.adjacent = adjacent;
            t.adjacent_bits = open_bits;
            clear_stale_pressure_direction(t);
        }
    }

    /// Repressurizes a vacuum tile from its open neighbors. Each donor gives
    /// up an equal ratio of its contents; the repaired tile lands at the
    /// arithmetic mean of the donor temperatures. With no donors the tile is
    /// left as an ambient-temperature vacuum.
    pub fn fix_vacuum(&mut self, map: &dyn GridMap, grid: GridId, tile: IVec2) {
        let Some(atmos) = self.grids.get_mut(&grid) else {
            return;
        };
        let Some(t) = atmos.tiles.get(&tile) else {
            return;
        };

        let mut donors = Vec::new();
        for (index, direction) in AtmosDirection::CARDINALS.iter().enumerate() {
            if !t.adjacent_bits.contains(*direction) {
                continue;
            }
            if let Some(neighbor) = t.adjacent[index] {
                let has_air = atmos
                    .tiles
                    .get(&neighbor)
                    .is_some_and(|n| n.air.is_some());
                if has_air {
                    donors.push(neighbor);
                }
            }
        }

        let volume = Self::volume_for_tiles(map, 1);
        let mut fresh = GasMixture::new_ambient(volume);
        if !donors.is_empty() {
            let ratio = 1.0 / donors.len() as f64;
            let mut temperature_sum = 0.0;
            for donor in &donors {
                atmos.invalidate(*donor);
                let Some(air) = atmos.tiles.get_mut(donor).and_then(|n| n.air.as_mut()) else {
                    continue;
                };
                temperature_sum += air.temperature_k();
                let share = air.remove_ratio(ratio);
                fresh.merge(&share);
            }
            fresh.set_temperature_k(temperature_sum / donors.len() as f64);
        }

        if let Some(t) = atmos.tiles.get_mut(&tile) {
            t.air = Some(fresh);
        }
        atmos.invalidate(tile);
        self.visual_updates
            .push(crate::engine::TileChanged { grid, tile });
    }

    /// Seeds the atmosphere for every tile the map defines, leaving existing
    /// tile state alone, then recomputes adjacency across the whole grid.
    pub fn grid_repopulate_tiles(&mut self, map: &dyn GridMap, grid: GridId) {
        self.add_grid(grid);
        let coords = map.all_tiles();
        {
            let Some(atmos) = self.grids.get_mut(&grid) else {
                return;
            };
            let volume = Self::volume_for_tiles(map, 1);
            for &coord in &coords {
                atmos.tiles.entry(coord).or_insert_with(|| {
                    let air = if map.is_space(coord) {
                        None
                    } else {
                        Some(GasMixture::new_ambient(volume))
                    };
                    TileAtmosphere::new(grid, coord, air)
                });
                atmos.invalidate(coord);
            }
        }
        for &coord in &coords {
            self.update_adjacent(map, grid, coord);
            self.visual_updates
                .push(crate::engine::TileChanged { grid, tile: coord });
        }
        log::info!("repopulated {} tiles on grid {:?}", coords.len(), grid);
    }

    /// Carries tile state over to grids split off from `original`: any tile
    /// a new grid's map defines that the original simulated gets its air and
    /// fire state cloned, and both sides are invalidated for revalidation.
    pub fn on_grid_split(
        &mut self,
        original: GridId,
        new_grids: &[GridId],
        provider: &dyn TopologyProvider,
    ) {
        for &new_grid in new_grids {
            let Some(map) = provider.grid_map(new_grid) else {
                continue;
            };
            self.add_grid(new_grid);

            let mut moved = Vec::new();
            if let Some(source) = self.grids.get_mut(&original) {
                for coord in map.all_tiles() {
                    let Some(tile) = source.tiles.get(&coord) else {
                        continue;
                    };
                    moved.push((coord, tile.clone()));
                    source.invalidate(coord);
                }
            }

            let Some(target) = self.grids.get_mut(&new_grid) else {
                continue;
            };
            for (coord, source_tile) in moved {
                let tile = target
                    .tiles
                    .entry(coord)
                    .or_insert_with(|| TileAtmosphere::new(new_grid, coord, None));
                tile.grid = new_grid;
                tile.air = source_tile.air.clone();
                tile.hotspot = source_tile.hotspot;
                tile.heat_capacity_structure = source_tile.heat_capacity_structure;
                tile.pressure_difference_kpa = source_tile.pressure_difference_kpa;
                tile.pressure_direction = source_tile.pressure_direction;
                if tile.hotspot.valid {
                    target.hotspot_tiles.insert(coord);
                }
                target.invalidate(coord);
            }
            log::info!("grid {:?} split off from {:?}", new_grid, original);
        }
    }
}

fn clear_stale_pressure_direction(tile: &mut TileAtmosphere) {
    if !tile.pressure_direction.is_empty()
        && !tile.adjacent_bits.contains(tile.pressure_direction)
    {
        tile.pressure_direction = AtmosDirection::empty();
        tile.pressure_difference_kpa = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::topology::{AirtightData, StaticGridMap};

    #[test]
    fn blocked_directions_union_obstructions() {
        let mut map = StaticGridMap::new();
        map.insert_tile(IVec2::ZERO);
        map.place_airtight(
            IVec2::ZERO,
            AirtightData {
                air_blocked: true,
                blocked_direction: AtmosDirection::NORTH,
                fix_vacuum: false,
            },
        );
        map.place_airtight(
            IVec2::ZERO,
            AirtightData {
                air_blocked: true,
                blocked_direction: AtmosDirection::EAST,
                fix_vacuum: false,
            },
        );
        map.place_airtight(
            IVec2::ZERO,
            AirtightData {
                air_blocked: false,
                blocked_direction: AtmosDirection::WEST,
                fix_vacuum: false,
            },
        );
        assert_eq!(
            blocked_directions(&map, IVec2::ZERO),
            AtmosDirection::NORTH | AtmosDirection::EAST
        );
    }

    #[test]
    fn neighbor_obstruction_blocks_from_both_sides() {
        let mut map = StaticGridMap::new();
        map.fill_rect(IVec2::ZERO, IVec2::new(1, 0));
        map.place_airtight(
            IVec2::new(1, 0),
            AirtightData {
                air_blocked: true,
                blocked_direction: AtmosDirection::WEST,
                fix_vacuum: false,
            },
        );
        // The east neighbor blocks west, so flowing east out of the origin
        // is blocked even though the origin itself is clear.
        assert!(is_tile_air_blocked(&map, IVec2::ZERO, AtmosDirection::EAST));
        assert!(is_tile_air_blocked(
            &map,
            IVec2::new(1, 0),
            AtmosDirection::WEST
        ));
        assert!(!is_tile_air_blocked(
            &map,
            IVec2::ZERO,
            AtmosDirection::WEST
        ));
    }

    #[test]
    fn vacuum_fixing_flag_is_per_tile() {
        let mut map = StaticGridMap::new();
        map.insert_tile(IVec2::ZERO);
        assert!(!needs_vacuum_fixing(&map, IVec2::ZERO));
        map.place_airtight(IVec2::ZERO, AirtightData::default());
        assert!(needs_vacuum_fixing(&map, IVec2::ZERO));
    }
}
