use crate::airtight::needs_vacuum_fixing;
use crate::direction::AtmosDirection;
use crate::engine::{AtmosphereEngine, TileChanged};
use crate::excited_group::ExcitedGroupId;
use crate::mixture::{GasMixture, SPACE_GAS};
use crate::reactions::ReactionResult;
use crate::tile::{Hotspot, TileAtmosphere};
use crate::topology::{GridId, TopologyProvider};
use colored::Colorize;
use glam::IVec2;
use std::time::Instant;

impl AtmosphereEngine {
    /// Runs one full simulation pass over every grid: revalidation, active
    /// tile diffusion, excited group aging, hotspots, then devices. Phase
    /// durations are recorded for `tick_report`.
    pub fn tick(&mut self, provider: &dyn TopologyProvider) {
        self.phase_timings.clear();
        let grids: Vec<GridId> = self.grids.keys().copied().collect();

        let start = Instant::now();
        for &grid in &grids {
            self.process_revalidate(provider, grid);
        }
        self.phase_timings.push(("revalidate", start.elapsed()));

        let start = Instant::now();
        for &grid in &grids {
            self.process_active_tiles(grid);
        }
        self.phase_timings.push(("active tiles", start.elapsed()));

        let start = Instant::now();
        for &grid in &grids {
            self.process_excited_groups(grid);
        }
        self.phase_timings.push(("excited groups", start.elapsed()));

        let start = Instant::now();
        for &grid in &grids {
            self.process_hotspots(grid);
        }
        self.phase_timings.push(("hotspots", start.elapsed()));

        let start = Instant::now();
        for &grid in &grids {
            self.process_devices(grid);
        }
        self.phase_timings.push(("devices", start.elapsed()));

        self.tick_count += 1;
    }

    /// Reprocesses every tile invalidated since the last pass: adjacency is
    /// recomputed, space tiles drop their air, newly sealed tiles get either
    /// a repaired mixture or a vacuum, and the tile plus its open neighbors
    /// wake up.
    pub(crate) fn process_revalidate(&mut self, provider: &dyn TopologyProvider, grid: GridId) {
        let Some(map) = provider.grid_map(grid) else {
            return;
        };
        let coords: Vec<IVec2> = match self.grids.get_mut(&grid) {
            Some(atmos) => std::mem::take(&mut atmos.invalidated).into_iter().collect(),
            None => return,
        };

        for coord in coords {
            if let Some(atmos) = self.grids.get_mut(&grid) {
                atmos
                    .tiles
                    .entry(coord)
                    .or_insert_with(|| TileAtmosphere::new(grid, coord, None));
            }
            self.update_adjacent(map, grid, coord);

            if map.is_space(coord) {
                let Some(atmos) = self.grids.get_mut(&grid) else {
                    continue;
                };
                if let Some(tile) = atmos.tiles.get_mut(&coord) {
                    tile.air = None;
                    tile.hotspot = Hotspot::default();
                }
                atmos.hotspot_tiles.remove(&coord);
                atmos.remove_active_tile(coord, true);
                // A tile becoming space is a breach: everything that can now
                // vent through it has to wake up.
                for neighbor in atmos.open_neighbors(coord) {
                    atmos.add_active_tile(neighbor);
                }
            } else {
                let has_air = self
                    .grids
                    .get(&grid)
                    .and_then(|a| a.tiles.get(&coord))
                    .is_some_and(|t| t.air.is_some());
                if !has_air {
                    if needs_vacuum_fixing(map, coord) {
                        self.fix_vacuum(map, grid, coord);
                    } else if let Some(tile) = self
                        .grids
                        .get_mut(&grid)
                        .and_then(|a| a.tiles.get_mut(&coord))
                    {
                        // Sealed without repair: the tile starts as a vacuum
                        // and the neighbors vent into it.
                        tile.air = Some(GasMixture::new(Self::volume_for_tiles(map, 1)));
                    }
                }

                let Some(atmos) = self.grids.get_mut(&grid) else {
                    continue;
                };
                atmos.add_active_tile(coord);
                for neighbor in atmos.open_neighbors(coord) {
                    atmos.add_active_tile(neighbor);
                }
            }
            self.visual_updates.push(TileChanged { grid, tile: coord });
        }
    }

    /// Diffusion over the active set. Each active tile shares with its open
    /// neighbors, reacts, and records its dominant flow for visuals; pairs
    /// that come out converged join an excited group, and tiles with nowhere
    /// to flow go back to sleep.
    pub(crate) fn process_active_tiles(&mut self, grid: GridId) {
        let coords: Vec<IVec2> = match self.grids.get(&grid) {
            Some(atmos) => atmos.active_tiles.iter().copied().collect(),
            None => return,
        };
        for coord in coords {
            self.process_cell(grid, coord);
        }
    }

    fn process_cell(&mut self, grid: GridId, coord: IVec2) {
        let Some(atmos) = self.grids.get_mut(&grid) else {
            return;
        };
        let Some(tile) = atmos.tiles.get_mut(&coord) else {
            atmos.active_tiles.remove(&coord);
            return;
        };
        let adjacent = tile.adjacent;
        let adjacent_bits = tile.adjacent_bits;
        let Some(mut air) = tile.air.take() else {
            atmos.remove_active_tile(coord, false);
            return;
        };

        let open_count = adjacent_bits.bits().count_ones() as usize;
        if open_count == 0 {
            if let Some(tile) = atmos.tiles.get_mut(&coord) {
                tile.air = Some(air);
            }
            atmos.remove_active_tile(coord, true);
            return;
        }

        let mut moved_total = 0.0;
        let mut dominant_delta = 0.0_f64;
        let mut dominant_direction = AtmosDirection::empty();
        let mut wakes: Vec<IVec2> = Vec::new();
        let mut excites: Vec<IVec2> = Vec::new();

        for (index, direction) in AtmosDirection::CARDINALS.iter().enumerate() {
            if !adjacent_bits.contains(*direction) {
                continue;
            }
            let neighbor_air = match adjacent[index] {
                Some(neighbor) => atmos
                    .tiles
                    .get_mut(&neighbor)
                    .and_then(|t| t.air.as_mut())
                    .map(|neighbor_air| (neighbor, neighbor_air)),
                None => None,
            };
            match neighbor_air {
                Some((neighbor, neighbor_air)) => {
                    let pressure_delta = air.pressure_kpa() - neighbor_air.pressure_kpa();
                    let moved = air.share(neighbor_air, open_count);
                    moved_total += moved;
                    if pressure_delta.abs() > dominant_delta.abs() {
                        dominant_delta = pressure_delta;
                        dominant_direction = *direction;
                    }
                    if moved > self.config.minimum_moles_delta_to_move {
                        wakes.push(neighbor);
                    }
                    let post_pressure = (air.pressure_kpa() - neighbor_air.pressure_kpa()).abs();
                    let post_temperature =
                        (air.temperature_k() - neighbor_air.temperature_k()).abs();
                    if post_pressure < self.config.minimum_pressure_delta_to_suspend_kpa
                        && post_temperature < self.config.minimum_temperature_delta_to_suspend_k
                    {
                        excites.push(neighbor);
                    }
                }
                None => {
                    // Open edge into space: gas leaves and never comes back.
                    let mut sink = SPACE_GAS.clone();
                    moved_total += air.share(&mut sink, open_count);
                }
            }
        }

        let result = self.reactions.react(&mut air);

        if let Some(tile) = atmos.tiles.get_mut(&coord) {
            tile.air = Some(air);
            tile.pressure_difference_kpa = dominant_delta.abs();
            tile.pressure_direction = dominant_direction;
        }
        for neighbor in wakes {
            atmos.add_active_tile(neighbor);
        }
        for neighbor in excites {
            // Group membership implies being active; a sleeping neighbor
            // that converges with us wakes up on enrollment.
            atmos.add_active_tile(neighbor);
            atmos.excite_pair(coord, neighbor);
        }

        if moved_total > self.config.minimum_moles_delta_to_move
            || result == ReactionResult::Reacting
        {
            self.visual_updates.push(TileChanged { grid, tile: coord });
        }
    }

    /// Ages every excited group by one quiescent cycle. Old enough groups
    /// first have their mixtures averaged, then get dismantled outright.
    pub(crate) fn process_excited_groups(&mut self, grid: GridId) {
        let group_ids: Vec<ExcitedGroupId> = match self.grids.get(&grid) {
            Some(atmos) => atmos.excited_groups.keys().copied().collect(),
            None => return,
        };

        for group_id in group_ids {
            let Some(atmos) = self.grids.get_mut(&grid) else {
                return;
            };
            let Some(group) = atmos.excited_groups.get_mut(&group_id) else {
                continue;
            };
            group.breakdown_cooldown += 1;
            group.dismantle_cooldown += 1;
            let breakdown = group.breakdown_cooldown > self.config.excited_group_breakdown_cycles;
            let dismantle = group.dismantle_cooldown > self.config.excited_group_dismantle_cycles;

            let members = if dismantle {
                atmos.excited_group_dismantle(group_id)
            } else if breakdown {
                atmos.excited_group_self_breakdown(group_id)
            } else {
                Vec::new()
            };
            for member in members {
                self.visual_updates.push(TileChanged { grid, tile: member });
            }
        }
    }

    /// Device pass placeholder: nets and devices are tracked but have no
    /// simulation of their own yet.
    pub(crate) fn process_devices(&mut self, grid: GridId) {
        if let Some(atmos) = self.grids.get(&grid) {
            if !atmos.pipe_nets.is_empty() || !atmos.devices.is_empty() {
                log::trace!(
                    "grid {:?}: {} pipe nets, {} devices",
                    grid,
                    atmos.pipe_nets.len(),
                    atmos.devices.len()
                );
            }
        }
    }

    /// Human-readable timing breakdown of the last `tick`.
    pub fn tick_report(&self) -> String {
        let mut out = String::new();
        out.push_str(&format!(
            "{} {}\n",
            "tick".bold(),
            self.tick_count.to_string().cyan()
        ));
        let total: std::time::Duration = self.phase_timings.iter().map(|(_, d)| *d).sum();
        for (name, duration) in &self.phase_timings {
            out.push_str(&format!(
                "  {:>14}  {}\n",
                name.green(),
                format!("{:?}", duration).yellow()
            ));
        }
        out.push_str(&format!(
            "  {:>14}  {}\n",
            "total".bold(),
            format!("{total:?}").yellow()
        ));
        out
    }
}
