use crate::constants::{
    FIRE_GROWTH_FACTOR, FIRE_MINIMUM_TEMPERATURE_TO_EXIST_K,
    FIRE_MINIMUM_TEMPERATURE_TO_SPREAD_K, FIRE_SPREAD_RADIOSITY_SCALE,
    HOTSPOT_BYPASS_VOLUME_RATIO, HOTSPOT_IGNITION_VOLUME_RATIO, HOTSPOT_MINIMUM_FUEL_MOLES,
    HOTSPOT_MINIMUM_OXYGEN_MOLES, HOTSPOT_SPREAD_VOLUME_L, PLASMA_MINIMUM_BURN_TEMPERATURE_K,
};
use crate::direction::AtmosDirection;
use crate::engine::{AtmosphereEngine, TileChanged};
use crate::gas::GasId;
use crate::reactions::ReactionResult;
use crate::tile::Hotspot;
use crate::topology::GridId;
use glam::IVec2;

impl AtmosphereEngine {
    /// Exposes a tile to an external heat source. An existing hotspot soaks
    /// up the exposure when `strengthen_existing` is set; otherwise a new
    /// hotspot ignites if the exposure is hot enough and the tile holds both
    /// fuel and oxygen. Fresh hotspots skip their first processing pass.
    pub fn hotspot_expose(
        &mut self,
        grid: GridId,
        tile: IVec2,
        exposed_temperature_k: f64,
        exposed_volume_l: f64,
        strengthen_existing: bool,
    ) {
        let Some(atmos) = self.grids.get_mut(&grid) else {
            return;
        };
        let Some(t) = atmos.tiles.get_mut(&tile) else {
            return;
        };
        let Some(air) = t.air.as_ref() else {
            return;
        };

        let fuel = air.get_moles(GasId::Plasma) + air.get_moles(GasId::Tritium);
        let oxygen = air.get_moles(GasId::Oxygen);

        if t.hotspot.valid {
            if strengthen_existing && fuel > HOTSPOT_MINIMUM_FUEL_MOLES {
                t.hotspot.temperature_k = t.hotspot.temperature_k.max(exposed_temperature_k);
                t.hotspot.volume_l = t.hotspot.volume_l.max(exposed_volume_l);
            }
            return;
        }

        if exposed_temperature_k > PLASMA_MINIMUM_BURN_TEMPERATURE_K
            && fuel > HOTSPOT_MINIMUM_FUEL_MOLES
            && oxygen > HOTSPOT_MINIMUM_OXYGEN_MOLES
        {
            t.hotspot = Hotspot {
                valid: true,
                temperature_k: exposed_temperature_k,
                volume_l: exposed_volume_l * HOTSPOT_IGNITION_VOLUME_RATIO,
                skip_process: true,
                bypassing: false,
            };
            atmos.hotspot_tiles.insert(tile);
            atmos.invalidate(tile);
            atmos.add_active_tile(tile);
            self.visual_updates.push(TileChanged { grid, tile });
            log::debug!(
                "hotspot ignited at {:?}/{} ({} K)",
                grid,
                tile,
                exposed_temperature_k
            );
        }
    }

    /// Puts a hotspot out and clears its bookkeeping.
    pub fn hotspot_extinguish(&mut self, grid: GridId, tile: IVec2) {
        let Some(atmos) = self.grids.get_mut(&grid) else {
            return;
        };
        let mut was_valid = false;
        if let Some(t) = atmos.tiles.get_mut(&tile) {
            was_valid = t.hotspot.valid;
            t.hotspot = Hotspot::default();
        }
        atmos.hotspot_tiles.remove(&tile);
        atmos.invalidate(tile);
        if was_valid {
            self.visual_updates.push(TileChanged { grid, tile });
            log::debug!("hotspot extinguished at {:?}/{}", grid, tile);
        }
    }

    pub fn is_hotspot_active(&self, grid: GridId, tile: IVec2) -> bool {
        self.grids
            .get(&grid)
            .and_then(|a| a.tiles.get(&tile))
            .is_some_and(|t| t.hotspot.valid)
    }

    /// One processing pass over a grid's hotspots. Each sustained fire pulls
    /// its share of the tile air, burns it at the hotspot temperature,
    /// returns the products, grows, and radiates toward open neighbors once
    /// hot enough to spread.
    pub(crate) fn process_hotspots(&mut self, grid: GridId) {
        let coords: Vec<IVec2> = match self.grids.get(&grid) {
            Some(atmos) => atmos.hotspot_tiles.iter().copied().collect(),
            None => return,
        };

        let mut spreads: Vec<(IVec2, f64)> = Vec::new();
        for coord in coords {
            let mut extinguish = false;
            let mut burned = false;
            {
                let Some(atmos) = self.grids.get_mut(&grid) else {
                    return;
                };
                let Some(tile) = atmos.tiles.get_mut(&coord) else {
                    atmos.hotspot_tiles.remove(&coord);
                    continue;
                };
                if !tile.hotspot.valid {
                    atmos.hotspot_tiles.remove(&coord);
                    continue;
                }
                if tile.hotspot.skip_process {
                    tile.hotspot.skip_process = false;
                    continue;
                }

                let hotspot_temperature = tile.hotspot.temperature_k;
                let sustained = tile.air.as_ref().is_some_and(|air| {
                    air.get_moles(GasId::Oxygen) > HOTSPOT_MINIMUM_OXYGEN_MOLES
                        && (air.get_moles(GasId::Plasma) > HOTSPOT_MINIMUM_FUEL_MOLES
                            || air.get_moles(GasId::Tritium) > HOTSPOT_MINIMUM_FUEL_MOLES)
                        && hotspot_temperature > FIRE_MINIMUM_TEMPERATURE_TO_EXIST_K
                });
                if !sustained {
                    extinguish = true;
                } else if let Some(air) = tile.air.as_mut() {
                    tile.hotspot.bypassing =
                        tile.hotspot.volume_l > air.volume_l() * HOTSPOT_BYPASS_VOLUME_RATIO;
                    let ratio = if tile.hotspot.bypassing {
                        1.0
                    } else {
                        (tile.hotspot.volume_l / air.volume_l()).clamp(0.0, 1.0)
                    };

                    // Burn only the slice of the tile the fire occupies.
                    let mut affected = air.remove_ratio(ratio);
                    affected.set_temperature_k(tile.hotspot.temperature_k);
                    let result = self.reactions.react(&mut affected);
                    tile.hotspot.temperature_k = affected.temperature_k();
                    air.merge(&affected);

                    if result == ReactionResult::NoReaction {
                        extinguish = true;
                    } else {
                        burned = true;
                        tile.hotspot.volume_l =
                            (tile.hotspot.volume_l * FIRE_GROWTH_FACTOR).min(air.volume_l());
                        if tile.hotspot.temperature_k > FIRE_MINIMUM_TEMPERATURE_TO_SPREAD_K {
                            let exposure =
                                tile.hotspot.temperature_k * FIRE_SPREAD_RADIOSITY_SCALE;
                            for (index, direction) in
                                AtmosDirection::CARDINALS.iter().enumerate()
                            {
                                if !tile.adjacent_bits.contains(*direction) {
                                    continue;
                                }
                                if let Some(neighbor) = tile.adjacent[index] {
                                    spreads.push((neighbor, exposure));
                                }
                            }
                        }
                    }
                }
            }

            if extinguish {
                self.hotspot_extinguish(grid, coord);
            } else if burned {
                self.add_active_tile(grid, coord);
                self.invalidate_tile(grid, coord);
                self.visual_updates.push(TileChanged { grid, tile: coord });
            }
        }

        for (neighbor, exposure) in spreads {
            self.hotspot_expose(grid, neighbor, exposure, HOTSPOT_SPREAD_VOLUME_L, true);
        }
    }
}
