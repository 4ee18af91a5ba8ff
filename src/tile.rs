use crate::constants::{DIRECTIONS, MINIMUM_HEAT_CAPACITY};
use crate::direction::AtmosDirection;
use crate::excited_group::ExcitedGroupId;
use crate::mixture::GasMixture;
use crate::topology::GridId;
use glam::IVec2;

/// Live fire state on one tile. `valid` gates everything else.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Hotspot {
    pub valid: bool,
    pub temperature_k: f64,
    pub volume_l: f64,
    /// Set on ignition so a hotspot never burns on the tick it was created.
    pub skip_process: bool,
    /// The fire has engulfed essentially the whole tile mixture.
    pub bypassing: bool,
}

/// Per-tile simulation state. `air` is `None` for space tiles, whose gas is
/// untracked and acts as an infinite sink.
#[derive(Debug, Clone)]
pub struct TileAtmosphere {
    pub grid: GridId,
    pub indices: IVec2,
    pub air: Option<GasMixture>,
    /// Neighbor tile keys by cardinal index, open or not. `None` only when
    /// adjacency has not been computed yet or the neighbor is off-map.
    pub adjacent: [Option<IVec2>; DIRECTIONS],
    /// Directions airflow is actually open, after both sides' obstructions.
    pub adjacent_bits: AtmosDirection,
    /// Directions this tile itself blocks, from its own obstructions.
    pub blocked_airflow: AtmosDirection,
    pub excited: bool,
    pub excited_group: Option<ExcitedGroupId>,
    pub hotspot: Hotspot,
    /// Non-gas heat capacity of the tile structure itself, J/K.
    pub heat_capacity_structure: f64,
    /// Dominant share result from the last processing pass, for visuals.
    pub pressure_difference_kpa: f64,
    pub pressure_direction: AtmosDirection,
}

impl TileAtmosphere {
    pub fn new(grid: GridId, indices: IVec2, air: Option<GasMixture>) -> TileAtmosphere {
        TileAtmosphere {
            grid,
            indices,
            air,
            adjacent: [None; DIRECTIONS],
            adjacent_bits: AtmosDirection::empty(),
            blocked_airflow: AtmosDirection::empty(),
            excited: false,
            excited_group: None,
            hotspot: Hotspot::default(),
            heat_capacity_structure: MINIMUM_HEAT_CAPACITY,
            pressure_difference_kpa: 0.0,
            pressure_direction: AtmosDirection::empty(),
        }
    }
}
