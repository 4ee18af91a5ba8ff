// Physical constants and tuning thresholds for the tile atmosphere simulation.
// All temperatures are Kelvin, pressures kPa, volumes liters, quantities moles.

pub const R_KPA_L_PER_MOL_K: f64 = 8.314462618; // ideal gas constant, kPa·L/(mol·K)
pub const ONE_ATMOSPHERE_KPA: f64 = 101.325;
pub const T0C: f64 = 273.15; // K
pub const T20C: f64 = 293.15; // K, default habitable temperature
pub const TCMB: f64 = 2.7; // cosmic microwave background, absolute temperature floor

pub const CELL_VOLUME_L: f64 = 2500.0; // air volume of one tile at tile size 1
pub const MOLES_CELL_STANDARD: f64 =
    ONE_ATMOSPHERE_KPA * CELL_VOLUME_L / (T20C * R_KPA_L_PER_MOL_K);

// Cardinal directions only. Cross-Z atmospherics is an explicit future TODO.
pub const DIRECTIONS: usize = 4;

// Heat capacity floors (J/K). A mixture never reports less than the minimum,
// which also guards every energy/capacity division in the crate.
pub const MINIMUM_HEAT_CAPACITY: f64 = 0.0003;
pub const SPACE_HEAT_CAPACITY: f64 = 7000.0;

// Below this quantity a species is treated as not present at all.
pub const GAS_MIN_MOLES: f64 = 0.00000005;

// Active-tile scheduling thresholds. A share that moves less than
// MINIMUM_MOLES_DELTA_TO_MOVE does not wake the receiving tile, and a pair of
// tiles whose post-share deltas fall inside the suspend window is considered
// converged and joins an excited group.
pub const MINIMUM_MOLES_DELTA_TO_MOVE: f64 = 0.01;
pub const MINIMUM_PRESSURE_DELTA_TO_SUSPEND_KPA: f64 = 0.5;
pub const MINIMUM_TEMPERATURE_DELTA_TO_SUSPEND_K: f64 = 4.0;

// Excited group cadence, in quiescent ticks. Breakdown averages the member
// mixtures; dismantle deactivates the members and disposes the group.
pub const EXCITED_GROUP_BREAKDOWN_CYCLES: u32 = 4;
pub const EXCITED_GROUP_DISMANTLE_CYCLES: u32 = 16;

// Fire / hotspot thresholds.
pub const FIRE_MINIMUM_TEMPERATURE_TO_EXIST_K: f64 = T0C + 100.0;
pub const FIRE_MINIMUM_TEMPERATURE_TO_SPREAD_K: f64 = T0C + 200.0;
pub const FIRE_SPREAD_RADIOSITY_SCALE: f64 = 0.85; // neighbor exposure fraction
pub const FIRE_GROWTH_FACTOR: f64 = 1.25; // per-tick hotspot volume growth while sustained
pub const HOTSPOT_IGNITION_VOLUME_RATIO: f64 = 0.25; // fresh hotspot share of exposed volume
pub const HOTSPOT_BYPASS_VOLUME_RATIO: f64 = 0.95; // past this, the fire engulfs the tile
pub const HOTSPOT_MINIMUM_FUEL_MOLES: f64 = 0.5;
pub const HOTSPOT_MINIMUM_OXYGEN_MOLES: f64 = 0.5;
pub const HOTSPOT_SPREAD_VOLUME_L: f64 = CELL_VOLUME_L / 4.0;

// Plasma combustion.
pub const PLASMA_MINIMUM_BURN_TEMPERATURE_K: f64 = T0C + 100.0;
pub const PLASMA_UPPER_TEMPERATURE_K: f64 = T0C + 1370.0;
pub const PLASMA_OXYGEN_FULLBURN: f64 = 10.0; // oxygen:plasma ratio for a full burn
pub const PLASMA_BURN_RATE_DELTA: f64 = 9.0;
pub const OXYGEN_BURN_RATE_BASE: f64 = 1.4;
pub const FIRE_PLASMA_ENERGY_RELEASED_J_PER_MOL: f64 = 3_000_000.0;

// Tritium combustion (T + ½O₂ → H₂O equivalent).
pub const TRITIUM_OXYGEN_RATIO: f64 = 0.5; // moles of oxygen per mole of tritium burned
pub const FIRE_TRITIUM_ENERGY_RELEASED_J_PER_MOL: f64 = 280_000.0;

// "Probably safe" habitability window, checked by point queries only.
pub const WARNING_LOW_PRESSURE_KPA: f64 = 50.0;
pub const WARNING_HIGH_PRESSURE_KPA: f64 = 325.0;
pub const SAFE_TEMPERATURE_MIN_K: f64 = 260.0;
pub const SAFE_TEMPERATURE_MAX_K: f64 = 360.0;
