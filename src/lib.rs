pub mod airtight;
pub mod constants;
pub mod direction;
pub mod engine;
pub mod error;
pub mod excited_group;
pub mod gas;
pub mod grid;
pub mod hotspot;
pub mod mixture;
pub mod processing;
pub mod reactions;
pub mod tile;
pub mod topology;
