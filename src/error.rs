use glam::IVec2;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AtmosError {
    /// A snapshot tile pointed at a unique-mix slot that does not exist.
    #[error(
        "tile {tile} points to unique mix {index} but only {available} are defined"
    )]
    UnknownMixIndex {
        tile: IVec2,
        index: usize,
        available: usize,
    },

    #[error("failed to parse atmosphere snapshot: {0}")]
    SnapshotParse(#[from] serde_json::Error),
}
