//! Errors in the library.
//!
//! A sampler that cannot build an episode on the current map is not an error:
//! it returns `Ok(None)` and the environment regenerates the map. The types
//! below are for broken invariants only.
use crate::TileId;
use thiserror::Error;

/// Errors raised while reading the topology of a map.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TrackError {
    /// A direction outside of `{-1, 0, 1}`.
    #[error("Invalid direction {0}, expected one of -1, 0 or 1")]
    InvalidDirection(i32),

    /// Both directions were given where a direction of travel is needed.
    #[error("A direction of travel is required, got both directions")]
    NoTravelDirection,

    /// A search window of zero tiles.
    #[error("The search window must span at least one tile")]
    ZeroWindow,

    /// A tile index past the end of the map.
    #[error("Tile {tile} is out of range, the map has {len} tiles")]
    TileOutOfRange {
        /// Requested tile.
        tile: TileId,
        /// Number of tiles in the map.
        len: usize,
    },

    /// The tile does not belong to any intersection.
    #[error("Tile {0} is not part of an intersection")]
    NotAnIntersection(TileId),

    /// The tiles of an intersection cover a whole track, so there is no way out of it.
    #[error("Intersection {0} covers a whole track")]
    DegenerateIntersection(u32),

    /// A track without tiles.
    #[error("Track {0} has no tiles")]
    EmptyTrack(usize),

    /// A map without tracks.
    #[error("The map has no tracks")]
    EmptyMap,
}

/// Errors raised by task environments.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TaskError {
    /// No map with the topology required by the task was found.
    #[error("No valid episode could be sampled in {0} attempts")]
    ResetExhausted(usize),

    /// A high-level action without a sub-policy.
    #[error("High-level action {choice} is out of range, there are {n} sub-policies")]
    ChoiceOutOfRange {
        /// Received action.
        choice: usize,
        /// Number of sub-policies.
        n: usize,
    },

    /// A high-level action sent to an environment that only takes raw controls.
    #[error("Task {0} does not accept high-level actions")]
    NotHighLevel(String),

    /// The sub-policy behind a high-level action was never registered.
    #[error("Sub-policy {0} is not registered")]
    MissingSubPolicy(String),

    /// A sub-policy name the task does not define.
    #[error("Task has no sub-policy named {0}")]
    UnknownSubPolicy(String),

    /// A step before the first reset.
    #[error("The environment must be reset before stepping")]
    NotReset,

    /// A configuration value outside of its domain.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}
