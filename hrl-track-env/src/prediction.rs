//! Tiles relevant to the progress of the current task.
use crate::TileId;

/// A predicted tile with the direction of travel expected on each lane.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PredictionEntry {
    /// Tile.
    pub tile: TileId,

    /// Expected direction of travel (`1` or `-1`) on lane 0 and lane 1.
    pub lanes: [i64; 2],
}

/// Ordered tiles whose contact counts as progress.
///
/// The set is built when an episode is sampled and stays the same until the
/// next reset. The last entry of a turn task is its goal.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PredictionSet {
    entries: Vec<PredictionEntry>,
}

impl PredictionSet {
    /// An empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a tile expecting travel in `direction` on both lanes.
    pub fn push(&mut self, tile: TileId, direction: i64) {
        self.entries.push(PredictionEntry {
            tile,
            lanes: [direction, direction],
        });
    }

    /// Appends tiles expecting travel in `direction` on both lanes.
    pub fn extend(&mut self, tiles: impl IntoIterator<Item = TileId>, direction: i64) {
        tiles.into_iter().for_each(|tile| self.push(tile, direction));
    }

    /// Whether the tile is predicted.
    pub fn contains(&self, tile: TileId) -> bool {
        self.entries.iter().any(|e| e.tile == tile)
    }

    /// Predicted tiles in insertion order, possibly with repetitions.
    pub fn tiles(&self) -> impl Iterator<Item = TileId> + '_ {
        self.entries.iter().map(|e| e.tile)
    }

    /// The last entry.
    pub fn last(&self) -> Option<&PredictionEntry> {
        self.entries.last()
    }

    /// All entries.
    pub fn entries(&self) -> &[PredictionEntry] {
        &self.entries
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether there is no entry.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
