//! Contact and prediction tracking.
use crate::{PredictionSet, TileId, TrackMap};

/// Tracks the contacts of the agent against the predictions and the goal of
/// the current episode.
///
/// The tracker owns no contact state: the counters live in the tiles of the
/// [`TrackMap`] and are read fresh at every call. [`ContactTracker::commit`]
/// closes a step by marking the contacted tiles as visited and snapshotting
/// the counters into their `*_delay` fields.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ContactTracker {
    predictions: PredictionSet,
    goal: Option<TileId>,
}

impl ContactTracker {
    /// A tracker for an episode.
    pub fn new(predictions: PredictionSet, goal: Option<TileId>) -> Self {
        Self { predictions, goal }
    }

    /// Predicted tiles.
    pub fn predictions(&self) -> &PredictionSet {
        &self.predictions
    }

    /// Goal tile.
    pub fn goal(&self) -> Option<TileId> {
        self.goal
    }

    /// Whether the agent is on the goal tile.
    pub fn goal_contacted(&self, map: &TrackMap) -> bool {
        self.goal
            .and_then(|goal| map.tiles().get(goal))
            .map_or(false, |tile| tile.contacted())
    }

    /// Contacted tiles that are predicted and not visited yet.
    pub fn progress_tiles(&self, map: &TrackMap) -> Vec<TileId> {
        map.filter(|tile| tile.contacted() && !tile.visited)
            .into_iter()
            .filter(|&id| self.predictions.contains(id))
            .collect()
    }

    /// Whether the agent reached a new predicted tile.
    pub fn made_progress(&self, map: &TrackMap) -> bool {
        !self.progress_tiles(map).is_empty()
    }

    /// Whether the agent is on any predicted tile, visited or not.
    pub fn touches_prediction(&self, map: &TrackMap) -> bool {
        self.contacted(map)
            .into_iter()
            .any(|id| self.predictions.contains(id))
    }

    /// Whether the agent touches no tile at all.
    pub fn off_track(&self, map: &TrackMap) -> bool {
        !map.tiles().iter().any(|tile| tile.contacted())
    }

    /// Tiles in contact with the agent.
    pub fn contacted(&self, map: &TrackMap) -> Vec<TileId> {
        map.filter(|tile| tile.contacted())
    }

    /// Tiles in contact now that were not at the end of the previous step.
    pub fn newly_contacted(&self, map: &TrackMap) -> Vec<TileId> {
        map.filter(|tile| tile.contacted() && !tile.was_contacted())
    }

    /// Number of visited tiles.
    pub fn visited_count(&self, map: &TrackMap) -> usize {
        map.tiles().iter().filter(|tile| tile.visited).count()
    }

    /// Marks the contacted tiles as visited and snapshots the counters.
    ///
    /// Calling it again without new contacts changes nothing.
    pub fn commit(&self, map: &mut TrackMap) {
        for tile in map.tiles_mut() {
            if tile.contacted() {
                tile.visited = true;
            }
            tile.count_left_delay = tile.count_left;
            tile.count_right_delay = tile.count_right;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Pose, Tile};

    fn map() -> TrackMap {
        TrackMap::new(vec![vec![Tile::new(Pose::default()); 6]]).unwrap()
    }

    fn tracker() -> ContactTracker {
        let mut predictions = PredictionSet::new();
        predictions.extend([1, 2, 3], 1);
        ContactTracker::new(predictions, Some(3))
    }

    #[test]
    fn test_progress_requires_unvisited_predicted_contact() -> anyhow::Result<()> {
        let mut map = map();
        let tracker = tracker();
        assert!(tracker.off_track(&map));

        map.tile_mut(4)?.count_left = 1;
        assert!(!tracker.made_progress(&map));
        assert!(!tracker.touches_prediction(&map));
        assert!(!tracker.off_track(&map));

        map.tile_mut(1)?.count_right = 1;
        assert_eq!(tracker.progress_tiles(&map), vec![1]);

        tracker.commit(&mut map);
        assert!(!tracker.made_progress(&map));
        assert!(tracker.touches_prediction(&map));
        assert_eq!(tracker.visited_count(&map), 2);
        Ok(())
    }

    #[test]
    fn test_goal_contact() -> anyhow::Result<()> {
        let mut map = map();
        let tracker = tracker();
        assert!(!tracker.goal_contacted(&map));

        map.tile_mut(3)?.count_left = 2;
        assert!(tracker.goal_contacted(&map));
        assert!(!ContactTracker::default().goal_contacted(&map));
        Ok(())
    }

    #[test]
    fn test_newly_contacted() -> anyhow::Result<()> {
        let mut map = map();
        let tracker = tracker();

        map.tile_mut(1)?.count_left = 1;
        assert_eq!(tracker.newly_contacted(&map), vec![1]);

        tracker.commit(&mut map);
        map.tile_mut(2)?.count_right = 1;
        assert_eq!(tracker.newly_contacted(&map), vec![2]);
        assert_eq!(tracker.contacted(&map), vec![1, 2]);
        Ok(())
    }

    #[test]
    fn test_commit_is_idempotent() -> anyhow::Result<()> {
        let mut map = map();
        let tracker = tracker();
        map.tile_mut(2)?.count_left = 3;
        map.tile_mut(5)?.count_right = 1;

        tracker.commit(&mut map);
        let once = map.clone();
        tracker.commit(&mut map);

        assert_eq!(map, once);
        assert_eq!(map.tile(2)?.count_left_delay, 3);
        assert!(map.tile(5)?.visited);
        Ok(())
    }
}
