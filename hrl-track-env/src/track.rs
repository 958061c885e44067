//! Tiles, tracks and the flattened map.
use crate::TrackError;
use serde::{Deserialize, Serialize};
use std::{collections::BTreeSet, ops::Range};

/// Global index of a tile in a [`TrackMap`].
pub type TileId = usize;

/// Position and orientation of a tile.
///
/// `beta` is the heading of a car driving forward on the tile. The lateral
/// axis of the road is `(cos beta, sin beta)`, pointing from the left lane to
/// the right lane of forward travel.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    /// Angle of the tile around the map center.
    pub alpha: f64,

    /// Heading.
    pub beta: f64,

    /// X coordinate.
    pub x: f64,

    /// Y coordinate.
    pub y: f64,
}

impl Pose {
    /// Distance from the map origin.
    pub fn radius(&self) -> f64 {
        self.x.hypot(self.y)
    }

    /// Unit vector of the lateral axis.
    pub fn lateral(&self) -> (f64, f64) {
        (self.beta.cos(), self.beta.sin())
    }
}

/// A lane of a track, named after forward travel.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Lane {
    /// Lane 0.
    Left,

    /// Lane 1.
    Right,
}

impl Lane {
    /// Lane number, 0 for left and 1 for right.
    pub fn index(self) -> usize {
        match self {
            Self::Left => 0,
            Self::Right => 1,
        }
    }

    /// Inverse of [`Lane::index`].
    pub fn from_index(ix: usize) -> Option<Self> {
        match ix {
            0 => Some(Self::Left),
            1 => Some(Self::Right),
            _ => None,
        }
    }

    /// Sign of the lateral offset of the lane along [`Pose::lateral`].
    pub fn offset_sign(self) -> f64 {
        match self {
            Self::Left => -1.0,
            Self::Right => 1.0,
        }
    }

    /// The opposite lane.
    pub fn other(self) -> Self {
        match self {
            Self::Left => Self::Right,
            Self::Right => Self::Left,
        }
    }
}

/// A tile with its topology flags and contact counters.
///
/// The counters are written by the simulator every physics step. The
/// `*_delay` counters hold their values as of the end of the previous
/// environment step.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Tile {
    /// Track the tile belongs to. Set by [`TrackMap::new`].
    pub track_id: usize,

    /// Intersection the tile is part of.
    pub intersection_id: Option<u32>,

    /// First tile of a track that does not continue backward.
    pub is_start: bool,

    /// Last tile of a track that does not continue forward.
    pub is_end: bool,

    /// Part of a T-junction.
    pub is_turn_tile: bool,

    /// Part of an X-junction.
    pub is_cross_tile: bool,

    /// Already credited with progress reward in this episode.
    pub visited: bool,

    /// Contacts on the left lane.
    pub count_left: u32,

    /// Contacts on the right lane.
    pub count_right: u32,

    /// `count_left` at the end of the previous step.
    pub count_left_delay: u32,

    /// `count_right` at the end of the previous step.
    pub count_right_delay: u32,

    /// Geometry.
    pub pose: Pose,
}

impl Tile {
    /// A plain road tile.
    pub fn new(pose: Pose) -> Self {
        Self {
            pose,
            ..Default::default()
        }
    }

    /// Puts the tile in an intersection.
    pub fn intersection(mut self, id: u32) -> Self {
        self.intersection_id = Some(id);
        self
    }

    /// Marks the tile as part of a T-junction.
    pub fn turn_tile(mut self) -> Self {
        self.is_turn_tile = true;
        self
    }

    /// Marks the tile as part of an X-junction.
    pub fn cross_tile(mut self) -> Self {
        self.is_cross_tile = true;
        self
    }

    /// Marks the tile as the dead start of its track.
    pub fn start_tile(mut self) -> Self {
        self.is_start = true;
        self
    }

    /// Marks the tile as the dead end of its track.
    pub fn end_tile(mut self) -> Self {
        self.is_end = true;
        self
    }

    /// Whether the tile belongs to an intersection.
    pub fn in_intersection(&self) -> bool {
        self.intersection_id.is_some()
    }

    /// Whether any lane is in contact with the agent.
    pub fn contacted(&self) -> bool {
        self.count_left > 0 || self.count_right > 0
    }

    /// Whether any lane was in contact at the end of the previous step.
    pub fn was_contacted(&self) -> bool {
        self.count_left_delay > 0 || self.count_right_delay > 0
    }

    /// Whether the given lane is in contact with the agent.
    pub fn lane_contacted(&self, lane: Lane) -> bool {
        match lane {
            Lane::Left => self.count_left > 0,
            Lane::Right => self.count_right > 0,
        }
    }

    /// Whether both lanes are in contact with the agent.
    pub fn both_lanes_contacted(&self) -> bool {
        self.count_left > 0 && self.count_right > 0
    }

    fn clear_episode_state(&mut self) {
        self.visited = false;
        self.count_left = 0;
        self.count_right = 0;
        self.count_left_delay = 0;
        self.count_right_delay = 0;
    }
}

/// The tiles of all tracks of a map in one index space.
///
/// Track `k` occupies the global indices `offset(k)..offset(k) + len(k)`
/// where `offset(k)` is the number of tiles of the tracks before it. Tracks
/// are circular, so walking along a track wraps modulo its length.
#[derive(Clone, Debug, PartialEq)]
pub struct TrackMap {
    tiles: Vec<Tile>,
    offsets: Vec<usize>,
    lens: Vec<usize>,
}

impl TrackMap {
    /// Flattens tracks into a map, overwriting the `track_id` of every tile.
    pub fn new(tracks: Vec<Vec<Tile>>) -> Result<Self, TrackError> {
        if tracks.is_empty() {
            return Err(TrackError::EmptyMap);
        }

        let mut tiles = Vec::with_capacity(tracks.iter().map(Vec::len).sum());
        let mut offsets = Vec::with_capacity(tracks.len());
        let mut lens = Vec::with_capacity(tracks.len());

        for (track_id, track) in tracks.into_iter().enumerate() {
            if track.is_empty() {
                return Err(TrackError::EmptyTrack(track_id));
            }
            offsets.push(tiles.len());
            lens.push(track.len());
            tiles.extend(track.into_iter().map(|mut tile| {
                tile.track_id = track_id;
                tile
            }));
        }

        Ok(Self {
            tiles,
            offsets,
            lens,
        })
    }

    /// Number of tiles over all tracks.
    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    /// Always false, a map has at least one tile.
    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    /// Returns a tile.
    pub fn tile(&self, id: TileId) -> Result<&Tile, TrackError> {
        let len = self.len();
        self.tiles
            .get(id)
            .ok_or(TrackError::TileOutOfRange { tile: id, len })
    }

    /// Returns a tile for updating its contact counters.
    pub fn tile_mut(&mut self, id: TileId) -> Result<&mut Tile, TrackError> {
        let len = self.len();
        self.tiles
            .get_mut(id)
            .ok_or(TrackError::TileOutOfRange { tile: id, len })
    }

    /// All tiles in global order.
    pub fn tiles(&self) -> &[Tile] {
        &self.tiles
    }

    /// All tiles in global order.
    pub fn tiles_mut(&mut self) -> &mut [Tile] {
        &mut self.tiles
    }

    /// Number of tiles of a track.
    ///
    /// Panics if the track does not exist.
    pub fn track_len(&self, track: usize) -> usize {
        self.lens[track]
    }

    /// Global indices of a track.
    pub fn track_range(&self, track: usize) -> Range<TileId> {
        self.offsets[track]..self.offsets[track] + self.lens[track]
    }

    /// Converts a global index into `(track, local index)`.
    pub fn to_local(&self, id: TileId) -> Result<(usize, usize), TrackError> {
        let track = self.tile(id)?.track_id;
        Ok((track, id - self.offsets[track]))
    }

    /// Converts a local index into a global one, wrapping around the track.
    pub fn to_global(&self, track: usize, local: i64) -> TileId {
        let len = self.lens[track] as i64;
        self.offsets[track] + local.rem_euclid(len) as usize
    }

    /// The tile `steps` tiles after `id` on its track (before it if negative).
    pub fn advance(&self, id: TileId, steps: i64) -> Result<TileId, TrackError> {
        let (track, local) = self.to_local(id)?;
        Ok(self.to_global(track, local as i64 + steps))
    }

    /// Indices of all tiles that are part of an intersection.
    pub fn intersection_tiles(&self) -> BTreeSet<TileId> {
        self.filter(Tile::in_intersection).into_iter().collect()
    }

    /// Indices of the tiles of an intersection, in global order.
    pub fn tiles_in_intersection(&self, intersection_id: u32) -> Vec<TileId> {
        self.filter(|tile| tile.intersection_id == Some(intersection_id))
    }

    /// Indices of the tiles satisfying a predicate, in global order.
    pub fn filter(&self, pred: impl Fn(&Tile) -> bool) -> Vec<TileId> {
        self.tiles
            .iter()
            .enumerate()
            .filter(|(_, tile)| pred(tile))
            .map(|(id, _)| id)
            .collect()
    }

    /// Orientation of a track: `1` counter-clockwise, `-1` clockwise, `0` degenerate.
    ///
    /// This is the sign of the shoelace area of the polygon through the tile
    /// positions.
    pub fn winding(&self, track: usize) -> i32 {
        let tiles = &self.tiles[self.track_range(track)];
        let area: f64 = tiles
            .iter()
            .zip(tiles.iter().cycle().skip(1))
            .map(|(p, q)| p.pose.x * q.pose.y - q.pose.x * p.pose.y)
            .sum();
        if area > 0.0 {
            1
        } else if area < 0.0 {
            -1
        } else {
            0
        }
    }

    /// Clears visited flags and contact counters.
    pub fn clear_episode_state(&mut self) {
        self.tiles.iter_mut().for_each(Tile::clear_episode_state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(n: usize) -> Vec<Tile> {
        (0..n)
            .map(|i| {
                Tile::new(Pose {
                    x: i as f64,
                    ..Default::default()
                })
            })
            .collect()
    }

    #[test]
    fn test_local_and_global_indices_are_inverse() -> anyhow::Result<()> {
        let map = TrackMap::new(vec![line(5), line(3), line(4)])?;

        for id in 0..map.len() {
            let (track, local) = map.to_local(id)?;
            assert_eq!(map.tile(id)?.track_id, track);
            assert_eq!(map.to_global(track, local as i64), id);
        }
        assert_eq!(map.to_local(6)?, (1, 1));
        Ok(())
    }

    #[test]
    fn test_advance_wraps_within_track() -> anyhow::Result<()> {
        let map = TrackMap::new(vec![line(5), line(3)])?;

        assert_eq!(map.advance(7, 1)?, 5);
        assert_eq!(map.advance(5, -1)?, 7);
        assert_eq!(map.advance(0, -6)?, 4);
        assert_eq!(map.advance(2, 10)?, 2);
        Ok(())
    }

    #[test]
    fn test_invalid_maps() {
        assert_eq!(TrackMap::new(vec![]), Err(TrackError::EmptyMap));
        assert_eq!(
            TrackMap::new(vec![line(2), vec![]]),
            Err(TrackError::EmptyTrack(1))
        );

        let map = TrackMap::new(vec![line(2)]).unwrap();
        assert_eq!(
            map.tile(2).err(),
            Some(TrackError::TileOutOfRange { tile: 2, len: 2 })
        );
    }

    #[test]
    fn test_winding() -> anyhow::Result<()> {
        let square = |ccw: bool| {
            let mut pts = vec![(1., 1.), (-1., 1.), (-1., -1.), (1., -1.)];
            if !ccw {
                pts.reverse();
            }
            pts.into_iter()
                .map(|(x, y)| {
                    Tile::new(Pose {
                        x,
                        y,
                        ..Default::default()
                    })
                })
                .collect::<Vec<_>>()
        };
        let map = TrackMap::new(vec![square(true), square(false), line(4)])?;

        assert_eq!(map.winding(0), 1);
        assert_eq!(map.winding(1), -1);
        assert_eq!(map.winding(2), 0);
        Ok(())
    }

    #[test]
    fn test_clear_episode_state() -> anyhow::Result<()> {
        let mut map = TrackMap::new(vec![line(3)])?;
        {
            let tile = map.tile_mut(1)?;
            tile.visited = true;
            tile.count_left = 2;
            tile.count_right_delay = 1;
        }

        map.clear_episode_state();

        assert!(map.tiles().iter().all(|t| !t.visited && !t.contacted() && !t.was_contacted()));
        Ok(())
    }
}
