//! Intersection analyzer.
use crate::{TileId, TrackError, TrackMap};
use serde::{Deserialize, Serialize};
use std::{collections::BTreeSet, convert::TryFrom};

/// Number of tiles walked along a branch to locate it relative to the approach.
const BRANCH_PROBE_TILES: usize = 4;

/// Direction along a track.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    /// Increasing local index.
    Forward,

    /// Decreasing local index.
    Backward,

    /// Both ways, only meaningful for searches.
    Both,
}

impl Direction {
    /// `1`, `-1` or `0`.
    pub fn sign(self) -> i64 {
        match self {
            Self::Forward => 1,
            Self::Backward => -1,
            Self::Both => 0,
        }
    }

    /// Direction of travel with the given sign, [`Direction::Both`] for zero.
    pub fn from_sign(sign: i64) -> Self {
        match sign {
            s if s > 0 => Self::Forward,
            s if s < 0 => Self::Backward,
            _ => Self::Both,
        }
    }
}

impl TryFrom<i32> for Direction {
    type Error = TrackError;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Self::Forward),
            -1 => Ok(Self::Backward),
            0 => Ok(Self::Both),
            v => Err(TrackError::InvalidDirection(v)),
        }
    }
}

/// Intersection tiles within `spaces` tiles of `tile` on its own track.
///
/// The window includes `tile` itself and wraps around the track. An empty set
/// means there is no intersection nearby.
pub fn close_intersections(
    map: &TrackMap,
    tile: TileId,
    spaces: usize,
    direction: Direction,
) -> Result<BTreeSet<TileId>, TrackError> {
    if spaces == 0 {
        return Err(TrackError::ZeroWindow);
    }
    let (track, local) = map.to_local(tile)?;
    let (local, spaces) = (local as i64, spaces as i64);

    let offsets = match direction {
        Direction::Forward => 0..=spaces,
        Direction::Backward => -spaces..=0,
        Direction::Both => -spaces..=spaces,
    };

    Ok(offsets
        .map(|o| map.to_global(track, local + o))
        .filter(|&id| map.tiles()[id].in_intersection())
        .collect())
}

/// Whether an intersection lies within `spaces` tiles of `tile`.
pub fn is_close_to_intersection(
    map: &TrackMap,
    tile: TileId,
    spaces: usize,
    direction: Direction,
) -> Result<bool, TrackError> {
    Ok(!close_intersections(map, tile, spaces, direction)?.is_empty())
}

/// A way out of an intersection: the first tile past the junction and the
/// direction to keep walking in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Branch {
    /// First tile after the intersection.
    pub tile: TileId,

    /// `1` or `-1`.
    pub step: i64,
}

impl Branch {
    /// The `i`-th tile along the branch, wrapping around its track.
    pub fn nth(&self, map: &TrackMap, i: usize) -> Result<TileId, TrackError> {
        map.advance(self.tile, self.step * i as i64)
    }

    /// The first `n` tiles along the branch.
    pub fn walk(&self, map: &TrackMap, n: usize) -> Result<Vec<TileId>, TrackError> {
        (0..n).map(|i| self.nth(map, i)).collect()
    }

    /// Direction of travel along the branch.
    pub fn direction(&self) -> Direction {
        Direction::from_sign(self.step)
    }
}

/// What a driver can do at an intersection.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Maneuver {
    /// Keep on the same track.
    Straight,

    /// Turn to the left.
    Left,

    /// Turn to the right.
    Right,
}

/// Ways out of an intersection as seen by a driver entering it.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct IntersectionBranches {
    /// Continue on the same track.
    pub straight: Option<Branch>,

    /// Turn left onto the other track.
    pub left: Option<Branch>,

    /// Turn right onto the other track.
    pub right: Option<Branch>,
}

impl IntersectionBranches {
    /// The branch of a maneuver.
    pub fn get(&self, maneuver: Maneuver) -> Option<Branch> {
        match maneuver {
            Maneuver::Straight => self.straight,
            Maneuver::Left => self.left,
            Maneuver::Right => self.right,
        }
    }
}

/// Resolves the exits of the intersection containing `tile` for a driver
/// travelling in `direction`.
///
/// `straight` leaves the contiguous run of intersection tiles on the driver's
/// own track. The side exits leave the run on the lowest-numbered other track
/// sharing the intersection id, one walking forward and one walking backward.
/// Which of them is left is decided by where the first tiles of each exit lie
/// relative to the approach heading. When that is inconclusive the exit
/// closer to the map origin is on the inner side of the driver's track, and
/// a lone exit is inner when it stays closer to the origin than `tile`.
///
/// A branch is `None` when the road it would follow does not exist, because
/// no other track shares the intersection or the track ends there.
pub fn understand_intersection(
    map: &TrackMap,
    tile: TileId,
    direction: Direction,
) -> Result<IntersectionBranches, TrackError> {
    let d = match direction {
        Direction::Both => return Err(TrackError::NoTravelDirection),
        dir => dir.sign(),
    };
    let entry = map.tile(tile)?;
    let intersection_id = entry
        .intersection_id
        .ok_or(TrackError::NotAnIntersection(tile))?;
    let track = entry.track_id;

    let straight = run_end(map, tile, intersection_id, d)?
        .map(|end| map.advance(end, d))
        .transpose()?
        .map(|tile| Branch { tile, step: d });

    let other = map
        .tiles_in_intersection(intersection_id)
        .into_iter()
        .find(|&id| map.tiles()[id].track_id != track);
    let other = match other {
        Some(other) => other,
        None => {
            return Ok(IntersectionBranches {
                straight,
                ..Default::default()
            })
        }
    };

    let forward = run_end(map, other, intersection_id, 1)?
        .map(|last| map.advance(last, 1))
        .transpose()?
        .map(|tile| Branch { tile, step: 1 });
    let backward = run_end(map, other, intersection_id, -1)?
        .map(|first| map.advance(first, -1))
        .transpose()?
        .map(|tile| Branch { tile, step: -1 });

    let heading = approach_heading(map, tile, d)?;
    let origin = position(map, tile);
    let side_of = |branch: &Branch| -> Result<f64, TrackError> {
        let (cx, cy) = probe_centroid(map, branch)?;
        Ok(cross(heading, (cx - origin.0, cy - origin.1)))
    };

    let inner_is_left = map.winding(track) as i64 * d > 0;
    let (left, right) = match (forward, backward) {
        (None, None) => (None, None),
        (Some(b), None) | (None, Some(b)) => {
            let side = side_of(&b)?;
            let is_left = if side > 0.0 {
                true
            } else if side < 0.0 {
                false
            } else {
                let inner = segment_mean_radius(map, &b)? <= entry.pose.radius();
                inner == inner_is_left
            };
            if is_left {
                (Some(b), None)
            } else {
                (None, Some(b))
            }
        }
        (Some(f), Some(b)) => {
            let (side_f, side_b) = (side_of(&f)?, side_of(&b)?);
            if side_f > side_b {
                (Some(f), Some(b))
            } else if side_b > side_f {
                (Some(b), Some(f))
            } else {
                let (inner, outer) =
                    if segment_mean_radius(map, &f)? <= segment_mean_radius(map, &b)? {
                        (f, b)
                    } else {
                        (b, f)
                    };
                if inner_is_left {
                    (Some(inner), Some(outer))
                } else {
                    (Some(outer), Some(inner))
                }
            }
        }
    };

    Ok(IntersectionBranches {
        straight,
        left,
        right,
    })
}

/// Mean distance from the map origin of the tiles from the start of a branch
/// up to the next intersection.
pub(crate) fn segment_mean_radius(map: &TrackMap, branch: &Branch) -> Result<f64, TrackError> {
    let track_len = map.track_len(map.tile(branch.tile)?.track_id);
    let segment = branch_tiles(map, branch, track_len)?;
    let sum: f64 = segment.iter().map(|&id| map.tiles()[id].pose.radius()).sum();
    Ok(sum / segment.len() as f64)
}

// Last tile of the run of `intersection_id` tiles containing `tile`, walking
// in `d`. `None` if the track ends inside the run.
fn run_end(
    map: &TrackMap,
    tile: TileId,
    intersection_id: u32,
    d: i64,
) -> Result<Option<TileId>, TrackError> {
    let track_len = map.track_len(map.tile(tile)?.track_id);
    let mut current = tile;

    for _ in 0..track_len {
        if is_dead_end(map, current, d) {
            return Ok(None);
        }
        let next = map.advance(current, d)?;
        if map.tiles()[next].intersection_id != Some(intersection_id) {
            return Ok(Some(current));
        }
        current = next;
    }

    Err(TrackError::DegenerateIntersection(intersection_id))
}

// Up to `n` tiles from the start of a branch, stopping before the next
// intersection tile or after a dead end. The first tile is always included.
fn branch_tiles(map: &TrackMap, branch: &Branch, n: usize) -> Result<Vec<TileId>, TrackError> {
    let mut tiles = vec![branch.tile];
    let mut current = branch.tile;

    while tiles.len() < n && !is_dead_end(map, current, branch.step) {
        current = map.advance(current, branch.step)?;
        if map.tiles()[current].in_intersection() {
            break;
        }
        tiles.push(current);
    }

    Ok(tiles)
}

fn is_dead_end(map: &TrackMap, tile: TileId, d: i64) -> bool {
    let tile = &map.tiles()[tile];
    (d > 0 && tile.is_end) || (d < 0 && tile.is_start)
}

fn approach_heading(map: &TrackMap, tile: TileId, d: i64) -> Result<(f64, f64), TrackError> {
    // At the open end of a track the previous tile wraps to the other end.
    let (from, to) = if is_dead_end(map, tile, -d) {
        (tile, map.advance(tile, d)?)
    } else {
        (map.advance(tile, -d)?, tile)
    };
    let (p, q) = (position(map, from), position(map, to));
    Ok((q.0 - p.0, q.1 - p.1))
}

fn probe_centroid(map: &TrackMap, branch: &Branch) -> Result<(f64, f64), TrackError> {
    let probe = branch_tiles(map, branch, BRANCH_PROBE_TILES)?;
    let n = probe.len() as f64;
    let (sx, sy) = probe.iter().fold((0.0, 0.0), |(sx, sy), &id| {
        let (x, y) = position(map, id);
        (sx + x, sy + y)
    });
    Ok((sx / n, sy / n))
}

fn position(map: &TrackMap, tile: TileId) -> (f64, f64) {
    let pose = &map.tiles()[tile].pose;
    (pose.x, pose.y)
}

fn cross(a: (f64, f64), b: (f64, f64)) -> f64 {
    a.0 * b.1 - a.1 * b.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Pose, Tile};
    use std::f64::consts::PI;

    fn ring(n: usize, r: f64) -> Vec<Tile> {
        (0..n)
            .map(|i| {
                let a = 2.0 * PI * i as f64 / n as f64;
                Tile::new(Pose {
                    alpha: a,
                    beta: a,
                    x: r * a.cos(),
                    y: r * a.sin(),
                })
            })
            .collect()
    }

    // A ring with a dead-end spoke reaching it from the inside at (100, 0).
    fn t_spoke() -> TrackMap {
        let mut ring = ring(40, 100.0);
        ring[0] = ring[0].clone().intersection(0).turn_tile();
        let mut spoke: Vec<Tile> = (0..10)
            .map(|i| {
                Tile::new(Pose {
                    beta: -PI / 2.0,
                    x: 10.0 * (i + 1) as f64,
                    ..Default::default()
                })
            })
            .collect();
        spoke[0] = spoke[0].clone().start_tile();
        spoke[9] = spoke[9].clone().end_tile().turn_tile().intersection(0);
        TrackMap::new(vec![ring, spoke]).unwrap()
    }

    #[test]
    fn test_direction_from_integer() {
        assert_eq!(Direction::try_from(1), Ok(Direction::Forward));
        assert_eq!(Direction::try_from(-1), Ok(Direction::Backward));
        assert_eq!(Direction::try_from(0), Ok(Direction::Both));
        assert_eq!(
            Direction::try_from(2),
            Err(TrackError::InvalidDirection(2))
        );
    }

    #[test]
    fn test_close_intersections_window() -> anyhow::Result<()> {
        let map = t_spoke();

        assert_eq!(
            close_intersections(&map, 37, 3, Direction::Forward)?,
            BTreeSet::from([0])
        );
        assert!(close_intersections(&map, 37, 2, Direction::Forward)?.is_empty());
        assert!(close_intersections(&map, 37, 3, Direction::Backward)?.is_empty());
        assert_eq!(
            close_intersections(&map, 2, 2, Direction::Both)?,
            BTreeSet::from([0])
        );
        assert_eq!(
            close_intersections(&map, 0, 1, Direction::Forward)?,
            BTreeSet::from([0])
        );
        assert_eq!(
            close_intersections(&map, 0, 1, Direction::Both),
            close_intersections(&map, 0, 1, Direction::Backward)
        );
        assert_eq!(
            close_intersections(&map, 3, 0, Direction::Both),
            Err(TrackError::ZeroWindow)
        );
        assert!(is_close_to_intersection(&map, 47, 2, Direction::Forward)?);
        assert!(!is_close_to_intersection(&map, 47, 1, Direction::Forward)?);
        Ok(())
    }

    #[test]
    fn test_spoke_onto_ring() -> anyhow::Result<()> {
        let map = t_spoke();
        let branches = understand_intersection(&map, 49, Direction::Forward)?;

        assert_eq!(branches.straight, None);
        assert_eq!(branches.left, Some(Branch { tile: 1, step: 1 }));
        assert_eq!(branches.right, Some(Branch { tile: 39, step: -1 }));
        Ok(())
    }

    #[test]
    fn test_ring_onto_spoke() -> anyhow::Result<()> {
        let map = t_spoke();

        let ccw = understand_intersection(&map, 0, Direction::Forward)?;
        assert_eq!(ccw.straight, Some(Branch { tile: 1, step: 1 }));
        assert_eq!(ccw.left, Some(Branch { tile: 48, step: -1 }));
        assert_eq!(ccw.right, None);

        let cw = understand_intersection(&map, 0, Direction::Backward)?;
        assert_eq!(cw.straight, Some(Branch { tile: 39, step: -1 }));
        assert_eq!(cw.left, None);
        assert_eq!(cw.right, Some(Branch { tile: 48, step: -1 }));
        Ok(())
    }

    // A square track running counterclockwise around the origin corner, with
    // a spoke leaving (100, 0) straight ahead of the bottom edge.
    fn square_with_collinear_spoke() -> TrackMap {
        let at = |x: f64, y: f64| {
            Tile::new(Pose {
                x,
                y,
                ..Default::default()
            })
        };
        let mut square: Vec<Tile> = (0..=10).map(|i| at(10.0 * i as f64, 0.0)).collect();
        square.extend((1..=5).map(|i| at(100.0, 10.0 * i as f64)));
        square.extend((0..=9).rev().map(|i| at(10.0 * i as f64, 50.0)));
        square.extend((1..=4).rev().map(|i| at(0.0, 10.0 * i as f64)));
        square[10] = square[10].clone().intersection(0).turn_tile();

        let mut spoke: Vec<Tile> = (0..6).map(|i| at(100.0 + 10.0 * i as f64, 0.0)).collect();
        spoke[0] = spoke[0].clone().start_tile().turn_tile().intersection(0);
        spoke[5] = spoke[5].clone().end_tile();
        TrackMap::new(vec![square, spoke]).unwrap()
    }

    #[test]
    fn test_lone_exit_straight_ahead() -> anyhow::Result<()> {
        let map = square_with_collinear_spoke();
        assert_eq!(map.winding(0), 1);

        // The spoke lies on the approach line and away from the origin, so it
        // is the outer exit: right when driving counterclockwise.
        let ccw = understand_intersection(&map, 10, Direction::Forward)?;
        assert_eq!(ccw.straight, Some(Branch { tile: 11, step: 1 }));
        assert_eq!(ccw.left, None);
        assert_eq!(ccw.right, Some(Branch { tile: 31, step: 1 }));

        let cw = understand_intersection(&map, 10, Direction::Backward)?;
        assert_eq!(cw.straight, Some(Branch { tile: 9, step: -1 }));
        assert_eq!(cw.left, Some(Branch { tile: 31, step: 1 }));
        assert_eq!(cw.right, None);
        Ok(())
    }

    #[test]
    fn test_understand_intersection_errors() {
        let map = t_spoke();

        assert_eq!(
            understand_intersection(&map, 5, Direction::Forward),
            Err(TrackError::NotAnIntersection(5))
        );
        assert_eq!(
            understand_intersection(&map, 0, Direction::Both),
            Err(TrackError::NoTravelDirection)
        );
        assert_eq!(
            understand_intersection(&map, 99, Direction::Forward),
            Err(TrackError::TileOutOfRange { tile: 99, len: 50 })
        );
    }

    #[test]
    fn test_degenerate_intersection() {
        let tiles = ring(4, 10.0).into_iter().map(|t| t.intersection(7)).collect();
        let map = TrackMap::new(vec![tiles, ring(4, 20.0)]).unwrap();

        assert_eq!(
            understand_intersection(&map, 0, Direction::Forward),
            Err(TrackError::DegenerateIntersection(7))
        );
    }

    #[test]
    fn test_branch_walk_wraps() -> anyhow::Result<()> {
        let map = t_spoke();
        let branch = Branch { tile: 1, step: -1 };

        assert_eq!(branch.walk(&map, 3)?, vec![1, 0, 39]);
        assert_eq!(branch.nth(&map, 41)?, 0);
        assert_eq!(branch.direction(), Direction::Backward);
        Ok(())
    }

    #[test]
    fn test_segment_mean_radius_stops_at_intersection() -> anyhow::Result<()> {
        let map = t_spoke();
        // Tiles 48 down to 40 of the spoke, 10 to 90 from the origin.
        let radius = segment_mean_radius(&map, &Branch { tile: 48, step: -1 })?;
        assert!((radius - 50.0).abs() < 1e-9);

        // The whole ring but the intersection tile.
        let radius = segment_mean_radius(&map, &Branch { tile: 1, step: 1 })?;
        assert!((radius - 100.0).abs() < 1e-9);
        Ok(())
    }
}
