//! Turning episodes.
use super::{lane_pose, Placement, SampledEpisode, SamplingParams, TaskSampler};
use crate::{
    understand_intersection, ContactTracker, Direction, EpisodeTask, Lane, PredictionSet, Side,
    Tile, TrackError, TrackMap,
};
use log::debug;
use rand::{rngs::SmallRng, seq::SliceRandom, Rng};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Maximum deviation of the initial heading from the road.
const ANGLE_NOISE: f64 = PI / 12.0;

/// Maximum initial speed.
const MAX_SPEED: f64 = 100.0;

/// Which side to turn to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SideChoice {
    /// Always the same side.
    Fixed(Side),

    /// A fair coin at every episode.
    Random,
}

/// Tiles a turning episode can be built around.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum AnchorFilter {
    /// Tiles of X-junctions.
    CrossOnly,

    /// Tiles of X-junctions and T-junction tiles off the main track.
    CrossOrJoin,
}

impl AnchorFilter {
    fn accepts(self, tile: &Tile) -> bool {
        match self {
            Self::CrossOnly => tile.is_cross_tile,
            Self::CrossOrJoin => tile.is_cross_tile || (tile.is_turn_tile && tile.track_id > 0),
        }
    }
}

/// Samples episodes that approach a junction and turn onto the other track.
///
/// The agent starts `tiles_before` tiles ahead of the anchor, in a random
/// lane, with a noisy heading and a random speed. The predictions are the
/// tiles leading to the anchor followed by the first tiles of the chosen
/// branch, the last of which is the goal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SideSampler {
    /// Side of the turn.
    pub side: SideChoice,

    /// Eligible anchors.
    pub anchors: AnchorFilter,
}

impl TaskSampler for SideSampler {
    fn sample(
        &self,
        map: &TrackMap,
        params: &SamplingParams,
        rng: &mut SmallRng,
    ) -> Result<Option<SampledEpisode>, TrackError> {
        let anchors = map.filter(|tile| self.anchors.accepts(tile));
        let anchor = match anchors.choose(rng) {
            Some(&anchor) => anchor,
            None => {
                debug!("No anchor for a turn");
                return Ok(None);
            }
        };

        let side = match self.side {
            SideChoice::Fixed(side) => side,
            SideChoice::Random if rng.gen_bool(0.5) => Side::Left,
            SideChoice::Random => Side::Right,
        };
        let tile = map.tile(anchor)?;
        let d: i64 = if tile.is_end {
            1
        } else if tile.is_start {
            -1
        } else if rng.gen_bool(0.5) {
            1
        } else {
            -1
        };
        let tiles_before = params.tiles_before as i64;

        let branch = match understand_intersection(map, anchor, Direction::from_sign(d))?
            .get(side.maneuver())
        {
            Some(branch) => branch,
            None => {
                debug!("Tile {} has no {:?} branch", anchor, side);
                return Ok(None);
            }
        };

        let mut predictions = PredictionSet::new();
        for i in 0..tiles_before {
            predictions.push(map.advance(anchor, -d * i)?, -d);
        }
        predictions.extend(branch.walk(map, params.tiles_before)?, d);
        let goal = predictions.last().map(|entry| entry.tile);

        let start = map.advance(anchor, -d * tiles_before)?;
        let lane = if rng.gen_bool(0.5) {
            Lane::Left
        } else {
            Lane::Right
        };
        let heading = map.tile(start)?.pose.beta
            + if d < 0 { PI } else { 0.0 }
            + rng.gen_range(-ANGLE_NOISE..=ANGLE_NOISE);
        let pose = lane_pose(map, start, lane, heading, params.lane_width)?;

        Ok(Some(SampledEpisode {
            task: EpisodeTask::Side {
                side,
                direction: Direction::from_sign(d),
            },
            tracker: ContactTracker::new(predictions, goal),
            placement: Placement {
                pose,
                speed: Some(rng.gen_range(0.0..=MAX_SPEED)),
            },
            anchor,
            start,
        }))
    }
}
