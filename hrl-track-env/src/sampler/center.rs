//! Straight-through episodes.
use super::{Placement, SampledEpisode, SamplingParams, TaskSampler};
use crate::{
    understand_intersection, AgentPose, ContactTracker, Direction, EpisodeTask, Lane,
    PredictionSet, TrackError, TrackMap,
};
use log::debug;
use rand::{rngs::SmallRng, seq::SliceRandom, Rng};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Maximum deviation of the initial heading from the road.
const ANGLE_NOISE: f64 = PI / 8.0;

/// Maximum initial speed.
const MAX_SPEED: f64 = 100.0;

/// Samples episodes that cross an X-junction without leaving the track.
///
/// The agent starts `tiles_before` tiles ahead of a cross tile, travelling in
/// either direction, anywhere across one lane. The goal is the tile right
/// after the post-junction prediction window.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CenterSampler;

impl TaskSampler for CenterSampler {
    fn sample(
        &self,
        map: &TrackMap,
        params: &SamplingParams,
        rng: &mut SmallRng,
    ) -> Result<Option<SampledEpisode>, TrackError> {
        let anchors = map.filter(|tile| tile.is_cross_tile);
        let anchor = match anchors.choose(rng) {
            Some(&anchor) => anchor,
            None => {
                debug!("No cross tile to go through");
                return Ok(None);
            }
        };

        let s: i64 = if rng.gen_bool(0.5) { 1 } else { -1 };
        let straight = match understand_intersection(map, anchor, Direction::from_sign(s))?.straight
        {
            Some(straight) => straight,
            None => {
                debug!("Tile {} has no way straight through", anchor);
                return Ok(None);
            }
        };

        let tiles_before = params.tiles_before as i64;
        let start = map.advance(anchor, -s * tiles_before)?;
        let mut predictions = PredictionSet::new();
        for i in 0..tiles_before {
            predictions.push(map.advance(start, s * i)?, s);
        }
        predictions.extend(straight.walk(map, params.tiles_before)?, s);
        let goal = straight.nth(map, params.tiles_before)?;

        // The lane is taken in the frame of the heading.
        let lane = if rng.gen_bool(0.5) {
            Lane::Left
        } else {
            Lane::Right
        };
        let start_tile = map.tile(start)?;
        let heading = start_tile.pose.beta + if s < 0 { PI } else { 0.0 };
        let delta: f64 = rng.gen();
        let offset = lane.offset_sign() * delta * params.lane_width;
        let pose = AgentPose {
            heading: heading + rng.gen_range(-ANGLE_NOISE..=ANGLE_NOISE),
            x: start_tile.pose.x + offset * heading.cos(),
            y: start_tile.pose.y + offset * heading.sin(),
        };

        Ok(Some(SampledEpisode {
            task: EpisodeTask::Center {
                lane: if s > 0 { lane } else { lane.other() },
                track: start_tile.track_id,
                direction: straight.direction(),
            },
            tracker: ContactTracker::new(predictions, Some(goal)),
            placement: Placement {
                pose,
                speed: Some(rng.gen_range(0.0..=MAX_SPEED)),
            },
            anchor,
            start,
        }))
    }
}
