//! Lane keeping episodes.
use super::{lane_pose, Placement, SampledEpisode, SamplingParams, TaskSampler};
use crate::{
    is_close_to_intersection, ContactTracker, Direction, EpisodeTask, Lane, TrackError, TrackMap,
    CLOSE_TO_INTERSECTION,
};
use log::debug;
use rand::{rngs::SmallRng, seq::SliceRandom, Rng};
use serde::{Deserialize, Serialize};

/// Samples episodes that start in a lane on a tile away from junctions.
///
/// There is neither a goal nor a prediction set: the episode ends when the
/// agent gets close to a junction or when the simulator ends it.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeepLaneSampler;

impl TaskSampler for KeepLaneSampler {
    fn sample(
        &self,
        map: &TrackMap,
        params: &SamplingParams,
        rng: &mut SmallRng,
    ) -> Result<Option<SampledEpisode>, TrackError> {
        let keeping = if rng.gen_bool(0.5) {
            Lane::Left
        } else {
            Lane::Right
        };

        let mut eligible = Vec::new();
        for id in 0..map.len() {
            if !is_close_to_intersection(map, id, CLOSE_TO_INTERSECTION, Direction::Forward)? {
                eligible.push(id);
            }
        }
        let start = match eligible.choose(rng) {
            Some(&start) => start,
            None => {
                debug!("Every tile is close to an intersection");
                return Ok(None);
            }
        };

        let heading = map.tile(start)?.pose.beta;
        Ok(Some(SampledEpisode {
            task: EpisodeTask::KeepLane { keeping },
            tracker: ContactTracker::default(),
            placement: Placement {
                pose: lane_pose(map, start, keeping, heading, params.lane_width)?,
                speed: None,
            },
            anchor: start,
            start,
        }))
    }
}
