//! Episode samplers.
//!
//! A sampler looks at a freshly generated map and either builds an episode on
//! it, with a start placement, a prediction set and a goal, or returns
//! `Ok(None)` when the map lacks the topology the task needs. The environment
//! then regenerates the map and tries again.
mod center;
mod keep_lane;
mod side;
use crate::{AgentPose, ContactTracker, EpisodeTask, Lane, TileId, TrackError, TrackMap};
pub use center::CenterSampler;
pub use keep_lane::KeepLaneSampler;
use rand::rngs::SmallRng;
use serde::{Deserialize, Serialize};
pub use side::{AnchorFilter, SideChoice, SideSampler};

/// Parameters shared by all samplers.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SamplingParams {
    /// Length of the prediction windows before and after a junction.
    pub tiles_before: usize,

    /// Width of a lane.
    pub lane_width: f64,
}

impl Default for SamplingParams {
    fn default() -> Self {
        Self {
            tiles_before: 8,
            lane_width: 40.0 / 6.0,
        }
    }
}

/// Where and how fast the agent starts.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Placement {
    /// Pose of the agent.
    pub pose: AgentPose,

    /// Initial speed, `None` to keep the simulator's.
    pub speed: Option<f64>,
}

/// An episode built on a map.
#[derive(Clone, Debug, PartialEq)]
pub struct SampledEpisode {
    /// The task.
    pub task: EpisodeTask,

    /// Predictions and goal.
    pub tracker: ContactTracker,

    /// Initial placement of the agent.
    pub placement: Placement,

    /// Tile the episode was built around.
    pub anchor: TileId,

    /// Tile the agent starts on.
    pub start: TileId,
}

/// Builds episodes on maps.
pub trait TaskSampler {
    /// Samples an episode, `Ok(None)` if the map does not allow one.
    fn sample(
        &self,
        map: &TrackMap,
        params: &SamplingParams,
        rng: &mut SmallRng,
    ) -> Result<Option<SampledEpisode>, TrackError>;
}

/// Pose of an agent centered in a lane of a tile.
pub(crate) fn lane_pose(
    map: &TrackMap,
    tile: TileId,
    lane: Lane,
    heading: f64,
    lane_width: f64,
) -> Result<AgentPose, TrackError> {
    let pose = map.tile(tile)?.pose;
    let (lx, ly) = pose.lateral();
    let offset = lane.offset_sign() * 0.5 * lane_width;
    Ok(AgentPose {
        heading,
        x: pose.x + offset * lx,
        y: pose.y + offset * ly,
    })
}
