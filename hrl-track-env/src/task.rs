//! Task families, per-episode task state and episode statistics.
use crate::{
    sampler::{
        AnchorFilter, CenterSampler, KeepLaneSampler, SampledEpisode, SamplingParams, SideChoice,
        SideSampler, TaskSampler,
    },
    Direction, Lane, Maneuver, TrackError, TrackMap,
};
use hrl_core::record::{Record, RecordValue};
use log::debug;
use rand::{rngs::SmallRng, Rng};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Task families.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TaskKind {
    /// Turn left at a junction.
    TurnLeft,

    /// Turn right at a junction.
    TurnRight,

    /// Turn at a junction, the side is drawn at every reset.
    Turn,

    /// Drive straight through an X-junction.
    TakeCenter,

    /// Stay in a lane away from junctions.
    KeepLane,

    /// Cross an X-junction turning left, turning right or going straight.
    X,
}

impl TaskKind {
    /// Short name of the task.
    pub fn label(self) -> &'static str {
        match self {
            Self::TurnLeft => "TL",
            Self::TurnRight => "TR",
            Self::Turn => "T",
            Self::TakeCenter => "TC",
            Self::KeepLane => "KL",
            Self::X => "X",
        }
    }

    /// Whether the task takes high-level actions unless configured otherwise.
    pub fn default_high_level(self) -> bool {
        matches!(self, Self::Turn | Self::X)
    }

    /// Upper bound of the step reward unless configured otherwise.
    pub fn default_max_step_reward(self) -> f32 {
        match self {
            Self::KeepLane => 1.0,
            _ => 10.0,
        }
    }

    /// Seconds without useful track contact before an episode fails, unless
    /// configured otherwise.
    pub fn default_max_time_out(self) -> f64 {
        match self {
            Self::KeepLane => 2.0,
            _ => 1.0,
        }
    }

    /// Names of the sub-policies behind high-level actions `0, 1, ...`.
    pub fn sub_policy_names(self) -> &'static [&'static str] {
        match self {
            Self::Turn => &["left", "right"],
            Self::X => &["turn", "take_center"],
            _ => &[],
        }
    }

    /// The sampling strategy of the task.
    pub fn plan(self) -> TaskPlan {
        let side = |side| SideSampler {
            side,
            anchors: AnchorFilter::CrossOrJoin,
        };
        match self {
            Self::TurnLeft => TaskPlan::Single(Box::new(side(SideChoice::Fixed(Side::Left)))),
            Self::TurnRight => TaskPlan::Single(Box::new(side(SideChoice::Fixed(Side::Right)))),
            Self::Turn => TaskPlan::Single(Box::new(side(SideChoice::Random))),
            Self::TakeCenter => TaskPlan::Single(Box::new(CenterSampler)),
            Self::KeepLane => TaskPlan::Single(Box::new(KeepLaneSampler)),
            Self::X => TaskPlan::Composite {
                side: SideSampler {
                    side: SideChoice::Random,
                    anchors: AnchorFilter::CrossOnly,
                },
                center: CenterSampler,
                side_probability: 2.0 / 3.0,
            },
        }
    }
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Side of a turn.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    /// Left.
    Left,

    /// Right.
    Right,
}

impl Side {
    /// The maneuver that turns to this side.
    pub fn maneuver(self) -> Maneuver {
        match self {
            Self::Left => Maneuver::Left,
            Self::Right => Maneuver::Right,
        }
    }
}

/// The task of the current episode, fixed at reset.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EpisodeTask {
    /// Turn onto the other track of a junction.
    Side {
        /// Side of the turn.
        side: Side,
        /// Direction of approach on the anchor's track.
        direction: Direction,
    },

    /// Go straight through an X-junction.
    Center {
        /// Lane the agent started in, in the frame of its track.
        lane: Lane,
        /// Track the agent started on.
        track: usize,
        /// Direction of travel on that track.
        direction: Direction,
    },

    /// Stay in a lane.
    KeepLane {
        /// The lane to keep.
        keeping: Lane,
    },
}

impl EpisodeTask {
    /// Short name of the sampled task.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Side {
                side: Side::Left, ..
            } => "left",
            Self::Side {
                side: Side::Right, ..
            } => "right",
            Self::Center { .. } => "center",
            Self::KeepLane { .. } => "keep_lane",
        }
    }
}

/// Counters kept by an environment across resets.
///
/// They start from the values in the configuration and are only ever
/// incremented by resets.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EpisodeStats {
    /// Sampled left turns.
    pub left_count: u64,

    /// Sampled right turns.
    pub right_count: u64,

    /// Sampled center crossings.
    pub center_count: u64,

    /// Maps generated, including the ones no episode could be sampled on.
    pub total_tracks_generated: u64,
}

impl EpisodeStats {
    /// Counts a successfully sampled episode.
    pub fn record_task(&mut self, task: &EpisodeTask) {
        match task {
            EpisodeTask::Side {
                side: Side::Left, ..
            } => self.left_count += 1,
            EpisodeTask::Side {
                side: Side::Right, ..
            } => self.right_count += 1,
            EpisodeTask::Center { .. } => self.center_count += 1,
            EpisodeTask::KeepLane { .. } => {}
        }
    }

    /// The counters as a record.
    pub fn to_record(&self) -> Record {
        Record::from_slice(&[
            ("left_count", RecordValue::Scalar(self.left_count as f32)),
            ("right_count", RecordValue::Scalar(self.right_count as f32)),
            ("center_count", RecordValue::Scalar(self.center_count as f32)),
            (
                "total_tracks_generated",
                RecordValue::Scalar(self.total_tracks_generated as f32),
            ),
        ])
    }
}

/// How a task picks its episodes.
pub enum TaskPlan {
    /// One sampler for every episode.
    Single(Box<dyn TaskSampler>),

    /// A side or a center episode, chosen at every reset.
    Composite {
        /// Sampler of side episodes.
        side: SideSampler,
        /// Sampler of center episodes.
        center: CenterSampler,
        /// Probability of a side episode.
        side_probability: f64,
    },
}

impl TaskSampler for TaskPlan {
    fn sample(
        &self,
        map: &TrackMap,
        params: &SamplingParams,
        rng: &mut SmallRng,
    ) -> Result<Option<SampledEpisode>, TrackError> {
        match self {
            Self::Single(sampler) => sampler.sample(map, params, rng),
            Self::Composite {
                side,
                center,
                side_probability,
            } => {
                if !map.tiles().iter().any(|tile| tile.is_cross_tile) {
                    debug!("No cross tile on the map");
                    return Ok(None);
                }
                if rng.gen::<f64>() < *side_probability {
                    side.sample(map, params, rng)
                } else {
                    center.sample(map, params, rng)
                }
            }
        }
    }
}
