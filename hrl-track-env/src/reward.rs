//! Reward state machine.
//!
//! [`compute_reward`] derives the reward and the status of a step from the
//! task, the contacts in the map and the failure signals of the simulator.
//! It keeps no state of its own; the caller commits the contacts afterwards
//! with [`ContactTracker::commit`].
use crate::{
    close_intersections, ContactTracker, Direction, EpisodeTask, Lane, TrackError, TrackMap,
    CLOSE_TO_INTERSECTION,
};
use log::trace;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Bounds of the reward of a step.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct RewardBounds {
    /// Lower bound, unbounded if `None`.
    pub min: Option<f32>,

    /// Upper bound.
    pub max: f32,
}

impl RewardBounds {
    /// Clamps a reward.
    pub fn clip(&self, reward: f32) -> f32 {
        let reward = reward.min(self.max);
        match self.min {
            Some(min) => reward.max(min),
            None => reward,
        }
    }
}

/// Outcome of the simulator's failure checks.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct FailureVerdict {
    /// Subtracted from the reward.
    pub penalty: f32,

    /// Whether the episode fails.
    pub done: bool,
}

/// A reward with its unclipped value.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct StepReward {
    /// Reward.
    pub reward: f32,

    /// Reward before clipping.
    pub full_reward: f32,

    /// Whether the episode ends.
    pub done: bool,
}

/// What the simulator reports about a step.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Signals {
    /// Failure checks.
    pub verdict: FailureVerdict,

    /// The simulator's reward, used by lane keeping only.
    pub default_reward: Option<StepReward>,
}

/// Reward constants of a task.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct RewardParams {
    /// Added when the goal is reached.
    pub goal_bonus: f32,

    /// Subtracted at every step.
    pub step_penalty: f32,

    /// Bounds of the returned reward.
    pub bounds: RewardBounds,
}

/// Status of an episode after a step.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum EpisodeStatus {
    /// The episode goes on.
    Running,

    /// The task was accomplished.
    Success,

    /// The episode ended without accomplishing the task.
    Failure,
}

/// Reward and status of a step.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RewardOutcome {
    /// Clipped reward.
    pub reward: f32,

    /// Reward before clipping.
    pub full_reward: f32,

    /// Whether the episode ends.
    pub done: bool,

    /// Status after the step.
    pub status: EpisodeStatus,
}

/// Computes the reward of a step.
///
/// Turning and center tasks start from `-step_penalty`. Reaching the goal adds
/// `goal_bonus` and ends the episode. Otherwise the penalty of the failure
/// checks applies, and a step that reaches a new predicted tile without
/// failing earns `1 / factor`, where the factor halves the reward of steps
/// spread over both lanes (see [`lane_change_factor`]). Lane keeping takes
/// the simulator's reward, zeroes its positive part while the other lane is
/// touched and ends near a junction.
pub fn compute_reward(
    task: &EpisodeTask,
    map: &TrackMap,
    tracker: &ContactTracker,
    params: &RewardParams,
    signals: &Signals,
) -> Result<RewardOutcome, TrackError> {
    if let EpisodeTask::KeepLane { keeping } = task {
        return keep_lane_reward(*keeping, map, tracker, params, signals);
    }

    let mut reward = -params.step_penalty;
    let (done, status) = if tracker.goal_contacted(map) {
        reward += params.goal_bonus;
        (true, EpisodeStatus::Success)
    } else {
        reward -= signals.verdict.penalty;
        if signals.verdict.done {
            (true, EpisodeStatus::Failure)
        } else {
            if tracker.made_progress(map) {
                reward += 1.0 / lane_change_factor(task, map) as f32;
            }
            (false, EpisodeStatus::Running)
        }
    };

    let outcome = RewardOutcome {
        reward: params.bounds.clip(reward),
        full_reward: reward,
        done,
        status,
    };
    trace!("{:?}", outcome);
    Ok(outcome)
}

/// `2` when the contacts of a step span both lanes in a way that should count
/// as one tile of progress, `1` otherwise.
///
/// * Turns: some track has a tile touched on both lanes, and so does every
///   track the agent touches.
/// * Center crossings: the agent touches an unvisited tile of its own track
///   on the lane opposite to the one it started in.
/// * Lane keeping: always `1`.
pub fn lane_change_factor(task: &EpisodeTask, map: &TrackMap) -> u32 {
    match task {
        EpisodeTask::Side { .. } => {
            let mut touched = BTreeSet::new();
            let mut both_lanes = BTreeSet::new();
            for tile in map.tiles().iter().filter(|tile| tile.contacted()) {
                touched.insert(tile.track_id);
                if tile.both_lanes_contacted() {
                    both_lanes.insert(tile.track_id);
                }
            }
            if !both_lanes.is_empty() && touched.is_subset(&both_lanes) {
                2
            } else {
                1
            }
        }
        EpisodeTask::Center { lane, track, .. } => {
            let other = lane.other();
            let swapped = map.tiles().iter().any(|tile| {
                tile.track_id == *track && !tile.visited && tile.lane_contacted(other)
            });
            if swapped {
                2
            } else {
                1
            }
        }
        EpisodeTask::KeepLane { .. } => 1,
    }
}

fn keep_lane_reward(
    keeping: Lane,
    map: &TrackMap,
    tracker: &ContactTracker,
    params: &RewardParams,
    signals: &Signals,
) -> Result<RewardOutcome, TrackError> {
    let base = signals.default_reward.unwrap_or(StepReward {
        reward: -params.step_penalty,
        full_reward: -params.step_penalty,
        done: false,
    });

    let mut near_junction = false;
    for id in tracker.contacted(map) {
        if !close_intersections(map, id, CLOSE_TO_INTERSECTION, Direction::Forward)?.is_empty() {
            near_junction = true;
            break;
        }
    }
    let in_other_lane = map
        .tiles()
        .iter()
        .any(|tile| tile.lane_contacted(keeping.other()));

    let (mut reward, mut full_reward) = (base.reward, base.full_reward);
    if reward > 0.0 && in_other_lane {
        reward = 0.0;
        full_reward = 0.0;
    }

    let status = if near_junction {
        EpisodeStatus::Success
    } else if base.done {
        EpisodeStatus::Failure
    } else {
        EpisodeStatus::Running
    };
    let outcome = RewardOutcome {
        reward: params.bounds.clip(reward),
        full_reward,
        done: near_junction || base.done,
        status,
    };
    trace!("{:?}", outcome);
    Ok(outcome)
}
