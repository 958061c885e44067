//! Configuration of [`TrackEnv`](super::TrackEnv).
use crate::{
    sampler::SamplingParams, EpisodeLimits, EpisodeStats, RewardBounds, RewardParams, TaskKind,
    SOFT_NEG_REWARD,
};
use anyhow::Result;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::{
    fs::File,
    io::{BufReader, Write},
    path::Path,
};

/// Configuration of a task.
///
/// Fields left to `None` take the default of the task family, see
/// [`TaskKind`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TaskConfig {
    pub(super) kind: TaskKind,
    pub(super) high_level: Option<bool>,
    pub(super) tiles_before: usize,
    pub(super) goal_bonus: f32,
    pub(super) step_penalty: f32,
    pub(super) max_step_reward: Option<f32>,
    pub(super) min_step_reward: Option<f32>,
    pub(super) max_time_out: Option<f64>,
    pub(super) allow_outside: bool,
    pub(super) lane_width: f64,
    pub(super) max_reset_attempts: Option<usize>,
    pub(super) initial_stats: EpisodeStats,
}

impl Default for TaskConfig {
    fn default() -> Self {
        Self {
            kind: TaskKind::X,
            high_level: None,
            tiles_before: 8,
            goal_bonus: 10.0,
            step_penalty: SOFT_NEG_REWARD,
            max_step_reward: None,
            min_step_reward: None,
            max_time_out: None,
            allow_outside: false,
            lane_width: 40.0 / 6.0,
            max_reset_attempts: None,
            initial_stats: EpisodeStats::default(),
        }
    }
}

impl TaskConfig {
    /// Sets the task family.
    pub fn kind(mut self, kind: TaskKind) -> Self {
        self.kind = kind;
        self
    }

    /// Whether high-level actions are accepted.
    pub fn high_level(mut self, high_level: bool) -> Self {
        self.high_level = Some(high_level);
        self
    }

    /// Sets the length of the prediction windows.
    pub fn tiles_before(mut self, tiles_before: usize) -> Self {
        self.tiles_before = tiles_before;
        self
    }

    /// Sets the reward of reaching the goal.
    pub fn goal_bonus(mut self, goal_bonus: f32) -> Self {
        self.goal_bonus = goal_bonus;
        self
    }

    /// Sets the penalty of every step.
    pub fn step_penalty(mut self, step_penalty: f32) -> Self {
        self.step_penalty = step_penalty;
        self
    }

    /// Sets the upper bound of the step reward.
    pub fn max_step_reward(mut self, v: f32) -> Self {
        self.max_step_reward = Some(v);
        self
    }

    /// Sets the lower bound of the step reward.
    pub fn min_step_reward(mut self, v: Option<f32>) -> Self {
        self.min_step_reward = v;
        self
    }

    /// Sets the time without useful track contact before an episode fails.
    pub fn max_time_out(mut self, v: f64) -> Self {
        self.max_time_out = Some(v);
        self
    }

    /// Whether leaving the drivable surface is tolerated.
    pub fn allow_outside(mut self, v: bool) -> Self {
        self.allow_outside = v;
        self
    }

    /// Sets the width of a lane.
    pub fn lane_width(mut self, v: f64) -> Self {
        self.lane_width = v;
        self
    }

    /// Caps the number of maps generated by a reset.
    pub fn max_reset_attempts(mut self, v: Option<usize>) -> Self {
        self.max_reset_attempts = v;
        self
    }

    /// Sets the initial episode statistics.
    pub fn initial_stats(mut self, stats: EpisodeStats) -> Self {
        self.initial_stats = stats;
        self
    }

    /// Loads [`TaskConfig`].
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path)?;
        let rdr = BufReader::new(file);
        let b = serde_yaml::from_reader(rdr)?;
        Ok(b)
    }

    /// Saves [`TaskConfig`].
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let mut file = File::create(path)?;
        file.write_all(serde_yaml::to_string(&self)?.as_bytes())?;
        Ok(())
    }

    pub(super) fn is_high_level(&self) -> bool {
        self.high_level
            .unwrap_or_else(|| self.kind.default_high_level())
    }

    pub(super) fn reward_params(&self) -> RewardParams {
        RewardParams {
            goal_bonus: self.goal_bonus,
            step_penalty: self.step_penalty,
            bounds: RewardBounds {
                min: self.min_step_reward,
                max: self
                    .max_step_reward
                    .unwrap_or_else(|| self.kind.default_max_step_reward()),
            },
        }
    }

    pub(super) fn sampling_params(&self) -> SamplingParams {
        SamplingParams {
            tiles_before: self.tiles_before,
            lane_width: self.lane_width,
        }
    }

    pub(super) fn limits(&self) -> EpisodeLimits {
        EpisodeLimits {
            max_time_out: self
                .max_time_out
                .unwrap_or_else(|| self.kind.default_max_time_out()),
            allow_outside: self.allow_outside,
        }
    }
}

/// Configuration of [`TrackEnv`](super::TrackEnv): the task and the
/// simulator's own configuration.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackEnvConfig<C> {
    pub(super) task: TaskConfig,
    pub(super) sim: C,
}

impl<C> TrackEnvConfig<C>
where
    C: Serialize + DeserializeOwned + Default,
{
    /// Sets the task configuration.
    pub fn task(mut self, task: TaskConfig) -> Self {
        self.task = task;
        self
    }

    /// Sets the simulator configuration.
    pub fn sim(mut self, sim: C) -> Self {
        self.sim = sim;
        self
    }

    /// Loads [`TrackEnvConfig`].
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path)?;
        let rdr = BufReader::new(file);
        let b = serde_yaml::from_reader(rdr)?;
        Ok(b)
    }

    /// Saves [`TrackEnvConfig`].
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let mut file = File::create(path)?;
        file.write_all(serde_yaml::to_string(&self)?.as_bytes())?;
        Ok(())
    }
}
