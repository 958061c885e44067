//! Task environment on top of a simulator.
mod config;
use crate::{
    compute_reward,
    sampler::{SampledEpisode, SamplingParams, TaskSampler},
    ContactTracker, EpisodeStats, EpisodeTask, FailureVerdict, HighLevelDispatcher,
    RewardOutcome, RewardParams, Signals, Simulator, SubPolicy, TaskError, TaskPlan,
    VisualiserLink, VisualiserMessage,
};
use anyhow::Result;
pub use config::{TaskConfig, TrackEnvConfig};
use crossbeam_channel::Sender;
use hrl_core::{
    record::{Record, RecordValue},
    Act, Env, Step,
};
use log::{debug, info};
use rand::{rngs::SmallRng, SeedableRng};
use std::{collections::BTreeSet, fmt::Debug};

/// Action of [`TrackEnv`].
#[derive(Clone, Debug, PartialEq)]
pub enum NavAct<C> {
    /// A low-level control passed to the simulator.
    Raw(C),

    /// A high-level action, resolved by the sub-policy it selects.
    Choice(usize),

    /// A step without input.
    Noop,
}

impl<C: Clone + Debug> Act for NavAct<C> {}

/// An environment running one task family on maps generated by a simulator.
///
/// Every reset regenerates maps until the task's sampler finds an episode on
/// one of them, counting every generated map in [`EpisodeStats`]. Every step
/// advances the simulator, computes the reward with [`compute_reward`] and
/// commits the contacts of the step.
pub struct TrackEnv<S: Simulator> {
    config: TaskConfig,
    sim: S,
    rng: SmallRng,
    plan: TaskPlan,
    high_level: bool,
    params: RewardParams,
    sampling: SamplingParams,
    episode: Option<SampledEpisode>,
    stats: EpisodeStats,
    dispatcher: HighLevelDispatcher<S::Obs, S::Control>,
    visualiser: VisualiserLink,
    last_obs: Option<S::Obs>,
    count_steps: usize,
}

impl<S: Simulator> TrackEnv<S> {
    /// Episode statistics.
    pub fn stats(&self) -> &EpisodeStats {
        &self.stats
    }

    /// The task of the current episode.
    pub fn episode(&self) -> Option<&EpisodeTask> {
        self.episode.as_ref().map(|e| &e.task)
    }

    /// Predictions and goal of the current episode.
    pub fn tracker(&self) -> Option<&ContactTracker> {
        self.episode.as_ref().map(|e| &e.tracker)
    }

    /// The simulator.
    pub fn sim(&self) -> &S {
        &self.sim
    }

    /// The simulator.
    pub fn sim_mut(&mut self) -> &mut S {
        &mut self.sim
    }

    /// The task configuration.
    pub fn config(&self) -> &TaskConfig {
        &self.config
    }

    /// Steps taken in the current episode.
    pub fn count_steps(&self) -> usize {
        self.count_steps
    }

    /// Registers the sub-policy behind a high-level action.
    pub fn register_sub_policy(
        &mut self,
        name: &str,
        policy: impl SubPolicy<S::Obs, S::Control> + 'static,
    ) -> Result<(), TaskError> {
        if !self.high_level {
            return Err(TaskError::NotHighLevel(self.config.kind.to_string()));
        }
        self.dispatcher.set_policy(name, policy)
    }

    /// Starts notifying a visualiser of the active policies.
    pub fn connect_visualiser(&mut self, sender: Sender<VisualiserMessage>) {
        self.visualiser.connect(sender);
    }

    /// Active policies: the task itself and the last selected sub-policy.
    pub fn active_policies(&self) -> &BTreeSet<String> {
        self.visualiser.active()
    }

    /// Runs a step with a low-level control, or with no input.
    pub fn raw_step(
        &mut self,
        control: Option<&S::Control>,
    ) -> Result<(S::Obs, RewardOutcome, Record)> {
        let episode = self.episode.as_ref().ok_or(TaskError::NotReset)?;
        let obs = self.sim.advance(control)?;

        let rearm = match episode.task {
            EpisodeTask::KeepLane { .. } => !episode.tracker.off_track(self.sim.map()),
            _ => episode.tracker.touches_prediction(self.sim.map()),
        };
        if rearm {
            self.sim.touch_track();
        }

        let signals = match episode.task {
            EpisodeTask::KeepLane { .. } => {
                self.sim.clear_obstacle_contacts();
                Signals {
                    verdict: FailureVerdict::default(),
                    default_reward: Some(self.sim.default_reward()),
                }
            }
            _ => Signals {
                verdict: self.sim.failure_verdict(),
                default_reward: None,
            },
        };

        let outcome = compute_reward(
            &episode.task,
            self.sim.map(),
            &episode.tracker,
            &self.params,
            &signals,
        )?;
        episode.tracker.commit(self.sim.map_mut());
        self.count_steps += 1;

        let mut record = Record::from_slice(&[
            ("reward", RecordValue::Scalar(outcome.reward)),
            ("full_reward", RecordValue::Scalar(outcome.full_reward)),
            ("task", RecordValue::String(episode.task.label().to_string())),
            (
                "visited_tiles",
                RecordValue::Scalar(episode.tracker.visited_count(self.sim.map()) as f32),
            ),
        ]);
        if let Some(goal) = episode.tracker.goal() {
            record.insert("goal", RecordValue::Scalar(goal as f32));
        }
        if outcome.done {
            record.insert("episode_length", RecordValue::Scalar(self.count_steps as f32));
        }

        self.last_obs = Some(obs.clone());
        Ok((obs, outcome, record))
    }
}

impl<S: Simulator> Env for TrackEnv<S> {
    type Config = TrackEnvConfig<S::Config>;
    type Obs = S::Obs;
    type Act = NavAct<S::Control>;
    type Info = ();

    fn build(config: &Self::Config, seed: i64) -> Result<Self> {
        let task = config.task.clone();
        if task.tiles_before == 0 {
            return Err(
                TaskError::InvalidConfig("tiles_before must be at least 1".to_string()).into(),
            );
        }

        let mut sim = S::build(&config.sim, seed)?;
        sim.set_limits(&task.limits());

        let high_level = task.is_high_level();
        let names = if high_level {
            task.kind.sub_policy_names()
        } else {
            &[]
        };

        Ok(Self {
            sim,
            rng: SmallRng::seed_from_u64(seed as u64),
            plan: task.kind.plan(),
            high_level,
            params: task.reward_params(),
            sampling: task.sampling_params(),
            episode: None,
            stats: task.initial_stats,
            dispatcher: HighLevelDispatcher::new(names),
            visualiser: VisualiserLink::new([task.kind.label().to_string()]),
            last_obs: None,
            count_steps: 0,
            config: task,
        })
    }

    fn step(&mut self, act: &Self::Act) -> Result<(Step<Self>, Record)> {
        let control = match act {
            NavAct::Noop => None,
            NavAct::Raw(control) => Some(control.clone()),
            NavAct::Choice(choice) => {
                if !self.high_level {
                    return Err(TaskError::NotHighLevel(self.config.kind.to_string()).into());
                }
                let obs = self.last_obs.as_ref().ok_or(TaskError::NotReset)?;
                Some(self.dispatcher.resolve(*choice, obs, &mut self.visualiser)?)
            }
        };

        let (obs, outcome, record) = self.raw_step(control.as_ref())?;
        let step = Step::new(
            obs,
            act.clone(),
            outcome.reward,
            outcome.full_reward,
            outcome.done,
            false,
            (),
        );
        Ok((step, record))
    }

    fn reset(&mut self) -> Result<Self::Obs> {
        let mut attempts = 0;
        let episode = loop {
            if let Some(max) = self.config.max_reset_attempts {
                if attempts >= max {
                    return Err(TaskError::ResetExhausted(attempts).into());
                }
            }
            attempts += 1;
            self.stats.total_tracks_generated += 1;

            if !self.sim.regenerate()? {
                debug!("Generated map {} is not usable", attempts);
                continue;
            }
            self.sim.map_mut().clear_episode_state();
            match self
                .plan
                .sample(self.sim.map(), &self.sampling, &mut self.rng)?
            {
                Some(episode) => break episode,
                None => debug!("No {} episode on map {}", self.config.kind, attempts),
            }
        };

        self.sim.place_agent(episode.placement.pose)?;
        if let Some(speed) = episode.placement.speed {
            self.sim.set_speed(speed)?;
        }
        self.stats.record_task(&episode.task);
        info!(
            "{} episode ({}) from tile {} around tile {}, goal {:?}, {} map(s) generated",
            self.config.kind,
            episode.task.label(),
            episode.start,
            episode.anchor,
            episode.tracker.goal(),
            attempts
        );
        self.episode = Some(episode);

        let (obs, _, _) = self.raw_step(None)?;
        self.count_steps = 0;
        Ok(obs)
    }

    /// Reseeds the sampling randomness with `ix` and resets.
    fn reset_with_index(&mut self, ix: usize) -> Result<Self::Obs> {
        self.rng = SmallRng::seed_from_u64(ix as u64);
        self.reset()
    }
}
