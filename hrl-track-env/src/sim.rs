//! Contract with the physics simulator.
use crate::{FailureVerdict, StepReward, TrackMap};
use anyhow::Result;
use serde::{de::DeserializeOwned, Serialize};
use std::fmt::Debug;

/// Pose of the agent in map coordinates.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct AgentPose {
    /// Heading, see [`Pose::beta`](crate::Pose::beta).
    pub heading: f64,

    /// X coordinate.
    pub x: f64,

    /// Y coordinate.
    pub y: f64,
}

/// Episode limits enforced by the simulator.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EpisodeLimits {
    /// Seconds without useful track contact before the episode fails.
    pub max_time_out: f64,

    /// Whether leaving the drivable surface is tolerated.
    pub allow_outside: bool,
}

/// A simulator that generates maps, moves the agent and reports contacts.
///
/// After every call to [`Simulator::advance`] the contact counters of the
/// tiles of [`Simulator::map_mut`] must describe what the agent touches. The
/// environment owns the `visited` flags and the `*_delay` counters.
pub trait Simulator {
    /// Configuration.
    type Config: Clone + Default + Serialize + DeserializeOwned;

    /// Observation.
    type Obs: hrl_core::Obs;

    /// Low-level control.
    type Control: Clone + Debug;

    /// Builds a simulator with a random seed.
    fn build(config: &Self::Config, seed: i64) -> Result<Self>
    where
        Self: Sized;

    /// Generates a new map. `Ok(false)` when the generated map is not usable.
    fn regenerate(&mut self) -> Result<bool>;

    /// The current map.
    fn map(&self) -> &TrackMap;

    /// The current map.
    fn map_mut(&mut self) -> &mut TrackMap;

    /// Sets the limits checked by [`Simulator::failure_verdict`].
    fn set_limits(&mut self, limits: &EpisodeLimits);

    /// Puts the agent at a pose.
    fn place_agent(&mut self, pose: AgentPose) -> Result<()>;

    /// Sets the speed of the agent.
    fn set_speed(&mut self, speed: f64) -> Result<()>;

    /// Runs one step with a control, or with no input.
    fn advance(&mut self, control: Option<&Self::Control>) -> Result<Self::Obs>;

    /// Restarts the no-contact timer.
    fn touch_track(&mut self);

    /// Outside, time-out and unvisited-budget checks of the current step.
    fn failure_verdict(&self) -> FailureVerdict;

    /// The simulator's own reward of the current step, failure checks included.
    fn default_reward(&self) -> StepReward;

    /// Forgets contacts with obstacles.
    fn clear_obstacle_contacts(&mut self);
}
