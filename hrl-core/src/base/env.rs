//! Environment.
use super::{Act, Info, Obs, Step};
use crate::record::{Record, RecordValue};
use anyhow::Result;

/// Represents an episodic environment.
pub trait Env {
    /// Configurations.
    type Config: Clone;

    /// Observation of the environment.
    type Obs: Obs;

    /// Action of the environment.
    type Act: Act;

    /// Information in the [self::Step] object.
    type Info: Info;

    /// Builds an environment with a given random seed.
    fn build(config: &Self::Config, seed: i64) -> Result<Self>
    where
        Self: Sized;

    /// Performs an environment step.
    ///
    /// Errors are reserved for broken invariants (e.g. a malformed action).
    /// The end of an episode is reported through [`Step::is_done`].
    fn step(&mut self, a: &Self::Act) -> Result<(Step<Self>, Record)>
    where
        Self: Sized;

    /// Resets the environment and returns the first observation of a new episode.
    fn reset(&mut self) -> Result<Self::Obs>;

    /// Resets the environment with a given index.
    ///
    /// The index is used in an arbitrary way, typically as a random seed
    /// for reproducible evaluation.
    fn reset_with_index(&mut self, ix: usize) -> Result<Self::Obs>;

    /// Performs an environment step and resets the environment if the episode ends.
    ///
    /// The first observation of the next episode is stored in [`Step::init_obs`].
    fn step_with_reset(&mut self, a: &Self::Act) -> Result<(Step<Self>, Record)>
    where
        Self: Sized,
    {
        let (mut step, mut record) = self.step(a)?;
        if step.is_done() {
            step.init_obs = Some(self.reset()?);
            record.insert("reset", RecordValue::Scalar(1.0));
        }
        Ok((step, record))
    }
}
