#![warn(missing_docs)]
//! Core contracts shared by hierarchical driving-task environments.
//!
//! The crate defines how an environment talks to the code that drives it:
//!
//! * [`Env`] is an episodic environment with `reset`/`step`.
//! * [`Step`] is what an environment emits at every interaction step, carrying
//!   both the clipped reward used for training and the unclipped one used for
//!   bookkeeping.
//! * [`Policy`] maps an observation to an action.
//! * [`record`] holds the key-value container used for step information and
//!   evaluation results.
//! * [`Evaluator`] runs a policy for a number of episodes.
pub mod error;
pub mod record;
pub mod util;

mod base;
pub use base::{Act, Env, Info, Obs, Policy, Step};

mod evaluator;
pub use evaluator::{DefaultEvaluator, Evaluator};
