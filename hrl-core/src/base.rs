//! Core functionalities.
mod env;
mod policy;
mod step;
pub use env::Env;
pub use policy::Policy;
use std::fmt::Debug;
pub use step::{Info, Step};

/// An observation of an environment.
///
/// Environments in this workspace are not vectorized, so an observation
/// always describes a single agent.
pub trait Obs: Clone + Debug {}

/// An action on an environment.
pub trait Act: Clone + Debug {}
