//! Policy.
use super::Env;

/// A policy on an environment.
///
/// Policy is a mapping from an observation to an action.
/// The mapping can be either of deterministic or stochastic.
pub trait Policy<E: Env> {
    /// Sample an action given an observation.
    fn sample(&mut self, obs: &E::Obs) -> E::Act;
}

impl<E, F> Policy<E> for F
where
    E: Env,
    F: FnMut(&E::Obs) -> E::Act,
{
    fn sample(&mut self, obs: &E::Obs) -> E::Act {
        self(obs)
    }
}
