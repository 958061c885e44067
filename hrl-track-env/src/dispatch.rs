//! High-level action dispatch.
use crate::{TaskError, VisualiserLink};

/// A low-level controller behind a high-level action.
pub trait SubPolicy<O, C> {
    /// Control for an observation.
    fn control(&mut self, obs: &O) -> C;
}

impl<O, C, F> SubPolicy<O, C> for F
where
    F: FnMut(&O) -> C,
{
    fn control(&mut self, obs: &O) -> C {
        self(obs)
    }
}

/// Resolves high-level actions into low-level controls.
///
/// High-level action `i` selects the sub-policy named `names[i]`. The
/// visualiser is told whenever the selected sub-policy changes.
pub struct HighLevelDispatcher<O, C> {
    names: &'static [&'static str],
    policies: Vec<Option<Box<dyn SubPolicy<O, C>>>>,
    current: Option<usize>,
}

impl<O, C> HighLevelDispatcher<O, C> {
    /// A dispatcher without registered sub-policies.
    pub fn new(names: &'static [&'static str]) -> Self {
        Self {
            names,
            policies: names.iter().map(|_| None).collect(),
            current: None,
        }
    }

    /// Names of the sub-policies, indexed by high-level action.
    pub fn names(&self) -> &'static [&'static str] {
        self.names
    }

    /// Registers the sub-policy behind a name.
    pub fn set_policy(
        &mut self,
        name: &str,
        policy: impl SubPolicy<O, C> + 'static,
    ) -> Result<(), TaskError> {
        let ix = self
            .names
            .iter()
            .position(|n| *n == name)
            .ok_or_else(|| TaskError::UnknownSubPolicy(name.to_string()))?;
        self.policies[ix] = Some(Box::new(policy));
        Ok(())
    }

    /// Whether every name has a sub-policy.
    pub fn is_complete(&self) -> bool {
        self.policies.iter().all(Option::is_some)
    }

    /// Name of the last selected sub-policy.
    pub fn current(&self) -> Option<&'static str> {
        self.current.map(|ix| self.names[ix])
    }

    /// Runs the sub-policy selected by `choice` on an observation.
    pub fn resolve(
        &mut self,
        choice: usize,
        obs: &O,
        link: &mut VisualiserLink,
    ) -> Result<C, TaskError> {
        let n = self.names.len();
        let name = *self
            .names
            .get(choice)
            .ok_or(TaskError::ChoiceOutOfRange { choice, n })?;
        let policy = self.policies[choice]
            .as_mut()
            .ok_or_else(|| TaskError::MissingSubPolicy(name.to_string()))?;
        let control = policy.control(obs);

        if self.current != Some(choice) {
            if let Some(prev) = self.current {
                link.remove(self.names[prev]);
            }
            link.add(name);
            self.current = Some(choice);
        }

        Ok(control)
    }
}
