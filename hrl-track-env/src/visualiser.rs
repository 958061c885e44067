//! Notifications of active policies to a visualiser.
//!
//! The environment pushes [`VisualiserMessage`]s through a bounded channel
//! and never waits on it: a full channel drops the message and a disconnected
//! receiver detaches the link. An [`ActivePolicyBoard`] on the other end
//! folds the messages back into the set of active policies.
use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use log::debug;
use std::{collections::BTreeSet, thread::JoinHandle};

/// Messages received by a visualiser.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum VisualiserMessage {
    /// The whole set of active policies, sent on connection.
    AddActivePolicies(BTreeSet<String>),

    /// A policy became active.
    AddActivePolicy(String),

    /// A policy stopped being active.
    RemoveActivePolicy(String),
}

impl VisualiserMessage {
    /// Name of the command.
    pub fn method_name(&self) -> &'static str {
        match self {
            Self::AddActivePolicies(_) => "add_active_policies",
            Self::AddActivePolicy(_) => "add_active_policy",
            Self::RemoveActivePolicy(_) => "remove_active_policy",
        }
    }
}

/// Creates a channel for visualiser messages.
pub fn channel(capacity: usize) -> (Sender<VisualiserMessage>, Receiver<VisualiserMessage>) {
    bounded(capacity)
}

/// The environment's end: the active policies and an optional sender.
#[derive(Debug, Default)]
pub struct VisualiserLink {
    active: BTreeSet<String>,
    sender: Option<Sender<VisualiserMessage>>,
}

impl VisualiserLink {
    /// A disconnected link with initial active policies.
    pub fn new(active: impl IntoIterator<Item = String>) -> Self {
        Self {
            active: active.into_iter().collect(),
            sender: None,
        }
    }

    /// Attaches a sender and announces the current active policies.
    pub fn connect(&mut self, sender: Sender<VisualiserMessage>) {
        self.sender = Some(sender);
        self.send(VisualiserMessage::AddActivePolicies(self.active.clone()));
    }

    /// Whether a sender is attached.
    pub fn is_connected(&self) -> bool {
        self.sender.is_some()
    }

    /// Active policies.
    pub fn active(&self) -> &BTreeSet<String> {
        &self.active
    }

    /// Marks a policy as active.
    pub fn add(&mut self, name: &str) {
        if self.active.insert(name.to_string()) {
            self.send(VisualiserMessage::AddActivePolicy(name.to_string()));
        }
    }

    /// Marks a policy as inactive.
    pub fn remove(&mut self, name: &str) {
        if self.active.remove(name) {
            self.send(VisualiserMessage::RemoveActivePolicy(name.to_string()));
        }
    }

    fn send(&mut self, msg: VisualiserMessage) {
        let sender = match &self.sender {
            Some(sender) => sender,
            None => return,
        };
        match sender.try_send(msg) {
            Ok(()) => {}
            Err(TrySendError::Full(msg)) => {
                debug!("Visualiser channel is full, dropped {}", msg.method_name());
            }
            Err(TrySendError::Disconnected(_)) => {
                debug!("Visualiser disconnected");
                self.sender = None;
            }
        }
    }
}

/// The visualiser's end: the active policies as announced by the environment.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ActivePolicyBoard {
    active: BTreeSet<String>,
}

impl ActivePolicyBoard {
    /// An empty board.
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies a message.
    pub fn apply(&mut self, msg: &VisualiserMessage) {
        match msg {
            VisualiserMessage::AddActivePolicies(names) => {
                self.active.extend(names.iter().cloned())
            }
            VisualiserMessage::AddActivePolicy(name) => {
                self.active.insert(name.clone());
            }
            VisualiserMessage::RemoveActivePolicy(name) => {
                self.active.remove(name);
            }
        }
    }

    /// Active policies.
    pub fn active(&self) -> &BTreeSet<String> {
        &self.active
    }

    /// Applies messages until every sender is dropped.
    pub fn run(mut self, receiver: Receiver<VisualiserMessage>) -> Self {
        while let Ok(msg) = receiver.recv() {
            self.apply(&msg);
        }
        self
    }

    /// Runs a board on a new thread.
    pub fn spawn(receiver: Receiver<VisualiserMessage>) -> JoinHandle<Self> {
        std::thread::spawn(move || Self::new().run(receiver))
    }
}
