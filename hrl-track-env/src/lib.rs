#![warn(missing_docs)]
//! Hierarchical driving tasks on procedurally generated road networks.
//!
//! A road network is a [`TrackMap`]: one or more circular tracks of [`Tile`]s
//! flattened into a single index space, with intersections marked by a shared
//! intersection id. On top of it this crate provides
//!
//! * the intersection analyzer ([`close_intersections`],
//!   [`understand_intersection`]),
//! * task samplers that pick a start, a prediction window and a goal for every
//!   task family ([`sampler`]),
//! * the [`ContactTracker`] and the pure reward function [`compute_reward`],
//! * [`TrackEnv`], an [`hrl_core::Env`] that ties them to a physics
//!   [`Simulator`], dispatches high-level actions to sub-policies and reports
//!   active policies to an optional visualiser.
//!
//! [`TileWalkSim`] is a simulator that moves the agent from tile to tile
//! without physics. It is enough to drive every task end to end.
//!
//! ```no_run
//! use hrl_track_env::{
//!     NavAct, TaskConfig, TaskKind, TileWalkSim, TrackEnv, TrackEnvConfig, WalkSimConfig,
//! };
//! use hrl_core::Env;
//!
//! # fn main() -> anyhow::Result<()> {
//! let config = TrackEnvConfig::<WalkSimConfig>::default()
//!     .task(TaskConfig::default().kind(TaskKind::X).max_reset_attempts(Some(100)))
//!     .sim(WalkSimConfig::load("maps.yaml")?);
//! let mut env = TrackEnv::<TileWalkSim>::build(&config, 42)?;
//! let _obs = env.reset()?;
//! let (_step, record) = env.step(&NavAct::Noop)?;
//! println!("{:?}", record.get_string("task"));
//! # Ok(())
//! # }
//! ```
mod dispatch;
mod env;
mod error;
mod intersection;
mod prediction;
mod reward;
pub mod sampler;
mod sim;
mod task;
mod tracker;
mod track;
mod visualiser;
mod walk_sim;

pub use dispatch::{HighLevelDispatcher, SubPolicy};
pub use env::{NavAct, TaskConfig, TrackEnv, TrackEnvConfig};
pub use error::{TaskError, TrackError};
pub use intersection::{
    close_intersections, is_close_to_intersection, understand_intersection, Branch, Direction,
    IntersectionBranches, Maneuver,
};
pub use prediction::{PredictionEntry, PredictionSet};
pub use reward::{
    compute_reward, lane_change_factor, EpisodeStatus, FailureVerdict, RewardBounds,
    RewardOutcome, RewardParams, Signals, StepReward,
};
pub use sim::{AgentPose, EpisodeLimits, Simulator};
pub use task::{EpisodeStats, EpisodeTask, Side, TaskKind, TaskPlan};
pub use track::{Lane, Pose, Tile, TileId, TrackMap};
pub use tracker::ContactTracker;
pub use visualiser::{channel, ActivePolicyBoard, VisualiserLink, VisualiserMessage};
pub use walk_sim::{TileWalkSim, WalkControl, WalkObs, WalkSimConfig};

/// Penalty subtracted from the reward at every step.
pub const SOFT_NEG_REWARD: f32 = 0.1;

/// Penalty of a failed episode (off track, timed out or out of budget).
pub const HARD_NEG_REWARD: f32 = 100.0;

/// Number of tiles looked ahead when deciding whether the agent is close to an
/// intersection.
pub const CLOSE_TO_INTERSECTION: usize = 8;
