//! A simulator that walks the agent over tiles.
use crate::{
    AgentPose, EpisodeLimits, FailureVerdict, Lane, Simulator, StepReward, Tile, TileId, TrackMap,
    HARD_NEG_REWARD, SOFT_NEG_REWARD,
};
use anyhow::{bail, Result};
use hrl_core::Obs;
use log::trace;
use serde::{Deserialize, Serialize};
use std::{
    fs::File,
    io::{BufReader, Write},
    path::Path,
};

/// Penalty of one contact with an obstacle.
const OBSTACLE_PENALTY: f32 = 1.0;

/// Controls of [`TileWalkSim`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum WalkControl {
    /// Stay where the agent is.
    Idle,

    /// Move onto a lane of a tile.
    Goto {
        /// Tile.
        tile: TileId,
        /// Lane.
        lane: Lane,
    },

    /// Move onto a tile, across both lanes.
    Straddle(TileId),

    /// Leave the road.
    LeaveTrack,

    /// Run into an obstacle without moving.
    Bump,
}

/// Observation of [`TileWalkSim`].
#[derive(Clone, Debug, PartialEq)]
pub struct WalkObs {
    /// Tile under the agent.
    pub tile: Option<TileId>,

    /// Lanes under the agent.
    pub lanes: Vec<Lane>,

    /// Speed.
    pub speed: f64,

    /// Simulated time.
    pub t: f64,
}

impl Obs for WalkObs {}

/// Configuration of [`TileWalkSim`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WalkSimConfig {
    /// Seconds per step.
    pub dt: f64,

    /// Steps in a row without reaching an unvisited tile before the episode
    /// fails, unlimited if `None`.
    pub unvisited_budget: Option<usize>,

    /// Maps, each a list of tracks, generated in turn.
    pub maps: Vec<Vec<Vec<Tile>>>,
}

impl Default for WalkSimConfig {
    fn default() -> Self {
        Self {
            dt: 1.0 / 50.0,
            unvisited_budget: None,
            maps: vec![],
        }
    }
}

impl WalkSimConfig {
    /// Sets the duration of a step.
    pub fn dt(mut self, dt: f64) -> Self {
        self.dt = dt;
        self
    }

    /// Sets the unvisited-tile budget.
    pub fn unvisited_budget(mut self, budget: Option<usize>) -> Self {
        self.unvisited_budget = budget;
        self
    }

    /// Appends a map.
    pub fn map(mut self, tracks: Vec<Vec<Tile>>) -> Self {
        self.maps.push(tracks);
        self
    }

    /// Loads a configuration from a YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path)?;
        let rdr = BufReader::new(file);
        let b = serde_yaml::from_reader(rdr)?;
        Ok(b)
    }

    /// Saves the configuration to a YAML file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let mut file = File::create(path)?;
        file.write_all(serde_yaml::to_string(&self)?.as_bytes())?;
        Ok(())
    }
}

/// Moves the agent from tile to tile on command.
///
/// Maps are taken in turn from the configuration, wrapping around. A map
/// without tracks is reported as unusable. Contact counters always describe
/// the tile and lanes the agent is on after the last step.
pub struct TileWalkSim {
    config: WalkSimConfig,
    limits: EpisodeLimits,
    map: TrackMap,
    next_map: usize,
    agent: Option<(TileId, Vec<Lane>)>,
    speed: f64,
    t: f64,
    last_touch: f64,
    steps_without_new_tile: usize,
    obstacle_contacts: u32,
}

impl TileWalkSim {
    /// Tile under the agent.
    pub fn agent_tile(&self) -> Option<TileId> {
        self.agent.as_ref().map(|(tile, _)| *tile)
    }

    /// Number of maps generated so far.
    pub fn maps_generated(&self) -> usize {
        self.next_map
    }

    fn obs(&self) -> WalkObs {
        WalkObs {
            tile: self.agent_tile(),
            lanes: self
                .agent
                .as_ref()
                .map(|(_, lanes)| lanes.clone())
                .unwrap_or_default(),
            speed: self.speed,
            t: self.t,
        }
    }

    fn write_contacts(&mut self) {
        for tile in self.map.tiles_mut() {
            tile.count_left = 0;
            tile.count_right = 0;
        }
        if let Some((id, lanes)) = &self.agent {
            let tile = &mut self.map.tiles_mut()[*id];
            for lane in lanes {
                match lane {
                    Lane::Left => tile.count_left += 1,
                    Lane::Right => tile.count_right += 1,
                }
            }
        }
    }

    fn nearest_tile(&self, x: f64, y: f64) -> Option<TileId> {
        self.map
            .tiles()
            .iter()
            .enumerate()
            .map(|(id, tile)| (id, (tile.pose.x - x).hypot(tile.pose.y - y)))
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(id, _)| id)
    }
}

impl Simulator for TileWalkSim {
    type Config = WalkSimConfig;
    type Obs = WalkObs;
    type Control = WalkControl;

    fn build(config: &Self::Config, _seed: i64) -> Result<Self> {
        Ok(Self {
            config: config.clone(),
            limits: EpisodeLimits {
                max_time_out: 1.0,
                allow_outside: false,
            },
            map: TrackMap::new(vec![vec![Tile::default()]])?,
            next_map: 0,
            agent: None,
            speed: 0.0,
            t: 0.0,
            last_touch: 0.0,
            steps_without_new_tile: 0,
            obstacle_contacts: 0,
        })
    }

    fn regenerate(&mut self) -> Result<bool> {
        if self.config.maps.is_empty() {
            bail!("No map to generate");
        }
        let tracks = self.config.maps[self.next_map % self.config.maps.len()].clone();
        self.next_map += 1;

        self.agent = None;
        self.t = 0.0;
        self.last_touch = 0.0;
        self.steps_without_new_tile = 0;
        self.obstacle_contacts = 0;

        match TrackMap::new(tracks) {
            Ok(map) => {
                self.map = map;
                Ok(true)
            }
            Err(e) => {
                trace!("Unusable map: {}", e);
                Ok(false)
            }
        }
    }

    fn map(&self) -> &TrackMap {
        &self.map
    }

    fn map_mut(&mut self) -> &mut TrackMap {
        &mut self.map
    }

    fn set_limits(&mut self, limits: &EpisodeLimits) {
        self.limits = *limits;
    }

    fn place_agent(&mut self, pose: AgentPose) -> Result<()> {
        let id = match self.nearest_tile(pose.x, pose.y) {
            Some(id) => id,
            None => bail!("No tile to place the agent on"),
        };
        let tile = self.map.tile(id)?.pose;
        let (lx, ly) = tile.lateral();
        let lane = if (pose.x - tile.x) * lx + (pose.y - tile.y) * ly > 0.0 {
            Lane::Right
        } else {
            Lane::Left
        };
        self.agent = Some((id, vec![lane]));
        self.last_touch = self.t;
        Ok(())
    }

    fn set_speed(&mut self, speed: f64) -> Result<()> {
        self.speed = speed;
        Ok(())
    }

    fn advance(&mut self, control: Option<&Self::Control>) -> Result<Self::Obs> {
        match control {
            None | Some(WalkControl::Idle) => {}
            Some(WalkControl::Goto { tile, lane }) => {
                self.map.tile(*tile)?;
                self.agent = Some((*tile, vec![*lane]));
            }
            Some(WalkControl::Straddle(tile)) => {
                self.map.tile(*tile)?;
                self.agent = Some((*tile, vec![Lane::Left, Lane::Right]));
            }
            Some(WalkControl::LeaveTrack) => self.agent = None,
            Some(WalkControl::Bump) => self.obstacle_contacts += 1,
        }
        self.t += self.config.dt;
        self.write_contacts();

        let new_tile = self
            .map
            .tiles()
            .iter()
            .any(|tile| tile.contacted() && !tile.visited);
        if new_tile {
            self.steps_without_new_tile = 0;
        } else {
            self.steps_without_new_tile += 1;
        }

        Ok(self.obs())
    }

    fn touch_track(&mut self) {
        self.last_touch = self.t;
    }

    fn failure_verdict(&self) -> FailureVerdict {
        let outside = self.agent.is_none() && !self.limits.allow_outside;
        let timed_out = self.t - self.last_touch > self.limits.max_time_out;
        let out_of_budget = self
            .config
            .unvisited_budget
            .map_or(false, |budget| self.steps_without_new_tile > budget);

        if outside || timed_out || out_of_budget {
            trace!(
                "Failure: outside {}, timed out {}, out of budget {}",
                outside,
                timed_out,
                out_of_budget
            );
            FailureVerdict {
                penalty: HARD_NEG_REWARD,
                done: true,
            }
        } else {
            FailureVerdict::default()
        }
    }

    fn default_reward(&self) -> StepReward {
        let new_tiles = self
            .map
            .tiles()
            .iter()
            .filter(|tile| tile.contacted() && !tile.visited)
            .count();
        let verdict = self.failure_verdict();
        let all_visited = self
            .map
            .tiles()
            .iter()
            .all(|tile| tile.visited || tile.contacted());

        let reward = -SOFT_NEG_REWARD + new_tiles as f32
            - OBSTACLE_PENALTY * self.obstacle_contacts as f32
            - verdict.penalty;
        StepReward {
            reward,
            full_reward: reward,
            done: verdict.done || all_visited,
        }
    }

    fn clear_obstacle_contacts(&mut self) {
        self.obstacle_contacts = 0;
    }
}
