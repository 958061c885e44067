//! Maps shared by the integration tests.
#![allow(dead_code)]
use hrl_track_env::{Pose, TaskConfig, Tile, TrackEnvConfig, TrackMap, WalkSimConfig};
use std::f64::consts::PI;

/// A circular track of `n` tiles of radius `r` centered at `(cx, cy)`, driven
/// counter-clockwise.
pub fn ring(n: usize, r: f64, cx: f64, cy: f64) -> Vec<Tile> {
    (0..n)
        .map(|i| {
            let a = 2.0 * PI * i as f64 / n as f64;
            Tile::new(Pose {
                alpha: a,
                beta: a,
                x: cx + r * a.cos(),
                y: cy + r * a.sin(),
            })
        })
        .collect()
}

/// Two rings crossing twice.
///
/// Track 0 has 40 tiles of radius 100 around the origin, track 1 has 20 tiles
/// of radius 50 around `(100, 0)`. Intersection 0 joins tiles 3 and 46,
/// intersection 1 joins tiles 37 and 54.
pub fn two_rings() -> Vec<Vec<Tile>> {
    let mut outer = ring(40, 100.0, 0.0, 0.0);
    let mut inner = ring(20, 50.0, 100.0, 0.0);
    for (local, id) in [(3, 0), (37, 1)] {
        outer[local] = outer[local].clone().intersection(id).cross_tile();
    }
    for (local, id) in [(6, 0), (14, 1)] {
        inner[local] = inner[local].clone().intersection(id).cross_tile();
    }
    vec![outer, inner]
}

/// A single ring without junctions.
pub fn plain_ring() -> Vec<Vec<Tile>> {
    vec![ring(40, 100.0, 0.0, 0.0)]
}

pub fn map(tracks: Vec<Vec<Tile>>) -> TrackMap {
    TrackMap::new(tracks).unwrap()
}

/// Two tracks of 20 tiles sharing intersection 3 at tiles 10 and 25.
pub fn forty_tiles() -> TrackMap {
    let mut first = ring(20, 60.0, 0.0, 0.0);
    let mut second = ring(20, 60.0, 200.0, 0.0);
    first[10] = first[10].clone().intersection(3).cross_tile();
    second[5] = second[5].clone().intersection(3).cross_tile();
    map(vec![first, second])
}

/// Environment configuration for a task on the given maps, generated in turn.
pub fn env_config(task: TaskConfig, maps: Vec<Vec<Vec<Tile>>>) -> TrackEnvConfig<WalkSimConfig> {
    let sim = maps
        .into_iter()
        .fold(WalkSimConfig::default(), |sim, tracks| sim.map(tracks));
    TrackEnvConfig::default().task(task).sim(sim)
}
