use anyhow::Result;
use hrl_core::{record::BufferedRecorder, util, Env, Policy};
use hrl_track_env::{
    channel, ActivePolicyBoard, Lane, NavAct, Pose, TaskConfig, TaskKind, Tile, TileWalkSim,
    TrackEnv, TrackEnvConfig, WalkControl, WalkObs, WalkSimConfig,
};
use rand::{rngs::SmallRng, Rng, SeedableRng};
use std::f64::consts::PI;

type X = TrackEnv<TileWalkSim>;

fn ring(n: usize, r: f64, cx: f64) -> Vec<Tile> {
    (0..n)
        .map(|i| {
            let a = 2.0 * PI * i as f64 / n as f64;
            Tile::new(Pose {
                alpha: a,
                beta: a,
                x: cx + r * a.cos(),
                y: r * a.sin(),
            })
        })
        .collect()
}

fn crossing_rings() -> Vec<Vec<Tile>> {
    let mut outer = ring(40, 100.0, 0.0);
    let mut inner = ring(20, 50.0, 100.0);
    outer[3] = outer[3].clone().intersection(0).cross_tile();
    outer[37] = outer[37].clone().intersection(1).cross_tile();
    inner[6] = inner[6].clone().intersection(0).cross_tile();
    inner[14] = inner[14].clone().intersection(1).cross_tile();
    vec![outer, inner]
}

struct RandomChoice {
    rng: SmallRng,
}

impl Policy<X> for RandomChoice {
    fn sample(&mut self, _: &WalkObs) -> NavAct<WalkControl> {
        NavAct::Choice(self.rng.gen_range(0..2))
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let sim = WalkSimConfig::default()
        .map(vec![ring(40, 100.0, 0.0)])
        .map(crossing_rings());
    let config = TrackEnvConfig::<WalkSimConfig>::default()
        .task(TaskConfig::default().kind(TaskKind::X))
        .sim(sim);
    let mut env = X::build(&config, 42)?;

    // Both sub-policies step to the next tile index, one of them across both lanes.
    let n_tiles = crossing_rings().iter().map(Vec::len).sum::<usize>();
    env.register_sub_policy("turn", move |obs: &WalkObs| match obs.tile {
        Some(tile) => WalkControl::Straddle((tile + 1) % n_tiles),
        None => WalkControl::Idle,
    })?;
    env.register_sub_policy("take_center", move |obs: &WalkObs| match obs.tile {
        Some(tile) => WalkControl::Goto {
            tile: (tile + 1) % n_tiles,
            lane: obs.lanes.first().copied().unwrap_or(Lane::Left),
        },
        None => WalkControl::Idle,
    })?;

    let (sender, receiver) = channel(64);
    let board = ActivePolicyBoard::spawn(receiver);
    env.connect_visualiser(sender);

    let mut policy = RandomChoice {
        rng: SmallRng::seed_from_u64(42),
    };
    let mut recorder = BufferedRecorder::new();
    let returns = util::eval_with_recorder(&mut env, &mut policy, 5, &mut recorder)?;

    println!("returns: {:?}", returns);
    println!("{} steps recorded", recorder.len());
    println!("{:?}", env.stats());

    drop(env);
    if let Ok(board) = board.join() {
        println!("active policies at the end: {:?}", board.active());
    }
    Ok(())
}
