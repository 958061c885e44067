mod common;
use anyhow::Result;
use common::{env_config, plain_ring, two_rings};
use hrl_core::{
    record::BufferedRecorder, util::eval_with_recorder, DefaultEvaluator, Env, Evaluator,
};
use hrl_track_env::{
    channel, EpisodeStatus, EpisodeTask, Lane, NavAct, Simulator, TaskConfig, TaskError,
    TaskKind, Tile, TileWalkSim, TrackEnv, WalkControl, WalkObs,
};
use test_log::test;

fn build(task: TaskConfig, maps: Vec<Vec<Vec<Tile>>>) -> Result<TrackEnv<TileWalkSim>> {
    TrackEnv::build(&env_config(task, maps), 42)
}

fn center_env() -> Result<TrackEnv<TileWalkSim>> {
    build(
        TaskConfig::default().kind(TaskKind::TakeCenter),
        vec![two_rings()],
    )
}

fn goto(tile: usize, lane: Lane) -> NavAct<WalkControl> {
    NavAct::Raw(WalkControl::Goto { tile, lane })
}

fn task_error(err: &anyhow::Error) -> Option<&TaskError> {
    err.downcast_ref::<TaskError>()
}

#[test]
fn x_reset_regenerates_until_a_crossing_exists() -> Result<()> {
    let mut env = build(
        TaskConfig::default().kind(TaskKind::X),
        vec![plain_ring(), vec![], two_rings()],
    )?;

    env.reset()?;
    assert_eq!(env.stats().total_tracks_generated, 3);
    assert_eq!(env.sim().maps_generated(), 3);
    assert!(["left", "right", "center"].contains(&env.episode().unwrap().label()));
    assert_eq!(env.count_steps(), 0);

    env.reset()?;
    assert_eq!(env.stats().total_tracks_generated, 6);
    let stats = env.stats();
    assert_eq!(stats.left_count + stats.right_count + stats.center_count, 2);
    Ok(())
}

#[test]
fn reset_gives_up_after_max_attempts() -> Result<()> {
    let mut env = build(
        TaskConfig::default()
            .kind(TaskKind::X)
            .max_reset_attempts(Some(5)),
        vec![plain_ring()],
    )?;

    let err = env.reset().err().unwrap();
    assert_eq!(task_error(&err), Some(&TaskError::ResetExhausted(5)));
    assert_eq!(env.stats().total_tracks_generated, 5);
    assert!(env.episode().is_none());
    Ok(())
}

#[test]
fn x_samples_left_right_and_center_evenly() -> Result<()> {
    let mut env = build(TaskConfig::default().kind(TaskKind::X), vec![two_rings()])?;
    let n = 3000;
    for _ in 0..n {
        env.reset()?;
    }

    let stats = env.stats();
    assert_eq!(stats.total_tracks_generated, n);
    assert_eq!(stats.left_count + stats.right_count + stats.center_count, n);
    for count in [stats.left_count, stats.right_count, stats.center_count] {
        let rate = count as f64 / n as f64;
        assert!((rate - 1.0 / 3.0).abs() < 0.04, "rate {}", rate);
    }
    Ok(())
}

#[test]
fn reaching_the_goal_ends_the_episode() -> Result<()> {
    for max_step_reward in [None, Some(1.0)] {
        let mut task = TaskConfig::default().kind(TaskKind::TakeCenter);
        if let Some(v) = max_step_reward {
            task = task.max_step_reward(v);
        }
        let mut env = build(task, vec![two_rings()])?;
        env.reset()?;
        let goal = env.tracker().unwrap().goal().unwrap();

        let (step, record) = env.step(&goto(goal, Lane::Left))?;
        assert!(step.is_done());
        assert!((step.full_reward - 9.9).abs() < 1e-5);
        assert!((step.reward - max_step_reward.unwrap_or(9.9)).abs() < 1e-5);
        assert_eq!(record.get_string("task")?, "center");
        assert_eq!(record.get_scalar("goal")?, goal as f32);
        assert_eq!(record.get_scalar("episode_length")?, 1.0);
    }
    Ok(())
}

#[test]
fn predicted_tiles_pay_once() -> Result<()> {
    let mut env = center_env()?;
    env.reset()?;

    let (lane, track) = match env.episode() {
        Some(EpisodeTask::Center { lane, track, .. }) => (*lane, *track),
        other => panic!("unexpected task {:?}", other),
    };
    let tracker = env.tracker().unwrap().clone();
    let map = env.sim().map();
    let mut candidates: Vec<usize> = tracker
        .predictions()
        .tiles()
        .filter(|&id| {
            let tile = &map.tiles()[id];
            tile.track_id == track && !tile.visited && Some(id) != tracker.goal()
        })
        .collect();
    candidates.dedup();
    assert!(candidates.len() >= 2);

    let (step, _) = env.step(&goto(candidates[0], lane))?;
    assert!((step.reward - 0.9).abs() < 1e-5);
    assert!(!step.is_done());

    let (step, _) = env.step(&goto(candidates[0], lane))?;
    assert!((step.reward + 0.1).abs() < 1e-5);

    // A new tile reached in the opposite lane counts half.
    let (step, _) = env.step(&goto(candidates[1], lane.other()))?;
    assert!((step.reward - 0.4).abs() < 1e-5);
    assert_eq!(env.count_steps(), 3);
    Ok(())
}

#[test]
fn turns_reach_the_goal_on_the_other_track() -> Result<()> {
    for (kind, labels) in [
        (TaskKind::TurnLeft, &["left"][..]),
        (TaskKind::TurnRight, &["right"][..]),
        (TaskKind::Turn, &["left", "right"][..]),
    ] {
        let mut env = build(TaskConfig::default().kind(kind), vec![two_rings()])?;
        for _ in 0..8 {
            env.reset()?;
            let label = env.episode().unwrap().label();
            assert!(labels.contains(&label), "{:?} sampled {}", kind, label);

            let tracker = env.tracker().unwrap().clone();
            let goal = tracker.goal().unwrap();
            let predicted: Vec<usize> = tracker.predictions().tiles().collect();
            let (before, after) = predicted.split_at(predicted.len() / 2);
            let track_of = |id: usize| env.sim().map().tiles()[id].track_id;
            assert_ne!(track_of(before[0]), track_of(goal));
            assert_eq!(after.last(), Some(&goal));

            // Drive up to the junction and through the branch, the first new
            // tile across both lanes.
            let route: Vec<usize> = before
                .iter()
                .rev()
                .chain(after)
                .copied()
                .filter(|&id| id != goal)
                .collect();
            let mut straddled = false;
            for id in route {
                if env.sim().map().tiles()[id].visited {
                    continue;
                }
                let (act, expected) = if straddled {
                    (goto(id, Lane::Right), 0.9)
                } else {
                    (NavAct::Raw(WalkControl::Straddle(id)), 0.4)
                };
                let (step, _) = env.step(&act)?;
                assert!(
                    (step.full_reward - expected).abs() < 1e-5,
                    "tile {}: {}",
                    id,
                    step.full_reward
                );
                assert!(!step.is_done());
                straddled = true;
            }
            assert!(straddled);

            let (step, record) = env.step(&goto(goal, Lane::Left))?;
            assert!(step.is_done());
            assert!((step.full_reward - 9.9).abs() < 1e-5);
            assert_eq!(record.get_string("task")?, label);
            assert_eq!(record.get_scalar("goal")?, goal as f32);
        }
    }
    Ok(())
}

#[test]
fn leaving_the_track_fails() -> Result<()> {
    let mut env = center_env()?;
    env.reset()?;

    let (step, record) = env.step(&NavAct::Raw(WalkControl::LeaveTrack))?;
    assert!(step.is_done());
    assert!((step.reward + 100.1).abs() < 1e-4);
    assert_eq!(record.get_scalar("episode_length")?, 1.0);
    Ok(())
}

#[test]
fn wandering_off_the_predictions_times_out() -> Result<()> {
    let mut env = center_env()?;
    env.reset()?;
    let tracker = env.tracker().unwrap().clone();
    let map = env.sim().map();
    let away = (0..map.len())
        .find(|&id| {
            let tile = &map.tiles()[id];
            !tracker.predictions().contains(id)
                && Some(id) != tracker.goal()
                && !tile.visited
                && !tile.in_intersection()
        })
        .unwrap();

    let (step, _) = env.step(&goto(away, Lane::Right))?;
    assert!((step.reward + 0.1).abs() < 1e-5);

    let mut steps = 1;
    let outcome = loop {
        let (_, outcome, _) = env.raw_step(Some(&WalkControl::Idle))?;
        steps += 1;
        if outcome.done {
            break outcome;
        }
        assert!(steps < 60, "no time out after {} steps", steps);
        assert!((outcome.reward + 0.1).abs() < 1e-5);
    };
    assert_eq!(outcome.status, EpisodeStatus::Failure);
    assert!((outcome.reward + 100.1).abs() < 1e-4);
    assert!(steps >= 45);
    Ok(())
}

#[test]
fn keep_lane_pays_while_in_lane_and_stops_near_junctions() -> Result<()> {
    let mut env = build(
        TaskConfig::default().kind(TaskKind::KeepLane),
        vec![two_rings()],
    )?;
    env.reset()?;
    let keeping = match env.episode() {
        Some(EpisodeTask::KeepLane { keeping }) => *keeping,
        other => panic!("unexpected task {:?}", other),
    };
    let fresh: Vec<usize> = (10..=20)
        .filter(|&id| !env.sim().map().tiles()[id].visited)
        .collect();

    let (_, outcome, _) = env.raw_step(Some(&WalkControl::Goto {
        tile: fresh[0],
        lane: keeping,
    }))?;
    assert!((outcome.reward - 0.9).abs() < 1e-5);
    assert_eq!(outcome.status, EpisodeStatus::Running);

    let (_, outcome, _) = env.raw_step(Some(&WalkControl::Goto {
        tile: fresh[1],
        lane: keeping.other(),
    }))?;
    assert_eq!(outcome.reward, 0.0);
    assert_eq!(outcome.full_reward, 0.0);

    let (_, outcome, _) = env.raw_step(Some(&WalkControl::Goto {
        tile: 33,
        lane: keeping,
    }))?;
    assert!(outcome.done);
    assert_eq!(outcome.status, EpisodeStatus::Success);
    Ok(())
}

#[test]
fn high_level_actions_run_sub_policies() -> Result<()> {
    let mut env = build(TaskConfig::default().kind(TaskKind::X), vec![two_rings()])?;
    let (s, r) = channel(16);
    env.connect_visualiser(s);
    env.reset()?;

    let err = env.step(&NavAct::Choice(0)).err().unwrap();
    assert_eq!(
        task_error(&err),
        Some(&TaskError::MissingSubPolicy("turn".to_string()))
    );

    env.register_sub_policy("turn", |_: &WalkObs| WalkControl::Idle)?;
    env.register_sub_policy("take_center", |obs: &WalkObs| match obs.tile {
        Some(tile) => WalkControl::Straddle(tile),
        None => WalkControl::Idle,
    })?;
    assert_eq!(
        env.register_sub_policy("left", |_: &WalkObs| WalkControl::Idle),
        Err(TaskError::UnknownSubPolicy("left".to_string()))
    );

    env.step(&NavAct::Choice(0))?;
    assert!(env.active_policies().contains("turn"));
    env.step(&NavAct::Choice(1))?;
    assert!(env.active_policies().contains("take_center"));
    assert!(!env.active_policies().contains("turn"));
    assert!(env.active_policies().contains("X"));

    let err = env.step(&NavAct::Choice(2)).err().unwrap();
    assert_eq!(
        task_error(&err),
        Some(&TaskError::ChoiceOutOfRange { choice: 2, n: 2 })
    );

    let msgs: Vec<_> = r.try_iter().map(|m| m.method_name()).collect();
    assert_eq!(
        msgs,
        vec![
            "add_active_policies",
            "add_active_policy",
            "remove_active_policy",
            "add_active_policy"
        ]
    );
    Ok(())
}

#[test]
fn low_level_tasks_reject_choices() -> Result<()> {
    let mut env = center_env()?;

    let err = env.step(&NavAct::Noop).err().unwrap();
    assert_eq!(task_error(&err), Some(&TaskError::NotReset));

    env.reset()?;
    let err = env.step(&NavAct::Choice(0)).err().unwrap();
    assert_eq!(
        task_error(&err),
        Some(&TaskError::NotHighLevel("TC".to_string()))
    );
    assert!(env
        .register_sub_policy("turn", |_: &WalkObs| WalkControl::Idle)
        .is_err());
    Ok(())
}

#[test]
fn invalid_window_is_rejected() {
    let config = env_config(TaskConfig::default().tiles_before(0), vec![two_rings()]);
    let err = TrackEnv::<TileWalkSim>::build(&config, 0).err().unwrap();
    assert!(matches!(task_error(&err), Some(TaskError::InvalidConfig(_))));
}

#[test]
fn evaluation_runs_through_the_core_loop() -> Result<()> {
    let config = env_config(
        TaskConfig::default().kind(TaskKind::TakeCenter),
        vec![two_rings()],
    );
    let mut leave = |_: &WalkObs| NavAct::Raw(WalkControl::LeaveTrack);

    let mut evaluator = DefaultEvaluator::<TrackEnv<TileWalkSim>>::new(&config, 0, 3)?;
    let record = evaluator.evaluate(&mut leave)?;
    assert!((record.get_scalar("Episode return")? + 100.1).abs() < 1e-3);
    assert_eq!(record.get_scalar("Episode length")?, 1.0);
    assert_eq!(evaluator.env().stats().center_count, 3);

    let mut env = TrackEnv::<TileWalkSim>::build(&config, 0)?;
    let mut recorder = BufferedRecorder::new();
    let returns = eval_with_recorder(&mut env, &mut leave, 2, &mut recorder)?;
    assert_eq!(returns.len(), 2);
    assert_eq!(recorder.len(), 2);
    for record in recorder.iter() {
        assert_eq!(record.get_string("task")?, "center");
        assert_eq!(record.get_scalar("step")?, 0.0);
    }
    Ok(())
}
