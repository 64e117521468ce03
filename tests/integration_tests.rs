// Integration tests for the Rotation Planning & Enforcement Engine.
//
// These exercise the end-to-end scenarios from the design's testable
// properties: a disruption-free baseline, late confirmation, foul-out,
// goalkeeper protection, tab-hidden catch-up, and an insufficient bench.

use rotation_engine::config::Sport;
use rotation_engine::setup::{PeriodFormat, SetupInput};
use rotation_engine::{Engine, EventSubscriber};

/// Surfaces `log` output (repair passes, recovery warnings) under
/// `RUST_LOG=debug cargo test`; a no-op otherwise. Safe to call from every
/// test since `env_logger::try_init` only succeeds once per process.
fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn names(prefix: &str, n: usize) -> Vec<String> {
    (0..n).map(|i| format!("{prefix}{i}")).collect()
}

fn basketball_setup(total_players: usize, minutes_per_period: u32) -> SetupInput {
    SetupInput {
        format: PeriodFormat::Halves,
        minutes_per_period,
        field_spots: 5,
        num_reserves: total_players - 5,
        num_goalkeepers: 0,
        sport: Sport::Basketball,
        starter_names: names("s", 5),
        reserve_names: names("r", total_players - 5),
        jersey_numbers: None,
        ideal_shifts_per_player: Some(4),
        enable_warning_sound: None,
        warning_beep_seconds: None,
    }
}

fn run_seconds(engine: &mut Engine, seconds: u32) {
    for _ in 0..seconds {
        engine.tick();
        if engine.is_over() {
            break;
        }
        if engine.snapshot().pending_rotation.is_some() {
            engine.confirm_rotation().ok();
        }
    }
}

#[derive(Default)]
struct RotationCollector {
    rotation_times: Vec<u32>,
}

impl EventSubscriber for RotationCollector {
    fn on_rotation(&mut self, pending: &rotation_engine::Rotation) {
        self.rotation_times.push(pending.time);
    }
}

/// S1 - Basketball baseline: 10 players, F=5, 2x20 min halves, idealShifts=4.
#[test]
fn s1_basketball_baseline_equalizes_playing_time() {
    init_logging();
    let mut engine = Engine::new();
    let setup = basketball_setup(10, 20);
    engine.initialize(&setup, None).unwrap();
    engine.start().unwrap();

    run_seconds(&mut engine, 2400);

    assert!(engine.is_over());
    let stats = engine.snapshot();
    for minutes in stats.minutes.values() {
        let target = 1200i64;
        let diff = (*minutes as i64 - target).abs();
        assert!(diff <= 180, "expected within 180s of target, got diff {diff}");
    }
    assert!(stats.variance <= 90);
}

/// S2 - Late confirm: 8 players, F=5, 4x10 min, idealShifts=3. A scheduled
/// rotation confirmed 120s late should trigger Recovery.
#[test]
fn s2_late_confirm_triggers_recovery() {
    init_logging();
    let mut engine = Engine::new();
    let mut setup = basketball_setup(8, 10);
    setup.ideal_shifts_per_player = Some(3);
    engine.initialize(&setup, None).unwrap();
    engine.start().unwrap();

    let mut confirmed = false;
    for _ in 0..600 {
        engine.tick();
        if engine.snapshot().pending_rotation.is_some() {
            for _ in 0..120 {
                engine.tick();
            }
            engine.confirm_rotation().ok();
            confirmed = true;
            break;
        }
    }
    assert!(confirmed, "expected at least one rotation to become pending");

    let snapshot = engine.snapshot();
    if let Some(next) = snapshot.next_scheduled_rotation {
        assert!(next.time <= snapshot.current_time + 405);
        assert!(next.off.iter().all(|id| snapshot.court.contains(id)));
        assert!(next.on.iter().all(|id| snapshot.bench.contains(id)));
    }
}

/// S3 - Foul-out: same config as S2. A court player fouls out mid-game and
/// is auto-replaced, entering Removed, with |court| staying at 5.
#[test]
fn s3_foul_out_auto_replaces_and_removes() {
    init_logging();
    let mut engine = Engine::new();
    let mut setup = basketball_setup(8, 10);
    setup.ideal_shifts_per_player = Some(3);
    engine.initialize(&setup, None).unwrap();
    engine.start().unwrap();

    run_seconds(&mut engine, 600);

    let before = engine.snapshot();
    let fouled = before.court[0].clone();
    engine.player_fouled_out(&fouled).unwrap();

    let after = engine.snapshot();
    assert_eq!(after.court.len(), 5);
    assert!(after.removed.contains(&fouled));
    assert!(!after.court.contains(&fouled));
    assert!(!after.bench.contains(&fouled));

    run_seconds(&mut engine, 600);
    let later = engine.snapshot();
    assert!(!later.court.contains(&fouled));
    let still_referenced = later
        .next_scheduled_rotation
        .map(|r| r.off.contains(&fouled) || r.on.contains(&fouled))
        .unwrap_or(false);
    assert!(!still_referenced);
}

/// S4 - Soccer with GK: 12 players, F=9, 1 GK, 2x20 min. The goalkeeper
/// never rotates and is excluded from deviation.
#[test]
fn s4_soccer_goalkeeper_is_protected() {
    init_logging();
    let mut engine = Engine::new();
    let setup = SetupInput {
        format: PeriodFormat::Halves,
        minutes_per_period: 20,
        field_spots: 9,
        num_reserves: 3,
        num_goalkeepers: 1,
        sport: Sport::Soccer,
        starter_names: names("s", 9),
        reserve_names: names("r", 3),
        jersey_numbers: None,
        ideal_shifts_per_player: None,
        enable_warning_sound: None,
        warning_beep_seconds: None,
    };
    let goalkeeper = setup.starter_names[0].clone();
    engine.initialize(&setup, Some(goalkeeper.clone())).unwrap();
    engine.start().unwrap();

    run_seconds(&mut engine, 2400);

    let stats = engine.snapshot();
    let gk_minutes = stats.minutes.get(&goalkeeper).copied().unwrap_or(0);
    assert!(gk_minutes >= 2300, "goalkeeper should play nearly the entire game, got {gk_minutes}");
}

/// S5 - Tab hidden catch-up: at t=300 the engine is stopped, then resumes
/// 120s later via `apply_missed_time`.
#[test]
fn s5_tab_hidden_catch_up_accrues_time_without_rotating() {
    init_logging();
    let mut engine = Engine::new();
    let setup = basketball_setup(10, 20);
    engine.initialize(&setup, None).unwrap();
    engine.start().unwrap();

    run_seconds(&mut engine, 300);
    let before = engine.snapshot();
    let on_court_before: Vec<(String, u32)> = before
        .court
        .iter()
        .map(|id| (id.clone(), *before.minutes.get(id).unwrap_or(&0)))
        .collect();

    engine.handle_visibility_change();
    engine.apply_missed_time(120).unwrap();

    let after = engine.snapshot();
    for (id, minutes_before) in &on_court_before {
        let minutes_after = after.minutes.get(id).copied().unwrap_or(0);
        assert_eq!(minutes_after, minutes_before + 120);
    }
    assert_eq!(after.current_time, 420);
}

/// S6 - Insufficient bench: 5 players, F=5. No substitutions are ever
/// proposed; variance stays zero.
#[test]
fn s6_insufficient_bench_never_rotates() {
    init_logging();
    let mut engine = Engine::new();
    let setup = basketball_setup(5, 20);
    engine.initialize(&setup, None).unwrap();
    engine.subscribe(Box::new(RotationCollector::default()));
    engine.start().unwrap();

    run_seconds(&mut engine, 2400);

    let stats = engine.snapshot();
    assert_eq!(stats.variance, 0);
    assert_eq!(stats.rotation_history_count, 0);
    for minutes in stats.minutes.values() {
        assert_eq!(*minutes, stats.current_time);
    }
}
