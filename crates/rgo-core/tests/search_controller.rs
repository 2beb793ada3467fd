mod common;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use rand_xoshiro::Xoshiro256PlusPlus;
use rgo_core::policy::MoveGenerator;
use rgo_core::reference::{self, ChineseScorer, GoBoard};
use rgo_core::search::{SearchConfig, TimeManagement};
use rgo_core::{ConfigError, Legality, Move, Scorer, SearchController, SearchError};

use common::{capped_config, controller, legal_moves};

#[test]
fn test_best_move_is_legal() {
    let mut engine = controller(capped_config(500));
    let legal = legal_moves(engine.board());
    let mv = engine.best_move().unwrap();
    assert!(mv == Move::PASS || legal.contains(&mv), "unexpected {mv}");
    assert_eq!(engine.playouts_completed(), 500);

    let stats = engine.last_stats();
    assert_eq!(stats.playouts, 500);
    let root_runs: u32 = engine.root_report(usize::MAX).iter().map(|r| r.runs).sum();
    // every playout passes through the root; the pass prior adds 10 runs
    assert_eq!(u64::from(root_runs), stats.playouts + 10);
}

#[test]
fn test_single_worker_search_is_reproducible() {
    let mut a = controller(capped_config(300));
    let mut b = controller(capped_config(300));
    assert_eq!(a.best_move().unwrap(), b.best_move().unwrap());
    assert_eq!(a.root_report(5), b.root_report(5));
}

#[test]
fn test_parallel_workers_keep_statistics_consistent() {
    let config = SearchConfig {
        threads: 4,
        ..capped_config(2000)
    };
    let mut engine = controller(config);
    engine.best_move().unwrap();
    assert_eq!(engine.playouts_completed(), 2000);
    for row in engine.root_report(usize::MAX) {
        assert!(row.wins <= row.runs);
        assert!(row.rave_wins <= row.rave_runs);
    }
    let summary = engine.root_summary();
    // the pass prior may be counted when pass is the best move
    assert!(summary.best_runs + summary.rest_runs <= 2000 + 10);
}

#[test]
fn test_time_limited_search_stops() {
    let config = SearchConfig {
        threads: 2,
        msec: 100,
        playouts: 0,
        time_management: TimeManagement::Exiting,
        table_size: 12,
        ..SearchConfig::default()
    };
    let mut engine = controller(config);
    let started = Instant::now();
    engine.best_move().unwrap();
    assert!(started.elapsed() < Duration::from_secs(5));
    assert!(engine.playouts_completed() > 0);
}

#[test]
fn test_stop_handle_aborts_search() {
    let config = SearchConfig {
        msec: 60_000,
        time_management: TimeManagement::Fixed,
        table_size: 12,
        ..SearchConfig::default()
    };
    let mut engine = controller(config);
    let handle = engine.stop_handle();
    let done = Arc::new(AtomicBool::new(false));
    let stopper = {
        let done = done.clone();
        // keep stopping until the search notices: a stop issued before the
        // session starts is cleared when the session begins
        std::thread::spawn(move || {
            while !done.load(Ordering::Acquire) {
                std::thread::sleep(Duration::from_millis(50));
                handle.stop();
            }
        })
    };
    let started = Instant::now();
    engine.best_move().unwrap();
    done.store(true, Ordering::Release);
    stopper.join().unwrap();
    assert!(started.elapsed() < Duration::from_secs(30));
}

#[test]
fn test_resigns_when_every_move_looks_lost() {
    let mut engine = controller(capped_config(4000));
    engine.set_property("resign", "1.0").unwrap();
    assert_eq!(engine.best_move().unwrap(), Move::RESIGN);
}

#[test]
fn test_accept_move_rejects_illegal_moves() {
    let mut engine = controller(capped_config(50));
    assert_eq!(engine.accept_move(Move::point(12)).unwrap(), Legality::Ok);
    assert_eq!(engine.accept_move(Move::point(12)).unwrap(), Legality::Occupied);
    assert_eq!(engine.history(), &[Move::point(12)]);
}

#[test]
fn test_undo_replays_history() {
    let mut engine = controller(capped_config(50));
    assert!(!engine.undo());
    let after_first = {
        engine.accept_move(Move::point(12)).unwrap();
        engine.board().clone()
    };
    engine.accept_move(Move::point(13)).unwrap();
    assert!(engine.undo());
    assert_eq!(engine.history(), &[Move::point(12)]);
    assert_eq!(
        rgo_core::Board::fingerprint(engine.board()),
        rgo_core::Board::fingerprint(&after_first)
    );
}

#[test]
fn test_set_property() {
    let mut engine = controller(capped_config(50));
    assert_eq!(
        engine.set_property("no-such-option", "1"),
        Err(ConfigError::UnknownProperty("no-such-option".to_string()))
    );
    assert!(matches!(engine.set_property("threads", "x"), Err(ConfigError::InvalidValue { .. })));

    engine.best_move().unwrap();
    assert!(engine.table().live_nodes() > 0);
    engine.set_property("table-size", "8").unwrap();
    assert_eq!(engine.table().capacity(), 256);
    assert_eq!(engine.table().live_nodes(), 0);

    engine.set_property("descender", "uct").unwrap();
    let mv = engine.best_move().unwrap();
    assert!(mv == Move::PASS || legal_moves(engine.board()).contains(&mv));
}

#[test]
fn test_ponder_runs_between_moves() {
    let config = SearchConfig {
        ponder: true,
        msec: 50,
        time_management: TimeManagement::Fixed,
        table_size: 12,
        ..SearchConfig::default()
    };
    let mut engine = controller(config);
    engine.accept_move(Move::point(12)).unwrap();
    assert!(engine.is_pondering());
    std::thread::sleep(Duration::from_millis(30));
    let mv = engine.best_move().unwrap();
    assert!(!engine.is_pondering());
    assert_ne!(mv, Move::NONE);
    engine.accept_move(mv).unwrap();
    assert!(engine.is_pondering());
    assert!(engine.undo());
    assert!(engine.is_pondering());
}

#[test]
fn test_reset_clears_table_and_history() {
    let mut engine = controller(capped_config(200));
    engine.best_move().unwrap();
    engine.accept_move(Move::point(6)).unwrap();
    engine.reset().unwrap();
    assert!(engine.history().is_empty());
    assert_eq!(engine.table().live_nodes(), 0);
    assert_eq!(rgo_core::Board::turn(engine.board()), 0);
}

/// Always suggests the top-left point, which is soon occupied
#[derive(Clone, Copy)]
struct CornerOnly;

impl MoveGenerator<GoBoard> for CornerOnly {
    fn name(&self) -> &str {
        "corner-only"
    }

    fn suggest(&mut self, _rng: &mut Xoshiro256PlusPlus, _board: &GoBoard) -> Option<Move> {
        Some(Move::point(0))
    }

    fn boxed_clone(&self) -> Box<dyn MoveGenerator<GoBoard>> {
        Box::new(*self)
    }
}

#[test]
fn test_illegal_playout_move_surfaces_from_best_move() {
    let mut builder = reference::policy_builder();
    builder.register("corner-only", || Box::new(CornerOnly));
    let policy = builder.build("corner-only").unwrap();
    let mut engine =
        SearchController::new(GoBoard::new(5), policy, ChineseScorer::default(), capped_config(100))
            .unwrap();
    match engine.best_move() {
        Err(SearchError::IllegalPlayoutMove { generator, legality, .. }) => {
            assert_eq!(generator, "corner-only");
            assert_eq!(legality, Legality::Occupied);
        }
        other => panic!("expected an illegal playout move, got {other:?}"),
    }
    // the controller stays usable after the failure
    assert_eq!(engine.accept_move(Move::point(12)).unwrap(), Legality::Ok);
}

/// Every finished game is a draw
#[derive(Clone, Copy)]
struct AlwaysEven;

impl Scorer<GoBoard> for AlwaysEven {
    fn score(&self, _board: &GoBoard) -> f64 {
        0.0
    }
}

#[test]
fn test_drawn_playouts_still_build_statistics() {
    let policy = reference::default_policy().unwrap();
    let mut engine =
        SearchController::new(GoBoard::new(5), policy, AlwaysEven, capped_config(300)).unwrap();
    let mv = engine.best_move().unwrap();

    let stats = engine.last_stats();
    assert_eq!(stats.playouts, 300);
    assert_eq!(stats.ties, 300);
    let report = engine.root_report(usize::MAX);
    let root_runs: u32 = report.iter().map(|r| r.runs).sum();
    assert_eq!(u64::from(root_runs), 300 + 10);
    for row in report.iter().filter(|r| r.mv != Move::PASS && r.runs > 0) {
        // reported wins round the half wins down
        assert_eq!(row.wins, row.runs / 2);
    }
    // half a win per draw beats the pessimistic pass prior
    assert_ne!(mv, Move::PASS);
    assert!(legal_moves(engine.board()).contains(&mv));
}

#[test]
fn test_clock_inside_reserve_still_searches() {
    let config = SearchConfig {
        threads: 1,
        msec: 1000,
        time_management: TimeManagement::Exiting,
        table_size: 12,
        ..SearchConfig::default()
    };
    let mut engine = controller(config);
    // below the 10 s reserve
    engine.set_remaining_time(8);
    for _ in 0..3 {
        let mv = engine.best_move().unwrap();
        assert!(engine.playouts_completed() > 0);
        assert!(mv == Move::PASS || legal_moves(engine.board()).contains(&mv));
    }
}

/// Panics on the first suggestion
#[derive(Clone, Copy)]
struct Panicking;

impl MoveGenerator<GoBoard> for Panicking {
    fn name(&self) -> &str {
        "panicking"
    }

    fn suggest(&mut self, _rng: &mut Xoshiro256PlusPlus, _board: &GoBoard) -> Option<Move> {
        panic!("generator failure");
    }

    fn boxed_clone(&self) -> Box<dyn MoveGenerator<GoBoard>> {
        Box::new(*self)
    }
}

#[test]
fn test_worker_panic_surfaces_and_controller_recovers() {
    let mut builder = reference::policy_builder();
    builder.register("panicking", || Box::new(Panicking));
    let policy = builder.build("panicking").unwrap();
    // no clock and a cap that is never reached: only the panicking workers can end the search
    let config = SearchConfig {
        threads: 2,
        ..capped_config(1_000_000)
    };
    let mut engine =
        SearchController::new(GoBoard::new(5), policy, ChineseScorer::default(), config).unwrap();
    let handle = engine.stop_handle();

    match engine.best_move() {
        Err(SearchError::WorkerPanicked { worker }) => assert!(worker < 2),
        other => panic!("expected a worker panic, got {other:?}"),
    }
    assert!(handle.is_stopped());

    // the table is exclusive again, so moves can still be accepted and the tree swept
    assert_eq!(engine.accept_move(Move::point(12)).unwrap(), Legality::Ok);
    assert_eq!(engine.history(), &[Move::point(12)]);
    assert!(matches!(engine.best_move(), Err(SearchError::WorkerPanicked { .. })));
}
