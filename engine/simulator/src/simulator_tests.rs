use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;

use game_core::tile::tiles_from_letters;
use game_core::{Move, MoveList, Rack};
use games_wordgrid::{scored_place, WordgridPosition};

use crate::config::SimSettings;
use crate::estimator::ConstantWinEstimator;
use crate::randomize::{randomize_drawing_order, randomize_opponent_racks};
use crate::rollout::RolloutEngine;
use crate::simulator::Simulator;

fn three_candidate_position() -> WordgridPosition {
    WordgridPosition::builder()
        .player("ABCDE")
        .player("FGHIJ")
        .bag("KLMNOPQRST")
        .candidates(vec![
            scored_place(tiles_from_letters("AB")),
            scored_place(tiles_from_letters("C")),
            scored_place(tiles_from_letters("DE")),
        ])
        .build()
}

fn new_sim(position: WordgridPosition) -> Simulator<WordgridPosition, ConstantWinEstimator> {
    Simulator::new(position, ConstantWinEstimator(0.5))
}

/// A position whose candidates carry fabricated static equities.
fn graded_position(equities: &[f64]) -> WordgridPosition {
    let letters = ["A", "B", "C", "D", "E"];
    let candidates: MoveList = equities
        .iter()
        .zip(letters)
        .map(|(&equity, letter)| {
            scored_place(tiles_from_letters(letter)).with_equity(equity)
        })
        .collect();
    WordgridPosition::builder()
        .player("ABCDE")
        .player("FGHIJ")
        .bag("KLMNOP")
        .candidates(candidates)
        .build()
}

#[test]
fn test_new_builds_candidates_from_position() {
    let sim = new_sim(three_candidate_position());
    assert_eq!(sim.simmed_moves().len(), 3);
    assert!(sim.simmed_moves().iter().all(|m| m.include_in_simulation));
    assert_eq!(sim.iterations(), 0);
    assert!(!sim.has_simulation_results());
}

#[test]
fn test_prune_to_keeps_top_band() {
    let mut sim = new_sim(graded_position(&[10.0, 8.0, 6.0, 4.0, 2.0]));
    sim.prune_to(5.0, 3);

    let included = sim.moves(true, false);
    let equities: Vec<f64> = included.iter().map(|m| m.equity).collect();
    assert_eq!(equities, vec![10.0, 8.0, 6.0]);
}

#[test]
fn test_prune_to_count_limit_binds_first() {
    let mut sim = new_sim(graded_position(&[10.0, 9.0, 8.0, 7.0, 6.0]));
    sim.prune_to(100.0, 2);
    assert_eq!(sim.moves(true, false).len(), 2);
}

#[test]
fn test_prune_always_retains_top_candidate() {
    let mut sim = new_sim(graded_position(&[10.0, 8.0, 6.0, 4.0, 2.0]));
    sim.prune_to(0.0, 1);
    let included = sim.moves(true, false);
    assert_eq!(included.len(), 1);
    assert_eq!(included[0].equity, 10.0);
}

#[test]
fn test_prune_with_nothing_included_is_a_noop() {
    let mut sim = new_sim(three_candidate_position());
    sim.set_included_moves(&[]);
    sim.prune_to(5.0, 3);
    assert!(sim.moves(true, false).is_empty());
}

#[test]
fn test_set_included_moves_appends_unknown_candidates() {
    let mut sim = new_sim(three_candidate_position());
    let extra = scored_place(tiles_from_letters("J"));
    sim.set_included_moves(&[extra.clone()]);

    assert_eq!(sim.simmed_moves().len(), 4);
    let included: Vec<&Move> = sim
        .simmed_moves()
        .iter()
        .filter(|m| m.include_in_simulation)
        .map(|m| &m.mv)
        .collect();
    assert_eq!(included, vec![&extra]);
}

#[test]
fn test_considered_moves_survive_pruning() {
    let mut sim = new_sim(graded_position(&[10.0, 8.0, 6.0, 4.0, 2.0]));
    let weakest = scored_place(tiles_from_letters("E")).with_equity(2.0);
    sim.add_considered_move(weakest.clone());
    assert!(sim.is_considered_move(&weakest));

    sim.prune_to(1.0, 2);
    let after_prune = sim.moves(true, false);
    assert!(!after_prune.contains(&weakest));

    sim.make_sure_considered_moves_are_included();
    let simmed = sim.simmed_move_for_move(&weakest).unwrap();
    assert_eq!(simmed.mv, weakest);
    assert!(simmed.include_in_simulation);
}

#[test]
fn test_considered_move_outside_candidates_is_appended() {
    let mut sim = new_sim(three_candidate_position());
    let outsider = scored_place(tiles_from_letters("FG"));
    sim.add_considered_move(outsider.clone());
    sim.make_sure_considered_moves_are_included();

    let simmed = sim.simmed_move_for_move(&outsider).unwrap();
    assert_eq!(simmed.mv, outsider);
    assert!(simmed.include_in_simulation);
}

#[test]
fn test_move_considered_moves_to_beginning() {
    let a = scored_place(tiles_from_letters("A"));
    let b = scored_place(tiles_from_letters("B"));
    let c = scored_place(tiles_from_letters("C"));
    let d = scored_place(tiles_from_letters("D"));

    let mut sim = new_sim(three_candidate_position());
    sim.add_considered_move(c.clone());
    sim.add_considered_move(a.clone());

    let mut list = vec![a.clone(), b.clone(), c.clone(), d.clone()];
    sim.move_considered_moves_to_beginning(&mut list);
    assert_eq!(list, vec![a, c, b, d]);
}

#[test]
fn test_reset_numbers_is_complete() {
    let mut sim = new_sim(three_candidate_position()).with_seed(17);
    sim.simulate(2, 3).unwrap();
    assert!(sim.has_simulation_results());

    sim.reset_numbers();
    assert_eq!(sim.iterations(), 0);
    for simmed in sim.simmed_moves() {
        assert!(simmed.levels.is_empty());
        assert!(!simmed.residual.has_values());
        assert!(!simmed.game_spread.has_values());
        assert!(!simmed.wins.has_values());
    }
    // with no data, moves() reports static equities again
    assert!(!sim.has_simulation_results());
}

#[test]
fn test_two_iterations_average_the_observed_statistics() {
    let position = three_candidate_position();
    let seed = 9;

    // replicate the simulator's randomization chain by hand to observe
    // each iteration's rollout in isolation
    let estimator = ConstantWinEstimator(0.5);
    let probe = new_sim(position.clone());
    let candidate = probe.simmed_moves()[0].clone();

    let mut reference = position.clone();
    let mut rng = ChaCha20Rng::seed_from_u64(seed);
    let mut observed = Vec::new();
    for _ in 0..2 {
        randomize_opponent_racks(&mut reference, &Rack::new(), &mut rng).unwrap();
        randomize_drawing_order(&mut reference, &mut rng).unwrap();
        let message = RolloutEngine::new(&reference, &estimator, 2, false)
            .run(&candidate)
            .unwrap();
        observed.push(message);
    }

    let mut sim = new_sim(position).with_seed(seed);
    sim.simulate(2, 2).unwrap();
    assert_eq!(sim.iterations(), 2);

    let simmed = &sim.simmed_moves()[0];
    assert_eq!(simmed.wins.count(), 2);
    assert_eq!(simmed.game_spread.count(), 2);
    assert_eq!(simmed.residual.count(), 2);

    let expected_wins = (observed[0].wins + observed[1].wins) / 2.0;
    assert!((simmed.wins.mean() - expected_wins).abs() < 1e-12);
    let expected_spread =
        f64::from(observed[0].game_spread + observed[1].game_spread) / 2.0;
    assert!((simmed.game_spread.mean() - expected_spread).abs() < 1e-12);
}

#[test]
fn test_batching_does_not_change_aggregates() {
    let position = three_candidate_position();

    let mut split = new_sim(position.clone()).with_seed(33);
    split.simulate(2, 1).unwrap();
    split.simulate(2, 1).unwrap();

    let mut whole = new_sim(position).with_seed(33);
    whole.simulate(2, 2).unwrap();

    assert_eq!(split.iterations(), whole.iterations());
    for (a, b) in split.simmed_moves().iter().zip(whole.simmed_moves()) {
        assert_eq!(a.wins.count(), b.wins.count());
        assert_eq!(a.wins.sum(), b.wins.sum());
        assert_eq!(a.game_spread.sum(), b.game_spread.sum());
        assert_eq!(a.residual.sum(), b.residual.sum());
    }
}

#[test]
fn test_empty_candidate_set_still_counts_iterations() {
    let mut sim = new_sim(three_candidate_position()).with_seed(1);
    sim.set_included_moves(&[]);
    sim.simulate(2, 3).unwrap();

    assert_eq!(sim.iterations(), 3);
    for simmed in sim.simmed_moves() {
        assert!(!simmed.wins.has_values());
        assert!(simmed.levels.is_empty());
    }
}

#[test]
fn test_abort_leaves_consistent_aggregates() {
    let mut sim = new_sim(three_candidate_position()).with_seed(2);
    let checks = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&checks);
    sim.set_dispatch(Box::new(move || {
        counter.fetch_add(1, Ordering::SeqCst) + 1 > 3
    }));

    sim.simulate(1, 10).unwrap();

    assert_eq!(sim.iterations(), 3);
    for simmed in sim.simmed_moves() {
        assert_eq!(simmed.wins.count(), 3);
        assert_eq!(simmed.game_spread.count(), 3);
    }
}

#[test]
fn test_incorporation_order_does_not_matter() {
    let position = three_candidate_position();
    let estimator = ConstantWinEstimator(0.5);
    let mut sim = new_sim(position.clone());
    let candidate = sim.simmed_moves()[0].clone();

    let mut messages = Vec::new();
    for seed in [4, 5] {
        let mut randomized = position.clone();
        let mut rng = ChaCha20Rng::seed_from_u64(seed);
        randomize_opponent_racks(&mut randomized, &Rack::new(), &mut rng).unwrap();
        randomize_drawing_order(&mut randomized, &mut rng).unwrap();
        let message = RolloutEngine::new(&randomized, &estimator, 2, false)
            .run(&candidate)
            .unwrap();
        messages.push(message);
    }

    sim.incorporate_message(messages[0].clone());
    sim.incorporate_message(messages[1].clone());
    let forward = sim.simmed_moves()[0].clone();

    sim.reset_numbers();
    sim.incorporate_message(messages[1].clone());
    sim.incorporate_message(messages[0].clone());
    let backward = &sim.simmed_moves()[0];

    assert_eq!(forward.wins.sum(), backward.wins.sum());
    assert_eq!(forward.wins.sum_of_squares(), backward.wins.sum_of_squares());
    assert_eq!(forward.residual.sum(), backward.residual.sum());
    assert_eq!(forward.levels, backward.levels);
}

#[test]
fn test_parallel_runs_are_seed_deterministic() {
    let position = three_candidate_position();

    let mut a = new_sim(position.clone()).with_seed(77);
    a.simulate_parallel(2, 8).unwrap();

    let mut b = new_sim(position).with_seed(77);
    b.simulate_parallel(2, 8).unwrap();

    assert_eq!(a.iterations(), 8);
    assert_eq!(b.iterations(), 8);
    for (x, y) in a.simmed_moves().iter().zip(b.simmed_moves()) {
        assert_eq!(x.wins.count(), 8);
        assert_eq!(x.wins.sum(), y.wins.sum());
        assert_eq!(x.game_spread.sum(), y.game_spread.sum());
        assert_eq!(x.residual.sum(), y.residual.sum());
        assert_eq!(x.levels, y.levels);
    }
}

#[test]
fn test_moves_overwrites_estimates_and_sorts() {
    let mut sim = new_sim(three_candidate_position()).with_seed(8);
    sim.simulate(2, 4).unwrap();

    let by_equity = sim.moves(false, false);
    assert_eq!(by_equity.len(), 3);
    for window in by_equity.windows(2) {
        assert!(window[0].equity >= window[1].equity);
    }

    let by_win = sim.moves(false, true);
    for window in by_win.windows(2) {
        assert!(window[0].win >= window[1].win);
    }

    // the reported numbers come from the aggregates, not the statics
    for mv in &by_win {
        let simmed = sim.simmed_move_for_move(mv).unwrap();
        assert!((mv.win - simmed.wins.mean()).abs() < 1e-12);
        assert!((mv.equity - simmed.calculate_equity()).abs() < 1e-12);
    }
}

#[test]
fn test_simmed_move_for_move_falls_back_to_last() {
    let sim = new_sim(three_candidate_position());
    let stranger = scored_place(tiles_from_letters("GH"));
    let fallback = sim.simmed_move_for_move(&stranger).unwrap();
    assert_eq!(fallback.id, sim.simmed_moves().last().unwrap().id);

    let empty = new_sim(
        WordgridPosition::builder()
            .player("ABCDE")
            .player("FGHIJ")
            .bag("KL")
            .build(),
    );
    assert!(empty.simmed_move_for_move(&stranger).is_none());
}

#[test]
fn test_level_shape_after_simulation() {
    let mut sim = new_sim(three_candidate_position()).with_seed(13);
    sim.simulate(2, 1).unwrap();

    // 3 total plies over 2 players: one full level plus a partial one
    assert_eq!(sim.num_levels(), 2);
    assert_eq!(sim.num_players_at_level(0), 2);
    assert_eq!(sim.num_players_at_level(1), 1);
    assert_eq!(sim.num_players_at_level(2), 0);
}

#[test]
fn test_set_position_rebuilds_and_resets() {
    let mut sim = new_sim(three_candidate_position()).with_seed(3);
    sim.add_considered_move(scored_place(tiles_from_letters("AB")));
    sim.simulate(1, 2).unwrap();

    let replacement = WordgridPosition::builder()
        .player("UVWXY")
        .player("NOPQR")
        .bag("STABC")
        .candidate(scored_place(tiles_from_letters("U")))
        .build();
    sim.set_position(replacement);

    assert_eq!(sim.iterations(), 0);
    assert_eq!(sim.simmed_moves().len(), 1);
    assert!(sim.considered_moves().is_empty());
    assert!(!sim.has_simulation_results());
}

#[test]
fn test_apply_settings() {
    let mut sim = new_sim(three_candidate_position());
    let settings = SimSettings::for_testing()
        .with_ignore_opponents(true)
        .with_partial_rack("QU");
    sim.apply_settings(&settings);

    assert!(sim.ignore_opponents());
    assert_eq!(sim.partial_opponent_rack().letters(), "QU");
}

// ── log document ────────────────────────────────────────────────────

#[derive(Clone, Default)]
struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

impl SharedBuffer {
    fn contents(&self) -> String {
        String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
    }
}

impl io::Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[test]
fn test_log_document_structure() {
    let buffer = SharedBuffer::default();
    let mut sim = new_sim(three_candidate_position()).with_seed(21);
    sim.set_log_writer(Box::new(buffer.clone()));
    sim.simulate(1, 2).unwrap();
    sim.close_log();

    let text = buffer.contents();
    assert!(text.starts_with("<simulation>\n"));
    assert!(text.ends_with("</simulation>\n"));
    assert!(text.contains("\t<iteration index=\"1\">\n"));
    assert!(text.contains("\t<iteration index=\"2\">\n"));
    // one playahead per included candidate per iteration
    assert_eq!(text.matches("<playahead>").count(), 6);
    assert_eq!(text.matches("</playahead>").count(), 6);
    assert!(text.contains("\t\t\t<ply index=\"0\">\n"));
    assert!(text.contains("<rack tiles="));
    assert!(text.contains("<pc value="));
}

#[test]
fn test_log_footer_written_when_position_changes() {
    let buffer = SharedBuffer::default();
    let mut sim = new_sim(three_candidate_position()).with_seed(22);
    sim.set_log_writer(Box::new(buffer.clone()));
    sim.simulate(1, 1).unwrap();

    sim.set_position(three_candidate_position());
    let text = buffer.contents();
    assert!(text.contains("</simulation>\n"));
}
