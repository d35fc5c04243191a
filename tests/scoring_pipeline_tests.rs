//! Integration coverage of the scoring/classification pipeline: UCI line
//! parsing, perspective normalization, and centipawn-loss classification
//! composed together as the Analysis Handler would use them, independent of
//! any running engine subprocess.

use engine_gateway::engine::uci::{normalize_to_white, parse_bestmove_line, parse_info_line, Score};
use engine_gateway::engine::options::{clamp_depth, clamp_elo, clamp_multi_pv};
use engine_gateway::fen;
use engine_gateway::types::{self, Classification, Phase, PlayerColor};

#[test]
fn full_line_to_classification_pipeline() {
    // A before-move search: white to move, mate-free, +120 cp.
    let before_line = "info depth 18 multipv 1 score cp 120 pv d2d4 d7d5";
    let before_info = parse_info_line(before_line).expect("parses");
    let before_eval = normalize_to_white(
        engine_gateway::types::Color::White,
        before_info.score.expect("score"),
        before_info.wdl_permille,
    );
    assert_eq!(before_eval.eval_cp, 120);

    // After the played move it's black to move, engine reports cp -20
    // relative to black (i.e. +20 for white).
    let after_line = "info depth 18 multipv 1 score cp -20 pv e7e5";
    let after_info = parse_info_line(after_line).expect("parses");
    let after_eval = normalize_to_white(
        engine_gateway::types::Color::Black,
        after_info.score.expect("score"),
        after_info.wdl_permille,
    );
    assert_eq!(after_eval.eval_cp, 20);

    let (best, _) = parse_bestmove_line("bestmove d2d4").expect("parses");
    assert_eq!(best, "d2d4");

    let sign = match PlayerColor::White {
        PlayerColor::White => 1.0,
        PlayerColor::Black => -1.0,
    };
    let cpl = (f64::from(before_eval.eval_cp) * sign - f64::from(after_eval.eval_cp) * sign).max(0.0);
    assert!((cpl - 100.0).abs() < f64::EPSILON);

    let classification = types::classify_cpl(cpl);
    assert_eq!(classification, Classification::Inaccuracy);

    let impact = types::accuracy_impact(cpl);
    assert!((impact - 19.5).abs() < 0.2);

    let board = fen::board_field("rnbqkbnr/pppp1ppp/8/4p3/3P4/8/PPP1PPPP/RNBQKBNR");
    let fraction = types::total_material(board) / types::STARTING_MATERIAL;
    let phase = types::phase_from_fraction(fraction);
    assert_eq!(phase, Phase::Opening);

    let weighted = (impact * types::phase_weight(phase) * 10.0).round() / 10.0;
    assert!((weighted - 13.7).abs() < 0.3);
}

#[test]
fn black_to_move_mate_score_flows_through_classification() {
    let line = "info depth 10 score mate -2 pv h7h6";
    let info = parse_info_line(line).expect("parses");
    let eval = normalize_to_white(
        engine_gateway::types::Color::Black,
        info.score.expect("score"),
        None,
    );
    // Black to move, mate -2 (black gets mated) => white is winning.
    assert_eq!(eval.eval_cp, 10_000);
    assert_eq!(eval.mate, Some(2));
}

#[test]
fn clamp_pipeline_never_rejects_out_of_range_requests() {
    assert_eq!(clamp_elo(0), 1320);
    assert_eq!(clamp_elo(50_000), 3190);
    assert_eq!(clamp_multi_pv(0), 1);
    assert_eq!(clamp_depth(1_000), 30);
}

#[test]
fn fen_validation_rejects_malformed_input_before_reaching_the_engine() {
    assert!(fen::validate("not a fen at all").is_err());
    assert!(fen::validate("rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1").is_ok());
}
