//! UCI line parsing and perspective normalization.
//!
//! Pure functions only — no I/O. [`EngineProcess`](super::process::EngineProcess)
//! drives the subprocess and hands raw lines to [`parse_info_line`] /
//! [`parse_bestmove_line`].

use crate::types::Color;

/// An engine's raw evaluation, still in side-to-move perspective.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Score {
    Centipawns(i32),
    Mate(i32),
}

/// One parsed `info` line. Fields absent from the line are `None`/defaulted.
#[derive(Debug, Clone, Default)]
pub struct InfoLine {
    pub multipv: u32,
    pub depth: Option<u32>,
    pub score: Option<Score>,
    pub wdl_permille: Option<(u32, u32, u32)>,
    pub pv: Vec<String>,
}

/// Parse a UCI `info ...` line. Returns `None` if the line isn't an `info`
/// line or carries none of the fields we care about.
#[must_use]
pub fn parse_info_line(line: &str) -> Option<InfoLine> {
    let mut tokens = line.split_whitespace().peekable();
    if tokens.next() != Some("info") {
        return None;
    }

    let mut info = InfoLine {
        multipv: 1,
        ..InfoLine::default()
    };
    let mut saw_field = false;

    while let Some(tok) = tokens.next() {
        match tok {
            "multipv" => {
                if let Some(v) = tokens.next().and_then(|s| s.parse().ok()) {
                    info.multipv = v;
                    saw_field = true;
                }
            }
            "depth" => {
                if let Some(v) = tokens.next().and_then(|s| s.parse().ok()) {
                    info.depth = Some(v);
                    saw_field = true;
                }
            }
            "score" => {
                match tokens.next() {
                    Some("cp") => {
                        if let Some(v) = tokens.next().and_then(|s| s.parse().ok()) {
                            info.score = Some(Score::Centipawns(v));
                            saw_field = true;
                        }
                    }
                    Some("mate") => {
                        if let Some(v) = tokens.next().and_then(|s| s.parse().ok()) {
                            info.score = Some(Score::Mate(v));
                            saw_field = true;
                        }
                    }
                    _ => {}
                }
            }
            "wdl" => {
                let w = tokens.next().and_then(|s| s.parse().ok());
                let d = tokens.next().and_then(|s| s.parse().ok());
                let l = tokens.next().and_then(|s| s.parse().ok());
                if let (Some(w), Some(d), Some(l)) = (w, d, l) {
                    info.wdl_permille = Some((w, d, l));
                    saw_field = true;
                }
            }
            "pv" => {
                info.pv = tokens.by_ref().map(str::to_string).collect();
                saw_field = true;
                break;
            }
            _ => {}
        }
    }

    saw_field.then_some(info)
}

/// Parse a UCI `bestmove <m> [ponder <m>]` line into `(best, ponder)`.
#[must_use]
pub fn parse_bestmove_line(line: &str) -> Option<(String, Option<String>)> {
    let mut tokens = line.split_whitespace();
    if tokens.next() != Some("bestmove") {
        return None;
    }
    let best = tokens.next()?.to_string();
    let ponder = match tokens.next() {
        Some("ponder") => tokens.next().map(str::to_string),
        _ => None,
    };
    Some((best, ponder))
}

/// A score fully normalized to white's perspective.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NormalizedEval {
    pub eval_cp: i32,
    pub win_pct: f64,
    pub draw_pct: f64,
    pub loss_pct: f64,
    pub mate: Option<i32>,
}

/// Approximate win% from a centipawn score via the standard logistic curve,
/// used only when the engine didn't report `wdl` (§4.1 policy).
#[must_use]
pub fn logistic_win_pct(cp: i32) -> f64 {
    50.0 + 50.0 * (2.0 / (1.0 + (-f64::from(cp) / 400.0).exp()) - 1.0)
}

/// Normalize a side-to-move score (and optional WDL) to white's perspective.
#[must_use]
pub fn normalize_to_white(
    side_to_move: Color,
    score: Score,
    wdl_permille: Option<(u32, u32, u32)>,
) -> NormalizedEval {
    let (eval_stm, win_stm, draw_stm, loss_stm, mate_stm) = match score {
        Score::Mate(n) => {
            let eval = if n >= 0 { 10_000 } else { -10_000 };
            let (win, draw, loss) = if n >= 0 {
                (100.0, 0.0, 0.0)
            } else {
                (0.0, 0.0, 100.0)
            };
            (eval, win, draw, loss, Some(n))
        }
        Score::Centipawns(cp) => {
            let (win, draw, loss) = match wdl_permille {
                Some((w, d, l)) => (f64::from(w) / 10.0, f64::from(d) / 10.0, f64::from(l) / 10.0),
                None => {
                    let win = logistic_win_pct(cp);
                    (win, 0.0, 100.0 - win)
                }
            };
            (cp, win, draw, loss, None)
        }
    };

    if side_to_move == Color::White {
        NormalizedEval {
            eval_cp: eval_stm,
            win_pct: win_stm,
            draw_pct: draw_stm,
            loss_pct: loss_stm,
            mate: mate_stm,
        }
    } else {
        NormalizedEval {
            eval_cp: -eval_stm,
            win_pct: loss_stm,
            draw_pct: draw_stm,
            loss_pct: win_stm,
            mate: mate_stm.map(|m| -m),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_info_line_with_cp_and_pv() {
        let line = "info depth 12 multipv 1 score cp -30 wdl 300 400 300 pv e2e4 e7e5";
        let info = parse_info_line(line).expect("should parse");
        assert_eq!(info.depth, Some(12));
        assert_eq!(info.multipv, 1);
        assert_eq!(info.score, Some(Score::Centipawns(-30)));
        assert_eq!(info.wdl_permille, Some((300, 400, 300)));
        assert_eq!(info.pv, vec!["e2e4", "e7e5"]);
    }

    #[test]
    fn parses_mate_score() {
        let line = "info depth 8 score mate 3 pv g2g4";
        let info = parse_info_line(line).expect("should parse");
        assert_eq!(info.score, Some(Score::Mate(3)));
    }

    #[test]
    fn non_info_line_is_none() {
        assert!(parse_info_line("uciok").is_none());
        assert!(parse_info_line("readyok").is_none());
    }

    #[test]
    fn parses_bestmove_with_ponder() {
        let (best, ponder) = parse_bestmove_line("bestmove e2e4 ponder e7e5").expect("parse");
        assert_eq!(best, "e2e4");
        assert_eq!(ponder.as_deref(), Some("e7e5"));
    }

    #[test]
    fn parses_bestmove_without_ponder() {
        let (best, ponder) = parse_bestmove_line("bestmove e2e4").expect("parse");
        assert_eq!(best, "e2e4");
        assert_eq!(ponder, None);
    }

    /// S4: black to move, `score cp -30`, `wdl 300 400 300` => white eval +30.
    #[test]
    fn normalization_scenario_s4() {
        let n = normalize_to_white(Color::Black, Score::Centipawns(-30), Some((300, 400, 300)));
        assert_eq!(n.eval_cp, 30);
        assert!((n.win_pct - 30.0).abs() < f64::EPSILON);
        assert!((n.draw_pct - 40.0).abs() < f64::EPSILON);
        assert!((n.loss_pct - 30.0).abs() < f64::EPSILON);
        assert_eq!(n.mate, None);
    }

    /// S5: white to move, `score mate 3` => eval +10000, mate +3, win 100/loss 0.
    #[test]
    fn normalization_scenario_s5() {
        let n = normalize_to_white(Color::White, Score::Mate(3), None);
        assert_eq!(n.eval_cp, 10_000);
        assert_eq!(n.mate, Some(3));
        assert!((n.win_pct - 100.0).abs() < f64::EPSILON);
        assert!((n.loss_pct - 0.0).abs() < f64::EPSILON);
    }

    /// Round-trip invariant (testable property 4): normalized score equals the
    /// raw score when white is to move, negated when black is to move; win%/
    /// loss% swap correspondingly.
    #[test]
    fn round_trip_property() {
        for cp in [-500, -30, 0, 42, 900] {
            let white = normalize_to_white(Color::White, Score::Centipawns(cp), None);
            let black = normalize_to_white(Color::Black, Score::Centipawns(cp), None);
            assert_eq!(white.eval_cp, cp);
            assert_eq!(black.eval_cp, -cp);
            assert!((white.win_pct - black.loss_pct).abs() < f64::EPSILON);
            assert!((white.loss_pct - black.win_pct).abs() < f64::EPSILON);
        }
    }
}
