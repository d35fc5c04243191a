//! Shared domain types: engine kinds, scoring, classification and game phase.
//!
//! These are plain sum types rather than string constants (redesign flag in
//! `SPEC_FULL.md` §9) even though the wire protocol represents most of them
//! as strings.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifies a socket from the moment it upgrades, before (and regardless
/// of whether) it ever authenticates — `total_connections` has to count
/// not-yet-authenticated sockets too, so the registry key used once
/// `Authenticated` (the user id) isn't enough on its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    #[must_use]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

/// Lifecycle of one gateway connection. Bookkeeping only, for tracing and
/// debug assertions — `GatewayState.connections` is populated exactly when a
/// connection reaches `Authenticated` and removed when it leaves that state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    AwaitingAuth,
    Authenticated,
    Closed,
}

/// Lifecycle of one queued request. Bookkeeping only, for tracing and debug
/// assertions — the queue itself only ever stores `Pending` items; the other
/// states are implicit in where (or whether) the item currently lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestState {
    Pending,
    Processing,
    Done,
    Superseded,
    Cancelled,
}

/// Which external binary / option set a pool serves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EngineKind {
    Suggestion,
    Analysis,
}

impl fmt::Display for EngineKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Suggestion => write!(f, "suggestion"),
            Self::Analysis => write!(f, "analysis"),
        }
    }
}

/// Side to move, used only for score-normalization bookkeeping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Color {
    White,
    Black,
}

impl Color {
    pub fn from_fen_field(field: &str) -> Option<Self> {
        match field {
            "w" => Some(Self::White),
            "b" => Some(Self::Black),
            _ => None,
        }
    }
}

/// `playerColor` on an analysis request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlayerColor {
    White,
    Black,
}

impl From<PlayerColor> for Color {
    fn from(p: PlayerColor) -> Self {
        match p {
            PlayerColor::White => Color::White,
            PlayerColor::Black => Color::Black,
        }
    }
}

/// Move classification, ordered worst-to-best is `Blunder > Mistake > ... >
/// Best`; declaration order below is best-to-worst so the derived `Ord`
/// satisfies the monotonicity property directly (`cpl1 <= cpl2 =>
/// classify(cpl1) <= classify(cpl2)`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Classification {
    Best,
    Excellent,
    Good,
    Inaccuracy,
    Mistake,
    Blunder,
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Best => "best",
            Self::Excellent => "excellent",
            Self::Good => "good",
            Self::Inaccuracy => "inaccuracy",
            Self::Mistake => "mistake",
            Self::Blunder => "blunder",
        };
        write!(f, "{s}")
    }
}

/// Classify a centipawn-loss value per the §4.6 thresholds.
#[must_use]
pub fn classify_cpl(cpl: f64) -> Classification {
    if cpl <= 10.0 {
        Classification::Best
    } else if cpl <= 25.0 {
        Classification::Excellent
    } else if cpl <= 60.0 {
        Classification::Good
    } else if cpl <= 120.0 {
        Classification::Inaccuracy
    } else if cpl <= 250.0 {
        Classification::Mistake
    } else {
        Classification::Blunder
    }
}

/// Saturating-exponential accuracy impact, rounded to one decimal (§4.6.8).
#[must_use]
pub fn accuracy_impact(cpl: f64) -> f64 {
    let raw = 40.0 * (1.0 - (-cpl / 150.0).exp());
    (raw * 10.0).round() / 10.0
}

/// Game phase derived from remaining non-king material (§4.6.9).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Opening,
    Middlegame,
    Endgame,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Opening => "opening",
            Self::Middlegame => "middlegame",
            Self::Endgame => "endgame",
        };
        write!(f, "{s}")
    }
}

/// Starting non-king material total used as the phase-detection denominator.
pub const STARTING_MATERIAL: f64 = 78.0;

/// Piece values used for phase detection (king excluded).
#[must_use]
pub fn piece_value(piece: char) -> f64 {
    match piece.to_ascii_uppercase() {
        'Q' => 9.0,
        'R' => 5.0,
        'B' | 'N' => 3.0,
        'P' => 1.0,
        _ => 0.0,
    }
}

/// Sum the non-king material value present in a FEN's board field.
///
/// Takes the board field only (the first space-separated FEN field).
#[must_use]
pub fn total_material(board_field: &str) -> f64 {
    board_field
        .chars()
        .filter(|c| c.is_ascii_alphabetic())
        .map(piece_value)
        .sum()
}

/// Phase classification from a material fraction of `STARTING_MATERIAL`.
#[must_use]
pub fn phase_from_fraction(fraction: f64) -> Phase {
    if fraction > 0.85 {
        Phase::Opening
    } else if fraction > 0.35 {
        Phase::Middlegame
    } else {
        Phase::Endgame
    }
}

/// Phase weighting multiplier for the phase-weighted impact (§4.6.10).
#[must_use]
pub fn phase_weight(phase: Phase) -> f64 {
    match phase {
        Phase::Opening => 0.7,
        Phase::Middlegame => 1.0,
        Phase::Endgame => 1.3,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classification_monotonicity() {
        let cpls = [0.0, 10.0, 25.0, 60.0, 120.0, 250.0, 1000.0];
        for window in cpls.windows(2) {
            assert!(classify_cpl(window[0]) <= classify_cpl(window[1]));
        }
    }

    #[test]
    fn classification_thresholds() {
        assert_eq!(classify_cpl(10.0), Classification::Best);
        assert_eq!(classify_cpl(25.0), Classification::Excellent);
        assert_eq!(classify_cpl(60.0), Classification::Good);
        assert_eq!(classify_cpl(100.0), Classification::Inaccuracy);
        assert_eq!(classify_cpl(120.0), Classification::Inaccuracy);
        assert_eq!(classify_cpl(250.0), Classification::Mistake);
        assert_eq!(classify_cpl(251.0), Classification::Blunder);
    }

    #[test]
    fn impact_law() {
        assert!((accuracy_impact(0.0)).abs() < f64::EPSILON);
        let small = accuracy_impact(10.0);
        let large = accuracy_impact(100.0);
        assert!(small < large);
        assert!(accuracy_impact(100_000.0) > 39.9);
        assert!(accuracy_impact(100_000.0) <= 40.0);
    }

    #[test]
    fn impact_scenario_s3() {
        // bestEval=+120, evalAfter=+20 => cpl=100
        let impact = accuracy_impact(100.0);
        assert!((impact - 19.5).abs() < 0.2);
    }

    #[test]
    fn phase_weight_ordering() {
        assert!(phase_weight(Phase::Endgame) > phase_weight(Phase::Middlegame));
        assert!(phase_weight(Phase::Middlegame) > phase_weight(Phase::Opening));
    }

    #[test]
    fn material_counting() {
        let start = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR";
        assert!((total_material(start) - STARTING_MATERIAL).abs() < f64::EPSILON);
    }

    #[test]
    fn phase_from_fraction_scenario_s3() {
        // Full material => opening
        assert_eq!(phase_from_fraction(1.0), Phase::Opening);
        assert_eq!(phase_from_fraction(0.5), Phase::Middlegame);
        assert_eq!(phase_from_fraction(0.1), Phase::Endgame);
    }
}
