//! Clamping helpers for the recognized suggestion options (§6).

/// Engine-advertised ELO range used to clamp `targetElo` when strength
/// limiting is enabled. The real range is engine-specific; this is the
/// conservative UCI_Elo band most engines advertise.
pub const ELO_RANGE: (u32, u32) = (1320, 3190);

#[must_use]
pub fn clamp_elo(requested: u32) -> u32 {
    requested.clamp(ELO_RANGE.0, ELO_RANGE.1)
}

#[must_use]
pub fn clamp_multi_pv(requested: u32) -> u32 {
    requested.clamp(1, 3)
}

pub const NODES_RANGE: (u64, u64) = (100_000, 5_000_000);
pub const DEPTH_RANGE: (u32, u32) = (1, 30);
pub const MOVETIME_RANGE_MS: (u64, u64) = (500, 5_000);
pub const DEFAULT_NODE_BUDGET: u64 = 1_000_000;

#[must_use]
pub fn clamp_nodes(requested: u64) -> u64 {
    requested.clamp(NODES_RANGE.0, NODES_RANGE.1)
}

#[must_use]
pub fn clamp_depth(requested: u32) -> u32 {
    requested.clamp(DEPTH_RANGE.0, DEPTH_RANGE.1)
}

#[must_use]
pub fn clamp_movetime(requested: u64) -> u64 {
    requested.clamp(MOVETIME_RANGE_MS.0, MOVETIME_RANGE_MS.1)
}

/// `armageddon` forces one color to win; only these three values are valid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Armageddon {
    Off,
    White,
    Black,
}

impl Armageddon {
    #[must_use]
    pub fn parse(raw: Option<&str>) -> Self {
        match raw {
            Some("white") => Self::White,
            Some("black") => Self::Black,
            _ => Self::Off,
        }
    }
}
