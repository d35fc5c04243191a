//! Basic FEN well-formedness checks (§4.5: "space-separated, at least four
//! fields, board has eight `/`-separated ranks"). Not a legality checker —
//! chess rules are explicitly out of scope (§1).

use crate::types::Color;

#[derive(Debug, thiserror::Error)]
pub enum FenError {
    #[error("FEN must have at least four space-separated fields")]
    TooFewFields,
    #[error("FEN board field must have eight '/'-separated ranks")]
    WrongRankCount,
    #[error("FEN side-to-move field must be 'w' or 'b'")]
    InvalidSideToMove,
}

/// Validate shape only: field count, rank count, side-to-move token.
pub fn validate(fen: &str) -> Result<(), FenError> {
    let fields: Vec<&str> = fen.split(' ').filter(|s| !s.is_empty()).collect();
    if fields.len() < 4 {
        return Err(FenError::TooFewFields);
    }
    if fields[0].split('/').count() != 8 {
        return Err(FenError::WrongRankCount);
    }
    if Color::from_fen_field(fields[1]).is_none() {
        return Err(FenError::InvalidSideToMove);
    }
    Ok(())
}

/// Side to move from a validated FEN's second field.
pub fn side_to_move(fen: &str) -> Option<Color> {
    fen.split(' ').filter(|s| !s.is_empty()).nth(1).and_then(Color::from_fen_field)
}

/// Board field only (first space-separated field), for material counting.
pub fn board_field(fen: &str) -> &str {
    fen.split(' ').next().unwrap_or("")
}
