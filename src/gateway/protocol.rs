//! WebSocket wire protocol: JSON-encoded text frames (§6).

use serde::{Deserialize, Serialize};

use crate::classifier::LabeledSuggestion;
use crate::handlers::analysis::AnalysisArtifact;
use crate::types::PlayerColor;

/// Inbound frame, discriminated by `type`.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Inbound {
    Auth {
        token: String,
    },
    Suggestion(SuggestionRequest),
    Analyze(AnalyzeRequest),
    Stats,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SuggestionRequest {
    #[serde(rename = "requestId")]
    pub request_id: String,
    pub fen: String,
    #[serde(default)]
    pub moves: Option<Vec<String>>,
    #[serde(rename = "targetElo", default)]
    pub target_elo: Option<u32>,
    #[serde(default)]
    pub personality: Option<String>,
    #[serde(rename = "multiPv", default)]
    pub multi_pv: Option<u32>,
    #[serde(default)]
    pub contempt: Option<i32>,
    #[serde(default)]
    pub variety: Option<u32>,
    #[serde(rename = "puzzleMode", default)]
    pub puzzle_mode: bool,
    #[serde(rename = "limitStrength", default)]
    pub limit_strength: Option<bool>,
    #[serde(default)]
    pub armageddon: Option<String>,
    #[serde(rename = "searchMode", default)]
    pub search_mode: Option<String>,
    #[serde(rename = "searchNodes", default)]
    pub search_nodes: Option<u64>,
    #[serde(rename = "searchDepth", default)]
    pub search_depth: Option<u32>,
    #[serde(rename = "searchMovetime", default)]
    pub search_movetime: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AnalyzeRequest {
    #[serde(rename = "requestId")]
    pub request_id: String,
    #[serde(rename = "fenBefore")]
    pub fen_before: String,
    #[serde(rename = "fenAfter")]
    pub fen_after: String,
    #[serde(rename = "move")]
    pub mv: String,
    #[serde(rename = "playerColor")]
    pub player_color: PlayerColor,
}

/// Outbound frame, discriminated by `type`.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Outbound {
    AuthSuccess {
        user: AuthedUser,
    },
    AuthError {
        error: String,
    },
    SuggestionResult {
        #[serde(rename = "requestId")]
        request_id: String,
        fen: String,
        suggestions: Vec<WireSuggestion>,
        #[serde(rename = "positionEval")]
        position_eval: f64,
        #[serde(rename = "mateIn")]
        mate_in: Option<i32>,
        #[serde(rename = "winRate")]
        win_rate: f64,
        #[serde(rename = "maxDepth")]
        max_depth: u32,
    },
    SuggestionError {
        #[serde(rename = "requestId")]
        request_id: String,
        error: String,
    },
    AnalysisResult {
        #[serde(rename = "requestId")]
        request_id: String,
        #[serde(flatten)]
        artifact: AnalysisArtifact,
    },
    AnalysisError {
        #[serde(rename = "requestId")]
        request_id: String,
        error: String,
    },
    Error {
        error: String,
    },
    Stats(crate::api::stats::StatsSnapshot),
}

#[derive(Debug, Clone, Serialize)]
pub struct AuthedUser {
    pub id: String,
    pub email: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct WireSuggestion {
    pub mv: String,
    pub pv: Vec<String>,
    pub eval: i32,
    #[serde(rename = "winRate")]
    pub win_rate: f64,
    #[serde(rename = "drawRate")]
    pub draw_rate: f64,
    #[serde(rename = "lossRate")]
    pub loss_rate: f64,
    pub depth: u32,
    #[serde(rename = "mateScore")]
    pub mate_score: Option<i32>,
    pub label: String,
}

impl From<LabeledSuggestion> for WireSuggestion {
    fn from(s: LabeledSuggestion) -> Self {
        Self {
            mv: s.mv,
            pv: s.pv,
            eval: s.eval_cp,
            win_rate: s.win_pct,
            draw_rate: s.draw_pct,
            loss_rate: s.loss_pct,
            depth: s.depth,
            mate_score: s.mate,
            label: s.label,
        }
    }
}
