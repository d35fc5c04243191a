//! Suggestion Handler (§4.5): validate, configure an engine, search, classify.

use std::sync::Arc;

use tokio::sync::oneshot;

use crate::classifier::{LabeledSuggestion, SuggestionClassifier};
use crate::engine::options::{
    clamp_depth, clamp_elo, clamp_movetime, clamp_multi_pv, clamp_nodes, Armageddon,
    DEFAULT_NODE_BUDGET,
};
use crate::engine::{EngineError, SearchLimits, SearchPosition, SearchRequest};
use crate::error::GatewayError;
use crate::fen;
use crate::gateway::protocol::SuggestionRequest;
use crate::queue::{ProcessFn, Request, RequestQueue};

/// Produced by the Suggestion Handler (§3 "Suggestion artifact").
#[derive(Debug, Clone)]
pub struct SuggestionArtifact {
    pub fen: String,
    pub suggestions: Vec<LabeledSuggestion>,
    pub position_eval: f64,
    pub mate_in: Option<i32>,
    pub win_rate: f64,
    pub max_depth: u32,
}

fn validate(req: &SuggestionRequest) -> Result<(), GatewayError> {
    if req.request_id.trim().is_empty() {
        return Err(GatewayError::InvalidInput("requestId must not be empty".into()));
    }
    fen::validate(&req.fen).map_err(|e| GatewayError::InvalidInput(e.to_string()))?;
    Ok(())
}

fn build_options(req: &SuggestionRequest, limit_strength: bool) -> Vec<(String, String)> {
    let mut options = Vec::new();
    options.push(("MultiPV".into(), clamp_multi_pv(req.multi_pv.unwrap_or(1)).to_string()));
    options.push(("UCI_LimitStrength".into(), limit_strength.to_string()));
    if limit_strength {
        options.push(("UCI_Elo".into(), clamp_elo(req.target_elo.unwrap_or(1500)).to_string()));
    }
    if let Some(contempt) = req.contempt {
        options.push(("Contempt".into(), contempt.to_string()));
    }
    if let Some(variety) = req.variety {
        options.push(("Variety".into(), variety.to_string()));
    }
    if let Some(personality) = &req.personality {
        if personality != "Default" {
            options.push(("Personality".into(), personality.clone()));
        }
    }
    match Armageddon::parse(req.armageddon.as_deref()) {
        Armageddon::Off => {}
        Armageddon::White => options.push(("Armageddon".into(), "white".into())),
        Armageddon::Black => options.push(("Armageddon".into(), "black".into())),
    }
    options
}

fn build_limits(req: &SuggestionRequest, limit_strength: bool) -> SearchLimits {
    if !limit_strength {
        match req.search_mode.as_deref() {
            Some("depth") => {
                return SearchLimits::Depth(clamp_depth(req.search_depth.unwrap_or(20)));
            }
            Some("movetime") => {
                return SearchLimits::MoveTimeMs(clamp_movetime(req.search_movetime.unwrap_or(1000)));
            }
            Some("nodes") => {
                return SearchLimits::Nodes(clamp_nodes(req.search_nodes.unwrap_or(DEFAULT_NODE_BUDGET)));
            }
            _ => {}
        }
    }
    SearchLimits::Nodes(DEFAULT_NODE_BUDGET)
}

pub struct SuggestionHandler {
    classifier: Arc<dyn SuggestionClassifier>,
}

impl SuggestionHandler {
    pub fn new(classifier: Arc<dyn SuggestionClassifier>) -> Self {
        Self { classifier }
    }

    /// Validate the request and enqueue a work item. Returns a receiver the
    /// caller awaits for the result, or a validation error (synchronous,
    /// nothing enqueued — §4.5/§7).
    pub async fn handle(
        &self,
        req: SuggestionRequest,
        user_id: String,
        queue: &RequestQueue<SuggestionArtifact>,
    ) -> Result<oneshot::Receiver<Result<SuggestionArtifact, EngineError>>, GatewayError> {
        validate(&req)?;

        let limit_strength = if req.puzzle_mode {
            false
        } else {
            req.limit_strength.unwrap_or(true)
        };
        let options = build_options(&req, limit_strength);
        let limits = build_limits(&req, limit_strength);
        let side_to_move = fen::side_to_move(&req.fen)
            .ok_or_else(|| GatewayError::InvalidInput("fen missing side to move".into()))?;
        let multi_pv = clamp_multi_pv(req.multi_pv.unwrap_or(1));
        let position = match &req.moves {
            Some(moves) if !moves.is_empty() => SearchPosition::StartposMoves(moves.clone()),
            _ => SearchPosition::Fen(req.fen.clone()),
        };
        let fen_echo = req.fen.clone();
        let classifier = self.classifier.clone();

        let process: ProcessFn<SuggestionArtifact> = Box::new(move |mut engine| {
            Box::pin(async move {
                let result = run_suggestion(&mut engine, options, position, side_to_move, multi_pv, limits, fen_echo, classifier).await;
                (engine, result)
            })
        });

        let (tx, rx) = oneshot::channel();
        queue
            .enqueue(Request::new(req.request_id, user_id, process, tx))
            .await;
        Ok(rx)
    }
}

#[allow(clippy::too_many_arguments)]
async fn run_suggestion(
    engine: &mut crate::engine::EngineProcess,
    options: Vec<(String, String)>,
    position: SearchPosition,
    side_to_move: crate::types::Color,
    multi_pv: u32,
    limits: SearchLimits,
    fen_echo: String,
    classifier: Arc<dyn SuggestionClassifier>,
) -> Result<SuggestionArtifact, EngineError> {
    engine.configure(&options).await?;
    let candidates = engine
        .search(SearchRequest {
            position,
            side_to_move,
            multi_pv,
            limits,
        })
        .await?;

    let suggestions = classifier.classify(&candidates);
    let best = suggestions.first().ok_or_else(|| {
        EngineError::ProtocolViolation("search produced no candidates".into())
    })?;
    let position_eval = f64::from(best.eval_cp) / 100.0;
    let mate_in = best.mate;
    let win_rate = best.win_pct;
    let max_depth = suggestions.iter().map(|s| s.depth).max().unwrap_or(0);

    Ok(SuggestionArtifact {
        fen: fen_echo,
        suggestions,
        position_eval,
        mate_in,
        win_rate,
        max_depth,
    })
}
