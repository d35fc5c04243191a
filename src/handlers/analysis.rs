//! Analysis Handler (§4.6): before/after search, centipawn loss, classification.

use serde::Serialize;
use tokio::sync::oneshot;

use crate::engine::{EngineError, SearchLimits, SearchPosition, SearchRequest};
use crate::error::GatewayError;
use crate::fen;
use crate::gateway::protocol::AnalyzeRequest;
use crate::queue::{ProcessFn, Request, RequestQueue};
use crate::types::{self, Classification, Phase, PlayerColor};

const ANALYSIS_MULTI_PV: u32 = 2;
const ANALYSIS_DEPTH: u32 = 10;

/// Produced by the Analysis Handler (§3 "Analysis artifact").
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisArtifact {
    #[serde(rename = "playedMove")]
    pub played_move: String,
    pub classification: Classification,
    #[serde(rename = "centipawnLoss")]
    pub centipawn_loss: f64,
    #[serde(rename = "accuracyImpact")]
    pub accuracy_impact: f64,
    pub phase: Phase,
    #[serde(rename = "phaseWeightedImpact")]
    pub phase_weighted_impact: f64,
    #[serde(rename = "evalBefore")]
    pub eval_before: f64,
    #[serde(rename = "evalAfter")]
    pub eval_after: f64,
    #[serde(rename = "engineBestMove")]
    pub engine_best_move: String,
}

fn validate(req: &AnalyzeRequest) -> Result<(), GatewayError> {
    if req.request_id.trim().is_empty() {
        return Err(GatewayError::InvalidInput("requestId must not be empty".into()));
    }
    if req.mv.trim().is_empty() {
        return Err(GatewayError::InvalidInput("move must not be empty".into()));
    }
    fen::validate(&req.fen_before).map_err(|e| GatewayError::InvalidInput(format!("fenBefore: {e}")))?;
    fen::validate(&req.fen_after).map_err(|e| GatewayError::InvalidInput(format!("fenAfter: {e}")))?;
    Ok(())
}

pub struct AnalysisHandler;

impl AnalysisHandler {
    pub async fn handle(
        &self,
        req: AnalyzeRequest,
        user_id: String,
        queue: &RequestQueue<AnalysisArtifact>,
    ) -> Result<oneshot::Receiver<Result<AnalysisArtifact, EngineError>>, GatewayError> {
        validate(&req)?;

        let side_before = fen::side_to_move(&req.fen_before)
            .ok_or_else(|| GatewayError::InvalidInput("fenBefore missing side to move".into()))?;
        let side_after = fen::side_to_move(&req.fen_after)
            .ok_or_else(|| GatewayError::InvalidInput("fenAfter missing side to move".into()))?;

        let AnalyzeRequest {
            fen_before,
            fen_after,
            mv,
            player_color,
            ..
        } = req.clone();

        let process: ProcessFn<AnalysisArtifact> = Box::new(move |mut engine| {
            Box::pin(async move {
                let result = run_analysis(
                    &mut engine,
                    fen_before,
                    side_before,
                    fen_after,
                    side_after,
                    mv,
                    player_color,
                )
                .await;
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
async fn run_analysis(
    engine: &mut crate::engine::EngineProcess,
    fen_before: String,
    side_before: crate::types::Color,
    fen_after: String,
    side_after: crate::types::Color,
    played_move: String,
    player_color: PlayerColor,
) -> Result<AnalysisArtifact, EngineError> {
    engine
        .configure(&[("MultiPV".to_string(), ANALYSIS_MULTI_PV.to_string())])
        .await?;

    let before = engine
        .search(SearchRequest {
            position: SearchPosition::Fen(fen_before.clone()),
            side_to_move: side_before,
            multi_pv: ANALYSIS_MULTI_PV,
            limits: SearchLimits::Depth(ANALYSIS_DEPTH),
        })
        .await?;

    engine
        .configure(&[("MultiPV".to_string(), "1".to_string())])
        .await?;
    let after = engine
        .search(SearchRequest {
            position: SearchPosition::Fen(fen_after),
            side_to_move: side_after,
            multi_pv: 1,
            limits: SearchLimits::Depth(ANALYSIS_DEPTH),
        })
        .await?;

    let best_before = before
        .first()
        .ok_or_else(|| EngineError::ProtocolViolation("before-search produced no candidates".into()))?;
    let best_after = after
        .first()
        .ok_or_else(|| EngineError::ProtocolViolation("after-search produced no candidates".into()))?;

    let best_eval_white = f64::from(best_before.eval.eval_cp);
    let eval_after_white = f64::from(best_after.eval.eval_cp);

    let sign = if player_color == PlayerColor::White { 1.0 } else { -1.0 };
    let best_eval_player = best_eval_white * sign;
    let eval_after_player = eval_after_white * sign;

    let cpl = (best_eval_player - eval_after_player).max(0.0);
    let classification = types::classify_cpl(cpl);
    let impact = types::accuracy_impact(cpl);

    let material_fraction = types::total_material(fen::board_field(&fen_before)) / types::STARTING_MATERIAL;
    let phase = types::phase_from_fraction(material_fraction);
    let weighted_impact = (impact * types::phase_weight(phase) * 10.0).round() / 10.0;

    Ok(AnalysisArtifact {
        played_move,
        classification,
        centipawn_loss: cpl,
        accuracy_impact: impact,
        phase,
        phase_weighted_impact: weighted_impact,
        eval_before: best_eval_player / 100.0,
        eval_after: eval_after_player / 100.0,
        engine_best_move: best_before.mv.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_request() -> AnalyzeRequest {
        AnalyzeRequest {
            request_id: "r1".into(),
            fen_before: "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1".into(),
            fen_after: "rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b KQkq - 0 1".into(),
            mv: "e2e4".into(),
            player_color: PlayerColor::White,
        }
    }

    #[test]
    fn rejects_empty_request_id() {
        let mut req = base_request();
        req.request_id = "".into();
        assert!(validate(&req).is_err());
    }

    #[test]
    fn rejects_empty_move() {
        let mut req = base_request();
        req.mv = "".into();
        assert!(validate(&req).is_err());
    }

    /// Scenario S3 arithmetic, excluding the actual engine calls.
    #[test]
    fn scenario_s3_arithmetic() {
        let best_eval_white = 120.0;
        let eval_after_white = 20.0;
        let sign = 1.0; // white
        let cpl = (best_eval_white * sign - eval_after_white * sign).max(0.0);
        assert!((cpl - 100.0).abs() < f64::EPSILON);
        assert_eq!(types::classify_cpl(cpl), Classification::Inaccuracy);
        let impact = types::accuracy_impact(cpl);
        assert!((impact - 19.5).abs() < 0.2);

        let material_fraction = 78.0 / types::STARTING_MATERIAL;
        let phase = types::phase_from_fraction(material_fraction);
        assert_eq!(phase, Phase::Opening);
        let weighted = (impact * types::phase_weight(phase) * 10.0).round() / 10.0;
        assert!((weighted - 13.7).abs() < 0.3);
    }
}
