//! The move classifier is an external post-processor — pluggable, not
//! specified by this crate. Interface: `(RawSuggestion[]) -> LabeledSuggestion[]`
//! (§9 Open Question). A no-op default satisfies the trait so the crate
//! builds and runs standalone; real deployments supply their own.

use crate::engine::RawCandidate;

/// One candidate move, labeled by the external classifier.
#[derive(Debug, Clone)]
pub struct LabeledSuggestion {
    pub mv: String,
    pub pv: Vec<String>,
    pub eval_cp: i32,
    pub win_pct: f64,
    pub draw_pct: f64,
    pub loss_pct: f64,
    pub depth: u32,
    pub mate: Option<i32>,
    pub label: String,
}

/// `(RawCandidate[]) -> LabeledSuggestion[]`.
pub trait SuggestionClassifier: Send + Sync {
    fn classify(&self, candidates: &[RawCandidate]) -> Vec<LabeledSuggestion>;
}

/// Default classifier: passes candidates through unlabeled. Stands in for
/// the real domain-scoring heuristics, which are explicitly out of scope
/// (§1 "domain scoring heuristics").
pub struct PassthroughClassifier;

impl SuggestionClassifier for PassthroughClassifier {
    fn classify(&self, candidates: &[RawCandidate]) -> Vec<LabeledSuggestion> {
        candidates
            .iter()
            .map(|c| LabeledSuggestion {
                mv: c.mv.clone(),
                pv: c.pv.clone(),
                eval_cp: c.eval.eval_cp,
                win_pct: c.eval.win_pct,
                draw_pct: c.eval.draw_pct,
                loss_pct: c.eval.loss_pct,
                depth: c.depth,
                mate: c.eval.mate,
                label: "unclassified".to_string(),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::uci::NormalizedEval;

    #[test]
    fn passthrough_preserves_count_and_fields() {
        let candidates = vec![RawCandidate {
            multipv: 1,
            mv: "e2e4".to_string(),
            pv: vec!["e2e4".to_string()],
            depth: 20,
            eval: NormalizedEval {
                eval_cp: 30,
                win_pct: 55.0,
                draw_pct: 30.0,
                loss_pct: 15.0,
                mate: None,
            },
        }];
        let labeled = PassthroughClassifier.classify(&candidates);
        assert_eq!(labeled.len(), 1);
        assert_eq!(labeled[0].mv, "e2e4");
        assert_eq!(labeled[0].eval_cp, 30);
    }
}
