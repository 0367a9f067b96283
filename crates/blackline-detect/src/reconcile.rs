//! Merges pattern and model candidates into one canonical entity list.

use std::cmp::Ordering;

use blackline_core::Entity;
use tracing::debug;

/// Confidence filter plus greedy overlap resolution.
///
/// Candidates at or above the threshold are ranked by risk (highest
/// first), then confidence, then position, and each is accepted unless it
/// shares a character with an already accepted entity. The result is
/// sorted by `start`.
#[derive(Debug, Clone, Copy)]
pub struct SpanReconciler {
    pub threshold: f64,
}

impl SpanReconciler {
    pub fn new(threshold: f64) -> Self {
        Self { threshold }
    }

    pub fn reconcile(&self, pattern: Vec<Entity>, model: Vec<Entity>) -> Vec<Entity> {
        let total = pattern.len() + model.len();
        let mut candidates: Vec<Entity> = pattern
            .into_iter()
            .chain(model)
            .filter(|e| e.confidence >= self.threshold && e.start < e.end)
            .collect();

        // Stable: equal keys keep pattern-before-model order.
        candidates.sort_by(rank);

        let mut accepted: Vec<Entity> = Vec::with_capacity(candidates.len());
        for candidate in candidates {
            if accepted.iter().all(|a| !a.overlaps(&candidate)) {
                accepted.push(candidate);
            }
        }

        accepted.sort_by_key(|e| e.start);
        debug!("Reconciled {} candidates into {} entities", total, accepted.len());
        accepted
    }
}

/// Risk desc, confidence desc, start asc, longer span first.
fn rank(a: &Entity, b: &Entity) -> Ordering {
    b.risk_level
        .cmp(&a.risk_level)
        .then_with(|| b.confidence.total_cmp(&a.confidence))
        .then_with(|| a.start.cmp(&b.start))
        .then_with(|| b.end.cmp(&a.end))
}
