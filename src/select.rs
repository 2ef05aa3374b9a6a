use crate::scan::DetectionCandidate;
use serde_json::{Map, Value};

/// Keys that may hold a nested bounding box on a detection record.
pub const BBOX_KEYS: &[&str] = &["bbox", "bounding_box"];

/// Whether an entry looks like it carries a position.
pub fn has_coordinate_shape(entry: &Map<String, Value>) -> bool {
    let explicit = entry.contains_key("x") && entry.contains_key("y");
    explicit
        || BBOX_KEYS
            .iter()
            .any(|key| entry.get(*key).is_some_and(Value::is_object))
}

/// Number of entries in a candidate that look like real detections.
pub fn score(candidate: &DetectionCandidate<'_>) -> usize {
    candidate
        .entries
        .iter()
        .filter(|entry| has_coordinate_shape(entry))
        .count()
}

/// Pick the winning candidate (highest score wins, earliest wins ties)
///
/// Returns the index into `candidates` alongside the winner so callers can
/// report which list was used.
pub fn select_best<'c, 'a>(
    candidates: &'c [DetectionCandidate<'a>],
) -> Option<(usize, &'c DetectionCandidate<'a>)> {
    let mut best: Option<(usize, &DetectionCandidate<'a>)> = None;
    let mut best_score = 0;

    for (index, candidate) in candidates.iter().enumerate() {
        let candidate_score = score(candidate);
        if best.is_none() || candidate_score > best_score {
            best = Some((index, candidate));
            best_score = candidate_score;
        }
    }

    if let Some((index, winner)) = best {
        log::debug!(
            "selected {} (index {}, score {}) out of {} candidate(s)",
            winner.pointer,
            index,
            best_score,
            candidates.len()
        );
    }
    best
}
