//! Composite summary message
//!
//! The summary is assembled from the verdict headline plus one caveat per
//! degraded detector. Caveats are appended, never replaced, so a favorable
//! verdict can't hide a missing explanation or an unavailable detector.

use super::Verdict;
use crate::types::{AnalysisStatus, DetectorKind, DetectorResult, DetectorResults, DetectorState};

fn headline(verdict: Verdict) -> &'static str {
    match verdict {
        Verdict::Clean => "Image appears authentic",
        Verdict::Caution => "Possible manipulation, manual review recommended",
        Verdict::Forged => "Significant signs of manipulation or synthesis detected",
    }
}

/// Caveat for one degraded detector, `None` when it fully succeeded
pub fn caveat(kind: DetectorKind, result: &DetectorResult) -> Option<String> {
    if !result.state.is_degraded() {
        return None;
    }
    let outcome = match result.state {
        DetectorState::PartialSuccess => "partially succeeded",
        DetectorState::Unavailable => "unavailable",
        _ => "failed",
    };
    let mut caveat = format!("{} {} ({})", kind.label(), outcome, result.message);
    if result.state.uses_default_score() {
        caveat.push_str(&format!("; default score {:.1} used", result.score));
    }
    Some(caveat)
}

/// Build the composite summary
pub fn build_summary(
    verdict: Verdict,
    final_score: f64,
    results: &DetectorResults,
    status: AnalysisStatus,
) -> String {
    let mut summary = String::new();
    if status == AnalysisStatus::Aborted {
        summary.push_str("Analysis aborted before completion. ");
    }
    summary.push_str(&format!(
        "{}: {} (trust score {:.1}/100).",
        verdict,
        headline(verdict),
        final_score
    ));

    let caveats: Vec<String> = results
        .iter()
        .filter_map(|(kind, result)| caveat(kind, result))
        .collect();
    if !caveats.is_empty() {
        summary.push_str(" Caveats: ");
        summary.push_str(&caveats.join("; "));
        summary.push('.');
    }

    summary
}
