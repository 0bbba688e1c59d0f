//! Signal confidence.
//!
//! Conservative additive scoring with a hard ceiling. No bonus is ever
//! invented to pad a weak setup, and nothing reports certainty.

use serde::{Deserialize, Serialize};

use crate::types::Direction;

/// Starting confidence before any bonus.
const BASE: f64 = 0.35;
/// Bonus when RSI/price divergence backs the signal.
const DIVERGENCE_BONUS: f64 = 0.12;
/// Hard ceiling on any single-engine score.
pub const CONFIDENCE_CAP: f64 = 0.80;
/// Ceiling when two independent engines agree.
pub const BLEND_CAP: f64 = 0.95;

/// Conservative confidence score in [0.35, 0.80].
///
/// Three additive bonuses on a fixed base: the satisfied fraction of
/// the confluence checklist, divergence, and proximity to the structure
/// level on the signal's own side (support for buys, resistance for
/// sells). The opposite side's level never contributes.
pub fn honest_confidence(
    confluence_count: u8,
    confluence_total: u8,
    divergence: bool,
    support_distance_pct: Option<f64>,
    resistance_distance_pct: Option<f64>,
    direction: Direction,
) -> f64 {
    let mut confidence = BASE;

    let ratio = f64::from(confluence_count) / f64::from(confluence_total);
    if ratio >= 1.0 {
        confidence += 0.20;
    } else if ratio >= 0.83 {
        confidence += 0.15;
    } else if ratio >= 0.67 {
        confidence += 0.12;
    } else if ratio >= 0.50 {
        confidence += 0.08;
    }

    if divergence {
        confidence += DIVERGENCE_BONUS;
    }

    let level_distance = match direction {
        Direction::Buy => support_distance_pct,
        Direction::Sell => resistance_distance_pct,
    };
    if let Some(pct) = level_distance {
        if pct < 0.5 {
            confidence += 0.15;
        } else if pct < 1.0 {
            confidence += 0.10;
        } else if pct < 2.0 {
            confidence += 0.08;
        }
    }

    confidence.min(CONFIDENCE_CAP)
}

/// Agreement between the technical engine and a second opinion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OpinionAgreement {
    /// Both sides point the same way.
    Strong,
    /// Sides disagree; the stronger one wins at a discount.
    Weak,
}

/// Result of merging the technical read with a second opinion.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlendedOpinion {
    pub direction: Direction,
    pub confidence: f64,
    pub agreement: OpinionAgreement,
}

/// Merge the technical signal with an independent second opinion.
///
/// Agreement averages the two scores and adds a consensus bonus, capped
/// at [`BLEND_CAP`]. Disagreement keeps the stronger side's direction
/// at a 20% discount. Ties go to the second opinion.
pub fn blend_opinions(
    technical: Direction,
    technical_confidence: f64,
    other: Direction,
    other_confidence: f64,
) -> BlendedOpinion {
    if technical == other {
        let confidence =
            (technical_confidence * 0.5 + other_confidence * 0.5 + 0.10).min(BLEND_CAP);
        BlendedOpinion {
            direction: technical,
            confidence,
            agreement: OpinionAgreement::Strong,
        }
    } else if technical_confidence > other_confidence {
        BlendedOpinion {
            direction: technical,
            confidence: technical_confidence * 0.8,
            agreement: OpinionAgreement::Weak,
        }
    } else {
        BlendedOpinion {
            direction: other,
            confidence: other_confidence * 0.8,
            agreement: OpinionAgreement::Weak,
        }
    }
}
