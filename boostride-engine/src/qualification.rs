//! Ticket qualification and strength scoring.
use serde::{Deserialize, Serialize};

use crate::constants::{
    STRENGTH_BASE_ODDS, STRENGTH_EXPONENT, STRENGTH_MAX_SELECTION_BONUS, STRENGTH_ODDS_FLOOR,
    STRENGTH_ODDS_SCALE, VALUE_DECIMALS,
};
use crate::numbers::{round_to, u32_to_f64};

/// One leg of a bet ticket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Selection {
    pub id: String,
    pub odds: f64,
    /// `Some(false)` marks the selection ineligible; absent means eligible.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_eligible: Option<bool>,
}

impl Selection {
    #[must_use]
    pub fn new(id: impl Into<String>, odds: f64) -> Self {
        Self {
            id: id.into(),
            odds,
            is_eligible: None,
        }
    }

    #[must_use]
    pub fn ineligible(id: impl Into<String>, odds: f64) -> Self {
        Self {
            is_eligible: Some(false),
            ..Self::new(id, odds)
        }
    }

    /// Whether the selection clears `min_odds` and is not marked ineligible.
    #[must_use]
    pub fn qualifies(&self, min_odds: f64) -> bool {
        self.is_eligible != Some(false) && self.odds >= min_odds
    }
}

/// Order-preserving partition of a ticket's selections.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QualificationSplit {
    pub qualifying: Vec<Selection>,
    pub disqualified: Vec<Selection>,
}

impl QualificationSplit {
    #[must_use]
    pub fn qualifying_count(&self) -> u32 {
        u32::try_from(self.qualifying.len()).unwrap_or(u32::MAX)
    }
}

/// Split selections into qualifying and disqualified legs.
#[must_use]
pub fn filter_qualifying_selections(selections: &[Selection], min_odds: f64) -> QualificationSplit {
    let (qualifying, disqualified) = selections
        .iter()
        .cloned()
        .partition(|selection| selection.qualifies(min_odds));
    QualificationSplit {
        qualifying,
        disqualified,
    }
}

/// Product of all odds. An empty ticket yields 0 so it fails every threshold.
#[must_use]
pub fn calculate_combined_odds(selections: &[Selection]) -> f64 {
    if selections.is_empty() {
        return 0.0;
    }
    selections.iter().map(|selection| selection.odds).product()
}

#[must_use]
pub const fn meets_min_selection_count(qualifying_count: u32, min_selections: u32) -> bool {
    qualifying_count >= min_selections
}

#[must_use]
pub fn meets_combined_odds_threshold(combined_odds: f64, min_combined_odds: f64) -> bool {
    combined_odds >= min_combined_odds
}

/// Tuning for [`compute_ticket_strength`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrengthConfig {
    #[serde(default = "StrengthConfig::default_min_selections")]
    pub min_selections: u32,
    #[serde(default = "StrengthConfig::default_base_odds")]
    pub base_odds: f64,
    #[serde(default = "StrengthConfig::default_exponent")]
    pub exponent: f64,
    #[serde(default = "StrengthConfig::default_max_selection_bonus")]
    pub max_selection_bonus: u32,
}

impl StrengthConfig {
    #[must_use]
    pub const fn default_min_selections() -> u32 {
        3
    }

    #[must_use]
    pub const fn default_base_odds() -> f64 {
        STRENGTH_BASE_ODDS
    }

    #[must_use]
    pub const fn default_exponent() -> f64 {
        STRENGTH_EXPONENT
    }

    #[must_use]
    pub const fn default_max_selection_bonus() -> u32 {
        STRENGTH_MAX_SELECTION_BONUS
    }

    /// Defaults with a custom selection minimum.
    #[must_use]
    pub fn with_min_selections(min_selections: u32) -> Self {
        Self {
            min_selections,
            ..Self::default()
        }
    }
}

impl Default for StrengthConfig {
    fn default() -> Self {
        Self {
            min_selections: Self::default_min_selections(),
            base_odds: Self::default_base_odds(),
            exponent: Self::default_exponent(),
            max_selection_bonus: Self::default_max_selection_bonus(),
        }
    }
}

/// Convex score in `[0, 1]` rewarding selection count and combined odds together.
///
/// Returns 0 below the selection minimum or when combined odds do not exceed 1.
#[must_use]
pub fn compute_ticket_strength(
    qualifying_count: u32,
    combined_odds: f64,
    config: &StrengthConfig,
) -> f64 {
    if qualifying_count < config.min_selections || combined_odds.is_nan() || combined_odds <= 1.0
    {
        return 0.0;
    }
    let bonus_cap = config.max_selection_bonus.max(1);
    let counted = (qualifying_count - config.min_selections)
        .saturating_add(1)
        .min(bonus_cap);
    let selection_factor = u32_to_f64(counted) / u32_to_f64(bonus_cap);

    let odds_span = (config.base_odds * STRENGTH_ODDS_SCALE).ln();
    let odds_span = if odds_span > 0.0 {
        odds_span
    } else {
        (STRENGTH_BASE_ODDS * STRENGTH_ODDS_SCALE).ln()
    };
    let odds_factor = (combined_odds.ln() / odds_span).max(STRENGTH_ODDS_FLOOR);

    let strength = (selection_factor.powf(config.exponent) * odds_factor.powf(config.exponent))
        .clamp(0.0, 1.0);
    round_to(strength, VALUE_DECIMALS)
}

/// Everything the quote and lock flows need to know about a ticket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TicketAssessment {
    pub split: QualificationSplit,
    pub qualifying_count: u32,
    pub combined_odds: f64,
    pub meets_min_selections: bool,
    pub meets_combined_odds: bool,
    pub strength: f64,
}

impl TicketAssessment {
    /// Qualify, combine and score a ticket.
    ///
    /// Combined odds are taken over the qualifying selections only.
    #[must_use]
    pub fn evaluate(
        selections: &[Selection],
        min_selection_odds: f64,
        min_combined_odds: Option<f64>,
        strength: &StrengthConfig,
    ) -> Self {
        let split = filter_qualifying_selections(selections, min_selection_odds);
        let qualifying_count = split.qualifying_count();
        let combined_odds = calculate_combined_odds(&split.qualifying);
        let meets_min_selections =
            meets_min_selection_count(qualifying_count, strength.min_selections);
        let meets_combined_odds = min_combined_odds
            .is_none_or(|threshold| meets_combined_odds_threshold(combined_odds, threshold));
        let strength = compute_ticket_strength(qualifying_count, combined_odds, strength);
        Self {
            split,
            qualifying_count,
            combined_odds,
            meets_min_selections,
            meets_combined_odds,
            strength,
        }
    }

    /// Both thresholds satisfied.
    #[must_use]
    pub const fn is_eligible(&self) -> bool {
        self.meets_min_selections && self.meets_combined_odds
    }
}
