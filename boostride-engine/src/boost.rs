//! Boost model: maps a ride value and ticket quality to a clamped boost.
//!
//! The operator configures a boost window `[min_boost_pct, max_boost_pct]`
//! and optionally the selection count and combined odds a ticket needs to
//! reach the top of it. Weaker tickets see a proportionally lower ceiling
//! (and a slightly lower floor) through the eligibility factor.
use serde::{Deserialize, Serialize};

use crate::constants::{
    BONUS_DECIMALS, EFFECTIVE_MIN_LIFT, ELIGIBILITY_EXPONENT, ELIGIBILITY_ODDS_WEIGHT,
    ELIGIBILITY_SELECTION_WEIGHT, STRENGTH_MULTIPLIER_BASE, STRENGTH_MULTIPLIER_SPAN,
    VALUE_DECIMALS, VOLATILITY_MULTIPLIER_BASE, VOLATILITY_MULTIPLIER_SPAN,
};
use crate::numbers::{clamp_between, round_to, round6, u32_to_f64};

/// Operator boost window and max-boost thresholds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoostConfig {
    #[serde(default = "BoostConfig::default_min_boost_pct")]
    pub min_boost_pct: f64,
    #[serde(default = "BoostConfig::default_max_boost_pct")]
    pub max_boost_pct: f64,
    #[serde(default)]
    pub max_boost_min_selections: Option<u32>,
    #[serde(default)]
    pub max_boost_min_combined_odds: Option<f64>,
}

impl BoostConfig {
    #[must_use]
    pub const fn default_min_boost_pct() -> f64 {
        0.05
    }

    #[must_use]
    pub const fn default_max_boost_pct() -> f64 {
        0.5
    }

    /// Window with no max-boost thresholds.
    #[must_use]
    pub const fn window(min_boost_pct: f64, max_boost_pct: f64) -> Self {
        Self {
            min_boost_pct,
            max_boost_pct,
            max_boost_min_selections: None,
            max_boost_min_combined_odds: None,
        }
    }

    fn ordered_window(&self) -> (f64, f64) {
        let lo = if self.min_boost_pct.is_finite() {
            self.min_boost_pct
        } else {
            0.0
        };
        let hi = if self.max_boost_pct.is_finite() {
            self.max_boost_pct
        } else {
            lo
        };
        if lo <= hi { (lo, hi) } else { (hi, lo) }
    }

    fn selection_target(&self) -> Option<u32> {
        self.max_boost_min_selections.filter(|&target| target > 0)
    }

    fn odds_target(&self) -> Option<f64> {
        self.max_boost_min_combined_odds
            .filter(|&target| target.is_finite() && target > 0.0)
    }
}

impl Default for BoostConfig {
    fn default() -> Self {
        Self::window(Self::default_min_boost_pct(), Self::default_max_boost_pct())
    }
}

/// Ticket-specific boost window.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoostModel {
    pub selection_ratio: f64,
    pub odds_ratio: f64,
    pub eligibility_factor: f64,
    pub effective_min_boost: f64,
    pub effective_max_boost: f64,
}

fn capped_ratio(actual: f64, target: f64) -> f64 {
    if actual.is_nan() || actual <= 0.0 {
        return 0.0;
    }
    (actual / target).min(1.0)
}

/// Derive the eligibility factor and effective window for a ticket.
#[must_use]
pub fn compute_boost_model_details(
    qualifying_selections: u32,
    combined_odds: f64,
    config: &BoostConfig,
) -> BoostModel {
    let (min, max) = config.ordered_window();
    let selection_target = config.selection_target();
    let odds_target = config.odds_target();

    let selection_ratio = selection_target.map_or(1.0, |target| {
        capped_ratio(u32_to_f64(qualifying_selections), u32_to_f64(target))
    });
    let odds_ratio = odds_target.map_or(1.0, |target| capped_ratio(combined_odds, target));

    let eligibility_factor = match (selection_target, odds_target) {
        (None, None) => {
            return BoostModel {
                selection_ratio,
                odds_ratio,
                eligibility_factor: 1.0,
                effective_min_boost: round6(min),
                effective_max_boost: round6(max),
            };
        }
        (Some(_), Some(_)) => {
            let selection_component = selection_ratio.powf(ELIGIBILITY_EXPONENT);
            let odds_component = odds_ratio.powf(ELIGIBILITY_EXPONENT);
            (selection_component.powf(ELIGIBILITY_SELECTION_WEIGHT)
                * odds_component.powf(ELIGIBILITY_ODDS_WEIGHT))
            .min(1.0)
        }
        (Some(_), None) => selection_ratio.powf(ELIGIBILITY_EXPONENT),
        (None, Some(_)) => odds_ratio.powf(ELIGIBILITY_EXPONENT),
    };

    let effective_max_boost = (min + (max - min) * eligibility_factor).max(min);
    let effective_min_boost = clamp_between(
        min + (effective_max_boost - min) * (eligibility_factor * EFFECTIVE_MIN_LIFT),
        min,
        effective_max_boost,
    );
    BoostModel {
        selection_ratio: round6(selection_ratio),
        odds_ratio: round6(odds_ratio),
        eligibility_factor: round6(eligibility_factor),
        effective_min_boost: round6(effective_min_boost),
        effective_max_boost: round6(effective_max_boost),
    }
}

/// Inputs to [`calculate_final_boost_details`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoostInputs {
    pub ride_value: f64,
    pub ticket_strength: f64,
    pub qualifying_selections: u32,
    pub combined_odds: f64,
    pub has_ride_ended: bool,
}

/// Final boost with the intermediate values that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FinalBoost {
    pub final_boost_pct: f64,
    pub raw_boost: f64,
    pub effective_max_boost: f64,
    pub min_boost: f64,
    pub is_clamped_to_max: bool,
    pub is_clamped_to_min: bool,
    pub boost_model: BoostModel,
}

/// Unrounded boost before clamping: amplify the swing, then scale the magnitude.
pub(crate) fn raw_boost(ride_value: f64, ticket_strength: f64, model: &BoostModel) -> f64 {
    let strength = if ticket_strength.is_nan() {
        0.0
    } else {
        ticket_strength.clamp(0.0, 1.0)
    };
    let ride_value = if ride_value.is_finite() { ride_value } else { 0.0 };
    let midpoint = (model.effective_min_boost + model.effective_max_boost) / 2.0;
    let volatility_multiplier = VOLATILITY_MULTIPLIER_BASE + VOLATILITY_MULTIPLIER_SPAN * strength;
    let adjusted = midpoint + (ride_value - midpoint) * volatility_multiplier;
    let strength_multiplier = STRENGTH_MULTIPLIER_BASE + STRENGTH_MULTIPLIER_SPAN * strength;
    adjusted * strength_multiplier
}

/// Compute the boost a ticket would lock at `ride_value`.
///
/// An ended ride always yields 0 and never reports clamping.
#[must_use]
pub fn calculate_final_boost_details(inputs: &BoostInputs, config: &BoostConfig) -> FinalBoost {
    let model = compute_boost_model_details(
        inputs.qualifying_selections,
        inputs.combined_odds,
        config,
    );
    if inputs.has_ride_ended {
        return FinalBoost {
            final_boost_pct: 0.0,
            raw_boost: 0.0,
            effective_max_boost: model.effective_max_boost,
            min_boost: model.effective_min_boost,
            is_clamped_to_max: false,
            is_clamped_to_min: false,
            boost_model: model,
        };
    }

    let raw = raw_boost(inputs.ride_value, inputs.ticket_strength, &model);
    let is_clamped_to_max = raw > model.effective_max_boost;
    let is_clamped_to_min = raw < model.effective_min_boost;
    let clamped = raw.clamp(model.effective_min_boost, model.effective_max_boost);
    FinalBoost {
        final_boost_pct: round_to(clamped, VALUE_DECIMALS),
        raw_boost: round_to(raw, VALUE_DECIMALS),
        effective_max_boost: model.effective_max_boost,
        min_boost: model.effective_min_boost,
        is_clamped_to_max,
        is_clamped_to_min,
        boost_model: model,
    }
}

/// Bonus paid on `winnings` at `boost_pct`, rounded to 4 decimals.
#[must_use]
pub fn calculate_bonus_amount(winnings: f64, boost_pct: f64) -> f64 {
    if !(winnings > 0.0 && boost_pct > 0.0) {
        return 0.0;
    }
    round_to(winnings * boost_pct, BONUS_DECIMALS)
}
