//! Reward profile configuration.
//!
//! A profile is the operator-owned bundle of thresholds and bounds a reward
//! is granted under. Every field has a serde default, so `{}` is a complete
//! profile.
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::boost::BoostConfig;
use crate::qualification::{Selection, StrengthConfig, TicketAssessment};

/// Errors raised when profile invariants are violated.
#[derive(Debug, Error, PartialEq)]
pub enum ProfileConfigError {
    #[error("profile version id must not be empty")]
    EmptyVersion,
    #[error("boost minimum {min:.4} exceeds maximum {max:.4}")]
    BoostMinExceedsMax { min: f64, max: f64 },
    #[error("ride duration minimum {min:.3}s exceeds maximum {max:.3}s")]
    DurationMinExceedsMax { min: f64, max: f64 },
    #[error("{field} must be at least {min:.4} (got {value:.4})")]
    MinViolation {
        field: &'static str,
        min: f64,
        value: f64,
    },
    #[error("{field} must be between {min:.4} and {max:.4} (got {value:.4})")]
    RangeViolation {
        field: &'static str,
        min: f64,
        max: f64,
        value: f64,
    },
    #[error("minimum crash time {crash:.3}s exceeds the shortest ride ({duration:.3}s)")]
    CrashAfterShortestRide { crash: f64, duration: f64 },
    #[error("path needs at least {min} samples (got {value})")]
    PathSamples { min: usize, value: usize },
    #[error("strength max_selection_bonus must be positive")]
    SelectionBonusZero,
}

/// Operator configuration for one reward profile version.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RewardProfile {
    #[serde(default = "RewardProfile::default_version_id")]
    pub version_id: String,
    #[serde(default)]
    pub boost: BoostConfig,
    #[serde(default)]
    pub strength: StrengthConfig,
    #[serde(default = "RewardProfile::default_min_selection_odds")]
    pub min_selection_odds: f64,
    #[serde(default)]
    pub min_combined_odds: Option<f64>,
    #[serde(default = "RewardProfile::default_ride_duration_min_seconds")]
    pub ride_duration_min_seconds: f64,
    #[serde(default = "RewardProfile::default_ride_duration_max_seconds")]
    pub ride_duration_max_seconds: f64,
    #[serde(default = "RewardProfile::default_min_crash_seconds")]
    pub min_crash_seconds: f64,
    #[serde(default = "RewardProfile::default_min_peak_delay_seconds")]
    pub min_peak_delay_seconds: f64,
    #[serde(default = "RewardProfile::default_path_sample_count")]
    pub path_sample_count: usize,
}

impl RewardProfile {
    fn default_version_id() -> String {
        "v1".to_string()
    }

    const fn default_min_selection_odds() -> f64 {
        1.2
    }

    const fn default_ride_duration_min_seconds() -> f64 {
        20.0
    }

    const fn default_ride_duration_max_seconds() -> f64 {
        60.0
    }

    const fn default_min_crash_seconds() -> f64 {
        3.0
    }

    const fn default_min_peak_delay_seconds() -> f64 {
        2.0
    }

    const fn default_path_sample_count() -> usize {
        60
    }

    /// Parse a profile from JSON and validate it.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is malformed or the profile fails validation.
    pub fn from_json(json: &str) -> Result<Self, Box<dyn std::error::Error + Send + Sync>> {
        let profile: Self = serde_json::from_str(json)?;
        profile.validate()?;
        Ok(profile)
    }

    /// Check every profile invariant.
    ///
    /// # Errors
    ///
    /// Returns the first violated invariant.
    pub fn validate(&self) -> Result<(), ProfileConfigError> {
        if self.version_id.trim().is_empty() {
            return Err(ProfileConfigError::EmptyVersion);
        }
        for (field, value) in [
            ("boost.min_boost_pct", self.boost.min_boost_pct),
            ("boost.max_boost_pct", self.boost.max_boost_pct),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ProfileConfigError::RangeViolation {
                    field,
                    min: 0.0,
                    max: 1.0,
                    value,
                });
            }
        }
        if self.boost.min_boost_pct > self.boost.max_boost_pct {
            return Err(ProfileConfigError::BoostMinExceedsMax {
                min: self.boost.min_boost_pct,
                max: self.boost.max_boost_pct,
            });
        }
        if let Some(odds) = self.boost.max_boost_min_combined_odds
            && !(odds >= 1.0)
        {
            return Err(ProfileConfigError::MinViolation {
                field: "boost.max_boost_min_combined_odds",
                min: 1.0,
                value: odds,
            });
        }
        if !(self.ride_duration_min_seconds > 0.0) {
            return Err(ProfileConfigError::MinViolation {
                field: "ride_duration_min_seconds",
                min: 0.0,
                value: self.ride_duration_min_seconds,
            });
        }
        if self.ride_duration_min_seconds > self.ride_duration_max_seconds {
            return Err(ProfileConfigError::DurationMinExceedsMax {
                min: self.ride_duration_min_seconds,
                max: self.ride_duration_max_seconds,
            });
        }
        for (field, value) in [
            ("min_selection_odds", self.min_selection_odds),
            ("min_crash_seconds", self.min_crash_seconds),
            ("min_peak_delay_seconds", self.min_peak_delay_seconds),
            ("strength.base_odds", self.strength.base_odds),
            ("strength.exponent", self.strength.exponent),
        ] {
            if !(value >= 0.0) {
                return Err(ProfileConfigError::MinViolation {
                    field,
                    min: 0.0,
                    value,
                });
            }
        }
        if let Some(odds) = self.min_combined_odds
            && !(odds >= 0.0)
        {
            return Err(ProfileConfigError::MinViolation {
                field: "min_combined_odds",
                min: 0.0,
                value: odds,
            });
        }
        if self.min_crash_seconds > self.ride_duration_min_seconds {
            return Err(ProfileConfigError::CrashAfterShortestRide {
                crash: self.min_crash_seconds,
                duration: self.ride_duration_min_seconds,
            });
        }
        if self.path_sample_count < 2 {
            return Err(ProfileConfigError::PathSamples {
                min: 2,
                value: self.path_sample_count,
            });
        }
        if self.strength.max_selection_bonus == 0 {
            return Err(ProfileConfigError::SelectionBonusZero);
        }
        Ok(())
    }

    /// Qualify and score a ticket under this profile's thresholds.
    #[must_use]
    pub fn assess_ticket(&self, selections: &[Selection]) -> TicketAssessment {
        TicketAssessment::evaluate(
            selections,
            self.min_selection_odds,
            self.min_combined_odds,
            &self.strength,
        )
    }
}

impl Default for RewardProfile {
    fn default() -> Self {
        Self {
            version_id: Self::default_version_id(),
            boost: BoostConfig::default(),
            strength: StrengthConfig::default(),
            min_selection_odds: Self::default_min_selection_odds(),
            min_combined_odds: None,
            ride_duration_min_seconds: Self::default_ride_duration_min_seconds(),
            ride_duration_max_seconds: Self::default_ride_duration_max_seconds(),
            min_crash_seconds: Self::default_min_crash_seconds(),
            min_peak_delay_seconds: Self::default_min_peak_delay_seconds(),
            path_sample_count: Self::default_path_sample_count(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_json_yields_defaults() {
        let profile: RewardProfile = serde_json::from_str("{}").expect("deserialize");
        assert_eq!(profile, RewardProfile::default());
        assert!(profile.validate().is_ok());
        assert_eq!(profile.strength.min_selections, 3);
        assert!((profile.boost.max_boost_pct - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn nested_overrides_keep_other_defaults() {
        let profile = RewardProfile::from_json(
            r#"{"version_id":"v7","boost":{"max_boost_pct":0.3},"strength":{"min_selections":4}}"#,
        )
        .expect("profile");
        assert_eq!(profile.version_id, "v7");
        assert!((profile.boost.min_boost_pct - 0.05).abs() < f64::EPSILON);
        assert!((profile.boost.max_boost_pct - 0.3).abs() < f64::EPSILON);
        assert_eq!(profile.strength.min_selections, 4);
        assert!((profile.strength.exponent - 1.5).abs() < f64::EPSILON);
    }

    #[test]
    fn inverted_boost_window_is_rejected() {
        let profile = RewardProfile {
            boost: BoostConfig::window(0.4, 0.2),
            ..RewardProfile::default()
        };
        assert_eq!(
            profile.validate(),
            Err(ProfileConfigError::BoostMinExceedsMax { min: 0.4, max: 0.2 })
        );
    }

    #[test]
    fn duration_and_crash_bounds_are_checked() {
        let inverted = RewardProfile {
            ride_duration_min_seconds: 90.0,
            ..RewardProfile::default()
        };
        assert!(matches!(
            inverted.validate(),
            Err(ProfileConfigError::DurationMinExceedsMax { .. })
        ));

        let late_crash = RewardProfile {
            min_crash_seconds: 25.0,
            ..RewardProfile::default()
        };
        assert!(matches!(
            late_crash.validate(),
            Err(ProfileConfigError::CrashAfterShortestRide { .. })
        ));

        let zero = RewardProfile {
            ride_duration_min_seconds: 0.0,
            ..RewardProfile::default()
        };
        assert!(matches!(
            zero.validate(),
            Err(ProfileConfigError::MinViolation {
                field: "ride_duration_min_seconds",
                ..
            })
        ));
    }

    #[test]
    fn nan_fields_fail_validation() {
        let profile = RewardProfile {
            min_selection_odds: f64::NAN,
            ..RewardProfile::default()
        };
        assert!(profile.validate().is_err());
    }

    #[test]
    fn malformed_json_is_an_error() {
        assert!(RewardProfile::from_json("{not json").is_err());
        assert!(RewardProfile::from_json(r#"{"path_sample_count":1}"#).is_err());
    }

    #[test]
    fn assess_ticket_applies_profile_thresholds() {
        let profile = RewardProfile {
            min_combined_odds: Some(20.0),
            ..RewardProfile::default()
        };
        let ticket = [
            Selection::new("a", 2.0),
            Selection::new("b", 3.0),
            Selection::new("c", 1.5),
            Selection::new("d", 1.1),
        ];
        let assessment = profile.assess_ticket(&ticket);
        assert_eq!(assessment.qualifying_count, 3);
        assert!((assessment.combined_odds - 9.0).abs() < 1e-12);
        assert!(assessment.meets_min_selections);
        assert!(!assessment.meets_combined_odds);
    }
}
