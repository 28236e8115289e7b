//! Boostride Engine
//!
//! Deterministic ride-curve generation and boost model for suspense-based
//! payout boosts. Everything here is pure and platform-agnostic: a ride is a
//! function of its seed, and every quote is a function of the stored ride and
//! the ticket presented.

pub mod audit;
pub mod boost;
pub mod constants;
pub mod interpolate;
pub mod numbers;
pub mod path;
pub mod profile;
pub mod qualification;
pub mod random;
pub mod ride;
pub mod seed;
pub mod service;
pub mod timing;

// Re-export commonly used types
pub use audit::{ride_digest, verify_ride_digest};
pub use boost::{
    BoostConfig, BoostInputs, BoostModel, FinalBoost, calculate_bonus_amount,
    calculate_final_boost_details, compute_boost_model_details,
};
pub use interpolate::interpolate_ride_value;
pub use path::{PathPoint, PathRequest, build_effective_ride_path};
pub use profile::{ProfileConfigError, RewardProfile};
pub use qualification::{
    QualificationSplit, Selection, StrengthConfig, TicketAssessment, calculate_combined_odds,
    compute_ticket_strength, filter_qualifying_selections, meets_combined_odds_threshold,
    meets_min_selection_count,
};
pub use random::SeededRandom;
pub use ride::{
    Checkpoint, EnforcementPass, PassChange, PassLog, Ride, RideConfig, generate_ride,
    generate_ride_with_log,
};
pub use seed::{
    RideParams, derive_crash_fraction, derive_ride_duration_seconds, derive_ride_params,
    generate_seed, is_seed,
};
pub use service::{
    LockRecord, MemoryRideStore, Quote, RewardRecord, RewardStatus, RideService, RideServiceError,
};
pub use timing::{
    calculate_elapsed_fraction, elapsed_fraction_from_seconds, has_ride_ended, is_crashed,
};

/// Trait for abstracting reward and lock persistence
/// Platform-specific implementations should provide this
pub trait RideStore {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Load a reward record
    ///
    /// # Errors
    ///
    /// Returns an error if the record cannot be read.
    fn load_reward(&self, reward_id: &str) -> Result<Option<RewardRecord>, Self::Error>;

    /// Save a reward record, replacing any previous version
    ///
    /// # Errors
    ///
    /// Returns an error if the record cannot be written.
    fn save_reward(&self, record: &RewardRecord) -> Result<(), Self::Error>;

    /// Load the lock for one bet on a reward
    ///
    /// # Errors
    ///
    /// Returns an error if the lock cannot be read.
    fn load_lock(&self, reward_id: &str, bet_id: &str) -> Result<Option<LockRecord>, Self::Error>;

    /// Save a lock record, replacing any previous version
    ///
    /// # Errors
    ///
    /// Returns an error if the lock cannot be written.
    fn save_lock(&self, record: &LockRecord) -> Result<(), Self::Error>;
}
