//! Reward lifecycle over a [`RideStore`]: grant, opt-in, quote, lock, settle.
//!
//! The service owns the ordering rules around the pure core: a ride is
//! generated exactly once (the `Granted -> Active` transition), quotes and
//! locks always read the stored checkpoints, and a lock is idempotent per
//! `(reward, bet)` pair.
use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::collections::HashMap;
use std::convert::Infallible;
use std::rc::Rc;
use thiserror::Error;

use crate::RideStore;
use crate::audit::{ride_digest, verify_ride_digest};
use crate::boost::{BoostInputs, FinalBoost, calculate_bonus_amount, calculate_final_boost_details};
use crate::constants::{
    LOG_REWARD_GRANTED, LOG_REWARD_LOCKED, LOG_REWARD_OPTED_IN, LOG_REWARD_REJECTED,
    LOG_REWARD_SETTLED,
};
use crate::interpolate::interpolate_ride_value;
use crate::numbers::round_f64_to_i64;
use crate::path::{PathPoint, PathRequest, build_effective_ride_path};
use crate::profile::RewardProfile;
use crate::qualification::{Selection, TicketAssessment};
use crate::ride::{Checkpoint, RideConfig, generate_ride};
use crate::seed::{RideParams, derive_ride_duration_seconds, derive_ride_params, generate_seed};
use crate::timing::{calculate_elapsed_fraction, is_crashed};

/// Where a reward is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RewardStatus {
    Granted,
    Active,
    Locked,
    Settled,
}

/// Persisted state of one granted reward.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RewardRecord {
    pub reward_id: String,
    pub user_id: String,
    pub profile_version_id: String,
    pub seed: String,
    pub status: RewardStatus,
    pub duration_seconds: f64,
    pub granted_at: DateTime<Utc>,
    #[serde(default)]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub ends_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub ticket_strength: Option<f64>,
    #[serde(default)]
    pub params: Option<RideParams>,
    #[serde(default)]
    pub checkpoints: Vec<Checkpoint>,
    #[serde(default)]
    pub digest: Option<String>,
}

/// Persisted outcome of locking a reward for one bet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LockRecord {
    pub reward_id: String,
    pub bet_id: String,
    pub locked_at: DateTime<Utc>,
    pub elapsed_fraction: f64,
    pub ride_value: f64,
    pub ticket_strength: f64,
    pub qualifying_selections: u32,
    pub combined_odds: f64,
    pub boost: FinalBoost,
    pub path: Vec<PathPoint>,
    #[serde(default)]
    pub settled_bonus: Option<f64>,
}

/// Live boost quote; nothing is persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    pub reward_id: String,
    pub elapsed_fraction: f64,
    pub ride_value: f64,
    pub crashed: bool,
    pub ended: bool,
    pub ticket_strength: f64,
    pub qualifying_selections: u32,
    pub combined_odds: f64,
    pub boost: FinalBoost,
}

/// Rejections and storage failures raised by [`RideService`].
#[derive(Debug, Error)]
pub enum RideServiceError<E: std::error::Error + 'static> {
    #[error("reward {0} not found")]
    UnknownReward(String),
    #[error("reward {0} already granted")]
    DuplicateReward(String),
    #[error("reward {0} already opted in")]
    AlreadyOptedIn(String),
    #[error("reward {0} has not been opted in")]
    NotOptedIn(String),
    #[error("ride for reward {reward_id} crashed at {crash_fraction:.4}")]
    RideCrashed {
        reward_id: String,
        crash_fraction: f64,
    },
    #[error("ride for reward {0} has ended")]
    RideEnded(String),
    #[error("ticket has {actual} qualifying selections, {required} required")]
    InsufficientSelections { required: u32, actual: u32 },
    #[error("combined odds {actual:.2} below required {required:.2}")]
    CombinedOddsTooLow { required: f64, actual: f64 },
    #[error("reward {reward_id} was granted under profile {granted}, not {supplied}")]
    ProfileMismatch {
        reward_id: String,
        granted: String,
        supplied: String,
    },
    #[error("no lock for reward {reward_id} and bet {bet_id}")]
    NotLocked { reward_id: String, bet_id: String },
    #[error("storage error: {0}")]
    Store(#[source] E),
}

impl<E: std::error::Error + 'static> RideServiceError<E> {
    /// Stable reason code for callers mapping rejections to responses.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::UnknownReward(_) => "unknown_reward",
            Self::DuplicateReward(_) => "duplicate_reward",
            Self::AlreadyOptedIn(_) => "already_opted_in",
            Self::NotOptedIn(_) => "not_opted_in",
            Self::RideCrashed { .. } => "ride_crashed",
            Self::RideEnded(_) => "ride_ended",
            Self::InsufficientSelections { .. } => "insufficient_selections",
            Self::CombinedOddsTooLow { .. } => "combined_odds_too_low",
            Self::ProfileMismatch { .. } => "profile_mismatch",
            Self::NotLocked { .. } => "not_locked",
            Self::Store(_) => "store",
        }
    }
}

type ServiceResult<T, S> = Result<T, RideServiceError<<S as RideStore>::Error>>;

/// The opted-in parts of a [`RewardRecord`].
struct ActiveRide {
    params: RideParams,
    started_at: DateTime<Utc>,
    ends_at: DateTime<Utc>,
}

impl ActiveRide {
    fn from_record<E: std::error::Error + 'static>(
        record: &RewardRecord,
    ) -> Result<Self, RideServiceError<E>> {
        match (record.status, record.params, record.started_at, record.ends_at) {
            (RewardStatus::Granted, ..) | (_, None, _, _) | (_, _, None, _) | (_, _, _, None) => {
                Err(RideServiceError::NotOptedIn(record.reward_id.clone()))
            }
            (_, Some(params), Some(started_at), Some(ends_at)) => Ok(Self {
                params,
                started_at,
                ends_at,
            }),
        }
    }

    fn elapsed_fraction(&self, now: DateTime<Utc>) -> f64 {
        calculate_elapsed_fraction(self.started_at, self.ends_at, now)
    }
}

fn ride_length(duration_seconds: f64) -> TimeDelta {
    TimeDelta::try_milliseconds(round_f64_to_i64(duration_seconds * 1000.0)).unwrap_or_else(TimeDelta::zero)
}

fn boost_inputs(ride_value: f64, assessment: &TicketAssessment, has_ride_ended: bool) -> BoostInputs {
    BoostInputs {
        ride_value,
        ticket_strength: assessment.strength,
        qualifying_selections: assessment.qualifying_count,
        combined_odds: assessment.combined_odds,
        has_ride_ended,
    }
}

/// Reward lifecycle service.
pub struct RideService<S>
where
    S: RideStore,
{
    store: S,
}

impl<S> RideService<S>
where
    S: RideStore,
{
    pub const fn new(store: S) -> Self {
        Self { store }
    }

    pub const fn store(&self) -> &S {
        &self.store
    }

    fn load(&self, reward_id: &str) -> ServiceResult<RewardRecord, S> {
        self.store
            .load_reward(reward_id)
            .map_err(RideServiceError::Store)?
            .ok_or_else(|| RideServiceError::UnknownReward(reward_id.to_string()))
    }

    /// Load `reward_id` and require that it was granted under `profile`.
    fn load_for(&self, reward_id: &str, profile: &RewardProfile) -> ServiceResult<RewardRecord, S> {
        let record = self.load(reward_id)?;
        if record.profile_version_id != profile.version_id {
            return self.reject(RideServiceError::ProfileMismatch {
                reward_id: reward_id.to_string(),
                granted: record.profile_version_id,
                supplied: profile.version_id.clone(),
            });
        }
        Ok(record)
    }

    fn reject<T>(&self, error: RideServiceError<S::Error>) -> ServiceResult<T, S> {
        log::warn!("{LOG_REWARD_REJECTED} code={} {error}", error.code());
        Err(error)
    }

    /// Grant a reward: derive its seed and ride duration.
    ///
    /// # Errors
    ///
    /// Returns `DuplicateReward` if the id is taken, or a storage error.
    pub fn grant(
        &self,
        reward_id: &str,
        user_id: &str,
        profile: &RewardProfile,
        now: DateTime<Utc>,
    ) -> ServiceResult<RewardRecord, S> {
        if self
            .store
            .load_reward(reward_id)
            .map_err(RideServiceError::Store)?
            .is_some()
        {
            return self.reject(RideServiceError::DuplicateReward(reward_id.to_string()));
        }
        let seed = generate_seed(reward_id, user_id, &profile.version_id);
        let duration_seconds = derive_ride_duration_seconds(
            &seed,
            profile.ride_duration_min_seconds,
            profile.ride_duration_max_seconds,
        );
        let record = RewardRecord {
            reward_id: reward_id.to_string(),
            user_id: user_id.to_string(),
            profile_version_id: profile.version_id.clone(),
            seed,
            status: RewardStatus::Granted,
            duration_seconds,
            granted_at: now,
            started_at: None,
            ends_at: None,
            ticket_strength: None,
            params: None,
            checkpoints: Vec::new(),
            digest: None,
        };
        self.store
            .save_reward(&record)
            .map_err(RideServiceError::Store)?;
        log::info!("{LOG_REWARD_GRANTED} reward={reward_id} duration={duration_seconds:.3}s");
        Ok(record)
    }

    /// Start the ride: derive parameters, generate and store the checkpoints once.
    ///
    /// # Errors
    ///
    /// Returns `UnknownReward`, `ProfileMismatch`, `AlreadyOptedIn`, or a
    /// storage error.
    pub fn opt_in(
        &self,
        reward_id: &str,
        ticket: &[Selection],
        profile: &RewardProfile,
        now: DateTime<Utc>,
    ) -> ServiceResult<RewardRecord, S> {
        let mut record = self.load_for(reward_id, profile)?;
        if record.status != RewardStatus::Granted {
            return self.reject(RideServiceError::AlreadyOptedIn(reward_id.to_string()));
        }
        let assessment = profile.assess_ticket(ticket);
        let params = derive_ride_params(
            &record.seed,
            record.duration_seconds,
            profile.min_crash_seconds,
        );
        let config = ride_config(&params, profile, assessment.strength, record.duration_seconds);
        let ride = generate_ride(&record.seed, &config);

        record.digest = Some(ride_digest(&record.seed, &params, &ride.checkpoints));
        record.checkpoints = ride.checkpoints;
        record.params = Some(params);
        record.ticket_strength = Some(assessment.strength);
        record.started_at = Some(now);
        record.ends_at = Some(now + ride_length(record.duration_seconds));
        record.status = RewardStatus::Active;
        self.store
            .save_reward(&record)
            .map_err(RideServiceError::Store)?;
        log::info!(
            "{LOG_REWARD_OPTED_IN} reward={reward_id} checkpoints={} strength={:.6}",
            record.checkpoints.len(),
            assessment.strength
        );
        Ok(record)
    }

    /// Quote the boost `ticket` would lock at `now`.
    ///
    /// A crashed or ended ride quotes 0.
    ///
    /// # Errors
    ///
    /// Returns `UnknownReward`, `ProfileMismatch`, `NotOptedIn`, or a storage
    /// error.
    pub fn quote(
        &self,
        reward_id: &str,
        ticket: &[Selection],
        profile: &RewardProfile,
        now: DateTime<Utc>,
    ) -> ServiceResult<Quote, S> {
        let record = self.load_for(reward_id, profile)?;
        let active = ActiveRide::from_record(&record)?;
        let elapsed_fraction = active.elapsed_fraction(now);
        let ended = elapsed_fraction >= 1.0;
        let crashed = is_crashed(elapsed_fraction, active.params.crash_fraction);
        let ride_value = if crashed {
            0.0
        } else {
            interpolate_ride_value(&record.checkpoints, elapsed_fraction)
        };
        let assessment = profile.assess_ticket(ticket);
        let boost = calculate_final_boost_details(
            &boost_inputs(ride_value, &assessment, crashed || ended),
            &profile.boost,
        );
        Ok(Quote {
            reward_id: reward_id.to_string(),
            elapsed_fraction,
            ride_value,
            crashed,
            ended,
            ticket_strength: assessment.strength,
            qualifying_selections: assessment.qualifying_count,
            combined_odds: assessment.combined_odds,
            boost,
        })
    }

    /// Lock the current boost for `bet_id`. Repeated calls return the stored lock.
    ///
    /// # Errors
    ///
    /// Returns `RideEnded`, `RideCrashed`, `InsufficientSelections`,
    /// `CombinedOddsTooLow`, `NotOptedIn`, `UnknownReward`, `ProfileMismatch`,
    /// or a storage error.
    pub fn lock(
        &self,
        reward_id: &str,
        bet_id: &str,
        ticket: &[Selection],
        profile: &RewardProfile,
        now: DateTime<Utc>,
    ) -> ServiceResult<LockRecord, S> {
        if let Some(existing) = self
            .store
            .load_lock(reward_id, bet_id)
            .map_err(RideServiceError::Store)?
        {
            log::debug!("{LOG_REWARD_LOCKED} reward={reward_id} bet={bet_id} replayed");
            return Ok(existing);
        }

        let mut record = self.load_for(reward_id, profile)?;
        let active = ActiveRide::from_record(&record)?;
        let elapsed_fraction = active.elapsed_fraction(now);
        let crash_fraction = active.params.crash_fraction;
        if elapsed_fraction >= 1.0 {
            return self.reject(RideServiceError::RideEnded(reward_id.to_string()));
        }
        if is_crashed(elapsed_fraction, crash_fraction) {
            return self.reject(RideServiceError::RideCrashed {
                reward_id: reward_id.to_string(),
                crash_fraction,
            });
        }

        let assessment = profile.assess_ticket(ticket);
        if !assessment.meets_min_selections {
            return self.reject(RideServiceError::InsufficientSelections {
                required: profile.strength.min_selections,
                actual: assessment.qualifying_count,
            });
        }
        if !assessment.meets_combined_odds {
            return self.reject(RideServiceError::CombinedOddsTooLow {
                required: profile.min_combined_odds.unwrap_or(0.0),
                actual: assessment.combined_odds,
            });
        }

        let ride_value = interpolate_ride_value(&record.checkpoints, elapsed_fraction);
        let boost = calculate_final_boost_details(
            &boost_inputs(ride_value, &assessment, false),
            &profile.boost,
        );
        let path = build_effective_ride_path(&PathRequest {
            checkpoints: &record.checkpoints,
            sample_count: profile.path_sample_count,
            crash_fraction,
            ticket_strength: assessment.strength,
            config: &profile.boost,
            qualifying_selections: assessment.qualifying_count,
            combined_odds: assessment.combined_odds,
        });
        let lock = LockRecord {
            reward_id: reward_id.to_string(),
            bet_id: bet_id.to_string(),
            locked_at: now,
            elapsed_fraction,
            ride_value,
            ticket_strength: assessment.strength,
            qualifying_selections: assessment.qualifying_count,
            combined_odds: assessment.combined_odds,
            boost,
            path,
            settled_bonus: None,
        };
        self.store.save_lock(&lock).map_err(RideServiceError::Store)?;
        if record.status == RewardStatus::Active {
            record.status = RewardStatus::Locked;
            self.store
                .save_reward(&record)
                .map_err(RideServiceError::Store)?;
        }
        log::info!(
            "{LOG_REWARD_LOCKED} reward={reward_id} bet={bet_id} boost={:.6} elapsed={elapsed_fraction:.4}",
            lock.boost.final_boost_pct
        );
        Ok(lock)
    }

    /// Apply the locked boost to `winnings`. Repeated settlement returns the stored amount.
    ///
    /// # Errors
    ///
    /// Returns `NotLocked` or a storage error.
    pub fn settle(&self, reward_id: &str, bet_id: &str, winnings: f64) -> ServiceResult<f64, S> {
        let Some(mut lock) = self
            .store
            .load_lock(reward_id, bet_id)
            .map_err(RideServiceError::Store)?
        else {
            return self.reject(RideServiceError::NotLocked {
                reward_id: reward_id.to_string(),
                bet_id: bet_id.to_string(),
            });
        };
        if let Some(amount) = lock.settled_bonus {
            return Ok(amount);
        }
        let amount = calculate_bonus_amount(winnings, lock.boost.final_boost_pct);
        lock.settled_bonus = Some(amount);
        self.store.save_lock(&lock).map_err(RideServiceError::Store)?;

        let mut record = self.load(reward_id)?;
        record.status = RewardStatus::Settled;
        self.store
            .save_reward(&record)
            .map_err(RideServiceError::Store)?;
        log::info!("{LOG_REWARD_SETTLED} reward={reward_id} bet={bet_id} bonus={amount:.4}");
        Ok(amount)
    }

    /// Replay the ride from its seed and compare it with the stored checkpoints.
    ///
    /// # Errors
    ///
    /// Returns `UnknownReward`, `ProfileMismatch`, `NotOptedIn`, or a storage
    /// error.
    pub fn verify(&self, reward_id: &str, profile: &RewardProfile) -> ServiceResult<bool, S> {
        let record = self.load_for(reward_id, profile)?;
        let (Some(stored_params), Some(strength), Some(digest)) =
            (record.params, record.ticket_strength, record.digest.as_deref())
        else {
            return Err(RideServiceError::NotOptedIn(reward_id.to_string()));
        };
        let params = derive_ride_params(
            &record.seed,
            record.duration_seconds,
            profile.min_crash_seconds,
        );
        let replayed = generate_ride(
            &record.seed,
            &ride_config(&params, profile, strength, record.duration_seconds),
        );
        Ok(params == stored_params
            && replayed.checkpoints == record.checkpoints
            && verify_ride_digest(&record.seed, &params, &replayed.checkpoints, digest))
    }
}

fn ride_config(
    params: &RideParams,
    profile: &RewardProfile,
    ticket_strength: f64,
    duration_seconds: f64,
) -> RideConfig {
    RideConfig::from_params(
        params,
        profile.boost.min_boost_pct,
        profile.boost.max_boost_pct,
        ticket_strength,
        duration_seconds,
        profile.min_peak_delay_seconds,
    )
}

/// In-memory [`RideStore`] for tests and tooling.
#[derive(Debug, Clone, Default)]
pub struct MemoryRideStore {
    rewards: Rc<RefCell<HashMap<String, RewardRecord>>>,
    locks: Rc<RefCell<HashMap<(String, String), LockRecord>>>,
}

impl MemoryRideStore {
    #[must_use]
    pub fn reward_count(&self) -> usize {
        self.rewards.borrow().len()
    }

    #[must_use]
    pub fn lock_count(&self) -> usize {
        self.locks.borrow().len()
    }
}

impl RideStore for MemoryRideStore {
    type Error = Infallible;

    fn load_reward(&self, reward_id: &str) -> Result<Option<RewardRecord>, Self::Error> {
        Ok(self.rewards.borrow().get(reward_id).cloned())
    }

    fn save_reward(&self, record: &RewardRecord) -> Result<(), Self::Error> {
        self.rewards
            .borrow_mut()
            .insert(record.reward_id.clone(), record.clone());
        Ok(())
    }

    fn load_lock(&self, reward_id: &str, bet_id: &str) -> Result<Option<LockRecord>, Self::Error> {
        Ok(self
            .locks
            .borrow()
            .get(&(reward_id.to_string(), bet_id.to_string()))
            .cloned())
    }

    fn save_lock(&self, record: &LockRecord) -> Result<(), Self::Error> {
        self.locks.borrow_mut().insert(
            (record.reward_id.clone(), record.bet_id.clone()),
            record.clone(),
        );
        Ok(())
    }
}
