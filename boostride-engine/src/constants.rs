//! Centralized tuning constants for ride generation and the boost model.
//!
//! These values define the deterministic math behind every ride. Keeping
//! them together means the shape of a ride can only change through reviewed
//! code changes, never through runtime configuration, which keeps stored
//! checkpoints reproducible from their seed.

// Stream labels -------------------------------------------------------------
pub(crate) const STREAM_DURATION: &str = "duration";
pub(crate) const STREAM_CRASH: &str = "crash";
pub(crate) const STREAM_PARAMS: &str = "params";
pub(crate) const STREAM_SHAPE: &str = "shape";
pub(crate) const STREAM_START_BIAS: &str = "start-bias";
pub(crate) const STREAM_PEAK_DELAY: &str = "peak-delay";
pub(crate) const STREAM_NOISE: &str = "noise";

// Parameter derivation ------------------------------------------------------
pub(crate) const CHECKPOINT_COUNT_MIN: usize = 6;
pub(crate) const CHECKPOINT_SAMPLE_MIN: f64 = 8.0;
pub(crate) const CHECKPOINT_SAMPLE_MAX: f64 = 18.0;
pub(crate) const VOLATILITY_MIN: f64 = 0.25;
pub(crate) const VOLATILITY_MAX: f64 = 0.85;
pub(crate) const CRASH_BETA_ALPHA: f64 = 10.0;
pub(crate) const CRASH_BETA_BETA: f64 = 5.0;
pub(crate) const CRASH_FRACTION_MIN: f64 = 0.01;
pub(crate) const CRASH_FRACTION_MAX: f64 = 0.99;
pub(crate) const DURATION_DECIMALS: u32 = 3;
pub(crate) const FRACTION_DECIMALS: u32 = 4;
pub(crate) const VALUE_DECIMALS: u32 = 6;
pub(crate) const VALUE_STEP: f64 = 1e-6;

// Ride shape ----------------------------------------------------------------
pub(crate) const START_FLOOR_BASE: f64 = 0.01;
pub(crate) const START_FLOOR_STRENGTH_SPAN: f64 = 0.14;
pub(crate) const MAX_PEAKS: usize = 4;
pub(crate) const PEAK_COUNT_VOLATILITY_SPAN: f64 = 3.0;
pub(crate) const NODE_JITTER: f64 = 0.35;
pub(crate) const NODE_MIN_SPACING: f64 = 0.4;
pub(crate) const HIGHEST_PEAK_MIN: f64 = 0.86;
pub(crate) const HIGHEST_PEAK_MAX: f64 = 0.98;
pub(crate) const OTHER_PEAK_MIN: f64 = 0.50;
pub(crate) const OTHER_PEAK_MAX: f64 = 0.84;
pub(crate) const VALLEY_MIN: f64 = 0.18;
pub(crate) const VALLEY_MAX: f64 = 0.44;
pub(crate) const VALLEY_VOLATILITY_BASE: f64 = 0.4;
pub(crate) const VALLEY_VOLATILITY_SPAN: f64 = 0.6;
pub(crate) const FINAL_VALLEY_BIAS: f64 = 0.6;
pub(crate) const TURNING_MIN_DELTA: f64 = 0.06;
pub(crate) const NOISE_STD_FACTOR: f64 = 0.015;

// Enforcement passes --------------------------------------------------------
pub(crate) const START_BIAS_PROBABILITY: f64 = 0.7;
pub(crate) const INITIAL_CLIMB_SECONDS: f64 = 2.0;
pub(crate) const INITIAL_CLIMB_STEP: f64 = 0.02;
pub(crate) const PROMOTION_DELTA_MIN: f64 = 0.02;
pub(crate) const PROMOTION_DELTA_MAX: f64 = 0.06;
pub(crate) const UNIQUE_MAX_TOLERANCE: f64 = 1e-6;
pub(crate) const UNIQUE_MAX_EPSILON: f64 = 1e-5;
pub(crate) const FLAT_THRESHOLD: f64 = 1e-4;
pub(crate) const FLAT_NUDGE_FACTOR: f64 = 0.01;
pub(crate) const FLAT_NUDGE_MIN: f64 = 2e-4;

// Ticket strength -----------------------------------------------------------
pub(crate) const STRENGTH_BASE_ODDS: f64 = 3.0;
pub(crate) const STRENGTH_EXPONENT: f64 = 1.5;
pub(crate) const STRENGTH_MAX_SELECTION_BONUS: u32 = 10;
pub(crate) const STRENGTH_ODDS_SCALE: f64 = 100.0;
pub(crate) const STRENGTH_ODDS_FLOOR: f64 = 0.1;

// Boost model ---------------------------------------------------------------
pub(crate) const ELIGIBILITY_EXPONENT: f64 = 1.2;
pub(crate) const ELIGIBILITY_SELECTION_WEIGHT: f64 = 0.75;
pub(crate) const ELIGIBILITY_ODDS_WEIGHT: f64 = 0.25;
pub(crate) const EFFECTIVE_MIN_LIFT: f64 = 0.35;
pub(crate) const VOLATILITY_MULTIPLIER_BASE: f64 = 0.5;
pub(crate) const VOLATILITY_MULTIPLIER_SPAN: f64 = 0.8;
pub(crate) const STRENGTH_MULTIPLIER_BASE: f64 = 0.4;
pub(crate) const STRENGTH_MULTIPLIER_SPAN: f64 = 0.6;
pub(crate) const BONUS_DECIMALS: u32 = 4;

// Effective path ------------------------------------------------------------
pub(crate) const PATH_HEADROOM_BAND: f64 = 0.35;
pub(crate) const PATH_SAMPLE_MIN: usize = 2;

// Logging keys --------------------------------------------------------------
pub(crate) const LOG_RIDE_GENERATED: &str = "ride.generated";
pub(crate) const LOG_RIDE_PASS: &str = "ride.pass";
pub(crate) const LOG_REWARD_GRANTED: &str = "reward.granted";
pub(crate) const LOG_REWARD_OPTED_IN: &str = "reward.opted-in";
pub(crate) const LOG_REWARD_LOCKED: &str = "reward.locked";
pub(crate) const LOG_REWARD_SETTLED: &str = "reward.settled";
pub(crate) const LOG_REWARD_REJECTED: &str = "reward.rejected";
