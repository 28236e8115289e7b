//! Keyed digests over persisted rides.
//!
//! The digest is an HMAC-SHA256 keyed by the reward seed over one canonical
//! line per ride parameter set and checkpoint. Stored alongside the
//! checkpoints at opt-in, it lets an auditor replay the ride from the seed and
//! confirm the stored curve was never altered.
use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::fmt::Write as _;

use crate::ride::Checkpoint;
use crate::seed::RideParams;

fn canonical_lines(params: &RideParams, checkpoints: &[Checkpoint]) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "params,{},{:.4},{:.4}",
        params.checkpoint_count, params.volatility, params.crash_fraction
    );
    for checkpoint in checkpoints {
        let _ = writeln!(
            out,
            "{},{:.6},{:.6}",
            checkpoint.index, checkpoint.time_fraction, checkpoint.boost_value
        );
    }
    out
}

/// Lowercase hex HMAC-SHA256 of the ride, keyed by `seed`.
#[must_use]
pub fn ride_digest(seed: &str, params: &RideParams, checkpoints: &[Checkpoint]) -> String {
    let mut mac =
        Hmac::<Sha256>::new_from_slice(seed.as_bytes()).expect("HMAC accepts any key length");
    mac.update(canonical_lines(params, checkpoints).as_bytes());
    let digest = mac.finalize().into_bytes();
    let mut hex = String::with_capacity(digest.len() * 2);
    for byte in digest {
        let _ = write!(hex, "{byte:02x}");
    }
    hex
}

/// Whether `expected` matches the digest of the given ride.
#[must_use]
pub fn verify_ride_digest(
    seed: &str,
    params: &RideParams,
    checkpoints: &[Checkpoint],
    expected: &str,
) -> bool {
    ride_digest(seed, params, checkpoints).eq_ignore_ascii_case(expected)
}
