use anyhow::{Result, bail};
use boostride_engine::{generate_seed, is_seed};
use regex::Regex;
use serde::Serialize;
use std::collections::HashSet;
use std::sync::LazyLock;

/// User id paired with numeric reward ids when no triple is given.
pub const SWEEP_USER_ID: &str = "tester";

static TRIPLE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([^:\s]+):([^:\s]+):([^:\s]+)$").expect("triple pattern compiles")
});

/// How a seed token was interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SeedSource {
    Literal,
    Triple,
    RewardId,
}

/// Canonical seed plus the token it came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SeedInfo {
    pub seed: String,
    pub label: String,
    pub source: SeedSource,
}

impl SeedInfo {
    #[must_use]
    pub fn from_literal(seed: &str) -> Self {
        let seed = seed.to_ascii_lowercase();
        Self {
            label: short_label(&seed),
            seed,
            source: SeedSource::Literal,
        }
    }

    #[must_use]
    pub fn from_triple(reward_id: &str, user_id: &str, version_id: &str) -> Self {
        Self {
            seed: generate_seed(reward_id, user_id, version_id),
            label: format!("{reward_id}:{user_id}:{version_id}"),
            source: SeedSource::Triple,
        }
    }

    #[must_use]
    pub fn from_reward_id(reward_id: &str, version_id: &str) -> Self {
        Self {
            seed: generate_seed(reward_id, SWEEP_USER_ID, version_id),
            label: format!("reward {reward_id}"),
            source: SeedSource::RewardId,
        }
    }
}

fn short_label(seed: &str) -> String {
    seed.get(..12).map_or_else(|| seed.to_string(), |head| format!("{head}…"))
}

/// Resolve CLI seed tokens into canonical seeds.
///
/// Accepts literal 64-hex seeds, `reward:user:version` triples, and integers
/// that stand in for reward ids under `version_id`. Duplicates collapse to
/// their first occurrence; an empty list falls back to reward id `1337`.
pub fn resolve_seed_inputs(tokens: &[String], version_id: &str) -> Result<Vec<SeedInfo>> {
    let mut resolved: Vec<SeedInfo> = Vec::new();
    let mut seen: HashSet<String> = HashSet::new();

    for token in tokens {
        if token.is_empty() {
            continue;
        }

        let info = if is_seed(&token.to_ascii_lowercase()) {
            SeedInfo::from_literal(token)
        } else if let Some(caps) = TRIPLE.captures(token) {
            SeedInfo::from_triple(&caps[1], &caps[2], &caps[3])
        } else if token.parse::<u64>().is_ok() {
            SeedInfo::from_reward_id(token, version_id)
        } else {
            bail!("Unrecognized seed token: {token}");
        };

        if seen.insert(info.seed.clone()) {
            resolved.push(info);
        }
    }

    if resolved.is_empty() {
        resolved.push(SeedInfo::from_reward_id("1337", version_id));
    }

    Ok(resolved)
}
