//! Boss table: static hit-point pools by tier and position.
//!
//! The table is loaded once from YAML and never mutated. A reload builds a
//! whole new table and swaps it in through [`BossTableHandle`]; readers take
//! an `Arc` snapshot and keep using it for the rest of their transaction.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::sync::{Arc, RwLock};

use gauntlet_core::error::DomainError;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Difficulty band derived from the round number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Tier {
    /// Rounds 1–3.
    A,
    /// Rounds 4–10.
    B,
    /// Rounds 11–34.
    C,
    /// Rounds 35 and later.
    D,
}

impl Tier {
    /// Every tier, in round order.
    pub const ALL: [Tier; 4] = [Tier::A, Tier::B, Tier::C, Tier::D];

    /// Maps a round number to its tier. Round 0 has no tier.
    #[must_use]
    pub fn for_round(round: u32) -> Option<Self> {
        match round {
            0 => None,
            1..=3 => Some(Self::A),
            4..=10 => Some(Self::B),
            11..=34 => Some(Self::C),
            _ => Some(Self::D),
        }
    }

    /// The tier's letter.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::A => "A",
            Self::B => "B",
            Self::C => "C",
            Self::D => "D",
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Tier {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "A" => Ok(Self::A),
            "B" => Ok(Self::B),
            "C" => Ok(Self::C),
            "D" => Ok(Self::D),
            other => Err(DomainError::Config(format!("unknown tier {other:?}"))),
        }
    }
}

/// A boss encounter coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BossSlot {
    /// Round number, starting at 1.
    pub round: u32,
    /// Position within the round, starting at 1.
    pub position: u32,
}

impl BossSlot {
    /// The first boss of the first round.
    pub const FIRST: BossSlot = BossSlot {
        round: 1,
        position: 1,
    };
}

impl fmt::Display for BossSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "round {} boss {}", self.round, self.position)
    }
}

#[derive(Debug, Deserialize)]
struct RegionConfig {
    boss_hp: BTreeMap<String, Vec<u64>>,
}

/// Hit-point pools keyed by tier, each an ordered list of the bosses of one
/// round.
///
/// Every table carries a revision: a SHA-256 digest of its pools. Battle
/// states and runs record the revision they were computed against, so a
/// state built from another table is detected and rebuilt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BossTable {
    pools: HashMap<Tier, Vec<u64>>,
    revision: String,
}

impl BossTable {
    /// Builds a table from per-tier pools.
    ///
    /// Tiers may be omitted; looking one up later fails with a config error.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Config` if the table is empty, a listed tier has
    /// no bosses, or any pool is zero.
    pub fn new(pools: HashMap<Tier, Vec<u64>>) -> Result<Self, DomainError> {
        if pools.is_empty() {
            return Err(DomainError::Config("boss table has no tiers".into()));
        }
        for (tier, bosses) in &pools {
            if bosses.is_empty() {
                return Err(DomainError::Config(format!("tier {tier} has no bosses")));
            }
            if bosses.contains(&0) {
                return Err(DomainError::Config(format!(
                    "tier {tier} has a boss with zero hit points"
                )));
            }
        }
        let revision = revision_of(&pools);
        Ok(Self { pools, revision })
    }

    /// Hex digest identifying this table's pools. Equal pools give equal
    /// revisions regardless of where the table was loaded from.
    #[must_use]
    pub fn revision(&self) -> &str {
        &self.revision
    }

    /// Parses the `region` section of a boss data YAML document.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Config` if the YAML is malformed, the region is
    /// missing, or the table fails validation.
    pub fn from_yaml_str(yaml: &str, region: &str) -> Result<Self, DomainError> {
        let mut regions: HashMap<String, RegionConfig> = serde_yaml::from_str(yaml)
            .map_err(|e| DomainError::Config(format!("malformed boss data: {e}")))?;
        let config = regions
            .remove(region)
            .ok_or_else(|| DomainError::Config(format!("region {region:?} not found in boss data")))?;

        let pools = config
            .boss_hp
            .into_iter()
            .map(|(tier, bosses)| Ok((tier.parse::<Tier>()?, bosses)))
            .collect::<Result<HashMap<_, _>, DomainError>>()?;
        Self::new(pools)
    }

    /// Reads and parses a boss data file.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Config` if the file cannot be read or parsed.
    pub fn load(path: &Path, region: &str) -> Result<Self, DomainError> {
        let yaml = std::fs::read_to_string(path).map_err(|e| {
            DomainError::Config(format!("cannot read boss data {}: {e}", path.display()))
        })?;
        Self::from_yaml_str(&yaml, region)
    }

    /// The tier of `round`.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` for round 0.
    pub fn tier_for(&self, round: u32) -> Result<Tier, DomainError> {
        Tier::for_round(round).ok_or_else(|| DomainError::Validation("rounds start at 1".into()))
    }

    /// Hit-point pool of the boss at `position` (1-based) in `round`.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Config` if the tier is missing from the table or
    /// has no boss at `position`.
    pub fn pool_for(&self, tier: Tier, round: u32, position: u32) -> Result<u64, DomainError> {
        let bosses = self.bosses(tier)?;
        position
            .checked_sub(1)
            .and_then(|index| usize::try_from(index).ok())
            .and_then(|index| bosses.get(index))
            .copied()
            .ok_or_else(|| {
                DomainError::Config(format!(
                    "tier {tier} has no boss {position} for round {round}"
                ))
            })
    }

    /// Full pool of the boss at `slot`.
    ///
    /// # Errors
    ///
    /// Propagates [`BossTable::tier_for`] and [`BossTable::pool_for`] errors.
    pub fn full_pool(&self, slot: BossSlot) -> Result<u64, DomainError> {
        let tier = self.tier_for(slot.round)?;
        self.pool_for(tier, slot.round, slot.position)
    }

    /// Number of bosses in `round`.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Config` if the round's tier is missing.
    pub fn bosses_in_round(&self, round: u32) -> Result<u32, DomainError> {
        let tier = self.tier_for(round)?;
        let count = self.bosses(tier)?.len();
        u32::try_from(count)
            .map_err(|_| DomainError::Config(format!("tier {tier} has too many bosses")))
    }

    /// The slot after `slot`: the next position in the same round, or the
    /// first position of the next round once the round is exhausted.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Config` if the round's tier is missing.
    pub fn next_slot(&self, slot: BossSlot) -> Result<BossSlot, DomainError> {
        if slot.position < self.bosses_in_round(slot.round)? {
            Ok(BossSlot {
                round: slot.round,
                position: slot.position + 1,
            })
        } else {
            Ok(BossSlot {
                round: slot.round + 1,
                position: 1,
            })
        }
    }

    fn bosses(&self, tier: Tier) -> Result<&[u64], DomainError> {
        self.pools
            .get(&tier)
            .map(Vec::as_slice)
            .ok_or_else(|| DomainError::Config(format!("boss table has no entry for tier {tier}")))
    }
}

fn revision_of(pools: &HashMap<Tier, Vec<u64>>) -> String {
    let mut hasher = Sha256::new();
    for tier in Tier::ALL {
        let Some(bosses) = pools.get(&tier) else {
            continue;
        };
        hasher.update(tier.as_str().as_bytes());
        hasher.update((bosses.len() as u64).to_le_bytes());
        for pool in bosses {
            hasher.update(pool.to_le_bytes());
        }
    }
    format!("{:x}", hasher.finalize())
}

/// Shared, atomically swappable reference to the current boss table.
#[derive(Debug, Clone)]
pub struct BossTableHandle {
    current: Arc<RwLock<Arc<BossTable>>>,
}

impl BossTableHandle {
    /// Wraps an initial table.
    #[must_use]
    pub fn new(table: BossTable) -> Self {
        Self {
            current: Arc::new(RwLock::new(Arc::new(table))),
        }
    }

    /// Snapshot of the current table. Later swaps do not affect it.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Infrastructure` if the lock is poisoned.
    pub fn current(&self) -> Result<Arc<BossTable>, DomainError> {
        self.current
            .read()
            .map(|table| Arc::clone(&table))
            .map_err(|_| DomainError::Infrastructure("boss table lock poisoned".into()))
    }

    /// Replaces the whole table.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Infrastructure` if the lock is poisoned.
    pub fn swap(&self, table: BossTable) -> Result<(), DomainError> {
        let mut current = self
            .current
            .write()
            .map_err(|_| DomainError::Infrastructure("boss table lock poisoned".into()))?;
        *current = Arc::new(table);
        Ok(())
    }
}
