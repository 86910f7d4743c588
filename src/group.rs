use serde::{Deserialize, Deserializer, Serialize, Serializer, de};
use std::{fmt, str::FromStr};
use thiserror::Error;

/// Number of physical seeds.
pub const SEED_COUNT: u8 = 8;

/// Seeds that also carry rotation demonstrations.
pub const ROTATION_SEEDS: [u8; 2] = [4, 5];

/// A set of training samples that gets its own regressor.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TargetGroup {
    /// Position samples of a single seed.
    Seed(u8),
    /// Rotation samples of a single seed.
    Rotation(u8),
    /// Position samples of every seed.
    AllSeeds,
    /// Rotation samples of every rotation seed.
    AllRotations,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GroupKind {
    Position,
    Rotation,
}

impl GroupKind {
    /// Number of input columns in a sample.
    pub fn input_width(self) -> usize {
        match self {
            GroupKind::Position => 2,
            GroupKind::Rotation => 3,
        }
    }

    /// Number of columns in a sample, inputs followed by outputs.
    pub fn width(self) -> usize {
        self.input_width() * 2
    }
}

impl TargetGroup {
    /// Every group produced by a complete aggregation, in sorted order.
    pub fn all() -> Vec<Self> {
        let mut groups: Vec<Self> = (0..SEED_COUNT).map(TargetGroup::Seed).collect();
        groups.extend(ROTATION_SEEDS.map(TargetGroup::Rotation));
        groups.push(TargetGroup::AllSeeds);
        groups.push(TargetGroup::AllRotations);
        groups
    }

    pub fn kind(&self) -> GroupKind {
        match self {
            TargetGroup::Seed(_) | TargetGroup::AllSeeds => GroupKind::Position,
            TargetGroup::Rotation(_) | TargetGroup::AllRotations => GroupKind::Rotation,
        }
    }

    /// Returns the pooled group this group feeds into.
    pub fn pooled(&self) -> Self {
        match self.kind() {
            GroupKind::Position => TargetGroup::AllSeeds,
            GroupKind::Rotation => TargetGroup::AllRotations,
        }
    }
}

impl fmt::Display for TargetGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TargetGroup::Seed(index) => write!(f, "seed_{index}"),
            TargetGroup::Rotation(index) => write!(f, "rotation_{index}"),
            TargetGroup::AllSeeds => write!(f, "all_seeds"),
            TargetGroup::AllRotations => write!(f, "all_rotations"),
        }
    }
}

#[derive(Debug, Error, PartialEq)]
#[error("unknown target group: {0:?}")]
pub struct ParseGroupError(String);

impl FromStr for TargetGroup {
    type Err = ParseGroupError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ParseGroupError(s.to_string());
        match s {
            "all_seeds" => Ok(TargetGroup::AllSeeds),
            "all_rotations" => Ok(TargetGroup::AllRotations),
            _ => {
                if let Some(index) = s.strip_prefix("seed_") {
                    let index: u8 = index.parse().map_err(|_| err())?;
                    (index < SEED_COUNT)
                        .then_some(TargetGroup::Seed(index))
                        .ok_or_else(err)
                } else if let Some(index) = s.strip_prefix("rotation_") {
                    let index: u8 = index.parse().map_err(|_| err())?;
                    ROTATION_SEEDS
                        .contains(&index)
                        .then_some(TargetGroup::Rotation(index))
                        .ok_or_else(err)
                } else {
                    Err(err())
                }
            }
        }
    }
}

impl Serialize for TargetGroup {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for TargetGroup {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let label = String::deserialize(deserializer)?;
        label.parse().map_err(de::Error::custom)
    }
}
