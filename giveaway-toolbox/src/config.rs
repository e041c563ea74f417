use crate::participants::EngagementWeights;
use fair_draw_lib::tickets::DEFAULT_POOL_SIZE;
use fair_draw_lib::{AllocationPolicy, HashAlgorithm, RemainderPolicy, Tickets};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

#[derive(Deserialize, Serialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum PolicyKind {
    FixedPool,
    Engagement,
}

/// Settings of a giveaway draw. Every field has a default, so a config file
/// only needs the values it changes.
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq, Eq)]
#[serde(default)]
pub struct DrawConfig {
    pub policy: PolicyKind,
    pub pool_size: Tickets,
    pub remainder: RemainderPolicy,
    pub algorithm: HashAlgorithm,
    pub engagement_weights: EngagementWeights,
}

impl Default for DrawConfig {
    fn default() -> Self {
        Self {
            policy: PolicyKind::FixedPool,
            pool_size: DEFAULT_POOL_SIZE,
            remainder: RemainderPolicy::default(),
            algorithm: HashAlgorithm::default(),
            engagement_weights: EngagementWeights::default(),
        }
    }
}

impl DrawConfig {
    pub fn load(path: &Path) -> Result<Self, Error> {
        let config = serde_json::from_reader(BufReader::new(File::open(path)?))?;
        tracing::debug!(path = %path.display(), ?config, "loaded draw config");
        Ok(config)
    }

    pub fn load_or_default(path: Option<&Path>) -> Result<Self, Error> {
        path.map_or_else(|| Ok(Self::default()), Self::load)
    }

    pub fn allocation_policy(&self) -> AllocationPolicy {
        match self.policy {
            PolicyKind::FixedPool => AllocationPolicy::FixedPool {
                pool_size: self.pool_size,
                remainder: self.remainder,
            },
            PolicyKind::Engagement => AllocationPolicy::Engagement,
        }
    }
}
