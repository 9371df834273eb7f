use crate::error::ConfigError;
use crate::mobility::{MobilityConfig, RandomDisc};
use crate::neighbor::DEFAULT_RADIUS;
use crate::task::TaskProfile;
use crate::time::SimTime;
use serde::{Deserialize, Serialize};
use std::ops::RangeInclusive;
use std::path::Path;

/// Which agents a publisher may recruit from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PoolScope {
    /// Every other agent, publishers included.
    All,
    /// Layer 1 agents only.
    Workers,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    pub name: String,
    pub seed: u64,
    pub horizon: SimTime,
    pub num_workers: u32,
    pub num_publishers: u32,
    pub capacity_threads: RangeInclusive<u32>,
    pub capacity_ram: RangeInclusive<u32>,
    pub tasks: TaskProfile,
    pub radius: f64,
    pub pool: PoolScope,
    pub first_publish: SimTime,
    pub publish_interval: SimTime,
    /// Mean of the exponential jitter added to every re-arm, in seconds.
    /// Zero disables jitter.
    pub jitter_mean_s: f64,
    pub position_log_interval: Option<SimTime>,
    pub snapshot_interval: SimTime,
    pub mobility: MobilityConfig,
    pub placement: RandomDisc,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            name: "default_sim".to_string(),
            seed: 1,
            horizon: SimTime::from_secs(100),
            num_workers: 4,
            num_publishers: 2,
            capacity_threads: 1..=16,
            capacity_ram: 4..=16,
            tasks: TaskProfile::default(),
            radius: DEFAULT_RADIUS,
            pool: PoolScope::All,
            first_publish: SimTime::from_secs(1),
            publish_interval: SimTime::from_secs(1),
            jitter_mean_s: 1.0,
            position_log_interval: Some(SimTime::from_secs(1)),
            snapshot_interval: SimTime::from_secs(1),
            mobility: MobilityConfig::default(),
            placement: RandomDisc::default(),
        }
    }
}

fn check_range(name: &'static str, range: &RangeInclusive<u32>, min_start: u32) -> Result<(), ConfigError> {
    if range.start() > range.end() {
        return Err(ConfigError::InvalidRange {
            name,
            min: *range.start() as f64,
            max: *range.end() as f64,
        });
    }
    if *range.start() < min_start {
        return Err(ConfigError::NonPositive {
            name,
            value: *range.start() as f64,
        });
    }
    Ok(())
}

impl SimConfig {
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| ConfigError::Parse(e.to_string()))?;
        Self::from_json(&content)
    }

    pub fn from_json(content: &str) -> Result<Self, ConfigError> {
        let config: SimConfig = serde_json::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.num_publishers == 0 {
            return Err(ConfigError::NoPublishers);
        }
        check_range("capacity_threads", &self.capacity_threads, 1)?;
        check_range("capacity_ram", &self.capacity_ram, 1)?;
        check_range("tasks.count", &self.tasks.count, 0)?;
        check_range("tasks.threads", &self.tasks.threads, 1)?;
        check_range("tasks.ram", &self.tasks.ram, 1)?;
        check_range("tasks.duration_s", &self.tasks.duration_s, 1)?;
        if !(self.radius >= 0.0) || !self.radius.is_finite() {
            return Err(ConfigError::NonPositive { name: "radius", value: self.radius });
        }
        if self.publish_interval.is_zero() {
            return Err(ConfigError::NonPositive { name: "publish_interval", value: 0.0 });
        }
        if self.snapshot_interval.is_zero() {
            return Err(ConfigError::NonPositive { name: "snapshot_interval", value: 0.0 });
        }
        if matches!(self.position_log_interval, Some(t) if t.is_zero()) {
            return Err(ConfigError::NonPositive { name: "position_log_interval", value: 0.0 });
        }
        if !(self.jitter_mean_s >= 0.0) || !self.jitter_mean_s.is_finite() {
            return Err(ConfigError::NonPositive { name: "jitter_mean_s", value: self.jitter_mean_s });
        }
        self.mobility.validate()?;
        self.placement.validate(&self.mobility.bounds)?;
        Ok(())
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_horizon(mut self, horizon: SimTime) -> Self {
        self.horizon = horizon;
        self
    }

    pub fn with_agents(mut self, workers: u32, publishers: u32) -> Self {
        self.num_workers = workers;
        self.num_publishers = publishers;
        self
    }

    pub fn with_radius(mut self, radius: f64) -> Self {
        self.radius = radius;
        self
    }

    pub fn with_pool(mut self, pool: PoolScope) -> Self {
        self.pool = pool;
        self
    }

    pub fn with_mobility(mut self, mobility: MobilityConfig) -> Self {
        self.mobility = mobility;
        self
    }

    pub fn without_jitter(mut self) -> Self {
        self.jitter_mean_s = 0.0;
        self
    }
}
