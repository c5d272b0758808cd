use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

/// Fatal configuration problem. Every threshold in the test is scientifically
/// significant, so a missing or out-of-range field aborts before any round is
/// shown; nothing is ever defaulted silently.
#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(serde_json::Error),
    Invalid {
        field: &'static str,
        reason: &'static str,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "config io error: {e}"),
            ConfigError::Parse(e) => write!(f, "config parse error: {e}"),
            ConfigError::Invalid { field, reason } => {
                write!(f, "invalid config field `{field}`: {reason}")
            }
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<std::io::Error> for ConfigError {
    fn from(e: std::io::Error) -> Self {
        ConfigError::Io(e)
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(e: serde_json::Error) -> Self {
        ConfigError::Parse(e)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TrainingConfig {
    /// Rounds shown before scoring starts.
    pub number_of_rounds: u32,
    pub no_response_timeout_ms: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PracticeConfig {
    /// Streak of trailing correct answers needed to leave practice.
    pub required_correct_streak: u32,
    /// The streak's mean response time must come in under this.
    pub max_mean_response_time_ms: f64,
    /// Practice rounds allowed before the test is abandoned.
    pub max_rounds: u32,
    pub no_response_timeout_ms: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SelfPacedConfig {
    /// Wrong answers tolerated during startup.
    pub max_wrong_count: u32,
    /// Correct answers slower than `slow_response_ms` tolerated.
    pub slow_correct_limit: u32,
    pub slow_response_ms: f64,
    /// Streak of trailing correct answers that seeds machine pacing.
    pub required_correct_streak: u32,
    /// Cap on the seeded machine-paced timeout.
    pub max_start_duration_ms: f64,
    /// Subtracted from the seed so the first paced round already pushes.
    pub initial_speedup_ms: f64,
    pub no_response_timeout_ms: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SpeedupConfig {
    /// Full-scale speed-up for an instantaneous correct answer; the actual
    /// delta scales with how much headroom the response left.
    pub weight_ms: f64,
    /// Largest single-round reduction of the timeout.
    pub max_speedup_ms: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SlowdownConfig {
    /// Fixed penalty added to the timeout on a wrong or missed answer.
    pub base_duration_ms: f64,
    /// Largest single-round increase of the timeout.
    pub max_slowdown_ms: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BlockingConfig {
    /// Consecutive no-responses that count as a block.
    pub no_input_count: u32,
    /// Added to the timeout when a block is recorded.
    pub slow_down_ms: f64,
    /// Two consecutive blocking durations closer than this end the search.
    pub duration_delta_ms: f64,
    /// Blocks tolerated before the test fails.
    pub max_block_count: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RollingAverageConfig {
    /// Window size of the rolling correct ratio.
    pub mean_size: u32,
    /// Ratio below this drops the subject back to self-paced rounds.
    pub threshold: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MachinePacedConfig {
    pub speedup: SpeedupConfig,
    pub slowdown: SlowdownConfig,
    pub blocking: BlockingConfig,
    pub rolling_average: RollingAverageConfig,
    /// A press this soon after a no-response timeout is credited to the
    /// previous round's stimulus.
    pub minimum_response_time_ms: f64,
}

/// Shared shape of the two cooldown round types (post-block and
/// self-paced-restart).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CooldownConfig {
    /// Trailing correct answers needed to resume machine pacing.
    pub min_correct_answers: u32,
    /// Wrong answers within the cooldown that fail the test.
    pub max_wrong_answers: u32,
    pub no_response_timeout_ms: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EndmodeConfig {
    /// Final-round answers collected before the test succeeds.
    pub number_of_rounds: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TimeoutConfig {
    /// Hard ceiling on the whole test, armed once at start.
    pub max_test_duration_ms: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CpiConfig {
    /// Blocking round duration mapped to `cpi_max`.
    pub brd_min_ms: f64,
    /// Blocking round duration mapped to `cpi_min`.
    pub brd_max_ms: f64,
    pub cpi_min: f64,
    pub cpi_max: f64,
}

/// The full parameter tree, one group per round type. Deserialization rejects
/// unknown keys and missing fields; `validate` rejects out-of-range values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CogSpeedConfig {
    pub training: TrainingConfig,
    pub practice: PracticeConfig,
    pub self_paced: SelfPacedConfig,
    pub machine_paced: MachinePacedConfig,
    pub post_block: CooldownConfig,
    pub restart: CooldownConfig,
    pub endmode: EndmodeConfig,
    pub timeouts: TimeoutConfig,
    pub cpi: CpiConfig,
    /// Seed for the stimulus RNG; `None` draws from entropy.
    #[serde(default)]
    pub rng_seed: Option<u64>,
}

impl CogSpeedConfig {
    /// The standard parameter profile used by the simulator and as a starting
    /// point for custom configs.
    pub fn builtin() -> Self {
        Self {
            training: TrainingConfig {
                number_of_rounds: 3,
                no_response_timeout_ms: 6000.0,
            },
            practice: PracticeConfig {
                required_correct_streak: 4,
                max_mean_response_time_ms: 2000.0,
                max_rounds: 20,
                no_response_timeout_ms: 6000.0,
            },
            self_paced: SelfPacedConfig {
                max_wrong_count: 4,
                slow_correct_limit: 12,
                slow_response_ms: 3000.0,
                required_correct_streak: 4,
                max_start_duration_ms: 2200.0,
                initial_speedup_ms: 100.0,
                no_response_timeout_ms: 4000.0,
            },
            machine_paced: MachinePacedConfig {
                speedup: SpeedupConfig {
                    weight_ms: 200.0,
                    max_speedup_ms: 150.0,
                },
                slowdown: SlowdownConfig {
                    base_duration_ms: 100.0,
                    max_slowdown_ms: 300.0,
                },
                blocking: BlockingConfig {
                    no_input_count: 3,
                    slow_down_ms: 275.0,
                    duration_delta_ms: 60.0,
                    max_block_count: 3,
                },
                rolling_average: RollingAverageConfig {
                    mean_size: 10,
                    threshold: 0.7,
                },
                minimum_response_time_ms: 500.0,
            },
            post_block: CooldownConfig {
                min_correct_answers: 2,
                max_wrong_answers: 2,
                no_response_timeout_ms: 4000.0,
            },
            restart: CooldownConfig {
                min_correct_answers: 2,
                max_wrong_answers: 2,
                no_response_timeout_ms: 4000.0,
            },
            endmode: EndmodeConfig {
                number_of_rounds: 5,
            },
            timeouts: TimeoutConfig {
                max_test_duration_ms: 300_000.0,
            },
            cpi: CpiConfig {
                brd_min_ms: 180.0,
                brd_max_ms: 1800.0,
                cpi_min: 0.0,
                cpi_max: 100.0,
            },
            rng_seed: None,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        fn positive(field: &'static str, v: f64) -> Result<(), ConfigError> {
            if v > 0.0 && v.is_finite() {
                Ok(())
            } else {
                Err(ConfigError::Invalid {
                    field,
                    reason: "must be a positive finite number",
                })
            }
        }
        fn nonzero(field: &'static str, v: u32) -> Result<(), ConfigError> {
            if v > 0 {
                Ok(())
            } else {
                Err(ConfigError::Invalid {
                    field,
                    reason: "must be greater than zero",
                })
            }
        }

        nonzero("training.number_of_rounds", self.training.number_of_rounds)?;
        positive(
            "training.no_response_timeout_ms",
            self.training.no_response_timeout_ms,
        )?;

        nonzero(
            "practice.required_correct_streak",
            self.practice.required_correct_streak,
        )?;
        positive(
            "practice.max_mean_response_time_ms",
            self.practice.max_mean_response_time_ms,
        )?;
        nonzero("practice.max_rounds", self.practice.max_rounds)?;
        positive(
            "practice.no_response_timeout_ms",
            self.practice.no_response_timeout_ms,
        )?;

        nonzero("self_paced.max_wrong_count", self.self_paced.max_wrong_count)?;
        nonzero(
            "self_paced.slow_correct_limit",
            self.self_paced.slow_correct_limit,
        )?;
        positive(
            "self_paced.slow_response_ms",
            self.self_paced.slow_response_ms,
        )?;
        nonzero(
            "self_paced.required_correct_streak",
            self.self_paced.required_correct_streak,
        )?;
        positive(
            "self_paced.max_start_duration_ms",
            self.self_paced.max_start_duration_ms,
        )?;
        if !(self.self_paced.initial_speedup_ms >= 0.0
            && self.self_paced.initial_speedup_ms < self.self_paced.max_start_duration_ms)
        {
            return Err(ConfigError::Invalid {
                field: "self_paced.initial_speedup_ms",
                reason: "must be non-negative and below max_start_duration_ms",
            });
        }
        positive(
            "self_paced.no_response_timeout_ms",
            self.self_paced.no_response_timeout_ms,
        )?;

        let mp = &self.machine_paced;
        positive("machine_paced.speedup.weight_ms", mp.speedup.weight_ms)?;
        positive(
            "machine_paced.speedup.max_speedup_ms",
            mp.speedup.max_speedup_ms,
        )?;
        if mp.slowdown.base_duration_ms < 0.0 || !mp.slowdown.base_duration_ms.is_finite() {
            return Err(ConfigError::Invalid {
                field: "machine_paced.slowdown.base_duration_ms",
                reason: "must be a non-negative finite number",
            });
        }
        positive(
            "machine_paced.slowdown.max_slowdown_ms",
            mp.slowdown.max_slowdown_ms,
        )?;
        nonzero(
            "machine_paced.blocking.no_input_count",
            mp.blocking.no_input_count,
        )?;
        positive(
            "machine_paced.blocking.slow_down_ms",
            mp.blocking.slow_down_ms,
        )?;
        positive(
            "machine_paced.blocking.duration_delta_ms",
            mp.blocking.duration_delta_ms,
        )?;
        nonzero(
            "machine_paced.blocking.max_block_count",
            mp.blocking.max_block_count,
        )?;
        nonzero(
            "machine_paced.rolling_average.mean_size",
            mp.rolling_average.mean_size,
        )?;
        if !(0.0..=1.0).contains(&mp.rolling_average.threshold) {
            return Err(ConfigError::Invalid {
                field: "machine_paced.rolling_average.threshold",
                reason: "must be within [0, 1]",
            });
        }
        positive(
            "machine_paced.minimum_response_time_ms",
            mp.minimum_response_time_ms,
        )?;

        nonzero(
            "post_block.min_correct_answers",
            self.post_block.min_correct_answers,
        )?;
        nonzero(
            "post_block.max_wrong_answers",
            self.post_block.max_wrong_answers,
        )?;
        positive(
            "post_block.no_response_timeout_ms",
            self.post_block.no_response_timeout_ms,
        )?;
        nonzero(
            "restart.min_correct_answers",
            self.restart.min_correct_answers,
        )?;
        nonzero("restart.max_wrong_answers", self.restart.max_wrong_answers)?;
        positive(
            "restart.no_response_timeout_ms",
            self.restart.no_response_timeout_ms,
        )?;

        nonzero("endmode.number_of_rounds", self.endmode.number_of_rounds)?;
        positive(
            "timeouts.max_test_duration_ms",
            self.timeouts.max_test_duration_ms,
        )?;

        if self.cpi.brd_min_ms == self.cpi.brd_max_ms {
            return Err(ConfigError::Invalid {
                field: "cpi.brd_min_ms",
                reason: "brd_min_ms and brd_max_ms must differ",
            });
        }
        if self.cpi.cpi_min >= self.cpi.cpi_max {
            return Err(ConfigError::Invalid {
                field: "cpi.cpi_min",
                reason: "cpi_min must be below cpi_max",
            });
        }

        Ok(())
    }
}

pub trait ConfigStore {
    fn load(&self) -> Result<CogSpeedConfig, ConfigError>;
    fn save(&self, cfg: &CogSpeedConfig) -> Result<(), ConfigError>;
}

#[derive(Debug, Clone)]
pub struct FileConfigStore {
    path: PathBuf,
}

impl FileConfigStore {
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        let path = if let Some(pd) = ProjectDirs::from("", "", "cogspeed") {
            pd.config_dir().join("config.json")
        } else {
            PathBuf::from("cogspeed_config.json")
        };
        Self { path }
    }

    pub fn with_path<P: AsRef<Path>>(p: P) -> Self {
        Self {
            path: p.as_ref().to_path_buf(),
        }
    }
}

impl Default for FileConfigStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigStore for FileConfigStore {
    fn load(&self) -> Result<CogSpeedConfig, ConfigError> {
        let bytes = fs::read(&self.path)?;
        let cfg: CogSpeedConfig = serde_json::from_slice(&bytes)?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn save(&self, cfg: &CogSpeedConfig) -> Result<(), ConfigError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let data = serde_json::to_vec_pretty(cfg)?;
        fs::write(&self.path, data)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use tempfile::tempdir;

    #[test]
    fn builtin_profile_is_valid() {
        assert!(CogSpeedConfig::builtin().validate().is_ok());
    }

    #[test]
    fn roundtrip_builtin_config() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        let store = FileConfigStore::with_path(&path);
        let cfg = CogSpeedConfig::builtin();
        store.save(&cfg).unwrap();
        let loaded = store.load().unwrap();
        assert_eq!(cfg, loaded);
    }

    #[test]
    fn missing_file_is_an_error_not_a_default() {
        let dir = tempdir().unwrap();
        let store = FileConfigStore::with_path(dir.path().join("nope.json"));
        assert_matches!(store.load(), Err(ConfigError::Io(_)));
    }

    #[test]
    fn missing_field_is_fatal() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        let mut value = serde_json::to_value(CogSpeedConfig::builtin()).unwrap();
        value
            .as_object_mut()
            .unwrap()
            .get_mut("machine_paced")
            .unwrap()
            .as_object_mut()
            .unwrap()
            .remove("minimum_response_time_ms");
        std::fs::write(&path, serde_json::to_vec(&value).unwrap()).unwrap();
        let store = FileConfigStore::with_path(&path);
        assert_matches!(store.load(), Err(ConfigError::Parse(_)));
    }

    #[test]
    fn unknown_field_is_fatal() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        let mut value = serde_json::to_value(CogSpeedConfig::builtin()).unwrap();
        value
            .as_object_mut()
            .unwrap()
            .insert("mystery_knob".into(), serde_json::json!(1));
        std::fs::write(&path, serde_json::to_vec(&value).unwrap()).unwrap();
        let store = FileConfigStore::with_path(&path);
        assert_matches!(store.load(), Err(ConfigError::Parse(_)));
    }

    #[test]
    fn out_of_range_threshold_is_rejected() {
        let mut cfg = CogSpeedConfig::builtin();
        cfg.machine_paced.rolling_average.threshold = 1.5;
        assert_matches!(
            cfg.validate(),
            Err(ConfigError::Invalid { field, .. })
                if field == "machine_paced.rolling_average.threshold"
        );
    }

    #[test]
    fn degenerate_cpi_range_is_rejected() {
        let mut cfg = CogSpeedConfig::builtin();
        cfg.cpi.brd_max_ms = cfg.cpi.brd_min_ms;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn zero_mean_size_is_rejected() {
        let mut cfg = CogSpeedConfig::builtin();
        cfg.machine_paced.rolling_average.mean_size = 0;
        assert!(cfg.validate().is_err());
    }
}
