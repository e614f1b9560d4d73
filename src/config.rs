use std::collections::BTreeMap;
use std::env;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::EngineError;
use crate::models::SubjectKey;

/// Per-subject weights used by the term average. Subjects without an entry
/// weigh 1.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CoefficientTable(BTreeMap<SubjectKey, f64>);

impl CoefficientTable {
    pub fn set(&mut self, subject: SubjectKey, weight: f64) {
        self.0.insert(subject, weight);
    }

    pub fn weight(&self, subject: SubjectKey) -> Result<f64, EngineError> {
        let value = self.0.get(&subject).copied().unwrap_or(1.0);
        if value.is_finite() && value > 0.0 {
            Ok(value)
        } else {
            Err(EngineError::InvalidCoefficient { subject, value })
        }
    }

    pub fn invalid_entries(&self) -> Vec<(SubjectKey, f64)> {
        self.0
            .iter()
            .filter(|(_, value)| !(value.is_finite() && **value > 0.0))
            .map(|(key, value)| (*key, *value))
            .collect()
    }
}

impl Default for CoefficientTable {
    fn default() -> Self {
        Self(SubjectKey::ALL.into_iter().map(|key| (key, 1.0)).collect())
    }
}

/// Distinction thresholds, expected ascending from `honor` to `excellence`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DecisionThresholds {
    pub honor: f64,
    pub encouragement: f64,
    pub congratulations: f64,
    pub excellence: f64,
}

impl DecisionThresholds {
    pub fn is_ordered(&self) -> bool {
        self.honor <= self.encouragement
            && self.encouragement <= self.congratulations
            && self.congratulations <= self.excellence
    }
}

impl Default for DecisionThresholds {
    fn default() -> Self {
        Self {
            honor: 12.0,
            encouragement: 14.0,
            congratulations: 16.0,
            excellence: 18.0,
        }
    }
}

/// Header details printed on council reports.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchoolInfo {
    pub name: String,
    pub school_year: String,
    pub district: String,
}

impl Default for SchoolInfo {
    fn default() -> Self {
        Self {
            name: "Cheikh Bouamama Secondary School".to_string(),
            school_year: "2024/2025".to_string(),
            district: "Central Algiers".to_string(),
        }
    }
}

/// Administrative configuration shared by every computation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CouncilConfig {
    pub thresholds: DecisionThresholds,
    pub admission_threshold: f64,
    pub coefficients: CoefficientTable,
    pub school: SchoolInfo,
    pub log_level: String,
}

impl Default for CouncilConfig {
    fn default() -> Self {
        Self {
            thresholds: DecisionThresholds::default(),
            admission_threshold: 10.0,
            coefficients: CoefficientTable::default(),
            school: SchoolInfo::default(),
            log_level: "info".to_string(),
        }
    }
}

impl CouncilConfig {
    /// Reads the JSON config at `path`, or at `COUNCIL_CONFIG` when no path is
    /// given; defaults apply when neither is set. `COUNCIL_LOG_LEVEL`
    /// overrides the file's log level.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let path = path
            .map(Path::to_path_buf)
            .or_else(|| env::var("COUNCIL_CONFIG").ok().map(PathBuf::from));

        let mut config = match path {
            Some(path) => Self::from_file(&path)?,
            None => Self::default(),
        };

        if let Ok(level) = env::var("COUNCIL_LOG_LEVEL") {
            config.log_level = level;
        }

        config.warn_on_anomalies();
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    fn warn_on_anomalies(&self) {
        if !self.thresholds.is_ordered() {
            tracing::warn!(
                honor = self.thresholds.honor,
                encouragement = self.thresholds.encouragement,
                congratulations = self.thresholds.congratulations,
                excellence = self.thresholds.excellence,
                "decision thresholds are not ascending; classifications will be inconsistent"
            );
        }
        for (subject, value) in self.coefficients.invalid_entries() {
            tracing::warn!(%subject, value, "coefficient must be positive");
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("unable to read config file {}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("config file {} is not valid JSON", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Mutex, OnceLock};

    fn env_guard() -> &'static Mutex<()> {
        static GUARD: OnceLock<Mutex<()>> = OnceLock::new();
        GUARD.get_or_init(|| Mutex::new(()))
    }

    fn reset_env() {
        env::remove_var("COUNCIL_CONFIG");
        env::remove_var("COUNCIL_LOG_LEVEL");
    }

    #[test]
    fn load_uses_defaults_when_env_missing() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        let config = CouncilConfig::load(None).expect("config loads with defaults");
        assert_eq!(config.thresholds, DecisionThresholds::default());
        assert_eq!(config.admission_threshold, 10.0);
        assert_eq!(config.log_level, "info");
        for subject in SubjectKey::ALL {
            assert_eq!(config.coefficients.weight(subject), Ok(1.0));
        }
    }

    #[test]
    fn log_level_env_overrides_default() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("COUNCIL_LOG_LEVEL", "debug");
        let config = CouncilConfig::load(None).expect("config loads");
        assert_eq!(config.log_level, "debug");
        reset_env();
    }

    #[test]
    fn missing_file_reports_read_error() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        let err = CouncilConfig::load(Some(Path::new("/nonexistent/council.json")))
            .expect_err("missing file fails");
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn partial_json_keeps_remaining_defaults() {
        let config: CouncilConfig = serde_json::from_str(
            r#"{"admission_threshold": 9.5, "coefficients": {"math": 4}}"#,
        )
        .expect("config parses");
        assert_eq!(config.admission_threshold, 9.5);
        assert_eq!(config.thresholds.excellence, 18.0);
        assert_eq!(config.coefficients.weight(SubjectKey::Mathematics), Ok(4.0));
        // Subjects absent from the table weigh 1.
        assert_eq!(config.coefficients.weight(SubjectKey::Art), Ok(1.0));
    }

    #[test]
    fn misordered_thresholds_are_detectable_but_accepted() {
        let thresholds = DecisionThresholds {
            honor: 15.0,
            encouragement: 14.0,
            congratulations: 16.0,
            excellence: 18.0,
        };
        assert!(!thresholds.is_ordered());
        assert!(DecisionThresholds::default().is_ordered());
    }

    #[test]
    fn negative_coefficients_are_listed() {
        let mut table = CoefficientTable::default();
        table.set(SubjectKey::Civics, -2.0);
        assert_eq!(table.invalid_entries(), vec![(SubjectKey::Civics, -2.0)]);
    }
}
