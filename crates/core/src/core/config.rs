use core::fmt;
use core::str::FromStr;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use thiserror::Error;

use crate::prng::Prng;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigError {
    #[error("unknown parameter `{0}`")]
    UnknownParam(String),
    #[error("{label} must be between {min} and {max}, got {value}")]
    OutOfRange {
        label: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },
    #[error("{label} must be a whole number, got {value}")]
    NotAnInteger { label: &'static str, value: f64 },
    #[error("unknown preset `{0}`")]
    UnknownPreset(String),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ParamKind {
    Int,
    Float,
}

/// Declared type, inclusive bounds and default of one configuration parameter.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct ParamSpec {
    pub key: &'static str,
    pub label: &'static str,
    pub kind: ParamKind,
    pub min: f64,
    pub max: f64,
    pub default: f64,
}

impl ParamSpec {
    pub fn check(&self, value: f64) -> Result<(), ConfigError> {
        if !value.is_finite() || value < self.min || value > self.max {
            return Err(ConfigError::OutOfRange {
                label: self.label,
                value,
                min: self.min,
                max: self.max,
            });
        }
        if self.kind == ParamKind::Int && value.fract() != 0.0 {
            return Err(ConfigError::NotAnInteger {
                label: self.label,
                value,
            });
        }
        Ok(())
    }
}

const fn int(key: &'static str, label: &'static str, min: f64, max: f64, default: f64) -> ParamSpec {
    ParamSpec {
        key,
        label,
        kind: ParamKind::Int,
        min,
        max,
        default,
    }
}

/// Parameter schema in display order.
pub const PARAM_SPECS: [ParamSpec; 8] = [
    int("rows", "Grid rows", 5.0, 150.0, 15.0),
    int("cols", "Grid columns", 5.0, 250.0, 25.0),
    int("initial_population", "Initial population", 1.0, 100.0, 2.0),
    int("age_limit", "Age limit", 1.0, 1000.0, 10.0),
    int("division_limit", "Division limit", 1.0, 1000.0, 2.0),
    ParamSpec {
        key: "division_probability",
        label: "Division probability",
        kind: ParamKind::Float,
        min: 0.0,
        max: 1.0,
        default: 0.2,
    },
    int("division_cooldown", "Division cooldown", 0.0, 1000.0, 2.0),
    int("time_limit", "Time limit", 1.0, 1000.0, 100.0),
];

pub fn param_specs() -> &'static [ParamSpec] {
    &PARAM_SPECS
}

pub fn param_spec(key: &str) -> Option<&'static ParamSpec> {
    PARAM_SPECS.iter().find(|s| s.key == key)
}

/// Parameters of one automaton run.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CellConfig {
    pub rows: usize,
    pub cols: usize,
    pub initial_population: usize,
    pub age_limit: u32,
    pub division_limit: u32,
    pub division_probability: f64,
    pub division_cooldown: u32,
    pub time_limit: u64,
    /// Fixed seed for reproducible runs; `None` seeds from the clock.
    #[cfg_attr(feature = "serde", serde(default))]
    pub seed: Option<u64>,
}

impl Default for CellConfig {
    fn default() -> Self {
        Self {
            rows: 15,
            cols: 25,
            initial_population: 2,
            age_limit: 10,
            division_limit: 2,
            division_probability: 0.2,
            division_cooldown: 2,
            time_limit: 100,
            seed: None,
        }
    }
}

impl CellConfig {
    /// Build from values in [`PARAM_SPECS`] order, validating each one.
    pub fn from_values(values: [f64; 8]) -> Result<Self, ConfigError> {
        let mut cfg = CellConfig::default();
        for (spec, value) in PARAM_SPECS.iter().zip(values) {
            cfg.set(spec.key, value)?;
        }
        Ok(cfg)
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn get(&self, key: &str) -> Option<f64> {
        Some(match key {
            "rows" => self.rows as f64,
            "cols" => self.cols as f64,
            "initial_population" => self.initial_population as f64,
            "age_limit" => self.age_limit as f64,
            "division_limit" => self.division_limit as f64,
            "division_probability" => self.division_probability,
            "division_cooldown" => self.division_cooldown as f64,
            "time_limit" => self.time_limit as f64,
            _ => return None,
        })
    }

    /// Set one parameter after checking its type and bounds; on error nothing changes.
    pub fn set(&mut self, key: &str, value: f64) -> Result<(), ConfigError> {
        let spec = param_spec(key).ok_or_else(|| ConfigError::UnknownParam(key.to_string()))?;
        spec.check(value)?;
        match key {
            "rows" => self.rows = value as usize,
            "cols" => self.cols = value as usize,
            "initial_population" => self.initial_population = value as usize,
            "age_limit" => self.age_limit = value as u32,
            "division_limit" => self.division_limit = value as u32,
            "division_probability" => self.division_probability = value,
            "division_cooldown" => self.division_cooldown = value as u32,
            "time_limit" => self.time_limit = value as u64,
            _ => return Err(ConfigError::UnknownParam(key.to_string())),
        }
        Ok(())
    }

    /// Check every parameter, e.g. after deserializing.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for spec in &PARAM_SPECS {
            if let Some(v) = self.get(spec.key) {
                spec.check(v)?;
            }
        }
        Ok(())
    }

    /// `(label, value)` pairs in schema order, for display.
    pub fn entries(&self) -> Vec<(&'static str, f64)> {
        PARAM_SPECS
            .iter()
            .filter_map(|s| Some((s.label, self.get(s.key)?)))
            .collect()
    }
}

/// Named starting configurations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Preset {
    Default,
    DyingCrawlers,
    Enochlophobia,
    ForeverLonely,
    /// Every parameter drawn uniformly within its bounds.
    SurpriseMe,
}

impl Preset {
    pub const ALL: [Preset; 5] = [
        Preset::Default,
        Preset::DyingCrawlers,
        Preset::Enochlophobia,
        Preset::ForeverLonely,
        Preset::SurpriseMe,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Preset::Default => "default",
            Preset::DyingCrawlers => "dying-crawlers",
            Preset::Enochlophobia => "enochlophobia",
            Preset::ForeverLonely => "forever-lonely",
            Preset::SurpriseMe => "surprise-me",
        }
    }

    /// Resolve to a config. Only `SurpriseMe` draws from `rng`.
    pub fn config(self, rng: &mut Prng) -> CellConfig {
        let values = match self {
            Preset::Default => return CellConfig::default(),
            Preset::DyingCrawlers => [150.0, 250.0, 100.0, 1.0, 1.0, 0.9, 0.0, 100.0],
            Preset::Enochlophobia => [100.0, 100.0, 1.0, 1000.0, 1000.0, 1.0, 0.0, 75.0],
            Preset::ForeverLonely => [150.0, 250.0, 1.0, 1.0, 1.0, 1.0, 0.0, 1000.0],
            Preset::SurpriseMe => {
                let mut v = [0.0; 8];
                for (slot, spec) in v.iter_mut().zip(PARAM_SPECS.iter()) {
                    *slot = match spec.kind {
                        ParamKind::Int => {
                            rng.gen_range_usize(spec.min as usize, spec.max as usize + 1) as f64
                        }
                        ParamKind::Float => rng.gen_range_f64(spec.min, spec.max),
                    };
                }
                v
            }
        };
        // Preset tables are in range by construction.
        CellConfig::from_values(values).unwrap_or_default()
    }
}

impl FromStr for Preset {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase().replace([' ', '_'], "-");
        let wanted = wanted.trim_end_matches('!');
        Preset::ALL
            .into_iter()
            .find(|p| p.name() == wanted)
            .ok_or_else(|| ConfigError::UnknownPreset(s.to_string()))
    }
}

impl fmt::Display for Preset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(feature = "serde")]
impl CellConfig {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json(text: &str) -> Result<Self, String> {
        let cfg: CellConfig = serde_json::from_str(text).map_err(|e| e.to_string())?;
        cfg.validate().map_err(|e| e.to_string())?;
        Ok(cfg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_schema() {
        let cfg = CellConfig::default();
        for spec in param_specs() {
            assert_eq!(cfg.get(spec.key), Some(spec.default), "{}", spec.key);
        }
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn bounds_are_inclusive() {
        let mut cfg = CellConfig::default();
        cfg.set("rows", 5.0).unwrap();
        cfg.set("rows", 150.0).unwrap();
        cfg.set("division_cooldown", 0.0).unwrap();
        cfg.set("division_probability", 1.0).unwrap();
        assert_eq!(cfg.rows, 150);
    }

    #[test]
    fn out_of_range_is_rejected_and_leaves_config_untouched() {
        let mut cfg = CellConfig::default();
        let err = cfg.set("rows", 4.0).unwrap_err();
        assert!(matches!(err, ConfigError::OutOfRange { label: "Grid rows", .. }));
        assert!(cfg.set("division_probability", 1.01).is_err());
        assert!(cfg.set("age_limit", f64::NAN).is_err());
        assert_eq!(cfg, CellConfig::default());
    }

    #[test]
    fn integer_params_reject_fractions() {
        let mut cfg = CellConfig::default();
        assert_eq!(
            cfg.set("age_limit", 2.5),
            Err(ConfigError::NotAnInteger {
                label: "Age limit",
                value: 2.5
            })
        );
        assert_eq!(
            cfg.set("speed", 1.0),
            Err(ConfigError::UnknownParam("speed".to_string()))
        );
    }

    #[test]
    fn presets_resolve() {
        let mut rng = Prng::new(9);
        let cfg = Preset::Enochlophobia.config(&mut rng);
        assert_eq!(cfg.rows, 100);
        assert_eq!(cfg.age_limit, 1000);
        assert_eq!(cfg.division_probability, 1.0);
        assert_eq!(cfg.time_limit, 75);

        let cfg = Preset::DyingCrawlers.config(&mut rng);
        assert_eq!(cfg.initial_population, 100);
        assert_eq!(cfg.division_probability, 0.9);

        assert_eq!("Forever lonely".parse(), Ok(Preset::ForeverLonely));
        assert_eq!("Surprise me!".parse(), Ok(Preset::SurpriseMe));
        assert!("chaos".parse::<Preset>().is_err());
    }

    #[test]
    fn surprise_me_stays_in_bounds() {
        let mut rng = Prng::new(31);
        for _ in 0..50 {
            let cfg = Preset::SurpriseMe.config(&mut rng);
            assert!(cfg.validate().is_ok());
        }
    }

    #[cfg(feature = "serde")]
    #[test]
    fn json_roundtrip_validates() {
        let cfg = CellConfig::default().with_seed(4);
        let text = cfg.to_json().unwrap();
        assert_eq!(CellConfig::from_json(&text), Ok(cfg));

        let bad = text.replace("\"rows\": 15", "\"rows\": 2");
        assert!(CellConfig::from_json(&bad).is_err());
    }
}
