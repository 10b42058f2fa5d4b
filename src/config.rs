use crate::model::AxiomKind;
use crate::validators::ValidationMode;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

const DEFAULT_MAX_VIOLATIONS: usize = 100;
const DEFAULT_SLOW_VALIDATOR_MS: u64 = 250;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModeSetting {
    FailFast,
    CollectAll,
}

impl FromStr for ModeSetting {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "fail_fast" => Ok(ModeSetting::FailFast),
            "collect_all" => Ok(ModeSetting::CollectAll),
            other => anyhow::bail!("unknown validation mode: {other}"),
        }
    }
}

/// Settings of the validator chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationConfig {
    /// Axioms to check. Order is irrelevant: validators always run in the
    /// fixed commit order.
    pub enabled_axioms: Vec<AxiomKind>,
    /// Mode of `Transaction::check`. Commits always stop at the first
    /// violation.
    pub mode: ModeSetting,
    /// Cap on violations gathered in collect-all mode.
    pub max_violations: usize,
    /// Validators slower than this are logged at warn level.
    pub slow_validator_threshold_ms: u64,
    pub record_metrics: bool,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            enabled_axioms: AxiomKind::VALIDATION_ORDER.to_vec(),
            mode: ModeSetting::FailFast,
            max_violations: DEFAULT_MAX_VIOLATIONS,
            slow_validator_threshold_ms: DEFAULT_SLOW_VALIDATOR_MS,
            record_metrics: true,
        }
    }
}

impl ValidationConfig {
    /// Load from a YAML or JSON file, then apply environment overrides.
    pub fn load(path: &Path) -> Result<Self> {
        let config = load_config_file(path)?.with_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// Defaults plus environment overrides.
    pub fn from_env() -> Result<Self> {
        let config = Self::default().with_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    pub fn with_env_overrides(mut self) -> Result<Self> {
        if let Some(axioms) = env_var("OWL_GUARD_AXIOMS") {
            self.enabled_axioms = axioms
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(|s| {
                    AxiomKind::from_str(s)
                        .with_context(|| format!("unknown axiom in OWL_GUARD_AXIOMS: {s}"))
                })
                .collect::<Result<_>>()?;
        }
        if let Some(mode) = env_var("OWL_GUARD_MODE") {
            self.mode = mode.parse().context("invalid OWL_GUARD_MODE")?;
        }
        if let Some(max) = env_var("OWL_GUARD_MAX_VIOLATIONS") {
            self.max_violations = max
                .parse()
                .with_context(|| format!("invalid OWL_GUARD_MAX_VIOLATIONS: {max}"))?;
        }
        if let Some(ms) = env_var("OWL_GUARD_SLOW_VALIDATOR_MS") {
            self.slow_validator_threshold_ms = ms
                .parse()
                .with_context(|| format!("invalid OWL_GUARD_SLOW_VALIDATOR_MS: {ms}"))?;
        }
        if let Some(flag) = env_var("OWL_GUARD_METRICS") {
            self.record_metrics = parse_bool(&flag)
                .with_context(|| format!("invalid OWL_GUARD_METRICS: {flag}"))?;
        }
        Ok(self)
    }

    pub fn validate(&self) -> Result<()> {
        anyhow::ensure!(
            self.max_violations > 0,
            "max_violations must be at least 1"
        );
        anyhow::ensure!(
            !self.enabled_axioms.is_empty(),
            "at least one axiom must be enabled"
        );
        for (idx, axiom) in self.enabled_axioms.iter().enumerate() {
            anyhow::ensure!(
                !self.enabled_axioms[..idx].contains(axiom),
                "axiom {axiom} is enabled more than once"
            );
        }
        Ok(())
    }

    pub fn validation_mode(&self) -> ValidationMode {
        match self.mode {
            ModeSetting::FailFast => ValidationMode::FailFast,
            ModeSetting::CollectAll => ValidationMode::CollectAll {
                max: self.max_violations,
            },
        }
    }

    pub fn slow_validator_threshold(&self) -> Duration {
        Duration::from_millis(self.slow_validator_threshold_ms)
    }
}

fn env_var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parse_bool(value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => anyhow::bail!("expected a boolean, got {other}"),
    }
}

fn load_config_file(path: &Path) -> Result<ValidationConfig> {
    if !path.exists() {
        anyhow::bail!("config file {:?} does not exist", path);
    }
    let contents = fs::read_to_string(path)
        .with_context(|| format!("failed to read config file {:?}", path))?;
    let ext = path
        .extension()
        .and_then(|os| os.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    let parsed = match ext.as_str() {
        "yaml" | "yml" => serde_yaml::from_str(&contents)
            .with_context(|| format!("failed to parse YAML config {:?}", path))?,
        "json" => serde_json::from_str(&contents)
            .with_context(|| format!("failed to parse JSON config {:?}", path))?,
        other => anyhow::bail!("unsupported config extension: {other}"),
    };
    Ok(parsed)
}
