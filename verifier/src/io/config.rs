//! Verifier configuration stored in `verifier.toml`.

use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

use crate::core::lint::DEFAULT_DEFERRABLE_RULES;
use crate::io::signal::TimeoutPolicy;

/// Verifier configuration (TOML).
///
/// Missing fields default to values that match a typical npm project.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct VerifierConfig {
    /// Script runner binary invoked as `<runner> run <script> ...`.
    pub script_runner: String,

    /// Script that runs the full test suite.
    pub test_script: String,

    /// Timeout for CLI-help and PRD-validation probes.
    pub probe_timeout_secs: u64,

    /// Timeout for the full test suite, before the buffer is added.
    pub full_suite_timeout_secs: u64,

    /// Extra allowance on top of `full_suite_timeout_secs`.
    pub full_suite_buffer_secs: u64,

    /// Delay between the terminate and kill signals for a timed-out child.
    pub kill_grace_ms: u64,

    pub typecheck: TypecheckConfig,

    pub lint: LintConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct TypecheckConfig {
    /// Compiler invocation; `--noEmit --pretty false` is appended.
    pub command: Vec<String>,
    pub timeout_secs: u64,
}

impl Default for TypecheckConfig {
    fn default() -> Self {
        Self {
            command: vec!["npx".to_string(), "tsc".to_string()],
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct LintConfig {
    /// Rules whose errors do not fail the lint check.
    pub deferrable_rules: Vec<String>,
}

impl Default for LintConfig {
    fn default() -> Self {
        Self {
            deferrable_rules: DEFAULT_DEFERRABLE_RULES
                .iter()
                .map(|rule| rule.to_string())
                .collect(),
        }
    }
}

impl Default for VerifierConfig {
    fn default() -> Self {
        Self {
            script_runner: "npm".to_string(),
            test_script: "test".to_string(),
            probe_timeout_secs: 10,
            full_suite_timeout_secs: 5 * 60,
            full_suite_buffer_secs: 10,
            kill_grace_ms: 2_000,
            typecheck: TypecheckConfig::default(),
            lint: LintConfig::default(),
        }
    }
}

impl VerifierConfig {
    pub fn validate(&self) -> Result<()> {
        if self.script_runner.trim().is_empty() {
            return Err(anyhow!("script_runner must be non-empty"));
        }
        if self.test_script.trim().is_empty() {
            return Err(anyhow!("test_script must be non-empty"));
        }
        if self.probe_timeout_secs == 0 {
            return Err(anyhow!("probe_timeout_secs must be > 0"));
        }
        if self.full_suite_timeout_secs == 0 {
            return Err(anyhow!("full_suite_timeout_secs must be > 0"));
        }
        if self.kill_grace_ms == 0 {
            return Err(anyhow!("kill_grace_ms must be > 0"));
        }
        if self.typecheck.command.is_empty() || self.typecheck.command[0].trim().is_empty() {
            return Err(anyhow!("typecheck.command must be a non-empty array"));
        }
        if self.typecheck.timeout_secs == 0 {
            return Err(anyhow!("typecheck.timeout_secs must be > 0"));
        }
        Ok(())
    }

    pub fn kill_grace(&self) -> Duration {
        Duration::from_millis(self.kill_grace_ms)
    }

    pub fn probe_policy(&self) -> TimeoutPolicy {
        TimeoutPolicy::new(Duration::from_secs(self.probe_timeout_secs), self.kill_grace())
    }

    pub fn full_suite_policy(&self) -> TimeoutPolicy {
        let secs = self
            .full_suite_timeout_secs
            .saturating_add(self.full_suite_buffer_secs);
        TimeoutPolicy::new(Duration::from_secs(secs), self.kill_grace())
    }

    pub fn typecheck_policy(&self) -> TimeoutPolicy {
        TimeoutPolicy::new(
            Duration::from_secs(self.typecheck.timeout_secs),
            self.kill_grace(),
        )
    }
}

/// Load config from a TOML file.
///
/// If the file is missing, returns `VerifierConfig::default()`.
pub fn load_config(path: &Path) -> Result<VerifierConfig> {
    if !path.exists() {
        let cfg = VerifierConfig::default();
        cfg.validate()?;
        return Ok(cfg);
    }
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: VerifierConfig =
        toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
    cfg.validate()?;
    Ok(cfg)
}

/// Atomically write config to disk (temp file + rename).
pub fn write_config(path: &Path, cfg: &VerifierConfig) -> Result<()> {
    cfg.validate()?;
    let mut buf = toml::to_string_pretty(cfg).context("serialize config toml")?;
    buf.push('\n');
    let parent = path
        .parent()
        .with_context(|| format!("config path missing parent {}", path.display()))?;
    fs::create_dir_all(parent).with_context(|| format!("create directory {}", parent.display()))?;
    let tmp_path = path.with_extension("toml.tmp");
    fs::write(&tmp_path, buf)
        .with_context(|| format!("write temp config {}", tmp_path.display()))?;
    fs::rename(&tmp_path, path).with_context(|| format!("replace config {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_missing_returns_default() {
        let temp = tempfile::tempdir().expect("tempdir");
        let cfg = load_config(&temp.path().join("missing.toml")).expect("load");
        assert_eq!(cfg, VerifierConfig::default());
    }

    #[test]
    fn write_then_load_round_trips() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("verifier.toml");
        let cfg = VerifierConfig {
            script_runner: "bun".to_string(),
            kill_grace_ms: 500,
            ..VerifierConfig::default()
        };
        write_config(&path, &cfg).expect("write");
        assert_eq!(load_config(&path).expect("load"), cfg);
    }

    #[test]
    fn partial_file_fills_defaults() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("verifier.toml");
        fs::write(&path, "script_runner = \"pnpm\"\n[typecheck]\ntimeout_secs = 90\n")
            .expect("write");
        let cfg = load_config(&path).expect("load");
        assert_eq!(cfg.script_runner, "pnpm");
        assert_eq!(cfg.typecheck.timeout_secs, 90);
        assert_eq!(cfg.typecheck.command, vec!["npx", "tsc"]);
        assert_eq!(cfg.probe_timeout_secs, 10);
    }

    #[test]
    fn zero_grace_is_rejected() {
        let cfg = VerifierConfig {
            kill_grace_ms: 0,
            ..VerifierConfig::default()
        };
        let err = cfg.validate().unwrap_err();
        assert!(err.to_string().contains("kill_grace_ms"));
    }

    #[test]
    fn full_suite_policy_includes_buffer() {
        let policy = VerifierConfig::default().full_suite_policy();
        assert_eq!(policy.timeout, Duration::from_secs(310));
        assert_eq!(policy.kill_grace, Duration::from_secs(2));
    }
}
