use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::collectors::mdstat::MDSTAT_PATH;
use crate::collectors::sysfs::SYSFS_BLOCK_DIR;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub general: GeneralConfig,

    #[serde(default)]
    pub report: ReportConfig,

    #[serde(default)]
    pub alerts: AlertThresholds,

    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Status file to parse
    pub mdstat_path: PathBuf,
    /// Directory holding `<array>/md/mismatch_cnt`
    pub sysfs_block_dir: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    /// Colorize the text report when stdout is a terminal.
    pub color: bool,
    /// Read and show each array's mismatch count.
    pub show_mismatch: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertThresholds {
    /// Warn when an array's mismatch count exceeds this value.
    pub mismatch_warn: u64,
    /// Report a running check as a warning instead of informational.
    pub warn_on_check: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// error, warn, info, debug or trace. `RUST_LOG` overrides it.
    pub level: String,
}

// ── Defaults ─────────────────────────────────────────────────────────

impl Default for Config {
    fn default() -> Self {
        Self {
            general: GeneralConfig::default(),
            report:  ReportConfig::default(),
            alerts:  AlertThresholds::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            mdstat_path:     PathBuf::from(MDSTAT_PATH),
            sysfs_block_dir: PathBuf::from(SYSFS_BLOCK_DIR),
        }
    }
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self { color: true, show_mismatch: false }
    }
}

impl Default for AlertThresholds {
    fn default() -> Self {
        Self { mismatch_warn: 0, warn_on_check: false }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: "warn".into() }
    }
}

// ── Load / Save ───────────────────────────────────────────────────────

impl Config {
    pub fn load() -> Self {
        match Self::config_path().map(|p| Self::load_from(&p)) {
            Some(Ok(c)) => c,
            _ => {
                // Write defaults on first run (best-effort)
                let _ = try_write_defaults();
                Config::default()
            }
        }
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        let cfg: Config = toml::from_str(&text)?;
        Ok(cfg)
    }

    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("mdstat").join("mdstat.toml"))
    }
}

fn try_write_defaults() -> Result<()> {
    let path = Config::config_path().ok_or_else(|| anyhow::anyhow!("no config dir"))?;
    if path.exists() {
        return Ok(());
    }
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let text = toml::to_string_pretty(&Config::default())?;
    fs::write(path, format!("# mdstat configuration\n# Generated on first run, edit freely\n\n{}", text))?;
    Ok(())
}
