use anyhow::{Context, Result};
use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::{fs, path::Path};

/// Environment variable naming an optional JSON config file.
pub const CONFIG_PATH_ENV: &str = "SLEUTH_CONFIG";
/// Set to `1`/`true` to scan every few seconds while debugging.
pub const DEBUG_ENV: &str = "SLEUTH_DEBUG";

const DEBUG_SCAN_INTERVAL_SECS: u64 = 5;

/// Weights for the cheap significance score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SignificanceWeights {
    pub thread: f64,
    pub comments: f64,
    pub score: f64,
    /// Added once when the cluster moved within `recent_activity_window_secs`.
    pub recent_activity_bonus: f64,
    pub recent_activity_window_secs: u64,
}

impl Default for SignificanceWeights {
    fn default() -> Self {
        Self {
            thread: 12.0,
            comments: 2.5,
            score: 0.4,
            recent_activity_bonus: 5.0,
            recent_activity_window_secs: 300,
        }
    }
}

/// Tunable thresholds for clustering, gating and scanning.
///
/// Values are consumed as-is. Out-of-range settings are not rejected; they
/// just produce degenerate behaviour (a similarity threshold above 1.0 puts
/// every item in its own investigation).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Minimum cosine similarity for an update to join an investigation.
    pub similarity_threshold: f32,
    /// Added to `similarity_threshold` for centroid-to-centroid merges.
    pub merge_threshold_offset: f32,
    /// EMA smoothing factor applied to centroids on every fold.
    pub ema_alpha: f32,
    pub investigation_ttl_secs: u64,

    pub report_threshold: f64,
    pub weights: SignificanceWeights,

    pub report_history_cap: usize,
    /// Rolling evidence is trimmed to this many characters before each append.
    pub context_window_chars: usize,
    pub deep_dive_cap: usize,
    pub deep_dive_comment_limit: usize,
    pub item_body_chars: usize,

    pub scan_interval_secs: u64,
    pub fetch_timeout_secs: u64,
    pub summarize_timeout_secs: u64,
    /// Live members not observed for this long are re-fetched explicitly.
    pub gap_fill_after_secs: u64,
    pub gap_fill_limit: usize,
    /// Delta bookkeeping for items unobserved this long is dropped.
    pub delta_retention_secs: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            similarity_threshold: 0.55,
            merge_threshold_offset: 0.10,
            ema_alpha: 0.3,
            investigation_ttl_secs: 60 * 60,
            report_threshold: 50.0,
            weights: SignificanceWeights::default(),
            report_history_cap: 5,
            context_window_chars: 4000,
            deep_dive_cap: 3,
            deep_dive_comment_limit: 5,
            item_body_chars: 1200,
            scan_interval_secs: 30,
            fetch_timeout_secs: 20,
            summarize_timeout_secs: 45,
            gap_fill_after_secs: 5 * 60,
            gap_fill_limit: 25,
            delta_retention_secs: 24 * 60 * 60,
        }
    }
}

impl EngineConfig {
    /// Read a JSON config file; missing keys fall back to defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {}", path.display()))?;
        serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse config in {}", path.display()))
    }

    /// Defaults, overlaid with `SLEUTH_CONFIG` when set, then `SLEUTH_DEBUG`.
    pub fn from_env() -> Result<Self> {
        let mut config = match std::env::var_os(CONFIG_PATH_ENV) {
            Some(path) => Self::load(Path::new(&path))?,
            None => Self::default(),
        };

        let debug_mode = std::env::var(DEBUG_ENV)
            .map(|value| value == "1" || value.eq_ignore_ascii_case("true"))
            .unwrap_or(false);
        if debug_mode {
            config.scan_interval_secs = DEBUG_SCAN_INTERVAL_SECS;
        }

        Ok(config)
    }

    pub fn merge_threshold(&self) -> f32 {
        self.similarity_threshold + self.merge_threshold_offset
    }

    pub fn investigation_ttl(&self) -> Duration {
        secs(self.investigation_ttl_secs)
    }

    pub fn recent_activity_window(&self) -> Duration {
        secs(self.weights.recent_activity_window_secs)
    }

    pub fn gap_fill_after(&self) -> Duration {
        secs(self.gap_fill_after_secs)
    }

    pub fn delta_retention(&self) -> Duration {
        secs(self.delta_retention_secs)
    }

    pub fn scan_interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.scan_interval_secs.max(1))
    }

    pub fn fetch_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.fetch_timeout_secs)
    }

    pub fn summarize_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.summarize_timeout_secs)
    }
}

/// Saturates at the largest whole-second span chrono can represent.
fn secs(value: u64) -> Duration {
    const MAX_SECS: i64 = i64::MAX / 1000;
    Duration::seconds(i64::try_from(value).unwrap_or(MAX_SECS).min(MAX_SECS))
}
