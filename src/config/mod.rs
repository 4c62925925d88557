//! Configuration loading and validation.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::models::{default_boundaries, Season, SeasonTable, PRE_SEASON_LABEL};

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Constants of rating reconstruction and graph layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphConfig {
    /// Natural SR change of a win or loss
    #[serde(default = "default_sr_per_match")]
    pub sr_per_match: f64,

    /// Multiplier of log10(hours idle) added to x spacing
    #[serde(default = "default_gap_scale")]
    pub gap_scale: f64,

    /// Matches shown when the graph first renders; 0 shows all of them
    #[serde(default = "default_initial_matches_visible")]
    pub initial_matches_visible: usize,

    /// Approximate number of date labels visible at once
    #[serde(default = "default_target_ticks")]
    pub target_ticks: usize,

    /// Vertical padding around the in-range SR extent
    #[serde(default = "default_y_padding")]
    pub y_padding: f64,

    /// Vertical range used when nothing is in range
    #[serde(default = "default_fallback_sr_range")]
    pub fallback_sr_range: [f64; 2],

    /// Narrowest visible x span
    #[serde(default = "default_min_span")]
    pub min_span: f64,

    /// Panning margin beyond the first and last match
    #[serde(default = "default_edge_margin")]
    pub edge_margin: f64,

    /// Fewest resolved matches a player needs to be plotted
    #[serde(default = "default_min_graphable_matches")]
    pub min_graphable_matches: usize,

    /// chrono format of date tick labels
    #[serde(default = "default_date_format")]
    pub date_format: String,
}

fn default_sr_per_match() -> f64 {
    25.0
}

fn default_gap_scale() -> f64 {
    4.0
}

fn default_initial_matches_visible() -> usize {
    100
}

fn default_target_ticks() -> usize {
    15
}

fn default_y_padding() -> f64 {
    25.0
}

fn default_fallback_sr_range() -> [f64; 2] {
    [0.0, 5000.0]
}

fn default_min_span() -> f64 {
    2.0
}

fn default_edge_margin() -> f64 {
    2.0
}

fn default_min_graphable_matches() -> usize {
    3
}

fn default_date_format() -> String {
    "%b %-d, %Y".to_string()
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            sr_per_match: default_sr_per_match(),
            gap_scale: default_gap_scale(),
            initial_matches_visible: default_initial_matches_visible(),
            target_ticks: default_target_ticks(),
            y_padding: default_y_padding(),
            fallback_sr_range: default_fallback_sr_range(),
            min_span: default_min_span(),
            edge_margin: default_edge_margin(),
            min_graphable_matches: default_min_graphable_matches(),
            date_format: default_date_format(),
        }
    }
}

/// Server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_cors_origin")]
    pub cors_origin: String,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_cors_origin() -> String {
    "*".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_origin: default_cors_origin(),
        }
    }
}

/// Main application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default = "default_pre_season_label")]
    pub pre_season_label: String,

    #[serde(default)]
    pub graph: GraphConfig,

    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default = "default_boundaries")]
    pub seasons: Vec<Season>,
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./data")
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_pre_season_label() -> String {
    PRE_SEASON_LABEL.to_string()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            log_level: default_log_level(),
            pre_season_label: default_pre_season_label(),
            graph: GraphConfig::default(),
            server: ServerConfig::default(),
            seasons: default_boundaries(),
        }
    }
}

impl AppConfig {
    /// Load configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let config: AppConfig = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a file if it exists, otherwise use defaults.
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            Self::from_file(path)
        } else {
            tracing::debug!("No config at {:?}, using defaults", path);
            Ok(Self::default())
        }
    }

    /// Season lookup table built from the configured boundaries.
    pub fn season_table(&self) -> SeasonTable {
        SeasonTable::new(&self.pre_season_label, self.seasons.clone())
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let graph = &self.graph;

        if graph.sr_per_match <= 0.0 {
            return Err(ConfigError::ValidationError(
                "sr_per_match must be greater than 0".to_string(),
            ));
        }

        if graph.gap_scale < 0.0 {
            return Err(ConfigError::ValidationError(
                "gap_scale must not be negative".to_string(),
            ));
        }

        if graph.target_ticks == 0 {
            return Err(ConfigError::ValidationError(
                "target_ticks must be greater than 0".to_string(),
            ));
        }

        if graph.min_span <= 0.0 {
            return Err(ConfigError::ValidationError(
                "min_span must be greater than 0".to_string(),
            ));
        }

        if graph.edge_margin < 0.0 {
            return Err(ConfigError::ValidationError(
                "edge_margin must not be negative".to_string(),
            ));
        }

        // A single match must still admit a range of at least min_span.
        if graph.min_span > 2.0 * graph.edge_margin {
            return Err(ConfigError::ValidationError(format!(
                "min_span ({}) must not exceed twice edge_margin ({})",
                graph.min_span, graph.edge_margin
            )));
        }

        if graph.fallback_sr_range[0] >= graph.fallback_sr_range[1] {
            return Err(ConfigError::ValidationError(
                "fallback_sr_range must be [low, high] with low < high".to_string(),
            ));
        }

        if let Some(pair) = self
            .seasons
            .windows(2)
            .find(|w| w[0].starts_at >= w[1].starts_at)
        {
            return Err(ConfigError::ValidationError(format!(
                "season boundaries must be strictly increasing ('{}' is not before '{}')",
                pair[0].label, pair[1].label
            )));
        }

        if self.server.port == 0 {
            return Err(ConfigError::ValidationError(
                "Server port must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}
