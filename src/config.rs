//! Configuration for the comparison tools
//!
//! Supports loading configuration from:
//! - Default values
//! - Config file (api-compare.toml)
//! - Environment variables (APICOMPARE__*)
//!
//! ## Example config file (api-compare.toml):
//! ```toml
//! [compare]
//! breaking = true
//! designed = false
//!
//! [report]
//! output_format = "compact"
//! fail_on_designed = false
//! ```

use config_crate::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};

use crate::problems::CompareOptions;

/// Main configuration for API comparison
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CompareConfig {
    /// Which problem lists to produce
    #[serde(default)]
    pub compare: CompareSection,

    /// How results are reported
    #[serde(default)]
    pub report: ReportConfig,
}

/// Problem list toggles
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompareSection {
    /// Report changes that can break clients of the reference API
    #[serde(default = "default_true")]
    pub breaking: bool,

    /// Report deviations from designed elements
    #[serde(default = "default_true")]
    pub designed: bool,
}

/// Report configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Output format for JSON reports
    #[serde(default)]
    pub output_format: OutputFormat,

    /// Treat designed problems as a failure, not just breaking ones
    #[serde(default)]
    pub fail_on_designed: bool,
}

/// Output format for JSON
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Pretty,
    Compact,
}

fn default_true() -> bool {
    true
}

impl Default for CompareSection {
    fn default() -> Self {
        Self {
            breaking: true,
            designed: true,
        }
    }
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            output_format: OutputFormat::Pretty,
            fail_on_designed: false,
        }
    }
}

impl CompareConfig {
    /// Load configuration from the default locations, plus `config_path` if given
    pub fn load_from(config_path: Option<&str>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder();

        let config_locations = [
            "api-compare.toml",
            ".api-compare.toml",
            "config/api-compare.toml",
        ];

        for location in config_locations {
            builder = builder.add_source(File::with_name(location).required(false));
        }

        // XDG config directory
        if let Some(project_dirs) =
            directories::ProjectDirs::from("org", "phetsims", "api-compare")
        {
            let xdg_config = project_dirs.config_dir().join("api-compare.toml");
            if xdg_config.exists() {
                builder = builder.add_source(File::from(xdg_config).required(false));
            }
        }

        if let Some(path) = config_path {
            builder = builder.add_source(File::with_name(path).required(true));
        }

        // APICOMPARE__COMPARE__DESIGNED=false
        builder = builder.add_source(
            Environment::with_prefix("APICOMPARE")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

        builder.build()?.try_deserialize()
    }

    /// Save configuration to a file
    pub fn save(&self, path: &str) -> std::io::Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        std::fs::write(path, content)
    }

    /// The comparison toggles this configuration selects
    pub fn compare_options(&self) -> CompareOptions {
        CompareOptions {
            compare_breaking_api_changes: self.compare.breaking,
            compare_designed_api_changes: self.compare.designed,
        }
    }
}
