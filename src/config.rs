use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::PathBuf;

use crate::content::SelectionLimits;
use crate::network::DEFAULT_ENDPOINT;
use crate::tooltip::TooltipLayout;

const APP_DIR: &str = "quickexplain";

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub endpoint: String,
    pub max_selection_chars: usize,
    pub context_chars: usize,
    pub storage_path: Option<String>,
    pub log_dir: Option<String>,
    pub tooltip: TooltipSettings,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct TooltipSettings {
    pub gap: i32,
    pub min_top: i32,
    pub max_width: u16,
}

/// Values given on the command line. They win over every file.
#[derive(Debug, Default)]
pub struct Overrides {
    pub endpoint: Option<String>,
    pub storage_path: Option<PathBuf>,
}

impl Settings {
    pub fn new(overrides: &Overrides) -> Result<Self, ConfigError> {
        let mut builder = Config::builder()
            // 1. Built-in defaults, sized for a terminal
            .set_default("endpoint", DEFAULT_ENDPOINT)?
            .set_default("max_selection_chars", 120_i64)?
            .set_default("context_chars", 300_i64)?
            .set_default("tooltip.gap", 1_i64)?
            .set_default("tooltip.min_top", 1_i64)?
            .set_default("tooltip.max_width", 60_i64)?;

        // 2. User config, if there is one
        if let Some(path) = user_config_path() {
            builder = builder.add_source(File::from(path).required(false));
        }

        builder = builder
            // 3. Local quickexplain.toml in CWD
            .add_source(File::with_name("quickexplain").required(false))
            // 4. QUICKEXPLAIN_ENDPOINT, QUICKEXPLAIN_TOOLTIP__GAP, ...
            .add_source(
                Environment::with_prefix("QUICKEXPLAIN")
                    .separator("__")
                    .try_parsing(true),
            );

        if let Some(endpoint) = &overrides.endpoint {
            builder = builder.set_override("endpoint", endpoint.as_str())?;
        }
        if let Some(path) = &overrides.storage_path {
            builder = builder.set_override("storage_path", path.to_string_lossy().to_string())?;
        }

        builder.build()?.try_deserialize()
    }

    pub fn limits(&self) -> SelectionLimits {
        SelectionLimits {
            max_chars: self.max_selection_chars,
            context_chars: self.context_chars,
        }
    }

    pub fn layout(&self) -> TooltipLayout {
        TooltipLayout {
            gap: self.tooltip.gap,
            min_top: self.tooltip.min_top,
            max_width: self.tooltip.max_width,
        }
    }

    /// Where the `enabled` preference lives.
    pub fn storage_path(&self) -> Option<PathBuf> {
        match &self.storage_path {
            Some(path) => Some(expand(path)),
            None => dirs::config_dir().map(|dir| dir.join(APP_DIR).join("storage.toml")),
        }
    }

    pub fn log_dir(&self) -> Option<PathBuf> {
        match &self.log_dir {
            Some(path) => Some(expand(path)),
            None => dirs::data_local_dir().map(|dir| dir.join(APP_DIR).join("logs")),
        }
    }
}

pub fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(APP_DIR).join("quickexplain.toml"))
}

fn expand(path: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(path).into_owned())
}
