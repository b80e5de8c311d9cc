//! Configuration loading and resolution
//!
//! Settings resolve in priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable (`I7CARD_DB`, `I7CARD_SHEET_ID`)
//! 3. TOML config file (`~/.config/i7card/config.toml`, or
//!    `/etc/i7card/config.toml` on Linux)
//! 4. Compiled default (fallback)
//!
//! The spreadsheet document id and per-sheet gids default to the published
//! community sheet; both can be overridden for mirrors or test fixtures.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Document id of the published card data spreadsheet
pub const DEFAULT_SHEET_ID: &str = "1UxM2ekw7KlTTbCfPFMa6ihywrUMTryP5Zrv1DVEUKy4";

/// Sheet tab (gid) defaults within the document
pub const DEFAULT_CARDS_GID: &str = "480354522";
pub const DEFAULT_SONGS_GID: &str = "1083871743";
pub const DEFAULT_GROUP_CARDS_GID: &str = "1087762308";
pub const DEFAULT_SCORE_CALC_GID: &str = "1555231665";

/// Raw TOML config file contents; every field optional
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TomlConfig {
    pub database_path: Option<PathBuf>,
    pub sheet_id: Option<String>,
    pub image_base_url: Option<String>,
    #[serde(default)]
    pub gids: TomlGids,
}

/// Per-sheet gid overrides in the TOML file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TomlGids {
    pub cards: Option<String>,
    pub songs: Option<String>,
    pub group_cards: Option<String>,
    pub score_calc: Option<String>,
}

impl TomlConfig {
    /// Parse a TOML config file; a missing file is not an error
    pub fn load(path: &std::path::Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(path)?;
        toml::from_str(&text).map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))
    }
}

/// Resolved gids for the four known sheets
#[derive(Debug, Clone)]
pub struct SheetGids {
    pub cards: String,
    pub songs: String,
    pub group_cards: String,
    pub score_calc: String,
}

/// Fully resolved runtime settings
#[derive(Debug, Clone)]
pub struct Settings {
    pub database_path: PathBuf,
    pub sheet_id: String,
    pub gids: SheetGids,
    pub image_base_url: Option<String>,
}

impl Settings {
    /// Resolve settings from CLI overrides, environment, TOML, defaults
    pub fn resolve(cli_db: Option<PathBuf>, cli_sheet_id: Option<String>) -> Result<Self> {
        let toml_config = match config_file_path() {
            Some(path) => TomlConfig::load(&path)?,
            None => TomlConfig::default(),
        };
        Ok(Self::from_sources(cli_db, cli_sheet_id, toml_config))
    }

    /// Resolution core, split out so tests can supply a TomlConfig directly
    pub fn from_sources(
        cli_db: Option<PathBuf>,
        cli_sheet_id: Option<String>,
        toml_config: TomlConfig,
    ) -> Self {
        let database_path = cli_db
            .or_else(|| std::env::var("I7CARD_DB").ok().map(PathBuf::from))
            .or(toml_config.database_path)
            .unwrap_or_else(default_database_path);

        let sheet_id = cli_sheet_id
            .or_else(|| std::env::var("I7CARD_SHEET_ID").ok())
            .or(toml_config.sheet_id)
            .unwrap_or_else(|| DEFAULT_SHEET_ID.to_string());

        let gids = SheetGids {
            cards: toml_config
                .gids
                .cards
                .unwrap_or_else(|| DEFAULT_CARDS_GID.to_string()),
            songs: toml_config
                .gids
                .songs
                .unwrap_or_else(|| DEFAULT_SONGS_GID.to_string()),
            group_cards: toml_config
                .gids
                .group_cards
                .unwrap_or_else(|| DEFAULT_GROUP_CARDS_GID.to_string()),
            score_calc: toml_config
                .gids
                .score_calc
                .unwrap_or_else(|| DEFAULT_SCORE_CALC_GID.to_string()),
        };

        Settings {
            database_path,
            sheet_id,
            gids,
            image_base_url: toml_config.image_base_url,
        }
    }
}

/// CSV export URL for one sheet tab of a document
pub fn export_url(sheet_id: &str, gid: &str) -> String {
    format!("https://docs.google.com/spreadsheets/d/{sheet_id}/export?format=csv&gid={gid}")
}

/// Locate the config file for the platform, if any exists
fn config_file_path() -> Option<PathBuf> {
    if let Some(user_config) = dirs::config_dir().map(|d| d.join("i7card").join("config.toml")) {
        if user_config.exists() {
            return Some(user_config);
        }
    }
    if cfg!(target_os = "linux") {
        let system_config = PathBuf::from("/etc/i7card/config.toml");
        if system_config.exists() {
            return Some(system_config);
        }
    }
    None
}

/// OS-dependent default database location
fn default_database_path() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("i7card").join("i7card.db"))
        .unwrap_or_else(|| PathBuf::from("./i7card.db"))
}
