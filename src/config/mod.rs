use std::env;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use time::macros::format_description;
use time::UtcOffset;

const APP_DOMAIN: &str = "chat";
const APP_ORG: &str = "Kafuffle";
const APP_NAME: &str = "kafuffle";

/// Offset setting that defers to the operating system's timezone.
pub const LOCAL_OFFSET: &str = "local";

pub struct ConfigLoader {
    paths: ConfigPaths,
}

impl ConfigLoader {
    pub fn discover() -> Result<Self> {
        let paths = ConfigPaths::discover()?;
        Ok(Self { paths })
    }

    pub fn with_paths(paths: ConfigPaths) -> Self {
        Self { paths }
    }

    pub fn paths(&self) -> &ConfigPaths {
        &self.paths
    }

    pub fn load_or_init(&self) -> Result<AppConfig> {
        self.paths.ensure_directories()?;
        if !self.paths.config_file.exists() {
            let default_cfg = AppConfig::default();
            self.write_default_config(&default_cfg)?;
            return Ok(default_cfg);
        }

        self.load()
    }

    pub fn load(&self) -> Result<AppConfig> {
        let raw = fs::read_to_string(&self.paths.config_file)
            .with_context(|| format!("reading config {}", self.paths.config_file.display()))?;
        let mut cfg: AppConfig = toml::from_str(&raw).context("parsing config toml")?;
        cfg.post_load();
        Ok(cfg)
    }

    fn write_default_config(&self, cfg: &AppConfig) -> Result<()> {
        let toml = toml::to_string_pretty(cfg).context("serializing default config")?;
        if let Some(parent) = self.paths.config_file.parent() {
            fs::create_dir_all(parent).with_context(|| format!("creating {}", parent.display()))?;
        }
        let mut file = fs::File::create(&self.paths.config_file)
            .with_context(|| format!("creating config {}", self.paths.config_file.display()))?;
        file.write_all(toml.as_bytes())
            .context("writing default config")?;
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct ConfigPaths {
    pub config_dir: PathBuf,
    pub config_file: PathBuf,
    pub data_dir: PathBuf,
    pub state_dir: PathBuf,
    pub preferences_file: PathBuf,
    pub preferences_db: PathBuf,
}

impl ConfigPaths {
    pub fn discover() -> Result<Self> {
        let override_config = env::var("KAFUFFLE_CONFIG").ok().map(PathBuf::from);
        let override_data = env::var("KAFUFFLE_DATA").ok().map(PathBuf::from);
        Self::resolve(override_config, override_data)
    }

    /// Platform directories with the given overrides applied. A data
    /// override also roots the state directory, so every file the crate
    /// writes outside the config directory follows it.
    pub fn resolve(
        override_config: Option<PathBuf>,
        override_data: Option<PathBuf>,
    ) -> Result<Self> {
        let project_dirs = ProjectDirs::from(APP_DOMAIN, APP_ORG, APP_NAME)
            .context("resolving XDG project directories")?;

        let config_dir = override_config
            .clone()
            .map(|p| {
                if p.is_dir() {
                    p
                } else {
                    p.parent().map(Path::to_path_buf).unwrap_or(p)
                }
            })
            .unwrap_or_else(|| project_dirs.config_dir().to_path_buf());

        let config_file = override_config
            .filter(|p| p.is_file() || p.extension().is_some())
            .unwrap_or_else(|| config_dir.join("config.toml"));

        let state_dir = match &override_data {
            Some(data) => data.join("state"),
            None => project_dirs
                .state_dir()
                .map(Path::to_path_buf)
                .unwrap_or_else(|| project_dirs.data_dir().join("state")),
        };
        let data_dir = override_data.unwrap_or_else(|| project_dirs.data_dir().to_path_buf());

        Ok(Self::from_roots(config_dir, config_file, data_dir, state_dir))
    }

    /// Lays out every derived path below the given roots.
    pub fn from_roots(
        config_dir: PathBuf,
        config_file: PathBuf,
        data_dir: PathBuf,
        state_dir: PathBuf,
    ) -> Self {
        Self {
            preferences_file: state_dir.join("preferences.json"),
            preferences_db: data_dir.join("preferences.db"),
            config_dir,
            config_file,
            data_dir,
            state_dir,
        }
    }

    pub fn ensure_directories(&self) -> Result<()> {
        for dir in [
            &self.config_dir,
            &self.data_dir,
            &self.state_dir,
        ] {
            fs::create_dir_all(dir)
                .with_context(|| format!("creating application directory {}", dir.display()))?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub display: DisplayOptions,
    pub preferences: PreferenceOptions,
}

impl AppConfig {
    fn post_load(&mut self) {
        if self.display.is_local() {
            return;
        }
        if let Err(err) = self.display.resolve_offset() {
            tracing::warn!(
                offset = %self.display.utc_offset,
                error = %err,
                "invalid utc_offset in config, falling back to local time"
            );
            self.display.utc_offset = LOCAL_OFFSET.to_string();
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayOptions {
    /// `local`, `UTC`, or a fixed offset such as `+10:00`.
    pub utc_offset: String,
}

impl Default for DisplayOptions {
    fn default() -> Self {
        Self {
            utc_offset: LOCAL_OFFSET.to_string(),
        }
    }
}

impl DisplayOptions {
    pub fn is_local(&self) -> bool {
        self.utc_offset.trim().eq_ignore_ascii_case(LOCAL_OFFSET)
    }

    pub fn resolve_offset(&self) -> Result<UtcOffset> {
        parse_offset(&self.utc_offset)
    }

    /// Like [`resolve_offset`](Self::resolve_offset), answering `local` with
    /// an offset the caller already obtained.
    pub fn resolve_offset_with(&self, local: Option<UtcOffset>) -> Result<UtcOffset> {
        parse_offset_with(&self.utc_offset, local)
    }
}

/// Parses an offset setting, answering `local` with `local` when given
/// instead of asking the operating system again.
pub fn parse_offset_with(raw: &str, local: Option<UtcOffset>) -> Result<UtcOffset> {
    match local {
        Some(local) if raw.trim().eq_ignore_ascii_case(LOCAL_OFFSET) => Ok(local),
        _ => parse_offset(raw),
    }
}

/// Parses an offset setting. `local` asks the operating system and falls
/// back to UTC when it cannot tell.
pub fn parse_offset(raw: &str) -> Result<UtcOffset> {
    let raw = raw.trim();
    if raw.eq_ignore_ascii_case(LOCAL_OFFSET) {
        return Ok(UtcOffset::current_local_offset().unwrap_or_else(|err| {
            tracing::warn!(%err, "local offset unavailable, using UTC");
            UtcOffset::UTC
        }));
    }
    if raw.eq_ignore_ascii_case("utc") || raw.eq_ignore_ascii_case("z") {
        return Ok(UtcOffset::UTC);
    }
    if raw.is_empty() {
        bail!("empty utc offset");
    }
    UtcOffset::parse(
        raw,
        &format_description!("[offset_hour sign:mandatory]:[offset_minute]"),
    )
    .with_context(|| format!("parsing utc offset '{raw}' (expected e.g. +10:00)"))
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PreferenceOptions {
    pub backend: PreferenceBackend,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case", ascii_case_insensitive)]
pub enum PreferenceBackend {
    #[default]
    File,
    Sqlite,
    Memory,
}
