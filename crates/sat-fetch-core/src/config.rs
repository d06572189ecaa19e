use config::{Config, Environment, File as ConfigFile};
use serde::Deserialize;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::Error;

pub const DEFAULT_CONFIG_NAME: &str = "Config";
pub const ENV_PREFIX: &str = "SAT_FETCH";

/// Provider credential. Never printed in full.
#[derive(Clone, Default, Deserialize)]
#[serde(transparent)]
pub struct AccessToken(String);

impl AccessToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            write!(f, "AccessToken(<unset>)")
        } else {
            write!(f, "AccessToken(***)")
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub train_path: PathBuf,
    pub test_path: PathBuf,
    pub save_dir: PathBuf,
    pub zoom: u8,
    pub image_size: String,
    pub style_id: String,
    #[serde(default)]
    pub access_token: AccessToken,
    pub timeout_secs: u64,
    pub api_base: String,
    pub workers: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            train_path: PathBuf::from("train.xlsx"),
            test_path: PathBuf::from("test.xlsx"),
            save_dir: PathBuf::from("images"),
            zoom: 18,
            image_size: "600x600".to_string(),
            style_id: "mapbox/satellite-v9".to_string(),
            access_token: AccessToken::default(),
            timeout_secs: 10,
            api_base: "https://api.mapbox.com".to_string(),
            workers: 1,
        }
    }
}

impl AppConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Parse `image_size` ("WxH") into its two dimensions.
    pub fn image_dimensions(&self) -> Option<(u32, u32)> {
        let (w, h) = self.image_size.split_once('x')?;
        let w: u32 = w.parse().ok()?;
        let h: u32 = h.parse().ok()?;
        if w == 0 || h == 0 {
            return None;
        }
        Some((w, h))
    }

    pub fn validate(&self) -> Result<(), Error> {
        if self.access_token.is_empty() {
            return Err(Error::InvalidConfig(
                "access_token is required (set SAT_FETCH_ACCESS_TOKEN)".to_string(),
            ));
        }
        if self.zoom > 22 {
            return Err(Error::InvalidConfig(format!(
                "zoom must be between 0 and 22, got {}",
                self.zoom
            )));
        }
        if self.image_dimensions().is_none() {
            return Err(Error::InvalidConfig(format!(
                "image_size must look like WIDTHxHEIGHT, got '{}'",
                self.image_size
            )));
        }
        if self.style_id.trim().is_empty() {
            return Err(Error::InvalidConfig("style_id must not be empty".to_string()));
        }
        if self.timeout_secs == 0 {
            return Err(Error::InvalidConfig("timeout_secs must be positive".to_string()));
        }
        if self.workers == 0 {
            return Err(Error::InvalidConfig("workers must be at least 1".to_string()));
        }
        Ok(())
    }
}

/// Load `Config.toml` (if present) layered under `SAT_FETCH_*` environment variables.
pub fn load_configuration() -> Result<AppConfig, Error> {
    load_configuration_from(DEFAULT_CONFIG_NAME)
}

pub fn load_configuration_from(name: &str) -> Result<AppConfig, Error> {
    let defaults = AppConfig::default();
    let builder = Config::builder()
        .set_default("train_path", defaults.train_path.to_string_lossy().into_owned())?
        .set_default("test_path", defaults.test_path.to_string_lossy().into_owned())?
        .set_default("save_dir", defaults.save_dir.to_string_lossy().into_owned())?
        .set_default("zoom", defaults.zoom as i64)?
        .set_default("image_size", defaults.image_size)?
        .set_default("style_id", defaults.style_id)?
        .set_default("timeout_secs", defaults.timeout_secs as i64)?
        .set_default("api_base", defaults.api_base)?
        .set_default("workers", defaults.workers as i64)?
        .add_source(ConfigFile::with_name(name).required(false))
        .add_source(Environment::with_prefix(ENV_PREFIX).try_parsing(true))
        .build()?;
    Ok(builder.try_deserialize::<AppConfig>()?)
}
