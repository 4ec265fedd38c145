use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use super::platform;

/// Environment variable pointing at an alternative config file.
pub const CONFIG_PATH_ENV: &str = "SPOTMON_CONFIG";

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub spotify: SpotifyConfig,
    #[serde(default)]
    pub artwork: ArtworkConfig,
    #[serde(default)]
    pub webhook: WebhookConfig,
    #[serde(default)]
    pub timing: TimingConfig,
    #[serde(default)]
    pub palette: PaletteConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// WebSocket URL the served page connects back to. Derived from the port
    /// when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ws_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpotifyConfig {
    #[serde(default = "default_api_base")]
    pub api_base: String,
    /// Bearer token with the `user-read-playback-state` scope, obtained
    /// out of band.
    #[serde(default)]
    pub access_token: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtworkConfig {
    #[serde(default = "default_cache_dir")]
    pub cache_dir: PathBuf,
}

/// Optional outbound sink; absent URL disables it.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct WebhookConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimingConfig {
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    #[serde(default = "default_backoff_ms")]
    pub backoff_ms: u64,
    #[serde(default = "default_broadcast_interval_ms")]
    pub broadcast_interval_ms: u64,
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaletteConfig {
    /// Pick a harmonic accent color for the progress bar.
    #[serde(default = "default_accent")]
    pub accent: bool,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            port: default_port(),
            ws_url: None,
        }
    }
}

impl Default for SpotifyConfig {
    fn default() -> Self {
        Self {
            api_base: default_api_base(),
            access_token: String::new(),
        }
    }
}

impl Default for ArtworkConfig {
    fn default() -> Self {
        Self {
            cache_dir: default_cache_dir(),
        }
    }
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            backoff_ms: default_backoff_ms(),
            broadcast_interval_ms: default_broadcast_interval_ms(),
            connect_timeout_ms: default_connect_timeout_ms(),
            request_timeout_ms: default_request_timeout_ms(),
        }
    }
}

impl Default for PaletteConfig {
    fn default() -> Self {
        Self {
            accent: default_accent(),
        }
    }
}

fn default_bind_address() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_api_base() -> String {
    "https://api.spotify.com/v1".to_string()
}

fn default_cache_dir() -> PathBuf {
    PathBuf::from("image_cache")
}

fn default_poll_interval_ms() -> u64 {
    5000
}

fn default_backoff_ms() -> u64 {
    5000
}

fn default_broadcast_interval_ms() -> u64 {
    1000
}

fn default_connect_timeout_ms() -> u64 {
    3000
}

fn default_request_timeout_ms() -> u64 {
    10_000
}

fn default_accent() -> bool {
    true
}

impl HttpConfig {
    /// The push endpoint URL handed to the page script.
    pub fn push_url(&self) -> String {
        match &self.ws_url {
            Some(url) => url.clone(),
            None => format!("ws://localhost:{}/ws", self.port),
        }
    }
}

impl TimingConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn backoff(&self) -> Duration {
        Duration::from_millis(self.backoff_ms)
    }

    pub fn broadcast_interval(&self) -> Duration {
        Duration::from_millis(self.broadcast_interval_ms)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

impl Config {
    /// Loads the config file (writing defaults on first run), then applies
    /// environment overrides.
    pub fn load() -> anyhow::Result<Self> {
        let config_path = Self::config_path();

        let mut config = if !config_path.exists() {
            let config = Self::default();
            config.save()?;
            config
        } else {
            let content = std::fs::read_to_string(&config_path)?;
            toml::from_str(&content)?
        };

        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    pub fn save(&self) -> anyhow::Result<()> {
        let config_path = Self::config_path();
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(&config_path, content)?;
        Ok(())
    }

    pub fn config_path() -> PathBuf {
        match std::env::var(CONFIG_PATH_ENV) {
            Ok(path) if !path.is_empty() => PathBuf::from(path),
            _ => platform::config_dir().join("config.toml"),
        }
    }

    /// Overrides file values with `HTTP_PORT`, `WS_URL`, `IMAGE_CACHE_DIR`,
    /// `REPORT_URL`, `SPOTIFY_ACCESS_TOKEN` and `SPOTIFY_API_BASE`.
    /// Empty variables count as unset.
    pub fn apply_env<F>(&mut self, lookup: F) -> anyhow::Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(port) = get("HTTP_PORT") {
            self.http.port = port
                .trim()
                .parse()
                .map_err(|e| anyhow::anyhow!("invalid HTTP_PORT {:?}: {}", port, e))?;
        }
        if let Some(url) = get("WS_URL") {
            self.http.ws_url = Some(url);
        }
        if let Some(dir) = get("IMAGE_CACHE_DIR") {
            self.artwork.cache_dir = PathBuf::from(dir);
        }
        if let Some(url) = get("REPORT_URL") {
            self.webhook.url = Some(url);
        }
        if let Some(token) = get("SPOTIFY_ACCESS_TOKEN") {
            self.spotify.access_token = token;
        }
        if let Some(base) = get("SPOTIFY_API_BASE") {
            self.spotify.api_base = base;
        }
        Ok(())
    }
}
