//! Layered configuration for the bankruptcy prediction service.
//!
//! Configuration is loaded in layers with increasing priority:
//! 1. Compiled-in defaults (listen on `0.0.0.0:8000`, artifacts under `model/`)
//! 2. TOML configuration file (if provided)
//! 3. Environment variable overrides (prefix `BP_API_`, nested with `__`)

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use config::{Config, Environment, File};
use serde::Deserialize;

// ── Default value functions ────────────────────────────────────────────

fn default_host() -> String {
    "0.0.0.0".to_string()
}

/// Default listen port: 8000.
fn default_port() -> u16 {
    8000
}

fn default_artifact_dir() -> PathBuf {
    PathBuf::from("model")
}

fn default_classifier_file() -> String {
    "logistic_regression.safetensors".to_string()
}

fn default_scaler_file() -> String {
    "scaler.json".to_string()
}

fn default_features_file() -> String {
    "top_15_features.csv".to_string()
}

// ── Configuration structs ──────────────────────────────────────────────

/// Top-level application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// HTTP listener settings.
    pub server: ServerConfig,
    /// Locations of the trained artifacts loaded at startup.
    pub artifacts: ArtifactConfig,
    /// Log output settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// HTTP listener configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Interface to bind.
    #[serde(default = "default_host")]
    pub host: String,
    /// TCP port to bind.
    #[serde(default = "default_port")]
    pub port: u16,
}

/// Artifact locations.
///
/// File names are resolved relative to `dir`.
#[derive(Debug, Clone, Deserialize)]
pub struct ArtifactConfig {
    #[serde(default = "default_artifact_dir")]
    pub dir: PathBuf,
    /// Fitted classifier weights (safetensors).
    #[serde(default = "default_classifier_file")]
    pub classifier: String,
    /// Fitted scaler statistics (JSON).
    #[serde(default = "default_scaler_file")]
    pub scaler: String,
    /// Ordered canonical feature names (CSV with a `Feature` column).
    #[serde(default = "default_features_file")]
    pub features: String,
}

impl ArtifactConfig {
    pub fn classifier_path(&self) -> PathBuf {
        self.dir.join(&self.classifier)
    }

    pub fn scaler_path(&self) -> PathBuf {
        self.dir.join(&self.scaler)
    }

    pub fn features_path(&self) -> PathBuf {
        self.dir.join(&self.features)
    }
}

/// Log output configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoggingConfig {
    /// Emit JSON lines instead of pretty, colored output.
    #[serde(default)]
    pub json: bool,
}

impl AppConfig {
    /// Load configuration using layered sources.
    ///
    /// 1. Compiled-in defaults.
    /// 2. TOML file at `config_path` (if `Some`).
    /// 3. Environment variable overrides with prefix `BP_API_` and `__` as
    ///    the nesting separator (e.g., `BP_API_SERVER__PORT=9000`).
    pub fn load(config_path: Option<PathBuf>) -> Result<Self> {
        let mut builder = Config::builder()
            // ── Layer 1: compiled-in defaults ───────────────────────
            .set_default("server.host", default_host())?
            .set_default("server.port", i64::from(default_port()))?
            .set_default("artifacts.dir", "model")?
            .set_default("artifacts.classifier", default_classifier_file())?
            .set_default("artifacts.scaler", default_scaler_file())?
            .set_default("artifacts.features", default_features_file())?
            .set_default("logging.json", false)?;

        // ── Layer 2: TOML file ─────────────────────────────────────
        if let Some(path) = config_path {
            let path_str = path
                .to_str()
                .context("config path is not valid UTF-8")?;
            builder = builder.add_source(File::with_name(path_str).required(true));
        }

        // ── Layer 3: env var overrides (BP_API_ prefix) ───────────
        // The prefix separator has to be set explicitly, otherwise the
        // `config` crate reuses the nesting separator `__` for it.
        builder = builder.add_source(
            Environment::with_prefix("BP_API")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let cfg: AppConfig = builder
            .build()
            .context("failed to build configuration")?
            .try_deserialize()
            .context("failed to deserialize configuration")?;

        cfg.validate()?;
        Ok(cfg)
    }

    fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            bail!("server.port must be non-zero");
        }
        if self.server.host.trim().is_empty() {
            bail!("server.host must not be empty");
        }
        for (key, name) in [
            ("artifacts.classifier", &self.artifacts.classifier),
            ("artifacts.scaler", &self.artifacts.scaler),
            ("artifacts.features", &self.artifacts.features),
        ] {
            if name.trim().is_empty() {
                bail!("{key} must not be empty");
            }
        }
        Ok(())
    }

    /// `host:port` string suitable for binding a listener.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}
